//! Ray-triangle intersection.

use terra_math::Vec3;

use super::SurfaceHit;

/// Intersect a ray with a triangle, from either side.
///
/// `u` and `v` are the barycentric weights of `v1` and `v2`. Rays parallel
/// to the triangle's plane miss.
#[inline]
pub fn intersect_triangle(
    origin: &Vec3,
    direction: &Vec3,
    v0: &Vec3,
    v1: &Vec3,
    v2: &Vec3,
) -> SurfaceHit {
    let v1v0 = v1 - v0;
    let v2v0 = v2 - v0;
    let rov0 = origin - v0;

    let n = v1v0.cross(&v2v0);
    let denom = direction.dot(&n);
    if denom == 0.0 || !denom.is_finite() {
        return SurfaceHit::MISS;
    }

    let q = rov0.cross(direction);
    let d = 1.0 / denom;
    let u = d * (-q).dot(&v2v0);
    let v = d * q.dot(&v1v0);
    let t = d * (-n).dot(&rov0);

    if u < 0.0 || v < 0.0 || u + v > 1.0 || t < 0.0 {
        return SurfaceHit::MISS;
    }

    SurfaceHit { t, u, v }
}
