//! Ray-sphere intersection.

use terra_math::Vec3;

use super::ShapeHit;

/// Intersect a ray with a sphere. Expects a unit direction.
///
/// Only the entry point is reported, so an origin inside the sphere misses.
pub fn intersect_sphere(origin: &Vec3, direction: &Vec3, center: &Vec3, radius: f32) -> ShapeHit {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.dot(&oc) - radius * radius;
    let h = b * b - c;

    if h < 0.0 {
        return ShapeHit::miss();
    }

    let t = -b - h.sqrt();
    if t < 0.0 {
        return ShapeHit::miss();
    }

    ShapeHit {
        t,
        normal: (oc + direction * t) / radius,
    }
}
