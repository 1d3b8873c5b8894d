//! Ray-quad intersection for planar, possibly non-parallelogram quads.

use terra_math::{Vec2, Vec3};

use super::SurfaceHit;

#[inline]
fn cross2(a: &Vec2, b: &Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Intersect a ray with the quad `v0 v1 v2 v3` (in winding order), from
/// either side.
///
/// The quad is treated as the bilinear patch
/// `v0 + u (v1 - v0) + v (v3 - v0) + u v (v2 - v1 - v3 + v0)`; the hit
/// reports its `(u, v)`. The patch is solved in 2D after dropping the
/// dominant axis of the quad's normal, which gives a quadratic in `v` that
/// becomes linear when opposite edges are parallel.
pub fn intersect_quad(
    origin: &Vec3,
    direction: &Vec3,
    v0: &Vec3,
    v1: &Vec3,
    v2: &Vec3,
    v3: &Vec3,
) -> SurfaceHit {
    let a = v1 - v0;
    let b = v3 - v0;
    let c = v2 - v0;
    let p = origin - v0;

    let normal = a.cross(&b);
    let denom = direction.dot(&normal);
    if denom == 0.0 {
        return SurfaceHit::MISS;
    }

    let t = -p.dot(&normal) / denom;
    if !(t >= 0.0) {
        return SurfaceHit::MISS;
    }

    let pos = p + direction * t;

    let m = normal.abs();
    let (iu, iv) = if m.x > m.y && m.x > m.z {
        (1, 2)
    } else if m.y > m.z {
        (2, 0)
    } else {
        (0, 1)
    };

    let kp = Vec2::new(pos[iu], pos[iv]);
    let ka = Vec2::new(a[iu], a[iv]);
    let kb = Vec2::new(b[iu], b[iv]);
    let kg = Vec2::new(c[iu], c[iv]) - ka - kb;

    // kp = u ka + v kb + u v kg  =>  A v² + B v + C = 0
    let qa = cross2(&kg, &kb);
    let qb = cross2(&kp, &kg) - cross2(&kb, &ka);
    let qc = cross2(&kp, &ka);

    let v = if qa.abs() < 1e-5 * (ka.norm_squared() + kb.norm_squared()) {
        if qb == 0.0 {
            return SurfaceHit::MISS;
        }
        -qc / qb
    } else {
        let w = qb * qb - 4.0 * qa * qc;
        if w < 0.0 {
            return SurfaceHit::MISS;
        }
        let w = w.sqrt();
        let inv = 1.0 / (2.0 * qa);
        let v = (-qb - w) * inv;
        if (0.0..=1.0).contains(&v) {
            v
        } else {
            (-qb + w) * inv
        }
    };

    let edge = ka + kg * v;
    let edge_len = edge.norm_squared();
    if edge_len == 0.0 {
        return SurfaceHit::MISS;
    }
    let u = (kp - kb * v).dot(&edge) / edge_len;

    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return SurfaceHit::MISS;
    }

    SurfaceHit { t, u, v }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_square() {
        let hit = intersect_quad(
            &Vec3::new(0.25, 0.75, 5.0),
            &Vec3::new(0.0, 0.0, -1.0),
            &Vec3::new(0.0, 0.0, 0.0),
            &Vec3::new(1.0, 0.0, 0.0),
            &Vec3::new(1.0, 1.0, 0.0),
            &Vec3::new(0.0, 1.0, 0.0),
        );
        assert!(hit.is_hit());
        assert!((hit.t - 5.0).abs() < 1e-6);
        assert!((hit.u - 0.25).abs() < 1e-6);
        assert!((hit.v - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_trapezoid_uses_quadratic() {
        // Top edge half as wide as the bottom edge.
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(2.0, 0.0, 0.0);
        let v2 = Vec3::new(1.5, 0.0, 1.0);
        let v3 = Vec3::new(0.5, 0.0, 1.0);

        let inside = intersect_quad(&Vec3::new(1.0, 3.0, 0.5), &Vec3::new(0.0, -1.0, 0.0), &v0, &v1, &v2, &v3);
        assert!(inside.is_hit());
        assert!((inside.t - 3.0).abs() < 1e-5);
        assert!((inside.u - 0.5).abs() < 1e-4);
        assert!((inside.v - 0.5).abs() < 1e-4);

        // Inside the bounding rectangle but outside the slanted edge.
        let outside = intersect_quad(&Vec3::new(0.1, 3.0, 0.9), &Vec3::new(0.0, -1.0, 0.0), &v0, &v1, &v2, &v3);
        assert!(!outside.is_hit());
    }

    #[test]
    fn test_quad_behind_origin() {
        let hit = intersect_quad(
            &Vec3::new(0.5, 0.5, 5.0),
            &Vec3::new(0.0, 0.0, 1.0),
            &Vec3::new(0.0, 0.0, 0.0),
            &Vec3::new(1.0, 0.0, 0.0),
            &Vec3::new(1.0, 1.0, 0.0),
            &Vec3::new(0.0, 1.0, 0.0),
        );
        assert!(!hit.is_hit());
    }
}
