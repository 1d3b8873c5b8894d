//! Ray-capped-cone intersection.

use terra_math::Vec3;

use super::ShapeHit;

/// Intersect a ray with a capped cone running from `pa` (radius `ra`) to
/// `pb` (radius `rb`). Expects a unit direction.
pub fn intersect_capped_cone(
    origin: &Vec3,
    direction: &Vec3,
    pa: &Vec3,
    pb: &Vec3,
    ra: f32,
    rb: f32,
) -> ShapeHit {
    let ba = pb - pa;
    let oa = origin - pa;
    let ob = origin - pb;
    let m0 = ba.dot(&ba);
    let m1 = oa.dot(&ba);
    let m2 = direction.dot(&ba);
    let m3 = direction.dot(&oa);
    let m5 = oa.dot(&oa);
    let m9 = ob.dot(&ba);

    // Caps
    if m1 < 0.0 {
        if m2 != 0.0 && (oa * m2 - direction * m1).norm_squared() < ra * ra * m2 * m2 {
            let t = -m1 / m2;
            if t >= 0.0 {
                return ShapeHit {
                    t,
                    normal: -ba / m0.sqrt(),
                };
            }
        }
    } else if m9 > 0.0 && m2 != 0.0 {
        let t = -m9 / m2;
        if t >= 0.0 && (ob + direction * t).norm_squared() < rb * rb {
            return ShapeHit {
                t,
                normal: ba / m0.sqrt(),
            };
        }
    }

    // Body
    let rr = ra - rb;
    let hy = m0 + rr * rr;
    let k2 = m0 * m0 - m2 * m2 * hy;
    let k1 = m0 * m0 * m3 - m1 * m2 * hy + m0 * ra * (rr * m2);
    let k0 = m0 * m0 * m5 - m1 * m1 * hy + m0 * ra * (rr * m1 * 2.0 - m0 * ra);

    if k2.abs() <= f32::EPSILON * m0 * m0 {
        return ShapeHit::miss();
    }

    let h = k1 * k1 - k2 * k0;
    if h < 0.0 {
        return ShapeHit::miss();
    }

    let t = (-k1 - h.sqrt()) / k2;
    let y = m1 + t * m2;
    if t < 0.0 || y < 0.0 || y > m0 {
        return ShapeHit::miss();
    }

    ShapeHit {
        t,
        normal: ((oa + direction * t) * (m0 * m0) + ba * (rr * ra * m0) - ba * (hy * y))
            .normalize(),
    }
}
