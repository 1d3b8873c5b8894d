//! Ray-capped-cylinder intersection.

use terra_math::Vec3;

use super::ShapeHit;

/// Intersect a ray with a capped cylinder running from `pa` to `pb`.
/// Expects a unit direction.
pub fn intersect_cylinder(
    origin: &Vec3,
    direction: &Vec3,
    pa: &Vec3,
    pb: &Vec3,
    radius: f32,
) -> ShapeHit {
    let ca = pb - pa;
    let oc = origin - pa;
    let caca = ca.dot(&ca);
    let card = ca.dot(direction);
    let caoc = ca.dot(&oc);

    let a = caca - card * card;
    let b = caca * oc.dot(direction) - caoc * card;
    let c = caca * oc.dot(&oc) - caoc * caoc - radius * radius * caca;

    // Running along the axis: only the caps can be hit.
    if a.abs() <= f32::EPSILON * caca {
        if c > 0.0 || card == 0.0 {
            return ShapeHit::miss();
        }
        let t = ((0.0 - caoc) / card).min((caca - caoc) / card);
        if t < 0.0 {
            return ShapeHit::miss();
        }
        return ShapeHit {
            t,
            normal: -ca.normalize() * card.signum(),
        };
    }

    let h = b * b - a * c;
    if h < 0.0 {
        return ShapeHit::miss();
    }
    let h = h.sqrt();

    let t = (-b - h) / a;
    let y = caoc + t * card;
    if y > 0.0 && y < caca {
        if t < 0.0 {
            return ShapeHit::miss();
        }
        return ShapeHit {
            t,
            normal: (oc + direction * t - ca * (y / caca)) / radius,
        };
    }

    if card == 0.0 {
        return ShapeHit::miss();
    }
    let t = (if y < 0.0 { 0.0 } else { caca } - caoc) / card;
    if (b + a * t).abs() < h && t >= 0.0 {
        return ShapeHit {
            t,
            normal: ca * y.signum() / caca.sqrt(),
        };
    }

    ShapeHit::miss()
}
