//! Closed-form ray-primitive intersectors.
//!
//! Every function is stateless and allocation-free. A miss is reported as a
//! negative distance rather than an `Option`, so results can be compared and
//! min-reduced without unwrapping in hot loops.

mod cone;
mod cube;
mod cylinder;
pub mod frustum;
mod quad;
mod sphere;
mod triangle;

pub use cone::intersect_capped_cone;
pub use cube::{intersect_aabb, intersect_box, BoxHit};
pub use cylinder::intersect_cylinder;
pub use quad::intersect_quad;
pub use sphere::intersect_sphere;
pub use triangle::intersect_triangle;

use terra_math::Vec3;

/// Distance reported for "no intersection".
pub const MISS: f32 = -1.0;

/// Hit on a parametric surface (triangle or quad).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Distance along the ray, negative on a miss.
    pub t: f32,
    /// First surface coordinate.
    pub u: f32,
    /// Second surface coordinate.
    pub v: f32,
}

impl SurfaceHit {
    /// The miss sentinel.
    pub const MISS: SurfaceHit = SurfaceHit {
        t: MISS,
        u: 0.0,
        v: 0.0,
    };

    /// True for an intersection in front of the origin.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t >= 0.0
    }
}

/// Hit on a solid shape, with the outward normal at the hit point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    /// Distance along the ray, negative on a miss.
    pub t: f32,
    /// Unit surface normal.
    pub normal: Vec3,
}

impl ShapeHit {
    /// The miss sentinel.
    #[inline]
    pub fn miss() -> ShapeHit {
        ShapeHit {
            t: MISS,
            normal: Vec3::zeros(),
        }
    }

    /// True for an intersection in front of the origin.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t >= 0.0
    }
}
