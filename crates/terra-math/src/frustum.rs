//! View frustums for culling and box selection.

use crate::{Aabb, Mat4, Vec3, Vec4};

/// Corner indices, near quad first.
pub mod corner {
    /// Bottom left, near.
    pub const BOTTOM_LEFT_NEAR: usize = 0;
    /// Bottom right, near.
    pub const BOTTOM_RIGHT_NEAR: usize = 1;
    /// Top left, near.
    pub const TOP_LEFT_NEAR: usize = 2;
    /// Top right, near.
    pub const TOP_RIGHT_NEAR: usize = 3;
    /// Bottom left, far.
    pub const BOTTOM_LEFT_FAR: usize = 4;
    /// Bottom right, far.
    pub const BOTTOM_RIGHT_FAR: usize = 5;
    /// Top left, far.
    pub const TOP_LEFT_FAR: usize = 6;
    /// Top right, far.
    pub const TOP_RIGHT_FAR: usize = 7;
}

use corner::*;

/// The twelve edges of the frustum as corner index pairs.
pub const EDGES: [[usize; 2]; 12] = [
    [BOTTOM_LEFT_NEAR, BOTTOM_RIGHT_NEAR],
    [BOTTOM_RIGHT_NEAR, TOP_RIGHT_NEAR],
    [TOP_RIGHT_NEAR, TOP_LEFT_NEAR],
    [TOP_LEFT_NEAR, BOTTOM_LEFT_NEAR],
    [BOTTOM_LEFT_FAR, BOTTOM_RIGHT_FAR],
    [BOTTOM_RIGHT_FAR, TOP_RIGHT_FAR],
    [TOP_RIGHT_FAR, TOP_LEFT_FAR],
    [TOP_LEFT_FAR, BOTTOM_LEFT_FAR],
    [BOTTOM_LEFT_NEAR, BOTTOM_LEFT_FAR],
    [BOTTOM_RIGHT_NEAR, BOTTOM_RIGHT_FAR],
    [TOP_LEFT_NEAR, TOP_LEFT_FAR],
    [TOP_RIGHT_NEAR, TOP_RIGHT_FAR],
];

/// The six faces of the frustum as corner index quads, wound around the
/// face so `[a, b, c]` and `[a, c, d]` tile it.
pub const FACES: [[usize; 4]; 6] = [
    [BOTTOM_LEFT_NEAR, BOTTOM_RIGHT_NEAR, TOP_RIGHT_NEAR, TOP_LEFT_NEAR],
    [BOTTOM_LEFT_FAR, TOP_LEFT_FAR, TOP_RIGHT_FAR, BOTTOM_RIGHT_FAR],
    [BOTTOM_LEFT_NEAR, BOTTOM_LEFT_FAR, BOTTOM_RIGHT_FAR, BOTTOM_RIGHT_NEAR],
    [TOP_LEFT_NEAR, TOP_RIGHT_NEAR, TOP_RIGHT_FAR, TOP_LEFT_FAR],
    [BOTTOM_LEFT_NEAR, TOP_LEFT_NEAR, TOP_LEFT_FAR, BOTTOM_LEFT_FAR],
    [BOTTOM_RIGHT_NEAR, BOTTOM_RIGHT_FAR, TOP_RIGHT_FAR, TOP_RIGHT_NEAR],
];

/// A convex view volume described by its corners and inward-facing planes.
///
/// A point is outside a plane when `dot(plane, (p, 1)) < 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Corner positions, see [`corner`].
    pub corners: [Vec3; 8],
    /// Near, far, bottom, top, left, right.
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Unproject the NDC cube (x, y in `[-1, 1]`, z in `[0, 1]`, near at 0).
    pub fn from_inv_view_projection(inv_view_projection: &Mat4) -> Self {
        Self::from_inv_view_projection_range(
            inv_view_projection,
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        )
    }

    /// Unproject an NDC sub-box, e.g. a drag-select rectangle.
    pub fn from_inv_view_projection_range(
        inv_view_projection: &Mat4,
        ndc_min: Vec3,
        ndc_max: Vec3,
    ) -> Self {
        let ndc = |x: f32, y: f32, z: f32| {
            let p = inv_view_projection * Vec4::new(x, y, z, 1.0);
            p.xyz() / p.w
        };
        let (n, f) = (ndc_min.z, ndc_max.z);

        Self::from_corners([
            ndc(ndc_min.x, ndc_min.y, n),
            ndc(ndc_max.x, ndc_min.y, n),
            ndc(ndc_min.x, ndc_max.y, n),
            ndc(ndc_max.x, ndc_max.y, n),
            ndc(ndc_min.x, ndc_min.y, f),
            ndc(ndc_max.x, ndc_min.y, f),
            ndc(ndc_min.x, ndc_max.y, f),
            ndc(ndc_max.x, ndc_max.y, f),
        ])
    }

    /// Build from explicit corners. Planes are flipped as needed so the
    /// frustum's center is on their positive side, which makes the result
    /// independent of handedness and depth conventions.
    pub fn from_corners(corners: [Vec3; 8]) -> Self {
        let center = corners.iter().sum::<Vec3>() / 8.0;
        let planes = FACES.map(|[a, b, c, _]| {
            let plane = make_plane(&corners[a], &corners[b], &corners[c]);
            if plane_distance(&plane, &center) < 0.0 {
                -plane
            } else {
                plane
            }
        });
        Self { corners, planes }
    }

    /// True unless the point is outside some plane.
    pub fn contains_point(&self, p: &Vec3) -> bool {
        self.planes.iter().all(|plane| plane_distance(plane, p) >= 0.0)
    }

    /// Conservative box test: rejects a box entirely outside any plane or
    /// entirely beyond the frustum's corner extents on any axis.
    pub fn intersects_aabb(&self, bbox: &Aabb) -> bool {
        let box_corners = bbox.corners();

        for plane in &self.planes {
            if box_corners.iter().all(|c| plane_distance(plane, c) < 0.0) {
                return false;
            }
        }

        for axis in 0..3 {
            if self.corners.iter().all(|c| c[axis] > bbox.max[axis]) {
                return false;
            }
            if self.corners.iter().all(|c| c[axis] < bbox.min[axis]) {
                return false;
            }
        }

        true
    }
}

/// Plane through three points, `xyz` the unit normal and `w` the offset.
pub fn make_plane(p0: &Vec3, p1: &Vec3, p2: &Vec3) -> Vec4 {
    let normal = (p1 - p0).cross(&(p2 - p0)).normalize();
    Vec4::new(normal.x, normal.y, normal.z, -normal.dot(p0))
}

/// Signed distance of a point from a plane.
#[inline]
pub fn plane_distance(plane: &Vec4, p: &Vec3) -> f32 {
    plane.dot(&Vec4::new(p.x, p.y, p.z, 1.0))
}
