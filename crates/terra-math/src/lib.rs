#![warn(missing_docs)]

//! Math types for the terra ray-query engine.
//!
//! Thin aliases around nalgebra's `f32` types plus the few shapes every
//! other crate needs: axis-aligned boxes, rigid transforms and view
//! frustums.

pub mod bbox;
pub mod frustum;

pub use bbox::Aabb;
pub use frustum::Frustum;

use nalgebra::{Matrix4, UnitQuaternion, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// A 2D vector, used for sample coordinates and projected quads.
pub type Vec2 = Vector2<f32>;

/// A homogeneous 4-vector, used for planes.
pub type Vec4 = Vector4<f32>;

/// A unit quaternion rotation.
pub type Quat = UnitQuaternion<f32>;

/// A 4x4 matrix.
pub type Mat4 = Matrix4<f32>;

/// A rotation followed by a translation, with its inverse precomputed.
///
/// `transform_point(p) = rotation * p + position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RigidTransformDesc", into = "RigidTransformDesc")]
pub struct RigidTransform {
    /// Rotation applied before translation.
    pub rotation: Quat,
    /// Translation applied after rotation.
    pub position: Vec3,
    inverse_rotation: Quat,
    inverse_position: Vec3,
}

#[derive(Serialize, Deserialize)]
struct RigidTransformDesc {
    rotation: Quat,
    position: Vec3,
}

impl From<RigidTransformDesc> for RigidTransform {
    fn from(desc: RigidTransformDesc) -> Self {
        Self::new(desc.rotation, desc.position)
    }
}

impl From<RigidTransform> for RigidTransformDesc {
    fn from(transform: RigidTransform) -> Self {
        Self {
            rotation: transform.rotation,
            position: transform.position,
        }
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Create a transform and derive its inverse.
    pub fn new(rotation: Quat, position: Vec3) -> Self {
        let inverse_rotation = rotation.inverse();
        let inverse_position = inverse_rotation * -position;
        Self {
            rotation,
            position,
            inverse_rotation,
            inverse_position,
        }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(Quat::identity(), Vec3::zeros())
    }

    /// A pure translation.
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        Self::new(Quat::identity(), Vec3::new(x, y, z))
    }

    /// Inverse rotation, precomputed.
    #[inline]
    pub fn inverse_rotation(&self) -> &Quat {
        &self.inverse_rotation
    }

    /// Inverse translation, precomputed (`-(rotation⁻¹ * position)`).
    #[inline]
    pub fn inverse_position(&self) -> &Vec3 {
        &self.inverse_position
    }

    /// Transform a point from local into parent space.
    #[inline]
    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        self.rotation * p + self.position
    }

    /// Rotate a direction from local into parent space.
    #[inline]
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Transform a point from parent into local space.
    #[inline]
    pub fn inverse_transform_point(&self, p: &Vec3) -> Vec3 {
        self.inverse_rotation * p + self.inverse_position
    }

    /// Rotate a direction from parent into local space.
    #[inline]
    pub fn inverse_transform_vector(&self, v: &Vec3) -> Vec3 {
        self.inverse_rotation * v
    }
}

/// The fractional part of `x`, always in `[0, 1)`.
#[inline]
pub fn frac(x: f64) -> f64 {
    x - x.floor()
}
