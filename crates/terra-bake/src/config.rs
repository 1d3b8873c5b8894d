//! Bake configuration.

use serde::{Deserialize, Serialize};

/// Settings for one terrain light-map bake.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Sample points per terrain triangle.
    pub samples_per_triangle: u32,
    /// Cast hemisphere rays to darken the ambient term.
    pub ambient_occlusion: bool,
    /// Hemisphere rays per sample point.
    pub ambient_occlusion_samples: u32,
    /// Placed objects cast shadows.
    pub include_object_shadows: bool,
    /// Blocks cast shadows.
    pub include_block_shadows: bool,
    /// Also bake a second map holding only non-static lights.
    pub bake_dynamic_lights: bool,
    /// sRGB-encode packed texels.
    pub srgb_output: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            samples_per_triangle: 16,
            ambient_occlusion: true,
            ambient_occlusion_samples: 64,
            include_object_shadows: true,
            include_block_shadows: true,
            bake_dynamic_lights: false,
            srgb_output: true,
        }
    }
}

impl BakeConfig {
    /// Sample points per triangle, at least one.
    pub fn effective_samples(&self) -> usize {
        at_least_one("samples_per_triangle", self.samples_per_triangle)
    }

    /// Hemisphere rays per sample: zero when occlusion is off, otherwise at
    /// least one.
    pub fn effective_ao_samples(&self) -> usize {
        if !self.ambient_occlusion {
            return 0;
        }
        at_least_one("ambient_occlusion_samples", self.ambient_occlusion_samples)
    }
}

fn at_least_one(name: &str, value: u32) -> usize {
    if value == 0 {
        log::warn!("{name} of 0 raised to 1");
        return 1;
    }
    value as usize
}
