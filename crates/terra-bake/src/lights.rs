//! Light sources, the ambient term and per-sample shading.

use serde::{Deserialize, Serialize};
use terra_math::Vec3;
use terra_raytrace::RayFlags;

use crate::color::srgb_to_linear;

/// Distance a shading ray starts along its direction, to step off the
/// surface it leaves.
pub const RAY_OFFSET: f32 = 0.001;

/// Directional lights baked into one map at most.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 2;

/// Light arriving from one direction everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction from the surface toward the light.
    pub direction: Vec3,
}

/// Light radiating from a point, fading to zero at `range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    /// World position.
    pub position: Vec3,
    /// Distance at which the light reaches zero.
    pub range: f32,
}

/// Point light restricted to a cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    /// World position.
    pub position: Vec3,
    /// Direction the cone points.
    pub direction: Vec3,
    /// Distance at which the light reaches zero.
    pub range: f32,
    /// Full angle of the fully lit cone, in radians.
    pub inner_cone_angle: f32,
    /// Full angle outside which nothing is lit, in radians.
    pub outer_cone_angle: f32,
}

/// Shape of a light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightKind {
    /// See [`DirectionalLight`].
    Directional(DirectionalLight),
    /// See [`PointLight`].
    Point(PointLight),
    /// See [`SpotLight`].
    Spot(SpotLight),
}

/// A light of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Name the world refers to the light by.
    #[serde(default)]
    pub name: String,
    /// Shape and placement.
    pub kind: LightKind,
    /// Linear colour times intensity.
    pub color: Vec3,
    /// Static lights go into the main map, the rest into the secondary one.
    #[serde(rename = "static")]
    pub is_static: bool,
}

impl Light {
    /// A static light.
    pub fn new(name: impl Into<String>, kind: LightKind, color: Vec3) -> Self {
        Self {
            name: name.into(),
            kind,
            color,
            is_static: true,
        }
    }
}

/// The world's designated sun lights. Directional lights are only baked
/// when named here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalLights {
    /// Name of the first global light; empty for none.
    pub global_light_1: String,
    /// Name of the second global light; empty for none.
    pub global_light_2: String,
}

impl GlobalLights {
    /// Designate two lights by name.
    pub fn new(global_light_1: impl Into<String>, global_light_2: impl Into<String>) -> Self {
        Self {
            global_light_1: global_light_1.into(),
            global_light_2: global_light_2.into(),
        }
    }

    /// True if `name` is one of the global lights, ignoring ASCII case.
    pub fn contains(&self, name: &str) -> bool {
        !name.is_empty()
            && (name.eq_ignore_ascii_case(&self.global_light_1)
                || name.eq_ignore_ascii_case(&self.global_light_2))
    }
}

/// Hemispheric ambient light, blended by how far a normal points up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLighting {
    /// Linear colour seen by downward normals.
    pub ground_color: Vec3,
    /// Linear colour seen by upward normals.
    pub sky_color: Vec3,
}

impl AmbientLighting {
    /// From colours authored in sRGB.
    pub fn from_srgb(ground_color: &Vec3, sky_color: &Vec3) -> Self {
        Self {
            ground_color: srgb_to_linear(ground_color),
            sky_color: srgb_to_linear(sky_color),
        }
    }

    /// Ambient colour for a unit normal; straight up is pure sky.
    #[inline]
    pub fn at(&self, normal: &Vec3) -> Vec3 {
        let factor = normal.y * 2.0 - 1.0;
        self.ground_color * (1.0 - factor) + self.sky_color * factor
    }
}

impl Default for AmbientLighting {
    fn default() -> Self {
        Self {
            ground_color: Vec3::zeros(),
            sky_color: Vec3::zeros(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PreparedDirectional {
    direction: Vec3,
    color: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct PreparedPoint {
    position: Vec3,
    range_sq: f32,
    inv_range_sq: f32,
    color: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct PreparedSpot {
    point: PreparedPoint,
    direction: Vec3,
    cos_outer: f32,
    inv_cone: f32,
}

/// Lights contributing to one map, with per-light constants precomputed.
#[derive(Debug, Clone, Default)]
pub struct LightSet {
    directional: Vec<PreparedDirectional>,
    point: Vec<PreparedPoint>,
    spot: Vec<PreparedSpot>,
}

impl LightSet {
    /// The lights whose static flag equals `is_static`. Directional lights
    /// must be global lights, and only the first
    /// [`MAX_DIRECTIONAL_LIGHTS`] of them are kept.
    pub fn gather(lights: &[Light], globals: &GlobalLights, is_static: bool) -> Self {
        let mut set = Self::default();

        for light in lights {
            if light.is_static != is_static {
                continue;
            }

            match light.kind {
                LightKind::Directional(d) => {
                    if set.directional.len() == MAX_DIRECTIONAL_LIGHTS
                        || !globals.contains(&light.name)
                    {
                        continue;
                    }
                    let Some(direction) = d.direction.try_normalize(0.0) else {
                        log::warn!("skipping directional light with zero direction");
                        continue;
                    };
                    set.directional.push(PreparedDirectional {
                        direction,
                        color: light.color,
                    });
                }
                LightKind::Point(p) => {
                    if p.range <= 0.0 {
                        continue;
                    }
                    set.point.push(prepare_point(p.position, p.range, light.color));
                }
                LightKind::Spot(s) => {
                    if s.range <= 0.0 {
                        continue;
                    }
                    let Some(direction) = s.direction.try_normalize(0.0) else {
                        log::warn!("skipping spot light with zero direction");
                        continue;
                    };
                    let cos_outer = (s.outer_cone_angle * 0.5).cos();
                    let mut cos_inner = (s.inner_cone_angle * 0.5).cos();
                    if cos_inner <= cos_outer {
                        log::warn!(
                            "spot light inner cone {} not inside outer cone {}, using a hard edge",
                            s.inner_cone_angle,
                            s.outer_cone_angle
                        );
                        cos_inner = cos_outer + f32::EPSILON;
                    }
                    set.spot.push(PreparedSpot {
                        point: prepare_point(s.position, s.range, light.color),
                        direction,
                        cos_outer,
                        inv_cone: 1.0 / (cos_inner - cos_outer),
                    });
                }
            }
        }

        set
    }

    /// Number of lights in the set.
    pub fn len(&self) -> usize {
        self.directional.len() + self.point.len() + self.spot.len()
    }

    /// True when no light contributes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct light reaching a surface point.
    ///
    /// `occluded(origin, direction, max_distance, flags)` answers whether a
    /// shadow ray is blocked; rays already start [`RAY_OFFSET`] off the
    /// surface.
    pub fn shade<F>(&self, position: &Vec3, normal: &Vec3, occluded: F) -> Vec3
    where
        F: Fn(&Vec3, &Vec3, f32, RayFlags) -> bool,
    {
        let mut color = Vec3::zeros();

        for light in &self.directional {
            let n_dot_l = normal.dot(&light.direction);
            if n_dot_l < 0.0 {
                continue;
            }
            let origin = position + light.direction * RAY_OFFSET;
            if occluded(&origin, &light.direction, f32::MAX, RayFlags::shadow()) {
                continue;
            }
            color += light.color * n_dot_l.min(1.0);
        }

        let bounded = RayFlags {
            allow_backface_cull: true,
            accept_first_hit: true,
        };

        for light in &self.point {
            if let Some(lit) = light.reach(position, normal) {
                let origin = position + lit.direction * RAY_OFFSET;
                if !occluded(&origin, &lit.direction, lit.distance, bounded) {
                    color += light.color * (lit.n_dot_l * lit.attenuation);
                }
            }
        }

        for light in &self.spot {
            let Some(lit) = light.point.reach(position, normal) else {
                continue;
            };
            let cos_theta = (-lit.direction).dot(&light.direction);
            let cone = ((cos_theta - light.cos_outer) * light.inv_cone).clamp(0.0, 1.0);
            if cone <= 0.0 {
                continue;
            }
            let origin = position + lit.direction * RAY_OFFSET;
            if !occluded(&origin, &lit.direction, lit.distance, bounded) {
                color += light.point.color * (lit.n_dot_l * lit.attenuation * cone);
            }
        }

        color
    }
}

fn prepare_point(position: Vec3, range: f32, color: Vec3) -> PreparedPoint {
    let range_sq = range * range;
    PreparedPoint {
        position,
        range_sq,
        inv_range_sq: 1.0 / range_sq,
        color,
    }
}

struct Reach {
    direction: Vec3,
    distance: f32,
    n_dot_l: f32,
    attenuation: f32,
}

impl PreparedPoint {
    /// Unshadowed geometry of the light at a surface point, or `None` when
    /// out of range or behind the surface.
    #[inline]
    fn reach(&self, position: &Vec3, normal: &Vec3) -> Option<Reach> {
        let to_light = self.position - position;
        let distance_sq = to_light.norm_squared();
        if distance_sq > self.range_sq || distance_sq == 0.0 {
            return None;
        }

        let distance = distance_sq.sqrt();
        let direction = to_light / distance;
        let n_dot_l = normal.dot(&direction);
        if n_dot_l < 0.0 {
            return None;
        }

        Some(Reach {
            direction,
            distance,
            n_dot_l: n_dot_l.min(1.0),
            attenuation: (1.0 - distance_sq * self.inv_range_sq).clamp(0.0, 1.0),
        })
    }
}
