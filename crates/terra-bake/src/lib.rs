#![warn(missing_docs)]

//! Monte-Carlo light-map baking for height-grid terrain.
//!
//! [`TerrainLightMapBaker::start`] hands the bake to a rayon pool and returns
//! a handle for polling [`BakeStatus`] and progress. Once
//! [`TerrainLightMapBaker::ready`] the packed maps can each be taken once.
//!
//! ```ignore
//! use std::sync::Arc;
//! use terra_bake::{BakeConfig, BakeInputs, TerrainLightMapBaker};
//!
//! let pool = Arc::new(rayon::ThreadPoolBuilder::new().build()?);
//! let baker = TerrainLightMapBaker::start(Arc::new(inputs), pool, BakeConfig::default())?;
//! while !baker.ready() {
//!     println!("{:?}: {:.0}%", baker.status(), baker.sampling_progress() * 100.0);
//! }
//! let map = baker.light_map();
//! ```

pub mod baker;
pub mod color;
pub mod config;
pub mod error;
pub mod lights;
pub mod sampling;

pub use baker::{BakeInputs, BakeStatus, LightMap, TerrainLightMapBaker};
pub use config::BakeConfig;
pub use error::{BakeError, Result};
pub use lights::{
    AmbientLighting, DirectionalLight, GlobalLights, Light, LightKind, LightSet, PointLight, SpotLight,
    MAX_DIRECTIONAL_LIGHTS,
};
