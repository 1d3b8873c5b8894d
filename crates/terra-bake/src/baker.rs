//! Background terrain light-map bake.
//!
//! A bake runs as one task on a caller-supplied rayon pool:
//!
//! 1. **Preparing**: build the shadow-casting scene and the terrain vertex
//!    normals side by side.
//! 2. **Sampling**: workers pull terrain rows from a shared counter and shade
//!    a fixed set of sample points on every triangle of the row.
//! 3. **Filtering**: splat every sample onto its triangle's corners weighted
//!    by barycentric weight times triangle area, then normalize per vertex.
//! 4. Optionally the same two phases again for non-static lights only.
//!
//! Every sample position comes from a table indexed by sample slot, so the
//! output does not depend on how rows are spread over threads.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use rayon::ThreadPool;
use terra_math::Vec3;
use terra_raytrace::{InstanceBvh, RayFlags, TriangleMesh};
use terra_scene::{Blocks, Layers, SceneGeometry, SceneObject, Terrain};

use crate::color::pack_bgra;
use crate::config::BakeConfig;
use crate::error::Result;
use crate::lights::{AmbientLighting, GlobalLights, Light, LightSet, RAY_OFFSET};
use crate::sampling::{Basis, SampleTable};

/// Everything a bake reads. Shared with the background task.
#[derive(Debug, Clone)]
pub struct BakeInputs {
    /// Terrain to bake; its side length must be a power of two.
    pub terrain: Terrain,
    /// Solid geometry casting shadows.
    pub blocks: Blocks,
    /// Placed objects casting shadows.
    pub objects: Vec<SceneObject>,
    /// Active layers for objects.
    pub layers: Layers,
    /// All lights of the world.
    pub lights: Vec<Light>,
    /// Which directional lights are baked.
    pub global_lights: GlobalLights,
    /// Ambient term of the main map.
    pub ambient: AmbientLighting,
}

impl BakeInputs {
    /// Inputs with no blocks, objects or lights.
    pub fn new(terrain: Terrain, ambient: AmbientLighting) -> Self {
        Self {
            terrain,
            blocks: Blocks::default(),
            objects: Vec::new(),
            layers: Layers::default(),
            lights: Vec::new(),
            global_lights: GlobalLights::default(),
            ambient,
        }
    }
}

/// Phase of a running bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BakeStatus {
    /// Building the scene and normals.
    Preparing = 0,
    /// Shading samples for the main map.
    Sampling = 1,
    /// Reconstructing the main map.
    Filtering = 2,
    /// Shading samples for the dynamic-light map.
    SamplingSecondary = 3,
    /// Reconstructing the dynamic-light map.
    FilteringSecondary = 4,
    /// Both maps are available.
    Done = 5,
}

impl BakeStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Preparing,
            1 => Self::Sampling,
            2 => Self::Filtering,
            3 => Self::SamplingSecondary,
            4 => Self::FilteringSecondary,
            5 => Self::Done,
            _ => unreachable!("bake status {value} out of range"),
        }
    }
}

/// Row-major packed texels, `texels[z * length + x]`, one per grid vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightMap {
    /// Side length; zero for an empty map.
    pub length: usize,
    /// Packed BGRA8 colours.
    pub texels: Vec<u32>,
}

impl LightMap {
    /// True for the empty map returned by repeated retrieval.
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Texel of grid vertex `(x, z)`.
    pub fn texel(&self, x: usize, z: usize) -> u32 {
        self.texels[z * self.length + x]
    }
}

/// Samples done over samples planned, readable from any thread.
#[derive(Debug)]
struct Progress {
    done: AtomicU64,
    total: u64,
}

impl Progress {
    fn new(total: u64) -> Self {
        Self {
            done: AtomicU64::new(0),
            total,
        }
    }

    fn add(&self, samples: u64) {
        self.done.fetch_add(samples, Ordering::Relaxed);
    }

    fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        let done = self.done.load(Ordering::Relaxed);
        if done >= self.total {
            1.0
        } else {
            (done as f64 / self.total as f64) as f32
        }
    }
}

#[derive(Debug)]
struct Shared {
    length: usize,
    status: AtomicU8,
    primary: Progress,
    secondary: Progress,
    light_map: Mutex<Option<Vec<u32>>>,
    secondary_light_map: Mutex<Option<Vec<u32>>>,
    finished: Mutex<bool>,
    finished_cond: Condvar,
}

impl Shared {
    fn set_status(&self, status: BakeStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    fn finish(&self) {
        self.set_status(BakeStatus::Done);
        let mut finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        *finished = true;
        self.finished_cond.notify_all();
    }
}

/// Handle to a bake running on a thread pool.
///
/// Dropping the handle does not stop the bake; there is no cancellation.
#[derive(Debug, Clone)]
pub struct TerrainLightMapBaker {
    shared: Arc<Shared>,
}

impl TerrainLightMapBaker {
    /// Start baking in the background.
    ///
    /// Geometry is generated here, so a started bake always runs to
    /// completion. Zero sample counts are raised to one.
    ///
    /// # Panics
    ///
    /// Panics if the terrain side length is not a power of two.
    pub fn start(inputs: Arc<BakeInputs>, pool: Arc<ThreadPool>, config: BakeConfig) -> Result<Self> {
        let length = inputs.terrain.length();
        assert!(
            length.is_power_of_two(),
            "terrain length {length} is not a power of two"
        );
        let terrain_meshes = inputs.terrain.chunk_meshes()?;
        let block_meshes = if config.include_block_shadows {
            inputs.blocks.chunk_meshes()?
        } else {
            Vec::new()
        };

        let total = (inputs.terrain.triangle_count() * config.effective_samples()) as u64;
        let shared = Arc::new(Shared {
            length,
            status: AtomicU8::new(BakeStatus::Preparing as u8),
            primary: Progress::new(total),
            secondary: Progress::new(if config.bake_dynamic_lights { total } else { 0 }),
            light_map: Mutex::new(None),
            secondary_light_map: Mutex::new(None),
            finished: Mutex::new(false),
            finished_cond: Condvar::new(),
        });

        let task = Arc::clone(&shared);
        // Held by the job so the pool's workers outlive the caller's handle.
        let workers = Arc::clone(&pool);
        pool.spawn(move || {
            let job = BakeJob {
                inputs: &inputs,
                config: &config,
                shared: &task,
            };
            job.run(terrain_meshes, block_meshes);
            drop(workers);
        });

        Ok(Self { shared })
    }

    /// Current phase.
    pub fn status(&self) -> BakeStatus {
        BakeStatus::from_u8(self.shared.status.load(Ordering::Acquire))
    }

    /// True once both maps are available. Never goes back to false.
    pub fn ready(&self) -> bool {
        self.status() == BakeStatus::Done
    }

    /// Block until the bake is done.
    pub fn wait(&self) {
        let mut finished = self.shared.finished.lock().unwrap_or_else(PoisonError::into_inner);
        while !*finished {
            finished = self
                .shared
                .finished_cond
                .wait(finished)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Fraction of main-map samples shaded, non-decreasing, exactly 1.0 once
    /// sampling is complete.
    pub fn sampling_progress(&self) -> f32 {
        self.shared.primary.fraction()
    }

    /// Fraction of dynamic-light samples shaded. Stays 1.0 when no
    /// dynamic-light map was requested.
    pub fn secondary_sampling_progress(&self) -> f32 {
        self.shared.secondary.fraction()
    }

    /// Take the main map. Empty before [`Self::ready`] and on every call
    /// after the first.
    pub fn light_map(&self) -> LightMap {
        self.take(&self.shared.light_map)
    }

    /// Take the dynamic-light map, under the same rules as
    /// [`Self::light_map`]. Empty when it was not requested.
    pub fn secondary_light_map(&self) -> LightMap {
        self.take(&self.shared.secondary_light_map)
    }

    fn take(&self, slot: &Mutex<Option<Vec<u32>>>) -> LightMap {
        if !self.ready() {
            return LightMap::default();
        }
        let texels = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match texels {
            Some(texels) => LightMap {
                length: self.shared.length,
                texels,
            },
            None => LightMap::default(),
        }
    }
}

/// Partial splat of one triangle: weighted colour and weight per corner.
#[derive(Debug, Clone, Copy)]
struct TriangleSplat {
    color: [Vec3; 3],
    weight: [f32; 3],
}

impl Default for TriangleSplat {
    fn default() -> Self {
        Self {
            color: [Vec3::zeros(); 3],
            weight: [0.0; 3],
        }
    }
}

/// Read-only state of one sampling phase.
struct Pass<'s> {
    scene: &'s InstanceBvh<'s>,
    normals: &'s [Vec3],
    table: &'s SampleTable,
    lights: &'s LightSet,
    ambient: Option<&'s AmbientLighting>,
    progress: &'s Progress,
}

struct BakeJob<'a> {
    inputs: &'a BakeInputs,
    config: &'a BakeConfig,
    shared: &'a Shared,
}

impl BakeJob<'_> {
    fn run(&self, terrain_meshes: Vec<TriangleMesh>, block_meshes: Vec<TriangleMesh>) {
        let started = Instant::now();
        let inputs = self.inputs;
        let samples = self.config.effective_samples();
        log::info!(
            "terrain bake started: {0}x{0} grid, {1} samples per triangle",
            inputs.terrain.length(),
            samples
        );

        let (geometry, normals) = rayon::join(
            || {
                let mut geometry = SceneGeometry::new();
                geometry.add_chunks(terrain_meshes);
                geometry.add_chunks(block_meshes);
                if self.config.include_object_shadows {
                    geometry.add_objects(&inputs.objects, &inputs.layers);
                }
                geometry
            },
            || inputs.terrain.vertex_normals(),
        );
        let instances = geometry.instances();
        let scene = InstanceBvh::build(&instances);
        let table = SampleTable::new(
            samples,
            self.config.effective_ao_samples(),
        );
        log::info!(
            "bake prepared in {:?}: {} instance(s), {} object(s)",
            started.elapsed(),
            instances.len(),
            geometry.object_count()
        );

        let static_lights = LightSet::gather(&inputs.lights, &inputs.global_lights, true);
        let primary = Pass {
            scene: &scene,
            normals: &normals,
            table: &table,
            lights: &static_lights,
            ambient: Some(&inputs.ambient),
            progress: &self.shared.primary,
        };
        let texels = self.bake_map(&primary, BakeStatus::Sampling, BakeStatus::Filtering);
        *self.shared.light_map.lock().unwrap_or_else(PoisonError::into_inner) = Some(texels);

        if self.config.bake_dynamic_lights {
            let dynamic_lights = LightSet::gather(&inputs.lights, &inputs.global_lights, false);
            let secondary = Pass {
                lights: &dynamic_lights,
                ambient: None,
                progress: &self.shared.secondary,
                ..primary
            };
            let texels = self.bake_map(
                &secondary,
                BakeStatus::SamplingSecondary,
                BakeStatus::FilteringSecondary,
            );
            *self
                .shared
                .secondary_light_map
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(texels);
        }

        log::info!("terrain bake finished in {:?}", started.elapsed());
        self.shared.finish();
    }

    fn bake_map(&self, pass: &Pass<'_>, sampling: BakeStatus, filtering: BakeStatus) -> Vec<u32> {
        let phase = Instant::now();
        self.shared.set_status(sampling);
        let rows = self.sample_rows(pass);
        log::info!("{:?} done in {:?}", sampling, phase.elapsed());

        let phase = Instant::now();
        self.shared.set_status(filtering);
        let texels = self.filter(&rows);
        log::info!("{:?} done in {:?}", filtering, phase.elapsed());
        texels
    }

    /// Shade every row. The calling thread and `threads - 1` spawned workers
    /// all claim rows from one counter; each row is written by exactly the
    /// worker that claimed it.
    fn sample_rows(&self, pass: &Pass<'_>) -> Vec<Vec<TriangleSplat>> {
        let terrain = &self.inputs.terrain;
        let row_count = terrain.row_count();
        let rows: Vec<OnceLock<Vec<TriangleSplat>>> = (0..row_count).map(|_| OnceLock::new()).collect();
        let next_row = AtomicUsize::new(0);

        let work = || loop {
            let z = next_row.fetch_add(1, Ordering::Relaxed);
            if z >= row_count {
                return;
            }
            let splats = self.sample_row(pass, z);
            pass.progress.add((splats.len() * pass.table.len()) as u64);
            let stored = rows[z].set(splats);
            debug_assert!(stored.is_ok(), "row {z} sampled twice");
        };

        let workers = rayon::current_num_threads().saturating_sub(1);
        rayon::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| work());
            }
            work();
        });

        rows.into_iter()
            .map(|row| row.into_inner().unwrap_or_default())
            .collect()
    }

    fn sample_row(&self, pass: &Pass<'_>, z: usize) -> Vec<TriangleSplat> {
        let terrain = &self.inputs.terrain;
        let per_row = terrain.row_triangle_count();
        let ao_samples = pass.table.ao_samples();

        let occluded = |origin: &Vec3, direction: &Vec3, max_distance: f32, flags: RayFlags| {
            pass.scene.is_occluded(origin, direction, max_distance, flags)
        };

        let mut splats = Vec::with_capacity(per_row);
        for index in z * per_row..(z + 1) * per_row {
            let corners = terrain.triangle(index);
            let p = corners.map(|(gx, gz)| terrain.position(gx, gz));
            let n = corners.map(|corner| pass.normals[terrain.vertex_index(corner)]);
            let area = (p[1] - p[0]).cross(&(p[2] - p[0])).norm() * 0.5;

            let mut splat = TriangleSplat::default();
            for slot in 0..pass.table.len() {
                let b = pass.table.barycentric(slot);
                let position = p[0] * b[0] + p[1] * b[1] + p[2] * b[2];
                let normal = (n[0] * b[0] + n[1] * b[1] + n[2] * b[2])
                    .try_normalize(0.0)
                    .unwrap_or_else(Vec3::y);

                let mut color = pass.lights.shade(&position, &normal, occluded);

                if let Some(ambient) = pass.ambient {
                    let mut visibility = 1.0;
                    if ao_samples > 0 {
                        let basis = Basis::around(normal);
                        let open = pass
                            .table
                            .ao_directions(slot)
                            .iter()
                            .filter(|local| {
                                let direction = basis.to_world(local);
                                let origin = position + direction * RAY_OFFSET;
                                !occluded(&origin, &direction, f32::MAX, RayFlags::shadow())
                            })
                            .count();
                        visibility = open as f32 / ao_samples as f32;
                    }
                    color += ambient.at(&normal) * visibility;
                }

                for corner in 0..3 {
                    let weight = b[corner] * area;
                    splat.color[corner] += color * weight;
                    splat.weight[corner] += weight;
                }
            }
            splats.push(splat);
        }

        splats
    }

    /// Area-weighted reconstruction onto grid vertices, then packing.
    fn filter(&self, rows: &[Vec<TriangleSplat>]) -> Vec<u32> {
        let terrain = &self.inputs.terrain;
        let length = terrain.length();
        let per_row = terrain.row_triangle_count();
        let mut color = vec![Vec3::zeros(); length * length];
        let mut weight = vec![0.0f32; length * length];

        for (z, row) in rows.iter().enumerate() {
            for (i, splat) in row.iter().enumerate() {
                let corners = terrain.triangle(z * per_row + i);
                for (k, corner) in corners.into_iter().enumerate() {
                    let v = terrain.vertex_index(corner);
                    color[v] += splat.color[k];
                    weight[v] += splat.weight[k];
                }
            }
        }

        color
            .iter()
            .zip(&weight)
            .map(|(c, &w)| {
                let c = if w > 0.0 { *c / w } else { Vec3::zeros() };
                pack_bgra(&c, self.config.srgb_output)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_scene::BlockBox;

    fn pool(threads: usize) -> Arc<ThreadPool> {
        Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        )
    }

    fn linear(config: BakeConfig) -> BakeConfig {
        BakeConfig {
            srgb_output: false,
            ..config
        }
    }

    fn sky(color: Vec3) -> AmbientLighting {
        AmbientLighting {
            ground_color: Vec3::new(0.9, 0.1, 0.1),
            sky_color: color,
        }
    }

    fn bake(inputs: BakeInputs, config: BakeConfig, threads: usize) -> (LightMap, LightMap) {
        let baker = TerrainLightMapBaker::start(Arc::new(inputs), pool(threads), config).unwrap();
        baker.wait();
        assert!(baker.ready());
        (baker.light_map(), baker.secondary_light_map())
    }

    fn hilly_inputs() -> BakeInputs {
        let length = 16;
        let mut heights = Vec::new();
        for z in 0..length {
            for x in 0..length {
                heights.push(((x * 5 + z * 3) % 7) as i16);
            }
        }
        let terrain = Terrain::new(length, 1.0, 0.25, heights).unwrap();
        let mut inputs = BakeInputs::new(terrain, sky(Vec3::new(0.3, 0.4, 0.5)));
        inputs.blocks.boxes.push(BlockBox::axis_aligned(
            Vec3::new(1.0, 4.0, 0.0),
            Vec3::new(2.0, 0.5, 2.0),
        ));
        inputs.global_lights = GlobalLights::new("sun", "");
        inputs.lights.push(Light::new(
            "sun",
            crate::LightKind::Directional(crate::DirectionalLight {
                direction: Vec3::new(0.3, 1.0, 0.2),
            }),
            Vec3::new(0.5, 0.5, 0.4),
        ));
        inputs.lights.push(Light::new(
            "lamp",
            crate::LightKind::Point(crate::PointLight {
                position: Vec3::new(-3.0, 2.0, 2.0),
                range: 6.0,
            }),
            Vec3::new(0.4, 0.2, 0.1),
        ));
        inputs
    }

    #[test]
    fn test_flat_terrain_bakes_pure_sky() {
        let inputs = BakeInputs::new(Terrain::flat(8, 2.0).unwrap(), sky(Vec3::new(0.2, 0.4, 0.6)));
        let config = linear(BakeConfig {
            ambient_occlusion: false,
            ..Default::default()
        });

        let (map, secondary) = bake(inputs, config, 3);
        assert_eq!(map.length, 8);
        assert_eq!(map.texels.len(), 64);
        assert!(map.texels.iter().all(|&t| t == 0xff33_6699));
        assert!(secondary.is_empty());
    }

    #[test]
    fn test_bake_is_deterministic_across_thread_counts() {
        let config = BakeConfig {
            samples_per_triangle: 4,
            ambient_occlusion_samples: 8,
            ..Default::default()
        };
        let (a, _) = bake(hilly_inputs(), config.clone(), 1);
        let (b, _) = bake(hilly_inputs(), config.clone(), 4);
        let (c, _) = bake(hilly_inputs(), config, 4);
        assert_eq!(a.texels.len(), 256);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_block_casts_shadow() {
        let mut inputs = BakeInputs::new(Terrain::flat(16, 1.0).unwrap(), AmbientLighting::default());
        inputs.blocks.boxes.push(BlockBox::axis_aligned(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(2.0, 1.0, 2.0),
        ));
        inputs.global_lights = GlobalLights::new("sun", "");
        inputs.lights.push(Light::new(
            "sun",
            crate::LightKind::Directional(crate::DirectionalLight { direction: Vec3::y() }),
            Vec3::new(0.4, 0.4, 0.4),
        ));
        let config = linear(BakeConfig {
            ambient_occlusion: false,
            samples_per_triangle: 4,
            ..Default::default()
        });

        let (map, _) = bake(inputs.clone(), config.clone(), 2);
        // Grid vertex (8, 7) sits at the world origin, under the block.
        assert_eq!(map.texel(8, 7), 0xff00_0000);
        assert_eq!(map.texel(0, 0), 0xff66_6666);

        let (unshadowed, _) = bake(
            inputs,
            BakeConfig {
                include_block_shadows: false,
                ..config
            },
            2,
        );
        assert_eq!(unshadowed.texel(8, 7), 0xff66_6666);
    }

    #[test]
    fn test_ambient_occlusion_darkens_covered_ground() {
        let mut inputs = BakeInputs::new(Terrain::flat(16, 1.0).unwrap(), sky(Vec3::new(1.0, 1.0, 1.0)));
        inputs.blocks.boxes.push(BlockBox::axis_aligned(
            Vec3::new(0.0, 1.5, 0.0),
            Vec3::new(3.0, 0.5, 3.0),
        ));
        let config = linear(BakeConfig {
            samples_per_triangle: 2,
            ambient_occlusion_samples: 32,
            ..Default::default()
        });

        let (map, _) = bake(inputs, config, 2);
        let covered = map.texel(8, 7) & 0xff;
        let open = map.texel(0, 0) & 0xff;
        assert!(open > 230, "open texel {open} darkened");
        assert!(covered < 128, "covered texel {covered} not darkened");
    }

    #[test]
    fn test_secondary_map_holds_only_dynamic_lights() {
        let mut inputs = BakeInputs::new(Terrain::flat(8, 1.0).unwrap(), sky(Vec3::new(0.6, 0.6, 0.6)));
        inputs.global_lights = GlobalLights::new("", "moon");
        let mut dynamic = Light::new(
            "moon",
            crate::LightKind::Directional(crate::DirectionalLight { direction: Vec3::y() }),
            Vec3::new(0.2, 0.2, 0.2),
        );
        dynamic.is_static = false;
        inputs.lights.push(dynamic);
        let config = linear(BakeConfig {
            ambient_occlusion: false,
            bake_dynamic_lights: true,
            samples_per_triangle: 2,
            ..Default::default()
        });

        let (primary, secondary) = bake(inputs, config, 2);
        assert!(primary.texels.iter().all(|&t| t == 0xff99_9999));
        assert_eq!(secondary.length, 8);
        assert!(secondary.texels.iter().all(|&t| t == 0xff33_3333));
    }

    #[test]
    fn test_progress_and_single_retrieval() {
        let config = BakeConfig {
            samples_per_triangle: 8,
            ambient_occlusion_samples: 16,
            bake_dynamic_lights: true,
            ..Default::default()
        };
        let baker = TerrainLightMapBaker::start(Arc::new(hilly_inputs()), pool(2), config).unwrap();
        let mut last = 0.0;
        while !baker.ready() {
            let progress = baker.sampling_progress();
            assert!(progress >= last);
            assert!(progress <= 1.0);
            last = progress;
            std::thread::yield_now();
        }
        baker.wait();

        assert_eq!(baker.status(), BakeStatus::Done);
        assert_eq!(baker.sampling_progress(), 1.0);
        assert_eq!(baker.secondary_sampling_progress(), 1.0);

        let first = baker.light_map();
        assert_eq!(first.texels.len(), 256);
        assert!(baker.light_map().is_empty());
        assert!(baker.ready());

        assert_eq!(baker.secondary_light_map().texels.len(), 256);
        assert!(baker.secondary_light_map().is_empty());
    }

    #[test]
    fn test_single_vertex_terrain() {
        let inputs = BakeInputs::new(Terrain::flat(1, 1.0).unwrap(), sky(Vec3::new(1.0, 1.0, 1.0)));
        let baker = TerrainLightMapBaker::start(Arc::new(inputs), pool(2), BakeConfig::default()).unwrap();
        baker.wait();
        assert_eq!(baker.sampling_progress(), 1.0);
        assert_eq!(baker.light_map().texels, vec![0xff00_0000]);
    }

    #[test]
    fn test_zero_sample_config_bakes_one_sample() {
        let inputs = BakeInputs::new(Terrain::flat(4, 1.0).unwrap(), sky(Vec3::new(0.2, 0.4, 0.6)));
        let config = linear(BakeConfig {
            samples_per_triangle: 0,
            ambient_occlusion_samples: 0,
            ..Default::default()
        });
        let (map, _) = bake(inputs, config, 1);
        // One sample gives the first corner of each triangle no weight, so a
        // vertex can stay unlit, but every lit vertex sees the sky.
        assert_eq!(map.texels.len(), 16);
        assert!(map.texels.iter().any(|&t| t == 0xff33_6699));
        assert!(map.texels.iter().all(|&t| t == 0xff33_6699 || t == 0xff00_0000));
    }

    #[test]
    fn test_only_two_global_directional_lights_are_baked() {
        let sun = |name: &str, strength: f32| {
            Light::new(
                name,
                crate::LightKind::Directional(crate::DirectionalLight { direction: Vec3::y() }),
                Vec3::new(strength, strength, strength),
            )
        };
        let mut inputs = BakeInputs::new(Terrain::flat(8, 1.0).unwrap(), AmbientLighting::default());
        inputs.global_lights = GlobalLights::new("Sun", "Moon");
        inputs.lights = vec![
            sun("fill", 0.2),
            sun("sun", 0.2),
            sun("MOON", 0.4),
            sun("sun", 0.2),
        ];
        let config = linear(BakeConfig {
            ambient_occlusion: false,
            samples_per_triangle: 2,
            ..Default::default()
        });

        let (map, _) = bake(inputs, config, 2);
        assert!(map.texels.iter().all(|&t| t == 0xff99_9999));
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn test_non_power_of_two_terrain_panics() {
        let inputs = BakeInputs::new(Terrain::flat(12, 1.0).unwrap(), AmbientLighting::default());
        let _ = TerrainLightMapBaker::start(Arc::new(inputs), pool(1), BakeConfig::default());
    }
}
