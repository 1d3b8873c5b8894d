//! Solid-geometry blocks and their conversion to chunked triangle meshes.
//!
//! Every block except the quad is a unit shape in `[-1, 1]³` scaled by its
//! half extents, rotated, then translated. Quads carry their four corners in
//! world space directly.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use terra_math::{Quat, Vec3};
use terra_raytrace::{TriangleMesh, MAX_MESH_VERTICES};

use crate::error::Result;

/// Side segments of generated cylinders and cones.
pub const ROUND_SEGMENTS: usize = 32;

/// Placement shared by the solid block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockPlacement {
    /// Orientation of the block.
    pub rotation: Quat,
    /// Center of the block.
    pub position: Vec3,
    /// Half extents along the local axes.
    pub size: Vec3,
}

impl BlockPlacement {
    /// Place a block.
    pub fn new(rotation: Quat, position: Vec3, size: Vec3) -> Self {
        Self {
            rotation,
            position,
            size,
        }
    }

    /// An axis-aligned placement.
    pub fn axis_aligned(position: Vec3, size: Vec3) -> Self {
        Self::new(Quat::identity(), position, size)
    }

    fn apply(&self, local: &Vec3) -> Vec3 {
        self.rotation * local.component_mul(&self.size) + self.position
    }
}

/// A box block.
pub type BlockBox = BlockPlacement;

/// A wedge: full bottom and back face, sloping from the top of the back
/// (`z = -1`) down to the bottom of the front (`z = +1`).
pub type BlockRamp = BlockPlacement;

/// A cylinder around the local Y axis.
pub type BlockCylinder = BlockPlacement;

/// A cone around the local Y axis with its apex at `y = +1`.
pub type BlockCone = BlockPlacement;

/// A free quad given by its corners in world space, wound `0 1 2 3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockQuad {
    /// Corner positions.
    pub vertices: [Vec3; 4],
}

/// All solid-geometry blocks of a world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blocks {
    /// Boxes.
    pub boxes: Vec<BlockBox>,
    /// Ramps.
    pub ramps: Vec<BlockRamp>,
    /// Quads.
    pub quads: Vec<BlockQuad>,
    /// Cylinders.
    pub cylinders: Vec<BlockCylinder>,
    /// Cones.
    pub cones: Vec<BlockCone>,
}

impl Blocks {
    /// Total block count over all kinds.
    pub fn len(&self) -> usize {
        self.boxes.len() + self.ramps.len() + self.quads.len() + self.cylinders.len() + self.cones.len()
    }

    /// True when there are no blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every block to world-space triangles, packed into meshes of
    /// at most [`MAX_MESH_VERTICES`] vertices.
    pub fn chunk_meshes(&self) -> Result<Vec<TriangleMesh>> {
        let mut packer = ChunkPacker::default();

        let unit_box = unit_box();
        for block in &self.boxes {
            packer.push(&unit_box, block)?;
        }

        let unit_ramp = unit_ramp();
        for block in &self.ramps {
            packer.push(&unit_ramp, block)?;
        }

        for quad in &self.quads {
            packer.push_world(&quad.vertices, &[[0, 1, 2], [0, 2, 3]])?;
        }

        let unit_cylinder = unit_cylinder(ROUND_SEGMENTS);
        for block in &self.cylinders {
            packer.push(&unit_cylinder, block)?;
        }

        let unit_cone = unit_cone(ROUND_SEGMENTS);
        for block in &self.cones {
            packer.push(&unit_cone, block)?;
        }

        packer.finish()
    }
}

/// Local-space shape template.
#[derive(Debug, Clone)]
struct Shape {
    positions: Vec<Vec3>,
    triangles: Vec<[u16; 3]>,
}

/// Two outward-wound triangles for the quad `a b c d`.
fn quad(a: u16, b: u16, c: u16, d: u16) -> [[u16; 3]; 2] {
    [[a, b, c], [a, c, d]]
}

fn unit_box() -> Shape {
    // Corner `i` has x, y, z set by bits 0, 1, 2.
    let positions = (0..8)
        .map(|i| {
            let axis = |bit: usize| if i & bit != 0 { 1.0 } else { -1.0 };
            Vec3::new(axis(1), axis(2), axis(4))
        })
        .collect();

    let faces = [
        quad(1, 3, 7, 5), // +X
        quad(0, 4, 6, 2), // -X
        quad(2, 6, 7, 3), // +Y
        quad(0, 1, 5, 4), // -Y
        quad(4, 5, 7, 6), // +Z
        quad(0, 2, 3, 1), // -Z
    ];

    Shape {
        positions,
        triangles: faces.concat(),
    }
}

fn unit_ramp() -> Shape {
    let positions = vec![
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
    ];

    let mut triangles = Vec::with_capacity(8);
    triangles.extend(quad(0, 1, 3, 2)); // bottom
    triangles.extend(quad(0, 4, 5, 1)); // back
    triangles.extend(quad(2, 3, 5, 4)); // slope
    triangles.push([0, 2, 4]);
    triangles.push([1, 5, 3]);

    Shape {
        positions,
        triangles,
    }
}

fn ring(segments: usize, y: f32) -> impl Iterator<Item = Vec3> {
    (0..segments).map(move |i| {
        let angle = TAU * i as f32 / segments as f32;
        Vec3::new(angle.cos(), y, angle.sin())
    })
}

fn unit_cylinder(segments: usize) -> Shape {
    let n = segments as u16;
    let mut positions: Vec<Vec3> = ring(segments, -1.0).chain(ring(segments, 1.0)).collect();
    let bottom_center = positions.len() as u16;
    positions.push(Vec3::new(0.0, -1.0, 0.0));
    let top_center = bottom_center + 1;
    positions.push(Vec3::new(0.0, 1.0, 0.0));

    let mut triangles = Vec::with_capacity(segments * 4);
    for i in 0..n {
        let j = (i + 1) % n;
        let (bi, bj, ti, tj) = (i, j, n + i, n + j);
        triangles.extend([[bi, ti, tj], [bi, tj, bj]]);
        triangles.push([top_center, tj, ti]);
        triangles.push([bottom_center, bi, bj]);
    }

    Shape {
        positions,
        triangles,
    }
}

fn unit_cone(segments: usize) -> Shape {
    let n = segments as u16;
    let mut positions: Vec<Vec3> = ring(segments, -1.0).collect();
    let base_center = n;
    positions.push(Vec3::new(0.0, -1.0, 0.0));
    let apex = n + 1;
    positions.push(Vec3::new(0.0, 1.0, 0.0));

    let mut triangles = Vec::with_capacity(segments * 2);
    for i in 0..n {
        let j = (i + 1) % n;
        triangles.push([i, apex, j]);
        triangles.push([base_center, i, j]);
    }

    Shape {
        positions,
        triangles,
    }
}

/// Accumulates world-space triangles, starting a new mesh whenever the next
/// shape would overflow 16-bit indices.
#[derive(Debug, Default)]
struct ChunkPacker {
    meshes: Vec<TriangleMesh>,
    positions: Vec<Vec3>,
    triangles: Vec<[u16; 3]>,
}

impl ChunkPacker {
    fn push(&mut self, shape: &Shape, placement: &BlockPlacement) -> Result<()> {
        let world: Vec<Vec3> = shape.positions.iter().map(|p| placement.apply(p)).collect();
        self.push_world(&world, &shape.triangles)
    }

    fn push_world(&mut self, positions: &[Vec3], triangles: &[[u16; 3]]) -> Result<()> {
        if self.positions.len() + positions.len() > MAX_MESH_VERTICES {
            self.flush()?;
        }

        let base = self.positions.len() as u16;
        self.positions.extend_from_slice(positions);
        self.triangles
            .extend(triangles.iter().map(|tri| tri.map(|i| base + i)));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.triangles.is_empty() {
            return Ok(());
        }

        let positions = std::mem::take(&mut self.positions);
        let triangles = std::mem::take(&mut self.triangles);
        self.meshes.push(TriangleMesh::new(positions, triangles)?);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<TriangleMesh>> {
        self.flush()?;
        Ok(self.meshes)
    }
}
