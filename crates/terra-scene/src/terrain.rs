//! Height-grid terrain and its triangulation.
//!
//! The grid is `length × length` vertices. Quads alternate their diagonal by
//! row so the triangulation has no directional bias:
//!
//! ```text
//!  odd z:  (x,z) (x,z+1) (x+1,z)  +  (x,z+1) (x+1,z+1) (x+1,z)
//! even z:  (x,z) (x+1,z+1) (x+1,z)  +  (x,z) (x,z+1) (x+1,z+1)
//! ```

use serde::{Deserialize, Serialize};
use terra_math::Vec3;
use terra_raytrace::TriangleMesh;

use crate::error::{Result, SceneError};

/// Quads per chunk side. A chunk then holds at most 256 × 256 vertices,
/// exactly what 16-bit indices address. Neighbouring chunks share their
/// border row of vertices.
pub const CHUNK_QUADS: usize = 255;

/// Grid coordinates of a vertex.
pub type GridPoint = (usize, usize);

/// A square height field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    length: usize,
    /// World units between neighbouring grid vertices.
    pub grid_scale: f32,
    /// World units per height step.
    pub height_scale: f32,
    heights: Vec<i16>,
}

impl Terrain {
    /// Wrap a row-major height array (`heights[z * length + x]`).
    pub fn new(length: usize, grid_scale: f32, height_scale: f32, heights: Vec<i16>) -> Result<Self> {
        if length == 0 {
            return Err(SceneError::EmptyTerrain);
        }
        let expected = length * length;
        if heights.len() != expected {
            return Err(SceneError::HeightCount {
                length,
                expected,
                actual: heights.len(),
            });
        }

        Ok(Self {
            length,
            grid_scale,
            height_scale,
            heights,
        })
    }

    /// A terrain with every height zero.
    pub fn flat(length: usize, grid_scale: f32) -> Result<Self> {
        Self::new(length, grid_scale, 1.0, vec![0; length * length])
    }

    /// Vertices per side.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Raw height at a grid vertex.
    #[inline]
    pub fn height(&self, x: usize, z: usize) -> i16 {
        self.heights[z * self.length + x]
    }

    /// Set the raw height at a grid vertex.
    pub fn set_height(&mut self, x: usize, z: usize, height: i16) {
        self.heights[z * self.length + x] = height;
    }

    /// Index of a grid vertex in row-major order.
    #[inline]
    pub fn vertex_index(&self, (x, z): GridPoint) -> usize {
        z * self.length + x
    }

    /// World position of a grid vertex. The grid is centered on the origin.
    #[inline]
    pub fn position(&self, x: usize, z: usize) -> Vec3 {
        let half = self.length as f32 / 2.0;
        Vec3::new(
            (x as f32 - half) * self.grid_scale,
            self.height(x, z) as f32 * self.height_scale,
            (z as f32 - half + 1.0) * self.grid_scale,
        )
    }

    /// Number of triangles per grid row.
    #[inline]
    pub fn row_triangle_count(&self) -> usize {
        2 * (self.length - 1)
    }

    /// Number of triangle rows (quad rows).
    #[inline]
    pub fn row_count(&self) -> usize {
        self.length - 1
    }

    /// Total triangles, `2 (length - 1)²`.
    pub fn triangle_count(&self) -> usize {
        self.row_triangle_count() * self.row_count()
    }

    /// Grid corners of triangle `k` (0 or 1) of the quad at `(x, z)`.
    #[inline]
    pub fn quad_triangle(x: usize, z: usize, k: usize) -> [GridPoint; 3] {
        match (z % 2 == 1, k) {
            (true, 0) => [(x, z), (x, z + 1), (x + 1, z)],
            (true, _) => [(x, z + 1), (x + 1, z + 1), (x + 1, z)],
            (false, 0) => [(x, z), (x + 1, z + 1), (x + 1, z)],
            (false, _) => [(x, z), (x, z + 1), (x + 1, z + 1)],
        }
    }

    /// Grid corners of triangle `index`, numbered row by row.
    #[inline]
    pub fn triangle(&self, index: usize) -> [GridPoint; 3] {
        let per_row = self.row_triangle_count();
        let z = index / per_row;
        let in_row = index % per_row;
        Self::quad_triangle(in_row / 2, z, in_row % 2)
    }

    /// World positions of triangle `index`.
    #[inline]
    pub fn triangle_positions(&self, index: usize) -> [Vec3; 3] {
        self.triangle(index).map(|(x, z)| self.position(x, z))
    }

    /// Smooth per-vertex normals: area-weighted sum of adjacent face
    /// normals, normalized. Row-major like the heights.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::zeros(); self.length * self.length];

        for index in 0..self.triangle_count() {
            let corners = self.triangle(index);
            let [v0, v1, v2] = corners.map(|(x, z)| self.position(x, z));
            let face = (v1 - v0).cross(&(v2 - v0));

            for corner in corners {
                normals[self.vertex_index(corner)] += face;
            }
        }

        for n in &mut normals {
            *n = n.try_normalize(0.0).unwrap_or_else(Vec3::y);
        }

        normals
    }

    /// Triangulate the grid into meshes of at most 256 × 256 vertices.
    pub fn chunk_meshes(&self) -> Result<Vec<TriangleMesh>> {
        let quads = self.length - 1;
        let mut meshes = Vec::new();

        for cz in (0..quads).step_by(CHUNK_QUADS) {
            for cx in (0..quads).step_by(CHUNK_QUADS) {
                let width = CHUNK_QUADS.min(quads - cx);
                let depth = CHUNK_QUADS.min(quads - cz);
                meshes.push(self.chunk_mesh(cx, cz, width, depth)?);
            }
        }

        Ok(meshes)
    }

    fn chunk_mesh(&self, cx: usize, cz: usize, width: usize, depth: usize) -> Result<TriangleMesh> {
        let stride = width + 1;
        let mut positions = Vec::with_capacity(stride * (depth + 1));
        for z in cz..=cz + depth {
            for x in cx..=cx + width {
                positions.push(self.position(x, z));
            }
        }

        let local = |(x, z): GridPoint| ((z - cz) * stride + (x - cx)) as u16;
        let mut triangles = Vec::with_capacity(width * depth * 2);
        for z in cz..cz + depth {
            for x in cx..cx + width {
                for k in 0..2 {
                    triangles.push(Self::quad_triangle(x, z, k).map(local));
                }
            }
        }

        Ok(TriangleMesh::new(positions, triangles)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sloped(length: usize) -> Terrain {
        let mut heights = Vec::new();
        for z in 0..length {
            for x in 0..length {
                heights.push((x * 3 + z * 7) as i16 % 11);
            }
        }
        Terrain::new(length, 2.0, 0.5, heights).unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_height_count() {
        let err = Terrain::new(4, 1.0, 1.0, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            SceneError::HeightCount {
                length: 4,
                expected: 16,
                actual: 15
            }
        );
        assert_eq!(Terrain::new(0, 1.0, 1.0, Vec::new()).unwrap_err(), SceneError::EmptyTerrain);
    }

    #[test]
    fn test_position_is_centered() {
        let mut terrain = Terrain::flat(8, 2.0).unwrap();
        terrain.set_height(4, 3, 10);
        terrain.height_scale = 0.25;
        let p = terrain.position(4, 3);
        assert_eq!(p, Vec3::new(0.0, 2.5, 0.0));
        assert_eq!(terrain.position(0, 0), Vec3::new(-8.0, 0.0, -6.0));
    }

    #[test]
    fn test_odd_length_uses_fractional_half() {
        let terrain = Terrain::flat(1, 2.0).unwrap();
        assert_eq!(terrain.position(0, 0), Vec3::new(-1.0, 0.0, 1.0));

        let terrain = Terrain::flat(3, 1.0).unwrap();
        assert_eq!(terrain.position(0, 0), Vec3::new(-1.5, 0.0, -0.5));
        assert_eq!(terrain.position(2, 2), Vec3::new(0.5, 0.0, 1.5));
    }

    #[test]
    fn test_triangles_face_up() {
        let terrain = Terrain::flat(4, 1.0).unwrap();
        assert_eq!(terrain.triangle_count(), 18);
        for i in 0..terrain.triangle_count() {
            let [v0, v1, v2] = terrain.triangle_positions(i);
            let n = (v1 - v0).cross(&(v2 - v0));
            assert!(n.y > 0.0, "triangle {i} faces down");
        }
    }

    #[test]
    fn test_triangles_tile_each_quad() {
        let terrain = Terrain::flat(4, 1.0).unwrap();
        let mut area = 0.0;
        for i in 0..terrain.triangle_count() {
            let [v0, v1, v2] = terrain.triangle_positions(i);
            area += (v1 - v0).cross(&(v2 - v0)).norm() * 0.5;
        }
        approx::assert_relative_eq!(area, 9.0, epsilon = 1e-5);
    }

    #[test]
    fn test_flat_normals_point_up() {
        let terrain = Terrain::flat(8, 1.0).unwrap();
        for n in terrain.vertex_normals() {
            assert!((n - Vec3::y()).norm() < 1e-6);
        }
    }

    #[test]
    fn test_sloped_normals_are_unit() {
        let terrain = sloped(16);
        for n in terrain.vertex_normals() {
            assert!((n.norm() - 1.0).abs() < 1e-5);
            assert!(n.y > 0.0);
        }
    }

    #[test]
    fn test_single_chunk() {
        let terrain = sloped(16);
        let chunks = terrain.chunk_meshes().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].positions.len(), 256);
        assert_eq!(chunks[0].triangle_count(), terrain.triangle_count());
    }

    #[test]
    fn test_chunks_cover_large_terrain() {
        let terrain = Terrain::flat(512, 1.0).unwrap();
        let chunks = terrain.chunk_meshes().unwrap();
        // 511 quads per side split as 255 + 255 + 1.
        assert_eq!(chunks.len(), 9);

        let total: usize = chunks.iter().map(TriangleMesh::triangle_count).sum();
        assert_eq!(total, terrain.triangle_count());
        for chunk in &chunks {
            assert!(chunk.positions.len() <= 65536);
        }
    }

    #[test]
    fn test_single_vertex_terrain() {
        let terrain = Terrain::flat(1, 1.0).unwrap();
        assert_eq!(terrain.triangle_count(), 0);
        assert!(terrain.chunk_meshes().unwrap().is_empty());
        assert_eq!(terrain.vertex_normals(), vec![Vec3::y()]);
    }
}
