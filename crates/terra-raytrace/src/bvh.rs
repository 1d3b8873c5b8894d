//! Triangle mesh BVH.
//!
//! Uses a binned Surface Area Heuristic (SAH) for construction and an
//! explicit fixed-size stack for traversal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terra_math::{Aabb, Frustum, Vec3};

use crate::build::{self, BvhNode, Primitives, TRAVERSAL_STACK_SIZE};
use crate::error::{MeshError, Result};
use crate::intersect::frustum::triangle_intersects_frustum;
use crate::intersect::intersect_triangle;
use crate::{Ray, RayFlags, RayHit, TraversalStats};

/// Centroid bins per axis.
const MESH_BINS: usize = 8;

/// Largest vertex count addressable by 16-bit indices.
pub const MAX_MESH_VERTICES: usize = u16::MAX as usize + 1;

/// Positions plus 16-bit index triangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Vertex index triples.
    pub triangles: Vec<[u16; 3]>,
}

impl TriangleMesh {
    /// Validate index data and wrap it.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u16; 3]>) -> Result<Self> {
        if positions.len() > MAX_MESH_VERTICES {
            return Err(MeshError::TooManyVertices(positions.len()));
        }

        for (triangle, tri) in triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count: positions.len(),
                });
            }
        }

        Ok(Self {
            positions,
            triangles,
        })
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// The three corners of triangle `index`.
    #[inline]
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Unnormalized face normal `cross(v1 - v0, v2 - v0)`.
    #[inline]
    pub fn face_normal(&self, index: usize) -> Vec3 {
        let [v0, v1, v2] = self.triangle(index);
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Bounds of all referenced vertices.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }
}

impl Primitives for TriangleMesh {
    fn primitive_count(&self) -> usize {
        self.triangles.len()
    }

    fn primitive_bounds(&self, index: u32) -> Aabb {
        Aabb::from_points(&self.triangle(index as usize))
    }

    fn primitive_centroid(&self, index: u32) -> Vec3 {
        let [v0, v1, v2] = self.triangle(index as usize);
        (v0 + v1 + v2) / 3.0
    }
}

/// Build options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BvhOptions {
    /// Let queries reject triangles facing away from the ray. Terrain and
    /// block meshes are open or double-sided and turn this off.
    pub backface_cull: bool,
}

impl Default for BvhOptions {
    fn default() -> Self {
        Self {
            backface_cull: true,
        }
    }
}

/// Bounding Volume Hierarchy over one mesh's triangles.
///
/// Immutable once built and safe to query from many threads.
#[derive(Debug, Clone)]
pub struct MeshBvh {
    nodes: Vec<BvhNode>,
    permutation: Vec<u32>,
    depth: usize,
    backface_cull: bool,
    mesh: Arc<TriangleMesh>,
}

impl MeshBvh {
    /// Build a BVH over a mesh using SAH construction.
    ///
    /// # Panics
    ///
    /// Panics on internal bookkeeping errors or a tree deeper than the
    /// traversal stack. Indices are only checked in debug builds, use
    /// [`TriangleMesh::new`] for untrusted data.
    pub fn build(mesh: Arc<TriangleMesh>, options: BvhOptions) -> Self {
        debug_assert!(mesh
            .triangles
            .iter()
            .flatten()
            .all(|&i| (i as usize) < mesh.positions.len()));

        let tree = build::build::<_, MESH_BINS>(mesh.as_ref());

        log::debug!(
            "built mesh BVH: {} triangles, {} nodes, depth {}",
            mesh.triangle_count(),
            tree.nodes.len(),
            tree.depth
        );

        Self {
            nodes: tree.nodes,
            permutation: tree.permutation,
            depth: tree.depth,
            backface_cull: options.backface_cull,
            mesh,
        }
    }

    /// The mesh this tree indexes.
    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    /// Bounds of the whole mesh, empty for a mesh without triangles.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map_or_else(Aabb::empty, |root| root.bounds)
    }

    /// True if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node arena; the root is node 0.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Leaf order of triangle indices.
    pub fn permutation(&self) -> &[u32] {
        &self.permutation
    }

    /// Number of nodes after construction.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether backface culling was requested at build time.
    pub fn backface_cull(&self) -> bool {
        self.backface_cull
    }

    /// Every node's box, for drawing the tree.
    pub fn debug_boxes(&self) -> Vec<Aabb> {
        self.nodes.iter().map(|node| node.bounds).collect()
    }

    /// Closest hit closer than `max_distance`.
    pub fn raycast(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        max_distance: f32,
        flags: RayFlags,
    ) -> Option<RayHit> {
        self.raycast_with_stats(
            origin,
            direction,
            max_distance,
            flags,
            &mut TraversalStats::default(),
        )
    }

    /// [`raycast`](Self::raycast), counting the work done into `stats`.
    pub fn raycast_with_stats(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        max_distance: f32,
        flags: RayFlags,
        stats: &mut TraversalStats,
    ) -> Option<RayHit> {
        let root = self.nodes.first()?;
        let ray = Ray::new(*origin, *direction);

        ray.intersect_aabb(&root.bounds, max_distance)?;

        let cull = flags.allow_backface_cull && self.backface_cull;
        let mut closest = max_distance;
        let mut best = None;

        let mut stack = [0u32; TRAVERSAL_STACK_SIZE];
        let mut top = 1;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];
            stats.nodes_visited += 1;

            if node.is_leaf() {
                for &tri in &self.permutation[node.range()] {
                    stats.triangles_tested += 1;

                    let [v0, v1, v2] = self.mesh.triangle(tri as usize);
                    let hit = intersect_triangle(origin, direction, &v0, &v1, &v2);
                    if !hit.is_hit() || hit.t >= closest {
                        continue;
                    }

                    let normal = (v1 - v0).cross(&(v2 - v0));
                    if cull && (-direction).dot(&normal) < 0.0 {
                        continue;
                    }

                    closest = hit.t;
                    best = Some(RayHit {
                        distance: hit.t,
                        normal: normal.normalize(),
                    });

                    if flags.accept_first_hit {
                        return best;
                    }
                }
                continue;
            }

            let left = node.left();
            let right = left + 1;
            let t_left = ray.intersect_aabb(&self.nodes[left].bounds, closest);
            let t_right = ray.intersect_aabb(&self.nodes[right].bounds, closest);

            // Nearer child goes on top so it is visited first.
            match (t_left, t_right) {
                (Some(tl), Some(tr)) => {
                    let (near, far) = if tl <= tr { (left, right) } else { (right, left) };
                    stack[top] = far as u32;
                    stack[top + 1] = near as u32;
                    top += 2;
                }
                (Some(_), None) => {
                    stack[top] = left as u32;
                    top += 1;
                }
                (None, Some(_)) => {
                    stack[top] = right as u32;
                    top += 1;
                }
                (None, None) => {}
            }
        }

        best
    }

    /// Number of triangles the ray crosses, from either side, at any
    /// distance. An odd count means the origin is inside a closed mesh.
    pub fn count_intersections(&self, origin: &Vec3, direction: &Vec3) -> u32 {
        let Some(root) = self.nodes.first() else {
            return 0;
        };
        let ray = Ray::new(*origin, *direction);
        if ray.intersect_aabb(&root.bounds, f32::INFINITY).is_none() {
            return 0;
        }

        let mut count = 0;
        let mut stack = [0u32; TRAVERSAL_STACK_SIZE];
        let mut top = 1;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if node.is_leaf() {
                for &tri in &self.permutation[node.range()] {
                    let [v0, v1, v2] = self.mesh.triangle(tri as usize);
                    if intersect_triangle(origin, direction, &v0, &v1, &v2).is_hit() {
                        count += 1;
                    }
                }
                continue;
            }

            for child in [node.left(), node.left() + 1] {
                if ray
                    .intersect_aabb(&self.nodes[child].bounds, f32::INFINITY)
                    .is_some()
                {
                    stack[top] = child as u32;
                    top += 1;
                }
            }
        }

        count
    }

    /// True if any triangle overlaps the frustum.
    pub fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let mut stack = [0u32; TRAVERSAL_STACK_SIZE];
        let mut top = 1;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];
            if !frustum.intersects_aabb(&node.bounds) {
                continue;
            }

            if node.is_leaf() {
                for &tri in &self.permutation[node.range()] {
                    let [v0, v1, v2] = self.mesh.triangle(tri as usize);
                    if triangle_intersects_frustum(frustum, &v0, &v1, &v2) {
                        return true;
                    }
                }
            } else {
                stack[top] = node.left() as u32;
                stack[top + 1] = node.left() as u32 + 1;
                top += 2;
            }
        }

        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::build::validate;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use terra_math::Mat4;

    /// Axis-aligned cube with outward winding, 8 vertices and 12 triangles.
    pub(crate) fn make_cube(half: f32) -> TriangleMesh {
        let positions = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { -half } else { half },
                    if i & 2 == 0 { -half } else { half },
                    if i & 4 == 0 { -half } else { half },
                )
            })
            .collect();
        let triangles = vec![
            [0, 2, 1], [1, 2, 3], // -z
            [4, 5, 6], [5, 7, 6], // +z
            [0, 1, 4], [1, 5, 4], // -y
            [2, 6, 3], [3, 6, 7], // +y
            [0, 4, 2], [2, 4, 6], // -x
            [1, 3, 5], [3, 7, 5], // +x
        ];
        TriangleMesh::new(positions, triangles).unwrap()
    }

    /// Uniform point in the cube `[lo, hi)³`.
    pub(crate) fn random_vec3(rng: &mut Pcg32, lo: f32, hi: f32) -> Vec3 {
        Vec3::new(rng.gen_range(lo..hi), rng.gen_range(lo..hi), rng.gen_range(lo..hi))
    }

    /// Triangle soup scattered through a box.
    pub(crate) fn random_soup(rng: &mut Pcg32, triangles: usize) -> TriangleMesh {
        let mut positions = Vec::new();
        let mut tris = Vec::new();
        for t in 0..triangles {
            let center = random_vec3(rng, -10.0, 10.0);
            for _ in 0..3 {
                positions.push(center + random_vec3(rng, -1.0, 1.0));
            }
            let base = (t * 3) as u16;
            tris.push([base, base + 1, base + 2]);
        }
        TriangleMesh::new(positions, tris).unwrap()
    }

    fn brute_force(
        mesh: &TriangleMesh,
        origin: &Vec3,
        direction: &Vec3,
        max_distance: f32,
        cull: bool,
    ) -> Option<f32> {
        let mut best: Option<f32> = None;
        for i in 0..mesh.triangle_count() {
            let [v0, v1, v2] = mesh.triangle(i);
            let hit = intersect_triangle(origin, direction, &v0, &v1, &v2);
            if !hit.is_hit() || hit.t >= max_distance {
                continue;
            }
            if cull && (-direction).dot(&mesh.face_normal(i)) < 0.0 {
                continue;
            }
            if best.map_or(true, |b| hit.t < b) {
                best = Some(hit.t);
            }
        }
        best
    }

    #[test]
    fn test_mesh_new_rejects_bad_index() {
        let err = TriangleMesh::new(vec![Vec3::zeros(); 3], vec![[0, 1, 3]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                triangle: 0,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_mesh_new_rejects_too_many_vertices() {
        let err = TriangleMesh::new(vec![Vec3::zeros(); MAX_MESH_VERTICES + 1], Vec::new());
        assert!(matches!(err, Err(MeshError::TooManyVertices(_))));
    }

    #[test]
    fn test_bvh_build_cube() {
        let bvh = MeshBvh::build(Arc::new(make_cube(0.5)), BvhOptions::default());
        validate(bvh.nodes(), bvh.permutation());
        assert!(bvh.node_count() <= 2 * 12 - 1);
        assert!((bvh.bounds().max - Vec3::repeat(0.5)).norm() < 1e-6);
    }

    #[test]
    fn test_bvh_trace_cube() {
        let bvh = MeshBvh::build(Arc::new(make_cube(0.5)), BvhOptions::default());
        let hit = bvh
            .raycast(
                &Vec3::new(0.0, 0.0, 5.0),
                &Vec3::new(0.0, 0.0, -1.0),
                f32::MAX,
                RayFlags::default(),
            )
            .unwrap();
        assert!((hit.distance - 4.5).abs() < 1e-5);
        assert!((hit.normal - Vec3::new(0.0, 0.0, 1.0)).norm() < 1e-5);
    }

    #[test]
    fn test_cube_of_half_size_one_from_above() {
        use approx::assert_relative_eq;

        let bvh = MeshBvh::build(Arc::new(make_cube(1.0)), BvhOptions::default());
        assert_eq!(bvh.mesh().triangle_count(), 12);
        let hit = bvh
            .raycast(
                &Vec3::new(0.0, 0.0, 5.0),
                &Vec3::new(0.0, 0.0, -1.0),
                f32::MAX,
                RayFlags::default(),
            )
            .unwrap();
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_backface_cull_from_inside() {
        let bvh = MeshBvh::build(Arc::new(make_cube(1.0)), BvhOptions::default());
        let origin = Vec3::zeros();
        let dir = Vec3::new(0.0, 0.0, 1.0);

        assert!(bvh.raycast(&origin, &dir, f32::MAX, RayFlags::default()).is_none());

        let hit = bvh.raycast(&origin, &dir, f32::MAX, RayFlags::shadow()).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-5);

        let unculled = MeshBvh::build(
            Arc::new(make_cube(1.0)),
            BvhOptions {
                backface_cull: false,
            },
        );
        assert!(unculled
            .raycast(&origin, &dir, f32::MAX, RayFlags::default())
            .is_some());
    }

    #[test]
    fn test_max_distance_is_exclusive() {
        let bvh = MeshBvh::build(Arc::new(make_cube(0.5)), BvhOptions::default());
        let origin = Vec3::new(0.0, 0.0, 5.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);
        assert!(bvh.raycast(&origin, &dir, 4.5, RayFlags::default()).is_none());
        assert!(bvh.raycast(&origin, &dir, 4.4, RayFlags::default()).is_none());
        assert!(bvh.raycast(&origin, &dir, 4.6, RayFlags::default()).is_some());
    }

    #[test]
    fn test_miss_outside_bounds_visits_nothing() {
        let bvh = MeshBvh::build(Arc::new(make_cube(0.5)), BvhOptions::default());
        let mut stats = TraversalStats::default();
        let hit = bvh.raycast_with_stats(
            &Vec3::new(5.0, 5.0, 5.0),
            &Vec3::new(0.0, 0.0, -1.0),
            f32::MAX,
            RayFlags::default(),
            &mut stats,
        );
        assert!(hit.is_none());
        assert_eq!(stats.triangles_tested, 0);
        assert_eq!(stats.nodes_visited, 0);
    }

    #[test]
    fn test_empty_mesh() {
        let bvh = MeshBvh::build(Arc::new(TriangleMesh::default()), BvhOptions::default());
        assert!(bvh.is_empty());
        assert!(bvh.bounds().is_empty());
        assert!(bvh
            .raycast(&Vec3::zeros(), &Vec3::x(), f32::MAX, RayFlags::default())
            .is_none());
        assert_eq!(bvh.count_intersections(&Vec3::zeros(), &Vec3::x()), 0);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = Pcg32::seed_from_u64(0x1234_5678);
        let mesh = Arc::new(random_soup(&mut rng, 500));
        for cull in [true, false] {
            let bvh = MeshBvh::build(mesh.clone(), BvhOptions { backface_cull: cull });
            validate(bvh.nodes(), bvh.permutation());

            for _ in 0..500 {
                let origin = random_vec3(&mut rng, -15.0, 15.0);
                let target = random_vec3(&mut rng, -8.0, 8.0);
                let dir = (target - origin).normalize();
                let max_distance = rng.gen_range(5.0f32..40.0);

                let expected = brute_force(&mesh, &origin, &dir, max_distance, cull);
                let got = bvh
                    .raycast(&origin, &dir, max_distance, RayFlags::default())
                    .map(|h| h.distance);

                match (expected, got) {
                    (Some(e), Some(g)) => assert!((e - g).abs() < 1e-4, "{e} vs {g}"),
                    (None, None) => {}
                    other => panic!("mismatch {other:?}"),
                }
                if let Some(g) = got {
                    assert!(g < max_distance);
                }
            }
        }
    }

    #[test]
    fn test_accept_first_hit_agrees_on_presence() {
        let mut rng = Pcg32::seed_from_u64(99);
        let mesh = Arc::new(random_soup(&mut rng, 200));
        let bvh = MeshBvh::build(mesh.clone(), BvhOptions::default());

        for _ in 0..300 {
            let origin = random_vec3(&mut rng, -15.0, 15.0);
            let dir = (random_vec3(&mut rng, -8.0, 8.0) - origin).normalize();
            let closest = bvh.raycast(&origin, &dir, f32::MAX, RayFlags::shadow());
            let expected = brute_force(&mesh, &origin, &dir, f32::MAX, false);
            assert_eq!(closest.is_some(), expected.is_some());
            if let (Some(hit), Some(e)) = (closest, expected) {
                assert!(hit.distance >= e - 1e-4);
            }
        }
    }

    #[test]
    fn test_count_intersections_parity() {
        let bvh = MeshBvh::build(Arc::new(make_cube(1.0)), BvhOptions::default());
        let up = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(bvh.count_intersections(&Vec3::new(0.1, 0.2, 0.3), &up), 1);
        assert_eq!(bvh.count_intersections(&Vec3::new(0.1, -5.0, 0.3), &up), 2);
        assert_eq!(bvh.count_intersections(&Vec3::new(0.1, 5.0, 0.3), &up), 0);
    }

    #[test]
    fn test_intersects_frustum() {
        let bvh = MeshBvh::build(Arc::new(make_cube(0.25)), BvhOptions::default());
        let frustum = Frustum::from_inv_view_projection(&Mat4::identity());
        assert!(bvh.intersects_frustum(&frustum));

        let mut moved = make_cube(0.25);
        for p in &mut moved.positions {
            p.x += 10.0;
        }
        let far = MeshBvh::build(Arc::new(moved), BvhOptions::default());
        assert!(!far.intersects_frustum(&frustum));
    }

    #[test]
    fn test_debug_boxes() {
        let mut rng = Pcg32::seed_from_u64(7);
        let bvh = MeshBvh::build(Arc::new(random_soup(&mut rng, 64)), BvhOptions::default());
        let boxes = bvh.debug_boxes();
        assert_eq!(boxes.len(), bvh.node_count());
        for b in &boxes {
            assert!(bvh.bounds().contains(&b.min));
            assert!(bvh.bounds().contains(&b.max));
        }
    }
}
