//! Binned SAH construction shared by both BVH kinds.
//!
//! Nodes live in one flat arena indexed by `u32`. The builder is an
//! iterative worklist: node `i` is processed once, and any split appends its
//! two children at the end of the used range, so the loop reaches them
//! later without recursion.

use terra_math::{Aabb, Vec3};

/// Depth of the fixed traversal stack. Build asserts that every tree fits.
pub const TRAVERSAL_STACK_SIZE: usize = 64;

/// A BVH node: a box plus `(left_child_or_first_primitive, primitive_count)`.
///
/// `count > 0` marks a leaf owning `permutation[first..first + count]`;
/// `count == 0` marks an interior node with children at `left` and
/// `left + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    /// Bounds of everything below this node.
    pub bounds: Aabb,
    /// First permutation slot for leaves, left child index otherwise.
    pub left_or_first: u32,
    /// Primitive count for leaves, zero for interior nodes.
    pub count: u32,
}

impl Default for BvhNode {
    fn default() -> Self {
        Self {
            bounds: Aabb::empty(),
            left_or_first: 0,
            count: 0,
        }
    }
}

impl BvhNode {
    /// True for leaves.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    /// Permutation slots owned by a leaf.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        let first = self.left_or_first as usize;
        first..first + self.count as usize
    }

    /// Index of the left child of an interior node.
    #[inline]
    pub fn left(&self) -> usize {
        self.left_or_first as usize
    }
}

/// The primitives a tree is built over.
pub(crate) trait Primitives {
    fn primitive_count(&self) -> usize;
    fn primitive_bounds(&self, index: u32) -> Aabb;
    fn primitive_centroid(&self, index: u32) -> Vec3;
}

/// Output of [`build`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Tree {
    pub nodes: Vec<BvhNode>,
    pub permutation: Vec<u32>,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct Bin {
    count: u32,
    bounds: Aabb,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            count: 0,
            bounds: Aabb::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    axis: usize,
    position: f32,
    cost: f32,
}

/// Build a tree with `BINS` equal-width centroid bins per axis.
///
/// # Panics
///
/// Panics if node bookkeeping exceeds `2N - 1` nodes or the finished tree
/// is deeper than [`TRAVERSAL_STACK_SIZE`]. Both are internal bugs, not
/// input errors.
pub(crate) fn build<P: Primitives, const BINS: usize>(primitives: &P) -> Tree {
    let n = primitives.primitive_count();
    if n == 0 {
        return Tree::default();
    }
    assert!(n <= u32::MAX as usize / 2, "too many primitives for a BVH: {n}");

    let centroids: Vec<Vec3> = (0..n as u32).map(|i| primitives.primitive_centroid(i)).collect();
    let mut permutation: Vec<u32> = (0..n as u32).collect();

    let capacity = 2 * n - 1;
    let mut nodes = vec![BvhNode::default(); capacity];
    let mut depths = vec![0usize; capacity];
    nodes[0] = BvhNode {
        bounds: Aabb::empty(),
        left_or_first: 0,
        count: n as u32,
    };

    let mut nodes_used = 1;
    let mut i = 0;

    while i < nodes_used {
        let range = nodes[i].range();
        let first = range.start;

        let mut bounds = Aabb::empty();
        for &prim in &permutation[range.clone()] {
            bounds.merge(&primitives.primitive_bounds(prim));
        }
        nodes[i].bounds = bounds;

        let slice = &mut permutation[range];
        if let Some(split) = find_split::<P, BINS>(primitives, &centroids, slice, &bounds) {
            let mid = partition(slice, &centroids, split.axis, split.position);

            if mid != 0 && mid != slice.len() {
                assert!(
                    nodes_used + 2 <= capacity,
                    "BVH node capacity {capacity} exceeded"
                );

                let left = nodes_used;
                let count = slice.len();
                nodes_used += 2;

                nodes[left] = BvhNode {
                    bounds: Aabb::empty(),
                    left_or_first: first as u32,
                    count: mid as u32,
                };
                nodes[left + 1] = BvhNode {
                    bounds: Aabb::empty(),
                    left_or_first: (first + mid) as u32,
                    count: (count - mid) as u32,
                };
                depths[left] = depths[i] + 1;
                depths[left + 1] = depths[i] + 1;

                nodes[i].left_or_first = left as u32;
                nodes[i].count = 0;
            }
        }

        i += 1;
    }

    nodes.truncate(nodes_used);
    nodes.shrink_to_fit();

    let depth = depths[..nodes_used].iter().copied().max().unwrap_or(0);
    assert!(
        depth < TRAVERSAL_STACK_SIZE,
        "BVH depth {depth} exceeds the traversal stack"
    );

    Tree {
        nodes,
        permutation,
        depth,
    }
}

/// Cheapest split of `slice` across all axes, if any beats keeping a leaf.
fn find_split<P: Primitives, const BINS: usize>(
    primitives: &P,
    centroids: &[Vec3],
    slice: &[u32],
    bounds: &Aabb,
) -> Option<Split> {
    let leaf_cost = slice.len() as f32 * bounds.area();
    let mut best: Option<Split> = None;

    for axis in 0..3 {
        let mut c_min = f32::INFINITY;
        let mut c_max = f32::NEG_INFINITY;
        for &prim in slice {
            let c = centroids[prim as usize][axis];
            c_min = c_min.min(c);
            c_max = c_max.max(c);
        }
        if c_min == c_max {
            continue;
        }

        let mut bins = [Bin::default(); BINS];
        let scale = BINS as f32 / (c_max - c_min);
        for &prim in slice {
            let c = centroids[prim as usize][axis];
            let b = (((c - c_min) * scale) as usize).min(BINS - 1);
            bins[b].count += 1;
            bins[b].bounds.merge(&primitives.primitive_bounds(prim));
        }

        // Prefix sums from the left, suffix sums from the right.
        let mut left_count = [0u32; BINS];
        let mut left_area = [0f32; BINS];
        let mut right_count = [0u32; BINS];
        let mut right_area = [0f32; BINS];

        let mut acc_bounds = Aabb::empty();
        let mut acc_count = 0;
        for b in 0..BINS - 1 {
            acc_count += bins[b].count;
            acc_bounds.merge(&bins[b].bounds);
            left_count[b] = acc_count;
            left_area[b] = acc_bounds.area();
        }

        let mut acc_bounds = Aabb::empty();
        let mut acc_count = 0;
        for b in (1..BINS).rev() {
            acc_count += bins[b].count;
            acc_bounds.merge(&bins[b].bounds);
            right_count[b - 1] = acc_count;
            right_area[b - 1] = acc_bounds.area();
        }

        let bin_width = (c_max - c_min) / BINS as f32;
        for b in 0..BINS - 1 {
            if left_count[b] == 0 || right_count[b] == 0 {
                continue;
            }

            let cost = left_count[b] as f32 * left_area[b] + right_count[b] as f32 * right_area[b];
            if cost < best.map_or(leaf_cost, |s| s.cost) {
                best = Some(Split {
                    axis,
                    position: c_min + bin_width * (b + 1) as f32,
                    cost,
                });
            }
        }
    }

    best
}

/// Two-pointer partition: primitives with centroid below `position` move to
/// the front. Returns the size of the front group.
fn partition(slice: &mut [u32], centroids: &[Vec3], axis: usize, position: f32) -> usize {
    let mut left = 0;
    let mut right = slice.len();

    while left < right {
        if centroids[slice[left] as usize][axis] < position {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }

    left
}

/// Check the structural invariants of a finished tree: `2N - 1` node bound,
/// leaves tile the permutation exactly once, interior children in range.
#[cfg(test)]
pub(crate) fn validate(nodes: &[BvhNode], permutation: &[u32]) {
    let n = permutation.len();
    if n == 0 {
        assert!(nodes.is_empty());
        return;
    }
    assert!(nodes.len() <= 2 * n - 1);

    let mut slot_owned = vec![false; n];
    let mut seen = vec![false; n];
    let mut stack = vec![0usize];
    let mut reached = 0;

    while let Some(i) = stack.pop() {
        reached += 1;
        let node = &nodes[i];
        if node.is_leaf() {
            for slot in node.range() {
                assert!(!slot_owned[slot], "permutation slot {slot} in two leaves");
                slot_owned[slot] = true;
                let prim = permutation[slot] as usize;
                assert!(!seen[prim], "primitive {prim} appears twice");
                seen[prim] = true;
            }
        } else {
            assert!(node.left() + 1 < nodes.len());
            assert!(node.left() > i);
            stack.push(node.left());
            stack.push(node.left() + 1);
        }
    }

    assert_eq!(reached, nodes.len(), "unreachable nodes in arena");
    assert!(slot_owned.iter().all(|&s| s));
    assert!(seen.iter().all(|&s| s));
}
