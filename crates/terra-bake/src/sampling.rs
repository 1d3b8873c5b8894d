//! Deterministic sample sequences and the sample table shared by all rows.

use std::f32::consts::TAU;

use terra_math::{frac, Vec2, Vec3};

/// Plastic number, the generator of the R2 sequence.
pub const R2_GENERATOR: f64 = 1.324_717_957_244_746_025_96;

/// Point `index` of the R2 low-discrepancy sequence in `[0, 1)²`.
///
/// Evaluated in `f64` so large indices keep their spread.
#[inline]
pub fn r2(index: u64) -> Vec2 {
    let a1 = 1.0 / R2_GENERATOR;
    let a2 = 1.0 / (R2_GENERATOR * R2_GENERATOR);
    let n = index as f64;

    Vec2::new(frac(0.5 + a1 * n) as f32, frac(0.5 + a2 * n) as f32)
}

/// Fold a unit-square sample into barycentric weights, uniform over the
/// triangle.
#[inline]
pub fn barycentric(sample: Vec2) -> [f32; 3] {
    let (mut u, mut v) = (sample.x, sample.y);
    if u + v > 1.0 {
        u = 1.0 - u;
        v = 1.0 - v;
    }
    [1.0 - u - v, u, v]
}

/// Cosine-weighted direction on the `+Z` hemisphere.
#[inline]
pub fn cosine_hemisphere(sample: Vec2) -> Vec3 {
    let r = sample.x.sqrt();
    let phi = TAU * sample.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - sample.x).max(0.0).sqrt())
}

/// Tangent frame around a unit normal (Duff et al., branchless).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    /// First tangent.
    pub tangent: Vec3,
    /// Second tangent.
    pub bitangent: Vec3,
    /// The normal.
    pub normal: Vec3,
}

impl Basis {
    /// Build the frame around `normal`.
    #[inline]
    pub fn around(normal: Vec3) -> Self {
        let sign = 1.0f32.copysign(normal.z);
        let a = -1.0 / (sign + normal.z);
        let b = normal.x * normal.y * a;

        Self {
            tangent: Vec3::new(1.0 + sign * normal.x * normal.x * a, sign * b, -sign * normal.x),
            bitangent: Vec3::new(b, sign + normal.y * normal.y * a, -normal.y),
            normal,
        }
    }

    /// Carry a `+Z`-up local direction into the frame.
    #[inline]
    pub fn to_world(&self, local: &Vec3) -> Vec3 {
        self.tangent * local.x + self.bitangent * local.y + self.normal * local.z
    }
}

/// Barycentric sample positions and hemisphere directions, indexed by sample
/// slot. Every triangle uses the same table, so the result does not depend on
/// which worker bakes which row.
#[derive(Debug, Clone)]
pub struct SampleTable {
    barycentrics: Vec<[f32; 3]>,
    ao_directions: Vec<Vec3>,
    ao_samples: usize,
}

impl SampleTable {
    /// Table for `samples` points per triangle with `ao_samples` hemisphere
    /// rays each (zero disables occlusion rays).
    pub fn new(samples: usize, ao_samples: usize) -> Self {
        let barycentrics = (0..samples as u64).map(|i| barycentric(r2(i))).collect();

        // Directions continue the sequence after the positions.
        let offset = samples as u64;
        let ao_directions = (0..(samples * ao_samples) as u64)
            .map(|i| cosine_hemisphere(r2(offset + i)))
            .collect();

        Self {
            barycentrics,
            ao_directions,
            ao_samples,
        }
    }

    /// Samples per triangle.
    pub fn len(&self) -> usize {
        self.barycentrics.len()
    }

    /// True for a table with no samples.
    pub fn is_empty(&self) -> bool {
        self.barycentrics.is_empty()
    }

    /// Barycentric weights of slot `slot`.
    #[inline]
    pub fn barycentric(&self, slot: usize) -> [f32; 3] {
        self.barycentrics[slot]
    }

    /// Local hemisphere directions of slot `slot`; empty without occlusion.
    #[inline]
    pub fn ao_directions(&self, slot: usize) -> &[Vec3] {
        let start = slot * self.ao_samples;
        &self.ao_directions[start..start + self.ao_samples]
    }

    /// Hemisphere rays per sample.
    pub fn ao_samples(&self) -> usize {
        self.ao_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r2_first_points() {
        let p0 = r2(0);
        assert!((p0.x - 0.5).abs() < 1e-7 && (p0.y - 0.5).abs() < 1e-7);

        let p1 = r2(1);
        assert!((p1.x - 0.254_877_8).abs() < 1e-6);
        assert!((p1.y - 0.069_840_3).abs() < 1e-6);
    }

    #[test]
    fn test_r2_fills_unit_square() {
        // Every cell of a 4x4 grid receives points early on.
        let mut cells = [0u32; 16];
        for i in 0..64 {
            let p = r2(i);
            assert!((0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y));
            cells[(p.x * 4.0) as usize + 4 * (p.y * 4.0) as usize] += 1;
        }
        assert!(cells.iter().all(|&c| c > 0));
    }

    #[test]
    fn test_barycentric_folds_into_triangle() {
        let b = barycentric(Vec2::new(0.75, 0.5));
        assert!((b[1] - 0.25).abs() < 1e-6);
        assert!((b[2] - 0.5).abs() < 1e-6);
        for i in 0..256 {
            let b = barycentric(r2(i));
            assert!(b.iter().all(|&w| w >= -1e-6));
            assert!((b.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cosine_hemisphere_is_unit_and_up() {
        for i in 0..256 {
            let d = cosine_hemisphere(r2(i));
            assert!((d.norm() - 1.0).abs() < 1e-5);
            assert!(d.z >= 0.0);
        }
        assert!((cosine_hemisphere(Vec2::new(0.0, 0.3)) - Vec3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let normals = [
            Vec3::y(),
            Vec3::z(),
            -Vec3::z(),
            Vec3::new(0.3, 0.8, -0.2).normalize(),
            Vec3::new(-0.6, 0.1, 0.7).normalize(),
        ];
        for n in normals {
            let basis = Basis::around(n);
            assert!((basis.tangent.norm() - 1.0).abs() < 1e-5);
            assert!((basis.bitangent.norm() - 1.0).abs() < 1e-5);
            assert!(basis.tangent.dot(&basis.bitangent).abs() < 1e-5);
            assert!(basis.tangent.dot(&n).abs() < 1e-5);
            assert!(basis.bitangent.dot(&n).abs() < 1e-5);
            assert!((basis.to_world(&Vec3::z()) - n).norm() < 1e-6);
        }
    }

    #[test]
    fn test_sample_table_layout() {
        let table = SampleTable::new(4, 3);
        assert_eq!(table.len(), 4);
        assert_eq!(table.ao_directions(3).len(), 3);
        assert_eq!(table.ao_directions(1)[0], cosine_hemisphere(r2(4 + 3)));
        assert_eq!(table.barycentric(0), [0.0, 0.5, 0.5]);

        let no_ao = SampleTable::new(4, 0);
        assert!(no_ao.ao_directions(2).is_empty());
    }
}
