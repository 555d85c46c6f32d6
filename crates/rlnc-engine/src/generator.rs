//! Coefficient generators.
//!
//! All generators write packed vectors in the layout of [`Field::get_value`]
//! and never emit an all-zero vector. GF(2) positions are uniform bits; for
//! larger fields every selected position receives a uniform non-zero element.

use rand::Rng;

use crate::error::{CodingError, Result};
use crate::field::Field;

/// Uniform non-zero element of `field`.
#[inline]
pub fn random_nonzero<R: Rng + ?Sized>(field: Field, rng: &mut R) -> u16 {
    rng.gen_range(1..=field.max_value())
}

/// Random element for a dense position: a uniform bit over GF(2), a non-zero
/// element otherwise.
#[inline]
fn random_position<R: Rng + ?Sized>(field: Field, rng: &mut R) -> u16 {
    match field {
        Field::Binary => rng.gen::<bool>() as u16,
        _ => random_nonzero(field, rng),
    }
}

// ---------------------------------------------------------------------------
// Uniform
// ---------------------------------------------------------------------------

/// Dense generator used by full vector, on-the-fly and sliding window codes.
#[derive(Debug, Clone)]
pub struct UniformGenerator {
    field: Field,
    count: usize,
}

impl UniformGenerator {
    pub fn new(field: Field, count: usize) -> Self {
        Self { field, count }
    }

    pub fn vector_size(&self) -> usize {
        self.field.elements_size(self.count)
    }

    /// Fill `out` with a random vector over every position.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, out: &mut [u8]) {
        self.generate_over(rng, 0..self.count, out);
    }

    /// Fill `out` with a random vector whose support is limited to `ids`.
    /// `ids` must not be empty.
    pub fn generate_over<R, I>(&self, rng: &mut R, ids: I, out: &mut [u8])
    where
        R: Rng + ?Sized,
        I: Iterator<Item = usize> + Clone,
    {
        debug_assert_eq!(out.len(), self.vector_size());
        loop {
            out.fill(0);
            let mut any = false;
            for i in ids.clone() {
                let v = random_position(self.field, rng);
                any |= v != 0;
                self.field.set_value(out, i, v);
            }
            if any {
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sparse
// ---------------------------------------------------------------------------

pub const DEFAULT_DENSITY: f64 = 0.5;

/// Each position is non-zero with probability `density`.
#[derive(Debug, Clone)]
pub struct SparseGenerator {
    field: Field,
    count: usize,
    density: f64,
}

impl SparseGenerator {
    pub fn new(field: Field, count: usize) -> Self {
        Self {
            field,
            count,
            density: DEFAULT_DENSITY,
        }
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn set_density(&mut self, density: f64) -> Result<()> {
        if !(density > 0.0 && density <= 1.0) {
            return Err(CodingError::InvalidParameters(format!(
                "density {density} must be in (0, 1]"
            )));
        }
        self.density = density;
        Ok(())
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.field.elements_size(self.count));
        out.fill(0);
        let mut any = false;
        for i in 0..self.count {
            if rng.gen_bool(self.density) {
                self.field.set_value(out, i, random_nonzero(self.field, rng));
                any = true;
            }
        }
        if !any {
            let i = rng.gen_range(0..self.count);
            self.field.set_value(out, i, random_nonzero(self.field, rng));
        }
    }
}

// ---------------------------------------------------------------------------
// Perpetual
// ---------------------------------------------------------------------------

/// One banded coefficient vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    pub pivot: usize,
    /// Positions covered, pivot included.
    pub width: usize,
    /// Packed `width-1` coefficients following the pivot.
    pub coefficients: Vec<u8>,
}

/// Banded generator: coefficient 1 at the pivot, random values on the next
/// `width-1` positions. The band is clamped at the end of the generation.
#[derive(Debug, Clone)]
pub struct PerpetualGenerator {
    field: Field,
    symbols: usize,
    width: usize,
    pseudo_systematic: bool,
    pre_charging: bool,
    generated: usize,
}

impl PerpetualGenerator {
    pub fn new(field: Field, symbols: usize) -> Self {
        Self {
            field,
            symbols,
            width: symbols.div_ceil(10).max(1),
            pseudo_systematic: false,
            pre_charging: false,
            generated: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set_width(&mut self, width: usize) -> Result<()> {
        if width == 0 || width > self.symbols {
            return Err(CodingError::InvalidParameters(format!(
                "width {} must be in 1..={}",
                width, self.symbols
            )));
        }
        self.width = width;
        Ok(())
    }

    pub fn width_ratio(&self) -> f64 {
        self.width as f64 / self.symbols as f64
    }

    pub fn set_width_ratio(&mut self, ratio: f64) -> Result<()> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(CodingError::InvalidParameters(format!(
                "width ratio {ratio} must be in (0, 1]"
            )));
        }
        let width = (ratio * self.symbols as f64).ceil() as usize;
        self.width = width.clamp(1, self.symbols);
        Ok(())
    }

    pub fn pseudo_systematic(&self) -> bool {
        self.pseudo_systematic
    }

    pub fn set_pseudo_systematic(&mut self, on: bool) {
        self.pseudo_systematic = on;
        self.generated = 0;
    }

    pub fn pre_charging(&self) -> bool {
        self.pre_charging
    }

    pub fn set_pre_charging(&mut self, on: bool) {
        self.pre_charging = on;
        self.generated = 0;
    }

    /// Pivot for the next vector. Pre-charging emits pivot 0 `width` times,
    /// then 1, 2, ..; pseudo-systematic emits 0, 1, ..; both fall back to a
    /// uniform pivot once the sequence is exhausted.
    fn next_pivot<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let n = self.generated;
        self.generated = self.generated.saturating_add(1);
        if self.pre_charging {
            if n < self.width {
                return 0;
            }
            let p = n + 1 - self.width;
            if p < self.symbols {
                return p;
            }
        } else if self.pseudo_systematic && n < self.symbols {
            return n;
        }
        rng.gen_range(0..self.symbols)
    }

    pub fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Band {
        let pivot = self.next_pivot(rng);
        let width = self.width.min(self.symbols - pivot);
        let mut coefficients = vec![0u8; self.field.elements_size(width - 1)];
        for k in 0..width - 1 {
            let v = random_position(self.field, rng);
            self.field.set_value(&mut coefficients, k, v);
        }
        Band {
            pivot,
            width,
            coefficients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_never_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        for field in Field::ALL {
            let g = UniformGenerator::new(field, 3);
            let mut out = vec![0u8; g.vector_size()];
            for _ in 0..500 {
                g.generate(&mut rng, &mut out);
                assert!(field.first_nonzero(&out, 3).is_some(), "{field}");
            }
        }
    }

    #[test]
    fn test_uniform_large_field_all_nonzero() {
        let mut rng = StdRng::seed_from_u64(2);
        let g = UniformGenerator::new(Field::Binary8, 16);
        let mut out = vec![0u8; 16];
        g.generate(&mut rng, &mut out);
        assert!(out.iter().all(|&b| b != 0));
    }

    #[test]
    fn test_uniform_support_restricted() {
        let mut rng = StdRng::seed_from_u64(3);
        let g = UniformGenerator::new(Field::Binary4, 8);
        let mut out = vec![0u8; g.vector_size()];
        for _ in 0..50 {
            g.generate_over(&mut rng, [1usize, 5].into_iter(), &mut out);
            let support: Vec<_> = Field::Binary4.nonzero_indices(&out, 8).collect();
            assert_eq!(support, vec![1, 5]);
        }
    }

    #[test]
    fn test_sparse_density_bounds() {
        let mut g = SparseGenerator::new(Field::Binary8, 4);
        assert_eq!(g.density(), DEFAULT_DENSITY);
        assert!(g.set_density(0.0).is_err());
        assert!(g.set_density(1.5).is_err());
        assert!(g.set_density(f64::NAN).is_err());
        g.set_density(1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let mut out = vec![0u8; 4];
        g.generate(&mut rng, &mut out);
        assert!(out.iter().all(|&b| b != 0));
    }

    #[test]
    fn test_sparse_low_density_still_nonzero() {
        let mut g = SparseGenerator::new(Field::Binary, 20);
        g.set_density(0.01).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut out = vec![0u8; 3];
        for _ in 0..200 {
            g.generate(&mut rng, &mut out);
            assert!(Field::Binary.first_nonzero(&out, 20).is_some());
        }
    }

    #[test]
    fn test_perpetual_default_width() {
        assert_eq!(PerpetualGenerator::new(Field::Binary8, 24).width(), 3);
        assert_eq!(PerpetualGenerator::new(Field::Binary8, 5).width(), 1);
        assert_eq!(PerpetualGenerator::new(Field::Binary8, 100).width(), 10);
    }

    #[test]
    fn test_perpetual_width_setters() {
        let mut g = PerpetualGenerator::new(Field::Binary8, 24);
        assert!(g.set_width(0).is_err());
        assert!(g.set_width(25).is_err());
        g.set_width(6).unwrap();
        assert_eq!(g.width(), 6);
        g.set_width_ratio(0.2).unwrap();
        assert_eq!(g.width(), 5);
        assert!(g.set_width_ratio(0.0).is_err());
        g.set_width_ratio(1.0).unwrap();
        assert_eq!(g.width(), 24);
        assert!((g.width_ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_perpetual_band_is_clamped() {
        let mut g = PerpetualGenerator::new(Field::Binary8, 10);
        g.set_width(4).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..500 {
            let b = g.generate(&mut rng);
            assert!(b.pivot + b.width <= 10);
            assert_eq!(b.width, 4.min(10 - b.pivot));
            assert_eq!(b.coefficients.len(), b.width - 1);
            assert!(b.coefficients.iter().all(|&c| c != 0));
        }
    }

    #[test]
    fn test_pseudo_systematic_sequence() {
        let mut g = PerpetualGenerator::new(Field::Binary8, 5);
        g.set_pseudo_systematic(true);
        let mut rng = StdRng::seed_from_u64(7);
        let pivots: Vec<_> = (0..5).map(|_| g.generate(&mut rng).pivot).collect();
        assert_eq!(pivots, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pre_charging_wins() {
        let mut g = PerpetualGenerator::new(Field::Binary8, 5);
        g.set_width(2).unwrap();
        g.set_pseudo_systematic(true);
        g.set_pre_charging(true);
        let mut rng = StdRng::seed_from_u64(8);
        let pivots: Vec<_> = (0..6).map(|_| g.generate(&mut rng).pivot).collect();
        assert_eq!(pivots, vec![0, 0, 1, 2, 3, 4]);
    }
}
