//! Dense, grid-indexed spectral vectors.

use crate::grid::WavelengthGrid;
use serde::{Deserialize, Serialize};

/// A fixed-length vector of real values, one per sample of a [`WavelengthGrid`].
///
/// `Spectrum` never stores a reference to the grid it was built against;
/// operations that need wavelength values (e.g. [`Spectrum::value_at_wavelength`])
/// take the grid as an explicit parameter instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    values: Vec<f32>,
}

impl Spectrum {
    /// A zero spectrum over a grid of the given length.
    pub fn zero(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// A constant spectrum over a grid of the given length.
    pub fn constant(len: usize, value: f32) -> Self {
        Self {
            values: vec![value; len],
        }
    }

    pub fn from_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// In-place `self += other`. Panics (debug) if lengths differ.
    pub fn add_assign(&mut self, other: &Spectrum) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.values.iter_mut().zip(other.values.iter()) {
            *a += b;
        }
    }

    pub fn added(&self, other: &Spectrum) -> Spectrum {
        let mut out = self.clone();
        out.add_assign(other);
        out
    }

    /// In-place `self *= other` (per-sample, the Kubelka-Munk / texture-modulation case).
    pub fn mul_assign_spectrum(&mut self, other: &Spectrum) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.values.iter_mut().zip(other.values.iter()) {
            *a *= b;
        }
    }

    /// In-place scalar multiply.
    pub fn scale_assign(&mut self, factor: f32) {
        for v in self.values.iter_mut() {
            *v *= factor;
        }
    }

    pub fn scaled(&self, factor: f32) -> Spectrum {
        let mut out = self.clone();
        out.scale_assign(factor);
        out
    }

    /// Returns the value at the nearest-floor grid index for `wavelength`.
    pub fn value_at_wavelength(&self, grid: &WavelengthGrid, wavelength: f32) -> f32 {
        self.values[grid.nearest_floor_index(wavelength)]
    }

    /// Divides every sample by the maximum sample value. No-op if the max is zero.
    pub fn normalize_max(&mut self) {
        let max = self.values.iter().cloned().fold(0.0f32, f32::max);
        if max != 0.0 {
            self.scale_assign(1.0 / max);
        }
    }

    /// Divides every sample by the value at 560nm (peak human luminous efficiency).
    /// No-op if that value is zero.
    pub fn normalize_at_560(&mut self, grid: &WavelengthGrid) {
        let reference = self.value_at_wavelength(grid, 560.0);
        if reference != 0.0 {
            self.scale_assign(1.0 / reference);
        }
    }

    /// Divides every sample by the sum of all samples, so the spectrum sums to 1.
    /// No-op if the sum is zero.
    pub fn normalize_power(&mut self) {
        let sum: f32 = self.values.iter().sum();
        if sum != 0.0 {
            self.scale_assign(1.0 / sum);
        }
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    pub fn max(&self) -> f32 {
        self.values.iter().cloned().fold(0.0f32, f32::max)
    }
}

impl std::ops::Index<usize> for Spectrum {
    type Output = f32;
    #[inline]
    fn index(&self, index: usize) -> &f32 {
        &self.values[index]
    }
}

impl std::ops::IndexMut<usize> for Spectrum {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> WavelengthGrid {
        WavelengthGrid::new(vec![400.0, 450.0, 500.0, 560.0, 600.0, 700.0]).unwrap()
    }

    #[test]
    fn zero_plus_s_equals_s() {
        let s = Spectrum::from_values(vec![1.0, 2.0, 3.0]);
        let mut z = Spectrum::zero(3);
        z.add_assign(&s);
        assert_eq!(z, s);
    }

    #[test]
    fn s_plus_s_equals_2s() {
        let s = Spectrum::from_values(vec![1.0, 2.0, 3.0]);
        let doubled = s.added(&s);
        assert_eq!(doubled, Spectrum::from_values(vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn scale_round_trip() {
        let s = Spectrum::from_values(vec![1.0, 2.0, 3.0, 4.0]);
        let back = s.scaled(3.7).scaled(1.0 / 3.7);
        for (a, b) in s.as_slice().iter().zip(back.as_slice().iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn value_at_wavelength_floors_between_samples() {
        let g = grid();
        let s = Spectrum::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(s.value_at_wavelength(&g, 560.0), 4.0);
        assert_eq!(s.value_at_wavelength(&g, 590.0), 4.0);
        assert_eq!(s.value_at_wavelength(&g, 601.0), 5.0);
    }

    #[test]
    fn normalize_power_sums_to_one() {
        let mut s = Spectrum::from_values(vec![1.0, 1.0, 2.0]);
        s.normalize_power();
        assert!((s.sum() - 1.0).abs() < 1e-5);
    }
}
