//! The angle-indexed reflectance table shared by `RegularBRDF`, `BeckmannBRDF`,
//! `AlloyBRDF` and `MetalW` (spec.md §4.2: "given cosθᵢ, compute
//! `k = 2·acos(cosθᵢ)·M/π` for M table rows, linearly interpolate between
//! rows `⌊k⌋` and `⌊k⌋+1`"). Grounded on `RegularBRDF::getReflectance` in
//! `original_source/sources/src/materials/RegularBRDF.cpp`.

use lumen_core::prelude::*;

/// `M` rows of `(R⊥, R∥)` spectra, one row per equally spaced incidence
/// angle from 0 to π/2.
#[derive(Clone, Debug)]
pub struct AngleTable {
    r_orth: Vec<Spectrum>,
    r_para: Vec<Spectrum>,
}

impl AngleTable {
    pub fn new(r_orth: Vec<Spectrum>, r_para: Vec<Spectrum>) -> Self {
        debug_assert_eq!(r_orth.len(), r_para.len());
        debug_assert!(!r_orth.is_empty());
        Self { r_orth, r_para }
    }

    /// Builds a table by sampling a dielectric Fresnel formula at `rows`
    /// equally spaced angles, for use by materials defined by a refractive
    /// index rather than by measured tables (Regular/Beckmann/AlloyBRDF as
    /// specialized over a complex-index metal, MetalW).
    pub fn from_fresnel(grid: &WavelengthGrid, n: &Spectrum, k: &Spectrum, rows: usize) -> Self {
        let rows = rows.max(2);
        let mut r_orth = Vec::with_capacity(rows);
        let mut r_para = Vec::with_capacity(rows);
        for row in 0..rows {
            let theta = row as f32 / (rows - 1) as f32 * std::f32::consts::FRAC_PI_2;
            let cos_oi = theta.cos().max(1.0e-4);
            let mut orth = Spectrum::zero(grid.len());
            let mut para = Spectrum::zero(grid.len());
            for i in 0..grid.len() {
                let kappa = if n[i] > 0.0 { k[i] / n[i] } else { 0.0 };
                let (ro, rp) = crate::fresnel::fresnel_reflectance(cos_oi, n[i], kappa);
                orth[i] = ro;
                para[i] = rp;
            }
            r_orth.push(orth);
            r_para.push(para);
        }
        Self { r_orth, r_para }
    }

    /// Linearly blends two tables of identical shape by `coeff` (the first
    /// table's share; the second gets `1 - coeff`), used by `AlloyBRDF` to
    /// combine two metals' tabulated Fresnel response by concentration.
    pub fn blended(first: &AngleTable, second: &AngleTable, coeff: f32) -> Self {
        debug_assert_eq!(first.rows(), second.rows());
        let r_orth = first
            .r_orth
            .iter()
            .zip(second.r_orth.iter())
            .map(|(a, b)| blend_spectrum(a, b, coeff))
            .collect();
        let r_para = first
            .r_para
            .iter()
            .zip(second.r_para.iter())
            .map(|(a, b)| blend_spectrum(a, b, coeff))
            .collect();
        Self { r_orth, r_para }
    }

    pub fn rows(&self) -> usize {
        self.r_orth.len()
    }

    /// `1 - r` per entry of every row, for a material that models
    /// transmittance as whatever reflectance doesn't claim at `k = 0` (no
    /// internal absorption modeled by the table itself) — used by
    /// [`super::refractive::RefractiveBRDF::dielectric`].
    pub fn complement(&self) -> AngleTable {
        fn complement_spectrum(s: &Spectrum) -> Spectrum {
            let mut out = s.clone();
            for v in out.as_mut_slice() {
                *v = 1.0 - *v;
            }
            out
        }
        Self {
            r_orth: self.r_orth.iter().map(complement_spectrum).collect(),
            r_para: self.r_para.iter().map(complement_spectrum).collect(),
        }
    }

    /// Linearly interpolates `(R⊥, R∥)` at wavelength index `band` for the
    /// incidence angle implied by `cos_oi`.
    pub fn sample(&self, cos_oi: f32, band: usize) -> (f32, f32) {
        let m = self.rows();
        let factor = if cos_oi >= 1.0 {
            0.0
        } else {
            2.0 * cos_oi.clamp(-1.0, 1.0).acos() * m as f32 / std::f32::consts::PI
        };
        let row = factor.floor() as usize;
        let frac = factor - factor.floor();
        let (row0, row1) = if row >= m - 1 {
            (m - 1, m - 1)
        } else {
            (row, row + 1)
        };
        let r_orth = self.r_orth[row0][band] * (1.0 - frac) + self.r_orth[row1][band] * frac;
        let r_para = self.r_para[row0][band] * (1.0 - frac) + self.r_para[row1][band] * frac;
        (r_orth, r_para)
    }
}

fn blend_spectrum(a: &Spectrum, b: &Spectrum, coeff: f32) -> Spectrum {
    let mut out = a.scaled(coeff);
    out.add_assign(&b.scaled(1.0 - coeff));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_incidence_reads_first_row() {
        let rows = vec![Spectrum::from_values(vec![0.1, 0.2]), Spectrum::from_values(vec![0.9, 0.8])];
        let table = AngleTable::new(rows.clone(), rows);
        let (r_orth, _) = table.sample(1.0, 0);
        assert!((r_orth - 0.1).abs() < 1.0e-4);
    }

    #[test]
    fn from_fresnel_stays_in_unit_interval() {
        let grid = WavelengthGrid::uniform(400.0, 700.0, 4).unwrap();
        let n = Spectrum::constant(4, 1.5);
        let k = Spectrum::zero(4);
        let table = AngleTable::from_fresnel(&grid, &n, &k, 8);
        for row in 0..table.rows() {
            for band in 0..4 {
                let (ro, rp) = table.sample((row as f32 / 7.0 * std::f32::consts::FRAC_PI_2).cos(), band);
                assert!((0.0..=1.0).contains(&ro));
                assert!((0.0..=1.0).contains(&rp));
            }
        }
    }
}
