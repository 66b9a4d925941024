//! Angle-table-driven metallic materials: a perfect mirror (`RegularBRDF`),
//! two rough glossy reflectors (`BeckmannBRDF`, `AlloyBRDF`), and a
//! combination of both (`MetalW`, anisotropic). Grounded on
//! `original_source/sources/{include,src}/materials/RegularBRDF.*` for the
//! mirror contract and on the `BeckmannBRDF`/`AlloyBRDF`/`MetalW` headers
//! (whose `.cpp` bodies are absent from the distillation) for the rough
//! variants' parameters; the microfacet evaluation itself follows the
//! classical Beckmann/Torrance-Sparrow formulation in [`super::microfacet`].

use super::table::AngleTable;
use super::{microfacet, Bsdf};
use lumen_core::algebra::Vector2;
use lumen_core::prelude::*;
use nalgebra::Vector3;
use rand::Rng;

fn reflect_sub_ray(basis: &Basis, out: &LightVector) -> LightVector {
    let reflected = crate::fresnel::reflect(basis.k, out.ray.dir);
    let mut subray = LightVector::zero(Ray::new(basis.origin, reflected), 0.0, out.len());
    subray.change_reemited_frame(basis.k);
    subray
}

/// A perfect metallic (or otherwise non-absorbing-substrate) mirror, its
/// reflectance given as an angle-indexed table of `(R⊥, R∥)` pairs.
#[derive(Clone)]
pub struct RegularBRDF {
    table: AngleTable,
}

impl RegularBRDF {
    pub fn new(r_para: Vec<Spectrum>, r_orth: Vec<Spectrum>) -> Self {
        Self {
            table: AngleTable::new(r_orth, r_para),
        }
    }

    pub fn from_table(table: AngleTable) -> Self {
        Self { table }
    }
}

impl Bsdf for RegularBRDF {
    fn is_diffuse(&self) -> bool {
        false
    }

    fn is_specular(&self) -> bool {
        true
    }

    fn diffuse_reemited(
        &self,
        _grid: &WavelengthGrid,
        _basis: &Basis,
        _uv: Vector2<f32>,
        _incident: &LightVector,
        out: &mut LightVector,
    ) {
        out.clear();
    }

    fn specular_reemited(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -basis.k.dot(&incident.ray.dir);
        if cos_oi <= 0.0 {
            for i in 0..out.len() {
                let source = out.data()[i];
                out.data_mut()[i].apply_reflectance(&source, 1.0, 1.0);
            }
            return;
        }
        let mut local_incident = incident.clone();
        local_incident.change_incident_frame(basis.k);
        for d in local_incident.data_mut() {
            d.flip();
        }
        out.change_reemited_frame(basis.k);
        for i in 0..out.len() {
            let (r_orth, r_para) = self.table.sample(cos_oi, i);
            let source = local_incident.data()[i];
            out.data_mut()[i].apply_reflectance(&source, r_para, r_orth);
        }
    }

    fn specular_sub_rays(&self, basis: &Basis, _uv: Vector2<f32>, out: &LightVector, subrays: &mut Vec<LightVector>) {
        subrays.push(reflect_sub_ray(basis, out));
    }

    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        _basis: &Basis,
        _uv: Vector2<f32>,
        _out: &LightVector,
        _nb_rays: usize,
        _subrays: &mut Vec<LightVector>,
        _rng: &mut R,
    ) {
    }

    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool {
        let normal = basis.k;
        let cos_oi = -normal.dot(&photon.direction);
        if cos_oi < 0.0 {
            return false;
        }
        let mut mean = 0.0f32;
        for i in 0..photon.radiance.len() {
            let (r_orth, r_para) = self.table.sample(cos_oi, i);
            photon.radiance[i] *= (r_orth + r_para) * 0.5;
            mean += photon.radiance[i];
        }
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        for r in photon.radiance.iter_mut() {
            *r /= mean;
        }
        photon.direction = crate::fresnel::reflect(normal, photon.direction);
        *specular = true;
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 {
            out.clear();
            return;
        }
        for i in 0..out.len() {
            let (r_orth, r_para) = self.table.sample(1.0, i);
            out.data_mut()[i] = LightData::new(ambient[i] * 0.5 * (r_orth + r_para));
        }
        out.change_reemited_frame(basis.k);
    }
}

/// Samples a microfacet half-vector from the isotropic Beckmann
/// distribution of roughness `m`, in `basis`'s local frame.
fn sample_beckmann_half(basis: &Basis, m: f32, rng: &mut (impl Rng + ?Sized)) -> Vector3<f32> {
    let u: f32 = rng.gen();
    let v: f32 = rng.gen();
    let theta = (-(m * m) * (1.0 - u).max(1.0e-6).ln()).max(0.0).sqrt().atan();
    let phi = 2.0 * std::f32::consts::PI * v;
    let (sin_t, cos_t) = theta.sin_cos();
    let local = Vector3::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t);
    basis.to_world(local)
}

/// A rough, isotropic glossy metal evaluated directly (no Dirac specular
/// lobe): the `BeckmannBRDF` variant.
#[derive(Clone)]
pub struct BeckmannBRDF {
    table: AngleTable,
    roughness: f32,
}

impl BeckmannBRDF {
    pub fn new(r_para: Vec<Spectrum>, r_orth: Vec<Spectrum>, roughness: f32) -> Self {
        Self {
            table: AngleTable::new(r_orth, r_para),
            roughness,
        }
    }
}

impl Bsdf for BeckmannBRDF {
    fn is_diffuse(&self) -> bool {
        true
    }

    fn is_specular(&self) -> bool {
        false
    }

    fn diffuse_reemited(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -incident.ray.dir.dot(&basis.k);
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_oi <= 0.0 || cos_ov <= 0.0 {
            out.clear();
            return;
        }
        for i in 0..out.len() {
            let f = microfacet::rough_metal_brdf(basis, incident.ray.dir, out.ray.dir, cos_oi, cos_ov, self.roughness, &self.table, i);
            out.data_mut()[i] = LightData::new(incident.data()[i].radiance * f * cos_oi);
        }
        out.change_reemited_frame(basis.k);
    }

    fn specular_reemited(
        &self,
        _grid: &WavelengthGrid,
        _basis: &Basis,
        _uv: Vector2<f32>,
        _incident: &LightVector,
        out: &mut LightVector,
    ) {
        out.clear();
    }

    fn specular_sub_rays(&self, _basis: &Basis, _uv: Vector2<f32>, _out: &LightVector, _subrays: &mut Vec<LightVector>) {}

    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        basis: &Basis,
        _uv: Vector2<f32>,
        out: &LightVector,
        nb_rays: usize,
        subrays: &mut Vec<LightVector>,
        rng: &mut R,
    ) {
        if basis.k.dot(&out.ray.dir) > 0.0 {
            return;
        }
        for _ in 0..nb_rays {
            let half = sample_beckmann_half(basis, self.roughness, rng);
            let incident_dir = crate::fresnel::reflect(half, out.ray.dir);
            if basis.k.dot(&incident_dir) >= 0.0 {
                continue;
            }
            let mut subray = LightVector::zero(Ray::new(basis.origin, incident_dir), 0.0, out.len());
            subray.change_reemited_frame(basis.k);
            subrays.push(subray);
        }
    }

    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool {
        let normal = basis.k;
        let cos_oi = -normal.dot(&photon.direction);
        if cos_oi < 0.0 {
            return false;
        }
        let mut mean = 0.0f32;
        for i in 0..photon.radiance.len() {
            let (r_orth, r_para) = self.table.sample(cos_oi, i);
            photon.radiance[i] *= (r_orth + r_para) * 0.5;
            mean += photon.radiance[i];
        }
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        for r in photon.radiance.iter_mut() {
            *r /= mean;
        }
        let half = sample_beckmann_half(basis, self.roughness, rng);
        photon.direction = crate::fresnel::reflect(half, photon.direction);
        *specular = false;
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 {
            out.clear();
            return;
        }
        for i in 0..out.len() {
            let (r_orth, r_para) = self.table.sample(1.0, i);
            out.data_mut()[i] = LightData::new(ambient[i] * 0.5 * (r_orth + r_para));
        }
        out.change_reemited_frame(basis.k);
    }
}

/// An alloy of two metals blended by concentration `coeff` (the first
/// metal's share; the second gets `1 - coeff`), evaluated with the same
/// rough isotropic Beckmann model as [`BeckmannBRDF`].
#[derive(Clone)]
pub struct AlloyBRDF {
    table: AngleTable,
    roughness: f32,
}

impl AlloyBRDF {
    /// Builds the blended angle table from each metal's own table and the
    /// first metal's concentration `coeff` in `[0, 1]`.
    pub fn new(metal_one: AngleTable, metal_two: AngleTable, coeff: f32, roughness: f32) -> Self {
        debug_assert_eq!(metal_one.rows(), metal_two.rows());
        let table = AngleTable::blended(&metal_one, &metal_two, coeff);
        Self { table, roughness }
    }
}

impl Bsdf for AlloyBRDF {
    fn is_diffuse(&self) -> bool {
        true
    }

    fn is_specular(&self) -> bool {
        false
    }

    fn diffuse_reemited(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -incident.ray.dir.dot(&basis.k);
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_oi <= 0.0 || cos_ov <= 0.0 {
            out.clear();
            return;
        }
        for i in 0..out.len() {
            let f = microfacet::rough_metal_brdf(basis, incident.ray.dir, out.ray.dir, cos_oi, cos_ov, self.roughness, &self.table, i);
            out.data_mut()[i] = LightData::new(incident.data()[i].radiance * f * cos_oi);
        }
        out.change_reemited_frame(basis.k);
    }

    fn specular_reemited(
        &self,
        _grid: &WavelengthGrid,
        _basis: &Basis,
        _uv: Vector2<f32>,
        _incident: &LightVector,
        out: &mut LightVector,
    ) {
        out.clear();
    }

    fn specular_sub_rays(&self, _basis: &Basis, _uv: Vector2<f32>, _out: &LightVector, _subrays: &mut Vec<LightVector>) {}

    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        basis: &Basis,
        _uv: Vector2<f32>,
        out: &LightVector,
        nb_rays: usize,
        subrays: &mut Vec<LightVector>,
        rng: &mut R,
    ) {
        if basis.k.dot(&out.ray.dir) > 0.0 {
            return;
        }
        for _ in 0..nb_rays {
            let half = sample_beckmann_half(basis, self.roughness, rng);
            let incident_dir = crate::fresnel::reflect(half, out.ray.dir);
            if basis.k.dot(&incident_dir) >= 0.0 {
                continue;
            }
            let mut subray = LightVector::zero(Ray::new(basis.origin, incident_dir), 0.0, out.len());
            subray.change_reemited_frame(basis.k);
            subrays.push(subray);
        }
    }

    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool {
        let normal = basis.k;
        let cos_oi = -normal.dot(&photon.direction);
        if cos_oi < 0.0 {
            return false;
        }
        let mut mean = 0.0f32;
        for i in 0..photon.radiance.len() {
            let (r_orth, r_para) = self.table.sample(cos_oi, i);
            photon.radiance[i] *= (r_orth + r_para) * 0.5;
            mean += photon.radiance[i];
        }
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        for r in photon.radiance.iter_mut() {
            *r /= mean;
        }
        let half = sample_beckmann_half(basis, self.roughness, rng);
        photon.direction = crate::fresnel::reflect(half, photon.direction);
        *specular = false;
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 {
            out.clear();
            return;
        }
        for i in 0..out.len() {
            let (r_orth, r_para) = self.table.sample(1.0, i);
            out.data_mut()[i] = LightData::new(ambient[i] * 0.5 * (r_orth + r_para));
        }
        out.change_reemited_frame(basis.k);
    }
}

/// Anisotropic metal combining a perfect-mirror specular lobe (exactly
/// `RegularBRDF`'s contract) with a rough diffuse lobe evaluated via an
/// anisotropic Beckmann distribution of roughness `(mi, mj)` along the
/// surface's tangent/bitangent axes.
#[derive(Clone)]
pub struct MetalW {
    table: AngleTable,
    mi: f32,
    mj: f32,
}

impl MetalW {
    pub fn new(r_para: Vec<Spectrum>, r_orth: Vec<Spectrum>, mi: f32, mj: f32) -> Self {
        Self {
            table: AngleTable::new(r_orth, r_para),
            mi,
            mj,
        }
    }
}

impl Bsdf for MetalW {
    fn is_diffuse(&self) -> bool {
        true
    }

    fn is_specular(&self) -> bool {
        true
    }

    fn diffuse_reemited(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -incident.ray.dir.dot(&basis.k);
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_oi <= 0.0 || cos_ov <= 0.0 {
            out.clear();
            return;
        }
        for i in 0..out.len() {
            let f = microfacet::rough_metal_brdf_anisotropic(
                basis,
                incident.ray.dir,
                out.ray.dir,
                cos_oi,
                cos_ov,
                self.mi,
                self.mj,
                &self.table,
                i,
            );
            out.data_mut()[i] = LightData::new(incident.data()[i].radiance * f * cos_oi);
        }
        out.change_reemited_frame(basis.k);
    }

    fn specular_reemited(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -basis.k.dot(&incident.ray.dir);
        if cos_oi <= 0.0 {
            for i in 0..out.len() {
                let source = out.data()[i];
                out.data_mut()[i].apply_reflectance(&source, 1.0, 1.0);
            }
            return;
        }
        let mut local_incident = incident.clone();
        local_incident.change_incident_frame(basis.k);
        for d in local_incident.data_mut() {
            d.flip();
        }
        out.change_reemited_frame(basis.k);
        for i in 0..out.len() {
            let (r_orth, r_para) = self.table.sample(cos_oi, i);
            let source = local_incident.data()[i];
            out.data_mut()[i].apply_reflectance(&source, r_para, r_orth);
        }
    }

    fn specular_sub_rays(&self, basis: &Basis, _uv: Vector2<f32>, out: &LightVector, subrays: &mut Vec<LightVector>) {
        subrays.push(reflect_sub_ray(basis, out));
    }

    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        basis: &Basis,
        _uv: Vector2<f32>,
        out: &LightVector,
        nb_rays: usize,
        subrays: &mut Vec<LightVector>,
        rng: &mut R,
    ) {
        if basis.k.dot(&out.ray.dir) > 0.0 {
            return;
        }
        let m = (self.mi + self.mj) * 0.5;
        for _ in 0..nb_rays {
            let half = sample_beckmann_half(basis, m, rng);
            let incident_dir = crate::fresnel::reflect(half, out.ray.dir);
            if basis.k.dot(&incident_dir) >= 0.0 {
                continue;
            }
            let mut subray = LightVector::zero(Ray::new(basis.origin, incident_dir), 0.0, out.len());
            subray.change_reemited_frame(basis.k);
            subrays.push(subray);
        }
    }

    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool {
        let normal = basis.k;
        let cos_oi = -normal.dot(&photon.direction);
        if cos_oi < 0.0 {
            return false;
        }
        let mut mean = 0.0f32;
        for i in 0..photon.radiance.len() {
            let (r_orth, r_para) = self.table.sample(cos_oi, i);
            photon.radiance[i] *= (r_orth + r_para) * 0.5;
            mean += photon.radiance[i];
        }
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        for r in photon.radiance.iter_mut() {
            *r /= mean;
        }
        photon.direction = crate::fresnel::reflect(normal, photon.direction);
        *specular = true;
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 {
            out.clear();
            return;
        }
        for i in 0..out.len() {
            let (r_orth, r_para) = self.table.sample(1.0, i);
            out.data_mut()[i] = LightData::new(ambient[i] * 0.5 * (r_orth + r_para));
        }
        out.change_reemited_frame(basis.k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn mirror_table() -> AngleTable {
        let rows: Vec<Spectrum> = (0..4).map(|_| Spectrum::constant(3, 0.9)).collect();
        AngleTable::new(rows.clone(), rows)
    }

    #[test]
    fn regular_brdf_mirror_reflects_straight_back_at_normal_incidence() {
        let material = RegularBRDF::from_table(mirror_table());
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 3);
        let mut subrays = Vec::new();
        material.specular_sub_rays(&basis, Vector2::new(0.0, 0.0), &out, &mut subrays);
        assert_eq!(subrays.len(), 1);
        assert!((subrays[0].ray.dir - Vector3::new(0.0, 0.0, 1.0)).norm() < 1.0e-5);
    }

    #[test]
    fn regular_brdf_applies_table_reflectance_at_normal_incidence() {
        let material = RegularBRDF::from_table(mirror_table());
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let incident = LightVector::new(
            Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)),
            0.0,
            vec![LightData::new(1.0); 3],
            Vector3::new(1.0, 0.0, 0.0),
        );
        let mut out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 3);
        material.specular_reemited(&WavelengthGrid::uniform(400.0, 700.0, 3).unwrap(), &basis, Vector2::new(0.0, 0.0), &incident, &mut out);
        assert!((out.data()[0].radiance - 0.9).abs() < 1.0e-3);
    }

    #[test]
    fn beckmann_bounce_photon_conserves_nonnegative_energy() {
        let material = BeckmannBRDF::new(vec![Spectrum::constant(2, 0.5); 4], vec![Spectrum::constant(2, 0.5); 4], 0.3);
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let mut photon = MultispectralPhoton::new(2, Vector3::zeros(), Vector3::new(0.1, 0.0, -1.0));
        let mut specular = false;
        let mut rng = SmallRng::seed_from_u64(3);
        material.bounce_photon(&WavelengthGrid::uniform(400.0, 700.0, 2).unwrap(), &basis, Vector2::new(0.0, 0.0), &mut photon, &mut specular, &mut rng);
        assert!(photon.radiance.iter().all(|&r| r >= 0.0));
    }
}
