//! Pure diffuse materials. Grounded on
//! `original_source/sources/src/materials/LambertianBRDF.cpp` (reflectance
//! plus optional transmittance, Russian-roulette photon transport, rejection
//! sampled secondary rays) and
//! `original_source/sources/include/materials/OrenNayarFormula.hpp` (rough
//! diffuse reflectance).

use super::Bsdf;
use lumen_core::algebra::Vector2;
use lumen_core::prelude::*;
use nalgebra::Vector3;
use rand::Rng;

/// Rejection-samples a direction over the hemisphere around `normal`,
/// matching `LambertianBRDF::generateRandomeDiffuseRay`'s acceptance test
/// rather than a closed-form cosine-weighted sampler: a uniform point in
/// `[-1, 1]^3` is normalized to a direction and accepted only when its
/// pre-normalization squared length does not exceed `cos(theta)^2`.
pub(crate) fn rejection_sample_hemisphere<R: Rng + ?Sized>(normal: Vector3<f32>, rng: &mut R) -> Vector3<f32> {
    loop {
        let v = Vector3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let norm2 = v.norm_squared();
        if norm2 < 1.0e-12 {
            continue;
        }
        let dir = v.normalize();
        let cos_oi = dir.dot(&normal);
        if cos_oi > 0.0 && norm2 <= cos_oi * cos_oi {
            return dir;
        }
    }
}

pub(crate) fn push_diffuse_subray(normal: Vector3<f32>, origin: Vector3<f32>, len: usize, subrays: &mut Vec<LightVector>, dir: Vector3<f32>) {
    let mut subray = LightVector::zero(Ray::new(origin, dir), 0.0, len);
    subray.change_reemited_frame(normal);
    subrays.push(subray);
}

/// A Lambertian (perfectly diffuse) material: a reflectance spectrum and,
/// for `isOpaque = false`, a transmittance spectrum giving the material a
/// diffuse back face too.
#[derive(Clone)]
pub struct LambertianBRDF {
    reflectance: Spectrum,
    transmittance: Spectrum,
    opaque: bool,
}

impl LambertianBRDF {
    pub fn new(reflectance: Spectrum, transmittance: Spectrum, opaque: bool) -> Self {
        Self {
            reflectance,
            transmittance,
            opaque,
        }
    }
}

impl Bsdf for LambertianBRDF {
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
        if cos_ov <= 0.0 || (self.opaque && cos_oi <= 0.0) {
            out.clear();
            return;
        }
        let one_over_pi = std::f32::consts::FRAC_1_PI;
        for i in 0..out.len() {
            let radiance = if cos_oi > 0.0 {
                incident.data()[i].radiance * one_over_pi * cos_oi * self.reflectance[i]
            } else {
                -incident.data()[i].radiance * one_over_pi * cos_oi * self.transmittance[i]
            };
            out.data_mut()[i] = LightData::new(radiance);
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
        let normal = basis.k;
        if normal.dot(&out.ray.dir) > 0.0 {
            return;
        }
        let len = out.len();
        let rays_per_side = if self.opaque { nb_rays } else { (nb_rays + 1) / 2 };
        for _ in 0..rays_per_side {
            let dir = rejection_sample_hemisphere(normal, rng);
            push_diffuse_subray(normal, basis.origin, len, subrays, dir);
        }
        if self.opaque {
            return;
        }
        for _ in 0..rays_per_side {
            let dir = rejection_sample_hemisphere(-normal, rng);
            push_diffuse_subray(-normal, basis.origin, len, subrays, dir);
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
        if normal.dot(&photon.direction) > 0.0 {
            return false;
        }
        let n = photon.radiance.len();
        let mut reflected = photon.clone();
        let mut transmitted = photon.clone();
        let mut r_mean = 0.0f32;
        let mut t_mean = 0.0f32;
        for i in 0..n {
            reflected.radiance[i] *= self.reflectance[i];
            transmitted.radiance[i] *= self.transmittance[i];
            r_mean += reflected.radiance[i];
            t_mean += transmitted.radiance[i];
        }
        let mean = r_mean + t_mean;
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        *specular = false;
        if rng.gen::<f32>() < r_mean / mean {
            *photon = reflected;
            for r in photon.radiance.iter_mut() {
                *r /= r_mean;
            }
            photon.direction = rejection_sample_hemisphere(normal, rng);
        } else {
            *photon = transmitted;
            for r in photon.radiance.iter_mut() {
                *r /= t_mean;
            }
            photon.direction = rejection_sample_hemisphere(-normal, rng);
        }
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_oi = 1.0f32;
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 || (self.opaque && cos_oi <= 0.0) {
            out.clear();
            return;
        }
        let one_over_pi = std::f32::consts::FRAC_1_PI;
        for i in 0..out.len() {
            out.data_mut()[i] = LightData::new(ambient[i] * one_over_pi * self.reflectance[i]);
        }
        out.change_reemited_frame(basis.k);
    }
}

/// Rough diffuse reflector using the Oren-Nayar microfacet model (exact
/// form, not the Qualitative/fast approximation). `sigma` is the surface
/// roughness standard deviation in radians.
#[derive(Clone)]
pub struct RoughLambertian {
    reflectance: Spectrum,
    sigma: f32,
}

impl RoughLambertian {
    pub fn new(reflectance: Spectrum, sigma: f32) -> Self {
        Self { reflectance, sigma }
    }

    /// `cos(θᵢ)·(A + B·max(0,cos(φᵢ-φᵥ))·sin(max(θᵢ,θᵥ))·tan(min(θᵢ,θᵥ))) / π`.
    fn oren_nayar_factor(&self, cos_oi: f32, cos_ov: f32, phi_i: f32, phi_v: f32) -> f32 {
        let sigma2 = self.sigma * self.sigma;
        let a = 1.0 - 0.5 * sigma2 / (sigma2 + 0.33);
        let b = 0.45 * sigma2 / (sigma2 + 0.09);
        let theta_i = cos_oi.clamp(-1.0, 1.0).acos();
        let theta_v = cos_ov.clamp(-1.0, 1.0).acos();
        let alpha = theta_i.max(theta_v);
        let beta = theta_i.min(theta_v);
        let cos_delta_phi = (phi_i - phi_v).cos().max(0.0);
        cos_oi * (a + b * cos_delta_phi * alpha.sin() * beta.tan()) * std::f32::consts::FRAC_1_PI
    }
}

impl Bsdf for RoughLambertian {
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
        let phi_i = super::azimuth(basis, incident.ray.dir);
        let phi_v = super::azimuth(basis, out.ray.dir);
        let factor = self.oren_nayar_factor(cos_oi, cos_ov, phi_i, phi_v);
        for i in 0..out.len() {
            out.data_mut()[i] = LightData::new(incident.data()[i].radiance * factor * self.reflectance[i]);
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
        let normal = basis.k;
        if normal.dot(&out.ray.dir) > 0.0 {
            return;
        }
        let len = out.len();
        for _ in 0..nb_rays {
            let dir = rejection_sample_hemisphere(normal, rng);
            push_diffuse_subray(normal, basis.origin, len, subrays, dir);
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
        if normal.dot(&photon.direction) > 0.0 {
            return false;
        }
        let n = photon.radiance.len();
        let mut mean = 0.0f32;
        for i in 0..n {
            photon.radiance[i] *= self.reflectance[i];
            mean += photon.radiance[i];
        }
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        for r in photon.radiance.iter_mut() {
            *r /= mean;
        }
        photon.direction = rejection_sample_hemisphere(normal, rng);
        *specular = false;
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 {
            out.clear();
            return;
        }
        let factor = self.oren_nayar_factor(1.0, cos_ov, 0.0, 0.0);
        for i in 0..out.len() {
            out.data_mut()[i] = LightData::new(ambient[i] * factor * self.reflectance[i]);
        }
        out.change_reemited_frame(basis.k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn grid() -> WavelengthGrid {
        WavelengthGrid::uniform(400.0, 700.0, 4).unwrap()
    }

    #[test]
    fn opaque_lambertian_reflects_nothing_from_behind() {
        let material = LambertianBRDF::new(Spectrum::constant(4, 0.8), Spectrum::zero(4), true);
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let incident = LightVector::new(
            Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)),
            0.0,
            vec![LightData::new(1.0); 4],
            Vector3::new(1.0, 0.0, 0.0),
        );
        let mut out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 4);
        material.diffuse_reemited(&grid(), &basis, Vector2::new(0.0, 0.0), &incident, &mut out);
        assert!(out.data().iter().all(|d| d.radiance == 0.0));
    }

    #[test]
    fn opaque_lambertian_reflects_cosine_weighted_radiance() {
        let material = LambertianBRDF::new(Spectrum::constant(4, 0.8), Spectrum::zero(4), true);
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let incident = LightVector::new(
            Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)),
            0.0,
            vec![LightData::new(1.0); 4],
            Vector3::new(1.0, 0.0, 0.0),
        );
        let mut out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 4);
        material.diffuse_reemited(&grid(), &basis, Vector2::new(0.0, 0.0), &incident, &mut out);
        let expected = std::f32::consts::FRAC_1_PI * 0.8;
        assert!((out.data()[0].radiance - expected).abs() < 1.0e-4);
    }

    #[test]
    fn random_diffuse_rays_stay_in_upper_hemisphere_when_opaque() {
        let material = LambertianBRDF::new(Spectrum::constant(4, 0.8), Spectrum::zero(4), true);
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 4);
        let mut subrays = Vec::new();
        let mut rng = SmallRng::seed_from_u64(7);
        material.random_diffuse_rays(&basis, Vector2::new(0.0, 0.0), &out, 16, &mut subrays, &mut rng);
        assert_eq!(subrays.len(), 16);
        assert!(subrays.iter().all(|s| s.ray.dir.z > 0.0));
    }

    #[test]
    fn oren_nayar_reduces_to_lambert_at_zero_roughness_normal_incidence() {
        let rough = RoughLambertian::new(Spectrum::constant(4, 0.8), 0.0);
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let incident = LightVector::new(
            Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)),
            0.0,
            vec![LightData::new(1.0); 4],
            Vector3::new(1.0, 0.0, 0.0),
        );
        let mut out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 4);
        rough.diffuse_reemited(&grid(), &basis, Vector2::new(0.0, 0.0), &incident, &mut out);
        let expected = std::f32::consts::FRAC_1_PI * 0.8;
        assert!((out.data()[0].radiance - expected).abs() < 1.0e-4);
    }
}
