//! Dielectric glass: reflectance/transmittance angle tables plus a
//! per-wavelength index of refraction, with optional chromatic dispersion.
//! Grounded on `original_source/sources/include/materials/RefractiveBRDF.hpp`
//! (whose `.cpp` body is absent from the distillation; the `dispersion` and
//! `photondispersion` flags documented there are implemented here as: the
//! camera path (`specular_reemited`/`specular_sub_rays`) refracts at the
//! mean index when `dispersion` is false and per-wavelength-index when
//! true, emitting one narrow-band transmitted sub-ray per grid wavelength;
//! the photon path (`bounce_photon`) collapses to a single stochastically
//! chosen wavelength under `photondispersion`, matching the "one photon,
//! one wavelength" convention photon mapping implementations use for
//! dispersive materials).

use super::table::AngleTable;
use super::Bsdf;
use lumen_core::algebra::Vector2;
use lumen_core::prelude::*;
use nalgebra::Vector3;
use rand::Rng;

#[derive(Clone)]
pub struct RefractiveBRDF {
    reflectance: AngleTable,
    transmittance: AngleTable,
    indices: Spectrum,
    mean_index: f32,
    dispersion: bool,
    photon_dispersion: bool,
}

impl RefractiveBRDF {
    pub fn new(
        r_para: Vec<Spectrum>,
        r_orth: Vec<Spectrum>,
        t_para: Vec<Spectrum>,
        t_orth: Vec<Spectrum>,
        indices: Spectrum,
        dispersion: bool,
        photon_dispersion: bool,
    ) -> Self {
        let mean_index = if indices.is_empty() {
            1.0
        } else {
            indices.as_slice().iter().sum::<f32>() / indices.len() as f32
        };
        Self {
            reflectance: AngleTable::new(r_orth, r_para),
            transmittance: AngleTable::new(t_orth, t_para),
            indices,
            mean_index,
            dispersion,
            photon_dispersion,
        }
    }

    fn index_at(&self, band: usize) -> f32 {
        self.indices[band]
    }

    /// Builds a dielectric glass purely from its (real) refractive index,
    /// for callers with no measured reflectance/transmittance tables of
    /// their own: reflectance comes from [`AngleTable::from_fresnel`] at
    /// `kappa = 0`, transmittance from its [`AngleTable::complement`] (no
    /// internal absorption modeled by the table itself — that's
    /// `Medium::transport_light`'s job once the ray is inside the object).
    pub fn dielectric(grid: &WavelengthGrid, indices: Spectrum, rows: usize, dispersion: bool, photon_dispersion: bool) -> Self {
        let k = Spectrum::zero(indices.len());
        let reflectance = AngleTable::from_fresnel(grid, &indices, &k, rows);
        let transmittance = reflectance.complement();
        let mean_index = if indices.is_empty() { 1.0 } else { indices.as_slice().iter().sum::<f32>() / indices.len() as f32 };
        Self {
            reflectance,
            transmittance,
            indices,
            mean_index,
            dispersion,
            photon_dispersion,
        }
    }
}

impl Bsdf for RefractiveBRDF {
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
        let cos_oi = (-basis.k.dot(&incident.ray.dir)).abs();
        let mut local_incident = incident.clone();
        local_incident.change_incident_frame(basis.k);
        for d in local_incident.data_mut() {
            d.flip();
        }
        out.change_reemited_frame(basis.k);
        let incoming_from_outside = basis.k.dot(&incident.ray.dir) < 0.0;
        for i in 0..out.len() {
            let source = local_incident.data()[i];
            let n = if incoming_from_outside { self.index_at(i) } else { 1.0 / self.index_at(i) };
            let refracted = crate::fresnel::refract(basis.k, n, incident.ray.dir);
            if refracted.is_some() {
                let (t_orth, t_para) = self.transmittance.sample(cos_oi, i);
                out.data_mut()[i].apply_reflectance(&source, t_para, t_orth);
            } else {
                let (r_orth, r_para) = self.reflectance.sample(cos_oi, i);
                out.data_mut()[i].apply_reflectance(&source, r_para, r_orth);
            }
        }
    }

    fn specular_sub_rays(&self, basis: &Basis, _uv: Vector2<f32>, out: &LightVector, subrays: &mut Vec<LightVector>) {
        let view = out.ray.dir;
        let reflected = crate::fresnel::reflect(basis.k, view);
        let mut reflected_ray = LightVector::zero(Ray::new(basis.origin, reflected), 0.0, out.len());
        reflected_ray.change_reemited_frame(basis.k);
        subrays.push(reflected_ray);

        if !self.dispersion {
            if let Some(refracted) = crate::fresnel::refract(basis.k, self.mean_index, view) {
                let mut refracted_ray = LightVector::zero(Ray::new(basis.origin, refracted), 0.0, out.len());
                refracted_ray.change_reemited_frame(-basis.k);
                subrays.push(refracted_ray);
            }
            return;
        }

        for i in 0..out.len() {
            if let Some(refracted) = crate::fresnel::refract(basis.k, self.index_at(i), view) {
                let mut refracted_ray = LightVector::zero(Ray::new(basis.origin, refracted), 0.0, out.len());
                refracted_ray.change_reemited_frame(-basis.k);
                subrays.push(refracted_ray);
            }
        }
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
        let cos_oi = (-basis.k.dot(&photon.direction)).abs();
        let n = photon.radiance.len();

        let band = if self.photon_dispersion {
            let total: f32 = photon.radiance.iter().sum();
            if total <= 0.0 {
                return false;
            }
            let mut target = rng.gen::<f32>() * total;
            let mut chosen = n - 1;
            for (i, &r) in photon.radiance.iter().enumerate() {
                if target <= r {
                    chosen = i;
                    break;
                }
                target -= r;
            }
            for (i, r) in photon.radiance.iter_mut().enumerate() {
                if i != chosen {
                    *r = 0.0;
                }
            }
            chosen
        } else {
            0
        };

        let (r_orth, r_para) = self.reflectance.sample(cos_oi, band);
        let (t_orth, t_para) = self.transmittance.sample(cos_oi, band);
        let r_mean = (r_orth + r_para) * 0.5;
        let t_mean = (t_orth + t_para) * 0.5;
        let mean = r_mean + t_mean;
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }

        *specular = true;
        let incoming_from_outside = basis.k.dot(&photon.direction) < 0.0;
        if rng.gen::<f32>() < r_mean / mean {
            for r in photon.radiance.iter_mut() {
                *r /= r_mean.max(1.0e-6);
            }
            photon.direction = crate::fresnel::reflect(basis.k, photon.direction);
        } else {
            for r in photon.radiance.iter_mut() {
                *r /= t_mean.max(1.0e-6);
            }
            let index = if incoming_from_outside { self.index_at(band) } else { 1.0 / self.index_at(band) };
            if let Some(refracted) = crate::fresnel::refract(basis.k, index, photon.direction) {
                photon.direction = refracted;
            } else {
                photon.direction = crate::fresnel::reflect(basis.k, photon.direction);
            }
        }
        true
    }

    fn diffuse_reemited_from_ambient(&self, _basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, _ambient: &Spectrum) {
        out.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_dispersive_refraction_emits_reflected_and_refracted_rays() {
        let rows = 4;
        let r: Vec<Spectrum> = (0..rows).map(|_| Spectrum::constant(2, 0.04)).collect();
        let t: Vec<Spectrum> = (0..rows).map(|_| Spectrum::constant(2, 0.9)).collect();
        let material = RefractiveBRDF::new(r.clone(), r, t.clone(), t, Spectrum::constant(2, 1.5), false, false);
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 2);
        let mut subrays = Vec::new();
        material.specular_sub_rays(&basis, Vector2::new(0.0, 0.0), &out, &mut subrays);
        assert_eq!(subrays.len(), 2);
    }

    #[test]
    fn dispersive_refraction_emits_one_refracted_ray_per_band_plus_reflection() {
        let rows = 4;
        let r: Vec<Spectrum> = (0..rows).map(|_| Spectrum::constant(3, 0.04)).collect();
        let t: Vec<Spectrum> = (0..rows).map(|_| Spectrum::constant(3, 0.9)).collect();
        let material = RefractiveBRDF::new(r.clone(), r, t.clone(), t, Spectrum::from_values(vec![1.5, 1.52, 1.54]), true, false);
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let out = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0)), 0.0, 3);
        let mut subrays = Vec::new();
        material.specular_sub_rays(&basis, Vector2::new(0.0, 0.0), &out, &mut subrays);
        assert_eq!(subrays.len(), 4);
    }
}
