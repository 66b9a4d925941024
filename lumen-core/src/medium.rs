//! Optical description of the space on one side of a surface.

use crate::grid::WavelengthGrid;
use crate::light_vector::LightVector;
use crate::photon::MultispectralPhoton;
use crate::spectrum::Spectrum;
use rand::Rng;

/// Up to four optical models cohabit a single medium: a lambertian
/// diffuse/transmissive pair, a Fresnel complex-index pair, a
/// Kubelka-Munk pigment pair, and an opacity override. Which ones are
/// active is controlled by the boolean flags; all are optional.
#[derive(Clone, Debug)]
pub struct Medium {
    pub is_opaque: bool,

    pub use_lambertian: bool,
    /// Diffuse reflectance r(λ).
    pub r: Spectrum,
    /// Diffuse transmittance t(λ).
    pub t: Spectrum,

    pub use_fresnel: bool,
    /// Real part of the refractive index, n(λ).
    pub n: Spectrum,
    /// `k = n * kappa`, the extinction coefficient, stored so absorption can
    /// be evaluated directly without re-deriving it from `kappa` each call.
    pub k: Spectrum,

    pub use_kubelka_munk: bool,
    /// Kubelka-Munk absorption coefficient K(λ).
    pub kubelka_k: Spectrum,
    /// Kubelka-Munk scattering coefficient S(λ).
    pub kubelka_s: Spectrum,
}

impl Medium {
    pub fn vacuum(len: usize) -> Self {
        Self {
            is_opaque: false,
            use_lambertian: false,
            r: Spectrum::zero(len),
            t: Spectrum::constant(len, 1.0),
            use_fresnel: false,
            n: Spectrum::constant(len, 1.0),
            k: Spectrum::zero(len),
            use_kubelka_munk: false,
            kubelka_k: Spectrum::zero(len),
            kubelka_s: Spectrum::zero(len),
        }
    }

    /// Beer-Lambert absorption coefficient for a dielectric with extinction
    /// `k` at the given (meters) wavelength and (world-unit) travel distance.
    pub fn dielectric_absorption(distance: f32, wavelength_m: f32, k: f32) -> f32 {
        let a = (4.0 * std::f32::consts::PI * k) / wavelength_m;
        (-a * distance).exp()
    }

    /// Mutates `light`'s radiances in place: zero if opaque, multiplicative
    /// `t(λ)` if lambertian, Beer-Lambert absorption if Fresnel.
    pub fn transport_light(&self, grid: &WavelengthGrid, light: &mut LightVector) {
        if self.is_opaque {
            light.clear();
            return;
        }

        if self.use_lambertian {
            for (i, d) in light.data_mut().iter_mut().enumerate() {
                d.mul(self.t[i]);
            }
        }

        if self.use_fresnel {
            let distance = light.distance;
            for (i, d) in light.data_mut().iter_mut().enumerate() {
                let wavelength_m = grid.wavelength(i) * 1e-9;
                let a = Self::dielectric_absorption(distance, wavelength_m, self.k[i]);
                d.mul(a);
            }
        }
    }

    /// Transports a photon through the medium: opaque photons are absorbed
    /// (`false`); Fresnel media compute per-wavelength absorption, survive
    /// with probability equal to the mean resulting radiance (Russian
    /// roulette), and renormalize surviving radiance by that probability so
    /// expected energy is conserved. Media with neither flag set pass the
    /// photon through unmodified (the `true`/no-op case).
    pub fn transport_photon<R: Rng + ?Sized>(
        &self,
        grid: &WavelengthGrid,
        photon: &mut MultispectralPhoton,
        rng: &mut R,
    ) -> bool {
        if self.is_opaque {
            return false;
        }

        if self.use_fresnel {
            let mut mean = 0.0f32;
            for i in 0..grid.len() {
                let wavelength_m = grid.wavelength(i) * 1e-9;
                let a = Self::dielectric_absorption(photon.distance, wavelength_m, self.k[i]);
                photon.radiance[i] *= a;
                mean += photon.radiance[i];
            }
            mean /= grid.len() as f32;

            if rng.gen::<f32>() > mean {
                return false;
            }

            for r in photon.radiance.iter_mut() {
                *r /= mean;
            }
            return true;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ray::Ray;
    use nalgebra::Vector3;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn opaque_medium_zeroes_light() {
        let grid = WavelengthGrid::new(vec![500.0, 600.0]).unwrap();
        let mut medium = Medium::vacuum(2);
        medium.is_opaque = true;
        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let mut light = LightVector::zero(ray, 1.0, 2);
        light.data_mut()[0].radiance = 5.0;
        medium.transport_light(&grid, &mut light);
        assert!(light.data().iter().all(|d| d.radiance == 0.0));
    }

    #[test]
    fn lambertian_medium_scales_by_transmittance() {
        let grid = WavelengthGrid::new(vec![500.0, 600.0]).unwrap();
        let mut medium = Medium::vacuum(2);
        medium.use_lambertian = true;
        medium.t = Spectrum::from_values(vec![0.5, 0.25]);
        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let mut light = LightVector::zero(ray, 1.0, 2);
        light.data_mut()[0].radiance = 4.0;
        light.data_mut()[1].radiance = 4.0;
        medium.transport_light(&grid, &mut light);
        assert!((light.data()[0].radiance - 2.0).abs() < 1e-5);
        assert!((light.data()[1].radiance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn non_absorbing_photon_always_survives() {
        let grid = WavelengthGrid::new(vec![500.0, 600.0]).unwrap();
        let medium = Medium::vacuum(2);
        let mut photon = MultispectralPhoton::new(2, Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(medium.transport_photon(&grid, &mut photon, &mut rng));
    }
}
