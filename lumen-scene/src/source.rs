//! Light sources. Grounded on `original_source/sources/include/
//! lightsources/{LightSource,PointLightSource,DirectionalLightSource,
//! PlaneLightSource}.hpp`: every source knows how to place incident
//! LightVectors at a receiver, report its own emitted radiance for direct
//! view, give its total power for photon-budget allocation, and emit a
//! random photon.

use lumen_core::algebra::Vector3;
use lumen_core::prelude::*;
use rand::Rng;

/// A point emitter: inverse-square falloff, uniform over 4π for photon
/// emission. Grounded on `PointLightSource.cpp`.
#[derive(Clone, Debug)]
pub struct PointSource {
    pub origin: Vector3<f32>,
    pub spectrum: Spectrum,
    pub power: f32,
}

/// A constant-direction emitter at infinite distance, carried by a finite
/// rectangular "cap" (`u`, `v` span, origin `o`) used only to give it an
/// emission area for direct-view queries. Grounded on
/// `DirectionalLightSource.hpp`.
#[derive(Clone, Debug)]
pub struct DirectionalSource {
    pub direction: Vector3<f32>,
    pub spectrum: Spectrum,
    pub power: f32,
    pub u: Vector3<f32>,
    pub v: Vector3<f32>,
    pub origin: Vector3<f32>,
}

/// A parallelogram area light sampled uniformly in `(u, v)`. Grounded on
/// `PlaneLightSource.cpp`.
#[derive(Clone, Debug)]
pub struct PlaneSource {
    pub basis: Basis,
    pub spectrum: Spectrum,
    pub power: f32,
    pub sample_count: usize,
}

#[derive(Clone, Debug)]
pub enum LightSource {
    Point(PointSource),
    Directional(DirectionalSource),
    Plane(PlaneSource),
}

impl PointSource {
    pub fn new(spectrum: Spectrum, power: f32, origin: Vector3<f32>) -> Self {
        let mut spectrum = spectrum;
        spectrum.normalize_power();
        Self { origin, spectrum, power }
    }

    fn power_factor(&self) -> f32 {
        self.power / (4.0 * std::f32::consts::PI)
    }
}

impl DirectionalSource {
    pub fn new(
        spectrum: Spectrum,
        power: f32,
        direction: Vector3<f32>,
        u: Vector3<f32>,
        v: Vector3<f32>,
        origin: Vector3<f32>,
    ) -> Self {
        let mut spectrum = spectrum;
        spectrum.normalize_power();
        Self {
            direction: direction.normalize(),
            spectrum,
            power,
            u,
            v,
            origin,
        }
    }

    fn area(&self) -> f32 {
        self.u.norm() * self.v.norm()
    }
}

impl PlaneSource {
    pub fn new(spectrum: Spectrum, power: f32, basis: Basis, sample_count: usize) -> Self {
        let mut spectrum = spectrum;
        spectrum.normalize_power();
        Self {
            basis,
            spectrum,
            power,
            sample_count: sample_count.max(1),
        }
    }

    fn area(&self) -> f32 {
        self.basis.i.norm() * self.basis.j.norm()
    }
}

impl LightSource {
    /// Appends one or more incident LightVectors at `receiver`, each fully
    /// populated per spec.md §4.3. `reemited` supplies the wavelength count
    /// to allocate against.
    pub fn incident_light(
        &self,
        grid: &WavelengthGrid,
        receiver: Vector3<f32>,
        reemited_len: usize,
        incidents: &mut Vec<LightVector>,
        rng: &mut impl Rng,
    ) {
        match self {
            LightSource::Point(p) => {
                let propagation = receiver - p.origin;
                let distance = propagation.norm();
                if distance < 1.0e-8 {
                    return;
                }
                let direction = propagation / distance;
                let mut lv = LightVector::zero(Ray::new(receiver, direction), distance, reemited_len);
                lv.change_reemited_frame(default_reference_frame(direction));
                let power = p.power_factor() / (distance * distance);
                for (i, d) in lv.data_mut().iter_mut().enumerate() {
                    d.radiance = p.spectrum.value_at_wavelength(grid, grid.wavelength(i)) * power;
                }
                incidents.push(lv);
            }
            LightSource::Directional(d) => {
                let direction = d.direction;
                let mut lv = LightVector::zero(Ray::new(receiver, direction), f32::INFINITY, reemited_len);
                lv.change_reemited_frame(default_reference_frame(direction));
                let power = d.power / d.area();
                for (i, ld) in lv.data_mut().iter_mut().enumerate() {
                    ld.radiance = d.spectrum.value_at_wavelength(grid, grid.wavelength(i)) * power;
                }
                incidents.push(lv);
            }
            LightSource::Plane(p) => {
                for _ in 0..p.sample_count {
                    let x: f32 = rng.gen();
                    let y: f32 = rng.gen();
                    let origin = p.basis.origin + p.basis.i * x + p.basis.j * y;
                    let propagation = receiver - origin;
                    let distance = propagation.norm();
                    if distance < 1.0e-8 {
                        continue;
                    }
                    let direction = propagation / distance;
                    let cos_theta = p.basis.k.dot(&direction);
                    if cos_theta < 0.0 {
                        continue;
                    }
                    let mut lv = LightVector::zero(Ray::new(receiver, direction), distance, reemited_len);
                    lv.change_reemited_frame(default_reference_frame(direction));
                    let power = cos_theta * p.power
                        / (distance * distance * p.sample_count as f32 * std::f32::consts::PI);
                    for (i, ld) in lv.data_mut().iter_mut().enumerate() {
                        ld.radiance = p.spectrum.value_at_wavelength(grid, grid.wavelength(i)) * power;
                    }
                    incidents.push(lv);
                }
            }
        }
    }

    pub fn power(&self) -> f32 {
        match self {
            LightSource::Point(p) => p.power,
            LightSource::Directional(d) => d.power,
            LightSource::Plane(p) => p.power,
        }
    }

    /// Populates `emitted` for the direct-view case: a camera ray that
    /// hits the source's own shape.
    pub fn emitted_light(&self, grid: &WavelengthGrid, basis: &Basis, emitted: &mut LightVector) {
        match self {
            LightSource::Point(p) => {
                let factor = p.power / (4.0 * std::f32::consts::PI * std::f32::consts::PI);
                for (i, d) in emitted.data_mut().iter_mut().enumerate() {
                    d.radiance = p.spectrum.value_at_wavelength(grid, grid.wavelength(i)) * factor;
                }
            }
            LightSource::Directional(d) => {
                let factor = d.power / d.area();
                for (i, ld) in emitted.data_mut().iter_mut().enumerate() {
                    ld.radiance = d.spectrum.value_at_wavelength(grid, grid.wavelength(i)) * factor;
                }
            }
            LightSource::Plane(p) => {
                let factor = p.power / p.area();
                for (i, ld) in emitted.data_mut().iter_mut().enumerate() {
                    ld.radiance = p.spectrum.value_at_wavelength(grid, grid.wavelength(i)) * factor;
                }
            }
        }
        emitted.change_reemited_frame(basis.k);
    }

    /// Emits a photon per the source's area- and angular-weighted
    /// distribution: uniform over 4π for a point, cosine-weighted over the
    /// hemisphere above the plane for an area source.
    pub fn random_photon(&self, grid: &WavelengthGrid, rng: &mut impl Rng) -> MultispectralPhoton {
        match self {
            LightSource::Point(p) => {
                let direction = uniform_sphere_direction(rng);
                let mut photon = MultispectralPhoton::new(grid.len(), p.origin, direction);
                fill_normalized_radiance(&mut photon, &p.spectrum);
                photon
            }
            LightSource::Directional(d) => {
                let x: f32 = rng.gen();
                let y: f32 = rng.gen();
                let position = d.origin + d.u * x + d.v * y;
                let mut photon = MultispectralPhoton::new(grid.len(), position, d.direction);
                fill_normalized_radiance(&mut photon, &d.spectrum);
                photon
            }
            LightSource::Plane(p) => {
                let x: f32 = rng.gen();
                let y: f32 = rng.gen();
                let position = p.basis.origin + p.basis.i * x + p.basis.j * y;
                let direction = cosine_weighted_direction(&p.basis, rng);
                let mut photon = MultispectralPhoton::new(grid.len(), position, direction);
                fill_normalized_radiance(&mut photon, &p.spectrum);
                photon
            }
        }
    }
}

fn fill_normalized_radiance(photon: &mut MultispectralPhoton, spectrum: &Spectrum) {
    let mean = spectrum.sum() / spectrum.len().max(1) as f32;
    if mean <= 0.0 {
        return;
    }
    for (i, r) in photon.radiance.iter_mut().enumerate() {
        *r = spectrum.as_slice()[i] / (mean * spectrum.len() as f32);
    }
}

/// Uniform rejection sampling over the unit ball, per `PointLightSource::
/// getRandomPhoton`.
fn uniform_sphere_direction(rng: &mut impl Rng) -> Vector3<f32> {
    loop {
        let v = Vector3::new(
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
        );
        let sq = v.norm_squared();
        if sq <= 1.0 && sq >= 0.01 {
            return v.normalize();
        }
    }
}

/// Cosine-weighted rejection sampling over the hemisphere above `basis.k`,
/// per `PlaneLightSource::getRandomPhoton`.
fn cosine_weighted_direction(basis: &Basis, rng: &mut impl Rng) -> Vector3<f32> {
    loop {
        let v = Vector3::new(
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
        );
        let sq = v.norm_squared();
        if sq > 1.0 {
            continue;
        }
        let unit = v.normalize();
        let cos_theta = basis.k.dot(&unit);
        if cos_theta > 0.0 && sq <= cos_theta * cos_theta {
            return unit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn grid() -> WavelengthGrid {
        WavelengthGrid::new(vec![400.0, 500.0, 600.0]).unwrap()
    }

    #[test]
    fn point_source_falloff_is_inverse_square() {
        let grid = grid();
        let source = LightSource::Point(PointSource::new(Spectrum::constant(3, 1.0), 100.0, Vector3::zeros()));
        let mut near = Vec::new();
        let mut far = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        source.incident_light(&grid, Vector3::new(1.0, 0.0, 0.0), 3, &mut near, &mut rng);
        source.incident_light(&grid, Vector3::new(2.0, 0.0, 0.0), 3, &mut far, &mut rng);
        let r_near = near[0].data()[0].radiance;
        let r_far = far[0].data()[0].radiance;
        assert!((r_near / r_far - 4.0).abs() < 1.0e-3);
    }

    #[test]
    fn plane_source_samples_requested_count() {
        let grid = grid();
        let basis = Basis::from_normal(Vector3::zeros(), Vector3::z());
        let source = LightSource::Plane(PlaneSource::new(Spectrum::constant(3, 1.0), 10.0, basis, 5));
        let mut incidents = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        source.incident_light(&grid, Vector3::new(0.0, 0.0, 5.0), 3, &mut incidents, &mut rng);
        assert_eq!(incidents.len(), 5);
    }

    #[test]
    fn random_photon_direction_is_unit_length() {
        let grid = grid();
        let source = LightSource::Point(PointSource::new(Spectrum::constant(3, 1.0), 1.0, Vector3::zeros()));
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let photon = source.random_photon(&grid, &mut rng);
        assert!((photon.direction.norm() - 1.0).abs() < 1.0e-4);
    }
}
