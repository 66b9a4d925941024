//! The infinite backdrop a primary ray reads when it escapes the scene
//! entirely (spec.md §4.4 step 1). Grounded on
//! `original_source/sources/include/environments/{Environment,
//! SphericalEnvironment,SpectralEnvironment}.hpp`.

use lumen_core::prelude::*;

use crate::texture::Texture;

/// Maps a view direction to spherical (u, v) texture coordinates, per
/// `original_source/sources/src/environments/SphericalEnvironment.cpp`'s
/// (non-commented-out) `AddContribution` body:
/// `m = sqrt(x^2 + y^2 + (z+1)^2)`, `u = x/(2m) + 1/2`, `v = y/(2m) + 1/2`.
fn spherical_uv(direction: lumen_core::algebra::Vector3<f32>) -> (f32, f32) {
    let (x, y, z) = (direction.x, direction.y, direction.z);
    let m = (x * x + y * y + (z + 1.0) * (z + 1.0)).sqrt();
    (x / (2.0 * m) + 0.5, y / (2.0 * m) + 0.5)
}

/// The closed environment sum type.
#[derive(Clone)]
pub enum Environment {
    /// A texture read back via the spherical (u, v) mapping above.
    Spherical { map: Texture, amount: f32 },
    /// A constant spectrum in every direction.
    Spectral { spectrum: Spectrum, amount: f32 },
}

impl Environment {
    /// Adds this environment's contribution to a LightVector whose ray
    /// escaped the scene, replacing (not accumulating onto) its radiance —
    /// matching the original's `setRadiance` call under each wavelength.
    pub fn add_contribution(&self, grid: &WavelengthGrid, light: &mut LightVector) {
        match self {
            Environment::Spherical { map, amount } => {
                let (u, v) = spherical_uv(light.ray.dir);
                let Some(spectrum) = map.resolve_spectrum(grid, u, v) else {
                    return;
                };
                for i in 0..light.len() {
                    light.data_mut()[i] = LightData::new(amount * spectrum[i]);
                }
            }
            Environment::Spectral { spectrum, amount } => {
                for i in 0..light.len() {
                    light.data_mut()[i] = LightData::new(amount * spectrum[i]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::algebra::Vector3;

    #[test]
    fn spectral_environment_replaces_radiance_with_constant_spectrum() {
        let grid = WavelengthGrid::uniform(400.0, 700.0, 4).unwrap();
        let environment = Environment::Spectral {
            spectrum: Spectrum::constant(4, 2.0),
            amount: 0.5,
        };
        let mut light = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)), 0.0, 4);
        environment.add_contribution(&grid, &mut light);
        assert!(light.data().iter().all(|d| (d.radiance - 1.0).abs() < 1.0e-6));
    }
}
