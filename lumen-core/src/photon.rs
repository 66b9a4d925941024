//! Photons, used only by photon-mapping.

use nalgebra::Vector3;

/// A multispectral photon: one radiance sample per wavelength, plus its
/// position, propagation direction, the surface normal at its last
/// interaction, and the distance it has travelled since emission.
#[derive(Clone, Debug)]
pub struct MultispectralPhoton {
    pub radiance: Vec<f32>,
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
}

impl MultispectralPhoton {
    pub fn new(len: usize, position: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            radiance: vec![0.0; len],
            position,
            direction: direction.normalize(),
            normal: Vector3::zeros(),
            distance: 0.0,
        }
    }

    pub fn mean_radiance(&self) -> f32 {
        if self.radiance.is_empty() {
            0.0
        } else {
            self.radiance.iter().sum::<f32>() / self.radiance.len() as f32
        }
    }
}
