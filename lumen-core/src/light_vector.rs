//! The unit of transport through the renderer: a ray carrying one
//! [`LightData`] per wavelength.

use crate::light::LightData;
use crate::ray::Ray;
use nalgebra::Vector3;

/// A ray, a propagation distance, and N [`LightData`] entries in canonical
/// ascending-index order (index `i` is the radiance/polarization for grid
/// wavelength `i`). The polarization reference frame is tracked separately
/// as the unit vector currently defining "0°".
#[derive(Clone, Debug)]
pub struct LightVector {
    pub ray: Ray,
    pub distance: f32,
    data: Vec<LightData>,
    reference_frame: Vector3<f32>,
}

impl LightVector {
    pub fn new(ray: Ray, distance: f32, data: Vec<LightData>, reference_frame: Vector3<f32>) -> Self {
        Self {
            ray,
            distance,
            data,
            reference_frame: reference_frame.normalize(),
        }
    }

    /// Builds a fully depolarized LightVector of all-zero radiance over
    /// `len` wavelengths, with a reference frame chosen from the ray
    /// direction (world-Z, or world-X if the ray is nearly parallel to Z).
    pub fn zero(ray: Ray, distance: f32, len: usize) -> Self {
        let reference_frame = default_reference_frame(ray.dir);
        Self {
            ray,
            distance,
            data: vec![LightData::default(); len],
            reference_frame,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[LightData] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [LightData] {
        &mut self.data
    }

    #[inline]
    pub fn reference_frame(&self) -> Vector3<f32> {
        self.reference_frame
    }

    pub fn clear(&mut self) {
        for d in self.data.iter_mut() {
            *d = LightData::default();
        }
    }

    pub fn mul(&mut self, factor: f32) {
        for d in self.data.iter_mut() {
            d.mul(factor);
        }
    }

    pub fn add_assign(&mut self, other: &LightVector) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            a.add_assign(b);
        }
    }

    fn reframe_to(&mut self, new_frame: Vector3<f32>) {
        let new_frame = new_frame.normalize();
        let cos = self.reference_frame.dot(&new_frame).clamp(-1.0, 1.0);
        let sin_sign = self.reference_frame.cross(&new_frame).dot(&self.ray.dir).signum();
        let angle = cos.acos() * if sin_sign == 0.0 { 1.0 } else { sin_sign };
        for d in self.data.iter_mut() {
            d.rotate(angle);
        }
        self.reference_frame = new_frame;
    }

    /// Changes the reference frame under the convention that this
    /// LightVector is propagating *towards* its source (an incident
    /// sample): rotates the polarization state into `new_frame` directly.
    pub fn change_incident_frame(&mut self, new_frame: Vector3<f32>) {
        self.reframe_to(new_frame);
    }

    /// Changes the reference frame under the convention that this
    /// LightVector is propagating *away from* a surface (a reemitted
    /// sample): rotates into `new_frame` and then flips handedness, since
    /// reemitted light travels opposite to incident light through the same
    /// geometric transform.
    pub fn change_reemited_frame(&mut self, new_frame: Vector3<f32>) {
        self.reframe_to(new_frame);
        for d in self.data.iter_mut() {
            d.flip();
        }
    }
}

/// World-Z, unless the ray direction is nearly parallel to Z, in which case
/// world-X is used instead.
pub fn default_reference_frame(dir: Vector3<f32>) -> Vector3<f32> {
    let z = Vector3::new(0.0, 0.0, 1.0);
    if dir.cross(&z).norm() < 1e-4 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::LightData;

    #[test]
    fn zero_vector_has_requested_length_and_zero_radiance() {
        let ray = Ray::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
        let lv = LightVector::zero(ray, 0.0, 4);
        assert_eq!(lv.len(), 4);
        assert!(lv.data().iter().all(|d| d.radiance == 0.0));
    }

    #[test]
    fn default_reference_frame_avoids_parallel_to_dir() {
        let along_z = Vector3::new(0.0, 0.0, 1.0);
        let frame = default_reference_frame(along_z);
        assert!(frame.cross(&along_z).norm() > 0.5);
    }

    #[test]
    fn add_assign_sums_componentwise() {
        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let mut a = LightVector::new(ray, 0.0, vec![LightData::new(1.0)], Vector3::new(1.0, 0.0, 0.0));
        let b = LightVector::new(ray, 0.0, vec![LightData::new(2.0)], Vector3::new(1.0, 0.0, 0.0));
        a.add_assign(&b);
        assert_eq!(a.data()[0].radiance, 3.0);
    }
}
