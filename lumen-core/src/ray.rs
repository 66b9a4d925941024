//! Rays.

use crate::bbox::BoundingBox;
use nalgebra::Vector3;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub dir: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, dir: Vector3<f32>) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.dir * t
    }

    /// Offsets the ray's origin forward along its own direction by `bias`,
    /// used to suppress self-intersection before each octree payload test.
    #[inline]
    pub fn biased(&self, bias: f32) -> Ray {
        Ray {
            origin: self.origin + self.dir * bias,
            dir: self.dir,
        }
    }

    #[inline]
    pub fn box_intersection(&self, bbox: &BoundingBox) -> Option<(f32, f32)> {
        bbox.ray_intersection(self.origin, self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biased_ray_moves_forward_along_direction() {
        let ray = Ray::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let biased = ray.biased(0.01);
        assert!((biased.origin.x - 0.01).abs() < 1e-6);
        assert_eq!(biased.dir, ray.dir);
    }

    #[test]
    fn new_normalizes_direction() {
        let ray = Ray::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(3.0, 0.0, 0.0));
        assert!((ray.dir.norm() - 1.0).abs() < 1e-6);
    }
}
