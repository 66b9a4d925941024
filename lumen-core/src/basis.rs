//! Oriented orthonormal surface frames.

use nalgebra::Vector3;

/// An oriented orthonormal frame at a surface point: origin, tangent `i`,
/// bitangent `j`, normal `k`. Shapes return these from `local_basis`;
/// materials use `k` for reflection/refraction and `i`,`j` for tangent-space
/// effects (anisotropy, UV derivatives).
#[derive(Copy, Clone, Debug)]
pub struct Basis {
    pub origin: Vector3<f32>,
    pub i: Vector3<f32>,
    pub j: Vector3<f32>,
    pub k: Vector3<f32>,
}

impl Basis {
    /// Builds an orthonormal basis from a point and a (not necessarily
    /// normalized) normal direction, choosing an arbitrary but consistent
    /// tangent.
    pub fn from_normal(origin: Vector3<f32>, normal: Vector3<f32>) -> Self {
        let k = normal.normalize();
        let helper = if k.x.abs() < 0.99 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let i = k.cross(&helper).normalize();
        let j = k.cross(&i);
        Self { origin, i, j, k }
    }

    /// World-space direction expressed in this basis's local coordinates.
    pub fn to_local(&self, world_dir: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(world_dir.dot(&self.i), world_dir.dot(&self.j), world_dir.dot(&self.k))
    }

    pub fn to_world(&self, local_dir: Vector3<f32>) -> Vector3<f32> {
        self.i * local_dir.x + self.j * local_dir.y + self.k * local_dir.z
    }

    /// Flips `k` (and the dependent tangent) to face towards `towards`.
    pub fn facing(&self, towards: Vector3<f32>) -> Self {
        if self.k.dot(&towards) < 0.0 {
            Self {
                origin: self.origin,
                i: self.i,
                j: -self.j,
                k: -self.k,
            }
        } else {
            *self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_from_normal_is_orthonormal() {
        let b = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 1.0, 0.0));
        assert!((b.i.norm() - 1.0).abs() < 1e-5);
        assert!((b.j.norm() - 1.0).abs() < 1e-5);
        assert!((b.k.norm() - 1.0).abs() < 1e-5);
        assert!(b.i.dot(&b.j).abs() < 1e-5);
        assert!(b.i.dot(&b.k).abs() < 1e-5);
        assert!(b.j.dot(&b.k).abs() < 1e-5);
    }

    #[test]
    fn facing_flips_towards_viewer() {
        let b = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let flipped = b.facing(Vector3::new(0.0, 0.0, -1.0));
        assert!(flipped.k.dot(&Vector3::new(0.0, 0.0, -1.0)) > 0.0);
    }
}
