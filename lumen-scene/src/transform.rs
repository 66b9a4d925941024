//! Affine wrappers around a shape: translation, rotation, non-uniform
//! scale. Grounded on `original_source/sources/include/objectshapes/
//! {Scale,Rotation,Transformation}.hpp`: a transform shape maps the
//! incoming ray into the wrapped shape's canonical space, delegates
//! intersection, then maps the resulting basis back out to world space.

use lumen_core::algebra::{Matrix3, Vector3};
use lumen_core::prelude::*;

use crate::shape::{Shape, SurfacePoint};
use crate::texture::Texture;

/// A shape composed with an affine map. `to_local`/`to_world` are kept as
/// explicit inverse pairs rather than a single matrix-plus-inverse() call
/// so that degenerate scales (a zero factor, collapsing the shape to a
/// plane) do not have to go through a matrix inversion that would fail.
#[derive(Clone)]
pub struct Transformed {
    shape: Box<Shape>,
    linear_to_local: Matrix3<f32>,
    linear_to_world: Matrix3<f32>,
    translation: Vector3<f32>,
}

impl std::fmt::Debug for Transformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformed").finish()
    }
}

impl Transformed {
    pub fn translate(shape: Shape, offset: Vector3<f32>) -> Self {
        Self {
            shape: Box::new(shape),
            linear_to_local: Matrix3::identity(),
            linear_to_world: Matrix3::identity(),
            translation: offset,
        }
    }

    pub fn rotate(shape: Shape, axis: Vector3<f32>, angle: f32) -> Self {
        let to_world = nalgebra::Rotation3::from_axis_angle(
            &nalgebra::Unit::new_normalize(axis),
            angle,
        )
        .into_inner();
        let to_local = to_world.transpose();
        Self {
            shape: Box::new(shape),
            linear_to_local: to_local,
            linear_to_world: to_world,
            translation: Vector3::zeros(),
        }
    }

    /// A zero factor collapses that axis in the shape's own space, per
    /// the constructor contract inherited from the original `Scale`.
    pub fn scale(shape: Shape, factors: Vector3<f32>) -> Self {
        let inv = |f: f32| if f == 0.0 { 0.0 } else { 1.0 / f };
        let to_local = Matrix3::from_diagonal(&Vector3::new(
            inv(factors.x),
            inv(factors.y),
            inv(factors.z),
        ));
        let to_world = Matrix3::from_diagonal(&factors);
        Self {
            shape: Box::new(shape),
            linear_to_local: to_local,
            linear_to_world: to_world,
            translation: Vector3::zeros(),
        }
    }

    fn to_local_point(&self, p: Vector3<f32>) -> Vector3<f32> {
        self.linear_to_local * (p - self.translation)
    }

    fn to_local_dir(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.linear_to_local * v
    }

    fn to_world_point(&self, p: Vector3<f32>) -> Vector3<f32> {
        self.linear_to_world * p + self.translation
    }

    fn to_world_dir(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.linear_to_world * v
    }

    fn local_ray(&self, ray: &Ray) -> Ray {
        // Deliberately not renormalized: the wrapped shape's `intersect`
        // returns a distance parametrized along this (possibly rescaled)
        // direction, which `local_basis` below undoes by recomputing the
        // hit point in world space rather than trusting the raw distance.
        Ray {
            origin: self.to_local_point(ray.origin),
            dir: self.to_local_dir(ray.dir),
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let local = self.local_ray(ray);
        let local_distance = self.shape.intersect(&local)?;
        let local_hit = local.origin + local.dir * local_distance;
        let world_hit = self.to_world_point(local_hit);
        Some((world_hit - ray.origin).dot(&ray.dir))
    }

    pub fn local_basis(&self, ray: &Ray, distance: f32) -> SurfacePoint {
        let local = self.local_ray(ray);
        let world_hit = ray.at(distance);
        let local_hit = self.to_local_point(world_hit);
        let local_distance = (local_hit - local.origin).dot(&local.dir) / local.dir.norm_squared().max(1.0e-12);
        let point = self.shape.local_basis(&local, local_distance);
        let world_normal = self.to_world_dir(point.basis.k).normalize();
        SurfacePoint {
            basis: Basis::from_normal(world_hit, world_normal),
            uv: point.uv,
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        let local_bounds = self.shape.bounds();
        let corners = [
            Vector3::new(local_bounds.min.x, local_bounds.min.y, local_bounds.min.z),
            Vector3::new(local_bounds.min.x, local_bounds.min.y, local_bounds.max.z),
            Vector3::new(local_bounds.min.x, local_bounds.max.y, local_bounds.min.z),
            Vector3::new(local_bounds.min.x, local_bounds.max.y, local_bounds.max.z),
            Vector3::new(local_bounds.max.x, local_bounds.min.y, local_bounds.min.z),
            Vector3::new(local_bounds.max.x, local_bounds.min.y, local_bounds.max.z),
            Vector3::new(local_bounds.max.x, local_bounds.max.y, local_bounds.min.z),
            Vector3::new(local_bounds.max.x, local_bounds.max.y, local_bounds.max.z),
        ];
        let world_corners: Vec<Vector3<f32>> =
            corners.iter().map(|c| self.to_world_point(*c)).collect();
        BoundingBox::from_points(&world_corners)
    }
}

/// Perturbs a wrapped shape's surface normal by a normal map, leaving
/// intersection untouched. Grounded on `original_source/sources/include/
/// objectshapes/NormalMap.hpp`; `global=false` decodes the map in the
/// underlying basis's tangent space, `global=true` treats the decoded
/// vector as already expressed in world space.
#[derive(Clone, Debug)]
pub struct NormalMap {
    shape: Box<Shape>,
    texture: Texture,
    global: bool,
}

impl NormalMap {
    pub fn new(shape: Shape, texture: Texture, global: bool) -> Self {
        Self {
            shape: Box::new(shape),
            texture,
            global,
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.shape.intersect(ray)
    }

    pub fn local_basis(&self, ray: &Ray, distance: f32) -> SurfacePoint {
        let point = self.shape.local_basis(ray, distance);
        let Some(raw) = self.texture.sample_raw(point.uv.x, point.uv.y) else {
            return point;
        };
        let decoded = Vector3::new(
            raw.first().copied().unwrap_or(0.5) * 2.0 - 1.0,
            raw.get(1).copied().unwrap_or(0.5) * 2.0 - 1.0,
            raw.get(2).copied().unwrap_or(1.0) * 2.0 - 1.0,
        );
        if decoded.norm_squared() < 1.0e-12 {
            return point;
        }
        let world_normal = if self.global {
            decoded.normalize()
        } else {
            point.basis.to_world(decoded).normalize()
        };
        let basis = Basis::from_normal(point.basis.origin, world_normal).facing(-ray.dir);
        SurfacePoint { basis, uv: point.uv }
    }

    pub fn bounds(&self) -> BoundingBox {
        self.shape.bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Sphere;

    #[test]
    fn translated_sphere_moves_the_hit_point() {
        let sphere = Shape::Sphere(Sphere::new(Vector3::zeros(), 1.0));
        let moved = Transformed::translate(sphere, Vector3::new(5.0, 0.0, 0.0));
        let ray = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let t = moved.intersect(&ray).expect("should hit the moved sphere");
        assert!((t - 4.0).abs() < 1.0e-3);
    }

    #[test]
    fn scaled_sphere_widens_the_silhouette() {
        let sphere = Shape::Sphere(Sphere::new(Vector3::zeros(), 1.0));
        let widened = Transformed::scale(sphere, Vector3::new(3.0, 1.0, 1.0));
        let ray = Ray::new(Vector3::new(2.5, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(widened.intersect(&ray).is_some());
    }

    #[test]
    fn rotated_sphere_bounds_still_contain_the_sphere() {
        let sphere = Shape::Sphere(Sphere::new(Vector3::new(1.0, 0.0, 0.0), 1.0));
        let rotated = Transformed::rotate(sphere, Vector3::z(), std::f32::consts::FRAC_PI_2);
        assert!(rotated.bounds().contains_point(Vector3::new(0.0, 1.0, 0.0)));
    }
}
