//! Geometric primitives: the payload type the scene's octrees are built
//! over. Grounded on the intersection contract of spec.md §4.1
//! ("test a precomputed AABB first, then do a standard plane-ray solve
//! followed by three edge cross-product sign tests") and the sphere/mesh
//! shapes of `original_source/sources/include/shapes/`.

use lumen_core::algebra::{Vector2, Vector3};
use lumen_core::prelude::*;

use crate::mesh::TriangleMesh;
use crate::transform::{NormalMap, Transformed};

/// A surface point: the local orthonormal frame plus texture coordinates.
#[derive(Clone, Copy, Debug)]
pub struct SurfacePoint {
    pub basis: Basis,
    pub uv: Vector2<f32>,
}

#[derive(Clone, Debug)]
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
    Mesh(TriangleMesh),
    /// A degenerate point shape used by non-areal light sources: never
    /// intersected by a camera ray, exists only to give a source a
    /// position and an emission direction. Grounded on spec.md §3's
    /// "may be a degenerate null shape for non-areal sources".
    Null(Vector3<f32>),
    Transformed(Box<Transformed>),
    NormalMapped(Box<NormalMap>),
}

impl Shape {
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        match self {
            Shape::Sphere(s) => s.intersect(ray),
            Shape::Triangle(t) => t.intersect(ray),
            Shape::Mesh(m) => m.intersect(ray),
            Shape::Null(_) => None,
            Shape::Transformed(t) => t.intersect(ray),
            Shape::NormalMapped(n) => n.intersect(ray),
        }
    }

    pub fn local_basis(&self, ray: &Ray, distance: f32) -> SurfacePoint {
        match self {
            Shape::Sphere(s) => s.local_basis(ray, distance),
            Shape::Triangle(t) => t.local_basis(ray, distance),
            Shape::Mesh(m) => m.local_basis(ray, distance),
            Shape::Null(p) => SurfacePoint {
                basis: Basis::from_normal(*p, Vector3::z()),
                uv: Vector2::new(0.0, 0.0),
            },
            Shape::Transformed(t) => t.local_basis(ray, distance),
            Shape::NormalMapped(n) => n.local_basis(ray, distance),
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        match self {
            Shape::Sphere(s) => s.bounds(),
            Shape::Triangle(t) => t.bounds(),
            Shape::Mesh(m) => m.bounds(),
            Shape::Null(p) => BoundingBox::from_point(*p),
            Shape::Transformed(t) => t.bounds(),
            Shape::NormalMapped(n) => n.bounds(),
        }
    }

    pub fn centroid(&self) -> Vector3<f32> {
        match self {
            Shape::Sphere(s) => s.center,
            Shape::Triangle(t) => (t.a + t.b + t.c) / 3.0,
            Shape::Mesh(m) => m.bounds().center(),
            Shape::Null(p) => *p,
            Shape::Transformed(t) => t.bounds().center(),
            Shape::NormalMapped(n) => n.bounds().center(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub center: Vector3<f32>,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vector3<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.dir);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let t_near = -b - sqrt_d;
        let t_far = -b + sqrt_d;
        if t_near > 0.0 {
            Some(t_near)
        } else if t_far > 0.0 {
            Some(t_far)
        } else {
            None
        }
    }

    pub fn local_basis(&self, ray: &Ray, distance: f32) -> SurfacePoint {
        let hit = ray.at(distance);
        let normal = (hit - self.center) / self.radius;
        let basis = Basis::from_normal(hit, normal);
        let u = normal.z.atan2(normal.x) / (2.0 * std::f32::consts::PI) + 0.5;
        let v = (normal.y.clamp(-1.0, 1.0)).acos() / std::f32::consts::PI;
        SurfacePoint {
            basis,
            uv: Vector2::new(u, v),
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        let r = Vector3::new(self.radius, self.radius, self.radius);
        BoundingBox::from_min_max(self.center - r, self.center + r)
    }
}

/// A single triangle, optionally double-sided, with per-vertex normals
/// and UVs for smooth interpolation (spec.md §4.1).
#[derive(Clone, Debug)]
pub struct Triangle {
    pub a: Vector3<f32>,
    pub b: Vector3<f32>,
    pub c: Vector3<f32>,
    pub na: Vector3<f32>,
    pub nb: Vector3<f32>,
    pub nc: Vector3<f32>,
    pub uva: Vector2<f32>,
    pub uvb: Vector2<f32>,
    pub uvc: Vector2<f32>,
    pub double_sided: bool,
}

struct Barycentric {
    t: f32,
    /// Weight on vertex `a`.
    wa: f32,
    /// Weight on vertex `b`.
    wb: f32,
}

impl Triangle {
    fn solve(&self, ray: &Ray) -> Option<Barycentric> {
        if self.bounds().ray_intersection(ray.origin, ray.dir).is_none() {
            return None;
        }
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let normal = edge1.cross(&edge2);
        let denom = normal.dot(&ray.dir);
        if denom.abs() < 1.0e-8 {
            return None;
        }
        let t = normal.dot(&(self.a - ray.origin)) / denom;
        if t <= 0.0 {
            return None;
        }
        let p = ray.at(t);
        // Each c_opposite_X is the signed area of the sub-triangle opposite
        // vertex X; normalizing by the full area gives X's barycentric
        // weight directly.
        let area = normal.dot(&normal);
        let c_opposite_a = (self.c - self.b).cross(&(p - self.b));
        let c_opposite_b = (self.a - self.c).cross(&(p - self.c));
        let c_opposite_c = edge1.cross(&(p - self.a));
        if normal.dot(&c_opposite_a) < 0.0
            || normal.dot(&c_opposite_b) < 0.0
            || normal.dot(&c_opposite_c) < 0.0
        {
            return None;
        }
        let wa = normal.dot(&c_opposite_a) / area;
        let wb = normal.dot(&c_opposite_b) / area;
        Some(Barycentric { t, wa, wb })
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.solve(ray).map(|b| b.t)
    }

    pub fn local_basis(&self, ray: &Ray, distance: f32) -> SurfacePoint {
        let hit = ray.at(distance);
        let bary = self.solve(ray).unwrap_or(Barycentric {
            t: distance,
            wa: 1.0,
            wb: 0.0,
        });
        let wc = 1.0 - bary.wa - bary.wb;
        let mut normal = (self.na * bary.wa + self.nb * bary.wb + self.nc * wc).normalize();
        if self.double_sided && normal.dot(&ray.dir) > 0.0 {
            normal = -normal;
        }
        let uv = self.uva * bary.wa + self.uvb * bary.wb + self.uvc * wc;
        SurfacePoint {
            basis: Basis::from_normal(hit, normal),
            uv,
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&[self.a, self.b, self.c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_ray_through_center_hits_at_near_side() {
        let sphere = Sphere::new(Vector3::new(0.0, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let t = sphere.intersect(&ray).expect("should hit");
        assert!((t - 4.0).abs() < 1.0e-4);
    }

    #[test]
    fn sphere_ray_missing_returns_none() {
        let sphere = Sphere::new(Vector3::new(0.0, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vector3::new(5.0, 5.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn sphere_basis_normal_points_outward() {
        let sphere = Sphere::new(Vector3::new(0.0, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let t = sphere.intersect(&ray).unwrap();
        let point = sphere.local_basis(&ray, t);
        assert!((point.basis.k.z - (-1.0)).abs() < 1.0e-4);
    }

    #[test]
    fn triangle_ray_through_centroid_hits() {
        let tri = Triangle {
            a: Vector3::new(-1.0, -1.0, 0.0),
            b: Vector3::new(1.0, -1.0, 0.0),
            c: Vector3::new(0.0, 1.0, 0.0),
            na: Vector3::new(0.0, 0.0, 1.0),
            nb: Vector3::new(0.0, 0.0, 1.0),
            nc: Vector3::new(0.0, 0.0, 1.0),
            uva: Vector2::new(0.0, 0.0),
            uvb: Vector2::new(1.0, 0.0),
            uvc: Vector2::new(0.0, 1.0),
            double_sided: false,
        };
        let ray = Ray::new(Vector3::new(0.0, -0.3, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(tri.intersect(&ray).is_some());
    }

    #[test]
    fn triangle_ray_outside_edges_misses() {
        let tri = Triangle {
            a: Vector3::new(-1.0, -1.0, 0.0),
            b: Vector3::new(1.0, -1.0, 0.0),
            c: Vector3::new(0.0, 1.0, 0.0),
            na: Vector3::new(0.0, 0.0, 1.0),
            nb: Vector3::new(0.0, 0.0, 1.0),
            nc: Vector3::new(0.0, 0.0, 1.0),
            uva: Vector2::new(0.0, 0.0),
            uvb: Vector2::new(1.0, 0.0),
            uvc: Vector2::new(0.0, 1.0),
            double_sided: false,
        };
        let ray = Ray::new(Vector3::new(5.0, 5.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(tri.intersect(&ray).is_none());
    }
}
