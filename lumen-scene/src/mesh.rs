//! Triangle meshes: a private octree over the mesh's own triangles, built
//! once at scene-construction time. Grounded on spec.md §4.1 ("meshes
//! embed a private octree over their triangles and implement `intersect`
//! by running the same visitor pattern internally").

use lumen_core::prelude::*;

use crate::shape::{SurfacePoint, Triangle};

#[derive(Clone)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    bounds: BoundingBox,
    index: Octree<u32>,
}

impl std::fmt::Debug for TriangleMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriangleMesh")
            .field("triangle_count", &self.triangles.len())
            .finish()
    }
}

struct NearestTriangleVisitor<'a> {
    triangles: &'a [Triangle],
    best_distance: f32,
    best_index: Option<usize>,
}

impl<'a> OctreeVisitor<u32> for NearestTriangleVisitor<'a> {
    fn apply(&mut self, ray: &Ray, payload: &u32) {
        let triangle = &self.triangles[*payload as usize];
        if let Some(distance) = triangle.intersect(ray) {
            if distance > 0.0 && distance < self.best_distance {
                self.best_distance = distance;
                self.best_index = Some(*payload as usize);
            }
        }
    }
}

impl TriangleMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let mut bounds = BoundingBox::default();
        let mut builder = OctreeBuilder::new();
        for (i, triangle) in triangles.iter().enumerate() {
            let tri_bounds = triangle.bounds();
            bounds.add_box(&tri_bounds);
            builder.insert(i as u32, tri_bounds);
        }
        Self {
            triangles,
            bounds,
            index: builder.build(),
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let mut visitor = NearestTriangleVisitor {
            triangles: &self.triangles,
            best_distance: f32::INFINITY,
            best_index: None,
        };
        self.index.accept(ray, &mut visitor);
        visitor.best_index.map(|_| visitor.best_distance)
    }

    pub fn local_basis(&self, ray: &Ray, distance: f32) -> SurfacePoint {
        let mut visitor = NearestTriangleVisitor {
            triangles: &self.triangles,
            best_distance: f32::INFINITY,
            best_index: None,
        };
        self.index.accept(ray, &mut visitor);
        match visitor.best_index {
            Some(i) => self.triangles[i].local_basis(ray, distance),
            None => self.triangles[0].local_basis(ray, distance),
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::algebra::{Vector2, Vector3};

    fn quad() -> TriangleMesh {
        let t1 = Triangle {
            a: Vector3::new(-1.0, -1.0, 0.0),
            b: Vector3::new(1.0, -1.0, 0.0),
            c: Vector3::new(1.0, 1.0, 0.0),
            na: Vector3::z(),
            nb: Vector3::z(),
            nc: Vector3::z(),
            uva: Vector2::new(0.0, 0.0),
            uvb: Vector2::new(1.0, 0.0),
            uvc: Vector2::new(1.0, 1.0),
            double_sided: false,
        };
        let t2 = Triangle {
            a: Vector3::new(-1.0, -1.0, 0.0),
            b: Vector3::new(1.0, 1.0, 0.0),
            c: Vector3::new(-1.0, 1.0, 0.0),
            na: Vector3::z(),
            nb: Vector3::z(),
            nc: Vector3::z(),
            uva: Vector2::new(0.0, 0.0),
            uvb: Vector2::new(1.0, 1.0),
            uvc: Vector2::new(0.0, 1.0),
            double_sided: false,
        };
        TriangleMesh::new(vec![t1, t2])
    }

    #[test]
    fn ray_through_quad_center_hits_one_triangle() {
        let mesh = quad();
        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(mesh.intersect(&ray).is_some());
    }

    #[test]
    fn ray_outside_quad_misses() {
        let mesh = quad();
        let ray = Ray::new(Vector3::new(5.0, 5.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(mesh.intersect(&ray).is_none());
    }
}
