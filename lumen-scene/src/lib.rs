//! Scene graph: shapes, transform/normal-map wrappers, textures, light
//! sources, cameras, and the frozen, index-based [`Scenery`] that answers
//! nearest-intersection queries over both objects and sources (spec.md §3,
//! §4.1).
//!
//! `Scenery` is generic over its material type rather than depending on
//! `lumen-render` directly: the renderer owns a `Scenery<Material>` and is
//! assembled last, once the scene is frozen, which is the same ownership
//! direction spec.md's lifecycle describes ("the Renderer is initialized
//! after the scene is complete") without requiring this crate to depend on
//! the one built on top of it.

pub mod arena;
pub mod camera;
pub mod environment;
pub mod mesh;
pub mod shape;
pub mod source;
pub mod texture;
pub mod transform;

pub use arena::{Arena, Id};
pub use camera::{Camera, FishEyeCamera, OrthoscopicCamera, PerspectiveCamera, PolarCamera};
pub use environment::Environment;
pub use mesh::TriangleMesh;
pub use shape::{Shape, Sphere, SurfacePoint, Triangle};
pub use source::{DirectionalSource, LightSource, PlaneSource, PointSource};
pub use texture::{AlphaMode, Image, RepeatMode, Texture};
pub use transform::{NormalMap, Transformed};

use lumen_core::prelude::*;

/// A scene object: a shape paired with a material, bounded by an inner and
/// outer participating medium. Grounded on spec.md §3's "Object" ("owns a
/// shape, a material, an inner medium, an outer medium, and a stable
/// integer index assigned at scene build time" — the index is the
/// `Id<Object<Material>>` the owning [`Arena`] hands back from
/// [`SceneryBuilder::add_object`]).
#[derive(Clone)]
pub struct Object<Material> {
    pub shape: Shape,
    pub material: Material,
    pub inner_medium: Option<Id<Medium>>,
    pub outer_medium: Option<Id<Medium>>,
}

impl<Material> Object<Material> {
    pub fn new(shape: Shape, material: Material) -> Self {
        Self {
            shape,
            material,
            inner_medium: None,
            outer_medium: None,
        }
    }

    pub fn with_media(mut self, inner: Option<Id<Medium>>, outer: Option<Id<Medium>>) -> Self {
        self.inner_medium = inner;
        self.outer_medium = outer;
        self
    }
}

/// A scene light source: its emission model plus the shape a camera ray can
/// strike directly. Non-areal sources (point, directional) carry a
/// [`Shape::Null`].
#[derive(Clone, Debug)]
pub struct Source {
    pub light: LightSource,
    pub shape: Shape,
}

impl Source {
    pub fn new(light: LightSource, shape: Shape) -> Self {
        Self { light, shape }
    }
}

struct NearestObjectVisitor<'a, Material> {
    objects: &'a Arena<Object<Material>>,
    excluding: Option<Id<Object<Material>>>,
    best_distance: f32,
    best: Option<Id<Object<Material>>>,
}

impl<'a, Material> OctreeVisitor<Id<Object<Material>>> for NearestObjectVisitor<'a, Material> {
    fn apply(&mut self, ray: &Ray, payload: &Id<Object<Material>>) {
        if self.excluding == Some(*payload) {
            return;
        }
        let object = self.objects.get(*payload);
        if let Some(distance) = object.shape.intersect(ray) {
            if distance > 0.0 && distance < self.best_distance {
                self.best_distance = distance;
                self.best = Some(*payload);
            }
        }
    }
}

struct NearestSourceVisitor<'a> {
    sources: &'a Arena<Source>,
    excluding: Option<Id<Source>>,
    best_distance: f32,
    best: Option<Id<Source>>,
}

impl<'a> OctreeVisitor<Id<Source>> for NearestSourceVisitor<'a> {
    fn apply(&mut self, ray: &Ray, payload: &Id<Source>) {
        if self.excluding == Some(*payload) {
            return;
        }
        let source = self.sources.get(*payload);
        if let Some(distance) = source.shape.intersect(ray) {
            if distance > 0.0 && distance < self.best_distance {
                self.best_distance = distance;
                self.best = Some(*payload);
            }
        }
    }
}

/// Accumulates objects, sources, media, textures and cameras before a
/// one-shot [`SceneryBuilder::build`], mirroring [`OctreeBuilder`]'s own
/// accumulate-then-freeze shape (spec.md §3's lifecycle: "objects /
/// sources / textures / media / cameras are then frozen").
pub struct SceneryBuilder<Material> {
    objects: Arena<Object<Material>>,
    sources: Arena<Source>,
    media: Arena<Medium>,
    textures: Arena<Texture>,
    cameras: Vec<Camera>,
    environment: Option<Environment>,
    bias: f32,
}

impl<Material> SceneryBuilder<Material> {
    pub fn new(bias: f32) -> Self {
        Self {
            objects: Arena::new(),
            sources: Arena::new(),
            media: Arena::new(),
            textures: Arena::new(),
            cameras: Vec::new(),
            environment: None,
            bias,
        }
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = Some(environment);
    }

    pub fn add_object(&mut self, object: Object<Material>) -> Id<Object<Material>> {
        self.objects.push(object)
    }

    pub fn add_source(&mut self, source: Source) -> Id<Source> {
        self.sources.push(source)
    }

    pub fn add_medium(&mut self, medium: Medium) -> Id<Medium> {
        self.media.push(medium)
    }

    pub fn add_texture(&mut self, texture: Texture) -> Id<Texture> {
        self.textures.push(texture)
    }

    pub fn add_camera(&mut self, camera: Camera) {
        self.cameras.push(camera);
    }

    pub fn build(self) -> Scenery<Material> {
        let mut object_builder = OctreeBuilder::new();
        for (id, object) in self.objects.iter_with_ids() {
            object_builder.insert(id, object.shape.bounds());
        }
        let mut source_builder = OctreeBuilder::new();
        for (id, source) in self.sources.iter_with_ids() {
            source_builder.insert(id, source.shape.bounds());
        }
        Scenery {
            object_index: object_builder.build(),
            source_index: source_builder.build(),
            objects: self.objects,
            sources: self.sources,
            media: self.media,
            textures: self.textures,
            cameras: self.cameras,
            environment: self.environment,
            bias: self.bias,
        }
    }
}

/// The frozen scene: objects and sources in their own octrees, plus the
/// arenas every index into this struct resolves against. Grounded on
/// spec.md §3's "Scenery" and §4.1's nearest-intersection protocol.
pub struct Scenery<Material> {
    pub objects: Arena<Object<Material>>,
    object_index: Octree<Id<Object<Material>>>,
    pub sources: Arena<Source>,
    source_index: Octree<Id<Source>>,
    pub media: Arena<Medium>,
    pub textures: Arena<Texture>,
    pub cameras: Vec<Camera>,
    pub environment: Option<Environment>,
    pub bias: f32,
}

impl<Material> Scenery<Material> {
    /// Nearest object a (bias-offset) ray strikes, `excluding` an object id
    /// already known to be behind the ray's origin (its own surface, for a
    /// secondary ray). Per the Open Question resolution recorded in
    /// SPEC_FULL.md §3, the bias offset is applied unconditionally, whether
    /// or not `excluding` is given — they address different problems
    /// (self-hit exclusion vs. numerical grazing at `t≈0`).
    pub fn nearest_object(
        &self,
        ray: &Ray,
        excluding: Option<Id<Object<Material>>>,
    ) -> Option<(Id<Object<Material>>, &Object<Material>, f32, SurfacePoint)> {
        let biased = ray.biased(self.bias);
        let mut visitor = NearestObjectVisitor {
            objects: &self.objects,
            excluding,
            best_distance: f32::INFINITY,
            best: None,
        };
        self.object_index.accept(&biased, &mut visitor);
        visitor.best.map(|id| {
            let object = self.objects.get(id);
            let point = object.shape.local_basis(&biased, visitor.best_distance);
            (id, object, visitor.best_distance, point)
        })
    }

    pub fn nearest_source(
        &self,
        ray: &Ray,
        excluding: Option<Id<Source>>,
    ) -> Option<(Id<Source>, &Source, f32, SurfacePoint)> {
        let biased = ray.biased(self.bias);
        let mut visitor = NearestSourceVisitor {
            sources: &self.sources,
            excluding,
            best_distance: f32::INFINITY,
            best: None,
        };
        self.source_index.accept(&biased, &mut visitor);
        visitor.best.map(|id| {
            let source = self.sources.get(id);
            let point = source.shape.local_basis(&biased, visitor.best_distance);
            (id, source, visitor.best_distance, point)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::algebra::Vector3;

    #[derive(Clone)]
    struct DummyMaterial;

    #[test]
    fn nearest_object_skips_excluded_and_respects_bias() {
        let mut builder: SceneryBuilder<DummyMaterial> = SceneryBuilder::new(1.0e-3);
        let near = builder.add_object(Object::new(
            Shape::Sphere(Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0)),
            DummyMaterial,
        ));
        let far = builder.add_object(Object::new(
            Shape::Sphere(Sphere::new(Vector3::new(0.0, 0.0, 10.0), 1.0)),
            DummyMaterial,
        ));
        let scenery = builder.build();

        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let (id, _, _, _) = scenery.nearest_object(&ray, None).expect("should hit the near sphere");
        assert_eq!(id, near);

        let (id, _, _, _) = scenery
            .nearest_object(&ray, Some(near))
            .expect("should hit the far sphere once the near one is excluded");
        assert_eq!(id, far);
    }

    #[test]
    fn null_shaped_source_is_never_directly_visible() {
        let mut builder: SceneryBuilder<DummyMaterial> = SceneryBuilder::new(1.0e-3);
        let point_light = source::PointSource::new(Spectrum::constant(3, 1.0), 10.0, Vector3::new(0.0, 0.0, 5.0));
        builder.add_source(Source::new(
            LightSource::Point(point_light),
            Shape::Null(Vector3::new(0.0, 0.0, 5.0)),
        ));
        let scenery = builder.build();
        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        assert!(scenery.nearest_source(&ray, None).is_none());
    }

    #[test]
    fn areal_source_with_sphere_shape_is_directly_visible() {
        let mut builder: SceneryBuilder<DummyMaterial> = SceneryBuilder::new(1.0e-3);
        let plane_light = source::PlaneSource::new(
            Spectrum::constant(3, 1.0),
            10.0,
            Basis::from_normal(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0)),
            4,
        );
        let id = builder.add_source(Source::new(
            LightSource::Plane(plane_light),
            Shape::Sphere(Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0)),
        ));
        let scenery = builder.build();
        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let (hit_id, _, _, _) = scenery.nearest_source(&ray, None).expect("should hit the source's sphere");
        assert_eq!(hit_id, id);
    }
}
