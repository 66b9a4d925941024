//! Spectral light carrier, geometric primitives and spatial index shared by
//! the whole Lumen renderer.
//!
//! Nothing in this crate depends on the scene graph, materials, or task
//! scheduling built on top of it in the sibling crates — it is the
//! self-contained math and physics layer.

pub mod basis;
pub mod bbox;
pub mod error;
pub mod grid;
pub mod light;
pub mod light_vector;
pub mod log;
pub mod medium;
pub mod octree;
pub mod photon;
pub mod ray;
pub mod rng;
pub mod spectrum;

pub use nalgebra as algebra;

pub mod prelude {
    pub use crate::basis::Basis;
    pub use crate::bbox::BoundingBox;
    pub use crate::error::RenderError;
    pub use crate::grid::{GridError, WavelengthGrid};
    pub use crate::light::LightData;
    pub use crate::light_vector::LightVector;
    pub use crate::log::{Log, MessageKind};
    pub use crate::medium::Medium;
    pub use crate::octree::{Octree, OctreeBuilder, OctreeVisitor};
    pub use crate::photon::MultispectralPhoton;
    pub use crate::ray::Ray;
    pub use crate::spectrum::Spectrum;
}
