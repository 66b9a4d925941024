//! Material BSDF model, renderer strategies, the photon map, and color
//! handlers built on top of `lumen-core`'s spectral/geometric layer and
//! `lumen-scene`'s scene graph (spec.md §4.2, §4.4, §4.5).
//!
//! Nothing in `lumen-tasks` or the `executor` binary needs to reach past
//! this crate's public surface: a `Material`, a `Scenery<Material>`, a
//! renderer strategy, and a `ColorHandler` are everything a pixel loop
//! needs.

pub mod brdf_sample;
pub mod color;
pub mod fresnel;
pub mod init_blob;
pub mod material;
pub mod photon_map;
pub mod renderer;

pub use brdf_sample::{sample_material, write_table, BrdfSample, BrdfSampleTable};
pub use color::ColorHandler;
pub use material::{Bsdf, Material};
pub use photon_map::PhotonMap;
pub use renderer::{PhotonMappingParams, PhotonMappingRenderer, SimpleRenderer, TestRenderer};
