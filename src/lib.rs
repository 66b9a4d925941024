//! The `lumen` facade: ties `lumen-core`'s spectral/geometric layer,
//! `lumen-scene`'s scene graph, `lumen-render`'s materials and renderer
//! strategies, and `lumen-tasks`' task decomposition and executors into
//! the one thing the `executor` binary actually needs — load a scene
//! description, build a [`pixel_job::ScenePixelJob`], hand it to whichever
//! executor the CLI selected.
//!
//! [`scene_description`] is the (deliberately small) stand-in for the
//! scene-description text parser spec.md §1 places out of scope: it fills
//! in only the interface boundary spec.md §6 actually specifies.

pub mod pixel_job;
pub mod scene_description;

pub use pixel_job::{RenderStrategy, ScenePixelJob};
pub use scene_description::{load_description, load_scene, BuiltScene, RendererChoice, SceneDescription};
