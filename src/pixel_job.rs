//! Bridges a built scene (spec.md §3/§4.1), a renderer strategy (spec.md
//! §4.4) and a color handler (spec.md §4.5) into the single
//! `lumen_tasks::executor::PixelJob` trait the task-decomposition layer
//! actually drives — `lumen-tasks` has no dependency on `lumen-render`
//! (see its own doc comment), so this crate is where the two finally meet.

use lumen_core::prelude::*;
use lumen_core::rng::worker_rng;
use lumen_render::{ColorHandler, Material, PhotonMappingRenderer, SimpleRenderer, TestRenderer};
use lumen_scene::{Camera, Scenery};
use lumen_tasks::prelude::PixelJob;
use parking_lot::Mutex;

/// The renderer variant a built scene selected (spec.md §4.4); photon
/// mapping's pass 1 (`PhotonMappingRenderer::build`/`from_init_blob`) has
/// already run by the time a job is constructed — only pass 2 (`trace`)
/// happens per pixel.
pub enum RenderStrategy {
    Simple(SimpleRenderer),
    PhotonMapping(PhotonMappingRenderer),
    Test(TestRenderer),
}

/// One `PixelJob`: a frozen scene, the camera generating primary rays, the
/// chosen renderer strategy, and the color handler every traced
/// `LightVector` is projected through.
///
/// `grid`/`scenery`/`strategy`/`color_handler` are all borrowed rather than
/// owned: a single built scene (spec.md §3), its one renderer strategy
/// (photon mapping's pass 1 already run) and its one color handler are
/// shared by every camera it names, so the `executor` binary builds each
/// of those once and constructs one `ScenePixelJob` per camera against
/// them, rather than rebuilding the photon maps or cloning the scene graph
/// per camera.
///
/// `color_handler` is a shared `Mutex` rather than a private copy per job:
/// [`lumen_render::color::SpectrophotometerHandler`] accumulates state
/// across every pixel sampled — across every camera too, in this
/// workspace's one-handler-per-scene simplification (DESIGN.md) — so one
/// instance shared by every camera's job is the only way its final average
/// is correct regardless of how `rayon` or the `ClientServerExecutor`
/// happens to interleave pixels across workers.
pub struct ScenePixelJob<'scene> {
    pub grid: &'scene WavelengthGrid,
    pub scenery: &'scene Scenery<Material>,
    pub camera: Camera,
    pub strategy: &'scene RenderStrategy,
    pub color_handler: &'scene Mutex<ColorHandler>,
}

impl<'scene> ScenePixelJob<'scene> {
    pub fn new(
        grid: &'scene WavelengthGrid,
        scenery: &'scene Scenery<Material>,
        camera: Camera,
        strategy: &'scene RenderStrategy,
        color_handler: &'scene Mutex<ColorHandler>,
    ) -> Self {
        Self {
            grid,
            scenery,
            camera,
            strategy,
            color_handler,
        }
    }
}

impl<'scene> PixelJob for ScenePixelJob<'scene> {
    fn channels(&self) -> usize {
        self.color_handler.lock().number_of_channels(self.grid)
    }

    fn render_pixel(&self, seed: u64, x: usize, y: usize, out: &mut [f32]) {
        let Some(ray) = self.camera.ray(x as u32, y as u32) else {
            out.iter_mut().for_each(|v| *v = 0.0);
            return;
        };
        let mut rng = worker_rng(seed, 0);
        let light = match self.strategy {
            RenderStrategy::Simple(renderer) => renderer.trace(self.grid, self.scenery, ray, &mut rng),
            RenderStrategy::PhotonMapping(renderer) => renderer.trace(self.grid, self.scenery, ray, &mut rng),
            RenderStrategy::Test(renderer) => renderer.trace(self.grid, self.scenery, ray),
        };
        self.color_handler.lock().project(self.grid, &light, out);
    }
}
