//! The renderer binary (spec.md §6): parses the CLI surface, loads a scene
//! description, and drives either the BRDF sampling mode (§4.7) or a camera
//! render through a [`StandAloneExecutor`] or (a simulated, in-process)
//! [`ClientServerExecutor`] (§4.6).
//!
//! `--mpi-procs`/`--omp-procs` name a real process group in spec.md; this
//! workspace has no network transport (out of scope per spec.md §1), so
//! `--mpi-procs > 1` is served by [`lumen_tasks::prelude::in_process_cluster`]'s
//! in-process channel simulation instead of spawning real processes — one
//! OS thread per simulated rank, each running its own `--omp-procs`-sized
//! `rayon` pool. DESIGN.md records this as the CLI's one departure from a
//! literal process-group implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use lumen::{RendererChoice, ScenePixelJob};
use lumen_core::prelude::*;
use lumen_core::rng::worker_rng;
use lumen_render::PhotonMappingRenderer;
use lumen_scene::Image;
use lumen_tasks::prelude::*;
use parking_lot::Mutex;

/// CLI surface (spec.md §6's external-interfaces table).
#[derive(Parser)]
#[command(name = "lumen-executor", about = "Physically based, spectral, polarization-aware offline renderer")]
struct Cli {
    /// The scene-description file to render.
    scenery_file: PathBuf,

    /// `xmin:ymin:xmax:ymax`; default is the whole camera image.
    #[arg(long)]
    area: Option<String>,

    /// Number of simulated controller/worker processes. 1 = StandAlone.
    #[arg(long, default_value_t = 1)]
    mpi_procs: usize,

    /// Threads per simulated process.
    #[arg(long, default_value_t = 1)]
    omp_procs: usize,

    /// `W:H`; default gives roughly 10 task units per worker.
    #[arg(long)]
    task_size: Option<String>,

    /// Checkpoint the image after this many completed task units.
    #[arg(long, default_value_t = 8)]
    refresh: usize,

    /// Chunk size for parallel scheduling; -1 = auto.
    #[arg(long, allow_hyphen_values = true, default_value_t = -1)]
    chunk: i64,

    /// Overwrite any existing output image; absent resumes from it.
    #[arg(long)]
    overwrite: bool,

    /// Each simulated worker writes its own fragment file instead of
    /// merging into the controller's master image. Recorded but not yet
    /// wired up (DESIGN.md): the in-process cluster always merges into one
    /// master image today.
    #[arg(long)]
    fragment: bool,

    #[arg(long, num_args = 0..=1, default_missing_value = "lrtb")]
    line: Option<String>,

    #[arg(long, num_args = 0..=1, default_missing_value = "lrtb")]
    line_snake: Option<String>,

    #[arg(long)]
    spiral_trigo: bool,

    #[arg(long)]
    spiral_inverse: bool,

    /// Serializes the renderer's init blob (photon maps) to this file.
    #[arg(long)]
    save_init: Option<PathBuf>,

    /// Deserializes the renderer's init blob instead of running pass 1.
    #[arg(long)]
    load_init: Option<PathBuf>,

    /// Enables per-process log files `<rank>_<basename>`.
    #[arg(long)]
    debug: bool,

    /// BRDF sampling mode (§4.7); default angular step is 5 degrees.
    #[arg(long, num_args = 0..=1, default_missing_value = "5.0")]
    brdf: Option<f32>,
}

fn parse_area(s: &str) -> Result<Area, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("--area expects xmin:ymin:xmax:ymax, got {s:?}"));
    }
    let parse = |p: &str| p.parse::<usize>().map_err(|_| format!("--area: not an integer: {p:?}"));
    Ok(Area {
        ulx: parse(parts[0])?,
        uly: parse(parts[1])?,
        brx: parse(parts[2])?,
        bry: parse(parts[3])?,
    })
}

fn parse_task_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s.split_once(':').ok_or_else(|| format!("--task-size expects W:H, got {s:?}"))?;
    let w = w.parse::<usize>().map_err(|_| format!("--task-size: not an integer: {w:?}"))?;
    let h = h.parse::<usize>().map_err(|_| format!("--task-size: not an integer: {h:?}"))?;
    Ok((w, h))
}

fn parse_line_order(s: &str) -> Result<LineOrder, String> {
    match s.to_ascii_lowercase().as_str() {
        "lrtb" => Ok(LineOrder::Lrtb),
        "lrbt" => Ok(LineOrder::Lrbt),
        "rltb" => Ok(LineOrder::Rltb),
        "rlbt" => Ok(LineOrder::Rlbt),
        "tblr" => Ok(LineOrder::Tblr),
        "tbrl" => Ok(LineOrder::Tbrl),
        "btlr" => Ok(LineOrder::Btlr),
        "btrl" => Ok(LineOrder::Btrl),
        other => Err(format!("unknown line order {other:?}")),
    }
}

fn task_manager(cli: &Cli) -> Result<TaskManager, String> {
    if cli.spiral_trigo {
        Ok(TaskManager::Spiral { chirality: Chirality::Trigonometric })
    } else if cli.spiral_inverse {
        Ok(TaskManager::Spiral { chirality: Chirality::Inverse })
    } else if let Some(order) = &cli.line_snake {
        Ok(TaskManager::Line { order: parse_line_order(order)?, snake: true })
    } else if let Some(order) = &cli.line {
        Ok(TaskManager::Line { order: parse_line_order(order)?, snake: false })
    } else {
        Ok(TaskManager::Line { order: LineOrder::Lrtb, snake: false })
    }
}

fn chunk_size(chunk: i64) -> ChunkSize {
    if chunk < 0 {
        ChunkSize::Auto
    } else {
        ChunkSize::Fixed(chunk as usize)
    }
}

fn default_task_size(area: Area, worker_units: usize) -> (usize, usize) {
    let total_pixels = (area.width() * area.height()).max(1);
    let target_units = (worker_units.max(1) * 10).max(1);
    let unit_pixels = (total_pixels / target_units).max(1);
    let side = (unit_pixels as f64).sqrt().ceil().max(1.0) as usize;
    (side.max(1), side.max(1))
}

fn output_path_for(scenery_file: &Path, camera_index: usize) -> PathBuf {
    let stem = scenery_file.file_stem().and_then(|s| s.to_str()).unwrap_or("render");
    PathBuf::from(format!("{stem}_cam{camera_index}.img"))
}

/// `--brdf` mode: samples the scene description's first material and
/// writes the resulting table next to the scenery file. Bypasses camera
/// rendering entirely, as spec.md §4.7 requires.
fn run_brdf_mode(cli: &Cli, step_degrees: f32) -> Result<(), RenderError> {
    let description = lumen::load_description(&cli.scenery_file)?;
    let grid = description.grid.build()?;
    let material_description = description.materials.first().ok_or_else(|| RenderError::UnresolvedReference {
        name: "--brdf needs at least one material in the scene description".to_string(),
    })?;
    let material = material_description.build(&grid);
    let table = lumen_render::sample_material(&grid, &material, step_degrees);

    let mut out_path = cli.scenery_file.clone();
    out_path.set_extension("brdf.ron");
    lumen_render::write_table(&table, &out_path).map_err(|source| RenderError::CheckpointWrite { path: out_path.clone(), source })?;
    Log::info(format!("wrote {} BRDF samples to {}", table.samples.len(), out_path.display()));
    Ok(())
}

/// Builds the renderer strategy once for the whole scene (spec.md §4.4):
/// photon mapping's pass 1 runs here, shared by every camera, rather than
/// being repeated per camera.
fn build_strategy(cli: &Cli, scene: &lumen::BuiltScene, base_seed: u64) -> Result<lumen::RenderStrategy, RenderError> {
    match &scene.renderer {
        RendererChoice::Simple(renderer) => Ok(lumen::RenderStrategy::Simple(renderer.clone())),
        RendererChoice::Test => Ok(lumen::RenderStrategy::Test(lumen_render::TestRenderer)),
        RendererChoice::PhotonMapping(params) => {
            let renderer = if let Some(load_path) = &cli.load_init {
                let blob = std::fs::read(load_path).map_err(|source| RenderError::MissingDataFile { path: load_path.clone(), source })?;
                PhotonMappingRenderer::from_init_blob(params.clone(), &blob)?
            } else {
                let mut rng = worker_rng(base_seed, 0);
                PhotonMappingRenderer::build(&scene.grid, &scene.scenery, params.clone(), &mut rng)
            };
            if let Some(save_path) = &cli.save_init {
                std::fs::write(save_path, renderer.to_init_blob()).map_err(|source| RenderError::CheckpointWrite { path: save_path.clone(), source })?;
            }
            Ok(lumen::RenderStrategy::PhotonMapping(renderer))
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        let basename = cli.scenery_file.file_name().and_then(|s| s.to_str()).unwrap_or("lumen").to_string();
        if let Err(e) = Log::init(Path::new(&format!("0_{basename}.log"))) {
            eprintln!("failed to open debug log: {e}");
        }
    }

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

const BASE_SEED: u64 = 0xC0FFEE;

fn run(cli: &Cli) -> Result<(), RenderError> {
    if let Some(step) = cli.brdf {
        return run_brdf_mode(cli, step);
    }

    if cli.fragment {
        Log::warn("--fragment is recognized but this build always merges worker output into one master image (DESIGN.md)");
    }

    let scene = lumen::load_scene(&cli.scenery_file)?;
    let manager = task_manager(cli).map_err(|name| RenderError::UnresolvedReference { name })?;
    let strategy = build_strategy(cli, &scene, BASE_SEED)?;
    let color_handler = Mutex::new(scene.color_handler);

    for (camera_index, (camera, width, height)) in scene.cameras.iter().enumerate() {
        let area = match &cli.area {
            Some(s) => parse_area(s).map_err(|name| RenderError::UnresolvedReference { name })?,
            None => Area::whole_image(*width as usize, *height as usize),
        };
        let (task_w, task_h) = match &cli.task_size {
            Some(s) => parse_task_size(s).map_err(|name| RenderError::UnresolvedReference { name })?,
            None => default_task_size(area, cli.mpi_procs.max(1) * cli.omp_procs.max(1)),
        };
        let task_grid = TaskGrid::new(area, task_w, task_h);
        let order = manager.order(&task_grid);

        let job = ScenePixelJob::new(&scene.grid, &scene.scenery, camera.clone(), &strategy, &color_handler);
        let channels = job.channels();
        let out_path = output_path_for(&cli.scenery_file, camera_index);
        let blank = || Image::new(*width as usize, *height as usize, (0..channels).map(|i| format!("c{i}")).collect());
        let mut image = if cli.overwrite || !out_path.exists() { blank() } else { load_checkpoint(&out_path).unwrap_or_else(|_| blank()) };

        let refresh = cli.refresh.max(1);
        let checkpoint = |image: &Image| {
            if let Err(e) = save_checkpoint(image, &out_path) {
                Log::warn(format!("checkpoint write failed: {e}"));
            }
        };

        if cli.mpi_procs <= 1 {
            run_standalone(cli, &job, &task_grid, &order, &mut image, refresh, checkpoint);
        } else {
            run_client_server(cli, &job, &task_grid, &order, camera_index as u32, channels, &mut image, checkpoint);
        }

        save_checkpoint(&image, &out_path).map_err(|e| RenderError::CheckpointWrite {
            path: out_path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;
        Log::info(format!("camera {camera_index}: wrote {}", out_path.display()));
    }

    color_handler.lock().finalize_with_grid(&scene.grid)?;
    Ok(())
}

fn run_standalone(cli: &Cli, job: &ScenePixelJob<'_>, grid: &TaskGrid, order: &[usize], image: &mut Image, refresh: usize, checkpoint: impl FnMut(&Image)) {
    let executor = StandAloneExecutor {
        base_seed: BASE_SEED,
        chunk: chunk_size(cli.chunk),
        nb_task_refresh: refresh,
    };
    match rayon::ThreadPoolBuilder::new().num_threads(cli.omp_procs.max(1)).build() {
        Ok(pool) => pool.install(|| executor.run(job, grid, order, image, checkpoint)),
        Err(_) => executor.run(job, grid, order, image, checkpoint),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_client_server(cli: &Cli, job: &ScenePixelJob<'_>, grid: &TaskGrid, order: &[usize], camera: u32, channels: usize, image: &mut Image, mut checkpoint: impl FnMut(&Image)) {
    let worker_count = cli.mpi_procs.saturating_sub(1).max(1);
    let (controller, workers) = in_process_cluster(worker_count);
    let executor = ClientServerExecutor {
        base_seed: BASE_SEED,
        chunk: chunk_size(cli.chunk),
        heartbeat: Duration::from_secs(5),
    };

    std::thread::scope(|scope| {
        for worker in workers {
            let executor = &executor;
            // `pool.install` requires its closure to be `Send`; `WorkerChannel`
            // holds an `mpsc::Sender`/`Receiver` pair, which is `Send` but not
            // `Sync`, so the closure must *own* `worker` (via `move`) rather
            // than merely borrow it from this spawned thread's environment.
            scope.spawn(move || match rayon::ThreadPoolBuilder::new().num_threads(cli.omp_procs.max(1)).build() {
                Ok(pool) => pool.install(move || executor.run_worker(job, &worker, grid, order)),
                Err(_) => executor.run_worker(job, &worker, grid, order),
            });
        }

        // The controller broadcasts the renderer's own init blob (photon
        // maps) so workers never have to rebuild pass 1 themselves; this
        // job's `strategy` was already built once in `run`, so every worker
        // thread closes over the same renderer state directly rather than
        // receiving it over the (simulated) wire.
        let init_blob: Vec<u8> = match job.strategy {
            lumen::RenderStrategy::PhotonMapping(renderer) => renderer.to_init_blob(),
            _ => Vec::new(),
        };
        executor.run_controller(&controller, &init_blob, camera, grid, order, channels, image, &mut checkpoint);
    });
}
