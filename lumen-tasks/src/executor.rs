//! Task executors (spec.md §4.6): [`StandAloneExecutor`] (single-process
//! `rayon` parallel-for with periodic checkpointing) and
//! [`ClientServerExecutor`] (controller + worker message-passing actor,
//! block-granularity work stealing, over the [`crate::transport::Transport`]
//! abstraction).
//!
//! Both executors are generic over a [`PixelJob`] rather than over
//! `lumen-render`'s `Scenery`/`Renderer` types directly: the task-
//! decomposition layer only needs "render this pixel, given a
//! deterministic per-unit seed", not what produces that pixel. The
//! `executor` binary crate supplies the closure that actually calls into
//! `lumen-render`.

use fxhash::{FxHashMap, FxHashSet};
use instant::{Duration, Instant};
use lumen_core::log::Log;
use lumen_core::rng::worker_seed;
use lumen_scene::Image;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::grid::TaskGrid;
use crate::transport::{ControllerChannels, Message, Tag, Transport, TransportError, WorkerChannel};

/// The unit of stochastic work a task executor drives: "render this pixel
/// with this deterministic seed". Seeding by task-unit index (not by OS
/// thread or wall-clock) is what makes spec.md §8 property 9 (image
/// idempotence) hold regardless of how `rayon`'s work-stealing or the
/// controller's block assignment happens to interleave work across a run.
pub trait PixelJob: Sync {
    fn channels(&self) -> usize;
    fn render_pixel(&self, seed: u64, x: usize, y: usize, out: &mut [f32]);
}

/// `--chunk C`, `-1` resolved to `Auto` by the CLI layer (spec.md §6).
#[derive(Clone, Copy, Debug)]
pub enum ChunkSize {
    Auto,
    Fixed(usize),
}

fn render_unit(job: &(impl PixelJob + ?Sized), grid: &TaskGrid, base_seed: u64, order_index: usize) -> (usize, Vec<f32>) {
    let channels = job.channels();
    let unit = grid.unit_at_index(order_index);
    let mut buffer = vec![0.0f32; unit.width * unit.height * channels];
    let seed = worker_seed(base_seed, order_index as u64);
    for (i, (x, y)) in unit.pixels().enumerate() {
        job.render_pixel(seed, x, y, &mut buffer[i * channels..(i + 1) * channels]);
    }
    (order_index, buffer)
}

fn blit_unit(image: &mut Image, grid: &TaskGrid, order_index: usize, buffer: &[f32], channels: usize) {
    let unit = grid.unit_at_index(order_index);
    for (i, (x, y)) in unit.pixels().enumerate() {
        image.set_pixel(x, y, &buffer[i * channels..(i + 1) * channels]);
    }
}

/// Single-process executor (spec.md §4.6 "StandAlone"): an unordered
/// parallel-for over the task-unit list with a configurable chunk size.
///
/// `chunk = 1` processes `order` in its own sequence, which `rayon`'s
/// work-stealing splits into contiguous runs per thread — each worker ends
/// up owning a contiguous image region. `chunk > 1` deals `order` round-
/// robin into `chunk` buckets before scheduling, so a unit and its image
/// neighbors land far apart in the execution sequence: the first few
/// `nb_task_refresh`-sized batches sample scattered patches across the
/// *whole* image rather than one corner of it, giving a fast low-resolution
/// preview during early checkpoints (spec.md §4.6's "interleaves chunks
/// across workers to give a quick global preview" — DESIGN.md records this
/// interpretation of "chunk" as the round-robin bucket count).
pub struct StandAloneExecutor {
    pub base_seed: u64,
    pub chunk: ChunkSize,
    pub nb_task_refresh: usize,
}

impl StandAloneExecutor {
    fn schedule(order: &[usize], chunk: ChunkSize) -> Vec<usize> {
        let chunk = match chunk {
            ChunkSize::Auto => 1,
            ChunkSize::Fixed(c) => c.max(1),
        };
        if chunk <= 1 {
            return order.to_vec();
        }
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); chunk];
        for (i, &idx) in order.iter().enumerate() {
            buckets[i % chunk].push(idx);
        }
        buckets.into_iter().flatten().collect()
    }

    /// Runs `job` over every unit of `order` (a permutation of `grid`'s
    /// indices), checkpointing `image` every `nb_task_refresh` completed
    /// units via `checkpoint` (spec.md §4.6, §5's single per-process
    /// synchronization point).
    pub fn run(&self, job: &(impl PixelJob + ?Sized), grid: &TaskGrid, order: &[usize], image: &mut Image, mut checkpoint: impl FnMut(&Image)) {
        let channels = job.channels();
        let scheduled = Self::schedule(order, self.chunk);
        let refresh = self.nb_task_refresh.max(1);
        for batch in scheduled.chunks(refresh) {
            let results: Vec<(usize, Vec<f32>)> = batch.par_iter().map(|&idx| render_unit(job, grid, self.base_seed, idx)).collect();
            for (idx, buffer) in &results {
                blit_unit(image, grid, *idx, buffer, channels);
            }
            checkpoint(image);
        }
    }
}

/// One controller-assigned contiguous run of `order` indices.
#[derive(Clone, Copy, Debug)]
struct Block {
    start: usize,
    len: usize,
}

fn partition_blocks(total_units: usize, block_size: usize) -> Vec<Block> {
    let block_size = block_size.max(1);
    let mut blocks = Vec::new();
    let mut start = 0;
    while start < total_units {
        let len = block_size.min(total_units - start);
        blocks.push(Block { start, len });
        start += len;
    }
    blocks
}

/// A rendered task unit's pixels, the wire payload behind `RECEIVE_DATA`.
#[derive(Clone, Serialize, Deserialize)]
struct UnitResult {
    order_index: u32,
    pixels: Vec<f32>,
}

/// `RECEIVE_DATA`'s body: every unit result belonging to one completed
/// block.
#[derive(Clone, Serialize, Deserialize)]
struct ResultPayload {
    camera: u32,
    units: Vec<UnitResult>,
}

/// Tracks the pieces of one camera-index-carrying descriptor/result as
/// they arrive spread across the `SEND_N*`/`RECEIVE_N*` tag sequence
/// (spec.md §4.6 names `INTRODUCE`, `SEND_NCAM`/`SEND_NLINE`/`SEND_NSIZE`
/// and their `RECEIVE_*` counterparts as distinct messages; `unit_start`/
/// `unit_count` stand in for the original "scanline"/"size" pair since this
/// workspace's indivisible work item is a task unit, not a raw scanline —
/// recorded in DESIGN.md).
#[derive(Default)]
struct Accumulator {
    camera: Option<u32>,
    unit_start: Option<u32>,
    unit_count: Option<u32>,
    data: Option<Vec<u8>>,
}

impl Accumulator {
    fn take_result(&mut self) -> Option<(u32, u32, u32, Vec<u8>)> {
        let camera = self.camera?;
        let unit_start = self.unit_start?;
        let unit_count = self.unit_count?;
        let data = self.data.take()?;
        self.camera = None;
        self.unit_start = None;
        self.unit_count = None;
        Some((camera, unit_start, unit_count, data))
    }
}

fn send_descriptor(controller: &ControllerChannels, rank: usize, camera: u32, block: Block) -> Result<(), TransportError> {
    controller.send_to(rank, Message::new(Tag::SendNCam, camera.to_le_bytes().to_vec()))?;
    controller.send_to(rank, Message::new(Tag::SendNLine, (block.start as u32).to_le_bytes().to_vec()))?;
    controller.send_to(rank, Message::new(Tag::SendNSize, (block.len as u32).to_le_bytes().to_vec()))?;
    Ok(())
}

fn recv_descriptor(channel: &dyn Transport) -> Result<Option<(u32, u32, u32)>, TransportError> {
    let first = channel.recv_blocking()?;
    if first.tag == Tag::Closed {
        return Ok(None);
    }
    let camera = u32::from_le_bytes(first.payload.try_into().unwrap_or_default());
    let line = channel.recv_blocking()?;
    let unit_start = u32::from_le_bytes(line.payload.try_into().unwrap_or_default());
    let size = channel.recv_blocking()?;
    let unit_count = u32::from_le_bytes(size.payload.try_into().unwrap_or_default());
    Ok(Some((camera, unit_start, unit_count)))
}

fn send_result(channel: &dyn Transport, camera: u32, unit_start: u32, unit_count: u32, payload: &ResultPayload) -> Result<(), TransportError> {
    channel.send(Message::new(Tag::ReceiveNCam, camera.to_le_bytes().to_vec()))?;
    channel.send(Message::new(Tag::ReceiveNLine, unit_start.to_le_bytes().to_vec()))?;
    channel.send(Message::new(Tag::ReceiveNSize, unit_count.to_le_bytes().to_vec()))?;
    let bytes = bincode::serialize(payload).expect("in-memory result payload always serializes");
    channel.send(Message::new(Tag::ReceiveData, bytes))?;
    Ok(())
}

/// Distributed executor (spec.md §4.6 "ClientServer"): one controller plus
/// `W` workers, block-granularity work stealing. `chunk = Auto` picks
/// `block_size = ceil(total_units / workers)` so the first wave gives a
/// full low-resolution preview quickly (spec.md §4.6 "Dynamic block
/// sizing").
pub struct ClientServerExecutor {
    pub base_seed: u64,
    pub chunk: ChunkSize,
    pub heartbeat: Duration,
}

impl ClientServerExecutor {
    fn block_size(&self, total_units: usize, worker_count: usize) -> usize {
        match self.chunk {
            ChunkSize::Fixed(c) => c.max(1),
            ChunkSize::Auto => {
                let workers = worker_count.max(1);
                (total_units + workers - 1) / workers
            }
        }
    }

    /// Runs the controller side: broadcasts `init_blob` (the renderer's
    /// opaque init-data, e.g. serialized photon maps), then assigns blocks
    /// of `order` until every worker has been sent `CLOSED`, merging each
    /// completed block into `image` and checkpointing (spec.md §4.6, §5).
    /// Returns once all blocks have been delivered or every worker has been
    /// lost (a lost worker's outstanding block is requeued to another).
    pub fn run_controller(
        &self,
        controller: &ControllerChannels,
        init_blob: &[u8],
        camera: u32,
        grid: &TaskGrid,
        order: &[usize],
        channels: usize,
        image: &mut Image,
        mut checkpoint: impl FnMut(&Image),
    ) {
        let worker_count = controller.worker_count();

        // Phase 1: wait for every worker to introduce itself.
        let mut introduced = FxHashSet::default();
        while introduced.len() < worker_count {
            match controller.poll_any(self.heartbeat) {
                Ok((rank, msg)) if msg.tag == Tag::Introduce => {
                    introduced.insert(rank);
                }
                Ok(_) => {}
                Err(_) => continue,
            }
        }

        controller.broadcast(Message::new(Tag::InitData, init_blob.to_vec())).ok();

        let block_size = self.block_size(order.len(), worker_count.max(1));
        let blocks = partition_blocks(order.len(), block_size);
        let mut queue: VecDeque<usize> = (0..blocks.len()).collect();
        let mut assigned: FxHashMap<usize, usize> = FxHashMap::default();
        let mut last_seen = vec![Instant::now(); worker_count];
        let mut excluded: FxHashSet<usize> = FxHashSet::default();
        let mut closed: FxHashSet<usize> = FxHashSet::default();
        let mut accumulators: FxHashMap<usize, Accumulator> = FxHashMap::default();

        for rank in 0..worker_count {
            if let Some(block_id) = queue.pop_front() {
                send_descriptor(controller, rank, camera, blocks[block_id]).ok();
                assigned.insert(rank, block_id);
            } else {
                controller.send_to(rank, Message::empty(Tag::Closed)).ok();
                closed.insert(rank);
            }
        }

        while !(queue.is_empty() && assigned.is_empty()) {
            match controller.poll_any(self.heartbeat) {
                Ok((rank, msg)) => {
                    last_seen[rank] = Instant::now();
                    let entry = accumulators.entry(rank).or_default();
                    match msg.tag {
                        Tag::ReceiveNCam => entry.camera = Some(u32::from_le_bytes(msg.payload.try_into().unwrap_or_default())),
                        Tag::ReceiveNLine => entry.unit_start = Some(u32::from_le_bytes(msg.payload.try_into().unwrap_or_default())),
                        Tag::ReceiveNSize => entry.unit_count = Some(u32::from_le_bytes(msg.payload.try_into().unwrap_or_default())),
                        Tag::ReceiveData => {
                            entry.data = Some(msg.payload);
                            if let Some((_, _, _, bytes)) = entry.take_result() {
                                if let Ok(payload) = bincode::deserialize::<ResultPayload>(&bytes) {
                                    for unit in &payload.units {
                                        blit_unit(image, grid, order[unit.order_index as usize], &unit.pixels, channels);
                                    }
                                }
                                checkpoint(image);
                                assigned.remove(&rank);
                                if let Some(block_id) = queue.pop_front() {
                                    send_descriptor(controller, rank, camera, blocks[block_id]).ok();
                                    assigned.insert(rank, block_id);
                                } else if !closed.contains(&rank) {
                                    controller.send_to(rank, Message::empty(Tag::Closed)).ok();
                                    closed.insert(rank);
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Err(TransportError::Timeout) => {
                    let now = Instant::now();
                    let lost: Vec<usize> = assigned
                        .keys()
                        .copied()
                        .filter(|rank| !excluded.contains(rank) && now.duration_since(last_seen[*rank]) > self.heartbeat)
                        .collect();
                    for rank in lost {
                        Log::warn(format!("worker {rank} missed its heartbeat, requeuing its block"));
                        if let Some(block_id) = assigned.remove(&rank) {
                            queue.push_front(block_id);
                        }
                        excluded.insert(rank);
                    }
                }
                Err(TransportError::Disconnected) => break,
            }
        }
    }

    /// Runs one worker's loop: introduce, wait for the broadcast init blob,
    /// then repeatedly render whatever block the controller assigns until
    /// `CLOSED` arrives (spec.md §4.6).
    pub fn run_worker(&self, job: &(impl PixelJob + ?Sized), channel: &WorkerChannel, grid: &TaskGrid, order: &[usize]) {
        channel.send(Message::empty(Tag::Introduce)).ok();
        let Ok(init) = channel.recv_blocking() else { return };
        debug_assert_eq!(init.tag, Tag::InitData);

        loop {
            match recv_descriptor(channel) {
                Ok(None) | Err(_) => break,
                Ok(Some((camera, unit_start, unit_count))) => {
                    let slice = &order[unit_start as usize..(unit_start + unit_count) as usize];
                    let units: Vec<UnitResult> = slice
                        .iter()
                        .map(|&order_index| {
                            let (_, pixels) = render_unit(job, grid, self.base_seed, order_index);
                            UnitResult { order_index: order_index as u32, pixels }
                        })
                        .collect();
                    let payload = ResultPayload { camera, units };
                    if send_result(channel, camera, unit_start, unit_count, &payload).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Area;
    use crate::order::{LineOrder, TaskManager};
    use crate::transport::in_process_cluster;

    struct ConstantJob {
        value: f32,
    }

    impl PixelJob for ConstantJob {
        fn channels(&self) -> usize {
            1
        }
        fn render_pixel(&self, _seed: u64, _x: usize, _y: usize, out: &mut [f32]) {
            out[0] = self.value;
        }
    }

    struct SeedEchoJob;

    impl PixelJob for SeedEchoJob {
        fn channels(&self) -> usize {
            1
        }
        fn render_pixel(&self, seed: u64, _x: usize, _y: usize, out: &mut [f32]) {
            out[0] = (seed % 1000) as f32;
        }
    }

    #[test]
    fn stand_alone_executor_covers_the_whole_image_with_any_chunk() {
        let grid = TaskGrid::new(Area::whole_image(16, 16), 4, 4);
        let manager = TaskManager::Line { order: LineOrder::Lrtb, snake: false };
        let order = manager.order(&grid);
        let job = ConstantJob { value: 7.0 };

        for chunk in [ChunkSize::Fixed(1), ChunkSize::Fixed(3), ChunkSize::Auto] {
            let executor = StandAloneExecutor { base_seed: 1, chunk, nb_task_refresh: 2 };
            let mut image = Image::new(16, 16, vec!["v".into()]);
            executor.run(&job, &grid, &order, &mut image, |_| {});
            for y in 0..16 {
                for x in 0..16 {
                    assert_eq!(image.pixel(x, y)[0], 7.0);
                }
            }
        }
    }

    #[test]
    fn stand_alone_executor_is_deterministic_across_chunk_sizes() {
        let grid = TaskGrid::new(Area::whole_image(8, 8), 2, 2);
        let manager = TaskManager::Line { order: LineOrder::Lrtb, snake: false };
        let order = manager.order(&grid);
        let job = SeedEchoJob;

        let mut reference = Image::new(8, 8, vec!["v".into()]);
        StandAloneExecutor { base_seed: 99, chunk: ChunkSize::Fixed(1), nb_task_refresh: 1 }.run(&job, &grid, &order, &mut reference, |_| {});

        let mut other = Image::new(8, 8, vec!["v".into()]);
        StandAloneExecutor { base_seed: 99, chunk: ChunkSize::Fixed(4), nb_task_refresh: 3 }.run(&job, &grid, &order, &mut other, |_| {});

        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(reference.pixel(x, y), other.pixel(x, y));
            }
        }
    }

    #[test]
    fn client_server_executor_matches_stand_alone_on_the_same_scene() {
        let grid = TaskGrid::new(Area::whole_image(12, 12), 3, 3);
        let manager = TaskManager::Line { order: LineOrder::Lrtb, snake: false };
        let order = manager.order(&grid);
        let job = SeedEchoJob;

        let mut expected = Image::new(12, 12, vec!["v".into()]);
        StandAloneExecutor { base_seed: 7, chunk: ChunkSize::Fixed(1), nb_task_refresh: 1 }.run(&job, &grid, &order, &mut expected, |_| {});

        let (controller, workers) = in_process_cluster(2);
        let mut actual = Image::new(12, 12, vec!["v".into()]);
        std::thread::scope(|scope| {
            for worker in &workers {
                let order = &order;
                let grid = &grid;
                let job = &job;
                let executor = ClientServerExecutor { base_seed: 7, chunk: ChunkSize::Auto, heartbeat: Duration::from_millis(200) };
                scope.spawn(move || executor.run_worker(job, worker, grid, order));
            }
            let executor = ClientServerExecutor { base_seed: 7, chunk: ChunkSize::Auto, heartbeat: Duration::from_millis(200) };
            executor.run_controller(&controller, &[], 0, &grid, &order, 1, &mut actual, |_| {});
        });

        for y in 0..12 {
            for x in 0..12 {
                assert_eq!(expected.pixel(x, y), actual.pixel(x, y));
            }
        }
    }
}
