//! Image buffer persistence, task-unit decomposition, traversal order and
//! the stand-alone/client-server executors (spec.md §4.6). Generic over a
//! [`executor::PixelJob`] so this crate has no dependency on `lumen-render`
//! — it schedules and seeds work, it does not know what a `Material` or a
//! `Renderer` is.

pub mod error;
pub mod executor;
pub mod grid;
pub mod image;
pub mod order;
pub mod transport;

pub mod prelude {
    pub use crate::error::TaskError;
    pub use crate::executor::{ChunkSize, ClientServerExecutor, PixelJob, StandAloneExecutor};
    pub use crate::grid::{Area, TaskGrid, TaskUnit};
    pub use crate::image::{load_checkpoint, save_checkpoint};
    pub use crate::order::{Chirality, LineOrder, TaskManager};
    pub use crate::transport::{in_process_cluster, ControllerChannels, Message, Tag, Transport, TransportError, WorkerChannel};
}
