//! An abstract process-group message layer (spec.md §4.6/§9: "model
//! inter-process interaction as an explicit message-passing actor... rather
//! than as async tasks"), plus an in-process, `mpsc`-channel-backed
//! implementation so [`crate::executor::ClientServerExecutor`] can be
//! exercised and tested without a real network transport (SPEC_FULL.md
//! §4.6 supplement). A genuine network transport — out of scope per
//! spec.md §1 — would implement the same [`Transport`] trait.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Symbolic message tags over the process group (spec.md §4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    InitSize,
    InitData,
    Introduce,
    SendNCam,
    SendNLine,
    SendNSize,
    ReceiveNCam,
    ReceiveNLine,
    ReceiveNSize,
    ReceiveData,
    EndGather,
    Closed,
}

/// One tagged, opaque payload crossing the process group.
#[derive(Clone, Debug)]
pub struct Message {
    pub tag: Tag,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(tag: Tag, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    pub fn empty(tag: Tag) -> Self {
        Self { tag, payload: Vec::new() }
    }
}

#[derive(Debug)]
pub enum TransportError {
    Disconnected,
    Timeout,
}

/// The process-group message layer's interface: blocking send/receive from
/// a worker's point of view, and a non-blocking poll from the controller's
/// (spec.md §5: "All inter-process calls are blocking in the worker and
/// non-blocking (polled) in the controller").
pub trait Transport: Send {
    fn send(&self, message: Message) -> Result<(), TransportError>;
    fn recv_blocking(&self) -> Result<Message, TransportError>;
    /// Non-blocking receive with a bound wait, used by the controller's
    /// heartbeat-driven poll loop (spec.md §5).
    fn poll(&self, timeout: Duration) -> Option<Message>;
}

/// One worker's end of an in-process channel pair: receives work
/// descriptors from the controller, sends results back.
pub struct WorkerChannel {
    pub rank: usize,
    to_controller: Sender<(usize, Message)>,
    from_controller: Receiver<Message>,
}

impl Transport for WorkerChannel {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        self.to_controller.send((self.rank, message)).map_err(|_| TransportError::Disconnected)
    }

    fn recv_blocking(&self) -> Result<Message, TransportError> {
        self.from_controller.recv().map_err(|_| TransportError::Disconnected)
    }

    fn poll(&self, timeout: Duration) -> Option<Message> {
        match self.from_controller.recv_timeout(timeout) {
            Ok(m) => Some(m),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// The controller's end: one outgoing channel per worker, one shared
/// incoming channel tagged with the sending worker's rank.
pub struct ControllerChannels {
    to_workers: Vec<Sender<Message>>,
    from_workers: Receiver<(usize, Message)>,
}

impl ControllerChannels {
    pub fn send_to(&self, rank: usize, message: Message) -> Result<(), TransportError> {
        self.to_workers[rank].send(message).map_err(|_| TransportError::Disconnected)
    }

    pub fn broadcast(&self, message: Message) -> Result<(), TransportError> {
        for sender in &self.to_workers {
            sender.send(message.clone()).map_err(|_| TransportError::Disconnected)?;
        }
        Ok(())
    }

    /// Non-blocking drain of whatever worker messages are waiting.
    pub fn try_recv_any(&self) -> Option<(usize, Message)> {
        self.from_workers.try_recv().ok()
    }

    /// Blocks up to `timeout` for the next worker message (controller's
    /// heartbeat-driven poll, spec.md §5).
    pub fn poll_any(&self, timeout: Duration) -> Result<(usize, Message), TransportError> {
        match self.from_workers.recv_timeout(timeout) {
            Ok(m) => Ok(m),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.to_workers.len()
    }
}

/// Builds an in-process "cluster" of `worker_count` channel pairs standing
/// in for a real process group (SPEC_FULL.md §4.6 supplement).
pub fn in_process_cluster(worker_count: usize) -> (ControllerChannels, Vec<WorkerChannel>) {
    let (shared_tx, shared_rx) = std::sync::mpsc::channel::<(usize, Message)>();
    let mut to_workers = Vec::with_capacity(worker_count);
    let mut workers = Vec::with_capacity(worker_count);
    for rank in 0..worker_count {
        let (ctrl_tx, worker_rx) = std::sync::mpsc::channel::<Message>();
        to_workers.push(ctrl_tx);
        workers.push(WorkerChannel { rank, to_controller: shared_tx.clone(), from_controller: worker_rx });
    }
    (ControllerChannels { to_workers, from_workers: shared_rx }, workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_introduces_itself_and_controller_replies() {
        let (controller, workers) = in_process_cluster(2);
        workers[0].send(Message::empty(Tag::Introduce)).unwrap();
        workers[1].send(Message::empty(Tag::Introduce)).unwrap();

        let mut ranks_seen = Vec::new();
        for _ in 0..2 {
            let (rank, message) = controller.poll_any(Duration::from_secs(1)).unwrap();
            assert_eq!(message.tag, Tag::Introduce);
            ranks_seen.push(rank);
        }
        ranks_seen.sort_unstable();
        assert_eq!(ranks_seen, vec![0, 1]);

        controller.broadcast(Message::empty(Tag::Closed)).unwrap();
        assert_eq!(workers[0].recv_blocking().unwrap().tag, Tag::Closed);
        assert_eq!(workers[1].recv_blocking().unwrap().tag, Tag::Closed);
    }

    #[test]
    fn poll_times_out_when_nothing_is_sent() {
        let (controller, _workers) = in_process_cluster(1);
        let result = controller.poll_any(Duration::from_millis(10));
        assert!(matches!(result, Err(TransportError::Timeout)));
    }
}
