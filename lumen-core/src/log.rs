//! A small process-wide logger: writes to stdout and, once [`Log::init`]
//! has pointed it at a path, to a file as well.
//!
//! Kept deliberately close to how a game engine's own bespoke logger (a
//! lazily-initialized, mutex-guarded singleton) is built, rather than
//! reaching for an external logging facade: this renderer wants one
//! well-known sink per process, with `--debug` able to redirect it to a
//! per-rank file (`<rank>_<basename>`) without any other code knowing.

use instant::Instant;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Ord)]
#[repr(u32)]
pub enum MessageKind {
    Information = 0,
    Warning = 1,
    Error = 2,
}

impl MessageKind {
    fn as_str(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

struct LogState {
    file: Option<File>,
    verbosity: MessageKind,
    time_origin: Instant,
}

lazy_static! {
    static ref LOG: Mutex<LogState> = Mutex::new(LogState {
        file: None,
        verbosity: MessageKind::Information,
        time_origin: Instant::now(),
    });
}

pub struct Log;

impl Log {
    /// Opens (creating or truncating) a log file at `path`. Called once at
    /// startup when `--debug` is passed; callers build `path` as
    /// `format!("{}_{}", rank, basename)`.
    pub fn init(path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        LOG.lock().file = Some(file);
        Ok(())
    }

    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    fn writeln_internal(kind: MessageKind, message: &str) {
        let mut state = LOG.lock();
        if (kind as u32) < (state.verbosity as u32) {
            return;
        }
        let elapsed = Instant::now() - state.time_origin;
        let line = format!("{}{} ({:.3}s)\n", kind.as_str(), message, elapsed.as_secs_f32());
        let _ = io::stdout().write_all(line.as_bytes());
        if let Some(file) = state.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    pub fn info<S: AsRef<str>>(msg: S) {
        Self::writeln_internal(MessageKind::Information, msg.as_ref());
    }

    pub fn warn<S: AsRef<str>>(msg: S) {
        Self::writeln_internal(MessageKind::Warning, msg.as_ref());
    }

    pub fn err<S: AsRef<str>>(msg: S) {
        Self::writeln_internal(MessageKind::Error, msg.as_ref());
    }

    /// Logs the error of a `Result` that the caller has decided to recover
    /// from locally (e.g. a mid-render checkpoint write failure), instead
    /// of silently dropping it.
    pub fn verify<T, E: Display>(result: Result<T, E>) {
        if let Err(e) = result {
            Self::err(format!("operation failed, continuing: {e}"));
        }
    }
}
