/*
This code is part of the geocodec library.
License: MIT
*/
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives coarse progress updates from long-running reads and writes and lets
/// the caller abort them. Handlers are polled once per record, never per byte.
pub trait ProgressHandler {
    fn report(&self, current: usize, end: usize);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Ignores all progress.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoProgress;

impl ProgressHandler for NoProgress {
    fn report(&self, _current: usize, _end: usize) {}
}

/// Logs `Progress: n%` whenever the whole-number percentage changes.
#[derive(Debug, Default)]
pub struct LogProgress {
    label: String,
    old_progress: Cell<Option<usize>>,
}

impl LogProgress {
    pub fn new(label: &str) -> LogProgress {
        LogProgress {
            label: label.to_string(),
            old_progress: Cell::new(None),
        }
    }
}

impl ProgressHandler for LogProgress {
    fn report(&self, current: usize, end: usize) {
        if end == 0 {
            return;
        }
        let progress = (100.0_f64 * current as f64 / end as f64) as usize;
        if self.old_progress.get() != Some(progress) {
            tracing::info!("{} progress: {}%", self.label, progress);
            self.old_progress.set(Some(progress));
        }
    }
}

/// A shareable cancellation switch; clones observe the same flag.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl ProgressHandler for CancelFlag {
    fn report(&self, _current: usize, _end: usize) {}

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
