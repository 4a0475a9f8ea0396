//! Progress reporting and cancellation for match batches.
//!
//! A batch has two phases: vectorizing the corpus and matching queries. Each
//! phase reports at most ten events: one for every tenth of its work
//! (rounded up to whole units), the last one always at completion. The same
//! events are reported in the same order whether or not the work runs in
//! parallel.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use hashmatch::progress::Progress;
//! use hashmatch::{Matcher, MatchParams, Normalizer};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let matcher = Matcher::new(MatchParams::default(), Normalizer::new())
//!     .unwrap()
//!     .with_progress(move |p: Progress| sink.lock().unwrap().push(p));
//!
//! matcher.find_matches(&["a b"], &["a b", "c d"]).unwrap();
//! assert_eq!(seen.lock().unwrap().last(), Some(&Progress::Matching { done: 1, total: 1 }));
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{MatchError, Result};

/// A progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// `done` of `total` corpus entries have been vectorized.
    Vectorizing { done: usize, total: usize },
    /// `done` of `total` queries have been matched.
    Matching { done: usize, total: usize },
}

impl Progress {
    /// Completed fraction of the current phase, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        let (done, total) = match *self {
            Progress::Vectorizing { done, total } | Progress::Matching { done, total } => {
                (done, total)
            }
        };
        if total == 0 {
            1.0
        } else {
            done as f32 / total as f32
        }
    }
}

/// Receives progress events. Called from worker threads.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        self(progress)
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: Progress) {}
}

/// Shared flag that aborts a running batch.
///
/// Cancellation is all-or-nothing: a cancelled batch returns
/// [`MatchError::Cancelled`] and no results.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once the flag is raised.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Vectorizing,
    Matching,
}

/// Counts finished units of one phase and emits checkpoint events in order.
pub(crate) struct PhaseTracker<'a> {
    sink: &'a dyn ProgressSink,
    phase: Phase,
    total: usize,
    done: AtomicUsize,
    checkpoints: Vec<usize>,
    /// Index of the next checkpoint to report.
    next: Mutex<usize>,
}

impl<'a> PhaseTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, phase: Phase, total: usize) -> Self {
        let mut checkpoints: Vec<usize> = (1..=10).map(|step| (step * total).div_ceil(10)).collect();
        checkpoints.dedup();
        checkpoints.retain(|&c| c > 0);
        Self {
            sink,
            phase,
            total,
            done: AtomicUsize::new(0),
            checkpoints,
            next: Mutex::new(0),
        }
    }

    /// Record one finished unit.
    pub(crate) fn complete_one(&self) {
        let done = self.done.fetch_add(1, Ordering::AcqRel) + 1;
        let mut next = self.next.lock();
        while let Some(&checkpoint) = self.checkpoints.get(*next) {
            if checkpoint > done {
                break;
            }
            self.sink.report(self.event(checkpoint));
            *next += 1;
        }
    }

    fn event(&self, done: usize) -> Progress {
        match self.phase {
            Phase::Vectorizing => Progress::Vectorizing {
                done,
                total: self.total,
            },
            Phase::Matching => Progress::Matching {
                done,
                total: self.total,
            },
        }
    }
}
