//! Progress reporting and cooperative cancellation for children loads.
//!
//! The loader never spawns threads and never blocks on its own; it reports
//! through a caller-supplied [`ProgressMonitor`] and polls
//! [`ProgressMonitor::is_cancelled`] between child slots. A caller-level timeout
//! is implemented by cancelling the token from another thread.
//!
//! # Example
//!
//! ```
//! use navtree_core::progress::{CancellationToken, ProgressMonitor, TaskProgress};
//!
//! let token = CancellationToken::new();
//! let progress = TaskProgress::with_token(token.clone());
//!
//! progress.on_progress_changed().connect(|&value| {
//!     println!("Progress: {:.0}%", value * 100.0);
//! });
//!
//! progress.begin("Load items", 2);
//! progress.step();
//! token.cancel();
//! assert!(progress.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::signal::Signal;

/// Progress and cancellation capability handed to long-running operations.
///
/// `begin`/`end` calls nest: only the outermost task drives the progress fraction.
pub trait ProgressMonitor {
    /// Whether the operation should stop at the next checkpoint.
    fn is_cancelled(&self) -> bool;

    /// Start a task of `total_steps` units.
    fn begin(&self, label: &str, total_steps: usize);

    /// Describe the current unit of work.
    fn sub_task(&self, _label: &str) {}

    /// One unit of work is done.
    fn step(&self);

    /// The task started by the matching `begin` is finished.
    fn end(&self);
}

/// A monitor that reports nothing and is never cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidProgress;

impl ProgressMonitor for VoidProgress {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn begin(&self, _label: &str, _total_steps: usize) {}

    fn step(&self) {}

    fn end(&self) {}
}

/// A token for cooperative cancellation.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Reset the token so it can be reused for another operation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

impl ProgressMonitor for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }

    fn begin(&self, _label: &str, _total_steps: usize) {}

    fn step(&self) {}

    fn end(&self) {}
}

struct TaskProgressInner {
    token: CancellationToken,
    /// Progress stored as f32 bits for atomic access.
    progress_bits: AtomicU32,
    depth: AtomicUsize,
    total: AtomicUsize,
    done: AtomicUsize,
    message: Mutex<Option<String>>,
    progress_changed: Signal<f32>,
    message_changed: Signal<String>,
}

impl TaskProgressInner {
    fn set_progress(&self, progress: f32) {
        let clamped = progress.clamp(0.0, 1.0);
        let old = f32::from_bits(self.progress_bits.swap(clamped.to_bits(), Ordering::AcqRel));
        if (clamped - old).abs() > f32::EPSILON {
            self.progress_changed.emit(clamped);
        }
    }

    fn set_message(&self, message: &str) {
        *self.message.lock() = Some(message.to_string());
        self.message_changed.emit(message.to_string());
    }
}

/// A thread-safe [`ProgressMonitor`] that publishes progress through signals.
///
/// Clones share state, so one clone can be handed to the loading thread while
/// another observes or cancels it.
#[derive(Clone)]
pub struct TaskProgress {
    inner: Arc<TaskProgressInner>,
}

impl TaskProgress {
    /// Create a monitor with a fresh cancellation token.
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Create a monitor bound to an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(TaskProgressInner {
                token,
                progress_bits: AtomicU32::new(0.0_f32.to_bits()),
                depth: AtomicUsize::new(0),
                total: AtomicUsize::new(0),
                done: AtomicUsize::new(0),
                message: Mutex::new(None),
                progress_changed: Signal::new(),
                message_changed: Signal::new(),
            }),
        }
    }

    /// The cancellation token polled by this monitor.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    /// Current progress of the outermost task (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.inner.progress_bits.load(Ordering::Acquire))
    }

    /// Latest task or sub-task label.
    pub fn message(&self) -> Option<String> {
        self.inner.message.lock().clone()
    }

    /// Emitted when the progress fraction changes.
    pub fn on_progress_changed(&self) -> &Signal<f32> {
        &self.inner.progress_changed
    }

    /// Emitted when the task or sub-task label changes.
    pub fn on_message_changed(&self) -> &Signal<String> {
        &self.inner.message_changed
    }
}

impl Default for TaskProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressMonitor for TaskProgress {
    fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    fn begin(&self, label: &str, total_steps: usize) {
        if self.inner.depth.fetch_add(1, Ordering::AcqRel) == 0 {
            self.inner.total.store(total_steps, Ordering::Release);
            self.inner.done.store(0, Ordering::Release);
            self.inner.set_progress(0.0);
        }
        self.inner.set_message(label);
    }

    fn sub_task(&self, label: &str) {
        self.inner.set_message(label);
    }

    fn step(&self) {
        if self.inner.depth.load(Ordering::Acquire) != 1 {
            return;
        }
        let done = self.inner.done.fetch_add(1, Ordering::AcqRel) + 1;
        let total = self.inner.total.load(Ordering::Acquire);
        if total > 0 {
            self.inner.set_progress(done as f32 / total as f32);
        }
    }

    fn end(&self) {
        let previous = self
            .inner
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                Some(depth.saturating_sub(1))
            })
            .unwrap_or(0);
        if previous == 1 {
            self.inner.set_progress(1.0);
        }
    }
}

impl std::fmt::Debug for TaskProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskProgress")
            .field("progress", &self.progress())
            .field("message", &self.message())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

static_assertions::assert_impl_all!(TaskProgress: Send, Sync);
static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
