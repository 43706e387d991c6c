//! Progress checkpoints with cooperative cancellation.
//!
//! Hollowing, segmentation and joint placement take an optional
//! [`ProgressCallback`]. At each checkpoint the callback sees a [`Progress`]
//! snapshot; returning `false` cancels, and the caller unwinds with its
//! crate's `Cancelled` error. No partial result is ever handed back.
//!
//! ```
//! use mesh_core::progress::{Progress, ProgressCallback, ProgressTracker};
//!
//! let callback: ProgressCallback = Box::new(|p: &Progress| {
//!     eprintln!("[{:>3}%] {}", p.percent(), p.message);
//!     true
//! });
//!
//! let tracker = ProgressTracker::new(3);
//! for stage in ["voxelize", "erode", "extract"] {
//!     assert!(tracker.report(Some(&callback), stage));
//!     tracker.increment();
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot handed to a [`ProgressCallback`].
#[derive(Debug, Clone)]
pub struct Progress {
    pub current: u64,
    /// Zero when the step count is not known yet.
    pub total: u64,
    /// Name of the step about to run.
    pub message: String,
    pub elapsed: Duration,
}

impl Progress {
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Share of steps done, clamped to `0.0..=1.0`.
    #[inline]
    pub fn fraction(&self) -> f64 {
        match self.total {
            0 => 0.0,
            total => (self.current as f64 / total as f64).min(1.0),
        }
    }

    #[inline]
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.total != 0 && self.current >= self.total
    }
}

/// Called at checkpoints; `false` means stop.
pub type ProgressCallback = Box<dyn Fn(&Progress) -> bool + Send + Sync>;

/// Step counter whose cancellation, once requested, sticks.
///
/// The total may be raised mid-run: the segmentation loop only learns its
/// cut count as it goes.
#[derive(Debug)]
pub struct ProgressTracker {
    current: AtomicU64,
    total: AtomicU64,
    cancelled: AtomicBool,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            current: AtomicU64::new(0),
            total: AtomicU64::new(total),
            cancelled: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set(&self, value: u64) {
        self.current.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self, message: impl Into<String>) -> Progress {
        Progress {
            current: self.current(),
            total: self.total(),
            message: message.into(),
            elapsed: self.started.elapsed(),
        }
    }

    /// Run the checkpoint for `message`.
    ///
    /// `false` means stop: either an earlier checkpoint was cancelled or the
    /// callback declined this one. Without a callback only the sticky flag
    /// is consulted.
    pub fn report(&self, callback: Option<&ProgressCallback>, message: impl Into<String>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        match callback {
            Some(callback) if !callback(&self.snapshot(message)) => {
                self.cancel();
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fraction_and_percent() {
        let p = Progress::new(1, 4, "cut");
        assert_eq!(p.percent(), 25);
        assert!(!p.is_complete());
        assert_eq!(Progress::new(3, 0, "").fraction(), 0.0);
        assert_eq!(Progress::new(9, 4, "").fraction(), 1.0);
        assert!(Progress::new(4, 4, "").is_complete());
    }

    #[test]
    fn test_declined_checkpoint_sticks() {
        let tracker = ProgressTracker::new(10);
        let cb: ProgressCallback = Box::new(|p| p.current < 3);
        let mut passed = 0;
        for _ in 0..10 {
            tracker.increment();
            if !tracker.report(Some(&cb), "step") {
                break;
            }
            passed += 1;
        }
        assert_eq!(passed, 2);
        assert!(tracker.is_cancelled());
        assert!(!tracker.report(None, "after"));
    }

    #[test]
    fn test_every_checkpoint_calls_back() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cb: ProgressCallback = Box::new(move |p| {
            counter.fetch_add(1, Ordering::Relaxed);
            !p.message.is_empty()
        });
        let tracker = ProgressTracker::new(5);
        for _ in 0..5 {
            assert!(tracker.report(Some(&cb), "tick"));
            tracker.increment();
        }
        assert_eq!(calls.load(Ordering::Relaxed), 5);
        assert_eq!(tracker.snapshot("").current, 5);
    }

    #[test]
    fn test_total_can_grow() {
        let tracker = ProgressTracker::new(1);
        tracker.set(3);
        tracker.set_total(3);
        assert!(tracker.snapshot("done").is_complete());
    }
}
