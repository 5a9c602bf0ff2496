use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::info;

/// Piece-level download progress, shared by cloning across tasks.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

struct Inner {
    total: usize,
    completed: AtomicUsize,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                total,
                completed: AtomicUsize::new(0),
                started: Instant::now(),
            }),
        }
    }

    /// Records one verified piece and logs the running rate.
    pub fn piece_done(&self) {
        let completed = self.inner.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = completed as f64 / self.inner.total as f64 * 100.0;
        let elapsed = self.inner.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            completed as f64 / elapsed
        } else {
            0.0
        };
        info!(
            "downloaded {completed}/{} pieces ({percent:.1}%, {rate:.1} pieces/s)",
            self.inner.total
        );
    }

    pub fn completed(&self) -> usize {
        self.inner.completed.load(Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.completed() >= self.inner.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_pieces_across_clones() {
        let tracker = ProgressTracker::new(2);
        let clone = tracker.clone();
        assert!(!tracker.is_complete());
        tracker.piece_done();
        clone.piece_done();
        assert_eq!(tracker.completed(), 2);
        assert!(tracker.is_complete());
    }
}
