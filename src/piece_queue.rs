use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use tokio::sync::Mutex;

/// Work queue of piece indices shared by per-peer download tasks.
///
/// Each task passes the set of pieces it has already given up on, so a
/// requeued piece is only handed to peers that have not failed it. A piece
/// every peer has given up on is left in the queue; the engine notices the
/// missing result after the tasks drain out.
pub struct PieceQueue {
    state: Mutex<QueueState>,
}

struct QueueState {
    available: VecDeque<u32>,
    in_progress: HashSet<u32>,
}

impl PieceQueue {
    pub fn new(pieces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                available: pieces.into_iter().collect(),
                in_progress: HashSet::new(),
            }),
        }
    }

    /// Claims the next piece not in `blocked`.
    ///
    /// When every remaining piece is blocked for this caller, returns
    /// `None`: nothing it could ever work on can enter the queue again.
    /// Otherwise an empty queue waits, because a piece claimed by another
    /// task may yet fail and come back.
    pub async fn claim(&self, blocked: &HashSet<u32>) -> Option<u32> {
        loop {
            {
                let mut state = self.state.lock().await;
                let next = state
                    .available
                    .iter()
                    .copied()
                    .find(|piece| !blocked.contains(piece));
                if let Some(piece) = next {
                    state.available.retain(|&p| p != piece);
                    state.in_progress.insert(piece);
                    return Some(piece);
                }
                if state.in_progress.iter().all(|piece| blocked.contains(piece)) {
                    return None;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub async fn mark_complete(&self, piece: u32) {
        self.state.lock().await.in_progress.remove(&piece);
    }

    /// Returns a failed piece to the queue for other tasks to pick up.
    pub async fn requeue(&self, piece: u32) {
        let mut state = self.state.lock().await;
        state.in_progress.remove(&piece);
        state.available.push_back(piece);
    }

    /// Pieces still sitting in the queue (never successfully downloaded).
    pub async fn leftovers(&self) -> Vec<u32> {
        self.state.lock().await.available.iter().copied().collect()
    }
}
