use std::collections::{HashMap, HashSet};
use std::net::SocketAddrV4;
use std::sync::Arc;

use log::{info, warn};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::peer::{PeerError, PeerSession};
use crate::piece_queue::PieceQueue;
use crate::progress::ProgressTracker;
use crate::torrent::Torrent;
use crate::tracker::{self, TrackerError};
use crate::utils;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("tracker returned no peers")]
    NoPeers,

    #[error("piece {0} could not be downloaded from any peer")]
    PieceUnavailable(u32),
}

/// One failed attempt against one peer. Never surfaced to the caller:
/// failover either recovers it or reports `PieceUnavailable`.
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("piece {0} failed hash verification")]
    HashMismatch(u32),
}

/// Drives a download: tracker discovery, peer selection and failover,
/// per-piece verification, and final assembly.
pub struct Downloader {
    torrent: Arc<Torrent>,
    peers: Vec<SocketAddrV4>,
    peer_id: [u8; 20],
    config: Config,
}

impl Downloader {
    /// Announces to the tracker and prepares a downloader over the swarm
    /// it returns.
    pub async fn from_tracker(torrent: Torrent, config: Config) -> Result<Self, EngineError> {
        let peer_id = utils::generate_peer_id(&config.peer_id_prefix);
        let client = Client::new();
        let peers = tracker::get_peers(&client, &torrent, &peer_id, config.listen_port).await?;
        Ok(Self::with_peers(torrent, peers, peer_id, config))
    }

    pub fn with_peers(
        torrent: Torrent,
        peers: Vec<SocketAddrV4>,
        peer_id: [u8; 20],
        config: Config,
    ) -> Self {
        Self {
            torrent: Arc::new(torrent),
            peers,
            peer_id,
            config,
        }
    }

    pub fn torrent(&self) -> &Torrent {
        &self.torrent
    }

    pub fn peers(&self) -> &[SocketAddrV4] {
        &self.peers
    }

    /// Downloads and verifies one piece, trying each peer in order. The
    /// first peer that completes the exchange with matching content wins;
    /// per-peer failures are recovered here and logged, not surfaced.
    pub async fn download_piece(&self, index: u32) -> Result<Vec<u8>, EngineError> {
        if self.peers.is_empty() {
            return Err(EngineError::NoPeers);
        }
        for &addr in &self.peers {
            match fetch_piece(&self.torrent, addr, &self.peer_id, &self.config, index).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => warn!("peer {addr}: piece {index} failed: {err}"),
            }
        }
        Err(EngineError::PieceUnavailable(index))
    }

    /// Downloads the whole file: one task per peer, all pulling piece
    /// indices from a shared queue and writing verified pieces into their
    /// own slots. Returns the assembled content.
    pub async fn download_all(&self) -> Result<Vec<u8>, EngineError> {
        if self.peers.is_empty() {
            return Err(EngineError::NoPeers);
        }
        let piece_count = self.torrent.info.piece_count() as u32;
        info!(
            "downloading {piece_count} pieces from {} peers",
            self.peers.len()
        );

        let queue = Arc::new(PieceQueue::new(0..piece_count));
        let results: Arc<Mutex<Vec<Option<Vec<u8>>>>> =
            Arc::new(Mutex::new(vec![None; piece_count as usize]));
        let progress = ProgressTracker::new(piece_count as usize);

        let mut tasks = Vec::new();
        for &addr in &self.peers {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let progress = progress.clone();
            let torrent = Arc::clone(&self.torrent);
            let peer_id = self.peer_id;
            let config = self.config.clone();

            tasks.push(tokio::spawn(async move {
                let retries = config.max_retries.max(1);
                let mut attempts: HashMap<u32, u32> = HashMap::new();
                let mut given_up: HashSet<u32> = HashSet::new();
                while let Some(index) = queue.claim(&given_up).await {
                    match fetch_piece(&torrent, addr, &peer_id, &config, index).await {
                        Ok(bytes) => {
                            results.lock().await[index as usize] = Some(bytes);
                            progress.piece_done();
                            queue.mark_complete(index).await;
                        }
                        Err(err) => {
                            warn!("peer {addr}: piece {index} failed: {err}");
                            let tries = attempts.entry(index).or_insert(0);
                            *tries += 1;
                            if *tries >= retries {
                                given_up.insert(index);
                            }
                            queue.requeue(index).await;
                        }
                    }
                }
            }));
        }
        for task in tasks {
            let _ = task.await;
        }

        let mut slots = results.lock().await;
        let mut output = Vec::with_capacity(self.torrent.info.length as usize);
        for (index, slot) in slots.iter_mut().enumerate() {
            match slot.take() {
                Some(bytes) => output.extend_from_slice(&bytes),
                None => return Err(EngineError::PieceUnavailable(index as u32)),
            }
        }
        Ok(output)
    }
}

/// One complete piece exchange with one peer: connect, handshake, run the
/// state machine, verify.
async fn fetch_piece(
    torrent: &Torrent,
    addr: SocketAddrV4,
    peer_id: &[u8; 20],
    config: &Config,
    index: u32,
) -> Result<Vec<u8>, AttemptError> {
    let piece_size = torrent.info.piece_size(index) as u32;
    let mut session = PeerSession::connect(
        &addr.to_string(),
        &torrent.info_hash,
        peer_id,
        config.dial_timeout(),
        config.stall_timeout(),
    )
    .await?;
    let buffer = session
        .download_piece(index, piece_size, config.request_window)
        .await?;
    if !buffer.verify(&torrent.info.pieces[index as usize]) {
        return Err(AttemptError::HashMismatch(index));
    }
    Ok(buffer.into_bytes())
}
