//! bitfetch — a BitTorrent client for single-file torrents.
//!
//! The pipeline: [`bencode`] decodes the metainfo file, [`torrent`] turns
//! it into a [`torrent::Torrent`] with its info-hash, [`tracker`] discovers
//! the swarm, and [`engine`] downloads piece by piece over the wire
//! protocol in [`message`] and [`peer`], verifying every piece against its
//! SHA-1 before it is accepted.

pub mod bencode;
pub mod config;
pub mod engine;
pub mod file_io;
pub mod message;
pub mod peer;
pub mod piece;
pub mod piece_queue;
pub mod progress;
pub mod torrent;
pub mod tracker;
pub mod utils;
