pub mod error;
pub mod infohash;
pub mod metadata;

pub use error::MetainfoError;
pub use infohash::info_hash;
pub use metadata::{Torrent, TorrentInfo};
