use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::bencode::{decode_all, BValue};
use crate::torrent::error::MetainfoError;
use crate::torrent::infohash::info_hash;

/// A parsed .torrent file: the tracker URL, the torrent's identity on the
/// swarm, and the content metadata.
#[derive(Debug, Clone)]
pub struct Torrent {
    pub announce: String,
    pub info_hash: [u8; 20],
    pub info: TorrentInfo,
}

/// Content metadata from the `info` dictionary (single-file torrents).
#[derive(Debug, Clone)]
pub struct TorrentInfo {
    pub name: String,
    pub length: u64,
    pub piece_length: u64,
    pub pieces: Vec<[u8; 20]>,
}

impl Torrent {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MetainfoError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetainfoError> {
        let root = decode_all(bytes)?;
        let dict = root.as_dict().ok_or(MetainfoError::NotADictionary)?;

        let announce = require_str(dict, "announce")?.to_string();
        let info_value = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;
        let info_dict = info_value.as_dict().ok_or(MetainfoError::WrongType("info"))?;

        // Hash before narrowing to typed fields, over the value as decoded.
        let info_hash = info_hash(info_value);
        let info = TorrentInfo::from_dict(info_dict)?;

        Ok(Torrent {
            announce,
            info_hash,
            info,
        })
    }
}

impl TorrentInfo {
    fn from_dict(dict: &BTreeMap<Vec<u8>, BValue>) -> Result<Self, MetainfoError> {
        let name = require_str(dict, "name")?.to_string();
        let length = require_positive(dict, "length")?;
        let piece_length = require_positive(dict, "piece length")?;
        let pieces_bytes = require_bytes(dict, "pieces")?;

        if pieces_bytes.is_empty() || pieces_bytes.len() % 20 != 0 {
            return Err(MetainfoError::BadPiecesLength);
        }
        let pieces: Vec<[u8; 20]> = pieces_bytes
            .chunks_exact(20)
            .map(|chunk| {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(chunk);
                hash
            })
            .collect();

        let expected = length.div_ceil(piece_length) as usize;
        if pieces.len() != expected {
            return Err(MetainfoError::PieceCountMismatch {
                got: pieces.len(),
                expected,
            });
        }

        Ok(TorrentInfo {
            name,
            length,
            piece_length,
            pieces,
        })
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Logical size of piece `index`; only the last piece may be short.
    pub fn piece_size(&self, index: u32) -> u64 {
        let count = self.pieces.len() as u64;
        if u64::from(index) + 1 == count {
            self.length - (count - 1) * self.piece_length
        } else {
            self.piece_length
        }
    }
}

fn field<'a>(
    dict: &'a BTreeMap<Vec<u8>, BValue>,
    key: &'static str,
) -> Result<&'a BValue, MetainfoError> {
    dict.get(key.as_bytes())
        .ok_or(MetainfoError::MissingField(key))
}

fn require_str<'a>(
    dict: &'a BTreeMap<Vec<u8>, BValue>,
    key: &'static str,
) -> Result<&'a str, MetainfoError> {
    field(dict, key)?
        .as_str()
        .ok_or(MetainfoError::WrongType(key))
}

fn require_bytes<'a>(
    dict: &'a BTreeMap<Vec<u8>, BValue>,
    key: &'static str,
) -> Result<&'a [u8], MetainfoError> {
    field(dict, key)?
        .as_bytes()
        .ok_or(MetainfoError::WrongType(key))
}

fn require_positive(
    dict: &BTreeMap<Vec<u8>, BValue>,
    key: &'static str,
) -> Result<u64, MetainfoError> {
    let value = field(dict, key)?
        .as_int()
        .ok_or(MetainfoError::WrongType(key))?;
    if value <= 0 {
        return Err(MetainfoError::NonPositive(key));
    }
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use sha1::{Digest, Sha1};

    use super::*;

    /// A two-piece synthetic torrent assembled by hand so the byte layout
    /// stays visible.
    fn two_piece_torrent() -> Vec<u8> {
        let mut info = Vec::new();
        info.extend_from_slice(b"d6:lengthi1000e4:name1:x12:piece lengthi500e6:pieces40:");
        info.extend_from_slice(&[0xaa; 20]);
        info.extend_from_slice(&[0xbb; 20]);
        info.push(b'e');

        let mut file = Vec::new();
        file.extend_from_slice(b"d8:announce31:http://tracker.example/announce4:info");
        file.extend_from_slice(&info);
        file.push(b'e');
        file
    }

    #[test]
    fn parses_synthetic_torrent() {
        let torrent = Torrent::from_bytes(&two_piece_torrent()).unwrap();
        assert_eq!(torrent.announce, "http://tracker.example/announce");
        assert_eq!(torrent.info.name, "x");
        assert_eq!(torrent.info.length, 1000);
        assert_eq!(torrent.info.piece_length, 500);
        assert_eq!(torrent.info.pieces, vec![[0xaa; 20], [0xbb; 20]]);
        assert_eq!(torrent.info.piece_count(), 2);
    }

    #[test]
    fn info_hash_matches_the_info_substring() {
        let file = two_piece_torrent();
        let torrent = Torrent::from_bytes(&file).unwrap();

        // Cross-check against hashing the raw `info` byte range directly.
        // The value starts right after the "4:info" key and runs to the
        // closing 'e' of the envelope.
        let key = b"4:info";
        let start = file
            .windows(key.len())
            .position(|w| w == key)
            .unwrap()
            + key.len();
        let info_slice = &file[start..file.len() - 1];
        let expected: [u8; 20] = Sha1::digest(info_slice).into();
        assert_eq!(torrent.info_hash, expected);
    }

    #[test]
    fn single_piece_seed_torrent() {
        let info_bytes: &[u8] =
            b"d6:lengthi12345e4:name1:x12:piece lengthi16384e6:pieces20:AAAAAAAAAAAAAAAAAAAAe";
        let mut file = Vec::new();
        file.extend_from_slice(b"d8:announce18:http://t.example/x4:info");
        file.extend_from_slice(info_bytes);
        file.push(b'e');

        let torrent = Torrent::from_bytes(&file).unwrap();
        assert_eq!(torrent.info.length, 12345);
        assert_eq!(torrent.info.pieces, vec![[0x41; 20]]);
        let expected: [u8; 20] = Sha1::digest(info_bytes).into();
        assert_eq!(torrent.info_hash, expected);
    }

    #[test]
    fn piece_size_truncates_the_last_piece() {
        let info = TorrentInfo {
            name: "x".into(),
            length: 1100,
            piece_length: 500,
            pieces: vec![[0; 20]; 3],
        };
        assert_eq!(info.piece_size(0), 500);
        assert_eq!(info.piece_size(1), 500);
        assert_eq!(info.piece_size(2), 100);
    }

    #[test]
    fn rejects_missing_and_mistyped_fields() {
        assert!(matches!(
            Torrent::from_bytes(b"d4:infod6:lengthi1eee"),
            Err(MetainfoError::MissingField("announce"))
        ));
        assert!(matches!(
            Torrent::from_bytes(b"d8:announcei1e4:infodee"),
            Err(MetainfoError::WrongType("announce"))
        ));
        assert!(matches!(
            Torrent::from_bytes(b"d8:announce3:url4:info3:fooe"),
            Err(MetainfoError::WrongType("info"))
        ));
        assert!(matches!(
            Torrent::from_bytes(b"le"),
            Err(MetainfoError::NotADictionary)
        ));
    }

    #[test]
    fn rejects_bad_pieces_length() {
        let file = b"d8:announce3:url4:infod6:lengthi10e4:name1:x12:piece lengthi5e6:pieces3:abcee";
        assert!(matches!(
            Torrent::from_bytes(file),
            Err(MetainfoError::BadPiecesLength)
        ));
    }

    #[test]
    fn rejects_wrong_piece_count() {
        // 1000 bytes at 500 per piece needs two hashes, not one.
        let mut file = Vec::new();
        file.extend_from_slice(b"d8:announce3:url4:infod6:lengthi1000e4:name1:x12:piece lengthi500e6:pieces20:");
        file.extend_from_slice(&[0xaa; 20]);
        file.extend_from_slice(b"ee");
        assert!(matches!(
            Torrent::from_bytes(&file),
            Err(MetainfoError::PieceCountMismatch { got: 1, expected: 2 })
        ));
    }
}
