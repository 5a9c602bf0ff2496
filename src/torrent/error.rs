use thiserror::Error;

use crate::bencode::BencodeError;

/// Failures while reading a metainfo file.
#[derive(Debug, Error)]
pub enum MetainfoError {
    #[error("torrent file is not a bencoded dictionary")]
    NotADictionary,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' has the wrong type")]
    WrongType(&'static str),

    #[error("field '{0}' must be a positive integer")]
    NonPositive(&'static str),

    #[error("'pieces' length is not a positive multiple of 20")]
    BadPiecesLength,

    #[error("{got} piece hashes cannot cover {expected} pieces")]
    PieceCountMismatch { got: usize, expected: usize },

    #[error(transparent)]
    Bencode(#[from] BencodeError),

    #[error("failed to read torrent file: {0}")]
    Io(#[from] std::io::Error),
}
