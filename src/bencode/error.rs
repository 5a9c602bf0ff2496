use thiserror::Error;

/// Decoding failures. Offsets are byte positions into the original input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("input ended before a complete value was parsed")]
    Truncated,

    #[error("unexpected byte at offset {0}")]
    UnexpectedByte(usize),

    #[error("malformed string length at offset {0}")]
    BadLength(usize),

    #[error("malformed integer at offset {0}")]
    BadInteger(usize),

    #[error("dictionary keys out of lexicographic order at offset {0}")]
    NonLexicographicKeys(usize),

    #[error("duplicate dictionary key at offset {0}")]
    DuplicateKey(usize),

    #[error("trailing data after value at offset {0}")]
    TrailingData(usize),
}
