use std::collections::BTreeMap;

/// A decoded bencode value.
///
/// Strings are raw byte sequences, never text: the `pieces` field of a
/// torrent and the binary fields of a tracker query are not UTF-8.
/// Dictionary keys are raw bytes too, and `BTreeMap` keeps them in
/// lexicographic byte order, which is exactly the order the canonical
/// encoder must emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BValue {
    Integer(i64),
    ByteString(Vec<u8>),
    List(Vec<BValue>),
    Dict(BTreeMap<Vec<u8>, BValue>),
}

impl BValue {
    /// Builds a byte-string value from UTF-8 text.
    pub fn string(s: &str) -> Self {
        BValue::ByteString(s.as_bytes().to_vec())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            BValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BValue::ByteString(b) => Some(b),
            _ => None,
        }
    }

    /// The value as text, when it is a byte string holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BValue::ByteString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BValue]> {
        match self {
            BValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, BValue>> {
        match self {
            BValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a dictionary.
    pub fn get(&self, key: &[u8]) -> Option<&BValue> {
        self.as_dict()?.get(key)
    }
}

impl From<i64> for BValue {
    fn from(i: i64) -> Self {
        BValue::Integer(i)
    }
}

impl From<&str> for BValue {
    fn from(s: &str) -> Self {
        BValue::string(s)
    }
}

impl From<Vec<u8>> for BValue {
    fn from(b: Vec<u8>) -> Self {
        BValue::ByteString(b)
    }
}
