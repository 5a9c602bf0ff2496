use sha1::{Digest, Sha1};

use crate::bencode::{encode, BValue};

/// SHA-1 of the canonical re-encoding of the decoded `info` value.
///
/// The decoder only accepts inputs whose dictionary keys are already in
/// canonical order, so re-encoding reproduces the exact bytes that appeared
/// in the file and the digest matches the torrent's identity on the swarm.
/// Hashing the decoded value (rather than a struct rebuilt from known
/// fields) also keeps keys we do not model, such as `private`, in the hash.
pub fn info_hash(info: &BValue) -> [u8; 20] {
    Sha1::digest(encode(info)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::decode_all;

    #[test]
    fn hashes_the_exact_info_bytes() {
        let info_bytes: &[u8] =
            b"d6:lengthi12345e4:name1:x12:piece lengthi16384e6:pieces20:AAAAAAAAAAAAAAAAAAAAe";
        let info = decode_all(info_bytes).unwrap();
        let expected: [u8; 20] = Sha1::digest(info_bytes).into();
        assert_eq!(info_hash(&info), expected);
    }

    #[test]
    fn equal_dicts_hash_equal_regardless_of_field_set_order() {
        // Same dictionary built two ways; the map normalizes entry order.
        let a = decode_all(b"d1:ai1e1:bi2ee").unwrap();
        let mut entries = std::collections::BTreeMap::new();
        entries.insert(b"b".to_vec(), BValue::Integer(2));
        entries.insert(b"a".to_vec(), BValue::Integer(1));
        let b = BValue::Dict(entries);
        assert_eq!(info_hash(&a), info_hash(&b));
    }
}
