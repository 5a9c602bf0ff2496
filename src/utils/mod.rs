mod url_encode;

pub use url_encode::{url_decode, url_encode_bytes};

use rand::Rng;

/// A fresh 20-byte peer id: the client prefix followed by random bytes.
pub fn generate_peer_id(prefix: &str) -> [u8; 20] {
    let mut id = [0u8; 20];
    let prefix = prefix.as_bytes();
    let n = prefix.len().min(id.len());
    id[..n].copy_from_slice(&prefix[..n]);
    rand::thread_rng().fill(&mut id[n..]);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_keeps_the_prefix() {
        let id = generate_peer_id("-BF0001-");
        assert_eq!(&id[..8], b"-BF0001-");
    }

    #[test]
    fn oversized_prefix_is_clipped() {
        let id = generate_peer_id("0123456789012345678901234");
        assert_eq!(&id, b"01234567890123456789");
    }
}
