use std::net::{Ipv4Addr, SocketAddrV4};

use log::debug;
use reqwest::Client;
use thiserror::Error;

use crate::bencode::{decode_all, BValue, BencodeError};
use crate::torrent::Torrent;
use crate::utils::url_encode_bytes;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid announce URL: {0}")]
    BadAnnounceUrl(String),

    #[error("tracker request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("tracker returned HTTP status {0}")]
    Http(u16),

    #[error("tracker failure: {0}")]
    Failure(String),

    #[error("tracker response is not valid bencode: {0}")]
    Bencode(#[from] BencodeError),

    #[error("malformed compact peer list")]
    BadPeerList,
}

/// Announces to the tracker and returns the swarm's peer endpoints.
pub async fn get_peers(
    client: &Client,
    torrent: &Torrent,
    peer_id: &[u8; 20],
    port: u16,
) -> Result<Vec<SocketAddrV4>, TrackerError> {
    let url = build_announce_url(
        &torrent.announce,
        &torrent.info_hash,
        peer_id,
        port,
        torrent.info.length,
    );
    let url =
        reqwest::Url::parse(&url).map_err(|e| TrackerError::BadAnnounceUrl(e.to_string()))?;
    debug!("announcing to {url}");

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(TrackerError::Http(status.as_u16()));
    }
    let body = response.bytes().await?;
    parse_tracker_response(&body)
}

/// The announce URL with the standard leecher query: binary fields are
/// percent-encoded byte-for-byte, and `compact=1` requests the 6-byte
/// peer-list form.
pub fn build_announce_url(
    announce: &str,
    info_hash: &[u8; 20],
    peer_id: &[u8; 20],
    port: u16,
    left: u64,
) -> String {
    format!(
        "{announce}?info_hash={}&peer_id={}&port={port}&uploaded=0&downloaded=0&left={left}&compact=1",
        url_encode_bytes(info_hash),
        url_encode_bytes(peer_id),
    )
}

/// Parses the bencoded announce response body.
pub fn parse_tracker_response(body: &[u8]) -> Result<Vec<SocketAddrV4>, TrackerError> {
    let root = decode_all(body)?;
    let dict = match &root {
        BValue::Dict(entries) => entries,
        _ => return Err(TrackerError::BadPeerList),
    };
    if let Some(BValue::ByteString(reason)) = dict.get(b"failure reason".as_slice()) {
        return Err(TrackerError::Failure(
            String::from_utf8_lossy(reason).into_owned(),
        ));
    }
    match dict.get(b"peers".as_slice()) {
        Some(BValue::ByteString(compact)) => parse_compact_peers(compact),
        _ => Err(TrackerError::BadPeerList),
    }
}

/// Splits the compact peer list: 6 bytes per peer, 4-byte IPv4 then a
/// big-endian port.
pub fn parse_compact_peers(bytes: &[u8]) -> Result<Vec<SocketAddrV4>, TrackerError> {
    if bytes.len() % 6 != 0 {
        return Err(TrackerError::BadPeerList);
    }
    Ok(bytes
        .chunks_exact(6)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            SocketAddrV4::new(ip, port)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::utils::url_decode;

    use super::*;

    #[test]
    fn announce_url_carries_the_seven_query_pairs() {
        let info_hash: [u8; 20] = std::array::from_fn(|i| i as u8);
        let peer_id: [u8; 20] = std::array::from_fn(|i| (i + 0x14) as u8);
        let url = build_announce_url("http://t.example/announce", &info_hash, &peer_id, 6881, 100);

        let (base, query) = url.split_once('?').unwrap();
        assert_eq!(base, "http://t.example/announce");

        let pairs: HashMap<&str, Vec<u8>> = query
            .split('&')
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap();
                (key, url_decode(value))
            })
            .collect();

        assert_eq!(pairs.len(), 7);
        assert_eq!(pairs["info_hash"], info_hash);
        assert_eq!(pairs["peer_id"], peer_id);
        assert_eq!(pairs["port"], b"6881");
        assert_eq!(pairs["uploaded"], b"0");
        assert_eq!(pairs["downloaded"], b"0");
        assert_eq!(pairs["left"], b"100");
        assert_eq!(pairs["compact"], b"1");
    }

    #[test]
    fn parses_compact_peer_list() {
        let peers =
            parse_compact_peers(b"\xc0\xa8\x01\x01\x1a\xe1\x0a\x00\x00\x01\x1a\xe2").unwrap();
        assert_eq!(
            peers,
            vec![
                "192.168.1.1:6881".parse().unwrap(),
                "10.0.0.1:6882".parse().unwrap(),
            ]
        );
    }

    #[test]
    fn parses_full_response_body() {
        let mut body = b"d5:peers12:".to_vec();
        body.extend_from_slice(b"\xc0\xa8\x01\x01\x1a\xe1\x0a\x00\x00\x01\x1a\xe2");
        body.push(b'e');
        let peers = parse_tracker_response(&body).unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].to_string(), "192.168.1.1:6881");
    }

    #[test]
    fn surfaces_tracker_failure_reason() {
        let body = b"d14:failure reason11:not allowede";
        assert!(matches!(
            parse_tracker_response(body),
            Err(TrackerError::Failure(reason)) if reason == "not allowed"
        ));
    }

    #[test]
    fn rejects_ragged_peer_list() {
        assert!(matches!(
            parse_compact_peers(b"\x01\x02\x03\x04\x05"),
            Err(TrackerError::BadPeerList)
        ));
        assert!(matches!(
            parse_tracker_response(b"d5:peersi0ee"),
            Err(TrackerError::BadPeerList)
        ));
    }

    #[test]
    fn empty_peer_list_is_valid() {
        assert_eq!(parse_tracker_response(b"d5:peers0:e").unwrap(), vec![]);
    }
}
