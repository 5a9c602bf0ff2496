use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::peer::PeerError;

/// Protocol identifier carried in every handshake.
pub const PROTOCOL: &[u8; 19] = b"BitTorrent protocol";
/// Total handshake size: 1 + 19 + 8 + 20 + 20.
pub const HANDSHAKE_LEN: usize = 68;
/// Fixed transfer unit for `request`/`piece` messages.
pub const BLOCK_SIZE: u32 = 16_384;

/// Upper bound on an accepted frame, so a hostile length prefix cannot
/// force a huge allocation. A piece frame is 9 bytes of header plus one
/// block; bitfields for realistic torrents are far smaller than this.
const MAX_FRAME_LEN: usize = 1 << 20;

/// A peer wire message, one frame on the wire:
/// `<length: u32 big-endian> <id: u8> <payload>`, where a zero length is a
/// keep-alive with no id at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    KeepAlive,
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have(u32),
    Bitfield(Vec<u8>),
    Request { index: u32, begin: u32, length: u32 },
    Piece { index: u32, begin: u32, block: Vec<u8> },
    Cancel { index: u32, begin: u32, length: u32 },
}

impl Message {
    /// Serializes the message including its length prefix.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        match self {
            Message::KeepAlive => {}
            Message::Choke => payload.push(0),
            Message::Unchoke => payload.push(1),
            Message::Interested => payload.push(2),
            Message::NotInterested => payload.push(3),
            Message::Have(index) => {
                payload.push(4);
                payload.extend_from_slice(&index.to_be_bytes());
            }
            Message::Bitfield(bits) => {
                payload.push(5);
                payload.extend_from_slice(bits);
            }
            Message::Request {
                index,
                begin,
                length,
            } => {
                payload.push(6);
                payload.extend_from_slice(&index.to_be_bytes());
                payload.extend_from_slice(&begin.to_be_bytes());
                payload.extend_from_slice(&length.to_be_bytes());
            }
            Message::Piece {
                index,
                begin,
                block,
            } => {
                payload.push(7);
                payload.extend_from_slice(&index.to_be_bytes());
                payload.extend_from_slice(&begin.to_be_bytes());
                payload.extend_from_slice(block);
            }
            Message::Cancel {
                index,
                begin,
                length,
            } => {
                payload.push(8);
                payload.extend_from_slice(&index.to_be_bytes());
                payload.extend_from_slice(&begin.to_be_bytes());
                payload.extend_from_slice(&length.to_be_bytes());
            }
        }
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    fn from_payload(payload: &[u8]) -> Result<Self, PeerError> {
        let id = payload[0];
        let body = &payload[1..];
        match id {
            0 => Ok(Message::Choke),
            1 => Ok(Message::Unchoke),
            2 => Ok(Message::Interested),
            3 => Ok(Message::NotInterested),
            4 => Ok(Message::Have(
                read_u32(body, 0).ok_or(PeerError::MalformedPayload)?,
            )),
            5 => Ok(Message::Bitfield(body.to_vec())),
            6 => Ok(Message::Request {
                index: read_u32(body, 0).ok_or(PeerError::MalformedPayload)?,
                begin: read_u32(body, 4).ok_or(PeerError::MalformedPayload)?,
                length: read_u32(body, 8).ok_or(PeerError::MalformedPayload)?,
            }),
            7 => {
                if body.len() < 8 {
                    return Err(PeerError::MalformedPayload);
                }
                Ok(Message::Piece {
                    index: read_u32(body, 0).ok_or(PeerError::MalformedPayload)?,
                    begin: read_u32(body, 4).ok_or(PeerError::MalformedPayload)?,
                    block: body[8..].to_vec(),
                })
            }
            8 => Ok(Message::Cancel {
                index: read_u32(body, 0).ok_or(PeerError::MalformedPayload)?,
                begin: read_u32(body, 4).ok_or(PeerError::MalformedPayload)?,
                length: read_u32(body, 8).ok_or(PeerError::MalformedPayload)?,
            }),
            other => Err(PeerError::UnexpectedMessage(other)),
        }
    }
}

fn read_u32(body: &[u8], at: usize) -> Option<u32> {
    let bytes: [u8; 4] = body.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Writes one framed message.
pub async fn send_message<S>(stream: &mut S, message: &Message) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&message.to_frame()).await?;
    stream.flush().await
}

/// Reads one framed message; a zero-length frame comes back as `KeepAlive`.
pub async fn read_message<S>(stream: &mut S) -> Result<Message, PeerError>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Ok(Message::KeepAlive);
    }
    if len > MAX_FRAME_LEN {
        return Err(PeerError::OversizedFrame(len));
    }
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Message::from_payload(&payload)
}

/// Sends our half of the 68-byte handshake.
pub async fn send_handshake<S>(
    stream: &mut S,
    info_hash: &[u8; 20],
    peer_id: &[u8; 20],
) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(HANDSHAKE_LEN);
    buf.push(PROTOCOL.len() as u8);
    buf.extend_from_slice(PROTOCOL);
    buf.extend_from_slice(&[0u8; 8]);
    buf.extend_from_slice(info_hash);
    buf.extend_from_slice(peer_id);
    stream.write_all(&buf).await?;
    stream.flush().await
}

/// Reads and validates the remote handshake, returning the remote peer id.
///
/// The length byte, protocol string, and echoed info-hash must all match;
/// the reserved bytes advertise extensions we do not use and are ignored.
pub async fn read_handshake<S>(
    stream: &mut S,
    expected_info_hash: &[u8; 20],
) -> Result<[u8; 20], PeerError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; HANDSHAKE_LEN];
    stream.read_exact(&mut buf).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            PeerError::HandshakeShort
        } else {
            PeerError::Io(e)
        }
    })?;

    if buf[0] as usize != PROTOCOL.len() || &buf[1..20] != PROTOCOL {
        return Err(PeerError::HandshakeProtocol);
    }
    if &buf[28..48] != expected_info_hash {
        return Err(PeerError::HandshakeProtocol);
    }
    let mut peer_id = [0u8; 20];
    peer_id.copy_from_slice(&buf[48..68]);
    Ok(peer_id)
}

/// Piece availability advertised by a peer, packed MSB-first: piece `p`
/// lives in bit `7 - (p % 8)` of byte `p / 8`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<u8>,
}

impl Bitfield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    /// True when the peer advertises piece `index`; indices past the end of
    /// the field are absent.
    pub fn has(&self, index: u32) -> bool {
        let byte = (index / 8) as usize;
        let bit = 7 - (index % 8);
        self.bits.get(byte).is_some_and(|b| (b >> bit) & 1 == 1)
    }

    /// Records a `have` announcement, growing the field as needed.
    pub fn set(&mut self, index: u32) {
        let byte = (index / 8) as usize;
        if byte >= self.bits.len() {
            self.bits.resize(byte + 1, 0);
        }
        self.bits[byte] |= 1 << (7 - index % 8);
    }
}
