use std::io;
use std::time::Duration;

use log::debug;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::message::{self, Bitfield, Message};
use crate::piece::PieceBuffer;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("failed to connect to peer: {0}")]
    Dial(io::Error),

    #[error("peer handshake was truncated")]
    HandshakeShort,

    #[error("peer sent an invalid handshake")]
    HandshakeProtocol,

    #[error("peer sent an unknown message id {0}")]
    UnexpectedMessage(u8),

    #[error("peer sent a malformed message payload")]
    MalformedPayload,

    #[error("peer sent an oversized frame of {0} bytes")]
    OversizedFrame(usize),

    #[error("peer does not have piece {0}")]
    LacksPiece(u32),

    #[error("peer session stalled")]
    Stalled,

    #[error("peer i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// One connection to a remote peer, past the handshake.
///
/// The session exclusively owns its transport and tracks the remote's
/// advertised pieces and chokedness (peers start out choking us). It is
/// generic over the transport so tests can drive it over an in-memory
/// duplex stream.
pub struct PeerSession<S> {
    stream: S,
    remote_peer_id: [u8; 20],
    bitfield: Bitfield,
    bitfield_known: bool,
    choked: bool,
    stall_timeout: Duration,
}

impl PeerSession<TcpStream> {
    /// Dials `addr` within `dial_timeout` and performs the handshake.
    pub async fn connect(
        addr: &str,
        info_hash: &[u8; 20],
        peer_id: &[u8; 20],
        dial_timeout: Duration,
        stall_timeout: Duration,
    ) -> Result<Self, PeerError> {
        let stream = timeout(dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                PeerError::Dial(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))
            })?
            .map_err(PeerError::Dial)?;
        Self::establish(stream, info_hash, peer_id, stall_timeout).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> PeerSession<S> {
    /// Performs the handshake over an already-open transport.
    pub async fn establish(
        mut stream: S,
        info_hash: &[u8; 20],
        peer_id: &[u8; 20],
        stall_timeout: Duration,
    ) -> Result<Self, PeerError> {
        message::send_handshake(&mut stream, info_hash, peer_id).await?;
        let remote_peer_id = message::read_handshake(&mut stream, info_hash).await?;
        Ok(Self {
            stream,
            remote_peer_id,
            bitfield: Bitfield::new(),
            bitfield_known: false,
            choked: true,
            stall_timeout,
        })
    }

    pub fn remote_peer_id(&self) -> [u8; 20] {
        self.remote_peer_id
    }

    /// Runs the per-piece state machine and returns the assembled,
    /// not-yet-verified piece.
    ///
    /// At most `window` block requests are kept in flight. A choke clears
    /// the window (the peer will discard those requests) and the missing
    /// blocks are re-requested after the next unchoke.
    pub async fn download_piece(
        &mut self,
        index: u32,
        piece_size: u32,
        window: usize,
    ) -> Result<PieceBuffer, PeerError> {
        self.await_availability(index).await?;
        message::send_message(&mut self.stream, &Message::Interested).await?;

        let mut buffer = PieceBuffer::new(piece_size);
        let mut outstanding: Vec<u32> = Vec::new();
        while !buffer.is_complete() {
            if !self.choked {
                self.fill_window(&buffer, &mut outstanding, index, window)
                    .await?;
            }
            match self.next_message().await? {
                Message::Choke => {
                    self.choked = true;
                    outstanding.clear();
                }
                Message::Unchoke => self.choked = false,
                Message::Have(piece) => self.bitfield.set(piece),
                Message::Bitfield(bits) => {
                    self.bitfield = Bitfield::from_bytes(bits);
                    self.bitfield_known = true;
                }
                Message::Piece {
                    index: piece,
                    begin,
                    block,
                } => {
                    if piece != index {
                        continue; // stray traffic for a piece we never asked about
                    }
                    outstanding.retain(|&b| b != begin);
                    buffer.accept(begin, &block);
                }
                Message::KeepAlive => {}
                other => debug!("ignoring {other:?} mid-download"),
            }
        }
        Ok(buffer)
    }

    /// Waits until the remote's availability for `index` is known: either a
    /// bitfield arrives, or `have` announcements cover the piece.
    async fn await_availability(&mut self, index: u32) -> Result<(), PeerError> {
        loop {
            if self.bitfield_known {
                return if self.bitfield.has(index) {
                    Ok(())
                } else {
                    Err(PeerError::LacksPiece(index))
                };
            }
            if self.bitfield.has(index) {
                return Ok(()); // learned via `have`
            }
            match self.next_message().await? {
                Message::Bitfield(bits) => {
                    self.bitfield = Bitfield::from_bytes(bits);
                    self.bitfield_known = true;
                }
                Message::Have(piece) => self.bitfield.set(piece),
                Message::Choke => self.choked = true,
                Message::Unchoke => self.choked = false,
                Message::KeepAlive => {}
                other => debug!("ignoring {other:?} before availability"),
            }
        }
    }

    async fn fill_window(
        &mut self,
        buffer: &PieceBuffer,
        outstanding: &mut Vec<u32>,
        index: u32,
        window: usize,
    ) -> Result<(), PeerError> {
        for (begin, length) in buffer.missing_blocks() {
            if outstanding.len() >= window {
                break;
            }
            if outstanding.contains(&begin) {
                continue;
            }
            message::send_message(
                &mut self.stream,
                &Message::Request {
                    index,
                    begin,
                    length,
                },
            )
            .await?;
            outstanding.push(begin);
        }
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Message, PeerError> {
        timeout(self.stall_timeout, message::read_message(&mut self.stream))
            .await
            .map_err(|_| PeerError::Stalled)?
    }
}
