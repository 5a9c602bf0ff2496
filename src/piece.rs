use sha1::{Digest, Sha1};

use crate::message::BLOCK_SIZE;

/// Assembly buffer for one in-flight piece: the piece-sized byte buffer
/// plus a bitmap of which blocks have landed.
///
/// Blocks are addressed by their `begin` offset; all blocks except
/// possibly the last are exactly [`BLOCK_SIZE`] bytes, so the block index
/// is `begin / BLOCK_SIZE`.
pub struct PieceBuffer {
    data: Vec<u8>,
    received: Vec<bool>,
    remaining: usize,
}

impl PieceBuffer {
    pub fn new(piece_size: u32) -> Self {
        let blocks = piece_size.div_ceil(BLOCK_SIZE) as usize;
        Self {
            data: vec![0; piece_size as usize],
            received: vec![false; blocks],
            remaining: blocks,
        }
    }

    /// Records one block. Duplicates, unaligned offsets, and blocks whose
    /// length does not match the expected geometry are ignored; returns
    /// true when the block was newly recorded.
    pub fn accept(&mut self, begin: u32, block: &[u8]) -> bool {
        if begin % BLOCK_SIZE != 0 {
            return false;
        }
        let index = (begin / BLOCK_SIZE) as usize;
        if index >= self.received.len() || self.received[index] {
            return false;
        }
        if block.len() != self.block_len(index) {
            return false;
        }
        let start = begin as usize;
        self.data[start..start + block.len()].copy_from_slice(block);
        self.received[index] = true;
        self.remaining -= 1;
        true
    }

    fn block_len(&self, index: usize) -> usize {
        let start = index * BLOCK_SIZE as usize;
        (self.data.len() - start).min(BLOCK_SIZE as usize)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Blocks still outstanding, as `(begin, length)` request arguments.
    pub fn missing_blocks(&self) -> Vec<(u32, u32)> {
        self.received
            .iter()
            .enumerate()
            .filter(|(_, received)| !**received)
            .map(|(index, _)| {
                let begin = index as u32 * BLOCK_SIZE;
                (begin, self.block_len(index) as u32)
            })
            .collect()
    }

    pub fn verify(&self, expected: &[u8; 20]) -> bool {
        let digest: [u8; 20] = Sha1::digest(&self.data).into();
        digest == *expected
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
