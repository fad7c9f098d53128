//! Checksum framer: split an image buffer into sequence-numbered, digest-tagged frames.

use crate::integrity::{self, DIGEST_LEN};

/// Default chunk size in bytes; used when a caller passes 0.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// One chunk of a transfer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sequence: u32,
    checksum: [u8; DIGEST_LEN],
    payload: Vec<u8>,
}

impl Frame {
    /// Build a frame, computing the checksum over `payload`.
    pub fn new(sequence: u32, payload: Vec<u8>) -> Self {
        let checksum = integrity::hash_chunk(&payload);
        Self {
            sequence,
            checksum,
            payload,
        }
    }

    /// Rebuild a frame exactly as it arrived, checksum included. Use `verify` before trusting it.
    pub fn from_parts(sequence: u32, checksum: [u8; DIGEST_LEN], payload: Vec<u8>) -> Self {
        Self {
            sequence,
            checksum,
            payload,
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn checksum(&self) -> &[u8; DIGEST_LEN] {
        &self.checksum
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True if the checksum matches the payload.
    pub fn verify(&self) -> bool {
        integrity::verify_chunk(&self.payload, &self.checksum)
    }
}

/// Chunk size actually used for `chunk_size`: 0 means `DEFAULT_CHUNK_SIZE`.
pub fn effective_chunk_size(chunk_size: usize) -> usize {
    if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    }
}

/// Split `buffer` into consecutive frames of `chunk_size` bytes (last one may be shorter).
/// Sequence numbers start at 0. An empty buffer yields no frames.
pub fn frame(buffer: &[u8], chunk_size: usize) -> Vec<Frame> {
    buffer
        .chunks(effective_chunk_size(chunk_size))
        .enumerate()
        .map(|(i, slice)| Frame::new(i as u32, slice.to_vec()))
        .collect()
}

/// Ordered frames derived from one source buffer.
#[derive(Debug, Clone)]
pub struct Transfer {
    chunk_size: usize,
    frames: Vec<Frame>,
}

impl Transfer {
    pub fn split(buffer: &[u8], chunk_size: usize) -> Self {
        Self {
            chunk_size: effective_chunk_size(chunk_size),
            frames: frame(buffer, chunk_size),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total payload bytes across all frames.
    pub fn payload_len(&self) -> usize {
        self.frames.iter().map(|f| f.payload.len()).sum()
    }

    /// Concatenate payloads in sequence order.
    pub fn reassemble(&self) -> Vec<u8> {
        let mut ordered: Vec<&Frame> = self.frames.iter().collect();
        ordered.sort_by_key(|f| f.sequence);
        let mut out = Vec::with_capacity(self.payload_len());
        for f in ordered {
            out.extend_from_slice(&f.payload);
        }
        out
    }
}
