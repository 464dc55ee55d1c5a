// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Packet framing and multi-packet reassembly.
//!
//! A ciphered payload is split into 9-byte chunks, one per cover packet.
//! The first chunk opens with the 1-byte status header:
//!
//! ```text
//! [bit 7   ] start-of-transmission flag
//! [bits 6-0] total chunk count (1..=127)
//! ```
//!
//! Subsequent chunks are raw payload slices; the final chunk is zero-padded
//! to the full 9 bytes so every packet embeds the same number of symbols.
//! The header is the channel's only bit-exact wire artifact — lose the
//! packet carrying it and the transmission is unrecoverable.
//!
//! [`StegCollection`] is the receive-side accumulator: it collects extracted
//! chunks across packets and drains the concatenated payload once the count
//! declared in the header is reached.

use tracing::warn;

use crate::steg::error::StegError;
use crate::steg::CHUNK_BYTES;

/// Start-of-transmission flag in the status header.
pub const START_FLAG: u8 = 0x80;

/// Mask for the chunk count in the status header.
pub const CHUNK_COUNT_MASK: u8 = 0x7F;

/// Largest chunk count the 7-bit header field can declare.
pub const MAX_CHUNKS: usize = 127;

/// Split a ciphered payload into per-packet chunks.
///
/// Chunk 0 is `[START_FLAG | count]` followed by the first eight payload
/// bytes; later chunks carry nine payload bytes each, the last zero-padded.
///
/// # Errors
/// [`StegError::CapacityExceeded`] — raised before any chunk is built — if
/// the payload needs more than 127 chunks or more chunks than there are
/// cover packets available. Payload is never silently dropped.
pub fn frame_payload(
    payload: &[u8],
    available_packets: usize,
) -> Result<Vec<Vec<u8>>, StegError> {
    let count = (payload.len() + 1 + CHUNK_BYTES - 1) / CHUNK_BYTES;
    if count > MAX_CHUNKS {
        return Err(StegError::CapacityExceeded {
            required: count,
            available: MAX_CHUNKS,
        });
    }
    if count > available_packets {
        return Err(StegError::CapacityExceeded {
            required: count,
            available: available_packets,
        });
    }

    let mut buf = Vec::with_capacity(count * CHUNK_BYTES);
    buf.push(START_FLAG | count as u8);
    buf.extend_from_slice(payload);
    buf.resize(count * CHUNK_BYTES, 0);

    Ok(buf.chunks(CHUNK_BYTES).map(|c| c.to_vec()).collect())
}

/// Result of feeding one chunk into a [`StegCollection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Transmission in progress: `received` of `expected` chunks so far.
    Collecting { received: usize, expected: usize },
    /// All declared chunks arrived. The header byte has been stripped and
    /// the chunks concatenated; the collection has been reset.
    Complete(Vec<u8>),
    /// The first available chunk did not carry the start flag (the monitor
    /// joined mid-transmission, or the header packet was lost). The
    /// collection has been reset to catch the next transmission.
    AnomalyReset,
}

/// Ordered accumulator for one in-progress hidden transmission.
///
/// Lifecycle: created empty; appended to on each received chunk; reset when
/// the leading chunk lacks the start flag; drained once the declared count
/// is reached. This is the only mutable state the channel owns — callers in
/// concurrent decode settings guard it with a mutex.
#[derive(Debug, Default)]
pub struct StegCollection {
    chunks: Vec<Vec<u8>>,
    expected: usize,
}

impl StegCollection {
    pub fn new() -> Self {
        StegCollection::default()
    }

    /// Whether no transmission is currently being collected.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks received for the current transmission.
    pub fn received(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk count declared by the current transmission's header, if one is
    /// being collected.
    pub fn expected(&self) -> Option<usize> {
        if self.chunks.is_empty() {
            None
        } else {
            Some(self.expected)
        }
    }

    /// Discard any partial transmission.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.expected = 0;
    }

    /// Feed one extracted chunk into the collection.
    pub fn push(&mut self, chunk: Vec<u8>) -> ChunkOutcome {
        if self.chunks.is_empty() {
            let header = match chunk.first() {
                Some(&h) if h & START_FLAG != 0 => h,
                _ => {
                    warn!("leading chunk lacks start flag; resetting collection");
                    self.reset();
                    return ChunkOutcome::AnomalyReset;
                }
            };
            let expected = (header & CHUNK_COUNT_MASK) as usize;
            if expected == 0 {
                warn!("header declares zero chunks; resetting collection");
                self.reset();
                return ChunkOutcome::AnomalyReset;
            }
            self.expected = expected;
        }

        self.chunks.push(chunk);

        if self.chunks.len() >= self.expected {
            let mut payload = Vec::with_capacity(self.expected * CHUNK_BYTES - 1);
            payload.extend_from_slice(&self.chunks[0][1..]);
            for chunk in &self.chunks[1..] {
                payload.extend_from_slice(chunk);
            }
            self.reset();
            return ChunkOutcome::Complete(payload);
        }

        ChunkOutcome::Collecting {
            received: self.chunks.len(),
            expected: self.expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_layout() {
        let chunks = frame_payload(b"DEFCON22", 2).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], vec![0x81, b'D', b'E', b'F', b'C', b'O', b'N', b'2', b'2']);
    }

    #[test]
    fn multi_chunk_layout_and_padding() {
        // 17 bytes + header = 18 = two full chunks, no padding.
        let payload: Vec<u8> = (1..=17).collect();
        let chunks = frame_payload(&payload, 4).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0][0], 0x82);
        assert_eq!(&chunks[0][1..], &payload[..8]);
        assert_eq!(&chunks[1][..], &payload[8..]);

        // 10 bytes + header = 11 → two chunks, 7 bytes of tail padding.
        let payload: Vec<u8> = (1..=10).collect();
        let chunks = frame_payload(&payload, 4).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), CHUNK_BYTES);
        assert_eq!(&chunks[1][..2], &payload[8..]);
        assert_eq!(&chunks[1][2..], &[0u8; 7]);
    }

    #[test]
    fn empty_payload_frames_to_one_chunk() {
        let chunks = frame_payload(b"", 1).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0][0], 0x81);
        assert_eq!(&chunks[0][1..], &[0u8; 8]);
    }

    #[test]
    fn too_few_cover_packets() {
        let payload = [0x55u8; 20]; // needs 3 chunks
        match frame_payload(&payload, 2) {
            Err(StegError::CapacityExceeded { required: 3, available: 2 }) => {}
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }

    #[test]
    fn chunk_counter_overflow() {
        // 127 * 9 - 1 = 1142 bytes is the most the header can declare.
        let payload = vec![1u8; 1143];
        match frame_payload(&payload, 200) {
            Err(StegError::CapacityExceeded { required: 128, available: MAX_CHUNKS }) => {}
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
        assert!(frame_payload(&vec![1u8; 1142], 200).is_ok());
    }

    #[test]
    fn collection_single_chunk_completes() {
        let mut collection = StegCollection::new();
        let chunks = frame_payload(b"DEFCON22", 1).unwrap();
        match collection.push(chunks[0].clone()) {
            ChunkOutcome::Complete(payload) => assert_eq!(payload, b"DEFCON22"),
            other => panic!("expected Complete, got {other:?}"),
        }
        assert!(collection.is_empty());
    }

    #[test]
    fn collection_reports_progress_until_complete() {
        let payload: Vec<u8> = (1..=20).collect(); // 3 chunks
        let chunks = frame_payload(&payload, 3).unwrap();
        let mut collection = StegCollection::new();

        assert_eq!(
            collection.push(chunks[0].clone()),
            ChunkOutcome::Collecting { received: 1, expected: 3 }
        );
        assert_eq!(
            collection.push(chunks[1].clone()),
            ChunkOutcome::Collecting { received: 2, expected: 3 }
        );
        assert!(!collection.is_empty());
        assert_eq!(collection.expected(), Some(3));

        match collection.push(chunks[2].clone()) {
            ChunkOutcome::Complete(out) => {
                // Concatenation covers 3 * 9 - 1 bytes; the tail is padding.
                assert_eq!(&out[..20], &payload[..]);
                assert!(out[20..].iter().all(|&b| b == 0));
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert!(collection.is_empty());
    }

    #[test]
    fn mid_stream_join_resets() {
        let payload: Vec<u8> = (1..=20).collect();
        let chunks = frame_payload(&payload, 3).unwrap();
        let mut collection = StegCollection::new();

        // Chunk 1 has no start flag (raw payload slice starting with 9).
        assert_eq!(collection.push(chunks[1].clone()), ChunkOutcome::AnomalyReset);
        assert!(collection.is_empty());

        // The next full transmission still goes through.
        collection.push(chunks[0].clone());
        collection.push(chunks[1].clone());
        assert!(matches!(
            collection.push(chunks[2].clone()),
            ChunkOutcome::Complete(_)
        ));
    }

    #[test]
    fn empty_chunk_is_anomalous() {
        let mut collection = StegCollection::new();
        assert_eq!(collection.push(vec![]), ChunkOutcome::AnomalyReset);
    }

    #[test]
    fn reset_discards_partial_transmission() {
        let payload: Vec<u8> = (1..=20).collect();
        let chunks = frame_payload(&payload, 3).unwrap();
        let mut collection = StegCollection::new();
        collection.push(chunks[0].clone());
        collection.reset();
        assert!(collection.is_empty());
        assert_eq!(collection.expected(), None);
    }
}
