// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Payload extraction: the inverse of embedding.
//!
//! The extractor replays the noise key from its initial state, exactly as
//! the embedder did for this codeword: the first twelve distinct positions
//! are the payload positions, anything drawn after that was cover noise and
//! is ignored. Payload symbols are read straight off the received codeword —
//! a payload symbol that happens to coincide with the canonical cover symbol
//! (and so never showed up in the detector's diff set) still reads back
//! correctly.

use crate::codec::{Codeword, CODEWORD_SYMBOLS};
use crate::steg::embed::{next_unused_position, unpack_symbols};
use crate::steg::key::NoiseKey;
use crate::steg::{CHUNK_BYTES, SYMBOLS_PER_CHUNK};

/// Recover the raw 9-byte chunk carried by a payload codeword.
///
/// Call only on packets the detector flagged; on clean cover traffic this
/// returns whatever cover symbols sit at the key positions, which the
/// reassembler will then reject as an anomalous chunk.
pub fn extract(received: &Codeword, key: &mut NoiseKey) -> Vec<u8> {
    key.reset();
    let mut used = [false; CODEWORD_SYMBOLS];
    let symbols: Vec<u8> = (0..SYMBOLS_PER_CHUNK)
        .map(|_| received.symbol(next_unused_position(key, &mut used)))
        .collect();
    unpack_symbols(&symbols, CHUNK_BYTES)
}
