// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Payload embedding into cover codewords.
//!
//! Each chunk byte stream is repacked into 6-bit symbols (MSB first, the
//! last symbol zero-filled) and written over noise-key-selected positions of
//! the chunk's cover codeword. The noise key is rewound at every codeword
//! boundary: payload positions are drawn first, cover-noise positions after,
//! so the extractor can replay the same prefix without knowing the sender's
//! noise setting.
//!
//! Total perturbation per codeword — payload symbols plus cover noise —
//! must stay within the Reed-Solomon correction bound, or the cover message
//! itself is destroyed. That is a hard error here, not a detection concern.

use tracing::trace;

use crate::codec::{Codeword, CODEWORD_SYMBOLS, CORRECTABLE_SYMBOLS, SYMBOL_VALUE_MAX};
use crate::steg::error::StegError;
use crate::steg::key::NoiseKey;

/// Pack bytes into 6-bit symbols, MSB first. A partial trailing symbol is
/// filled with zero bits.
pub(crate) fn pack_symbols(chunk: &[u8]) -> Vec<u8> {
    let mut symbols = Vec::with_capacity((chunk.len() * 8 + 5) / 6);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &byte in chunk {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 6 {
            bits -= 6;
            symbols.push(((acc >> bits) & 0x3F) as u8);
        }
    }
    if bits > 0 {
        symbols.push(((acc << (6 - bits)) & 0x3F) as u8);
    }
    symbols
}

/// Unpack 6-bit symbols back into `byte_len` bytes, MSB first.
pub(crate) fn unpack_symbols(symbols: &[u8], byte_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(byte_len);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &symbol in symbols {
        acc = (acc << 6) | symbol as u32;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xFF) as u8);
            if out.len() == byte_len {
                break;
            }
        }
    }
    out
}

/// Draw the next position from the key that has not been used in this
/// codeword yet.
pub(crate) fn next_unused_position(
    key: &mut NoiseKey,
    used: &mut [bool; CODEWORD_SYMBOLS],
) -> usize {
    loop {
        let position = key.next_position();
        if !used[position] {
            used[position] = true;
            return position;
        }
    }
}

/// Embed framed chunks into cover codewords.
///
/// `cover[i]` carries `chunks[i]`; codewords beyond the chunk list pass
/// through untouched as pure cover traffic. Each payload codeword
/// additionally receives `cover_noise` camouflage perturbations with values
/// drawn from the key's byte stream. Output length always equals input
/// length.
///
/// # Errors
/// [`StegError::CapacityExceeded`] — before any codeword is modified — if
/// there are more chunks than cover codewords, or a chunk's symbol count
/// plus `cover_noise` exceeds the correctable-error bound.
pub fn embed(
    cover: &[Codeword],
    chunks: &[Vec<u8>],
    key: &mut NoiseKey,
    cover_noise: usize,
) -> Result<Vec<Codeword>, StegError> {
    if chunks.len() > cover.len() {
        return Err(StegError::CapacityExceeded {
            required: chunks.len(),
            available: cover.len(),
        });
    }
    for chunk in chunks {
        let symbols = (chunk.len() * 8 + 5) / 6;
        if symbols + cover_noise > CORRECTABLE_SYMBOLS {
            return Err(StegError::CapacityExceeded {
                required: symbols + cover_noise,
                available: CORRECTABLE_SYMBOLS,
            });
        }
    }

    let mut out = cover.to_vec();
    for (codeword, chunk) in out.iter_mut().zip(chunks) {
        key.reset();
        let mut used = [false; CODEWORD_SYMBOLS];
        for symbol in pack_symbols(chunk) {
            let position = next_unused_position(key, &mut used);
            codeword.set_symbol(position, symbol);
        }
        for _ in 0..cover_noise {
            let position = next_unused_position(key, &mut used);
            codeword.set_symbol(position, key.next_byte() & SYMBOL_VALUE_MAX);
        }
    }
    trace!(
        packets = cover.len(),
        payload_packets = chunks.len(),
        cover_noise,
        "embedded transmission"
    );
    Ok(out)
}

/// Perturb a codeword with noise only — no payload meaning.
///
/// Used on transmissions that carry no hidden message, so that genuine steg
/// traffic does not stand out as the only perturbed traffic on the channel.
///
/// # Errors
/// [`StegError::CapacityExceeded`] if `amount` exceeds the correctable-error
/// bound.
pub fn cover_noise_only(
    codeword: &Codeword,
    key: &mut NoiseKey,
    amount: usize,
) -> Result<Codeword, StegError> {
    if amount > CORRECTABLE_SYMBOLS {
        return Err(StegError::CapacityExceeded {
            required: amount,
            available: CORRECTABLE_SYMBOLS,
        });
    }
    key.reset();
    let mut out = codeword.clone();
    let mut used = [false; CODEWORD_SYMBOLS];
    for _ in 0..amount {
        let position = next_unused_position(key, &mut used);
        out.set_symbol(position, key.next_byte() & SYMBOL_VALUE_MAX);
    }
    Ok(out)
}
