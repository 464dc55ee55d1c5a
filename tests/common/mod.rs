// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Shared test support: a deterministic stand-in for the external JT65
//! codec.
//!
//! `encode` expands the text through SHA-256 into 63 six-bit symbols —
//! deterministic across instances, like the real codec. `decode` mimics the
//! Reed-Solomon behavior the engine relies on: any codeword within the
//! correctable-error bound of a known canonical codeword decodes back to its
//! text. Clones share the canonical registry, so a "receiver" codec knows
//! the same alphabet as the "sender" it was cloned from.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use undertone_core::{
    CapturedPacket, Codeword, CoverCodec, StegError, CODEWORD_SYMBOLS, CORRECTABLE_SYMBOLS,
};

#[derive(Clone, Default)]
pub struct MockCodec {
    registry: Arc<Mutex<HashMap<String, Codeword>>>,
}

impl MockCodec {
    pub fn new() -> Self {
        MockCodec::default()
    }

    fn codeword_for(text: &str) -> Codeword {
        let mut symbols = [0u8; CODEWORD_SYMBOLS];
        let mut filled = 0;
        let mut counter = 0u8;
        while filled < CODEWORD_SYMBOLS {
            let mut hasher = Sha256::new();
            hasher.update(b"mock-jt65");
            hasher.update([counter]);
            hasher.update(text.as_bytes());
            for &byte in hasher.finalize().iter() {
                if filled == CODEWORD_SYMBOLS {
                    break;
                }
                symbols[filled] = byte & 0x3F;
                filled += 1;
            }
            counter += 1;
        }
        Codeword::new(symbols)
    }
}

impl CoverCodec for MockCodec {
    fn encode(&self, text: &str) -> Result<Codeword, StegError> {
        let codeword = Self::codeword_for(text);
        self.registry
            .lock()
            .unwrap()
            .insert(text.to_string(), codeword.clone());
        Ok(codeword)
    }

    fn decode(&self, codeword: &Codeword) -> Result<String, StegError> {
        let registry = self.registry.lock().unwrap();
        for (text, canonical) in registry.iter() {
            let diffs = codeword
                .symbols()
                .iter()
                .zip(canonical.symbols())
                .filter(|(a, b)| a != b)
                .count();
            if diffs <= CORRECTABLE_SYMBOLS {
                return Ok(text.clone());
            }
        }
        Err(StegError::DecodeFailure("beyond error correction".into()))
    }
}

/// Wrap a codeword as a captured-audio packet.
pub fn captured(codeword: &Codeword) -> CapturedPacket {
    CapturedPacket {
        codeword: codeword.clone(),
        confidence: vec![1.0; CODEWORD_SYMBOLS],
        text: None,
        snr_db: -4.0,
        freq_hz: 1270.5,
        time_offset: 0.1,
        freq_drift: 0.0,
    }
}
