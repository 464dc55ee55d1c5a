// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Passphrase-derived position and value selection.
//!
//! A [`NoiseKey`] is the shared secret of the channel: a deterministic
//! pseudo-random sequence seeded solely from a passphrase exchanged
//! out-of-band. Sender and receiver build their own instance and consume it
//! in lockstep — the embedder to pick which codeword positions to overwrite,
//! the extractor to replay exactly that choice.
//!
//! Derivation is Argon2id with a fixed salt (both sides must reach the same
//! seed from the passphrase alone), feeding a ChaCha20 PRNG. Positions are
//! drawn as `u32` so the sequence is identical on 32-bit and 64-bit targets;
//! `usize` ranges consume different amounts of PRNG entropy per draw on WASM
//! versus native.

use argon2::Argon2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroize;

use crate::codec::CODEWORD_SYMBOLS;

/// Fixed salt for noise-key derivation. Intentionally constant so sender and
/// receiver derive identical sequences from the passphrase alone.
const POSITION_SALT: &[u8; 16] = b"undertone-key-v1";

/// Deterministic, replayable position/value generator.
pub struct NoiseKey {
    seed: [u8; 32],
    rng: ChaCha20Rng,
}

impl NoiseKey {
    /// Derive a noise key from a passphrase.
    ///
    /// Purely computational; two instances derived from the same passphrase
    /// produce identical sequences. An empty or absent passphrase is the
    /// caller's way of disabling the channel entirely and never reaches this
    /// constructor in normal operation.
    pub fn derive(passphrase: &str) -> Self {
        let mut seed = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), POSITION_SALT, &mut seed)
            .expect("Argon2 noise key derivation should not fail");
        let rng = ChaCha20Rng::from_seed(seed);
        NoiseKey { seed, rng }
    }

    /// Next codeword position, in `0..63`.
    ///
    /// May repeat; callers that need distinct positions skip values already
    /// used within the current codeword.
    pub fn next_position(&mut self) -> usize {
        self.rng.gen_range(0..CODEWORD_SYMBOLS as u32) as usize
    }

    /// Next camouflage byte, in `0..=255`.
    pub fn next_byte(&mut self) -> u8 {
        self.rng.gen()
    }

    /// Rewind the generator to its initial state.
    ///
    /// The embedder and extractor reset at every codeword boundary so that a
    /// receiver can resynchronize per packet without knowing how much of the
    /// sequence the sender consumed for cover noise.
    pub fn reset(&mut self) {
        self.rng = ChaCha20Rng::from_seed(self.seed);
    }

    /// A fresh generator over the same seed, positioned at the initial
    /// state. Encode and decode run as independent processes; each takes its
    /// own session handle.
    pub fn session(&self) -> NoiseKey {
        NoiseKey {
            seed: self.seed,
            rng: ChaCha20Rng::from_seed(self.seed),
        }
    }
}

impl Drop for NoiseKey {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

impl core::fmt::Debug for NoiseKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("NoiseKey(..)")
    }
}
