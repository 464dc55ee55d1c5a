// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Collaborator interfaces for the external JT65 codec and keyring.
//!
//! The modulation/demodulation side of JT65 lives outside this crate: text to
//! codeword conversion, audio tone synthesis, WAV handling, and FFT-based
//! symbol extraction from captured audio. The engine only needs the two
//! contracts below plus the codeword shape itself.

use core::fmt;

use crate::steg::error::StegError;

/// Number of symbols in one JT65 codeword.
pub const CODEWORD_SYMBOLS: usize = 63;

/// Largest valid symbol value (each symbol carries 6 bits).
pub const SYMBOL_VALUE_MAX: u8 = 63;

/// Symbol errors the Reed-Solomon (63, 12) code is guaranteed to correct.
///
/// Total perturbation per codeword (payload plus cover noise) must stay at or
/// below this bound, or the cover message itself becomes undecodable.
pub const CORRECTABLE_SYMBOLS: usize = 25;

/// One JT65 codeword: 63 symbols, each in `0..=63`.
///
/// Produced by the external codec as the canonical FEC-encoded form of a
/// short cover text. Treated as immutable once produced; the embedder works
/// on copies.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Codeword {
    symbols: [u8; CODEWORD_SYMBOLS],
}

impl Codeword {
    /// Wrap a raw symbol array.
    pub fn new(symbols: [u8; CODEWORD_SYMBOLS]) -> Self {
        debug_assert!(
            symbols.iter().all(|&s| s <= SYMBOL_VALUE_MAX),
            "symbol value out of range"
        );
        Codeword { symbols }
    }

    /// Build a codeword from a slice, validating length and symbol range.
    ///
    /// # Errors
    /// [`StegError::DecodeFailure`] if the slice is not 63 symbols long or
    /// contains a value above 63.
    pub fn try_from_slice(symbols: &[u8]) -> Result<Self, StegError> {
        if symbols.len() != CODEWORD_SYMBOLS {
            return Err(StegError::DecodeFailure(format!(
                "codeword has {} symbols, expected {CODEWORD_SYMBOLS}",
                symbols.len()
            )));
        }
        if let Some(&bad) = symbols.iter().find(|&&s| s > SYMBOL_VALUE_MAX) {
            return Err(StegError::DecodeFailure(format!(
                "symbol value {bad} out of range 0..={SYMBOL_VALUE_MAX}"
            )));
        }
        let mut array = [0u8; CODEWORD_SYMBOLS];
        array.copy_from_slice(symbols);
        Ok(Codeword { symbols: array })
    }

    /// The raw symbol array.
    pub fn symbols(&self) -> &[u8; CODEWORD_SYMBOLS] {
        &self.symbols
    }

    /// Symbol at `position`.
    pub fn symbol(&self, position: usize) -> u8 {
        self.symbols[position]
    }

    /// Overwrite the symbol at `position`.
    pub fn set_symbol(&mut self, position: usize, value: u8) {
        debug_assert!(value <= SYMBOL_VALUE_MAX, "symbol value out of range");
        self.symbols[position] = value;
    }
}

impl fmt::Display for Codeword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.symbols.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{s}")?;
        }
        write!(f, "]")
    }
}

/// Contract for the external JT65 codec.
///
/// `encode` must be deterministic: the same text always yields the same
/// codeword. That determinism is what lets the detector recompute the
/// canonical codeword from a decoded cover text and diff it against what was
/// actually received.
pub trait CoverCodec {
    /// FEC-encode a cover text into its canonical codeword.
    fn encode(&self, text: &str) -> Result<Codeword, StegError>;

    /// Decode a (possibly perturbed) codeword back to the cover text.
    ///
    /// # Errors
    /// [`StegError::DecodeFailure`] when the codeword is beyond the error
    /// correction bound or otherwise unrecoverable. The caller skips such
    /// packets; the failure is never fatal to a decode run.
    fn decode(&self, codeword: &Codeword) -> Result<String, StegError>;
}

/// One demodulated transmission from captured audio, as reported by the
/// external codec's capture path.
#[derive(Clone, Debug)]
pub struct CapturedPacket {
    /// Received symbols.
    pub codeword: Codeword,
    /// Per-symbol demodulation confidence, one entry per codeword position.
    pub confidence: Vec<f32>,
    /// Cover text as decoded by the demodulator, if it succeeded.
    pub text: Option<String>,
    /// Signal-to-noise ratio in dB.
    pub snr_db: f32,
    /// Carrier frequency offset in Hz.
    pub freq_hz: f32,
    /// Time offset of the sync vector, in seconds.
    pub time_offset: f32,
    /// Frequency drift across the transmission, in Hz.
    pub freq_drift: f32,
}

/// Contract for an external asymmetric keyring (e.g. a GPG wrapper).
///
/// Used by [`CipherConfig::Keyring`](crate::steg::cipher::CipherConfig):
/// the engine hands the raw payload over and embeds whatever ciphertext the
/// keyring returns. Because reassembled data may carry up to eight trailing
/// NUL bytes of chunk padding, `decrypt` must tolerate trailing NULs after
/// the ciphertext proper (keyring formats are self-delimiting).
pub trait ExternalKeyring {
    /// Encrypt `data` for `recipient`.
    ///
    /// # Errors
    /// [`StegError::CipherBackendUnavailable`] for unknown recipients or a
    /// missing backend.
    fn encrypt(&self, data: &[u8], recipient: &str) -> Result<Vec<u8>, StegError>;

    /// Decrypt `data` with the local secret key.
    ///
    /// # Errors
    /// [`StegError::CipherBackendUnavailable`] when no matching secret key
    /// is present.
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StegError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_slice_roundtrip() {
        let symbols: Vec<u8> = (0..63).map(|i| (i % 64) as u8).collect();
        let cw = Codeword::try_from_slice(&symbols).unwrap();
        assert_eq!(&cw.symbols()[..], &symbols[..]);
    }

    #[test]
    fn try_from_slice_wrong_length() {
        assert!(Codeword::try_from_slice(&[0u8; 62]).is_err());
        assert!(Codeword::try_from_slice(&[0u8; 64]).is_err());
    }

    #[test]
    fn try_from_slice_value_out_of_range() {
        let mut symbols = [0u8; 63];
        symbols[17] = 64;
        assert!(Codeword::try_from_slice(&symbols).is_err());
    }

    #[test]
    fn set_symbol_updates() {
        let mut cw = Codeword::new([0u8; 63]);
        cw.set_symbol(5, 42);
        assert_eq!(cw.symbol(5), 42);
        assert_eq!(cw.symbol(4), 0);
    }
}
