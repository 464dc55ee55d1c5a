// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Error types for the steganographic channel.
//!
//! Everything here is recoverable by the caller; nothing in the engine
//! terminates the process. Capacity and key-validity errors are raised
//! before any partial output is produced.

use core::fmt;

/// Errors that can occur while embedding, extracting, or reassembling.
#[derive(Debug)]
pub enum StegError {
    /// A hidden payload was supplied but no steg passphrase is configured.
    KeyMissing,
    /// Payload or perturbation count exceeds what the cover traffic can carry.
    CapacityExceeded {
        /// What the operation needed (chunks, packets, or symbols).
        required: usize,
        /// What was actually available.
        available: usize,
    },
    /// Cipher key material is unusable (e.g. empty, or a one-time-pad key
    /// shorter than the payload).
    CipherKeyInvalid(&'static str),
    /// The external keyring backend failed (unknown recipient, missing
    /// secret key, or no keyring configured at all).
    CipherBackendUnavailable(String),
    /// The external codec could not recover a cover text. The packet is
    /// skipped for detection and extraction.
    DecodeFailure(String),
    /// A collection's leading chunk did not carry the start-of-transmission
    /// flag; the collection was reset.
    ReassemblyAnomaly,
    /// Reassembled data was too short or malformed for the configured cipher.
    MalformedPayload(&'static str),
    /// A background decode task was cancelled.
    Cancelled,
}

impl fmt::Display for StegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMissing => write!(f, "no steg passphrase configured"),
            Self::CapacityExceeded { required, available } => {
                write!(f, "capacity exceeded: required {required}, available {available}")
            }
            Self::CipherKeyInvalid(reason) => write!(f, "cipher key invalid: {reason}"),
            Self::CipherBackendUnavailable(reason) => {
                write!(f, "cipher backend unavailable: {reason}")
            }
            Self::DecodeFailure(reason) => write!(f, "cover decode failed: {reason}"),
            Self::ReassemblyAnomaly => {
                write!(f, "leading chunk lacks start flag; collection reset")
            }
            Self::MalformedPayload(reason) => write!(f, "malformed payload: {reason}"),
            Self::Cancelled => write!(f, "decode task cancelled"),
        }
    }
}

impl std::error::Error for StegError {}
