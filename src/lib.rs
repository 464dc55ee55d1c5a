// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! # undertone-core
//!
//! Steganographic channel engine for JT65 amateur-radio transmissions.
//! Hides a ciphered byte payload inside the Reed-Solomon error-correction
//! margin of ordinary cover messages: a small, passphrase-selected subset of
//! the 63 codeword symbols is overwritten with payload data, few enough that
//! the cover message still decodes to its original, innocuous text.
//!
//! The engine owns position selection, embedding/extraction, the cipher
//! layer, multi-packet framing/reassembly, and steg detection. The JT65
//! codec itself (text ↔ codeword conversion, audio synthesis, capture
//! demodulation) is an external collaborator reached through the
//! [`CoverCodec`] trait.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use undertone_core::{ChannelConfig, StegChannel};
//!
//! let channel = StegChannel::new(codec, Some("passphrase"), ChannelConfig::default());
//! let covers = ["KB2BBC KA1AAB DD44", "KA1AAB KB2BBC DD44"];
//! let packets = channel.encode_transmission(&covers, Some(b"DEFCON22"))?;
//! let decoded = channel.decode_transmission(&packets)?;
//! assert_eq!(decoded.hidden.as_deref(), Some(&b"DEFCON22"[..]));
//! ```

pub mod codec;
pub mod steg;

pub use codec::{
    CapturedPacket, Codeword, CoverCodec, ExternalKeyring, CODEWORD_SYMBOLS, CORRECTABLE_SYMBOLS,
    SYMBOL_VALUE_MAX,
};
pub use steg::cipher::{CipherConfig, CipherLayer};
pub use steg::detect::{diff_count, diff_records, has_steg, DiffRecord};
pub use steg::embed::{cover_noise_only, embed};
pub use steg::error::StegError;
pub use steg::extract::extract;
pub use steg::frame::{frame_payload, ChunkOutcome, StegCollection};
pub use steg::key::NoiseKey;
pub use steg::monitor::{CancelFlag, DecodeTask, Monitor, MonitorEvent, SharedCollection};
pub use steg::pipeline::{ChannelConfig, PacketDecode, StegChannel, StegStatus, Transmission};
pub use steg::{
    hidden_capacity, CHUNK_BYTES, DEFAULT_STEG_THRESHOLD, MAX_RECOMMENDED_COVER_NOISE,
    SYMBOLS_PER_CHUNK,
};
