// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! The channel pipeline: one configuration object tying codec, key, cipher,
//! framing, embedding, and detection together.
//!
//! Encode: cover texts → canonical codewords; hidden payload → cipher →
//! 9-byte chunks → embedding. Decode: received codeword → cover decode →
//! detection gate → extraction → collection → decipher on completion.
//!
//! All state lives in explicit objects handed to the entry points: the
//! channel itself is immutable after construction, and the only mutable
//! decode state is the caller-owned [`StegCollection`].

use tracing::{debug, warn};

use crate::codec::{CapturedPacket, Codeword, CoverCodec, ExternalKeyring};
use crate::steg::cipher::{strip_channel_padding, CipherConfig, CipherLayer, LengthMode};
use crate::steg::detect::has_steg;
use crate::steg::embed::embed;
use crate::steg::error::StegError;
use crate::steg::extract::extract;
use crate::steg::frame::{frame_payload, ChunkOutcome, StegCollection};
use crate::steg::key::NoiseKey;
use crate::steg::{CHUNK_BYTES, DEFAULT_STEG_THRESHOLD, SYMBOLS_PER_CHUNK};

/// Channel configuration. The cipher applies to the hidden payload only;
/// cover traffic is never touched by it.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Cipher for the hidden payload.
    pub cipher: CipherConfig,
    /// Extra camouflage perturbations per payload codeword.
    pub cover_noise: usize,
    /// Detection threshold: diff counts in `1..=steg_threshold` flag a
    /// packet as payload-bearing.
    pub steg_threshold: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            cipher: CipherConfig::None,
            cover_noise: 0,
            steg_threshold: DEFAULT_STEG_THRESHOLD,
        }
    }
}

/// What one decoded packet yielded.
#[derive(Debug)]
pub struct PacketDecode {
    /// Cover text, when the codec could recover it.
    pub cover_text: Option<String>,
    /// Steg progress, when the packet was flagged as payload-bearing.
    pub steg: Option<StegStatus>,
}

/// Steg-side outcome of one flagged packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StegStatus {
    /// Transmission incomplete: `received` of `expected` chunks collected.
    Pending { received: usize, expected: usize },
    /// Transmission complete: the deciphered hidden message.
    Message(Vec<u8>),
    /// The collection was reset (mid-transmission join).
    Anomaly,
}

/// A fully decoded transmission batch.
#[derive(Debug)]
pub struct Transmission {
    /// Cover texts of all packets the codec could decode, in order.
    pub cover_texts: Vec<String>,
    /// The hidden message, if one completed within this batch.
    pub hidden: Option<Vec<u8>>,
}

/// Per-packet inspection result: the pure (lock-free) part of decoding.
#[derive(Debug)]
pub struct InspectedPacket {
    /// Cover text, when the codec could recover it.
    pub cover_text: Option<String>,
    /// Extracted raw chunk, when the detector flagged the packet.
    pub chunk: Option<Vec<u8>>,
}

/// The steganographic channel: codec + noise key + cipher + tuning.
pub struct StegChannel<C> {
    codec: C,
    cipher: CipherLayer,
    key: Option<NoiseKey>,
    cover_noise: usize,
    threshold: usize,
}

impl<C: CoverCodec> StegChannel<C> {
    /// Build a channel. `passphrase: None` (or an empty passphrase)
    /// disables the steg side entirely — encode still produces clean cover
    /// traffic and decode still returns cover texts.
    pub fn new(codec: C, passphrase: Option<&str>, config: ChannelConfig) -> Self {
        Self::build(codec, passphrase, config, None)
    }

    /// Build a channel with an external keyring for asymmetric cipher mode.
    pub fn with_keyring(
        codec: C,
        passphrase: Option<&str>,
        config: ChannelConfig,
        keyring: Box<dyn ExternalKeyring + Send + Sync>,
    ) -> Self {
        Self::build(codec, passphrase, config, Some(keyring))
    }

    fn build(
        codec: C,
        passphrase: Option<&str>,
        config: ChannelConfig,
        keyring: Option<Box<dyn ExternalKeyring + Send + Sync>>,
    ) -> Self {
        if config.steg_threshold < SYMBOLS_PER_CHUNK + config.cover_noise {
            warn!(
                threshold = config.steg_threshold,
                cover_noise = config.cover_noise,
                "detection threshold below full-chunk perturbation; payload packets will be missed"
            );
        }
        let key = passphrase.filter(|p| !p.is_empty()).map(NoiseKey::derive);
        let cipher = match keyring {
            Some(keyring) => CipherLayer::with_keyring(config.cipher, keyring),
            None => CipherLayer::new(config.cipher),
        };
        StegChannel {
            codec,
            cipher,
            key,
            cover_noise: config.cover_noise,
            threshold: config.steg_threshold,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Whether a noise key is configured.
    pub fn steg_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Encode one transmission batch.
    ///
    /// Every cover text becomes one codeword; the hidden payload (if any) is
    /// ciphered, framed, and embedded into the leading codewords. Codewords
    /// beyond the payload pass through clean.
    ///
    /// # Errors
    /// - [`StegError::KeyMissing`] if `hidden` is given without a passphrase.
    /// - [`StegError::CapacityExceeded`] if the payload needs more packets
    ///   than cover texts were supplied (or more than 127).
    /// - Cipher errors per [`CipherLayer::encrypt`].
    pub fn encode_transmission(
        &self,
        cover_texts: &[&str],
        hidden: Option<&[u8]>,
    ) -> Result<Vec<Codeword>, StegError> {
        let mut codewords = Vec::with_capacity(cover_texts.len());
        for text in cover_texts {
            codewords.push(self.codec.encode(text)?);
        }

        let Some(payload) = hidden else {
            return Ok(codewords);
        };
        let key = self.key.as_ref().ok_or(StegError::KeyMissing)?;

        let aligned = self.align_payload(payload);
        let ciphered = self.cipher.encrypt(&aligned)?;
        let chunks = frame_payload(&ciphered, codewords.len())?;
        debug!(
            packets = codewords.len(),
            payload_packets = chunks.len(),
            payload_bytes = payload.len(),
            "encoding steg transmission"
        );
        embed(&codewords, &chunks, &mut key.session(), self.cover_noise)
    }

    /// The pure half of packet decoding: cover decode, detection gate,
    /// extraction. Takes no locks and touches no shared state, so monitor
    /// tasks run it before entering the collection's critical section.
    ///
    /// `decoded_text` short-circuits the codec when the capture path already
    /// decoded the packet.
    pub fn inspect_packet(
        &self,
        received: &Codeword,
        decoded_text: Option<&str>,
    ) -> InspectedPacket {
        let text = match decoded_text {
            Some(text) => Some(text.to_string()),
            None => match self.codec.decode(received) {
                Ok(text) => Some(text),
                Err(error) => {
                    debug!(%error, "cover decode failed; skipping packet");
                    None
                }
            },
        };
        let Some(text) = text else {
            return InspectedPacket { cover_text: None, chunk: None };
        };

        let Some(key) = &self.key else {
            return InspectedPacket { cover_text: Some(text), chunk: None };
        };

        let flagged = match has_steg(&self.codec, &text, received, self.threshold) {
            Ok(flagged) => flagged,
            Err(error) => {
                warn!(%error, "canonical re-encode failed; treating packet as clean");
                false
            }
        };
        let chunk = if flagged {
            Some(extract(received, &mut key.session()))
        } else {
            None
        };
        InspectedPacket { cover_text: Some(text), chunk }
    }

    /// Inspect a captured-audio packet, reusing the demodulator's decode.
    pub fn inspect_captured(&self, packet: &CapturedPacket) -> InspectedPacket {
        self.inspect_packet(&packet.codeword, packet.text.as_deref())
    }

    /// Feed one extracted chunk into a collection and decipher the payload
    /// if the transmission completed.
    ///
    /// # Errors
    /// Cipher errors from deciphering a completed payload. The collection
    /// has already been drained and reset when that happens, so a retry
    /// starts clean.
    pub fn apply_chunk(
        &self,
        chunk: Vec<u8>,
        collection: &mut StegCollection,
    ) -> Result<StegStatus, StegError> {
        match collection.push(chunk) {
            ChunkOutcome::Collecting { received, expected } => {
                debug!(received, expected, "steg transmission in progress");
                Ok(StegStatus::Pending { received, expected })
            }
            ChunkOutcome::Complete(raw) => {
                let message = strip_channel_padding(self.cipher.decrypt(&raw)?);
                debug!(bytes = message.len(), "steg transmission complete");
                Ok(StegStatus::Message(message))
            }
            ChunkOutcome::AnomalyReset => Ok(StegStatus::Anomaly),
        }
    }

    /// Decode one packet against a caller-owned collection.
    pub fn decode_packet(
        &self,
        received: &Codeword,
        collection: &mut StegCollection,
    ) -> Result<PacketDecode, StegError> {
        let inspected = self.inspect_packet(received, None);
        let steg = match inspected.chunk {
            Some(chunk) => Some(self.apply_chunk(chunk, collection)?),
            None => None,
        };
        Ok(PacketDecode { cover_text: inspected.cover_text, steg })
    }

    /// Decode a whole received batch with a fresh collection.
    pub fn decode_transmission(&self, received: &[Codeword]) -> Result<Transmission, StegError> {
        let mut collection = StegCollection::new();
        let mut cover_texts = Vec::new();
        let mut hidden = None;
        for codeword in received {
            let packet = self.decode_packet(codeword, &mut collection)?;
            if let Some(text) = packet.cover_text {
                cover_texts.push(text);
            }
            if let Some(StegStatus::Message(message)) = packet.steg {
                hidden = Some(message);
            }
        }
        if hidden.is_none() && !collection.is_empty() {
            debug!(
                received = collection.received(),
                expected = ?collection.expected(),
                "batch ended with incomplete steg collection"
            );
        }
        Ok(Transmission { cover_texts, hidden })
    }

    /// NUL-pad the plaintext so that ciphertext plus status byte fill whole
    /// chunks, for ciphers whose output length tracks their input length.
    /// Block and keyring ciphers are left alone; the framer pads their tail
    /// instead and decrypt discards it.
    fn align_payload(&self, payload: &[u8]) -> Vec<u8> {
        match self.cipher.length_mode() {
            LengthMode::Preserving { prefix } => {
                let mut buf = payload.to_vec();
                let rem = (buf.len() + prefix + 1) % CHUNK_BYTES;
                if rem != 0 {
                    buf.resize(buf.len() + CHUNK_BYTES - rem, 0);
                }
                buf
            }
            LengthMode::Block | LengthMode::Opaque => payload.to_vec(),
        }
    }
}
