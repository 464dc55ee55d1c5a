// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Cipher layer for the hidden payload.
//!
//! The payload is ciphered before framing; the cipher is picked once at
//! configuration time from the closed [`CipherConfig`] set and never
//! re-dispatched per call. Supported transforms:
//!
//! - `None`: identity (the channel still scatters and hides the bytes, it
//!   just does not encrypt them).
//! - `Xor`: repeating-key XOR, any non-empty key.
//! - `Arc4`: RC4 keystream; the variable-length user key is hashed with
//!   SHA-256 down to the fixed 256-bit key the cipher takes.
//! - `AesEcb` / `AesCbc` / `AesCfb`: AES-256; the passphrase is stretched to
//!   the 32-byte key with Argon2id and a fixed salt, so both ends derive the
//!   same key from the passphrase alone.
//! - `Otp`: one-time pad. The key must cover the whole payload; a short key
//!   is a hard error, never cycled.
//! - `Keyring`: delegates to an external asymmetric keyring.
//!
//! CBC and CFB need an initialization vector, and the packet itself is the
//! only channel to the receiver, so the IV rides in-band: 16 bytes prepended
//! to the ciphertext. The IV is synthesized from key and plaintext rather
//! than drawn from an OS RNG, which keeps repeated embeddings of identical
//! input byte-identical (and, SIV-style, never reuses an IV across distinct
//! messages).

use aes::cipher::{
    block_padding::NoPadding, generic_array::GenericArray, AsyncStreamCipher, BlockDecrypt,
    BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher,
};
use aes::Aes256;
use argon2::Argon2;
use rc4::{consts::U32, Rc4};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::codec::ExternalKeyring;
use crate::steg::error::StegError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// AES block and IV length in bytes.
const BLOCK_LEN: usize = 16;

/// Fixed salt for stretching a cipher passphrase into an AES-256 key.
/// Distinct from the noise-key salt so the two secrets stay uncorrelated
/// even when the operator reuses one passphrase for both.
const CIPHER_KEY_SALT: &[u8; 16] = b"undertone-aes-v1";

/// Domain separator for synthetic IV generation.
const IV_DOMAIN: &[u8] = b"undertone-iv-v1";

/// Cipher selection plus its key material, fixed at configuration time.
#[derive(Clone, Debug)]
pub enum CipherConfig {
    /// No encryption; payload bytes are embedded as-is.
    None,
    /// Repeating-key XOR.
    Xor { key: Vec<u8> },
    /// RC4 keystream.
    Arc4 { key: Vec<u8> },
    /// AES-256 in ECB mode.
    AesEcb { passphrase: String },
    /// AES-256 in CBC mode, IV carried in-band.
    AesCbc { passphrase: String },
    /// AES-256 in CFB mode, IV carried in-band.
    AesCfb { passphrase: String },
    /// One-time pad; key must be at least as long as the payload.
    Otp { key: Vec<u8> },
    /// External asymmetric keyring, addressed by recipient identity.
    Keyring { recipient: String },
}

/// How a cipher's output length relates to its input length. The channel
/// pipeline uses this to decide where chunk-alignment padding goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LengthMode {
    /// Ciphertext length equals plaintext length plus a fixed prefix
    /// (zero for pure stream transforms, 16 for the in-band CFB IV).
    Preserving { prefix: usize },
    /// Ciphertext is a whole number of cipher blocks; decrypt truncates its
    /// input back to the block boundary, discarding chunk padding.
    Block,
    /// Ciphertext length is not under our control (external keyring).
    Opaque,
}

/// A resolved cipher: configuration plus the optional keyring collaborator.
pub struct CipherLayer {
    config: CipherConfig,
    keyring: Option<Box<dyn ExternalKeyring + Send + Sync>>,
}

impl CipherLayer {
    pub fn new(config: CipherConfig) -> Self {
        CipherLayer { config, keyring: None }
    }

    /// Attach the external keyring used by [`CipherConfig::Keyring`].
    pub fn with_keyring(
        config: CipherConfig,
        keyring: Box<dyn ExternalKeyring + Send + Sync>,
    ) -> Self {
        CipherLayer { config, keyring: Some(keyring) }
    }

    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    pub(crate) fn length_mode(&self) -> LengthMode {
        match self.config {
            CipherConfig::None
            | CipherConfig::Xor { .. }
            | CipherConfig::Arc4 { .. }
            | CipherConfig::Otp { .. } => LengthMode::Preserving { prefix: 0 },
            CipherConfig::AesCfb { .. } => LengthMode::Preserving { prefix: BLOCK_LEN },
            CipherConfig::AesEcb { .. } | CipherConfig::AesCbc { .. } => LengthMode::Block,
            CipherConfig::Keyring { .. } => LengthMode::Opaque,
        }
    }

    /// Encrypt a payload.
    ///
    /// # Errors
    /// - [`StegError::CipherKeyInvalid`] for empty keys, empty passphrases,
    ///   or a one-time-pad key shorter than the payload — raised before any
    ///   output is produced.
    /// - [`StegError::CipherBackendUnavailable`] when keyring mode is
    ///   selected but no keyring is attached, or the keyring itself fails.
    pub fn encrypt(&self, payload: &[u8]) -> Result<Vec<u8>, StegError> {
        match &self.config {
            CipherConfig::None => Ok(payload.to_vec()),
            CipherConfig::Xor { key } => xor_cycle(payload, key),
            CipherConfig::Arc4 { key } => arc4_apply(payload, key),
            CipherConfig::AesEcb { passphrase } => {
                let key = derive_cipher_key(passphrase)?;
                let mut buf = pad_to_block(payload);
                let cipher = Aes256::new(GenericArray::from_slice(&*key));
                for block in buf.chunks_exact_mut(BLOCK_LEN) {
                    cipher.encrypt_block(GenericArray::from_mut_slice(block));
                }
                Ok(buf)
            }
            CipherConfig::AesCbc { passphrase } => {
                let key = derive_cipher_key(passphrase)?;
                let iv = synthetic_iv(&*key, payload);
                let padded = pad_to_block(payload);
                let ct = Aes256CbcEnc::new(
                    GenericArray::from_slice(&*key),
                    GenericArray::from_slice(&iv),
                )
                .encrypt_padded_vec_mut::<NoPadding>(&padded);
                let mut out = Vec::with_capacity(BLOCK_LEN + ct.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&ct);
                Ok(out)
            }
            CipherConfig::AesCfb { passphrase } => {
                let key = derive_cipher_key(passphrase)?;
                let iv = synthetic_iv(&*key, payload);
                let mut buf = payload.to_vec();
                Aes256CfbEnc::new(GenericArray::from_slice(&*key), GenericArray::from_slice(&iv))
                    .encrypt(&mut buf);
                let mut out = Vec::with_capacity(BLOCK_LEN + buf.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&buf);
                Ok(out)
            }
            CipherConfig::Otp { key } => {
                if key.is_empty() {
                    return Err(StegError::CipherKeyInvalid("one-time-pad key is empty"));
                }
                if key.len() < payload.len() {
                    return Err(StegError::CipherKeyInvalid(
                        "one-time-pad key shorter than payload",
                    ));
                }
                Ok(payload.iter().zip(key.iter()).map(|(p, k)| p ^ k).collect())
            }
            CipherConfig::Keyring { recipient } => self.require_keyring()?.encrypt(payload, recipient),
        }
    }

    /// Decrypt reassembled data.
    ///
    /// Block modes truncate their input back to a whole number of cipher
    /// blocks first, discarding up to one chunk's worth of trailing padding
    /// introduced by the framer.
    ///
    /// # Errors
    /// Mirrors [`CipherLayer::encrypt`], plus
    /// [`StegError::MalformedPayload`] when the data is too short for the
    /// configured mode (e.g. no room for the in-band IV).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StegError> {
        match &self.config {
            CipherConfig::None => Ok(data.to_vec()),
            CipherConfig::Xor { key } => xor_cycle(data, key),
            CipherConfig::Arc4 { key } => arc4_apply(data, key),
            CipherConfig::AesEcb { passphrase } => {
                let key = derive_cipher_key(passphrase)?;
                let usable = data.len() - data.len() % BLOCK_LEN;
                if usable == 0 {
                    return Err(StegError::MalformedPayload("no complete cipher block"));
                }
                let mut buf = data[..usable].to_vec();
                let cipher = Aes256::new(GenericArray::from_slice(&*key));
                for block in buf.chunks_exact_mut(BLOCK_LEN) {
                    cipher.decrypt_block(GenericArray::from_mut_slice(block));
                }
                Ok(buf)
            }
            CipherConfig::AesCbc { passphrase } => {
                let key = derive_cipher_key(passphrase)?;
                if data.len() < BLOCK_LEN * 2 {
                    return Err(StegError::MalformedPayload("ciphertext shorter than IV + block"));
                }
                let iv = &data[..BLOCK_LEN];
                let body = &data[BLOCK_LEN..];
                let usable = body.len() - body.len() % BLOCK_LEN;
                Aes256CbcDec::new(GenericArray::from_slice(&*key), GenericArray::from_slice(iv))
                    .decrypt_padded_vec_mut::<NoPadding>(&body[..usable])
                    .map_err(|_| StegError::MalformedPayload("CBC block structure invalid"))
            }
            CipherConfig::AesCfb { passphrase } => {
                let key = derive_cipher_key(passphrase)?;
                if data.len() < BLOCK_LEN {
                    return Err(StegError::MalformedPayload("ciphertext shorter than IV"));
                }
                let iv = &data[..BLOCK_LEN];
                let mut buf = data[BLOCK_LEN..].to_vec();
                Aes256CfbDec::new(GenericArray::from_slice(&*key), GenericArray::from_slice(iv))
                    .decrypt(&mut buf);
                Ok(buf)
            }
            CipherConfig::Otp { key } => {
                if key.is_empty() {
                    return Err(StegError::CipherKeyInvalid("one-time-pad key is empty"));
                }
                if key.len() < data.len() {
                    return Err(StegError::CipherKeyInvalid(
                        "one-time-pad key shorter than payload",
                    ));
                }
                Ok(data.iter().zip(key.iter()).map(|(c, k)| c ^ k).collect())
            }
            CipherConfig::Keyring { .. } => self.require_keyring()?.decrypt(data),
        }
    }

    fn require_keyring(&self) -> Result<&(dyn ExternalKeyring + Send + Sync), StegError> {
        self.keyring
            .as_deref()
            .ok_or_else(|| StegError::CipherBackendUnavailable("no keyring attached".into()))
    }
}

/// Stretch a cipher passphrase to the 32-byte AES key.
fn derive_cipher_key(passphrase: &str) -> Result<Zeroizing<[u8; 32]>, StegError> {
    if passphrase.is_empty() {
        return Err(StegError::CipherKeyInvalid("cipher passphrase is empty"));
    }
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), CIPHER_KEY_SALT, &mut *key)
        .expect("Argon2 cipher key derivation should not fail");
    Ok(key)
}

/// Deterministic IV: first 16 bytes of SHA-256 over domain ‖ key ‖ plaintext.
fn synthetic_iv(key: &[u8], plaintext: &[u8]) -> [u8; BLOCK_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(IV_DOMAIN);
    hasher.update(key);
    hasher.update(plaintext);
    let digest = hasher.finalize();
    let mut iv = [0u8; BLOCK_LEN];
    iv.copy_from_slice(&digest[..BLOCK_LEN]);
    iv
}

/// Repeating-key XOR; its own inverse.
fn xor_cycle(data: &[u8], key: &[u8]) -> Result<Vec<u8>, StegError> {
    if key.is_empty() {
        return Err(StegError::CipherKeyInvalid("XOR key is empty"));
    }
    Ok(data
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect())
}

/// RC4 keystream application; its own inverse. The user key is hashed to the
/// fixed 256-bit width the cipher takes.
fn arc4_apply(data: &[u8], key: &[u8]) -> Result<Vec<u8>, StegError> {
    if key.is_empty() {
        return Err(StegError::CipherKeyInvalid("RC4 key is empty"));
    }
    let rc4_key: [u8; 32] = Sha256::digest(key).into();
    let mut cipher = Rc4::<U32>::new(GenericArray::from_slice(&rc4_key));
    let mut buf = data.to_vec();
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

/// NUL-pad to a whole number of AES blocks.
fn pad_to_block(data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    let rem = buf.len() % BLOCK_LEN;
    if rem != 0 || buf.is_empty() {
        buf.resize(buf.len() + BLOCK_LEN - rem, 0);
    }
    buf
}

/// Strip the trailing NUL padding that chunk alignment introduces.
///
/// Payloads therefore must not end in 0x00; same contract the channel has
/// always had for its space-padded text traffic.
pub(crate) fn strip_channel_padding(mut data: Vec<u8>) -> Vec<u8> {
    while data.last() == Some(&0) {
        data.pop();
    }
    data
}
