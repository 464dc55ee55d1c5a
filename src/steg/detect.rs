// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Steg detection: canonical re-encode and symbol diffing.
//!
//! A received codeword that decoded cleanly is diffed against the canonical
//! codeword of its own decoded text. Zero differences is ordinary cover
//! traffic. A small difference count — at most the detection threshold — is
//! the signature of deliberate embedding. A large count is uncorrelated
//! channel noise or decoder garbage and is left alone; the threshold must
//! therefore always exceed the largest perturbation the embedder introduces,
//! cover noise included, or genuine payload packets get misclassified.

use crate::codec::{Codeword, CoverCodec};
use crate::steg::error::StegError;

/// One symbol-level difference between a received codeword and the
/// canonical codeword of its decoded text. Derived on demand, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffRecord {
    /// Codeword position of the difference.
    pub position: usize,
    /// Symbol actually received.
    pub received: u8,
    /// Symbol of the canonical re-encoding.
    pub canonical: u8,
    /// Demodulation confidence for this position, when captured audio
    /// provided one.
    pub confidence: Option<f32>,
}

/// Count positions where `received` differs from `canonical`.
pub fn diff_count(received: &Codeword, canonical: &Codeword) -> usize {
    received
        .symbols()
        .iter()
        .zip(canonical.symbols())
        .filter(|(r, c)| r != c)
        .count()
}

/// Materialize the differing positions, attaching per-symbol confidence
/// values when available.
pub fn diff_records(
    received: &Codeword,
    canonical: &Codeword,
    confidence: Option<&[f32]>,
) -> Vec<DiffRecord> {
    received
        .symbols()
        .iter()
        .zip(canonical.symbols())
        .enumerate()
        .filter(|(_, (r, c))| r != c)
        .map(|(position, (&received, &canonical))| DiffRecord {
            position,
            received,
            canonical,
            confidence: confidence.and_then(|v| v.get(position).copied()),
        })
        .collect()
}

/// Decide whether a packet plausibly carries a hidden payload.
///
/// Re-encodes the decoded cover text through the codec and counts symbol
/// differences: flagged iff `0 < diff_count <= threshold`.
///
/// # Errors
/// Propagates the codec's encode failure (the decoded text could not be
/// re-encoded, so no canonical codeword exists to diff against).
pub fn has_steg<C: CoverCodec + ?Sized>(
    codec: &C,
    cover_text: &str,
    received: &Codeword,
    threshold: usize,
) -> Result<bool, StegError> {
    let canonical = codec.encode(cover_text)?;
    let diffs = diff_count(received, &canonical);
    Ok(diffs > 0 && diffs <= threshold)
}
