// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! Continuous-monitoring support: background decode of captured
//! transmissions.
//!
//! In monitoring operation the capture loop must never wait on decoding, so
//! each captured transmission is validated on its own background task while
//! the next capture proceeds. The one piece of state those tasks share is
//! the [`StegCollection`]; every read and mutation of it happens under a
//! mutex, taken once per task after all pure computation (decode, detect,
//! extract) is done. A task cancelled before that critical section leaves
//! the collection exactly as it found it — there is no partially-applied
//! chunk state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::codec::{CapturedPacket, CoverCodec};
use crate::steg::error::StegError;
use crate::steg::frame::StegCollection;
use crate::steg::pipeline::{StegChannel, StegStatus};

/// The long-lived chunk accumulator shared by all decode tasks.
pub type SharedCollection = Arc<Mutex<StegCollection>>;

/// Cooperative cancellation flag, checked at loop boundaries.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    /// Request cancellation of the task holding this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Turn a pending cancellation into an error.
    pub fn check(&self) -> Result<(), StegError> {
        if self.is_cancelled() {
            Err(StegError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What one background decode observed, in packet order.
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    /// A packet decoded to its cover text.
    CoverDecoded { index: usize, text: String },
    /// A packet the codec could not decode; skipped.
    Undecodable { index: usize },
    /// A flagged packet advanced an incomplete transmission.
    StegPending { received: usize, expected: usize },
    /// A hidden transmission completed and deciphered.
    HiddenMessage(Vec<u8>),
    /// The collection was reset (mid-transmission join).
    Anomaly,
}

/// One background decode task over a captured transmission batch.
pub struct DecodeTask {
    cancel: CancelFlag,
    handle: JoinHandle<Result<Vec<MonitorEvent>, StegError>>,
}

impl DecodeTask {
    /// Spawn the decode of `packets` against the shared collection.
    pub fn spawn<C>(
        channel: Arc<StegChannel<C>>,
        packets: Vec<CapturedPacket>,
        collection: SharedCollection,
    ) -> DecodeTask
    where
        C: CoverCodec + Send + Sync + 'static,
    {
        let cancel = CancelFlag::new();
        let task_cancel = cancel.clone();
        let handle = thread::spawn(move || {
            decode_batch(&channel, &packets, &collection, &task_cancel)
        });
        DecodeTask { cancel, handle }
    }

    /// Request cancellation; the task exits at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task and collect its events.
    pub fn join(self) -> Result<Vec<MonitorEvent>, StegError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(StegError::DecodeFailure("decode task panicked".into())),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Decode one captured batch. Pure work first; the collection mutex is taken
/// exactly once, after the last cancellation checkpoint.
fn decode_batch<C: CoverCodec>(
    channel: &StegChannel<C>,
    packets: &[CapturedPacket],
    collection: &SharedCollection,
    cancel: &CancelFlag,
) -> Result<Vec<MonitorEvent>, StegError> {
    let mut events = Vec::new();
    let mut chunks = Vec::new();

    for (index, packet) in packets.iter().enumerate() {
        cancel.check()?;
        let inspected = channel.inspect_captured(packet);
        match inspected.cover_text {
            Some(text) => events.push(MonitorEvent::CoverDecoded { index, text }),
            None => events.push(MonitorEvent::Undecodable { index }),
        }
        if let Some(chunk) = inspected.chunk {
            chunks.push(chunk);
        }
    }

    if chunks.is_empty() {
        return Ok(events);
    }

    // Last checkpoint before the critical section; past this point the
    // batch's chunks are applied in full.
    cancel.check()?;
    let mut collection = collection.lock().expect("steg collection mutex poisoned");
    for chunk in chunks {
        match channel.apply_chunk(chunk, &mut collection)? {
            StegStatus::Pending { received, expected } => {
                events.push(MonitorEvent::StegPending { received, expected });
            }
            StegStatus::Message(message) => {
                debug!(bytes = message.len(), "hidden transmission recovered");
                events.push(MonitorEvent::HiddenMessage(message));
            }
            StegStatus::Anomaly => {
                warn!("monitored steg mid-transmission; collection reset");
                events.push(MonitorEvent::Anomaly);
            }
        }
    }
    Ok(events)
}

/// Convenience wrapper owning the shared collection and outstanding tasks.
pub struct Monitor<C> {
    channel: Arc<StegChannel<C>>,
    collection: SharedCollection,
    tasks: Vec<DecodeTask>,
}

impl<C> Monitor<C>
where
    C: CoverCodec + Send + Sync + 'static,
{
    pub fn new(channel: Arc<StegChannel<C>>) -> Self {
        Monitor {
            channel,
            collection: Arc::new(Mutex::new(StegCollection::new())),
            tasks: Vec::new(),
        }
    }

    /// The shared collection, e.g. for progress display.
    pub fn collection(&self) -> &SharedCollection {
        &self.collection
    }

    /// Start decoding one captured transmission in the background and
    /// return immediately.
    pub fn spawn_decode(&mut self, packets: Vec<CapturedPacket>) {
        self.tasks.push(DecodeTask::spawn(
            Arc::clone(&self.channel),
            packets,
            Arc::clone(&self.collection),
        ));
    }

    /// Join tasks that already finished, returning their events.
    pub fn drain_finished(&mut self) -> Vec<Result<Vec<MonitorEvent>, StegError>> {
        let mut finished = Vec::new();
        let mut remaining = Vec::new();
        for task in self.tasks.drain(..) {
            if task.is_finished() {
                finished.push(task.join());
            } else {
                remaining.push(task);
            }
        }
        self.tasks = remaining;
        finished
    }

    /// Cancel and join every outstanding task.
    pub fn shutdown(mut self) -> Vec<Result<Vec<MonitorEvent>, StegError>> {
        for task in &self.tasks {
            task.cancel();
        }
        self.tasks.drain(..).map(DecodeTask::join).collect()
    }
}
