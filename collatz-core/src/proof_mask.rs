//! Cumulative "already proven" claim over completed bands.
//!
//! The mask state has exactly one writer: a dedicated thread that drains an update channel.
//! Everyone else holds a [`ProofMaskActor`] and talks to it through messages. Readers get
//! copies of the state, never a reference to it.

use std::{
    sync::mpsc::{sync_channel, Receiver, SyncSender},
    thread::{self, JoinHandle},
};

use common::config::ProofMaskConfig;

use crate::utils::errors::CollatzError;

/// Accumulated upper bounds of every completed band.
///
/// `mask` is the bitwise OR of every recorded bound. `mask_power` is the smallest power of two
/// above every `bound - 1` seen so far. Once `mask + 2 == mask_power << 1` the recorded bounds
/// form a contiguous run of powers of two from 2 upward and the mask is *solid*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofMask {
    pub mask: u64,
    pub mask_power: u64,
    pub mask_is_solid: bool,
}

impl Default for ProofMask {
    fn default() -> Self {
        Self {
            mask: 0,
            mask_power: 1,
            mask_is_solid: false,
        }
    }
}

impl ProofMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in the upper bound of a completed band.
    pub fn record(&mut self, stop: u64) {
        self.mask |= stop;
        // Stops above 2^63 would need a 2^64 power; saturate at the top bit instead.
        while self.mask_power <= stop.saturating_sub(1) && self.mask_power < 1 << 63 {
            self.mask_power <<= 1;
        }
        if !self.mask_is_solid {
            self.mask_is_solid = self
                .mask
                .checked_add(2)
                .zip(self.mask_power.checked_mul(2))
                .is_some_and(|(lhs, rhs)| lhs == rhs);
        }
    }

    /// Heuristic "likely already covered" check.
    ///
    /// A solid mask answers by magnitude. Otherwise the powers of two from `mask_power` down
    /// are scanned for a bit set in both `mask` and `n`.
    pub fn has_proven(&self, n: u64) -> bool {
        if n > self.mask {
            return false;
        }
        if self.mask_is_solid && n < self.mask {
            return true;
        }
        let mut power = self.mask_power;
        while power > 0 {
            if power & self.mask != 0 && power & n != 0 {
                return true;
            }
            power >>= 1;
        }
        false
    }
}

enum ProofMaskMessage {
    Record(u64),
    Snapshot(SyncSender<ProofMask>),
    Reset(ProofMask),
}

/// Handle to the thread that owns a [`ProofMask`].
pub struct ProofMaskActor {
    sender: Option<SyncSender<ProofMaskMessage>>,
    handle: Option<JoinHandle<()>>,
}

impl ProofMaskActor {
    /// Spawns the owning thread, starting from `initial`.
    pub fn spawn(initial: ProofMask, config: &ProofMaskConfig) -> Result<Self, CollatzError> {
        let (sender, receiver) = sync_channel(config.channel_depth);
        let handle = thread::Builder::new()
            .name("proof-mask".to_string())
            .spawn(move || Self::update_loop(initial, receiver))?;
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    fn update_loop(mut state: ProofMask, receiver: Receiver<ProofMaskMessage>) {
        while let Ok(message) = receiver.recv() {
            match message {
                ProofMaskMessage::Record(stop) => {
                    let was_solid = state.mask_is_solid;
                    state.record(stop);
                    tracing::trace!(stop, mask = state.mask, "proof mask updated");
                    if state.mask_is_solid && !was_solid {
                        tracing::debug!(mask = state.mask, "proof mask became solid");
                    }
                }
                ProofMaskMessage::Snapshot(reply) => {
                    // The caller may have given up waiting.
                    let _ = reply.send(state);
                }
                ProofMaskMessage::Reset(fresh) => state = fresh,
            }
        }
    }

    fn send(&self, message: ProofMaskMessage) -> Result<(), CollatzError> {
        self.sender
            .as_ref()
            .ok_or(CollatzError::ProofMaskClosed)?
            .send(message)
            .map_err(|_| CollatzError::ProofMaskClosed)
    }

    /// Queues the upper bound of a completed band. Returns once the update is enqueued, not applied.
    pub fn record(&self, stop: u64) -> Result<(), CollatzError> {
        self.send(ProofMaskMessage::Record(stop))
    }

    /// A copy of the state after every update this thread has already queued.
    pub fn snapshot(&self) -> Result<ProofMask, CollatzError> {
        let (reply, response) = sync_channel(1);
        self.send(ProofMaskMessage::Snapshot(reply))?;
        response.recv().map_err(|_| CollatzError::ProofMaskClosed)
    }

    pub fn has_proven(&self, n: u64) -> Result<bool, CollatzError> {
        Ok(self.snapshot()?.has_proven(n))
    }

    /// Replaces the state with `fresh`.
    pub fn reset(&self, fresh: ProofMask) -> Result<(), CollatzError> {
        self.send(ProofMaskMessage::Reset(fresh))
    }
}

impl Drop for ProofMaskActor {
    fn drop(&mut self) {
        // Dropping the sender ends the update loop.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
