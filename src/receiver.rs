//! Selective-Repeat receive-side state machine.
//!
//! [`SrReceiver`] accepts any packet inside its window `[NPE, LPA]`:
//!
//! - The **in-order** packet (seq == NPE) is delivered upward immediately,
//!   then the reorder buffer is drained for as long as it fills the gap,
//!   and a single cumulative ack covers the whole run.
//! - **Out-of-order** in-window packets are parked in the reorder buffer
//!   (duplicates suppressed) and answered with a boundary ack repeating
//!   `NPE − 1`, prompting the sender's duplicate-ack fast retransmit.
//! - **Out-of-window** packets are not delivered but still acked with the
//!   boundary value — the sender may have missed an earlier ack.
//! - Corrupted packets are dropped silently; no ack at all, so the sender
//!   recovers by timeout or duplicate ack.
//!
//! Every ack carries the selective-ack list of sequence numbers currently
//! sitting in the reorder buffer.
//!
//! This module only manages state; channel and upper-layer side effects go
//! through the injected [`ReceiverContext`].

use std::collections::BTreeMap;

use crate::config::ProtocolConfig;
use crate::context::ReceiverContext;
use crate::packet::{Frame, Packet, SackList, SACK_UNUSED};
use crate::seq;
use crate::stats::ReceiverStats;

// ---------------------------------------------------------------------------
// SrReceiver
// ---------------------------------------------------------------------------

/// Selective-Repeat receive-side state for one transfer.
#[derive(Debug)]
pub struct SrReceiver {
    /// `LimitSeqNo`, cached from the config.
    limit: u16,

    /// Next packet expected (left window edge).
    npe: u16,

    /// Last packet acceptable (right window edge, inclusive);
    /// always `NPE + RWS − 1` in modular terms.
    lpa: u16,

    /// In-window, out-of-order payloads keyed by sequence number, waiting
    /// for the gap-filling packet.
    reorder: BTreeMap<u16, Vec<u8>>,

    stats: ReceiverStats,
}

impl SrReceiver {
    /// # Panics
    ///
    /// Panics if `cfg.window_size` is zero or too large for the doubled
    /// sequence space to fit in a `u16`.
    pub fn new(cfg: &ProtocolConfig) -> Self {
        assert!(cfg.window_size >= 1, "window size must be at least 1");
        assert!(
            cfg.window_size <= u16::MAX / 2,
            "window size must leave room for a doubled sequence space"
        );
        Self {
            limit: cfg.limit_seq_no(),
            npe: 0,
            lpa: cfg.window_size - 1,
            reorder: BTreeMap::new(),
            stats: ReceiverStats::default(),
        }
    }

    pub fn npe(&self) -> u16 {
        self.npe
    }

    pub fn lpa(&self) -> u16 {
        self.lpa
    }

    /// Number of out-of-order packets currently buffered.
    pub fn reorder_len(&self) -> usize {
        self.reorder.len()
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    // -----------------------------------------------------------------------
    // Entry point
    // -----------------------------------------------------------------------

    /// Process one inbound packet from the channel.
    pub fn on_packet(&mut self, ctx: &mut dyn ReceiverContext, packet: &Packet) {
        self.stats.packets_received += 1;

        if !packet.verify() {
            // Silent drop: no ack, the sender's timeout covers recovery.
            self.stats.corrupted += 1;
            log::debug!("[rcvr] dropping corrupted packet");
            return;
        }
        let Frame::Data { seq, payload } = packet.frame() else {
            log::warn!("[rcvr] ignoring ack frame addressed to the receiver");
            return;
        };
        let seq = *seq;

        if !seq::in_window(self.npe, self.lpa, seq) {
            // Already delivered in an earlier window position (or wildly
            // out of range).  Repeat the boundary so the sender learns the
            // window has moved past it.
            log::debug!("[rcvr] seq={seq} outside [{}, {}]", self.npe, self.lpa);
            self.send_ack(ctx, seq::prev(self.npe, self.limit));
            return;
        }

        if seq == self.npe {
            // In order: deliver, then drain the reorder buffer while it
            // keeps filling the gap.  One cumulative ack for the whole run.
            ctx.deliver(payload.clone());
            self.stats.delivered += 1;
            let mut last_delivered = seq;
            self.advance();
            while let Some(parked) = self.reorder.remove(&self.npe) {
                ctx.deliver(parked);
                self.stats.delivered += 1;
                last_delivered = self.npe;
                self.advance();
            }
            log::debug!(
                "[rcvr] delivered through seq={last_delivered}, NPE now {}",
                self.npe
            );
            self.send_ack(ctx, last_delivered);
        } else {
            // In-window but a gap remains: park it (idempotently) and repeat
            // the boundary ack.
            self.reorder.entry(seq).or_insert_with(|| payload.clone());
            log::debug!(
                "[rcvr] seq={seq} out of order, {} parked, expecting {}",
                self.reorder.len(),
                self.npe
            );
            self.send_ack(ctx, seq::prev(self.npe, self.limit));
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Slide the window forward by one sequence number.
    fn advance(&mut self) {
        self.npe = seq::next(self.npe, self.limit);
        self.lpa = seq::next(self.lpa, self.limit);
    }

    /// Send an ack carrying `cumulative` plus the selective-ack list of
    /// everything still parked in the reorder buffer.
    fn send_ack(&mut self, ctx: &mut dyn ReceiverContext, cumulative: u16) {
        let mut sack: SackList = [SACK_UNUSED; crate::packet::SACK_SLOTS];
        for (slot, parked_seq) in sack.iter_mut().zip(self.reorder.keys()) {
            *slot = *parked_seq;
        }
        self.stats.acks_sent += 1;
        ctx.to_channel(Packet::ack_with_sack(cumulative, sack));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
