//! Selective-Repeat send-side state machine.
//!
//! [`SrSender`] maintains a sliding window of up to `WindowSize` in-flight
//! packets over the wrapping sequence space, plus a bounded backlog of
//! submitted-but-not-yet-sent packets.
//!
//! # Protocol contract
//!
//! - At most `WindowSize` packets may be in flight at once.
//! - Acks are **cumulative**: `cumulative = K` means the receiver has
//!   delivered every sequence number up to and including `K`.
//! - An ack repeating the current LAR boundary is a duplicate ack — an early
//!   loss signal that triggers retransmission of the oldest buffered packet
//!   without waiting for the timer.
//! - A single entity-wide retransmission timer covers the oldest outstanding
//!   packet; it is restarted on every transmission and stopped whenever the
//!   buffer drains.  Duplicate acks provide the fast retransmission path, so
//!   the coarse shared timer is only the backstop.
//!
//! This module only manages state; channel and timer side effects go through
//! the injected [`SenderContext`].
//!
//! # Sequence-number layout
//!
//! ```text
//!      LAR                LPS            next_seq
//!       │                  │                 │
//!  ─────┼──────────────────┼─────────────────┼───▶ seq space (mod LimitSeqNo)
//!       │ ◀── in flight ──▶│ ◀── backlog ──▶ │
//! ```

use std::collections::{HashMap, VecDeque};

use crate::config::ProtocolConfig;
use crate::context::SenderContext;
use crate::packet::{Frame, Packet};
use crate::seq;
use crate::stats::SenderStats;

// ---------------------------------------------------------------------------
// SendEntry
// ---------------------------------------------------------------------------

/// A buffered, not-yet-fully-acknowledged data packet.
#[derive(Debug, Clone)]
struct SendEntry {
    seq: u16,
    packet: Packet,
}

// ---------------------------------------------------------------------------
// SrSender
// ---------------------------------------------------------------------------

/// Selective-Repeat send-side state for one transfer.
#[derive(Debug)]
pub struct SrSender {
    cfg: ProtocolConfig,

    /// `LimitSeqNo`, cached from the config.
    limit: u16,

    /// Last acknowledged sequence number (left window edge, inclusive).
    lar: u16,

    /// Last packet sent (right edge of the in-flight range).
    lps: u16,

    /// Sequence number to assign to the next submitted message.
    next_seq: u16,

    /// Unacknowledged packets ordered by sequence number, front = oldest.
    /// Holds both in-flight packets and the unsent backlog.
    buffer: VecDeque<SendEntry>,

    /// Send timestamp per in-flight sequence number, for RTT accounting.
    send_time: HashMap<u16, f64>,

    stats: SenderStats,
}

impl SrSender {
    /// # Panics
    ///
    /// Panics if `cfg.window_size` is zero or too large for the doubled
    /// sequence space to fit in a `u16`.
    pub fn new(cfg: ProtocolConfig) -> Self {
        assert!(cfg.window_size >= 1, "window size must be at least 1");
        assert!(
            cfg.window_size <= u16::MAX / 2,
            "window size must leave room for a doubled sequence space"
        );
        let limit = cfg.limit_seq_no();
        // LAR and LPS start one step "before" the first sequence number,
        // which in modular space is limit − 1.
        Self {
            limit,
            lar: limit - 1,
            lps: limit - 1,
            next_seq: 0,
            buffer: VecDeque::with_capacity(cfg.sender_buffer_size),
            send_time: HashMap::new(),
            stats: SenderStats::default(),
            cfg,
        }
    }

    /// Number of packets sent but not yet acknowledged.
    pub fn in_flight(&self) -> u16 {
        seq::fwd_distance(self.lar, self.lps, self.limit)
    }

    /// Number of packets awaiting acknowledgment, sent or not.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn lar(&self) -> u16 {
        self.lar
    }

    pub fn lps(&self) -> u16 {
        self.lps
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Accept a new message from the upper layer.
    ///
    /// A full buffer drops the message and counts it — deliberate
    /// backpressure, not an error.  Otherwise the message gets the next
    /// sequence number and is transmitted immediately when the window has
    /// room, or parked in the backlog until an ack slides the window.
    pub fn submit(&mut self, ctx: &mut dyn SenderContext, payload: Vec<u8>) {
        if self.buffer.len() >= self.cfg.sender_buffer_size {
            self.stats.messages_dropped += 1;
            log::debug!(
                "[sndr] buffer full ({}), dropping message",
                self.cfg.sender_buffer_size
            );
            return;
        }

        let seq = self.next_seq;
        self.next_seq = seq::next(seq, self.limit);
        self.buffer.push_back(SendEntry {
            seq,
            packet: Packet::data(seq, payload),
        });

        // Whenever the window has room the backlog is empty, so the packet
        // just appended is the next one to go out.
        if self.in_flight() < self.cfg.window_size {
            self.first_transmit(ctx, self.buffer.len() - 1);
        } else {
            log::debug!("[sndr] window full, seq={seq} queued");
        }
    }

    /// Process an inbound packet from the channel (expected to be an ack).
    pub fn on_ack(&mut self, ctx: &mut dyn SenderContext, packet: &Packet) {
        if !packet.verify() {
            self.stats.corrupted += 1;
            log::debug!("[sndr] dropping corrupted packet");
            return;
        }
        let Frame::Ack { cumulative: ack, .. } = *packet.frame() else {
            log::warn!("[sndr] ignoring data frame addressed to the sender");
            return;
        };
        self.stats.acks_received += 1;

        if ack == self.lar {
            // Duplicate ack: the receiver is still waiting for the oldest
            // outstanding packet.  Retransmit it now instead of waiting for
            // the timer.
            let Some(entry) = self.buffer.front() else {
                return;
            };
            log::debug!("[sndr] duplicate ack={ack}, fast retransmit seq={}", entry.seq);
            let pkt = entry.packet.clone();
            self.stats.retransmissions += 1;
            self.transmit(ctx, pkt);
            return;
        }

        let diff = seq::fwd_distance(self.lar, ack, self.limit);
        if diff > self.in_flight() {
            // A reordered ack from before the window last slid; everything
            // it covers is already retired.
            log::debug!("[sndr] stale ack={ack} outside (LAR, LPS], ignored");
            return;
        }

        // Retire sequence numbers (LAR, ack] and account their times.
        let now = ctx.now();
        if let Some(&sent_at) = self.send_time.get(&ack) {
            self.stats.total_rtt += now - sent_at;
            self.stats.rtt_samples += 1;
        }
        let mut retired = self.lar;
        for _ in 0..diff {
            retired = seq::next(retired, self.limit);
            if let Some(sent_at) = self.send_time.remove(&retired) {
                self.stats.total_comm_time += now - sent_at;
                self.stats.comm_samples += 1;
            }
        }
        self.lar = ack;
        self.buffer.drain(..diff as usize);
        log::debug!("[sndr] ack={ack} retired {diff} packet(s), {} buffered", self.buffer.len());

        if self.buffer.is_empty() {
            // Nothing outstanding left to time.
            ctx.stop_timer();
            return;
        }

        // The window slid by `diff`: transmit that many backlog packets,
        // starting just past the one carrying LPS.  When every in-flight
        // packet was retired no entry carries LPS and the backlog starts at
        // the front.
        let start = self
            .buffer
            .iter()
            .position(|e| e.seq == self.lps)
            .map(|i| i + 1)
            .unwrap_or(0);
        let end = self.buffer.len().min(start + diff as usize);
        for idx in start..end {
            self.first_transmit(ctx, idx);
        }
    }

    /// Retransmission timeout: resend the oldest buffered packet.
    ///
    /// The stop-on-empty rule in [`Self::on_ack`] guarantees the timer never
    /// fires with an empty buffer; the guard here keeps a spurious expiry
    /// harmless anyway.
    pub fn on_timer(&mut self, ctx: &mut dyn SenderContext) {
        let Some(entry) = self.buffer.front() else {
            log::warn!("[sndr] timer fired with nothing outstanding");
            return;
        };
        log::debug!("[sndr] timeout, retransmitting seq={}", entry.seq);
        let pkt = entry.packet.clone();
        self.stats.retransmissions += 1;
        self.transmit(ctx, pkt);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Hand a packet to the channel and restart the shared timer.
    ///
    /// The timer is stopped first — only one timer may run at a time.
    fn transmit(&mut self, ctx: &mut dyn SenderContext, packet: Packet) {
        ctx.stop_timer();
        ctx.to_channel(packet);
        ctx.start_timer(self.cfg.rxmt_interval);
    }

    /// Transmit the buffered packet at `index` for the first time: record
    /// its send timestamp, advance LPS, and count it as an original send.
    fn first_transmit(&mut self, ctx: &mut dyn SenderContext, index: usize) {
        let entry = self.buffer[index].clone();
        debug_assert_eq!(
            entry.seq,
            seq::next(self.lps, self.limit),
            "first transmissions must follow sequence order"
        );
        self.send_time.insert(entry.seq, ctx.now());
        self.lps = entry.seq;
        self.stats.packets_sent += 1;
        log::debug!("[sndr] → DATA seq={} in_flight={}", entry.seq, self.in_flight());
        self.transmit(ctx, entry.packet);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
