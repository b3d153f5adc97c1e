//! Protocol configuration shared by both state machines.
//!
//! The sender and receiver must agree on the window size, because the
//! sequence-number space is sized from it: `LimitSeqNo = 2 × WindowSize`.
//! Selective Repeat requires that the send and receive windows together
//! never cover more than half the sequence space, otherwise a retransmitted
//! old packet and a new packet could carry the same sequence number and the
//! receiver could not tell them apart.

/// Tunable parameters for one sender/receiver pair.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Window size N, shared by the send window (SWS) and receive window
    /// (RWS).
    pub window_size: u16,

    /// Maximum number of unacknowledged messages the sender buffers.
    ///
    /// Submissions past this limit are dropped and counted — backpressure,
    /// not an error.
    pub sender_buffer_size: usize,

    /// Retransmission timeout, in simulated time units.
    pub rxmt_interval: f64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            sender_buffer_size: 50,
            rxmt_interval: 30.0,
        }
    }
}

impl ProtocolConfig {
    /// Sequence numbers live in `[0, limit_seq_no())` and wrap.
    pub fn limit_seq_no(&self) -> u16 {
        self.window_size * 2
    }
}
