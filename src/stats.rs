//! Passive transfer counters.
//!
//! Both state machines feed raw counters as they run; the simulator snapshots
//! them when the run completes.  Only raw values live here — derived ratios
//! (loss rate, corruption rate, average RTT) are a reporting concern and are
//! computed by whoever prints the report.

/// Counters maintained by the sender-side state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SenderStats {
    /// Data packets transmitted for the first time.
    pub packets_sent: u64,
    /// Retransmissions (timeout or duplicate-ack triggered).
    pub retransmissions: u64,
    /// Acks that passed checksum verification.
    pub acks_received: u64,
    /// Inbound packets dropped for a checksum mismatch.
    pub corrupted: u64,
    /// Upper-layer messages rejected because the send buffer was full.
    pub messages_dropped: u64,
    /// Sum of (ack time − send time) over cumulatively acknowledged packets,
    /// one sample per new cumulative ack.
    pub total_rtt: f64,
    /// Number of samples accumulated in `total_rtt`.
    pub rtt_samples: u64,
    /// Sum of (ack time − send time) over every retired sequence number.
    pub total_comm_time: f64,
    /// Number of samples accumulated in `total_comm_time`.
    pub comm_samples: u64,
}

/// Counters maintained by the receiver-side state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverStats {
    /// Packets that arrived from the channel (whatever their fate).
    pub packets_received: u64,
    /// Payloads delivered to the upper layer.
    pub delivered: u64,
    /// Ack packets handed to the channel.
    pub acks_sent: u64,
    /// Inbound packets dropped for a checksum mismatch.
    pub corrupted: u64,
}
