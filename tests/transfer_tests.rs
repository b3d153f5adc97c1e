//! End-to-end transfer scenarios.
//!
//! The first group drives an [`SrSender`]/[`SrReceiver`] pair by hand
//! through recording contexts, so each test controls exactly which packets
//! cross the channel and in what order.  The second group runs the full
//! discrete-event [`Simulator`] against adversarial fault rates and checks
//! the exactly-once, in-order delivery contract survives.

use sr_arq::config::ProtocolConfig;
use sr_arq::context::{ReceiverContext, SenderContext};
use sr_arq::packet::{Frame, Packet};
use sr_arq::receiver::SrReceiver;
use sr_arq::sender::SrSender;
use sr_arq::simulator::{ChannelConfig, Simulator, SimulatorConfig};

// ---------------------------------------------------------------------------
// Manual-channel harness
// ---------------------------------------------------------------------------

/// Sender-side recording context: queues outbound data packets instead of
/// delivering them, so the test decides which copies reach the receiver.
struct SenderSide {
    outbound: Vec<Packet>,
    timer_running: bool,
    clock: f64,
}

impl SenderSide {
    fn new() -> Self {
        Self {
            outbound: Vec::new(),
            timer_running: false,
            clock: 0.0,
        }
    }

    fn take_outbound(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.outbound)
    }
}

impl SenderContext for SenderSide {
    fn start_timer(&mut self, _interval: f64) {
        assert!(!self.timer_running, "timer started while already running");
        self.timer_running = true;
    }

    fn stop_timer(&mut self) {
        self.timer_running = false;
    }

    fn to_channel(&mut self, packet: Packet) {
        self.outbound.push(packet);
    }

    fn now(&self) -> f64 {
        self.clock
    }
}

/// Receiver-side recording context: queues outbound acks and collects
/// delivered payloads.
struct ReceiverSide {
    outbound: Vec<Packet>,
    delivered: Vec<Vec<u8>>,
}

impl ReceiverSide {
    fn new() -> Self {
        Self {
            outbound: Vec::new(),
            delivered: Vec::new(),
        }
    }

    fn take_outbound(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.outbound)
    }
}

impl ReceiverContext for ReceiverSide {
    fn to_channel(&mut self, packet: Packet) {
        self.outbound.push(packet);
    }

    fn deliver(&mut self, payload: Vec<u8>) {
        self.delivered.push(payload);
    }
}

fn cumulative_of(packet: &Packet) -> u16 {
    match packet.frame() {
        Frame::Ack { cumulative, .. } => *cumulative,
        other => panic!("expected ack frame, got {other:?}"),
    }
}

/// Re-encode a data packet with one payload bit flipped, as the channel
/// would corrupt it in transit.
fn corrupt(packet: &Packet) -> Packet {
    let mut bytes = packet.encode();
    *bytes.last_mut().unwrap() ^= 0x04;
    Packet::decode(&bytes).expect("framing must survive a payload bit flip")
}

fn cfg(window: u16, buffer: usize) -> ProtocolConfig {
    ProtocolConfig {
        window_size: window,
        sender_buffer_size: buffer,
        rxmt_interval: 30.0,
    }
}

// ---------------------------------------------------------------------------
// Scenario: clean pipelined transfer
// ---------------------------------------------------------------------------

#[test]
fn clean_transfer_delivers_in_order_without_retransmission() {
    let mut sender = SrSender::new(cfg(4, 16));
    let mut receiver = SrReceiver::new(&cfg(4, 16));
    let mut s = SenderSide::new();
    let mut r = ReceiverSide::new();

    let messages: Vec<Vec<u8>> = (0..3).map(|i| format!("msg-{i}").into_bytes()).collect();
    for m in &messages {
        sender.submit(&mut s, m.clone());
    }

    for pkt in s.take_outbound() {
        receiver.on_packet(&mut r, &pkt);
    }
    for ack in r.take_outbound() {
        sender.on_ack(&mut s, &ack);
    }

    assert_eq!(r.delivered, messages);
    assert_eq!(sender.stats().retransmissions, 0);
    assert_eq!(sender.buffered(), 0);
    assert!(!s.timer_running, "timer must stop once everything is acked");
    assert_eq!(receiver.stats().delivered, 3);
}

// ---------------------------------------------------------------------------
// Scenario: single loss recovered by duplicate-ack fast retransmit
// ---------------------------------------------------------------------------

#[test]
fn lost_packet_is_recovered_by_duplicate_acks_before_the_timer() {
    let mut sender = SrSender::new(cfg(4, 16));
    let mut receiver = SrReceiver::new(&cfg(4, 16));
    let mut s = SenderSide::new();
    let mut r = ReceiverSide::new();

    for i in 0..4u8 {
        sender.submit(&mut s, vec![b'm', i]);
    }
    let sent = s.take_outbound();
    assert_eq!(sent.len(), 4);

    // seq 0 arrives; its ack slides the window to LAR = 0.
    receiver.on_packet(&mut r, &sent[0]);
    for ack in r.take_outbound() {
        sender.on_ack(&mut s, &ack);
    }
    assert_eq!(sender.lar(), 0);

    // The channel eats seq 1; seqs 2 and 3 arrive and are parked, each
    // drawing a boundary ack that repeats 0.
    receiver.on_packet(&mut r, &sent[2]);
    receiver.on_packet(&mut r, &sent[3]);
    assert_eq!(r.delivered.len(), 1, "nothing past the gap is delivered");
    let boundary_acks = r.take_outbound();
    assert_eq!(boundary_acks.len(), 2);
    assert!(boundary_acks.iter().all(|a| cumulative_of(a) == 0));

    // Each duplicate ack fast-retransmits the missing head, no timeout
    // involved.
    for ack in &boundary_acks {
        sender.on_ack(&mut s, ack);
    }
    let resent = s.take_outbound();
    assert_eq!(sender.stats().retransmissions, 2);
    assert_eq!(resent[0].data_seq(), Some(1));

    // The retransmitted copy fills the gap: 1, 2, 3 drain in one go under
    // a single cumulative ack.
    receiver.on_packet(&mut r, &resent[0]);
    let final_acks = r.take_outbound();
    assert_eq!(final_acks.len(), 1);
    assert_eq!(cumulative_of(&final_acks[0]), 3);
    assert_eq!(
        r.delivered,
        vec![
            vec![b'm', 0],
            vec![b'm', 1],
            vec![b'm', 2],
            vec![b'm', 3]
        ]
    );

    sender.on_ack(&mut s, &final_acks[0]);
    assert_eq!(sender.buffered(), 0);
    assert!(!s.timer_running);
}

// ---------------------------------------------------------------------------
// Scenario: corruption recovered by timeout
// ---------------------------------------------------------------------------

#[test]
fn corrupted_packet_is_recovered_by_timeout() {
    let mut sender = SrSender::new(cfg(4, 16));
    let mut receiver = SrReceiver::new(&cfg(4, 16));
    let mut s = SenderSide::new();
    let mut r = ReceiverSide::new();

    sender.submit(&mut s, b"fragile".to_vec());
    let sent = s.take_outbound();

    // The packet arrives garbled: silent drop, no ack, so only the timer
    // can recover.
    receiver.on_packet(&mut r, &corrupt(&sent[0]));
    assert_eq!(receiver.stats().corrupted, 1);
    assert!(r.take_outbound().is_empty(), "corruption draws no ack");
    assert!(s.timer_running);

    sender.on_timer(&mut s);
    let resent = s.take_outbound();
    assert_eq!(sender.stats().retransmissions, 1);
    assert_eq!(resent[0].data_seq(), Some(0));

    // The clean retransmission goes through.
    receiver.on_packet(&mut r, &resent[0]);
    assert_eq!(r.delivered, vec![b"fragile".to_vec()]);
    let acks = r.take_outbound();
    assert_eq!(cumulative_of(&acks[0]), 0);

    sender.on_ack(&mut s, &acks[0]);
    assert!(!s.timer_running);
    assert_eq!(sender.buffered(), 0);
}

// ---------------------------------------------------------------------------
// Scenario: send-buffer exhaustion and drain
// ---------------------------------------------------------------------------

#[test]
fn buffer_exhaustion_drops_overflow_then_recovers() {
    let mut sender = SrSender::new(cfg(2, 5));
    let mut receiver = SrReceiver::new(&cfg(2, 5));
    let mut s = SenderSide::new();
    let mut r = ReceiverSide::new();

    // Eight submissions against a five-slot buffer with no acks flowing:
    // the last three are rejected.
    for i in 0..8u8 {
        sender.submit(&mut s, vec![i]);
    }
    assert_eq!(sender.buffered(), 5);
    assert_eq!(sender.stats().messages_dropped, 3);
    assert_eq!(sender.in_flight(), 2, "window still caps transmissions");

    // Acks drain the buffer and reopen capacity for new submissions.
    for pkt in s.take_outbound() {
        receiver.on_packet(&mut r, &pkt);
    }
    for ack in r.take_outbound() {
        sender.on_ack(&mut s, &ack);
    }
    assert_eq!(sender.buffered(), 3);

    sender.submit(&mut s, vec![99]);
    assert_eq!(sender.buffered(), 4);
    assert_eq!(sender.stats().messages_dropped, 3, "no further drops");
}

// ---------------------------------------------------------------------------
// Adversarial simulator runs
// ---------------------------------------------------------------------------

/// Heavy loss and corruption across several seeds: whatever the channel
/// does, every submitted message must come out exactly once, in order.
#[test]
fn adversarial_channel_still_delivers_exactly_once_in_order() {
    for seed in [1, 7, 42, 1234, 987654] {
        let report = Simulator::new(SimulatorConfig {
            num_messages: 40,
            msg_interval: 20.0,
            seed,
            channel: ChannelConfig {
                loss_rate: 0.15,
                corrupt_rate: 0.15,
                avg_delay: 5.0,
            },
            protocol: ProtocolConfig::default(),
        })
        .run();

        assert_eq!(
            report.delivered, report.submitted,
            "seed {seed}: delivery must be exactly-once and in order"
        );
        assert_eq!(report.sender.messages_dropped, 0);
        assert!(
            report.sender.retransmissions > 0,
            "seed {seed}: a 15% loss rate must force retransmissions"
        );
    }
}

/// Loss-only channel at a window of 2, forcing constant wrap-around of the
/// four-value sequence space.
#[test]
fn tight_window_survives_loss_across_many_wraps() {
    let report = Simulator::new(SimulatorConfig {
        num_messages: 30,
        msg_interval: 15.0,
        seed: 3,
        channel: ChannelConfig {
            loss_rate: 0.2,
            corrupt_rate: 0.0,
            avg_delay: 4.0,
        },
        protocol: ProtocolConfig {
            window_size: 2,
            ..Default::default()
        },
    })
    .run();

    assert_eq!(report.delivered, report.submitted);
    assert_eq!(report.receiver.delivered, 30);
}

/// Corruption-only channel: every corrupted arrival must be counted by the
/// receiving entity and recovered without ever surfacing upward.
#[test]
fn corruption_only_channel_counts_and_recovers() {
    let report = Simulator::new(SimulatorConfig {
        num_messages: 25,
        msg_interval: 20.0,
        seed: 11,
        channel: ChannelConfig {
            loss_rate: 0.0,
            corrupt_rate: 0.25,
            avg_delay: 5.0,
        },
        protocol: ProtocolConfig::default(),
    })
    .run();

    assert_eq!(report.delivered, report.submitted);
    assert_eq!(
        report.corrupted_in_channel,
        report.sender.corrupted + report.receiver.corrupted,
        "every bit flipped in the channel is caught by a checksum"
    );
}
