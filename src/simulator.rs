//! Discrete-event network simulator for exercising the protocol.
//!
//! Real channels drop, corrupt, reorder, and delay packets.  To exercise the
//! reliability mechanisms deterministically, this module drives one
//! [`SrSender`]/[`SrReceiver`] pair through a simulated clock and an
//! unreliable channel with a configurable fault model:
//!
//! | Fault       | Description                                            |
//! |-------------|--------------------------------------------------------|
//! | Packet loss | Drop a packet with probability `loss_rate`.            |
//! | Corruption  | Flip one bit inside a field with prob. `corrupt_rate`. |
//! | Delay       | Uniform random transit delay in `[0, 2 × avg_delay)`.  |
//! | Reordering  | Falls out of independent random delays.                |
//!
//! All randomness comes from a single seeded RNG, so any failing run can be
//! replayed exactly from its seed.
//!
//! Events (message submissions, packet arrivals, timer expiries) are
//! processed one at a time in simulated-time order; each handler runs to
//! completion before the next event fires, so the state machines need no
//! internal synchronisation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ProtocolConfig;
use crate::context::{ReceiverContext, SenderContext};
use crate::packet::{Frame, Packet};
use crate::receiver::SrReceiver;
use crate::sender::SrSender;
use crate::stats::{ReceiverStats, SenderStats};

/// Hard cap on processed events, so a pathological configuration cannot
/// spin forever.
const MAX_EVENTS: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Fault model for the unreliable channel.
///
/// All probabilities are in `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Probability that any given packet is silently dropped.
    pub loss_rate: f64,
    /// Probability that a packet has one bit flipped in transit.
    pub corrupt_rate: f64,
    /// Mean transit delay; actual delays are uniform in `[0, 2 × avg)`.
    pub avg_delay: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        // No faults by default — the channel is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            avg_delay: 5.0,
        }
    }
}

/// Full configuration for one simulated transfer.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of upper-layer messages to generate.
    pub num_messages: u32,
    /// Mean gap between message submissions (uniform in `[0, 2 × mean)`).
    pub msg_interval: f64,
    /// RNG seed; identical seeds replay identical runs.
    pub seed: u64,
    pub channel: ChannelConfig,
    pub protocol: ProtocolConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_messages: 20,
            msg_interval: 20.0,
            seed: 0,
            channel: ChannelConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

/// The two protocol entities, used to address packet arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Sender,
    Receiver,
}

#[derive(Debug)]
enum EventKind {
    /// The upper layer hands the sender its next message.
    UpperLayerSubmit,
    /// A packet finishes transit and arrives at `at`.
    Arrival { at: Entity, packet: Packet },
    /// The sender's retransmission timer expires.  Stale generations are
    /// ignored — restarting the timer bumps the generation instead of
    /// deleting the queued event.
    SenderTimer { generation: u64 },
}

#[derive(Debug)]
struct Event {
    time: f64,
    /// Insertion counter breaking ties between same-time events, keeping
    /// runs deterministic.
    order: u64,
    kind: EventKind,
}

impl PartialEq for Event {
    // Must agree with `Ord`: equality is the full (time, order) key.
    fn eq(&self, other: &Self) -> bool {
        self.time.total_cmp(&other.time).is_eq() && self.order == other.order
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest event.
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

// ---------------------------------------------------------------------------
// World — the collaborator half of the simulation
// ---------------------------------------------------------------------------

/// Everything the state machines reach through their contexts: the clock,
/// the event queue, the faulty channel, the sender timer, and the upper
/// layer's delivery sink.  Kept apart from the state machines themselves so
/// a handler can borrow the world mutably while it runs.
struct World {
    clock: f64,
    events: BinaryHeap<Event>,
    next_order: u64,
    rng: StdRng,
    channel: ChannelConfig,
    /// Where packets handed to the channel are headed; set before each
    /// handler invocation.
    dest: Entity,
    timer_generation: u64,
    timer_armed: bool,
    delivered: Vec<Vec<u8>>,
    lost_in_channel: u64,
    corrupted_in_channel: u64,
}

impl World {
    fn schedule_in(&mut self, gap: f64, kind: EventKind) {
        let event = Event {
            time: self.clock + gap,
            order: self.next_order,
            kind,
        };
        self.next_order += 1;
        self.events.push(event);
    }

    /// Pass a packet through the fault model and schedule its arrival.
    fn transmit(&mut self, packet: Packet) {
        if self.rng.gen::<f64>() < self.channel.loss_rate {
            self.lost_in_channel += 1;
            log::debug!("[sim] channel dropped a packet bound for {:?}", self.dest);
            return;
        }

        let is_data = matches!(packet.frame(), Frame::Data { .. });
        let mut bytes = packet.encode();
        if self.rng.gen::<f64>() < self.channel.corrupt_rate {
            corrupt_one_bit(&mut bytes, is_data, &mut self.rng);
            self.corrupted_in_channel += 1;
        }

        let delay = self.channel.avg_delay * 2.0 * self.rng.gen::<f64>();
        match Packet::decode(&bytes) {
            Ok(packet) => {
                let at = self.dest;
                self.schedule_in(delay, EventKind::Arrival { at, packet });
            }
            Err(e) => {
                // Single-bit field flips never break the framing, but a
                // packet that somehow did become unparseable is just lost.
                log::warn!("[sim] corrupted packet became unparseable: {e}");
                self.lost_in_channel += 1;
            }
        }
    }
}

impl SenderContext for World {
    fn start_timer(&mut self, interval: f64) {
        self.timer_generation += 1;
        self.timer_armed = true;
        let generation = self.timer_generation;
        self.schedule_in(interval, EventKind::SenderTimer { generation });
    }

    fn stop_timer(&mut self) {
        self.timer_generation += 1;
        self.timer_armed = false;
    }

    fn to_channel(&mut self, packet: Packet) {
        self.transmit(packet);
    }

    fn now(&self) -> f64 {
        self.clock
    }
}

impl ReceiverContext for World {
    fn to_channel(&mut self, packet: Packet) {
        self.transmit(packet);
    }

    fn deliver(&mut self, payload: Vec<u8>) {
        self.delivered.push(payload);
    }
}

/// Flip one bit inside a non-structural field.
///
/// For data frames the kind byte and the payload-length field stay intact
/// (offsets 0, 3, 4) so decoding still succeeds; corruption lands in the
/// sequence number, checksum, or payload.  Ack frames have no length field,
/// so any byte past the kind is fair game.
fn corrupt_one_bit(bytes: &mut [u8], is_data: bool, rng: &mut StdRng) {
    let idx = loop {
        let i = rng.gen_range(1..bytes.len());
        if is_data && (i == 3 || i == 4) {
            continue;
        }
        break i;
    };
    bytes[idx] ^= 1 << rng.gen_range(0..8u8);
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Read-only snapshot produced when a simulation finishes.
#[derive(Debug)]
pub struct SimulationReport {
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    /// Every message handed to the sender, in submission order (including
    /// any the sender rejected for buffer exhaustion).
    pub submitted: Vec<Vec<u8>>,
    /// Every payload the receiver delivered upward, in delivery order.
    pub delivered: Vec<Vec<u8>>,
    pub lost_in_channel: u64,
    pub corrupted_in_channel: u64,
    /// Simulated time when the last event was processed.
    pub elapsed: f64,
    pub events_processed: u64,
}

/// One sender/receiver pair plus the event loop driving them.
pub struct Simulator {
    cfg: SimulatorConfig,
    sender: SrSender,
    receiver: SrReceiver,
    world: World,
    submitted: Vec<Vec<u8>>,
    msgs_submitted: u32,
}

impl Simulator {
    pub fn new(cfg: SimulatorConfig) -> Self {
        let sender = SrSender::new(cfg.protocol.clone());
        let receiver = SrReceiver::new(&cfg.protocol);
        let world = World {
            clock: 0.0,
            events: BinaryHeap::new(),
            next_order: 0,
            rng: StdRng::seed_from_u64(cfg.seed),
            channel: cfg.channel.clone(),
            dest: Entity::Receiver,
            timer_generation: 0,
            timer_armed: false,
            delivered: Vec::new(),
            lost_in_channel: 0,
            corrupted_in_channel: 0,
        };
        Self {
            cfg,
            sender,
            receiver,
            world,
            submitted: Vec::new(),
            msgs_submitted: 0,
        }
    }

    /// Run the simulation to completion and return the statistics snapshot.
    ///
    /// The event queue drains once every submitted message has been
    /// acknowledged: the sender stops its timer on an empty buffer, and no
    /// further arrivals are in flight.
    pub fn run(mut self) -> SimulationReport {
        if self.cfg.num_messages > 0 {
            self.schedule_next_submission();
        }

        let mut processed: u64 = 0;
        while let Some(event) = self.world.events.pop() {
            processed += 1;
            if processed > MAX_EVENTS {
                log::warn!("[sim] event cap reached, aborting run");
                break;
            }
            self.world.clock = event.time;

            match event.kind {
                EventKind::UpperLayerSubmit => {
                    let payload = message_payload(self.msgs_submitted);
                    self.submitted.push(payload.clone());
                    self.msgs_submitted += 1;
                    log::debug!("[sim] t={:.1} layer5 submits message {}",
                        self.world.clock, self.msgs_submitted);

                    self.world.dest = Entity::Receiver;
                    self.sender.submit(&mut self.world, payload);

                    if self.msgs_submitted < self.cfg.num_messages {
                        self.schedule_next_submission();
                    }
                }
                EventKind::Arrival { at: Entity::Sender, packet } => {
                    self.world.dest = Entity::Receiver;
                    self.sender.on_ack(&mut self.world, &packet);
                }
                EventKind::Arrival { at: Entity::Receiver, packet } => {
                    self.world.dest = Entity::Sender;
                    self.receiver.on_packet(&mut self.world, &packet);
                }
                EventKind::SenderTimer { generation } => {
                    if self.world.timer_armed && generation == self.world.timer_generation {
                        self.world.dest = Entity::Receiver;
                        self.sender.on_timer(&mut self.world);
                    }
                }
            }

            debug_assert!(
                self.sender.in_flight() <= self.cfg.protocol.window_size,
                "sender window bound violated"
            );
        }

        SimulationReport {
            sender: *self.sender.stats(),
            receiver: *self.receiver.stats(),
            submitted: self.submitted,
            delivered: self.world.delivered,
            lost_in_channel: self.world.lost_in_channel,
            corrupted_in_channel: self.world.corrupted_in_channel,
            elapsed: self.world.clock,
            events_processed: processed,
        }
    }

    fn schedule_next_submission(&mut self) {
        let gap = self.cfg.msg_interval * 2.0 * self.world.rng.gen::<f64>();
        self.world.schedule_in(gap, EventKind::UpperLayerSubmit);
    }
}

/// Deterministic, distinct payload for the n-th generated message.
fn message_payload(n: u32) -> Vec<u8> {
    format!("msg-{n:05}").into_bytes()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
