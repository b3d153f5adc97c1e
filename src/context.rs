//! Collaborator interfaces injected into the state machines.
//!
//! The protocol core never owns a clock, a timer, or a channel — the
//! surrounding simulator does.  Each entry point on [`crate::sender::SrSender`]
//! and [`crate::receiver::SrReceiver`] takes a context through which the
//! state machine issues its side effects: handing packets to the unreliable
//! channel, arming the retransmission timer, delivering reassembled payloads
//! upward, and reading simulated time.
//!
//! Keeping these as traits (rather than ambient globals) means the unit
//! tests can substitute a recording context and assert on exactly which
//! side effects a handler produced.

use crate::packet::Packet;

/// Side effects available to the sender-side state machine.
pub trait SenderContext {
    /// Arm the single entity-wide retransmission timer to fire after
    /// `interval` simulated time units.  Only one timer exists; callers
    /// stop it before re-arming.
    fn start_timer(&mut self, interval: f64);

    /// Cancel the retransmission timer if it is running.
    fn stop_timer(&mut self);

    /// Hand a packet to the unreliable channel for eventual delivery to the
    /// peer.  The channel may lose, corrupt, reorder, or delay it.
    fn to_channel(&mut self, packet: Packet);

    /// Current simulated time, used for RTT and communication-time
    /// accounting only.
    fn now(&self) -> f64;
}

/// Side effects available to the receiver-side state machine.
pub trait ReceiverContext {
    /// Hand an ack packet to the unreliable channel, bound for the sender.
    fn to_channel(&mut self, packet: Packet);

    /// Pass a fully reassembled, in-order payload to the upper layer.
    fn deliver(&mut self, payload: Vec<u8>);
}
