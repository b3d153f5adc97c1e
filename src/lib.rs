//! `sr-arq` — a Selective-Repeat ARQ sender/receiver pair over a simulated
//! unreliable channel.
//!
//! # Architecture
//!
//! ```text
//!              submit()                        deliver()
//!  upper layer ───────┐                    ┌──────────▶ upper layer
//!                     │                    │
//!                ┌────▼─────┐   data   ┌───┴──────┐
//!                │ SrSender │─────────▶│SrReceiver│
//!                └────▲─────┘          └─────┬────┘
//!                     │        acks         │
//!                     └──────────────────────┘
//!                     │                    │
//!                ┌────▼────────────────────▼────┐
//!                │          Simulator           │
//!                │ (clock, event queue, faulty  │
//!                │  channel, sender timer)      │
//!                └──────────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format (tagged data/ack frames, additive checksum)
//! - [`seq`]       — modular sequence-number arithmetic
//! - [`config`]    — shared protocol parameters
//! - [`context`]   — collaborator traits injected into the state machines
//! - [`sender`]    — Selective-Repeat outbound window state machine
//! - [`receiver`]  — Selective-Repeat inbound reorder/reassembly machine
//! - [`stats`]     — passive transfer counters
//! - [`simulator`] — discrete-event harness with loss/corruption/delay

pub mod config;
pub mod context;
pub mod packet;
pub mod receiver;
pub mod seq;
pub mod sender;
pub mod simulator;
pub mod stats;
