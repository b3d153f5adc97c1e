//! Entry point for `sr-arq`.
//!
//! Parses CLI arguments, runs one simulated transfer, and prints the
//! statistics block.  All protocol work lives in the library; `main.rs`
//! owns only process setup (logging, argument parsing) and reporting.

use clap::Parser;

use sr_arq::config::ProtocolConfig;
use sr_arq::simulator::{ChannelConfig, SimulationReport, Simulator, SimulatorConfig};

/// Selective-Repeat ARQ transfer over a simulated lossy channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Number of messages to transfer.
    #[arg(short = 'n', long, default_value_t = 20)]
    messages: u32,

    /// Packet loss probability, 0.0 to 1.0.
    #[arg(short, long, default_value_t = 0.0)]
    loss: f64,

    /// Packet corruption probability, 0.0 to 1.0.
    #[arg(short, long, default_value_t = 0.0)]
    corrupt: f64,

    /// Window size (sequence space is twice this).
    #[arg(short, long, default_value_t = 8,
          value_parser = clap::value_parser!(u16).range(1..=(u16::MAX as i64) / 2))]
    window: u16,

    /// Retransmission timeout, in simulated time units.
    #[arg(short, long, default_value_t = 30.0)]
    timeout: f64,

    /// Average one-way channel delay.
    #[arg(short, long, default_value_t = 5.0)]
    delay: f64,

    /// Average gap between message submissions.
    #[arg(short, long, default_value_t = 20.0)]
    interval: f64,

    /// RNG seed; rerun with the same seed to replay a run exactly.
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

fn main() {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    let cfg = SimulatorConfig {
        num_messages: cli.messages,
        msg_interval: cli.interval,
        seed: cli.seed,
        channel: ChannelConfig {
            loss_rate: cli.loss,
            corrupt_rate: cli.corrupt,
            avg_delay: cli.delay,
        },
        protocol: ProtocolConfig {
            window_size: cli.window,
            rxmt_interval: cli.timeout,
            ..Default::default()
        },
    };

    log::info!(
        "starting transfer: {} messages, loss {:.2}, corrupt {:.2}, window {}",
        cli.messages,
        cli.loss,
        cli.corrupt,
        cli.window
    );

    let report = Simulator::new(cfg).run();
    print_report(&report);
}

fn print_report(report: &SimulationReport) {
    let s = &report.sender;
    let r = &report.receiver;

    // Ratios are derived here rather than tracked by the state machines.
    let total_sent = s.packets_sent + s.retransmissions + r.acks_sent;
    let lost_ratio = ratio(report.lost_in_channel, total_sent);
    let corrupt_ratio = ratio(
        report.corrupted_in_channel,
        total_sent - report.lost_in_channel,
    );

    println!("===============  Simulation statistics  ===============");
    println!("Messages submitted:          {}", report.submitted.len());
    println!("Messages dropped (buffer):   {}", s.messages_dropped);
    println!("Original data packets sent:  {}", s.packets_sent);
    println!("Retransmissions:             {}", s.retransmissions);
    println!("Acks sent by receiver:       {}", r.acks_sent);
    println!("Payloads delivered upward:   {}", r.delivered);
    println!("Corrupted at sender:         {}", s.corrupted);
    println!("Corrupted at receiver:       {}", r.corrupted);
    println!("Lost in channel:             {}", report.lost_in_channel);
    println!("Observed loss ratio:         {lost_ratio:.3}");
    println!("Observed corruption ratio:   {corrupt_ratio:.3}");
    if s.rtt_samples > 0 {
        println!(
            "Average RTT:                 {:.2}",
            s.total_rtt / s.rtt_samples as f64
        );
    }
    if s.comm_samples > 0 {
        println!(
            "Average communication time:  {:.2}",
            s.total_comm_time / s.comm_samples as f64
        );
    }
    println!("Simulated time elapsed:      {:.1}", report.elapsed);
    println!("Events processed:            {}", report.events_processed);
    println!("=======================================================");
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
