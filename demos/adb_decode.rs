//! Example: ADB decoding of a synthesized capture
//!
//! Synthesizes the edge stream of one or more ADB command frames (attention
//! pulse, start bit, command byte, stop bit), decodes it through the
//! streaming pipeline and prints the resulting annotations.
//!
//! Usage:
//!   cargo run --release --example adb_decode -- --command 0x3C --command 0x2D
//!
//! With per-bit detail:
//!   RUST_LOG=debug cargo run --release --example adb_decode -- --command 0x3C

use adb_decode::nodes::decoders::{Annotation, AnnotationRow};
use adb_decode::runtime::{Edge, InputPort, OutputPort, Pipeline, ProcessNode, WorkError, WorkResult};
use adb_decode::{AdbDecoder, EdgeListSource};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Command bytes to synthesize, one frame each (hex with 0x or decimal)
    #[arg(short, long, value_parser = parse_byte, default_values = ["0x3C"])]
    command: Vec<u8>,

    /// Sample rate of the synthesized capture in Hz
    #[arg(short, long, default_value_t = 1_000_000.0)]
    samplerate: f64,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte '{}': {}", s, e))
}

/// Sink that prints annotations, one line per interval
struct AnnotationPrinter {
    count: usize,
}

impl ProcessNode for AnnotationPrinter {
    fn name(&self) -> &str {
        "annotation_printer"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        0 // Sink
    }

    fn input_schema(&self) -> Vec<adb_decode::PortSchema> {
        use adb_decode::{PortDirection, PortSchema};
        vec![PortSchema::new::<Annotation>(
            "annotations",
            0,
            PortDirection::Input,
        )]
    }

    fn work(&mut self, inputs: &[InputPort], _outputs: &[OutputPort]) -> WorkResult<usize> {
        let mut input_buffer = std::collections::VecDeque::new();
        let mut input = inputs
            .first()
            .and_then(|port| port.get::<Annotation>(&mut input_buffer))
            .ok_or_else(|| WorkError::NodeError("Missing input channel".to_string()))?;

        let ann = input.recv()?;
        self.count += 1;

        let line = format!(
            "#{:<4} [{:>7}..{:>7}] {:?}: {}",
            self.count,
            ann.start_sample,
            ann.end_sample,
            ann.kind,
            ann.labels.first().map(String::as_str).unwrap_or("")
        );
        match ann.kind.row() {
            AnnotationRow::Cells => debug!("{}", line),
            AnnotationRow::Bits => debug!("{}", line),
            AnnotationRow::Bytes => info!("{}", line),
        }

        Ok(1)
    }
}

/// Append the edges of one command frame starting at sample `t`, returning
/// the sample index where the line goes idle. Timings in microseconds,
/// scaled to the sample rate.
fn synthesize_frame(edges: &mut Vec<Edge>, t: u64, command: u8, samples_per_us: u64) -> u64 {
    let mut t = t;
    let mut cell = |edges: &mut Vec<Edge>, low_us: u64, high_us: u64| {
        edges.push(Edge::falling(t));
        t += low_us * samples_per_us;
        edges.push(Edge::rising(t));
        t += high_us * samples_per_us;
    };

    cell(edges, 800, 65); // attention, start bit on the tail
    for i in (0..8).rev() {
        if (command >> i) & 1 == 1 {
            cell(edges, 35, 65);
        } else {
            cell(edges, 65, 35);
        }
    }
    cell(edges, 65, 500); // stop bit, then idle
    t
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("=== ADB Decode Example ===");
    info!("Sample rate: {} Hz", args.samplerate);
    info!(
        "Commands: {}",
        args.command
            .iter()
            .map(|b| format!("0x{:02X}", b))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let samples_per_us = (args.samplerate / 1_000_000.0).round() as u64;
    if samples_per_us == 0 {
        return Err("sample rate below 1 MHz leaves no room for bit-cell timing".into());
    }

    let mut edges = Vec::new();
    let mut t = 0;
    for &command in &args.command {
        t = synthesize_frame(&mut edges, t, command, samples_per_us);
        t += 1000 * samples_per_us; // inter-frame idle gap
    }
    // Closing edge so the final stop bit's high phase has a measurable end
    edges.push(Edge::falling(t));
    info!("Synthesized {} edges", edges.len());

    let mut pipeline = Pipeline::new();
    pipeline.add_process("source", EdgeListSource::new(args.samplerate, edges)?)?;
    pipeline.add_process("decoder", AdbDecoder::new(args.samplerate)?)?;
    pipeline.add_process("printer", AnnotationPrinter { count: 0 })?;

    pipeline.connect("source", "edges", "decoder", "data")?;
    pipeline.connect("decoder", "annotations", "printer", "annotations")?;

    let scheduler = pipeline.build()?;
    scheduler.wait();

    info!("Done!");

    Ok(())
}
