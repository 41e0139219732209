//! ADB cell decoder — edge-by-edge sequential design
//!
//! Walks the data line one cell (low phase followed by high phase) at a time
//! and classifies each phase pair purely by its duration in microseconds and
//! the relative proportion of its phases.
//!
//! Flow per cell:
//!   1. Wait for the rising edge ending the low phase; classify the low as a
//!      bit-cell phase, an attention / service request pulse, or a global
//!      reset by its length
//!   2. Wait for the falling edge ending the high phase; a short cell is a
//!      data bit (the longer phase decides the value), a stretched cell is a
//!      start or stop bit depending on which phase was stretched
//!   3. Fold accepted bits MSB-first into the byte accumulator and emit a
//!      Byte annotation every eight bits
//!
//! The only state carried between cells is the cell start, the byte
//! accumulator with its start sample, and the bit-counting [`Framing`] state.
//! Malformed timing is absorbed by the classification branches (worst case an
//! unannotated interval); the decoder never fails mid-pass.

use super::types::Annotation;
use crate::runtime::Receiver;
use crate::runtime::edge::{Edge, EdgeDirection};
use crate::runtime::node::{InputPort, OutputPort, ProcessNode, WorkError, WorkResult};
use crate::{AdbError, Result};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Phase durations below this are ordinary halves of a bit cell (µs).
const BIT_PHASE_MAX_US: f64 = 100.0;
/// Low phases above this signal a bus-wide reset (µs).
const RESET_MIN_US: f64 = 1500.0;
/// Bit cells never stretch past this overall length; longer cells carry
/// framing (stop bits, post-attention start bits) (µs).
const BIT_CELL_MAX_US: f64 = 130.0;
/// Bits per assembled byte.
const BITS_PER_BYTE: u32 = 8;

/// Bit-counting state carried between cells.
///
/// `Idle` means no start bit has been accepted since the last attention,
/// service request, or ambiguous framing. `Counting(n)` counts bit cells
/// accepted since the most recent start bit; `n` keeps growing across byte
/// boundaries within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Idle,
    Counting(u32),
}

/// ADB cell decoder node
///
/// Input: data — Edge channel
/// Output: annotations — Annotation events, in non-decreasing
/// `start_sample` order within each display row
pub struct AdbDecoder {
    name: String,
    samplerate_hz: f64,

    /// Putback buffer for the data input, persisted across work() calls.
    input_buffer: VecDeque<Edge>,

    /// Falling edge that opened the cell currently being decoded.
    cell_s: Option<u64>,
    /// Byte accumulator, filled MSB-first. Only the low 8 bits survive each
    /// shift, so start-bit preambles cannot leak into a later byte.
    byte: u8,
    /// `cell_s` of the first cell of the byte being assembled.
    byte_s: u64,
    framing: Framing,

    /// Cell counter for logging.
    cells_decoded: u64,
}

impl AdbDecoder {
    /// Create a new decoder for a capture taken at `samplerate_hz` samples
    /// per second.
    ///
    /// The sample rate is required up front: without it phase durations
    /// cannot be converted to microseconds, so decoding must not start.
    pub fn new(samplerate_hz: f64) -> Result<Self> {
        if !samplerate_hz.is_finite() || samplerate_hz <= 0.0 {
            return Err(AdbError::InvalidSampleRate(samplerate_hz));
        }
        Ok(Self {
            name: "adb_decoder".to_string(),
            samplerate_hz,
            input_buffer: VecDeque::new(),
            cell_s: None,
            byte: 0,
            byte_s: 0,
            framing: Framing::Counting(0),
            cells_decoded: 0,
        })
    }

    /// With custom name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The sample rate this decoder converts durations with
    pub fn samplerate_hz(&self) -> f64 {
        self.samplerate_hz
    }

    /// Consume edges until one in the requested direction arrives; returns
    /// its sample index.
    fn wait_for_edge(
        edges: &mut Receiver<'_, Edge>,
        direction: EdgeDirection,
    ) -> WorkResult<u64> {
        loop {
            let edge = edges.recv()?;
            if edge.direction() == direction {
                return Ok(edge.sample);
            }
            trace!("skipping {} while waiting for {:?} edge", edge, direction);
        }
    }
}

impl ProcessNode for AdbDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn input_schema(&self) -> Vec<crate::runtime::ports::PortSchema> {
        use crate::runtime::ports::{PortDirection, PortSchema};
        vec![PortSchema::new::<Edge>("data", 0, PortDirection::Input)]
    }

    fn output_schema(&self) -> Vec<crate::runtime::ports::PortSchema> {
        use crate::runtime::ports::{PortDirection, PortSchema};
        vec![PortSchema::new::<Annotation>(
            "annotations",
            0,
            PortDirection::Output,
        )]
    }

    /// Decode exactly one cell per call, carrying state in `self`.
    fn work(&mut self, inputs: &[InputPort], outputs: &[OutputPort]) -> WorkResult<usize> {
        // Extract config and state before borrowing input_buffer
        let samplerate_hz = self.samplerate_hz;
        let to_us = |delta: u64| delta as f64 / (samplerate_hz / 1_000_000.0);
        let mut byte = self.byte;
        let mut byte_s = self.byte_s;
        let mut framing = self.framing;

        let mut edges = inputs
            .first()
            .and_then(|p| p.get::<Edge>(&mut self.input_buffer))
            .ok_or_else(|| WorkError::NodeError("Missing data input".into()))?;
        let annotations = outputs
            .first()
            .and_then(|p| p.get::<Annotation>())
            .ok_or_else(|| WorkError::NodeError("Missing annotations output".into()))?;

        // The first falling edge of the pass opens the first cell
        let cell_s = match self.cell_s {
            Some(s) => s,
            None => {
                let s = Self::wait_for_edge(&mut edges, EdgeDirection::Falling)?;
                debug!("first falling edge at sample {}", s);
                s
            }
        };

        let mut emitted = 0usize;

        // ── Low phase ────────────────────────────────────────────────────
        let low_e = Self::wait_for_edge(&mut edges, EdgeDirection::Rising)?;
        let low_us = to_us(low_e - cell_s);

        if low_us < BIT_PHASE_MAX_US {
            annotations.send(Annotation::low(cell_s, low_e, low_us as u64))?;
            emitted += 1;
            if let Framing::Counting(n) = framing
                && n % BITS_PER_BYTE == 0
            {
                // Entering a byte boundary: remember where the byte starts
                byte_s = cell_s;
            }
        } else if low_us > RESET_MIN_US {
            // Global reset. The reference decoder leaves the bit counter and
            // byte accumulator untouched here, unlike the attention branch;
            // kept for compatibility.
            annotations.send(Annotation::reset(cell_s, low_e, low_us as u64))?;
            emitted += 1;
        } else if framing == Framing::Counting(BITS_PER_BYTE) {
            // Mid-length low right after a complete command byte: a device
            // holding the line is requesting service
            annotations.send(Annotation::service_request(cell_s, low_e, low_us as u64))?;
            emitted += 1;
            framing = Framing::Idle;
            byte = 0;
        } else {
            annotations.send(Annotation::attention(cell_s, low_e, low_us as u64))?;
            emitted += 1;
            framing = Framing::Idle;
            byte = 0;
        }

        // ── High phase ───────────────────────────────────────────────────
        let cell_e = Self::wait_for_edge(&mut edges, EdgeDirection::Falling)?;
        let high_us = to_us(cell_e - low_e);
        let total_us = to_us(cell_e - cell_s);

        if high_us < BIT_PHASE_MAX_US {
            annotations.send(Annotation::high(low_e, cell_e, high_us as u64))?;
            emitted += 1;

            if total_us <= BIT_CELL_MAX_US {
                // Bit cell: the longer phase decides the value, ties read as 1
                let bit = u8::from(cell_e - low_e >= low_e - cell_s);
                annotations.send(Annotation::bit(cell_s, cell_e, bit))?;
                emitted += 1;
                byte = (byte << 1) | bit;

                match framing {
                    Framing::Idle => {
                        // First bit cell out of idle is the start bit; it does
                        // not count toward a byte
                        annotations.send(Annotation::start(cell_s, cell_e))?;
                        emitted += 1;
                        framing = Framing::Counting(0);
                    }
                    Framing::Counting(n) => {
                        let n = n + 1;
                        framing = Framing::Counting(n);
                        if n % BITS_PER_BYTE == 0 {
                            trace!("byte 0x{:02X} complete at sample {}", byte, cell_e);
                            annotations.send(Annotation::byte(byte_s, cell_e, byte))?;
                            emitted += 1;
                        }
                    }
                }
            } else if low_us < BIT_PHASE_MAX_US {
                // Short low, stretched cell: stop bit
                annotations.send(Annotation::stop(cell_s, cell_e))?;
                emitted += 1;
            } else {
                // Long low, short high: start bit riding on the attention tail
                annotations.send(Annotation::start(low_e, cell_e))?;
                emitted += 1;
                framing = Framing::Counting(0);
            }
        } else {
            if low_us < BIT_PHASE_MAX_US {
                // The line idled high past the next expected cell; the short
                // low that preceded it was a stop bit
                annotations.send(Annotation::stop(cell_s, low_e))?;
                emitted += 1;
            }
            // Idle or attention tail with no further structure: drop framing
            framing = Framing::Idle;
            byte = 0;
        }

        // ── Advance ──────────────────────────────────────────────────────
        self.cell_s = Some(cell_e);
        self.byte = byte;
        self.byte_s = byte_s;
        self.framing = framing;
        self.cells_decoded += 1;
        trace!("cell {} done at sample {}", self.cells_decoded, cell_e);

        Ok(emitted)
    }
}
