//! Streaming Apple Desktop Bus (ADB) protocol decoder
//!
//! This library decodes the single-wire ADB data line from a logic-analyzer
//! capture, turning a stream of signal edges into annotated intervals: cell
//! phases, attention and reset pulses, start/stop bits, data bits, and
//! MSB-first assembled bytes. Decoding runs on a thread-per-node graph with
//! crossbeam channels, so captures stream through without being held in
//! memory as a whole.
//!
//! # Architecture
//!
//! - **EdgeListSource**: Replays a captured edge list into the graph
//! - **AdbDecoder**: Classifies bit cells by phase durations and assembles bytes
//! - **Streaming Nodes**: Thread-per-node execution with crossbeam channels
//! - **Scheduler**: Manages node lifecycle and parallel execution
//!
//! # Example
//!
//! ```no_run
//! use adb_decode::{AdbDecoder, EdgeListSource, Pipeline};
//!
//! let edges = vec![/* captured edges */];
//! let mut pipeline = Pipeline::new();
//! pipeline.add_process("source", EdgeListSource::new(1_000_000.0, edges)?)?;
//! pipeline.add_process("decoder", AdbDecoder::new(1_000_000.0)?)?;
//! pipeline.connect("source", "edges", "decoder", "data")?;
//! // ... attach a sink for the annotations and run
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

pub mod nodes;
pub mod runtime;

// Re-export decoder data types
pub use nodes::decoders::{Annotation, AnnotationKind, AnnotationRow};

// Re-export data types from runtime
pub use runtime::{Edge, EdgeDirection};

// Re-export streaming nodes
pub use nodes::EdgeListSource;

// Re-export streaming decoders
pub use nodes::decoders::AdbDecoder;

// Re-export streaming runtime components
pub use runtime::{
    ConnectionError, InputPort, OutputPort, Pipeline, PortDirection, PortSchema, ProcessNode,
    Scheduler, WorkError, WorkResult, register_type,
};

#[derive(Error, Debug)]
pub enum AdbError {
    #[error("Invalid sample rate: {0} (must be finite and positive)")]
    InvalidSampleRate(f64),

    #[error("Edge list not strictly increasing at index {index}: sample {sample} after {prev}")]
    NonMonotonicEdges { index: usize, sample: u64, prev: u64 },
}

pub type Result<T> = std::result::Result<T, AdbError>;
