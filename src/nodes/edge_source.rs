//! Source node feeding a pre-captured edge list into a pipeline

use crate::runtime::Edge;
use crate::runtime::node::{InputPort, OutputPort, ProcessNode, WorkError, WorkResult};
use crate::{AdbError, Result};
use tracing::debug;

/// Edges sent per work() call.
const BATCH_SIZE: usize = 256;

/// Streams a captured list of signal edges, in order, then closes its output.
///
/// The edge list must be strictly increasing in sample index; this is
/// validated once at construction so downstream decoders can rely on
/// monotonic time.
#[derive(Debug)]
pub struct EdgeListSource {
    name: String,
    samplerate_hz: f64,
    edges: Vec<Edge>,
    position: usize,
    done: bool,
}

impl EdgeListSource {
    pub fn new(samplerate_hz: f64, edges: Vec<Edge>) -> Result<Self> {
        if !samplerate_hz.is_finite() || samplerate_hz <= 0.0 {
            return Err(AdbError::InvalidSampleRate(samplerate_hz));
        }
        for (index, pair) in edges.windows(2).enumerate() {
            if pair[1].sample <= pair[0].sample {
                return Err(AdbError::NonMonotonicEdges {
                    index: index + 1,
                    sample: pair[1].sample,
                    prev: pair[0].sample,
                });
            }
        }
        Ok(Self {
            name: "edge_source".to_string(),
            samplerate_hz,
            edges,
            position: 0,
            done: false,
        })
    }

    /// With custom name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sample rate of the capture this source replays
    pub fn samplerate_hz(&self) -> f64 {
        self.samplerate_hz
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl ProcessNode for EdgeListSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_stop(&self) -> bool {
        self.done
    }

    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn output_schema(&self) -> Vec<crate::runtime::ports::PortSchema> {
        use crate::runtime::ports::{PortDirection, PortSchema};
        vec![PortSchema::new::<Edge>("edges", 0, PortDirection::Output)]
    }

    fn work(&mut self, _inputs: &[InputPort], outputs: &[OutputPort]) -> WorkResult<usize> {
        let output = outputs
            .first()
            .and_then(|p| p.get::<Edge>())
            .ok_or_else(|| WorkError::NodeError("Missing edges output".into()))?;

        let end = (self.position + BATCH_SIZE).min(self.edges.len());
        let mut sent = 0;
        for edge in &self.edges[self.position..end] {
            output.send(*edge)?;
            sent += 1;
        }
        self.position = end;

        if self.position == self.edges.len() {
            debug!("{}: all {} edges sent, closing output", self.name, self.edges.len());
            output.close();
            self.done = true;
        }

        Ok(sent)
    }
}
