//! The processing-node abstraction
//!
//! Everything that runs in the graph implements [`ProcessNode`]: edge
//! sources, protocol decoders, annotation sinks. The scheduler owns the node
//! and calls `work()` in a loop on a dedicated thread.

// Everything a node implementation needs
pub use super::errors::{WorkError, WorkResult};
pub use super::ports::{InputPort, OutputPort};
pub use super::receiver::Receiver;
pub use super::sender::Sender;

/// One node of the streaming graph.
///
/// A source declares zero inputs, a sink zero outputs; anything else is a
/// transformer. Port counts and schemas are fixed for the node's lifetime.
pub trait ProcessNode: Send {
    /// Name used for thread naming and logging.
    fn name(&self) -> &str;

    /// Polled by the scheduler between `work()` calls; a source returns true
    /// once it has produced everything it ever will.
    fn should_stop(&self) -> bool {
        false
    }

    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    /// Input port schemas (name, item type, index), used by the pipeline
    /// builder to validate connections.
    fn input_schema(&self) -> Vec<super::ports::PortSchema> {
        Vec::new()
    }

    /// Output port schemas, same role as `input_schema`.
    fn output_schema(&self) -> Vec<super::ports::PortSchema> {
        Vec::new()
    }

    /// Process one unit of work: read inputs, emit to outputs, return the
    /// number of items produced. Return `Err(WorkError::Shutdown)` when the
    /// input stream has ended.
    fn work(&mut self, inputs: &[InputPort], outputs: &[OutputPort]) -> WorkResult<usize>;
}
