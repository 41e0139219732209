//! Port-based API for ergonomic node connections
//!
//! Provides InputPort and OutputPort type-erased wrappers for channel
//! endpoints, plus the port schema used by the Pipeline builder for
//! connection type checking.

use std::any::TypeId;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::AtomicBool;

use crossbeam_channel::Receiver as CrossbeamReceiver;

use super::receiver::Receiver;
use super::sender::{ChannelMessage, Sender};

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Schema describing a port's metadata
#[derive(Debug, Clone)]
pub struct PortSchema {
    pub name: String,
    pub type_id: TypeId,
    pub index: usize,
    pub direction: PortDirection,
}

impl PortSchema {
    /// Create a new port schema with type information
    pub fn new<T: 'static>(
        name: impl Into<String>,
        index: usize,
        direction: PortDirection,
    ) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            index,
            direction,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Type-erased port wrappers
// ────────────────────────────────────────────────────────────────────────────

/// Type-erased input port wrapping a crossbeam receiver
///
/// Owns the end-of-stream flag so shutdown state survives across `work()`
/// calls even though the `Receiver` view is rebuilt on each call.
pub struct InputPort {
    channel: Box<dyn std::any::Any + Send>,
    eos: AtomicBool,
}

impl InputPort {
    /// Create from a type-erased box (for internal use by Pipeline).
    pub(crate) fn from_type_erased(channel: Box<dyn std::any::Any + Send>) -> Self {
        Self {
            channel,
            eos: AtomicBool::new(false),
        }
    }

    /// Create a new InputPort directly from a crossbeam receiver (for tests
    /// and hand-built graphs).
    pub fn new_for_test<T: Send + 'static>(receiver: CrossbeamReceiver<ChannelMessage<T>>) -> Self {
        Self {
            channel: Box::new(receiver),
            eos: AtomicBool::new(false),
        }
    }

    /// Get a `Receiver` view over this port using the caller-owned putback
    /// buffer.
    ///
    /// Returns None if the port doesn't carry items of type `T`.
    pub fn get<'a, T: Send + 'static>(
        &'a self,
        buffer: &'a mut VecDeque<T>,
    ) -> Option<Receiver<'a, T>> {
        let receiver = self
            .channel
            .downcast_ref::<CrossbeamReceiver<ChannelMessage<T>>>()?;
        Some(Receiver::new(receiver, buffer, &self.eos))
    }
}

/// Type-erased output port wrapping a broadcast Sender
pub struct OutputPort {
    channel: Box<dyn std::any::Any + Send>,
}

impl OutputPort {
    /// Create from a type-erased box (for internal use by Pipeline).
    pub(crate) fn from_type_erased(channel: Box<dyn std::any::Any + Send>) -> Self {
        Self { channel }
    }

    /// Create a new OutputPort directly from a broadcast Sender (for tests
    /// and hand-built graphs).
    pub fn new_for_test<T: Send + Clone + 'static>(sender: Sender<T>) -> Self {
        Self {
            channel: Box::new(sender),
        }
    }

    /// Get the Sender for this port (cheaply cloned from internal storage).
    ///
    /// Returns None if the port doesn't carry items of type `T`.
    pub fn get<T: Send + Clone + 'static>(&self) -> Option<Sender<T>> {
        self.channel.downcast_ref::<Sender<T>>().cloned()
    }
}

impl fmt::Debug for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "OutputPort")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_input_port_type_mismatch() {
        let (_tx, rx) = bounded::<ChannelMessage<u32>>(4);
        let port = InputPort::new_for_test(rx);

        let mut buf = VecDeque::<String>::new();
        assert!(port.get::<String>(&mut buf).is_none());

        let mut buf = VecDeque::<u32>::new();
        assert!(port.get::<u32>(&mut buf).is_some());
    }

    #[test]
    fn test_output_port_roundtrip() {
        let (tx, rx) = bounded::<ChannelMessage<u32>>(4);
        let port = OutputPort::new_for_test(Sender::new(vec![tx]));

        assert!(port.get::<String>().is_none());
        let sender = port.get::<u32>().unwrap();
        sender.send(5).unwrap();
        assert!(matches!(rx.recv().unwrap(), ChannelMessage::Item(5)));
    }
}
