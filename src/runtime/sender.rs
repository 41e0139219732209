//! Output side of a node connection

use crossbeam_channel::{SendError, Sender as CrossbeamSender};

/// Framing for items flowing through pipeline channels.
///
/// Sources signal the end of their stream explicitly instead of relying on
/// channel-handle lifetimes, which keeps shutdown deterministic even while
/// clones of the sender are still alive. Nodes never handle this enum
/// themselves: `Sender::send` wraps, `Receiver::recv` unwraps.
#[derive(Clone, Debug)]
pub enum ChannelMessage<T> {
    Item(T),
    EndOfStream,
}

/// Broadcast sender feeding every connection made from one output port.
///
/// Delivery is fire-and-forget with backpressure: `send` blocks while a
/// bounded destination channel is full, and no acknowledgement flows back.
pub struct Sender<T> {
    destinations: Vec<CrossbeamSender<ChannelMessage<T>>>,
}

impl<T: Clone> Sender<T> {
    pub fn new(destinations: Vec<CrossbeamSender<ChannelMessage<T>>>) -> Self {
        Self { destinations }
    }

    pub fn num_destinations(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_connected(&self) -> bool {
        !self.destinations.is_empty()
    }

    /// Send one item to every destination, in order.
    ///
    /// A single disconnected consumer does not poison the rest: the call
    /// fails only when no destination accepted the item.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let mut delivered = self.destinations.is_empty();
        let mut last_refused = None;

        for dest in &self.destinations {
            match dest.send(ChannelMessage::Item(value.clone())) {
                Ok(()) => delivered = true,
                Err(SendError(ChannelMessage::Item(v))) => last_refused = Some(SendError(v)),
                Err(SendError(ChannelMessage::EndOfStream)) => unreachable!(),
            }
        }

        match (delivered, last_refused) {
            (false, Some(e)) => Err(e),
            _ => Ok(()),
        }
    }

    /// Tell every destination that no more items will follow. Downstream
    /// receivers latch shutdown once they reach the marker.
    pub fn close(&self) {
        for dest in &self.destinations {
            let _ = dest.send(ChannelMessage::EndOfStream);
        }
    }
}

impl<T: Clone> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            destinations: self.destinations.clone(),
        }
    }
}
