//! Typed view over an input channel with putback support
//!
//! A [`Receiver`] is rebuilt by the node on every `work()` call from its
//! `InputPort`, a caller-owned putback buffer, and the port's end-of-stream
//! flag. Buffer and flag live outside the view, so pushed-back items and
//! stream exhaustion both survive across calls.

use crossbeam_channel::Receiver as CrossbeamReceiver;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::errors::{WorkError, WorkResult};
use super::sender::ChannelMessage;

/// Receives items of type `T`, unwrapping the `ChannelMessage` framing.
///
/// Once `EndOfStream` arrives (or the channel disconnects), every later
/// `recv`/`peek` returns `WorkError::Shutdown`; the flag is sticky.
pub struct Receiver<'a, T> {
    channel: &'a CrossbeamReceiver<ChannelMessage<T>>,
    putback: &'a mut VecDeque<T>,
    eos: &'a AtomicBool,
}

impl<'a, T> Receiver<'a, T> {
    pub fn new(
        channel: &'a CrossbeamReceiver<ChannelMessage<T>>,
        putback: &'a mut VecDeque<T>,
        eos: &'a AtomicBool,
    ) -> Self {
        Self {
            channel,
            putback,
            eos,
        }
    }

    /// Return an item to the front of the queue; the next `recv()` yields it.
    pub fn put_back(&mut self, item: T) {
        self.putback.push_front(item);
    }

    pub fn has_buffered(&self) -> bool {
        !self.putback.is_empty()
    }

    /// Blocking receive, draining the putback queue before the channel.
    pub fn recv(&mut self) -> WorkResult<T> {
        if self.eos.load(Ordering::Relaxed) {
            return Err(WorkError::Shutdown);
        }
        if let Some(item) = self.putback.pop_front() {
            return Ok(item);
        }
        self.pull()
    }

    /// Blocking peek; pulls one item into the putback queue if it is empty.
    pub fn peek(&mut self) -> WorkResult<&T> {
        if self.eos.load(Ordering::Relaxed) {
            return Err(WorkError::Shutdown);
        }
        if self.putback.is_empty() {
            let item = self.pull()?;
            self.putback.push_back(item);
        }
        // Just populated above
        Ok(self.putback.front().unwrap())
    }

    /// Receive with a timeout; putback items are returned immediately.
    pub fn recv_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<T, crossbeam_channel::RecvTimeoutError> {
        use crossbeam_channel::RecvTimeoutError;

        if self.eos.load(Ordering::Relaxed) {
            return Err(RecvTimeoutError::Disconnected);
        }
        if let Some(item) = self.putback.pop_front() {
            return Ok(item);
        }
        match self.channel.recv_timeout(timeout)? {
            ChannelMessage::Item(item) => Ok(item),
            ChannelMessage::EndOfStream => {
                self.eos.store(true, Ordering::Relaxed);
                Err(RecvTimeoutError::Disconnected)
            }
        }
    }

    /// Pull one item from the channel, latching the end-of-stream flag on
    /// `EndOfStream` or disconnect.
    fn pull(&mut self) -> WorkResult<T> {
        match self.channel.recv() {
            Ok(ChannelMessage::Item(item)) => Ok(item),
            Ok(ChannelMessage::EndOfStream) => {
                self.eos.store(true, Ordering::Relaxed);
                debug!("end of stream");
                Err(WorkError::Shutdown)
            }
            Err(_) => {
                debug!("input channel disconnected");
                Err(WorkError::Shutdown)
            }
        }
    }
}
