//! Runtime error types

use crossbeam_channel::{RecvError, SendError};
use std::any::TypeId;

/// Failures while wiring a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(
        "Port type mismatch: {from_node}.{from_port} ({from_type:?}) -> {to_node}.{to_port} ({to_type:?})"
    )]
    TypeMismatch {
        from_node: String,
        from_port: String,
        from_type: TypeId,
        to_node: String,
        to_port: String,
        to_type: TypeId,
    },

    #[error("No node named '{0}'")]
    NodeNotFound(String),

    #[error("No port '{port}' on node '{node}'")]
    PortNotFound { node: String, port: String },

    #[error("{0}")]
    DuplicateConnection(String),
}

/// Failures inside a node's `work()` call.
///
/// `Shutdown` is not an error in the usual sense: it is how a node tells the
/// scheduler its input is exhausted and the worker should wind down.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    #[error("Receive failed: {0}")]
    RecvError(#[from] RecvError),

    #[error("Send failed: {0}")]
    SendError(String),

    #[error("{0}")]
    NodeError(String),

    #[error("Input stream ended")]
    Shutdown,
}

impl<T> From<SendError<T>> for WorkError {
    fn from(e: SendError<T>) -> Self {
        WorkError::SendError(e.to_string())
    }
}

pub type WorkResult<T = ()> = Result<T, WorkError>;
