//! Processing nodes: sources and protocol decoders

pub mod decoders;
mod edge_source;

pub use crate::runtime::Edge;
pub use edge_source::EdgeListSource;
