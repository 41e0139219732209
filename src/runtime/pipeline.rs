//! Graph construction: nodes by name, connections by port name
//!
//! The builder validates connections against the port schemas nodes declare
//! (type and direction checked up front, before any thread starts), then
//! `build()` materializes the channels and hands everything to a
//! [`Scheduler`].

use super::errors::ConnectionError;
use super::node::ProcessNode;
use super::ports::{InputPort, OutputPort, PortSchema};
use super::scheduler::Scheduler;
use super::type_registry::TYPE_REGISTRY;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use tracing::{debug, info};

const DEFAULT_BUFFER_SIZE: usize = 1000;

struct NodeEntry {
    id: usize,
    node: Box<dyn ProcessNode>,
    inputs: Vec<PortSchema>,
    outputs: Vec<PortSchema>,
}

struct Wire {
    source: (usize, usize),
    dest: (usize, usize),
    type_id: TypeId,
    buffer_size: usize,
}

/// Builder for a streaming node graph.
pub struct Pipeline {
    entries: Vec<NodeEntry>,
    ids_by_name: HashMap<String, usize>,
    wires: Vec<Wire>,
    default_buffer_size: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            ids_by_name: HashMap::new(),
            wires: Vec::new(),
            default_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Override the channel capacity used by `connect`.
    pub fn with_default_buffer_size(mut self, size: usize) -> Self {
        self.default_buffer_size = size;
        self
    }

    /// Add a node under a unique name. Port layout comes from the node's own
    /// schema declarations.
    pub fn add_process<N: ProcessNode + 'static>(
        &mut self,
        name: impl Into<String>,
        node: N,
    ) -> Result<(), String> {
        let name = name.into();
        if self.ids_by_name.contains_key(&name) {
            return Err(format!("Node with name '{}' already exists", name));
        }

        let id = self.entries.len();
        self.entries.push(NodeEntry {
            id,
            inputs: node.input_schema(),
            outputs: node.output_schema(),
            node: Box::new(node),
        });
        self.ids_by_name.insert(name, id);
        Ok(())
    }

    /// Connect an output port to an input port, both addressed by name.
    pub fn connect(
        &mut self,
        from_node: &str,
        from_port: &str,
        to_node: &str,
        to_port: &str,
    ) -> Result<(), Box<ConnectionError>> {
        self.connect_with_buffer(from_node, from_port, to_node, to_port, self.default_buffer_size)
    }

    /// Like [`connect`](Self::connect) with an explicit channel capacity.
    pub fn connect_with_buffer(
        &mut self,
        from_node: &str,
        from_port: &str,
        to_node: &str,
        to_port: &str,
        buffer_size: usize,
    ) -> Result<(), Box<ConnectionError>> {
        let source = self.lookup_port(from_node, from_port, false)?;
        let dest = self.lookup_port(to_node, to_port, true)?;

        if source.2 != dest.2 {
            return Err(Box::new(ConnectionError::TypeMismatch {
                from_node: from_node.to_string(),
                from_port: from_port.to_string(),
                from_type: source.2,
                to_node: to_node.to_string(),
                to_port: to_port.to_string(),
                to_type: dest.2,
            }));
        }

        // An input port takes exactly one upstream; outputs may fan out
        if self
            .wires
            .iter()
            .any(|w| w.dest == (dest.0, dest.1))
        {
            return Err(Box::new(ConnectionError::DuplicateConnection(format!(
                "Input port '{}' on node '{}' is already connected",
                to_port, to_node
            ))));
        }

        self.wires.push(Wire {
            source: (source.0, source.1),
            dest: (dest.0, dest.1),
            type_id: source.2,
            buffer_size,
        });
        Ok(())
    }

    /// Resolve `node.port` to (node id, port index, item type).
    fn lookup_port(
        &self,
        node: &str,
        port: &str,
        input_side: bool,
    ) -> Result<(usize, usize, TypeId), Box<ConnectionError>> {
        let id = *self
            .ids_by_name
            .get(node)
            .ok_or_else(|| Box::new(ConnectionError::NodeNotFound(node.to_string())))?;
        let entry = &self.entries[id];
        let schemas = if input_side {
            &entry.inputs
        } else {
            &entry.outputs
        };
        let schema = schemas.iter().find(|s| s.name == port).ok_or_else(|| {
            Box::new(ConnectionError::PortNotFound {
                node: node.to_string(),
                port: port.to_string(),
            })
        })?;
        Ok((id, schema.index, schema.type_id))
    }

    pub fn list_nodes(&self) -> Vec<&str> {
        self.ids_by_name.keys().map(|s| s.as_str()).collect()
    }

    /// Create every channel, wrap the ports, and start all nodes on a
    /// [`Scheduler`].
    pub fn build(self) -> Result<Scheduler, String> {
        info!(
            "building pipeline: {} nodes, {} connections",
            self.entries.len(),
            self.wires.len()
        );

        let registry = TYPE_REGISTRY.lock().unwrap();

        // One channel per wire; the sender side may later be merged with
        // others feeding the same output port (fan-out)
        type PortKey = (usize, usize);
        let mut rx_by_dest: HashMap<PortKey, Box<dyn Any + Send>> = HashMap::new();
        let mut tx_by_source: HashMap<PortKey, (TypeId, Vec<Box<dyn Any + Send>>)> = HashMap::new();

        for wire in &self.wires {
            let (tx, rx) = registry
                .create_channel(wire.type_id, wire.buffer_size)
                .ok_or_else(|| {
                    format!(
                        "Type {:?} not registered. Call register_type::<T>() before building pipeline.",
                        wire.type_id
                    )
                })?;
            rx_by_dest.insert(wire.dest, rx);
            tx_by_source
                .entry(wire.source)
                .or_insert_with(|| (wire.type_id, Vec::new()))
                .1
                .push(tx);
        }

        let mut scheduler = Scheduler::new();

        for entry in self.entries {
            debug!("starting node {} ('{}')", entry.id, entry.node.name());

            // Unconnected ports get an inert placeholder; the node's get::<T>()
            // returns None for them
            let inputs: Vec<InputPort> = (0..entry.node.num_inputs())
                .map(|i| match rx_by_dest.remove(&(entry.id, i)) {
                    Some(rx) => InputPort::from_type_erased(rx),
                    None => InputPort::from_type_erased(Box::new(()) as Box<dyn Any + Send>),
                })
                .collect();

            let mut outputs = Vec::with_capacity(entry.node.num_outputs());
            for i in 0..entry.node.num_outputs() {
                let port = match tx_by_source.remove(&(entry.id, i)) {
                    Some((type_id, senders)) => {
                        OutputPort::from_type_erased(registry.wrap_output(type_id, senders)?)
                    }
                    None => OutputPort::from_type_erased(Box::new(()) as Box<dyn Any + Send>),
                };
                outputs.push(port);
            }

            scheduler.start_process(entry.node, inputs, outputs);
        }

        drop(registry);
        info!("pipeline running on {} threads", scheduler.num_threads());
        Ok(scheduler)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Edge;
    use crate::runtime::node::ProcessNode;
    use crate::runtime::ports::{PortDirection, PortSchema};

    struct EdgeSourceStub;
    impl ProcessNode for EdgeSourceStub {
        fn name(&self) -> &str {
            "edge_source_stub"
        }
        fn num_inputs(&self) -> usize {
            0
        }
        fn num_outputs(&self) -> usize {
            1
        }
        fn output_schema(&self) -> Vec<PortSchema> {
            vec![PortSchema::new::<Edge>("out", 0, PortDirection::Output)]
        }
        fn work(
            &mut self,
            _inputs: &[InputPort],
            _outputs: &[OutputPort],
        ) -> crate::runtime::WorkResult<usize> {
            Ok(0)
        }
    }

    struct EdgeSinkStub;
    impl ProcessNode for EdgeSinkStub {
        fn name(&self) -> &str {
            "edge_sink_stub"
        }
        fn num_inputs(&self) -> usize {
            1
        }
        fn num_outputs(&self) -> usize {
            0
        }
        fn input_schema(&self) -> Vec<PortSchema> {
            vec![PortSchema::new::<Edge>("in", 0, PortDirection::Input)]
        }
        fn work(
            &mut self,
            _inputs: &[InputPort],
            _outputs: &[OutputPort],
        ) -> crate::runtime::WorkResult<usize> {
            Ok(0)
        }
    }

    struct U64SinkStub;
    impl ProcessNode for U64SinkStub {
        fn name(&self) -> &str {
            "u64_sink_stub"
        }
        fn num_inputs(&self) -> usize {
            1
        }
        fn num_outputs(&self) -> usize {
            0
        }
        fn input_schema(&self) -> Vec<PortSchema> {
            vec![PortSchema::new::<u64>("in", 0, PortDirection::Input)]
        }
        fn work(
            &mut self,
            _inputs: &[InputPort],
            _outputs: &[OutputPort],
        ) -> crate::runtime::WorkResult<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_connect_matching_ports() {
        let mut pipeline = Pipeline::new();
        pipeline.add_process("source", EdgeSourceStub).unwrap();
        pipeline.add_process("sink", EdgeSinkStub).unwrap();

        assert!(pipeline.connect("source", "out", "sink", "in").is_ok());
    }

    #[test]
    fn test_connect_rejects_type_mismatch() {
        let mut pipeline = Pipeline::new();
        pipeline.add_process("source", EdgeSourceStub).unwrap();
        pipeline.add_process("sink", U64SinkStub).unwrap();

        let err = pipeline.connect("source", "out", "sink", "in").unwrap_err();
        assert!(matches!(*err, ConnectionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_input_port_takes_one_upstream() {
        let mut pipeline = Pipeline::new();
        pipeline.add_process("a", EdgeSourceStub).unwrap();
        pipeline.add_process("b", EdgeSourceStub).unwrap();
        pipeline.add_process("sink", EdgeSinkStub).unwrap();

        pipeline.connect("a", "out", "sink", "in").unwrap();
        let err = pipeline.connect("b", "out", "sink", "in").unwrap_err();
        assert!(err.to_string().contains("already connected"));
    }

    #[test]
    fn test_output_port_fans_out() {
        let mut pipeline = Pipeline::new();
        pipeline.add_process("source", EdgeSourceStub).unwrap();
        pipeline.add_process("sink1", EdgeSinkStub).unwrap();
        pipeline.add_process("sink2", EdgeSinkStub).unwrap();

        assert!(pipeline.connect("source", "out", "sink1", "in").is_ok());
        assert!(pipeline.connect("source", "out", "sink2", "in").is_ok());
    }

    #[test]
    fn test_unknown_node_and_port() {
        let mut pipeline = Pipeline::new();
        pipeline.add_process("source", EdgeSourceStub).unwrap();
        pipeline.add_process("sink", EdgeSinkStub).unwrap();

        assert!(pipeline.connect("source", "out", "nobody", "in").is_err());
        assert!(pipeline.connect("source", "typo", "sink", "in").is_err());
    }

    #[test]
    fn test_custom_buffer_size() {
        let mut pipeline = Pipeline::new();
        pipeline.add_process("source", EdgeSourceStub).unwrap();
        pipeline.add_process("sink", EdgeSinkStub).unwrap();

        assert!(
            pipeline
                .connect_with_buffer("source", "out", "sink", "in", 10_000)
                .is_ok()
        );
    }

    #[test]
    fn test_duplicate_node_name_rejected() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.add_process("node1", EdgeSourceStub).is_ok());
        let result = pipeline.add_process("node1", EdgeSourceStub);
        assert!(result.unwrap_err().contains("already exists"));
    }

    #[test]
    fn test_list_nodes() {
        let mut pipeline = Pipeline::new();
        pipeline.add_process("source", EdgeSourceStub).unwrap();
        pipeline.add_process("sink", EdgeSinkStub).unwrap();

        let nodes = pipeline.list_nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.contains(&"source"));
        assert!(nodes.contains(&"sink"));
    }
}
