//! TypeId-keyed channel construction
//!
//! The pipeline builder works with type-erased ports, so it cannot call
//! `bounded::<ChannelMessage<T>>` directly. Each item type registers two
//! closures here: one that creates a bounded channel for it and one that
//! merges a list of raw senders into a broadcast [`Sender`].

use super::sender::{ChannelMessage, Sender};
use crossbeam_channel::{Sender as CrossbeamSender, bounded};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type ChannelFactory =
    Box<dyn Fn(usize) -> (Box<dyn Any + Send>, Box<dyn Any + Send>) + Send + Sync>;
type SenderMerge =
    Box<dyn Fn(Vec<Box<dyn Any + Send>>) -> Result<Box<dyn Any + Send>, String> + Send + Sync>;

pub(crate) struct TypeRegistry {
    factories: HashMap<TypeId, ChannelFactory>,
    merges: HashMap<TypeId, SenderMerge>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            factories: HashMap::new(),
            merges: HashMap::new(),
        }
    }

    fn register<T: 'static + Send + Clone>(&mut self) {
        let type_id = TypeId::of::<T>();

        self.factories.insert(
            type_id,
            Box::new(|capacity| {
                let (tx, rx) = bounded::<ChannelMessage<T>>(capacity);
                (
                    Box::new(tx) as Box<dyn Any + Send>,
                    Box::new(rx) as Box<dyn Any + Send>,
                )
            }),
        );

        self.merges.insert(
            type_id,
            Box::new(|raw_senders| {
                if raw_senders.is_empty() {
                    return Err("No senders to wrap".to_string());
                }
                let mut senders = Vec::with_capacity(raw_senders.len());
                for raw in raw_senders {
                    let tx = raw
                        .downcast::<CrossbeamSender<ChannelMessage<T>>>()
                        .map_err(|_| "Type mismatch in sender".to_string())?;
                    senders.push(*tx);
                }
                Ok(Box::new(Sender::new(senders)) as Box<dyn Any + Send>)
            }),
        );
    }

    pub(crate) fn create_channel(
        &self,
        type_id: TypeId,
        capacity: usize,
    ) -> Option<(Box<dyn Any + Send>, Box<dyn Any + Send>)> {
        self.factories.get(&type_id).map(|make| make(capacity))
    }

    pub(crate) fn wrap_output(
        &self,
        type_id: TypeId,
        senders: Vec<Box<dyn Any + Send>>,
    ) -> Result<Box<dyn Any + Send>, String> {
        let merge = self
            .merges
            .get(&type_id)
            .ok_or_else(|| format!("Type {:?} not registered", type_id))?;
        merge(senders)
    }
}

lazy_static::lazy_static! {
    pub(crate) static ref TYPE_REGISTRY: Arc<Mutex<TypeRegistry>> = {
        let mut registry = TypeRegistry::new();

        // The two item types every decode pipeline carries
        registry.register::<crate::runtime::Edge>();
        registry.register::<crate::nodes::decoders::Annotation>();

        Arc::new(Mutex::new(registry))
    };
}

/// Register an additional item type for pipeline channels. Must be called
/// before `build()` on any pipeline whose connections carry `T`.
pub fn register_type<T: 'static + Send + Clone>() {
    TYPE_REGISTRY.lock().unwrap().register::<T>();
}
