//! Persisted state restoration record.
//!
//! The shell maps the record's fields onto its key-value store; an
//! all-absent record is the valid "nothing to restore" signal, never
//! an error.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::restoration::StorageRecord;

#[derive(Clone)]
pub struct Storage<E> {
    context: CapabilityContext<StorageOperation, E>,
}

impl<Ev> Capability<Ev> for Storage<Ev> {
    type Operation = StorageOperation;
    type MappedSelf<MappedEv> = Storage<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Storage::new(self.context.map_event(f))
    }
}

impl<E> Storage<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<StorageOperation, E>) -> Self {
        Self { context }
    }

    pub fn load<F>(&self, make_event: F)
    where
        F: FnOnce(StorageRecord) -> E + Send + 'static,
    {
        self.context
            .request_from_shell(StorageOperation::Load, make_event);
    }

    /// Fire-and-forget write. A failed write costs one restoration,
    /// nothing else; the next save overwrites it.
    pub fn save(&self, record: StorageRecord) {
        self.context.notify_shell(StorageOperation::Save { record });
    }

    pub fn clear(&self) {
        self.context.notify_shell(StorageOperation::Clear);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorageOperation {
    Load,
    Save { record: StorageRecord },
    Clear,
}

impl Operation for StorageOperation {
    type Output = StorageRecord;
}
