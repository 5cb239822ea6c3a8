//! Small platform actions with no observable completion.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct Platform<E> {
    context: CapabilityContext<PlatformOperation, E>,
}

impl<Ev> Capability<Ev> for Platform<Ev> {
    type Operation = PlatformOperation;
    type MappedSelf<MappedEv> = Platform<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Platform::new(self.context.map_event(f))
    }
}

impl<E> Platform<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<PlatformOperation, E>) -> Self {
        Self { context }
    }

    /// Open the destination in the system maps app.
    pub fn open_map(&self, lat: f64, lng: f64, label: Option<String>) {
        self.context
            .notify_shell(PlatformOperation::OpenMap { lat, lng, label });
    }

    pub fn copy_to_pasteboard(&self, text: String) {
        self.context
            .notify_shell(PlatformOperation::CopyToPasteboard { text });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlatformOperation {
    OpenMap {
        lat: f64,
        lng: f64,
        label: Option<String>,
    },
    CopyToPasteboard {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDone;

impl Operation for PlatformOperation {
    type Output = PlatformDone;
}
