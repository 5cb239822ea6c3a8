//! Push notification permission and registration.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct Push<E> {
    context: CapabilityContext<PushOperation, E>,
}

impl<Ev> Capability<Ev> for Push<Ev> {
    type Operation = PushOperation;
    type MappedSelf<MappedEv> = Push<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Push::new(self.context.map_event(f))
    }
}

impl<E> Push<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<PushOperation, E>) -> Self {
        Self { context }
    }

    /// Show the system permission dialog. Answers once the user acted.
    pub fn request_authorization<F>(&self, make_event: F)
    where
        F: FnOnce(PushAuthorization) -> E + Send + 'static,
    {
        self.context
            .request_from_shell(PushOperation::RequestAuthorization, make_event);
    }

    /// Fire-and-forget registration with the platform push service.
    pub fn register(&self) {
        self.context
            .notify_shell(PushOperation::RegisterForRemoteNotifications);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushOperation {
    RequestAuthorization,
    RegisterForRemoteNotifications,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAuthorization {
    pub granted: bool,
}

impl Operation for PushOperation {
    type Output = PushAuthorization;
}
