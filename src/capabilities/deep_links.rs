//! Deep-link resolution.
//!
//! User activities carry wrapped URLs that the platform link service
//! resolves asynchronously. The core forwards the activity and gets
//! the resolved URL back; subscription covers links that arrive while
//! the app is already running.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct DeepLinks<E> {
    context: CapabilityContext<DeepLinksOperation, E>,
}

impl<Ev> Capability<Ev> for DeepLinks<Ev> {
    type Operation = DeepLinksOperation;
    type MappedSelf<MappedEv> = DeepLinks<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        DeepLinks::new(self.context.map_event(f))
    }
}

impl<E> DeepLinks<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<DeepLinksOperation, E>) -> Self {
        Self { context }
    }

    /// Hand a user activity to the resolver. Answers with the resolved
    /// URL once the link service has unwrapped it.
    pub fn continue_activity<F>(&self, url: String, make_event: F)
    where
        F: FnOnce(String) -> E + Send + 'static,
    {
        self.context
            .request_from_shell(DeepLinksOperation::ContinueActivity { url }, make_event);
    }

    /// Stream links opened while the app is running.
    pub fn subscribe<F>(&self, make_event: F)
    where
        F: Fn(String) -> E + Send + Sync + 'static,
    {
        self.context
            .stream_from_shell(DeepLinksOperation::Subscribe, make_event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeepLinksOperation {
    ContinueActivity { url: String },
    Subscribe,
}

impl Operation for DeepLinksOperation {
    type Output = String;
}
