//! Delay timers, cancellable by identity.
//!
//! A started timer ticks repeatedly until cancelled. Each tick
//! re-enters the app as an event; ticks that arrive after the state
//! they raced has moved on are ignored by the reducer and the timer is
//! cancelled defensively.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u32);

/// The single deep-link reconciliation timer. Starting it again
/// without cancelling the previous instance is a correctness bug, not
/// an acceptable race.
pub const DEEP_LINK_TIMER: TimerId = TimerId(0);

#[derive(Clone)]
pub struct Delay<E> {
    context: CapabilityContext<DelayOperation, E>,
}

impl<Ev> Capability<Ev> for Delay<Ev> {
    type Operation = DelayOperation;
    type MappedSelf<MappedEv> = Delay<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Delay::new(self.context.map_event(f))
    }
}

impl<E> Delay<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<DelayOperation, E>) -> Self {
        Self { context }
    }

    /// Start a repeating timer. Every tick produces the given event.
    pub fn start<F>(&self, id: TimerId, period_millis: u64, make_event: F)
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.context.stream_from_shell(
            DelayOperation::Start { id, period_millis },
            move |TimerTick| make_event(),
        );
    }

    /// Cancel by identity. Cancelling a timer that is not running is a
    /// no-op on the shell side.
    pub fn cancel(&self, id: TimerId) {
        self.context.notify_shell(DelayOperation::Cancel { id });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayOperation {
    Start { id: TimerId, period_millis: u64 },
    Cancel { id: TimerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTick;

impl Operation for DelayOperation {
    type Output = TimerTick;
}
