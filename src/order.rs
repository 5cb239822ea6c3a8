//! The order entity and its geotag lifecycle.
//!
//! `checkedOut` and `cancelled` are terminal. The reducer rejects
//! anything else with a typed error; reaching one of those errors
//! means the UI let an illegal action through, so development builds
//! also assert.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{Address, Coordinate};
use crate::model::{MetaContents, MetaName, OrderId, OrderNote, TripId};

/// Order metadata: a non-empty name-keyed mapping. `BTreeMap` gives
/// the stable name order the detail screen renders in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata(BTreeMap<MetaName, MetaContents>);

impl Metadata {
    #[must_use]
    pub fn from_map(map: BTreeMap<MetaName, MetaContents>) -> Option<Self> {
        if map.is_empty() {
            None
        } else {
            Some(Self(map))
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&MetaName, &MetaContents)> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, name: &MetaName) -> Option<&MetaContents> {
        self.0.get(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSource {
    Geofence,
    Order,
    Trip,
}

/// Visit evidence carried into a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisitedInfo {
    Entered {
        at: DateTime<Utc>,
    },
    Visited {
        entered_at: DateTime<Utc>,
        exited_at: DateTime<Utc>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Geotag {
    NotSent,
    PickedUp,
    Entered {
        at: DateTime<Utc>,
    },
    Visited {
        entered_at: DateTime<Utc>,
        exited_at: DateTime<Utc>,
    },
    CheckedOut {
        visited: Option<VisitedInfo>,
        at: DateTime<Utc>,
    },
    Cancelled {
        visited: Option<VisitedInfo>,
        at: DateTime<Utc>,
    },
}

impl Geotag {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NotSent => "notSent",
            Self::PickedUp => "pickedUp",
            Self::Entered { .. } => "entered",
            Self::Visited { .. } => "visited",
            Self::CheckedOut { .. } => "checkedOut",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::CheckedOut { .. } | Self::Cancelled { .. })
    }

    /// The visit evidence accumulated so far, if any.
    #[must_use]
    pub const fn visited_info(&self) -> Option<VisitedInfo> {
        match self {
            Self::Entered { at } => Some(VisitedInfo::Entered { at: *at }),
            Self::Visited {
                entered_at,
                exited_at,
            } => Some(VisitedInfo::Visited {
                entered_at: *entered_at,
                exited_at: *exited_at,
            }),
            Self::CheckedOut { visited, .. } | Self::Cancelled { visited, .. } => *visited,
            Self::NotSent | Self::PickedUp => None,
        }
    }

    #[must_use]
    pub const fn category(&self) -> StatusCategory {
        match self {
            Self::NotSent | Self::PickedUp => StatusCategory::Pending,
            Self::Entered { .. } | Self::Visited { .. } => StatusCategory::Visited,
            Self::CheckedOut { .. } => StatusCategory::Completed,
            Self::Cancelled { .. } => StatusCategory::Canceled,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCategory {
    Pending,
    Visited,
    Completed,
    Canceled,
}

/// A single delivery/stop the driver must act on. Identity is the
/// backend id: equality and hashing ignore every other field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub location: Coordinate,
    pub address: Option<Address>,
    pub metadata: Option<Metadata>,
    pub source: OrderSource,
    pub trip_id: Option<TripId>,
    pub note: Option<OrderNote>,
    pub note_focused: bool,
    pub geotag: Geotag,
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Order {}

impl std::hash::Hash for Order {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// --- Lifecycle reducer ---

#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    PickUp,
    CheckIn { now: DateTime<Utc> },
    CheckOut { now: DateTime<Utc> },
    Cancel { now: DateTime<Utc> },
    NoteChanged(Option<OrderNote>),
    FocusNote,
    DismissNoteFocus,
}

impl LifecycleEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PickUp => "pickUp",
            Self::CheckIn { .. } => "checkIn",
            Self::CheckOut { .. } => "checkOut",
            Self::Cancel { .. } => "cancel",
            Self::NoteChanged(_) => "noteChanged",
            Self::FocusNote => "focusNote",
            Self::DismissNoteFocus => "dismissNoteFocus",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{event} is not legal from {from}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },
    #[error("{from} is terminal and accepts no further events")]
    AlreadyTerminal { from: &'static str },
}

/// Pure lifecycle reducer. Returns the updated order or a typed error;
/// the input is returned untouched in spirit (moved in, moved out).
pub fn transition(mut order: Order, event: LifecycleEvent) -> Result<Order, TransitionError> {
    // Note edits and focus changes are legal in every state.
    match &event {
        LifecycleEvent::NoteChanged(note) => {
            order.note = note.clone();
            return Ok(order);
        }
        LifecycleEvent::FocusNote => {
            order.note_focused = true;
            return Ok(order);
        }
        LifecycleEvent::DismissNoteFocus => {
            order.note_focused = false;
            return Ok(order);
        }
        _ => {}
    }

    if order.geotag.is_terminal() {
        let error = TransitionError::AlreadyTerminal {
            from: order.geotag.name(),
        };
        debug_assert!(false, "{error}");
        return Err(error);
    }

    let next = match (&order.geotag, &event) {
        (Geotag::NotSent, LifecycleEvent::PickUp) => Geotag::PickedUp,
        (Geotag::NotSent | Geotag::PickedUp, LifecycleEvent::CheckIn { now }) => {
            Geotag::Entered { at: *now }
        }
        (_, LifecycleEvent::CheckOut { now }) => {
            // Legal from notSent, pickedUp and entered. A visited order
            // has already left the geofence; checking out again makes
            // no sense.
            match &order.geotag {
                Geotag::NotSent | Geotag::PickedUp | Geotag::Entered { .. } => Geotag::CheckedOut {
                    visited: order.geotag.visited_info(),
                    at: *now,
                },
                _ => {
                    let error = TransitionError::InvalidTransition {
                        from: order.geotag.name(),
                        event: event.name(),
                    };
                    debug_assert!(false, "{error}");
                    return Err(error);
                }
            }
        }
        // Cancelling is legal from any non-terminal state and carries
        // forward whatever visit evidence exists.
        (_, LifecycleEvent::Cancel { now }) => Geotag::Cancelled {
            visited: order.geotag.visited_info(),
            at: *now,
        },
        _ => {
            let error = TransitionError::InvalidTransition {
                from: order.geotag.name(),
                event: event.name(),
            };
            debug_assert!(false, "{error}");
            return Err(error);
        }
    };

    order.geotag = next;
    Ok(order)
}

// --- Derived views ---

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partition {
    pub pending: Vec<Order>,
    pub visited: Vec<Order>,
    pub completed: Vec<Order>,
    pub canceled: Vec<Order>,
}

/// Split an order collection by status category, each bucket sorted by
/// `created_at` descending (most recent first).
#[must_use]
pub fn partition<I>(orders: I) -> Partition
where
    I: IntoIterator<Item = Order>,
{
    let mut result = Partition::default();
    for order in orders {
        match order.geotag.category() {
            StatusCategory::Pending => result.pending.push(order),
            StatusCategory::Visited => result.visited.push(order),
            StatusCategory::Completed => result.completed.push(order),
            StatusCategory::Canceled => result.canceled.push(order),
        }
    }
    for bucket in [
        &mut result.pending,
        &mut result.visited,
        &mut result.completed,
        &mut result.canceled,
    ] {
        bucket.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn order(id: &str) -> Order {
        order_at(id, chrono::Utc::now())
    }

    pub fn order_at(id: &str, created_at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(id).unwrap(),
            created_at,
            location: Coordinate::new(37.7749, -122.4194).unwrap(),
            address: None,
            metadata: None,
            source: OrderSource::Geofence,
            trip_id: None,
            note: None,
            note_focused: false,
            geotag: Geotag::NotSent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{order, order_at};
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn pick_up_only_from_not_sent() {
        let picked = transition(order("o"), LifecycleEvent::PickUp).unwrap();
        assert_eq!(picked.geotag, Geotag::PickedUp);

        let result = std::panic::catch_unwind(|| transition(picked, LifecycleEvent::PickUp));
        assert!(result.is_err() || result.unwrap().is_err());
    }

    #[test]
    fn check_in_from_not_sent_and_picked_up() {
        let entered = transition(order("o"), LifecycleEvent::CheckIn { now: at(10) }).unwrap();
        assert_eq!(entered.geotag, Geotag::Entered { at: at(10) });

        let picked = transition(order("p"), LifecycleEvent::PickUp).unwrap();
        let entered = transition(picked, LifecycleEvent::CheckIn { now: at(20) }).unwrap();
        assert_eq!(entered.geotag, Geotag::Entered { at: at(20) });
    }

    #[test]
    fn check_out_from_entered_carries_entry_time() {
        let entered = transition(order("o"), LifecycleEvent::CheckIn { now: at(10) }).unwrap();
        let done = transition(entered, LifecycleEvent::CheckOut { now: at(30) }).unwrap();
        assert_eq!(
            done.geotag,
            Geotag::CheckedOut {
                visited: Some(VisitedInfo::Entered { at: at(10) }),
                at: at(30),
            }
        );
    }

    #[test]
    fn check_out_without_entry_has_no_visited_info() {
        let done = transition(order("o"), LifecycleEvent::CheckOut { now: at(5) }).unwrap();
        assert_eq!(
            done.geotag,
            Geotag::CheckedOut {
                visited: None,
                at: at(5),
            }
        );
    }

    #[test]
    fn cancel_carries_visit_evidence_forward() {
        let entered = transition(order("o"), LifecycleEvent::CheckIn { now: at(10) }).unwrap();
        let cancelled = transition(entered, LifecycleEvent::Cancel { now: at(40) }).unwrap();
        assert_eq!(
            cancelled.geotag,
            Geotag::Cancelled {
                visited: Some(VisitedInfo::Entered { at: at(10) }),
                at: at(40),
            }
        );
    }

    #[test]
    fn terminal_states_reject_every_event() {
        let done = transition(order("o"), LifecycleEvent::CheckOut { now: at(5) }).unwrap();
        for event in [
            LifecycleEvent::PickUp,
            LifecycleEvent::CheckIn { now: at(6) },
            LifecycleEvent::CheckOut { now: at(7) },
            LifecycleEvent::Cancel { now: at(8) },
        ] {
            let done = done.clone();
            let outcome = std::panic::catch_unwind(move || transition(done, event));
            // Release builds return the typed error; debug builds
            // assert. Either way the transition never succeeds.
            match outcome {
                Ok(result) => assert!(matches!(
                    result,
                    Err(TransitionError::AlreadyTerminal { .. })
                )),
                Err(_) => {}
            }
        }
    }

    #[test]
    fn note_edits_are_legal_everywhere() {
        let done = transition(order("o"), LifecycleEvent::Cancel { now: at(5) }).unwrap();
        let note = OrderNote::new("left at the door").unwrap();
        let updated =
            transition(done, LifecycleEvent::NoteChanged(Some(note.clone()))).unwrap();
        assert_eq!(updated.note, Some(note));
    }

    #[test]
    fn partition_buckets_by_category_sorted_by_recency() {
        let pending_old = order_at("pending-old", at(1));
        let pending_new = order_at("pending-new", at(2));
        let visited =
            transition(order_at("visited", at(3)), LifecycleEvent::CheckIn { now: at(4) }).unwrap();
        let completed = transition(
            order_at("completed", at(5)),
            LifecycleEvent::CheckOut { now: at(6) },
        )
        .unwrap();
        let canceled = transition(
            order_at("canceled", at(7)),
            LifecycleEvent::Cancel { now: at(8) },
        )
        .unwrap();

        let p = partition([
            pending_old.clone(),
            visited,
            completed,
            canceled,
            pending_new.clone(),
        ]);
        assert_eq!(p.pending, vec![pending_new, pending_old]);
        assert_eq!(p.visited.len(), 1);
        assert_eq!(p.completed.len(), 1);
        assert_eq!(p.canceled.len(), 1);
    }
}
