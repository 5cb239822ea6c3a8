//! The on-device tracking SDK.
//!
//! The shell owns the SDK object; the core describes what to do with
//! it. Initialization and permission requests answer with a status
//! update, subscriptions stream them, everything else is
//! fire-and-forget with no observable completion.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::model::{DriverID, OrderNote, PublishableKey, SdkStatusUpdate};
use crate::order::OrderSource;

#[derive(Clone)]
pub struct Sdk<E> {
    context: CapabilityContext<SdkOperation, E>,
}

impl<Ev> Capability<Ev> for Sdk<Ev> {
    type Operation = SdkOperation;
    type MappedSelf<MappedEv> = Sdk<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Sdk::new(self.context.map_event(f))
    }
}

impl<E> Sdk<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<SdkOperation, E>) -> Self {
        Self { context }
    }

    /// (Re)initialize the SDK with a publishable key. Answers once
    /// with the resulting lock state and permission snapshot.
    pub fn initialize<F>(&self, publishable_key: PublishableKey, make_event: F)
    where
        F: FnOnce(SdkStatusUpdate) -> E + Send + 'static,
    {
        self.context.request_from_shell(
            SdkOperation::Initialize { publishable_key },
            make_event,
        );
    }

    /// Stream status updates for the lifetime of the session.
    /// Re-subscribing replaces any previous subscription.
    pub fn subscribe<F>(&self, make_event: F)
    where
        F: Fn(SdkStatusUpdate) -> E + Send + Sync + 'static,
    {
        self.context
            .stream_from_shell(SdkOperation::SubscribeToStatusUpdates, make_event);
    }

    /// Request motion permissions; the dialog outcome arrives as a
    /// fresh status update.
    pub fn request_motion_permissions<F>(&self, make_event: F)
    where
        F: FnOnce(SdkStatusUpdate) -> E + Send + 'static,
    {
        self.context
            .request_from_shell(SdkOperation::RequestMotionPermissions, make_event);
    }

    /// Fire-and-forget: the SDK accepts the driver id without a
    /// completion signal.
    pub fn set_driver_id(&self, driver_id: DriverID) {
        self.context
            .notify_shell(SdkOperation::SetDriverId { driver_id });
    }

    pub fn request_location_permissions(&self) {
        self.context
            .notify_shell(SdkOperation::RequestLocationPermissions);
    }

    pub fn start_tracking(&self) {
        self.context.notify_shell(SdkOperation::StartTracking);
    }

    pub fn stop_tracking(&self) {
        self.context.notify_shell(SdkOperation::StopTracking);
    }

    pub fn open_settings(&self) {
        self.context.notify_shell(SdkOperation::OpenSettings);
    }

    /// Attach a geotag to the tracking timeline. Fire-and-forget.
    pub fn add_geotag(&self, geotag: GeotagRequest) {
        self.context.notify_shell(SdkOperation::AddGeotag { geotag });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdkOperation {
    Initialize { publishable_key: PublishableKey },
    SetDriverId { driver_id: DriverID },
    SubscribeToStatusUpdates,
    RequestLocationPermissions,
    RequestMotionPermissions,
    StartTracking,
    StopTracking,
    OpenSettings,
    AddGeotag { geotag: GeotagRequest },
}

impl Operation for SdkOperation {
    type Output = SdkStatusUpdate;
}

/// Marker events written to the tracking timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeotagRequest {
    PickUp {
        order_id: String,
        source: OrderSource,
    },
    CheckIn {
        order_id: String,
        source: OrderSource,
    },
    CheckOut {
        order_id: String,
        source: OrderSource,
        note: Option<OrderNote>,
    },
    Cancel {
        order_id: String,
        source: OrderSource,
        note: Option<OrderNote>,
    },
    VisitCheckIn {
        visit_id: String,
    },
    VisitCheckOut {
        visit_id: String,
        note: Option<OrderNote>,
    },
    ClockIn,
    ClockOut,
}
