//! Every way the world reaches the reducer: user input, platform life
//! cycle, and the completions of dispatched effects. An event that is
//! irrelevant to the current flow variant is a no-op, not an error;
//! async results routinely outlive the state that requested them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::api::ApiResult;
use crate::capabilities::{AccountsOutput, PushAuthorization};
use crate::deep_link::DeepLinkPayload;
use crate::geo::{Address, Coordinate};
use crate::model::{
    BusinessManages, Digit, DriverID, Email, History, ManagesFor, BusinessName, OrderId,
    OrderNote, Password, Place, SdkStatusUpdate, TabSelection, VisitId,
};
use crate::restoration::StorageRecord;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Noop,

    // Life cycle
    FinishedLaunching,
    WillEnterForeground,
    ReceivedPushNotification,
    NetworkStatusChanged { online: bool },

    // Launch fan-in
    RestorationLoaded(Box<StorageRecord>),
    StatusUpdated(SdkStatusUpdate),

    // Deep links
    DeepLinkOpened { url: String },
    ReceivedDeepLink(DeepLinkPayload),
    DeepLinkTimerFired,
    MadeSdk(SdkStatusUpdate),

    // Sign-up form
    BusinessNameChanged(Option<BusinessName>),
    EmailChanged(Option<Email>),
    PasswordChanged(Option<Password>),
    FocusBusinessName,
    FocusEmail,
    FocusPassword,
    DismissFocus,
    CompleteSignUpForm,
    GoToSignUp,
    GoToSignIn,

    // Sign-up questions
    BusinessManagesChanged(Option<BusinessManages>),
    ManagesForChanged(Option<ManagesFor>),
    SignUpTapped,
    CancelSignUp,

    // Verification code
    VerificationDigitEntered(Digit),
    VerificationBackspace,
    FocusVerification,
    ResendVerificationCode,

    // Account service completions
    AccountsResponded(AccountsOutput),

    // Sign in
    SignInTapped,
    CancelSignIn,

    // Driver ID entry
    DriverIdChanged(Option<DriverID>),
    SubmitDriverId,

    // Main: data refresh
    UpdateOrders,
    TokenResponse(ApiResult),
    OrdersResponse(ApiResult),
    OrderCompleteResponse { order_id: OrderId, result: ApiResult },
    OrderCancelResponse { order_id: OrderId, result: ApiResult },
    NoteUpdateResponse { order_id: OrderId, result: ApiResult },
    PlacesUpdated(HashSet<Place>),
    HistoryUpdated(History),
    GeocodedAddresses(Vec<(Coordinate, Option<Address>)>),

    // Main: orders and visits
    SwitchTab(TabSelection),
    SelectOrder(OrderId),
    SelectManualVisit(VisitId),
    DeselectOrder,
    PickUpOrder,
    CheckOutOrder,
    CancelOrder,
    OrderNoteChanged(Option<OrderNote>),
    FocusOrderNote,
    AddManualVisit,
    CheckInManualVisit,
    CheckOutManualVisit,

    // Tracking and permissions
    StartTracking,
    StopTracking,
    OpenSettings,
    RequestLocationPermissions,
    RequestMotionPermissions,
    RequestPushAuthorization,
    PushAuthorizationDealt(PushAuthorization),

    // Small platform actions
    OpenAppleMaps,
    CopyToPasteboard(String),
}

impl Event {
    /// Stable name for tracing.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::FinishedLaunching => "finishedLaunching",
            Self::WillEnterForeground => "willEnterForeground",
            Self::ReceivedPushNotification => "receivedPushNotification",
            Self::NetworkStatusChanged { .. } => "networkStatusChanged",
            Self::RestorationLoaded(_) => "restorationLoaded",
            Self::StatusUpdated(_) => "statusUpdated",
            Self::DeepLinkOpened { .. } => "deepLinkOpened",
            Self::ReceivedDeepLink(_) => "receivedDeepLink",
            Self::DeepLinkTimerFired => "deepLinkTimerFired",
            Self::MadeSdk(_) => "madeSdk",
            Self::BusinessNameChanged(_) => "businessNameChanged",
            Self::EmailChanged(_) => "emailChanged",
            Self::PasswordChanged(_) => "passwordChanged",
            Self::FocusBusinessName => "focusBusinessName",
            Self::FocusEmail => "focusEmail",
            Self::FocusPassword => "focusPassword",
            Self::DismissFocus => "dismissFocus",
            Self::CompleteSignUpForm => "completeSignUpForm",
            Self::GoToSignUp => "goToSignUp",
            Self::GoToSignIn => "goToSignIn",
            Self::BusinessManagesChanged(_) => "businessManagesChanged",
            Self::ManagesForChanged(_) => "managesForChanged",
            Self::SignUpTapped => "signUpTapped",
            Self::CancelSignUp => "cancelSignUp",
            Self::VerificationDigitEntered(_) => "verificationDigitEntered",
            Self::VerificationBackspace => "verificationBackspace",
            Self::FocusVerification => "focusVerification",
            Self::ResendVerificationCode => "resendVerificationCode",
            Self::AccountsResponded(_) => "accountsResponded",
            Self::SignInTapped => "signInTapped",
            Self::CancelSignIn => "cancelSignIn",
            Self::DriverIdChanged(_) => "driverIdChanged",
            Self::SubmitDriverId => "submitDriverId",
            Self::UpdateOrders => "updateOrders",
            Self::TokenResponse(_) => "tokenResponse",
            Self::OrdersResponse(_) => "ordersResponse",
            Self::OrderCompleteResponse { .. } => "orderCompleteResponse",
            Self::OrderCancelResponse { .. } => "orderCancelResponse",
            Self::NoteUpdateResponse { .. } => "noteUpdateResponse",
            Self::PlacesUpdated(_) => "placesUpdated",
            Self::HistoryUpdated(_) => "historyUpdated",
            Self::GeocodedAddresses(_) => "geocodedAddresses",
            Self::SwitchTab(_) => "switchTab",
            Self::SelectOrder(_) => "selectOrder",
            Self::SelectManualVisit(_) => "selectManualVisit",
            Self::DeselectOrder => "deselectOrder",
            Self::PickUpOrder => "pickUpOrder",
            Self::CheckOutOrder => "checkOutOrder",
            Self::CancelOrder => "cancelOrder",
            Self::OrderNoteChanged(_) => "orderNoteChanged",
            Self::FocusOrderNote => "focusOrderNote",
            Self::AddManualVisit => "addManualVisit",
            Self::CheckInManualVisit => "checkInManualVisit",
            Self::CheckOutManualVisit => "checkOutManualVisit",
            Self::StartTracking => "startTracking",
            Self::StopTracking => "stopTracking",
            Self::OpenSettings => "openSettings",
            Self::RequestLocationPermissions => "requestLocationPermissions",
            Self::RequestMotionPermissions => "requestMotionPermissions",
            Self::RequestPushAuthorization => "requestPushAuthorization",
            Self::PushAuthorizationDealt(_) => "pushAuthorizationDealt",
            Self::OpenAppleMaps => "openAppleMaps",
            Self::CopyToPasteboard(_) => "copyToPasteboard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_size_stays_reasonable() {
        // Large payloads are boxed to keep the enum small.
        let size = std::mem::size_of::<Event>();
        assert!(size <= 128, "Event is {size} bytes; box more variants");
    }
}
