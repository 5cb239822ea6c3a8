//! Bidirectional projection between flow state and the presentation
//! layer.
//!
//! [`from_model`] is total: every reachable flow state maps to a
//! renderable screen, with blockers computed from the permission and
//! SDK snapshot at render time rather than stored. [`to_event`] is
//! partial: screen actions that carry unusable input map to nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::model::{
    AppFlow, BusinessManages, CredentialFocus, DialogStatus, Digit, DriverID, Email, FormFocus,
    LocationAccuracy, LocationPermission, ManagesFor, ManualVisit, ManualVisitStatus, Model,
    MotionPermission, OrderId, OrderNote, BusinessName, Password, PushStatus, QuestionsStatus,
    RequestStatus, SignInState, SignUpState, TabSelection, TrackingStatus, Verification,
    VerificationRequest, VisitId,
};
use crate::order::{partition, Geotag, Order, StatusCategory, VisitedInfo};

// --- Screen state ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Screen {
    Loading,
    Blocker(Blocker),
    SignUpForm(SignUpFormScreen),
    SignUpQuestions(SignUpQuestionsScreen),
    SignUpVerification(SignUpVerificationScreen),
    SignIn(SignInScreen),
    DriverId(DriverIdScreen),
    Main(MainScreen),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Blocker {
    NoMotionServices,
    LocationDisabled,
    LocationDenied,
    LocationRestricted,
    LocationNotDetermined,
    LocationReduced,
    MotionDisabled,
    MotionDenied,
    MotionNotDetermined,
    PushNotShown,
    Deleted { device_id: String },
    InvalidPublishableKey { device_id: String },
    Stopped,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignUpFormScreen {
    pub name: String,
    pub email: String,
    pub password: String,
    pub focus: Option<FormFocus>,
    pub form_is_valid: bool,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignUpQuestionsScreen {
    pub business_manages: Option<BusinessManages>,
    pub manages_for: Option<ManagesFor>,
    pub signing_up: bool,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignUpVerificationScreen {
    /// The six code boxes, leading ones filled.
    pub fields: [String; 6],
    /// Index of the box the cursor sits in, when focused.
    pub focused_field: Option<u8>,
    pub verifying: bool,
    pub error: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignInButton {
    Normal,
    Disabled,
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignInScreen {
    pub email: String,
    pub password: String,
    pub button: SignInButton,
    pub focus: Option<CredentialFocus>,
    pub signing_in: bool,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverIdScreen {
    pub driver_id: String,
    pub button_disabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapPin {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub category: StatusCategory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatusLine {
    NotSent,
    PickedUp,
    Entered(String),
    Visited(String),
    CheckedOut {
        visited: Option<String>,
        completed: String,
    },
    Canceled {
        visited: Option<String>,
        canceled: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: String,
    pub title: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub metadata: Vec<MetadataRow>,
    pub note: String,
    pub note_focused: bool,
    pub status: OrderStatusLine,
    pub can_cancel: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualStatusLine {
    NotSent,
    CheckedIn(String),
    CheckedOut(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManualVisitDetail {
    pub id: String,
    pub note: String,
    pub note_focused: bool,
    pub status: ManualStatusLine,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VisitDetail {
    Order(OrderDetail),
    Manual(ManualVisitDetail),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceRow {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MainScreen {
    pub tab: TabSelection,
    pub device_id: String,
    pub publishable_key: String,
    pub driver_id: String,
    pub network_available: bool,
    pub refreshing: bool,
    pub can_add_manual_visit: bool,
    pub detail: Option<VisitDetail>,
    pub pending: Vec<OrderHeader>,
    pub visited: Vec<OrderHeader>,
    pub completed: Vec<OrderHeader>,
    pub canceled: Vec<OrderHeader>,
    pub map: Vec<MapPin>,
    pub places: Vec<PlaceRow>,
    pub summary_distance_meters: Option<u32>,
}

// --- Flow state -> screen ---

#[must_use]
pub fn from_model(model: &Model) -> Screen {
    match &model.flow {
        AppFlow::Created | AppFlow::Launching(_) | AppFlow::FirstRun { .. } => Screen::Loading,
        AppFlow::NoMotionServices => Screen::Blocker(Blocker::NoMotionServices),
        AppFlow::SignUp(state) => sign_up_screen(state),
        AppFlow::SignIn(state) => Screen::SignIn(sign_in_screen(state)),
        AppFlow::DriverId(flow) => Screen::DriverId(DriverIdScreen {
            driver_id: flow
                .driver_id
                .as_ref()
                .map(|d| d.as_str().to_owned())
                .unwrap_or_default(),
            button_disabled: flow.driver_id.is_none(),
        }),
        AppFlow::Main(main) => {
            if let Some(blocker) = main_blocker(
                main.permissions.location,
                main.permissions.location_accuracy,
                main.permissions.motion,
                main.push_status,
                main.tracking,
                &main.device_id.to_string(),
            ) {
                return Screen::Blocker(blocker);
            }

            let orders = main.visits.orders();
            let manual = main.visits.manual_visits();
            let p = partition(orders.iter().cloned());

            let mut pending: Vec<OrderHeader> = Vec::new();
            let mut visited: Vec<OrderHeader> = Vec::new();
            let mut completed: Vec<OrderHeader> = Vec::new();

            for visit in &manual {
                let header = OrderHeader {
                    id: visit.id.to_string(),
                    title: manual_title(visit),
                };
                match visit.status {
                    ManualVisitStatus::NotSent => pending.push(header),
                    ManualVisitStatus::CheckedIn { .. } => visited.push(header),
                    ManualVisitStatus::CheckedOut { .. } => completed.push(header),
                }
            }
            pending.extend(p.pending.iter().map(order_header));
            visited.extend(p.visited.iter().map(order_header));
            completed.extend(p.completed.iter().map(order_header));
            let canceled: Vec<OrderHeader> = p.canceled.iter().map(order_header).collect();

            let detail = main
                .visits
                .selected_order()
                .map(|order| VisitDetail::Order(order_detail(order)))
                .or_else(|| {
                    main.visits
                        .selected_manual()
                        .map(|visit| VisitDetail::Manual(manual_detail(visit)))
                });

            let map = orders
                .iter()
                .map(|order| MapPin {
                    id: order.id.as_str().to_owned(),
                    lat: order.location.lat(),
                    lng: order.location.lng(),
                    category: order.geotag.category(),
                })
                .collect();

            let mut places: Vec<PlaceRow> = main
                .places
                .iter()
                .map(|place| PlaceRow {
                    id: place.id.as_str().to_owned(),
                    title: place
                        .address
                        .as_ref()
                        .map_or_else(|| place.id.as_str().to_owned(), |a| {
                            a.display_line().to_owned()
                        }),
                })
                .collect();
            places.sort_by(|a, b| a.title.cmp(&b.title));

            Screen::Main(MainScreen {
                tab: main.tab,
                device_id: main.device_id.as_str().to_owned(),
                publishable_key: main.publishable_key.as_str().to_owned(),
                driver_id: main.driver_id.as_str().to_owned(),
                network_available: model.network_online,
                refreshing: main.requests.orders == RequestStatus::InFlight,
                can_add_manual_visit: main.visits.mode() == crate::model::ManualVisitsMode::Show,
                detail,
                pending,
                visited,
                completed,
                canceled,
                map,
                places,
                summary_distance_meters: main.history.as_ref().map(|h| h.distance_meters),
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn main_blocker(
    location: LocationPermission,
    accuracy: LocationAccuracy,
    motion: MotionPermission,
    push: PushStatus,
    tracking: TrackingStatus,
    device_id: &str,
) -> Option<Blocker> {
    // Ordered overrides: the first unmet requirement names the screen.
    match location {
        LocationPermission::Disabled => return Some(Blocker::LocationDisabled),
        LocationPermission::Denied => return Some(Blocker::LocationDenied),
        LocationPermission::Restricted => return Some(Blocker::LocationRestricted),
        LocationPermission::NotDetermined => return Some(Blocker::LocationNotDetermined),
        LocationPermission::Authorized => {}
    }
    if accuracy == LocationAccuracy::Reduced {
        return Some(Blocker::LocationReduced);
    }
    match motion {
        MotionPermission::Disabled => return Some(Blocker::MotionDisabled),
        MotionPermission::Denied => return Some(Blocker::MotionDenied),
        MotionPermission::NotDetermined => return Some(Blocker::MotionNotDetermined),
        MotionPermission::Authorized => {}
    }
    match push {
        PushStatus::DialogSplash(DialogStatus::NotShown | DialogStatus::WaitingForUserAction) => {
            return Some(Blocker::PushNotShown)
        }
        PushStatus::DialogSplash(DialogStatus::Shown) => {}
    }
    match tracking {
        TrackingStatus::Deleted => Some(Blocker::Deleted {
            device_id: device_id.to_owned(),
        }),
        TrackingStatus::InvalidPublishableKey => Some(Blocker::InvalidPublishableKey {
            device_id: device_id.to_owned(),
        }),
        TrackingStatus::Stopped => Some(Blocker::Stopped),
        TrackingStatus::Running => None,
    }
}

fn sign_up_screen(state: &SignUpState) -> Screen {
    match state {
        SignUpState::Form(form) => Screen::SignUpForm(SignUpFormScreen {
            name: form.name.as_ref().map(|n| n.as_str().to_owned()).unwrap_or_default(),
            email: form.email.as_ref().map(|e| e.as_str().to_owned()).unwrap_or_default(),
            password: form
                .password
                .as_ref()
                .map(|p| p.expose().to_owned())
                .unwrap_or_default(),
            focus: form.focus,
            form_is_valid: form.is_complete(),
            error: form.error.clone().unwrap_or_default(),
        }),
        SignUpState::Questions { status, .. } => match status {
            QuestionsStatus::Answering {
                business_manages,
                manages_for,
                error,
            } => Screen::SignUpQuestions(SignUpQuestionsScreen {
                business_manages: *business_manages,
                manages_for: *manages_for,
                signing_up: false,
                error: error.clone().unwrap_or_default(),
            }),
            QuestionsStatus::SigningUp {
                business_manages,
                manages_for,
            } => Screen::SignUpQuestions(SignUpQuestionsScreen {
                business_manages: Some(*business_manages),
                manages_for: Some(*manages_for),
                signing_up: true,
                error: String::new(),
            }),
        },
        SignUpState::Verification { verification, .. } => {
            Screen::SignUpVerification(verification_screen(verification))
        }
    }
}

fn verification_screen(verification: &Verification) -> SignUpVerificationScreen {
    let mut fields: [String; 6] = Default::default();
    match verification {
        Verification::Entering { entry, focused, error } => {
            let digits = entry.digits();
            for (field, digit) in fields.iter_mut().zip(digits.iter()) {
                *field = digit.value().to_string();
            }
            #[allow(clippy::cast_possible_truncation)]
            let cursor = digits.len() as u8;
            SignUpVerificationScreen {
                fields,
                focused_field: focused.then_some(cursor),
                verifying: false,
                error: error.clone().unwrap_or_default(),
            }
        }
        Verification::Entered { code, request } => {
            for (field, digit) in fields.iter_mut().zip(code.0.iter()) {
                *field = digit.value().to_string();
            }
            let (focused_field, verifying, error) = match request {
                VerificationRequest::InFlight => (None, true, String::new()),
                VerificationRequest::NotSent { focused, error } => (
                    focused.then_some(5),
                    false,
                    error.clone().unwrap_or_default(),
                ),
            };
            SignUpVerificationScreen {
                fields,
                focused_field,
                verifying,
                error,
            }
        }
    }
}

fn sign_in_screen(state: &SignInState) -> SignInScreen {
    match state {
        SignInState::Editing {
            email,
            password,
            focus,
            error,
            ..
        } => SignInScreen {
            email: email.as_ref().map(|e| e.as_str().to_owned()).unwrap_or_default(),
            password: password
                .as_ref()
                .map(|p| p.expose().to_owned())
                .unwrap_or_default(),
            button: if email.is_some() && password.is_some() {
                SignInButton::Normal
            } else {
                SignInButton::Disabled
            },
            focus: *focus,
            signing_in: false,
            error: error.clone().unwrap_or_default(),
        },
        SignInState::SigningIn { email, password } => SignInScreen {
            email: email.as_str().to_owned(),
            password: password.expose().to_owned(),
            button: SignInButton::Destructive,
            focus: None,
            signing_in: true,
            error: String::new(),
        },
    }
}

fn order_header(order: &Order) -> OrderHeader {
    OrderHeader {
        id: order.id.as_str().to_owned(),
        title: order_title(order),
    }
}

fn order_title(order: &Order) -> String {
    order.address.as_ref().map_or_else(
        || format!("Order @ {}", format_time(order.created_at)),
        |address| address.display_line().to_owned(),
    )
}

fn manual_title(visit: &ManualVisit) -> String {
    format!("Visit @ {}", format_time(visit.created_at))
}

fn order_detail(order: &Order) -> OrderDetail {
    let status = match &order.geotag {
        Geotag::NotSent => OrderStatusLine::NotSent,
        Geotag::PickedUp => OrderStatusLine::PickedUp,
        Geotag::Entered { at } => OrderStatusLine::Entered(format_time(*at)),
        Geotag::Visited {
            entered_at,
            exited_at,
        } => OrderStatusLine::Visited(format_span(*entered_at, *exited_at)),
        Geotag::CheckedOut { visited, at } => OrderStatusLine::CheckedOut {
            visited: visited.map(format_visited),
            completed: format_time(*at),
        },
        Geotag::Cancelled { visited, at } => OrderStatusLine::Canceled {
            visited: visited.map(format_visited),
            canceled: format_time(*at),
        },
    };

    OrderDetail {
        id: order.id.as_str().to_owned(),
        title: order_title(order),
        address: order
            .address
            .as_ref()
            .and_then(|a| a.full().map(|f| f.as_str().to_owned()))
            .or_else(|| order.address.as_ref().map(|a| a.display_line().to_owned()))
            .unwrap_or_default(),
        lat: order.location.lat(),
        lng: order.location.lng(),
        metadata: order
            .metadata
            .as_ref()
            .map(|m| {
                m.entries()
                    .map(|(key, value)| MetadataRow {
                        key: key.as_str().to_owned(),
                        value: value.as_str().to_owned(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        note: order.note.as_ref().map(|n| n.as_str().to_owned()).unwrap_or_default(),
        note_focused: order.note_focused,
        status,
        can_cancel: !order.geotag.is_terminal(),
    }
}

fn manual_detail(visit: &ManualVisit) -> ManualVisitDetail {
    let status = match visit.status {
        ManualVisitStatus::NotSent => ManualStatusLine::NotSent,
        ManualVisitStatus::CheckedIn { at } => ManualStatusLine::CheckedIn(format_time(at)),
        ManualVisitStatus::CheckedOut {
            entered_at,
            exited_at,
        } => ManualStatusLine::CheckedOut(format_span(entered_at, exited_at)),
    };
    ManualVisitDetail {
        id: visit.id.to_string(),
        note: visit.note.as_ref().map(|n| n.as_str().to_owned()).unwrap_or_default(),
        note_focused: visit.note_focused,
        status,
    }
}

fn format_visited(visited: VisitedInfo) -> String {
    match visited {
        VisitedInfo::Entered { at } => format_time(at),
        VisitedInfo::Visited {
            entered_at,
            exited_at,
        } => format_span(entered_at, exited_at),
    }
}

fn format_span(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    format!("{} - {}", format_time(from), format_time(to))
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%l:%M %p").to_string().trim_start().to_owned()
}

// --- Screen actions -> flow events ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScreenAction {
    SignUpForm(SignUpFormAction),
    SignUpQuestions(QuestionsAction),
    SignUpVerification(VerificationAction),
    SignIn(SignInAction),
    DriverId(DriverIdAction),
    Blocker(BlockerAction),
    Orders(OrdersAction),
    Order(OrderDetailAction),
    Tab(TabSelection),
    Map(MapAction),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignUpFormAction {
    NameChanged(String),
    EmailChanged(String),
    PasswordChanged(String),
    NameTapped,
    EmailTapped,
    PasswordTapped,
    TappedOutsideFocus,
    NextTapped,
    SignInTapped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum QuestionsAction {
    BusinessManagesChanged(Option<BusinessManages>),
    ManagesForChanged(Option<ManagesFor>),
    AcceptTapped,
    BackTapped,
    CancelSignUpTapped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VerificationAction {
    DigitEntered(char),
    BackspacePressed,
    FieldsTapped,
    TappedOutsideFocus,
    ResendTapped,
    SignInTapped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignInAction {
    EmailChanged(String),
    PasswordChanged(String),
    EmailTapped,
    PasswordTapped,
    TappedOutsideFocus,
    SignInTapped,
    CancelTapped,
    SignUpTapped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DriverIdAction {
    DriverIdChanged(String),
    NextTapped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BlockerAction {
    DeletedTapped,
    InvalidPublishableKeyTapped,
    StoppedTapped,
    LocationDeniedTapped,
    LocationDisabledTapped,
    LocationNotDeterminedTapped,
    LocationRestrictedTapped,
    LocationReducedTapped,
    MotionDeniedTapped,
    MotionDisabledTapped,
    MotionNotDeterminedTapped,
    PushNotShownTapped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrdersAction {
    OrderTapped(String),
    ManualVisitTapped(String),
    AddVisitTapped,
    RefreshTapped,
    ClockOutTapped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrderDetailAction {
    BackTapped,
    PickedUpTapped,
    CheckOutTapped,
    CancelTapped,
    CheckInManualTapped,
    CheckOutManualTapped,
    NoteChanged(String),
    NoteTapped,
    NoteSubmitted,
    TappedOutsideFocus,
    MapTapped,
    CopyTextPressed(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MapAction {
    OrderTapped(String),
}

/// Translate a presentation action to a flow event. Partial: actions
/// with unusable payloads translate to nothing.
#[must_use]
pub fn to_event(action: ScreenAction) -> Option<Event> {
    let event = match action {
        ScreenAction::SignUpForm(action) => match action {
            SignUpFormAction::NameChanged(name) => {
                Event::BusinessNameChanged(BusinessName::new(name).ok())
            }
            SignUpFormAction::EmailChanged(email) => Event::EmailChanged(Email::new(email).ok()),
            SignUpFormAction::PasswordChanged(password) => {
                Event::PasswordChanged(Password::new(password).ok())
            }
            SignUpFormAction::NameTapped => Event::FocusBusinessName,
            SignUpFormAction::EmailTapped => Event::FocusEmail,
            SignUpFormAction::PasswordTapped => Event::FocusPassword,
            SignUpFormAction::TappedOutsideFocus => Event::DismissFocus,
            SignUpFormAction::NextTapped => Event::CompleteSignUpForm,
            SignUpFormAction::SignInTapped => Event::GoToSignIn,
        },
        ScreenAction::SignUpQuestions(action) => match action {
            QuestionsAction::BusinessManagesChanged(value) => Event::BusinessManagesChanged(value),
            QuestionsAction::ManagesForChanged(value) => Event::ManagesForChanged(value),
            QuestionsAction::AcceptTapped => Event::SignUpTapped,
            QuestionsAction::BackTapped => Event::GoToSignUp,
            QuestionsAction::CancelSignUpTapped => Event::CancelSignUp,
        },
        ScreenAction::SignUpVerification(action) => match action {
            VerificationAction::DigitEntered(c) => {
                Event::VerificationDigitEntered(Digit::from_char(c).ok()?)
            }
            VerificationAction::BackspacePressed => Event::VerificationBackspace,
            VerificationAction::FieldsTapped => Event::FocusVerification,
            VerificationAction::TappedOutsideFocus => Event::DismissFocus,
            VerificationAction::ResendTapped => Event::ResendVerificationCode,
            VerificationAction::SignInTapped => Event::GoToSignIn,
        },
        ScreenAction::SignIn(action) => match action {
            SignInAction::EmailChanged(email) => Event::EmailChanged(Email::new(email).ok()),
            SignInAction::PasswordChanged(password) => {
                Event::PasswordChanged(Password::new(password).ok())
            }
            SignInAction::EmailTapped => Event::FocusEmail,
            SignInAction::PasswordTapped => Event::FocusPassword,
            SignInAction::TappedOutsideFocus => Event::DismissFocus,
            SignInAction::SignInTapped => Event::SignInTapped,
            SignInAction::CancelTapped => Event::CancelSignIn,
            SignInAction::SignUpTapped => Event::GoToSignUp,
        },
        ScreenAction::DriverId(action) => match action {
            DriverIdAction::DriverIdChanged(id) => Event::DriverIdChanged(DriverID::new(id).ok()),
            DriverIdAction::NextTapped => Event::SubmitDriverId,
        },
        ScreenAction::Blocker(action) => match action {
            BlockerAction::DeletedTapped
            | BlockerAction::InvalidPublishableKeyTapped
            | BlockerAction::StoppedTapped => Event::StartTracking,
            BlockerAction::LocationDeniedTapped
            | BlockerAction::LocationDisabledTapped
            | BlockerAction::LocationRestrictedTapped
            | BlockerAction::LocationReducedTapped
            | BlockerAction::MotionDeniedTapped
            | BlockerAction::MotionDisabledTapped => Event::OpenSettings,
            BlockerAction::LocationNotDeterminedTapped => Event::RequestLocationPermissions,
            BlockerAction::MotionNotDeterminedTapped => Event::RequestMotionPermissions,
            BlockerAction::PushNotShownTapped => Event::RequestPushAuthorization,
        },
        ScreenAction::Orders(action) => match action {
            OrdersAction::OrderTapped(id) => Event::SelectOrder(OrderId::new(id).ok()?),
            OrdersAction::ManualVisitTapped(id) => {
                let id = uuid::Uuid::parse_str(&id).ok()?;
                Event::SelectManualVisit(VisitId(id))
            }
            OrdersAction::AddVisitTapped => Event::AddManualVisit,
            OrdersAction::RefreshTapped => Event::UpdateOrders,
            OrdersAction::ClockOutTapped => Event::StopTracking,
        },
        ScreenAction::Order(action) => match action {
            OrderDetailAction::BackTapped => Event::DeselectOrder,
            OrderDetailAction::PickedUpTapped => Event::PickUpOrder,
            OrderDetailAction::CheckOutTapped => Event::CheckOutOrder,
            OrderDetailAction::CancelTapped => Event::CancelOrder,
            OrderDetailAction::CheckInManualTapped => Event::CheckInManualVisit,
            OrderDetailAction::CheckOutManualTapped => Event::CheckOutManualVisit,
            OrderDetailAction::NoteChanged(note) => {
                Event::OrderNoteChanged(OrderNote::new(note).ok())
            }
            OrderDetailAction::NoteTapped => Event::FocusOrderNote,
            OrderDetailAction::NoteSubmitted | OrderDetailAction::TappedOutsideFocus => {
                Event::DismissFocus
            }
            OrderDetailAction::MapTapped => Event::OpenAppleMaps,
            OrderDetailAction::CopyTextPressed(text) => Event::CopyToPasteboard(text),
        },
        ScreenAction::Tab(tab) => Event::SwitchTab(tab),
        ScreenAction::Map(MapAction::OrderTapped(id)) => {
            Event::SelectOrder(OrderId::new(id).ok()?)
        }
    };
    Some(event)
}
