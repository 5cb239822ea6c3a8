//! Application state: validated value types, the flow sum type, and the
//! visits collection.
//!
//! Every variant of [`AppFlow`] carries named fields. Exactly one
//! variant is live at a time and the presentation layer derives a
//! screen from every reachable combination.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::deep_link::DeepLinkWait;
use crate::geo::{Address, Coordinate};
use crate::order::Order;

#[derive(Clone, Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
    #[error("invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("not a digit: {0}")]
    NotADigit(char),
}

// --- Non-empty string wrappers ---

macro_rules! non_empty_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
                let s = s.into();
                if s.is_empty() {
                    return Err(ValidationError::Empty {
                        field: stringify!($name),
                    });
                }
                Ok(Self(s))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

non_empty_string!(PublishableKey);
non_empty_string!(DriverID);
non_empty_string!(DeviceID);
non_empty_string!(Email);
non_empty_string!(BusinessName);
non_empty_string!(OrderId);
non_empty_string!(TripId);
non_empty_string!(PlaceId);
non_empty_string!(OrderNote);
non_empty_string!(Street);
non_empty_string!(FullAddress);
non_empty_string!(MetaName);
non_empty_string!(MetaContents);

// --- Secrets: redact Debug, zeroize on Drop ---

macro_rules! secret_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(try_from = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
                let s = s.into();
                if s.is_empty() {
                    return Err(ValidationError::Empty {
                        field: stringify!($name),
                    });
                }
                Ok(Self(s))
            }

            #[must_use]
            pub fn expose(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("[REDACTED]")
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.0.zeroize();
            }
        }
    };
}

secret_string!(Password);
secret_string!(Token);

// --- Verification code entry ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digit(u8);

impl Digit {
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 9 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn from_char(c: char) -> Result<Self, ValidationError> {
        c.to_digit(10)
            .map(|d| {
                #[allow(clippy::cast_possible_truncation)]
                Self(d as u8)
            })
            .ok_or(ValidationError::NotADigit(c))
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCode(pub [Digit; 6]);

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in self.0 {
            write!(f, "{}", digit.value())?;
        }
        Ok(())
    }
}

/// Partial code entry: a shift register of at most five digits. The
/// sixth entry completes the code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry(Vec<Digit>);

pub enum EntryProgress {
    Partial(CodeEntry),
    Complete(VerificationCode),
}

impl CodeEntry {
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn digits(&self) -> &[Digit] {
        &self.0
    }

    #[must_use]
    pub fn push(mut self, digit: Digit) -> EntryProgress {
        self.0.push(digit);
        if self.0.len() == 6 {
            let code = [
                self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
            ];
            EntryProgress::Complete(VerificationCode(code))
        } else {
            EntryProgress::Partial(self)
        }
    }

    /// Deleting from an empty entry is a no-op.
    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// The five leading digits of a completed code, for the backspace
    /// that reopens an entered code.
    #[must_use]
    pub fn reopened(code: VerificationCode) -> Self {
        Self(code.0[..5].to_vec())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verification {
    Entering {
        entry: CodeEntry,
        focused: bool,
        error: Option<String>,
    },
    Entered {
        code: VerificationCode,
        request: VerificationRequest,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationRequest {
    InFlight,
    NotSent { focused: bool, error: Option<String> },
}

// --- Sign up ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormFocus {
    Name,
    Email,
    Password,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignUpForm {
    pub name: Option<BusinessName>,
    pub email: Option<Email>,
    pub password: Option<Password>,
    pub focus: Option<FormFocus>,
    pub error: Option<String>,
}

impl SignUpForm {
    /// Aggregate validity, recomputed on every field edit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.email.is_some() && self.password.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessManages {
    Deliveries,
    Visits,
    Rides,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagesFor {
    MyFleet,
    MyCustomersFleet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum QuestionsStatus {
    Answering {
        business_manages: Option<BusinessManages>,
        manages_for: Option<ManagesFor>,
        error: Option<String>,
    },
    SigningUp {
        business_manages: BusinessManages,
        manages_for: ManagesFor,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignUpState {
    Form(SignUpForm),
    Questions {
        name: BusinessName,
        email: Email,
        password: Password,
        status: QuestionsStatus,
    },
    Verification {
        email: Email,
        password: Password,
        verification: Verification,
    },
}

// --- Sign in ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialFocus {
    Email,
    Password,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignInState {
    Editing {
        email: Option<Email>,
        password: Option<Password>,
        focus: Option<CredentialFocus>,
        error: Option<String>,
        deep_link: DeepLinkWait,
    },
    SigningIn {
        email: Email,
        password: Password,
    },
}

// --- Driver ID entry ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverIdFlow {
    pub driver_id: Option<DriverID>,
    pub publishable_key: PublishableKey,
    pub manual_visits: Option<ManualVisitsMode>,
    pub deep_link: DeepLinkWait,
}

// --- Shared main-flow snapshots ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualVisitsMode {
    Show,
    Hide,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabSelection {
    #[default]
    Visits,
    Map,
    Summary,
    Places,
    Profile,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Experience {
    FirstRun,
    #[default]
    Regular,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogStatus {
    Shown,
    NotShown,
    WaitingForUserAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushStatus {
    DialogSplash(DialogStatus),
}

impl Default for PushStatus {
    fn default() -> Self {
        Self::DialogSplash(DialogStatus::NotShown)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationAccuracy {
    Full,
    Reduced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationPermission {
    Authorized,
    Denied,
    Disabled,
    NotDetermined,
    Restricted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionPermission {
    Authorized,
    Denied,
    Disabled,
    NotDetermined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub location_accuracy: LocationAccuracy,
    pub location: LocationPermission,
    pub motion: MotionPermission,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            location_accuracy: LocationAccuracy::Full,
            location: LocationPermission::NotDetermined,
            motion: MotionPermission::NotDetermined,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStatus {
    Running,
    Stopped,
    Deleted,
    InvalidPublishableKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdkStatus {
    Locked,
    Unlocked {
        device_id: DeviceID,
        tracking: TrackingStatus,
    },
}

/// One SDK status emission: lock state plus the permission snapshot it
/// was observed with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkStatusUpdate {
    pub status: SdkStatus,
    pub permissions: Permissions,
}

// --- Manual visits ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisitId(pub Uuid);

impl VisitId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualVisitStatus {
    NotSent,
    CheckedIn {
        at: DateTime<Utc>,
    },
    CheckedOut {
        entered_at: DateTime<Utc>,
        exited_at: DateTime<Utc>,
    },
}

/// A visit the driver created on the device, as opposed to a
/// backend-assigned order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManualVisit {
    pub id: VisitId,
    pub created_at: DateTime<Utc>,
    pub note: Option<OrderNote>,
    pub note_focused: bool,
    pub status: ManualVisitStatus,
}

impl ManualVisit {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: VisitId::generate(),
            created_at: now,
            note: None,
            note_focused: false,
            status: ManualVisitStatus::NotSent,
        }
    }
}

impl PartialEq for ManualVisit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ManualVisit {}

impl std::hash::Hash for ManualVisit {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An element of the mixed collection: manual visit or assigned order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisitItem {
    Manual(ManualVisit),
    Order(Order),
}

impl VisitItem {
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Order(order) => Some(order),
            Self::Manual(_) => None,
        }
    }

    fn same_order(&self, id: &OrderId) -> bool {
        matches!(self, Self::Order(order) if order.id == *id)
    }
}

// --- The visits collection ---

/// Backend-only or mixed visits, with the open item held apart from
/// the collection so no id is rendered twice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Visits {
    Assigned(HashSet<Order>),
    AssignedSelected {
        selected: Box<Order>,
        others: HashSet<Order>,
    },
    Mixed(HashSet<VisitItem>),
    MixedSelected {
        selected: Box<VisitItem>,
        others: HashSet<VisitItem>,
    },
}

impl Visits {
    #[must_use]
    pub fn empty(mode: ManualVisitsMode) -> Self {
        match mode {
            ManualVisitsMode::Show => Self::Mixed(HashSet::new()),
            ManualVisitsMode::Hide => Self::Assigned(HashSet::new()),
        }
    }

    #[must_use]
    pub fn mode(&self) -> ManualVisitsMode {
        match self {
            Self::Assigned(_) | Self::AssignedSelected { .. } => ManualVisitsMode::Hide,
            Self::Mixed(_) | Self::MixedSelected { .. } => ManualVisitsMode::Show,
        }
    }

    /// All orders, including a selected one.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        match self {
            Self::Assigned(orders) => orders.iter().cloned().collect(),
            Self::AssignedSelected { selected, others } => {
                let mut all: Vec<Order> = others.iter().cloned().collect();
                all.push((**selected).clone());
                all
            }
            Self::Mixed(items) => items.iter().filter_map(VisitItem::order).cloned().collect(),
            Self::MixedSelected { selected, others } => {
                let mut all: Vec<Order> = others
                    .iter()
                    .filter_map(VisitItem::order)
                    .cloned()
                    .collect();
                if let VisitItem::Order(order) = selected.as_ref() {
                    all.push(order.clone());
                }
                all
            }
        }
    }

    #[must_use]
    pub fn manual_visits(&self) -> Vec<ManualVisit> {
        match self {
            Self::Assigned(_) | Self::AssignedSelected { .. } => Vec::new(),
            Self::Mixed(items) => items
                .iter()
                .filter_map(|i| match i {
                    VisitItem::Manual(visit) => Some(visit.clone()),
                    VisitItem::Order(_) => None,
                })
                .collect(),
            Self::MixedSelected { selected, others } => {
                let mut all: Vec<ManualVisit> = others
                    .iter()
                    .filter_map(|i| match i {
                        VisitItem::Manual(visit) => Some(visit.clone()),
                        VisitItem::Order(_) => None,
                    })
                    .collect();
                if let VisitItem::Manual(visit) = selected.as_ref() {
                    all.push(visit.clone());
                }
                all
            }
        }
    }

    #[must_use]
    pub fn selected_order(&self) -> Option<&Order> {
        match self {
            Self::AssignedSelected { selected, .. } => Some(selected),
            Self::MixedSelected { selected, .. } => selected.order(),
            Self::Assigned(_) | Self::Mixed(_) => None,
        }
    }

    #[must_use]
    pub fn selected_order_mut(&mut self) -> Option<&mut Order> {
        match self {
            Self::AssignedSelected { selected, .. } => Some(selected),
            Self::MixedSelected { selected, .. } => match selected.as_mut() {
                VisitItem::Order(order) => Some(order),
                VisitItem::Manual(_) => None,
            },
            Self::Assigned(_) | Self::Mixed(_) => None,
        }
    }

    #[must_use]
    pub fn selected_manual(&self) -> Option<&ManualVisit> {
        match self {
            Self::MixedSelected { selected, .. } => match selected.as_ref() {
                VisitItem::Manual(visit) => Some(visit),
                VisitItem::Order(_) => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn selected_manual_mut(&mut self) -> Option<&mut ManualVisit> {
        match self {
            Self::MixedSelected { selected, .. } => match selected.as_mut() {
                VisitItem::Manual(visit) => Some(visit),
                VisitItem::Order(_) => None,
            },
            _ => None,
        }
    }

    /// Open the order with the given id. A previous selection returns
    /// to the collection first; an unknown id leaves state unchanged.
    pub fn select(&mut self, id: &OrderId) {
        self.deselect();
        match self {
            Self::Assigned(orders) => {
                if let Some(order) = orders.iter().find(|o| o.id == *id).cloned() {
                    orders.remove(&order);
                    *self = Self::AssignedSelected {
                        selected: Box::new(order),
                        others: std::mem::take(orders),
                    };
                }
            }
            Self::Mixed(items) => {
                if let Some(item) = items.iter().find(|i| i.same_order(id)).cloned() {
                    items.remove(&item);
                    *self = Self::MixedSelected {
                        selected: Box::new(item),
                        others: std::mem::take(items),
                    };
                }
            }
            Self::AssignedSelected { .. } | Self::MixedSelected { .. } => {}
        }
    }

    pub fn select_manual(&mut self, id: VisitId) {
        self.deselect();
        if let Self::Mixed(items) = self {
            let found = items
                .iter()
                .find(|i| matches!(i, VisitItem::Manual(v) if v.id == id))
                .cloned();
            if let Some(item) = found {
                items.remove(&item);
                *self = Self::MixedSelected {
                    selected: Box::new(item),
                    others: std::mem::take(items),
                };
            }
        }
    }

    pub fn deselect(&mut self) {
        match self {
            Self::AssignedSelected { selected, others } => {
                let mut orders = std::mem::take(others);
                let mut order = (**selected).clone();
                order.note_focused = false;
                orders.insert(order);
                *self = Self::Assigned(orders);
            }
            Self::MixedSelected { selected, others } => {
                let mut items = std::mem::take(others);
                let mut item = (**selected).clone();
                match &mut item {
                    VisitItem::Order(order) => order.note_focused = false,
                    VisitItem::Manual(visit) => visit.note_focused = false,
                }
                items.insert(item);
                *self = Self::Mixed(items);
            }
            Self::Assigned(_) | Self::Mixed(_) => {}
        }
    }

    /// Replace the selected order in place, reinserting under the new
    /// value. Used by lifecycle transitions on the open order.
    pub fn replace_selected_order(&mut self, order: Order) {
        match self {
            Self::AssignedSelected { selected, .. } => *selected = Box::new(order),
            Self::MixedSelected { selected, .. } => {
                if matches!(selected.as_ref(), VisitItem::Order(_)) {
                    *selected = Box::new(VisitItem::Order(order));
                }
            }
            Self::Assigned(_) | Self::Mixed(_) => {}
        }
    }

    /// Convert between representations. Lossless for the order subset;
    /// manual visits are dropped when hiding. A selection survives
    /// when the selected item exists in the target representation.
    #[must_use]
    pub fn converted(self, mode: ManualVisitsMode) -> Self {
        if self.mode() == mode {
            return self;
        }
        match (self, mode) {
            (Self::Assigned(orders), ManualVisitsMode::Show) => {
                Self::Mixed(orders.into_iter().map(VisitItem::Order).collect())
            }
            (Self::AssignedSelected { selected, others }, ManualVisitsMode::Show) => {
                Self::MixedSelected {
                    selected: Box::new(VisitItem::Order(*selected)),
                    others: others.into_iter().map(VisitItem::Order).collect(),
                }
            }
            (Self::Mixed(items), ManualVisitsMode::Hide) => Self::Assigned(
                items
                    .into_iter()
                    .filter_map(|i| match i {
                        VisitItem::Order(order) => Some(order),
                        VisitItem::Manual(_) => None,
                    })
                    .collect(),
            ),
            (Self::MixedSelected { selected, others }, ManualVisitsMode::Hide) => {
                let others: HashSet<Order> = others
                    .into_iter()
                    .filter_map(|i| match i {
                        VisitItem::Order(order) => Some(order),
                        VisitItem::Manual(_) => None,
                    })
                    .collect();
                match *selected {
                    VisitItem::Order(order) => Self::AssignedSelected {
                        selected: Box::new(order),
                        others,
                    },
                    VisitItem::Manual(_) => Self::Assigned(others),
                }
            }
            (same, _) => same,
        }
    }

    /// Merge a freshly fetched order set. Orders already known keep
    /// their local lifecycle state and note; unknown ids are added;
    /// ids the backend no longer reports are dropped. The selection is
    /// refreshed by id and dropped when its id disappears.
    pub fn merge_orders(&mut self, incoming: HashSet<Order>) {
        let known: Vec<Order> = self.orders();
        let merged: HashSet<Order> = incoming
            .into_iter()
            .map(|mut fresh| {
                if let Some(local) = known.iter().find(|o| o.id == fresh.id) {
                    fresh.geotag = local.geotag.clone();
                    fresh.note = local.note.clone();
                    fresh.note_focused = local.note_focused;
                }
                fresh
            })
            .collect();

        match std::mem::replace(self, Self::Assigned(HashSet::new())) {
            Self::Assigned(_) => *self = Self::Assigned(merged),
            Self::AssignedSelected { selected, .. } => {
                let id = selected.id.clone();
                *self = Self::Assigned(merged);
                self.select(&id);
            }
            Self::Mixed(items) => {
                let mut mixed: HashSet<VisitItem> = items
                    .into_iter()
                    .filter(|i| matches!(i, VisitItem::Manual(_)))
                    .collect();
                mixed.extend(merged.into_iter().map(VisitItem::Order));
                *self = Self::Mixed(mixed);
            }
            Self::MixedSelected { selected, others } => {
                let mut mixed: HashSet<VisitItem> = others
                    .into_iter()
                    .filter(|i| matches!(i, VisitItem::Manual(_)))
                    .collect();
                match *selected {
                    VisitItem::Manual(visit) => {
                        mixed.extend(merged.into_iter().map(VisitItem::Order));
                        let id = visit.id;
                        mixed.insert(VisitItem::Manual(visit));
                        *self = Self::Mixed(mixed);
                        self.select_manual(id);
                    }
                    VisitItem::Order(order) => {
                        mixed.extend(merged.into_iter().map(VisitItem::Order));
                        *self = Self::Mixed(mixed);
                        self.select(&order.id);
                    }
                }
            }
        }
    }

    /// Attach reverse-geocoded addresses, keyed by coordinate the way
    /// the geocoder reports them.
    pub fn apply_addresses(&mut self, addresses: &[(Coordinate, Option<Address>)]) {
        let resolve = |order: &mut Order| {
            if let Some((_, address)) = addresses.iter().find(|(c, _)| *c == order.location) {
                order.address = address.clone();
            }
        };
        match self {
            Self::Assigned(orders) => {
                let mut updated = std::mem::take(orders);
                let mut next: HashSet<Order> = HashSet::with_capacity(updated.len());
                for mut order in updated.drain() {
                    resolve(&mut order);
                    next.insert(order);
                }
                *orders = next;
            }
            Self::AssignedSelected { selected, others } => {
                resolve(selected);
                let mut updated = std::mem::take(others);
                let mut next: HashSet<Order> = HashSet::with_capacity(updated.len());
                for mut order in updated.drain() {
                    resolve(&mut order);
                    next.insert(order);
                }
                *others = next;
            }
            Self::Mixed(items) => {
                let mut updated = std::mem::take(items);
                let mut next: HashSet<VisitItem> = HashSet::with_capacity(updated.len());
                for mut item in updated.drain() {
                    if let VisitItem::Order(order) = &mut item {
                        resolve(order);
                    }
                    next.insert(item);
                }
                *items = next;
            }
            Self::MixedSelected { selected, others } => {
                if let VisitItem::Order(order) = selected.as_mut() {
                    resolve(order);
                }
                let mut updated = std::mem::take(others);
                let mut next: HashSet<VisitItem> = HashSet::with_capacity(updated.len());
                for mut item in updated.drain() {
                    if let VisitItem::Order(order) = &mut item {
                        resolve(order);
                    }
                    next.insert(item);
                }
                *others = next;
            }
        }
    }

    pub fn insert_manual(&mut self, visit: ManualVisit) {
        match self {
            Self::Mixed(items) => {
                items.insert(VisitItem::Manual(visit));
            }
            Self::MixedSelected { others, .. } => {
                others.insert(VisitItem::Manual(visit));
            }
            Self::Assigned(_) | Self::AssignedSelected { .. } => {}
        }
    }
}

// --- Places and history ---

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub created_at: DateTime<Utc>,
    pub location: Coordinate,
    pub address: Option<Address>,
}

impl PartialEq for Place {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Place {}

impl std::hash::Hash for Place {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A day's driving summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub distance_meters: u32,
    pub coordinates: Vec<Coordinate>,
}

// --- Request bookkeeping ---

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    Idle,
    InFlight,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requests {
    pub orders: RequestStatus,
    pub history: RequestStatus,
    pub places: RequestStatus,
}

// --- Flow ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MainFlow {
    pub visits: Visits,
    pub tab: TabSelection,
    pub places: HashSet<Place>,
    pub history: Option<History>,
    pub publishable_key: PublishableKey,
    pub driver_id: DriverID,
    pub device_id: DeviceID,
    pub tracking: TrackingStatus,
    pub permissions: Permissions,
    pub requests: Requests,
    pub token: Option<Token>,
    pub push_status: PushStatus,
    pub experience: Experience,
    pub deep_link: DeepLinkWait,
}

/// Launch fan-in: the restored state and the first SDK status emission
/// arrive in either order; the flow resolves once both are present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchState {
    pub restored: Option<Option<crate::restoration::StorageState>>,
    pub sdk: Option<SdkStatusUpdate>,
    /// Set when a restored main-screen state found the SDK locked and
    /// a re-initialization with the restored key is in flight.
    pub remaking_sdk: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AppFlow {
    Created,
    Launching(LaunchState),
    FirstRun {
        deep_link: DeepLinkWait,
    },
    NoMotionServices,
    SignUp(SignUpState),
    SignIn(SignInState),
    DriverId(DriverIdFlow),
    Main(Box<MainFlow>),
}

impl Default for AppFlow {
    fn default() -> Self {
        Self::Created
    }
}

pub struct Model {
    pub flow: AppFlow,
    pub network_online: bool,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            flow: AppFlow::Created,
            network_online: true,
        }
    }
}

// --- Core-facing contract for the request-orchestration collaborator ---

/// The tuple the request layer reads and writes back. Only available
/// while the flow is `main` with an unlocked SDK session.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub orders: Vec<Order>,
    pub selected_order: Option<OrderId>,
    pub device_id: DeviceID,
    pub publishable_key: PublishableKey,
    pub token: Option<Token>,
}

impl Model {
    #[must_use]
    pub fn request_context(&self) -> Option<RequestContext> {
        match &self.flow {
            AppFlow::Main(main) => Some(RequestContext {
                orders: main.visits.orders(),
                selected_order: main.visits.selected_order().map(|o| o.id.clone()),
                device_id: main.device_id.clone(),
                publishable_key: main.publishable_key.clone(),
                token: main.token.clone(),
            }),
            AppFlow::Created
            | AppFlow::Launching(_)
            | AppFlow::FirstRun { .. }
            | AppFlow::NoMotionServices
            | AppFlow::SignUp(_)
            | AppFlow::SignIn(_)
            | AppFlow::DriverId(_) => None,
        }
    }

    /// Write back after a request completed. Ignored outside `main`.
    pub fn apply_request_context(&mut self, context: RequestContext) {
        if let AppFlow::Main(main) = &mut self.flow {
            main.publishable_key = context.publishable_key;
            main.token = context.token;
            main.visits
                .merge_orders(context.orders.into_iter().collect());
            if let Some(id) = context.selected_order {
                main.visits.select(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_wrappers_reject_empty_input() {
        assert!(PublishableKey::new("").is_err());
        assert!(DriverID::new("d-1").is_ok());
    }

    #[test]
    fn password_debug_is_redacted() {
        let p = Password::new("hunter2").unwrap();
        assert_eq!(format!("{p:?}"), "[REDACTED]");
    }

    #[test]
    fn code_entry_completes_after_six_digits() {
        let mut entry = CodeEntry::empty();
        for value in 0..5 {
            entry = match entry.push(Digit::new(value).unwrap()) {
                EntryProgress::Partial(entry) => entry,
                EntryProgress::Complete(_) => panic!("completed early"),
            };
        }
        match entry.push(Digit::new(5).unwrap()) {
            EntryProgress::Complete(code) => assert_eq!(code.to_string(), "012345"),
            EntryProgress::Partial(_) => panic!("should be complete"),
        }
    }

    #[test]
    fn code_entry_backspace_on_empty_is_noop() {
        let mut entry = CodeEntry::empty();
        entry.pop();
        assert!(entry.digits().is_empty());
    }

    #[test]
    fn reopened_code_keeps_five_digits() {
        let code = VerificationCode([Digit::new(9).unwrap(); 6]);
        let entry = CodeEntry::reopened(code);
        assert_eq!(entry.digits().len(), 5);
    }

    #[test]
    fn selection_never_duplicates_into_collection() {
        let order = crate::order::test_support::order("o-1");
        let mut visits = Visits::Assigned([order].into_iter().collect());
        visits.select(&OrderId::new("o-1").unwrap());
        match &visits {
            Visits::AssignedSelected { selected, others } => {
                assert_eq!(selected.id.as_str(), "o-1");
                assert!(others.is_empty());
            }
            other => panic!("unexpected representation: {other:?}"),
        }
    }

    #[test]
    fn mode_switch_preserves_order_subset_and_selection() {
        let a = crate::order::test_support::order("a");
        let b = crate::order::test_support::order("b");
        let mut visits = Visits::Assigned([a, b].into_iter().collect());
        visits.select(&OrderId::new("a").unwrap());

        let mixed = visits.converted(ManualVisitsMode::Show);
        assert_eq!(mixed.orders().len(), 2);
        assert_eq!(mixed.selected_order().unwrap().id.as_str(), "a");

        let back = mixed.converted(ManualVisitsMode::Hide);
        assert_eq!(back.orders().len(), 2);
        assert_eq!(back.selected_order().unwrap().id.as_str(), "a");
    }

    #[test]
    fn merge_drops_selection_when_id_disappears() {
        let a = crate::order::test_support::order("a");
        let b = crate::order::test_support::order("b");
        let mut visits = Visits::Assigned([a].into_iter().collect());
        visits.select(&OrderId::new("a").unwrap());

        visits.merge_orders([b].into_iter().collect());
        assert!(visits.selected_order().is_none());
        assert_eq!(visits.orders().len(), 1);
    }

    #[test]
    fn merge_keeps_local_lifecycle_state() {
        use crate::order::{transition, Geotag, LifecycleEvent};

        let order = crate::order::test_support::order("a");
        let picked = transition(order.clone(), LifecycleEvent::PickUp).unwrap();
        let mut visits = Visits::Assigned([picked].into_iter().collect());

        visits.merge_orders([order].into_iter().collect());
        assert_eq!(visits.orders()[0].geotag, Geotag::PickedUp);
    }

    #[test]
    fn request_context_absent_outside_main() {
        let model = Model::default();
        assert!(model.request_context().is_none());
    }
}
