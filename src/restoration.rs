//! State restoration: a bounded subset of flow state survives app
//! restarts as a flat record under fixed, obfuscated keys.
//!
//! Decoding is defensive. A record that cannot be understood yields
//! "nothing to restore", never an error; two legacy layouts from
//! before screens were tagged are recognized explicitly.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    DialogStatus, DriverID, Email, Experience, Model, Place, PublishableKey, PushStatus,
    SignInState, SignUpState, TabSelection, AppFlow,
};
use crate::order::Order;

/// What a restart can reproduce: the screen and the data it owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StorageState {
    SignUp {
        email: Option<Email>,
    },
    SignIn {
        email: Option<Email>,
    },
    DriverId {
        driver_id: Option<DriverID>,
        publishable_key: PublishableKey,
    },
    Main {
        orders: HashSet<Order>,
        places: HashSet<Place>,
        tab: TabSelection,
        publishable_key: PublishableKey,
        driver_id: DriverID,
        push_status: PushStatus,
        experience: Experience,
    },
}

/// The flat persisted record. Field names are the storage keys; every
/// field is optional because absence is a valid signal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageRecord {
    #[serde(rename = "Zk3uQeH0Vd", skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    #[serde(rename = "tYwL7qXbPn", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "Ue5RfD2ko1", skip_serializing_if = "Option::is_none")]
    pub publishable_key: Option<String>,
    #[serde(rename = "Hq8XwObsZw", skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(rename = "nV24HKl2Tc", skip_serializing_if = "Option::is_none")]
    pub orders: Option<String>,
    #[serde(rename = "Qa0gC6vDdL", skip_serializing_if = "Option::is_none")]
    pub places: Option<String>,
    #[serde(rename = "8gVKczqt6P", skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(rename = "jF0VlWTrCc", skip_serializing_if = "Option::is_none")]
    pub push_status: Option<String>,
    #[serde(rename = "lSDhEjvtQa", skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
}

mod tags {
    pub const SIGN_UP: &str = "signUp";
    pub const SIGN_IN: &str = "signIn";
    pub const DRIVER_ID: &str = "driverID";
    // Main has carried this tag since the first tagged release.
    pub const MAIN: &str = "visits";

    pub const TAB_VISITS: &str = "visits";
    pub const TAB_MAP: &str = "map";
    pub const TAB_SUMMARY: &str = "summary";
    pub const TAB_PLACES: &str = "places";
    pub const TAB_PROFILE: &str = "profile";

    pub const PUSH_SHOWN: &str = "dialogSplashShown";
    pub const PUSH_NOT_SHOWN: &str = "dialogSplashNotShown";
    pub const PUSH_WAITING: &str = "dialogSplashWaitingForUserAction";

    pub const EXPERIENCE_FIRST_RUN: &str = "EWcvpiyTCq";
    pub const EXPERIENCE_REGULAR: &str = "wDzVjD44fJ";
}

enum ScreenTag {
    SignUp,
    SignIn,
    DriverId,
    Main,
}

// --- Encode ---

#[must_use]
pub fn encode(state: &StorageState) -> StorageRecord {
    let mut record = StorageRecord::default();
    match state {
        StorageState::SignUp { email } => {
            record.screen = Some(tags::SIGN_UP.into());
            record.email = email.as_ref().map(|e| e.as_str().to_owned());
        }
        StorageState::SignIn { email } => {
            record.screen = Some(tags::SIGN_IN.into());
            record.email = email.as_ref().map(|e| e.as_str().to_owned());
        }
        StorageState::DriverId {
            driver_id,
            publishable_key,
        } => {
            record.screen = Some(tags::DRIVER_ID.into());
            record.driver_id = driver_id.as_ref().map(|d| d.as_str().to_owned());
            record.publishable_key = Some(publishable_key.as_str().to_owned());
        }
        StorageState::Main {
            orders,
            places,
            tab,
            publishable_key,
            driver_id,
            push_status,
            experience,
        } => {
            record.screen = Some(tags::MAIN.into());
            record.orders = serde_json::to_string(orders).ok();
            record.places = serde_json::to_string(places).ok();
            record.tab = Some(encode_tab(*tab).into());
            record.publishable_key = Some(publishable_key.as_str().to_owned());
            record.driver_id = Some(driver_id.as_str().to_owned());
            record.push_status = Some(encode_push(*push_status).into());
            record.experience = Some(encode_experience(*experience).into());
        }
    }
    record
}

const fn encode_tab(tab: TabSelection) -> &'static str {
    match tab {
        TabSelection::Visits => tags::TAB_VISITS,
        TabSelection::Map => tags::TAB_MAP,
        TabSelection::Summary => tags::TAB_SUMMARY,
        TabSelection::Places => tags::TAB_PLACES,
        TabSelection::Profile => tags::TAB_PROFILE,
    }
}

const fn encode_push(status: PushStatus) -> &'static str {
    match status {
        PushStatus::DialogSplash(DialogStatus::Shown) => tags::PUSH_SHOWN,
        PushStatus::DialogSplash(DialogStatus::NotShown) => tags::PUSH_NOT_SHOWN,
        PushStatus::DialogSplash(DialogStatus::WaitingForUserAction) => tags::PUSH_WAITING,
    }
}

const fn encode_experience(experience: Experience) -> &'static str {
    match experience {
        Experience::FirstRun => tags::EXPERIENCE_FIRST_RUN,
        Experience::Regular => tags::EXPERIENCE_REGULAR,
    }
}

// --- Decode ---

/// Decode a persisted record. `None` means "nothing to restore": a
/// fresh start, never an error.
#[must_use]
pub fn decode(record: &StorageRecord) -> Option<StorageState> {
    let screen = match record.screen.as_deref() {
        None => None,
        Some(tags::SIGN_UP) => Some(ScreenTag::SignUp),
        Some(tags::SIGN_IN) => Some(ScreenTag::SignIn),
        Some(tags::DRIVER_ID) => Some(ScreenTag::DriverId),
        Some(tags::MAIN) => Some(ScreenTag::Main),
        Some(other) => {
            debug!(tag = other, "unknown screen tag, starting fresh");
            return None;
        }
    };

    let email = record.email.as_deref().and_then(|s| Email::new(s).ok());
    let publishable_key = record
        .publishable_key
        .as_deref()
        .and_then(|s| PublishableKey::new(s).ok());
    let driver_id = record
        .driver_id
        .as_deref()
        .and_then(|s| DriverID::new(s).ok());

    match (screen, publishable_key, driver_id) {
        // Legacy: an app from before screens were tagged that reached
        // the main screen. It stored only credentials.
        (None, Some(publishable_key), Some(driver_id)) => Some(StorageState::Main {
            orders: HashSet::new(),
            places: HashSet::new(),
            tab: TabSelection::default(),
            publishable_key,
            driver_id,
            push_status: PushStatus::default(),
            experience: Experience::default(),
        }),
        // Legacy: an untagged app that only reached the driver-id
        // screen.
        (None, Some(publishable_key), None) => Some(StorageState::DriverId {
            driver_id: None,
            publishable_key,
        }),
        // Fresh install, or an untagged app that never got a key.
        (None, None, _) => None,
        (Some(ScreenTag::SignUp), _, _) => Some(StorageState::SignUp { email }),
        (Some(ScreenTag::SignIn), _, _) => Some(StorageState::SignIn { email }),
        (Some(ScreenTag::DriverId), Some(publishable_key), driver_id) => {
            Some(StorageState::DriverId {
                driver_id,
                publishable_key,
            })
        }
        // A main record without credentials cannot be trusted.
        (Some(ScreenTag::Main), Some(publishable_key), Some(driver_id)) => {
            Some(StorageState::Main {
                orders: decode_blob(record.orders.as_deref()),
                places: decode_blob(record.places.as_deref()),
                tab: decode_tab(record.tab.as_deref()),
                publishable_key,
                driver_id,
                push_status: decode_push(record.push_status.as_deref()),
                experience: decode_experience(record.experience.as_deref()),
            })
        }
        _ => None,
    }
}

fn decode_blob<T: std::hash::Hash + Eq + for<'de> Deserialize<'de>>(
    blob: Option<&str>,
) -> HashSet<T> {
    blob.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn decode_tab(tab: Option<&str>) -> TabSelection {
    match tab {
        Some(tags::TAB_MAP) => TabSelection::Map,
        Some(tags::TAB_SUMMARY) => TabSelection::Summary,
        Some(tags::TAB_PLACES) => TabSelection::Places,
        Some(tags::TAB_PROFILE) => TabSelection::Profile,
        _ => TabSelection::Visits,
    }
}

fn decode_push(status: Option<&str>) -> PushStatus {
    match status {
        Some(tags::PUSH_SHOWN) => PushStatus::DialogSplash(DialogStatus::Shown),
        Some(tags::PUSH_WAITING) => PushStatus::DialogSplash(DialogStatus::WaitingForUserAction),
        _ => PushStatus::DialogSplash(DialogStatus::NotShown),
    }
}

fn decode_experience(experience: Option<&str>) -> Experience {
    match experience {
        Some(tags::EXPERIENCE_FIRST_RUN) => Experience::FirstRun,
        _ => Experience::Regular,
    }
}

// --- What the live flow persists ---

/// The durable projection of the current flow, if it has one.
#[must_use]
pub fn storage_state(model: &Model) -> Option<StorageState> {
    match &model.flow {
        AppFlow::SignUp(state) => {
            let email = match state {
                SignUpState::Form(form) => form.email.clone(),
                SignUpState::Questions { email, .. } | SignUpState::Verification { email, .. } => {
                    Some(email.clone())
                }
            };
            Some(StorageState::SignUp { email })
        }
        AppFlow::SignIn(state) => {
            let email = match state {
                SignInState::Editing { email, .. } => email.clone(),
                SignInState::SigningIn { email, .. } => Some(email.clone()),
            };
            Some(StorageState::SignIn { email })
        }
        AppFlow::DriverId(flow) => Some(StorageState::DriverId {
            driver_id: flow.driver_id.clone(),
            publishable_key: flow.publishable_key.clone(),
        }),
        AppFlow::Main(main) => Some(StorageState::Main {
            orders: main.visits.orders().into_iter().collect(),
            places: main.places.clone(),
            tab: main.tab,
            publishable_key: main.publishable_key.clone(),
            driver_id: main.driver_id.clone(),
            push_status: main.push_status,
            experience: main.experience,
        }),
        AppFlow::Created
        | AppFlow::Launching(_)
        | AppFlow::FirstRun { .. }
        | AppFlow::NoMotionServices => None,
    }
}
