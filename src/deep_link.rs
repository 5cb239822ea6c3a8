//! Deep-link reconciliation.
//!
//! A deep link races a fixed five-second timer. Whatever payload has
//! arrived when the timer fires decides whether the tracking SDK is
//! re-initialized, and with which credentials. One timer exists
//! system-wide under [`DEEP_LINK_TIMER`]; every transition into or out
//! of a wait state pairs the state change with a timer start or
//! cancel.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::capabilities::delay::DEEP_LINK_TIMER;
use crate::capabilities::Capabilities;
use crate::event::Event;
use crate::model::{
    AppFlow, DialogStatus, DriverID, DriverIdFlow, Experience, MainFlow, ManualVisitsMode, Model,
    PublishableKey, PushStatus, Requests, SdkStatus, SdkStatusUpdate, SignInState, SignUpForm,
    SignUpState, TabSelection, Visits,
};
use crate::DEEP_LINK_TIMEOUT_MS;

/// Credentials and mode hints carried by a resolved deep link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLinkPayload {
    pub publishable_key: PublishableKey,
    pub driver_id: Option<DriverID>,
    pub manual_visits: Option<ManualVisitsMode>,
}

/// Everything the SDK needs for re-initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    pub publishable_key: PublishableKey,
    pub driver_id: DriverID,
    pub manual_visits: Option<ManualVisitsMode>,
}

/// The wait state owned by whichever flow variant is live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeepLinkWait {
    #[default]
    None,
    WaitingForDeepLink,
    WaitingForTimer(DeepLinkPayload),
    WaitingForSdk(SdkConfig),
}

/// Parse a deep-link URL: the first path segment is the publishable
/// key, `driver_id` and `manual_visits` ("show"/"hide") are query
/// parameters.
#[must_use]
pub fn payload_from_url(url: &Url) -> Option<DeepLinkPayload> {
    let publishable_key = url
        .path_segments()
        .and_then(|mut segments| segments.find(|s| !s.is_empty()).map(ToOwned::to_owned))
        .and_then(|s| PublishableKey::new(s).ok())?;

    let mut driver_id = None;
    let mut manual_visits = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "driver_id" => driver_id = DriverID::new(value.as_ref()).ok(),
            "manual_visits" => {
                manual_visits = match value.as_ref() {
                    "show" => Some(ManualVisitsMode::Show),
                    "hide" => Some(ManualVisitsMode::Hide),
                    _ => None,
                };
            }
            _ => {}
        }
    }

    Some(DeepLinkPayload {
        publishable_key,
        driver_id,
        manual_visits,
    })
}

/// Subscribe to links opened while the app runs. Called once, when the
/// launch fan-in resolves.
pub fn subscribe(caps: &Capabilities) {
    caps.deep_links.subscribe(|resolved| {
        match Url::parse(&resolved).ok().as_ref().and_then(payload_from_url) {
            Some(payload) => Event::ReceivedDeepLink(payload),
            None => Event::Noop,
        }
    });
}

fn start_timer(caps: &Capabilities) {
    caps.delay
        .start(DEEP_LINK_TIMER, DEEP_LINK_TIMEOUT_MS, || {
            Event::DeepLinkTimerFired
        });
}

fn cancel_timer(caps: &Capabilities) {
    caps.delay.cancel(DEEP_LINK_TIMER);
}

fn remake_sdk(caps: &Capabilities, key: &PublishableKey) {
    debug!(publishable_key = %key, "remaking sdk");
    caps.sdk.initialize(key.clone(), Event::MadeSdk);
}

/// The platform handed us a user activity. The owning flow starts
/// waiting and the activity is forwarded to the shell resolver, which
/// answers with `ReceivedDeepLink` if the URL carries credentials.
pub fn opened(url: &str, model: &mut Model, caps: &Capabilities) {
    let started = match &mut model.flow {
        AppFlow::DriverId(flow) if flow.deep_link == DeepLinkWait::None => {
            flow.deep_link = DeepLinkWait::WaitingForDeepLink;
            true
        }
        AppFlow::SignIn(SignInState::Editing { deep_link, .. })
            if *deep_link == DeepLinkWait::None =>
        {
            *deep_link = DeepLinkWait::WaitingForDeepLink;
            true
        }
        AppFlow::Main(main) if main.deep_link == DeepLinkWait::None => {
            main.visits.deselect();
            main.deep_link = DeepLinkWait::WaitingForDeepLink;
            true
        }
        _ => false,
    };

    if started {
        start_timer(caps);
    }
    // Forward regardless: the resolver may still produce a payload a
    // later flow state can use.
    caps.deep_links.continue_activity(url.to_owned(), |resolved| {
        match Url::parse(&resolved).ok().as_ref().and_then(payload_from_url) {
            Some(payload) => Event::ReceivedDeepLink(payload),
            None => Event::Noop,
        }
    });
}

/// A resolved payload arrived. While waiting for the timer the latest
/// payload wins; the timer is never restarted by a payload.
pub fn received(payload: &DeepLinkPayload, model: &mut Model, caps: &Capabilities) {
    let wait = match &mut model.flow {
        AppFlow::FirstRun { deep_link } => Some(deep_link),
        AppFlow::DriverId(flow) => Some(&mut flow.deep_link),
        AppFlow::SignIn(SignInState::Editing { deep_link, .. }) => Some(deep_link),
        AppFlow::Main(main) => Some(&mut main.deep_link),
        _ => None,
    };
    let Some(wait) = wait else { return };

    match wait {
        DeepLinkWait::None => {
            // A link resolved without a preceding `opened` (the app was
            // cold-started by it). The race still applies.
            *wait = DeepLinkWait::WaitingForTimer(payload.clone());
            start_timer(caps);
        }
        DeepLinkWait::WaitingForDeepLink | DeepLinkWait::WaitingForTimer(_) => {
            *wait = DeepLinkWait::WaitingForTimer(payload.clone());
        }
        DeepLinkWait::WaitingForSdk(_) => {}
    }
}

/// The five-second timer fired: resolve whatever payload is pending.
pub fn timer_fired(model: &mut Model, caps: &Capabilities) {
    match &mut model.flow {
        AppFlow::FirstRun { deep_link } => match deep_link.clone() {
            DeepLinkWait::WaitingForDeepLink | DeepLinkWait::None => {
                // Fresh install and no link arrived: on to sign-up.
                cancel_timer(caps);
                model.flow = AppFlow::SignUp(SignUpState::Form(SignUpForm::default()));
            }
            DeepLinkWait::WaitingForTimer(payload) => {
                cancel_timer(caps);
                if let Some(driver_id) = payload.driver_id {
                    let config = SdkConfig {
                        publishable_key: payload.publishable_key.clone(),
                        driver_id,
                        manual_visits: payload.manual_visits,
                    };
                    *deep_link = DeepLinkWait::WaitingForSdk(config);
                    remake_sdk(caps, &payload.publishable_key);
                } else {
                    model.flow = AppFlow::DriverId(DriverIdFlow {
                        driver_id: None,
                        publishable_key: payload.publishable_key,
                        manual_visits: payload.manual_visits,
                        deep_link: DeepLinkWait::None,
                    });
                }
            }
            DeepLinkWait::WaitingForSdk(_) => {}
        },

        AppFlow::DriverId(flow) => match flow.deep_link.clone() {
            DeepLinkWait::WaitingForDeepLink => {
                flow.deep_link = DeepLinkWait::None;
                cancel_timer(caps);
            }
            DeepLinkWait::WaitingForTimer(payload) => {
                cancel_timer(caps);
                let Some(driver_id) = payload.driver_id else {
                    // No driver id: the payload's key and mode hints
                    // are discarded wholesale.
                    flow.deep_link = DeepLinkWait::None;
                    return;
                };
                let manual_visits = payload.manual_visits.or(flow.manual_visits);
                let unchanged = payload.publishable_key == flow.publishable_key
                    && flow.driver_id.as_ref() == Some(&driver_id)
                    && manual_visits == flow.manual_visits;
                if unchanged {
                    flow.deep_link = DeepLinkWait::None;
                } else {
                    let config = SdkConfig {
                        publishable_key: payload.publishable_key.clone(),
                        driver_id: driver_id.clone(),
                        manual_visits,
                    };
                    flow.driver_id = Some(driver_id);
                    flow.publishable_key = payload.publishable_key.clone();
                    flow.manual_visits = manual_visits;
                    flow.deep_link = DeepLinkWait::WaitingForSdk(config);
                    remake_sdk(caps, &payload.publishable_key);
                }
            }
            DeepLinkWait::None | DeepLinkWait::WaitingForSdk(_) => cancel_timer(caps),
        },

        AppFlow::SignIn(SignInState::Editing { deep_link, .. }) => match deep_link.clone() {
            DeepLinkWait::WaitingForDeepLink => {
                *deep_link = DeepLinkWait::None;
                cancel_timer(caps);
            }
            DeepLinkWait::WaitingForTimer(payload) => {
                cancel_timer(caps);
                if let Some(driver_id) = payload.driver_id {
                    let config = SdkConfig {
                        publishable_key: payload.publishable_key.clone(),
                        driver_id,
                        manual_visits: payload.manual_visits,
                    };
                    *deep_link = DeepLinkWait::WaitingForSdk(config);
                    remake_sdk(caps, &payload.publishable_key);
                } else {
                    *deep_link = DeepLinkWait::None;
                }
            }
            DeepLinkWait::None | DeepLinkWait::WaitingForSdk(_) => cancel_timer(caps),
        },

        AppFlow::Main(main) => match main.deep_link.clone() {
            DeepLinkWait::WaitingForDeepLink => {
                main.deep_link = DeepLinkWait::None;
                cancel_timer(caps);
            }
            DeepLinkWait::WaitingForTimer(payload) => {
                cancel_timer(caps);
                let Some(driver_id) = payload.driver_id else {
                    main.deep_link = DeepLinkWait::None;
                    return;
                };
                let manual_visits = payload
                    .manual_visits
                    .unwrap_or_else(|| main.visits.mode());
                let key_changed = payload.publishable_key != main.publishable_key;
                let driver_changed = driver_id != main.driver_id;
                let representation_changed = manual_visits != main.visits.mode();
                if key_changed || driver_changed || representation_changed {
                    let config = SdkConfig {
                        publishable_key: payload.publishable_key.clone(),
                        driver_id,
                        manual_visits: Some(manual_visits),
                    };
                    main.deep_link = DeepLinkWait::WaitingForSdk(config);
                    remake_sdk(caps, &payload.publishable_key);
                } else {
                    // Same key, same driver, same representation:
                    // nothing to do.
                    main.deep_link = DeepLinkWait::None;
                }
            }
            DeepLinkWait::None | DeepLinkWait::WaitingForSdk(_) => cancel_timer(caps),
        },

        // A tick that outlived its owner; make sure nothing keeps
        // firing.
        _ => cancel_timer(caps),
    }
}

/// SDK re-initialization completed.
pub fn sdk_made(update: &SdkStatusUpdate, model: &mut Model, caps: &Capabilities) {
    let config = match &model.flow {
        AppFlow::FirstRun {
            deep_link: DeepLinkWait::WaitingForSdk(config),
        }
        | AppFlow::DriverId(DriverIdFlow {
            deep_link: DeepLinkWait::WaitingForSdk(config),
            ..
        })
        | AppFlow::SignIn(SignInState::Editing {
            deep_link: DeepLinkWait::WaitingForSdk(config),
            ..
        }) => Some((config.clone(), None)),
        AppFlow::Main(main) => match &main.deep_link {
            DeepLinkWait::WaitingForSdk(config) => Some((config.clone(), Some(main.clone()))),
            _ => None,
        },
        _ => None,
    };
    let Some((config, previous_main)) = config else {
        // Late completion for a flow that moved on.
        return;
    };

    match &update.status {
        SdkStatus::Locked => {
            // The device cannot be tracked; this blocks everything.
            model.flow = AppFlow::NoMotionServices;
        }
        SdkStatus::Unlocked {
            device_id,
            tracking,
        } => {
            let mode = config.manual_visits.unwrap_or(ManualVisitsMode::Hide);
            let main = match previous_main {
                // A key switch belongs to another tenant: its orders,
                // places and token do not carry over. Under the same
                // key the collection converts losslessly.
                Some(previous) if previous.publishable_key == config.publishable_key => MainFlow {
                    visits: previous.visits.clone().converted(mode),
                    tab: previous.tab,
                    places: previous.places.clone(),
                    history: previous.history.clone(),
                    publishable_key: config.publishable_key,
                    driver_id: config.driver_id.clone(),
                    device_id: device_id.clone(),
                    tracking: *tracking,
                    permissions: update.permissions,
                    requests: Requests::default(),
                    token: previous.token.clone(),
                    push_status: previous.push_status,
                    experience: previous.experience,
                    deep_link: DeepLinkWait::None,
                },
                Some(previous) => MainFlow {
                    visits: Visits::empty(mode),
                    tab: TabSelection::default(),
                    places: std::collections::HashSet::new(),
                    history: None,
                    publishable_key: config.publishable_key,
                    driver_id: config.driver_id.clone(),
                    device_id: device_id.clone(),
                    tracking: *tracking,
                    permissions: update.permissions,
                    requests: Requests::default(),
                    token: None,
                    push_status: previous.push_status,
                    experience: previous.experience,
                    deep_link: DeepLinkWait::None,
                },
                None => MainFlow {
                    visits: Visits::empty(mode),
                    tab: TabSelection::default(),
                    places: std::collections::HashSet::new(),
                    history: None,
                    publishable_key: config.publishable_key,
                    driver_id: config.driver_id.clone(),
                    device_id: device_id.clone(),
                    tracking: *tracking,
                    permissions: update.permissions,
                    requests: Requests::default(),
                    token: None,
                    push_status: PushStatus::DialogSplash(DialogStatus::NotShown),
                    experience: Experience::FirstRun,
                    deep_link: DeepLinkWait::None,
                },
            };
            model.flow = AppFlow::Main(Box::new(main));

            caps.sdk.subscribe(Event::StatusUpdated);
            caps.sdk.set_driver_id(config.driver_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_driver_and_mode_from_url() {
        let url =
            Url::parse("https://deliveries.example.app/pk_live_1?driver_id=d-7&manual_visits=show")
                .unwrap();
        let payload = payload_from_url(&url).unwrap();
        assert_eq!(payload.publishable_key.as_str(), "pk_live_1");
        assert_eq!(payload.driver_id.unwrap().as_str(), "d-7");
        assert_eq!(payload.manual_visits, Some(ManualVisitsMode::Show));
    }

    #[test]
    fn url_without_key_yields_no_payload() {
        let url = Url::parse("https://deliveries.example.app/?driver_id=d-7").unwrap();
        assert!(payload_from_url(&url).is_none());
    }

    #[test]
    fn unknown_mode_value_is_ignored() {
        let url = Url::parse("https://deliveries.example.app/pk?manual_visits=maybe").unwrap();
        let payload = payload_from_url(&url).unwrap();
        assert_eq!(payload.manual_visits, None);
    }
}
