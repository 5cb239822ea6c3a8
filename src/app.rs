//! The application reducer.
//!
//! One event at a time, run to completion: effects never mutate state
//! directly, they come back as events. Events that do not apply to the
//! current flow variant fall through silently; async completions
//! routinely arrive after the user has moved on.

use chrono::Utc;
use tracing::{debug, warn};

use crate::api;
use crate::capabilities::{
    AccountsOutput, Capabilities, GeotagRequest, VerificationOutcome,
};
use crate::deep_link::{self, DeepLinkWait, SdkConfig};
use crate::event::Event;
use crate::model::{
    AppFlow, CredentialFocus, DialogStatus, EntryProgress, LaunchState, MainFlow, ManualVisit,
    ManualVisitStatus, Model, Password, PublishableKey, PushStatus, Requests, RequestStatus,
    SdkStatus, SdkStatusUpdate, SignInState, SignUpForm, SignUpState, QuestionsStatus,
    Verification, VerificationRequest, Visits, CodeEntry, DriverIdFlow, Email,
};
use crate::order::{transition, LifecycleEvent, Order};
use crate::restoration::{self, StorageState};
use crate::screen::{self, Screen};

#[derive(Default)]
pub struct App;

impl App {
    fn persist(model: &Model, caps: &Capabilities) {
        if let Some(state) = restoration::storage_state(model) {
            caps.storage.save(restoration::encode(&state));
        }
    }

    /// Resolve the launch fan-in once both the restoration record and
    /// the first SDK status have arrived.
    fn try_resolve_launch(model: &mut Model, caps: &Capabilities) {
        let AppFlow::Launching(launch) = &mut model.flow else {
            return;
        };
        if launch.remaking_sdk {
            return;
        }
        let (Some(restored), Some(sdk)) = (launch.restored.clone(), launch.sdk.clone()) else {
            return;
        };

        match restored {
            None => {
                // Fresh install: give a deep link five seconds to
                // claim the session before offering sign-up.
                model.flow = AppFlow::FirstRun {
                    deep_link: DeepLinkWait::WaitingForDeepLink,
                };
                caps.delay.start(
                    crate::capabilities::DEEP_LINK_TIMER,
                    crate::DEEP_LINK_TIMEOUT_MS,
                    || Event::DeepLinkTimerFired,
                );
            }
            Some(StorageState::SignUp { email }) => {
                model.flow = AppFlow::SignUp(SignUpState::Form(SignUpForm {
                    email,
                    ..SignUpForm::default()
                }));
            }
            Some(StorageState::SignIn { email }) => {
                model.flow = AppFlow::SignIn(SignInState::Editing {
                    email,
                    password: None,
                    focus: None,
                    error: None,
                    deep_link: DeepLinkWait::None,
                });
            }
            Some(StorageState::DriverId {
                driver_id,
                publishable_key,
            }) => {
                model.flow = AppFlow::DriverId(DriverIdFlow {
                    driver_id,
                    publishable_key,
                    manual_visits: None,
                    deep_link: DeepLinkWait::None,
                });
            }
            Some(StorageState::Main {
                orders,
                places,
                tab,
                publishable_key,
                driver_id,
                push_status,
                experience,
            }) => match &sdk.status {
                SdkStatus::Unlocked {
                    device_id,
                    tracking,
                } => {
                    let mut main = MainFlow {
                        visits: Visits::Assigned(orders),
                        tab,
                        places,
                        history: None,
                        publishable_key,
                        driver_id: driver_id.clone(),
                        device_id: device_id.clone(),
                        tracking: *tracking,
                        permissions: sdk.permissions,
                        requests: Requests::default(),
                        token: None,
                        push_status,
                        experience,
                        deep_link: DeepLinkWait::None,
                    };
                    caps.sdk.set_driver_id(driver_id);
                    Self::refresh_orders(&mut main, caps);
                    model.flow = AppFlow::Main(Box::new(main));
                }
                SdkStatus::Locked => {
                    // The SDK lost its key across the restart; remake
                    // it with the restored one before entering main.
                    launch.remaking_sdk = true;
                    caps.sdk.initialize(publishable_key, Event::MadeSdk);
                    return;
                }
            },
        }
        deep_link::subscribe(caps);
    }

    /// Completion of the launch-time SDK remake for a restored main
    /// state.
    fn resume_restored_main(
        update: &SdkStatusUpdate,
        model: &mut Model,
        caps: &Capabilities,
    ) -> bool {
        let AppFlow::Launching(launch) = &model.flow else {
            return false;
        };
        if !launch.remaking_sdk {
            return false;
        }
        let Some(Some(StorageState::Main {
            orders,
            places,
            tab,
            publishable_key,
            driver_id,
            push_status,
            experience,
        })) = launch.restored.clone()
        else {
            model.flow = AppFlow::NoMotionServices;
            return true;
        };

        match &update.status {
            SdkStatus::Locked => {
                model.flow = AppFlow::NoMotionServices;
            }
            SdkStatus::Unlocked {
                device_id,
                tracking,
            } => {
                let mut main = MainFlow {
                    visits: Visits::Assigned(orders),
                    tab,
                    places,
                    history: None,
                    publishable_key,
                    driver_id: driver_id.clone(),
                    device_id: device_id.clone(),
                    tracking: *tracking,
                    permissions: update.permissions,
                    requests: Requests::default(),
                    token: None,
                    push_status,
                    experience,
                    deep_link: DeepLinkWait::None,
                };
                caps.sdk.set_driver_id(driver_id);
                Self::refresh_orders(&mut main, caps);
                model.flow = AppFlow::Main(Box::new(main));
                deep_link::subscribe(caps);
            }
        }
        true
    }

    /// Fetch orders, authenticating first when no token is held. The
    /// in-flight flag suppresses a second fetch, not correctness: a
    /// stale response merges harmlessly.
    fn refresh_orders(main: &mut MainFlow, caps: &Capabilities) {
        if main.requests.orders == RequestStatus::InFlight {
            return;
        }
        main.requests.orders = RequestStatus::InFlight;
        match &main.token {
            Some(token) => api::get_orders(&caps.http, token, &main.device_id),
            None => api::authenticate(&caps.http, &main.publishable_key, &main.device_id),
        }
    }

    fn sign_in(email: Email, password: Password, caps: &Capabilities) -> AppFlow {
        caps.accounts.sign_in(
            email.as_str().to_owned(),
            password.expose().to_owned(),
            Event::AccountsResponded,
        );
        AppFlow::SignIn(SignInState::SigningIn { email, password })
    }

    fn handle_accounts(output: AccountsOutput, model: &mut Model, caps: &Capabilities) {
        match (&mut model.flow, output) {
            (
                AppFlow::SignUp(SignUpState::Questions {
                    email,
                    password,
                    status: status @ QuestionsStatus::SigningUp { .. },
                    ..
                }),
                AccountsOutput::SignedUp(result),
            ) => match result {
                Ok(()) => {
                    let email = email.clone();
                    let password = password.clone();
                    model.flow = AppFlow::SignUp(SignUpState::Verification {
                        email,
                        password,
                        verification: Verification::Entering {
                            entry: CodeEntry::empty(),
                            focused: true,
                            error: None,
                        },
                    });
                    Self::persist(model, caps);
                }
                Err(message) => {
                    let (business_manages, manages_for) = match status {
                        QuestionsStatus::SigningUp {
                            business_manages,
                            manages_for,
                        } => (*business_manages, *manages_for),
                        QuestionsStatus::Answering { .. } => return,
                    };
                    *status = QuestionsStatus::Answering {
                        business_manages: Some(business_manages),
                        manages_for: Some(manages_for),
                        error: Some(message),
                    };
                }
            },
            (
                AppFlow::SignUp(SignUpState::Verification {
                    email,
                    password,
                    verification:
                        Verification::Entered {
                            request: request @ VerificationRequest::InFlight,
                            ..
                        },
                }),
                AccountsOutput::Verified(outcome),
            ) => match outcome {
                VerificationOutcome::Verified { publishable_key } => {
                    match PublishableKey::new(publishable_key) {
                        Ok(publishable_key) => {
                            model.flow = AppFlow::DriverId(DriverIdFlow {
                                driver_id: None,
                                publishable_key,
                                manual_visits: None,
                                deep_link: DeepLinkWait::None,
                            });
                            Self::persist(model, caps);
                        }
                        Err(_) => {
                            *request = VerificationRequest::NotSent {
                                focused: false,
                                error: Some("Verification failed, try again".into()),
                            };
                        }
                    }
                }
                VerificationOutcome::AlreadyVerified => {
                    // The account exists and is verified; the held
                    // credentials can sign straight in.
                    let email = email.clone();
                    let password = password.clone();
                    model.flow = Self::sign_in(email, password, caps);
                }
                VerificationOutcome::Failed { message } => {
                    *request = VerificationRequest::NotSent {
                        focused: true,
                        error: Some(message),
                    };
                }
            },
            (
                AppFlow::SignUp(SignUpState::Verification {
                    email,
                    password,
                    verification,
                }),
                AccountsOutput::Resent(outcome),
            ) => match outcome {
                crate::capabilities::ResendOutcome::Sent => {}
                crate::capabilities::ResendOutcome::AlreadyVerified => {
                    let email = email.clone();
                    let password = password.clone();
                    model.flow = Self::sign_in(email, password, caps);
                }
                crate::capabilities::ResendOutcome::Failed { message } => match verification {
                    Verification::Entering { error, .. } => *error = Some(message),
                    Verification::Entered {
                        request: VerificationRequest::NotSent { error, .. },
                        ..
                    } => *error = Some(message),
                    Verification::Entered { .. } => {}
                },
            },
            (
                AppFlow::SignIn(SignInState::SigningIn { email, password }),
                AccountsOutput::SignedIn(result),
            ) => {
                let email = email.clone();
                let password = password.clone();
                match result.and_then(|pk| {
                    PublishableKey::new(pk).map_err(|_| "Sign in failed, try again".to_owned())
                }) {
                    Ok(publishable_key) => {
                        model.flow = AppFlow::DriverId(DriverIdFlow {
                            driver_id: None,
                            publishable_key,
                            manual_visits: None,
                            deep_link: DeepLinkWait::None,
                        });
                        Self::persist(model, caps);
                    }
                    Err(message) => {
                        model.flow = AppFlow::SignIn(SignInState::Editing {
                            email: Some(email),
                            password: Some(password),
                            focus: None,
                            error: Some(message),
                            deep_link: DeepLinkWait::None,
                        });
                    }
                }
            }
            // A completion for a flow the user already left.
            _ => {}
        }
    }

    /// Run a lifecycle event against the selected order and mirror the
    /// outcome into the visits collection.
    fn selected_order_transition(
        main: &mut MainFlow,
        event: LifecycleEvent,
    ) -> Option<Order> {
        let selected = main.visits.selected_order()?.clone();
        match transition(selected, event) {
            Ok(updated) => {
                main.visits.replace_selected_order(updated.clone());
                Some(updated)
            }
            Err(error) => {
                warn!(%error, "rejected order transition");
                None
            }
        }
    }

    /// Flush a note edit to the backend when the focused field is
    /// dismissed on a trip-sourced order.
    fn flush_note(main: &MainFlow, caps: &Capabilities) {
        let Some(order) = main.visits.selected_order() else {
            return;
        };
        let (Some(trip_id), Some(note), Some(token)) =
            (&order.trip_id, &order.note, &main.token)
        else {
            return;
        };
        api::update_order_note(&caps.http, token, trip_id, &order.id, note);
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = Screen;
    type Capabilities = Capabilities;

    #[allow(clippy::too_many_lines)]
    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), "reduce");

        match event {
            Event::Noop => return,

            // --- Launch ---
            Event::FinishedLaunching => {
                if matches!(model.flow, AppFlow::Created) {
                    model.flow = AppFlow::Launching(LaunchState::default());
                    caps.storage
                        .load(|record| Event::RestorationLoaded(Box::new(record)));
                    caps.sdk.subscribe(Event::StatusUpdated);
                }
            }

            Event::RestorationLoaded(record) => {
                if let AppFlow::Launching(launch) = &mut model.flow {
                    if launch.restored.is_none() {
                        launch.restored = Some(restoration::decode(&record));
                        Self::try_resolve_launch(model, caps);
                    }
                }
            }

            Event::StatusUpdated(update) => match &mut model.flow {
                AppFlow::Launching(launch) => {
                    if !launch.remaking_sdk {
                        launch.sdk = Some(update);
                        Self::try_resolve_launch(model, caps);
                    }
                }
                AppFlow::Main(main) => {
                    main.permissions = update.permissions;
                    match update.status {
                        SdkStatus::Locked => model.flow = AppFlow::NoMotionServices,
                        SdkStatus::Unlocked {
                            device_id,
                            tracking,
                        } => {
                            main.device_id = device_id;
                            main.tracking = tracking;
                        }
                    }
                }
                _ => {}
            },

            Event::WillEnterForeground => {
                if let AppFlow::Main(main) = &mut model.flow {
                    Self::refresh_orders(main, caps);
                }
            }

            Event::ReceivedPushNotification => {
                if let AppFlow::Main(main) = &mut model.flow {
                    Self::refresh_orders(main, caps);
                }
            }

            Event::NetworkStatusChanged { online } => {
                let was_offline = !model.network_online;
                model.network_online = online;
                if online && was_offline {
                    if let AppFlow::Main(main) = &mut model.flow {
                        Self::refresh_orders(main, caps);
                    }
                }
            }

            // --- Deep links ---
            Event::DeepLinkOpened { url } => deep_link::opened(&url, model, caps),
            Event::ReceivedDeepLink(payload) => deep_link::received(&payload, model, caps),
            Event::DeepLinkTimerFired => {
                deep_link::timer_fired(model, caps);
                Self::persist(model, caps);
            }
            Event::MadeSdk(update) => {
                if !Self::resume_restored_main(&update, model, caps) {
                    deep_link::sdk_made(&update, model, caps);
                }
                if let AppFlow::Main(main) = &mut model.flow {
                    Self::refresh_orders(main, caps);
                }
                Self::persist(model, caps);
            }

            // --- Sign-up form ---
            Event::BusinessNameChanged(name) => {
                if let AppFlow::SignUp(SignUpState::Form(form)) = &mut model.flow {
                    form.name = name;
                }
            }

            Event::EmailChanged(email) => match &mut model.flow {
                AppFlow::SignUp(SignUpState::Form(form)) => {
                    form.email = email;
                    Self::persist(model, caps);
                }
                AppFlow::SignIn(SignInState::Editing { email: field, .. }) => {
                    *field = email;
                    Self::persist(model, caps);
                }
                _ => {}
            },

            Event::PasswordChanged(password) => match &mut model.flow {
                AppFlow::SignUp(SignUpState::Form(form)) => form.password = password,
                AppFlow::SignIn(SignInState::Editing {
                    password: field, ..
                }) => *field = password,
                _ => {}
            },

            Event::FocusBusinessName => {
                if let AppFlow::SignUp(SignUpState::Form(form)) = &mut model.flow {
                    form.focus = Some(crate::model::FormFocus::Name);
                }
            }

            Event::FocusEmail => match &mut model.flow {
                AppFlow::SignUp(SignUpState::Form(form)) => {
                    form.focus = Some(crate::model::FormFocus::Email);
                }
                AppFlow::SignIn(SignInState::Editing { focus, .. }) => {
                    *focus = Some(CredentialFocus::Email);
                }
                _ => {}
            },

            Event::FocusPassword => match &mut model.flow {
                AppFlow::SignUp(SignUpState::Form(form)) => {
                    form.focus = Some(crate::model::FormFocus::Password);
                }
                AppFlow::SignIn(SignInState::Editing { focus, .. }) => {
                    *focus = Some(CredentialFocus::Password);
                }
                _ => {}
            },

            Event::DismissFocus => match &mut model.flow {
                AppFlow::SignUp(SignUpState::Form(form)) => form.focus = None,
                AppFlow::SignUp(SignUpState::Verification { verification, .. }) => {
                    match verification {
                        Verification::Entering { focused, .. } => *focused = false,
                        Verification::Entered {
                            request: VerificationRequest::NotSent { focused, .. },
                            ..
                        } => *focused = false,
                        Verification::Entered { .. } => {}
                    }
                }
                AppFlow::SignIn(SignInState::Editing { focus, .. }) => *focus = None,
                AppFlow::Main(main) => {
                    let dismissed = Self::selected_order_transition(
                        main,
                        LifecycleEvent::DismissNoteFocus,
                    );
                    if dismissed.is_some() {
                        Self::flush_note(main, caps);
                    } else if let Some(visit) = main.visits.selected_manual_mut() {
                        visit.note_focused = false;
                    }
                }
                _ => {}
            },

            Event::CompleteSignUpForm => {
                if let AppFlow::SignUp(SignUpState::Form(form)) = &mut model.flow {
                    if let (Some(name), Some(email), Some(password)) =
                        (form.name.clone(), form.email.clone(), form.password.clone())
                    {
                        model.flow = AppFlow::SignUp(SignUpState::Questions {
                            name,
                            email,
                            password,
                            status: QuestionsStatus::Answering {
                                business_manages: None,
                                manages_for: None,
                                error: None,
                            },
                        });
                        Self::persist(model, caps);
                    } else {
                        form.error = Some("All fields are required".into());
                    }
                }
            }

            Event::GoToSignIn => {
                let email = match &model.flow {
                    AppFlow::SignUp(SignUpState::Form(form)) => form.email.clone(),
                    AppFlow::SignUp(
                        SignUpState::Questions { email, .. }
                        | SignUpState::Verification { email, .. },
                    ) => Some(email.clone()),
                    _ => return,
                };
                model.flow = AppFlow::SignIn(SignInState::Editing {
                    email,
                    password: None,
                    focus: None,
                    error: None,
                    deep_link: DeepLinkWait::None,
                });
                Self::persist(model, caps);
            }

            Event::GoToSignUp => {
                match &model.flow {
                    AppFlow::SignIn(SignInState::Editing { email, .. }) => {
                        model.flow = AppFlow::SignUp(SignUpState::Form(SignUpForm {
                            email: email.clone(),
                            ..SignUpForm::default()
                        }));
                    }
                    AppFlow::SignUp(SignUpState::Questions {
                        name,
                        email,
                        password,
                        ..
                    }) => {
                        model.flow = AppFlow::SignUp(SignUpState::Form(SignUpForm {
                            name: Some(name.clone()),
                            email: Some(email.clone()),
                            password: Some(password.clone()),
                            focus: None,
                            error: None,
                        }));
                    }
                    _ => return,
                }
                Self::persist(model, caps);
            }

            // --- Sign-up questions ---
            Event::BusinessManagesChanged(value) => {
                if let AppFlow::SignUp(SignUpState::Questions {
                    status:
                        QuestionsStatus::Answering {
                            business_manages, ..
                        },
                    ..
                }) = &mut model.flow
                {
                    *business_manages = value;
                }
            }

            Event::ManagesForChanged(value) => {
                if let AppFlow::SignUp(SignUpState::Questions {
                    status: QuestionsStatus::Answering { manages_for, .. },
                    ..
                }) = &mut model.flow
                {
                    *manages_for = value;
                }
            }

            Event::SignUpTapped => {
                if let AppFlow::SignUp(SignUpState::Questions {
                    name,
                    email,
                    password,
                    status,
                }) = &mut model.flow
                {
                    let (business_manages, manages_for) = match status {
                        QuestionsStatus::Answering {
                            business_manages: Some(business_manages),
                            manages_for: Some(manages_for),
                            ..
                        } => (*business_manages, *manages_for),
                        _ => return,
                    };
                    caps.accounts.sign_up(
                        name.as_str().to_owned(),
                        email.as_str().to_owned(),
                        password.expose().to_owned(),
                        business_manages_tag(business_manages).to_owned(),
                        manages_for_tag(manages_for).to_owned(),
                        Event::AccountsResponded,
                    );
                    *status = QuestionsStatus::SigningUp {
                        business_manages,
                        manages_for,
                    };
                }
            }

            Event::CancelSignUp => {
                if let AppFlow::SignUp(SignUpState::Questions { status, .. }) = &mut model.flow {
                    let (business_manages, manages_for) = match status {
                        QuestionsStatus::SigningUp {
                            business_manages,
                            manages_for,
                        } => (*business_manages, *manages_for),
                        QuestionsStatus::Answering { .. } => return,
                    };
                    *status = QuestionsStatus::Answering {
                        business_manages: Some(business_manages),
                        manages_for: Some(manages_for),
                        error: None,
                    };
                }
            }

            // --- Verification ---
            Event::VerificationDigitEntered(digit) => {
                if let AppFlow::SignUp(SignUpState::Verification {
                    email,
                    verification,
                    ..
                }) = &mut model.flow
                {
                    if let Verification::Entering { entry, .. } = verification {
                        match entry.clone().push(digit) {
                            EntryProgress::Partial(partial) => {
                                *verification = Verification::Entering {
                                    entry: partial,
                                    focused: true,
                                    error: None,
                                };
                            }
                            EntryProgress::Complete(code) => {
                                caps.accounts.verify_email(
                                    email.as_str().to_owned(),
                                    code.to_string(),
                                    Event::AccountsResponded,
                                );
                                *verification = Verification::Entered {
                                    code,
                                    request: VerificationRequest::InFlight,
                                };
                            }
                        }
                    }
                }
            }

            Event::VerificationBackspace => {
                if let AppFlow::SignUp(SignUpState::Verification { verification, .. }) =
                    &mut model.flow
                {
                    match verification {
                        Verification::Entering { entry, .. } => entry.pop(),
                        Verification::Entered {
                            code,
                            request: VerificationRequest::NotSent { .. },
                        } => {
                            *verification = Verification::Entering {
                                entry: CodeEntry::reopened(*code),
                                focused: true,
                                error: None,
                            };
                        }
                        Verification::Entered { .. } => {}
                    }
                }
            }

            Event::FocusVerification => {
                if let AppFlow::SignUp(SignUpState::Verification { verification, .. }) =
                    &mut model.flow
                {
                    match verification {
                        Verification::Entering { focused, .. } => *focused = true,
                        Verification::Entered {
                            request: VerificationRequest::NotSent { focused, .. },
                            ..
                        } => *focused = true,
                        Verification::Entered { .. } => {}
                    }
                }
            }

            Event::ResendVerificationCode => {
                if let AppFlow::SignUp(SignUpState::Verification { email, .. }) = &model.flow {
                    caps.accounts
                        .resend_verification(email.as_str().to_owned(), Event::AccountsResponded);
                }
            }

            Event::AccountsResponded(output) => Self::handle_accounts(output, model, caps),

            // --- Sign in ---
            Event::SignInTapped => {
                if let AppFlow::SignIn(SignInState::Editing {
                    email: Some(email),
                    password: Some(password),
                    ..
                }) = &model.flow
                {
                    model.flow = Self::sign_in(email.clone(), password.clone(), caps);
                    Self::persist(model, caps);
                }
            }

            Event::CancelSignIn => {
                if let AppFlow::SignIn(SignInState::SigningIn { email, password }) = &model.flow {
                    model.flow = AppFlow::SignIn(SignInState::Editing {
                        email: Some(email.clone()),
                        password: Some(password.clone()),
                        focus: None,
                        error: None,
                        deep_link: DeepLinkWait::None,
                    });
                }
            }

            // --- Driver ID ---
            Event::DriverIdChanged(driver_id) => {
                if let AppFlow::DriverId(flow) = &mut model.flow {
                    flow.driver_id = driver_id;
                    Self::persist(model, caps);
                }
            }

            Event::SubmitDriverId => {
                if let AppFlow::DriverId(flow) = &mut model.flow {
                    if let Some(driver_id) = flow.driver_id.clone() {
                        flow.deep_link = DeepLinkWait::WaitingForSdk(SdkConfig {
                            publishable_key: flow.publishable_key.clone(),
                            driver_id,
                            manual_visits: flow.manual_visits,
                        });
                        caps.sdk
                            .initialize(flow.publishable_key.clone(), Event::MadeSdk);
                    }
                }
            }

            // --- Main: data refresh ---
            Event::UpdateOrders => {
                if let AppFlow::Main(main) = &mut model.flow {
                    Self::refresh_orders(main, caps);
                }
            }

            Event::TokenResponse(result) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    match api::expect_success(result).and_then(|body| {
                        crate::decode::token(&body)
                            .map_err(|e| api::ApiError::Auth(e.to_string()))
                    }) {
                        Ok(token) => {
                            api::get_orders(&caps.http, &token, &main.device_id);
                            main.token = Some(token);
                        }
                        Err(error) => {
                            warn!(%error, "authentication failed");
                            main.requests.orders = RequestStatus::Idle;
                        }
                    }
                }
            }

            Event::OrdersResponse(result) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.requests.orders = RequestStatus::Idle;
                    match api::expect_success(result) {
                        Ok(body) => match crate::decode::orders(&body) {
                            Ok(orders) => {
                                main.visits.merge_orders(orders.into_iter().collect());
                                Self::persist(model, caps);
                            }
                            Err(error) => warn!(%error, "undecodable orders payload"),
                        },
                        Err(api::ApiError::TokenExpired) => {
                            // Token aged out mid-session: drop it and
                            // run the authenticate leg again.
                            main.token = None;
                            Self::refresh_orders(main, caps);
                        }
                        Err(error) => warn!(%error, "orders fetch failed"),
                    }
                }
            }

            Event::OrderCompleteResponse { order_id, result }
            | Event::OrderCancelResponse { order_id, result } => {
                if let AppFlow::Main(main) = &mut model.flow {
                    match api::expect_success(result) {
                        Ok(_) => debug!(order = %order_id, "order status accepted"),
                        Err(api::ApiError::TokenExpired) => main.token = None,
                        Err(error) => {
                            warn!(order = %order_id, %error, "order status update failed");
                        }
                    }
                }
            }

            Event::NoteUpdateResponse { order_id, result } => {
                if let AppFlow::Main(main) = &mut model.flow {
                    match api::expect_success(result) {
                        Ok(_) => debug!(order = %order_id, "note accepted"),
                        Err(api::ApiError::TokenExpired) => main.token = None,
                        Err(error) => warn!(order = %order_id, %error, "note update failed"),
                    }
                }
            }

            Event::PlacesUpdated(places) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.places = places;
                    Self::persist(model, caps);
                }
            }

            Event::HistoryUpdated(history) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.history = Some(history);
                }
            }

            Event::GeocodedAddresses(addresses) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.visits.apply_addresses(&addresses);
                    Self::persist(model, caps);
                }
            }

            // --- Main: orders and visits ---
            Event::SwitchTab(tab) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.tab = tab;
                    Self::persist(model, caps);
                }
            }

            Event::SelectOrder(id) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.visits.select(&id);
                }
            }

            Event::SelectManualVisit(id) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.visits.select_manual(id);
                }
            }

            Event::DeselectOrder => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.visits.deselect();
                }
            }

            Event::PickUpOrder => {
                if let AppFlow::Main(main) = &mut model.flow {
                    if let Some(order) =
                        Self::selected_order_transition(main, LifecycleEvent::PickUp)
                    {
                        caps.sdk.add_geotag(GeotagRequest::PickUp {
                            order_id: order.id.as_str().to_owned(),
                            source: order.source,
                        });
                        Self::persist(model, caps);
                    }
                }
            }

            Event::CheckOutOrder => {
                if let AppFlow::Main(main) = &mut model.flow {
                    let now = Utc::now();
                    if let Some(order) =
                        Self::selected_order_transition(main, LifecycleEvent::CheckOut { now })
                    {
                        caps.sdk.add_geotag(GeotagRequest::CheckOut {
                            order_id: order.id.as_str().to_owned(),
                            source: order.source,
                            note: order.note.clone(),
                        });
                        if let (Some(trip_id), Some(token)) = (&order.trip_id, &main.token) {
                            api::complete_order(&caps.http, token, trip_id, &order.id);
                        }
                        Self::persist(model, caps);
                    }
                }
            }

            Event::CancelOrder => {
                if let AppFlow::Main(main) = &mut model.flow {
                    let now = Utc::now();
                    if let Some(order) =
                        Self::selected_order_transition(main, LifecycleEvent::Cancel { now })
                    {
                        caps.sdk.add_geotag(GeotagRequest::Cancel {
                            order_id: order.id.as_str().to_owned(),
                            source: order.source,
                            note: order.note.clone(),
                        });
                        if let (Some(trip_id), Some(token)) = (&order.trip_id, &main.token) {
                            api::cancel_order(&caps.http, token, trip_id, &order.id);
                        }
                        Self::persist(model, caps);
                    }
                }
            }

            Event::OrderNoteChanged(note) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    if main.visits.selected_order().is_some() {
                        Self::selected_order_transition(
                            main,
                            LifecycleEvent::NoteChanged(note),
                        );
                    } else if let Some(visit) = main.visits.selected_manual_mut() {
                        visit.note = note;
                    }
                }
            }

            Event::FocusOrderNote => {
                if let AppFlow::Main(main) = &mut model.flow {
                    if main.visits.selected_order().is_some() {
                        Self::selected_order_transition(main, LifecycleEvent::FocusNote);
                    } else if let Some(visit) = main.visits.selected_manual_mut() {
                        visit.note_focused = true;
                    }
                }
            }

            Event::AddManualVisit => {
                if let AppFlow::Main(main) = &mut model.flow {
                    if main.visits.mode() == crate::model::ManualVisitsMode::Show {
                        let visit = ManualVisit::new(Utc::now());
                        let id = visit.id;
                        main.visits.insert_manual(visit);
                        main.visits.select_manual(id);
                    }
                }
            }

            Event::CheckInManualVisit => {
                if let AppFlow::Main(main) = &mut model.flow {
                    if let Some(visit) = main.visits.selected_manual_mut() {
                        if matches!(visit.status, ManualVisitStatus::NotSent) {
                            visit.status = ManualVisitStatus::CheckedIn { at: Utc::now() };
                            caps.sdk.add_geotag(GeotagRequest::VisitCheckIn {
                                visit_id: visit.id.to_string(),
                            });
                        }
                    }
                }
            }

            Event::CheckOutManualVisit => {
                if let AppFlow::Main(main) = &mut model.flow {
                    if let Some(visit) = main.visits.selected_manual_mut() {
                        if let ManualVisitStatus::CheckedIn { at } = visit.status {
                            visit.status = ManualVisitStatus::CheckedOut {
                                entered_at: at,
                                exited_at: Utc::now(),
                            };
                            caps.sdk.add_geotag(GeotagRequest::VisitCheckOut {
                                visit_id: visit.id.to_string(),
                                note: visit.note.clone(),
                            });
                        }
                    }
                }
            }

            // --- Tracking and permissions ---
            Event::StartTracking => {
                if matches!(model.flow, AppFlow::Main(_)) {
                    caps.sdk.add_geotag(GeotagRequest::ClockIn);
                    caps.sdk.start_tracking();
                }
            }

            Event::StopTracking => {
                if matches!(model.flow, AppFlow::Main(_)) {
                    caps.sdk.add_geotag(GeotagRequest::ClockOut);
                    caps.sdk.stop_tracking();
                }
            }

            Event::OpenSettings => caps.sdk.open_settings(),

            Event::RequestLocationPermissions => caps.sdk.request_location_permissions(),

            Event::RequestMotionPermissions => {
                caps.sdk.request_motion_permissions(Event::StatusUpdated);
            }

            Event::RequestPushAuthorization => {
                if let AppFlow::Main(main) = &mut model.flow {
                    main.push_status = PushStatus::DialogSplash(DialogStatus::WaitingForUserAction);
                    caps.push.request_authorization(Event::PushAuthorizationDealt);
                    Self::persist(model, caps);
                }
            }

            Event::PushAuthorizationDealt(authorization) => {
                if let AppFlow::Main(main) = &mut model.flow {
                    // The splash counts as shown either way; a denial
                    // only skips registration.
                    main.push_status = PushStatus::DialogSplash(DialogStatus::Shown);
                    if authorization.granted {
                        caps.push.register();
                    }
                    Self::persist(model, caps);
                }
            }

            // --- Small platform actions ---
            Event::OpenAppleMaps => {
                if let AppFlow::Main(main) = &model.flow {
                    if let Some(order) = main.visits.selected_order() {
                        caps.platform.open_map(
                            order.location.lat(),
                            order.location.lng(),
                            order.address.as_ref().map(|a| a.display_line().to_owned()),
                        );
                    }
                }
            }

            Event::CopyToPasteboard(text) => caps.platform.copy_to_pasteboard(text),
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> Screen {
        screen::from_model(model)
    }
}

const fn business_manages_tag(value: crate::model::BusinessManages) -> &'static str {
    match value {
        crate::model::BusinessManages::Deliveries => "deliveries",
        crate::model::BusinessManages::Visits => "visits",
        crate::model::BusinessManages::Rides => "rides",
    }
}

const fn manages_for_tag(value: crate::model::ManagesFor) -> &'static str {
    match value {
        crate::model::ManagesFor::MyFleet => "my_fleet",
        crate::model::ManagesFor::MyCustomersFleet => "my_customers_fleet",
    }
}
