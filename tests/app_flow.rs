//! End-to-end flow transitions through the app reducer.

use std::collections::HashSet;

use crux_core::testing::AppTester;

use courier_shared::api::ApiResponse;
use courier_shared::deep_link::DeepLinkWait;
use courier_shared::model::{
    AppFlow, DialogStatus, Digit, DriverID, Email, Experience, LocationAccuracy,
    LocationPermission, MainFlow, Model, MotionPermission, OrderId, Password, Permissions,
    PublishableKey, PushStatus, Requests, RequestStatus, SdkStatus, SdkStatusUpdate, SignInState,
    SignUpState, TabSelection, TrackingStatus, Verification, VerificationRequest, Visits,
    DeviceID,
};
use courier_shared::restoration::StorageRecord;
use courier_shared::screen::{Blocker, Screen};
use courier_shared::{App, Effect, Event};

fn tester() -> AppTester<App, Effect> {
    AppTester::default()
}

fn granted_permissions() -> Permissions {
    Permissions {
        location_accuracy: LocationAccuracy::Full,
        location: LocationPermission::Authorized,
        motion: MotionPermission::Authorized,
    }
}

fn unlocked(device: &str) -> SdkStatusUpdate {
    SdkStatusUpdate {
        status: SdkStatus::Unlocked {
            device_id: DeviceID::new(device).unwrap(),
            tracking: TrackingStatus::Running,
        },
        permissions: granted_permissions(),
    }
}

fn locked() -> SdkStatusUpdate {
    SdkStatusUpdate {
        status: SdkStatus::Locked,
        permissions: Permissions::default(),
    }
}

fn main_model() -> Model {
    Model {
        flow: AppFlow::Main(Box::new(MainFlow {
            visits: Visits::Assigned(HashSet::new()),
            tab: TabSelection::Visits,
            places: HashSet::new(),
            history: None,
            publishable_key: PublishableKey::new("K1").unwrap(),
            driver_id: DriverID::new("D1").unwrap(),
            device_id: DeviceID::new("device-1").unwrap(),
            tracking: TrackingStatus::Running,
            permissions: granted_permissions(),
            requests: Requests::default(),
            token: None,
            push_status: PushStatus::DialogSplash(DialogStatus::Shown),
            experience: Experience::Regular,
            deep_link: DeepLinkWait::None,
        })),
        network_online: true,
    }
}

const GEOFENCES: &str = r#"[{
    "geofence_id": "gf-1",
    "created_at": "2021-02-05T10:00:00Z",
    "geometry": { "type": "Point", "coordinates": [-122.4194, 37.7749] }
}]"#;

#[test]
fn fresh_install_waits_for_deep_link_then_offers_sign_up() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(Event::FinishedLaunching, &mut model);
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Storage(_))));
    assert!(matches!(model.flow, AppFlow::Launching(_)));

    // Restoration and SDK status arrive in either order.
    let _ = app.update(Event::StatusUpdated(locked()), &mut model);
    assert!(matches!(model.flow, AppFlow::Launching(_)));

    let update = app.update(
        Event::RestorationLoaded(Box::new(StorageRecord::default())),
        &mut model,
    );
    assert!(matches!(
        model.flow,
        AppFlow::FirstRun {
            deep_link: DeepLinkWait::WaitingForDeepLink
        }
    ));
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Delay(_))));

    let _ = app.update(Event::DeepLinkTimerFired, &mut model);
    assert!(matches!(model.flow, AppFlow::SignUp(SignUpState::Form(_))));
}

#[test]
fn restored_main_state_resumes_and_refreshes() {
    let app = tester();
    let mut model = Model::default();

    let _ = app.update(Event::FinishedLaunching, &mut model);

    let record = StorageRecord {
        screen: Some("visits".into()),
        publishable_key: Some("K1".into()),
        driver_id: Some("D1".into()),
        ..StorageRecord::default()
    };
    let _ = app.update(Event::RestorationLoaded(Box::new(record)), &mut model);

    let update = app.update(Event::StatusUpdated(unlocked("device-1")), &mut model);

    match &model.flow {
        AppFlow::Main(main) => {
            assert_eq!(main.publishable_key.as_str(), "K1");
            assert_eq!(main.driver_id.as_str(), "D1");
            assert_eq!(main.requests.orders, RequestStatus::InFlight);
        }
        other => panic!("unexpected flow: {other:?}"),
    }
    // No token yet: the refresh starts with the authenticate leg.
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn sign_in_success_advances_to_driver_id_entry() {
    let app = tester();
    let mut model = Model {
        flow: AppFlow::SignIn(SignInState::Editing {
            email: Some(Email::new("a@b.test").unwrap()),
            password: Some(Password::new("hunter2").unwrap()),
            focus: None,
            error: None,
            deep_link: DeepLinkWait::None,
        }),
        network_online: true,
    };

    let update = app.update(Event::SignInTapped, &mut model);
    assert!(matches!(
        model.flow,
        AppFlow::SignIn(SignInState::SigningIn { .. })
    ));
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Accounts(_))));

    let _ = app.update(
        Event::AccountsResponded(courier_shared::capabilities::AccountsOutput::SignedIn(Ok(
            "K1".into(),
        ))),
        &mut model,
    );

    match &model.flow {
        AppFlow::DriverId(flow) => {
            assert_eq!(flow.publishable_key.as_str(), "K1");
            assert!(flow.driver_id.is_none());
        }
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn sign_in_failure_returns_to_editing_with_error() {
    let app = tester();
    let mut model = Model {
        flow: AppFlow::SignIn(SignInState::SigningIn {
            email: Email::new("a@b.test").unwrap(),
            password: Password::new("hunter2").unwrap(),
        }),
        network_online: true,
    };

    let _ = app.update(
        Event::AccountsResponded(courier_shared::capabilities::AccountsOutput::SignedIn(Err(
            "wrong password".into(),
        ))),
        &mut model,
    );

    match &model.flow {
        AppFlow::SignIn(SignInState::Editing { error, email, .. }) => {
            assert_eq!(error.as_deref(), Some("wrong password"));
            assert!(email.is_some());
        }
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn late_sign_in_response_is_a_no_op_after_navigating_away() {
    let app = tester();
    let mut model = Model {
        flow: AppFlow::SignUp(SignUpState::Form(Default::default())),
        network_online: true,
    };

    let _ = app.update(
        Event::AccountsResponded(courier_shared::capabilities::AccountsOutput::SignedIn(Ok(
            "K1".into(),
        ))),
        &mut model,
    );

    assert!(matches!(model.flow, AppFlow::SignUp(SignUpState::Form(_))));
}

#[test]
fn six_digits_complete_the_verification_code() {
    let app = tester();
    let mut model = Model {
        flow: AppFlow::SignUp(SignUpState::Verification {
            email: Email::new("a@b.test").unwrap(),
            password: Password::new("hunter2").unwrap(),
            verification: Verification::Entering {
                entry: courier_shared::model::CodeEntry::empty(),
                focused: true,
                error: None,
            },
        }),
        network_online: true,
    };

    // Backspace on an empty entry never goes negative.
    let _ = app.update(Event::VerificationBackspace, &mut model);

    for digit in [1, 2, 3, 4, 5] {
        let _ = app.update(
            Event::VerificationDigitEntered(Digit::new(digit).unwrap()),
            &mut model,
        );
        assert!(matches!(
            model.flow,
            AppFlow::SignUp(SignUpState::Verification {
                verification: Verification::Entering { .. },
                ..
            })
        ));
    }

    let update = app.update(
        Event::VerificationDigitEntered(Digit::new(6).unwrap()),
        &mut model,
    );

    match &model.flow {
        AppFlow::SignUp(SignUpState::Verification {
            verification:
                Verification::Entered {
                    code,
                    request: VerificationRequest::InFlight,
                },
            ..
        }) => assert_eq!(code.to_string(), "123456"),
        other => panic!("unexpected flow: {other:?}"),
    }
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Accounts(_))));
}

#[test]
fn orders_response_merges_without_changing_screen() {
    let app = tester();
    let mut model = main_model();

    let view_before = app.view(&model);
    assert!(matches!(view_before, Screen::Main(_)));

    let _ = app.update(
        Event::OrdersResponse(Ok(ApiResponse {
            status: 200,
            body: GEOFENCES.into(),
        })),
        &mut model,
    );

    match &model.flow {
        AppFlow::Main(main) => {
            assert_eq!(main.visits.orders().len(), 1);
            assert_eq!(main.requests.orders, RequestStatus::Idle);
        }
        other => panic!("unexpected flow: {other:?}"),
    }
    assert!(matches!(app.view(&model), Screen::Main(_)));
}

#[test]
fn expired_token_drops_credentials_and_reauthenticates() {
    let app = tester();
    let mut model = main_model();
    if let AppFlow::Main(main) = &mut model.flow {
        main.token = Some(courier_shared::model::Token::new("stale").unwrap());
    }

    let update = app.update(
        Event::OrdersResponse(Ok(ApiResponse {
            status: 401,
            body: String::new(),
        })),
        &mut model,
    );

    match &model.flow {
        AppFlow::Main(main) => {
            assert!(main.token.is_none());
            assert_eq!(main.requests.orders, RequestStatus::InFlight);
        }
        other => panic!("unexpected flow: {other:?}"),
    }
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn selection_survives_merge_and_drops_when_gone() {
    let app = tester();
    let mut model = main_model();

    let _ = app.update(
        Event::OrdersResponse(Ok(ApiResponse {
            status: 200,
            body: GEOFENCES.into(),
        })),
        &mut model,
    );
    let _ = app.update(
        Event::SelectOrder(OrderId::new("gf-1").unwrap()),
        &mut model,
    );
    match &model.flow {
        AppFlow::Main(main) => {
            assert_eq!(main.visits.selected_order().unwrap().id.as_str(), "gf-1");
        }
        other => panic!("unexpected flow: {other:?}"),
    }

    // The backend stops reporting the selected id.
    let _ = app.update(
        Event::OrdersResponse(Ok(ApiResponse {
            status: 200,
            body: "[]".into(),
        })),
        &mut model,
    );
    match &model.flow {
        AppFlow::Main(main) => assert!(main.visits.selected_order().is_none()),
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn push_authorization_flow_marks_dialog_shown() {
    let app = tester();
    let mut model = main_model();
    if let AppFlow::Main(main) = &mut model.flow {
        main.push_status = PushStatus::DialogSplash(DialogStatus::NotShown);
    }

    assert_eq!(app.view(&model), Screen::Blocker(Blocker::PushNotShown));

    let update = app.update(Event::RequestPushAuthorization, &mut model);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Push(_))));
    assert_eq!(app.view(&model), Screen::Blocker(Blocker::PushNotShown));

    let _ = app.update(
        Event::PushAuthorizationDealt(courier_shared::capabilities::PushAuthorization {
            granted: true,
        }),
        &mut model,
    );

    // Fixing the snapshot un-blocks on the next render, with no
    // explicit transition.
    assert!(matches!(app.view(&model), Screen::Main(_)));
}

#[test]
fn permission_snapshot_computes_blockers_per_render() {
    let app = tester();
    let mut model = main_model();

    let mut update = unlocked("device-1");
    update.permissions.location = LocationPermission::Denied;
    let _ = app.update(Event::StatusUpdated(update), &mut model);
    assert_eq!(app.view(&model), Screen::Blocker(Blocker::LocationDenied));

    let _ = app.update(Event::StatusUpdated(unlocked("device-1")), &mut model);
    assert!(matches!(app.view(&model), Screen::Main(_)));
}

#[test]
fn order_lifecycle_from_the_screen() {
    let app = tester();
    let mut model = main_model();

    let _ = app.update(
        Event::OrdersResponse(Ok(ApiResponse {
            status: 200,
            body: GEOFENCES.into(),
        })),
        &mut model,
    );
    let _ = app.update(
        Event::SelectOrder(OrderId::new("gf-1").unwrap()),
        &mut model,
    );

    let update = app.update(Event::PickUpOrder, &mut model);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Sdk(_))));

    let _ = app.update(Event::CheckOutOrder, &mut model);
    match &model.flow {
        AppFlow::Main(main) => {
            let order = main.visits.selected_order().unwrap();
            assert!(order.geotag.is_terminal());
        }
        other => panic!("unexpected flow: {other:?}"),
    }
}
