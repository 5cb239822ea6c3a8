//! Deep-link reconciliation races, driven through the reducer.

use std::collections::HashSet;

use chrono::Utc;
use crux_core::testing::AppTester;

use courier_shared::deep_link::{DeepLinkPayload, DeepLinkWait, SdkConfig};
use courier_shared::model::{
    AppFlow, DialogStatus, DriverID, DriverIdFlow, Experience, LocationAccuracy,
    LocationPermission, MainFlow, ManualVisitsMode, Model, MotionPermission, Permissions,
    PublishableKey, PushStatus, Requests, SdkStatus, SdkStatusUpdate, TabSelection,
    TrackingStatus, Visits, DeviceID,
};
use courier_shared::order::{Geotag, Order, OrderSource};
use courier_shared::{App, Effect, Event};

fn tester() -> AppTester<App, Effect> {
    AppTester::default()
}

fn key(s: &str) -> PublishableKey {
    PublishableKey::new(s).unwrap()
}

fn driver(s: &str) -> DriverID {
    DriverID::new(s).unwrap()
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

fn main_flow(pk: &str, drv: &str, visits: Visits) -> MainFlow {
    MainFlow {
        visits,
        tab: TabSelection::Visits,
        places: HashSet::new(),
        history: None,
        publishable_key: key(pk),
        driver_id: driver(drv),
        device_id: DeviceID::new("device-1").unwrap(),
        tracking: TrackingStatus::Running,
        permissions: granted_permissions(),
        requests: Requests::default(),
        token: None,
        push_status: PushStatus::DialogSplash(DialogStatus::Shown),
        experience: Experience::Regular,
        deep_link: DeepLinkWait::None,
    }
}

fn order(id: &str) -> Order {
    Order {
        id: courier_shared::model::OrderId::new(id).unwrap(),
        created_at: Utc::now(),
        location: courier_shared::geo::Coordinate::new(37.7749, -122.4194).unwrap(),
        address: None,
        metadata: None,
        source: OrderSource::Geofence,
        trip_id: None,
        note: None,
        note_focused: false,
        geotag: Geotag::NotSent,
    }
}

fn payload(pk: &str, drv: Option<&str>, mode: Option<ManualVisitsMode>) -> DeepLinkPayload {
    DeepLinkPayload {
        publishable_key: key(pk),
        driver_id: drv.map(driver),
        manual_visits: mode,
    }
}

fn has_sdk_effect(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Sdk(_)))
}

#[test]
fn timer_fire_without_payload_returns_driver_id_flow_to_idle() {
    let app = tester();
    let mut model = Model {
        flow: AppFlow::DriverId(DriverIdFlow {
            driver_id: None,
            publishable_key: key("K1"),
            manual_visits: None,
            deep_link: DeepLinkWait::WaitingForDeepLink,
        }),
        network_online: true,
    };

    let update = app.update(Event::DeepLinkTimerFired, &mut model);

    match &model.flow {
        AppFlow::DriverId(flow) => assert_eq!(flow.deep_link, DeepLinkWait::None),
        other => panic!("unexpected flow: {other:?}"),
    }
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Delay(_))));
    assert!(!has_sdk_effect(&update.effects));
}

#[test]
fn identical_key_and_driver_resolve_without_sdk_remake() {
    let app = tester();
    let mut main = main_flow("K1", "D1", Visits::Assigned(HashSet::new()));
    main.deep_link = DeepLinkWait::WaitingForTimer(payload("K1", Some("D1"), None));
    let mut model = Model {
        flow: AppFlow::Main(Box::new(main)),
        network_online: true,
    };

    let update = app.update(Event::DeepLinkTimerFired, &mut model);

    match &model.flow {
        AppFlow::Main(main) => assert_eq!(main.deep_link, DeepLinkWait::None),
        other => panic!("unexpected flow: {other:?}"),
    }
    assert!(!has_sdk_effect(&update.effects));
}

#[test]
fn changed_key_invokes_sdk_remake_and_waits() {
    let app = tester();
    let mut main = main_flow("K1", "D1", Visits::Assigned(HashSet::new()));
    main.deep_link = DeepLinkWait::WaitingForTimer(payload("K2", Some("D1"), None));
    let mut model = Model {
        flow: AppFlow::Main(Box::new(main)),
        network_online: true,
    };

    let update = app.update(Event::DeepLinkTimerFired, &mut model);

    match &model.flow {
        AppFlow::Main(main) => assert_eq!(
            main.deep_link,
            DeepLinkWait::WaitingForSdk(SdkConfig {
                publishable_key: key("K2"),
                driver_id: driver("D1"),
                manual_visits: Some(ManualVisitsMode::Hide),
            })
        ),
        other => panic!("unexpected flow: {other:?}"),
    }
    assert!(has_sdk_effect(&update.effects));
}

#[test]
fn payload_without_driver_id_is_discarded_wholesale() {
    let app = tester();
    let mut main = main_flow("K1", "D1", Visits::Assigned(HashSet::new()));
    main.deep_link = DeepLinkWait::WaitingForTimer(payload("K2", None, Some(ManualVisitsMode::Show)));
    let mut model = Model {
        flow: AppFlow::Main(Box::new(main)),
        network_online: true,
    };

    let update = app.update(Event::DeepLinkTimerFired, &mut model);

    match &model.flow {
        AppFlow::Main(main) => {
            assert_eq!(main.deep_link, DeepLinkWait::None);
            assert_eq!(main.publishable_key, key("K1"));
            assert_eq!(main.visits.mode(), ManualVisitsMode::Hide);
        }
        other => panic!("unexpected flow: {other:?}"),
    }
    assert!(!has_sdk_effect(&update.effects));
}

#[test]
fn latest_payload_wins_while_waiting_for_timer() {
    let app = tester();
    let mut main = main_flow("K1", "D1", Visits::Assigned(HashSet::new()));
    main.deep_link = DeepLinkWait::WaitingForTimer(payload("K2", Some("D2"), None));
    let mut model = Model {
        flow: AppFlow::Main(Box::new(main)),
        network_online: true,
    };

    let _ = app.update(
        Event::ReceivedDeepLink(payload("K3", Some("D3"), None)),
        &mut model,
    );

    match &model.flow {
        AppFlow::Main(main) => assert_eq!(
            main.deep_link,
            DeepLinkWait::WaitingForTimer(payload("K3", Some("D3"), None))
        ),
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn mode_toggle_under_same_key_converts_orders_losslessly() {
    let app = tester();
    let orders: HashSet<Order> = [order("o-1"), order("o-2")].into_iter().collect();
    let mut main = main_flow("K1", "D1", Visits::Assigned(orders));
    main.deep_link =
        DeepLinkWait::WaitingForTimer(payload("K1", Some("D1"), Some(ManualVisitsMode::Show)));
    let mut model = Model {
        flow: AppFlow::Main(Box::new(main)),
        network_online: true,
    };

    // A representation switch goes through SDK re-initialization.
    let update = app.update(Event::DeepLinkTimerFired, &mut model);
    assert!(has_sdk_effect(&update.effects));

    let _ = app.update(Event::MadeSdk(unlocked("device-2")), &mut model);

    match &model.flow {
        AppFlow::Main(main) => {
            assert_eq!(main.visits.mode(), ManualVisitsMode::Show);
            assert_eq!(main.visits.orders().len(), 2);
            assert_eq!(main.device_id.as_str(), "device-2");
        }
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn key_switch_resets_visits_to_empty() {
    let app = tester();
    let orders: HashSet<Order> = [order("o-1")].into_iter().collect();
    let mut main = main_flow("K1", "D1", Visits::Assigned(orders));
    main.deep_link = DeepLinkWait::WaitingForTimer(payload("K2", Some("D1"), None));
    let mut model = Model {
        flow: AppFlow::Main(Box::new(main)),
        network_online: true,
    };

    let _ = app.update(Event::DeepLinkTimerFired, &mut model);
    let _ = app.update(Event::MadeSdk(unlocked("device-2")), &mut model);

    match &model.flow {
        AppFlow::Main(main) => {
            assert_eq!(main.publishable_key, key("K2"));
            assert!(main.visits.orders().is_empty());
            assert!(main.token.is_none());
        }
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn locked_sdk_abandons_the_waiting_flow() {
    let app = tester();
    let mut model = Model {
        flow: AppFlow::DriverId(DriverIdFlow {
            driver_id: Some(driver("D1")),
            publishable_key: key("K1"),
            manual_visits: None,
            deep_link: DeepLinkWait::WaitingForSdk(SdkConfig {
                publishable_key: key("K1"),
                driver_id: driver("D1"),
                manual_visits: None,
            }),
        }),
        network_online: true,
    };

    let _ = app.update(
        Event::MadeSdk(SdkStatusUpdate {
            status: SdkStatus::Locked,
            permissions: granted_permissions(),
        }),
        &mut model,
    );

    assert!(matches!(model.flow, AppFlow::NoMotionServices));
}

#[test]
fn driver_id_submission_reaches_main_once_sdk_unlocks() {
    let app = tester();
    let mut model = Model {
        flow: AppFlow::DriverId(DriverIdFlow {
            driver_id: Some(driver("D1")),
            publishable_key: key("K1"),
            manual_visits: None,
            deep_link: DeepLinkWait::None,
        }),
        network_online: true,
    };

    let update = app.update(Event::SubmitDriverId, &mut model);
    assert!(has_sdk_effect(&update.effects));

    let _ = app.update(Event::MadeSdk(unlocked("device-1")), &mut model);

    match &model.flow {
        AppFlow::Main(main) => {
            assert_eq!(main.publishable_key, key("K1"));
            assert_eq!(main.driver_id, driver("D1"));
            assert_eq!(main.experience, Experience::FirstRun);
            assert!(main.visits.orders().is_empty());
        }
        other => panic!("unexpected flow: {other:?}"),
    }
}
