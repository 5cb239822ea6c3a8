//! Restoration round-trips for every representable screen.

use std::collections::HashSet;

use chrono::{TimeZone, Utc};

use courier_shared::geo::{Address, Coordinate};
use courier_shared::model::{
    DialogStatus, DriverID, Email, Experience, FullAddress, OrderId, Place, PlaceId,
    PublishableKey, PushStatus, Street, TabSelection,
};
use courier_shared::order::{Geotag, Order, OrderSource, VisitedInfo};
use courier_shared::restoration::{decode, encode, StorageState};

fn order(id: &str, geotag: Geotag) -> Order {
    Order {
        id: OrderId::new(id).unwrap(),
        created_at: Utc.timestamp_opt(1_612_000_000, 0).unwrap(),
        location: Coordinate::new(37.7749, -122.4194).unwrap(),
        address: Address::from_parts(
            Some(Street::new("Main St 5").unwrap()),
            Some(FullAddress::new("Main St 5, Springfield").unwrap()),
        ),
        metadata: None,
        source: OrderSource::Geofence,
        trip_id: None,
        note: None,
        note_focused: false,
        geotag,
    }
}

fn place(id: &str) -> Place {
    Place {
        id: PlaceId::new(id).unwrap(),
        created_at: Utc.timestamp_opt(1_612_000_000, 0).unwrap(),
        location: Coordinate::new(37.0, -122.0).unwrap(),
        address: None,
    }
}

#[test]
fn main_screen_round_trips_with_orders_and_places() {
    let now = Utc.timestamp_opt(1_612_000_500, 0).unwrap();
    let orders: HashSet<Order> = [
        order("a", Geotag::NotSent),
        order("b", Geotag::Entered { at: now }),
        order(
            "c",
            Geotag::CheckedOut {
                visited: Some(VisitedInfo::Entered { at: now }),
                at: now,
            },
        ),
    ]
    .into_iter()
    .collect();
    let places: HashSet<Place> = [place("p-1"), place("p-2")].into_iter().collect();

    let state = StorageState::Main {
        orders: orders.clone(),
        places: places.clone(),
        tab: TabSelection::Places,
        publishable_key: PublishableKey::new("K1").unwrap(),
        driver_id: DriverID::new("D1").unwrap(),
        push_status: PushStatus::DialogSplash(DialogStatus::Shown),
        experience: Experience::FirstRun,
    };

    match decode(&encode(&state)) {
        Some(StorageState::Main {
            orders: restored_orders,
            places: restored_places,
            tab,
            publishable_key,
            driver_id,
            push_status,
            experience,
        }) => {
            assert_eq!(restored_orders, orders);
            assert_eq!(restored_places, places);
            assert_eq!(tab, TabSelection::Places);
            assert_eq!(publishable_key.as_str(), "K1");
            assert_eq!(driver_id.as_str(), "D1");
            assert_eq!(push_status, PushStatus::DialogSplash(DialogStatus::Shown));
            assert_eq!(experience, Experience::FirstRun);
        }
        other => panic!("expected main, got {other:?}"),
    }
}

#[test]
fn driver_id_screen_round_trips() {
    for driver_id in [None, Some(DriverID::new("D1").unwrap())] {
        let state = StorageState::DriverId {
            driver_id,
            publishable_key: PublishableKey::new("K1").unwrap(),
        };
        assert_eq!(decode(&encode(&state)), Some(state));
    }
}

#[test]
fn sign_up_and_sign_in_round_trip() {
    for email in [None, Some(Email::new("a@b.test").unwrap())] {
        let sign_up = StorageState::SignUp {
            email: email.clone(),
        };
        assert_eq!(decode(&encode(&sign_up)), Some(sign_up));

        let sign_in = StorageState::SignIn { email };
        assert_eq!(decode(&encode(&sign_in)), Some(sign_in));
    }
}

#[test]
fn record_survives_a_json_round_trip() {
    // The record itself travels through the shell as serialized data.
    let state = StorageState::Main {
        orders: [order("a", Geotag::PickedUp)].into_iter().collect(),
        places: HashSet::new(),
        tab: TabSelection::Visits,
        publishable_key: PublishableKey::new("K1").unwrap(),
        driver_id: DriverID::new("D1").unwrap(),
        push_status: PushStatus::default(),
        experience: Experience::Regular,
    };
    let record = encode(&state);
    let json = serde_json::to_string(&record).unwrap();
    let reparsed = serde_json::from_str(&json).unwrap();
    assert_eq!(record, reparsed);
    assert_eq!(decode(&reparsed), Some(state));
}
