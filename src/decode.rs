//! Backend payload decoding.
//!
//! Decoding is total over malformed input: a record that cannot be
//! understood is dropped and logged, never fatal to the batch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geojson::Geometry;
use serde::Deserialize;
use tracing::debug;

use crate::geo::{polygon_centroid, Coordinate};
use crate::model::{MetaContents, MetaName, OrderId, Token, TripId};
use crate::order::{Geotag, Metadata, Order, OrderSource};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unparseable payload: {0}")]
    Malformed(String),
}

// --- Authentication ---

#[derive(Clone, Debug, Deserialize)]
pub struct AuthenticateResponse {
    pub token_type: String,
    pub expires_in: u64,
    pub access_token: String,
}

pub fn token(body: &str) -> Result<Token, DecodeError> {
    let response: AuthenticateResponse =
        serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    Token::new(response.access_token)
        .map_err(|_| DecodeError::Malformed("empty access token".into()))
}

// --- Geofences ---

/// The metadata key that links a geofence to a trip. Its presence
/// makes the order trip-sourced and eligible for the complete/cancel
/// endpoints.
const TRIP_ID_KEY: &str = "trip_id";

/// Decode a geofence array into orders. Records with a missing id,
/// an unparseable timestamp, or unusable geometry are skipped.
pub fn orders(body: &str) -> Result<Vec<Order>, DecodeError> {
    let records: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let mut orders: Vec<Order> = records.iter().filter_map(order_from_geofence).collect();
    // Decode-layer sort: oldest first, ties broken by id.
    orders.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(orders)
}

fn order_from_geofence(record: &serde_json::Value) -> Option<Order> {
    let id = record
        .get("geofence_id")
        .and_then(serde_json::Value::as_str)
        .and_then(|s| OrderId::new(s).ok());
    let Some(id) = id else {
        debug!("skipping geofence without id");
        return None;
    };

    let created_at = record
        .get("created_at")
        .and_then(serde_json::Value::as_str)
        .and_then(parse_timestamp);
    let Some(created_at) = created_at else {
        debug!(id = %id, "skipping geofence with bad created_at");
        return None;
    };

    let location = record.get("geometry").and_then(geometry_coordinate);
    let Some(location) = location else {
        debug!(id = %id, "skipping geofence with unusable geometry");
        return None;
    };

    let metadata = record
        .get("metadata")
        .and_then(serde_json::Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(key, value)| {
                    let name = MetaName::new(key.as_str()).ok()?;
                    let contents = MetaContents::new(value.as_str()?).ok()?;
                    Some((name, contents))
                })
                .collect::<BTreeMap<_, _>>()
        })
        .and_then(Metadata::from_map);

    let trip_id = metadata
        .as_ref()
        .and_then(|m| MetaName::new(TRIP_ID_KEY).ok().and_then(|k| m.get(&k).cloned()))
        .and_then(|contents| TripId::new(contents.as_str()).ok());

    Some(Order {
        id,
        created_at,
        location,
        address: None,
        metadata,
        source: if trip_id.is_some() {
            OrderSource::Trip
        } else {
            OrderSource::Geofence
        },
        trip_id,
        note: None,
        note_focused: false,
        geotag: Geotag::NotSent,
    })
}

/// One coordinate for a geofence geometry: the point itself, or the
/// spherical centroid of a polygon's exterior ring (3+ positions).
/// Unrecognized geometry types resolve to `None`.
fn geometry_coordinate(geometry: &serde_json::Value) -> Option<Coordinate> {
    let geometry: Geometry = serde_json::from_value(geometry.clone()).ok()?;
    match geometry.value {
        geojson::Value::Point(position) => position_to_coordinate(&position),
        geojson::Value::Polygon(rings) => {
            let exterior = rings.first()?;
            if exterior.len() < 3 {
                return None;
            }
            let points: Vec<Coordinate> = exterior
                .iter()
                .filter_map(|p| position_to_coordinate(p))
                .collect();
            if points.len() < 3 {
                return None;
            }
            polygon_centroid(&points)
        }
        _ => None,
    }
}

fn position_to_coordinate(position: &[f64]) -> Option<Coordinate> {
    // GeoJSON positions are lng-first.
    let lng = *position.first()?;
    let lat = *position.get(1)?;
    Coordinate::new(lat, lng).ok()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
