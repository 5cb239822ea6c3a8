//! Backend request contracts.
//!
//! The shell performs the I/O; this module builds the requests and
//! normalizes their raw responses. Payload decoding lives in
//! [`crate::decode`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use crux_http::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::AppHttp;
use crate::event::Event;
use crate::model::{DeviceID, OrderId, OrderNote, PublishableKey, Token, TripId};

pub const AUTH_URL: &str = "https://live-api.htprod.hypertrack.com/authenticate";
pub const CLIENT_URL: &str = "https://live-app-backend.htprod.hypertrack.com/client";

/// A normalized raw response: status and body, with transport errors
/// already folded into [`ApiError`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ApiError {
    /// The bearer token is no longer accepted; re-authentication is
    /// required, nothing else is wrong.
    #[error("token expired")]
    TokenExpired,
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("server error: status {status}")]
    Server { status: u16 },
    #[error("network failure: {0}")]
    Network(String),
}

pub type ApiResult = Result<ApiResponse, ApiError>;

fn into_result(response: crux_http::Result<Response<String>>) -> ApiResult {
    match response {
        Ok(mut response) => Ok(ApiResponse {
            status: response.status().into(),
            body: response.take_body().unwrap_or_default(),
        }),
        Err(error) => Err(ApiError::Network(error.to_string())),
    }
}

/// Map a raw result onto the §6 error contract: 2xx passes the body
/// through, 401 is the typed expired-token condition.
pub fn expect_success(result: ApiResult) -> Result<String, ApiError> {
    let response = result?;
    match response.status {
        200..=299 => Ok(response.body),
        401 => Err(ApiError::TokenExpired),
        status @ 400..=499 => Err(ApiError::Auth(format!("rejected with status {status}"))),
        status => Err(ApiError::Server { status }),
    }
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    device_id: &'a str,
}

/// `POST /authenticate`, Basic auth of the publishable key.
pub fn authenticate(http: &AppHttp, publishable_key: &PublishableKey, device_id: &DeviceID) {
    debug!("authenticate");
    let credentials = BASE64.encode(publishable_key.as_str());
    let request = http
        .post(AUTH_URL)
        .header("Authorization", format!("Basic {credentials}"))
        .body_json(&AuthenticateRequest {
            device_id: device_id.as_str(),
        });
    match request {
        Ok(builder) => builder
            .expect_string()
            .send(|response| Event::TokenResponse(into_result(response))),
        Err(error) => warn!(%error, "failed to encode authenticate request"),
    }
}

/// `GET /client/devices/{device}/geofences`, Bearer auth.
pub fn get_orders(http: &AppHttp, token: &Token, device_id: &DeviceID) {
    debug!("getOrders");
    http.get(format!("{CLIENT_URL}/devices/{device_id}/geofences"))
        .header("Authorization", format!("Bearer {}", token.expose()))
        .expect_string()
        .send(|response| Event::OrdersResponse(into_result(response)));
}

/// `POST /client/trips/{trip}/orders/{order}/complete`.
pub fn complete_order(http: &AppHttp, token: &Token, trip_id: &TripId, order_id: &OrderId) {
    debug!(order = %order_id, "completeOrder");
    let id = order_id.clone();
    http.post(format!(
        "{CLIENT_URL}/trips/{trip_id}/orders/{order_id}/complete"
    ))
    .header("Authorization", format!("Bearer {}", token.expose()))
    .expect_string()
    .send(move |response| Event::OrderCompleteResponse {
        order_id: id,
        result: into_result(response),
    });
}

/// `POST /client/trips/{trip}/orders/{order}/cancel`.
pub fn cancel_order(http: &AppHttp, token: &Token, trip_id: &TripId, order_id: &OrderId) {
    debug!(order = %order_id, "cancelOrder");
    let id = order_id.clone();
    http.post(format!(
        "{CLIENT_URL}/trips/{trip_id}/orders/{order_id}/cancel"
    ))
    .header("Authorization", format!("Bearer {}", token.expose()))
    .expect_string()
    .send(move |response| Event::OrderCancelResponse {
        order_id: id,
        result: into_result(response),
    });
}

#[derive(Serialize)]
struct NotePatch<'a> {
    metadata: NoteMetadata<'a>,
}

#[derive(Serialize)]
struct NoteMetadata<'a> {
    visits_app: NoteBody<'a>,
}

#[derive(Serialize)]
struct NoteBody<'a> {
    note: &'a str,
}

/// `PATCH /client/trips/{trip}/orders/{order}` with the note tucked
/// under `metadata.visits_app.note`.
pub fn update_order_note(
    http: &AppHttp,
    token: &Token,
    trip_id: &TripId,
    order_id: &OrderId,
    note: &OrderNote,
) {
    debug!(order = %order_id, "updateOrderNote");
    let id = order_id.clone();
    let request = http
        .patch(format!("{CLIENT_URL}/trips/{trip_id}/orders/{order_id}"))
        .header("Authorization", format!("Bearer {}", token.expose()))
        .body_json(&NotePatch {
            metadata: NoteMetadata {
                visits_app: NoteBody {
                    note: note.as_str(),
                },
            },
        });
    match request {
        Ok(builder) => builder
            .expect_string()
            .send(move |response| Event::NoteUpdateResponse {
                order_id: id,
                result: into_result(response),
            }),
        Err(error) => warn!(%error, "failed to encode note update"),
    }
}
