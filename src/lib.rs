//! Shared core of the courier visit-tracking app.
//!
//! The crate is a Crux app: [`app::App`] reduces [`event::Event`]s
//! against [`model::Model`] and describes every side effect as a
//! capability operation for the shell to execute. Shells render
//! [`screen::Screen`], the projection of the current flow state, and
//! feed user interaction back through [`screen::to_event`].

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod decode;
pub mod deep_link;
pub mod event;
pub mod geo;
pub mod model;
pub mod order;
pub mod restoration;
pub mod screen;

pub use api::{ApiError, ApiResponse};
pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use decode::DecodeError;
pub use event::Event;
pub use model::{Model, ValidationError};
pub use order::TransitionError;
pub use screen::{Screen, ScreenAction};

/// How long a deep link gets to beat the timer.
pub const DEEP_LINK_TIMEOUT_MS: u64 = 5_000;
