pub mod accounts;
pub mod deep_links;
pub mod delay;
pub mod platform;
pub mod push;
pub mod sdk;
pub mod storage;

pub use self::accounts::{Accounts, AccountsOutput, ResendOutcome, VerificationOutcome};
pub use self::deep_links::DeepLinks;
pub use self::delay::{Delay, TimerId, DEEP_LINK_TIMER};
pub use self::platform::Platform;
pub use self::push::{Push, PushAuthorization};
pub use self::sdk::{GeotagRequest, Sdk};
pub use self::storage::Storage;

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::event::Event;

pub type AppAccounts = Accounts<Event>;
pub type AppDeepLinks = DeepLinks<Event>;
pub type AppDelay = Delay<Event>;
pub type AppHttp = Http<Event>;
pub type AppPlatform = Platform<Event>;
pub type AppPush = Push<Event>;
pub type AppRender = Render<Event>;
pub type AppSdk = Sdk<Event>;
pub type AppStorage = Storage<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub accounts: Accounts<Event>,
    pub deep_links: DeepLinks<Event>,
    pub delay: Delay<Event>,
    pub http: Http<Event>,
    pub platform: Platform<Event>,
    pub push: Push<Event>,
    pub render: Render<Event>,
    pub sdk: Sdk<Event>,
    pub storage: Storage<Event>,
}
