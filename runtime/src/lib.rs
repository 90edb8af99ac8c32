//! Async side of the replydesk widget: where ticket data comes from, how the
//! customer profile is looked up, and the controller that ties both to a
//! single resolution state machine.

pub mod config;
pub mod controller;
pub mod fallback;
pub mod host;
pub mod lookup;
pub mod session;

pub use config::RuntimeConfig;
pub use controller::{AttemptStatus, ResolutionController, WidgetSnapshot};
pub use fallback::QueryParams;
pub use host::{FileHostSdk, HostCapabilityLoader, HostClient, HostError, HostSdk};
pub use lookup::{HttpTransport, JsonTransport, LookupError, ProfileLookup};
pub use session::SessionStore;
