//! Live-notification hub: endpoints, registry, control loop and the
//! WebSocket gateway that feeds it.

pub mod events;
pub mod fanout;
pub mod registry;
pub mod server;
pub mod session;

pub use events::{EventType, HubEvent};
pub use fanout::Hub;
pub use registry::Audience;
