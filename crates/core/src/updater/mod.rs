//! Writing enhancement text back to tenants' ticketing systems.

mod client;
mod config;
mod http_client;
mod retry;
mod router;

pub use client::{TicketUpdate, TicketingClient, TicketingError};
pub use config::UpdaterConfig;
pub use http_client::HttpTicketingClient;
pub use retry::{UpdateError, UpdateResult, Updater};
pub use router::{ClientFactory, RouterError, ToolRegistry, ToolRouter};
