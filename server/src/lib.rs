//! # Boxoffice Server
//!
//! Wires the `PostgreSQL` store, Redpanda bus and Redis cache into the HTTP
//! surface and the notification consumer, and runs them until shutdown.

pub mod config;
pub mod lifecycle;
pub mod resources;

pub use config::Config;
pub use lifecycle::Application;
pub use resources::Resources;
