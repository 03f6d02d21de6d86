//! # Boxoffice Runtime
//!
//! The three behaviours at the heart of the booking service, written against
//! the adapter contracts in `boxoffice-core`:
//!
//! - [`AdmissionController`]: decides under a per-event row lock whether a
//!   booking gets a seat, then publishes a confirmation on a best-effort basis
//! - [`NotificationConsumer`]: turns confirmations into notification log rows,
//!   surviving per-message failures and bus reconnects
//! - [`EventCatalog`]: read-through TTL cache in front of event metadata
//!
//! Supporting modules: [`retry`] (exponential backoff) and [`metrics`]
//! (Prometheus recorder and metric names).
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_runtime::AdmissionController;
//!
//! let controller = AdmissionController::new(store, event_bus, clock);
//! let confirmation = controller.book(&user_id, &event_id).await?;
//! println!("booked {}", confirmation.booking_id);
//! ```

pub mod admission;
pub mod catalog;
pub mod consumer;
pub mod metrics;
pub mod retry;

pub use admission::AdmissionController;
pub use catalog::{CachedEvent, CatalogError, EventCatalog};
pub use consumer::{FailurePolicy, NotificationConsumer};
pub use retry::RetryPolicy;
