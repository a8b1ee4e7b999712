//! Core engine for the depot back office.
//!
//! This crate holds the order lifecycle and trip dispatch controllers, payment
//! and invoice handling, catalog administration and the read model. Every
//! mutating operation runs under the engine's write lock, commits its records
//! in one storage batch and returns the events it produced; the engine
//! publishes those events after the commit and the [`dispatch::EventDispatcher`]
//! turns them into audit entries and notifications.

pub mod audit;
pub mod builder;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod query;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::{BuilderError, DepotBuilder, DepotFactories};
pub use engine::{event_bus::EventBus, DepotEngine, EngineError};
pub use error::DepotError;
