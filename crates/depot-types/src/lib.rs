//! Common types module for the depot back office.
//!
//! This module defines the domain entities, status state machines, events and
//! query types shared by every depot crate. Keeping them in one place keeps the
//! storage, engine and HTTP layers in agreement about the data they exchange.

/// API types for HTTP endpoints and error envelopes.
pub mod api;
/// Billing types: payments, invoices, balances and receivables.
pub mod billing;
/// Catalog types: stores, warehouses, products and inventory.
pub mod catalog;
/// Event types produced by mutating operations for post-commit dispatch.
pub mod events;
/// Monetary totals and rounding rules.
pub mod money;
/// Order entity and the order lifecycle state machine.
pub mod order;
/// Read model query, sort and paging types.
pub mod query;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Storage namespaces.
pub mod storage;
/// Trip entity and the trip dispatch state machine.
pub mod trip;
/// Users, roles and the per-request actor context.
pub mod user;
/// Utility functions for formatting.
pub mod utils;
/// Configuration validation types for pluggable implementations.
pub mod validation;

pub use api::*;
pub use billing::*;
pub use catalog::*;
pub use events::*;
pub use money::*;
pub use order::*;
pub use query::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use trip::*;
pub use user::*;
pub use utils::truncate_id;
pub use validation::*;
