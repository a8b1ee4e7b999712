//! Route handlers for the depot API, grouped by resource.
//!
//! Handlers only translate between HTTP and engine calls; every rule lives in
//! the engine. Engine rejections become [`depot_types::APIError`] responses.

pub mod admin;
pub mod billing;
pub mod orders;
pub mod trips;
