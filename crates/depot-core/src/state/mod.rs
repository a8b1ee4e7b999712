//! Typed access to persisted depot records.

pub mod records;

pub use records::{Batch, Records};
