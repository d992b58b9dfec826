//! Persisted data models for the stock ledger.
//!
//! Field names serialize in camelCase for the JSON surface.

mod category;
mod movement;
mod product;

pub use category::*;
pub use movement::*;
pub use product::*;
