//! Request-scoped services composing store reads with the catalog core.

mod inventory;

pub use inventory::*;
