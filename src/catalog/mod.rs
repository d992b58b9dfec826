//! Catalog core: category paths, subtree scoping, ledger folding, product
//! views, listing and dashboard reductions.
//!
//! Nothing in here touches the database. Callers load a per-request snapshot
//! and pass it in.

pub mod dashboard;
pub mod hierarchy;
pub mod ledger;
pub mod listing;
pub mod movements;
pub mod view;

pub use dashboard::{Dashboard, DashboardSummary};
pub use hierarchy::{AncestryWalk, CategoryTree};
pub use listing::{Page, PageRequest, ProductFilter, SortKey, SortOrder};
pub use movements::{MovementFilter, MovementView};
pub use view::{materialize, materialize_all, ProductView};
