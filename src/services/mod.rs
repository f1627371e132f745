//! Request-level operations over the record store.
//!
//! - [`ListingService`]: filtered, searched, paginated reads
//! - [`AggregationService`]: totals, breakdowns, windows, monthly series
//! - [`DashboardComposer`]: the merged admin home view
//! - [`MutationService`]: creates, edits, and deletes
//! - [`params`]: conversion of raw request parameters into typed values

mod aggregation;
mod dashboard;
mod listing;
mod mutation;
pub mod params;

pub use aggregation::*;
pub use dashboard::*;
pub use listing::*;
pub use mutation::*;
pub use params::{PageRequest, Params};
