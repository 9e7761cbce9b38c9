//! Ride-hailing trip dashboard: load a CSV of rides once, filter it by date
//! range, category selections and free text, then summarize the filtered
//! subset with a fixed catalogue of aggregations and export it back to CSV.
pub mod cache;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{DashboardError, QueryError};
pub use filter::{apply, FilterOptions, FilterSpec};
pub use types::{Column, Dataset, RideRecord};
