//! City-gas induction conversion analysis.
//!
//! Loads monthly meter records, derives the estimated number of households
//! that moved from gas ranges to induction cooktops, aggregates them with
//! stock (year-end) or flow (all-month) policies, and estimates the sales
//! volume lost to the conversion, optionally against reported sales.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod derive;
pub mod error;
pub mod filter;
pub mod loader;
pub mod loss;
pub mod normalize;
pub mod observability;
pub mod output;
pub mod period;
pub mod reports;
pub mod sales;
pub mod source;
pub mod types;
pub mod util;
