//! Core types, configuration, and region-keyed caching for Stowage.
//!
//! This crate provides the building blocks shared by the reconciliation
//! engine and the command-line front end: strongly typed AWS identifiers,
//! process-wide configuration, and a concurrent cache used to hold one
//! remote client per region.

mod cache;
mod config;
mod error;
mod types;

pub use cache::RegionCache;
pub use config::{LogFormat, StowageConfig};
pub use error::StowageError;
pub use types::{AccountId, AwsRegion};
