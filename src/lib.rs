//! Vendor Match - scoring and match maintenance for the expansion platform
//!
//! Ranks vendors against client projects, persists the eligible matches,
//! keeps them fresh on a daily schedule and notifies clients of new matches.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchError, MatchService, Matcher, RefreshDriver, RefreshReport, Stores};
pub use models::{MatchCriteria, MatchResult, Project, RebuildSummary, Vendor};
