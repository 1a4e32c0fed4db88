//! Storage traits the matching core depends on.
//!
//! `PostgresClient` implements them for production and `MemoryStore` for
//! tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Match, MatchResult, MatchWithVendor, Project, SlaSweepReport, Vendor};

/// Errors that can occur in a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid stored data: {0}")]
    Decode(String),
}

/// Read access to client projects
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch a project together with its owning client
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// All projects whose status is active
    async fn find_all_active(&self) -> Result<Vec<Project>, StoreError>;
}

/// Vendor reads and the SLA flag sweep
#[async_trait]
pub trait VendorStore: Send + Sync {
    /// The whole vendor table, in id order
    async fn find_all(&self) -> Result<Vec<Vendor>, StoreError>;

    /// Recompute `sla_expired` for every vendor relative to `now`
    ///
    /// Vendors whose `sla_expires_at` is set and earlier than `now` are
    /// flagged; all others are cleared.
    async fn refresh_sla_flags(&self, now: DateTime<Utc>) -> Result<SlaSweepReport, StoreError>;
}

/// Persistence of computed matches
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Current matches for a project
    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<Match>, StoreError>;

    /// Atomically swap a project's match set for `results`
    ///
    /// Concurrent replaces of the same project are serialized, and readers
    /// see either the old set or the new one.
    async fn replace_for_project(
        &self,
        project_id: Uuid,
        results: &[MatchResult],
    ) -> Result<Vec<Match>, StoreError>;

    /// One page of a project's matches, best score first, plus the total count
    async fn page_for_project(
        &self,
        project_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<MatchWithVendor>, u64), StoreError>;

    /// One page across all projects, newest first, plus the total count
    async fn page_all(&self, offset: u64, limit: u32)
        -> Result<(Vec<MatchWithVendor>, u64), StoreError>;

    async fn find_by_id(&self, match_id: i64) -> Result<Option<MatchWithVendor>, StoreError>;

    /// Returns whether a row was removed
    async fn delete(&self, match_id: i64) -> Result<bool, StoreError>;

    /// Health check for the backing store
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
