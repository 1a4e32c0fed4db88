use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    ClientRef, Match, MatchDetails, MatchResult, MatchWithVendor, Project, SlaSweepReport, Vendor,
    VendorSummary,
};
use crate::services::store::{MatchStore, ProjectStore, StoreError, VendorStore};

/// Rows per INSERT statement; keeps bind parameters well under the protocol limit
const INSERT_BATCH_SIZE: usize = 1000;

const PROJECT_COLUMNS: &str = r#"
    p.id, p.country, p.services_needed, p.budget, p.status, p.created_at, p.updated_at,
    c.id AS client_id, c.company_name, c.contact_email
"#;

const MATCH_WITH_VENDOR_COLUMNS: &str = r#"
    m.id, m.project_id, m.vendor_id, m.score, m.match_details, m.created_at, m.updated_at,
    v.name AS vendor_name, v.rating, v.response_sla_hours, v.countries_supported, v.services_offered
"#;

/// PostgreSQL-backed store for projects, vendors and matches
///
/// Projects, clients and vendors are maintained by the platform's CRUD
/// services; this client only reads them, except for the vendor SLA flag.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn project_from_row(row: &PgRow) -> Result<Project, StoreError> {
    Ok(Project {
        id: row.try_get("id")?,
        client: ClientRef {
            id: row.try_get("client_id")?,
            company_name: row.try_get("company_name")?,
            contact_email: row.try_get("contact_email")?,
        },
        country: row.try_get("country")?,
        services_needed: row.try_get("services_needed")?,
        budget: row.try_get("budget")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn vendor_from_row(row: &PgRow) -> Result<Vendor, StoreError> {
    Ok(Vendor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        countries_supported: row.try_get("countries_supported")?,
        services_offered: row.try_get("services_offered")?,
        rating: row.try_get("rating")?,
        response_sla_hours: row.try_get("response_sla_hours")?,
        sla_expires_at: row.try_get("sla_expires_at")?,
        sla_expired: row.try_get("sla_expired")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    let details: Json<MatchDetails> = row.try_get("match_details")?;

    Ok(Match {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        vendor_id: row.try_get("vendor_id")?,
        score: row.try_get("score")?,
        match_details: details.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn match_with_vendor_from_row(row: &PgRow) -> Result<MatchWithVendor, StoreError> {
    let record = match_from_row(row)?;
    let vendor = VendorSummary {
        id: record.vendor_id,
        name: row.try_get("vendor_name")?,
        rating: row.try_get("rating")?,
        response_sla_hours: row.try_get("response_sla_hours")?,
        countries_supported: row.try_get("countries_supported")?,
        services_offered: row.try_get("services_offered")?,
    };

    Ok(MatchWithVendor { record, vendor })
}

fn count_to_u64(count: i64) -> u64 {
    count.max(0) as u64
}

#[async_trait]
impl ProjectStore for PostgresClient {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let query = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p JOIN clients c ON c.id = p.client_id WHERE p.id = $1"
        );

        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(project_from_row).transpose()
    }

    async fn find_all_active(&self) -> Result<Vec<Project>, StoreError> {
        let query = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p JOIN clients c ON c.id = p.client_id \
             WHERE p.status = 'active' ORDER BY p.created_at, p.id"
        );

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter().map(project_from_row).collect()
    }
}

#[async_trait]
impl VendorStore for PostgresClient {
    async fn find_all(&self) -> Result<Vec<Vendor>, StoreError> {
        let query = r#"
            SELECT id, name, countries_supported, services_offered, rating,
                   response_sla_hours, sla_expires_at, sla_expired
            FROM vendors
            ORDER BY id
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter().map(vendor_from_row).collect()
    }

    /// Two bulk conditional updates in one transaction
    async fn refresh_sla_flags(&self, now: DateTime<Utc>) -> Result<SlaSweepReport, StoreError> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(
            r#"
            UPDATE vendors SET sla_expired = TRUE
            WHERE sla_expires_at IS NOT NULL AND sla_expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let valid = sqlx::query(
            r#"
            UPDATE vendors SET sla_expired = FALSE
            WHERE sla_expires_at IS NULL OR sla_expires_at >= $1
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SlaSweepReport {
            expired: expired.rows_affected(),
            valid: valid.rows_affected(),
        })
    }
}

#[async_trait]
impl MatchStore for PostgresClient {
    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<Match>, StoreError> {
        let query = r#"
            SELECT id, project_id, vendor_id, score, match_details, created_at, updated_at
            FROM matches
            WHERE project_id = $1
            ORDER BY id
        "#;

        let rows = sqlx::query(query).bind(project_id).fetch_all(&self.pool).await?;

        rows.iter().map(match_from_row).collect()
    }

    /// Delete and re-insert inside one transaction
    ///
    /// The project row is locked first so two rebuilds of the same project
    /// queue behind each other instead of racing on the unique
    /// (project_id, vendor_id) constraint. Readers keep seeing the previous
    /// set until commit.
    async fn replace_for_project(
        &self,
        project_id: Uuid,
        results: &[MatchResult],
    ) -> Result<Vec<Match>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM matches WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(results.len());

        for batch in results.chunks(INSERT_BATCH_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO matches (project_id, vendor_id, score, match_details) ",
            );

            builder.push_values(batch, |mut row, result| {
                row.push_bind(project_id)
                    .push_bind(result.vendor.id)
                    .push_bind(result.score)
                    .push_bind(Json(result.match_details.clone()));
            });
            builder.push(
                " RETURNING id, project_id, vendor_id, score, match_details, created_at, updated_at",
            );

            let rows = builder.build().fetch_all(&mut *tx).await?;
            for row in &rows {
                inserted.push(match_from_row(row)?);
            }
        }

        tx.commit().await?;

        tracing::debug!(
            "Replaced matches for project {}: {} removed, {} inserted",
            project_id,
            deleted.rows_affected(),
            inserted.len()
        );

        Ok(inserted)
    }

    async fn page_for_project(
        &self,
        project_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<MatchWithVendor>, u64), StoreError> {
        let query = format!(
            "SELECT {MATCH_WITH_VENDOR_COLUMNS} FROM matches m JOIN vendors v ON v.id = m.vendor_id \
             WHERE m.project_id = $1 \
             ORDER BY m.score DESC, m.created_at DESC \
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query(&query)
            .bind(project_id)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;

        let matches = rows
            .iter()
            .map(match_with_vendor_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((matches, count_to_u64(total)))
    }

    async fn page_all(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<MatchWithVendor>, u64), StoreError> {
        let query = format!(
            "SELECT {MATCH_WITH_VENDOR_COLUMNS} FROM matches m JOIN vendors v ON v.id = m.vendor_id \
             ORDER BY m.created_at DESC, m.id DESC \
             LIMIT $1 OFFSET $2"
        );

        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches")
            .fetch_one(&self.pool)
            .await?;

        let matches = rows
            .iter()
            .map(match_with_vendor_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((matches, count_to_u64(total)))
    }

    async fn find_by_id(&self, match_id: i64) -> Result<Option<MatchWithVendor>, StoreError> {
        let query = format!(
            "SELECT {MATCH_WITH_VENDOR_COLUMNS} FROM matches m JOIN vendors v ON v.id = m.vendor_id \
             WHERE m.id = $1"
        );

        let row = sqlx::query(&query).bind(match_id).fetch_optional(&self.pool).await?;

        row.as_ref().map(match_with_vendor_from_row).transpose()
    }

    async fn delete(&self, match_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(match_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
