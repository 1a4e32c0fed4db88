use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a client project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Paused,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account role carried in access tokens and the clients table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "client_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
}

/// Owning client of a project, loaded alongside it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: i32,
    pub company_name: String,
    pub contact_email: String,
}

/// A client's market-expansion project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub client: ClientRef,
    pub country: String,
    pub services_needed: Vec<String>,
    pub budget: Decimal,
    pub status: ProjectStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }

    /// Whether the given viewer may read this project's matches
    pub fn is_visible_to(&self, viewer: &Viewer) -> bool {
        viewer.is_admin() || self.client.id == viewer.client_id
    }
}

/// Service provider registered on the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i32,
    pub name: String,
    pub countries_supported: Vec<String>,
    pub services_offered: Vec<String>,
    #[serde(default)]
    pub rating: Option<Decimal>,
    pub response_sla_hours: i32,
    #[serde(default)]
    pub sla_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sla_expired: bool,
}

impl Vendor {
    /// Helper to get the rating, treating a missing rating as zero
    pub fn rating_or_zero(&self) -> Decimal {
        self.rating.unwrap_or(Decimal::ZERO)
    }
}

/// Vendor fields echoed back in match results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub id: i32,
    pub name: String,
    pub rating: Option<Decimal>,
    pub response_sla_hours: i32,
    pub countries_supported: Vec<String>,
    pub services_offered: Vec<String>,
}

impl From<&Vendor> for VendorSummary {
    fn from(vendor: &Vendor) -> Self {
        Self {
            id: vendor.id,
            name: vendor.name.clone(),
            rating: vendor.rating,
            response_sla_hours: vendor.response_sla_hours,
            countries_supported: vendor.countries_supported.clone(),
            services_offered: vendor.services_offered.clone(),
        }
    }
}

/// Breakdown of how a match score was composed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    #[serde(rename = "servicesOverlap")]
    pub services_overlap: Vec<String>,
    #[serde(rename = "countryMatch")]
    pub country_match: bool,
    #[serde(rename = "serviceScore")]
    pub service_score: Decimal,
    #[serde(rename = "ratingBonus")]
    pub rating_bonus: Decimal,
    #[serde(rename = "slaBonus")]
    pub sla_bonus: Decimal,
    #[serde(rename = "reasonForScore")]
    pub reason_for_score: String,
}

/// Eligible (project, vendor) pairing produced by the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub vendor: VendorSummary,
    pub score: Decimal,
    #[serde(rename = "matchDetails")]
    pub match_details: MatchDetails,
}

/// Persisted match row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    #[serde(rename = "projectId")]
    pub project_id: Uuid,
    #[serde(rename = "vendorId")]
    pub vendor_id: i32,
    pub score: Decimal,
    #[serde(rename = "matchDetails")]
    pub match_details: MatchDetails,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Persisted match joined with its vendor, as returned by the read endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchWithVendor {
    #[serde(flatten)]
    pub record: Match,
    pub vendor: VendorSummary,
}

/// Weights controlling score composition
///
/// Defaults: 2 points per overlapping service, rating × 1, +3 for an SLA of
/// at most 24h, +1 for an SLA of at most 72h, and a 5.0 eligibility floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    #[serde(rename = "minimumScore")]
    pub minimum_score: Decimal,
    #[serde(rename = "serviceWeight")]
    pub service_weight: Decimal,
    #[serde(rename = "ratingWeight")]
    pub rating_weight: Decimal,
    #[serde(rename = "fastSlaBonus")]
    pub fast_sla_bonus: Decimal,
    #[serde(rename = "mediumSlaBonus")]
    pub medium_sla_bonus: Decimal,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            minimum_score: Decimal::new(50, 1),
            service_weight: Decimal::new(20, 1),
            rating_weight: Decimal::new(10, 1),
            fast_sla_bonus: Decimal::new(30, 1),
            medium_sla_bonus: Decimal::new(10, 1),
        }
    }
}

/// Authenticated caller of the read endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub client_id: i32,
    pub role: Role,
}

impl Viewer {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Row counts touched by one SLA flag sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaSweepReport {
    pub expired: u64,
    pub valid: u64,
}
