use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::domain::MatchResult;

/// Response for the rebuild endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildSummary {
    #[serde(rename = "projectId")]
    pub project_id: Uuid,
    #[serde(rename = "totalVendorsConsidered")]
    pub total_vendors_considered: usize,
    #[serde(rename = "eligibleVendors")]
    pub eligible_vendors: usize,
    #[serde(rename = "matchesCreated")]
    pub matches_created: usize,
    #[serde(rename = "matchesUpdated")]
    pub matches_updated: usize,
    pub matches: Vec<MatchResult>,
}

/// One page of a match listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPage<T> {
    pub matches: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl<T> MatchPage<T> {
    pub fn new(matches: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };

        Self {
            matches,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Response for the delete endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMatchResponse {
    pub deleted: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page: MatchPage<u8> = MatchPage::new(vec![], 21, 1, 10);
        assert_eq!(page.total_pages, 3);

        let empty: MatchPage<u8> = MatchPage::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
    }
}
