use crate::models::{MatchCriteria, MatchResult, Project, Vendor};
use crate::core::scoring::score_vendor;

/// Result of scoring a project against a vendor set
#[derive(Debug)]
pub struct MatchRun {
    pub results: Vec<MatchResult>,
    pub total_vendors: usize,
}

/// Ranks vendors for a project
///
/// # Pipeline Stages
/// 1. Country filter
/// 2. Service overlap filter
/// 3. Scoring and minimum-score filter
/// 4. Ranking by score, stable on ties
#[derive(Debug, Clone)]
pub struct Matcher {
    criteria: MatchCriteria,
}

impl Matcher {
    pub fn new(criteria: MatchCriteria) -> Self {
        Self { criteria }
    }

    pub fn with_default_criteria() -> Self {
        Self {
            criteria: MatchCriteria::default(),
        }
    }

    pub fn criteria(&self) -> &MatchCriteria {
        &self.criteria
    }

    /// Score every vendor with the configured criteria
    pub fn score_vendors(&self, project: &Project, vendors: &[Vendor]) -> MatchRun {
        self.score_vendors_with(project, vendors, &self.criteria)
    }

    /// Score every vendor with explicit criteria
    ///
    /// # Returns
    /// Eligible vendors ordered by score descending. Vendors with equal
    /// scores keep the order in which they appear in `vendors`.
    pub fn score_vendors_with(
        &self,
        project: &Project,
        vendors: &[Vendor],
        criteria: &MatchCriteria,
    ) -> MatchRun {
        let mut results: Vec<MatchResult> = vendors
            .iter()
            .filter_map(|vendor| score_vendor(project, vendor, criteria))
            .collect();

        // sort_by is stable, so ties keep vendor order
        results.sort_by(|a, b| b.score.cmp(&a.score));

        MatchRun {
            results,
            total_vendors: vendors.len(),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_criteria()
    }
}
