use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::domain::MatchCriteria;

/// Page selection for the match listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaginationQuery {
    #[validate(range(min = 1))]
    #[serde(default = "default_page")]
    pub page: u32,
    #[validate(range(min = 1))]
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

/// Optional per-request overrides for the rebuild criteria
///
/// Any field left out falls back to the configured criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriteriaOverrides {
    #[serde(default, rename = "minimumScore")]
    pub minimum_score: Option<Decimal>,
    #[serde(default, rename = "serviceWeight")]
    pub service_weight: Option<Decimal>,
    #[serde(default, rename = "ratingWeight")]
    pub rating_weight: Option<Decimal>,
    #[serde(default, rename = "fastSlaBonus")]
    pub fast_sla_bonus: Option<Decimal>,
    #[serde(default, rename = "mediumSlaBonus")]
    pub medium_sla_bonus: Option<Decimal>,
}

impl CriteriaOverrides {
    pub fn is_empty(&self) -> bool {
        self.minimum_score.is_none()
            && self.service_weight.is_none()
            && self.rating_weight.is_none()
            && self.fast_sla_bonus.is_none()
            && self.medium_sla_bonus.is_none()
    }

    /// Merge the overrides onto `base`
    pub fn apply(&self, base: MatchCriteria) -> MatchCriteria {
        MatchCriteria {
            minimum_score: self.minimum_score.unwrap_or(base.minimum_score),
            service_weight: self.service_weight.unwrap_or(base.service_weight),
            rating_weight: self.rating_weight.unwrap_or(base.rating_weight),
            fast_sla_bonus: self.fast_sla_bonus.unwrap_or(base.fast_sla_bonus),
            medium_sla_bonus: self.medium_sla_bonus.unwrap_or(base.medium_sla_bonus),
        }
    }

    fn fields(&self) -> [(&'static str, Option<Decimal>); 5] {
        [
            ("minimumScore", self.minimum_score),
            ("serviceWeight", self.service_weight),
            ("ratingWeight", self.rating_weight),
            ("fastSlaBonus", self.fast_sla_bonus),
            ("mediumSlaBonus", self.medium_sla_bonus),
        ]
    }
}

impl Validate for CriteriaOverrides {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut failed = false;
        for (field, value) in self.fields() {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                let mut error = ValidationError::new("non_negative");
                error.message = Some("must not be negative".into());
                errors.add(field, error);
                failed = true;
            }
        }

        if failed {
            Err(errors)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_overrides_fall_back_to_base() {
        let overrides = CriteriaOverrides {
            minimum_score: Some(dec!(8)),
            ..Default::default()
        };

        let merged = overrides.apply(MatchCriteria::default());

        assert_eq!(merged.minimum_score, dec!(8));
        assert_eq!(merged.service_weight, dec!(2.0));
        assert_eq!(merged.fast_sla_bonus, dec!(3.0));
    }

    #[test]
    fn test_negative_override_rejected() {
        let overrides = CriteriaOverrides {
            rating_weight: Some(dec!(-1)),
            ..Default::default()
        };

        let errors = overrides.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("ratingWeight"));
    }

    #[test]
    fn test_pagination_defaults() {
        let query: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);

        let invalid = PaginationQuery { page: 0, limit: 10 };
        assert!(invalid.validate().is_err());
    }
}
