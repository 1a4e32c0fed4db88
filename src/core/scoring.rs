use rust_decimal::{Decimal, RoundingStrategy};
use crate::models::{MatchCriteria, MatchDetails, MatchResult, Project, Vendor, VendorSummary};
use crate::core::filters::{service_overlap, supports_country};

/// SLA at or under this many hours earns the fast bonus
pub const FAST_SLA_HOURS: i32 = 24;
/// SLA at or under this many hours earns the medium bonus
pub const MEDIUM_SLA_HOURS: i32 = 72;

/// Individual components of a vendor's score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub service_score: Decimal,
    pub rating_bonus: Decimal,
    pub sla_bonus: Decimal,
    pub total_score: Decimal,
    pub explanation: String,
}

/// Score one vendor against one project
///
/// Returns `None` when the vendor is not eligible: it does not cover the
/// project's country, shares no services with it, or scores below
/// `criteria.minimum_score`.
///
/// Scoring formula:
/// score = round2(
///     |overlap| * service_weight +
///     rating * rating_weight +
///     sla_bonus                     # fast if <= 24h, medium if <= 72h, else 0
/// )
pub fn score_vendor(
    project: &Project,
    vendor: &Vendor,
    criteria: &MatchCriteria,
) -> Option<MatchResult> {
    if !supports_country(vendor, project) {
        tracing::debug!("Vendor {} doesn't support {}", vendor.name, project.country);
        return None;
    }

    let overlap = service_overlap(project, vendor);
    if overlap.is_empty() {
        tracing::debug!(
            "Vendor {} has no service overlap with project {}",
            vendor.name,
            project.id
        );
        return None;
    }

    let breakdown = calculate_score(&overlap, vendor, criteria);

    if breakdown.total_score < criteria.minimum_score {
        tracing::debug!(
            "Vendor {} score {} below minimum {}",
            vendor.name,
            breakdown.total_score,
            criteria.minimum_score
        );
        return None;
    }

    Some(MatchResult {
        vendor: VendorSummary::from(vendor),
        score: breakdown.total_score,
        match_details: MatchDetails {
            services_overlap: overlap,
            country_match: true,
            service_score: breakdown.service_score,
            rating_bonus: breakdown.rating_bonus,
            sla_bonus: breakdown.sla_bonus,
            reason_for_score: breakdown.explanation,
        },
    })
}

/// Compose the score for a vendor given its service overlap
pub fn calculate_score(
    overlap: &[String],
    vendor: &Vendor,
    criteria: &MatchCriteria,
) -> ScoreBreakdown {
    let overlap_count = Decimal::from(overlap.len());
    let rating = vendor.rating_or_zero();

    let service_score = overlap_count * criteria.service_weight;
    let rating_bonus = rating * criteria.rating_weight;
    let sla_bonus = sla_bonus(vendor.response_sla_hours, criteria);
    let total_score = round2(service_score + rating_bonus + sla_bonus);

    let explanation = [
        format!(
            "Services: {} × {} = {}",
            overlap.len(),
            criteria.service_weight.normalize(),
            service_score.normalize()
        ),
        format!(
            "Rating: {} × {} = {}",
            rating.normalize(),
            criteria.rating_weight.normalize(),
            rating_bonus.normalize()
        ),
        format!("SLA ({}h): {}", vendor.response_sla_hours, sla_bonus.normalize()),
        format!("Total: {}", total_score),
    ]
    .join(", ");

    ScoreBreakdown {
        service_score,
        rating_bonus,
        sla_bonus,
        total_score,
        explanation,
    }
}

/// Bonus awarded for the vendor's response SLA
#[inline]
pub fn sla_bonus(response_sla_hours: i32, criteria: &MatchCriteria) -> Decimal {
    if response_sla_hours <= FAST_SLA_HOURS {
        criteria.fast_sla_bonus
    } else if response_sla_hours <= MEDIUM_SLA_HOURS {
        criteria.medium_sla_bonus
    } else {
        Decimal::ZERO
    }
}

/// Round half-up to exactly two decimal places
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientRef, ProjectStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn create_test_project() -> Project {
        Project {
            id: Uuid::new_v4(),
            client: ClientRef {
                id: 7,
                company_name: "Gulf Ventures".to_string(),
                contact_email: "team@gulf.test".to_string(),
            },
            country: "UAE".to_string(),
            services_needed: vec!["marketing".to_string(), "company_registration".to_string()],
            budget: dec!(50000.00),
            status: ProjectStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn create_test_vendor(rating: Option<Decimal>, sla_hours: i32) -> Vendor {
        Vendor {
            id: 3,
            name: "Desert Growth".to_string(),
            countries_supported: vec!["UAE".to_string()],
            services_offered: vec!["marketing".to_string()],
            rating,
            response_sla_hours: sla_hours,
            sla_expires_at: None,
            sla_expired: false,
        }
    }

    #[test]
    fn test_fast_sla_example() {
        let project = create_test_project();
        let vendor = create_test_vendor(Some(dec!(4.0)), 20);

        let result = score_vendor(&project, &vendor, &MatchCriteria::default()).unwrap();

        assert_eq!(result.score, dec!(9.00));
        assert_eq!(result.score.to_string(), "9.00");
        assert_eq!(result.match_details.services_overlap, vec!["marketing"]);
        assert!(result.match_details.country_match);
        assert_eq!(result.match_details.service_score, dec!(2));
        assert_eq!(result.match_details.rating_bonus, dec!(4));
        assert_eq!(result.match_details.sla_bonus, dec!(3));
        assert_eq!(
            result.match_details.reason_for_score,
            "Services: 1 × 2 = 2, Rating: 4 × 1 = 4, SLA (20h): 3, Total: 9.00"
        );
    }

    #[test]
    fn test_slow_sla_still_eligible() {
        let project = create_test_project();
        let vendor = create_test_vendor(Some(dec!(4.0)), 96);

        let result = score_vendor(&project, &vendor, &MatchCriteria::default()).unwrap();

        assert_eq!(result.score.to_string(), "6.00");
        assert_eq!(result.match_details.sla_bonus, Decimal::ZERO);
    }

    #[test]
    fn test_below_minimum_excluded() {
        let project = create_test_project();
        let vendor = create_test_vendor(Some(dec!(0)), 96);

        assert!(score_vendor(&project, &vendor, &MatchCriteria::default()).is_none());
    }

    #[test]
    fn test_missing_rating_counts_as_zero() {
        let overlap = vec!["marketing".to_string(), "hiring".to_string()];
        let vendor = create_test_vendor(None, 48);

        let breakdown = calculate_score(&overlap, &vendor, &MatchCriteria::default());

        assert_eq!(breakdown.rating_bonus, Decimal::ZERO);
        assert_eq!(breakdown.total_score, dec!(5.00));
        assert!(breakdown.explanation.starts_with("Services: 2 × 2 = 4, Rating: 0 × 1 = 0"));
    }

    #[test]
    fn test_sla_boundaries() {
        let criteria = MatchCriteria::default();

        assert_eq!(sla_bonus(0, &criteria), dec!(3));
        assert_eq!(sla_bonus(24, &criteria), dec!(3));
        assert_eq!(sla_bonus(25, &criteria), dec!(1));
        assert_eq!(sla_bonus(72, &criteria), dec!(1));
        assert_eq!(sla_bonus(73, &criteria), dec!(0));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round2(dec!(1.005)).to_string(), "1.01");
        assert_eq!(round2(dec!(1.004)).to_string(), "1.00");
        assert_eq!(round2(dec!(7)).to_string(), "7.00");
    }

    #[test]
    fn test_custom_criteria() {
        let project = create_test_project();
        let vendor = create_test_vendor(Some(dec!(4.5)), 30);
        let criteria = MatchCriteria {
            minimum_score: dec!(10),
            service_weight: dec!(5),
            rating_weight: dec!(0.5),
            fast_sla_bonus: dec!(4),
            medium_sla_bonus: dec!(2),
        };

        let result = score_vendor(&project, &vendor, &criteria);
        // 5 + 2.25 + 2 = 9.25 < 10
        assert!(result.is_none());

        let relaxed = MatchCriteria { minimum_score: dec!(9), ..criteria };
        let result = score_vendor(&project, &vendor, &relaxed).unwrap();
        assert_eq!(result.score.to_string(), "9.25");
    }

    #[test]
    fn test_score_is_deterministic() {
        let project = create_test_project();
        let vendor = create_test_vendor(Some(dec!(3.7)), 50);
        let criteria = MatchCriteria::default();

        let first = score_vendor(&project, &vendor, &criteria);
        let second = score_vendor(&project, &vendor, &criteria);

        assert_eq!(first, second);
    }
}
