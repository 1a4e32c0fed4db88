use crate::models::{Project, Vendor};

/// Check whether the vendor operates in the project's country
///
/// Stage 1 of the scoring pipeline. Country codes are compared exactly.
#[inline]
pub fn supports_country(vendor: &Vendor, project: &Project) -> bool {
    vendor.countries_supported.iter().any(|c| c == &project.country)
}

/// Services the project needs that the vendor offers
///
/// Stage 2 of the scoring pipeline. Keeps the order of
/// `services_needed` and does not collapse repeated entries.
#[inline]
pub fn service_overlap(project: &Project, vendor: &Vendor) -> Vec<String> {
    project
        .services_needed
        .iter()
        .filter(|service| vendor.services_offered.contains(service))
        .cloned()
        .collect()
}
