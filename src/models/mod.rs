// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ClientRef, Match, MatchCriteria, MatchDetails, MatchResult, MatchWithVendor, Project,
    ProjectStatus, Role, SlaSweepReport, Vendor, VendorSummary, Viewer,
};
pub use requests::{CriteriaOverrides, PaginationQuery};
pub use responses::{DeleteMatchResponse, ErrorResponse, HealthResponse, MatchPage, RebuildSummary};
