// Core algorithm exports
pub mod filters;
pub mod matcher;
pub mod rebuild;
pub mod scheduler;
pub mod scoring;

pub use filters::{service_overlap, supports_country};
pub use matcher::{MatchRun, Matcher};
pub use rebuild::{MatchError, MatchService, Stores};
pub use scheduler::{cron_expression, RefreshDriver, RefreshReport, SchedulerError};
pub use scoring::{calculate_score, score_vendor};
