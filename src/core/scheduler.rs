//! Daily background jobs: full match refresh and SLA flag sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};

use crate::config::SchedulerSettings;
use crate::core::rebuild::{MatchError, MatchService};
use crate::models::SlaSweepReport;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid schedule slot {hour:02}:{minute:02}")]
    InvalidSlot { hour: u32, minute: u32 },

    #[error("Scheduler error: {0}")]
    Job(#[from] JobSchedulerError),
}

/// Outcome of one pass over all active projects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Drives the daily refresh and SLA sweep
#[derive(Clone)]
pub struct RefreshDriver {
    service: Arc<MatchService>,
    settings: SchedulerSettings,
}

impl RefreshDriver {
    pub fn new(service: Arc<MatchService>, settings: SchedulerSettings) -> Self {
        Self { service, settings }
    }

    /// Rebuild every active project, one at a time, with default criteria
    ///
    /// A failing project is logged and counted; the pass carries on with the
    /// rest. Only a failure to list the projects is returned as an error.
    pub async fn rebuild_all_active(&self) -> Result<RefreshReport, MatchError> {
        let projects = self.service.stores().projects.find_all_active().await?;
        info!("Refreshing matches for {} active projects", projects.len());

        let mut report = RefreshReport::default();
        for project in projects {
            report.attempted += 1;
            match self.service.rebuild(project.id, None).await {
                Ok(summary) => {
                    report.succeeded += 1;
                    info!(
                        "Refreshed project {}: {} eligible vendors",
                        project.id, summary.eligible_vendors
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to refresh matches for project {}: {}", project.id, e);
                }
            }
        }

        info!(
            "Match refresh finished: {} attempted, {} succeeded, {} failed",
            report.attempted, report.succeeded, report.failed
        );
        Ok(report)
    }

    /// Recompute every vendor's `sla_expired` flag against `now`
    pub async fn sweep_sla_flags_at(&self, now: DateTime<Utc>) -> Result<SlaSweepReport, MatchError> {
        let report = self.service.stores().vendors.refresh_sla_flags(now).await?;
        info!(
            "SLA sweep complete: {} expired, {} valid",
            report.expired, report.valid
        );
        Ok(report)
    }

    /// Sweep against the current time, logging any failure
    pub async fn sweep_sla_flags(&self) -> Option<SlaSweepReport> {
        match self.sweep_sla_flags_at(Utc::now()).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("SLA sweep failed: {}", e);
                None
            }
        }
    }

    /// Register the refresh and SLA sweep jobs on a new scheduler
    pub async fn build_scheduler(&self) -> Result<JobScheduler, SchedulerError> {
        let refresh_cron = cron_expression(self.settings.refresh_hour, self.settings.refresh_minute)?;
        let sweep_cron = cron_expression(self.settings.sla_sweep_hour, self.settings.sla_sweep_minute)?;

        let sched = JobScheduler::new().await?;

        let driver = self.clone();
        let refresh = Job::new_async(refresh_cron.as_str(), move |_uuid, _l| {
            let driver = driver.clone();
            Box::pin(async move {
                if let Err(e) = driver.rebuild_all_active().await {
                    error!("Scheduled match refresh failed: {}", e);
                }
            })
        })?;
        sched.add(refresh).await?;

        let driver = self.clone();
        let sweep = Job::new_async(sweep_cron.as_str(), move |_uuid, _l| {
            let driver = driver.clone();
            Box::pin(async move {
                driver.sweep_sla_flags().await;
            })
        })?;
        sched.add(sweep).await?;

        info!(
            "Scheduled match refresh at '{}' and SLA sweep at '{}' (UTC)",
            refresh_cron, sweep_cron
        );
        Ok(sched)
    }

    /// Build the scheduler and start it on the current runtime
    pub async fn start(&self) -> Result<JobScheduler, SchedulerError> {
        let sched = self.build_scheduler().await?;
        sched.start().await?;
        Ok(sched)
    }
}

/// Six-field cron expression firing daily at `hour:minute` UTC
pub fn cron_expression(hour: u32, minute: u32) -> Result<String, SchedulerError> {
    if hour > 23 || minute > 59 {
        return Err(SchedulerError::InvalidSlot { hour, minute });
    }
    Ok(format!("0 {} {} * * *", minute, hour))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Matcher, Stores};
    use crate::services::cache::CacheManager;
    use crate::services::memory::MemoryStore;
    use crate::services::notifications::LogNotifier;

    fn driver(settings: SchedulerSettings) -> RefreshDriver {
        let service = MatchService::new(
            Stores::from_backend(Arc::new(MemoryStore::new())),
            Matcher::with_default_criteria(),
            Arc::new(CacheManager::local(10, 60)),
            Arc::new(LogNotifier),
        );
        RefreshDriver::new(Arc::new(service), settings)
    }

    #[test]
    fn test_default_cron_expressions() {
        let settings = SchedulerSettings::default();
        assert_eq!(
            cron_expression(settings.refresh_hour, settings.refresh_minute).unwrap(),
            "0 0 2 * * *"
        );
        assert_eq!(
            cron_expression(settings.sla_sweep_hour, settings.sla_sweep_minute).unwrap(),
            "0 0 1 * * *"
        );
        assert_eq!(cron_expression(23, 45).unwrap(), "0 45 23 * * *");
    }

    #[test]
    fn test_invalid_slot() {
        assert!(matches!(
            cron_expression(24, 0),
            Err(SchedulerError::InvalidSlot { hour: 24, minute: 0 })
        ));
        assert!(cron_expression(1, 60).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_scheduler_registers_jobs() {
        assert!(driver(SchedulerSettings::default()).build_scheduler().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_scheduler_rejects_bad_slot() {
        let settings = SchedulerSettings {
            sla_sweep_hour: 25,
            ..SchedulerSettings::default()
        };

        let err = driver(settings).build_scheduler().await.err().unwrap();
        assert!(matches!(err, SchedulerError::InvalidSlot { hour: 25, .. }));
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store() {
        let report = driver(SchedulerSettings::default()).sweep_sla_flags().await;
        assert_eq!(report, Some(SlaSweepReport::default()));
    }
}
