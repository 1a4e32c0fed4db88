use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::core::Matcher;
use crate::models::{
    DeleteMatchResponse, MatchCriteria, MatchPage, MatchResult, MatchWithVendor, Project,
    RebuildSummary, Viewer,
};
use crate::services::cache::{CacheKey, CacheManager};
use crate::services::notifications::{MatchCreatedNotice, Notifier};
use crate::services::store::{MatchStore, ProjectStore, StoreError, VendorStore};

/// Largest page served for a single project
pub const MAX_PROJECT_PAGE_SIZE: u32 = 50;
/// Largest page served by the admin listing
pub const MAX_ADMIN_PAGE_SIZE: u32 = 100;

/// Errors surfaced by match operations
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

/// Storage collaborators used by `MatchService`
#[derive(Clone)]
pub struct Stores {
    pub projects: Arc<dyn ProjectStore>,
    pub vendors: Arc<dyn VendorStore>,
    pub matches: Arc<dyn MatchStore>,
}

impl Stores {
    /// Use one backend for all three stores
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: ProjectStore + VendorStore + MatchStore + 'static,
    {
        Self {
            projects: backend.clone(),
            vendors: backend.clone(),
            matches: backend,
        }
    }
}

/// Rebuilds and serves a project's vendor matches
pub struct MatchService {
    stores: Stores,
    matcher: Matcher,
    cache: Arc<CacheManager>,
    notifier: Arc<dyn Notifier>,
}

impl MatchService {
    pub fn new(
        stores: Stores,
        matcher: Matcher,
        cache: Arc<CacheManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            stores,
            matcher,
            cache,
            notifier,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Criteria used when a rebuild carries no overrides
    pub fn criteria(&self) -> &MatchCriteria {
        self.matcher.criteria()
    }

    /// Recompute and replace the match set for one project
    ///
    /// Uses the configured criteria unless `criteria` is given. The previous
    /// set is only read to split the result into created and updated
    /// counts; persistence deletes it and inserts the new set in one
    /// transaction, so "updated" matches come back with new ids.
    pub async fn rebuild(
        &self,
        project_id: Uuid,
        criteria: Option<MatchCriteria>,
    ) -> Result<RebuildSummary, MatchError> {
        tracing::info!("Rebuilding matches for project {}", project_id);

        let project = self
            .stores
            .projects
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("Project with ID {} not found", project_id)))?;

        if !project.is_active() {
            return Err(MatchError::InvalidState(format!(
                "Cannot rebuild matches for {} project",
                project.status
            )));
        }

        let vendors = self.stores.vendors.find_all().await?;
        tracing::info!("Found {} total vendors", vendors.len());

        let criteria = criteria.unwrap_or(*self.matcher.criteria());
        let run = self.matcher.score_vendors_with(&project, &vendors, &criteria);
        tracing::info!("{} eligible matches calculated", run.results.len());

        let existing_vendor_ids: HashSet<i32> = self
            .stores
            .matches
            .find_by_project(project_id)
            .await?
            .iter()
            .map(|m| m.vendor_id)
            .collect();

        if let Err(e) = self
            .stores
            .matches
            .replace_for_project(project_id, &run.results)
            .await
        {
            tracing::error!("Failed to replace matches for project {}: {}", project_id, e);
            return Err(e.into());
        }

        let created: Vec<&MatchResult> = run
            .results
            .iter()
            .filter(|r| !existing_vendor_ids.contains(&r.vendor.id))
            .collect();
        let matches_created = created.len();
        let matches_updated = run.results.len() - matches_created;

        tracing::info!(
            "Matches rebuilt for project {}: {} created, {} updated",
            project_id,
            matches_created,
            matches_updated
        );

        self.invalidate_project_pages(project_id).await;
        self.spawn_notifications(&project, &created);

        Ok(RebuildSummary {
            project_id,
            total_vendors_considered: run.total_vendors,
            eligible_vendors: run.results.len(),
            matches_created,
            matches_updated,
            matches: run.results,
        })
    }

    /// Page through a project's matches, best score first
    pub async fn list_project_matches(
        &self,
        project_id: Uuid,
        viewer: &Viewer,
        page: u32,
        limit: u32,
    ) -> Result<MatchPage<MatchWithVendor>, MatchError> {
        let project = self
            .stores
            .projects
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| MatchError::NotFound("Project not found".to_string()))?;

        if !project.is_visible_to(viewer) {
            return Err(MatchError::Forbidden("You do not own this project".to_string()));
        }

        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PROJECT_PAGE_SIZE);

        // Generation must be read before the store
        let cache_key = match self
            .cache
            .generation(&CacheKey::project_generation(project_id))
            .await
        {
            Ok(generation) => Some(CacheKey::project_matches(project_id, generation, page, limit)),
            Err(e) => {
                tracing::warn!("Match cache generation unavailable for {}: {}", project_id, e);
                None
            }
        };

        if let Some(key) = &cache_key {
            if let Ok(cached) = self.cache.get::<MatchPage<MatchWithVendor>>(key).await {
                return Ok(cached);
            }
        }

        let offset = (page as u64 - 1) * limit as u64;
        let (matches, total) = self
            .stores
            .matches
            .page_for_project(project_id, offset, limit)
            .await?;
        let result = MatchPage::new(matches, total, page, limit);

        if let Some(key) = &cache_key {
            if let Err(e) = self.cache.set(key, &result).await {
                tracing::warn!("Failed to cache match page {}: {}", key, e);
            }
        }

        Ok(result)
    }

    /// Fetch one match the viewer has access to
    pub async fn get_match(
        &self,
        match_id: i64,
        viewer: &Viewer,
    ) -> Result<MatchWithVendor, MatchError> {
        let found = self
            .stores
            .matches
            .find_by_id(match_id)
            .await?
            .ok_or_else(|| MatchError::NotFound("Match not found".to_string()))?;

        if !viewer.is_admin() {
            let owner = self
                .stores
                .projects
                .find_by_id(found.record.project_id)
                .await?
                .map(|p| p.client.id);

            if owner != Some(viewer.client_id) {
                return Err(MatchError::Forbidden(
                    "You do not have access to this match".to_string(),
                ));
            }
        }

        Ok(found)
    }

    /// Remove a single match (admin only)
    pub async fn delete_match(
        &self,
        match_id: i64,
        viewer: &Viewer,
    ) -> Result<DeleteMatchResponse, MatchError> {
        if !viewer.is_admin() {
            return Err(MatchError::Forbidden("Only admins can delete matches".to_string()));
        }

        let found = self.get_match(match_id, viewer).await?;
        if !self.stores.matches.delete(match_id).await? {
            return Err(MatchError::NotFound("Match not found".to_string()));
        }

        self.invalidate_project_pages(found.record.project_id).await;
        tracing::info!("Match {} deleted by admin user {}", match_id, viewer.client_id);

        Ok(DeleteMatchResponse { deleted: true })
    }

    /// Page through every match, newest first (admin only)
    pub async fn list_all_matches(
        &self,
        viewer: &Viewer,
        page: u32,
        limit: u32,
    ) -> Result<MatchPage<MatchWithVendor>, MatchError> {
        if !viewer.is_admin() {
            return Err(MatchError::Forbidden("Only admins can list all matches".to_string()));
        }

        let page = page.max(1);
        let limit = limit.clamp(1, MAX_ADMIN_PAGE_SIZE);
        let offset = (page as u64 - 1) * limit as u64;

        let (matches, total) = self.stores.matches.page_all(offset, limit).await?;
        Ok(MatchPage::new(matches, total, page, limit))
    }

    async fn invalidate_project_pages(&self, project_id: Uuid) {
        let key = CacheKey::project_generation(project_id);
        if let Err(e) = self.cache.bump_generation(&key).await {
            tracing::warn!("Failed to invalidate cached matches for {}: {}", project_id, e);
        }
    }

    /// Send one notice per new match on a detached task
    fn spawn_notifications(&self, project: &Project, created: &[&MatchResult]) {
        if created.is_empty() {
            return;
        }

        let recipient = project.client.contact_email.clone();
        let notices: Vec<MatchCreatedNotice> = created
            .iter()
            .map(|r| MatchCreatedNotice {
                project_id: project.id,
                country: project.country.clone(),
                vendor_name: r.vendor.name.clone(),
                score: r.score,
            })
            .collect();
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            for notice in notices {
                if let Err(e) = notifier.notify_match_created(&recipient, &notice).await {
                    tracing::warn!(
                        "Notification for project {} to {} failed: {}",
                        notice.project_id,
                        recipient,
                        e
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientRef, ProjectStatus, Role, Vendor};
    use crate::services::memory::MemoryStore;
    use crate::services::notifications::LogNotifier;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn project(status: ProjectStatus) -> Project {
        Project {
            id: Uuid::new_v4(),
            client: ClientRef {
                id: 7,
                company_name: "Acme".to_string(),
                contact_email: "ops@acme.test".to_string(),
            },
            country: "UAE".to_string(),
            services_needed: vec!["legal".to_string(), "payroll".to_string()],
            budget: dec!(25000.00),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn vendor(id: i32, services: &[&str]) -> Vendor {
        Vendor {
            id,
            name: format!("Vendor {}", id),
            countries_supported: vec!["UAE".to_string()],
            services_offered: services.iter().map(|s| s.to_string()).collect(),
            rating: Some(dec!(4.0)),
            response_sla_hours: 24,
            sla_expires_at: None,
            sla_expired: false,
        }
    }

    fn service(store: &MemoryStore) -> MatchService {
        MatchService::new(
            Stores::from_backend(Arc::new(store.clone())),
            Matcher::with_default_criteria(),
            Arc::new(CacheManager::local(100, 60)),
            Arc::new(LogNotifier),
        )
    }

    #[tokio::test]
    async fn test_rebuild_unknown_project() {
        let store = MemoryStore::new();
        let err = service(&store).rebuild(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, MatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rebuild_paused_project() {
        let store = MemoryStore::new();
        let paused = project(ProjectStatus::Paused);
        let id = paused.id;
        store.insert_project(paused);

        let err = service(&store).rebuild(id, None).await.unwrap_err();
        match err {
            MatchError::InvalidState(msg) => assert_eq!(msg, "Cannot rebuild matches for paused project"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rebuild_counts() {
        let store = MemoryStore::new();
        let active = project(ProjectStatus::Active);
        let id = active.id;
        store.insert_project(active);
        store.upsert_vendor(vendor(1, &["legal"]));
        store.upsert_vendor(vendor(2, &["tax"]));

        let summary = service(&store).rebuild(id, None).await.unwrap();

        assert_eq!(summary.total_vendors_considered, 2);
        assert_eq!(summary.eligible_vendors, 1);
        assert_eq!(summary.matches_created, 1);
        assert_eq!(summary.matches_updated, 0);
        assert_eq!(summary.matches[0].score, dec!(9.00));
    }

    #[tokio::test]
    async fn test_project_page_clamps_limit() {
        let store = MemoryStore::new();
        let active = project(ProjectStatus::Active);
        let id = active.id;
        store.insert_project(active);

        let admin = Viewer { client_id: 1, role: Role::Admin };
        let page = service(&store).list_project_matches(id, &admin, 0, 500).await.unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_PROJECT_PAGE_SIZE);
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_client_cannot_delete() {
        let store = MemoryStore::new();
        let client = Viewer { client_id: 7, role: Role::Client };

        let err = service(&store).delete_match(1, &client).await.unwrap_err();
        assert!(matches!(err, MatchError::Forbidden(_)));
    }
}
