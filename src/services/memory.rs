//! In-memory store implementation.
//!
//! Suitable for tests, benchmarks and local runs without PostgreSQL. All
//! state sits behind one mutex, so every operation (including a match
//! replace) is atomic with respect to every other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    Match, MatchResult, MatchWithVendor, Project, ProjectStatus, SlaSweepReport, Vendor,
    VendorSummary,
};
use crate::services::store::{MatchStore, ProjectStore, StoreError, VendorStore};

#[derive(Default)]
struct State {
    projects: HashMap<Uuid, Project>,
    vendors: Vec<Vendor>,
    matches: Vec<Match>,
    next_match_id: i64,
}

impl State {
    fn with_vendor(&self, record: Match) -> Option<MatchWithVendor> {
        let vendor = self.vendors.iter().find(|v| v.id == record.vendor_id)?;
        Some(MatchWithVendor {
            record,
            vendor: VendorSummary::from(vendor),
        })
    }
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_project(&self, project: Project) {
        self.lock().projects.insert(project.id, project);
    }

    pub fn set_project_status(&self, id: Uuid, status: ProjectStatus) {
        if let Some(project) = self.lock().projects.get_mut(&id) {
            project.status = status;
            project.updated_at = Utc::now();
        }
    }

    /// Deleting a project removes its matches
    pub fn delete_project(&self, id: Uuid) {
        let mut state = self.lock();
        state.projects.remove(&id);
        state.matches.retain(|m| m.project_id != id);
    }

    /// Insert or replace a vendor by id
    pub fn upsert_vendor(&self, vendor: Vendor) {
        let mut state = self.lock();
        match state.vendors.iter_mut().find(|v| v.id == vendor.id) {
            Some(existing) => *existing = vendor,
            None => state.vendors.push(vendor),
        }
    }

    /// Deleting a vendor removes its matches
    pub fn delete_vendor(&self, id: i32) {
        let mut state = self.lock();
        state.vendors.retain(|v| v.id != id);
        state.matches.retain(|m| m.vendor_id != id);
    }

    pub fn vendor(&self, id: i32) -> Option<Vendor> {
        self.lock().vendors.iter().find(|v| v.id == id).cloned()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.lock().projects.get(&id).cloned())
    }

    async fn find_all_active(&self) -> Result<Vec<Project>, StoreError> {
        let mut active: Vec<Project> = self
            .lock()
            .projects
            .values()
            .filter(|p| p.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }
}

#[async_trait]
impl VendorStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Vendor>, StoreError> {
        let mut vendors = self.lock().vendors.clone();
        vendors.sort_by_key(|v| v.id);
        Ok(vendors)
    }

    async fn refresh_sla_flags(&self, now: DateTime<Utc>) -> Result<SlaSweepReport, StoreError> {
        let mut report = SlaSweepReport::default();
        for vendor in self.lock().vendors.iter_mut() {
            match vendor.sla_expires_at {
                Some(expires_at) if expires_at < now => {
                    vendor.sla_expired = true;
                    report.expired += 1;
                }
                _ => {
                    vendor.sla_expired = false;
                    report.valid += 1;
                }
            }
        }
        Ok(report)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<Match>, StoreError> {
        Ok(self
            .lock()
            .matches
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn replace_for_project(
        &self,
        project_id: Uuid,
        results: &[MatchResult],
    ) -> Result<Vec<Match>, StoreError> {
        let mut state = self.lock();
        state.matches.retain(|m| m.project_id != project_id);

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(results.len());
        for result in results {
            state.next_match_id += 1;
            let record = Match {
                id: state.next_match_id,
                project_id,
                vendor_id: result.vendor.id,
                score: result.score,
                match_details: result.match_details.clone(),
                created_at: now,
                updated_at: now,
            };
            state.matches.push(record.clone());
            inserted.push(record);
        }

        Ok(inserted)
    }

    async fn page_for_project(
        &self,
        project_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<MatchWithVendor>, u64), StoreError> {
        let state = self.lock();
        let mut rows: Vec<&Match> = state
            .matches
            .iter()
            .filter(|m| m.project_id == project_id)
            .collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score).then(b.created_at.cmp(&a.created_at)));

        let total = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|m| state.with_vendor(m.clone()))
            .collect();

        Ok((page, total))
    }

    async fn page_all(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<MatchWithVendor>, u64), StoreError> {
        let state = self.lock();
        let mut rows: Vec<&Match> = state.matches.iter().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|m| state.with_vendor(m.clone()))
            .collect();

        Ok((page, total))
    }

    async fn find_by_id(&self, match_id: i64) -> Result<Option<MatchWithVendor>, StoreError> {
        let state = self.lock();
        Ok(state
            .matches
            .iter()
            .find(|m| m.id == match_id)
            .cloned()
            .and_then(|m| state.with_vendor(m)))
    }

    async fn delete(&self, match_id: i64) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let before = state.matches.len();
        state.matches.retain(|m| m.id != match_id);
        Ok(state.matches.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientRef, MatchDetails};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn vendor(id: i32, sla_expires_at: Option<DateTime<Utc>>) -> Vendor {
        Vendor {
            id,
            name: format!("Vendor {}", id),
            countries_supported: vec!["US".to_string()],
            services_offered: vec!["hiring".to_string()],
            rating: Some(dec!(4.0)),
            response_sla_hours: 24,
            sla_expires_at,
            sla_expired: false,
        }
    }

    fn result_for(vendor: &Vendor) -> MatchResult {
        MatchResult {
            vendor: VendorSummary::from(vendor),
            score: dec!(9.00),
            match_details: MatchDetails {
                services_overlap: vec!["hiring".to_string()],
                country_match: true,
                service_score: dec!(2),
                rating_bonus: dec!(4),
                sla_bonus: dec!(3),
                reason_for_score: String::new(),
            },
        }
    }

    #[test]
    fn test_sla_flags_follow_expiry() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.upsert_vendor(vendor(1, Some(now - Duration::hours(1))));
        store.upsert_vendor(vendor(2, Some(now + Duration::hours(1))));
        store.upsert_vendor(vendor(3, None));
        store.upsert_vendor(vendor(4, Some(now)));

        let report = tokio_test::block_on(store.refresh_sla_flags(now)).unwrap();

        assert_eq!(report, SlaSweepReport { expired: 1, valid: 3 });
        assert!(store.vendor(1).unwrap().sla_expired);
        assert!(!store.vendor(2).unwrap().sla_expired);
        assert!(!store.vendor(3).unwrap().sla_expired);
        assert!(!store.vendor(4).unwrap().sla_expired);
    }

    #[test]
    fn test_vendor_delete_cascades_to_matches() {
        let store = MemoryStore::new();
        let project_id = Uuid::new_v4();
        let v1 = vendor(1, None);
        let v2 = vendor(2, None);
        store.upsert_vendor(v1.clone());
        store.upsert_vendor(v2.clone());

        tokio_test::block_on(store.replace_for_project(project_id, &[result_for(&v1), result_for(&v2)]))
            .unwrap();
        store.delete_vendor(1);

        let remaining = tokio_test::block_on(store.find_by_project(project_id)).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].vendor_id, 2);
    }

    #[test]
    fn test_project_delete_cascades_to_matches() {
        let store = MemoryStore::new();
        let v1 = vendor(1, None);
        store.upsert_vendor(v1.clone());

        let project = Project {
            id: Uuid::new_v4(),
            client: ClientRef {
                id: 1,
                company_name: "Acme".to_string(),
                contact_email: "ops@acme.test".to_string(),
            },
            country: "US".to_string(),
            services_needed: vec!["hiring".to_string()],
            budget: dec!(100),
            status: ProjectStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let project_id = project.id;
        store.insert_project(project);

        tokio_test::block_on(store.replace_for_project(project_id, &[result_for(&v1)])).unwrap();
        store.delete_project(project_id);

        assert!(tokio_test::block_on(store.find_by_project(project_id)).unwrap().is_empty());
    }
}
