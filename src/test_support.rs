//! Shared builders for unit tests.

use crate::job::domain::{
    ChecklistItem, ChecklistItemId, Job, JobEvent, JobId, JobType, NewJob, Priority,
    ScheduleWindow, StaffId, apply_transition,
};
use crate::location::domain::Coordinate;
use crate::sync::{
    adapters::InMemoryCacheStore,
    domain::CacheTable,
    ports::{CacheStoreError, CacheStoreResult, LocalCacheStore, StoredRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Instant `minutes` after the default manual clock epoch.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600, 0)
        .single()
        .expect("valid epoch")
        + Duration::minutes(minutes)
}

pub fn site() -> Coordinate {
    Coordinate::new(51.5007, -0.1246).expect("valid site")
}

/// A point roughly `meters` north of the site.
pub fn north_of_site(meters: f64) -> Coordinate {
    Coordinate::new(51.5007 + meters / 111_195.0, -0.1246).expect("valid coordinate")
}

pub fn staff(name: &str) -> StaffId {
    StaffId::new(name).expect("valid staff id")
}

pub fn item(id: &str) -> ChecklistItemId {
    ChecklistItemId::new(id).expect("valid item id")
}

/// Pending job with one required and one optional checklist item.
pub fn pending_job(id: &str) -> Job {
    Job::new(
        NewJob {
            id: JobId::new(id).expect("valid job id"),
            title: "Quarterly boiler inspection".to_owned(),
            job_type: JobType::Inspection,
            priority: Priority::High,
            schedule: ScheduleWindow::new(at(30), at(90)).expect("valid window"),
            target: site(),
            checklist: vec![
                ChecklistItem::new(item("safety"), "Safety check", true),
                ChecklistItem::new(item("photos"), "Take photos", false),
            ],
        },
        at(0),
    )
    .expect("valid job")
}

pub fn assigned_job(id: &str, staff_id: &StaffId) -> Job {
    apply_transition(
        &pending_job(id),
        &JobEvent::Assign {
            staff_id: staff_id.clone(),
            at: at(1),
        },
    )
    .expect("assign")
}

pub fn accepted_job(id: &str, staff_id: &StaffId) -> Job {
    apply_transition(
        &assigned_job(id, staff_id),
        &JobEvent::Accept {
            staff_id: staff_id.clone(),
            at: at(2),
        },
    )
    .expect("accept")
}

pub fn in_progress_job(id: &str, staff_id: &StaffId) -> Job {
    apply_transition(
        &accepted_job(id, staff_id),
        &JobEvent::Start {
            staff_id: staff_id.clone(),
            location_unavailable: false,
            at: at(3),
        },
    )
    .expect("start")
}

/// In-memory cache that refuses puts and removals on chosen tables.
#[derive(Debug, Clone, Default)]
pub struct FaultyCacheStore {
    inner: InMemoryCacheStore,
    failing: Arc<RwLock<HashSet<CacheTable>>>,
}

impl FaultyCacheStore {
    pub fn fail_writes(&self, table: CacheTable) {
        self.failing.write().expect("failing tables").insert(table);
    }

    fn check(&self, table: CacheTable) -> CacheStoreResult<()> {
        if self.failing.read().expect("failing tables").contains(&table) {
            return Err(CacheStoreError::persistence(std::io::Error::other(
                "disk full",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalCacheStore for FaultyCacheStore {
    async fn put(&self, table: CacheTable, record: StoredRecord) -> CacheStoreResult<()> {
        self.check(table)?;
        self.inner.put(table, record).await
    }

    async fn get(&self, table: CacheTable, key: &str) -> CacheStoreResult<Option<StoredRecord>> {
        self.inner.get(table, key).await
    }

    async fn remove(&self, table: CacheTable, key: &str) -> CacheStoreResult<bool> {
        self.check(table)?;
        self.inner.remove(table, key).await
    }

    async fn list(&self, table: CacheTable) -> CacheStoreResult<Vec<StoredRecord>> {
        self.inner.list(table).await
    }

    async fn find_by_index(
        &self,
        table: CacheTable,
        index_key: &str,
    ) -> CacheStoreResult<Vec<StoredRecord>> {
        self.inner.find_by_index(table, index_key).await
    }
}
