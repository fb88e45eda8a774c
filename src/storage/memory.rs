//! In-memory visit store with optional JSON persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::debug;

use crate::error::{AgendaError, Result, StorageError};
use crate::schedule::types::{ScheduleStats, Visit, VisitException, VisitUpdate};
use crate::storage::VisitStore;

/// Internal data storage structure.
#[derive(Debug, Default)]
struct ScheduleData {
    /// Visits indexed by id.
    visits: HashMap<i64, Visit>,
    /// Exception records grouped by series id. At most one per
    /// `(series_id, date)`.
    exceptions: HashMap<i64, Vec<VisitException>>,
    /// Next visit id to assign.
    next_id: i64,
}

/// Serialized form for file persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistenceData {
    visits: Vec<Visit>,
    exceptions: Vec<VisitException>,
    next_id: i64,
}

/// In-memory visit store with optional JSON file persistence.
///
/// All data sits behind a single `RwLock`; mutations take the write lock, so
/// a whole-series edit and a concurrent single-occurrence exception cannot
/// interleave on the same series.
pub struct EmbeddedVisitStore {
    data: RwLock<ScheduleData>,
    /// Optional persistence file path.
    persistence_path: Option<PathBuf>,
    /// Mutex for persistence operations.
    persist_lock: AsyncMutex<()>,
    /// Whether exception records are available. Disabled stores reject
    /// single-occurrence mutations on recurring series.
    exceptions_enabled: bool,
}

impl EmbeddedVisitStore {
    /// Create a new in-memory store without persistence.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(ScheduleData {
                next_id: 1,
                ..Default::default()
            }),
            persistence_path: None,
            persist_lock: AsyncMutex::new(()),
            exceptions_enabled: true,
        }
    }

    /// Create a store without exception-record support. Single-occurrence
    /// mutations on recurring series will fail with `UnsupportedScope`.
    pub fn without_exceptions() -> Self {
        Self {
            exceptions_enabled: false,
            ..Self::new()
        }
    }

    /// Create a store with file persistence, loading existing data if the
    /// file is present.
    pub async fn with_persistence(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(StorageError::Io)?;

        let persistence_path = data_dir.join("agenda.json");
        let store = Self {
            data: RwLock::new(ScheduleData {
                next_id: 1,
                ..Default::default()
            }),
            persistence_path: Some(persistence_path.clone()),
            persist_lock: AsyncMutex::new(()),
            exceptions_enabled: true,
        };

        if persistence_path.exists() {
            store.load_from_file(&persistence_path).await?;
        }

        Ok(store)
    }

    /// Load data from a JSON file.
    async fn load_from_file(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(AgendaError::Io)?;

        let persisted: PersistenceData =
            serde_json::from_str(&content).map_err(AgendaError::Serialization)?;

        let mut data = self.data.write().await;
        for visit in persisted.visits {
            data.visits.insert(visit.id, visit);
        }
        for exception in persisted.exceptions {
            data.exceptions
                .entry(exception.series_id)
                .or_default()
                .push(exception);
        }
        data.next_id = persisted.next_id;

        debug!(
            visits = data.visits.len(),
            "Loaded agenda data from {}",
            path.display()
        );
        Ok(())
    }

    /// Write current data to the persistence file, if configured.
    async fn persist(&self) -> Result<()> {
        let Some(ref path) = self.persistence_path else {
            return Ok(());
        };

        let _guard = self.persist_lock.lock().await;
        let snapshot = {
            let data = self.data.read().await;
            PersistenceData {
                visits: data.visits.values().cloned().collect(),
                exceptions: data.exceptions.values().flatten().cloned().collect(),
                next_id: data.next_id,
            }
        };

        let content =
            serde_json::to_string_pretty(&snapshot).map_err(AgendaError::Serialization)?;
        tokio::fs::write(path, content)
            .await
            .map_err(AgendaError::Io)?;
        Ok(())
    }
}

impl Default for EmbeddedVisitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisitStore for EmbeddedVisitStore {
    async fn create_visit(&self, mut visit: Visit) -> Result<Visit> {
        {
            let mut data = self.data.write().await;
            visit.id = data.next_id;
            data.next_id += 1;
            data.visits.insert(visit.id, visit.clone());
        }
        self.persist().await?;
        Ok(visit)
    }

    async fn get_visit(&self, id: i64) -> Result<Option<Visit>> {
        let data = self.data.read().await;
        Ok(data.visits.get(&id).cloned())
    }

    async fn update_visit(&self, id: i64, update: VisitUpdate) -> Result<Visit> {
        let updated = {
            let mut data = self.data.write().await;
            let visit = data
                .visits
                .get_mut(&id)
                .ok_or(StorageError::VisitNotFound(id))?;
            update.apply_to(visit);
            visit.clone()
        };
        self.persist().await?;
        Ok(updated)
    }

    async fn delete_visit(&self, id: i64) -> Result<bool> {
        let existed = {
            let mut data = self.data.write().await;
            data.exceptions.remove(&id);
            data.visits.remove(&id).is_some()
        };
        self.persist().await?;
        Ok(existed)
    }

    async fn list_visits(&self) -> Result<Vec<Visit>> {
        let data = self.data.read().await;
        let mut visits: Vec<Visit> = data.visits.values().cloned().collect();
        visits.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        Ok(visits)
    }

    fn supports_exceptions(&self) -> bool {
        self.exceptions_enabled
    }

    async fn put_exception(&self, exception: VisitException) -> Result<VisitException> {
        if !self.exceptions_enabled {
            return Err(StorageError::InvalidOperation(
                "exception records are disabled for this store".to_string(),
            )
            .into());
        }
        {
            let mut data = self.data.write().await;
            let series = data.exceptions.entry(exception.series_id).or_default();
            series.retain(|e| e.date != exception.date);
            series.push(exception.clone());
        }
        self.persist().await?;
        Ok(exception)
    }

    async fn exceptions_for_series(&self, series_id: i64) -> Result<Vec<VisitException>> {
        let data = self.data.read().await;
        Ok(data.exceptions.get(&series_id).cloned().unwrap_or_default())
    }

    async fn remove_exception(&self, series_id: i64, date: NaiveDate) -> Result<bool> {
        let removed = {
            let mut data = self.data.write().await;
            match data.exceptions.get_mut(&series_id) {
                Some(series) => {
                    let before = series.len();
                    series.retain(|e| e.date != date);
                    series.len() < before
                }
                None => false,
            }
        };
        self.persist().await?;
        Ok(removed)
    }

    async fn stats(&self) -> Result<ScheduleStats> {
        let data = self.data.read().await;

        let mut by_status: HashMap<String, usize> = HashMap::new();
        for visit in data.visits.values() {
            *by_status.entry(visit.status.as_str().to_string()).or_insert(0) += 1;
        }

        Ok(ScheduleStats {
            total_visits: data.visits.len(),
            recurring_series: data.visits.values().filter(|v| v.is_recurring()).count(),
            by_status,
            exceptions: data.exceptions.values().map(Vec::len).sum(),
        })
    }

    async fn clear(&self) -> Result<()> {
        {
            let mut data = self.data.write().await;
            data.visits.clear();
            data.exceptions.clear();
            data.next_id = 1;
        }
        self.persist().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{RecurrenceRule, VisitStatus};
    use chrono::NaiveDate;

    fn start(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = EmbeddedVisitStore::new();

        let first = store.create_visit(Visit::new(start(2025, 1, 6))).await.unwrap();
        let second = store.create_visit(Visit::new(start(2025, 1, 7))).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = EmbeddedVisitStore::new();
        let visit = store.create_visit(Visit::new(start(2025, 1, 6))).await.unwrap();

        let update = VisitUpdate {
            status: Some(VisitStatus::Paid),
            ..Default::default()
        };
        let updated = store.update_visit(visit.id, update).await.unwrap();
        assert_eq!(updated.status, VisitStatus::Paid);

        assert!(store.delete_visit(visit.id).await.unwrap());
        assert!(store.get_visit(visit.id).await.unwrap().is_none());
        assert!(!store.delete_visit(visit.id).await.unwrap());

        let missing = store
            .update_visit(visit.id, VisitUpdate::default())
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_exception_replaces_same_date() {
        let store = EmbeddedVisitStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();

        store
            .put_exception(VisitException::skip(42, date))
            .await
            .unwrap();
        store
            .put_exception(VisitException::skip(42, date))
            .await
            .unwrap();

        let exceptions = store.exceptions_for_series(42).await.unwrap();
        assert_eq!(exceptions.len(), 1);

        assert!(store.remove_exception(42, date).await.unwrap());
        assert!(!store.remove_exception(42, date).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_visit_drops_exceptions() {
        let store = EmbeddedVisitStore::new();
        let visit = store
            .create_visit(Visit::new(start(2025, 1, 6)).with_recurrence(RecurrenceRule::weekly()))
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        store
            .put_exception(VisitException::skip(visit.id, date))
            .await
            .unwrap();

        store.delete_visit(visit.id).await.unwrap();
        assert!(store
            .exceptions_for_series(visit.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let id = {
            let store = EmbeddedVisitStore::with_persistence(dir.path()).await.unwrap();
            let visit = store
                .create_visit(
                    Visit::new(start(2025, 1, 6))
                        .with_price(150.0)
                        .with_recurrence(RecurrenceRule::weekly_on([1]).times(3)),
                )
                .await
                .unwrap();
            store
                .put_exception(VisitException::skip(
                    visit.id,
                    NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
                ))
                .await
                .unwrap();
            visit.id
        };

        let reloaded = EmbeddedVisitStore::with_persistence(dir.path()).await.unwrap();
        let visit = reloaded.get_visit(id).await.unwrap().unwrap();
        assert_eq!(visit.price, 150.0);
        assert!(visit.is_recurring());
        assert_eq!(reloaded.exceptions_for_series(id).await.unwrap().len(), 1);

        // Id assignment continues past the reloaded visits.
        let next = reloaded.create_visit(Visit::new(start(2025, 2, 1))).await.unwrap();
        assert_eq!(next.id, id + 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = EmbeddedVisitStore::new();
        store
            .create_visit(Visit::new(start(2025, 1, 6)).with_status(VisitStatus::Paid))
            .await
            .unwrap();
        store
            .create_visit(Visit::new(start(2025, 1, 7)).with_recurrence(RecurrenceRule::daily()))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_visits, 2);
        assert_eq!(stats.recurring_series, 1);
        assert_eq!(stats.by_status.get("pago"), Some(&1));
    }
}
