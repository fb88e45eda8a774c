//! Persistence: series and exception records survive a store reload.

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use agenda::storage::EmbeddedVisitStore;
use agenda::{DateRange, MutationScope, RecurrenceRule, Visit, VisitManager};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_reload_preserves_series_and_exceptions() {
    let data_dir = TempDir::new().unwrap();
    let range = DateRange::new(date(2025, 1, 1), date(2025, 2, 1));

    {
        let store = EmbeddedVisitStore::with_persistence(data_dir.path())
            .await
            .unwrap();
        let manager = VisitManager::new(Arc::new(store));

        let visit = Visit::new(date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap())
            .with_price(150.0)
            .with_recurrence(RecurrenceRule::weekly_on([1]).times(3));
        manager.create(visit).await.unwrap();
        manager
            .delete("1-2025-01-13", MutationScope::Single, None)
            .await
            .unwrap();
    }

    // A fresh store over the same directory sees the same schedule.
    let store = EmbeddedVisitStore::with_persistence(data_dir.path())
        .await
        .unwrap();
    let manager = VisitManager::new(Arc::new(store));

    let occurrences = manager.occurrences_in_range(range).await.unwrap();
    let dates: Vec<NaiveDate> = occurrences.iter().map(|o| o.date()).collect();
    assert_eq!(dates, vec![date(2025, 1, 6), date(2025, 1, 20)]);

    // Expansion after reload is idempotent with the pre-reload ids.
    let ids: Vec<&str> = occurrences.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["1-2025-01-06", "1-2025-01-20"]);
}
