//! End-to-end scheduling flow: payload to expansion to scoped mutation.

use std::sync::Arc;

use chrono::NaiveDate;

use agenda::storage::EmbeddedVisitStore;
use agenda::{
    DateRange, DeleteOp, MutationScope, VisitManager, VisitPayload, VisitStatus, VisitUpdate,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn manager() -> VisitManager<EmbeddedVisitStore> {
    VisitManager::new(Arc::new(EmbeddedVisitStore::new()))
}

/// The client form payload for a weekly Monday series, three occurrences.
fn weekly_payload() -> VisitPayload {
    serde_json::from_str(
        r#"{
            "cliente_id": 7,
            "data_visita": "2025-01-06T10:00",
            "preco": 150.0,
            "descricao": "Limpeza semanal",
            "status": "pendente_visita",
            "tags": [{"id": 1, "name": "residencial"}],
            "is_recorrente": 1,
            "recorrencia": {
                "freq": "semanal",
                "intervalo": 1,
                "dias_semana": ["1"],
                "fim_tipo": "quantidade",
                "fim_qtd": 3
            }
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_payload_to_expansion() {
    let manager = manager();

    let visit = manager.create(weekly_payload().into_visit().unwrap()).await.unwrap();
    assert_eq!(visit.id, 1);

    let occurrences = manager
        .occurrences_in_range(DateRange::new(date(2025, 1, 1), date(2025, 2, 1)))
        .await
        .unwrap();

    let ids: Vec<&str> = occurrences.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["1-2025-01-06", "1-2025-01-13", "1-2025-01-20"]);
    assert!(occurrences.iter().all(|o| o.price == 150.0));
    assert!(occurrences.iter().all(|o| o.client_id == Some(7)));
}

#[tokio::test]
async fn test_malformed_payload_never_reaches_the_store() {
    let manager = manager();

    let mut payload = weekly_payload();
    payload.recorrencia.as_mut().unwrap().intervalo = Some(0);
    assert!(payload.into_visit().is_err());

    // Nothing was stored.
    assert_eq!(manager.stats().await.unwrap().total_visits, 0);
}

#[tokio::test]
async fn test_single_occurrence_delete_then_series_delete() {
    let manager = manager();
    let visit = manager.create(weekly_payload().into_visit().unwrap()).await.unwrap();
    let range = DateRange::new(date(2025, 1, 1), date(2025, 2, 1));

    // The user deletes just the middle occurrence from the day dialog.
    let op = manager
        .delete("1-2025-01-13", MutationScope::Single, None)
        .await
        .unwrap();
    assert_eq!(
        op,
        DeleteOp::SkipOccurrence {
            series_id: 1,
            date: date(2025, 1, 13)
        }
    );

    let remaining = manager.occurrences_in_range(range).await.unwrap();
    let dates: Vec<NaiveDate> = remaining.iter().map(|o| o.date()).collect();
    assert_eq!(dates, vec![date(2025, 1, 6), date(2025, 1, 20)]);

    // Then deletes the whole series from any occurrence id.
    let op = manager
        .delete("1-2025-01-20", MutationScope::All, None)
        .await
        .unwrap();
    assert_eq!(op, DeleteOp::DeleteSeries { series_id: 1 });
    assert!(manager.occurrences_in_range(range).await.unwrap().is_empty());
    assert!(manager.get(visit.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_single_edit_via_data_instancia() {
    let manager = manager();
    manager.create(weekly_payload().into_visit().unwrap()).await.unwrap();

    // The edit dialog sends the series id plus data_instancia.
    let changes = VisitUpdate {
        status: Some(VisitStatus::Paid),
        price: Some(120.0),
        ..Default::default()
    };
    manager
        .edit("1", changes, MutationScope::Single, Some(date(2025, 1, 20)))
        .await
        .unwrap();

    let occurrences = manager
        .occurrences_in_range(DateRange::new(date(2025, 1, 1), date(2025, 2, 1)))
        .await
        .unwrap();
    assert_eq!(occurrences.len(), 3);
    assert_eq!(occurrences[0].status, VisitStatus::PendingVisit);
    assert_eq!(occurrences[2].status, VisitStatus::Paid);
    assert_eq!(occurrences[2].price, 120.0);

    // Other occurrences and the root keep the original price.
    assert_eq!(occurrences[0].price, 150.0);
    assert_eq!(manager.get(1).await.unwrap().unwrap().price, 150.0);
}

#[tokio::test]
async fn test_conflict_warning_on_busy_day() {
    let manager = manager();
    manager.create(weekly_payload().into_visit().unwrap()).await.unwrap();

    // A one-off visit on a Monday the series already covers.
    let one_off: VisitPayload = serde_json::from_str(
        r#"{
            "data_visita": "2025-01-13T15:00",
            "preco": 80.0,
            "status": "pendente_visita"
        }"#,
    )
    .unwrap();
    manager.create(one_off.into_visit().unwrap()).await.unwrap();

    let conflicts = manager.check_conflicts(date(2025, 1, 13)).await.unwrap();
    assert_eq!(conflicts.len(), 2);
    // Day granularity: different hours still conflict.
    assert_eq!(conflicts[0].id, "1-2025-01-13");
    assert_eq!(conflicts[1].id, "2");

    assert!(manager.check_conflicts(date(2025, 1, 14)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_track_series_and_exceptions() {
    let manager = manager();
    manager.create(weekly_payload().into_visit().unwrap()).await.unwrap();
    manager
        .delete("1-2025-01-13", MutationScope::Single, None)
        .await
        .unwrap();

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.total_visits, 1);
    assert_eq!(stats.recurring_series, 1);
    assert_eq!(stats.exceptions, 1);
    assert_eq!(stats.by_status.get("pendente_visita"), Some(&1));
}
