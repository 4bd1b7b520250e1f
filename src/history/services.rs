use tracing::info;

use super::{
    dto::{HistoryQuery, RecordDoseRequest},
    repo_types::{DoseStatus, HistoryEntry, HistoryFilter, HistoryRecord},
};
use crate::{
    error::{AppError, AppResult},
    formats::parse_date,
    medicines::services::MEDICINE_NOT_FOUND,
    store::Store,
};

pub fn parse_filter(q: HistoryQuery) -> AppResult<HistoryFilter> {
    let bound = |field: &str, v: Option<String>| {
        v.filter(|s| !s.trim().is_empty())
            .map(|s| parse_date(field, &s))
            .transpose()
    };
    Ok(HistoryFilter {
        medicine_id: q.medicine_id,
        date_from: bound("date_from", q.date_from)?,
        date_to: bound("date_to", q.date_to)?,
    })
}

pub async fn list_history(
    store: &dyn Store,
    user_id: i64,
    q: HistoryQuery,
) -> AppResult<Vec<HistoryEntry>> {
    let filter = parse_filter(q)?;
    Ok(store.list_history(user_id, &filter).await?)
}

/// Manually records a dose outcome; the only way `missed` records appear.
pub async fn record_dose(
    store: &dyn Store,
    user_id: i64,
    req: RecordDoseRequest,
) -> AppResult<HistoryRecord> {
    let medicine_id = req
        .medicine_id
        .ok_or_else(|| AppError::validation("Missing required fields: medicine_id"))?;
    let status = match req.status.as_deref().map(str::trim) {
        None | Some("") => DoseStatus::Taken,
        Some(s) => DoseStatus::parse(s)
            .ok_or_else(|| AppError::validation("status must be 'taken' or 'missed'"))?,
    };
    let notes = req
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let record = store
        .record_history(user_id, medicine_id, status, notes.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found(MEDICINE_NOT_FOUND))?;
    info!(
        user_id,
        medicine_id,
        status = status.as_str(),
        history_id = record.id,
        "dose recorded"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        medicines::services::create_medicine,
        schedules::services::mark_taken,
        store::MemoryStore,
        test_support::{aspirin, seed_user},
    };
    use time::{macros::date, Date, OffsetDateTime};

    fn today() -> Date {
        OffsetDateTime::now_utc().date()
    }

    #[tokio::test]
    async fn records_missed_doses_and_filters_by_medicine() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let a = create_medicine(&store, alice, aspirin("daily", "2025-01-01"), today())
            .await
            .unwrap();
        let b = create_medicine(&store, alice, aspirin("as-needed", "2025-01-01"), today())
            .await
            .unwrap();

        mark_taken(&store, alice, a.schedules[0].id).await.unwrap();
        let missed = record_dose(
            &store,
            alice,
            RecordDoseRequest {
                medicine_id: Some(b.medicine.id),
                status: Some("missed".into()),
                notes: Some("forgot".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(missed.status, DoseStatus::Missed);
        assert_eq!(missed.notes.as_deref(), Some("forgot"));

        let all = list_history(&store, alice, HistoryQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].record.id, missed.id, "newest first");

        let only_b = list_history(
            &store,
            alice,
            HistoryQuery {
                medicine_id: Some(b.medicine.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].medicine_name, "Aspirin");
    }

    #[tokio::test]
    async fn date_bounds_are_inclusive() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let m = create_medicine(&store, alice, aspirin("as-needed", "2025-01-01"), today())
            .await
            .unwrap();
        for day in [date!(2025 - 03 - 01), date!(2025 - 03 - 05), date!(2025 - 03 - 09)] {
            store
                .insert_history_at(
                    alice,
                    m.medicine.id,
                    DoseStatus::Taken,
                    day.midnight().assume_utc(),
                )
                .await;
        }

        let window = list_history(
            &store,
            alice,
            HistoryQuery {
                date_from: Some("2025-03-05".into()),
                date_to: Some("2025-03-09".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(window.len(), 2);

        let bad = list_history(
            &store,
            alice,
            HistoryQuery {
                date_from: Some("March".into()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn cannot_record_against_foreign_medicine() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let bobs = create_medicine(&store, bob, aspirin("daily", "2025-01-01"), today())
            .await
            .unwrap();

        let err = record_dose(
            &store,
            alice,
            RecordDoseRequest {
                medicine_id: Some(bobs.medicine.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), MEDICINE_NOT_FOUND);

        let err = record_dose(
            &store,
            bob,
            RecordDoseRequest {
                medicine_id: Some(bobs.medicine.id),
                status: Some("skipped".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(list_history(&store, alice, HistoryQuery::default())
            .await
            .unwrap()
            .is_empty());
    }
}
