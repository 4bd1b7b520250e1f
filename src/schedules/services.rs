use time::Date;
use tracing::{debug, info};

use super::{
    dto::MarkTakenResponse,
    generator::slots_due,
    repo_types::{MarkTaken, ScheduleEntry},
};
use crate::{
    error::{AppError, AppResult},
    store::Store,
};

pub const SCHEDULE_NOT_FOUND: &str = "Schedule not found";

pub async fn list_schedules(store: &dyn Store, user_id: i64) -> AppResult<Vec<ScheduleEntry>> {
    Ok(store.list_schedules(user_id, None).await?)
}

/// Slots for `date`, first creating any that are due but not yet stored.
pub async fn schedule_for_day(
    store: &dyn Store,
    user_id: i64,
    date: Date,
) -> AppResult<Vec<ScheduleEntry>> {
    for medicine in store.medicines_without_slots_on(user_id, date).await? {
        let due = slots_due(&medicine, date);
        if due.is_empty() {
            continue;
        }
        let created = store.insert_slots(user_id, medicine.id, &due).await?;
        debug!(
            user_id,
            medicine_id = medicine.id,
            %date,
            created = created.len(),
            "materialised slots"
        );
    }
    Ok(store.list_schedules(user_id, Some(date)).await?)
}

/// Marks a slot taken. Repeating the call on a taken slot is a no-op that
/// reports `already_taken` and writes no further history.
pub async fn mark_taken(
    store: &dyn Store,
    user_id: i64,
    schedule_id: i64,
) -> AppResult<MarkTakenResponse> {
    match store.mark_slot_taken(user_id, schedule_id).await? {
        MarkTaken::Marked {
            medicine_id,
            history_id,
        } => {
            info!(user_id, schedule_id, medicine_id, history_id, "dose taken");
            Ok(MarkTakenResponse {
                schedule_id,
                already_taken: false,
                history_id: Some(history_id),
            })
        }
        MarkTaken::AlreadyTaken => {
            debug!(user_id, schedule_id, "dose already taken");
            Ok(MarkTakenResponse {
                schedule_id,
                already_taken: true,
                history_id: None,
            })
        }
        MarkTaken::NotFound => Err(AppError::not_found(SCHEDULE_NOT_FOUND)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        history::repo_types::{DoseStatus, HistoryFilter},
        medicines::services::{create_medicine, delete_medicine},
        store::MemoryStore,
        test_support::{aspirin, seed_user},
    };
    use time::macros::{date, time};

    const TODAY: Date = date!(2025 - 06 - 10);

    #[tokio::test]
    async fn today_lists_created_slots_in_time_order() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        create_medicine(&store, alice, aspirin("three-times-daily", "2025-06-01"), TODAY)
            .await
            .unwrap();
        create_medicine(&store, alice, aspirin("daily", "2025-06-01"), TODAY)
            .await
            .unwrap();

        let slots = schedule_for_day(&store, alice, TODAY).await.unwrap();
        let times: Vec<_> = slots.iter().map(|s| s.scheduled_time).collect();
        assert_eq!(
            times,
            vec![time!(08:00), time!(09:00), time!(14:00), time!(20:00)]
        );
    }

    #[tokio::test]
    async fn as_needed_medicine_has_no_slots_today() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let created = create_medicine(&store, alice, aspirin("as-needed", "2025-06-10"), TODAY)
            .await
            .unwrap();

        let slots = schedule_for_day(&store, alice, TODAY).await.unwrap();
        assert!(slots
            .iter()
            .all(|s| s.medicine_id != created.medicine.id));
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn missing_days_are_materialised_once() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        create_medicine(&store, alice, aspirin("twice-daily", "2025-06-01"), TODAY)
            .await
            .unwrap();

        let tomorrow = date!(2025 - 06 - 11);
        let first = schedule_for_day(&store, alice, tomorrow).await.unwrap();
        let second = schedule_for_day(&store, alice, tomorrow).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(
            first.iter().map(|s| s.id).collect::<Vec<_>>(),
            second.iter().map(|s| s.id).collect::<Vec<_>>()
        );

        let all = list_schedules(&store, alice).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].scheduled_date, tomorrow);
        assert_eq!(all[0].scheduled_time, time!(09:00));
    }

    #[tokio::test]
    async fn marking_taken_is_idempotent() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let created = create_medicine(&store, alice, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();
        let slot_id = created.schedules[0].id;

        let first = mark_taken(&store, alice, slot_id).await.unwrap();
        assert!(!first.already_taken);
        assert!(first.history_id.is_some());

        let second = mark_taken(&store, alice, slot_id).await.unwrap();
        assert!(second.already_taken);
        assert_eq!(second.history_id, None);

        let history = store
            .list_history(alice, &HistoryFilter::default())
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].record.status, DoseStatus::Taken);

        let slots = schedule_for_day(&store, alice, TODAY).await.unwrap();
        assert!(slots[0].taken);
        assert!(slots[0].taken_at.is_some());
    }

    #[tokio::test]
    async fn foreign_and_missing_slots_are_not_found() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let bobs = create_medicine(&store, bob, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();
        let slot_id = bobs.schedules[0].id;

        let foreign = mark_taken(&store, alice, slot_id).await.unwrap_err();
        let missing = mark_taken(&store, alice, slot_id + 100).await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
        assert!(matches!(foreign, AppError::NotFound(_)));

        assert!(schedule_for_day(&store, alice, TODAY).await.unwrap().is_empty());
        let bob_slots = schedule_for_day(&store, bob, TODAY).await.unwrap();
        assert!(!bob_slots[0].taken);
    }

    #[tokio::test]
    async fn slots_of_deleted_medicines_are_hidden() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let created = create_medicine(&store, alice, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();
        delete_medicine(&store, alice, created.medicine.id).await.unwrap();

        assert!(list_schedules(&store, alice).await.unwrap().is_empty());
        assert!(matches!(
            mark_taken(&store, alice, created.schedules[0].id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
