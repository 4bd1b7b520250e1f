use tracing::info;

use super::{
    dto::{CreateReminderRequest, UpdateReminderRequest},
    repo_types::{Reminder, ReminderEntry, ReminderPatch},
};
use crate::{
    error::{AppError, AppResult},
    formats::parse_time,
    medicines::services::MEDICINE_NOT_FOUND,
    store::Store,
};

pub const REMINDER_NOT_FOUND: &str = "Reminder not found";

pub async fn create_reminder(
    store: &dyn Store,
    user_id: i64,
    req: CreateReminderRequest,
) -> AppResult<Reminder> {
    let reminder_time = req.reminder_time.filter(|t| !t.trim().is_empty());
    let (Some(medicine_id), Some(reminder_time)) = (req.medicine_id, reminder_time) else {
        return Err(AppError::validation(
            "Missing required fields: medicine_id, reminder_time",
        ));
    };
    let reminder_time = parse_time("reminder_time", &reminder_time)?;

    let reminder = store
        .create_reminder(user_id, medicine_id, reminder_time)
        .await?
        .ok_or_else(|| AppError::not_found(MEDICINE_NOT_FOUND))?;
    info!(user_id, reminder_id = reminder.id, medicine_id, "reminder created");
    Ok(reminder)
}

pub async fn list_reminders(store: &dyn Store, user_id: i64) -> AppResult<Vec<ReminderEntry>> {
    Ok(store.list_reminders(user_id).await?)
}

pub async fn update_reminder(
    store: &dyn Store,
    user_id: i64,
    id: i64,
    req: UpdateReminderRequest,
) -> AppResult<Reminder> {
    let patch = ReminderPatch {
        reminder_time: req
            .reminder_time
            .map(|t| parse_time("reminder_time", &t))
            .transpose()?,
        enabled: req.enabled,
    };
    if patch.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }
    store
        .update_reminder(user_id, id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(REMINDER_NOT_FOUND))
}

pub async fn delete_reminder(store: &dyn Store, user_id: i64, id: i64) -> AppResult<()> {
    if !store.delete_reminder(user_id, id).await? {
        return Err(AppError::not_found(REMINDER_NOT_FOUND));
    }
    info!(user_id, reminder_id = id, "reminder deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        medicines::services::create_medicine,
        store::MemoryStore,
        test_support::{aspirin, seed_user},
    };
    use time::macros::{date, time};

    async fn setup() -> (MemoryStore, i64, i64, i64) {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let m = create_medicine(&store, alice, aspirin("daily", "2025-06-10"), date!(2025 - 06 - 10))
            .await
            .unwrap();
        (store, alice, bob, m.medicine.id)
    }

    fn at(t: &str, medicine_id: i64) -> CreateReminderRequest {
        CreateReminderRequest {
            medicine_id: Some(medicine_id),
            reminder_time: Some(t.into()),
        }
    }

    #[tokio::test]
    async fn reminders_are_listed_by_time_and_skip_disabled() {
        let (store, alice, _, med) = setup().await;
        let evening = create_reminder(&store, alice, at("20:00", med)).await.unwrap();
        create_reminder(&store, alice, at("08:30", med)).await.unwrap();
        let noon = create_reminder(&store, alice, at("12:00", med)).await.unwrap();

        update_reminder(
            &store,
            alice,
            noon.id,
            UpdateReminderRequest {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let listed = list_reminders(&store, alice).await.unwrap();
        let times: Vec<_> = listed.iter().map(|r| r.reminder.reminder_time).collect();
        assert_eq!(times, vec![time!(08:30), time!(20:00)]);
        assert_eq!(listed[1].reminder.id, evening.id);
        assert_eq!(listed[0].medicine_name, "Aspirin");
    }

    #[tokio::test]
    async fn cannot_attach_reminder_to_foreign_medicine() {
        let (store, _, bob, med) = setup().await;
        let err = create_reminder(&store, bob, at("08:00", med)).await.unwrap_err();
        assert_eq!(err.to_string(), MEDICINE_NOT_FOUND);

        let err = create_reminder(&store, bob, at("8 o'clock", med)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn foreign_and_missing_reminders_are_not_found() {
        let (store, alice, bob, med) = setup().await;
        let r = create_reminder(&store, alice, at("08:00", med)).await.unwrap();

        let foreign = delete_reminder(&store, bob, r.id).await.unwrap_err();
        let missing = delete_reminder(&store, bob, r.id + 1).await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());

        let foreign = update_reminder(
            &store,
            bob,
            r.id,
            UpdateReminderRequest {
                reminder_time: Some("09:00".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(foreign, AppError::NotFound(_)));

        delete_reminder(&store, alice, r.id).await.unwrap();
        assert!(list_reminders(&store, alice).await.unwrap().is_empty());
        assert!(matches!(
            delete_reminder(&store, alice, r.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
