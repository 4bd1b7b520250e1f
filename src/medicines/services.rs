use time::Date;
use tracing::info;

use super::{
    dto::{CreateMedicineRequest, CreatedMedicineResponse, UpdateMedicineRequest},
    repo_types::{Medicine, MedicinePatch, NewMedicine},
};
use crate::{
    error::{AppError, AppResult},
    formats::parse_date,
    schedules::generator::generate_slots,
    store::Store,
};

pub const MEDICINE_NOT_FOUND: &str = "Medicine not found";

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn check_range(start: Date, end: Option<Date>) -> AppResult<()> {
    match end {
        Some(end) if end < start => Err(AppError::validation(
            "end_date must not be before start_date",
        )),
        _ => Ok(()),
    }
}

pub fn validate_new(req: CreateMedicineRequest) -> AppResult<NewMedicine> {
    let name = non_empty(req.name);
    let dosage = non_empty(req.dosage);
    let frequency = non_empty(req.frequency);
    let start_date = non_empty(req.start_date);

    let missing: Vec<&str> = [
        ("name", name.is_none()),
        ("dosage", dosage.is_none()),
        ("frequency", frequency.is_none()),
        ("start_date", start_date.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();
    let (Some(name), Some(dosage), Some(frequency), Some(start_date)) =
        (name, dosage, frequency, start_date)
    else {
        return Err(AppError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    };

    let start_date = parse_date("start_date", &start_date)?;
    let end_date = non_empty(req.end_date)
        .map(|d| parse_date("end_date", &d))
        .transpose()?;
    check_range(start_date, end_date)?;

    Ok(NewMedicine {
        name,
        dosage,
        frequency,
        start_date,
        end_date,
        notes: non_empty(req.notes),
    })
}

pub fn validate_patch(req: UpdateMedicineRequest) -> AppResult<MedicinePatch> {
    let required = |field: &str, v: Option<String>| -> AppResult<Option<String>> {
        match v {
            Some(s) if s.trim().is_empty() => {
                Err(AppError::validation(format!("{field} must not be empty")))
            }
            other => Ok(other.map(|s| s.trim().to_string())),
        }
    };
    let patch = MedicinePatch {
        name: required("name", req.name)?,
        dosage: required("dosage", req.dosage)?,
        frequency: required("frequency", req.frequency)?,
        start_date: req
            .start_date
            .map(|d| parse_date("start_date", &d))
            .transpose()?,
        end_date: req
            .end_date
            .map(|d| parse_date("end_date", &d))
            .transpose()?,
        notes: req.notes.map(|s| s.trim().to_string()),
    };
    if patch.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }
    Ok(patch)
}

/// Creates the medicine together with its slots for `today`, atomically.
/// A course that already ended gets no slots.
pub async fn create_medicine(
    store: &dyn Store,
    user_id: i64,
    req: CreateMedicineRequest,
    today: Date,
) -> AppResult<CreatedMedicineResponse> {
    let new = validate_new(req)?;
    let slots = match new.end_date {
        Some(end) if end < today => Vec::new(),
        _ => generate_slots(&new.frequency, new.start_date, today),
    };
    let (medicine, schedules) = store
        .create_medicine_with_slots(user_id, &new, &slots)
        .await?;
    info!(
        user_id,
        medicine_id = medicine.id,
        slots = schedules.len(),
        "medicine created"
    );
    Ok(CreatedMedicineResponse {
        medicine,
        schedules,
    })
}

pub async fn list_medicines(store: &dyn Store, user_id: i64) -> AppResult<Vec<Medicine>> {
    Ok(store.list_medicines(user_id).await?)
}

pub async fn get_medicine(store: &dyn Store, user_id: i64, id: i64) -> AppResult<Medicine> {
    store
        .find_medicine(user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found(MEDICINE_NOT_FOUND))
}

pub async fn update_medicine(
    store: &dyn Store,
    user_id: i64,
    id: i64,
    req: UpdateMedicineRequest,
) -> AppResult<Medicine> {
    let patch = validate_patch(req)?;
    if patch.start_date.is_some() || patch.end_date.is_some() {
        let current = get_medicine(store, user_id, id).await?;
        check_range(
            patch.start_date.unwrap_or(current.start_date),
            patch.end_date.or(current.end_date),
        )?;
    }
    let medicine = store
        .update_medicine(user_id, id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(MEDICINE_NOT_FOUND))?;
    info!(user_id, medicine_id = id, "medicine updated");
    Ok(medicine)
}

pub async fn delete_medicine(store: &dyn Store, user_id: i64, id: i64) -> AppResult<()> {
    if !store.deactivate_medicine(user_id, id).await? {
        return Err(AppError::not_found(MEDICINE_NOT_FOUND));
    }
    info!(user_id, medicine_id = id, "medicine deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::{aspirin, seed_user};
    use time::macros::{date, time};

    const TODAY: Date = date!(2025 - 06 - 10);

    #[tokio::test]
    async fn daily_medicine_gets_one_slot_today() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let created = create_medicine(&store, alice, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();

        assert_eq!(created.medicine.user_id, alice);
        assert!(created.medicine.active);
        assert_eq!(created.schedules.len(), 1);
        assert_eq!(created.schedules[0].scheduled_time, time!(09:00));
        assert_eq!(created.schedules[0].scheduled_date, TODAY);
        assert!(!created.schedules[0].taken);
    }

    #[tokio::test]
    async fn unknown_frequency_is_accepted_without_slots() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let created = create_medicine(&store, alice, aspirin("hourly", "2025-06-10"), TODAY)
            .await
            .unwrap();

        assert_eq!(created.medicine.frequency, "hourly");
        assert!(created.schedules.is_empty());
    }

    #[tokio::test]
    async fn finished_course_gets_no_slots() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let mut req = aspirin("twice-daily", "2025-05-01");
        req.end_date = Some("2025-06-09".into());
        let created = create_medicine(&store, alice, req, TODAY).await.unwrap();
        assert!(created.schedules.is_empty());

        let mut req = aspirin("twice-daily", "2025-05-01");
        req.end_date = Some("2025-06-10".into());
        let created = create_medicine(&store, alice, req, TODAY).await.unwrap();
        assert_eq!(created.schedules.len(), 2);
    }

    #[tokio::test]
    async fn missing_fields_are_reported_before_any_write() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let req = CreateMedicineRequest {
            name: Some("  ".into()),
            frequency: Some("daily".into()),
            ..Default::default()
        };
        let err = create_medicine(&store, alice, req, TODAY).await.unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert_eq!(msg, "Missing required fields: name, dosage, start_date")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(list_medicines(&store, alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_dates_are_validation_errors() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let err = create_medicine(&store, alice, aspirin("daily", "06/10/2025"), TODAY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut req = aspirin("daily", "2025-06-10");
        req.end_date = Some("2025-06-01".into());
        let err = create_medicine(&store, alice, req, TODAY).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn listing_never_returns_other_users_rows() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        create_medicine(&store, alice, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();
        let bobs = create_medicine(&store, bob, aspirin("weekly", "2025-06-10"), TODAY)
            .await
            .unwrap();

        let alices = list_medicines(&store, alice).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert!(alices.iter().all(|m| m.user_id == alice));

        for guess in 1..=bobs.medicine.id + 2 {
            if let Ok(m) = get_medicine(&store, alice, guess).await {
                assert_eq!(m.user_id, alice);
            }
        }
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let mut req = aspirin("daily", "2025-06-10");
        req.notes = Some("with food".into());
        let created = create_medicine(&store, alice, req, TODAY).await.unwrap();

        let updated = update_medicine(
            &store,
            alice,
            created.medicine.id,
            UpdateMedicineRequest {
                dosage: Some("200mg".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.dosage, "200mg");
        assert_eq!(updated.name, "Aspirin");
        assert_eq!(updated.notes.as_deref(), Some("with food"));
        assert_eq!(updated.start_date, date!(2025 - 06 - 10));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let created = create_medicine(&store, alice, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();

        let err = update_medicine(&store, alice, created.medicine.id, Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "No fields to update"));
    }

    #[tokio::test]
    async fn missing_and_foreign_ids_report_identical_not_found() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let bobs = create_medicine(&store, bob, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();

        let patch = || UpdateMedicineRequest {
            name: Some("Ibuprofen".into()),
            ..Default::default()
        };
        let foreign = update_medicine(&store, alice, bobs.medicine.id, patch())
            .await
            .unwrap_err();
        let missing = update_medicine(&store, alice, 9_999, patch()).await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
        assert!(matches!(foreign, AppError::NotFound(_)));

        let foreign = delete_medicine(&store, alice, bobs.medicine.id)
            .await
            .unwrap_err();
        let missing = delete_medicine(&store, alice, 9_999).await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
        assert!(matches!(missing, AppError::NotFound(_)));

        // bob's medicine is untouched
        let still = get_medicine(&store, bob, bobs.medicine.id).await.unwrap();
        assert_eq!(still.name, "Aspirin");
    }

    #[tokio::test]
    async fn soft_deleted_medicines_disappear_from_reads() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let created = create_medicine(&store, alice, aspirin("daily", "2025-06-10"), TODAY)
            .await
            .unwrap();

        delete_medicine(&store, alice, created.medicine.id).await.unwrap();

        assert!(list_medicines(&store, alice).await.unwrap().is_empty());
        assert!(matches!(
            get_medicine(&store, alice, created.medicine.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_medicine(&store, alice, created.medicine.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
