use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use time::{Date, Time};

use super::Store;
use crate::{
    auth::repo_types::{NewUser, User},
    config::AppConfig,
    history::repo_types::{
        DoseStatus, HistoryEntry, HistoryEntryRow, HistoryFilter, HistoryRecord, HistoryRecordRow,
    },
    medicines::repo_types::{Medicine, MedicinePatch, NewMedicine},
    reminders::repo_types::{Reminder, ReminderEntry, ReminderPatch},
    schedules::repo_types::{MarkTaken, ScheduleEntry, ScheduleSlot, SlotSpec},
    stats::aggregator::AdherenceCounts,
};

/// Postgres-backed store. Cloning shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Insert one slot for an owned, active medicine within a transaction.
/// Returns `None` if the medicine is not visible or the slot already exists.
async fn insert_slot_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    medicine_id: i64,
    slot: &SlotSpec,
) -> anyhow::Result<Option<ScheduleSlot>> {
    let row = sqlx::query_as::<_, ScheduleSlot>(
        r#"
        INSERT INTO schedules (medicine_id, scheduled_date, scheduled_time)
        SELECT m.id, $3, $4
          FROM medicines m
         WHERE m.id = $1 AND m.user_id = $2 AND m.active
        ON CONFLICT (medicine_id, scheduled_date, scheduled_time) DO NOTHING
        RETURNING id, medicine_id, scheduled_date, scheduled_time, taken, taken_at, created_at
        "#,
    )
    .bind(medicine_id)
    .bind(user_id)
    .bind(slot.date)
    .bind(slot.time)
    .fetch_optional(&mut **tx)
    .await
    .context("insert schedule")?;
    Ok(row)
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_optional(&self.pool)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create_medicine_with_slots(
        &self,
        user_id: i64,
        new: &NewMedicine,
        slots: &[SlotSpec],
    ) -> anyhow::Result<(Medicine, Vec<ScheduleSlot>)> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            INSERT INTO medicines (user_id, name, dosage, frequency, start_date, end_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, name, dosage, frequency, start_date, end_date, notes,
                      active, created_at
            "#,
        )
        .bind(user_id)
        .bind(&new.name)
        .bind(&new.dosage)
        .bind(&new.frequency)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.notes.as_deref())
        .fetch_one(&mut *tx)
        .await
        .context("insert medicine")?;

        let mut created = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(row) = insert_slot_tx(&mut tx, user_id, medicine.id, slot).await? {
                created.push(row);
            }
        }

        tx.commit().await.context("commit tx")?;
        Ok((medicine, created))
    }

    async fn list_medicines(&self, user_id: i64) -> anyhow::Result<Vec<Medicine>> {
        let rows = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, user_id, name, dosage, frequency, start_date, end_date, notes,
                   active, created_at
            FROM medicines
            WHERE user_id = $1 AND active
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("list medicines")?;
        Ok(rows)
    }

    async fn find_medicine(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Medicine>> {
        let row = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, user_id, name, dosage, frequency, start_date, end_date, notes,
                   active, created_at
            FROM medicines
            WHERE id = $1 AND user_id = $2 AND active
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("find medicine")?;
        Ok(row)
    }

    async fn update_medicine(
        &self,
        user_id: i64,
        id: i64,
        patch: &MedicinePatch,
    ) -> anyhow::Result<Option<Medicine>> {
        let row = sqlx::query_as::<_, Medicine>(
            r#"
            UPDATE medicines
               SET name       = COALESCE($3, name),
                   dosage     = COALESCE($4, dosage),
                   frequency  = COALESCE($5, frequency),
                   start_date = COALESCE($6, start_date),
                   end_date   = COALESCE($7, end_date),
                   notes      = COALESCE($8, notes)
             WHERE id = $1 AND user_id = $2 AND active
            RETURNING id, user_id, name, dosage, frequency, start_date, end_date, notes,
                      active, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.name.as_deref())
        .bind(patch.dosage.as_deref())
        .bind(patch.frequency.as_deref())
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(patch.notes.as_deref())
        .fetch_optional(&self.pool)
        .await
        .context("update medicine")?;
        Ok(row)
    }

    async fn deactivate_medicine(&self, user_id: i64, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE medicines SET active = FALSE WHERE id = $1 AND user_id = $2 AND active"#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("deactivate medicine")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_schedules(
        &self,
        user_id: i64,
        date: Option<Date>,
    ) -> anyhow::Result<Vec<ScheduleEntry>> {
        let rows = sqlx::query_as::<_, ScheduleEntry>(
            r#"
            SELECT s.id, s.medicine_id, m.name AS medicine_name, m.dosage, m.frequency,
                   s.scheduled_date, s.scheduled_time, s.taken, s.taken_at
              FROM schedules s
              JOIN medicines m ON m.id = s.medicine_id
             WHERE m.user_id = $1 AND m.active
               AND ($2::date IS NULL OR s.scheduled_date = $2)
             ORDER BY s.scheduled_date DESC, s.scheduled_time ASC, s.id ASC
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .context("list schedules")?;
        Ok(rows)
    }

    async fn medicines_without_slots_on(
        &self,
        user_id: i64,
        date: Date,
    ) -> anyhow::Result<Vec<Medicine>> {
        let rows = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT m.id, m.user_id, m.name, m.dosage, m.frequency, m.start_date, m.end_date,
                   m.notes, m.active, m.created_at
              FROM medicines m
             WHERE m.user_id = $1 AND m.active
               AND NOT EXISTS (
                   SELECT 1 FROM schedules s
                    WHERE s.medicine_id = m.id AND s.scheduled_date = $2
               )
             ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .context("list medicines without slots")?;
        Ok(rows)
    }

    async fn insert_slots(
        &self,
        user_id: i64,
        medicine_id: i64,
        slots: &[SlotSpec],
    ) -> anyhow::Result<Vec<ScheduleSlot>> {
        let mut tx = self.pool.begin().await.context("begin tx")?;
        let mut created = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(row) = insert_slot_tx(&mut tx, user_id, medicine_id, slot).await? {
                created.push(row);
            }
        }
        tx.commit().await.context("commit tx")?;
        Ok(created)
    }

    async fn mark_slot_taken(&self, user_id: i64, slot_id: i64) -> anyhow::Result<MarkTaken> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let slot = sqlx::query_as::<_, (i64, bool)>(
            r#"
            SELECT s.medicine_id, s.taken
              FROM schedules s
              JOIN medicines m ON m.id = s.medicine_id
             WHERE s.id = $1 AND m.user_id = $2 AND m.active
               FOR UPDATE OF s
            "#,
        )
        .bind(slot_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock schedule")?;

        let medicine_id = match slot {
            None => return Ok(MarkTaken::NotFound),
            Some((_, true)) => return Ok(MarkTaken::AlreadyTaken),
            Some((medicine_id, false)) => medicine_id,
        };

        sqlx::query(r#"UPDATE schedules SET taken = TRUE, taken_at = now() WHERE id = $1"#)
            .bind(slot_id)
            .execute(&mut *tx)
            .await
            .context("mark schedule taken")?;

        let history_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO medicine_history (medicine_id, user_id, status)
            VALUES ($1, $2, 'taken')
            RETURNING id
            "#,
        )
        .bind(medicine_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .context("insert history")?;

        tx.commit().await.context("commit tx")?;
        Ok(MarkTaken::Marked {
            medicine_id,
            history_id,
        })
    }

    async fn record_history(
        &self,
        user_id: i64,
        medicine_id: i64,
        status: DoseStatus,
        notes: Option<&str>,
    ) -> anyhow::Result<Option<HistoryRecord>> {
        let row = sqlx::query_as::<_, HistoryRecordRow>(
            r#"
            INSERT INTO medicine_history (medicine_id, user_id, status, notes)
            SELECT m.id, m.user_id, $3, $4
              FROM medicines m
             WHERE m.id = $1 AND m.user_id = $2 AND m.active
            RETURNING id, medicine_id, user_id, status, notes, recorded_at
            "#,
        )
        .bind(medicine_id)
        .bind(user_id)
        .bind(status.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .context("insert history")?;
        row.map(HistoryRecord::try_from).transpose()
    }

    async fn list_history(
        &self,
        user_id: i64,
        filter: &HistoryFilter,
    ) -> anyhow::Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryEntryRow>(
            r#"
            SELECT h.id, h.medicine_id, h.user_id, h.status, h.notes, h.recorded_at,
                   m.name AS medicine_name, m.dosage
              FROM medicine_history h
              JOIN medicines m ON m.id = h.medicine_id
             WHERE h.user_id = $1 AND m.user_id = $1
               AND ($2::bigint IS NULL OR h.medicine_id = $2)
               AND ($3::date IS NULL OR (h.recorded_at AT TIME ZONE 'UTC')::date >= $3)
               AND ($4::date IS NULL OR (h.recorded_at AT TIME ZONE 'UTC')::date <= $4)
             ORDER BY h.recorded_at DESC, h.id DESC
            "#,
        )
        .bind(user_id)
        .bind(filter.medicine_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_all(&self.pool)
        .await
        .context("list history")?;
        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    async fn adherence_counts(
        &self,
        user_id: i64,
        window_start: Date,
    ) -> anyhow::Result<AdherenceCounts> {
        let (total_medicines, taken, missed, window_taken, window_total) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM medicines WHERE user_id = $1 AND active),
                    COUNT(*) FILTER (WHERE status = 'taken'),
                    COUNT(*) FILTER (WHERE status = 'missed'),
                    COUNT(*) FILTER (WHERE status = 'taken'
                                       AND (recorded_at AT TIME ZONE 'UTC')::date >= $2),
                    COUNT(*) FILTER (WHERE (recorded_at AT TIME ZONE 'UTC')::date >= $2)
                  FROM medicine_history
                 WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .bind(window_start)
            .fetch_one(&self.pool)
            .await
            .context("count adherence")?;
        Ok(AdherenceCounts {
            total_medicines,
            taken,
            missed,
            window_taken,
            window_total,
        })
    }

    async fn create_reminder(
        &self,
        user_id: i64,
        medicine_id: i64,
        reminder_time: Time,
    ) -> anyhow::Result<Option<Reminder>> {
        let row = sqlx::query_as::<_, Reminder>(
            r#"
            INSERT INTO reminders (medicine_id, user_id, reminder_time)
            SELECT m.id, m.user_id, $3
              FROM medicines m
             WHERE m.id = $1 AND m.user_id = $2 AND m.active
            RETURNING id, medicine_id, user_id, reminder_time, enabled, created_at
            "#,
        )
        .bind(medicine_id)
        .bind(user_id)
        .bind(reminder_time)
        .fetch_optional(&self.pool)
        .await
        .context("insert reminder")?;
        Ok(row)
    }

    async fn list_reminders(&self, user_id: i64) -> anyhow::Result<Vec<ReminderEntry>> {
        let rows = sqlx::query_as::<_, ReminderEntry>(
            r#"
            SELECT r.id, r.medicine_id, r.user_id, r.reminder_time, r.enabled, r.created_at,
                   m.name AS medicine_name, m.dosage
              FROM reminders r
              JOIN medicines m ON m.id = r.medicine_id
             WHERE r.user_id = $1 AND m.user_id = $1 AND r.enabled AND m.active
             ORDER BY r.reminder_time ASC, r.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("list reminders")?;
        Ok(rows)
    }

    async fn update_reminder(
        &self,
        user_id: i64,
        id: i64,
        patch: &ReminderPatch,
    ) -> anyhow::Result<Option<Reminder>> {
        let row = sqlx::query_as::<_, Reminder>(
            r#"
            UPDATE reminders
               SET reminder_time = COALESCE($3, reminder_time),
                   enabled       = COALESCE($4, enabled)
             WHERE id = $1 AND user_id = $2
            RETURNING id, medicine_id, user_id, reminder_time, enabled, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.reminder_time)
        .bind(patch.enabled)
        .fetch_optional(&self.pool)
        .await
        .context("update reminder")?;
        Ok(row)
    }

    async fn delete_reminder(&self, user_id: i64, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM reminders WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("delete reminder")?;
        Ok(res.rows_affected() > 0)
    }
}
