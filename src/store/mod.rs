//! Relational store seam. Every method that touches a medicine, slot,
//! history record or reminder takes the authenticated `user_id` and filters
//! by it; rows owned by someone else behave exactly like missing rows.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::Date;

use crate::{
    auth::repo_types::{NewUser, User},
    history::repo_types::{DoseStatus, HistoryEntry, HistoryFilter, HistoryRecord},
    medicines::repo_types::{Medicine, MedicinePatch, NewMedicine},
    reminders::repo_types::{Reminder, ReminderEntry, ReminderPatch},
    schedules::repo_types::{MarkTaken, ScheduleEntry, ScheduleSlot, SlotSpec},
    stats::aggregator::AdherenceCounts,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // ---- users ----

    /// Returns `None` when the username or email is already taken.
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;

    // ---- medicines ----

    /// Inserts the medicine and its slots in one transaction.
    async fn create_medicine_with_slots(
        &self,
        user_id: i64,
        new: &NewMedicine,
        slots: &[SlotSpec],
    ) -> anyhow::Result<(Medicine, Vec<ScheduleSlot>)>;
    /// Active medicines, newest first.
    async fn list_medicines(&self, user_id: i64) -> anyhow::Result<Vec<Medicine>>;
    async fn find_medicine(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Medicine>>;
    async fn update_medicine(
        &self,
        user_id: i64,
        id: i64,
        patch: &MedicinePatch,
    ) -> anyhow::Result<Option<Medicine>>;
    /// Soft delete. `false` when nothing matched.
    async fn deactivate_medicine(&self, user_id: i64, id: i64) -> anyhow::Result<bool>;

    // ---- schedules ----

    /// Slots of active medicines; for a given `date` ordered by time,
    /// otherwise by date descending then time.
    async fn list_schedules(
        &self,
        user_id: i64,
        date: Option<Date>,
    ) -> anyhow::Result<Vec<ScheduleEntry>>;
    /// Active medicines that have no slot at all on `date`.
    async fn medicines_without_slots_on(
        &self,
        user_id: i64,
        date: Date,
    ) -> anyhow::Result<Vec<Medicine>>;
    /// Inserts slots for an owned medicine, skipping ones that already exist.
    async fn insert_slots(
        &self,
        user_id: i64,
        medicine_id: i64,
        slots: &[SlotSpec],
    ) -> anyhow::Result<Vec<ScheduleSlot>>;
    /// Flips a slot to taken and records history in one transaction.
    async fn mark_slot_taken(&self, user_id: i64, slot_id: i64) -> anyhow::Result<MarkTaken>;

    // ---- history ----

    /// `None` when the medicine is not an active medicine of this user.
    async fn record_history(
        &self,
        user_id: i64,
        medicine_id: i64,
        status: DoseStatus,
        notes: Option<&str>,
    ) -> anyhow::Result<Option<HistoryRecord>>;
    /// Newest first.
    async fn list_history(
        &self,
        user_id: i64,
        filter: &HistoryFilter,
    ) -> anyhow::Result<Vec<HistoryEntry>>;

    // ---- stats ----

    /// All-time counts plus taken/total counts for records on or after
    /// `window_start`.
    async fn adherence_counts(
        &self,
        user_id: i64,
        window_start: Date,
    ) -> anyhow::Result<AdherenceCounts>;

    // ---- reminders ----

    /// `None` when the medicine is not an active medicine of this user.
    async fn create_reminder(
        &self,
        user_id: i64,
        medicine_id: i64,
        reminder_time: time::Time,
    ) -> anyhow::Result<Option<Reminder>>;
    /// Enabled reminders of active medicines, ordered by time.
    async fn list_reminders(&self, user_id: i64) -> anyhow::Result<Vec<ReminderEntry>>;
    async fn update_reminder(
        &self,
        user_id: i64,
        id: i64,
        patch: &ReminderPatch,
    ) -> anyhow::Result<Option<Reminder>>;
    /// Hard delete. `false` when nothing matched.
    async fn delete_reminder(&self, user_id: i64, id: i64) -> anyhow::Result<bool>;
}
