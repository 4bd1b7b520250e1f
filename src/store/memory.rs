//! In-process store with the same ownership and transaction semantics as
//! [`super::PgStore`]. Every operation runs under a single lock, so
//! composite writes are atomic.

use async_trait::async_trait;
use time::{Date, OffsetDateTime, Time, UtcOffset};
use tokio::sync::Mutex;

use super::Store;
use crate::{
    auth::repo_types::{NewUser, User},
    history::repo_types::{DoseStatus, HistoryEntry, HistoryFilter, HistoryRecord},
    medicines::repo_types::{Medicine, MedicinePatch, NewMedicine},
    reminders::repo_types::{Reminder, ReminderEntry, ReminderPatch},
    schedules::repo_types::{MarkTaken, ScheduleEntry, ScheduleSlot, SlotSpec},
    stats::aggregator::AdherenceCounts,
};

#[derive(Default)]
struct Sequences {
    users: i64,
    medicines: i64,
    schedules: i64,
    history: i64,
    reminders: i64,
}

fn bump(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: Vec<User>,
    medicines: Vec<Medicine>,
    schedules: Vec<ScheduleSlot>,
    history: Vec<HistoryRecord>,
    reminders: Vec<Reminder>,
}

impl Tables {
    fn active_medicine(&self, user_id: i64, id: i64) -> Option<&Medicine> {
        self.medicines
            .iter()
            .find(|m| m.id == id && m.user_id == user_id && m.active)
    }

    fn active_medicine_mut(&mut self, user_id: i64, id: i64) -> Option<&mut Medicine> {
        self.medicines
            .iter_mut()
            .find(|m| m.id == id && m.user_id == user_id && m.active)
    }

    fn insert_slot(&mut self, medicine_id: i64, slot: &SlotSpec) -> Option<ScheduleSlot> {
        let exists = self.schedules.iter().any(|s| {
            s.medicine_id == medicine_id
                && s.scheduled_date == slot.date
                && s.scheduled_time == slot.time
        });
        if exists {
            return None;
        }
        let row = ScheduleSlot {
            id: bump(&mut self.seq.schedules),
            medicine_id,
            scheduled_date: slot.date,
            scheduled_time: slot.time,
            taken: false,
            taken_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.schedules.push(row.clone());
        Some(row)
    }

    fn push_history(
        &mut self,
        user_id: i64,
        medicine_id: i64,
        status: DoseStatus,
        notes: Option<&str>,
    ) -> HistoryRecord {
        let record = HistoryRecord {
            id: bump(&mut self.seq.history),
            medicine_id,
            user_id,
            status,
            notes: notes.map(str::to_owned),
            recorded_at: OffsetDateTime::now_utc(),
        };
        self.history.push(record.clone());
        record
    }
}

fn utc_date(ts: OffsetDateTime) -> Date {
    ts.to_offset(UtcOffset::UTC).date()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a history record with an explicit timestamp, bypassing the
    /// ownership check. Used to seed back-dated records.
    #[cfg(test)]
    pub async fn insert_history_at(
        &self,
        user_id: i64,
        medicine_id: i64,
        status: DoseStatus,
        recorded_at: OffsetDateTime,
    ) -> HistoryRecord {
        let mut t = self.tables.lock().await;
        t.push_history(user_id, medicine_id, status, None);
        let last = t.history.last_mut().expect("record just pushed");
        last.recorded_at = recorded_at;
        last.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().await;
        if t
            .users
            .iter()
            .any(|u| u.username == new.username || u.email == new.email)
        {
            return Ok(None);
        }
        let user = User {
            id: bump(&mut t.seq.users),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_medicine_with_slots(
        &self,
        user_id: i64,
        new: &NewMedicine,
        slots: &[SlotSpec],
    ) -> anyhow::Result<(Medicine, Vec<ScheduleSlot>)> {
        let mut t = self.tables.lock().await;
        anyhow::ensure!(
            t.users.iter().any(|u| u.id == user_id),
            "insert medicine: user {user_id} does not exist"
        );
        let medicine = Medicine {
            id: bump(&mut t.seq.medicines),
            user_id,
            name: new.name.clone(),
            dosage: new.dosage.clone(),
            frequency: new.frequency.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            notes: new.notes.clone(),
            active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        t.medicines.push(medicine.clone());
        let created = slots
            .iter()
            .filter_map(|slot| t.insert_slot(medicine.id, slot))
            .collect();
        Ok((medicine, created))
    }

    async fn list_medicines(&self, user_id: i64) -> anyhow::Result<Vec<Medicine>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Medicine> = t
            .medicines
            .iter()
            .filter(|m| m.user_id == user_id && m.active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn find_medicine(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Medicine>> {
        let t = self.tables.lock().await;
        Ok(t.active_medicine(user_id, id).cloned())
    }

    async fn update_medicine(
        &self,
        user_id: i64,
        id: i64,
        patch: &MedicinePatch,
    ) -> anyhow::Result<Option<Medicine>> {
        let mut t = self.tables.lock().await;
        Ok(t.active_medicine_mut(user_id, id).map(|m| {
            patch.apply(m);
            m.clone()
        }))
    }

    async fn deactivate_medicine(&self, user_id: i64, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().await;
        Ok(match t.active_medicine_mut(user_id, id) {
            Some(m) => {
                m.active = false;
                true
            }
            None => false,
        })
    }

    async fn list_schedules(
        &self,
        user_id: i64,
        date: Option<Date>,
    ) -> anyhow::Result<Vec<ScheduleEntry>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<ScheduleEntry> = t
            .schedules
            .iter()
            .filter(|s| date.map_or(true, |d| s.scheduled_date == d))
            .filter_map(|s| {
                let m = t.active_medicine(user_id, s.medicine_id)?;
                Some(ScheduleEntry {
                    id: s.id,
                    medicine_id: m.id,
                    medicine_name: m.name.clone(),
                    dosage: m.dosage.clone(),
                    frequency: m.frequency.clone(),
                    scheduled_date: s.scheduled_date,
                    scheduled_time: s.scheduled_time,
                    taken: s.taken,
                    taken_at: s.taken_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.scheduled_date
                .cmp(&a.scheduled_date)
                .then(a.scheduled_time.cmp(&b.scheduled_time))
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn medicines_without_slots_on(
        &self,
        user_id: i64,
        date: Date,
    ) -> anyhow::Result<Vec<Medicine>> {
        let t = self.tables.lock().await;
        Ok(t.medicines
            .iter()
            .filter(|m| m.user_id == user_id && m.active)
            .filter(|m| {
                !t.schedules
                    .iter()
                    .any(|s| s.medicine_id == m.id && s.scheduled_date == date)
            })
            .cloned()
            .collect())
    }

    async fn insert_slots(
        &self,
        user_id: i64,
        medicine_id: i64,
        slots: &[SlotSpec],
    ) -> anyhow::Result<Vec<ScheduleSlot>> {
        let mut t = self.tables.lock().await;
        if t.active_medicine(user_id, medicine_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(slots
            .iter()
            .filter_map(|slot| t.insert_slot(medicine_id, slot))
            .collect())
    }

    async fn mark_slot_taken(&self, user_id: i64, slot_id: i64) -> anyhow::Result<MarkTaken> {
        let mut t = self.tables.lock().await;
        let Some(idx) = t.schedules.iter().position(|s| s.id == slot_id) else {
            return Ok(MarkTaken::NotFound);
        };
        let medicine_id = t.schedules[idx].medicine_id;
        if t.active_medicine(user_id, medicine_id).is_none() {
            return Ok(MarkTaken::NotFound);
        }
        if t.schedules[idx].taken {
            return Ok(MarkTaken::AlreadyTaken);
        }
        let slot = &mut t.schedules[idx];
        slot.taken = true;
        slot.taken_at = Some(OffsetDateTime::now_utc());
        let record = t.push_history(user_id, medicine_id, DoseStatus::Taken, None);
        Ok(MarkTaken::Marked {
            medicine_id,
            history_id: record.id,
        })
    }

    async fn record_history(
        &self,
        user_id: i64,
        medicine_id: i64,
        status: DoseStatus,
        notes: Option<&str>,
    ) -> anyhow::Result<Option<HistoryRecord>> {
        let mut t = self.tables.lock().await;
        if t.active_medicine(user_id, medicine_id).is_none() {
            return Ok(None);
        }
        Ok(Some(t.push_history(user_id, medicine_id, status, notes)))
    }

    async fn list_history(
        &self,
        user_id: i64,
        filter: &HistoryFilter,
    ) -> anyhow::Result<Vec<HistoryEntry>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<HistoryEntry> = t
            .history
            .iter()
            .filter(|h| h.user_id == user_id)
            .filter(|h| filter.matches(h.medicine_id, utc_date(h.recorded_at)))
            .filter_map(|h| {
                let m = t
                    .medicines
                    .iter()
                    .find(|m| m.id == h.medicine_id && m.user_id == user_id)?;
                Some(HistoryEntry {
                    record: h.clone(),
                    medicine_name: m.name.clone(),
                    dosage: m.dosage.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.record.recorded_at, b.record.id).cmp(&(a.record.recorded_at, a.record.id))
        });
        Ok(rows)
    }

    async fn adherence_counts(
        &self,
        user_id: i64,
        window_start: Date,
    ) -> anyhow::Result<AdherenceCounts> {
        let t = self.tables.lock().await;
        let mut counts = AdherenceCounts {
            total_medicines: t
                .medicines
                .iter()
                .filter(|m| m.user_id == user_id && m.active)
                .count() as i64,
            ..AdherenceCounts::default()
        };
        for h in t.history.iter().filter(|h| h.user_id == user_id) {
            let in_window = utc_date(h.recorded_at) >= window_start;
            match h.status {
                DoseStatus::Taken => counts.taken += 1,
                DoseStatus::Missed => counts.missed += 1,
            }
            if in_window {
                counts.window_total += 1;
                if h.status == DoseStatus::Taken {
                    counts.window_taken += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn create_reminder(
        &self,
        user_id: i64,
        medicine_id: i64,
        reminder_time: Time,
    ) -> anyhow::Result<Option<Reminder>> {
        let mut t = self.tables.lock().await;
        if t.active_medicine(user_id, medicine_id).is_none() {
            return Ok(None);
        }
        let reminder = Reminder {
            id: bump(&mut t.seq.reminders),
            medicine_id,
            user_id,
            reminder_time,
            enabled: true,
            created_at: OffsetDateTime::now_utc(),
        };
        t.reminders.push(reminder.clone());
        Ok(Some(reminder))
    }

    async fn list_reminders(&self, user_id: i64) -> anyhow::Result<Vec<ReminderEntry>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<ReminderEntry> = t
            .reminders
            .iter()
            .filter(|r| r.user_id == user_id && r.enabled)
            .filter_map(|r| {
                let m = t.active_medicine(user_id, r.medicine_id)?;
                Some(ReminderEntry {
                    reminder: r.clone(),
                    medicine_name: m.name.clone(),
                    dosage: m.dosage.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (a.reminder.reminder_time, a.reminder.id).cmp(&(b.reminder.reminder_time, b.reminder.id))
        });
        Ok(rows)
    }

    async fn update_reminder(
        &self,
        user_id: i64,
        id: i64,
        patch: &ReminderPatch,
    ) -> anyhow::Result<Option<Reminder>> {
        let mut t = self.tables.lock().await;
        Ok(t
            .reminders
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user_id)
            .map(|r| {
                if let Some(time) = patch.reminder_time {
                    r.reminder_time = time;
                }
                if let Some(enabled) = patch.enabled {
                    r.enabled = enabled;
                }
                r.clone()
            }))
    }

    async fn delete_reminder(&self, user_id: i64, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().await;
        let before = t.reminders.len();
        t.reminders.retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(t.reminders.len() < before)
    }
}
