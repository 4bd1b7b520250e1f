use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};

use crate::formats::{serialize_date, serialize_time};

/// One generated dose slot, before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotSpec {
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    #[serde(serialize_with = "serialize_time")]
    pub time: Time,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScheduleSlot {
    pub id: i64,
    pub medicine_id: i64,
    #[serde(serialize_with = "serialize_date")]
    pub scheduled_date: Date,
    #[serde(serialize_with = "serialize_time")]
    pub scheduled_time: Time,
    pub taken: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub taken_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A slot joined with the medicine it belongs to.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScheduleEntry {
    pub id: i64,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(serialize_with = "serialize_date")]
    pub scheduled_date: Date,
    #[serde(serialize_with = "serialize_time")]
    pub scheduled_time: Time,
    pub taken: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub taken_at: Option<OffsetDateTime>,
}

/// Outcome of marking a slot as taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkTaken {
    /// Slot flipped to taken and a `taken` history record was written.
    Marked { medicine_id: i64, history_id: i64 },
    /// Slot was already taken; nothing was written.
    AlreadyTaken,
    /// No slot with that id under an active medicine of this user.
    NotFound,
}
