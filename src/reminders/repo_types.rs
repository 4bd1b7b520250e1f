use serde::Serialize;
use sqlx::FromRow;
use time::{OffsetDateTime, Time};

use crate::formats::serialize_time;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reminder {
    pub id: i64,
    pub medicine_id: i64,
    pub user_id: i64,
    #[serde(serialize_with = "serialize_time")]
    pub reminder_time: Time,
    pub enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReminderEntry {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub reminder: Reminder,
    pub medicine_name: String,
    pub dosage: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub reminder_time: Option<Time>,
    pub enabled: Option<bool>,
}

impl ReminderPatch {
    pub fn is_empty(&self) -> bool {
        self.reminder_time.is_none() && self.enabled.is_none()
    }
}
