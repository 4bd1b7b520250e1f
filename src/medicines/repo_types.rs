use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::formats::{serialize_date, serialize_opt_date};

/// Dosing frequencies the schedule generator understands.
///
/// Medicines may carry any other label; those are stored as-is and never
/// produce slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    TwiceDaily,
    ThreeTimesDaily,
    Weekly,
    AsNeeded,
}

impl Frequency {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "daily" => Some(Self::Daily),
            "twice-daily" => Some(Self::TwiceDaily),
            "three-times-daily" => Some(Self::ThreeTimesDaily),
            "weekly" => Some(Self::Weekly),
            "as-needed" => Some(Self::AsNeeded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Medicine {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(serialize_with = "serialize_date")]
    pub start_date: Date,
    #[serde(serialize_with = "serialize_opt_date")]
    pub end_date: Option<Date>,
    pub notes: Option<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Medicine {
    /// Whether the course covers `date`.
    pub fn covers(&self, date: Date) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Validated input for a new medicine.
#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub notes: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct MedicinePatch {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub notes: Option<String>,
}

impl MedicinePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.dosage.is_none()
            && self.frequency.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.notes.is_none()
    }

    pub fn apply(&self, m: &mut Medicine) {
        if let Some(v) = &self.name {
            m.name = v.clone();
        }
        if let Some(v) = &self.dosage {
            m.dosage = v.clone();
        }
        if let Some(v) = &self.frequency {
            m.frequency = v.clone();
        }
        if let Some(v) = self.start_date {
            m.start_date = v;
        }
        if let Some(v) = self.end_date {
            m.end_date = Some(v);
        }
        if let Some(v) = &self.notes {
            m.notes = Some(v.clone());
        }
    }
}
