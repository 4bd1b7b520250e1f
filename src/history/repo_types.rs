use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseStatus {
    Taken,
    Missed,
}

impl DoseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Taken => "taken",
            Self::Missed => "missed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "taken" => Some(Self::Taken),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub medicine_id: i64,
    pub user_id: i64,
    pub status: DoseStatus,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct HistoryRecordRow {
    pub id: i64,
    pub medicine_id: i64,
    pub user_id: i64,
    pub status: String,
    pub notes: Option<String>,
    pub recorded_at: OffsetDateTime,
}

impl TryFrom<HistoryRecordRow> for HistoryRecord {
    type Error = anyhow::Error;

    fn try_from(r: HistoryRecordRow) -> anyhow::Result<Self> {
        let status = DoseStatus::parse(&r.status)
            .ok_or_else(|| anyhow::anyhow!("unknown history status {:?}", r.status))?;
        Ok(Self {
            id: r.id,
            medicine_id: r.medicine_id,
            user_id: r.user_id,
            status,
            notes: r.notes,
            recorded_at: r.recorded_at,
        })
    }
}

/// A history record joined with its medicine's name and dosage.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: HistoryRecord,
    pub medicine_name: String,
    pub dosage: String,
}

#[derive(Debug, FromRow)]
pub struct HistoryEntryRow {
    #[sqlx(flatten)]
    pub record: HistoryRecordRow,
    pub medicine_name: String,
    pub dosage: String,
}

impl TryFrom<HistoryEntryRow> for HistoryEntry {
    type Error = anyhow::Error;

    fn try_from(r: HistoryEntryRow) -> anyhow::Result<Self> {
        Ok(Self {
            record: r.record.try_into()?,
            medicine_name: r.medicine_name,
            dosage: r.dosage,
        })
    }
}

/// Optional narrowing for history listings. Date bounds are inclusive and
/// compare against the calendar date of `recorded_at` (UTC).
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub medicine_id: Option<i64>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
}

impl HistoryFilter {
    pub fn matches(&self, medicine_id: i64, recorded_on: Date) -> bool {
        self.medicine_id.map_or(true, |id| id == medicine_id)
            && self.date_from.map_or(true, |from| recorded_on >= from)
            && self.date_to.map_or(true, |to| recorded_on <= to)
    }
}
