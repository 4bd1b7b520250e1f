use serde::Deserialize;

/// Query string of `GET /history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub medicine_id: Option<i64>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Body of `POST /history`; `status` defaults to `taken`.
#[derive(Debug, Default, Deserialize)]
pub struct RecordDoseRequest {
    pub medicine_id: Option<i64>,
    pub status: Option<String>,
    pub notes: Option<String>,
}
