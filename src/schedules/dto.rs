use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MarkTakenResponse {
    pub schedule_id: i64,
    /// `true` when the slot had already been taken; nothing new was recorded.
    pub already_taken: bool,
    pub history_id: Option<i64>,
}
