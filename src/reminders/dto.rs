use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CreateReminderRequest {
    pub medicine_id: Option<i64>,
    pub reminder_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReminderRequest {
    pub reminder_time: Option<String>,
    pub enabled: Option<bool>,
}
