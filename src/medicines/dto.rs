use serde::{Deserialize, Serialize};

use super::repo_types::Medicine;
use crate::schedules::repo_types::ScheduleSlot;

/// Body of `POST /medicines`. Fields are optional here so that missing ones
/// are reported together as a validation error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateMedicineRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `PUT /medicines/:id`; absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMedicineRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedMedicineResponse {
    pub medicine: Medicine,
    pub schedules: Vec<ScheduleSlot>,
}
