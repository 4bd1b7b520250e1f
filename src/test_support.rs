//! Fixtures shared by unit tests.

use crate::{
    auth::repo_types::NewUser, medicines::dto::CreateMedicineRequest, store::MemoryStore,
    store::Store,
};

pub async fn seed_user(store: &MemoryStore, username: &str) -> i64 {
    store
        .create_user(NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "not-a-real-hash".into(),
        })
        .await
        .unwrap()
        .expect("fresh user")
        .id
}

pub fn aspirin(frequency: &str, start_date: &str) -> CreateMedicineRequest {
    CreateMedicineRequest {
        name: Some("Aspirin".into()),
        dosage: Some("100mg".into()),
        frequency: Some(frequency.into()),
        start_date: Some(start_date.into()),
        end_date: None,
        notes: None,
    }
}
