use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::Doctor;

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch a single doctor; `None` when the id is unknown.
    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}&limit=1", doctor_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// The full roster ordered by id, so callers see the same sequence on
    /// every call regardless of storage order.
    pub async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        debug!("Fetching doctor roster");

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/doctors?order=id.asc",
            None,
        ).await?;

        let doctors = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Doctor>, _>>()?;

        debug!("Loaded {} doctors", doctors.len());
        Ok(doctors)
    }
}
