use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::Patient;

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch a patient profile; `None` when the id is unknown.
    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}&limit=1", patient_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        match result.into_iter().next() {
            Some(row) => {
                let patient: Patient = serde_json::from_value(row)?;
                debug!("Loaded patient {}", patient.full_name());
                Ok(Some(patient))
            }
            None => Ok(None),
        }
    }
}
