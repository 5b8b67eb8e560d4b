use std::sync::Arc;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, SchedulerSettings};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduler: SchedulerSettings,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock PostgREST server.
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            port: 3000,
            ping_message: "ping".to_string(),
            scheduler: self.scheduler.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(doctor_id: &str, location: Option<&str>) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "first_name": "Test",
            "last_name": "Doctor",
            "specialty": "General Practice",
            "clinic": "Test Clinic",
            "location": location,
            "availability": [
                { "day_of_week": 1, "start_time": "09:00:00", "end_time": "17:00:00" }
            ]
        })
    }

    pub fn patient_response(patient_id: &str, location: Option<&str>) -> serde_json::Value {
        json!({
            "id": patient_id,
            "first_name": "Test",
            "last_name": "Patient",
            "location": location
        })
    }

    pub fn appointment_response(
        doctor_id: &str,
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "start_time": start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            "end_time": end.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            "status": status,
            "reason": null,
            "priority_score": null,
            "source": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
