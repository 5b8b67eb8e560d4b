// libs/appointment-cell/src/services/supabase_store.rs
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use doctor_cell::services::DoctorService;
use patient_cell::models::Patient;
use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_database::supabase::{ApiError, SupabaseClient};

use crate::models::{Appointment, NewAppointment, SchedulingError};
use crate::services::store::{AppointmentWriter, SchedulingStore};

/// PostgREST-backed scheduling data.
pub struct SupabaseSchedulingStore {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
    patient_service: PatientService,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
            patient_service: PatientService::new(config),
        }
    }

    /// Keeps sub-second precision so the range filter sees every overlapping row.
    fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    fn timestamp_param(at: DateTime<Utc>) -> String {
        urlencoding::encode(&Self::timestamp(at)).into_owned()
    }
}

fn unavailable(err: anyhow::Error) -> SchedulingError {
    SchedulingError::DataSourceUnavailable(err.to_string())
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn find_patient_by_id(&self, patient_id: Uuid) -> Result<Option<Patient>, SchedulingError> {
        self.patient_service.get_patient(patient_id).await.map_err(unavailable)
    }

    async fn find_doctor_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, SchedulingError> {
        self.doctor_service.get_doctor(doctor_id).await.map_err(unavailable)
    }

    async fn list_all_doctors(&self) -> Result<Vec<Doctor>, SchedulingError> {
        self.doctor_service.list_doctors().await.map_err(unavailable)
    }

    async fn find_conflicting_booking(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=neq.cancelled&start_time=lt.{}&end_time=gt.{}&order=start_time.asc&limit=1",
            doctor_id,
            Self::timestamp_param(end),
            Self::timestamp_param(start),
        );

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(unavailable)?;

        let appointments = rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::DataSourceUnavailable(format!("Failed to parse appointments: {}", e)))?;

        // The server filters already; re-check so a lax backend cannot leak
        // a non-overlapping or cancelled row through as a conflict.
        let conflict = appointments.into_iter().find(|a| a.conflicts_with(doctor_id, start, end));
        if let Some(ref existing) = conflict {
            debug!("Doctor {} busy {} - {} (appointment {})", doctor_id, start, end, existing.id);
        }

        Ok(conflict)
    }
}

#[async_trait]
impl AppointmentWriter for SupabaseSchedulingStore {
    async fn insert_pending_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, SchedulingError> {
        // Best-effort pre-check; the database constraint has the final word
        // and answers 409 when another commit won the race.
        if let Some(existing) = self
            .find_conflicting_booking(appointment.doctor_id, appointment.start_time, appointment.end_time)
            .await?
        {
            warn!(
                "Slot for doctor {} at {} was taken by appointment {}",
                appointment.doctor_id, appointment.start_time, existing.id
            );
            return Err(SchedulingError::SlotTaken);
        }

        let body = json!({
            "patient_id": appointment.patient_id,
            "doctor_id": appointment.doctor_id,
            "start_time": Self::timestamp(appointment.start_time),
            "end_time": Self::timestamp(appointment.end_time),
            "status": appointment.status,
            "reason": appointment.reason,
            "priority_score": appointment.priority_score,
            "source": appointment.source,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase
            .request_with_headers(Method::POST, "/rest/v1/appointments", Some(body), Some(headers))
            .await
            .map_err(|e| {
                if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_conflict) {
                    SchedulingError::SlotTaken
                } else {
                    unavailable(e)
                }
            })?;

        let row = result.into_iter().next().ok_or_else(|| {
            SchedulingError::DataSourceUnavailable("Insert returned no appointment".to_string())
        })?;

        let created: Appointment = serde_json::from_value(row)
            .map_err(|e| SchedulingError::DataSourceUnavailable(format!("Failed to parse appointment: {}", e)))?;

        debug!("Appointment created with ID: {}", created.id);
        Ok(created)
    }
}
