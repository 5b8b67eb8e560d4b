// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A persisted booking. The slot search reads these as existing bookings; the
/// booking flow writes new ones with status `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub priority_score: Option<f64>,
    pub source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Half-open overlap with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Cancelled bookings free their time; every other status holds it.
    pub fn blocks_schedule(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn conflicts_with(&self, doctor_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.doctor_id == doctor_id && self.blocks_schedule() && self.overlaps(start, end)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Appointment about to be committed by the booking flow.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub priority_score: f64,
    pub source: String,
}

impl NewAppointment {
    pub const OPTIMIZER_SOURCE: &'static str = "optimizer";

    pub fn from_suggestion(suggestion: &SlotSuggestion, patient_id: Uuid, reason: Option<String>) -> Self {
        Self {
            patient_id,
            doctor_id: suggestion.doctor_id,
            start_time: suggestion.start,
            end_time: suggestion.end,
            status: AppointmentStatus::Pending,
            reason,
            priority_score: suggestion.priority_score,
            source: Self::OPTIMIZER_SOURCE.to_string(),
        }
    }
}

// ==============================================================================
// SLOT ALLOCATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    pub desired_start: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub patient_id: Uuid,
    pub preferred_doctor_id: Option<Uuid>,
    pub urgency: Option<i32>,
}

impl SlotRequest {
    pub const MIN_DURATION_MINUTES: i64 = 5;
    pub const DEFAULT_URGENCY: i32 = 3;
    pub const MIN_URGENCY: i32 = 1;
    pub const MAX_URGENCY: i32 = 5;

    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.duration_minutes < Self::MIN_DURATION_MINUTES {
            return Err(SchedulingError::InvalidRequest(format!(
                "durationMinutes must be at least {}",
                Self::MIN_DURATION_MINUTES
            )));
        }

        if let Some(urgency) = self.urgency {
            if !(Self::MIN_URGENCY..=Self::MAX_URGENCY).contains(&urgency) {
                return Err(SchedulingError::InvalidRequest(format!(
                    "urgency must be between {} and {}",
                    Self::MIN_URGENCY,
                    Self::MAX_URGENCY
                )));
            }
        }

        Ok(())
    }

    pub fn urgency_or_default(&self) -> i32 {
        self.urgency.unwrap_or(Self::DEFAULT_URGENCY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSuggestion {
    pub doctor_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub priority_score: f64,
}

/// Body of `POST /appointments`: pick the best slot and hold it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    #[serde(default = "CreateAppointmentRequest::default_duration")]
    pub duration_minutes: i64,
    pub desired_start: Option<DateTime<Utc>>,
    pub urgency: Option<i32>,
    pub reason: Option<String>,
}

impl CreateAppointmentRequest {
    pub const DEFAULT_DURATION_MINUTES: i64 = 30;

    fn default_duration() -> i64 {
        Self::DEFAULT_DURATION_MINUTES
    }

    pub fn to_slot_request(&self) -> SlotRequest {
        SlotRequest {
            desired_start: self.desired_start,
            duration_minutes: self.duration_minutes,
            patient_id: self.patient_id,
            preferred_doctor_id: self.doctor_id,
            urgency: self.urgency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    pub status: String,
}

impl RebalanceOutcome {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Invalid slot request: {0}")]
    InvalidRequest(String),

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Preferred doctor {0} not found")]
    PreferredDoctorNotFound(Uuid),

    #[error("Scheduling data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Appointment slot no longer available")]
    SlotTaken,

    #[error("No slots available")]
    NoSlotsAvailable,
}
