// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateAppointmentRequest, SchedulingError, SlotRequest};
use crate::services::allocator::SlotAllocatorService;
use crate::services::booking::AppointmentBookingService;
use crate::services::rebalance::RebalanceService;

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::InvalidRequest(msg) => AppError::ValidationError(msg),
            SchedulingError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
            SchedulingError::PreferredDoctorNotFound(id) => {
                AppError::NotFound(format!("Preferred doctor {} not found", id))
            }
            SchedulingError::DataSourceUnavailable(msg) => AppError::ServiceUnavailable(msg),
            SchedulingError::SlotTaken => {
                AppError::Conflict("Appointment slot no longer available".to_string())
            }
            SchedulingError::NoSlotsAvailable => AppError::Conflict("No slots available".to_string()),
        }
    }
}

fn ensure_database_ready(config: &AppConfig) -> Result<(), AppError> {
    if !config.is_configured() {
        return Err(AppError::ServiceUnavailable("Database not connected".to_string()));
    }
    Ok(())
}

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}

// ==============================================================================
// OPTIMIZER HANDLERS
// ==============================================================================

/// Ranked slot suggestions for a request. An empty array means no room.
#[axum::debug_handler]
pub async fn suggest_slots(
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<SlotRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    ensure_database_ready(&config)?;
    let request = read_body(payload)?;
    request.validate()?;

    let allocator = SlotAllocatorService::new(&config);
    let suggestions = allocator.find_slots(&request).await?;

    debug!("Returning {} suggestions", suggestions.len());
    Ok(Json(json!(suggestions)))
}

#[axum::debug_handler]
pub async fn rebalance(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    ensure_database_ready(&config)?;

    let outcome = RebalanceService::new().rebalance().await?;
    Ok(Json(json!(outcome)))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

/// Book the top-ranked slot as a pending appointment.
#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    ensure_database_ready(&config)?;
    let request = read_body(payload)?;

    let booking_service = AppointmentBookingService::new(&config);
    let appointment = booking_service.book_best_slot(request).await?;

    Ok(Json(json!(appointment)))
}
