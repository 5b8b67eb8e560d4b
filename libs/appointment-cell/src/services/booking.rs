// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{info, instrument, warn};

use shared_config::AppConfig;

use crate::models::{Appointment, CreateAppointmentRequest, NewAppointment, SchedulingError};
use crate::services::allocator::{SlotAllocatorService, SlotSuggester};
use crate::services::store::AppointmentWriter;
use crate::services::supabase_store::SupabaseSchedulingStore;

/// Turns the best suggestion into a `pending` appointment.
///
/// The allocator only sees bookings as of suggestion time, so the writer may
/// still refuse a slot another request committed in between. In that case
/// the next suggestion in rank order is tried.
pub struct AppointmentBookingService {
    suggester: Arc<dyn SlotSuggester>,
    writer: Arc<dyn AppointmentWriter>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(SupabaseSchedulingStore::new(config));
        let allocator = SlotAllocatorService::with_store(Arc::clone(&store), config.scheduler.clone());

        Self::with_parts(Arc::new(allocator), store)
    }

    pub fn with_parts(suggester: Arc<dyn SlotSuggester>, writer: Arc<dyn AppointmentWriter>) -> Self {
        Self { suggester, writer }
    }

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id))]
    pub async fn book_best_slot(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let slot_request = request.to_slot_request();
        slot_request.validate()?;

        let suggestions = self.suggester.suggest_slots(&slot_request).await?;
        if suggestions.is_empty() {
            warn!("No slots available for patient {}", request.patient_id);
            return Err(SchedulingError::NoSlotsAvailable);
        }

        for suggestion in &suggestions {
            let new_appointment = NewAppointment::from_suggestion(
                suggestion,
                request.patient_id,
                request.reason.clone(),
            );

            match self.writer.insert_pending_appointment(new_appointment).await {
                Ok(appointment) => {
                    info!(
                        "Booked appointment {} with doctor {} at {}",
                        appointment.id, appointment.doctor_id, appointment.start_time
                    );
                    return Ok(appointment);
                }
                Err(SchedulingError::SlotTaken) => {
                    warn!(
                        "Slot {} with doctor {} was taken before commit, trying next suggestion",
                        suggestion.start, suggestion.doctor_id
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(SchedulingError::SlotTaken)
    }
}
