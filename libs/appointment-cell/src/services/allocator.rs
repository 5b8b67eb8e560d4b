// libs/appointment-cell/src/services/allocator.rs
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{debug, info, instrument, warn};

use doctor_cell::models::Doctor;
use patient_cell::models::Patient;
use shared_config::{AppConfig, SchedulerSettings, UnknownDoctorPolicy};

use crate::models::{SchedulingError, SlotRequest, SlotSuggestion};
use crate::services::scoring::ScoreFactors;
use crate::services::store::SchedulingStore;
use crate::services::supabase_store::SupabaseSchedulingStore;

/// Anything that can turn a slot request into ranked suggestions. The
/// rule-based allocator is the only implementation; a model-driven one can be
/// dropped in behind this trait without touching the booking flow.
#[async_trait]
pub trait SlotSuggester: Send + Sync {
    async fn suggest_slots(&self, request: &SlotRequest) -> Result<Vec<SlotSuggestion>, SchedulingError>;
}

/// Rule-based slot search over a forward horizon.
///
/// Holds no mutable state: concurrent calls share nothing but the store.
pub struct SlotAllocatorService<S> {
    store: Arc<S>,
    settings: SchedulerSettings,
}

impl SlotAllocatorService<SupabaseSchedulingStore> {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(SupabaseSchedulingStore::new(config)), config.scheduler.clone())
    }
}

impl<S: SchedulingStore> SlotAllocatorService<S> {
    pub fn with_store(store: Arc<S>, settings: SchedulerSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Search every applicable doctor for conflict-free slots and rank them.
    ///
    /// An empty result means the horizon had no room; it is not an error.
    #[instrument(
        skip(self, request),
        fields(
            patient_id = %request.patient_id,
            preferred_doctor = ?request.preferred_doctor_id,
            duration = request.duration_minutes
        )
    )]
    pub async fn find_slots(&self, request: &SlotRequest) -> Result<Vec<SlotSuggestion>, SchedulingError> {
        request.validate()?;

        let patient = self
            .guarded(self.store.find_patient_by_id(request.patient_id))
            .await?
            .ok_or(SchedulingError::PatientNotFound)?;

        let doctors = self.resolve_doctors(request).await?;

        let duration = Duration::try_minutes(request.duration_minutes)
            .ok_or_else(|| SchedulingError::InvalidRequest("durationMinutes is too large".to_string()))?;
        let step = Duration::try_minutes(self.settings.step_minutes)
            .filter(|s| *s > Duration::zero())
            .ok_or_else(|| SchedulingError::InvalidRequest("scheduler step must be positive".to_string()))?;
        let horizon = Duration::try_days(self.settings.horizon_days)
            .ok_or_else(|| SchedulingError::InvalidRequest("scheduler horizon is too large".to_string()))?;

        // Microseconds are the finest precision the data source stores.
        let window_start = request.desired_start.unwrap_or_else(Utc::now).trunc_subsecs(6);
        let window_end = window_start
            .checked_add_signed(horizon)
            .ok_or_else(|| SchedulingError::InvalidRequest("desiredStart is out of range".to_string()))?;

        let urgency = request.urgency_or_default();
        let cap = self.settings.max_suggestions;
        let mut suggestions: Vec<SlotSuggestion> =
            Vec::with_capacity(cap.min(SchedulerSettings::DEFAULT_MAX_SUGGESTIONS));

        for doctor in &doctors {
            if suggestions.len() >= cap {
                break;
            }

            let factors = ScoreFactors::for_candidate(
                urgency,
                request.preferred_doctor_id == Some(doctor.id),
                both_located(&patient, doctor),
            );

            self.walk_doctor(
                doctor,
                factors.score(),
                window_start,
                window_end,
                duration,
                step,
                &mut suggestions,
            )
            .await?;
        }

        rank_suggestions(&mut suggestions);

        info!(
            "Found {} slot suggestions across {} doctors for patient {}",
            suggestions.len(),
            doctors.len(),
            patient.id
        );

        Ok(suggestions)
    }

    /// Step through one doctor's horizon, pushing every free candidate until
    /// the horizon ends, the step ceiling is hit, or the global cap fills.
    #[allow(clippy::too_many_arguments)]
    async fn walk_doctor(
        &self,
        doctor: &Doctor,
        priority_score: f64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        duration: Duration,
        step: Duration,
        suggestions: &mut Vec<SlotSuggestion>,
    ) -> Result<(), SchedulingError> {
        let cap = self.settings.max_suggestions;
        let max_steps = self.settings.max_steps_per_doctor;

        let mut cursor = window_start;
        let mut steps = 0usize;
        let mut rejected = 0usize;

        while cursor < window_end && steps < max_steps && suggestions.len() < cap {
            let Some(end) = cursor.checked_add_signed(duration) else {
                break;
            };

            let conflict = self
                .guarded(self.store.find_conflicting_booking(doctor.id, cursor, end))
                .await?;

            match conflict {
                None => suggestions.push(SlotSuggestion {
                    doctor_id: doctor.id,
                    start: cursor,
                    end,
                    priority_score,
                }),
                Some(_) => rejected += 1,
            }

            steps += 1;
            let Some(next) = cursor.checked_add_signed(step) else {
                break;
            };
            cursor = next;
        }

        if steps >= max_steps && cursor < window_end && suggestions.len() < cap {
            warn!(
                "Step ceiling of {} reached for doctor {} before the horizon ended",
                max_steps, doctor.id
            );
        }

        debug!(
            "Doctor {} ({}): examined {} candidates, {} busy",
            doctor.full_name(), doctor.id, steps, rejected
        );

        Ok(())
    }

    async fn resolve_doctors(&self, request: &SlotRequest) -> Result<Vec<Doctor>, SchedulingError> {
        let Some(preferred_id) = request.preferred_doctor_id else {
            return self.guarded(self.store.list_all_doctors()).await;
        };

        if let Some(doctor) = self.guarded(self.store.find_doctor_by_id(preferred_id)).await? {
            return Ok(vec![doctor]);
        }

        match self.settings.unknown_doctor_policy {
            UnknownDoctorPolicy::Reject => Err(SchedulingError::PreferredDoctorNotFound(preferred_id)),
            UnknownDoctorPolicy::Broaden => {
                warn!(
                    "Preferred doctor {} not found, searching the full roster",
                    preferred_id
                );
                self.guarded(self.store.list_all_doctors()).await
            }
        }
    }

    /// Bound a single store call by the configured lookup timeout.
    async fn guarded<T, F>(&self, lookup: F) -> Result<T, SchedulingError>
    where
        F: Future<Output = Result<T, SchedulingError>>,
    {
        match tokio::time::timeout(self.settings.lookup_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(SchedulingError::DataSourceUnavailable(format!(
                "lookup timed out after {}ms",
                self.settings.lookup_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl<S: SchedulingStore> SlotSuggester for SlotAllocatorService<S> {
    async fn suggest_slots(&self, request: &SlotRequest) -> Result<Vec<SlotSuggestion>, SchedulingError> {
        self.find_slots(request).await
    }
}

/// Highest score first, earliest start among equal scores. The sort is stable
/// so identical inputs always come out in the same order.
pub fn rank_suggestions(suggestions: &mut [SlotSuggestion]) {
    suggestions.sort_by(|a, b| {
        b.priority_score
            .total_cmp(&a.priority_score)
            .then_with(|| a.start.cmp(&b.start))
    });
}

/// Whether `patient` and `doctor` both carry a usable location.
pub fn both_located(patient: &Patient, doctor: &Doctor) -> bool {
    patient.has_location() && doctor.has_location()
}
