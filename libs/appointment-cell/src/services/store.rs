// libs/appointment-cell/src/services/store.rs
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use patient_cell::models::Patient;

use crate::models::{Appointment, NewAppointment, SchedulingError};

/// Read side of the scheduling data the allocator consumes.
///
/// Implementations must return the roster in a stable order (the allocator
/// walks doctors in that order and stops at its result cap) and must apply
/// the half-open overlap rule `existing.start < end && existing.end > start`
/// in `find_conflicting_booking`, ignoring cancelled bookings.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn find_patient_by_id(&self, patient_id: Uuid) -> Result<Option<Patient>, SchedulingError>;

    async fn find_doctor_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, SchedulingError>;

    async fn list_all_doctors(&self) -> Result<Vec<Doctor>, SchedulingError>;

    async fn find_conflicting_booking(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Appointment>, SchedulingError>;
}

/// Write side used by the booking flow. Must refuse to commit an appointment
/// that overlaps a blocking booking of the same doctor.
#[async_trait]
pub trait AppointmentWriter: Send + Sync {
    async fn insert_pending_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, SchedulingError>;
}

#[derive(Default)]
struct InMemoryData {
    patients: HashMap<Uuid, Patient>,
    doctors: BTreeMap<Uuid, Doctor>,
    appointments: Vec<Appointment>,
}

/// Process-local store. The roster is ordered by doctor id and inserts check
/// for overlaps under the write lock, so concurrent commits cannot both land.
#[derive(Default)]
pub struct InMemorySchedulingStore {
    data: RwLock<InMemoryData>,
}

impl InMemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient(mut self, patient: Patient) -> Self {
        self.data.get_mut().patients.insert(patient.id, patient);
        self
    }

    pub fn with_doctor(mut self, doctor: Doctor) -> Self {
        self.data.get_mut().doctors.insert(doctor.id, doctor);
        self
    }

    pub fn with_appointment(mut self, appointment: Appointment) -> Self {
        self.data.get_mut().appointments.push(appointment);
        self
    }

    pub fn with_appointments(mut self, appointments: impl IntoIterator<Item = Appointment>) -> Self {
        self.data.get_mut().appointments.extend(appointments);
        self
    }

    pub async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Vec<Appointment> {
        let data = self.data.read().await;
        data.appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SchedulingStore for InMemorySchedulingStore {
    async fn find_patient_by_id(&self, patient_id: Uuid) -> Result<Option<Patient>, SchedulingError> {
        Ok(self.data.read().await.patients.get(&patient_id).cloned())
    }

    async fn find_doctor_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, SchedulingError> {
        Ok(self.data.read().await.doctors.get(&doctor_id).cloned())
    }

    async fn list_all_doctors(&self) -> Result<Vec<Doctor>, SchedulingError> {
        Ok(self.data.read().await.doctors.values().cloned().collect())
    }

    async fn find_conflicting_booking(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let data = self.data.read().await;
        Ok(data
            .appointments
            .iter()
            .find(|a| a.conflicts_with(doctor_id, start, end))
            .cloned())
    }
}

#[async_trait]
impl AppointmentWriter for InMemorySchedulingStore {
    async fn insert_pending_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, SchedulingError> {
        let mut data = self.data.write().await;

        if let Some(existing) = data.appointments.iter().find(|a| {
            a.conflicts_with(appointment.doctor_id, appointment.start_time, appointment.end_time)
        }) {
            warn!(
                "Rejecting commit for doctor {} at {}: overlaps appointment {}",
                appointment.doctor_id, appointment.start_time, existing.id
            );
            return Err(SchedulingError::SlotTaken);
        }

        let created = Appointment {
            id: Uuid::new_v4(),
            patient_id: Some(appointment.patient_id),
            doctor_id: appointment.doctor_id,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            status: appointment.status,
            reason: appointment.reason,
            priority_score: Some(appointment.priority_score),
            source: Some(appointment.source),
            created_at: Some(Utc::now()),
        };

        debug!("Stored appointment {} for doctor {}", created.id, created.doctor_id);
        data.appointments.push(created.clone());
        Ok(created)
    }
}
