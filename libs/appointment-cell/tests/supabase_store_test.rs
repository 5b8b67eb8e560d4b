use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::*;
use appointment_cell::services::{AppointmentWriter, SchedulingStore, SupabaseSchedulingStore};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap()
}

fn store_for(server: &MockServer) -> SupabaseSchedulingStore {
    SupabaseSchedulingStore::new(&TestConfig::with_url(&server.uri()).to_app_config())
}

fn new_appointment(doctor_id: Uuid, patient_id: Uuid) -> NewAppointment {
    NewAppointment::from_suggestion(
        &SlotSuggestion {
            doctor_id,
            start: t0(),
            end: t0() + Duration::minutes(30),
            priority_score: 2.87,
        },
        patient_id,
        Some("Chest pain".to_string()),
    )
}

#[tokio::test]
async fn conflict_query_filters_on_the_server() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("status", "neq.cancelled"))
        .and(query_param("start_time", "lt.2030-01-07T09:30:00Z"))
        .and(query_param("end_time", "gt.2030-01-07T09:00:00Z"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &doctor_id.to_string(),
                &patient_id.to_string(),
                t0() - Duration::minutes(15),
                t0() + Duration::minutes(15),
                "confirmed",
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let conflict = store_for(&server)
        .find_conflicting_booking(doctor_id, t0(), t0() + Duration::minutes(30))
        .await
        .unwrap()
        .expect("conflict");

    assert_eq!(conflict.doctor_id, doctor_id);
    assert_eq!(conflict.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn conflict_query_keeps_sub_second_precision() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let start = Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap() + Duration::milliseconds(700);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("start_time", "lt.2030-01-07T10:30:00.700Z"))
        .and(query_param("end_time", "gt.2030-01-07T10:00:00.700Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            // starts on the whole second, inside the candidate's last 700ms
            MockSupabaseResponses::appointment_response(
                &doctor_id.to_string(),
                &Uuid::new_v4().to_string(),
                Utc.with_ymd_and_hms(2030, 1, 7, 10, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2030, 1, 7, 11, 0, 0).unwrap(),
                "confirmed",
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let conflict = store_for(&server)
        .find_conflicting_booking(doctor_id, start, start + Duration::minutes(30))
        .await
        .unwrap();

    assert!(conflict.is_some());
}

#[tokio::test]
async fn insert_body_keeps_sub_second_precision() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let start = t0() + Duration::milliseconds(250);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let created = MockSupabaseResponses::appointment_response(
        &doctor_id.to_string(),
        &patient_id.to_string(),
        start,
        start + Duration::minutes(30),
        "pending",
    );

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "start_time": "2030-01-07T09:00:00.250Z",
            "end_time": "2030-01-07T09:30:00.250Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([created])))
        .expect(1)
        .mount(&server)
        .await;

    let mut appointment = new_appointment(doctor_id, patient_id);
    appointment.start_time = start;
    appointment.end_time = start + Duration::minutes(30);

    let stored = store_for(&server).insert_pending_appointment(appointment).await.unwrap();

    assert_eq!(stored.start_time, start);
}

#[tokio::test]
async fn rows_that_do_not_overlap_are_ignored() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            // ends exactly at the candidate start
            MockSupabaseResponses::appointment_response(
                &doctor_id.to_string(),
                &patient_id,
                t0() - Duration::minutes(30),
                t0(),
                "confirmed",
            ),
            MockSupabaseResponses::appointment_response(
                &doctor_id.to_string(),
                &patient_id,
                t0(),
                t0() + Duration::minutes(30),
                "cancelled",
            ),
        ])))
        .mount(&server)
        .await;

    let conflict = store_for(&server)
        .find_conflicting_booking(doctor_id, t0(), t0() + Duration::minutes(30))
        .await
        .unwrap();

    assert!(conflict.is_none());
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("boom", "XX000"),
        ))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .find_conflicting_booking(Uuid::new_v4(), t0(), t0() + Duration::minutes(30))
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::DataSourceUnavailable(_));
}

#[tokio::test]
async fn looks_up_patients_and_doctors() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&patient_id.to_string(), Some("Sligo"))
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id.to_string(), None)
        ])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let patient = store.find_patient_by_id(patient_id).await.unwrap().expect("patient");
    let doctor = store.find_doctor_by_id(doctor_id).await.unwrap().expect("doctor");

    assert!(patient.has_location());
    assert!(!doctor.has_location());
}

#[tokio::test]
async fn insert_posts_pending_optimizer_row() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut created = MockSupabaseResponses::appointment_response(
        &doctor_id.to_string(),
        &patient_id.to_string(),
        t0(),
        t0() + Duration::minutes(30),
        "pending",
    );
    created["source"] = json!("optimizer");
    created["priority_score"] = json!(2.87);

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "start_time": "2030-01-07T09:00:00Z",
            "end_time": "2030-01-07T09:30:00Z",
            "status": "pending",
            "source": "optimizer",
            "reason": "Chest pain"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([created])))
        .expect(1)
        .mount(&server)
        .await;

    let appointment = store_for(&server)
        .insert_pending_appointment(new_appointment(doctor_id, patient_id))
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.source.as_deref(), Some("optimizer"));
    assert_eq!(appointment.start_time, t0());
}

#[tokio::test]
async fn insert_refuses_when_precheck_finds_a_booking() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &doctor_id.to_string(),
                &Uuid::new_v4().to_string(),
                t0(),
                t0() + Duration::minutes(30),
                "pending",
            )
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = store_for(&server)
        .insert_pending_appointment(new_appointment(doctor_id, patient_id))
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::SlotTaken);
}

#[tokio::test]
async fn insert_conflict_status_means_slot_taken() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("conflicting key value violates exclusion constraint", "23P01"),
        ))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .insert_pending_appointment(new_appointment(Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::SlotTaken);
}

#[tokio::test]
async fn insert_server_error_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .insert_pending_appointment(new_appointment(Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::DataSourceUnavailable(_));
}
