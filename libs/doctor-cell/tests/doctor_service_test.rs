use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use doctor_cell::services::DoctorService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

#[tokio::test]
async fn test_get_doctor_found() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id.to_string(), Some("Cork"))
        ])))
        .mount(&mock_server)
        .await;

    let service = DoctorService::new(&TestConfig::with_url(&mock_server.uri()).to_app_config());
    let doctor = service.get_doctor(doctor_id).await.unwrap().expect("doctor");

    assert_eq!(doctor.id, doctor_id);
    assert_eq!(doctor.location.as_deref(), Some("Cork"));
    assert_eq!(doctor.availability.len(), 1);
}

#[tokio::test]
async fn test_get_doctor_missing_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = DoctorService::new(&TestConfig::with_url(&mock_server.uri()).to_app_config());
    assert!(service.get_doctor(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_doctors_requests_id_order() {
    let mock_server = MockServer::start().await;
    let first = Uuid::from_u128(1);
    let second = Uuid::from_u128(2);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("order", "id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&first.to_string(), None),
            MockSupabaseResponses::doctor_response(&second.to_string(), Some("Galway")),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = DoctorService::new(&TestConfig::with_url(&mock_server.uri()).to_app_config());
    let doctors = service.list_doctors().await.unwrap();

    assert_eq!(doctors.iter().map(|d| d.id).collect::<Vec<_>>(), vec![first, second]);
}

#[tokio::test]
async fn test_list_doctors_propagates_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("boom", "XX000"),
        ))
        .mount(&mock_server)
        .await;

    let service = DoctorService::new(&TestConfig::with_url(&mock_server.uri()).to_app_config());
    assert!(service.list_doctors().await.is_err());
}
