mod common;

use axum::http::StatusCode;
use common::{harness, monday};
use serde_json::json;

#[tokio::test]
async fn health_reports_components() {
    let h = harness().await;
    let (status, body) = h.get_json("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["nlu_backend"], "rules");
    assert_eq!(body["data"]["session_store"], "memory");
}

#[tokio::test]
async fn hospitals_and_doctors_are_listed() {
    let h = harness().await;

    let (status, body) = h.get_json("/api/hospitals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["metadata"]["total_count"], 1);

    let path = format!("/api/doctors?hospital_id={}&specialty=cardiology", h.tenant.hospital.id);
    let (status, body) = h.get_json(&path).await;
    assert_eq!(status, StatusCode::OK);
    let doctors = body["data"].as_array().unwrap();
    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0]["name"], "Dr. Priya Patel");

    let (status, body) = h.get_json("/api/doctors?specialty=astrology").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
}

#[tokio::test]
async fn unknown_ids_are_404() {
    let h = harness().await;
    let missing = uuid::Uuid::new_v4();
    for path in [
        format!("/api/hospitals/{missing}"),
        format!("/api/doctors/{missing}"),
        format!("/api/appointments/{missing}"),
        format!("/api/patients/{missing}"),
        "/api/conversations/CA-nope".to_string(),
    ] {
        let (status, body) = h.get_json(&path).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(body["error_type"], "not_found");
    }
}

#[tokio::test]
async fn doctor_slots_explain_days_off() {
    let h = harness().await;
    let priya = h.tenant.doctor_named("Priya").unwrap().id;

    let (status, body) = h
        .get_json(&format!("/api/doctors/{priya}/slots?date={}", monday()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["availability"]["kind"], "open");
    assert_eq!(body["data"]["availability"]["slots"][0], "10:00:00");

    // Tuesday
    let (_, body) = h
        .get_json(&format!("/api/doctors/{priya}/slots?date=2026-02-10"))
        .await;
    assert_eq!(body["data"]["availability"]["kind"], "not_available_that_day");
}

#[tokio::test]
async fn front_desk_booking_goes_through_the_same_engine() {
    let h = harness().await;
    let priya = h.tenant.doctor_named("Priya").unwrap().id;
    let request = json!({
        "hospital_id": h.tenant.hospital.id,
        "doctor_id": priya,
        "patient_phone": "98100 12345",
        "patient_name": "Sunita Devi",
        "date": monday(),
        "time": "10:30",
    });

    let (status, body) = h
        .json_request("POST", "/api/appointments", Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["appointment"]["channel"], "manual");
    let id = body["data"]["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = h
        .json_request("POST", "/api/appointments", Some(request))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(!body["details"]["alternatives"].as_array().unwrap().is_empty());

    let (status, body) = h
        .json_request(
            "PUT",
            &format!("/api/appointments/{id}/status"),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let (status, body) = h
        .json_request("PUT", &format!("/api/appointments/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    // Cancelled appointments cannot come back
    let (status, _) = h
        .json_request(
            "PUT",
            &format!("/api/appointments/{id}/status"),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = h.get_json("/api/patients?search=Sunita").await;
    let patient_id = body["data"][0]["id"].as_str().unwrap().to_string();
    let (status, body) = h
        .get_json(&format!("/api/patients/{patient_id}/appointments"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_booking_payload_is_rejected() {
    let h = harness().await;
    let request = json!({
        "hospital_id": h.tenant.hospital.id,
        "doctor_id": h.tenant.doctors[0].id,
        "patient_phone": "123",
        "date": monday(),
        "time": "10:00",
    });
    let (status, body) = h
        .json_request("POST", "/api/appointments", Some(request))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
}

#[tokio::test]
async fn reminders_need_outbound_credentials() {
    let h = harness().await;
    let priya = h.tenant.doctor_named("Priya").unwrap().id;
    let (_, body) = h
        .json_request(
            "POST",
            "/api/appointments",
            Some(json!({
                "hospital_id": h.tenant.hospital.id,
                "doctor_id": priya,
                "patient_phone": "9810012345",
                "date": monday(),
                "time": "11:00",
            })),
        )
        .await;
    let id = body["data"]["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = h
        .json_request("POST", &format!("/api/appointments/{id}/reminder"), None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "service_unavailable");

    // The markup the provider would fetch still renders
    let (status, xml) = h
        .webhook(&format!("/api/voice/reminder?appointmentId={id}"), &[])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("Dr. Priya Patel"), "{xml}");
    assert!(xml.contains("<Hangup/>"));
}

#[tokio::test]
async fn dashboard_counts_calls_and_bookings() {
    let h = harness().await;
    let call = "CA-dash";
    h.answer(call, "9876500000", "2").await;
    h.webhook(
        "/api/voice/status-callback",
        &[("CallSid", call), ("Status", "completed"), ("Duration", "40")],
    )
    .await;

    let (status, body) = h
        .get_json(&format!("/api/analytics/dashboard?hospital_id={}", h.tenant.hospital.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["calls"]["total_calls"], 1);
    assert_eq!(data["booking_success_rate"], 0.0);
    let recent = data["recent_calls"].as_array().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["call_id"], call);
    assert!(!recent[0]["caller"].as_str().unwrap().contains("98765"));

    let (status, body) = h.get_json("/api/conversations?status=completed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let h = harness().await;
    let (status, body) = h.get_json("/api/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/voice/incoming"].is_object());
}
