//! Command surface against a real SQLite file and mocked platforms.

mod support;

use chrono::Utc;
use fieldbridge_domain::{
    AvailabilityRequest, FieldBridgeError, SyncErrorKind, SyncOutcome, SyncState,
    TeamCalendarMapping,
};
use fieldbridge_lib::{
    check_availability, first_available_team, get_integration_config, handle_crm_appointment_webhook,
    list_sync_records, list_team_mappings, save_integration_config, set_team_mapping_enabled,
    sync_all, sync_quote, upsert_team_mapping,
};
use serde_json::json;
use support::{at, enabled_config, TestContext, LOCATION};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn map_team(test: &TestContext, team: &str, calendar: &str) {
    upsert_team_mapping(&test.ctx, &TeamCalendarMapping::new(LOCATION, team, calendar, Utc::now()))
        .await
        .unwrap();
}

async fn mount_team_listing(test: &TestContext, team: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/teams/{team}/appointments")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&test.fss)
        .await;
}

// ============================================================================
// Configuration and mappings
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn integration_config_round_trips_through_the_store() {
    let test = TestContext::new().await;
    assert!(get_integration_config(&test.ctx, LOCATION).await.unwrap().is_none());

    let mut config = enabled_config();
    config.quote_tags = vec!["fss-quote".into()];
    save_integration_config(&test.ctx, config).await.unwrap();

    let stored = get_integration_config(&test.ctx, LOCATION).await.unwrap().unwrap();
    assert!(stored.wants_appointment_sync());
    assert_eq!(stored.quote_tags, vec!["fss-quote".to_string()]);

    let err = save_integration_config(&test.ctx, fieldbridge_domain::IntegrationConfig::new(" ", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, FieldBridgeError::InvalidInput(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn mapping_commands_upsert_toggle_and_list() {
    let test = TestContext::new().await;
    map_team(&test, "T1", "C1").await;
    map_team(&test, "T2", "C2").await;

    set_team_mapping_enabled(&test.ctx, LOCATION, "T2", false).await.unwrap();

    let mappings = list_team_mappings(&test.ctx, LOCATION).await.unwrap();
    assert_eq!(mappings.len(), 2);
    assert!(mappings.iter().any(|m| m.fss_team_id == "T2" && !m.enabled));

    let err = set_team_mapping_enabled(&test.ctx, LOCATION, "T404", true).await.unwrap_err();
    assert!(matches!(err, FieldBridgeError::NotFound(_)));
}

// ============================================================================
// Availability
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn availability_reads_live_fss_schedules() {
    let test = TestContext::new().await;
    map_team(&test, "T1", "C1").await;
    map_team(&test, "T2", "C2").await;

    mount_team_listing(
        &test,
        "T1",
        json!({"data": [{
            "id": "job-1",
            "start_time": "2024-06-03T10:00:00Z",
            "end_time": "2024-06-03T11:00:00Z",
            "status": "scheduled",
            "updated_at": "2024-06-02T08:00:00Z"
        }]}),
    )
    .await;
    mount_team_listing(&test, "T2", json!({"data": []})).await;

    let request = AvailabilityRequest::new(LOCATION, at(10, 30), at(11, 30));
    let result = check_availability(&test.ctx, &request).await.unwrap();

    assert!(result.available);
    assert!(!result.is_team_available("T1"));
    assert!(result.is_team_available("T2"));
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].competing_appointment.as_ref().unwrap().id, "job-1");

    let first = first_available_team(&test.ctx, &request).await.unwrap().unwrap();
    assert_eq!(first.team_id, "T2");
}

#[tokio::test(flavor = "multi_thread")]
async fn inverted_availability_window_is_rejected() {
    let test = TestContext::new().await;
    let err = check_availability(&test.ctx, &AvailabilityRequest::new(LOCATION, at(12, 0), at(11, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, FieldBridgeError::InvalidTimeRange { .. }));
}

// ============================================================================
// Appointment sync
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn sync_all_requires_integration_config() {
    let test = TestContext::new().await;
    let err = sync_all(&test.ctx, LOCATION).await.unwrap_err();
    assert!(matches!(err, FieldBridgeError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn crm_webhook_creates_fss_job_and_records_both_ids() {
    let test = TestContext::new().await;
    save_integration_config(&test.ctx, enabled_config()).await.unwrap();
    map_team(&test, "T1", "C1").await;
    mount_team_listing(&test, "T1", json!({"data": []})).await;

    Mock::given(method("POST"))
        .and(path("/teams/T1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "job-77", "updated_at": "2024-06-02T10:00:05Z"}
        })))
        .expect(1)
        .mount(&test.fss)
        .await;

    let payload = json!({
        "type": "AppointmentCreate",
        "locationId": LOCATION,
        "appointment": {
            "id": "evt-1",
            "calendarId": "C1",
            "title": "Estimate",
            "startTime": "2024-06-03T13:00:00Z",
            "endTime": "2024-06-03T14:00:00Z",
            "appointmentStatus": "confirmed",
            "dateUpdated": "2024-06-02T10:00:00Z"
        }
    });

    let result = handle_crm_appointment_webhook(&test.ctx, &payload, None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.outcome, SyncOutcome::Created);
    assert_eq!(result.counterpart_id.as_deref(), Some("job-77"));

    let records = list_sync_records(&test.ctx, LOCATION).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fss_appointment_id.as_deref(), Some("job-77"));
    assert_eq!(records[0].crm_appointment_id.as_deref(), Some("evt-1"));
    assert_eq!(records[0].state, SyncState::Synced);

    // redelivery of the same event is gated on lastModified
    let again = handle_crm_appointment_webhook(&test.ctx, &payload, None).await.unwrap();
    assert_eq!(again.outcome, SyncOutcome::Unchanged);
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_without_location_is_rejected() {
    let test = TestContext::new().await;
    let payload = json!({
        "id": "evt-1",
        "calendarId": "C1",
        "startTime": "2024-06-03T13:00:00Z",
        "endTime": "2024-06-03T14:00:00Z",
        "dateUpdated": "2024-06-02T10:00:00Z"
    });

    let err = handle_crm_appointment_webhook(&test.ctx, &payload, None).await.unwrap_err();
    assert!(matches!(err, FieldBridgeError::InvalidInput(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn unmapped_calendar_reports_missing_mapping() {
    let test = TestContext::new().await;
    save_integration_config(&test.ctx, enabled_config()).await.unwrap();
    let payload = json!({
        "id": "evt-2",
        "calendarId": "C-unknown",
        "startTime": "2024-06-03T13:00:00Z",
        "endTime": "2024-06-03T14:00:00Z",
        "dateUpdated": "2024-06-02T10:00:00Z"
    });

    let result = handle_crm_appointment_webhook(&test.ctx, &payload, Some(LOCATION)).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(SyncErrorKind::TeamMappingMissing));
}

// ============================================================================
// Quotes
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn sync_quote_needs_a_location_config() {
    let test = TestContext::new().await;
    let err = sync_quote(&test.ctx, LOCATION, "101").await.unwrap_err();
    assert!(matches!(err, FieldBridgeError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_quote_upserts_crm_contact() {
    let test = TestContext::new().await;
    save_integration_config(&test.ctx, enabled_config()).await.unwrap();

    Mock::given(method("GET"))
        .and(path(format!("/locations/{LOCATION}/quotes/101")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": "101",
                "quote_number": "Q-101",
                "total": 480.0,
                "customer": {"first_name": "Grace", "last_name": "Hopper", "email": "grace@example.com"},
                "updated_at": "2024-06-02T09:00:00Z"
            }
        })))
        .mount(&test.fss)
        .await;
    Mock::given(method("POST"))
        .and(path("/contacts/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contact": {"id": "ct-9"}})))
        .expect(1)
        .mount(&test.crm)
        .await;

    let result = sync_quote(&test.ctx, LOCATION, "101").await.unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.contact_id.as_deref(), Some("ct-9"));

    // unchanged content is not written twice
    let again = sync_quote(&test.ctx, LOCATION, "101").await.unwrap();
    assert!(again.skipped);
}
