use dpod_audit_tools::audit::export::{ExportState, PollSettings};
use dpod_audit_tools::audit::pipeline::{
    AuditLogPipeline, LogsRequest, LogsResponse, PipelineSettings,
};
use dpod_audit_tools::console_api::ConsoleClient;
use dpod_audit_tools::error::ErrorKind;
use dpod_audit_tools::utils::progress::{RecordingProgress, SilentProgress};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JOB_ID: &str = "3f0e2a4c-7b1d-4c8e-9a5f-1d2e3c4b5a69";
const CDSP_ID: &str = "0c9a8b7d-6e5f-4a3b-9c2d-1e0f9a8b7c6d";

fn fixture_export() -> String {
    let mut lines = Vec::new();
    for i in 0..10 {
        lines.push(
            json!({
                "time": format!("2025-04-{:02}T08:00:00Z", i + 1),
                "action": "Create Key",
                "status": "success",
                "source": "cdsp",
                "username": "alice",
                "details": {"keyName": format!("key-{}", i)}
            })
            .to_string(),
        );
    }
    for i in 0..2 {
        lines.push(
            json!({
                "time": format!("2025-04-2{}T17:30:00Z", i),
                "action": "Delete User",
                "status": "failure",
                "source": "cdsp"
            })
            .to_string(),
        );
    }
    lines.join("\n") + "\n"
}

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn settings(temp: &TempDir) -> PipelineSettings {
    PipelineSettings {
        poll: PollSettings {
            interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(5),
        },
        temp_dir: Some(temp.path().to_path_buf()),
    }
}

fn april_cdsp() -> LogsRequest {
    LogsRequest {
        start_date: Some("2025-04-01T00:00:00Z".into()),
        end_date: Some("2025-04-30T23:59:59Z".into()),
        source_filter: Some("cdsp".into()),
        ..Default::default()
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

/// Mount a catch-all submit, a succeeded poll and the artifact download.
///
/// Body-specific submit mocks must be mounted first to take precedence.
async fn mount_export(server: &MockServer, artifact: Vec<u8>) {
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/audit-log-exports/{}", JOB_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobId": JOB_ID,
            "state": "SUCCEEDED",
            "location": format!("{}/downloads/export", server.uri()),
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/downloads/export"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(artifact))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_gzip_export() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .and(body_partial_json(json!({
            "from": "2025-04-01T00:00:00Z",
            "to": "2025-04-30T23:59:59Z",
            "source": "cdsp"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_export(&server, gzip(&fixture_export())).await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let progress = RecordingProgress::new();

    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&april_cdsp(), &progress, &CancellationToken::new())
        .await
        .unwrap();

    let LogsResponse::Success(success) = response else {
        panic!("expected success, got {:?}", response);
    };
    let analysis = &success.analysis;
    assert_eq!(analysis.total_logs, 12);
    assert_eq!(analysis.skipped_lines, 0);
    assert_eq!(analysis.action_count("Create Key"), 10);
    assert_eq!(analysis.status_summary.count("failure"), 2);
    assert_eq!(
        analysis.time_range.earliest.as_deref(),
        Some("2025-04-01T08:00:00Z")
    );
    assert_eq!(analysis.recent_activity.len(), 10);
    assert_eq!(analysis.recent_activity[0].extra["username"], "alice");
    assert!(success.formatted_summary.contains("Create Key"));
    assert_eq!(success.export_job.state, ExportState::Succeeded);

    let events = progress.events();
    assert_eq!(events.first().map(|e| e.0), Some(10));
    assert_eq!(events.last().map(|e| e.0), Some(100));
    assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));

    assert!(is_empty_dir(temp.path()));
}

#[tokio::test]
async fn test_plain_export_with_malformed_line() {
    let server = MockServer::start().await;
    let mut body = fixture_export();
    body.push_str("{\"time\": \"2025-04-30T23:\n");
    mount_export(&server, body.into_bytes()).await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&april_cdsp(), &SilentProgress, &CancellationToken::new())
        .await
        .unwrap();

    let LogsResponse::Success(success) = response else {
        panic!("expected success");
    };
    assert_eq!(success.analysis.total_logs, 12);
    assert_eq!(success.analysis.skipped_lines, 1);
    assert!(is_empty_dir(temp.path()));
}

#[tokio::test]
async fn test_empty_export_is_success() {
    let server = MockServer::start().await;
    mount_export(&server, Vec::new()).await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&april_cdsp(), &SilentProgress, &CancellationToken::new())
        .await
        .unwrap();

    let LogsResponse::Success(success) = response else {
        panic!("expected success");
    };
    assert_eq!(success.analysis.total_logs, 0);
    assert_eq!(
        success.formatted_summary,
        "No audit logs found in the specified time range"
    );
}

#[tokio::test]
async fn test_named_service_is_resolved_before_submit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/service_instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"service_id": CDSP_ID, "name": "Data Platform", "serviceType": "ctaas"}],
            "totalPages": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/service_instances/{}", CDSP_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "service_id": CDSP_ID, "name": "Data Platform", "serviceType": "ctaas"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .and(body_partial_json(json!({"source": "cdsp", "actorId": "alice"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_export(&server, fixture_export().into_bytes()).await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let request = LogsRequest {
        service_name: Some("data platform".into()),
        actor_id: Some("alice".into()),
        source_filter: None,
        ..april_cdsp()
    };

    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&request, &SilentProgress, &CancellationToken::new())
        .await
        .unwrap();

    let LogsResponse::Success(success) = response else {
        panic!("expected success");
    };
    assert_eq!(success.warnings.len(), 1);
    assert!(success.warnings[0].contains("alice"));
}

#[tokio::test]
async fn test_unknown_service_fails_without_submitting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/service_instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"service_id": CDSP_ID, "name": "Data Platform", "serviceType": "ctaas"}],
            "totalPages": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let request = LogsRequest {
        source_filter: Some("billing-hsm".into()),
        ..april_cdsp()
    };

    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&request, &SilentProgress, &CancellationToken::new())
        .await
        .unwrap();

    let LogsResponse::Failure(failure) = response else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, ErrorKind::Resolution);
    assert!(failure.error.contains("Data Platform"));
    assert!(failure.export_job.is_none());
}

#[tokio::test]
async fn test_remote_failure_is_reported_with_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/audit-log-exports/{}", JOB_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobId": JOB_ID, "state": "FAILED", "message": "internal export error"
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&april_cdsp(), &SilentProgress, &CancellationToken::new())
        .await
        .unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "remote_job_failure");
    assert_eq!(json["export_job"]["state"], "FAILED");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("internal export error"));
}

#[tokio::test]
async fn test_timeout_is_distinct_from_remote_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/audit-log-exports/{}", JOB_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let settings = PipelineSettings {
        poll: PollSettings {
            interval: Duration::from_millis(20),
            max_wait: Duration::from_millis(120),
        },
        temp_dir: Some(temp.path().to_path_buf()),
    };

    let response = AuditLogPipeline::new(&client, settings)
        .retrieve_and_analyze(&april_cdsp(), &SilentProgress, &CancellationToken::new())
        .await
        .unwrap();

    let LogsResponse::Failure(failure) = response else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, ErrorKind::Timeout);
    assert_eq!(
        failure.export_job.map(|job| job.state),
        Some(ExportState::TimedOut)
    );
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/audit-log-exports/{}", JOB_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobId": JOB_ID,
            "state": "SUCCEEDED",
            "location": format!("{}/downloads/gone", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/downloads/gone"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&april_cdsp(), &SilentProgress, &CancellationToken::new())
        .await
        .unwrap();

    let LogsResponse::Failure(failure) = response else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, ErrorKind::TransportFailure);
    assert!(is_empty_dir(temp.path()));
}

#[tokio::test]
async fn test_conflicting_scopes_are_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let request = LogsRequest {
        service_name: Some("payments-hsm".into()),
        ..april_cdsp()
    };

    let err = AuditLogPipeline::new(&client, PipelineSettings::default())
        .retrieve_and_analyze(&request, &SilentProgress, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_cancel_during_download_removes_temp_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audit-log-exports"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": JOB_ID, "state": "ACTIVE"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/audit-log-exports/{}", JOB_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobId": JOB_ID,
            "state": "SUCCEEDED",
            "location": format!("{}/downloads/slow", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/downloads/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(gzip(&fixture_export()))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let progress = RecordingProgress::new();
    let cancel = CancellationToken::new();

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        })
    };

    let response = AuditLogPipeline::new(&client, settings(&temp))
        .retrieve_and_analyze(&april_cdsp(), &progress, &cancel)
        .await
        .unwrap();
    trigger.await.unwrap();

    let LogsResponse::Failure(failure) = response else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, ErrorKind::Cancelled);
    assert_eq!(
        failure.export_job.map(|job| job.state),
        Some(ExportState::Succeeded)
    );
    // The download had started before cancellation
    assert!(progress.events().iter().any(|e| e.0 == 70));
    assert!(is_empty_dir(temp.path()));
}
