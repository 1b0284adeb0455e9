use dpod_audit_tools::config::{ConsoleConfig, Credentials};
use dpod_audit_tools::console_api::ConsoleClient;
use dpod_audit_tools::error::ErrorKind;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth_config(server: &MockServer) -> ConsoleConfig {
    ConsoleConfig {
        base_url: server.uri(),
        auth_url: format!("{}/oauth/v1/token", server.uri()),
        credentials: Credentials::ClientCredentials {
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
        },
        skip_verify: false,
        request_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_token_is_fetched_once_and_reused() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/v1/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1", "expires_in": 3600})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/service_instances"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
        .expect(2)
        .mount(&server)
        .await;

    let client = ConsoleClient::new(&oauth_config(&server)).unwrap();
    for _ in 0..2 {
        let body: Value = client.get_json("/v1/service_instances", &[]).await.unwrap();
        assert_eq!(body["content"], json!([]));
    }
}

#[tokio::test]
async fn test_unauthorized_refreshes_token_and_retries_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/v1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1", "expires_in": 3600})),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/audit-log-exports/job-1"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/audit-log-exports/job-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobId": "job-1", "state": "ACTIVE"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ConsoleClient::new(&oauth_config(&server)).unwrap();
    let body: Value = client
        .get_json("/v1/audit-log-exports/job-1", &[])
        .await
        .unwrap();
    assert_eq!(body["state"], "ACTIVE");
}

#[tokio::test]
async fn test_static_token_does_not_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/service_instances"))
        .and(header("authorization", "Bearer static"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ConsoleClient::with_token(&server.uri(), "static").unwrap();
    let err = client
        .get_json::<Value>("/v1/service_instances", &[])
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert!(err.to_string().contains("expired"));
}

#[tokio::test]
async fn test_token_endpoint_failure_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let client = ConsoleClient::new(&oauth_config(&server)).unwrap();
    let err = client
        .get_json::<Value>("/v1/service_instances", &[])
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Authentication failed"));
    assert!(err.to_string().contains("invalid_client"));
}

#[tokio::test]
async fn test_unparseable_body_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/service_instances"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let err = client
        .get_json::<Value>("/v1/service_instances", &[])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert!(err.to_string().contains("Failed to parse JSON"));
}

#[tokio::test]
async fn test_download_is_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/exports/file.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}\n"))
        .mount(&server)
        .await;

    let client = ConsoleClient::with_token(&server.uri(), "tok").unwrap();
    let response = client
        .download(&format!("{}/exports/file.json", server.uri()))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
    assert_eq!(response.text().await.unwrap(), "{}\n");
}
