//! Contract tests for StatusClient against a wiremock registration API.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/api/v1/registrations/{id}/status` | `get_status_*`, `fetch_status_*` |

use regflow_client::{ApiError, RegistrationApiClient, RegistrationApiConfig};
use regflow_core::{AdapterError, RegistrationId, RegistrationStatusSource};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> RegistrationApiClient {
    let config = RegistrationApiConfig {
        base_url: mock_server.uri().parse().unwrap(),
        api_token: zeroize::Zeroizing::new("test-token".into()),
        timeout_secs: 5,
    };
    RegistrationApiClient::new(config).unwrap()
}

fn rid(s: &str) -> RegistrationId {
    RegistrationId::new(s).unwrap()
}

#[tokio::test]
async fn get_status_sends_bearer_and_parses_document() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/registrations/R123/status"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "program": {"id": "prog-7", "name": "Spring League", "season": "2026"},
            "formData": {"firstName": "Ada", "birthYear": 2014},
            "financialSummary": {"subtotal": "150.00", "discount": "25.00"},
            "balanceDue": "125.00",
            "totalAmountDue": 125
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let status = client.status().get_status(&rid("R123")).await.unwrap();

    let program = status.program.unwrap();
    assert_eq!(program.name, "Spring League");
    assert_eq!(program.id.as_deref(), Some("prog-7"));
    assert_eq!(status.form_data.get("birthYear"), Some(&serde_json::json!(2014)));
    assert_eq!(status.balance_due.minor_units(), 12500);
    assert_eq!(status.total_amount_due.minor_units(), 12500);
    assert_eq!(
        status.financial_summary.unwrap()["discount"],
        serde_json::json!("25.00")
    );
}

#[tokio::test]
async fn get_status_maps_404_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/registrations/R404/status"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such registration"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.status().get_status(&rid("R404")).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { ref registration_id } if registration_id == "R404"));
}

#[tokio::test]
async fn get_status_maps_server_error_to_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/registrations/R1/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.status().get_status(&rid("R1")).await.unwrap_err();
    match err {
        ApiError::Api { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_status_rejects_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/registrations/R1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "balanceDue": "12.345"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.status().get_status(&rid("R1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Deserialization { .. }));
}

#[tokio::test]
async fn get_status_encodes_identifier() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/registrations/R%2F9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "balanceDue": 0
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let status = client.status().get_status(&rid("R/9")).await.unwrap();
    assert!(!status.balance_due.is_positive());
}

#[tokio::test]
async fn fetch_status_reports_adapter_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/registrations/R1/status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let source: &dyn RegistrationStatusSource = client.status();
    let err = source.fetch_status(&rid("R1")).await.unwrap_err();
    assert!(matches!(err, AdapterError::Unavailable { .. }));
    assert!(err.to_string().contains("HTTP 500"));
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    let config = RegistrationApiConfig::local_mock(1, "test-token").unwrap();
    let client = RegistrationApiClient::new(config).unwrap();
    let err = client.status().fetch_status(&rid("R1")).await.unwrap_err();
    assert!(matches!(err, AdapterError::Unavailable { .. }));
}
