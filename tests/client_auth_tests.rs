use caido_mcp::auth::{AuthError, AuthGateway, GatewayErrorKind};
use caido_mcp::client::CaidoClient;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> CaidoClient {
    CaidoClient::new(server.uri()).expect("client should build")
}

fn gateway_kind(err: &AuthError) -> Option<GatewayErrorKind> {
    match err {
        AuthError::Gateway { kind, .. } => Some(*kind),
        _ => None,
    }
}

#[tokio::test]
async fn start_device_flow_returns_authorization_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("startAuthenticationFlow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "startAuthenticationFlow": {
                    "request": {
                        "id": "req-1",
                        "userCode": "ABCD-1234",
                        "verificationUrl": "https://auth.caido.io/device",
                        "expiresAt": "2030-01-01T00:15:00Z"
                    },
                    "error": null
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = client(&server)
        .start_device_flow(&CancellationToken::new())
        .await
        .expect("flow should start");

    assert_eq!(request.id, "req-1");
    assert_eq!(request.user_code, "ABCD-1234");
    assert_eq!(request.verification_url, "https://auth.caido.io/device");
    assert_eq!(
        request.expires_at,
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 15, 0).unwrap()
    );
}

#[tokio::test]
async fn start_device_flow_typed_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "startAuthenticationFlow": {
                    "request": null,
                    "error": {"__typename": "InternalUserError"}
                }
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .start_device_flow(&CancellationToken::new())
        .await
        .expect_err("typed error should fail");

    assert_eq!(gateway_kind(&err), Some(GatewayErrorKind::Rejected));
    assert!(err.to_string().contains("InternalUserError"));
}

#[tokio::test]
async fn refresh_sends_token_variable_and_parses_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"variables": {"refreshToken": "refresh-old"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "refreshAuthenticationToken": {
                    "token": {
                        "accessToken": "access-new",
                        "refreshToken": "refresh-new",
                        "expiresAt": "2030-01-08T00:00:00Z"
                    },
                    "error": null
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = client(&server)
        .refresh(&CancellationToken::new(), "refresh-old")
        .await
        .expect("refresh should succeed");

    assert_eq!(credential.access_token, "access-new");
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh-new"));
    assert_eq!(
        credential.expires_at,
        Utc.with_ymd_and_hms(2030, 1, 8, 0, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn refresh_graphql_errors_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Invalid token"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .refresh(&CancellationToken::new(), "refresh-old")
        .await
        .expect_err("graphql error should fail");

    assert_eq!(gateway_kind(&err), Some(GatewayErrorKind::Rejected));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn refresh_server_error_is_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server)
        .refresh(&CancellationToken::new(), "refresh-old")
        .await
        .expect_err("503 should fail");

    assert_eq!(gateway_kind(&err), Some(GatewayErrorKind::Network));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn refresh_unauthorized_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server)
        .refresh(&CancellationToken::new(), "refresh-old")
        .await
        .expect_err("401 should fail");

    assert_eq!(gateway_kind(&err), Some(GatewayErrorKind::Rejected));
}

#[tokio::test]
async fn refresh_rate_limit_is_retryable_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .refresh(&CancellationToken::new(), "refresh-old")
        .await
        .expect_err("429 should fail");

    assert_eq!(gateway_kind(&err), Some(GatewayErrorKind::Network));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_server_is_network() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener
        .local_addr()
        .expect("local addr should be available");
    drop(listener);

    let err = CaidoClient::new(format!("http://{address}"))
        .expect("client should build")
        .refresh(&CancellationToken::new(), "refresh-old")
        .await
        .expect_err("connection should fail");

    assert_eq!(gateway_kind(&err), Some(GatewayErrorKind::Network));
}

#[tokio::test]
async fn cancelled_call_returns_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": null}))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client(&server)
        .start_device_flow(&cancel)
        .await
        .expect_err("cancelled call should fail");

    assert!(matches!(err, AuthError::Cancelled));
}

#[tokio::test]
async fn verify_access_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer access-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"requests": {"pageInfo": {"hasNextPage": false}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .with_token("access-123")
        .verify_access(&CancellationToken::new())
        .await
        .expect("verification should succeed");
}
