use dashboard_gateway::identity::{IdentityProvider, SupabaseIdentityProvider};
use dashboard_gateway::GatewayError;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> SupabaseIdentityProvider {
    SupabaseIdentityProvider::new(server.uri(), "anon-key".to_string(), 5).unwrap()
}

#[tokio::test]
async fn test_verify_accepted_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", "anon-key"))
        .and(header("Authorization", "Bearer access-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "5b1c-user",
            "email": "ops@ops.example",
            "aud": "authenticated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = provider(&server).verify("access-123").await.unwrap();
    assert_eq!(user.id, "5b1c-user");
    assert_eq!(user.email.as_deref(), Some("ops@ops.example"));
}

#[tokio::test]
async fn test_verify_rejected_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "msg": "invalid JWT"
        })))
        .mount(&server)
        .await;

    let err = provider(&server).verify("expired").await.unwrap_err();
    assert!(
        matches!(err, GatewayError::Unauthorized(ref m) if m == "Unauthorized: Invalid token.")
    );
}

#[tokio::test]
async fn test_verify_outage_is_identity_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = provider(&server).verify("access-123").await.unwrap_err();
    assert!(matches!(err, GatewayError::Identity(_)));
}

#[tokio::test]
async fn test_sign_in_returns_session_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(json!({ "email": "ops@ops.example", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-123",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-456",
            "user": { "id": "5b1c-user", "email": "ops@ops.example" }
        })))
        .mount(&server)
        .await;

    let sign_in = provider(&server)
        .sign_in("ops@ops.example", "hunter2")
        .await
        .unwrap();
    assert_eq!(sign_in.user_id, "5b1c-user");
    assert_eq!(sign_in.session["refresh_token"], "refresh-456");
    assert_eq!(sign_in.user["email"], "ops@ops.example");
}

#[tokio::test]
async fn test_sign_in_bad_credentials_carry_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .sign_in("ops@ops.example", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized(ref m) if m == "Invalid login credentials"));
}

#[tokio::test]
async fn test_sign_in_rate_limit_is_not_a_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = provider(&server)
        .sign_in("ops@ops.example", "hunter2")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Identity(_)));
}
