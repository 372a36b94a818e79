//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use medibill_core::config::AuthConfig;
use medibill_core::test_utils::{MockGeminiServer, MockReply};
use medibill_core::{AIClient, MockBackend, PromptLibrary};
use tower::ServiceExt;

const BOUNDARY: &str = "medibill-test-boundary";

fn mock_analyzer(mock: MockBackend) -> BillAnalyzer {
    BillAnalyzer::new(AIClient::Mock(mock)).with_prompts(PromptLibrary::embedded_only())
}

fn setup_app_with(analyzer: Option<BillAnalyzer>, config: ServerConfig) -> Router {
    create_router_with_options(analyzer, Arc::new(AuthService::default()), None, config)
}

fn setup_test_app() -> Router {
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    setup_app_with(Some(mock_analyzer(MockBackend::new())), config)
}

fn setup_auth_app() -> Router {
    setup_app_with(
        Some(mock_analyzer(MockBackend::new())),
        ServerConfig::default(),
    )
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Multipart body with one file part
fn file_part(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn text_part(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

fn bill_pdf() -> Vec<u8> {
    file_part("file", "bill.pdf", "application/pdf", b"%PDF-1.4 itemized bill")
}

fn upload_request(body: Vec<u8>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn sign_up(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/signup",
            serde_json::json!({"email": email, "password": "Correct-Horse9"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    json["token"].as_str().unwrap().to_string()
}

// ========== Upload API Tests ==========

#[tokio::test]
async fn test_upload_success() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    let data = &json["data"];
    assert_eq!(data["percentage"], 85);
    assert_eq!(data["potential_money_back"], 212.0);
    assert_eq!(data["total_billed_amount"], 1840.5);
    assert!(data["email"].as_str().unwrap().starts_with("Subject: Duplicate"));
    assert!(data["appeal"].as_str().unwrap().starts_with("Jordan Rivera"));
    assert_eq!(data.as_object().unwrap().len(), 5);
}

#[tokio::test]
async fn test_upload_sends_declared_type() {
    let mock = MockBackend::new();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = setup_app_with(Some(mock_analyzer(mock.clone())), config);

    let body = file_part("file", "scan.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]);
    let response = app.oneshot(upload_request(body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = mock.last_request().unwrap();
    assert_eq!(sent.document.mime_type, "image/jpeg");
    assert_eq!(sent.document.data, "/9j/4A==");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_upload_missing_file() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(text_part("note", "no attachment"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No file received.");
}

#[tokio::test]
async fn test_upload_not_multipart() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request("/api/upload", serde_json::json!({"file": "x"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No file received.");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let mock = MockBackend::new();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = setup_app_with(Some(mock_analyzer(mock.clone())), config);

    let body = file_part("file", "empty.pdf", "application/pdf", b"");
    let response = app.oneshot(upload_request(body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No file received.");
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_upload_missing_credential() {
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = setup_app_with(None, config);

    // Reported even when the form itself is unusable
    let response = app
        .oneshot(upload_request(text_part("note", "x"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Server misconfigured: Missing GEMINI_API_KEY");
}

#[tokio::test]
async fn test_create_router_without_credential() {
    let app_config = AppConfig::default();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router(&app_config, None, config);

    let response = app
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Server misconfigured: Missing GEMINI_API_KEY");
}

#[tokio::test]
async fn test_upload_invalid_ai_response() {
    let mock = MockBackend::new().with_response("I could not read this bill, sorry!");
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = setup_app_with(Some(mock_analyzer(mock)), config);

    let response = app
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = get_body_json(response).await;
    // Raw model text never reaches the client
    assert_eq!(json["error"], "AI response was not valid JSON.");
    assert_eq!(json.as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_upstream_failure() {
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = setup_app_with(Some(mock_analyzer(MockBackend::always_failing())), config);

    let response = app
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Failed to process document.");
}

#[tokio::test]
async fn test_upload_too_large() {
    let config = ServerConfig {
        require_auth: false,
        max_upload_size: 1024 * 1024,
        ..Default::default()
    };
    let app = setup_app_with(Some(mock_analyzer(MockBackend::new())), config);

    let mut data = b"%PDF-1.4 ".to_vec();
    data.resize(2 * 1024 * 1024, b'x');
    let body = file_part("file", "huge.pdf", "application/pdf", &data);

    let response = app.oneshot(upload_request(body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "File too large. Maximum size is 1 MB");
}

#[tokio::test]
async fn test_upload_normalizes_model_output() {
    let mock = MockBackend::new().with_response(
        r#"{"email":"e","appeal":"a","potential_money_back":9000,"percentage":8500,"total_billed_amount":"4000"}"#,
    );
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = setup_app_with(Some(mock_analyzer(mock)), config);

    let response = app
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["data"]["percentage"], 85);
    assert_eq!(json["data"]["potential_money_back"], 4000.0);
    assert_eq!(json["data"]["total_billed_amount"], 4000.0);
}

#[tokio::test]
async fn test_upload_against_gemini_api() {
    let server = MockGeminiServer::start().await;
    let analyzer = BillAnalyzer::new(AIClient::gemini(&server.url(), "gemini-2.5-flash", "test-key"))
        .with_prompts(PromptLibrary::embedded_only());
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = setup_app_with(Some(analyzer), config);

    let response = app
        .clone()
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["data"]["percentage"], 85);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].api_key.as_deref(), Some("test-key"));
    let inline = &requests[0].body["contents"][0]["parts"][1]["inlineData"];
    assert_eq!(inline["mimeType"], "application/pdf");

    server.set_reply(MockReply::Status(503, "overloaded".into()));
    let response = app
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Failed to process document.");
}

// ========== Results API Tests ==========

#[tokio::test]
async fn test_results_empty_before_upload() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get_request("/api/results", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["state"], "empty");
    assert_eq!(
        json["message"],
        "Upload and analyze a medical record to see your results here."
    );

    let response = app
        .clone()
        .oneshot(get_request("/api/results/letter.pdf", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get_request("/api/results/mailto", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_results_after_upload() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/results", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["state"], "ready");
    assert_eq!(json["kpis"][0]["value"], "$1,841");
    assert_eq!(json["kpis"][1]["value"], "$212");
    assert_eq!(json["kpis"][1]["highlight"], true);
    assert_eq!(json["kpis"][2]["value"], "85%");
    assert_eq!(json["comparison"][1]["label"], "Potential Savings (11.5%)");
    assert!(json["letter_paragraphs"].as_array().unwrap().len() > 3);
}

#[tokio::test]
async fn test_letter_pdf_download() {
    let app = setup_test_app();

    app.clone()
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    let response = app
        .oneshot(get_request("/api/results/letter.pdf", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"medical-bill-appeal.pdf\""
    );

    let bytes = get_body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_mailto_handoff() {
    let app = setup_test_app();

    app.clone()
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/results/mailto", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let uri = json["uri"].as_str().unwrap();
    assert!(uri.starts_with("mailto:?subject=Medical%20Bill%20Appeal&body=Subject%3A%20Duplicate"));
    assert!(uri.contains("%0A%0AHello%2C"));

    let response = app
        .oneshot(get_request("/api/results/mailto?subject=Claim%2055", None))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json["uri"]
        .as_str()
        .unwrap()
        .starts_with("mailto:?subject=Claim%2055&body="));
}

#[tokio::test]
async fn test_clear_results() {
    let app = setup_test_app();

    app.clone()
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/results")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    let response = app
        .oneshot(get_request("/api/results", None))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["state"], "empty");
}

#[tokio::test]
async fn test_new_upload_overwrites_result() {
    let mock = MockBackend::new();
    let auth = Arc::new(AuthService::default());
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router_with_options(
        Some(mock_analyzer(mock)),
        auth.clone(),
        None,
        config.clone(),
    );
    app.oneshot(upload_request(bill_pdf(), None)).await.unwrap();

    let second = MockBackend::new().with_response(
        r#"{"email":"second","appeal":"b","potential_money_back":10,"percentage":20,"total_billed_amount":100}"#,
    );
    let app = create_router_with_options(Some(mock_analyzer(second)), auth.clone(), None, config);
    app.oneshot(upload_request(bill_pdf(), None)).await.unwrap();

    let stored = auth
        .analysis(medibill_core::auth::LOCAL_SESSION_TOKEN)
        .await
        .unwrap();
    assert_eq!(stored.email, "second");
    assert_eq!(stored.percentage, 20);
}

// ========== Auth API Tests ==========

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = setup_auth_app();

    for uri in ["/api/me", "/api/results", "/api/results/letter.pdf", "/api/results/mailto"] {
        let response = app.clone().oneshot(get_request(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let json = get_body_json(response).await;
        assert_eq!(json["error"], "Authentication required");
        assert_eq!(json["redirect"], "/login");
    }

    let response = app
        .clone()
        .oneshot(upload_request(bill_pdf(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_request("/api/results", Some("not-a-session")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_and_me() {
    let app = setup_auth_app();
    let token = sign_up(&app, "Pat@Example.com").await;

    let response = app
        .oneshot(get_request("/api/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["user"]["email"], "pat@example.com");
    assert_eq!(json["auth_method"], "session");
}

#[tokio::test]
async fn test_me_without_auth() {
    let app = setup_test_app();

    let response = app.oneshot(get_request("/api/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["user"]["id"], "local");
    assert_eq!(json["auth_method"], "none");
}

#[tokio::test]
async fn test_signup_errors() {
    let app = setup_auth_app();
    sign_up(&app, "pat@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/signup",
            serde_json::json!({"email": "pat@example.com", "password": "Another-One2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "An account with this email already exists.");
    assert_eq!(json["code"], "auth/email-already-in-use");

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/signup",
            serde_json::json!({"email": "new@example.com", "password": "123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Please choose a stronger password.");
    assert_eq!(json["code"], "auth/weak-password");

    // Long enough, but no uppercase letter or digit
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/signup",
            serde_json::json!({"email": "new@example.com", "password": "aaaaaaaaaa"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["code"], "auth/weak-password");

    let response = app
        .oneshot(json_request(
            "/api/auth/signup",
            serde_json::json!({"email": "not-an-email", "password": "long-enough"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Please enter a valid email address.");
}

#[tokio::test]
async fn test_login_flow() {
    let app = setup_auth_app();
    sign_up(&app, "pat@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/login",
            serde_json::json!({"email": "pat@example.com", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Incorrect password.");
    assert_eq!(json["code"], "auth/wrong-password");

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/login",
            serde_json::json!({"email": "nobody@example.com", "password": "whatever"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No account found with this email.");

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/login",
            serde_json::json!({"email": "pat@example.com", "password": "Correct-Horse9"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let token = json["token"].as_str().unwrap();
    assert_eq!(json["user"]["email"], "pat@example.com");

    let response = app
        .oneshot(get_request("/api/results", Some(token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_throttled() {
    let auth = Arc::new(AuthService::new(AuthConfig {
        max_failed_attempts: 2,
        ..AuthConfig::default()
    }));
    let app = create_router_with_options(None, auth, None, ServerConfig::default());
    sign_up(&app, "pat@example.com").await;

    let wrong = serde_json::json!({"email": "pat@example.com", "password": "wrong-pass"});
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request("/api/auth/login", wrong.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Locked even with the right password
    let response = app
        .oneshot(json_request(
            "/api/auth/login",
            serde_json::json!({"email": "pat@example.com", "password": "Correct-Horse9"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = get_body_json(response).await;
    assert_eq!(
        json["error"],
        "Too many failed attempts. Please try again later."
    );
    assert_eq!(json["code"], "auth/too-many-requests");
}

#[tokio::test]
async fn test_password_reset() {
    let app = setup_auth_app();
    sign_up(&app, "pat@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/reset",
            serde_json::json!({"email": "pat@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    let response = app
        .oneshot(json_request(
            "/api/auth/reset",
            serde_json::json!({"email": "ghost@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No account found with this email.");
    assert_eq!(json["code"], "auth/user-not-found");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup_auth_app();
    let token = sign_up(&app, "pat@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    let response = app
        .oneshot(get_request("/api/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sessions_keep_separate_results() {
    let app = setup_auth_app();
    let first = sign_up(&app, "first@example.com").await;
    let second = sign_up(&app, "second@example.com").await;

    let response = app
        .clone()
        .oneshot(upload_request(bill_pdf(), Some(&first)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/api/results", Some(&first)))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await["state"], "ready");

    let response = app
        .oneshot(get_request("/api/results", Some(&second)))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await["state"], "empty");
}

// ========== Middleware Tests ==========

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();

    let response = app
        .oneshot(get_request("/api/results", None))
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'none'"));
}

#[test]
fn test_bearer_token() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer_token(&headers), None);

    headers.insert("authorization", "Bearer abc-123".parse().unwrap());
    assert_eq!(bearer_token(&headers), Some("abc-123"));

    headers.insert("authorization", "Basic abc".parse().unwrap());
    assert_eq!(bearer_token(&headers), None);

    headers.insert("authorization", "Bearer  ".parse().unwrap());
    assert_eq!(bearer_token(&headers), None);
}

#[test]
fn test_error_mapping() {
    let err = AppError::from_analysis(Error::Upstream("quota exceeded".into()));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message(), "Failed to process document.");

    let err = AppError::from_analysis(Error::InvalidResponseFormat("{oops".into()));
    assert_eq!(err.message(), "AI response was not valid JSON.");

    let err = AppError::from_analysis(Error::Validation("No file received.".into()));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = AppError::from_auth(AuthFlow::PasswordReset, Error::InvalidData("boom".into()));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message(), "An unexpected error occurred.");

    let err = AppError::from_auth(
        AuthFlow::SignUp,
        Error::Auth(AuthErrorCode::TooManyRequests),
    );
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(err.message(), "Unable to create account. Please try again.");
}
