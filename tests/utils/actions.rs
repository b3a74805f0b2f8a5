use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use super::setup::TestSetup;

pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Error code of an error body
    #[allow(dead_code)]
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a request through the full router
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        access_token: Option<&str>,
        body: Option<Value>,
    ) -> ApiResponse {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("user-agent", "integration-test");
        if let Some(token) = access_token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let request = request
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        ApiResponse { status, body }
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Register a user and log in, returning the login body
    pub async fn register_and_login(&self, email: &str, nickname: &str) -> Value {
        let registered = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"email": email, "password": "secret123", "nickname": nickname})),
            )
            .await;
        assert_eq!(registered.status, StatusCode::OK, "{}", registered.body);

        let login = self
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": email, "password": "secret123"})),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);
        login.body
    }

    /// Create a listing in categories 1 and 2 with two images
    #[allow(dead_code)]
    pub async fn create_goods(&self, access_token: &str) -> ApiResponse {
        self.send(
            "POST",
            "/api/goods",
            Some(access_token),
            Some(json!({
                "title": "standing desk",
                "price": 150000,
                "description": "electric, two motors",
                "category_id_list": [1, 2],
                "default_image_url": "desk-front.png",
                "image_url_list": ["desk-front.png", "desk-side.png"]
            })),
        )
        .await
    }
}
