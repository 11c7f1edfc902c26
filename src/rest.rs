//! REST API layer using Axum
//!
//! JSON endpoints for workspaces (with their ordered tabs) and groups.
//! - Every `/api/*` route sits behind the bearer-token gate; `/health` and `/ready` do not.
//! - Successful bodies are `{success, data?, message?}`, failures `{error, message}`.
//! - The OpenAPI document is served under `/api-docs/openapi.json` with a Swagger UI.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth::{bearer_token, AuthUser, IdentityVerifier};
use crate::error::{AppError, AppResult, ErrorBody};
use crate::groups::GroupService;
use crate::models::{
    CreateGroupRequest, CreateTabRequest, CreateWorkspaceRequest, Group, Tab,
    UpdateWorkspaceRequest, Workspace,
};
use crate::storage::StorageGateway;
use crate::workspaces::WorkspaceService;

/// Shared app state for REST handlers. Cloned per request; everything inside is `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    workspaces: WorkspaceService,
    groups: GroupService,
    verifier: Arc<dyn IdentityVerifier>,
    store: Arc<dyn StorageGateway>,
}

impl AppState {
    pub fn new(store: Arc<dyn StorageGateway>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            workspaces: WorkspaceService::new(store.clone()),
            groups: GroupService::new(store.clone()),
            verifier,
            store,
        }
    }
}

/// Success envelope.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Authorization gate: verifies the bearer token and binds the caller to this request.
async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?.to_owned();
    let user = state.verifier.verify(&token).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
}

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid id: {raw}")))
}

fn is_extension_origin(origin: &HeaderValue) -> bool {
    origin
        .to_str()
        .map(|o| o.starts_with("chrome-extension://") || o.starts_with("moz-extension://"))
        .unwrap_or(false)
}

/// Configured origins plus any browser-extension origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let allowed: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            is_extension_origin(origin) || allowed.contains(origin)
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create Axum router with all endpoints.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let auth_routes = Router::new()
        .route(
            "/api/workspaces",
            post(create_workspace_handler).get(list_workspaces_handler),
        )
        .route(
            "/api/workspaces/:id",
            get(get_workspace_handler)
                .put(update_workspace_handler)
                .delete(delete_workspace_handler),
        )
        .route("/api/groups", post(create_group_handler).get(list_groups_handler))
        .route("/api/groups/:id", delete(delete_group_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .merge(auth_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
        .layer(cors_layer(allowed_origins))
}

#[utoipa::path(
    post,
    path = "/api/workspaces",
    tag = "workspaces",
    request_body = CreateWorkspaceRequest,
    responses(
        (status = 201, description = "Workspace saved with all of its tabs (in `data`)", body = Workspace),
        (status = 400, description = "Missing name or empty tab list", body = ErrorBody),
        (status = 401, description = "Missing or rejected bearer token", body = ErrorBody),
        (status = 500, description = "Storage failure; nothing was saved", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
async fn create_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateWorkspaceRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Workspace>>)> {
    let Json(req) = payload.map_err(invalid_body)?;
    let workspace = state.workspaces.create(&user.id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(workspace))))
}

#[utoipa::path(
    get,
    path = "/api/workspaces",
    tag = "workspaces",
    responses(
        (status = 200, description = "Caller's workspaces, newest first, tabs by position (in `data`)", body = [Workspace]),
        (status = 401, description = "Missing or rejected bearer token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
async fn list_workspaces_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<ApiResponse<Vec<Workspace>>>> {
    let workspaces = state.workspaces.list(&user.id).await?;
    Ok(Json(ApiResponse::data(workspaces)))
}

#[utoipa::path(
    get,
    path = "/api/workspaces/{id}",
    tag = "workspaces",
    params(("id" = i64, Path, description = "Workspace id")),
    responses(
        (status = 200, description = "The workspace with its tabs (in `data`)", body = Workspace),
        (status = 404, description = "No such workspace for this user", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
async fn get_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Workspace>>> {
    let workspace = state.workspaces.get(&user.id, parse_id(&id)?).await?;
    Ok(Json(ApiResponse::data(workspace)))
}

#[utoipa::path(
    put,
    path = "/api/workspaces/{id}",
    tag = "workspaces",
    params(("id" = i64, Path, description = "Workspace id")),
    request_body = UpdateWorkspaceRequest,
    responses(
        (status = 200, description = "Updated workspace (in `data`)", body = Workspace),
        (status = 400, description = "Empty name or malformed body", body = ErrorBody),
        (status = 404, description = "No such workspace for this user", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
async fn update_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateWorkspaceRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Workspace>>> {
    let id = parse_id(&id)?;
    let Json(req) = payload.map_err(invalid_body)?;
    let workspace = state.workspaces.update(&user.id, id, req).await?;
    Ok(Json(ApiResponse::data(workspace)))
}

#[utoipa::path(
    delete,
    path = "/api/workspaces/{id}",
    tag = "workspaces",
    params(("id" = i64, Path, description = "Workspace id")),
    responses(
        (status = 200, description = "Workspace and its tabs deleted"),
        (status = 404, description = "No such workspace for this user", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
async fn delete_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.workspaces.delete(&user.id, parse_id(&id)?).await?;
    Ok(Json(ApiResponse::message("Workspace deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    tag = "groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created (in `data`)", body = Group),
        (status = 400, description = "Missing name", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
async fn create_group_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Group>>)> {
    let Json(req) = payload.map_err(invalid_body)?;
    let group = state.groups.create(&user.id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(group))))
}

#[utoipa::path(
    get,
    path = "/api/groups",
    tag = "groups",
    responses(
        (status = 200, description = "Caller's groups, newest first (in `data`)", body = [Group])
    ),
    security(("bearer" = []))
)]
async fn list_groups_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<ApiResponse<Vec<Group>>>> {
    let groups = state.groups.list(&user.id).await?;
    Ok(Json(ApiResponse::data(groups)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{id}",
    tag = "groups",
    params(("id" = i64, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group deleted"),
        (status = 404, description = "No such group for this user", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
async fn delete_group_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.groups.delete(&user.id, parse_id(&id)?).await?;
    Ok(Json(ApiResponse::message("Group deleted successfully")))
}

/// Liveness only; never touches storage.
#[utoipa::path(
    get,
    path = "/health",
    tag = "ops",
    responses((status = 200, description = "Process is up"))
)]
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// Readiness: one storage round trip.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "ops",
    responses(
        (status = 200, description = "Storage answered"),
        (status = 503, description = "Storage unreachable", body = ErrorBody)
    )
)]
async fn ready_handler(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(json!({ "status": "ready" })).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(AppError::from(err).body())).into_response()
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_workspace_handler,
        list_workspaces_handler,
        get_workspace_handler,
        update_workspace_handler,
        delete_workspace_handler,
        create_group_handler,
        list_groups_handler,
        delete_group_handler,
        health_handler,
        ready_handler,
    ),
    components(schemas(
        Workspace,
        Tab,
        Group,
        CreateWorkspaceRequest,
        CreateTabRequest,
        UpdateWorkspaceRequest,
        CreateGroupRequest,
        ErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "workspaces", description = "Saved browser workspaces and their tabs"),
        (name = "groups", description = "User-defined workspace labels"),
        (name = "ops", description = "Liveness and readiness")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use crate::error::StorageResult;
    use crate::models::{NewGroup, NewWorkspace, WorkspacePatch};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::collections::HashMap;
    use tower::ServiceExt; // For .oneshot() testing

    /// Accepts a fixed set of tokens.
    struct StaticVerifier(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl IdentityVerifier for StaticVerifier {
        async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
            self.0
                .get(token)
                .map(|id| AuthUser { id: id.to_string() })
                .ok_or_else(|| AuthError::Rejected("unknown token".into()))
        }
    }

    fn verifier() -> Arc<dyn IdentityVerifier> {
        Arc::new(StaticVerifier(HashMap::from([
            ("alice-token", "alice"),
            ("bob-token", "bob"),
        ])))
    }

    /// Any storage call is a test failure.
    struct NoStorage;

    #[async_trait]
    impl StorageGateway for NoStorage {
        async fn create_workspace(&self, _: NewWorkspace) -> StorageResult<Workspace> {
            panic!("storage touched")
        }
        async fn list_workspaces(&self, _: &str) -> StorageResult<Vec<Workspace>> {
            panic!("storage touched")
        }
        async fn find_workspace(&self, _: &str, _: i64) -> StorageResult<Option<Workspace>> {
            panic!("storage touched")
        }
        async fn list_tabs(&self, _: &str, _: i64) -> StorageResult<Vec<Tab>> {
            panic!("storage touched")
        }
        async fn update_workspace(
            &self,
            _: &str,
            _: i64,
            _: WorkspacePatch,
        ) -> StorageResult<Option<Workspace>> {
            panic!("storage touched")
        }
        async fn delete_workspace(&self, _: &str, _: i64) -> StorageResult<bool> {
            panic!("storage touched")
        }
        async fn create_group(&self, _: NewGroup) -> StorageResult<Group> {
            panic!("storage touched")
        }
        async fn list_groups(&self, _: &str) -> StorageResult<Vec<Group>> {
            panic!("storage touched")
        }
        async fn delete_group(&self, _: &str, _: i64) -> StorageResult<bool> {
            panic!("storage touched")
        }
        async fn ping(&self) -> StorageResult<()> {
            panic!("storage touched")
        }
    }

    fn app() -> Router {
        create_router(
            AppState::new(Arc::new(MemoryStore::new()), verifier()),
            &["http://localhost:3000".to_string()],
        )
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.expect("request");
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn research() -> Value {
        json!({
            "name": "Research",
            "tabs": [
                {"url": "https://a.com", "position": 0},
                {"url": "https://b.com", "title": "B", "position": 1}
            ]
        })
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let app = app();
        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());

        let (status, body) = send(&app, request("GET", "/ready", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_bad_credentials_are_rejected_before_storage() {
        let app = create_router(AppState::new(Arc::new(NoStorage), verifier()), &[]);
        let routes = [
            ("POST", "/api/workspaces", Some(research())),
            ("GET", "/api/workspaces", None),
            ("GET", "/api/workspaces/1", None),
            ("PUT", "/api/workspaces/1", Some(json!({"name": "x"}))),
            ("DELETE", "/api/workspaces/1", None),
            ("POST", "/api/groups", Some(json!({"name": "x"}))),
            ("GET", "/api/groups", None),
            ("DELETE", "/api/groups/1", None),
        ];

        for (method, uri, body) in routes {
            let (status, json) = send(&app, request(method, uri, Some("malformed"), body.clone())).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(json["error"], "Unauthenticated");

            let (status, json) = send(&app, request(method, uri, None, body)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(json["message"], "Missing authorization header");
        }

        let mut req = request("GET", "/api/workspaces", None, None);
        req.headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Token alice-token"));
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn test_create_and_fetch_round_trip() {
        let app = app();
        let (status, body) = send(
            &app,
            request("POST", "/api/workspaces", Some("alice-token"), Some(research())),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user_id"], "alice");
        assert_eq!(body["data"]["tabs"].as_array().unwrap().len(), 2);
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            request("GET", &format!("/api/workspaces/{id}"), Some("alice-token"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let urls: Vec<&str> = body["data"]["tabs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["url"].as_str().unwrap())
            .collect();
        assert_eq!(urls, ["https://a.com", "https://b.com"]);
        assert_eq!(body["data"]["tabs"][1]["title"], "B");

        let (status, body) =
            send(&app, request("GET", "/api/workspaces", Some("alice-token"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, request("GET", "/api/workspaces", Some("bob-token"), None)).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payloads_use_error_body() {
        let app = app();

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/workspaces",
                Some("alice-token"),
                Some(json!({"name": "Empty", "tabs": []})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidInput");
        assert_eq!(body["message"], "At least one tab is required");

        let malformed = Request::builder()
            .method("POST")
            .uri("/api/workspaces")
            .header(header::AUTHORIZATION, "Bearer alice-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap();
        let (status, body) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidInput");

        let (status, body) = send(
            &app,
            request("GET", "/api/workspaces/not-a-number", Some("alice-token"), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidInput");
    }

    #[tokio::test]
    async fn test_cross_user_access_is_not_found() {
        let app = app();
        let (_, body) = send(
            &app,
            request("POST", "/api/workspaces", Some("bob-token"), Some(research())),
        )
        .await;
        let uri = format!("/api/workspaces/{}", body["data"]["id"].as_i64().unwrap());

        for (method, payload) in [
            ("GET", None),
            ("PUT", Some(json!({"name": "stolen"}))),
            ("DELETE", None),
        ] {
            let (status, body) = send(&app, request(method, &uri, Some("alice-token"), payload)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
            assert_eq!(body["error"], "NotFound");
            assert!(body.get("data").is_none());
        }

        let (status, body) = send(&app, request("GET", &uri, Some("bob-token"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Research");
    }

    #[tokio::test]
    async fn test_update_then_delete() {
        let app = app();
        let (_, body) = send(
            &app,
            request("POST", "/api/workspaces", Some("alice-token"), Some(research())),
        )
        .await;
        let uri = format!("/api/workspaces/{}", body["data"]["id"].as_i64().unwrap());

        let (status, body) = send(
            &app,
            request(
                "PUT",
                &uri,
                Some("alice-token"),
                Some(json!({"description": "x", "last_accessed_at": "2025-03-01T10:00:00Z"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Research");
        assert_eq!(body["data"]["description"], "x");
        assert_eq!(body["data"]["tabs"].as_array().unwrap().len(), 2);
        assert!(body["data"]["last_accessed_at"].as_str().unwrap().starts_with("2025-03-01T10:00:00"));

        let (status, body) = send(&app, request("DELETE", &uri, Some("alice-token"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Workspace deleted successfully");

        let (status, _) = send(&app, request("GET", &uri, Some("alice-token"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_group_endpoints() {
        let app = app();
        let (status, body) = send(
            &app,
            request("POST", "/api/groups", Some("alice-token"), Some(json!({"name": "Work"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["color"], "#3b82f6");
        let id = body["data"]["id"].as_i64().unwrap();

        let (_, body) = send(&app, request("GET", "/api/groups", Some("alice-token"), None)).await;
        assert_eq!(body["data"][0]["name"], "Work");

        let uri = format!("/api/groups/{id}");
        let (status, _) = send(&app, request("DELETE", &uri, Some("bob-token"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, request("DELETE", &uri, Some("alice-token"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Group deleted successfully");
    }

    #[tokio::test]
    async fn test_cors_allows_extension_and_configured_origins() {
        let app = app();
        for origin in ["chrome-extension://abcdefghijklmnop", "http://localhost:3000"] {
            let preflight = Request::builder()
                .method("OPTIONS")
                .uri("/api/workspaces")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(preflight).await.unwrap();
            assert_eq!(
                response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
                origin,
                "{origin}"
            );
        }

        let foreign = Request::builder()
            .method("GET")
            .uri("/health")
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(foreign).await.unwrap();
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let app = app();
        let (status, body) = send(&app, request("GET", "/api-docs/openapi.json", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/workspaces"]["post"].is_object());
        assert!(body["paths"]["/health"]["get"].is_object());
        assert!(body["paths"]["/ready"]["get"]["responses"]["503"].is_object());
        assert!(body["components"]["securitySchemes"]["bearer"].is_object());
    }
}
