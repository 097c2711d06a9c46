//! JSON HTTP API consumed by the dashboard frontend.

use anyhow::{Context, Result};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tally_core::analytics::DEFAULT_TREND_MONTHS;
use tally_core::{Month, NewTransaction};
use tally_finance::{Store, TransactionFilter, admin, advisor, ingest_upload, reports, transactions};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AdminUser, AuthUser, IdentityProvider};
use crate::config::ServerSection;
use crate::error::{ApiError, ApiResult};

/// Upper bound for `?months=` on the trend endpoint
const MAX_TREND_MONTHS: usize = 120;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub identity: Arc<dyn IdentityProvider>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    month: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    months: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    role: String,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_month(raw: Option<&str>) -> ApiResult<Option<Month>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Month>().map_err(|e| ApiError::BadRequest(e.to_string())))
        .transpose()
}

/// Store writes rewrite the JSON file, so mutating handlers run them on the
/// blocking pool.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
}

/// API routes without CORS or request tracing
pub fn router(state: AppState) -> Router {
    let transactions = Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route("/upload", post(upload_csv))
        .route("/:id", delete(delete_transaction));

    let analytics = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/category-breakdown", get(category_breakdown))
        .route("/monthly-trend", get(monthly_trend))
        .route("/anomalies", get(anomalies))
        .route("/summary", post(save_summary));

    let ai = Router::new()
        .route("/generate-insights", post(generate_insights))
        .route("/insights", get(list_insights));

    let admin_routes = Router::new()
        .route("/users", get(list_users))
        .route("/stats", get(admin_stats))
        .route("/upload-logs", get(upload_logs))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/role", patch(update_role));

    Router::new()
        .route("/health", get(health))
        .nest("/api/transactions", transactions)
        .nest("/api/analytics", analytics)
        .nest("/api/ai", ai)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

/// Full application: routes plus CORS for the frontend origin and request tracing
pub fn app(state: AppState, server: &ServerSection) -> Result<Router> {
    let origin: HeaderValue = server
        .frontend_url
        .parse()
        .with_context(|| format!("invalid frontend_url {}", server.frontend_url))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Ok(router(state).layer(cors).layer(TraceLayer::new_for_http()))
}

pub async fn serve(state: AppState, server: &ServerSection) -> Result<()> {
    let app = app(state, server)?;
    let listener = tokio::net::TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("bind {}", server.bind))?;
    tracing::info!(addr = %server.bind, "server listening");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

// --- transactions ---

async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(filter): Query<TransactionFilter>,
) -> ApiResult<Json<Value>> {
    let page = transactions::list(&state.store, &user.id, &filter)?;
    Ok(Json(json!(page)))
}

async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewTransaction>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if input.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description is required".to_string()));
    }
    if !(input.amount.is_finite() && input.amount > 0.0) {
        return Err(ApiError::BadRequest("amount must be a positive number".to_string()));
    }
    let store = state.store.clone();
    let created = blocking(move || Ok(transactions::create(&store, &user.id, input)?)).await?;
    Ok((StatusCode::CREATED, Json(json!(created))))
}

async fn upload_csv(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("unknown").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let store = state.store.clone();
        let outcome = blocking(move || Ok(ingest_upload(&store, &user.id, &filename, &bytes)?)).await?;
        return Ok(Json(json!(outcome)));
    }
    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let store = state.store.clone();
    blocking(move || Ok(transactions::delete(&store, &user.id, &id)?)).await?;
    Ok(Json(json!({ "message": "Transaction deleted successfully" })))
}

// --- analytics ---

async fn dashboard(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Value>> {
    let stats = reports::dashboard(&state.store, &user.id, today())?;
    Ok(Json(json!(stats)))
}

async fn category_breakdown(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<MonthQuery>,
) -> ApiResult<Json<Value>> {
    let month = parse_month(q.month.as_deref())?;
    let breakdown = reports::category_breakdown(&state.store, &user.id, month)?;
    Ok(Json(json!(breakdown)))
}

async fn monthly_trend(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<TrendQuery>,
) -> ApiResult<Json<Value>> {
    let months = q.months.unwrap_or(DEFAULT_TREND_MONTHS).min(MAX_TREND_MONTHS);
    let trend = reports::monthly_trend(&state.store, &user.id, today(), months)?;
    Ok(Json(json!(trend)))
}

async fn anomalies(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Value>> {
    let flagged = reports::anomalies(&state.store, &user.id)?;
    Ok(Json(json!(flagged)))
}

async fn save_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<MonthQuery>,
) -> ApiResult<Json<Value>> {
    let month = parse_month(q.month.as_deref())?.unwrap_or_else(|| Month::of(today()));
    let store = state.store.clone();
    let summary = blocking(move || Ok(reports::save_summary(&store, &user.id, month)?)).await?;
    Ok(Json(json!(summary)))
}

// --- insights ---

async fn generate_insights(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Value>> {
    let store = state.store.clone();
    let insights = blocking(move || Ok(advisor::generate(&store, &user.id, today())?)).await?;
    Ok(Json(json!(insights)))
}

async fn list_insights(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let limit = q.limit.unwrap_or(advisor::DEFAULT_INSIGHT_LIMIT);
    let insights = advisor::list(&state.store, &user.id, limit)?;
    Ok(Json(json!(insights)))
}

// --- admin ---

async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    Ok(Json(json!(admin::list_users(&state.store)?)))
}

async fn admin_stats(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    Ok(Json(json!(admin::stats(&state.store)?)))
}

async fn upload_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let limit = q.limit.unwrap_or(admin::DEFAULT_LOG_LIMIT);
    Ok(Json(json!(admin::upload_logs(&state.store, limit)?)))
}

async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let store = state.store.clone();
    blocking(move || Ok(admin::delete_user(&store, &id)?)).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

async fn update_role(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(body): Json<RoleBody>,
) -> ApiResult<Json<Value>> {
    let role = admin::parse_role(&body.role)?;
    let store = state.store.clone();
    let user = blocking(move || Ok(admin::update_role(&store, &id, role)?)).await?;
    Ok(Json(json!(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticIdentity;
    use axum::body::{Body, to_bytes};
    use tally_core::Role;
    use axum::http::Request;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    const BOUNDARY: &str = "tallyboundary";

    fn test_app() -> (Router, Arc<Store>) {
        let store = Arc::new(Store::in_memory());
        admin::add_user(&store, "u-1", "ann@example.com", Role::User).unwrap();
        admin::add_user(&store, "u-2", "bo@example.com", Role::Admin).unwrap();

        let tokens = BTreeMap::from([
            ("user-token".to_string(), "u-1".to_string()),
            ("admin-token".to_string(), "u-2".to_string()),
            ("ghost-token".to_string(), "u-404".to_string()),
        ]);
        let state = AppState {
            store: store.clone(),
            identity: Arc::new(StaticIdentity::new(tokens)),
        };
        (router(state), store)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
        let mut b = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            b = b.header(AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(body).unwrap()
    }

    fn upload_request(token: &str, csv: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"jan.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/transactions/upload")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let (app, _) = test_app();
        let (status, body) = send(&app, request("GET", "/health", None, Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_auth_rejections() {
        let (app, _) = test_app();

        let (status, body) = send(&app, request("GET", "/api/analytics/dashboard", None, Body::empty())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing or invalid authorization header");

        let (status, body) = send(&app, request("GET", "/api/analytics/dashboard", Some("bogus"), Body::empty())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");

        let (status, body) =
            send(&app, request("GET", "/api/analytics/dashboard", Some("ghost-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "User not found");

        let (status, body) = send(&app, request("GET", "/api/admin/users", Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");
    }

    struct UnreachableIdentity;

    #[async_trait::async_trait]
    impl IdentityProvider for UnreachableIdentity {
        async fn verify(&self, _token: &str) -> anyhow::Result<Option<crate::auth::Identity>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_identity_service_failure_is_unauthorized() {
        let (_, store) = test_app();
        let app = router(AppState {
            store,
            identity: Arc::new(UnreachableIdentity),
        });
        let (status, body) = send(&app, request("GET", "/api/analytics/dashboard", Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn test_out_of_range_month_is_rejected() {
        let (app, _) = test_app();
        let csv = "date,description,amount\n2026-02-03,Pizza,20\n";
        let (status, _) = send(&app, upload_request("user-token", csv)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            request("POST", "/api/analytics/summary?month=2147483647-12", Some("user-token"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            request("GET", "/api/analytics/category-breakdown?month=2147483647-12", Some("user-token"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            send(&app, request("POST", "/api/analytics/summary?month=2026-02", Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_spent"], 20.0);
    }

    #[tokio::test]
    async fn test_upload_then_list_and_delete() {
        let (app, _) = test_app();
        let csv = "date,description,amount\n2026-01-02,Pizza,12.00\n2026-01-03,Bus,2.50\nbad,row,1";
        let (status, body) = send(&app, upload_request("user-token", csv)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processed"], 2);
        assert_eq!(body["total"], 3);
        assert_eq!(body["message"], "CSV uploaded successfully");

        let (status, body) = send(
            &app,
            request("GET", "/api/transactions?category=Food&limit=5", Some("user-token"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        let id = body["transactions"][0]["id"].as_str().unwrap().to_string();

        let uri = format!("/api/transactions/{id}");
        let (status, _) = send(&app, request("DELETE", &uri, Some("admin-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, request("DELETE", &uri, Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Transaction deleted successfully");
    }

    #[tokio::test]
    async fn test_upload_without_valid_rows() {
        let (app, store) = test_app();
        let (status, body) = send(&app, upload_request("user-token", "date,description,amount\n,,")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No valid rows in CSV");
        assert_eq!(store.read(|t| t.upload_logs.len()).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_transaction_validates() {
        let (app, _) = test_app();
        let good = json!({ "date": "2026-02-01", "description": "Cinema night", "amount": 22.0 });
        let (status, body) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/transactions")
                .header(AUTHORIZATION, "Bearer user-token")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(good.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["category"], "Entertainment");

        let bad = json!({ "date": "2026-02-01", "description": "Oops", "amount": -1.0 });
        let (status, _) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/transactions")
                .header(AUTHORIZATION, "Bearer user-token")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(bad.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analytics_and_insights() {
        let (app, _) = test_app();
        let (status, body) = send(&app, request("GET", "/api/analytics/dashboard", Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["highestSpendingCategory"], "N/A");
        assert_eq!(body["anomalyCount"], 0);

        let (status, body) =
            send(&app, request("GET", "/api/analytics/monthly-trend?months=3", Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, _) = send(
            &app,
            request("GET", "/api/analytics/category-breakdown?month=2026-13", Some("user-token"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            send(&app, request("POST", "/api/ai/generate-insights", Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["type"], "spending_pattern");

        let (status, body) = send(&app, request("GET", "/api/ai/insights?limit=2", Some("user-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_admin_role_update() {
        let (app, store) = test_app();
        let patch_role = |role: &str| {
            Request::builder()
                .method("PATCH")
                .uri("/api/admin/users/u-1/role")
                .header(AUTHORIZATION, "Bearer admin-token")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "role": role }).to_string()))
                .unwrap()
        };

        let (status, body) = send(&app, patch_role("superuser")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid role");

        let (status, body) = send(&app, patch_role("admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "admin");
        assert!(admin::get_user(&store, "u-1").unwrap().unwrap().role.is_admin());

        let (status, body) = send(&app, request("GET", "/api/admin/stats", Some("admin-token"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalUsers"], 2);
    }
}
