use crate::access::{AuthContext, AuthState, NavigationPolicy};
use crate::errors::GatewayError;
use crate::metrics;
use crate::models::{AccessResponse, LoginRequest, SessionResponse};
use crate::security_middleware::BearerAuth;
use crate::services::DashboardService;
use actix_web::{http::header, web, HttpResponse, ResponseError};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Count and time a handler result under `endpoint`
fn observed(
    endpoint: &str,
    started: Instant,
    result: Result<HttpResponse, GatewayError>,
) -> Result<HttpResponse, GatewayError> {
    let status = match &result {
        Ok(response) => response.status(),
        Err(e) => e.status_code(),
    };
    if let Err(e) = &result {
        if status.is_server_error() {
            error!(endpoint, "Request failed: {}", e);
        }
    }
    metrics::observe_request(endpoint, status.as_u16(), started.elapsed().as_secs_f64());
    result
}

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "dashboard-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Root goes to the login page
pub async fn root_redirect() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/login.html"))
        .finish()
}

/// Password login (unprotected)
pub async fn login(
    service: web::Data<Arc<DashboardService>>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, GatewayError> {
    let started = Instant::now();
    let result = service
        .login(request.into_inner())
        .await
        .map(|response| HttpResponse::Ok().json(response));
    observed("login", started, result)
}

/// Append a record to the current month's sheet
pub async fn combined_submit(
    service: web::Data<Arc<DashboardService>>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let started = Instant::now();
    let result = service
        .submit(&body)
        .await
        .map(|response| HttpResponse::Ok().json(response));
    observed("combined_submit", started, result)
}

/// Rows of the current month's sheet
pub async fn combined_get_data(
    service: web::Data<Arc<DashboardService>>,
) -> Result<HttpResponse, GatewayError> {
    let started = Instant::now();
    let result = service
        .read_data()
        .await
        .map(|response| HttpResponse::Ok().json(response));
    observed("combined_get_data", started, result)
}

/// The caller's session context and sidebar categories
pub async fn session(context: web::ReqData<Arc<AuthContext>>) -> HttpResponse {
    HttpResponse::Ok().json(SessionResponse::from(&**context))
}

/// Page access decision for one category
pub async fn access(
    context: web::ReqData<Arc<AuthContext>>,
    category: web::Path<String>,
) -> HttpResponse {
    let category = category.into_inner();
    let state = AuthState::Authenticated(context.into_inner());
    let decision = NavigationPolicy::decide(&state, &category);
    HttpResponse::Ok().json(AccessResponse { category, decision })
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint() -> HttpResponse {
    match metrics::metrics_handler() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Failed to gather metrics",
            "details": e.to_string()
        })),
    }
}

/// Configure routes
///
/// The ledger endpoints only need a verified identity; session and access
/// checks also resolve the caller's permissions.
pub fn configure_routes(cfg: &mut web::ServiceConfig, auth: BearerAuth) {
    cfg.service(
        web::resource("/api/combined-submit")
            .wrap(auth.identity_only())
            .route(web::post().to(combined_submit)),
    )
    .service(
        web::resource("/api/combined-get-data")
            .wrap(auth.identity_only())
            .route(web::get().to(combined_get_data)),
    )
    .service(
        web::scope("/api")
            .wrap(auth)
            .route("/session", web::get().to(session))
            .route("/access/{category}", web::get().to(access)),
    )
    .route("/login", web::post().to(login))
    .route("/metrics", web::get().to(metrics_endpoint))
    .route("/health", web::get().to(health_check))
    .route("/", web::get().to(root_redirect));
}
