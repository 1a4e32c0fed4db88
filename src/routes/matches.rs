use actix_web::{http::StatusCode, web, HttpResponse, Responder, ResponseError};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::{MatchError, MatchService};
use crate::models::{CriteriaOverrides, ErrorResponse, HealthResponse, PaginationQuery};
use crate::routes::auth::AuthUser;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchService>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches", web::get().to(list_all_matches))
        .route("/matches/projects/{project_id}/rebuild", web::post().to(rebuild_matches))
        .route("/matches/projects/{project_id}", web::get().to(list_project_matches))
        .route("/matches/{match_id}", web::get().to(get_match))
        .route("/matches/{match_id}", web::delete().to(delete_match));
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::InvalidState(_) => StatusCode::BAD_REQUEST,
            MatchError::Forbidden(_) => StatusCode::FORBIDDEN,
            MatchError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error, message) = match self {
            MatchError::NotFound(msg) => ("not_found", msg.clone()),
            MatchError::InvalidState(msg) => ("invalid_state", msg.clone()),
            MatchError::Forbidden(msg) => ("forbidden", msg.clone()),
            MatchError::Persistence(e) => {
                tracing::error!("Persistence failure: {}", e);
                ("internal_error", "Failed to access match storage".to_string())
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error.to_string(),
            message,
            status_code: status.as_u16(),
        })
    }
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state
        .service
        .stores()
        .matches
        .health_check()
        .await
        .unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Rebuild matches for a project
///
/// POST /api/v1/matches/projects/{projectId}/rebuild
///
/// Optional request body:
/// ```json
/// {
///   "minimumScore": "5.0",
///   "serviceWeight": "2.0",
///   "ratingWeight": "1.0",
///   "fastSlaBonus": "3.0",
///   "mediumSlaBonus": "1.0"
/// }
/// ```
async fn rebuild_matches(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, MatchError> {
    let project_id = path.into_inner();

    let overrides = if body.iter().all(u8::is_ascii_whitespace) {
        CriteriaOverrides::default()
    } else {
        match serde_json::from_slice::<CriteriaOverrides>(&body) {
            Ok(overrides) => overrides,
            Err(e) => return Ok(bad_request("invalid_json", format!("Invalid JSON: {}", e))),
        }
    };

    if let Err(errors) = overrides.validate() {
        return Ok(bad_request("validation_failed", errors.to_string()));
    }

    let criteria = if overrides.is_empty() {
        None
    } else {
        Some(overrides.apply(*state.service.criteria()))
    };

    tracing::info!(
        "Rebuild requested for project {} by client {}",
        project_id,
        user.claims.sub
    );

    let summary = state.service.rebuild(project_id, criteria).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// List a project's matches, best score first
///
/// GET /api/v1/matches/projects/{projectId}?page=1&limit=10
async fn list_project_matches(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, MatchError> {
    if let Err(errors) = query.validate() {
        return Ok(bad_request("validation_failed", errors.to_string()));
    }

    let page = state
        .service
        .list_project_matches(path.into_inner(), &user.viewer(), query.page, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/matches/{matchId}
async fn get_match(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, MatchError> {
    let found = state.service.get_match(path.into_inner(), &user.viewer()).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// DELETE /api/v1/matches/{matchId} (admin only)
async fn delete_match(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, MatchError> {
    let response = state.service.delete_match(path.into_inner(), &user.viewer()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/matches?page=1&limit=10 (admin only)
async fn list_all_matches(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, MatchError> {
    if let Err(errors) = query.validate() {
        return Ok(bad_request("validation_failed", errors.to_string()));
    }

    let page = state
        .service
        .list_all_matches(&user.viewer(), query.page, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(page))
}
