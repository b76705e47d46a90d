//! Enhancement API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use enhancer_core::{EnhancementFilter, EnhancementRecord, EnhancementRequest, EnhancementStatus};

use crate::state::AppState;

/// Maximum allowed limit for record queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for record queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for accepting an enhancement request
#[derive(Debug, Deserialize)]
pub struct AcceptEnhancementBody {
    pub tenant_id: String,
    pub ticket_id: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Supplied by callers that redeliver; generated otherwise.
    pub correlation_id: Option<String>,
}

/// Response for an accepted request
#[derive(Debug, Serialize)]
pub struct AcceptEnhancementResponse {
    pub job_id: String,
    pub correlation_id: String,
    pub status_url: String,
}

/// Query parameters for listing records
#[derive(Debug, Deserialize)]
pub struct ListEnhancementsParams {
    /// Filter by tenant
    pub tenant_id: Option<String>,
    /// Filter by status (e.g. "failed")
    pub status: Option<String>,
    /// Maximum number of records to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for listing records
#[derive(Debug, Serialize)]
pub struct ListEnhancementsResponse {
    pub enhancements: Vec<EnhancementRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct EnhancementErrorResponse {
    pub error: String,
}

fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<EnhancementErrorResponse>) {
    (
        status,
        Json(EnhancementErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept a request and queue it for the dispatcher
pub async fn accept_enhancement(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AcceptEnhancementBody>,
) -> Result<(StatusCode, Json<AcceptEnhancementResponse>), impl IntoResponse> {
    for (field, value) in [
        ("tenant_id", &body.tenant_id),
        ("ticket_id", &body.ticket_id),
        ("subject", &body.subject),
    ] {
        if value.trim().is_empty() {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("{} cannot be empty", field),
            ));
        }
    }

    let mut request =
        EnhancementRequest::new(body.tenant_id, body.ticket_id, body.subject, body.description)
            .with_tags(body.tags);
    if let Some(priority) = body.priority {
        request = request.with_priority(priority);
    }
    if let Some(correlation_id) = body.correlation_id.filter(|c| !c.trim().is_empty()) {
        request = request.with_correlation_id(correlation_id);
    }

    match state.queue().enqueue(&request).await {
        Ok(job_id) => {
            info!(
                job_id = %job_id,
                correlation_id = %request.correlation_id,
                tenant_id = %request.tenant_id,
                ticket_id = %request.ticket_id,
                "Enhancement request accepted"
            );
            Ok((
                StatusCode::ACCEPTED,
                Json(AcceptEnhancementResponse {
                    job_id,
                    status_url: format!(
                        "/api/v1/enhancements/{}/{}",
                        request.tenant_id, request.ticket_id
                    ),
                    correlation_id: request.correlation_id,
                }),
            ))
        }
        Err(e) => {
            error!(
                correlation_id = %request.correlation_id,
                tenant_id = %request.tenant_id,
                ticket_id = %request.ticket_id,
                error = %e,
                "Failed to enqueue enhancement request"
            );
            Err(error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}

/// Get the record for one ticket
pub async fn get_enhancement(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, ticket_id)): Path<(String, String)>,
) -> Result<Json<EnhancementRecord>, impl IntoResponse> {
    match state.store().get(&tenant_id, &ticket_id) {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Enhancement not found: {}/{}", tenant_id, ticket_id),
        )),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// List records with optional filters
pub async fn list_enhancements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEnhancementsParams>,
) -> Result<Json<ListEnhancementsResponse>, impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = EnhancementFilter::new().with_limit(limit).with_offset(offset);

    if let Some(tenant_id) = params.tenant_id {
        filter = filter.with_tenant(tenant_id);
    }

    if let Some(ref status) = params.status {
        match EnhancementStatus::parse(status) {
            Some(status) => filter = filter.with_status(status),
            None => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Unknown status: {}", status),
                ));
            }
        }
    }

    let enhancements = match state.store().list(&filter) {
        Ok(records) => records,
        Err(e) => {
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ));
        }
    };

    let total = match state.store().count(&filter) {
        Ok(count) => count,
        Err(e) => {
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ));
        }
    };

    Ok(Json(ListEnhancementsResponse {
        enhancements,
        total,
        limit,
        offset,
    }))
}
