use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::{multipart_error, paginate, read_file_field, validate_input, PaginationParams},
    inspection::{InspectionAction, InspectionBatch, MarkOutcome, RecordStatus, SessionProgress},
    services::inspection::{ImportSummary, SessionView},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"link": "https://crm.example.com/os/view?id=981&token=9f3a0c77"}))]
pub struct CrmTokenRequest {
    /// CRM link carrying a `token=<hex>` parameter
    #[validate(length(min = 1, max = 2048))]
    pub link: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CrmTokenResponse {
    #[schema(example = "9f3a0c77")]
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({"notice_number": 48213, "position": 0, "action": "inspect"}))]
pub struct MarkRequest {
    /// Receiving notice (AR) of the group
    pub notice_number: i64,
    /// Zero-based position inside the notice group
    pub position: usize,
    pub action: InspectionAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkResponse {
    /// False when no record sits at the given coordinates
    pub applied: bool,
    pub outcome: MarkOutcome,
    pub progress: SessionProgress,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchSummary {
    pub id: Uuid,
    pub inspector_id: String,
    pub crm_token: Option<String>,
    pub source_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub records: usize,
    pub inspected: usize,
    pub deferred: usize,
}

impl From<InspectionBatch> for BatchSummary {
    fn from(batch: InspectionBatch) -> Self {
        let records = batch.records();
        let inspected = records
            .iter()
            .filter(|r| r.status() == RecordStatus::Inspected)
            .count();
        Self {
            id: batch.id(),
            inspector_id: batch.inspector_id().to_string(),
            crm_token: batch.crm_token().map(str::to_string),
            source_filename: batch.source_filename().map(str::to_string),
            created_at: batch.created_at(),
            records: records.len(),
            inspected,
            deferred: records.len() - inspected,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/inspection/crm-token",
    request_body = CrmTokenRequest,
    responses(
        (status = 200, description = "CRM token registered", body = ApiResponse<CrmTokenResponse>),
        (status = 400, description = "Link carries no token", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing user identity", body = crate::errors::ErrorResponse)
    ),
    tag = "inspection"
)]
pub async fn set_crm_token(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CrmTokenRequest>,
) -> ApiResult<CrmTokenResponse> {
    validate_input(&payload)?;
    let token = state
        .services
        .inspection
        .set_crm_token(&user.id, &payload.link)
        .await?;
    Ok(Json(ApiResponse::success(CrmTokenResponse { token })))
}

#[utoipa::path(
    post,
    path = "/api/v1/inspection/import",
    request_body(content_type = "multipart/form-data", description = "Receiving list in field `file`"),
    responses(
        (status = 200, description = "Session started from the list", body = ApiResponse<ImportSummary>),
        (status = 400, description = "No file, no CRM token, or no valid records", body = crate::errors::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::errors::ErrorResponse)
    ),
    tag = "inspection"
)]
pub async fn import_receiving_list(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<ImportSummary> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            upload = Some(read_file_field(field).await?);
            break;
        }
    }
    let (filename, contents) =
        upload.ok_or_else(|| ServiceError::BadRequest("No file part".to_string()))?;

    let summary = state
        .services
        .inspection
        .import(&user.id, &filename, &contents)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspection/session",
    responses(
        (status = 200, description = "Running session grouped by notice", body = ApiResponse<SessionView>),
        (status = 404, description = "No inspection in progress", body = crate::errors::ErrorResponse)
    ),
    tag = "inspection"
)]
pub async fn get_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<SessionView> {
    let view = state.services.inspection.view(&user.id)?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inspection/session/mark",
    request_body = MarkRequest,
    responses(
        (status = 200, description = "Mark processed; `applied` is false for unknown coordinates", body = ApiResponse<MarkResponse>),
        (status = 404, description = "No inspection in progress", body = crate::errors::ErrorResponse)
    ),
    tag = "inspection"
)]
pub async fn mark_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<MarkRequest>,
) -> ApiResult<MarkResponse> {
    let service = &state.services.inspection;
    let outcome = service.mark(
        &user.id,
        payload.notice_number,
        payload.position,
        payload.action,
    )?;
    let progress = service.view(&user.id)?.progress;

    Ok(Json(ApiResponse::success(MarkResponse {
        applied: outcome.applied(),
        outcome,
        progress,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/inspection/session/finalize",
    responses(
        (status = 200, description = "Batch stored and session closed", body = ApiResponse<InspectionBatch>),
        (status = 404, description = "No inspection in progress", body = crate::errors::ErrorResponse),
        (status = 422, description = "Records still pending", body = crate::errors::ErrorResponse)
    ),
    tag = "inspection"
)]
pub async fn finalize_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<InspectionBatch> {
    let batch = state.services.inspection.finalize(&user.id).await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inspection/session",
    responses(
        (status = 200, description = "Session discarded", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "No inspection in progress", body = crate::errors::ErrorResponse)
    ),
    tag = "inspection"
)]
pub async fn abandon_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Value> {
    state.services.inspection.abandon(&user.id).await?;
    Ok(Json(ApiResponse::success(json!({ "abandoned": true }))))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspection/batches",
    params(PaginationParams),
    responses(
        (status = 200, description = "Stored batches, newest first", body = ApiResponse<PaginatedResponse<BatchSummary>>)
    ),
    tag = "inspection"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<BatchSummary>> {
    let (page, limit) = params.resolve(state.config.items_per_page);
    let (batches, total) = state
        .services
        .inspection
        .list_batches(page, limit)
        .await?;
    let items = batches.into_iter().map(BatchSummary::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspection/batches/:id",
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch with every record", body = ApiResponse<InspectionBatch>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inspection"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<InspectionBatch> {
    let batch = state.services.inspection.get_batch(id).await?;
    Ok(Json(ApiResponse::success(batch)))
}
