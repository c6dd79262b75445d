use crate::{
    auth::CurrentUser,
    commands::incs::{CreateIncCommand, UpdateIncCommand},
    entities::nonconformance::{self, IncStatus, Urgency},
    errors::ServiceError,
    handlers::common::{
        created_response, multipart_error, paginate, read_file_field, CreatedResult,
        PaginationParams,
    },
    services::incs::{ExpiredInc, IncFilter, MonitorFilter, MonitorReport, PhotoUpload},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "3f1c7e52-8a0d-4c55-9a51-0f6f1c2d9b10",
    "sequence_number": 42,
    "invoice_number": 118734,
    "report_date": "2025-03-03",
    "representative": "Carla Souza",
    "supplier": "Metalurgica Exemplo",
    "item": "MPR.02199",
    "quantity_received": 500.0,
    "quantity_defective": 12.0,
    "defect_description": "Rosca fora de especificacao",
    "urgency": "moderate",
    "recommended_action": "Devolver lote",
    "photos": ["uploads/5d2f_rosca.jpg"],
    "status": "in_progress",
    "expiration_date": "2025-03-23",
    "created_at": "2025-03-03T13:05:00Z",
    "updated_at": "2025-03-03T13:05:00Z"
}))]
pub struct IncResponse {
    pub id: Uuid,
    /// Occurrence number (OC)
    pub sequence_number: i64,
    pub invoice_number: i64,
    pub report_date: NaiveDate,
    pub representative: String,
    pub supplier: String,
    pub item: String,
    pub quantity_received: f64,
    pub quantity_defective: f64,
    pub defect_description: String,
    pub urgency: Urgency,
    pub recommended_action: String,
    pub photos: Vec<String>,
    pub status: IncStatus,
    /// Deadline for the supplier response
    pub expiration_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<nonconformance::Model> for IncResponse {
    fn from(model: nonconformance::Model) -> Self {
        let photos = model.photo_paths();
        let expiration_date = model.expiration_date();
        Self {
            id: model.id,
            sequence_number: model.sequence_number,
            invoice_number: model.invoice_number,
            report_date: model.report_date,
            representative: model.representative,
            supplier: model.supplier,
            item: model.item,
            quantity_received: model.quantity_received,
            quantity_defective: model.quantity_defective,
            defect_description: model.defect_description,
            urgency: model.urgency,
            recommended_action: model.recommended_action,
            photos,
            status: model.status,
            expiration_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExpiredIncResponse {
    pub inc: IncResponse,
    pub expiration_date: NaiveDate,
    pub days_overdue: i64,
}

impl From<ExpiredInc> for ExpiredIncResponse {
    fn from(expired: ExpiredInc) -> Self {
        Self {
            inc: expired.inc.into(),
            expiration_date: expired.expiration_date,
            days_overdue: expired.days_overdue,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonitorResponse {
    pub incs: Vec<IncResponse>,
    /// INC count per month (`YYYY-MM`), ascending
    pub monthly_counts: BTreeMap<String, u64>,
}

impl From<MonitorReport> for MonitorResponse {
    fn from(report: MonitorReport) -> Self {
        Self {
            incs: report.incs.into_iter().map(IncResponse::from).collect(),
            monthly_counts: report.monthly_counts,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiredQuery {
    /// Reference date; defaults to today (UTC)
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PhotoQuery {
    /// Stored photo path, as listed in `photos`
    pub path: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/incs",
    params(PaginationParams, IncFilter),
    responses(
        (status = 200, description = "INCs listed, newest first", body = ApiResponse<PaginatedResponse<IncResponse>>),
        (status = 401, description = "Missing user identity", body = crate::errors::ErrorResponse)
    ),
    tag = "incs"
)]
pub async fn list_incs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<IncFilter>,
) -> ApiResult<PaginatedResponse<IncResponse>> {
    let (page, limit) = params.resolve(state.config.items_per_page);
    let (incs, total) = state.services.incs.list_incs(&filter, page, limit).await?;
    let items = incs.into_iter().map(IncResponse::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/v1/incs",
    request_body = CreateIncCommand,
    responses(
        (status = 201, description = "INC opened", body = ApiResponse<IncResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "incs"
)]
pub async fn create_inc(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<CreateIncCommand>,
) -> CreatedResult<IncResponse> {
    let inc = state.services.incs.create_inc(payload).await?;
    Ok(created_response(IncResponse::from(inc)))
}

#[utoipa::path(
    get,
    path = "/api/v1/incs/:id",
    params(("id" = Uuid, Path, description = "INC ID")),
    responses(
        (status = 200, description = "INC fetched", body = ApiResponse<IncResponse>),
        (status = 404, description = "INC not found", body = crate::errors::ErrorResponse)
    ),
    tag = "incs"
)]
pub async fn get_inc(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<IncResponse> {
    let inc = state.services.incs.get_inc(id).await?;
    Ok(Json(ApiResponse::success(IncResponse::from(inc))))
}

#[utoipa::path(
    put,
    path = "/api/v1/incs/:id",
    params(("id" = Uuid, Path, description = "INC ID")),
    request_body = UpdateIncCommand,
    responses(
        (status = 200, description = "INC updated", body = ApiResponse<IncResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "INC not found", body = crate::errors::ErrorResponse)
    ),
    tag = "incs"
)]
pub async fn update_inc(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateIncCommand>,
) -> ApiResult<IncResponse> {
    payload.id = id;
    let inc = state.services.incs.update_inc(payload).await?;
    Ok(Json(ApiResponse::success(IncResponse::from(inc))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/incs/:id",
    params(("id" = Uuid, Path, description = "INC ID")),
    responses(
        (status = 200, description = "INC and its photos deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "INC not found", body = crate::errors::ErrorResponse)
    ),
    tag = "incs"
)]
pub async fn delete_inc(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.services.incs.delete_inc(id).await?;
    Ok(Json(ApiResponse::success(json!({ "deleted": id }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/incs/:id/photos",
    params(("id" = Uuid, Path, description = "INC ID")),
    request_body(content_type = "multipart/form-data", description = "One or more `photos` fields (png, jpg, jpeg, gif)"),
    responses(
        (status = 200, description = "Accepted images attached", body = ApiResponse<IncResponse>),
        (status = 404, description = "INC not found", body = crate::errors::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::errors::ErrorResponse)
    ),
    tag = "incs"
)]
pub async fn add_photos(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<IncResponse> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if matches!(field.name(), Some("photos") | Some("photo")) {
            let (filename, bytes) = read_file_field(field).await?;
            if !filename.is_empty() {
                uploads.push(PhotoUpload { filename, bytes });
            }
        }
    }
    if uploads.is_empty() {
        return Err(ServiceError::BadRequest("No photo part".to_string()));
    }

    let inc = state.services.incs.add_photos(id, uploads).await?;
    Ok(Json(ApiResponse::success(IncResponse::from(inc))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/incs/:id/photos",
    params(("id" = Uuid, Path, description = "INC ID"), PhotoQuery),
    responses(
        (status = 200, description = "Photo detached and deleted", body = ApiResponse<IncResponse>),
        (status = 404, description = "INC or photo not found", body = crate::errors::ErrorResponse)
    ),
    tag = "incs"
)]
pub async fn remove_photo(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<PhotoQuery>,
) -> ApiResult<IncResponse> {
    let inc = state.services.incs.remove_photo(id, &query.path).await?;
    Ok(Json(ApiResponse::success(IncResponse::from(inc))))
}

#[utoipa::path(
    get,
    path = "/api/v1/incs/expired",
    params(ExpiredQuery),
    responses(
        (status = 200, description = "Overdue INCs, most overdue first", body = ApiResponse<Vec<ExpiredIncResponse>>)
    ),
    tag = "incs"
)]
pub async fn expired_incs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ExpiredQuery>,
) -> ApiResult<Vec<ExpiredIncResponse>> {
    let today = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let expired = state.services.incs.expired(today).await?;
    Ok(Json(ApiResponse::success(
        expired.into_iter().map(ExpiredIncResponse::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/incs/monitor",
    params(MonitorFilter),
    responses(
        (status = 200, description = "Matching INCs with monthly counts", body = ApiResponse<MonitorResponse>)
    ),
    tag = "incs"
)]
pub async fn monitor_incs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filter): Query<MonitorFilter>,
) -> ApiResult<MonitorResponse> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err(ServiceError::ValidationError(
                "start_date must not be after end_date".to_string(),
            ));
        }
    }
    let report = state.services.incs.monitor(&filter).await?;
    Ok(Json(ApiResponse::success(MonitorResponse::from(report))))
}
