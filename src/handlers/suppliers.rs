use crate::{
    auth::CurrentUser,
    commands::suppliers::{CreateSupplierCommand, UpdateSupplierCommand},
    entities::supplier,
    handlers::common::{created_response, paginate, CreatedResult, PaginationParams},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "0b7a51e4-1c9a-4f0b-8d7e-2a6c9e5d4f11",
    "legal_name": "Metalurgica Exemplo Ltda",
    "cnpj": "12.345.678/0001-95",
    "erp_code": "F00412",
    "created_at": "2025-02-11T10:00:00Z",
    "updated_at": "2025-02-11T10:00:00Z"
}))]
pub struct SupplierResponse {
    pub id: Uuid,
    pub legal_name: String,
    pub cnpj: String,
    /// Supplier code in the ERP
    pub erp_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<supplier::Model> for SupplierResponse {
    fn from(model: supplier::Model) -> Self {
        Self {
            id: model.id,
            legal_name: model.legal_name,
            cnpj: model.cnpj,
            erp_code: model.erp_code,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    params(PaginationParams),
    responses(
        (status = 200, description = "Suppliers listed by legal name", body = ApiResponse<PaginatedResponse<SupplierResponse>>),
        (status = 401, description = "Missing user identity", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<SupplierResponse>> {
    let (page, limit) = params.resolve(state.config.items_per_page);
    let (suppliers, total) = state.services.suppliers.list_suppliers(page, limit).await?;
    let items = suppliers.into_iter().map(SupplierResponse::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/:id",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier fetched", body = ApiResponse<SupplierResponse>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SupplierResponse> {
    let supplier = state.services.suppliers.get_supplier(id).await?;
    Ok(Json(ApiResponse::success(SupplierResponse::from(supplier))))
}

#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierCommand,
    responses(
        (status = 201, description = "Supplier registered", body = ApiResponse<SupplierResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 409, description = "CNPJ already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateSupplierCommand>,
) -> CreatedResult<SupplierResponse> {
    user.require_admin()?;
    let supplier = state.services.suppliers.create_supplier(payload).await?;
    info!(supplier_id = %supplier.id, admin = %user.id, "Supplier registered");
    Ok(created_response(SupplierResponse::from(supplier)))
}

#[utoipa::path(
    put,
    path = "/api/v1/suppliers/:id",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = UpdateSupplierCommand,
    responses(
        (status = 200, description = "Supplier updated", body = ApiResponse<SupplierResponse>),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "CNPJ already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateSupplierCommand>,
) -> ApiResult<SupplierResponse> {
    user.require_admin()?;
    payload.id = id;
    let supplier = state.services.suppliers.update_supplier(payload).await?;
    Ok(Json(ApiResponse::success(SupplierResponse::from(supplier))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/:id",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    user.require_admin()?;
    state.services.suppliers.delete_supplier(id).await?;
    info!(supplier_id = %id, admin = %user.id, "Supplier deleted");
    Ok(Json(ApiResponse::success(json!({ "deleted": id }))))
}
