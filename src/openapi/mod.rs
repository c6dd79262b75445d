use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "INC Manager API",
        version = "0.1.0",
        description = r#"
# INC Manager

Receiving inspection and supplier nonconformance (INC) tracking.

## Features

- **Receiving inspection**: import the ERP receiving list (`.lst`), walk it notice by notice, mark every record inspected or deferred and store the finished batch
- **INC registry**: open, update and close nonconformance reports with photos
- **Deadlines**: supplier response deadlines by urgency and the overdue report
- **Monitoring**: filtered INC listing with monthly counts
- **Supplier registry**: legal name, CNPJ and ERP code per supplier

## Authentication

Authentication is done upstream. Every request carries the caller in `X-User-Id`;
supplier changes additionally require `X-User-Role: admin`.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Validation Error",
  "message": "quantity_defective must not exceed quantity_received",
  "request_id": "0f2b6f0e-1b0e-4c1e-9d8a-8b1b0d3f4c5a",
  "timestamp": "2025-03-03T13:05:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (configured default, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "inspection", description = "Receiving list inspection"),
        (name = "incs", description = "Nonconformance reports"),
        (name = "suppliers", description = "Supplier registry")
    ),
    paths(
        // Inspection
        crate::handlers::inspection::set_crm_token,
        crate::handlers::inspection::import_receiving_list,
        crate::handlers::inspection::get_session,
        crate::handlers::inspection::mark_record,
        crate::handlers::inspection::finalize_session,
        crate::handlers::inspection::abandon_session,
        crate::handlers::inspection::list_batches,
        crate::handlers::inspection::get_batch,

        // INCs
        crate::handlers::incs::list_incs,
        crate::handlers::incs::create_inc,
        crate::handlers::incs::get_inc,
        crate::handlers::incs::update_inc,
        crate::handlers::incs::delete_inc,
        crate::handlers::incs::add_photos,
        crate::handlers::incs::remove_photo,
        crate::handlers::incs::expired_incs,
        crate::handlers::incs::monitor_incs,

        // Suppliers
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Inspection types
            crate::inspection::ReceivingRecord,
            crate::inspection::RecordStatus,
            crate::inspection::InspectionAction,
            crate::inspection::MarkOutcome,
            crate::inspection::SessionProgress,
            crate::inspection::NoticeGroup,
            crate::inspection::InspectionBatch,
            crate::inspection::ExtractionReport,
            crate::services::inspection::SessionView,
            crate::services::inspection::ImportSummary,
            crate::handlers::inspection::CrmTokenRequest,
            crate::handlers::inspection::CrmTokenResponse,
            crate::handlers::inspection::MarkRequest,
            crate::handlers::inspection::MarkResponse,
            crate::handlers::inspection::BatchSummary,

            // INC types
            crate::commands::incs::CreateIncCommand,
            crate::commands::incs::UpdateIncCommand,
            crate::entities::nonconformance::Urgency,
            crate::entities::nonconformance::IncStatus,
            crate::handlers::incs::IncResponse,
            crate::handlers::incs::ExpiredIncResponse,
            crate::handlers::incs::MonitorResponse,

            // Supplier types
            crate::commands::suppliers::CreateSupplierCommand,
            crate::commands::suppliers::UpdateSupplierCommand,
            crate::handlers::suppliers::SupplierResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
