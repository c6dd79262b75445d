use crate::{errors::ServiceError, ApiResponse, PaginatedResponse};
use axum::{
    extract::multipart::{Field, MultipartError},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

/// Upper bound for any page size a client asks for
pub const MAX_PER_PAGE: u64 = 100;

/// Highest page number honoured; larger requests land on this page.
pub const MAX_PAGE: u64 = 1_000_000;

/// Result type for handlers that create a resource
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

/// Standard created response
pub fn created_response<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size; the configured default applies when absent
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Page and page size with defaults applied and bounds enforced.
    pub fn resolve(&self, default_per_page: u64) -> (u64, u64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

pub fn paginate<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> PaginatedResponse<T> {
    let total_pages = if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    };
    PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

/// Maps multipart read failures, keeping body-limit rejections distinct.
pub fn multipart_error(err: MultipartError) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge(err.body_text())
    } else {
        ServiceError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Reads one multipart file field into memory.
pub async fn read_file_field(field: Field<'_>) -> Result<(String, Vec<u8>), ServiceError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;
    Ok((filename, bytes.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, (1, 10))]
    #[case(Some(0), Some(0), (1, 1))]
    #[case(Some(3), Some(1_000), (3, MAX_PER_PAGE))]
    #[case(Some(u64::MAX), Some(100), (MAX_PAGE, 100))]
    fn pagination_defaults_and_bounds(
        #[case] page: Option<u64>,
        #[case] per_page: Option<u64>,
        #[case] expected: (u64, u64),
    ) {
        let params = PaginationParams { page, per_page };
        assert_eq!(params.resolve(10), expected);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(paginate(vec![1, 2], 21, 1, 10).total_pages, 3);
        assert_eq!(paginate::<u8>(vec![], 0, 1, 10).total_pages, 0);
    }
}
