//! Caller identity.
//!
//! Authentication happens upstream: the gateway forwards the authenticated
//! user in `X-User-Id` and flags administrators with `X-User-Role: admin`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::Span;

use crate::errors::ServiceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
const ADMIN_ROLE: &str = "admin";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub is_admin: bool,
}

impl CurrentUser {
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("Missing user identity".to_string()))?
            .to_string();

        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|role| role.trim().eq_ignore_ascii_case(ADMIN_ROLE))
            .unwrap_or(false);

        Span::current().record("user_id", id.as_str());
        Ok(Self { id, is_admin })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::Request;

    async fn extract(builder: axum::http::request::Builder) -> Result<CurrentUser, ServiceError> {
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        assert_matches!(
            extract(Request::builder()).await,
            Err(ServiceError::Unauthorized(_))
        );
        assert_matches!(
            extract(Request::builder().header(USER_ID_HEADER, "  ")).await,
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn reads_id_and_role() {
        let user = extract(
            Request::builder()
                .header(USER_ID_HEADER, "ana")
                .header(USER_ROLE_HEADER, "Admin"),
        )
        .await
        .unwrap();
        assert_eq!(user.id, "ana");
        assert!(user.require_admin().is_ok());
    }

    #[tokio::test]
    async fn plain_users_are_not_admins() {
        let user = extract(Request::builder().header(USER_ID_HEADER, "bruno"))
            .await
            .unwrap();
        assert_matches!(user.require_admin(), Err(ServiceError::Forbidden(_)));
    }
}
