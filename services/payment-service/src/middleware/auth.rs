// JWT authentication middleware untuk payment reconciliation service

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::models::claims;
use shared::utils::{jwt, token_extraction};

use crate::{config::AppState, error::AppError, error::AppResult};

// User yang sudah terautentikasi, jadi actor untuk processed_by dan audit
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    // Kasir, manager dan admin boleh catat payment dan generate receipt
    pub fn require_staff(&self) -> AppResult<()> {
        if claims::is_staff_role(&self.role) {
            Ok(())
        } else {
            Err(AppError::forbidden("Staff role required"))
        }
    }

    // Update, void dan refund hanya untuk admin/manager
    pub fn require_supervisor(&self) -> AppResult<()> {
        if claims::can_amend_payments(&self.role) {
            Ok(())
        } else {
            Err(AppError::forbidden("Only admin or manager can amend payments"))
        }
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

// Validasi Bearer token, tolak refresh token dan jti yang sudah di-revoke
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    let token = token_extraction::extract_auth_header(request.headers())
        .ok_or_else(|| AppError::unauthorized("Authorization header dengan Bearer token diperlukan"))
        .and_then(|header| {
            token_extraction::extract_bearer_token(header)
                .ok_or_else(|| AppError::unauthorized("Bearer token format diperlukan"))
        })?;

    let token_claims = jwt::decode_access_token(token, &state.config.jwt_secret)
        .map_err(|e| AppError::token(e.to_string()))?;

    if state.payment_repository.is_token_revoked(&token_claims.jti).await? {
        tracing::warn!("Revoked token used - user {}, endpoint {}", token_claims.sub, path);
        return Err(AppError::token("Token sudah di-revoke"));
    }

    let auth_user = AuthUser {
        user_id: token_claims.sub,
        email: token_claims.email,
        role: token_claims.role,
    };

    tracing::debug!(
        "User authenticated - ID: {}, Email: {}, Role: {}, Endpoint: {}",
        auth_user.user_id,
        auth_user.email,
        auth_user.role,
        path
    );

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "kasir@laundry.test".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_cashier_can_record_but_not_amend() {
        let cashier = user("cashier");
        assert!(cashier.require_staff().is_ok());
        assert!(matches!(cashier.require_supervisor(), Err(AppError::ForbiddenError(_))));
    }

    #[test]
    fn test_manager_and_admin_can_amend() {
        assert!(user("manager").require_supervisor().is_ok());
        assert!(user("admin").require_supervisor().is_ok());
    }

    #[tokio::test]
    async fn test_extractor_returns_authenticated_user() {
        use axum::extract::FromRequestParts;

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/api/payments")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(user("manager"));

        let extracted = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted.user_id, 1);
        assert_eq!(extracted.email, "kasir@laundry.test");
        assert_eq!(extracted.role, "manager");
    }

    #[tokio::test]
    async fn test_extractor_without_user_is_unauthorized() {
        use axum::extract::FromRequestParts;

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/api/payments")
            .body(())
            .unwrap()
            .into_parts();

        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::UnauthorizedError(_))));
    }

    #[test]
    fn test_unknown_role_is_forbidden() {
        let customer = user("customer");
        assert!(customer.require_staff().is_err());
        assert!(customer.require_supervisor().is_err());
    }
}
