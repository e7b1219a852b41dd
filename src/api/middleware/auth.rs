//! JWT authentication middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::api::AppState;
use crate::errors::AppError;

/// Authenticated administrator extracted from the JWT token
#[derive(Clone, Debug)]
pub struct CurrentAdmin {
    pub username: String,
    pub role: String,
}

/// JWT authentication middleware.
///
/// Validates the bearer token, requires the ADMIN role, then injects
/// [`CurrentAdmin`] into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;

    let claims = state.auth_service.authorize_admin(bearer.token())?;

    request.extensions_mut().insert(CurrentAdmin {
        username: claims.sub,
        role: claims.role,
    });

    Ok(next.run(request).await)
}
