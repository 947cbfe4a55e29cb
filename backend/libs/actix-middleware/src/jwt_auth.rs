use actix_web::{
    dev::Payload, error::InternalError, http::header::AUTHORIZATION, web, Error, FromRequest,
    HttpRequest, HttpResponse,
};
use jwt_security::{Claims, RevocationGuard, TokenError};
use std::future::{ready, Ready};
use uuid::Uuid;

/// Caller identity for protected handlers.
///
/// Taking this as a handler argument is what makes a route protected: the
/// extractor runs the full `RevocationGuard::authorize` check (signature,
/// expiry, revocation) before the handler body executes, and answers 401
/// otherwise. The guard must be registered as `web::Data<RevocationGuard>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token: String,
    pub claims: Claims,
}

/// Credential from `Authorization: Bearer <token>`
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn unauthorized(err: TokenError) -> Error {
    tracing::warn!(error = %err, "credential rejected");
    let body = serde_json::json!({ "error": err.to_string(), "status": 401 });
    InternalError::from_response(err, HttpResponse::Unauthorized().json(body)).into()
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, Error> {
    let guard = req
        .app_data::<web::Data<RevocationGuard>>()
        .ok_or_else(|| {
            tracing::error!("RevocationGuard is not registered as app data");
            actix_web::error::ErrorInternalServerError("authentication unavailable")
        })?;

    let token = bearer_token(req).ok_or_else(|| unauthorized(TokenError::Missing))?;
    let claims = guard.authorize(&token).map_err(unauthorized)?;
    let user_id = claims.user_id().map_err(unauthorized)?;

    Ok(AuthenticatedUser {
        user_id,
        token,
        claims,
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
