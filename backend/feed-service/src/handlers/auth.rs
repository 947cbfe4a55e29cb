/// Account handlers - register, login, logout, profile lookup
use actix_middleware::bearer_token;
use actix_web::{web, HttpRequest, HttpResponse};
use event_schema::api::{
    LoginRequest, LoginResponse, LogoutRequest, MessageResponse, RegisterRequest,
    RegisterResponse,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::AuthService;

pub async fn register(
    auth: web::Data<AuthService>,
    req: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let user = auth.register(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".into(),
        user,
    }))
}

pub async fn login(
    auth: web::Data<AuthService>,
    req: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let (issued, user) = auth.login(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful".into(),
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    }))
}

/// Credential from the `Authorization` header, falling back to `{"token"}`
pub async fn logout(
    http: HttpRequest,
    auth: web::Data<AuthService>,
    body: Option<web::Json<LogoutRequest>>,
) -> AppResult<HttpResponse> {
    let token = bearer_token(&http)
        .or_else(|| body.and_then(|b| b.into_inner().token))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No token provided".into()))?;

    auth.logout(&token).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully".into(),
    }))
}

pub async fn get_user(
    auth: web::Data<AuthService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    Ok(HttpResponse::Ok().json(auth.get_user(user_id).await?))
}

/// Unparseable ids cannot name an existing user
pub(crate) fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("User not found".into()))
}
