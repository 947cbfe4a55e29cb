/// Post handlers - HTTP endpoints for post operations
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use event_schema::api::{CreatePostRequest, CreatePostResponse};

use super::auth::parse_user_id;
use crate::error::AppResult;
use crate::services::PostService;

/// Create a new post. Taking `AuthenticatedUser` runs the revocation check
/// before anything else.
pub async fn create_post(
    posts: web::Data<PostService>,
    user: AuthenticatedUser,
    req: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let post = posts.create_post(user.user_id, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(CreatePostResponse {
        success: true,
        post,
    }))
}

/// Snapshot of every post, newest first
pub async fn list_posts(posts: web::Data<PostService>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(posts.list_posts().await?))
}

pub async fn list_posts_by_user(
    posts: web::Data<PostService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    Ok(HttpResponse::Ok().json(posts.list_posts_by_author(user_id).await?))
}
