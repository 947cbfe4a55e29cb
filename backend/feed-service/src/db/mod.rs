//! Durable storage for users and posts behind a narrow async interface.

use async_trait::async_trait;
use event_schema::Post;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewPost, NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryFeedStore;
pub use postgres::PgFeedStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("User not found")]
    UnknownAuthor,
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::Validation(err.to_string()),
            StoreError::UnknownAuthor => AppError::NotFound(err.to_string()),
            StoreError::Backend(msg) => AppError::Database(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Listing order for every `list_*` method: `created_at DESC, id DESC`.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Assigns id and timestamp; the returned post carries the author's
    /// current display name
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;
    async fn list_posts(&self) -> StoreResult<Vec<Post>>;
    async fn list_posts_by_author(&self, author_id: Uuid) -> StoreResult<Vec<Post>>;
}
