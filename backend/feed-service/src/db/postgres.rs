use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_schema::{AuthorRef, Post};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{FeedStore, StoreError, StoreResult};
use crate::models::{NewPost, NewUser, User};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_name: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            author: AuthorRef {
                id: row.author_id,
                name: row.author_name,
            },
            content: row.content,
            created_at: row.created_at,
        }
    }
}

const POST_COLUMNS: &str = r#"
    SELECT p.id, p.author_id, u.name AS author_name, p.content, p.created_at
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

/// Postgres-backed store (`DATABASE_URL`)
#[derive(Clone)]
pub struct PgFeedStore {
    pool: PgPool,
}

impl PgFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migrations: {e}")))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl FeedStore for PgFeedStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, bio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, bio, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(&user.bio)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, bio, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, bio, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        // insert only if the author exists, and return the author's name in
        // the same round trip
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            WITH inserted AS (
                INSERT INTO posts (id, author_id, content)
                SELECT $1, u.id, $3 FROM users u WHERE u.id = $2
                RETURNING id, author_id, content, created_at
            )
            SELECT i.id, i.author_id, u.name AS author_name, i.content, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post.author_id)
        .bind(&post.content)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Post::from).ok_or(StoreError::UnknownAuthor)
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_COLUMNS} ORDER BY p.created_at DESC, p.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_COLUMNS} WHERE p.author_id = $1 ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}
