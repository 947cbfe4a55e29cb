use std::sync::Arc;

use event_schema::{api::CreatePostRequest, Post};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::FeedStore;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::NewPost;
use crate::validators::validate;
use crate::websocket::PostBroadcastDispatcher;

/// Creates and lists posts; the only caller of `PostBroadcastDispatcher::publish`.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn FeedStore>,
    dispatcher: PostBroadcastDispatcher,
    // held from persist through publish so dispatch order == creation order
    commit_lock: Arc<Mutex<()>>,
}

impl PostService {
    pub fn new(store: Arc<dyn FeedStore>, dispatcher: PostBroadcastDispatcher) -> Self {
        Self {
            store,
            dispatcher,
            commit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Validate, persist, then broadcast.
    ///
    /// The caller must already have passed the revocation check. Nothing is
    /// broadcast unless persistence succeeded.
    pub async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> AppResult<Post> {
        validate(&req)?;

        let _commit = self.commit_lock.lock().await;

        let post = self
            .store
            .create_post(NewPost {
                author_id,
                content: req.content,
            })
            .await
            .map_err(AppError::from)?;
        metrics::POSTS_CREATED_TOTAL.inc();

        tracing::info!(post_id = %post.id, author_id = %author_id, "post created");

        self.dispatcher.publish(&post).await;
        Ok(post)
    }

    pub async fn list_posts(&self) -> AppResult<Vec<Post>> {
        Ok(self.store.list_posts().await?)
    }

    pub async fn list_posts_by_author(&self, author_id: Uuid) -> AppResult<Vec<Post>> {
        if self.store.find_user_by_id(author_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(self.store.list_posts_by_author(author_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryFeedStore;
    use crate::models::NewUser;
    use event_schema::FeedEvent;

    async fn setup() -> (PostService, PostBroadcastDispatcher, Uuid) {
        let store = Arc::new(MemoryFeedStore::new());
        let author = store
            .create_user(NewUser {
                name: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "x".into(),
                bio: None,
            })
            .await
            .unwrap();
        let dispatcher = PostBroadcastDispatcher::new();
        (
            PostService::new(store, dispatcher.clone()),
            dispatcher,
            author.id,
        )
    }

    #[tokio::test]
    async fn created_post_is_broadcast_with_author_name() {
        let (service, dispatcher, author) = setup().await;
        let (_, mut rx) = dispatcher.subscribe().await;

        let post = service
            .create_post(
                author,
                CreatePostRequest {
                    content: "hello".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(post.author.name, "alice");

        let FeedEvent::NewPost(received) = FeedEvent::from_json(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(received, post);
    }

    #[tokio::test]
    async fn invalid_content_is_not_persisted_or_broadcast() {
        let (service, dispatcher, author) = setup().await;
        let (_, mut rx) = dispatcher.subscribe().await;

        let too_long = "x".repeat(501);
        for content in ["", "   ", too_long.as_str()] {
            let err = service
                .create_post(
                    author,
                    CreatePostRequest {
                        content: content.to_string(),
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert!(service.list_posts().await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn concurrent_creates_dispatch_in_creation_order() {
        let (service, dispatcher, author) = setup().await;
        let (_, mut rx) = dispatcher.subscribe().await;

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_post(
                            author,
                            CreatePostRequest {
                                content: format!("post {i}"),
                            },
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut received = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            let FeedEvent::NewPost(post) = FeedEvent::from_json(&raw).unwrap();
            received.push(post);
        }
        assert_eq!(received.len(), 16);
        // broadcast order is creation order, i.e. oldest first
        assert!(received
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn listing_for_unknown_user_is_not_found() {
        let (service, _, _) = setup().await;
        let err = service
            .list_posts_by_author(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
