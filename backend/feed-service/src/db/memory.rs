use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use event_schema::{AuthorRef, Post};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FeedStore, StoreError, StoreResult};
use crate::models::{NewPost, NewUser, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    // lower-cased email -> user id
    emails: HashMap<String, Uuid>,
    posts: Vec<Post>,
}

/// Process-local store used when no `DATABASE_URL` is configured.
#[derive(Default)]
pub struct MemoryFeedStore {
    tables: RwLock<Tables>,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| a.feed_order(b));
    posts
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let email = user.email.to_lowercase();
        if tables.emails.contains_key(&email) {
            return Err(StoreError::DuplicateEmail);
        }

        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: email.clone(),
            password_hash: user.password_hash,
            bio: user.bio,
            created_at: Utc::now(),
        };
        tables.emails.insert(email, record.id);
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(&email.to_lowercase())
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        let author = tables
            .users
            .get(&post.author_id)
            .ok_or(StoreError::UnknownAuthor)?;

        let created = Post {
            id: Uuid::new_v4(),
            author: AuthorRef {
                id: author.id,
                name: author.name.clone(),
            },
            content: post.content,
            created_at: Utc::now(),
        };
        tables.posts.push(created.clone());
        Ok(created)
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(newest_first(self.tables.read().await.posts.clone()))
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let posts = tables
            .posts
            .iter()
            .filter(|p| p.author.id == author_id)
            .cloned()
            .collect();
        Ok(newest_first(posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "alice".into(),
            email: email.into(),
            password_hash: "hash".into(),
            bio: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = MemoryFeedStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        assert_eq!(
            store.create_user(new_user("A@Example.com")).await.unwrap_err(),
            StoreError::DuplicateEmail
        );
        assert!(store
            .find_user_by_email("A@EXAMPLE.COM")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn posts_list_newest_first_and_filter_by_author() {
        let store = MemoryFeedStore::new();
        let alice = store.create_user(new_user("a@example.com")).await.unwrap();
        let bob = store.create_user(new_user("b@example.com")).await.unwrap();

        for (author, text) in [(alice.id, "one"), (bob.id, "two"), (alice.id, "three")] {
            store
                .create_post(NewPost {
                    author_id: author,
                    content: text.into(),
                })
                .await
                .unwrap();
        }

        let all = store.list_posts().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].feed_order(&w[1]).is_le()));

        let mine = store.list_posts_by_author(alice.id).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.author.id == alice.id));
    }

    #[tokio::test]
    async fn post_by_unknown_author_is_rejected() {
        let store = MemoryFeedStore::new();
        let err = store
            .create_post(NewPost {
                author_id: Uuid::new_v4(),
                content: "hi".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownAuthor);
        assert!(store.list_posts().await.unwrap().is_empty());
    }
}
