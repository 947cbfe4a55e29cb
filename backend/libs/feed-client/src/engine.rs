//! Client feed reconciliation
//!
//! Three sources feed one view, in any relative order:
//! - the initial snapshot (`GET /api/v1/posts`),
//! - the acknowledgment of this client's own submission,
//! - live broadcasts, which include this client's own posts.
//!
//! Every source goes through the same insert-or-ignore merge keyed by post
//! id, and the feed is kept sorted by [`Post::feed_order`]. Because posts
//! are immutable, the result depends only on the *set* of posts observed, so
//! two engines that see the same posts hold identical feeds.

use std::collections::HashSet;

use event_schema::{FeedEvent, Post};
use uuid::Uuid;

use crate::error::EngineError;

/// What a single merge did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New to this feed; `at_head` when it became the newest entry
    Added { id: Uuid, at_head: bool },
    /// Already present; nothing changed
    AlreadyPresent { id: Uuid },
}

impl MergeOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            MergeOutcome::Added { id, .. } | MergeOutcome::AlreadyPresent { id } => *id,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, MergeOutcome::Added { .. })
    }
}

/// The client's own post between submit and acknowledgment.
///
/// It is not part of the feed: the canonical post (with its server id and
/// timestamp) only enters through the ack or the broadcast, whichever comes
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub content: String,
}

#[derive(Debug, Default, Clone)]
pub struct ReconciliationEngine {
    // sorted by `Post::feed_order`
    feed: Vec<Post>,
    ids: HashSet<Uuid>,
    pending: Option<PendingSubmission>,
    snapshot_applied: bool,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a snapshot. Posts already merged from live events are kept.
    ///
    /// Also used for the resync after a reconnect.
    pub fn apply_snapshot<I>(&mut self, posts: I) -> Vec<MergeOutcome>
    where
        I: IntoIterator<Item = Post>,
    {
        self.snapshot_applied = true;
        posts.into_iter().map(|post| self.merge(post)).collect()
    }

    pub fn apply_broadcast(&mut self, post: Post) -> MergeOutcome {
        self.merge(post)
    }

    pub fn apply_event(&mut self, event: FeedEvent) -> MergeOutcome {
        match event {
            FeedEvent::NewPost(post) => self.apply_broadcast(post),
        }
    }

    /// Mark a submission in flight. At most one at a time.
    pub fn begin_submission(&mut self, content: impl Into<String>) -> Result<(), EngineError> {
        if self.pending.is_some() {
            return Err(EngineError::SubmissionInFlight);
        }
        self.pending = Some(PendingSubmission {
            content: content.into(),
        });
        Ok(())
    }

    /// The server accepted the submission and returned the canonical post.
    pub fn acknowledge(&mut self, post: Post) -> MergeOutcome {
        self.pending = None;
        self.merge(post)
    }

    /// The submission was rejected; hands back what was pending.
    pub fn fail_submission(&mut self) -> Option<PendingSubmission> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&PendingSubmission> {
        self.pending.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn snapshot_applied(&self) -> bool {
        self.snapshot_applied
    }

    /// Newest first
    pub fn posts(&self) -> &[Post] {
        &self.feed
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.feed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feed.is_empty()
    }

    fn merge(&mut self, post: Post) -> MergeOutcome {
        let id = post.id;
        if !self.ids.insert(id) {
            return MergeOutcome::AlreadyPresent { id };
        }

        // ids are unique, so the search never lands on an equal element
        let at = self
            .feed
            .binary_search_by(|existing| existing.feed_order(&post))
            .unwrap_or_else(|slot| slot);
        self.feed.insert(at, post);

        MergeOutcome::Added {
            id,
            at_head: at == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use event_schema::AuthorRef;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn post(id: u128, secs: i64) -> Post {
        Post {
            id: Uuid::from_u128(id),
            author: AuthorRef {
                id: Uuid::from_u128(7),
                name: "alice".into(),
            },
            content: format!("post {id}"),
            created_at: at(secs),
        }
    }

    fn assert_invariants(engine: &ReconciliationEngine) {
        let posts = engine.posts();
        let unique: HashSet<_> = posts.iter().map(|p| p.id).collect();
        assert_eq!(unique.len(), posts.len(), "duplicate ids in feed");
        assert!(
            posts.windows(2).all(|w| w[0].created_at >= w[1].created_at),
            "feed not newest-first"
        );
    }

    #[test]
    fn snapshot_is_sorted_and_deduplicated() {
        let mut engine = ReconciliationEngine::new();
        let outcomes = engine.apply_snapshot(vec![post(1, 10), post(2, 30), post(1, 10), post(3, 20)]);

        assert_eq!(outcomes.iter().filter(|o| o.is_added()).count(), 3);
        assert_eq!(
            engine.posts().iter().map(|p| p.id.as_u128()).collect::<Vec<_>>(),
            vec![2, 3, 1]
        );
        assert!(engine.snapshot_applied());
    }

    #[test]
    fn newer_broadcast_lands_at_head() {
        let mut engine = ReconciliationEngine::new();
        engine.apply_snapshot(vec![post(1, 10)]);

        assert_eq!(
            engine.apply_broadcast(post(2, 20)),
            MergeOutcome::Added {
                id: Uuid::from_u128(2),
                at_head: true
            }
        );
        assert_eq!(
            engine.apply_broadcast(post(3, 5)),
            MergeOutcome::Added {
                id: Uuid::from_u128(3),
                at_head: false
            }
        );
        assert_invariants(&engine);
    }

    #[test]
    fn ack_after_broadcast_yields_one_entry() {
        let mut engine = ReconciliationEngine::new();
        engine.apply_snapshot(vec![post(1, 10)]);
        engine.begin_submission("post 42").unwrap();

        let own = post(42, 20);
        assert!(engine.apply_broadcast(own.clone()).is_added());
        assert_eq!(
            engine.acknowledge(own),
            MergeOutcome::AlreadyPresent {
                id: Uuid::from_u128(42)
            }
        );

        assert_eq!(engine.len(), 2);
        assert_eq!(engine.posts()[0].id, Uuid::from_u128(42));
        assert!(!engine.is_submitting());
    }

    #[test]
    fn broadcast_after_ack_yields_one_entry() {
        let mut engine = ReconciliationEngine::new();
        engine.begin_submission("post 42").unwrap();

        let own = post(42, 20);
        assert!(engine.acknowledge(own.clone()).is_added());
        assert!(!engine.apply_broadcast(own).is_added());
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn live_posts_before_snapshot_survive_it() {
        let mut engine = ReconciliationEngine::new();
        engine.apply_broadcast(post(5, 50));

        // snapshot taken slightly before post 5 was created
        engine.apply_snapshot(vec![post(4, 40), post(3, 30)]);

        assert_eq!(
            engine.posts().iter().map(|p| p.id.as_u128()).collect::<Vec<_>>(),
            vec![5, 4, 3]
        );
    }

    #[test]
    fn only_one_submission_in_flight() {
        let mut engine = ReconciliationEngine::new();
        engine.begin_submission("first").unwrap();
        assert_eq!(
            engine.begin_submission("second"),
            Err(EngineError::SubmissionInFlight)
        );

        assert_eq!(
            engine.fail_submission(),
            Some(PendingSubmission {
                content: "first".into()
            })
        );
        assert!(engine.begin_submission("second").is_ok());
        // pending content is never shown as a feed entry
        assert!(engine.is_empty());
    }

    #[test]
    fn timestamp_ties_break_on_id() {
        let mut a = ReconciliationEngine::new();
        let mut b = ReconciliationEngine::new();
        for p in [post(1, 10), post(2, 10), post(3, 10)] {
            a.apply_broadcast(p);
        }
        for p in [post(3, 10), post(1, 10), post(2, 10)] {
            b.apply_broadcast(p);
        }
        assert_eq!(a.posts(), b.posts());
        assert_eq!(a.posts()[0].id, Uuid::from_u128(3));
    }

    #[derive(Debug, Clone)]
    enum Source {
        Snapshot(Vec<usize>),
        Broadcast(usize),
        Ack(usize),
    }

    const POOL: usize = 12;

    // small timestamp range so ties are common
    fn pool() -> Vec<Post> {
        (0..POOL)
            .map(|i| post(i as u128 + 1, (i as i64 * 7) % 5))
            .collect()
    }

    fn source() -> impl Strategy<Value = Source> {
        prop_oneof![
            prop::collection::vec(0..POOL, 0..POOL).prop_map(Source::Snapshot),
            (0..POOL).prop_map(Source::Broadcast),
            (0..POOL).prop_map(Source::Ack),
        ]
    }

    fn run(engine: &mut ReconciliationEngine, posts: &[Post], sources: &[Source]) {
        for src in sources {
            match src {
                Source::Snapshot(idx) => {
                    engine.apply_snapshot(idx.iter().map(|&i| posts[i].clone()));
                }
                Source::Broadcast(i) => {
                    engine.apply_broadcast(posts[*i].clone());
                }
                Source::Ack(i) => {
                    engine.acknowledge(posts[*i].clone());
                }
            }
            assert_invariants(engine);
        }
    }

    proptest! {
        #[test]
        fn order_invariant_holds_at_every_step(sources in prop::collection::vec(source(), 0..40)) {
            let posts = pool();
            let mut engine = ReconciliationEngine::new();
            run(&mut engine, &posts, &sources);
        }

        #[test]
        fn merging_twice_changes_nothing(sources in prop::collection::vec(source(), 0..40)) {
            let posts = pool();
            let mut once = ReconciliationEngine::new();
            run(&mut once, &posts, &sources);

            let mut twice = once.clone();
            run(&mut twice, &posts, &sources);
            prop_assert_eq!(once.posts(), twice.posts());
        }

        #[test]
        fn engines_converge_regardless_of_arrival_order(
            (a, b) in prop::collection::vec(source(), 0..40)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let posts = pool();
            let mut left = ReconciliationEngine::new();
            let mut right = ReconciliationEngine::new();
            run(&mut left, &posts, &a);
            run(&mut right, &posts, &b);
            prop_assert_eq!(left.posts(), right.posts());
        }
    }
}
