use std::sync::Arc;
use std::time::Duration;

use event_schema::{FeedEvent, Post};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    Mutex,
};
use tokio::task::JoinHandle;

use crate::api::FeedApi;
use crate::engine::{MergeOutcome, ReconciliationEngine};
use crate::error::ClientError;
use crate::live::{self, LiveFeed};

/// Change to the visible feed, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    /// A post not seen before; `at_head` when it is now the newest
    Added { post: Post, at_head: bool },
    /// The live stream dropped; reconnecting
    Disconnected,
    /// Live stream re-established and the feed merged with a fresh snapshot
    Resynced { added: usize },
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// A live feed: one [`ReconciliationEngine`] fed by the snapshot, the
/// client's own submissions, and the broadcast stream.
pub struct FeedSession {
    api: FeedApi,
    engine: Arc<Mutex<ReconciliationEngine>>,
    updates_tx: UnboundedSender<FeedUpdate>,
    updates: UnboundedReceiver<FeedUpdate>,
    live_task: JoinHandle<()>,
}

impl FeedSession {
    pub async fn start(api: FeedApi) -> Result<Self, ClientError> {
        Self::start_with(api, SessionOptions::default()).await
    }

    /// Subscribe to the live stream, then fetch the snapshot.
    ///
    /// Subscribing first means a post created in between arrives on the
    /// stream (and possibly in the snapshot too, which the merge absorbs).
    pub async fn start_with(api: FeedApi, options: SessionOptions) -> Result<Self, ClientError> {
        let live = live::connect(&api.live_url()).await?;
        let snapshot = api.list_posts().await?;

        let engine = Arc::new(Mutex::new(ReconciliationEngine::new()));
        let (updates_tx, updates) = unbounded_channel();
        let added = merge_snapshot(&engine, &updates_tx, snapshot).await;
        tracing::debug!(added, "initial snapshot applied");

        let live_task = tokio::spawn(run_live(
            live,
            api.clone(),
            engine.clone(),
            updates_tx.clone(),
            options,
        ));

        Ok(Self {
            api,
            engine,
            updates_tx,
            updates,
            live_task,
        })
    }

    /// Create a post. Fails with `EngineError::SubmissionInFlight` while a
    /// previous submission is unacknowledged.
    pub async fn submit(&self, content: &str) -> Result<Post, ClientError> {
        self.engine.lock().await.begin_submission(content)?;

        match self.api.create_post(content).await {
            Ok(post) => {
                let outcome = self.engine.lock().await.acknowledge(post.clone());
                emit(&self.updates_tx, &post, outcome);
                Ok(post)
            }
            Err(e) => {
                self.engine.lock().await.fail_submission();
                Err(e)
            }
        }
    }

    pub async fn next_update(&mut self) -> Option<FeedUpdate> {
        self.updates.recv().await
    }

    /// Current feed, newest first
    pub async fn posts(&self) -> Vec<Post> {
        self.engine.lock().await.posts().to_vec()
    }

    pub async fn is_submitting(&self) -> bool {
        self.engine.lock().await.is_submitting()
    }

    pub fn api(&self) -> &FeedApi {
        &self.api
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.live_task.abort();
    }
}

fn emit(updates: &UnboundedSender<FeedUpdate>, post: &Post, outcome: MergeOutcome) {
    if let MergeOutcome::Added { at_head, .. } = outcome {
        // receiver gone means the session is being dropped
        let _ = updates.send(FeedUpdate::Added {
            post: post.clone(),
            at_head,
        });
    }
}

async fn merge_snapshot(
    engine: &Mutex<ReconciliationEngine>,
    updates: &UnboundedSender<FeedUpdate>,
    posts: Vec<Post>,
) -> usize {
    let mut engine = engine.lock().await;
    let outcomes = engine.apply_snapshot(posts.clone());

    let mut added = 0;
    for (post, outcome) in posts.iter().zip(outcomes) {
        if outcome.is_added() {
            added += 1;
        }
        emit(updates, post, outcome);
    }
    added
}

async fn run_live(
    mut live: LiveFeed,
    api: FeedApi,
    engine: Arc<Mutex<ReconciliationEngine>>,
    updates: UnboundedSender<FeedUpdate>,
    options: SessionOptions,
) {
    loop {
        while let Some(event) = live.next_event().await {
            match event {
                Ok(FeedEvent::NewPost(post)) => {
                    let outcome = engine.lock().await.apply_broadcast(post.clone());
                    emit(&updates, &post, outcome);
                }
                Err(ClientError::Decode(e)) => {
                    tracing::warn!(error = %e, "skipping undecodable live event");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "live feed failed");
                    break;
                }
            }
        }

        if updates.send(FeedUpdate::Disconnected).is_err() {
            return;
        }

        let Some((next, snapshot)) = reconnect(&api, &options, &updates).await else {
            return;
        };
        live = next;

        let added = merge_snapshot(&engine, &updates, snapshot).await;
        tracing::info!(added, "live feed resynced");
        if updates.send(FeedUpdate::Resynced { added }).is_err() {
            return;
        }
    }
}

/// Reconnect with exponential backoff, then take a fresh snapshot. Gives up
/// only when the session is gone.
async fn reconnect(
    api: &FeedApi,
    options: &SessionOptions,
    updates: &UnboundedSender<FeedUpdate>,
) -> Option<(LiveFeed, Vec<Post>)> {
    let mut delay = options.initial_backoff;
    let mut attempt: u32 = 0;

    while !updates.is_closed() {
        tokio::time::sleep(delay).await;
        attempt += 1;

        let result = async {
            let live = live::connect(&api.live_url()).await?;
            let snapshot = api.list_posts().await?;
            Ok::<_, ClientError>((live, snapshot))
        }
        .await;

        match result {
            Ok(ok) => return Some(ok),
            Err(e) => {
                tracing::debug!(attempt, error = %e, "reconnect failed");
                delay = (delay * 2).min(options.max_backoff);
            }
        }
    }
    None
}
