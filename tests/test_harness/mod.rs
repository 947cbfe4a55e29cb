//! Test Harness Module
//!
//! Runs a real feed-service on an ephemeral local port (in-memory store) and
//! hands out logged-in clients for it.

use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use actix_web::{dev::ServerHandle, App, HttpServer};
use event_schema::api::{LoginRequest, RegisterRequest};
use feed_client::{FeedApi, FeedSession, FeedUpdate};
use feed_service::{config::WebSocketConfig, db::MemoryFeedStore, AppState};
use jwt_security::test_utils::test_guard;
use uuid::Uuid;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Test Environment
pub struct TestEnvironment {
    pub state: AppState,
    pub addr: SocketAddr,
    handle: ServerHandle,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        init_tracing();

        let state = AppState::new(
            Arc::new(MemoryFeedStore::new()),
            Arc::new(test_guard()),
            WebSocketConfig::default(),
        );

        let app_state = state.clone();
        let server = HttpServer::new(move || {
            let app_state = app_state.clone();
            App::new()
                .wrap(actix_middleware::CorrelationIdMiddleware)
                .configure(move |cfg| app_state.configure(cfg))
        })
        .workers(2)
        .bind(("127.0.0.1", 0))
        .expect("bind ephemeral port");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_rt::spawn(server);

        Self {
            state,
            addr,
            handle,
        }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register `name` and return a client holding a fresh token
    pub async fn logged_in(&self, name: &str) -> (FeedApi, Uuid) {
        let mut api = FeedApi::new(self.api_url());
        let email = format!("{name}-{}@example.com", Uuid::new_v4().simple());
        let user = api
            .register(&RegisterRequest {
                name: name.to_string(),
                email: email.clone(),
                password: "hunter22".into(),
                bio: None,
            })
            .await
            .expect("register");
        api.login(&LoginRequest {
            email,
            password: "hunter22".into(),
        })
        .await
        .expect("login");
        (api, user.id)
    }

    /// Wait until every connection opened so far is registered server-side
    pub async fn wait_for_connections(&self, expected: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.state.dispatcher.connection_count().await < expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "connections never registered"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn cleanup(self) {
        self.handle.stop(true).await;
    }
}

/// Next `Added` post for `id`, skipping other updates
pub async fn wait_for_post(session: &mut FeedSession, id: Uuid) {
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(update) = session.next_update().await {
            if let FeedUpdate::Added { post, .. } = update {
                if post.id == id {
                    return true;
                }
            }
        }
        false
    })
    .await;
    assert_eq!(found, Ok(true), "post {id} never reached the session");
}

/// Assert no update arrives within `window`
pub async fn assert_quiet(session: &mut FeedSession, window: Duration) {
    if let Ok(update) = tokio::time::timeout(window, session.next_update()).await {
        panic!("unexpected update: {update:?}");
    }
}
