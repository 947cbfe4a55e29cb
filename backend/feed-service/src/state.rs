use std::sync::Arc;

use actix_web::{error::InternalError, web, HttpResponse};
use jwt_security::{JwtManager, RevocationGuard};

use crate::config::{Config, WebSocketConfig};
use crate::db::FeedStore;
use crate::error::{AppError, AppResult};
use crate::services::{AuthService, PostService};
use crate::websocket::PostBroadcastDispatcher;

/// Everything the handlers need, wired once by the composition root.
///
/// The dispatcher and guard are explicit objects created here and injected
/// into the services; nothing looks them up globally.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub auth: AuthService,
    pub dispatcher: PostBroadcastDispatcher,
    pub guard: Arc<RevocationGuard>,
    pub websocket: WebSocketConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn FeedStore>,
        guard: Arc<RevocationGuard>,
        websocket: WebSocketConfig,
    ) -> Self {
        let dispatcher = PostBroadcastDispatcher::new();
        Self {
            posts: PostService::new(store.clone(), dispatcher.clone()),
            auth: AuthService::new(store, guard.clone()),
            dispatcher,
            guard,
            websocket,
        }
    }

    pub fn from_config(store: Arc<dyn FeedStore>, config: &Config) -> AppResult<Self> {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_ttl)
            .map_err(|e| AppError::Config(format!("JWT_SECRET: {e}")))?;
        Ok(Self::new(
            store,
            Arc::new(RevocationGuard::new(jwt)),
            config.websocket.clone(),
        ))
    }

    /// Register app data and routes on an `App`
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.posts.clone()))
            .app_data(web::Data::new(self.auth.clone()))
            .app_data(web::Data::new(self.dispatcher.clone()))
            .app_data(web::Data::from(self.guard.clone()))
            .app_data(web::Data::new(self.websocket.clone()))
            .app_data(json_config());
        crate::handlers::routes(cfg);
    }
}

/// Malformed JSON bodies get the same `{"error","status"}` shape as
/// everything else
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid request body: {err}");
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": message,
                "status": 400,
            })),
        )
        .into()
    })
}
