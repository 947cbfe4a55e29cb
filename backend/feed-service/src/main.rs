use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, App, HttpServer};
use anyhow::Context;
use feed_service::{
    config::Config,
    db::{FeedStore, MemoryFeedStore, PgFeedStore},
    logging, AppState,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cfg = Config::from_env().context("loading configuration")?;

    let store: Arc<dyn FeedStore> = match &cfg.database_url {
        Some(url) => {
            tracing::info!("using Postgres feed store");
            Arc::new(
                PgFeedStore::connect(url)
                    .await
                    .context("connecting to Postgres")?,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory feed store (data is not durable)");
            Arc::new(MemoryFeedStore::new())
        }
    };

    let state = AppState::from_config(store, &cfg)?;
    let _sweeper = state.guard.spawn_sweeper(cfg.revocation_sweep_interval);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, client_origin = %cfg.client_origin, "starting feed-service");

    let client_origin = cfg.client_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&client_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(actix_middleware::MetricsMiddleware)
            .wrap(actix_middleware::Logging)
            .wrap(actix_middleware::CorrelationIdMiddleware)
            .wrap(cors)
            .configure(|cfg| state.configure(cfg))
    })
    .bind(&bind_addr)
    .with_context(|| format!("binding {bind_addr}"))?
    .run()
    .await
    .context("running HTTP server")?;

    Ok(())
}
