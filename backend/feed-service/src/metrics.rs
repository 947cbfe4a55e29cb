//! Prometheus metrics for feed-service.
//!
//! Exposes post/broadcast/revocation collectors and an HTTP handler for the
//! `/metrics` endpoint.

use actix_web::{web, HttpResponse};
use jwt_security::RevocationGuard;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, TextEncoder};

pub static POSTS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("feed_posts_created_total", "Posts durably created")
        .expect("register feed_posts_created_total")
});

/// One increment per connection a broadcast was handed to
pub static BROADCAST_DELIVERIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "feed_broadcast_deliveries_total",
        "Broadcast payloads handed to live connections"
    )
    .expect("register feed_broadcast_deliveries_total")
});

pub static BROADCAST_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "feed_broadcast_failures_total",
        "Broadcast deliveries to closed connections (pruned)"
    )
    .expect("register feed_broadcast_failures_total")
});

pub static ACTIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    prometheus::register_int_gauge!(
        "feed_active_connections",
        "Live connections registered with the dispatcher"
    )
    .expect("register feed_active_connections")
});

pub static REVOCATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("feed_revocations_total", "Credentials revoked by logout")
        .expect("register feed_revocations_total")
});

pub static REVOCATION_SET_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    prometheus::register_int_gauge!(
        "feed_revocation_set_size",
        "Revoked credentials not yet past expiry"
    )
    .expect("register feed_revocation_set_size")
});

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics(guard: web::Data<RevocationGuard>) -> HttpResponse {
    REVOCATION_SET_SIZE.set(guard.revoked_count() as i64);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
