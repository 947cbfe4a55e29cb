//! Logging middleware
//!
//! One tracing event per finished request, labelled with the matched route
//! and tagged with the correlation id when `CorrelationIdMiddleware` runs
//! outside this one. 5xx logs at `error`, 4xx at `warn`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, StatusCode},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::Instant;

use crate::CorrelationId;

/// Middleware that logs HTTP requests and responses
#[derive(Clone, Default)]
pub struct Logging;

impl<S, B> Transform<S, ServiceRequest> for Logging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggingService { service }))
    }
}

pub struct LoggingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for LoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().clone();
        let correlation_id = req
            .extensions()
            .get::<CorrelationId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        // the websocket upgrade stays open for the session's lifetime
        let upgrade = req.headers().contains_key(header::UPGRADE);
        if upgrade {
            tracing::debug!(%method, path = req.path(), %correlation_id, "live feed upgrade requested");
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let status = res.status();
            let route = res
                .request()
                .match_pattern()
                .unwrap_or_else(|| res.request().path().to_string());
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match Outcome::of(status) {
                Outcome::ServerError => tracing::error!(
                    %method, %route, %correlation_id, status = status.as_u16(), elapsed_ms,
                    "request failed"
                ),
                Outcome::Rejected => tracing::warn!(
                    %method, %route, %correlation_id, status = status.as_u16(), elapsed_ms,
                    "request rejected"
                ),
                Outcome::Ok => tracing::info!(
                    %method, %route, %correlation_id, status = status.as_u16(), elapsed_ms, upgrade,
                    "request completed"
                ),
            }

            Ok(res)
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Ok,
    Rejected,
    ServerError,
}

impl Outcome {
    fn of(status: StatusCode) -> Self {
        if status.is_server_error() {
            Outcome::ServerError
        } else if status.is_client_error() {
            Outcome::Rejected
        } else {
            Outcome::Ok
        }
    }
}
