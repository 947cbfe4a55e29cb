use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use prometheus::{HistogramVec, IntCounterVec, IntGauge};
use std::time::Instant;

/// Prometheus Metrics Middleware
///
/// Labels use the matched route pattern (`/api/v1/posts/user/{user_id}`),
/// never the raw path, so per-user URLs do not explode cardinality.
#[derive(Clone, Default)]
pub struct MetricsMiddleware;

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests",
        &["method", "route", "status"]
    )
    .expect("register http_requests_total")
});

pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    prometheus::register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency",
        &["method", "route", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("register http_request_duration_seconds")
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    prometheus::register_int_gauge!(
        "http_requests_in_flight",
        "HTTP requests currently being served"
    )
    .expect("register http_requests_in_flight")
});

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = MetricsMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService { service }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
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
        let method = req.method().to_string();
        let fut = self.service.call(req);
        HTTP_REQUESTS_IN_FLIGHT.inc();

        Box::pin(async move {
            let res = fut.await;
            HTTP_REQUESTS_IN_FLIGHT.dec();
            let res = res?;
            let route = res
                .request()
                .match_pattern()
                .unwrap_or_else(|| "unmatched".to_string());
            let status = res.status().as_u16().to_string();
            let labels = [method.as_str(), route.as_str(), status.as_str()];

            HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();
            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&labels)
                .observe(start.elapsed().as_secs_f64());

            Ok(res)
        })
    }
}
