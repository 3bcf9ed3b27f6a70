//! Request audit middleware

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::USER_AGENT, Request},
    response::Response,
};
use futures::future::BoxFuture;
use std::{
    net::SocketAddr,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};

use crate::gateway::audit::AuditLogger;
use crate::store::NewAuditEntry;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Audit layer
#[derive(Clone)]
pub struct AuditLayer {
    logger: AuditLogger,
}

impl AuditLayer {
    pub fn new(logger: AuditLogger) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            logger: self.logger.clone(),
        }
    }
}

/// Audit middleware service
#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    logger: AuditLogger,
}

/// What is known about a request before it is handled
struct RequestMeta {
    method: String,
    path: String,
    user_agent: Option<String>,
    client_address: String,
}

impl RequestMeta {
    fn capture(request: &Request<Body>) -> Self {
        let headers = request.headers();
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let client_address = headers
            .get(FORWARDED_FOR)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            user_agent,
            client_address,
        }
    }

    fn complete(self, status: u16, started: Instant) -> NewAuditEntry {
        NewAuditEntry {
            method: self.method,
            path: self.path,
            status: i32::from(status),
            duration_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
            user_agent: self.user_agent,
            client_address: self.client_address,
        }
    }
}

impl<S> Service<Request<Body>> for AuditMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let started = Instant::now();
        let meta = RequestMeta::capture(&request);
        let logger = self.logger.clone();
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            logger.record(meta.complete(response.status().as_u16(), started));
            Ok(response)
        })
    }
}
