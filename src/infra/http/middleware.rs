use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::admin::AdminPrincipal;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Logs every 4xx/5xx once, draining the [`ErrorReport`] a handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let started = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let source = report.as_ref().map_or("unknown", |report| report.source);
    let chain = report.map(|report| report.messages).unwrap_or_default();
    // Set by the admin guard on the way out of authenticated handlers.
    let admin = response
        .extensions()
        .get::<AdminPrincipal>()
        .map(|principal| principal.username.as_str())
        .unwrap_or_default();

    macro_rules! emit {
        ($level:ident, $message:literal) => {
            $level!(
                target = "folio::http::response",
                status = status.as_u16(),
                %method,
                %path,
                elapsed_ms = started.elapsed().as_millis(),
                source,
                detail = chain.first().map_or("no diagnostic available", String::as_str),
                ?chain,
                %request_id,
                admin,
                $message,
            )
        };
    }

    if status.is_server_error() {
        emit!(error, "request failed");
    } else {
        emit!(warn, "client request error");
    }

    response
}
