//! HTTP middleware.

pub mod request_id;

use axum::{extract::Request, middleware::Next, response::Response};
use http::{HeaderValue, header::CACHE_CONTROL};

/// Marks every response as uncacheable.
pub async fn no_cache(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}
