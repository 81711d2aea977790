use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Logs one line per request. Bodies are never logged: secret payloads and
/// webhook deliveries both carry credentials.
pub async fn log_gateway_request(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().as_str().to_string();
    let route = request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |matched_path| matched_path.as_str().to_string(),
    );
    let handler = gateway_method_name(&method, &route);

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    tracing::info!(
        %request_id,
        method = %method,
        route = %route,
        handler,
        status = response.status().as_u16(),
        elapsed_ms,
        "request handled"
    );

    response
}

fn gateway_method_name(method: &str, route: &str) -> &'static str {
    match (method, route) {
        ("POST", "/webhooks") => "webhook.webhooks",
        ("GET", "/api/v1alpha/:parent_kind/:parent_ref/secrets") => "secrets.list_secrets",
        ("POST", "/api/v1alpha/:parent_kind/:parent_ref/secrets") => {
            "secrets.create_secret_handler"
        }
        ("PUT", "/api/v1alpha/:parent_kind/:parent_ref/secrets/:secret_name") => {
            "secrets.update_secret_handler"
        }
        ("DELETE", "/api/v1alpha/:parent_kind/:parent_ref/secrets/:secret_name") => {
            "secrets.delete_secret_handler"
        }
        _ => "unknown.unknown_handler",
    }
}
