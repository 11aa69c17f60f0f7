//! Response handling shared by the HTTP calendar backends.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{ProviderError, ProviderResult};

/// Builds the HTTP client used for calendar calls.
pub(crate) fn client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("examsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            ProviderError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
        })
}

/// Maps a transport failure.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Reads the response body, failing unless `accept(status)`.
pub(crate) async fn read_body(
    response: reqwest::Response,
    context: &str,
    accept: impl Fn(StatusCode) -> bool,
) -> ProviderResult<String> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    if accept(status) {
        return Ok(body);
    }

    let context = match retry_after {
        Some(secs) if status == StatusCode::TOO_MANY_REQUESTS => {
            format!("{}, retry after {} seconds", context, secs)
        }
        _ => context.to_string(),
    };
    Err(ProviderError::from_response(status.as_u16(), body, context))
}
