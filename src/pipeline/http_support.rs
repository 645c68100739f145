use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::GenerationError;

const REQUEST_TIMEOUT_SECS: u64 = 120;
const ERROR_BODY_LIMIT: usize = 512;

pub(crate) fn build_client(backend: &str) -> Result<Client, GenerationError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| GenerationError::backend(backend, format!("http client init failed: {e}")))
}

/// `HTTP <status>: <body>` with the body truncated to something loggable.
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let trimmed = body.trim();
    let body = match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    };
    format!("HTTP {status}: {body}")
}

pub(crate) fn transport_error(backend: &str, error: reqwest::Error) -> GenerationError {
    GenerationError::backend(backend, format!("request failed: {error}"))
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
