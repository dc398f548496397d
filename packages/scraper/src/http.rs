//! Shared HTTP helpers.
//!
//! All data source fetchers go through [`get_text`] or [`get_json`] instead
//! of calling `reqwest` directly, so every request gets the same browser-ish
//! `User-Agent`, a fixed timeout, and uniform status handling. There is no
//! retry loop here: a failed request abandons the enclosing iteration step
//! (one month, one candidate URL) and the caller moves on to the next unit.

use std::time::Duration;

use crate::ScrapeError;

/// Per-request timeout. No call may block indefinitely.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Some report hosts reject default library user agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

/// Builds the shared HTTP client used by all adapters.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the TLS backend fails to initialize.
pub fn build_client() -> Result<reqwest::Client, ScrapeError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

/// Fetches a URL and returns the response body as text.
///
/// # Errors
///
/// Returns [`ScrapeError::NotFound`] on 404, [`ScrapeError::Status`] on any
/// other non-success status, and [`ScrapeError::Http`] on transport failure.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, ScrapeError> {
    let response = client.get(url).send().await?;
    let response = check_status(response)?;
    Ok(response.text().await?)
}

/// Fetches a URL and parses the response body as JSON.
///
/// # Errors
///
/// Status and transport errors as for [`get_text`];
/// [`ScrapeError::Parse`] if the body is not valid JSON.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<serde_json::Value, ScrapeError> {
    let response = client.get(url).query(query).send().await?;
    let response = check_status(response)?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        ScrapeError::Parse(format!("invalid JSON from {url}: {e} (body: {preview})"))
    })
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ScrapeError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ScrapeError::NotFound(response.url().to_string()));
    }
    if !status.is_success() {
        return Err(ScrapeError::Status {
            status,
            url: response.url().to_string(),
        });
    }
    Ok(response)
}
