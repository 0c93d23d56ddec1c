use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::error::ProviderError;

const DEFAULT_TIMEOUT_SECS: u64 = 20;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide client; the first caller fixes the timeout.
pub fn http_client(timeout: Option<Duration>) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
            .build()
            .context("failed to build http client")
    })
}

/// GETs `url` and returns the body, mapping failure statuses onto `ProviderError`.
pub fn get_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    headers: &[(&str, &str)],
) -> Result<String, ProviderError> {
    let mut req = client
        .get(url)
        .query(query)
        .header(USER_AGENT, "card_bookings/0.1");
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    let resp = req.send()?;
    let status = resp.status();
    let body = resp.text()?;
    classify_status(status, body)
}

fn classify_status(status: StatusCode, body: String) -> Result<String, ProviderError> {
    if status.is_success() {
        return Ok(body);
    }
    Err(match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout,
        other => ProviderError::Http {
            status: other.as_u16(),
            body: body.chars().take(300).collect(),
        },
    })
}
