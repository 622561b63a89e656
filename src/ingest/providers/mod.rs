// src/ingest/providers/mod.rs
pub mod finnhub;
pub mod newsapi;
pub mod yahoo_indices;

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::histogram;

use crate::config::HttpConfig;
use crate::error::DigestError;

pub use finnhub::FinnhubProvider;
pub use newsapi::NewsApiProvider;
pub use yahoo_indices::YahooIndexProvider;

/// One shared client for all providers; timeouts here are the only timeouts adapters get.
pub fn build_http_client(cfg: &HttpConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a request and return the body of a 2xx response.
/// URLs are stripped from transport errors so query strings never reach logs.
pub(crate) async fn fetch_body(
    provider: &'static str,
    req: reqwest::RequestBuilder,
) -> Result<String, DigestError> {
    let t0 = Instant::now();

    let resp = req.send().await.map_err(|e| {
        DigestError::source_unavailable(provider, format!("request failed: {}", e.without_url()))
    })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(DigestError::source_unavailable(
            provider,
            format!("HTTP {status}: {}", truncate_chars(&body, 200)),
        ));
    }

    let body = resp.text().await.map_err(|e| {
        DigestError::source_unavailable(provider, format!("reading body: {}", e.without_url()))
    })?;

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("digest_provider_fetch_ms", "provider" => provider).record(ms);

    Ok(body)
}

pub(crate) fn malformed(provider: &'static str, err: serde_json::Error) -> DigestError {
    DigestError::source_unavailable(provider, format!("malformed payload: {err}"))
}

/// RFC 3339 timestamps; anything unparseable sorts last (epoch).
pub(crate) fn parse_rfc3339_utc(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}
