// src/ingest/providers/finnhub.rs
use async_trait::async_trait;
use chrono::DateTime;
use metrics::counter;
use serde::Deserialize;

use super::{fetch_body, malformed};
use crate::config::FinnhubConfig;
use crate::error::DigestError;
use crate::ingest::clean_text;
use crate::ingest::types::{Headline, SourceProvider};

const NAME: &str = "Finnhub";

#[derive(Debug, Deserialize)]
struct MarketNews {
    headline: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    datetime: i64,
    source: Option<String>,
}

/// Parse a `/api/v1/news` payload, looking at the first `max_items` entries only.
pub fn parse_market_news(body: &str, max_items: usize) -> Result<Vec<Headline>, DigestError> {
    let items: Vec<MarketNews> = serde_json::from_str(body).map_err(|e| malformed(NAME, e))?;

    let out = items
        .into_iter()
        .take(max_items)
        .filter_map(|it| {
            let title = clean_text(it.headline.as_deref().unwrap_or_default());
            let summary = clean_text(it.summary.as_deref().unwrap_or_default());
            if title.is_empty() || summary.is_empty() {
                return None;
            }
            let source = it
                .source
                .map(|s| clean_text(&s))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NAME.to_string());
            Some(Headline {
                title,
                url: it.url.filter(|u| !u.trim().is_empty()),
                published_at: DateTime::from_timestamp(it.datetime, 0).unwrap_or_default(),
                source,
                snippet: Some(summary),
            })
        })
        .collect();
    Ok(out)
}

/// Category feed of market news.
pub struct FinnhubProvider {
    client: reqwest::Client,
    cfg: FinnhubConfig,
    api_key: Option<String>,
}

impl FinnhubProvider {
    pub fn new(client: reqwest::Client, cfg: FinnhubConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            cfg,
            api_key,
        }
    }
}

#[async_trait]
impl SourceProvider for FinnhubProvider {
    async fn fetch_latest(&self) -> Result<Vec<Headline>, DigestError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(DigestError::source_unavailable(NAME, "missing FINNHUB_API_KEY"));
        };

        let url = format!("{}/api/v1/news", self.cfg.base_url.trim_end_matches('/'));
        let req = self
            .client
            .get(url)
            .header("X-Finnhub-Token", key)
            .query(&[("category", self.cfg.category.as_str())]);

        let body = fetch_body(NAME, req).await?;
        let out = parse_market_news(&body, self.cfg.max_items)?;
        counter!("digest_provider_items_total", "provider" => NAME).increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
