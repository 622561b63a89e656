// src/ingest/providers/newsapi.rs
use async_trait::async_trait;
use chrono::{Duration, Utc};
use metrics::counter;
use serde::Deserialize;

use super::{fetch_body, malformed, parse_rfc3339_utc};
use crate::config::NewsApiConfig;
use crate::error::DigestError;
use crate::ingest::clean_text;
use crate::ingest::types::{Headline, SourceProvider};

const NAME: &str = "NewsAPI";

#[derive(Debug, Deserialize)]
struct Everything {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// Parse a `/v2/everything` payload. Articles without title or description are dropped.
pub fn parse_everything(body: &str) -> Result<Vec<Headline>, DigestError> {
    let resp: Everything = serde_json::from_str(body).map_err(|e| malformed(NAME, e))?;

    if resp.status.as_deref() == Some("error") {
        return Err(DigestError::source_unavailable(
            NAME,
            resp.message.unwrap_or_else(|| "provider returned error".into()),
        ));
    }

    let mut out = Vec::with_capacity(resp.articles.len());
    for it in resp.articles {
        let title = clean_text(it.title.as_deref().unwrap_or_default());
        let description = clean_text(it.description.as_deref().unwrap_or_default());
        // NewsAPI blanks out takedowns with this placeholder.
        if title.is_empty() || description.is_empty() || title == "[Removed]" {
            continue;
        }
        let source = it
            .source
            .and_then(|s| s.name)
            .map(|s| clean_text(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NAME.to_string());
        out.push(Headline {
            title,
            url: it.url.filter(|u| !u.trim().is_empty()),
            published_at: it
                .published_at
                .as_deref()
                .map(parse_rfc3339_utc)
                .unwrap_or_default(),
            source,
            snippet: Some(description),
        });
    }
    Ok(out)
}

/// Keyword search over general news.
pub struct NewsApiProvider {
    client: reqwest::Client,
    cfg: NewsApiConfig,
    api_key: Option<String>,
}

impl NewsApiProvider {
    pub fn new(client: reqwest::Client, cfg: NewsApiConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            cfg,
            api_key,
        }
    }
}

#[async_trait]
impl SourceProvider for NewsApiProvider {
    async fn fetch_latest(&self) -> Result<Vec<Headline>, DigestError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(DigestError::source_unavailable(NAME, "missing NEWSAPI_KEY"));
        };

        let from = (Utc::now() - Duration::hours(self.cfg.lookback_hours))
            .format("%Y-%m-%d")
            .to_string();
        let url = format!("{}/v2/everything", self.cfg.base_url.trim_end_matches('/'));
        let page_size = self.cfg.page_size.to_string();

        let req = self
            .client
            .get(url)
            .header("X-Api-Key", key)
            .query(&[
                ("q", self.cfg.query.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("from", from.as_str()),
                ("pageSize", page_size.as_str()),
            ]);

        let body = fetch_body(NAME, req).await?;
        let out = parse_everything(&body)?;
        counter!("digest_provider_items_total", "provider" => NAME).increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
