// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DigestError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub source: String, // e.g., "Reuters", "CNBC"
    /// Provider description/summary; feeds the aggregated document only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexQuote {
    pub symbol: String,
    pub price: f64,
    /// Signed percentage vs. previous close.
    pub change: f64,
}

/// A news provider: one fetch, headlines or a typed failure.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Headline>, DigestError>;
    fn name(&self) -> &'static str;
}

/// A market-index provider.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quotes(&self) -> Result<Vec<IndexQuote>, DigestError>;
    fn name(&self) -> &'static str;
}
