// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::DigestError;
use crate::ingest::types::{Headline, IndexQuote, QuoteProvider, SourceProvider};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "digest_headlines_kept_total",
            "Headlines kept after dedup + cap."
        );
        describe_counter!(
            "digest_headlines_dedup_total",
            "Headlines removed as duplicates."
        );
        describe_histogram!("digest_fetch_ms", "Full aggregation time in milliseconds.");
        describe_gauge!("digest_last_fetch_ts", "Unix ts of the last successful fetch.");
    });
}

/// Clean provider text for display: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Dedup key: cleaned, lowercased title without trailing sentence punctuation, plus source.
pub fn dedup_key(h: &Headline) -> (String, String) {
    let mut title = clean_text(&h.title).to_lowercase();
    while let Some(last) = title.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            title.pop();
        } else {
            break;
        }
    }
    let title = title.trim_end().to_string();
    (title, clean_text(&h.source).to_lowercase())
}

/// Dedup (first seen wins), stable sort newest first, cap.
/// Returns (kept, dedup_count).
pub fn merge_headlines(raw: Vec<Headline>, max: usize) -> (Vec<Headline>, usize) {
    let mut seen = HashSet::new();
    let mut dedup_out = 0usize;
    let mut kept: Vec<Headline> = Vec::with_capacity(raw.len());

    for h in raw {
        if !seen.insert(dedup_key(&h)) {
            dedup_out += 1;
            continue;
        }
        kept.push(h);
    }

    // sort_by is stable: equal timestamps keep registration order
    kept.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    kept.truncate(max);
    (kept, dedup_out)
}

/// The free-text document handed to the analyzer.
pub fn build_document(headlines: &[Headline]) -> String {
    let mut out = String::new();
    for h in headlines {
        if h.source.is_empty() {
            out.push_str(&format!("Headline: {}\n", h.title));
        } else {
            out.push_str(&format!("Headline: {} ({})\n", h.title, h.source));
        }
        if let Some(snippet) = h.snippet.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("Summary: {snippet}\n"));
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregatedDigest {
    pub headlines: Vec<Headline>,
    pub indices: Vec<IndexQuote>,
    pub aggregated_text: String,
    pub timestamp: DateTime<Utc>,
}

/// Fan-out over all providers; per-provider failures degrade to partial results.
pub struct Aggregator {
    news: Vec<Box<dyn SourceProvider>>,
    quotes: Option<Box<dyn QuoteProvider>>,
    max_headlines: usize,
}

impl Aggregator {
    pub fn new(
        news: Vec<Box<dyn SourceProvider>>,
        quotes: Option<Box<dyn QuoteProvider>>,
        max_headlines: usize,
    ) -> Self {
        Self {
            news,
            quotes,
            max_headlines,
        }
    }

    pub async fn aggregate(&self) -> Result<AggregatedDigest, DigestError> {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let news_fut = join_all(self.news.iter().map(|p| async move {
            (p.name(), p.fetch_latest().await)
        }));
        let quotes_fut = async {
            match &self.quotes {
                Some(q) => match q.fetch_quotes().await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, provider = q.name(), "index provider error");
                        counter!("digest_provider_errors_total", "provider" => q.name())
                            .increment(1);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            }
        };
        let (news_results, indices) = tokio::join!(news_fut, quotes_fut);

        // join_all keeps input order, so merging follows registration order.
        let mut raw = Vec::new();
        let mut any_ok = false;
        for (name, res) in news_results {
            match res {
                Ok(mut v) => {
                    any_ok = true;
                    tracing::debug!(provider = name, items = v.len(), "provider ok");
                    raw.append(&mut v);
                }
                Err(e) => {
                    tracing::warn!(error = %e, provider = name, "provider error");
                    counter!("digest_provider_errors_total", "provider" => name).increment(1);
                }
            }
        }

        if !any_ok {
            tracing::error!(providers = self.news.len(), "all news providers failed");
            return Err(DigestError::NoDataAvailable);
        }

        let (headlines, dedup_cnt) = merge_headlines(raw, self.max_headlines);
        let aggregated_text = build_document(&headlines);
        let now = Utc::now();

        // Telemetry
        counter!("digest_headlines_kept_total").increment(headlines.len() as u64);
        counter!("digest_headlines_dedup_total").increment(dedup_cnt as u64);
        histogram!("digest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("digest_last_fetch_ts").set(now.timestamp() as f64);

        tracing::info!(
            kept = headlines.len(),
            dedup = dedup_cnt,
            indices = indices.len(),
            "aggregation finished"
        );

        Ok(AggregatedDigest {
            headlines,
            indices,
            aggregated_text,
            timestamp: now,
        })
    }
}
