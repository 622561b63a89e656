// src/ingest/providers/yahoo_indices.rs
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use super::{fetch_body, malformed};
use crate::config::IndicesConfig;
use crate::error::DigestError;
use crate::ingest::types::{IndexQuote, QuoteProvider};

const NAME: &str = "Yahoo";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Percentage change; a zero previous close yields 0 instead of infinity.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Parse one `/v8/finance/chart/{symbol}` payload into a quote.
/// Uses the last two non-null daily closes; falls back to meta prices when the series is empty.
pub fn parse_chart(symbol: &str, body: &str) -> Result<IndexQuote, DigestError> {
    let env: ChartEnvelope = serde_json::from_str(body).map_err(|e| malformed(NAME, e))?;

    if let Some(err) = env.chart.error {
        return Err(DigestError::source_unavailable(
            NAME,
            format!(
                "{symbol}: {}",
                err.description.unwrap_or_else(|| "chart error".into())
            ),
        ));
    }

    let result = env
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DigestError::source_unavailable(NAME, format!("{symbol}: empty result")))?;

    let closes: Vec<f64> = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .map(|q| q.close.into_iter().flatten().collect())
        .unwrap_or_default();

    let (current, previous) = match closes.as_slice() {
        [.., prev, last] => (*last, *prev),
        [only] => (*only, *only),
        [] => {
            let meta = result.meta.ok_or_else(|| {
                DigestError::source_unavailable(NAME, format!("{symbol}: no price data"))
            })?;
            let price = meta.regular_market_price.ok_or_else(|| {
                DigestError::source_unavailable(NAME, format!("{symbol}: no price data"))
            })?;
            (price, meta.chart_previous_close.unwrap_or(price))
        }
    };

    Ok(IndexQuote {
        symbol: symbol.to_string(),
        price: round2(current),
        change: round2(percent_change(current, previous)),
    })
}

/// Daily quotes for a fixed set of index symbols.
pub struct YahooIndexProvider {
    client: reqwest::Client,
    cfg: IndicesConfig,
}

impl YahooIndexProvider {
    pub fn new(client: reqwest::Client, cfg: IndicesConfig) -> Self {
        Self { client, cfg }
    }

    async fn fetch_one(&self, symbol: &str) -> Result<IndexQuote, DigestError> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.cfg.base_url.trim_end_matches('/'),
            urlencoding::encode(symbol)
        );
        let req = self
            .client
            .get(url)
            .query(&[("range", "5d"), ("interval", "1d")]);
        let body = fetch_body(NAME, req).await?;
        parse_chart(symbol, &body)
    }
}

#[async_trait]
impl QuoteProvider for YahooIndexProvider {
    /// Symbols that fail are skipped; the call fails only if all of them do.
    async fn fetch_quotes(&self) -> Result<Vec<IndexQuote>, DigestError> {
        let results = join_all(self.cfg.symbols.iter().map(|s| self.fetch_one(s))).await;

        let mut out = Vec::with_capacity(results.len());
        let mut last_err = None;
        for (symbol, res) in self.cfg.symbols.iter().zip(results) {
            match res {
                Ok(q) => out.push(q),
                Err(e) => {
                    tracing::warn!(error = %e, %symbol, "index quote unavailable");
                    last_err = Some(e);
                }
            }
        }

        match (out.is_empty(), last_err) {
            (true, Some(e)) => Err(e),
            _ => Ok(out),
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_uses_last_two_non_null_closes() {
        let body = r#"{"chart":{"result":[{
            "meta":{"symbol":"^GSPC","regularMarketPrice":5010.0,"chartPreviousClose":4900.0},
            "indicators":{"quote":[{"close":[4950.0, 5000.0, null, 5050.0, null]}]}
        }],"error":null}}"#;
        let q = parse_chart("^GSPC", body).unwrap();
        assert_eq!(q.symbol, "^GSPC");
        assert_eq!(q.price, 5050.0);
        assert_eq!(q.change, 1.0);
    }

    #[test]
    fn single_close_means_zero_change() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{"close":[17.234]}]}}],"error":null}}"#;
        let q = parse_chart("^VIX", body).unwrap();
        assert_eq!(q.price, 17.23);
        assert_eq!(q.change, 0.0);
    }

    #[test]
    fn empty_series_falls_back_to_meta() {
        let body = r#"{"chart":{"result":[{
            "meta":{"regularMarketPrice":39000.0,"chartPreviousClose":40000.0},
            "indicators":{"quote":[{"close":[]}]}
        }],"error":null}}"#;
        let q = parse_chart("^DJI", body).unwrap();
        assert_eq!(q.change, -2.5);
    }

    #[test]
    fn chart_error_is_source_unavailable() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("^NOPE", body).unwrap_err();
        assert!(err.to_string().contains("^NOPE"));
    }

    #[test]
    fn zero_previous_close_is_safe() {
        assert_eq!(percent_change(10.0, 0.0), 0.0);
    }
}
