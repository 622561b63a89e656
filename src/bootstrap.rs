// src/bootstrap.rs
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::analyze::ai_adapter::build_provider_from_config;
use crate::analyze::Analyzer;
use crate::api::AppState;
use crate::config::{ApiKeys, AppConfig};
use crate::ingest::providers::{
    build_http_client, FinnhubProvider, NewsApiProvider, YahooIndexProvider,
};
use crate::ingest::types::SourceProvider;
use crate::ingest::Aggregator;
use crate::usage_log::{CsvUsageLog, UsageRecorder};

/// Build every long-lived component once; nothing here is global.
pub fn build_state(
    cfg: &AppConfig,
    keys: ApiKeys,
    usage: Arc<dyn UsageRecorder>,
) -> anyhow::Result<AppState> {
    // Safe diagnostics: only key lengths, never the keys.
    info!(?keys, model = %cfg.ai.model, ai_enabled = cfg.ai.enabled, "digest config loaded");

    let http = build_http_client(&cfg.http).context("building http client")?;

    let news: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(NewsApiProvider::new(
            http.clone(),
            cfg.newsapi.clone(),
            keys.newsapi.clone(),
        )),
        Box::new(FinnhubProvider::new(
            http.clone(),
            cfg.finnhub.clone(),
            keys.finnhub.clone(),
        )),
    ];
    let quotes = Box::new(YahooIndexProvider::new(http.clone(), cfg.indices.clone()));
    let aggregator = Aggregator::new(news, Some(quotes), cfg.aggregate.max_headlines);

    let llm = build_provider_from_config(&cfg.ai, keys.openai, http);
    let analyzer = Analyzer::new(llm, usage);
    info!(provider = analyzer.provider_name(), "AI provider ready");

    Ok(AppState::new(aggregator, analyzer))
}

/// Production wiring: config from disk/env, CSV usage log.
pub fn build_state_from_env() -> anyhow::Result<AppState> {
    let cfg = AppConfig::load_default()?;
    let usage = CsvUsageLog::open(&cfg.usage_log.path).with_context(|| {
        format!("opening usage log {}", cfg.usage_log.path.display())
    })?;
    info!(path = %usage.path().display(), "usage log ready");
    build_state(&cfg, ApiKeys::from_env(), Arc::new(usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage_log::MemoryUsageLog;

    #[test]
    fn disabled_ai_wires_the_disabled_provider() {
        let mut cfg = AppConfig::default();
        cfg.ai.enabled = false;
        let state = build_state(&cfg, ApiKeys::default(), Arc::new(MemoryUsageLog::new()))
            .expect("state");
        assert_eq!(state.analyzer.provider_name(), "disabled");
    }
}
