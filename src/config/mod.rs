// src/config/mod.rs
pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use ai::AiConfig;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";

/// Full service configuration. Every field has a default so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub newsapi: NewsApiConfig,
    pub finnhub: FinnhubConfig,
    pub indices: IndicesConfig,
    pub aggregate: AggregateConfig,
    pub ai: AiConfig,
    pub usage_log: UsageLogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 4,
            user_agent: "market-digest/0.1 (+github.com/lumlich/market-digest)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    pub base_url: String,
    pub query: String,
    pub page_size: u32,
    pub lookback_hours: i64,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org".to_string(),
            query: "stock market OR finance OR economy OR trading OR investment".to_string(),
            page_size: 20,
            lookback_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FinnhubConfig {
    pub base_url: String,
    pub category: String,
    pub max_items: usize,
}

impl Default for FinnhubConfig {
    fn default() -> Self {
        Self {
            base_url: "https://finnhub.io".to_string(),
            category: "general".to_string(),
            max_items: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicesConfig {
    pub base_url: String,
    pub symbols: Vec<String>,
}

impl Default for IndicesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            // S&P 500, Dow Jones, NASDAQ, VIX
            symbols: ["^GSPC", "^DJI", "^IXIC", "^VIX"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub max_headlines: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self { max_headlines: 20 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UsageLogConfig {
    pub path: PathBuf,
}

impl Default for UsageLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("usage_log.csv"),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing digest config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load configuration using env var + fallbacks:
    /// 1) $DIGEST_CONFIG_PATH
    /// 2) config/digest.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Replace nonsensical values with defaults instead of failing startup.
    fn sanitized(mut self) -> Self {
        if self.newsapi.page_size == 0 {
            self.newsapi.page_size = NewsApiConfig::default().page_size;
        }
        if self.newsapi.lookback_hours <= 0 {
            self.newsapi.lookback_hours = NewsApiConfig::default().lookback_hours;
        }
        if self.finnhub.max_items == 0 {
            self.finnhub.max_items = FinnhubConfig::default().max_items;
        }
        if self.aggregate.max_headlines == 0 {
            self.aggregate.max_headlines = AggregateConfig::default().max_headlines;
        }
        if self.http.timeout_secs == 0 {
            self.http.timeout_secs = HttpConfig::default().timeout_secs;
        }
        if self.http.connect_timeout_secs == 0 {
            self.http.connect_timeout_secs = HttpConfig::default().connect_timeout_secs;
        }
        self.indices.symbols.retain(|s| !s.trim().is_empty());
        self.ai = self.ai.sanitized();
        self
    }
}

/// Provider credentials. Read from the process environment only, never from the TOML file.
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub newsapi: Option<String>,
    pub finnhub: Option<String>,
    pub openai: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        fn read(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            newsapi: read("NEWSAPI_KEY"),
            finnhub: read("FINNHUB_API_KEY"),
            openai: read("OPENAI_API_KEY"),
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn len(k: &Option<String>) -> usize {
            k.as_ref().map_or(0, String::len)
        }
        f.debug_struct("ApiKeys")
            .field("newsapi_len", &len(&self.newsapi))
            .field("finnhub_len", &len(&self.finnhub))
            .field("openai_len", &len(&self.openai))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.aggregate.max_headlines, 20);
        assert_eq!(cfg.finnhub.max_items, 15);
        assert_eq!(cfg.indices.symbols.len(), 4);
        assert_eq!(cfg.ai.max_tokens, 1500);
    }

    #[test]
    fn zero_caps_fall_back_to_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
[aggregate]
max_headlines = 0
[newsapi]
page_size = 0
[indices]
symbols = ["^GSPC", "  "]
"#,
        )
        .unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.aggregate.max_headlines, 20);
        assert_eq!(cfg.newsapi.page_size, 20);
        assert_eq!(cfg.indices.symbols, vec!["^GSPC".to_string()]);
    }

    #[test]
    fn api_keys_debug_never_prints_secrets() {
        let keys = ApiKeys {
            newsapi: Some("secret-news".into()),
            finnhub: None,
            openai: Some("sk-abc".into()),
        };
        let s = format!("{keys:?}");
        assert!(!s.contains("secret-news"));
        assert!(!s.contains("sk-abc"));
        assert!(s.contains("openai_len: 6"));
    }
}
