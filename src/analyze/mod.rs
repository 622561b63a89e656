// src/analyze/mod.rs
//! Summarization: fixed instruction template + one model call + usage record.

pub mod ai_adapter;

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;

use crate::analyze::ai_adapter::DynLlm;
use crate::error::DigestError;
use crate::ingest::types::IndexQuote;
use crate::usage_log::{InputType, UsageEntry, UsageRecorder};

pub const SYSTEM_PROMPT: &str =
    "You are an expert financial analyst providing clear, actionable market insights.";

/// Build the user instruction: three labeled sections, the text as context,
/// and an optional index block.
pub fn build_prompt(text: &str, indices: &[IndexQuote]) -> String {
    let mut prompt = String::from(
        "Analyze the following financial news and market data to provide:\n\n\
         1. **Top 5 Market Trends**: Identify the most significant trends affecting markets\n\
         2. **Actionable Investment Recommendations**: Provide 3-5 specific, actionable investment suggestions\n\
         3. **Key Risk Factors**: Highlight the most important risks investors should monitor\n\n\
         Financial News:\n",
    );
    prompt.push_str(text.trim());
    prompt.push('\n');

    if !indices.is_empty() {
        prompt.push_str("\nCurrent Market Indices:\n");
        for q in indices {
            prompt.push_str(&format!("{}: {:.2} ({:+.2}%)\n", q.symbol, q.price, q.change));
        }
    }

    prompt.push_str(
        "\nPlease format your response clearly with headers and bullet points for easy reading.",
    );
    prompt
}

pub struct Analyzer {
    client: DynLlm,
    usage: Arc<dyn UsageRecorder>,
}

impl Analyzer {
    pub fn new(client: DynLlm, usage: Arc<dyn UsageRecorder>) -> Self {
        Self { client, usage }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.name()
    }

    /// Blank input is rejected before any model call.
    pub async fn summarize(
        &self,
        text: &str,
        indices: &[IndexQuote],
        input_type: InputType,
    ) -> Result<String, DigestError> {
        if text.trim().is_empty() {
            return Err(DigestError::EmptyInput("No news text provided"));
        }

        let prompt = build_prompt(text, indices);
        let input_chars = text.chars().count();
        let result = self.client.complete(SYSTEM_PROMPT, &prompt).await;

        let (success, summary_chars) = match &result {
            Ok(s) => (true, s.chars().count()),
            Err(_) => (false, 0),
        };
        self.usage.record(&UsageEntry {
            ts: Utc::now(),
            input_type,
            input_chars,
            success,
            summary_chars,
        });

        match &result {
            Ok(_) => {
                counter!("digest_summaries_total").increment(1);
                tracing::info!(
                    provider = self.client.name(),
                    input_chars,
                    summary_chars,
                    "summary generated"
                );
            }
            Err(e) => {
                counter!("digest_summary_errors_total").increment(1);
                tracing::error!(provider = self.client.name(), error = %e, "AI analysis error");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_all_three_sections_and_indices() {
        let p = build_prompt(
            "  Headline: Fed holds  ",
            &[IndexQuote {
                symbol: "^VIX".into(),
                price: 17.5,
                change: -3.2,
            }],
        );
        assert!(p.contains("Top 5 Market Trends"));
        assert!(p.contains("Actionable Investment Recommendations"));
        assert!(p.contains("Key Risk Factors"));
        assert!(p.contains("Financial News:\nHeadline: Fed holds\n"));
        assert!(p.contains("^VIX: 17.50 (-3.20%)"));
    }

    #[test]
    fn prompt_without_indices_has_no_index_block() {
        let p = build_prompt("x", &[]);
        assert!(!p.contains("Current Market Indices"));
    }
}
