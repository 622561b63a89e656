// src/config/ai.rs
use serde::{Deserialize, Serialize};

fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible Chat Completions API.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl AiConfig {
    pub(crate) fn sanitized(mut self) -> Self {
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        if self.model.trim().is_empty() {
            self.model = AiConfig::default().model;
        }
        self
    }
}
