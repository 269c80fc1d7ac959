use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub enum ApiProvider {
    OpenAI,
    #[default]
    OpenRouter,
}

impl ApiProvider {
    pub fn base_url(&self) -> &'static str {
        match self {
            ApiProvider::OpenAI => "https://api.openai.com/v1/chat/completions",
            ApiProvider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApiProvider::OpenAI => "OpenAI",
            ApiProvider::OpenRouter => "OpenRouter",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ApiProvider::OpenAI => "gpt-4o-mini",
            ApiProvider::OpenRouter => "google/gemini-3-flash-preview",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub openrouter_api_key: String,
    pub model: String,
    #[serde(default)]
    pub provider: ApiProvider,
    /// Quiet period after the last edit before analysis fires.
    #[serde(default = "default_analysis_debounce")]
    pub analysis_debounce_ms: u64,
    /// Quiet period after the last edit before auto-save fires.
    #[serde(default = "default_autosave_debounce")]
    pub autosave_debounce_ms: u64,
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_analysis_debounce() -> u64 {
    1500
}

fn default_autosave_debounce() -> u64 {
    3000
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openrouter_api_key: String::new(),
            model: ApiProvider::default().default_model().to_string(),
            provider: ApiProvider::default(),
            analysis_debounce_ms: default_analysis_debounce(),
            autosave_debounce_ms: default_autosave_debounce(),
            cache_enabled: default_cache_enabled(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        confy::load("redraft", "config").unwrap_or_default()
    }

    pub fn save(&self) {
        let _ = confy::store("redraft", "config", self.clone());
    }

    pub fn api_key_for_provider(&self, provider: &ApiProvider) -> String {
        match provider {
            ApiProvider::OpenAI => self.openai_api_key.clone(),
            ApiProvider::OpenRouter => self.openrouter_api_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.cache_capacity, 100);
        assert_ne!(config.analysis_debounce_ms, config.autosave_debounce_ms);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"model": "gpt-4o-mini"}"#).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.cache_capacity, 100);
        assert!(config.cache_enabled);
    }
}
