use serde::{Deserialize, Serialize};

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration struct for Gemini API
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    /// Never read from or written to config files, only from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
    /// Instructions placed ahead of the document in the context turn
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: None,
            temperature: None,
        }
    }
}

impl GeminiConfig {
    /// Takes the API key from the process environment when it is set there.
    /// Empty values count as unset.
    pub fn with_env_api_key(mut self) -> Self {
        if let Some(key) = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
        {
            self.api_key = Some(key);
        }
        self
    }
}
