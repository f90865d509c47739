//! Engine configuration from the environment

/// Runtime configuration for the chat engine
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chat backend, no trailing slash
    pub api_url: String,
    /// Model id to use when the backend doesn't recognize a request's model
    pub default_model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            default_model: None,
        }
    }
}

impl Config {
    /// Reads `IICHAT_API_URL` and `IICHAT_MODEL`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_url = std::env::var("IICHAT_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or(defaults.api_url, |v| v.trim_end_matches('/').to_string());
        let default_model = std::env::var("IICHAT_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self {
            api_url,
            default_model,
        }
    }
}
