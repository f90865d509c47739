//! Model catalog and id resolution

use crate::error::ChatError;
use crate::transport::Transport;

/// Model ids the backend advertises, plus the configured default
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    available: Vec<String>,
    default_model: Option<String>,
}

impl ModelCatalog {
    pub fn new(available: Vec<String>, default_model: Option<String>) -> Self {
        Self {
            available,
            default_model,
        }
    }

    /// Fetches the advertised model list. An unreachable catalog endpoint
    /// degrades to an empty list rather than failing startup.
    pub async fn fetch(
        transport: &dyn Transport,
        default_model: Option<String>,
    ) -> Result<Self, ChatError> {
        let available = transport.list_models().await?;
        Ok(Self::new(available, default_model))
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    /// Resolves a requested model id against the catalog. Unknown ids fall
    /// back to the default. With an empty catalog the requested id is
    /// trusted as-is so the backend can apply its own fallback.
    pub fn resolve(&self, requested: Option<&str>) -> Option<String> {
        match requested {
            Some(id) if self.available.is_empty() => Some(id.to_string()),
            Some(id) if self.available.iter().any(|m| m == id) => Some(id.to_string()),
            _ => self.default_model.clone(),
        }
    }
}
