//! Server configuration.

/// Request limits enforced by the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum records accepted in one push request.
    pub max_push_batch: u32,
    /// Maximum records returned in one pull response.
    pub max_pull_batch: u32,
    /// Page size used when a pull request names none.
    pub default_pull_limit: u32,
}

impl ServerConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_push_batch: 500,
            max_pull_batch: 1000,
            default_pull_limit: 200,
        }
    }

    /// Sets the maximum push batch size.
    pub fn with_max_push_batch(mut self, size: u32) -> Self {
        self.max_push_batch = size;
        self
    }

    /// Sets the maximum pull batch size.
    pub fn with_max_pull_batch(mut self, size: u32) -> Self {
        self.max_pull_batch = size;
        self
    }

    /// Sets the page size used when a request names none.
    pub fn with_default_pull_limit(mut self, size: u32) -> Self {
        self.default_pull_limit = size;
        self
    }

    /// The page size to serve for a requested `limit`.
    ///
    /// An absent limit falls back to the default; anything above
    /// `max_pull_batch` is clamped. Zero is passed through so the engine can
    /// reject it.
    pub fn effective_pull_limit(&self, limit: Option<u32>) -> u32 {
        limit
            .unwrap_or(self.default_pull_limit)
            .min(self.max_pull_batch)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_push_batch, 500);
        assert!(config.default_pull_limit <= config.max_pull_batch);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new()
            .with_max_push_batch(10)
            .with_max_pull_batch(50)
            .with_default_pull_limit(20);

        assert_eq!(config.max_push_batch, 10);
        assert_eq!(config.max_pull_batch, 50);
        assert_eq!(config.default_pull_limit, 20);
    }

    #[test]
    fn pull_limit_defaults_and_clamps() {
        let config = ServerConfig::new()
            .with_max_pull_batch(50)
            .with_default_pull_limit(20);
        assert_eq!(config.effective_pull_limit(None), 20);
        assert_eq!(config.effective_pull_limit(Some(5)), 5);
        assert_eq!(config.effective_pull_limit(Some(5000)), 50);
        assert_eq!(config.effective_pull_limit(Some(0)), 0);
    }
}
