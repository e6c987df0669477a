//! Store and engine configuration.

/// Configuration for opening a journaled authority store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to sync the journal on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Whether a torn trailing frame is cut off on open. When false, opening
    /// a journal with a torn tail fails instead.
    pub repair_torn_tail: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
            repair_torn_tail: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to sync the journal on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets whether a torn trailing frame is repaired on open.
    #[must_use]
    pub const fn repair_torn_tail(mut self, value: bool) -> Self {
        self.repair_torn_tail = value;
        self
    }
}

/// Limits enforced by the sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest accepted push batch; larger batches fail validation.
    pub max_push_batch: usize,

    /// Largest page a pull may ask for; bigger limits are clamped.
    pub max_pull_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_push_batch: 1000,
            max_pull_limit: 5000,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest accepted push batch.
    #[must_use]
    pub const fn max_push_batch(mut self, size: usize) -> Self {
        self.max_push_batch = size;
        self
    }

    /// Sets the largest pull page.
    #[must_use]
    pub const fn max_pull_limit(mut self, size: usize) -> Self {
        self.max_pull_limit = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert!(config.sync_on_commit);
        assert!(config.repair_torn_tail);

        let engine = EngineConfig::default();
        assert_eq!(engine.max_push_batch, 1000);
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .sync_on_commit(false)
            .repair_torn_tail(false);
        assert!(!config.sync_on_commit);
        assert!(!config.repair_torn_tail);

        let engine = EngineConfig::new().max_push_batch(10).max_pull_limit(3);
        assert_eq!(engine.max_push_batch, 10);
        assert_eq!(engine.max_pull_limit, 3);
    }
}
