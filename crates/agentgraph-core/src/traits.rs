use crate::types::AgentConfig;

/// Supplies per-node configuration.
pub trait ConfigResolver: Send + Sync {
    /// Resolve the config for `key`.
    ///
    /// Unknown keys must come back as `AgentConfig::disabled(key)` rather
    /// than failing.
    fn resolve(&self, key: &str) -> AgentConfig;
}

impl<F> ConfigResolver for F
where
    F: Fn(&str) -> AgentConfig + Send + Sync,
{
    fn resolve(&self, key: &str) -> AgentConfig {
        self(key)
    }
}
