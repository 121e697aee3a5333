use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Top-level agentgraph configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Traversal tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Longest path length (in edge hops) for which depths are recorded.
    /// Nodes discovered past this bound run after every bounded node.
    #[serde(default = "default_max_depth_limit")]
    pub max_depth_limit: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth_limit: default_max_depth_limit(),
        }
    }
}

/// Logging configuration for the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_max_depth_limit() -> usize { 10 }
fn default_log_filter() -> String { "agentgraph=info,warn".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| GraphError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| GraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.traversal.max_depth_limit == 0 {
            return Err(GraphError::Config(
                "traversal.max_depth_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Replace `${NAME}` with the value of env var `NAME`.
///
/// Unset variables and an unterminated `${` stay as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 2..];
        let Some(close) = tail.find('}') else {
            rest = &rest[open..];
            break;
        };
        let name = &tail[..close];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(&rest[open..open + close + 3]),
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_AGENTGRAPH_VAR", "debug");
        let result = expand_env_vars("filter = \"${TEST_AGENTGRAPH_VAR}\"");
        assert_eq!(result, "filter = \"debug\"");
        std::env::remove_var("TEST_AGENTGRAPH_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("filter = \"${NONEXISTENT_AGENTGRAPH_VAR}\"");
        assert_eq!(result, "filter = \"${NONEXISTENT_AGENTGRAPH_VAR}\"");
    }

    #[test]
    fn test_expand_env_vars_unterminated() {
        std::env::set_var("TEST_AGENTGRAPH_OPEN", "x");
        let result = expand_env_vars("a = \"${TEST_AGENTGRAPH_OPEN}\" b = \"${TEST_AGENTGRAPH_OPEN");
        assert_eq!(result, "a = \"x\" b = \"${TEST_AGENTGRAPH_OPEN");
        std::env::remove_var("TEST_AGENTGRAPH_OPEN");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.traversal.max_depth_limit, 10);
        assert_eq!(config.log.filter, "agentgraph=info,warn");
    }

    #[test]
    fn test_partial_sections() {
        let toml_str = r#"
[traversal]
max_depth_limit = 4
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.traversal.max_depth_limit, 4);
        assert_eq!(config.log.filter, "agentgraph=info,warn");
    }

    #[test]
    fn test_zero_depth_limit_rejected() {
        let config = AppConfig {
            traversal: TraversalConfig { max_depth_limit: 0 },
            log: LogConfig::default(),
        };
        assert!(matches!(config.validate(), Err(GraphError::Config(_))));
    }
}
