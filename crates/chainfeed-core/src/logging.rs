//! Tracing / logging initialisation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level. `None` defers to `RUST_LOG`, then `"info"`.
    #[serde(default)]
    pub level: Option<String>,
    /// Override per component: crate name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: None,
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Build the filter directive string, e.g. `"info,chainfeed_evm=debug"`.
    pub fn directives(&self) -> String {
        let base = self
            .level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        let mut directives = base;
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup; later calls are ignored.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_include_components() {
        let mut components = HashMap::new();
        components.insert("chainfeed-evm".to_string(), "debug".to_string());
        let cfg = LogConfig {
            level: Some("warn".into()),
            components,
            json: false,
        };
        assert_eq!(cfg.directives(), "warn,chainfeed_evm=debug");
    }
}
