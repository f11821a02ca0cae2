//! TOML configuration types for SQLGuard.
//!
//! The top-level [`AppConfig`] is deserialized from `sqlguard.toml`. Every
//! section and field is optional; missing values fall back to the defaults
//! shown below.
//!
//! # Example `sqlguard.toml`
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:8080"
//! upstream = "http://127.0.0.1:8000"
//! upstream_timeout_secs = 30
//!
//! [guard]
//! timing_header = "X-Detection-Time-ms"
//! extra_patterns = ["union\\s+select"]
//! ```

use std::path::Path;
use std::sync::{Arc, LazyLock};

use axum::http::HeaderName;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};
use crate::guard::{DEFAULT_PATTERNS, DEFAULT_TIMING_HEADER, Interceptor, PatternRegistry};

/// Listener and upstream settings (`[server]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the guard listens on.
    pub listen: String,
    /// Origin that clean requests are forwarded to.
    pub upstream: String,
    /// Upper bound on one upstream round trip.
    pub upstream_timeout_secs: u64,
}

impl ServerConfig {
    /// Expand `${VAR}` / `$VAR` placeholders in `listen` and `upstream`.
    fn expand_env_vars(&mut self) -> Result<()> {
        self.listen = substitute_env_vars(&self.listen)?;
        self.upstream = substitute_env_vars(&self.upstream)?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            upstream: "http://127.0.0.1:8000".to_string(),
            upstream_timeout_secs: 30,
        }
    }
}

/// Detection settings (`[guard]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Replaces the built-in pattern set when present.
    pub patterns: Option<Vec<String>>,
    /// Appended after the active pattern set.
    pub extra_patterns: Vec<String>,
    /// Response header that carries the detection time.
    pub timing_header: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            patterns: None,
            extra_patterns: Vec::new(),
            timing_header: DEFAULT_TIMING_HEADER.to_string(),
        }
    }
}

impl GuardConfig {
    /// The full ordered pattern list: base set followed by extras.
    pub fn active_patterns(&self) -> Vec<String> {
        let base = match &self.patterns {
            Some(patterns) => patterns.clone(),
            None => DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        };
        base.into_iter().chain(self.extra_patterns.iter().cloned()).collect()
    }

    /// Compile the pattern list into a registry.
    pub fn build_registry(&self) -> Result<PatternRegistry> {
        PatternRegistry::initialize(self.active_patterns())
    }

    /// Build the interceptor, failing on any invalid pattern or header name.
    pub fn build_interceptor(&self) -> Result<Interceptor> {
        let registry = Arc::new(self.build_registry()?);
        let header = HeaderName::try_from(self.timing_header.as_str())
            .map_err(|_| GuardError::InvalidTimingHeader(self.timing_header.clone()))?;
        Ok(Interceptor::new(registry).with_timing_header(header))
    }
}

/// Top-level application configuration deserialized from `sqlguard.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub guard: GuardConfig,
}

impl AppConfig {
    /// Load and parse the configuration from a TOML file at the given path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML text, then expand `${VAR}` and `$VAR` placeholders in the
    /// `[server]` string values. An error is returned if a referenced variable
    /// is not set. `[guard]` patterns are taken verbatim.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(content)?;
        config.server.expand_env_vars()?;
        Ok(config)
    }

    /// Like [`AppConfig::load_from_path`], but a missing file yields defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            tracing::info!("No config at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }
}

/// `${VAR_NAME}`
static ENV_BRACES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Failed to compile env var regex")
});

/// `$VAR_NAME`, uppercase only.
static ENV_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Z_][A-Z0-9_]*)").expect("Failed to compile env var regex"));

/// Replace `${VAR_NAME}` and `$VAR_NAME` placeholders with environment variable values.
///
/// Returns an error containing the variable name if the variable is not set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let lookup = |name: &str| {
        std::env::var(name).map_err(|_| GuardError::ConfigEnvVar(name.to_string()))
    };

    let mut result = input.to_string();
    for cap in ENV_BRACES.captures_iter(input) {
        let value = lookup(&cap[1])?;
        result = result.replace(&cap[0], &value);
    }

    let intermediate = result.clone();
    for cap in ENV_BARE.captures_iter(&intermediate) {
        let value = lookup(&cap[1])?;
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_builtin_patterns() {
        let config = AppConfig::default();
        assert_eq!(config.guard.active_patterns(), DEFAULT_PATTERNS);
        assert_eq!(config.server.listen, "127.0.0.1:8080");
    }

    #[test]
    fn extra_patterns_are_appended() {
        let guard = GuardConfig {
            extra_patterns: vec![r"union\s+select".to_string()],
            ..Default::default()
        };
        let patterns = guard.active_patterns();
        assert_eq!(patterns.len(), DEFAULT_PATTERNS.len() + 1);
        assert_eq!(patterns.last().unwrap(), r"union\s+select");
    }

    #[test]
    fn explicit_patterns_replace_defaults() {
        let guard = GuardConfig {
            patterns: Some(vec!["sleep\\(".to_string()]),
            ..Default::default()
        };
        assert_eq!(guard.active_patterns(), vec!["sleep\\(".to_string()]);
    }

    #[test]
    fn invalid_pattern_fails_interceptor_build() {
        let guard = GuardConfig {
            extra_patterns: vec!["[broken".to_string()],
            ..Default::default()
        };
        let err = guard.build_interceptor().unwrap_err();
        assert!(matches!(err, GuardError::InvalidPattern { index: 5, .. }));
    }

    #[test]
    fn invalid_header_name_fails_interceptor_build() {
        let guard = GuardConfig {
            timing_header: "bad header".to_string(),
            ..Default::default()
        };
        let err = guard.build_interceptor().unwrap_err();
        assert!(matches!(err, GuardError::InvalidTimingHeader(_)));
    }

    #[test]
    fn substitutes_braced_env_var() {
        // SAFETY: test-local variable name not read by other tests.
        unsafe { std::env::set_var("SQLGUARD_TEST_UPSTREAM", "http://10.0.0.5:9000") };
        let out = substitute_env_vars("upstream = \"${SQLGUARD_TEST_UPSTREAM}\"").unwrap();
        assert_eq!(out, "upstream = \"http://10.0.0.5:9000\"");
    }

    #[test]
    fn missing_env_var_is_reported() {
        let err =
            substitute_env_vars("listen = \"${SQLGUARD_TEST_DEFINITELY_UNSET}\"").unwrap_err();
        match err {
            GuardError::ConfigEnvVar(name) => assert_eq!(name, "SQLGUARD_TEST_DEFINITELY_UNSET"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn server_values_are_expanded_after_parsing() {
        // SAFETY: test-local variable name not read by other tests.
        unsafe { std::env::set_var("SQLGUARD_TEST_LISTEN_PORT", "9443") };
        let config = AppConfig::parse(
            r#"
[server]
listen = "0.0.0.0:${SQLGUARD_TEST_LISTEN_PORT}"
"#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9443");
    }

    #[test]
    fn dollar_in_patterns_is_not_substituted() {
        let config = AppConfig::parse(
            r#"
[guard]
patterns = ["end$"]
extra_patterns = ["\\$IFS_SQLGUARD_UNSET", "${SQLGUARD_UNSET}"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.guard.active_patterns(),
            vec!["end$", r"\$IFS_SQLGUARD_UNSET", "${SQLGUARD_UNSET}"]
        );
    }
}
