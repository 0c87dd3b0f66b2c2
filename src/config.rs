// src/config.rs

//! Scan options, loadable from a TOML file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::detector::Framework;
use crate::error::{Result, ScanError};
use crate::logging::DebugSink;

/// Matches callee names that look like router factories.
pub const DEFAULT_ROUTER_PATTERN: &str = r"^(?:create|make|build)?[A-Za-z0-9_]*Router$";

static DEFAULT_ROUTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_ROUTER_PATTERN).expect("default router pattern is valid"));

/// Top-level scan configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    #[serde(default)]
    pub frameworks: FrameworkOptions,
    #[serde(default)]
    pub rpc: RpcOptions,
    #[serde(default)]
    pub cms: CmsOptions,
}

/// Detection overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkOptions {
    /// Run these extractors even when the manifest does not mention them.
    #[serde(default)]
    pub force: Vec<Framework>,
    /// Never run these extractors.
    #[serde(default)]
    pub disable: Vec<Framework>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcOptions {
    /// Callee names treated as router factories.
    #[serde(default = "default_factory_names")]
    pub factory_names: Vec<String>,
    /// User-supplied replacement for [`DEFAULT_ROUTER_PATTERN`].
    #[serde(default)]
    pub router_pattern: Option<String>,
    /// Mount point of the RPC handler.
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsOptions {
    /// Candidate config entry points, relative to the project root.
    #[serde(default = "default_cms_config_files")]
    pub config_files: Vec<String>,
}

fn default_factory_names() -> Vec<String> {
    [
        "createRouter",
        "createTRPCRouter",
        "createProtectedRouter",
        "router",
        "t.router",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_rpc_endpoint() -> String {
    "/api/trpc".to_string()
}

fn default_cms_config_files() -> Vec<String> {
    [
        "payload.config.ts",
        "payload.config.js",
        "payload.config.mjs",
        "src/payload.config.ts",
        "src/payload.config.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            factory_names: default_factory_names(),
            router_pattern: None,
            endpoint: default_rpc_endpoint(),
        }
    }
}

impl Default for CmsOptions {
    fn default() -> Self {
        Self {
            config_files: default_cms_config_files(),
        }
    }
}

impl RpcOptions {
    /// Compiles the router pattern. An invalid user pattern is replaced by
    /// the default, with a warning.
    pub fn router_regex(&self, sink: &dyn DebugSink) -> Regex {
        match &self.router_pattern {
            Some(pattern) => match Regex::new(pattern) {
                Ok(regex) => regex,
                Err(e) => {
                    sink.warn(&format!(
                        "invalid router pattern `{pattern}` ({e}); using `{DEFAULT_ROUTER_PATTERN}`"
                    ));
                    DEFAULT_ROUTER_REGEX.clone()
                }
            },
            None => DEFAULT_ROUTER_REGEX.clone(),
        }
    }
}

impl ScanOptions {
    /// Load options from a TOML file. Unlike detection, a config file the
    /// caller named explicitly must exist and parse.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        toml::from_str(&contents).map_err(|e| ScanError::Config(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::FnSink;
    use std::cell::Cell;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_fill_missing_sections() {
        let options: ScanOptions = toml::from_str("[rpc]\nendpoint = \"/trpc\"\n").unwrap();
        assert_eq!(options.rpc.endpoint, "/trpc");
        assert!(options.rpc.factory_names.contains(&"createRouter".to_string()));
        assert!(options.frameworks.force.is_empty());
        assert_eq!(options.cms.config_files[0], "payload.config.ts");
    }

    #[test]
    fn loads_framework_overrides_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            "[frameworks]\nforce = [\"rpc\", \"config-cms\"]\ndisable = [\"controller\"]\n",
        )
        .unwrap();
        let options = ScanOptions::load(file.path()).unwrap();
        assert_eq!(options.frameworks.force, vec![Framework::Rpc, Framework::ConfigCms]);
        assert_eq!(options.frameworks.disable, vec![Framework::Controller]);
    }

    #[test]
    fn rejects_unknown_framework_names() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[frameworks]\nforce = [\"express\"]\n").unwrap();
        assert!(matches!(ScanOptions::load(file.path()), Err(ScanError::Config(_))));
    }

    #[test]
    fn invalid_router_pattern_falls_back_with_warning() {
        let warned = Cell::new(false);
        let sink = FnSink(|level: tracing::Level, _msg: &str| {
            if level == tracing::Level::WARN {
                warned.set(true);
            }
        });
        let options = RpcOptions {
            router_pattern: Some("(unclosed".to_string()),
            ..Default::default()
        };
        let regex = options.router_regex(&sink);
        assert!(warned.get());
        assert_eq!(regex.as_str(), DEFAULT_ROUTER_PATTERN);
        assert!(regex.is_match("createAdminRouter"));
    }

    #[test]
    fn custom_router_pattern_is_used() {
        let options = RpcOptions {
            router_pattern: Some("^mk[A-Z]".to_string()),
            ..Default::default()
        };
        let regex = options.router_regex(&crate::logging::NoopSink);
        assert!(regex.is_match("mkRoutes"));
        assert!(!regex.is_match("createRouter"));
    }
}
