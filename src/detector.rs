// src/detector.rs

//! Framework fingerprinting from `package.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::FrameworkOptions;
use crate::logging::DebugSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    FileRouter,
    Controller,
    Rpc,
    ConfigCms,
}

impl Framework {
    pub const ALL: [Framework; 4] = [
        Framework::FileRouter,
        Framework::Controller,
        Framework::Rpc,
        Framework::ConfigCms,
    ];

    /// Packages whose presence marks the framework as in use.
    pub fn marker_packages(&self) -> &'static [&'static str] {
        match self {
            Framework::FileRouter => &["next"],
            Framework::Controller => &["@nestjs/core", "@nestjs/common"],
            Framework::Rpc => &["@trpc/server"],
            Framework::ConfigCms => &["payload"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::FileRouter => "file-router",
            Framework::Controller => "controller",
            Framework::Rpc => "rpc",
            Framework::ConfigCms => "config-cms",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Framework::ALL
            .into_iter()
            .find(|fw| fw.as_str() == s)
            .ok_or_else(|| format!("unknown framework `{s}` (expected one of: file-router, controller, rpc, config-cms)"))
    }
}

/// Which extractors apply to a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detection {
    pub file_router: bool,
    pub controller: bool,
    pub rpc: bool,
    pub config_cms: bool,
}

impl Detection {
    pub fn is_enabled(&self, framework: Framework) -> bool {
        match framework {
            Framework::FileRouter => self.file_router,
            Framework::Controller => self.controller,
            Framework::Rpc => self.rpc,
            Framework::ConfigCms => self.config_cms,
        }
    }

    pub fn set(&mut self, framework: Framework, enabled: bool) {
        match framework {
            Framework::FileRouter => self.file_router = enabled,
            Framework::Controller => self.controller = enabled,
            Framework::Rpc => self.rpc = enabled,
            Framework::ConfigCms => self.config_cms = enabled,
        }
    }

    pub fn any(&self) -> bool {
        Framework::ALL.into_iter().any(|fw| self.is_enabled(fw))
    }

    /// Applies forced and disabled frameworks from configuration.
    pub fn with_overrides(mut self, options: &FrameworkOptions) -> Self {
        for fw in &options.force {
            self.set(*fw, true);
        }
        for fw in &options.disable {
            self.set(*fw, false);
        }
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: HashMap<String, serde_json::Value>,
    #[serde(rename = "devDependencies", default)]
    dev_dependencies: HashMap<String, serde_json::Value>,
}

impl PackageManifest {
    fn declares(&self, package: &str) -> bool {
        self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
    }
}

/// Reads `<root>/package.json`. Unreadable or malformed manifests mean
/// nothing is detected.
pub fn detect(root: &Path, sink: &dyn DebugSink) -> Detection {
    let manifest_path = root.join("package.json");
    let manifest: PackageManifest = match fs::read_to_string(&manifest_path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(manifest) => manifest,
        Err(e) => {
            sink.debug(&format!("no usable manifest at {}: {e}", manifest_path.display()));
            return Detection::default();
        }
    };

    let mut detection = Detection::default();
    for fw in Framework::ALL {
        let present = fw.marker_packages().iter().any(|pkg| manifest.declares(pkg));
        detection.set(fw, present);
        if present {
            sink.info(&format!("detected {fw}"));
        }
    }
    detection
}
