#![allow(dead_code)]

use std::fs;
use std::path::Path;

use route_scanner::project::Project;
use route_scanner::{HttpMethod, NoopSink, Route};
use tempfile::TempDir;

/// Writes `files` (relative path, contents) under a fresh temporary root.
pub fn project_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }
    dir
}

pub fn load(dir: &Path) -> Project {
    Project::load(dir, &NoopSink).unwrap()
}

pub fn manifest(deps: &[&str]) -> String {
    let deps: Vec<String> = deps.iter().map(|d| format!("\"{d}\": \"*\"")).collect();
    format!("{{ \"dependencies\": {{ {} }} }}", deps.join(", "))
}

/// `"GET /path"` pairs, in order.
pub fn signatures(routes: &[Route]) -> Vec<String> {
    routes.iter().map(|r| format!("{} {}", r.method, r.path)).collect()
}

pub fn has(routes: &[Route], method: HttpMethod, path: &str) -> bool {
    routes.iter().any(|r| r.method == method && r.path == path)
}
