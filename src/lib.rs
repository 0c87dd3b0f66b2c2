// src/lib.rs

//! Static discovery of HTTP endpoints in JavaScript / TypeScript projects.
//!
//! [`scan_project`] fingerprints the project from its `package.json`, runs
//! the extractor of every routing convention in use and returns one flat,
//! uniform list of [`Route`]s. Nothing from the inspected project is ever
//! executed.

pub mod aggregator;
pub mod config;
pub mod detector;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod model;
pub mod parser;
pub mod path_normalizer;
pub mod project;
pub mod resolver;
pub mod symbols;

use std::path::Path;

pub use aggregator::{aggregate, RouteSource};
pub use config::ScanOptions;
pub use detector::{Detection, Framework};
pub use error::{Result, ScanError};
pub use logging::{DebugSink, FnSink, NoopSink, TracingSink};
pub use model::{HttpMethod, Route, RouteType};

use extractors::file_router::ComparisonMethodDetector;
use extractors::rpc::KindClassifier;
use project::Project;

/// Scans `root` and returns every route found, grouped by convention in the
/// order file router (app, pages), controller, RPC, CMS.
///
/// Only a missing root is an error; unreadable files, unresolvable
/// references and unknown shapes are reported to `sink` and skipped.
pub fn scan_project(root: &Path, options: &ScanOptions, sink: &dyn DebugSink) -> Result<Vec<Route>> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    let detection = detector::detect(root, sink).with_overrides(&options.frameworks);
    if !detection.any() {
        sink.info(&format!("no supported framework detected in {}", root.display()));
        return Ok(Vec::new());
    }

    let project = Project::load(root, sink)?;
    let mut sources = Vec::new();
    if detection.file_router {
        let routes = extractors::file_router::extract(&project, &ComparisonMethodDetector, sink);
        sources.push(RouteSource::FileRouterApp(routes.app));
        sources.push(RouteSource::FileRouterPages(routes.pages));
    }
    if detection.controller {
        sources.push(RouteSource::Controller(extractors::controller::extract(&project, sink)));
    }
    if detection.rpc {
        sources.push(RouteSource::Rpc(extractors::rpc::extract(
            &project,
            &options.rpc,
            &KindClassifier,
            sink,
        )));
    }
    if detection.config_cms {
        sources.push(RouteSource::ConfigCms(extractors::config_cms::extract(
            &project,
            &options.cms,
            sink,
        )));
    }

    let routes = aggregate(sources);
    sink.info(&format!("found {} routes", routes.len()));
    Ok(routes)
}
