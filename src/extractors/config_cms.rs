// src/extractors/config_cms.rs

//! Config-object CMS: one `buildConfig({ collections, globals, endpoints })`
//! literal expands into a fixed REST surface per collection and global.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::config::CmsOptions;
use crate::extractors::callee_name;
use crate::logging::DebugSink;
use crate::model::{HandlerSource, HttpMethod, RouteHandler};
use crate::path_normalizer::{join_route, normalize_segment};
use crate::project::Project;
use crate::symbols::{ResolvedObject, SymbolResolver};

const CONFIG_FACTORY: &str = "buildConfig";
const DEFAULT_API_PREFIX: &str = "/api";

const JSON: &str = "application/json";
const MULTIPART: &str = "multipart/form-data";

const FIND_QUERY: [&str; 5] = ["depth", "limit", "page", "sort", "where"];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEndpoint {
    pub path: String,
    pub method: HttpMethod,
    /// Mounted outside the API prefix.
    pub root: bool,
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCollection {
    pub slug: String,
    pub auth: bool,
    pub upload: bool,
    pub endpoints: Vec<ParsedEndpoint>,
    /// File the collection literal was written in.
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGlobal {
    pub slug: String,
    pub endpoints: Vec<ParsedEndpoint>,
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig {
    /// Normalized: leading `/`, no trailing `/`, empty for a bare `/`.
    pub prefix: String,
    pub collections: Vec<ParsedCollection>,
    pub globals: Vec<ParsedGlobal>,
    pub endpoints: Vec<ParsedEndpoint>,
    pub file: PathBuf,
    pub line: usize,
}

struct Operation {
    name: &'static str,
    method: HttpMethod,
    suffix: &'static str,
    query: &'static [&'static str],
    body: Option<fn() -> Value>,
}

fn empty_body() -> Value {
    json!({})
}

fn login_body() -> Value {
    json!({ "email": "", "password": "" })
}

fn email_body() -> Value {
    json!({ "email": "" })
}

fn reset_body() -> Value {
    json!({ "token": "", "password": "" })
}

fn preference_body() -> Value {
    json!({ "value": {} })
}

static CRUD: [Operation; 8] = [
    Operation { name: "find", method: HttpMethod::Get, suffix: "", query: &FIND_QUERY, body: None },
    Operation { name: "findByID", method: HttpMethod::Get, suffix: "/:id", query: &["depth"], body: None },
    Operation { name: "count", method: HttpMethod::Get, suffix: "/count", query: &["where"], body: None },
    Operation { name: "create", method: HttpMethod::Post, suffix: "", query: &["depth"], body: Some(empty_body) },
    Operation { name: "update", method: HttpMethod::Patch, suffix: "", query: &["where"], body: Some(empty_body) },
    Operation { name: "updateByID", method: HttpMethod::Patch, suffix: "/:id", query: &[], body: Some(empty_body) },
    Operation { name: "delete", method: HttpMethod::Delete, suffix: "", query: &["where"], body: None },
    Operation { name: "deleteByID", method: HttpMethod::Delete, suffix: "/:id", query: &[], body: None },
];

static AUTH: [Operation; 8] = [
    Operation {
        name: "login",
        method: HttpMethod::Post,
        suffix: "/login",
        query: &[],
        body: Some(login_body),
    },
    Operation { name: "logout", method: HttpMethod::Post, suffix: "/logout", query: &[], body: None },
    Operation { name: "refresh", method: HttpMethod::Post, suffix: "/refresh-token", query: &[], body: None },
    Operation { name: "me", method: HttpMethod::Get, suffix: "/me", query: &[], body: None },
    Operation {
        name: "forgotPassword",
        method: HttpMethod::Post,
        suffix: "/forgot-password",
        query: &[],
        body: Some(email_body),
    },
    Operation {
        name: "resetPassword",
        method: HttpMethod::Post,
        suffix: "/reset-password",
        query: &[],
        body: Some(reset_body),
    },
    Operation {
        name: "unlock",
        method: HttpMethod::Post,
        suffix: "/unlock",
        query: &[],
        body: Some(email_body),
    },
    Operation { name: "verifyEmail", method: HttpMethod::Post, suffix: "/verify/:token", query: &[], body: None },
];

static GLOBAL: [Operation; 2] = [
    Operation { name: "findOne", method: HttpMethod::Get, suffix: "", query: &["depth"], body: None },
    Operation { name: "update", method: HttpMethod::Post, suffix: "", query: &[], body: Some(empty_body) },
];

/// Appended once per config, relative to the API prefix.
static DEFAULTS: [Operation; 4] = [
    Operation {
        name: "findPreference",
        method: HttpMethod::Get,
        suffix: "/payload-preferences/:key",
        query: &[],
        body: None,
    },
    Operation {
        name: "updatePreference",
        method: HttpMethod::Post,
        suffix: "/payload-preferences/:key",
        query: &[],
        body: Some(preference_body),
    },
    Operation {
        name: "deletePreference",
        method: HttpMethod::Delete,
        suffix: "/payload-preferences/:key",
        query: &[],
        body: None,
    },
    Operation { name: "access", method: HttpMethod::Get, suffix: "/access", query: &[], body: None },
];

/// `api` and `/api/` become `/api`; a bare `/` becomes the empty prefix.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Joins route pieces that may themselves contain `/`.
fn route(pieces: &[&str]) -> String {
    let segments: Vec<String> = pieces
        .iter()
        .flat_map(|piece| piece.split('/'))
        .filter(|s| !s.is_empty())
        .map(normalize_segment)
        .collect();
    join_route(&segments)
}

/// Finds the root config literal: a `buildConfig(...)` call or default
/// export in one of the configured entry files, then any `buildConfig`
/// call in the project.
pub fn locate_config(
    resolver: &SymbolResolver<'_>,
    options: &CmsOptions,
    sink: &dyn DebugSink,
) -> Option<ParsedConfig> {
    let project = resolver.project();
    let is_factory = |call: &swc_ecma_ast::CallExpr| callee_name(call).as_deref() == Some(CONFIG_FACTORY);

    for candidate in &options.config_files {
        let Some(file) = project.file_id(&project.root().join(candidate)) else {
            continue;
        };
        for call in project.find_calls_in(file, is_factory) {
            let Some(arg) = call.args.first() else {
                continue;
            };
            if let Some(root) = resolver.resolve_object(file, &arg.expr) {
                sink.debug(&format!("cms config found in {candidate}"));
                return Some(parse_config(resolver, root));
            }
        }
        if let Some(root) = resolver.exported_object(file, "default") {
            sink.debug(&format!("cms config is the default export of {candidate}"));
            return Some(parse_config(resolver, root));
        }
    }

    for (file, call) in project.find_calls(is_factory) {
        let Some(arg) = call.args.first() else {
            continue;
        };
        if let Some(root) = resolver.resolve_object(file, &arg.expr) {
            sink.debug(&format!("cms config found in {}", project.file(file).rel_path));
            return Some(parse_config(resolver, root));
        }
    }
    sink.debug("no cms config literal found");
    None
}

fn location(resolver: &SymbolResolver<'_>, object: ResolvedObject<'_>) -> (PathBuf, usize) {
    let file = resolver.project().file(object.file);
    (file.path().to_path_buf(), file.line_of(object.object.span))
}

/// Reads the collections, globals, endpoints and prefix out of a resolved
/// config literal. Entries that cannot be resolved are skipped.
pub fn parse_config(resolver: &SymbolResolver<'_>, root: ResolvedObject<'_>) -> ParsedConfig {
    let prefix = resolver
        .property_object(root, "routes")
        .and_then(|routes| resolver.property_string(routes, "api"))
        .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string());

    let collections = resolver
        .property_array(root, "collections")
        .into_iter()
        .filter_map(|object| {
            let slug = resolver.property_string(object, "slug")?;
            let (file, line) = location(resolver, object);
            Some(ParsedCollection {
                auth: resolver.property_flag(object, "auth").unwrap_or(false),
                upload: resolver.property_flag(object, "upload").unwrap_or(false),
                endpoints: parse_endpoints(resolver, object),
                slug,
                file,
                line,
            })
        })
        .collect();

    let globals = resolver
        .property_array(root, "globals")
        .into_iter()
        .filter_map(|object| {
            let slug = resolver.property_string(object, "slug")?;
            let (file, line) = location(resolver, object);
            Some(ParsedGlobal {
                endpoints: parse_endpoints(resolver, object),
                slug,
                file,
                line,
            })
        })
        .collect();

    let (file, line) = location(resolver, root);
    ParsedConfig {
        prefix: normalize_prefix(&prefix),
        collections,
        globals,
        endpoints: parse_endpoints(resolver, root),
        file,
        line,
    }
}

fn parse_endpoints(resolver: &SymbolResolver<'_>, owner: ResolvedObject<'_>) -> Vec<ParsedEndpoint> {
    if resolver.property_flag(owner, "endpoints") == Some(false) {
        return Vec::new();
    }
    resolver
        .property_array(owner, "endpoints")
        .into_iter()
        .filter_map(|object| {
            let path = resolver.property_string(object, "path")?;
            let method = resolver
                .property_string(object, "method")
                .and_then(|m| m.parse().ok())
                .unwrap_or(HttpMethod::Get);
            let (file, line) = location(resolver, object);
            Some(ParsedEndpoint {
                path,
                method,
                root: resolver.property_flag(object, "root").unwrap_or(false),
                file,
                line,
            })
        })
        .collect()
}

fn operation_route(
    op: &Operation,
    base: &str,
    file: &Path,
    line: usize,
    source: HandlerSource,
    content_type: &str,
) -> RouteHandler {
    let mut handler = RouteHandler::new(route(&[base, op.suffix]), op.method, file, line)
        .with_query_keys(op.query);
    handler.source = Some(source);
    if let Some(body) = op.body {
        handler = handler.with_body(body()).with_header("Content-Type", content_type);
    }
    handler
}

fn endpoint_route(endpoint: &ParsedEndpoint, path: String, source: HandlerSource, slug: Option<&str>) -> RouteHandler {
    let mut handler = RouteHandler::new(path, endpoint.method, endpoint.file.clone(), endpoint.line);
    handler.source = Some(source);
    handler.collection_slug = slug.map(str::to_string);
    if endpoint.method.has_body() {
        handler = handler.with_header("Content-Type", JSON);
    }
    handler
}

/// Expands a parsed config into routes: collections, then globals, then
/// root endpoints, then the defaults.
pub fn routes_for(config: &ParsedConfig) -> Vec<RouteHandler> {
    let prefix = config.prefix.as_str();
    let mut handlers = Vec::new();

    for collection in &config.collections {
        let base = route(&[prefix, collection.slug.as_str()]);
        let mut ops: Vec<&Operation> = CRUD.iter().collect();
        if collection.auth {
            ops.extend(AUTH.iter());
        }
        for op in ops {
            let content_type = if collection.upload && op.name == "create" { MULTIPART } else { JSON };
            let mut handler = operation_route(
                op,
                &base,
                &collection.file,
                collection.line,
                HandlerSource::Collection,
                content_type,
            )
            .named(format!("{}.{}", collection.slug, op.name));
            handler.collection_slug = Some(collection.slug.clone());
            handlers.push(handler);
        }
        for endpoint in &collection.endpoints {
            let path = route(&[base.as_str(), endpoint.path.as_str()]);
            handlers.push(endpoint_route(endpoint, path, HandlerSource::Endpoint, Some(collection.slug.as_str())));
        }
    }

    for global in &config.globals {
        let base = route(&[prefix, "globals", global.slug.as_str()]);
        for op in &GLOBAL {
            let mut handler = operation_route(op, &base, &global.file, global.line, HandlerSource::Global, JSON)
                .named(format!("globals.{}.{}", global.slug, op.name));
            handler.collection_slug = Some(global.slug.clone());
            handlers.push(handler);
        }
        for endpoint in &global.endpoints {
            let path = route(&[base.as_str(), endpoint.path.as_str()]);
            handlers.push(endpoint_route(endpoint, path, HandlerSource::Endpoint, Some(global.slug.as_str())));
        }
    }

    for endpoint in &config.endpoints {
        let path = if endpoint.root {
            route(&[endpoint.path.as_str()])
        } else {
            route(&[prefix, endpoint.path.as_str()])
        };
        handlers.push(endpoint_route(endpoint, path, HandlerSource::Endpoint, None));
    }

    for op in &DEFAULTS {
        handlers.push(
            operation_route(op, prefix, &config.file, config.line, HandlerSource::Default, JSON).named(op.name),
        );
    }
    handlers
}

pub fn extract(project: &Project, options: &CmsOptions, sink: &dyn DebugSink) -> Vec<RouteHandler> {
    let resolver = SymbolResolver::new(project, sink);
    let Some(config) = locate_config(&resolver, options, sink) else {
        return Vec::new();
    };
    let handlers = routes_for(&config);
    sink.info(&format!(
        "config cms: {} collections, {} globals, {} routes",
        config.collections.len(),
        config.globals.len(),
        handlers.len()
    ));
    handlers
}
