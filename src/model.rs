// src/model.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// HTTP verbs a discovered route can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Verbs recognised as exported handler names by the nested-segment file router.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether a request with this verb usually carries a body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(format!("unknown HTTP method: {other}")),
        }
    }
}

/// Routing convention a route was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteType {
    FileRouterApp,
    FileRouterPages,
    Rpc,
    Controller,
    ConfigCms,
}

/// One bracketed path component, e.g. `[id]`, `[...slug]` or `[[...slug]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicSegment {
    pub name: String,
    pub is_catch_all: bool,
    pub is_optional: bool,
}

/// Where a config-object route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandlerSource {
    Collection,
    Global,
    Endpoint,
    Default,
}

/// Pre-aggregation record produced by every extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteHandler {
    pub name: Option<String>,
    pub path: String,
    pub method: HttpMethod,
    pub file: PathBuf,
    pub line: usize,
    pub collection_slug: Option<String>,
    pub source: Option<HandlerSource>,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub middleware: bool,
}

impl RouteHandler {
    pub fn new(path: impl Into<String>, method: HttpMethod, file: impl Into<PathBuf>, line: usize) -> Self {
        RouteHandler {
            name: None,
            path: path.into(),
            method,
            file: file.into(),
            line,
            collection_slug: None,
            source: None,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
            middleware: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_query_keys(mut self, keys: &[&str]) -> Self {
        for key in keys {
            self.query.insert((*key).to_string(), String::new());
        }
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The uniform record handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    /// Always starts with `/`; dynamic segments use `:name`, `:name+`, `:name*`.
    pub path: String,
    pub method: HttpMethod,
    pub file_path: PathBuf,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<DynamicSegment>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub middleware: bool,
    /// Config-object routes only: the owning collection or global.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<HandlerSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!(" Delete ".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn route_serializes_with_type_tag() {
        let route = Route {
            name: "GET /api".into(),
            path: "/api".into(),
            method: HttpMethod::Get,
            file_path: PathBuf::from("pages/api/index.ts"),
            route_type: RouteType::FileRouterPages,
            line: 1,
            headers: None,
            query: None,
            body: None,
            params: vec![],
            middleware: false,
            collection_slug: None,
            source: None,
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["type"], "file-router-pages");
        assert_eq!(json["method"], "GET");
        assert_eq!(json["filePath"], "pages/api/index.ts");
        assert!(json.get("headers").is_none());
        assert!(json.get("middleware").is_none());
        assert!(json.get("collectionSlug").is_none());
    }
}
