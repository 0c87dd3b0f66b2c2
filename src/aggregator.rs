// src/aggregator.rs

use std::collections::BTreeMap;

use crate::model::{Route, RouteHandler, RouteType};
use crate::path_normalizer::extract_dynamic_segments;

/// Output of one extractor, tagged by convention.
#[derive(Debug)]
pub enum RouteSource {
    FileRouterApp(Vec<RouteHandler>),
    FileRouterPages(Vec<RouteHandler>),
    Rpc(Vec<RouteHandler>),
    Controller(Vec<RouteHandler>),
    ConfigCms(Vec<RouteHandler>),
}

fn non_empty<V>(map: BTreeMap<String, V>) -> Option<BTreeMap<String, V>> {
    (!map.is_empty()).then_some(map)
}

fn to_route(handler: RouteHandler, route_type: RouteType) -> Route {
    let name = handler
        .name
        .unwrap_or_else(|| format!("{} {}", handler.method, handler.path));
    Route {
        name,
        params: extract_dynamic_segments(&handler.path),
        path: handler.path,
        method: handler.method,
        file_path: handler.file,
        route_type,
        line: handler.line,
        headers: non_empty(handler.headers),
        query: non_empty(handler.query),
        body: handler.body,
        middleware: handler.middleware,
        collection_slug: handler.collection_slug,
        source: handler.source,
    }
}

/// Flattens extractor output into routes, preserving source order.
pub fn aggregate(sources: Vec<RouteSource>) -> Vec<Route> {
    let mut routes = Vec::new();
    for source in sources {
        let (handlers, route_type) = match source {
            RouteSource::FileRouterApp(h) => (h, RouteType::FileRouterApp),
            RouteSource::FileRouterPages(h) => (h, RouteType::FileRouterPages),
            RouteSource::Rpc(h) => (h, RouteType::Rpc),
            RouteSource::Controller(h) => (h, RouteType::Controller),
            RouteSource::ConfigCms(h) => (h, RouteType::ConfigCms),
        };
        routes.extend(handlers.into_iter().map(|h| to_route(h, route_type)));
    }
    routes
}
