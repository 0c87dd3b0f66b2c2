mod common;

use std::cell::RefCell;

use common::{manifest, project_dir, signatures};
use pretty_assertions::assert_eq;
use route_scanner::detector::Framework;
use route_scanner::{scan_project, FnSink, NoopSink, RouteType, ScanError, ScanOptions};

#[test]
fn missing_root_is_an_error() {
    let dir = project_dir(&[]);
    let missing = dir.path().join("nope");
    let err = scan_project(&missing, &ScanOptions::default(), &NoopSink).unwrap_err();
    assert!(matches!(err, ScanError::RootNotFound(path) if path == missing));
}

#[test]
fn nothing_detected_means_no_routes() {
    let dir = project_dir(&[("app/api/route.ts", "export function GET() {}\n")]);
    assert!(scan_project(dir.path(), &ScanOptions::default(), &NoopSink).unwrap().is_empty());
}

#[test]
fn forced_and_disabled_frameworks() {
    let dir = project_dir(&[
        ("package.json", manifest(&["next"]).as_str()),
        ("app/api/route.ts", "export function GET() {}\n"),
        ("server.ts", "export const appRouter = createRouter().query('ping', {});\n"),
    ]);

    let mut options = ScanOptions::default();
    options.frameworks.force.push(Framework::Rpc);
    let routes = scan_project(dir.path(), &options, &NoopSink).unwrap();
    let types: Vec<RouteType> = routes.iter().map(|r| r.route_type).collect();
    assert_eq!(types, vec![RouteType::FileRouterApp, RouteType::Rpc]);

    options.frameworks.disable.push(Framework::FileRouter);
    let routes = scan_project(dir.path(), &options, &NoopSink).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path, "/api/trpc/app.ping");
}

#[test]
fn mixed_project_serializes_uniformly() {
    let dir = project_dir(&[
        ("package.json", manifest(&["next", "@trpc/server", "payload"]).as_str()),
        ("src/app/api/items/[id]/route.ts", "export const PATCH = () => {};\n"),
        ("src/pages/api/legacy.ts", "export default function h(req) { switch (req.method) { case 'PUT': break; } }\n"),
        (
            "src/server/root.ts",
            "export const appRouter = createTRPCRouter({ hello: publicProcedure.query(() => 'hi') });\n",
        ),
        (
            "payload.config.ts",
            "export default buildConfig({ collections: [{ slug: 'media' }] });\n",
        ),
    ]);
    let routes = scan_project(dir.path(), &ScanOptions::default(), &NoopSink).unwrap();
    assert_eq!(routes.len(), 1 + 1 + 1 + 12);
    assert!(routes.iter().all(|r| r.path.starts_with('/')), "{:?}", signatures(&routes));

    let json = serde_json::to_value(&routes).unwrap();
    assert_eq!(json[0]["type"], "file-router-app");
    assert_eq!(json[0]["path"], "/api/items/:id");
    assert_eq!(json[0]["method"], "PATCH");
    assert_eq!(json[0]["params"][0]["name"], "id");
    assert_eq!(json[1]["type"], "file-router-pages");
    assert_eq!(json[1]["method"], "PUT");
    assert_eq!(json[2]["type"], "rpc");
    assert_eq!(json[2]["path"], "/api/trpc/app.hello");
    assert_eq!(json[3]["type"], "config-cms");
    assert!(json[3]["filePath"].as_str().unwrap().ends_with("payload.config.ts"));
    assert!(json[3].get("query").is_some());
    assert_eq!(json[3]["collectionSlug"], "media");
    assert_eq!(json[3]["source"], "collection");
    assert!(json[0].get("collectionSlug").is_none());
}

#[test]
fn diagnostics_reach_the_sink() {
    let dir = project_dir(&[
        ("package.json", manifest(&["next"]).as_str()),
        ("app/api/bad/route.ts", "export function GET( {\n"),
    ]);
    let messages = RefCell::new(Vec::new());
    {
        let sink = FnSink(|level: tracing::Level, msg: &str| {
            messages.borrow_mut().push((level, msg.to_string()));
        });
        scan_project(dir.path(), &ScanOptions::default(), &sink).unwrap();
    }
    let messages = messages.into_inner();
    assert!(messages
        .iter()
        .any(|(level, msg)| *level == tracing::Level::WARN && msg.contains("route.ts")));
}
