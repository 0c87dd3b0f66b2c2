mod common;

use common::{has, load, manifest, project_dir, signatures};
use pretty_assertions::assert_eq;
use route_scanner::config::RpcOptions;
use route_scanner::extractors::rpc::{extract, KindClassifier, NameHeuristicClassifier};
use route_scanner::{scan_project, HttpMethod, NoopSink, RouteType, ScanOptions};

#[test]
fn builder_chain_procedures() {
    let dir = project_dir(&[
        ("package.json", manifest(&["@trpc/server"]).as_str()),
        (
            "src/server/router.ts",
            r#"
import * as trpc from "@trpc/server";

export const appRouter = createRouter()
    .query("list", { resolve: () => [] })
    .mutation("create", { resolve: ({ input }) => input });
"#,
        ),
    ]);
    let routes = scan_project(dir.path(), &ScanOptions::default(), &NoopSink).unwrap();
    assert_eq!(
        signatures(&routes),
        vec!["GET /api/trpc/app.list", "POST /api/trpc/app.create"]
    );
    assert!(routes.iter().all(|r| r.route_type == RouteType::Rpc));
    assert!(routes[0].query.as_ref().unwrap().contains_key("input"));
    assert_eq!(
        routes[1].headers.as_ref().unwrap().get("Content-Type").map(String::as_str),
        Some("application/json")
    );
    assert_eq!(routes[0].line, 5);
}

#[test]
fn merged_routers_are_emitted_under_their_parent() {
    let dir = project_dir(&[
        (
            "server/routers/user.ts",
            r#"
export const userRouter = createRouter()
    .query("byId", { resolve: () => null })
    .mutation("update", { resolve: () => null });
"#,
        ),
        (
            "server/routers/_app.ts",
            r#"
import { userRouter } from "./user";

export const appRouter = createRouter()
    .query("health", { resolve: () => "ok" })
    .merge("user.", userRouter);
"#,
        ),
    ]);
    let project = load(dir.path());
    let handlers = extract(&project, &RpcOptions::default(), &KindClassifier, &NoopSink);
    let mut paths: Vec<String> = handlers.iter().map(|h| h.path.clone()).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/api/trpc/app.health",
            "/api/trpc/app.user.byId",
            "/api/trpc/app.user.update",
        ]
    );
}

#[test]
fn object_style_routers_with_nested_and_imported_children() {
    let dir = project_dir(&[
        (
            "src/server/trpc.ts",
            r#"
import { initTRPC } from "@trpc/server";
const t = initTRPC.create();
export const router = t.router;
export const publicProcedure = t.procedure;
"#,
        ),
        (
            "src/server/routers/post.ts",
            r#"
import { router, publicProcedure } from "../trpc";
import { z } from "zod";

export const postRouter = router({
    list: publicProcedure.query(() => []),
    add: publicProcedure.input(z.object({ title: z.string() })).mutation(({ input }) => input),
});
"#,
        ),
        (
            "src/server/routers/_app.ts",
            r#"
import { router, publicProcedure } from "../trpc";
import { postRouter as posts } from "./post";

const ping = publicProcedure.query(() => "pong");

export const appRouter = router({
    ping,
    post: posts,
    admin: router({
        stats: publicProcedure.query(() => ({})),
    }),
});

export type AppRouter = typeof appRouter;
"#,
        ),
    ]);
    let project = load(dir.path());
    let handlers = extract(&project, &RpcOptions::default(), &KindClassifier, &NoopSink);
    let mut found: Vec<String> = handlers
        .iter()
        .map(|h| format!("{} {}", h.method, h.path))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            "GET /api/trpc/app.admin.stats",
            "GET /api/trpc/app.ping",
            "GET /api/trpc/app.post.list",
            "POST /api/trpc/app.post.add",
        ]
    );
}

#[test]
fn custom_endpoint_factories_and_classifier() {
    let dir = project_dir(&[(
        "api.ts",
        r#"
export const billing = defineRoutes()
    .query("getInvoice", { resolve: () => null })
    .query("sendReminder", { resolve: () => null });
"#,
    )]);
    let project = load(dir.path());
    let options = RpcOptions {
        factory_names: vec!["defineRoutes".to_string()],
        endpoint: "/rpc/".to_string(),
        ..Default::default()
    };
    let handlers = extract(&project, &options, &NameHeuristicClassifier, &NoopSink);
    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers[0].path, "/rpc/billing.getInvoice");
    assert_eq!(handlers[0].method, HttpMethod::Get);
    assert_eq!(handlers[1].method, HttpMethod::Post);
}

#[test]
fn unnamed_router_gets_synthesized_name() {
    let dir = project_dir(&[("r.ts", "\nexport default createRouter().query('x', {});\n")]);
    let project = load(dir.path());
    let handlers = extract(&project, &RpcOptions::default(), &KindClassifier, &NoopSink);
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].path, "/api/trpc/router@2.x");
}

#[test]
fn mutually_merged_routers_terminate() {
    let dir = project_dir(&[
        ("package.json", manifest(&["@trpc/server"]).as_str()),
        (
            "a.ts",
            r#"
import { bRouter } from "./b";
export const aRouter = createRouter().query("one", {}).merge("b.", bRouter);
"#,
        ),
        (
            "b.ts",
            r#"
import { aRouter } from "./a";
export const bRouter = createRouter().query("two", {}).merge("a.", aRouter);
"#,
        ),
        (
            "c.ts",
            r#"
import { aRouter } from "./a";
export const appRouter = createRouter().merge("a.", aRouter);
"#,
        ),
    ]);
    let routes = scan_project(dir.path(), &ScanOptions::default(), &NoopSink).unwrap();
    assert_eq!(routes.len(), 2);
    assert!(has(&routes, HttpMethod::Get, "/api/trpc/app.a.one"));
    assert!(has(&routes, HttpMethod::Get, "/api/trpc/app.a.b.two"));
}

#[test]
fn database_calls_inside_resolvers_are_not_procedures() {
    let dir = project_dir(&[(
        "src/server/root.ts",
        r#"
export const appRouter = router({
    list: publicProcedure.query(({ ctx }) => ctx.db.query("SELECT * FROM users")),
    purge: protectedProcedure.mutation(async () => pool.query("DELETE FROM sessions")),
    ...withAudit(db.query("SELECT 1")),
});
"#,
    )]);
    let project = load(dir.path());
    let handlers = extract(&project, &RpcOptions::default(), &KindClassifier, &NoopSink);
    let found: Vec<String> = handlers.iter().map(|h| format!("{} {}", h.method, h.path)).collect();
    assert_eq!(found, vec!["GET /api/trpc/app.list", "POST /api/trpc/app.purge"]);
}

#[test]
fn endpoint_without_leading_slash_is_rooted() {
    let dir = project_dir(&[(
        "server.ts",
        "export const appRouter = router({ list: publicProcedure.query(() => []) });\n",
    )]);
    let project = load(dir.path());
    let options = RpcOptions {
        endpoint: "api/trpc".to_string(),
        ..Default::default()
    };
    let handlers = extract(&project, &options, &KindClassifier, &NoopSink);
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].path, "/api/trpc/app.list");
}

#[test]
fn factory_matched_only_by_name_pattern() {
    let dir = project_dir(&[
        ("package.json", manifest(&["@trpc/server"]).as_str()),
        (
            "src/server/admin.ts",
            r#"
export const adminRoutes = makeAdminRouter()
    .query("stats", { resolve: () => ({}) })
    .mutation("ban", { resolve: () => null });
"#,
        ),
    ]);
    let routes = scan_project(dir.path(), &ScanOptions::default(), &NoopSink).unwrap();
    assert_eq!(
        signatures(&routes),
        vec!["GET /api/trpc/admin.stats", "POST /api/trpc/admin.ban"]
    );
}
