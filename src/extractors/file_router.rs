// src/extractors/file_router.rs

//! File-system router: nested-segment `app/**/route.ts` handlers and flat
//! `pages/api/**` handlers.

use std::collections::HashSet;

use swc_common::{Span, Spanned};
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

use crate::logging::DebugSink;
use crate::model::{HttpMethod, RouteHandler};
use crate::path_normalizer::{is_reserved_segment, join_route, normalize_segment};
use crate::project::{Project, SourceFile};
use crate::symbols::{static_string, unwrap_expr};

/// Identifiers that mark a handler as request/response middleware aware.
pub const MIDDLEWARE_IDENTIFIERS: [&str; 7] = [
    "NextRequest",
    "NextResponse",
    "NextApiRequest",
    "NextApiResponse",
    "withAuth",
    "middleware",
    "next",
];

/// Decides which verbs a flat-file handler responds to.
pub trait MethodDetector {
    /// Verbs in first-seen order; empty when nothing was recognised.
    fn detect(&self, module: &Module) -> Vec<HttpMethod>;
}

/// Looks for `req.method === 'POST'`-style comparisons (either operand order,
/// equality or inequality) and `switch (req.method) { case 'GET': }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComparisonMethodDetector;

impl MethodDetector for ComparisonMethodDetector {
    fn detect(&self, module: &Module) -> Vec<HttpMethod> {
        let mut visitor = MethodComparisonVisitor::default();
        module.visit_with(&mut visitor);
        visitor.found
    }
}

#[derive(Default)]
struct MethodComparisonVisitor {
    found: Vec<HttpMethod>,
}

impl MethodComparisonVisitor {
    fn record(&mut self, expr: &Expr) {
        let Some(method) = static_string(expr).and_then(|s| s.parse::<HttpMethod>().ok()) else {
            return;
        };
        if !self.found.contains(&method) {
            self.found.push(method);
        }
    }
}

/// `req.method`, a destructured `method`, or either with a case conversion.
fn is_method_ref(expr: &Expr) -> bool {
    match unwrap_expr(expr) {
        Expr::Ident(ident) => &*ident.sym == "method",
        Expr::Member(member) => matches!(&member.prop, MemberProp::Ident(p) if &*p.sym == "method"),
        Expr::Call(call) => match &call.callee {
            Callee::Expr(callee) => match unwrap_expr(callee) {
                Expr::Member(member) => {
                    matches!(&member.prop, MemberProp::Ident(p) if &*p.sym == "toUpperCase" || &*p.sym == "toLowerCase")
                        && is_method_ref(&member.obj)
                }
                _ => false,
            },
            _ => false,
        },
        _ => false,
    }
}

impl Visit for MethodComparisonVisitor {
    fn visit_bin_expr(&mut self, bin: &BinExpr) {
        if matches!(
            bin.op,
            BinaryOp::EqEq | BinaryOp::EqEqEq | BinaryOp::NotEq | BinaryOp::NotEqEq
        ) {
            if is_method_ref(&bin.left) {
                self.record(&bin.right);
            } else if is_method_ref(&bin.right) {
                self.record(&bin.left);
            }
        }
        bin.visit_children_with(self);
    }

    fn visit_switch_stmt(&mut self, stmt: &SwitchStmt) {
        if is_method_ref(&stmt.discriminant) {
            for case in &stmt.cases {
                if let Some(test) = &case.test {
                    self.record(test);
                }
            }
        }
        stmt.visit_children_with(self);
    }
}

#[derive(Default)]
struct IdentifierVisitor {
    seen: HashSet<String>,
}

impl Visit for IdentifierVisitor {
    fn visit_ident(&mut self, ident: &Ident) {
        if MIDDLEWARE_IDENTIFIERS.contains(&&*ident.sym) {
            self.seen.insert(ident.sym.to_string());
        }
    }
}

pub fn uses_middleware(module: &Module) -> bool {
    let mut visitor = IdentifierVisitor::default();
    module.visit_with(&mut visitor);
    !visitor.seen.is_empty()
}

fn split_file_name(file_name: &str) -> Option<(&str, &str)> {
    file_name.rsplit_once('.')
}

/// Components below `root` (e.g. `["pages", "api"]`), which must sit at the
/// top of the project or directly under `src/`.
fn below_root<'a>(components: &'a [&'a str], root: &[&str]) -> Option<&'a [&'a str]> {
    let components = match components.first() {
        Some(&"src") => &components[1..],
        _ => components,
    };
    let matches = components.len() >= root.len() && components.iter().zip(root).all(|(c, r)| c == r);
    matches.then(|| &components[root.len()..])
}

/// Route path for `app/<segments>/route.<ext>` (or `src/app/...`). Route
/// groups `(name)` and parallel slots `@name` do not contribute a segment;
/// private folders `_name` exclude the file.
pub fn app_route_path(rel_path: &str) -> Option<String> {
    let components: Vec<&str> = rel_path.split('/').collect();
    let (file_name, dirs) = below_root(&components, &["app"])?.split_last()?;
    let (stem, _ext) = split_file_name(file_name)?;
    if stem != "route" {
        return None;
    }

    let mut segments = Vec::new();
    for dir in dirs {
        if (dir.starts_with('(') && dir.ends_with(')')) || dir.starts_with('@') {
            continue;
        }
        if dir.starts_with('_') {
            return None;
        }
        segments.push(normalize_segment(dir));
    }
    Some(join_route(&segments))
}

/// Route path for `pages/api/<segments>.<ext>` (or `src/pages/api/...`);
/// trailing `index` collapses and reserved file names yield `None`.
pub fn pages_route_path(rel_path: &str) -> Option<String> {
    let components: Vec<&str> = rel_path.split('/').collect();
    let (file_name, dirs) = below_root(&components, &["pages", "api"])?.split_last()?;
    let (stem, _ext) = split_file_name(file_name)?;
    if is_reserved_segment(stem) || dirs.iter().any(|d| is_reserved_segment(d)) {
        return None;
    }

    let mut segments: Vec<String> = vec!["api".to_string()];
    segments.extend(dirs.iter().map(|d| normalize_segment(d)));
    if stem != "index" {
        segments.push(normalize_segment(stem));
    }
    Some(join_route(&segments))
}

/// Exported functions, consts and specifiers named after an HTTP verb.
pub fn exported_verbs(module: &Module) -> Vec<(HttpMethod, Span)> {
    let verb = |name: &str| HttpMethod::ALL.into_iter().find(|m| m.as_str() == name);
    let mut found = Vec::new();
    for item in &module.body {
        let ModuleItem::ModuleDecl(decl) = item else {
            continue;
        };
        match decl {
            ModuleDecl::ExportDecl(export) => match &export.decl {
                Decl::Fn(f) => {
                    if let Some(m) = verb(&*f.ident.sym) {
                        found.push((m, export.span));
                    }
                }
                Decl::Var(var) => {
                    for declarator in &var.decls {
                        if let Pat::Ident(binding) = &declarator.name {
                            if let Some(m) = verb(&*binding.id.sym) {
                                found.push((m, declarator.span));
                            }
                        }
                    }
                }
                _ => {}
            },
            ModuleDecl::ExportNamed(named) if !named.type_only => {
                for spec in &named.specifiers {
                    let ExportSpecifier::Named(spec) = spec else {
                        continue;
                    };
                    let exported = spec.exported.as_ref().unwrap_or(&spec.orig);
                    let name = match exported {
                        ModuleExportName::Ident(ident) => ident.sym.to_string(),
                        ModuleExportName::Str(s) => s.value.to_string(),
                    };
                    if let Some(m) = verb(name.as_str()) {
                        found.push((m, spec.span));
                    }
                }
            }
            _ => {}
        }
    }
    let mut seen = HashSet::new();
    found.retain(|(m, _)| seen.insert(*m));
    found
}

/// Span of the default export, if the module has one.
fn default_export_span(module: &Module) -> Option<Span> {
    module.body.iter().find_map(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(d)) => Some(d.span),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(d)) => Some(d.span),
        ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => named
            .specifiers
            .iter()
            .any(|spec| {
                matches!(spec, ExportSpecifier::Named(s)
                    if matches!(&s.exported, Some(ModuleExportName::Ident(i)) if &*i.sym == "default"))
            })
            .then(|| named.span()),
        _ => None,
    })
}

/// Routes of both modes, kept apart so the aggregator can tag them.
#[derive(Debug, Default)]
pub struct FileRoutes {
    pub app: Vec<RouteHandler>,
    pub pages: Vec<RouteHandler>,
}

pub fn extract(project: &Project, detector: &dyn MethodDetector, sink: &dyn DebugSink) -> FileRoutes {
    let mut routes = FileRoutes::default();
    for file in project.files() {
        if let Some(path) = pages_route_path(&file.rel_path) {
            routes.pages.extend(pages_handlers(file, &path, detector, sink));
        } else if let Some(path) = app_route_path(&file.rel_path) {
            routes.app.extend(app_handlers(file, &path, sink));
        }
    }
    sink.info(&format!(
        "file router: {} app routes, {} pages routes",
        routes.app.len(),
        routes.pages.len()
    ));
    routes
}

fn app_handlers(file: &SourceFile, path: &str, sink: &dyn DebugSink) -> Vec<RouteHandler> {
    let verbs = exported_verbs(file.module());
    if verbs.is_empty() {
        sink.debug(&format!("{}: route file exports no HTTP verb handlers", file.rel_path));
    }
    let middleware = uses_middleware(file.module());
    verbs
        .into_iter()
        .map(|(method, span)| {
            let mut handler = RouteHandler::new(path, method, file.path(), file.line_of(span))
                .named(format!("{method} {path}"));
            handler.middleware = middleware;
            handler
        })
        .collect()
}

fn pages_handlers(
    file: &SourceFile,
    path: &str,
    detector: &dyn MethodDetector,
    sink: &dyn DebugSink,
) -> Vec<RouteHandler> {
    let Some(span) = default_export_span(file.module()) else {
        sink.debug(&format!("{}: API file has no default export handler", file.rel_path));
        return Vec::new();
    };
    let mut methods = detector.detect(file.module());
    if methods.is_empty() {
        methods.push(HttpMethod::Get);
    }
    let middleware = uses_middleware(file.module());
    let line = file.line_of(span);
    methods
        .into_iter()
        .map(|method| {
            let mut handler =
                RouteHandler::new(path, method, file.path(), line).named(format!("{method} {path}"));
            handler.middleware = middleware;
            handler
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    fn module(src: &str) -> Module {
        parse_source(Path::new("handler.ts"), src.to_string()).unwrap().module
    }

    #[test]
    fn app_paths() {
        assert_eq!(app_route_path("app/api/users/[id]/route.ts").as_deref(), Some("/api/users/:id"));
        assert_eq!(app_route_path("src/app/(shop)/cart/route.js").as_deref(), Some("/cart"));
        assert_eq!(app_route_path("app/@modal/docs/[[...slug]]/route.ts").as_deref(), Some("/docs/:slug*"));
        assert_eq!(app_route_path("app/route.ts").as_deref(), Some("/"));
        assert_eq!(app_route_path("app/_lib/route.ts"), None);
        assert_eq!(app_route_path("app/users/page.tsx"), None);
        assert_eq!(app_route_path("lib/route.ts"), None);
        assert_eq!(app_route_path("packages/ui/app/route.ts"), None);
        assert_eq!(app_route_path("src/lib/app/health/route.ts"), None);
    }

    #[test]
    fn pages_paths() {
        assert_eq!(pages_route_path("pages/api/orders/index.ts").as_deref(), Some("/api/orders"));
        assert_eq!(pages_route_path("pages/api/index.ts").as_deref(), Some("/api"));
        assert_eq!(pages_route_path("src/pages/api/files/[...path].ts").as_deref(), Some("/api/files/:path+"));
        assert_eq!(pages_route_path("pages/api/_app.ts"), None);
        assert_eq!(pages_route_path("pages/about.tsx"), None);
        assert_eq!(pages_route_path("src/components/pages/api/x.ts"), None);
        assert_eq!(pages_route_path("apps/web/pages/api/x.ts"), None);
    }

    #[test]
    fn exported_verbs_cover_declarations_and_specifiers() {
        let m = module(
            r#"
            export async function GET() {}
            export const POST = async () => {};
            const handler = () => {};
            export { handler as DELETE, handler as helper };
            export function get() {}
            "#,
        );
        let verbs: Vec<_> = exported_verbs(&m).into_iter().map(|(v, _)| v).collect();
        assert_eq!(verbs, vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete]);
    }

    #[test]
    fn detects_comparisons_and_switches() {
        let m = module(
            r#"
            export default function handler(req, res) {
                if ('PUT' == req.method) {}
                if (req.method.toUpperCase() !== "patch") {}
                switch (req.method) {
                    case 'GET': break;
                    case 'PUT': break;
                }
            }
            "#,
        );
        assert_eq!(
            ComparisonMethodDetector.detect(&m),
            vec![HttpMethod::Put, HttpMethod::Patch, HttpMethod::Get]
        );
    }

    #[test]
    fn ignores_unrelated_comparisons() {
        let m = module("export default (req) => { if (req.kind === 'POST') {} }");
        assert!(ComparisonMethodDetector.detect(&m).is_empty());
    }

    #[test]
    fn middleware_flag() {
        assert!(uses_middleware(&module(
            "import { NextResponse } from 'next/server'; export function GET() { return NextResponse.json({}) }"
        )));
        assert!(!uses_middleware(&module("export function GET() { return new Response('ok') }")));
    }
}
