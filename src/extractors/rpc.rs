// src/extractors/rpc.rs

//! Builder-call RPC routers.
//!
//! Two shapes are recognised, and may be mixed:
//!
//! ```text
//! createRouter().query('list', {...}).mutation('create', {...}).merge('user.', userRouter)
//! router({ list: publicProcedure.query(...), user: userRouter })
//! ```
//!
//! Every router factory call becomes a call site. Sites reference each other
//! through `.merge` and object properties; only sites nobody mounts are
//! roots, and each route is emitted under its root's name.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use swc_common::{Span, Spanned};
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

use crate::config::RpcOptions;
use crate::extractors::{callee_name, callee_path};
use crate::logging::DebugSink;
use crate::model::{HttpMethod, RouteHandler};
use crate::path_normalizer::join_route;
use crate::project::{DeclKind, FileId, Project, SourceFile};
use crate::symbols::{prop_name, static_string, unwrap_expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
    Subscription,
}

impl ProcedureKind {
    fn from_method(name: &str) -> Option<Self> {
        match name {
            "query" => Some(ProcedureKind::Query),
            "mutation" => Some(ProcedureKind::Mutation),
            "subscription" => Some(ProcedureKind::Subscription),
            _ => None,
        }
    }
}

/// Picks the HTTP verb a procedure is called with.
pub trait ProcedureClassifier {
    fn classify(&self, name: &str, kind: ProcedureKind) -> HttpMethod;
}

/// Queries and subscriptions are `GET`, mutations `POST`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KindClassifier;

impl ProcedureClassifier for KindClassifier {
    fn classify(&self, _name: &str, kind: ProcedureKind) -> HttpMethod {
        match kind {
            ProcedureKind::Query | ProcedureKind::Subscription => HttpMethod::Get,
            ProcedureKind::Mutation => HttpMethod::Post,
        }
    }
}

/// Ignores the builder method and guesses from the procedure name:
/// read-like names (`getUser`, `listPosts`, ...) are `GET`, the rest `POST`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameHeuristicClassifier;

const READ_PREFIXES: [&str; 7] = ["get", "list", "find", "fetch", "search", "count", "by"];

impl ProcedureClassifier for NameHeuristicClassifier {
    fn classify(&self, name: &str, _kind: ProcedureKind) -> HttpMethod {
        let last = name.rsplit('.').next().unwrap_or(name);
        let first_word = split_words(last).into_iter().next().unwrap_or_default();
        if READ_PREFIXES.contains(&first_word.as_str()) {
            HttpMethod::Get
        } else {
            HttpMethod::Post
        }
    }
}

/// Decides whether a call constructs a router.
pub struct RouterMatcher {
    factories: HashSet<String>,
    pattern: Regex,
}

impl RouterMatcher {
    pub fn new(options: &RpcOptions, sink: &dyn DebugSink) -> Self {
        RouterMatcher {
            factories: options.factory_names.iter().cloned().collect(),
            pattern: options.router_regex(sink),
        }
    }

    /// Receivers a string-named procedure chain may start from: procedure
    /// builders (`publicProcedure`, `t.procedure`) and router factories.
    fn is_builder_base(&self, name: &str) -> bool {
        name.to_ascii_lowercase().ends_with("procedure")
            || self.factories.contains(name)
            || self.pattern.is_match(name)
    }

    pub fn is_router_call(&self, call: &CallExpr) -> bool {
        if callee_path(call).is_some_and(|path| self.factories.contains(&path)) {
            return true;
        }
        callee_name(call).is_some_and(|name| self.factories.contains(&name) || self.pattern.is_match(&name))
    }
}

/// Splits `createTRPCRouter` into `create`, `trpc`, `router`; also splits on
/// `_`, `-`, `.` and spaces. Words come back lowercase.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    for part in name.split(['_', '-', '.', ' ']) {
        let chars: Vec<char> = part.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if c.is_uppercase() && !current.is_empty() {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

/// `appRouter` → `app`, `createUserRouter` → `user`, `admin_posts_router`
/// → `adminPosts`. Synthesized `router@N` names pass through.
pub fn normalize_router_name(name: &str) -> String {
    if name.starts_with("router@") {
        return name.to_string();
    }
    let mut words = split_words(name);
    if words.first().is_some_and(|w| matches!(w.as_str(), "create" | "make" | "build")) {
        words.remove(0);
    }
    while words
        .last()
        .is_some_and(|w| matches!(w.as_str(), "router" | "routes" | "factory"))
    {
        words.pop();
    }
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// Calls of a method chain, outermost first: `a().b().c()` yields the calls
/// to `c`, `b` and `a`.
fn chain_calls(call: &CallExpr) -> Vec<&CallExpr> {
    let mut calls = vec![call];
    let mut current = call;
    loop {
        let Callee::Expr(callee) = &current.callee else {
            break;
        };
        let Expr::Member(member) = unwrap_expr(callee) else {
            break;
        };
        let Expr::Call(inner) = unwrap_expr(&member.obj) else {
            break;
        };
        calls.push(inner);
        current = inner;
    }
    calls
}

fn method_ident(call: &CallExpr) -> Option<&Ident> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    match unwrap_expr(callee) {
        Expr::Member(member) => match &member.prop {
            MemberProp::Ident(prop) => Some(prop),
            _ => None,
        },
        _ => None,
    }
}

/// Name of the receiver a method chain starts from: `db` for
/// `ctx.db.query(..)`, `publicProcedure` for `publicProcedure.input(..).query(..)`.
fn chain_base(call: &CallExpr) -> Option<&str> {
    let head = *chain_calls(call).last()?;
    let Callee::Expr(callee) = &head.callee else {
        return None;
    };
    match unwrap_expr(callee) {
        Expr::Ident(ident) => Some(&*ident.sym),
        Expr::Member(member) => match unwrap_expr(&member.obj) {
            Expr::Ident(ident) => Some(&*ident.sym),
            Expr::Member(inner) => match &inner.prop {
                MemberProp::Ident(prop) => Some(&*prop.sym),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

fn method_name(call: &CallExpr) -> Option<&str> {
    method_ident(call).map(|ident| &*ident.sym)
}

/// Where a chained call's method name is written; the call's own span starts
/// at the head of the chain.
fn method_span(call: &CallExpr) -> Span {
    method_ident(call).map_or(call.span, |ident| ident.span)
}

type SiteKey = (u32, u32);

fn site_key(span: Span) -> SiteKey {
    (span.lo.0, span.hi.0)
}

#[derive(Debug, Clone)]
struct Procedure {
    name: String,
    kind: ProcedureKind,
    line: usize,
}

#[derive(Debug, Clone)]
enum MountTarget {
    /// A router call written in place.
    Inline(SiteKey),
    /// A local identifier: a router variable, an imported router, or a
    /// procedure variable.
    Ref(String),
}

#[derive(Debug, Clone)]
struct Mount {
    key: String,
    target: MountTarget,
}

#[derive(Debug)]
struct RouterSite {
    file: FileId,
    name: String,
    /// Variable or function the site's router is reachable through.
    binding: Option<String>,
    callee: Option<String>,
    key: SiteKey,
    procedures: Vec<Procedure>,
    mounts: Vec<Mount>,
}

#[derive(Debug, Clone)]
enum Context {
    Var(String),
    Prop(String),
    Fn(String),
}

struct RouterVisitor<'a> {
    file: &'a SourceFile,
    matcher: &'a RouterMatcher,
    contexts: Vec<Context>,
    claimed: HashSet<SiteKey>,
    sites: Vec<RouterSite>,
    procedure_vars: HashMap<String, (ProcedureKind, usize)>,
}

impl RouterVisitor<'_> {
    /// Innermost router call of the chain `call` heads, if any.
    fn router_of<'c>(&self, call: &'c CallExpr) -> Option<(&'c CallExpr, Vec<&'c CallExpr>)> {
        let calls = chain_calls(call);
        let pos = calls.iter().rposition(|c| self.matcher.is_router_call(c))?;
        let outer = calls[..pos].iter().rev().copied().collect();
        Some((calls[pos], outer))
    }

    fn mount_target(&self, expr: &Expr) -> Option<MountTarget> {
        match unwrap_expr(expr) {
            Expr::Ident(ident) => Some(MountTarget::Ref(ident.sym.to_string())),
            Expr::Member(member) => match &member.prop {
                MemberProp::Ident(prop) => Some(MountTarget::Ref(prop.sym.to_string())),
                _ => None,
            },
            Expr::Call(call) => {
                let (router, _) = self.router_of(call)?;
                Some(MountTarget::Inline(site_key(router.span)))
            }
            _ => None,
        }
    }

    fn add_site(&mut self, router: &CallExpr, outer: &[&CallExpr]) {
        let line = self.file.line_of(router.span);
        let (name, binding) = match self.contexts.last() {
            Some(Context::Var(n)) | Some(Context::Fn(n)) => (n.clone(), Some(n.clone())),
            Some(Context::Prop(n)) => (n.clone(), None),
            None => (format!("router@{line}"), None),
        };
        let mut site = RouterSite {
            file: self.file.id,
            name,
            binding,
            callee: callee_name(router),
            key: site_key(router.span),
            procedures: Vec::new(),
            mounts: Vec::new(),
        };

        // v10: router({ key: procedure | router })
        let mut classified = HashSet::new();
        if let Some(Expr::Object(object)) = router.args.first().map(|arg| unwrap_expr(&arg.expr)) {
            for prop in &object.props {
                let PropOrSpread::Prop(prop) = prop else {
                    continue;
                };
                match &**prop {
                    Prop::KeyValue(kv) => {
                        let Some(key) = prop_name(&kv.key) else {
                            continue;
                        };
                        let line = self.file.line_of(kv.value.span());
                        let procedure = match unwrap_expr(&kv.value) {
                            Expr::Call(call) if self.router_of(call).is_none() => {
                                method_name(call).and_then(ProcedureKind::from_method)
                            }
                            _ => None,
                        };
                        if let Some(kind) = procedure {
                            site.procedures.push(Procedure { name: key, kind, line });
                        } else if let Some(target) = self.mount_target(&kv.value) {
                            site.mounts.push(Mount { key, target });
                        } else {
                            continue;
                        }
                        classified.insert(site_key(kv.value.span()));
                    }
                    Prop::Shorthand(ident) => site.mounts.push(Mount {
                        key: ident.sym.to_string(),
                        target: MountTarget::Ref(ident.sym.to_string()),
                    }),
                    _ => {}
                }
            }
        }

        // .query('name', ...) written inside the factory's arguments
        let mut nested = NamedProcedureCollector {
            matcher: self.matcher,
            classified: &classified,
            found: Vec::new(),
        };
        for arg in &router.args {
            arg.visit_with(&mut nested);
        }
        for (name, kind, span) in nested.found {
            site.procedures.push(Procedure {
                name,
                kind,
                line: self.file.line_of(span),
            });
        }

        // v9: .query('name', ...) / .merge('prefix.', child)
        for call in outer {
            let Some(method) = method_name(call) else {
                continue;
            };
            let line = self.file.line_of(method_span(call));
            if let Some(kind) = ProcedureKind::from_method(method) {
                if let Some(name) = call.args.first().and_then(|arg| static_string(&arg.expr)) {
                    site.procedures.push(Procedure { name, kind, line });
                }
            } else if method == "merge" {
                let (prefix, target) = match call.args.as_slice() {
                    [prefix, target] => (static_string(&prefix.expr).unwrap_or_default(), target),
                    [target] => (String::new(), target),
                    _ => continue,
                };
                if let Some(target) = self.mount_target(&target.expr) {
                    site.mounts.push(Mount {
                        key: prefix.trim_end_matches('.').to_string(),
                        target,
                    });
                }
            }
        }
        let mut seen = HashSet::new();
        site.procedures.retain(|p| seen.insert(p.name.clone()));
        self.sites.push(site);
    }
}

/// String-named procedures inside a factory call's arguments. Nested router
/// calls are sites of their own and are not entered, nor are object
/// properties already read as procedures or mounts, nor resolver bodies.
struct NamedProcedureCollector<'a> {
    matcher: &'a RouterMatcher,
    classified: &'a HashSet<SiteKey>,
    found: Vec<(String, ProcedureKind, Span)>,
}

impl Visit for NamedProcedureCollector<'_> {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if chain_calls(call).iter().any(|c| self.matcher.is_router_call(c)) {
            return;
        }
        let kind = method_name(call).and_then(ProcedureKind::from_method);
        let name = call.args.first().and_then(|arg| static_string(&arg.expr));
        match (kind, name) {
            (Some(kind), Some(name)) if chain_base(call).is_some_and(|base| self.matcher.is_builder_base(base)) => {
                self.found.push((name, kind, method_span(call)));
                call.callee.visit_with(self);
            }
            _ => call.visit_children_with(self),
        }
    }

    fn visit_key_value_prop(&mut self, prop: &KeyValueProp) {
        if !self.classified.contains(&site_key(prop.value.span())) {
            prop.visit_children_with(self);
        }
    }
}

impl Visit for RouterVisitor<'_> {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Some((router, outer)) = self.router_of(call) {
            if self.claimed.insert(site_key(router.span)) {
                self.add_site(router, &outer);
            }
        }
        call.visit_children_with(self);
    }

    fn visit_var_declarator(&mut self, decl: &VarDeclarator) {
        let Pat::Ident(binding) = &decl.name else {
            decl.visit_children_with(self);
            return;
        };
        let name = binding.id.sym.to_string();
        if let Some(Expr::Call(call)) = decl.init.as_deref().map(unwrap_expr) {
            if self.router_of(call).is_none() {
                if let Some(kind) = method_name(call).and_then(ProcedureKind::from_method) {
                    self.procedure_vars
                        .insert(name.clone(), (kind, self.file.line_of(decl.span)));
                }
            }
        }
        self.contexts.push(Context::Var(name));
        decl.visit_children_with(self);
        self.contexts.pop();
    }

    fn visit_key_value_prop(&mut self, prop: &KeyValueProp) {
        match prop_name(&prop.key) {
            Some(key) => {
                self.contexts.push(Context::Prop(key));
                prop.visit_children_with(self);
                self.contexts.pop();
            }
            None => prop.visit_children_with(self),
        }
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        self.contexts.push(Context::Fn(decl.ident.sym.to_string()));
        decl.visit_children_with(self);
        self.contexts.pop();
    }
}

enum Resolved {
    Router(usize),
    Procedure(ProcedureKind, usize),
}

struct RouterGraph<'a> {
    project: &'a Project,
    sites: Vec<RouterSite>,
    by_key: HashMap<(FileId, SiteKey), usize>,
    procedure_vars: HashMap<(FileId, String), (ProcedureKind, usize)>,
}

impl RouterGraph<'_> {
    fn site_bound_to(&self, file: Option<FileId>, name: &str) -> Option<usize> {
        self.sites
            .iter()
            .position(|s| s.binding.as_deref() == Some(name) && file.map_or(true, |f| s.file == f))
    }

    fn resolve(&self, site: &RouterSite, target: &MountTarget) -> Option<Resolved> {
        match target {
            MountTarget::Inline(key) => self.by_key.get(&(site.file, *key)).copied().map(Resolved::Router),
            MountTarget::Ref(local) => {
                if let Some(idx) = self.site_bound_to(Some(site.file), local) {
                    return Some(Resolved::Router(idx));
                }
                if let Some((kind, line)) = self.procedure_vars.get(&(site.file, local.clone())) {
                    return Some(Resolved::Procedure(*kind, *line));
                }
                let target_file = self
                    .project
                    .file(site.file)
                    .binding(local)
                    .and_then(|id| match &self.project.decl(id).kind {
                        DeclKind::Import { specifier, .. } => {
                            self.project.resolve_import(site.file, specifier)
                        }
                        _ => None,
                    });
                let original = self
                    .project
                    .imported_name(site.file, local)
                    .unwrap_or_else(|| local.clone());
                self.site_bound_to(target_file, &original)
                    .or_else(|| self.site_bound_to(None, &original))
                    .map(Resolved::Router)
            }
        }
    }

    /// A bare `makeUserRouter()` stands for the site built inside
    /// `makeUserRouter`.
    fn alias(&self, idx: usize) -> Option<usize> {
        let site = &self.sites[idx];
        if !site.procedures.is_empty() || !site.mounts.is_empty() {
            return None;
        }
        let callee = site.callee.as_deref()?;
        self.site_bound_to(Some(site.file), callee)
            .or_else(|| self.site_bound_to(None, callee))
            .filter(|&target| target != idx)
    }

    fn mounted(&self) -> HashSet<usize> {
        let mut mounted = HashSet::new();
        for (idx, site) in self.sites.iter().enumerate() {
            for mount in &site.mounts {
                if let Some(Resolved::Router(child)) = self.resolve(site, &mount.target) {
                    if child != idx {
                        mounted.insert(child);
                    }
                }
            }
            if let Some(target) = self.alias(idx) {
                mounted.insert(target);
            }
        }
        mounted
    }

    fn emit(
        &self,
        idx: usize,
        prefix: &mut Vec<String>,
        active: &mut HashSet<usize>,
        out: &mut Vec<(String, ProcedureKind, FileId, usize)>,
    ) {
        if !active.insert(idx) {
            return;
        }
        if let Some(target) = self.alias(idx) {
            self.emit(target, prefix, active, out);
            active.remove(&idx);
            return;
        }
        let site = &self.sites[idx];
        let dotted = |prefix: &[String], name: &str| {
            let mut parts: Vec<&str> = prefix.iter().map(String::as_str).filter(|p| !p.is_empty()).collect();
            parts.push(name);
            parts.join(".")
        };
        for procedure in &site.procedures {
            out.push((dotted(prefix.as_slice(), &procedure.name), procedure.kind, site.file, procedure.line));
        }
        for mount in &site.mounts {
            match self.resolve(site, &mount.target) {
                Some(Resolved::Router(child)) => {
                    prefix.push(mount.key.clone());
                    self.emit(child, prefix, active, out);
                    prefix.pop();
                }
                Some(Resolved::Procedure(kind, line)) => {
                    out.push((dotted(prefix.as_slice(), &mount.key), kind, site.file, line));
                }
                None => {}
            }
        }
        active.remove(&idx);
    }
}

pub fn extract(
    project: &Project,
    options: &RpcOptions,
    classifier: &dyn ProcedureClassifier,
    sink: &dyn DebugSink,
) -> Vec<RouteHandler> {
    let matcher = RouterMatcher::new(options, sink);
    let mut graph = RouterGraph {
        project,
        sites: Vec::new(),
        by_key: HashMap::new(),
        procedure_vars: HashMap::new(),
    };
    for file in project.files() {
        let mut visitor = RouterVisitor {
            file,
            matcher: &matcher,
            contexts: Vec::new(),
            claimed: HashSet::new(),
            sites: Vec::new(),
            procedure_vars: HashMap::new(),
        };
        file.module().visit_with(&mut visitor);
        for (name, found) in visitor.procedure_vars {
            graph.procedure_vars.insert((file.id, name), found);
        }
        for site in visitor.sites {
            sink.debug(&format!(
                "{}: router `{}` with {} procedures, {} mounts",
                file.rel_path,
                site.name,
                site.procedures.len(),
                site.mounts.len()
            ));
            graph.by_key.insert((site.file, site.key), graph.sites.len());
            graph.sites.push(site);
        }
    }

    let mounted = graph.mounted();
    let mut handlers = Vec::new();
    for idx in 0..graph.sites.len() {
        if mounted.contains(&idx) {
            continue;
        }
        let mut found = Vec::new();
        let mut prefix = vec![normalize_router_name(&graph.sites[idx].name)];
        graph.emit(idx, &mut prefix, &mut HashSet::new(), &mut found);
        for (dotted, kind, file, line) in found {
            let method = classifier.classify(&dotted, kind);
            let path = join_route(&[options.endpoint.as_str(), dotted.as_str()]);
            let mut handler = RouteHandler::new(path, method, project.file(file).path(), line).named(dotted);
            handler = match method {
                HttpMethod::Get => handler.with_query_keys(&["input"]),
                _ => handler.with_header("Content-Type", "application/json"),
            };
            handlers.push(handler);
        }
    }
    sink.info(&format!(
        "rpc: {} routes from {} router call sites",
        handlers.len(),
        graph.sites.len()
    ));
    handlers
}
