// src/extractors/controller.rs

//! Decorator-based controllers: `@Controller('users')` classes whose methods
//! carry `@Get(':id')`-style verb decorators.

use serde_json::json;
use swc_common::Spanned;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

use crate::extractors::callee_name;
use crate::logging::DebugSink;
use crate::model::{HttpMethod, RouteHandler};
use crate::path_normalizer::{join_route, normalize_segment};
use crate::project::{Project, SourceFile};
use crate::symbols::{prop_name, static_string, unwrap_expr};

/// Verbs an `@All()` handler is reported under.
const ALL_METHODS: [HttpMethod; 5] = [
    HttpMethod::Get,
    HttpMethod::Post,
    HttpMethod::Put,
    HttpMethod::Patch,
    HttpMethod::Delete,
];

/// Name and arguments of a decorator, for both `@Get` and `@Get('x')`.
fn decorator_call(decorator: &Decorator) -> Option<(String, &[ExprOrSpread])> {
    match unwrap_expr(&decorator.expr) {
        Expr::Ident(ident) => Some((ident.sym.to_string(), &[])),
        Expr::Call(call) => Some((callee_name(call)?, &call.args)),
        _ => None,
    }
}

fn verbs_for(decorator: &str) -> &'static [HttpMethod] {
    match decorator {
        "Get" => &[HttpMethod::Get],
        "Post" => &[HttpMethod::Post],
        "Put" => &[HttpMethod::Put],
        "Patch" => &[HttpMethod::Patch],
        "Delete" => &[HttpMethod::Delete],
        "Head" => &[HttpMethod::Head],
        "Options" => &[HttpMethod::Options],
        "All" => &ALL_METHODS,
        _ => &[],
    }
}

/// Path argument of `@Get('x')` / `@Controller(['x', ...])` /
/// `@Controller({ path: 'x' })`. Arrays yield their first entry.
fn decorator_path(args: &[ExprOrSpread]) -> Option<String> {
    let first = args.first()?;
    match unwrap_expr(&first.expr) {
        Expr::Array(array) => array
            .elems
            .iter()
            .flatten()
            .find_map(|elem| static_string(&elem.expr)),
        Expr::Object(object) => object.props.iter().find_map(|prop| match prop {
            PropOrSpread::Prop(prop) => match &**prop {
                Prop::KeyValue(kv) if prop_name(&kv.key).as_deref() == Some("path") => {
                    static_string(&kv.value)
                }
                _ => None,
            },
            _ => None,
        }),
        expr => static_string(expr),
    }
}

fn split_path(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(normalize_segment)
}

/// The `setGlobalPrefix('api')` argument, if any file sets one.
pub fn global_prefix(project: &Project) -> Option<String> {
    project
        .find_calls(|call| callee_name(call).as_deref() == Some("setGlobalPrefix"))
        .into_iter()
        .find_map(|(_, call)| call.args.first().and_then(|arg| static_string(&arg.expr)))
}

struct ControllerVisitor<'a> {
    file: &'a SourceFile,
    prefix: &'a str,
    sink: &'a dyn DebugSink,
    handlers: Vec<RouteHandler>,
}

impl ControllerVisitor<'_> {
    fn controller_class(&mut self, name: &str, class: &Class) {
        let Some(base) = class.decorators.iter().find_map(|d| match decorator_call(d) {
            Some((decorator, args)) if decorator == "Controller" => Some(decorator_path(args).unwrap_or_default()),
            _ => None,
        }) else {
            return;
        };

        let before = self.handlers.len();
        for member in &class.body {
            let ClassMember::Method(method) = member else {
                continue;
            };
            let Some(method_name) = prop_name(&method.key) else {
                continue;
            };
            self.handler_method(name, &base, &method_name, method);
        }
        self.sink.debug(&format!(
            "{}: controller {name} has {} routes",
            self.file.rel_path,
            self.handlers.len() - before
        ));
    }

    fn handler_method(&mut self, class_name: &str, base: &str, method_name: &str, method: &ClassMethod) {
        let function = &method.function;
        let Some((decorator, args)) = function
            .decorators
            .iter()
            .filter_map(decorator_call)
            .find(|(name, _)| !verbs_for(name).is_empty())
        else {
            return;
        };
        let sub_path = decorator_path(args).unwrap_or_default();

        let mut segments: Vec<String> = split_path(self.prefix).collect();
        segments.extend(split_path(base));
        segments.extend(split_path(&sub_path));
        let path = join_route(&segments);
        let line = self.file.line_of(method.key.span());

        for verb in verbs_for(&decorator) {
            let mut handler =
                RouteHandler::new(path.clone(), *verb, self.file.path(), line).named(format!("{class_name}.{method_name}"));
            for param in &function.params {
                for (param_decorator, param_args) in param.decorators.iter().filter_map(decorator_call) {
                    let key = param_args.first().and_then(|arg| static_string(&arg.expr));
                    match (param_decorator.as_str(), key) {
                        ("Body", _) if verb.has_body() => handler = handler.with_body(json!({})),
                        ("Query", Some(key)) => handler = handler.with_query_keys(&[key.as_str()]),
                        ("Headers", Some(key)) => handler = handler.with_header(&key, ""),
                        _ => {}
                    }
                }
            }
            self.handlers.push(handler);
        }
    }
}

impl Visit for ControllerVisitor<'_> {
    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        self.controller_class(&decl.ident.sym, &decl.class);
        decl.visit_children_with(self);
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        let name = expr.ident.as_ref().map(|i| i.sym.to_string()).unwrap_or_default();
        self.controller_class(&name, &expr.class);
        expr.visit_children_with(self);
    }
}

pub fn extract(project: &Project, sink: &dyn DebugSink) -> Vec<RouteHandler> {
    let prefix = global_prefix(project).unwrap_or_default();
    if !prefix.is_empty() {
        sink.debug(&format!("controller global prefix `{prefix}`"));
    }
    let mut handlers = Vec::new();
    for file in project.files() {
        let mut visitor = ControllerVisitor {
            file,
            prefix: &prefix,
            sink,
            handlers: Vec::new(),
        };
        file.module().visit_with(&mut visitor);
        handlers.extend(visitor.handlers);
    }
    sink.info(&format!("controller: {} routes", handlers.len()));
    handlers
}
