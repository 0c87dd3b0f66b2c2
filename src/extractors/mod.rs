// src/extractors/mod.rs

//! Per-convention route extractors.
//!
//! Each extractor reads the shared [`Project`](crate::project::Project) and
//! returns its own list of [`RouteHandler`](crate::model::RouteHandler)s;
//! none of them shares mutable state with another.

pub mod config_cms;
pub mod controller;
pub mod file_router;
pub mod rpc;

use swc_ecma_ast::{CallExpr, Callee, Expr, MemberProp};

use crate::symbols::unwrap_expr;

/// Dotted name of an identifier or member chain, e.g. `t.router`.
pub fn expr_path(expr: &Expr) -> Option<String> {
    match unwrap_expr(expr) {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Member(member) => {
            let MemberProp::Ident(prop) = &member.prop else {
                return None;
            };
            let base = expr_path(&member.obj)?;
            Some(format!("{base}.{}", prop.sym))
        }
        Expr::This(_) => Some("this".to_string()),
        _ => None,
    }
}

/// Dotted name of the called expression.
pub fn callee_path(call: &CallExpr) -> Option<String> {
    match &call.callee {
        Callee::Expr(expr) => expr_path(expr),
        _ => None,
    }
}

/// Last segment of the called expression's name: `buildConfig` for both
/// `buildConfig(...)` and `payload.buildConfig(...)`.
pub fn callee_name(call: &CallExpr) -> Option<String> {
    match &call.callee {
        Callee::Expr(expr) => match unwrap_expr(expr) {
            Expr::Ident(ident) => Some(ident.sym.to_string()),
            Expr::Member(member) => match &member.prop {
                MemberProp::Ident(prop) => Some(prop.sym.to_string()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;
    use swc_ecma_ast::{ModuleItem, Stmt};

    fn first_call(src: &str) -> CallExpr {
        let parsed = parse_source(Path::new("x.ts"), src.to_string()).unwrap();
        let ModuleItem::Stmt(Stmt::Expr(stmt)) = &parsed.module.body[0] else {
            panic!("expected expression statement");
        };
        let Expr::Call(call) = &*stmt.expr else {
            panic!("expected call");
        };
        call.clone()
    }

    #[test]
    fn names_plain_and_member_callees() {
        let call = first_call("t.router({});");
        assert_eq!(callee_path(&call).as_deref(), Some("t.router"));
        assert_eq!(callee_name(&call).as_deref(), Some("router"));

        let call = first_call("createRouter();");
        assert_eq!(callee_path(&call).as_deref(), Some("createRouter"));

        let call = first_call("make()();");
        assert_eq!(callee_path(&call), None);
    }
}
