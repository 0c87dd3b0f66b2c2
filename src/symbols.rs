// src/symbols.rs

//! Traces reference expressions back to the literals they denote.
//!
//! Resolution follows module-scope bindings, import specifiers, re-exports
//! and `export *` across files. It never fails loudly: anything it cannot
//! trace yields `None` / an empty list and a debug diagnostic.

use std::collections::HashSet;

use swc_ecma_ast::*;

use crate::logging::DebugSink;
use crate::project::{DeclId, DeclKind, FileId, ImportedName, Project};

/// Hard bound on nested resolution steps.
pub const MAX_DEPTH: usize = 32;

/// An object literal together with the file it was found in.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedObject<'a> {
    pub object: &'a ObjectLit,
    pub file: FileId,
}

#[derive(Debug, Clone, Copy)]
pub enum PropValue<'a> {
    Expr(&'a Expr),
    Shorthand(&'a Ident),
}

/// A property read off an object literal.
#[derive(Debug, Clone, Copy)]
pub struct Property<'a> {
    pub file: FileId,
    pub value: PropValue<'a>,
}

#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Object(&'a ObjectLit, FileId),
    Array(&'a ArrayLit, FileId),
    Namespace(FileId),
    Str(&'a str),
    Bool(bool),
}

/// Per-call traversal state. Declarations, `export *` lookups and container
/// literals are tracked while they are on the active path, so circular
/// graphs terminate; `seen` deduplicates results by node identity.
#[derive(Default)]
struct Walk {
    active_decls: HashSet<DeclId>,
    active_exports: HashSet<(FileId, String)>,
    active_containers: HashSet<usize>,
    seen: HashSet<usize>,
    depth: usize,
}

/// Strips `as`, `satisfies`, `as const`, `<T>x`, `x!` and parentheses.
pub fn unwrap_expr(mut expr: &Expr) -> &Expr {
    loop {
        expr = match expr {
            Expr::Paren(e) => &e.expr,
            Expr::TsAs(e) => &e.expr,
            Expr::TsSatisfies(e) => &e.expr,
            Expr::TsConstAssertion(e) => &e.expr,
            Expr::TsTypeAssertion(e) => &e.expr,
            Expr::TsNonNull(e) => &e.expr,
            _ => return expr,
        };
    }
}

/// Key of a property as written, when it is statically known.
pub fn prop_name(name: &PropName) -> Option<String> {
    match name {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        PropName::Num(n) => Some(n.value.to_string()),
        _ => None,
    }
}

/// Value of a string literal or substitution-free template literal.
pub fn static_string(expr: &Expr) -> Option<String> {
    match unwrap_expr(expr) {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() && tpl.quasis.len() == 1 => {
            let quasi = &tpl.quasis[0];
            Some(match &quasi.cooked {
                Some(cooked) => cooked.to_string(),
                None => quasi.raw.to_string(),
            })
        }
        _ => None,
    }
}

pub struct SymbolResolver<'p> {
    project: &'p Project,
    sink: &'p dyn DebugSink,
}

impl<'p> SymbolResolver<'p> {
    pub fn new(project: &'p Project, sink: &'p dyn DebugSink) -> Self {
        SymbolResolver { project, sink }
    }

    pub fn project(&self) -> &'p Project {
        self.project
    }

    /// The object literal `expr` denotes, if any.
    pub fn resolve_object<'a>(&self, file: FileId, expr: &'a Expr) -> Option<ResolvedObject<'a>>
    where
        'p: 'a,
    {
        match self.value(file, expr, &mut Walk::default()) {
            Some(Value::Object(object, file)) => Some(ResolvedObject { object, file }),
            _ => {
                self.sink.debug(&format!(
                    "{}: expression does not resolve to an object literal",
                    self.project.file(file).rel_path
                ));
                None
            }
        }
    }

    /// Every object literal reachable from an array-valued expression,
    /// expanding spreads and references. Each literal appears once.
    pub fn resolve_array<'a>(&self, file: FileId, expr: &'a Expr) -> Vec<ResolvedObject<'a>>
    where
        'p: 'a,
    {
        let mut walk = Walk::default();
        let mut out = Vec::new();
        match self.value(file, expr, &mut walk) {
            Some(Value::Array(array, array_file)) => {
                self.elements(array, array_file, &mut walk, &mut out);
            }
            _ => self.sink.debug(&format!(
                "{}: expression does not resolve to an array literal",
                self.project.file(file).rel_path
            )),
        }
        out
    }

    /// The object literal exported as `name` by `file`.
    pub fn exported_object(&self, file: FileId, name: &str) -> Option<ResolvedObject<'p>> {
        match self.export_value(file, name, &mut Walk::default()) {
            Some(Value::Object(object, file)) => Some(ResolvedObject { object, file }),
            _ => None,
        }
    }

    /// Reads `key` from `object`, honouring shorthand properties and object
    /// spreads (later entries win).
    pub fn property<'a>(&self, object: ResolvedObject<'a>, key: &str) -> Option<Property<'a>>
    where
        'p: 'a,
    {
        self.lookup(object.object, object.file, key, &mut Walk::default())
    }

    pub fn property_object<'a>(&self, object: ResolvedObject<'a>, key: &str) -> Option<ResolvedObject<'a>>
    where
        'p: 'a,
    {
        let mut walk = Walk::default();
        let prop = self.lookup(object.object, object.file, key, &mut walk)?;
        match self.prop_value(prop, &mut walk)? {
            Value::Object(object, file) => Some(ResolvedObject { object, file }),
            _ => None,
        }
    }

    pub fn property_array<'a>(&self, object: ResolvedObject<'a>, key: &str) -> Vec<ResolvedObject<'a>>
    where
        'p: 'a,
    {
        let mut walk = Walk::default();
        let mut out = Vec::new();
        let Some(prop) = self.lookup(object.object, object.file, key, &mut walk) else {
            return out;
        };
        match self.prop_value(prop, &mut walk) {
            Some(Value::Array(array, file)) => self.elements(array, file, &mut walk, &mut out),
            _ => self.sink.debug(&format!(
                "{}: `{key}` does not resolve to an array literal",
                self.project.file(object.file).rel_path
            )),
        }
        out
    }

    pub fn property_string(&self, object: ResolvedObject<'_>, key: &str) -> Option<String> {
        let mut walk = Walk::default();
        let prop = self.lookup(object.object, object.file, key, &mut walk)?;
        match self.prop_value(prop, &mut walk)? {
            Value::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }

    /// `Some(true)` for `true` or any object literal, `Some(false)` for
    /// `false`, `None` when absent or not statically known.
    pub fn property_flag(&self, object: ResolvedObject<'_>, key: &str) -> Option<bool> {
        let mut walk = Walk::default();
        let prop = self.lookup(object.object, object.file, key, &mut walk)?;
        match self.prop_value(prop, &mut walk)? {
            Value::Bool(b) => Some(b),
            Value::Object(..) => Some(true),
            _ => None,
        }
    }

    fn value<'a>(&self, file: FileId, expr: &'a Expr, walk: &mut Walk) -> Option<Value<'a>>
    where
        'p: 'a,
    {
        if walk.depth >= MAX_DEPTH {
            self.sink.debug("symbol resolution depth limit reached");
            return None;
        }
        walk.depth += 1;
        let result = self.value_inner(file, expr, walk);
        walk.depth -= 1;
        result
    }

    fn value_inner<'a>(&self, file: FileId, expr: &'a Expr, walk: &mut Walk) -> Option<Value<'a>>
    where
        'p: 'a,
    {
        match unwrap_expr(expr) {
            Expr::Object(object) => Some(Value::Object(object, file)),
            Expr::Array(array) => Some(Value::Array(array, file)),
            Expr::Lit(Lit::Str(s)) => Some(Value::Str(&s.value)),
            Expr::Lit(Lit::Bool(b)) => Some(Value::Bool(b.value)),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() && tpl.quasis.len() == 1 => {
                let quasi = &tpl.quasis[0];
                Some(Value::Str(match &quasi.cooked {
                    Some(cooked) => cooked,
                    None => &quasi.raw,
                }))
            }
            Expr::Call(call) => self.call_value(file, call, walk),
            Expr::Ident(ident) => self.ident_value(file, &ident.sym, walk),
            Expr::Member(member) => {
                let key = match &member.prop {
                    MemberProp::Ident(ident) => ident.sym.to_string(),
                    MemberProp::Computed(computed) => static_string(&computed.expr)?,
                    MemberProp::PrivateName(_) => return None,
                };
                match self.value(file, &member.obj, walk)? {
                    Value::Object(object, object_file) => {
                        let prop = self.lookup(object, object_file, &key, walk)?;
                        self.prop_value(prop, walk)
                    }
                    Value::Namespace(target) => self.export_value(target, &key, walk),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// A factory-wrapped literal such as `defineConfig({ ... })` stands for
    /// its first object-literal argument.
    fn call_value<'a>(&self, file: FileId, call: &'a CallExpr, walk: &mut Walk) -> Option<Value<'a>>
    where
        'p: 'a,
    {
        for arg in &call.args {
            if arg.spread.is_some() {
                continue;
            }
            if let Expr::Object(object) = unwrap_expr(&arg.expr) {
                return Some(Value::Object(object, file));
            }
        }
        let first = call.args.first().filter(|arg| arg.spread.is_none())?;
        match unwrap_expr(&first.expr) {
            Expr::Ident(_) | Expr::Member(_) => match self.value(file, &first.expr, walk)? {
                found @ Value::Object(..) => Some(found),
                _ => None,
            },
            _ => None,
        }
    }

    fn ident_value(&self, file: FileId, name: &str, walk: &mut Walk) -> Option<Value<'p>> {
        let Some(id) = self.project.file(file).binding(name) else {
            self.sink.debug(&format!(
                "{}: no module-scope binding for `{name}`",
                self.project.file(file).rel_path
            ));
            return None;
        };
        self.decl_value(id, walk)
    }

    fn decl_value(&self, id: DeclId, walk: &mut Walk) -> Option<Value<'p>> {
        if !walk.active_decls.insert(id) {
            self.sink.debug(&format!(
                "circular reference through `{}`",
                self.project.decl(id).name
            ));
            return None;
        }
        let decl = self.project.decl(id);
        let result = match &decl.kind {
            DeclKind::Value(expr) => self.value(decl.file, expr, walk),
            DeclKind::Import {
                specifier,
                imported,
            } => self.import_value(decl.file, specifier, imported, walk),
            DeclKind::Opaque => None,
        };
        walk.active_decls.remove(&id);
        result
    }

    fn import_value(
        &self,
        from: FileId,
        specifier: &str,
        imported: &ImportedName,
        walk: &mut Walk,
    ) -> Option<Value<'p>> {
        let Some(target) = self.project.resolve_import(from, specifier) else {
            self.sink.debug(&format!(
                "{}: cannot resolve import `{specifier}`",
                self.project.file(from).rel_path
            ));
            return None;
        };
        match imported {
            ImportedName::Namespace => Some(Value::Namespace(target)),
            ImportedName::Default => self.export_value(target, "default", walk),
            ImportedName::Named(name) => self.export_value(target, name, walk),
        }
    }

    fn export_value(&self, file: FileId, name: &str, walk: &mut Walk) -> Option<Value<'p>> {
        if let Some(id) = self.project.file(file).export(name) {
            return self.decl_value(id, walk);
        }
        if name == "default" {
            return None;
        }
        let key = (file, name.to_string());
        if walk.depth >= MAX_DEPTH || !walk.active_exports.insert(key.clone()) {
            return None;
        }
        walk.depth += 1;
        let mut found = None;
        for specifier in self.project.file(file).star_exports() {
            let Some(target) = self.project.resolve_import(file, specifier) else {
                continue;
            };
            found = self.export_value(target, name, walk);
            if found.is_some() {
                break;
            }
        }
        walk.depth -= 1;
        walk.active_exports.remove(&key);
        found
    }

    fn lookup<'a>(&self, object: &'a ObjectLit, file: FileId, key: &str, walk: &mut Walk) -> Option<Property<'a>>
    where
        'p: 'a,
    {
        let container = object as *const ObjectLit as usize;
        if walk.depth >= MAX_DEPTH || !walk.active_containers.insert(container) {
            return None;
        }
        walk.depth += 1;
        let mut found = None;
        for prop in object.props.iter().rev() {
            match prop {
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::KeyValue(kv) if prop_name(&kv.key).as_deref() == Some(key) => {
                        found = Some(Property {
                            file,
                            value: PropValue::Expr(&kv.value),
                        });
                    }
                    Prop::Shorthand(ident) if &*ident.sym == key => {
                        found = Some(Property {
                            file,
                            value: PropValue::Shorthand(ident),
                        });
                    }
                    _ => {}
                },
                PropOrSpread::Spread(spread) => {
                    if let Some(Value::Object(base, base_file)) = self.value(file, &spread.expr, walk) {
                        found = self.lookup(base, base_file, key, walk);
                    }
                }
            }
            if found.is_some() {
                break;
            }
        }
        walk.depth -= 1;
        walk.active_containers.remove(&container);
        found
    }

    fn prop_value<'a>(&self, prop: Property<'a>, walk: &mut Walk) -> Option<Value<'a>>
    where
        'p: 'a,
    {
        match prop.value {
            PropValue::Expr(expr) => self.value(prop.file, expr, walk),
            PropValue::Shorthand(ident) => self.ident_value(prop.file, &ident.sym, walk),
        }
    }

    fn elements<'a>(&self, array: &'a ArrayLit, file: FileId, walk: &mut Walk, out: &mut Vec<ResolvedObject<'a>>)
    where
        'p: 'a,
    {
        let container = array as *const ArrayLit as usize;
        if walk.depth >= MAX_DEPTH || !walk.active_containers.insert(container) {
            self.sink.debug("skipping self-referential array spread");
            return;
        }
        walk.depth += 1;
        for elem in array.elems.iter().flatten() {
            match self.value(file, &elem.expr, walk) {
                Some(Value::Array(inner, inner_file)) if elem.spread.is_some() => {
                    self.elements(inner, inner_file, walk, out);
                }
                Some(Value::Object(object, object_file)) if elem.spread.is_none() => {
                    if walk.seen.insert(object as *const ObjectLit as usize) {
                        out.push(ResolvedObject {
                            object,
                            file: object_file,
                        });
                    }
                }
                _ => self.sink.debug(&format!(
                    "{}: skipping unresolvable array element",
                    self.project.file(file).rel_path
                )),
            }
        }
        walk.depth -= 1;
        walk.active_containers.remove(&container);
    }
}
