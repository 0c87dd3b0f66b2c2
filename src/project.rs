// src/project.rs

//! Eagerly loaded, AST-queryable view of a source tree.
//!
//! Every candidate file is parsed once up front. Module-scope declarations
//! (variables, imports, re-exports, default exports) are interned into a
//! single arena so the symbol resolver can track visited declarations by
//! index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use swc_common::Span;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};
use walkdir::WalkDir;

use crate::error::{Result, ScanError};
use crate::logging::DebugSink;
use crate::parser::{is_source_file, parse_file, ParsedFile};
use crate::resolver::{absolute, ImportResolver};

/// Directories never descended into.
pub const IGNORED_DIRS: [&str; 10] = [
    "node_modules",
    ".git",
    ".next",
    ".turbo",
    ".vercel",
    "dist",
    "build",
    "out",
    "coverage",
    ".output",
];

pub type FileId = usize;
pub type DeclId = usize;

/// Name a module imports from another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

#[derive(Debug)]
pub enum DeclKind {
    /// Variable initializer, `export default <expr>` or `export = <expr>`.
    Value(Box<Expr>),
    /// Import specifier or `export { x } from` re-export.
    Import {
        specifier: String,
        imported: ImportedName,
    },
    /// Function, class or uninitialized binding; never resolves to a literal.
    Opaque,
}

#[derive(Debug)]
pub struct Declaration {
    pub file: FileId,
    pub name: String,
    pub span: Span,
    pub kind: DeclKind,
}

pub struct SourceFile {
    pub id: FileId,
    pub parsed: ParsedFile,
    /// Path relative to the project root, `/`-separated.
    pub rel_path: String,
    bindings: HashMap<String, DeclId>,
    exports: HashMap<String, DeclId>,
    star_exports: Vec<String>,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.parsed.path
    }

    pub fn module(&self) -> &Module {
        &self.parsed.module
    }

    pub fn line_of(&self, span: Span) -> usize {
        self.parsed.line_of(span)
    }

    pub fn binding(&self, local: &str) -> Option<DeclId> {
        self.bindings.get(local).copied()
    }

    pub fn export(&self, exported: &str) -> Option<DeclId> {
        self.exports.get(exported).copied()
    }

    pub fn star_exports(&self) -> &[String] {
        &self.star_exports
    }
}

pub struct Project {
    root: PathBuf,
    files: Vec<SourceFile>,
    by_path: HashMap<PathBuf, FileId>,
    decls: Vec<Declaration>,
    imports: ImportResolver,
}

impl Project {
    /// Walks `root`, parsing every source file. Files that fail to read or
    /// parse are reported to `sink` and left out.
    pub fn load(root: &Path, sink: &dyn DebugSink) -> Result<Project> {
        if !root.is_dir() {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }
        let root = absolute(root);
        let imports = ImportResolver::from_project_root(&root, sink);
        let mut project = Project {
            root: root.clone(),
            files: Vec::new(),
            by_path: HashMap::new(),
            decls: Vec::new(),
            imports,
        };

        let mut candidates: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && e.file_name().to_str().is_some_and(|n| IGNORED_DIRS.contains(&n)))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_source_file(e.path()))
            .map(|e| e.into_path())
            .collect();
        candidates.sort();

        for path in candidates {
            project.get_or_load(&path, sink);
        }
        sink.debug(&format!(
            "loaded {} source files ({} module-scope declarations) from {}",
            project.files.len(),
            project.decls.len(),
            project.root.display()
        ));
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id]
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(&absolute(path)).copied()
    }

    /// Returns the id of an already loaded file, parsing it first if needed.
    pub fn get_or_load(&mut self, path: &Path, sink: &dyn DebugSink) -> Option<FileId> {
        let path = absolute(path);
        if let Some(id) = self.by_path.get(&path) {
            return Some(*id);
        }
        let parsed = match parse_file(&path) {
            Ok(parsed) => parsed,
            Err(e) => {
                sink.warn(&format!("skipping file: {e}"));
                return None;
            }
        };
        let id = self.files.len();
        let rel_path = path
            .strip_prefix(&self.root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let index = index_module(&parsed.module, id, &mut self.decls);
        self.files.push(SourceFile {
            id,
            parsed,
            rel_path,
            bindings: index.bindings,
            exports: index.exports,
            star_exports: index.star_exports,
        });
        self.by_path.insert(path, id);
        Some(id)
    }

    /// Resolves an import specifier written in `from` to a loaded file.
    pub fn resolve_import(&self, from: FileId, specifier: &str) -> Option<FileId> {
        let target = self.imports.resolve(self.files[from].path(), specifier)?;
        self.by_path.get(&target).copied()
    }

    /// Declaration exported as `name` by `file`, not following `export *`.
    pub fn find_exported(&self, file: FileId, name: &str) -> Option<&Declaration> {
        self.files[file].export(name).map(|id| &self.decls[id])
    }

    /// Every call expression in the project for which `predicate` holds, in
    /// file order. Calls are returned by value; nested matches are included.
    pub fn find_calls<P>(&self, predicate: P) -> Vec<(FileId, CallExpr)>
    where
        P: Fn(&CallExpr) -> bool,
    {
        let mut found = Vec::new();
        for file in &self.files {
            for call in calls_in(file.module(), &predicate) {
                found.push((file.id, call));
            }
        }
        found
    }

    /// Like [`Project::find_calls`] restricted to one file.
    pub fn find_calls_in<P>(&self, file: FileId, predicate: P) -> Vec<CallExpr>
    where
        P: Fn(&CallExpr) -> bool,
    {
        calls_in(self.files[file].module(), &predicate)
    }

    /// For an import binding, the name it has in the module it comes from.
    pub fn imported_name(&self, file: FileId, local: &str) -> Option<String> {
        let decl = &self.decls[self.files[file].binding(local)?];
        match &decl.kind {
            DeclKind::Import {
                imported: ImportedName::Named(name),
                ..
            } => Some(name.clone()),
            _ => None,
        }
    }
}

struct CallCollector<'a, P> {
    predicate: &'a P,
    found: Vec<CallExpr>,
}

impl<P: Fn(&CallExpr) -> bool> Visit for CallCollector<'_, P> {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if (self.predicate)(call) {
            self.found.push(call.clone());
        }
        call.visit_children_with(self);
    }
}

fn calls_in<P: Fn(&CallExpr) -> bool>(module: &Module, predicate: &P) -> Vec<CallExpr> {
    let mut collector = CallCollector {
        predicate,
        found: Vec::new(),
    };
    module.visit_with(&mut collector);
    collector.found
}

struct ModuleIndex {
    bindings: HashMap<String, DeclId>,
    exports: HashMap<String, DeclId>,
    star_exports: Vec<String>,
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_string(),
    }
}

/// Interns the module-scope declarations of one file.
fn index_module(module: &Module, file: FileId, decls: &mut Vec<Declaration>) -> ModuleIndex {
    let mut index = ModuleIndex {
        bindings: HashMap::new(),
        exports: HashMap::new(),
        star_exports: Vec::new(),
    };
    let push = |decls: &mut Vec<Declaration>, name: String, span: Span, kind: DeclKind| {
        decls.push(Declaration {
            file,
            name,
            span,
            kind,
        });
        decls.len() - 1
    };

    // Local bindings first so `export { a as b }` can refer to them.
    let mut local_exports: Vec<(String, String)> = Vec::new();
    for item in &module.body {
        match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => {
                for (name, span, kind) in declared(decl) {
                    let id = push(decls, name.clone(), span, kind);
                    index.bindings.insert(name, id);
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                for (name, span, kind) in declared(&export.decl) {
                    let id = push(decls, name.clone(), span, kind);
                    index.bindings.insert(name.clone(), id);
                    index.exports.insert(name, id);
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                if import.type_only {
                    continue;
                }
                let specifier = import.src.value.to_string();
                for spec in &import.specifiers {
                    let (local, imported) = match spec {
                        ImportSpecifier::Named(named) => {
                            if named.is_type_only {
                                continue;
                            }
                            let imported = named
                                .imported
                                .as_ref()
                                .map(export_name)
                                .unwrap_or_else(|| named.local.sym.to_string());
                            let imported = if imported == "default" {
                                ImportedName::Default
                            } else {
                                ImportedName::Named(imported)
                            };
                            (&named.local, imported)
                        }
                        ImportSpecifier::Default(default) => (&default.local, ImportedName::Default),
                        ImportSpecifier::Namespace(ns) => (&ns.local, ImportedName::Namespace),
                    };
                    let id = push(
                        decls,
                        local.sym.to_string(),
                        local.span,
                        DeclKind::Import {
                            specifier: specifier.clone(),
                            imported,
                        },
                    );
                    index.bindings.insert(local.sym.to_string(), id);
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => {
                if named.type_only {
                    continue;
                }
                for spec in &named.specifiers {
                    match (spec, &named.src) {
                        (ExportSpecifier::Named(s), Some(src)) => {
                            let orig = export_name(&s.orig);
                            let exported = s.exported.as_ref().map(export_name).unwrap_or_else(|| orig.clone());
                            let imported = if orig == "default" {
                                ImportedName::Default
                            } else {
                                ImportedName::Named(orig)
                            };
                            let id = push(
                                decls,
                                exported.clone(),
                                named.span,
                                DeclKind::Import {
                                    specifier: src.value.to_string(),
                                    imported,
                                },
                            );
                            index.exports.insert(exported, id);
                        }
                        (ExportSpecifier::Named(s), None) => {
                            let orig = export_name(&s.orig);
                            let exported = s.exported.as_ref().map(export_name).unwrap_or_else(|| orig.clone());
                            local_exports.push((orig, exported));
                        }
                        (ExportSpecifier::Namespace(ns), Some(src)) => {
                            let exported = export_name(&ns.name);
                            let id = push(
                                decls,
                                exported.clone(),
                                named.span,
                                DeclKind::Import {
                                    specifier: src.value.to_string(),
                                    imported: ImportedName::Namespace,
                                },
                            );
                            index.exports.insert(exported, id);
                        }
                        (ExportSpecifier::Default(d), Some(src)) => {
                            let id = push(
                                decls,
                                d.exported.sym.to_string(),
                                named.span,
                                DeclKind::Import {
                                    specifier: src.value.to_string(),
                                    imported: ImportedName::Default,
                                },
                            );
                            index.exports.insert(d.exported.sym.to_string(), id);
                        }
                        _ => {}
                    }
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportAll(all)) => {
                if !all.type_only {
                    index.star_exports.push(all.src.value.to_string());
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(default)) => {
                let id = push(
                    decls,
                    "default".to_string(),
                    default.span,
                    DeclKind::Value(default.expr.clone()),
                );
                index.exports.insert("default".to_string(), id);
            }
            ModuleItem::ModuleDecl(ModuleDecl::TsExportAssignment(assign)) => {
                let id = push(
                    decls,
                    "default".to_string(),
                    assign.span,
                    DeclKind::Value(assign.expr.clone()),
                );
                index.exports.insert("default".to_string(), id);
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(default)) => {
                let (name, kind) = match &default.decl {
                    DefaultDecl::Fn(f) => (f.ident.as_ref().map(|i| i.sym.to_string()), DeclKind::Opaque),
                    DefaultDecl::Class(c) => (c.ident.as_ref().map(|i| i.sym.to_string()), DeclKind::Opaque),
                    DefaultDecl::TsInterfaceDecl(_) => continue,
                };
                let id = push(decls, "default".to_string(), default.span, kind);
                index.exports.insert("default".to_string(), id);
                if let Some(name) = name {
                    index.bindings.insert(name, id);
                }
            }
            _ => {}
        }
    }

    for (orig, exported) in local_exports {
        if let Some(id) = index.bindings.get(&orig) {
            index.exports.insert(exported, *id);
        }
    }
    index
}

/// Names introduced by a declaration statement.
fn declared(decl: &Decl) -> Vec<(String, Span, DeclKind)> {
    match decl {
        Decl::Var(var) => var
            .decls
            .iter()
            .filter_map(|declarator| {
                let Pat::Ident(binding) = &declarator.name else {
                    return None;
                };
                let kind = match &declarator.init {
                    Some(init) => DeclKind::Value(init.clone()),
                    None => DeclKind::Opaque,
                };
                Some((binding.id.sym.to_string(), declarator.span, kind))
            })
            .collect(),
        Decl::Fn(f) => vec![(f.ident.sym.to_string(), f.function.span, DeclKind::Opaque)],
        Decl::Class(c) => vec![(c.ident.sym.to_string(), c.class.span, DeclKind::Opaque)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoopSink;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_sources_and_skips_ignored_and_broken_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.ts", "export const a = { x: 1 };");
        write(dir.path(), "src/broken.ts", "export const = ;");
        write(dir.path(), "node_modules/pkg/index.js", "module.exports = {}");
        write(dir.path(), "types/env.d.ts", "declare const x: number;");

        let project = Project::load(dir.path(), &NoopSink).unwrap();
        let rels: Vec<_> = project.files().iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["src/a.ts"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            Project::load(&missing, &NoopSink),
            Err(ScanError::RootNotFound(_))
        ));
    }

    #[test]
    fn indexes_exports_imports_and_reexports() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "lib.ts",
            r#"
            import def, { a as b } from './other';
            import * as ns from './other';
            const local = { y: 2 };
            export { local as renamed };
            export { c } from './other';
            export * from './more';
            export default local;
            "#,
        );
        write(dir.path(), "other.ts", "export const a = 1; export const c = 2; export default {};");
        write(dir.path(), "more.ts", "export const m = 1;");

        let project = Project::load(dir.path(), &NoopSink).unwrap();
        let lib = project.file_id(&dir.path().join("lib.ts")).unwrap();
        let file = project.file(lib);

        assert!(file.binding("def").is_some());
        assert_eq!(project.imported_name(lib, "b").as_deref(), Some("a"));
        assert!(matches!(
            project.decl(file.binding("ns").unwrap()).kind,
            DeclKind::Import {
                imported: ImportedName::Namespace,
                ..
            }
        ));
        assert_eq!(project.find_exported(lib, "renamed").unwrap().name, "local");
        assert!(project.find_exported(lib, "c").is_some());
        assert!(project.find_exported(lib, "default").is_some());
        assert_eq!(file.star_exports(), ["./more".to_string()]);

        let other = project.resolve_import(lib, "./other").unwrap();
        assert_eq!(project.file(other).rel_path, "other.ts");
    }

    #[test]
    fn finds_calls_by_predicate() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "payload.config.ts",
            "export default buildConfig({ collections: [] }); other();",
        );
        let project = Project::load(dir.path(), &NoopSink).unwrap();
        let calls = project.find_calls(|call| {
            matches!(&call.callee, Callee::Expr(e) if matches!(&**e, Expr::Ident(i) if &*i.sym == "buildConfig"))
        });
        assert_eq!(calls.len(), 1);
        assert_eq!(project.file(calls[0].0).line_of(calls[0].1.span), 1);
    }
}
