// src/parser.rs

use swc_common::{sync::Lrc, FileName, SourceMap, Span};
use swc_ecma_ast::Module;
use swc_ecma_parser::{lexer::Lexer, EsConfig, Parser as SwcParser, StringInput, Syntax, TsConfig};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScanError};

/// Extensions the project loader treats as source files.
pub const SOURCE_EXTENSIONS: [&str; 8] = ["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// One parsed source file together with the source map needed for line lookups.
pub struct ParsedFile {
    pub path: PathBuf,
    pub module: Module,
    cm: Lrc<SourceMap>,
}

impl ParsedFile {
    /// 1-based line of the start of `span`, 0 for synthesized spans.
    pub fn line_of(&self, span: Span) -> usize {
        if span.is_dummy() {
            return 0;
        }
        self.cm.lookup_char_pos(span.lo).line
    }
}

pub fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn syntax_for(path: &Path) -> Syntax {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") | Some("mts") | Some("cts") => Syntax::Typescript(TsConfig {
            tsx: false,
            decorators: true,
            dts: false,
            no_early_errors: true,
            disallow_ambiguous_jsx_like: true,
        }),
        Some("tsx") => Syntax::Typescript(TsConfig {
            tsx: true,
            decorators: true,
            dts: false,
            no_early_errors: true,
            disallow_ambiguous_jsx_like: false,
        }),
        _ => Syntax::Es(EsConfig {
            jsx: true,
            decorators: true,
            ..Default::default()
        }),
    }
}

pub fn parse_file(file_path: &Path) -> Result<ParsedFile> {
    let src = fs::read_to_string(file_path).map_err(|e| ScanError::io(file_path, e))?;
    parse_source(file_path, src)
}

pub fn parse_source(file_path: &Path, src: String) -> Result<ParsedFile> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Real(file_path.to_path_buf()), src);

    let lexer = Lexer::new(
        syntax_for(file_path),
        Default::default(),
        StringInput::from(&*fm),
        None,
    );

    let mut parser = SwcParser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| ScanError::Parse {
        path: file_path.to_path_buf(),
        message: format!("{:?}", e.kind()),
    })?;

    Ok(ParsedFile {
        path: file_path.to_path_buf(),
        module,
        cm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::Spanned;
    use swc_ecma_ast::ModuleItem;

    #[test]
    fn parses_typescript_with_decorators() {
        let src = "@Controller('cats')\nexport class CatsController {\n  @Get() findAll() {}\n}\n";
        let parsed = parse_source(Path::new("cats.controller.ts"), src.to_string()).unwrap();
        assert_eq!(parsed.module.body.len(), 1);
    }

    #[test]
    fn reports_one_based_lines() {
        let parsed = parse_source(Path::new("a.ts"), "const a = 1;\nconst b = 2;\n".to_string()).unwrap();
        let ModuleItem::Stmt(second) = &parsed.module.body[1] else {
            panic!("expected statement");
        };
        assert_eq!(parsed.line_of(second.span()), 2);
    }

    #[test]
    fn parses_jsx_in_js_files() {
        let src = "export default function Page() { return <div /> }";
        assert!(parse_source(Path::new("page.jsx"), src.to_string()).is_ok());
    }

    #[test]
    fn reports_syntax_errors() {
        let err = parse_source(Path::new("broken.ts"), "const = ;".to_string());
        assert!(matches!(err, Err(ScanError::Parse { .. })));
    }

    #[test]
    fn skips_declaration_files() {
        assert!(is_source_file(Path::new("src/app/route.ts")));
        assert!(!is_source_file(Path::new("types/env.d.ts")));
        assert!(!is_source_file(Path::new("README.md")));
    }
}
