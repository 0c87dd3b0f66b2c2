// src/resolver.rs

use indexmap::IndexMap;
use path_absolutize::Absolutize;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::DebugSink;
use crate::parser::SOURCE_EXTENSIONS;

/// Compiler configuration files consulted, in order.
const CONFIG_FILES: [&str; 2] = ["tsconfig.json", "jsconfig.json"];

#[derive(Debug, Default, Deserialize)]
struct RawTsConfig {
    extends: Option<String>,
    #[serde(rename = "compilerOptions")]
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCompilerOptions {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    /// Insertion order matters: the first matching pattern wins.
    paths: Option<IndexMap<String, Vec<String>>>,
}

/// Maps module specifiers to concrete files on disk.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    base_url: Option<PathBuf>,
    paths: IndexMap<String, Vec<PathBuf>>,
}

impl ImportResolver {
    /// Resolver that only understands relative specifiers.
    pub fn relative_only() -> Self {
        ImportResolver {
            base_url: None,
            paths: IndexMap::new(),
        }
    }

    /// Reads `tsconfig.json` (or `jsconfig.json`) under `root`. A missing or
    /// malformed file degrades to [`ImportResolver::relative_only`].
    pub fn from_project_root(root: &Path, sink: &dyn DebugSink) -> Self {
        for name in CONFIG_FILES {
            let candidate = root.join(name);
            if !candidate.is_file() {
                continue;
            }
            let mut visited = HashSet::new();
            match load_config(&candidate, &mut visited) {
                Ok(resolver) => {
                    sink.debug(&format!(
                        "using {} ({} path mappings)",
                        candidate.display(),
                        resolver.paths.len()
                    ));
                    return resolver;
                }
                Err(message) => {
                    sink.warn(&format!("ignoring {}: {message}", candidate.display()));
                }
            }
        }
        Self::relative_only()
    }

    /// Resolves `specifier` as imported from `from_file`.
    ///
    /// Returns `None` for package imports and for anything that does not land
    /// on an existing source file.
    pub fn resolve(&self, from_file: &Path, specifier: &str) -> Option<PathBuf> {
        if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            let parent_dir = from_file.parent()?;
            return probe(&parent_dir.join(specifier));
        }
        if specifier.starts_with('/') {
            return probe(Path::new(specifier));
        }

        for (pattern, targets) in &self.paths {
            let Some(captured) = match_pattern(pattern, specifier) else {
                continue;
            };
            for target in targets {
                let substituted = target.to_string_lossy().replacen('*', captured, 1);
                if let Some(found) = probe(Path::new(&substituted)) {
                    return Some(found);
                }
            }
        }

        self.base_url
            .as_ref()
            .and_then(|base| probe(&base.join(specifier)))
    }
}

fn load_config(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<ImportResolver, String> {
    let canonical = absolute(path);
    if !visited.insert(canonical.clone()) {
        return Err(format!("circular extends through {}", path.display()));
    }
    let content = fs::read_to_string(&canonical).map_err(|e| e.to_string())?;
    let raw: RawTsConfig = serde_json::from_str(&strip_trailing_commas(&strip_json_comments(&content)))
        .map_err(|e| e.to_string())?;
    let config_dir = canonical.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let mut resolved = match &raw.extends {
        Some(parent) if parent.starts_with('.') => {
            let mut parent_path = config_dir.join(parent);
            if parent_path.extension().is_none() {
                parent_path.set_extension("json");
            }
            if parent_path.is_file() {
                load_config(&parent_path, visited)?
            } else {
                ImportResolver::relative_only()
            }
        }
        // Package-provided bases live in node_modules, which is never loaded.
        _ => ImportResolver::relative_only(),
    };

    let options = raw.compiler_options.unwrap_or_default();
    if let Some(base) = &options.base_url {
        resolved.base_url = Some(absolute(&config_dir.join(base)));
    }
    if let Some(paths) = options.paths {
        let anchor = resolved.base_url.clone().unwrap_or_else(|| config_dir.clone());
        for (pattern, targets) in paths {
            let targets = targets.iter().map(|t| anchor.join(t)).collect();
            resolved.paths.insert(pattern, targets);
        }
    }
    Ok(resolved)
}

/// Matches a tsconfig `paths` key (at most one `*`) and returns the text the
/// wildcard captured.
fn match_pattern<'a>(pattern: &str, specifier: &'a str) -> Option<&'a str> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            let rest = specifier.strip_prefix(prefix)?;
            let captured = rest.strip_suffix(suffix)?;
            Some(captured)
        }
        None => (pattern == specifier).then_some(""),
    }
}

/// Tries `base` as-is, with each source extension, as a directory index, and
/// finally with a `.js` specifier swapped for its TypeScript source.
fn probe(base: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = vec![base.to_path_buf()];

    let base_str = base.to_string_lossy();
    for ext in SOURCE_EXTENSIONS {
        candidates.push(PathBuf::from(format!("{base_str}.{ext}")));
    }
    for ext in SOURCE_EXTENSIONS {
        candidates.push(base.join(format!("index.{ext}")));
    }
    for (js, ts) in [("js", "ts"), ("js", "tsx"), ("jsx", "tsx"), ("mjs", "mts"), ("cjs", "cts")] {
        if base.extension().is_some_and(|e| e == js) {
            candidates.push(base.with_extension(ts));
        }
    }

    candidates
        .into_iter()
        .map(|cand| absolute(&cand))
        .find(|abs| abs.is_file())
}

/// Lexically normalized absolute path, without touching symlinks.
pub fn absolute(path: &Path) -> PathBuf {
    path.absolutize()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Removes `//` and `/* */` comments outside string literals.
pub(crate) fn strip_json_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(ch) = chars.next() {
        if in_string {
            result.push(ch);
            if escape_next {
                escape_next = false;
            } else if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        let next = chars.peek().copied();
        match (ch, next) {
            ('"', _) => {
                in_string = true;
                result.push(ch);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Drops commas that directly precede `}` or `]`, ignoring whitespace.
pub(crate) fn strip_trailing_commas(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut result = String::with_capacity(content.len());
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            result.push(ch);
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(ch);
    }
    result
}
