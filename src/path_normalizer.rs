// src/path_normalizer.rs

//! Conversions from file-system routing syntax to the canonical parameter syntax.
//!
//! Canonical tokens follow path-to-regexp: `:name` for a plain parameter,
//! `:name+` for a catch-all and `:name*` for an optional catch-all.

use crate::model::DynamicSegment;

/// File names that never produce a route in the flat-file router.
pub const RESERVED_SEGMENTS: [&str; 5] = ["_app", "_document", "_error", "404", "500"];

pub fn is_reserved_segment(segment: &str) -> bool {
    RESERVED_SEGMENTS.contains(&segment)
}

/// Converts one path component. Optional catch-all is tested before catch-all,
/// which is tested before the plain form, since each later pattern is a
/// substring of the earlier one.
pub fn normalize_segment(segment: &str) -> String {
    if let Some(name) = segment
        .strip_prefix("[[...")
        .and_then(|rest| rest.strip_suffix("]]"))
    {
        return format!(":{name}*");
    }
    if let Some(name) = segment
        .strip_prefix("[...")
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return format!(":{name}+");
    }
    if let Some(name) = segment
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return format!(":{name}");
    }
    segment.to_string()
}

/// Converts every bracketed component of `path`. Idempotent.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(normalize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Parses a single component written either in bracket syntax or in the
/// canonical syntax.
pub fn dynamic_segment(segment: &str) -> Option<DynamicSegment> {
    let segment = normalize_segment(segment);
    let name = segment.strip_prefix(':')?;
    let (name, is_catch_all, is_optional) = if let Some(n) = name.strip_suffix('*') {
        (n, true, true)
    } else if let Some(n) = name.strip_suffix('+') {
        (n, true, false)
    } else if let Some(n) = name.strip_suffix('?') {
        (n, false, true)
    } else {
        (name, false, false)
    };
    if name.is_empty() {
        return None;
    }
    Some(DynamicSegment {
        name: name.to_string(),
        is_catch_all,
        is_optional,
    })
}

pub fn extract_dynamic_segments(path: &str) -> Vec<DynamicSegment> {
    path.split('/').filter_map(dynamic_segment).collect()
}

/// Joins path fragments into one route path: a single leading `/`, no empty
/// components and no trailing `/`.
pub fn join_route<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .flat_map(|part| part.as_ref().split('/'))
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_each_bracket_form() {
        assert_eq!(normalize_segment("[[...slug]]"), ":slug*");
        assert_eq!(normalize_segment("[...slug]"), ":slug+");
        assert_eq!(normalize_segment("[slug]"), ":slug");
        assert_eq!(normalize_segment("users"), "users");
    }

    #[test]
    fn normalization_is_idempotent() {
        for path in [
            "/api/users/[id]",
            "/docs/[...slug]",
            "/shop/[[...filters]]",
            "/plain/path",
            "/a/[b]/[...c]",
        ] {
            let once = normalize_path(path);
            assert_eq!(normalize_path(&once), once, "{path}");
        }
    }

    #[test]
    fn forms_are_not_conflated() {
        let optional = normalize_segment("[[...slug]]");
        let catch_all = normalize_segment("[...slug]");
        let plain = normalize_segment("[slug]");
        assert_ne!(optional, catch_all);
        assert_ne!(catch_all, plain);
        assert_ne!(optional, plain);
    }

    #[test]
    fn extracts_segments_from_either_syntax() {
        let segments = extract_dynamic_segments("/api/[org]/[[...rest]]");
        assert_eq!(
            segments,
            vec![
                DynamicSegment {
                    name: "org".into(),
                    is_catch_all: false,
                    is_optional: false
                },
                DynamicSegment {
                    name: "rest".into(),
                    is_catch_all: true,
                    is_optional: true
                },
            ]
        );
        let canonical = extract_dynamic_segments("/files/:path+");
        assert_eq!(canonical.len(), 1);
        assert!(canonical[0].is_catch_all);
        assert!(!canonical[0].is_optional);
    }

    #[test]
    fn reserved_segments() {
        assert!(is_reserved_segment("_app"));
        assert!(is_reserved_segment("404"));
        assert!(!is_reserved_segment("users"));
    }

    #[test]
    fn join_route_collapses_slashes() {
        assert_eq!(join_route(&["/api/", "/users", ""]), "/api/users");
        assert_eq!(join_route::<&str>(&[]), "/");
        assert_eq!(join_route(&["api", "posts/:id/"]), "/api/posts/:id");
    }
}
