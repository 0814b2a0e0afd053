//! Include/exclude filtering of module ids.
//!
//! Mirrors the semantics bundler plugins conventionally use: exclude wins
//! over include, patterns that start with `**` or are absolute are matched
//! as written, and other patterns are anchored at the project root.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::error::SessionError;
use crate::options::ExtractorOptions;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Pure predicate deciding whether a module id participates in the transform.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl ScopeFilter {
    /// Compile include/exclude patterns, anchoring relative ones at `root`.
    pub fn new(include: &[String], exclude: &[String], root: &Path) -> Result<Self, SessionError> {
        Ok(Self {
            include: compile_all(include, root)?,
            exclude: compile_all(exclude, root)?,
        })
    }

    pub fn from_options(options: &ExtractorOptions, root: &Path) -> Result<Self, SessionError> {
        Self::new(&options.include, &options.exclude, root)
    }

    /// Returns `true` when `id` is included and not excluded.
    ///
    /// Virtual module ids (containing NUL) never match. A `?query` suffix is
    /// ignored. An empty include list includes everything.
    pub fn matches(&self, id: &str) -> bool {
        if id.contains('\0') {
            return false;
        }
        let id = normalize_id(id);
        if self
            .exclude
            .iter()
            .any(|pattern| pattern.matches_with(&id, MATCH_OPTIONS))
        {
            return false;
        }
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|pattern| pattern.matches_with(&id, MATCH_OPTIONS))
    }
}

/// Strip a `?query` suffix and normalise separators to `/`.
pub fn normalize_id(id: &str) -> String {
    let without_query = id.split_once('?').map_or(id, |(path, _)| path);
    without_query.replace('\\', "/")
}

fn compile_all(patterns: &[String], root: &Path) -> Result<Vec<Pattern>, SessionError> {
    patterns
        .iter()
        .map(|pattern| {
            let anchored = anchor_pattern(pattern, root);
            Pattern::new(&anchored).map_err(|error| SessionError::InvalidPattern {
                pattern: pattern.clone(),
                message: error.msg.to_string(),
            })
        })
        .collect()
}

fn anchor_pattern(pattern: &str, root: &Path) -> String {
    let pattern = normalize_recursive(&pattern.replace('\\', "/"));
    if pattern.starts_with("**") || pattern.starts_with('/') || Path::new(&pattern).is_absolute() {
        return pattern;
    }
    let root = Pattern::escape(&root.to_string_lossy().replace('\\', "/"));
    let relative = pattern.trim_start_matches("./");
    format!("{}/{}", root.trim_end_matches('/'), relative)
}

/// `**` is only recursive as a whole path component; elsewhere it behaves like `*`.
fn normalize_recursive(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|component| {
            if component == "**" || !component.contains("**") {
                component.to_string()
            } else {
                let mut collapsed = component.to_string();
                while collapsed.contains("**") {
                    collapsed = collapsed.replace("**", "*");
                }
                collapsed
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
