//! Project configuration discovery and parsing.
//!
//! Locates `tsconfig.json` by walking up from the project root, follows the
//! `extends` chain, and turns `files`/`include`/`exclude` into the set of
//! program member files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::SessionError;
use crate::options::CompilerOptions;

const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];
const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];
const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "bower_components", "jspm_packages"];
const MAX_EXTENDS_DEPTH: usize = 16;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Search `search_from` and its ancestors for `config_name`.
///
/// An absolute `config_name` is checked directly.
pub fn find_config_file(search_from: &Path, config_name: &str) -> Option<PathBuf> {
    let requested = Path::new(config_name);
    if requested.is_absolute() {
        return requested.is_file().then(|| requested.to_path_buf());
    }
    search_from
        .ancestors()
        .map(|dir| normalize_path(&dir.join(requested)))
        .find(|candidate| candidate.is_file())
}

/// Raw shape of a tsconfig file; only the keys the analysis needs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsconfig {
    #[serde(default)]
    extends: Option<Extends>,
    #[serde(default)]
    compiler_options: Option<CompilerOptions>,
    #[serde(default)]
    files: Option<Vec<String>>,
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

/// A fully resolved project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// The configuration file the session was rooted at.
    pub config_path: PathBuf,
    /// Directory containing `config_path`.
    pub root_dir: PathBuf,
    /// Every configuration file read, `config_path` first.
    pub config_chain: Vec<PathBuf>,
    /// Effective options: defaults, then the `extends` chain, then overrides.
    pub compiler_options: CompilerOptions,
    files: Vec<PathBuf>,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    search_roots: Vec<PathBuf>,
}

/// A directory the session watches for changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    /// Whether subdirectories are covered too.
    pub recursive: bool,
}

/// Settings accumulated while walking the `extends` chain.
#[derive(Default)]
struct Layered {
    compiler_options: CompilerOptions,
    files: Option<(PathBuf, Vec<String>)>,
    include: Option<(PathBuf, Vec<String>)>,
    exclude: Option<(PathBuf, Vec<String>)>,
    chain: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Read `config_path`, following `extends`, and layer `overrides` on top.
    pub fn load(config_path: &Path, overrides: &CompilerOptions) -> Result<Self, SessionError> {
        let config_path = normalize_path(config_path);
        let root_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut layered = Layered::default();
        let mut visiting = FxHashSet::default();
        read_layer(&config_path, &mut layered, &mut visiting, 0)?;
        // The chain is collected base-first; the root config leads.
        layered.chain.reverse();

        let mut compiler_options = CompilerOptions::defaults().merge(&layered.compiler_options);
        let mut overrides = overrides.clone();
        if let Some(base_url) = overrides.base_url.take() {
            overrides.base_url = Some(resolve_against(&root_dir, &base_url));
        }
        if let Some(out_dir) = overrides.out_dir.take() {
            overrides.out_dir = Some(resolve_against(&root_dir, &out_dir));
        }
        compiler_options = compiler_options.merge(&overrides);
        compiler_options.no_emit = Some(true);

        let files = layered
            .files
            .as_ref()
            .map(|(dir, files)| files.iter().map(|file| normalize_path(&dir.join(file))).collect())
            .unwrap_or_default();

        let (include_dir, include_specs) = match layered.include {
            Some(include) => include,
            None if layered.files.is_some() => (root_dir.clone(), Vec::new()),
            None => (root_dir.clone(), vec!["**/*".to_string()]),
        };
        let (exclude_dir, mut exclude_specs) = match layered.exclude {
            Some(exclude) => exclude,
            None => (
                root_dir.clone(),
                DEFAULT_EXCLUDE.iter().map(|spec| spec.to_string()).collect(),
            ),
        };
        if let Some(out_dir) = compiler_options.out_dir.as_ref() {
            exclude_specs.push(out_dir.clone());
        }

        let mut include = Vec::new();
        let mut search_roots = Vec::new();
        for spec in &include_specs {
            let anchored = anchor_spec(&include_dir, spec, true);
            search_roots.push(literal_prefix(&anchored));
            include.push(compile(&config_path, &anchored)?);
        }

        let mut exclude = Vec::new();
        for spec in &exclude_specs {
            let anchored = anchor_spec(&exclude_dir, spec, false);
            exclude.push(compile(&config_path, &anchored)?);
            exclude.push(compile(&config_path, &format!("{anchored}/**"))?);
        }

        Ok(Self {
            config_path,
            root_dir,
            config_chain: layered.chain,
            compiler_options,
            files,
            include,
            exclude,
            search_roots,
        })
    }

    /// Enumerate member files: explicit `files`, then `include` matches.
    pub fn discover_files(&self) -> Vec<PathBuf> {
        let mut seen = FxHashSet::default();
        let mut discovered = Vec::new();

        for file in &self.files {
            if file.is_file() && seen.insert(file.clone()) {
                discovered.push(file.clone());
            }
        }

        for root in &self.search_roots {
            let walker = WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry.path()));
            for entry in walker.filter_map(|entry| entry.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = normalize_path(entry.path());
                if self.matches_patterns(&path) && seen.insert(path.clone()) {
                    discovered.push(path);
                }
            }
        }

        discovered.sort();
        discovered
    }

    /// Whether `path` belongs to the program.
    pub fn contains(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        self.files.contains(&path) || self.matches_patterns(&path)
    }

    /// Whether `path` is one of the configuration files read.
    pub fn is_config_file(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        self.config_chain.contains(&path)
    }

    /// Directories to watch so every member file and configuration file is
    /// observed.
    ///
    /// Each include search root is watched shallowly and its subdirectories
    /// recursively, skipping dependency and hidden directories. Parents of
    /// explicit `files` and of every config in the `extends` chain are
    /// watched shallowly. A search root that does not exist yet is covered
    /// through its parent.
    pub fn watch_targets(&self) -> Vec<WatchTarget> {
        let mut targets: BTreeMap<PathBuf, bool> = BTreeMap::new();
        let mut add = |path: PathBuf, recursive: bool| {
            *targets.entry(path).or_insert(false) |= recursive;
        };

        for root in &self.search_roots {
            if root.is_dir() {
                add(root.clone(), false);
                let Ok(entries) = fs::read_dir(root) else {
                    continue;
                };
                for entry in entries.filter_map(|entry| entry.ok()) {
                    let path = entry.path();
                    if path.is_dir() && !is_ignored_dir(&path) {
                        add(normalize_path(&path), true);
                    }
                }
            } else if let Some(parent) = root.parent().filter(|parent| parent.is_dir()) {
                add(parent.to_path_buf(), false);
            }
        }
        for file in self.files.iter().chain(&self.config_chain) {
            if let Some(parent) = file.parent() {
                add(parent.to_path_buf(), false);
            }
        }

        let recursive: Vec<PathBuf> = targets
            .iter()
            .filter(|(_, recursive)| **recursive)
            .map(|(path, _)| path.clone())
            .collect();
        targets
            .into_iter()
            .filter(|(path, _)| {
                !recursive
                    .iter()
                    .any(|ancestor| ancestor != path && path.starts_with(ancestor))
            })
            .map(|(path, recursive)| WatchTarget { path, recursive })
            .collect()
    }

    fn matches_patterns(&self, path: &Path) -> bool {
        if !self.has_supported_extension(path) {
            return false;
        }
        let text = path.to_string_lossy().replace('\\', "/");
        self.include
            .iter()
            .any(|pattern| pattern.matches_with(&text, MATCH_OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|pattern| pattern.matches_with(&text, MATCH_OPTIONS))
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        TS_EXTENSIONS.contains(&ext)
            || (self.compiler_options.allow_js_enabled() && JS_EXTENSIONS.contains(&ext))
    }
}

fn read_layer(
    path: &Path,
    layered: &mut Layered,
    visiting: &mut FxHashSet<PathBuf>,
    depth: usize,
) -> Result<(), SessionError> {
    if depth > MAX_EXTENDS_DEPTH || !visiting.insert(path.to_path_buf()) {
        return Err(SessionError::invalid(
            path.to_path_buf(),
            "circular or too deeply nested `extends`",
        ));
    }

    let content = fs::read_to_string(path).map_err(|error| SessionError::io(path.to_path_buf(), &error))?;
    let raw: RawTsconfig = serde_json::from_str(&strip_json_comments(&content))
        .map_err(|error| SessionError::invalid(path.to_path_buf(), error.to_string()))?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let bases = match &raw.extends {
        Some(Extends::One(spec)) => vec![spec.clone()],
        Some(Extends::Many(specs)) => specs.clone(),
        None => Vec::new(),
    };
    for spec in bases {
        let base = resolve_extends(&dir, &spec).ok_or_else(|| {
            SessionError::invalid(path.to_path_buf(), format!("cannot resolve extends '{spec}'"))
        })?;
        read_layer(&base, layered, visiting, depth + 1)?;
    }

    if let Some(mut options) = raw.compiler_options {
        if let Some(base_url) = options.base_url.take() {
            options.base_url = Some(resolve_against(&dir, &base_url));
        }
        if let Some(out_dir) = options.out_dir.take() {
            options.out_dir = Some(resolve_against(&dir, &out_dir));
        }
        layered.compiler_options = std::mem::take(&mut layered.compiler_options).merge(&options);
    }
    if let Some(files) = raw.files {
        layered.files = Some((dir.clone(), files));
    }
    if let Some(include) = raw.include {
        layered.include = Some((dir.clone(), include));
    }
    if let Some(exclude) = raw.exclude {
        layered.exclude = Some((dir, exclude));
    }
    layered.chain.push(path.to_path_buf());
    visiting.remove(path);
    Ok(())
}

fn resolve_extends(dir: &Path, spec: &str) -> Option<PathBuf> {
    let candidates = |base: PathBuf| {
        let mut with_json = base.clone().into_os_string();
        with_json.push(".json");
        [base.clone(), PathBuf::from(with_json), base.join("tsconfig.json")]
    };

    if spec.starts_with('.') || Path::new(spec).is_absolute() {
        return candidates(dir.join(spec))
            .into_iter()
            .map(|candidate| normalize_path(&candidate))
            .find(|candidate| candidate.is_file());
    }

    dir.ancestors()
        .flat_map(|ancestor| candidates(ancestor.join("node_modules").join(spec)))
        .map(|candidate| normalize_path(&candidate))
        .find(|candidate| candidate.is_file())
}

/// Anchor a tsconfig include/exclude spec at `dir`.
///
/// A spec whose last component has neither a wildcard nor an extension names
/// a directory; includes then cover every file below it.
fn anchor_spec(dir: &Path, spec: &str, is_include: bool) -> String {
    let joined = normalize_path(&dir.join(spec));
    let mut text = joined.to_string_lossy().replace('\\', "/");
    let last = text.rsplit('/').next().unwrap_or_default().to_string();
    let names_directory = !last.contains('*') && !last.contains('?') && !last.contains('.');
    if is_include && names_directory {
        text.push_str("/**/*");
    }
    text
}

fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in pattern.split('/') {
        if component.contains(['*', '?', '[']) {
            break;
        }
        if component.is_empty() {
            if prefix.as_os_str().is_empty() {
                prefix.push("/");
            }
            continue;
        }
        prefix.push(component);
    }
    prefix
}

fn compile(config_path: &Path, pattern: &str) -> Result<Pattern, SessionError> {
    Pattern::new(pattern).map_err(|error| {
        SessionError::invalid(
            config_path.to_path_buf(),
            format!("invalid pattern '{pattern}': {}", error.msg),
        )
    })
}

fn resolve_against(dir: &Path, value: &str) -> String {
    normalize_path(&dir.join(value)).to_string_lossy().into_owned()
}

fn is_ignored_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name == "node_modules" || (name.starts_with('.') && name.len() > 1))
        .unwrap_or(false)
}

/// Lexically normalise `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Strip `//` and `/* */` comments and trailing commas so tsconfig files
/// parse as plain JSON.
pub fn strip_json_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    let mut in_string = false;

    while let Some((index, c)) = chars.next() {
        if in_string {
            output.push(c);
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        output.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().map(|(_, next)| *next);
        match c {
            '"' => {
                in_string = true;
                output.push(c);
            }
            '/' if next == Some('/') => {
                for (_, skipped) in chars.by_ref() {
                    if skipped == '\n' {
                        output.push('\n');
                        break;
                    }
                }
            }
            '/' if next == Some('*') => {
                chars.next();
                let mut previous = '\0';
                for (_, skipped) in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    if skipped == '\n' {
                        output.push('\n');
                    }
                    previous = skipped;
                }
            }
            ',' => {
                let rest = &input[index + c.len_utf8()..];
                if !matches!(strip_leading_trivia(rest), Some('}') | Some(']')) {
                    output.push(c);
                }
            }
            _ => output.push(c),
        }
    }

    output
}

/// First character after whitespace and comments.
fn strip_leading_trivia(rest: &str) -> Option<char> {
    let mut remaining = rest;
    loop {
        remaining = remaining.trim_start();
        if let Some(after) = remaining.strip_prefix("//") {
            remaining = after.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(after) = remaining.strip_prefix("/*") {
            remaining = after.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            return remaining.chars().next();
        }
    }
}
