//! Plugin options and their resolution into the three derived configurations.
//!
//! [`resolve`] is pure: it applies the default table below and never touches
//! the filesystem. The session and the transform consume its output.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Files documented when `include` is not given.
pub const DEFAULT_INCLUDE: &[&str] = &["**/**.tsx"];
/// Files skipped when `exclude` is not given.
pub const DEFAULT_EXCLUDE: &[&str] = &["**/**.stories.tsx"];
/// Config file searched for when `tsconfigPath` is not given.
pub const DEFAULT_TSCONFIG: &str = "tsconfig.json";
/// Global registry the generated code writes into.
pub const DEFAULT_COLLECTION_NAME: &str = "STORYBOOK_REACT_CLASSES";
/// Key used for the prop type inside `__docgenInfo`.
pub const DEFAULT_TYPE_PROP_NAME: &str = "type";
/// Component type annotations recognised without configuration.
pub const DEFAULT_COMPONENT_TYPES: &[&str] = &[
    "FC",
    "FunctionComponent",
    "VFC",
    "VoidFunctionComponent",
    "NamedExoticComponent",
    "ForwardRefExoticComponent",
    "MemoExoticComponent",
];

/// User-supplied plugin options.
///
/// Keys are camelCase so the same JSON a Vite/Storybook setup uses can be
/// deserialized directly. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Overrides discovery of `tsconfig.json`.
    pub tsconfig_path: Option<String>,
    /// Merged over the discovered project's `compilerOptions`.
    pub compiler_options: Option<CompilerOptions>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub should_extract_literal_values_from_enum: Option<bool>,
    pub should_extract_values_from_union: Option<bool>,
    pub should_remove_undefined_from_optional: Option<bool>,
    pub should_include_prop_tag_map: Option<bool>,
    pub skip_children_prop_without_doc: Option<bool>,
    pub save_prop_value_as_string: Option<bool>,
    pub custom_component_types: Option<Vec<String>>,
    pub prop_filter: Option<PropFilter>,
    pub set_display_name: Option<bool>,
    pub type_prop_name: Option<String>,
    /// `null` disables registration in the global collection.
    #[serde(deserialize_with = "explicit_null")]
    pub docgen_collection_name: Option<Option<String>>,
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl Options {
    /// Create options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_tsconfig_path(mut self, path: impl Into<String>) -> Self {
        self.tsconfig_path = Some(path.into());
        self
    }

    pub fn with_compiler_options(mut self, options: CompilerOptions) -> Self {
        self.compiler_options = Some(options);
        self
    }

    pub fn with_include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_collection_name(mut self, name: Option<String>) -> Self {
        self.docgen_collection_name = Some(name);
        self
    }
}

/// Subset of TypeScript compiler options the analysis honours.
///
/// Unknown keys are kept in `other` so a full `compilerOptions` object
/// round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_null_checks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_js: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_emit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl CompilerOptions {
    /// Built-in defaults applied beneath the project configuration.
    pub fn defaults() -> Self {
        Self {
            jsx: Some("react".to_string()),
            module: Some("commonjs".to_string()),
            target: Some("latest".to_string()),
            ..Self::default()
        }
    }

    /// Returns `self` with every option set in `overrides` replaced.
    pub fn merge(mut self, overrides: &CompilerOptions) -> Self {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.jsx, &overrides.jsx);
        take(&mut self.module, &overrides.module);
        take(&mut self.target, &overrides.target);
        take(&mut self.strict, &overrides.strict);
        take(&mut self.strict_null_checks, &overrides.strict_null_checks);
        take(&mut self.allow_js, &overrides.allow_js);
        take(&mut self.no_emit, &overrides.no_emit);
        take(&mut self.base_url, &overrides.base_url);
        take(&mut self.out_dir, &overrides.out_dir);
        for (key, value) in &overrides.other {
            self.other.insert(key.clone(), value.clone());
        }
        self
    }

    /// `strictNullChecks`, falling back to `strict`.
    pub fn strict_null_checks_enabled(&self) -> bool {
        self.strict_null_checks.or(self.strict).unwrap_or(false)
    }

    pub fn allow_js_enabled(&self) -> bool {
        self.allow_js.unwrap_or(false)
    }
}

/// Prop-level filtering applied after extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropFilter {
    /// Drop props that have no JSDoc description.
    pub skip_props_without_doc: bool,
    /// Prop names that are never documented.
    pub exclude: Vec<String>,
}

/// Options consumed by the scope filter and the documentation extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub should_extract_literal_values_from_enum: bool,
    pub should_extract_values_from_union: bool,
    pub should_remove_undefined_from_optional: bool,
    pub should_include_prop_tag_map: bool,
    pub skip_children_prop_without_doc: bool,
    pub save_prop_value_as_string: bool,
    /// Type names (besides [`DEFAULT_COMPONENT_TYPES`]) that mark a component.
    pub custom_component_types: Vec<String>,
    pub prop_filter: PropFilter,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        resolve(Options::default()).extractor_options
    }
}

/// Options consumed by the code generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub set_display_name: bool,
    pub type_prop_name: String,
    pub docgen_collection_name: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        resolve(Options::default()).generate_options
    }
}

/// The derived configurations, computed once per plugin instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub extractor_options: ExtractorOptions,
    /// User overrides with `noEmit` forced; layered over the project config
    /// by the session.
    pub compiler_options: CompilerOptions,
    pub generate_options: GenerateOptions,
    /// Explicit config path, if any; otherwise [`DEFAULT_TSCONFIG`] is searched.
    pub tsconfig_path: Option<String>,
}

/// Resolve user options into extractor, compiler and generation options.
pub fn resolve(options: Options) -> ResolvedConfig {
    let Options {
        tsconfig_path,
        compiler_options,
        include,
        exclude,
        should_extract_literal_values_from_enum,
        should_extract_values_from_union,
        should_remove_undefined_from_optional,
        should_include_prop_tag_map,
        skip_children_prop_without_doc,
        save_prop_value_as_string,
        custom_component_types,
        prop_filter,
        set_display_name,
        type_prop_name,
        docgen_collection_name,
    } = options;

    let extractor_options = ExtractorOptions {
        include: include.unwrap_or_else(|| to_strings(DEFAULT_INCLUDE)),
        exclude: exclude.unwrap_or_else(|| to_strings(DEFAULT_EXCLUDE)),
        should_extract_literal_values_from_enum: should_extract_literal_values_from_enum
            .unwrap_or(false),
        should_extract_values_from_union: should_extract_values_from_union.unwrap_or(false),
        should_remove_undefined_from_optional: should_remove_undefined_from_optional
            .unwrap_or(false),
        should_include_prop_tag_map: should_include_prop_tag_map.unwrap_or(false),
        skip_children_prop_without_doc: skip_children_prop_without_doc.unwrap_or(true),
        save_prop_value_as_string: save_prop_value_as_string.unwrap_or(false),
        custom_component_types: custom_component_types.unwrap_or_default(),
        prop_filter: prop_filter.unwrap_or_default(),
    };

    let mut compiler_options = compiler_options.unwrap_or_default();
    compiler_options.no_emit = Some(true);

    let generate_options = GenerateOptions {
        set_display_name: set_display_name.unwrap_or(true),
        type_prop_name: type_prop_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_TYPE_PROP_NAME.to_string()),
        docgen_collection_name: docgen_collection_name
            .unwrap_or_else(|| Some(DEFAULT_COLLECTION_NAME.to_string())),
    };

    ResolvedConfig {
        extractor_options,
        compiler_options,
        generate_options,
        tsconfig_path,
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
