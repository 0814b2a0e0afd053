use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Documentation record for one exported UI component.
///
/// Records are produced fresh on every extraction and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDoc {
    /// Name shown in tooling (`@displayName` tag, or the exported name).
    pub display_name: String,
    /// Local binding the generated code attaches metadata to.
    pub expression: String,
    /// File the component was declared in.
    pub file_path: String,
    /// Summary from the component's JSDoc; empty when undocumented.
    pub description: String,
    /// Props in declaration order.
    pub props: IndexMap<String, PropItem>,
    /// JSDoc tags on the component, keyed by tag name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub tags: BTreeMap<String, String>,
    /// Source location of the component definition.
    pub location: SourceLocation,
}

impl ComponentDoc {
    /// Creates a record without props.
    pub fn new(
        display_name: impl Into<String>,
        expression: impl Into<String>,
        file_path: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            expression: expression.into(),
            file_path: file_path.into(),
            description: String::new(),
            props: IndexMap::new(),
            tags: BTreeMap::new(),
            location,
        }
    }

    /// Appends a prop; a later prop with the same name replaces the earlier one.
    pub fn add_prop(&mut self, prop: PropItem) {
        self.props.insert(prop.name.clone(), prop);
    }
}

/// A single property descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropItem {
    pub name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub prop_type: PropItemType,
    pub default_value: Option<DefaultValue>,
    pub description: String,
    /// Type that declared the prop, when it could be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentType>,
    /// JSDoc tags on the prop, keyed by tag name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub tags: BTreeMap<String, String>,
}

impl PropItem {
    pub fn new(name: impl Into<String>, prop_type: PropItemType, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            prop_type,
            default_value: None,
            description: String::new(),
            parent: None,
            tags: BTreeMap::new(),
        }
    }
}

/// Type signature of a prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropItemType {
    /// Printed type, or `enum` when literal values were extracted.
    pub name: String,
    /// Original type text when `name` is `enum`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Literal members when `name` is `enum`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<EnumValue>>,
}

impl PropItemType {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: None,
            value: None,
        }
    }

    pub fn enumeration(raw: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: "enum".to_string(),
            raw: Some(raw.into()),
            value: Some(values.into_iter().map(|value| EnumValue { value }).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub value: String,
}

/// Default value recovered from the component definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultValue {
    pub value: serde_json::Value,
}

/// The interface or alias a prop was declared on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentType {
    pub file_name: String,
    pub name: String,
}

/// Lightweight source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// One-based line index.
    pub line: u32,
    /// One-based column index.
    pub column: u32,
}

impl SourceLocation {
    /// Creates a location from one-based line/column.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Maps byte offsets to one-based line/column positions.
#[derive(Debug)]
pub(crate) struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub(crate) fn new(source: &str) -> Self {
        let mut line_starts = Vec::with_capacity(128);
        line_starts.push(0);
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((idx + 1) as u32);
            }
        }
        Self { line_starts }
    }

    pub(crate) fn location(&self, offset: u32) -> SourceLocation {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let line = idx as u32 + 1;
        let column = offset - self.line_starts[idx] + 1;
        SourceLocation::new(line, column)
    }
}
