//! Rendering of component records into an appended JavaScript block.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::{DocgenError, Result};
use crate::filter::normalize_id;
use crate::model::{ComponentDoc, PropItem};
use crate::options::GenerateOptions;
use crate::program::relative_to;

const CATCH_BINDING: &str = "__react_docgen_typescript_loader_error";

/// Everything the generator needs for one file.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    /// Module id as given by the host.
    pub id: &'a str,
    /// Original source text; always a prefix of the output.
    pub source: &'a str,
    /// At least one record.
    pub components: &'a [ComponentDoc],
    pub options: &'a GenerateOptions,
}

/// Turns component records into new module text.
pub trait DocgenCodeGenerator: Send + Sync {
    fn generate(&self, request: GenerateRequest<'_>) -> Result<String>;
}

/// Appends one `try { ... } catch` block per component.
///
/// Output depends only on the request, so regenerating from identical input
/// is byte-identical.
#[derive(Debug, Clone)]
pub struct DocgenCodeBlock {
    root: PathBuf,
}

impl DocgenCodeBlock {
    /// `root` anchors the relative paths used as registry keys.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn component_block(
        &self,
        relative_path: &str,
        component: &ComponentDoc,
        options: &GenerateOptions,
    ) -> serde_json::Result<String> {
        let expression = &component.expression;
        let info = DocgenInfo {
            description: &component.description,
            display_name: &component.display_name,
            props: component
                .props
                .iter()
                .map(|(name, prop)| {
                    (
                        name.as_str(),
                        PropDescriptor {
                            prop,
                            type_prop_name: &options.type_prop_name,
                        },
                    )
                })
                .collect(),
        };

        let mut lines = vec!["try {".to_string()];
        if options.set_display_name {
            lines.push("    // @ts-ignore".to_string());
            lines.push(format!(
                "    {expression}.displayName = {};",
                serde_json::to_string(&component.display_name)?
            ));
        }
        lines.push("    // @ts-ignore".to_string());
        lines.push(format!(
            "    {expression}.__docgenInfo = {};",
            serde_json::to_string(&info)?
        ));
        if let Some(collection) = &options.docgen_collection_name {
            let key = format!("{relative_path}#{}", component.display_name);
            let key = serde_json::to_string(&key)?;
            lines.push("    // @ts-ignore".to_string());
            lines.push(format!("    if (typeof {collection} !== \"undefined\")"));
            lines.push("        // @ts-ignore".to_string());
            lines.push(format!(
                "        {collection}[{key}] = {{ docgenInfo: {expression}.__docgenInfo, name: {}, path: {key} }};",
                serde_json::to_string(&component.display_name)?
            ));
        }
        lines.push("}".to_string());
        lines.push(format!("catch ({CATCH_BINDING}) {{ }}"));
        Ok(lines.join("\n"))
    }
}

impl DocgenCodeGenerator for DocgenCodeBlock {
    fn generate(&self, request: GenerateRequest<'_>) -> Result<String> {
        let id = normalize_id(request.id);
        let relative_path = relative_to(&self.root, Path::new(&id));

        let mut output = String::with_capacity(request.source.len() + 512);
        output.push_str(request.source);
        for component in request.components {
            let block = self
                .component_block(&relative_path, component, request.options)
                .map_err(|error| DocgenError::generate(PathBuf::from(&id), error.to_string()))?;
            output.push('\n');
            output.push_str(&block);
        }
        output.push('\n');
        Ok(output)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocgenInfo<'a> {
    description: &'a str,
    display_name: &'a str,
    props: IndexMap<&'a str, PropDescriptor<'a>>,
}

/// A prop as it appears in `__docgenInfo`; the type key is configurable.
struct PropDescriptor<'a> {
    prop: &'a PropItem,
    type_prop_name: &'a str,
}

impl Serialize for PropDescriptor<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let prop = self.prop;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("defaultValue", &prop.default_value)?;
        map.serialize_entry("description", &prop.description)?;
        map.serialize_entry("name", &prop.name)?;
        if let Some(parent) = &prop.parent {
            map.serialize_entry("declarations", &[parent])?;
        }
        map.serialize_entry("required", &prop.required)?;
        map.serialize_entry(self.type_prop_name, &prop.prop_type)?;
        if !prop.tags.is_empty() {
            map.serialize_entry("tags", &prop.tags)?;
        }
        map.end()
    }
}
