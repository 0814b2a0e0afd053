//! Component documentation extraction.
//!
//! [`ReactDocgenParser`] finds the exported components of a program member,
//! resolves their props through the program's type summaries and produces
//! one [`ComponentDoc`] per component.

mod components;
mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{DocgenError, Result};
use crate::filter::normalize_id;
use crate::model::{ComponentDoc, DefaultValue, LineIndex, PropItem};
use crate::options::{DEFAULT_COMPONENT_TYPES, ExtractorOptions};
use crate::program::{Program, SourceFile};

use components::{ComponentCandidate, ExportEntry, FileScan, is_component_name};
use resolve::{PropsResolver, ResolvedProp};

/// Produces component documentation for one file.
///
/// The program is obtained through `program_provider` on every call, so an
/// implementation always sees the snapshot current at that moment.
pub trait ComponentDocParser: Send + Sync {
    fn parse_with_program_provider(
        &self,
        file_path: &Path,
        program_provider: &dyn Fn() -> Arc<Program>,
    ) -> Result<Vec<ComponentDoc>>;
}

/// The built-in extractor for React function components.
#[derive(Debug, Clone)]
pub struct ReactDocgenParser {
    options: ExtractorOptions,
    component_types: Vec<String>,
}

impl ReactDocgenParser {
    pub fn new(options: ExtractorOptions) -> Self {
        let component_types = DEFAULT_COMPONENT_TYPES
            .iter()
            .map(|name| name.to_string())
            .chain(options.custom_component_types.iter().cloned())
            .collect();
        Self {
            options,
            component_types,
        }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Extract every exported component of `file_path` from `program`.
    ///
    /// A file that is not a program member yields no records.
    pub fn parse(&self, file_path: &Path, program: &Program) -> Result<Vec<ComponentDoc>> {
        let path = PathBuf::from(normalize_id(&file_path.to_string_lossy()));
        let Some(file) = program.source_file(&path).cloned() else {
            debug!(
                "[fob-react-docgen] {} is not part of the program",
                path.display()
            );
            return Ok(Vec::new());
        };

        let scan = components::scan(&file.path, &file.text, &self.component_types)
            .map_err(|diagnostics| DocgenError::parse_error(file.path.clone(), &diagnostics))?;

        let resolver = PropsResolver::new(program);
        let lines = LineIndex::new(&file.text);
        let mut documented = FxHashSet::default();
        let mut docs = Vec::new();

        for export in &scan.exports {
            let Some(candidate) = scan.candidates.get(&export.local) else {
                continue;
            };
            if !candidate.is_component || !is_component_name(&candidate.local) {
                continue;
            }
            if !documented.insert(candidate.local.clone()) {
                continue;
            }
            docs.push(self.document(&file, &scan, candidate, export, &resolver, &lines));
        }

        debug!(
            "[fob-react-docgen] {} component(s) documented in {}",
            docs.len(),
            file.path.display()
        );
        Ok(docs)
    }

    fn document(
        &self,
        file: &Arc<SourceFile>,
        scan: &FileScan,
        candidate: &ComponentCandidate,
        export: &ExportEntry,
        resolver: &PropsResolver<'_>,
        lines: &LineIndex,
    ) -> ComponentDoc {
        let display_name = candidate
            .doc
            .display_name()
            .map(str::to_string)
            .unwrap_or_else(|| {
                if export.exported == "default" {
                    candidate.local.clone()
                } else {
                    export.exported.clone()
                }
            });

        let mut doc = ComponentDoc::new(
            display_name,
            candidate.local.clone(),
            file.path.to_string_lossy(),
            lines.location(candidate.start),
        );
        doc.description = candidate.doc.summary.clone().unwrap_or_default();
        doc.tags = candidate.doc.tags.clone();

        // `memo(Inner)` documents the props of `Inner`.
        let mut source = candidate;
        let mut hops = 0;
        while source.props_type.is_none() && hops < 8 {
            let Some(inner) = source.wraps.as_ref().and_then(|name| scan.candidates.get(name)) else {
                break;
            };
            source = inner;
            hops += 1;
        }

        let Some(props_type) = source.props_type.as_ref() else {
            return doc;
        };
        for prop in resolver.resolve(file, props_type) {
            if let Some(item) = self.prop_item(resolver, &prop, source) {
                doc.add_prop(item);
            }
        }
        doc
    }

    fn prop_item(
        &self,
        resolver: &PropsResolver<'_>,
        prop: &ResolvedProp,
        source: &ComponentCandidate,
    ) -> Option<PropItem> {
        let signature = &prop.signature;
        let description = signature.doc.summary.clone().unwrap_or_default();

        if self.options.skip_children_prop_without_doc
            && signature.name == "children"
            && signature.doc.is_empty()
        {
            return None;
        }
        let filter = &self.options.prop_filter;
        if filter.exclude.iter().any(|name| name == &signature.name) {
            return None;
        }
        if filter.skip_props_without_doc && description.is_empty() {
            return None;
        }

        let code_default = source.defaults.get(&signature.name);
        let default_value = code_default
            .map(|value| DefaultValue {
                value: value.to_value(self.options.save_prop_value_as_string),
            })
            .or_else(|| {
                signature.doc.default_value().map(|value| DefaultValue {
                    value: serde_json::Value::String(value.to_string()),
                })
            });

        let mut item = PropItem::new(
            signature.name.clone(),
            resolver.describe(prop, &self.options),
            !signature.optional && code_default.is_none(),
        );
        item.description = description;
        item.default_value = default_value;
        item.parent = prop.parent.clone();
        if self.options.should_include_prop_tag_map {
            item.tags = signature.doc.tags.clone();
        }
        Some(item)
    }
}

impl ComponentDocParser for ReactDocgenParser {
    fn parse_with_program_provider(
        &self,
        file_path: &Path,
        program_provider: &dyn Fn() -> Arc<Program>,
    ) -> Result<Vec<ComponentDoc>> {
        let program = program_provider();
        self.parse(file_path, &program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{CompilerOptions, PropFilter};

    const BUTTON: &str = r#"
import React from "react";

export interface ButtonProps {
  /** Text shown inside the button */
  label: string;
  /**
   * How large should the button be?
   * @default "medium"
   */
  size?: "small" | "medium" | "large";
  children?: React.ReactNode;
  /** Click handler */
  onClick?: () => void;
}

/**
 * Primary UI component for user interaction
 */
export const Button = ({ label, size = "medium", ...rest }: ButtonProps) => {
  return <button className={size}>{label}</button>;
};
"#;

    fn program(sources: &[(&str, &str)]) -> Program {
        Program::from_sources(
            "/project",
            CompilerOptions::defaults(),
            sources
                .iter()
                .map(|(path, text)| (PathBuf::from(path), text.to_string())),
        )
    }

    #[test]
    fn documents_button_component() {
        let program = program(&[("/project/src/Button.tsx", BUTTON)]);
        let parser = ReactDocgenParser::new(ExtractorOptions::default());
        let docs = parser
            .parse(Path::new("/project/src/Button.tsx"), &program)
            .unwrap();

        assert_eq!(docs.len(), 1);
        let button = &docs[0];
        assert_eq!(button.display_name, "Button");
        assert_eq!(button.expression, "Button");
        assert_eq!(button.description, "Primary UI component for user interaction");

        let names: Vec<_> = button.props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["label", "size", "onClick"]);

        let label = &button.props["label"];
        assert!(label.required);
        assert_eq!(label.prop_type.name, "string");
        assert_eq!(label.description, "Text shown inside the button");
        assert_eq!(label.parent.as_ref().unwrap().name, "ButtonProps");
        assert_eq!(label.parent.as_ref().unwrap().file_name, "src/Button.tsx");

        let size = &button.props["size"];
        assert!(!size.required);
        assert_eq!(
            size.default_value.as_ref().unwrap().value,
            serde_json::json!("medium")
        );
        assert_eq!(size.prop_type.name, "\"small\" | \"medium\" | \"large\"");
        assert_eq!(button.props["onClick"].prop_type.name, "() => void");
    }

    #[test]
    fn display_name_tag_overrides_export_name() {
        let program = program(&[(
            "/project/src/Fancy.tsx",
            r#"
            /** @displayName FancyThing */
            export default function Fancy(props: { tone: string }) { return <div />; }
            "#,
        )]);
        let docs = ReactDocgenParser::new(ExtractorOptions::default())
            .parse(Path::new("/project/src/Fancy.tsx"), &program)
            .unwrap();
        assert_eq!(docs[0].display_name, "FancyThing");
        assert_eq!(docs[0].expression, "Fancy");
        assert!(docs[0].props["tone"].parent.is_none());
    }

    #[test]
    fn only_exported_components_are_documented() {
        let program = program(&[(
            "/project/src/Mixed.tsx",
            r#"
            const Internal = () => <i />;
            export const helper = () => <b />;
            export const VALUE = 3;
            export function Shown() { return <Internal />; }
            export default () => <div />;
            "#,
        )]);
        let docs = ReactDocgenParser::new(ExtractorOptions::default())
            .parse(Path::new("/project/src/Mixed.tsx"), &program)
            .unwrap();
        let names: Vec<_> = docs.iter().map(|doc| doc.display_name.as_str()).collect();
        assert_eq!(names, vec!["Shown"]);
        assert!(docs[0].props.is_empty());
    }

    #[test]
    fn prop_filter_and_children_handling() {
        let program = program(&[("/project/src/Button.tsx", BUTTON)]);
        let options = ExtractorOptions {
            skip_children_prop_without_doc: false,
            prop_filter: PropFilter {
                skip_props_without_doc: false,
                exclude: vec!["onClick".to_string()],
            },
            ..ExtractorOptions::default()
        };
        let docs = ReactDocgenParser::new(options)
            .parse(Path::new("/project/src/Button.tsx"), &program)
            .unwrap();
        let names: Vec<_> = docs[0].props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["label", "size", "children"]);

        let documented_only = ExtractorOptions {
            prop_filter: PropFilter {
                skip_props_without_doc: true,
                exclude: Vec::new(),
            },
            ..ExtractorOptions::default()
        };
        let docs = ReactDocgenParser::new(documented_only)
            .parse(Path::new("/project/src/Button.tsx"), &program)
            .unwrap();
        let names: Vec<_> = docs[0].props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["label", "size", "onClick"]);
    }

    #[test]
    fn files_outside_the_program_yield_nothing() {
        let program = program(&[("/project/src/Button.tsx", BUTTON)]);
        let docs = ReactDocgenParser::new(ExtractorOptions::default())
            .parse(Path::new("/project/src/Other.tsx"), &program)
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn query_suffix_is_ignored() {
        let program = program(&[("/project/src/Button.tsx", BUTTON)]);
        let docs = ReactDocgenParser::new(ExtractorOptions::default())
            .parse(Path::new("/project/src/Button.tsx?used"), &program)
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn provider_is_consulted_per_call() {
        let program = Arc::new(program(&[("/project/src/Button.tsx", BUTTON)]));
        let parser = ReactDocgenParser::new(ExtractorOptions::default());
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let provider = || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            program.clone()
        };
        parser
            .parse_with_program_provider(Path::new("/project/src/Button.tsx"), &provider)
            .unwrap();
        parser
            .parse_with_program_provider(Path::new("/project/src/Button.tsx"), &provider)
            .unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn memo_wrapper_documents_inner_props() {
        let program = program(&[(
            "/project/src/Tag.tsx",
            r#"
            import { memo } from "react";
            function TagBase({ text = "tag" }: { text?: string }) { return <span>{text}</span>; }
            export const Tag = memo(TagBase);
            "#,
        )]);
        let docs = ReactDocgenParser::new(ExtractorOptions::default())
            .parse(Path::new("/project/src/Tag.tsx"), &program)
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].expression, "Tag");
        assert_eq!(
            docs[0].props["text"].default_value.as_ref().unwrap().value,
            serde_json::json!("tag")
        );
    }
}
