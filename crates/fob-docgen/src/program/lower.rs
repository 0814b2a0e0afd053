//! Lowering of OXC type syntax into owned, allocator-free summaries.
//!
//! The program keeps these summaries for every member file so type lookups
//! never need to re-parse dependencies.

use oxc_ast::ast::{
    Comment, Declaration, ImportDeclarationSpecifier, Statement, TSInterfaceDeclaration,
    TSSignature, TSType, TSTypeAliasDeclaration,
};
use oxc_span::{GetSpan, Span};
use rustc_hash::FxHashMap;

use crate::jsdoc::{ParsedJsDoc, parse_jsdoc};

use super::{
    ImportBinding, ImportedName, ModuleSummary, PropertySignature, ReExport, TypeDeclaration,
    TypeDeclarationBody, TypeExpr, TypeKind,
};

/// Source text plus JSDoc comments keyed by the node they attach to.
pub(crate) struct LowerContext<'s> {
    source: &'s str,
    docs: FxHashMap<u32, Span>,
}

impl<'s> LowerContext<'s> {
    pub(crate) fn new<'c>(source: &'s str, comments: impl IntoIterator<Item = &'c Comment>) -> Self {
        let mut docs = FxHashMap::default();
        for comment in comments {
            if comment.is_jsdoc() {
                docs.insert(comment.attached_to, comment.content_span());
            }
        }
        Self { source, docs }
    }

    pub(crate) fn slice(&self, span: Span) -> &'s str {
        &self.source[span.start as usize..span.end as usize]
    }

    /// Whitespace-collapsed source text for `span`.
    pub(crate) fn text(&self, span: Span) -> String {
        collapse_whitespace(self.slice(span))
    }

    /// Parsed JSDoc attached to the node starting at `start`.
    pub(crate) fn doc_at(&self, start: u32) -> Option<ParsedJsDoc> {
        self.docs.get(&start).map(|span| parse_jsdoc(self.slice(*span)))
    }

    pub(crate) fn lower_type(&self, ty: &TSType<'_>) -> TypeExpr {
        let text = self.text(ty.span());
        let kind = match ty {
            TSType::TSParenthesizedType(inner) => {
                return self.lower_type(&inner.type_annotation);
            }
            TSType::TSTypeLiteral(literal) => TypeKind::Object(self.lower_signatures(&literal.members)),
            TSType::TSTypeReference(reference) => TypeKind::Reference {
                name: self.text(reference.type_name.span()),
                args: reference
                    .type_arguments
                    .as_ref()
                    .map(|args| args.params.iter().map(|arg| self.lower_type(arg)).collect())
                    .unwrap_or_default(),
            },
            TSType::TSUnionType(union) => {
                TypeKind::Union(union.types.iter().map(|member| self.lower_type(member)).collect())
            }
            TSType::TSIntersectionType(intersection) => TypeKind::Intersection(
                intersection
                    .types
                    .iter()
                    .map(|member| self.lower_type(member))
                    .collect(),
            ),
            TSType::TSLiteralType(_) => TypeKind::Literal,
            TSType::TSStringKeyword(_)
            | TSType::TSNumberKeyword(_)
            | TSType::TSBooleanKeyword(_)
            | TSType::TSBigIntKeyword(_)
            | TSType::TSSymbolKeyword(_)
            | TSType::TSObjectKeyword(_)
            | TSType::TSAnyKeyword(_)
            | TSType::TSUnknownKeyword(_)
            | TSType::TSNeverKeyword(_)
            | TSType::TSVoidKeyword(_)
            | TSType::TSNullKeyword(_)
            | TSType::TSUndefinedKeyword(_) => TypeKind::Keyword,
            _ => TypeKind::Other,
        };
        TypeExpr { text, kind }
    }

    pub(crate) fn lower_signatures(&self, signatures: &[TSSignature<'_>]) -> Vec<PropertySignature> {
        signatures
            .iter()
            .filter_map(|signature| self.lower_signature(signature))
            .collect()
    }

    fn lower_signature(&self, signature: &TSSignature<'_>) -> Option<PropertySignature> {
        match signature {
            TSSignature::TSPropertySignature(property) => {
                let name = property.key.static_name()?.to_string();
                Some(PropertySignature {
                    name,
                    type_expr: property
                        .type_annotation
                        .as_ref()
                        .map(|annotation| self.lower_type(&annotation.type_annotation)),
                    optional: property.optional,
                    doc: self.doc_at(property.span.start).unwrap_or_default(),
                })
            }
            TSSignature::TSMethodSignature(method) => {
                let name = method.key.static_name()?.to_string();
                let returns = method
                    .return_type
                    .as_ref()
                    .map(|annotation| self.text(annotation.type_annotation.span()))
                    .unwrap_or_else(|| "any".to_string());
                let params = self.text(method.params.span);
                let text = if params.starts_with('(') {
                    format!("{params} => {returns}")
                } else {
                    format!("({params}) => {returns}")
                };
                Some(PropertySignature {
                    name,
                    type_expr: Some(TypeExpr {
                        text,
                        kind: TypeKind::Other,
                    }),
                    optional: method.optional,
                    doc: self.doc_at(method.span.start).unwrap_or_default(),
                })
            }
            _ => None,
        }
    }

    fn lower_interface(&self, interface: &TSInterfaceDeclaration<'_>) -> TypeDeclaration {
        let extends = interface
            .extends
            .iter()
            .map(|heritage| TypeExpr {
                text: self.text(heritage.span),
                kind: TypeKind::Reference {
                    name: self.text(heritage.expression.span()),
                    args: heritage
                        .type_arguments
                        .as_ref()
                        .map(|args| args.params.iter().map(|arg| self.lower_type(arg)).collect())
                        .unwrap_or_default(),
                },
            })
            .collect();
        TypeDeclaration {
            name: interface.id.name.to_string(),
            body: TypeDeclarationBody::Interface {
                members: self.lower_signatures(&interface.body.body),
                extends,
            },
        }
    }

    fn lower_alias(&self, alias: &TSTypeAliasDeclaration<'_>) -> TypeDeclaration {
        TypeDeclaration {
            name: alias.id.name.to_string(),
            body: TypeDeclarationBody::Alias(self.lower_type(&alias.type_annotation)),
        }
    }

    /// Record the type-level shape of a module: declarations, imports and exports.
    pub(crate) fn summarize(&self, body: &[Statement<'_>]) -> ModuleSummary {
        let mut summary = ModuleSummary::default();
        for statement in body {
            match statement {
                Statement::TSInterfaceDeclaration(interface) => {
                    summary.insert_type(self.lower_interface(interface));
                }
                Statement::TSTypeAliasDeclaration(alias) => {
                    summary.insert_type(self.lower_alias(alias));
                }
                Statement::ImportDeclaration(import) => {
                    let source = import.source.value.to_string();
                    for specifier in import.specifiers.iter().flatten() {
                        let (local, imported) = match specifier {
                            ImportDeclarationSpecifier::ImportSpecifier(named) => (
                                named.local.name.to_string(),
                                ImportedName::Named(named.imported.name().to_string()),
                            ),
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                                (default.local.name.to_string(), ImportedName::Default)
                            }
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                                (namespace.local.name.to_string(), ImportedName::Namespace)
                            }
                        };
                        summary.imports.insert(
                            local,
                            ImportBinding {
                                source: source.clone(),
                                imported,
                            },
                        );
                    }
                }
                Statement::ExportNamedDeclaration(export) => {
                    match &export.declaration {
                        Some(Declaration::TSInterfaceDeclaration(interface)) => {
                            summary.insert_type(self.lower_interface(interface));
                        }
                        Some(Declaration::TSTypeAliasDeclaration(alias)) => {
                            summary.insert_type(self.lower_alias(alias));
                        }
                        _ => {}
                    }
                    for specifier in &export.specifiers {
                        let local = specifier.local.name().to_string();
                        let exported = specifier.exported.name().to_string();
                        match &export.source {
                            Some(source) => summary.reexports.push(ReExport::Named {
                                source: source.value.to_string(),
                                imported: local,
                                exported,
                            }),
                            None => {
                                summary.exports.insert(exported, local);
                            }
                        }
                    }
                }
                Statement::ExportAllDeclaration(export) if export.exported.is_none() => {
                    summary.reexports.push(ReExport::All {
                        source: export.source.value.to_string(),
                    });
                }
                _ => {}
            }
        }
        summary
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
