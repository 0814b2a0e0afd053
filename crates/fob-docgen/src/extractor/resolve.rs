//! Resolution of a component's props type into individual properties.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{ParentType, PropItemType};
use crate::options::ExtractorOptions;
use crate::program::{
    PropertySignature, SourceFile, TypeDeclarationBody, TypeExpr, TypeKind, Program,
};

const MAX_DEPTH: usize = 32;

/// One property after following references, heritage and utility types.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedProp {
    pub signature: PropertySignature,
    pub parent: Option<ParentType>,
    /// File the property was declared in; aliases in its type resolve here.
    pub origin: Arc<SourceFile>,
}

pub(crate) struct PropsResolver<'p> {
    program: &'p Program,
}

impl<'p> PropsResolver<'p> {
    pub(crate) fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Properties of `ty` as seen from `file`, in declaration order.
    pub(crate) fn resolve(&self, file: &Arc<SourceFile>, ty: &TypeExpr) -> Vec<ResolvedProp> {
        self.collect(file, ty, None, 0).into_values().collect()
    }

    fn collect(
        &self,
        file: &Arc<SourceFile>,
        ty: &TypeExpr,
        parent: Option<&ParentType>,
        depth: usize,
    ) -> IndexMap<String, ResolvedProp> {
        let mut props = IndexMap::new();
        if depth > MAX_DEPTH {
            return props;
        }
        match &ty.kind {
            TypeKind::Object(members) => {
                for member in members {
                    props.insert(
                        member.name.clone(),
                        ResolvedProp {
                            signature: member.clone(),
                            parent: parent.cloned(),
                            origin: file.clone(),
                        },
                    );
                }
            }
            TypeKind::Intersection(members) => {
                for member in members {
                    props.extend(self.collect(file, member, None, depth + 1));
                }
            }
            TypeKind::Union(members) => {
                let mut branches = members
                    .iter()
                    .filter(|member| !matches!(member.kind, TypeKind::Keyword))
                    .map(|member| self.collect(file, member, None, depth + 1));
                if let Some(first) = branches.next() {
                    let rest: Vec<_> = branches.collect();
                    props = first
                        .into_iter()
                        .filter(|(name, _)| rest.iter().all(|branch| branch.contains_key(name)))
                        .collect();
                }
            }
            TypeKind::Reference { name, args } => {
                props = self.reference(file, name, args, depth);
            }
            TypeKind::Literal | TypeKind::Keyword | TypeKind::Other => {}
        }
        props
    }

    fn reference(
        &self,
        file: &Arc<SourceFile>,
        name: &str,
        args: &[TypeExpr],
        depth: usize,
    ) -> IndexMap<String, ResolvedProp> {
        let short = name.strip_prefix("React.").unwrap_or(name);
        match (short, args) {
            ("Partial", [inner]) => {
                return self.map_optional(self.collect(file, inner, None, depth + 1), true);
            }
            ("Required", [inner]) => {
                return self.map_optional(self.collect(file, inner, None, depth + 1), false);
            }
            ("Readonly", [inner]) => return self.collect(file, inner, None, depth + 1),
            ("Pick", [inner, keys]) => {
                let keys = literal_keys(keys);
                let mut props = self.collect(file, inner, None, depth + 1);
                props.retain(|name, _| keys.contains(name));
                return props;
            }
            ("Omit", [inner, keys]) => {
                let keys = literal_keys(keys);
                let mut props = self.collect(file, inner, None, depth + 1);
                props.retain(|name, _| !keys.contains(name));
                return props;
            }
            ("PropsWithChildren", [inner]) => {
                let mut props = self.collect(file, inner, None, depth + 1);
                if !props.contains_key("children") {
                    props.insert("children".to_string(), children_prop(file));
                }
                return props;
            }
            _ => {}
        }

        let Some((origin, declaration)) = self.program.lookup_type(file, name) else {
            return IndexMap::new();
        };
        let parent = ParentType {
            file_name: self.program.relative_path(&origin.path),
            name: declaration.name.clone(),
        };
        match &declaration.body {
            TypeDeclarationBody::Interface { members, extends } => {
                let own = TypeExpr {
                    text: declaration.name.clone(),
                    kind: TypeKind::Object(members.clone()),
                };
                let mut props = self.collect(&origin, &own, Some(&parent), depth + 1);
                for base in extends {
                    for (name, prop) in self.collect(&origin, base, None, depth + 1) {
                        props.entry(name).or_insert(prop);
                    }
                }
                props
            }
            TypeDeclarationBody::Alias(inner) => {
                self.collect(&origin, inner, Some(&parent), depth + 1)
            }
        }
    }

    fn map_optional(
        &self,
        mut props: IndexMap<String, ResolvedProp>,
        optional: bool,
    ) -> IndexMap<String, ResolvedProp> {
        for prop in props.values_mut() {
            prop.signature.optional = optional;
        }
        props
    }

    /// Members of `ty` when it is (or aliases) a union; used for enum extraction.
    pub(crate) fn union_members(&self, file: &Arc<SourceFile>, ty: &TypeExpr) -> Option<Vec<TypeExpr>> {
        let mut current = (file.clone(), ty.clone());
        for _ in 0..MAX_DEPTH {
            match &current.1.kind {
                TypeKind::Union(members) => return Some(members.clone()),
                TypeKind::Reference { name, args } if args.is_empty() => {
                    let (origin, declaration) = self.program.lookup_type(&current.0, name)?;
                    let TypeDeclarationBody::Alias(inner) = declaration.body else {
                        return None;
                    };
                    current = (origin, inner);
                }
                _ => return None,
            }
        }
        None
    }

    /// Describe the type of `prop` as it appears in `__docgenInfo`.
    pub(crate) fn describe(&self, prop: &ResolvedProp, options: &ExtractorOptions) -> PropItemType {
        let strict = self.program.compiler_options().strict_null_checks_enabled();
        let signature = &prop.signature;
        let Some(ty) = signature.type_expr.as_ref() else {
            return PropItemType::named("any");
        };

        let mut members = self.union_members(&prop.origin, ty);
        let mut name = ty.text.clone();
        if options.should_remove_undefined_from_optional && signature.optional {
            if let TypeKind::Union(own) = &ty.kind {
                let kept: Vec<&TypeExpr> = own.iter().filter(|member| !member.is_undefined()).collect();
                name = kept
                    .iter()
                    .map(|member| member.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" | ");
            }
            if let Some(members) = members.as_mut() {
                members.retain(|member| !member.is_undefined());
            }
        } else if signature.optional
            && strict
            && !ty.includes_undefined()
            && !matches!(ty.text.as_str(), "any" | "unknown")
        {
            name.push_str(" | undefined");
            if let Some(members) = members.as_mut() {
                members.push(TypeExpr {
                    text: "undefined".to_string(),
                    kind: TypeKind::Keyword,
                });
            }
        }

        let Some(members) = members else {
            return PropItemType::named(name);
        };
        let all_literals = members
            .iter()
            .all(|member| matches!(member.kind, TypeKind::Literal) || member.is_undefined());
        let is_boolean = members
            .iter()
            .filter(|member| !member.is_undefined())
            .all(|member| matches!(member.text.as_str(), "true" | "false"));
        if (options.should_extract_literal_values_from_enum && all_literals && !is_boolean)
            || options.should_extract_values_from_union
        {
            let values = members.into_iter().map(|member| member.text).collect();
            return PropItemType::enumeration(name, values);
        }
        PropItemType::named(name)
    }
}

fn literal_keys(keys: &TypeExpr) -> Vec<String> {
    let members = match &keys.kind {
        TypeKind::Union(members) => members.iter().collect(),
        _ => vec![keys],
    };
    members
        .into_iter()
        .filter(|member| matches!(member.kind, TypeKind::Literal))
        .map(|member| member.text.trim_matches(['"', '\'', '`']).to_string())
        .collect()
}

fn children_prop(file: &Arc<SourceFile>) -> ResolvedProp {
    ResolvedProp {
        signature: PropertySignature {
            name: "children".to_string(),
            type_expr: Some(TypeExpr {
                text: "ReactNode".to_string(),
                kind: TypeKind::Reference {
                    name: "ReactNode".to_string(),
                    args: Vec::new(),
                },
            }),
            optional: true,
            doc: Default::default(),
        },
        parent: None,
        origin: file.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::options::CompilerOptions;

    fn program(strict: bool, sources: &[(&str, &str)]) -> Program {
        Program::from_sources(
            "/project",
            CompilerOptions {
                strict: Some(strict),
                ..CompilerOptions::defaults()
            },
            sources
                .iter()
                .map(|(path, text)| (PathBuf::from(path), text.to_string())),
        )
    }

    fn props_of(program: &Program, file: &str, alias: &str) -> Vec<ResolvedProp> {
        let file = program.source_file(Path::new(file)).unwrap().clone();
        let ty = TypeExpr {
            text: alias.to_string(),
            kind: TypeKind::Reference {
                name: alias.to_string(),
                args: Vec::new(),
            },
        };
        PropsResolver::new(program).resolve(&file, &ty)
    }

    fn names(props: &[ResolvedProp]) -> Vec<&str> {
        props.iter().map(|prop| prop.signature.name.as_str()).collect()
    }

    #[test]
    fn interface_heritage_puts_own_members_first() {
        let program = program(
            false,
            &[
                (
                    "/project/src/Button.tsx",
                    r#"
                    import { BaseProps } from "./base";
                    interface ButtonProps extends BaseProps { label: string; id: number }
                    "#,
                ),
                (
                    "/project/src/base.ts",
                    "export interface BaseProps { id: string; className?: string }",
                ),
            ],
        );
        let props = props_of(&program, "/project/src/Button.tsx", "ButtonProps");
        assert_eq!(names(&props), vec!["label", "id", "className"]);
        let parent = props[2].parent.as_ref().unwrap();
        assert_eq!(parent.name, "BaseProps");
        assert_eq!(parent.file_name, "src/base.ts");
        assert_eq!(props[1].parent.as_ref().unwrap().name, "ButtonProps");
    }

    #[test]
    fn utility_types_and_intersections() {
        let program = program(
            false,
            &[(
                "/project/src/Card.tsx",
                r#"
                interface Base { a: string; b: number; c: boolean }
                type Picked = Pick<Base, "a" | "b">;
                type Loose = Partial<Omit<Base, 'a'>>;
                type Both = Picked & { extra: string };
                "#,
            )],
        );
        assert_eq!(
            names(&props_of(&program, "/project/src/Card.tsx", "Picked")),
            vec!["a", "b"]
        );
        let loose = props_of(&program, "/project/src/Card.tsx", "Loose");
        assert_eq!(names(&loose), vec!["b", "c"]);
        assert!(loose.iter().all(|prop| prop.signature.optional));
        assert_eq!(
            names(&props_of(&program, "/project/src/Card.tsx", "Both")),
            vec!["a", "b", "extra"]
        );
    }

    #[test]
    fn unresolved_references_have_no_props() {
        let program = program(false, &[("/project/src/A.tsx", "import { X } from 'library';")]);
        assert!(props_of(&program, "/project/src/A.tsx", "X").is_empty());
    }

    #[test]
    fn recursive_aliases_terminate() {
        let program = program(false, &[("/project/src/A.tsx", "type A = B & { a: string }; type B = A;")]);
        let props = props_of(&program, "/project/src/A.tsx", "A");
        assert!(names(&props).contains(&"a"));
    }

    #[test]
    fn describes_optional_and_enum_types() {
        let program = program(
            true,
            &[(
                "/project/src/A.tsx",
                r#"
                type Size = "sm" | "lg";
                interface Props { size?: Size; flag?: boolean; tone: "a" | "b"; open?: true | false }
                "#,
            )],
        );
        let props = props_of(&program, "/project/src/A.tsx", "Props");
        let resolver = PropsResolver::new(&program);

        let plain = ExtractorOptions::default();
        assert_eq!(resolver.describe(&props[0], &plain).name, "Size | undefined");
        assert_eq!(resolver.describe(&props[1], &plain).name, "boolean | undefined");

        let enums = ExtractorOptions {
            should_extract_literal_values_from_enum: true,
            ..ExtractorOptions::default()
        };
        let size = resolver.describe(&props[0], &enums);
        assert_eq!(size.name, "enum");
        assert_eq!(size.raw.as_deref(), Some("Size | undefined"));
        let values: Vec<_> = size.value.unwrap().into_iter().map(|value| value.value).collect();
        assert_eq!(values, vec!["\"sm\"", "\"lg\"", "undefined"]);
        assert_eq!(resolver.describe(&props[2], &enums).name, "enum");
        assert_eq!(resolver.describe(&props[3], &enums).name, "true | false | undefined");

        let without_undefined = ExtractorOptions {
            should_remove_undefined_from_optional: true,
            ..ExtractorOptions::default()
        };
        assert_eq!(resolver.describe(&props[1], &without_undefined).name, "boolean");
    }
}
