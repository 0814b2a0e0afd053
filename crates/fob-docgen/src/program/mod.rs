//! The type-analysis program: an immutable snapshot of every member file.
//!
//! Each [`SourceFile`] carries an owned summary of its type declarations,
//! imports and exports. Snapshots are replaced wholesale when a file changes
//! so readers holding an `Arc<Program>` keep a consistent view.

mod lower;
pub mod tsconfig;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::jsdoc::ParsedJsDoc;
use crate::options::CompilerOptions;

pub(crate) use lower::LowerContext;
use tsconfig::normalize_path;

const RESOLVE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts", ".mts", ".cts", ".js", ".jsx"];
const MAX_EXPORT_HOPS: usize = 16;

/// A type annotation reduced to what prop extraction needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    /// Source text with whitespace collapsed.
    pub text: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// An inline object type literal.
    Object(Vec<PropertySignature>),
    /// A named type such as `ButtonProps` or `React.FC<Props>`.
    Reference { name: String, args: Vec<TypeExpr> },
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    /// A string, number, boolean or template literal type.
    Literal,
    /// A primitive keyword type (`string`, `undefined`, ...).
    Keyword,
    /// Anything else: functions, arrays, tuples, mapped types.
    Other,
}

impl TypeExpr {
    /// Whether this is the `undefined` keyword.
    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, TypeKind::Keyword) && self.text == "undefined"
    }

    /// Whether this is a union containing `undefined`.
    pub fn includes_undefined(&self) -> bool {
        match &self.kind {
            TypeKind::Union(members) => members.iter().any(TypeExpr::is_undefined),
            _ => self.is_undefined(),
        }
    }
}

/// One member of an interface or object type literal.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub name: String,
    /// `None` when the member has no annotation (implicitly `any`).
    pub type_expr: Option<TypeExpr>,
    pub optional: bool,
    pub doc: ParsedJsDoc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub name: String,
    pub body: TypeDeclarationBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclarationBody {
    Interface {
        members: Vec<PropertySignature>,
        extends: Vec<TypeExpr>,
    },
    Alias(TypeExpr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Module specifier as written.
    pub source: String,
    pub imported: ImportedName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReExport {
    /// `export { imported as exported } from "source"`
    Named {
        source: String,
        imported: String,
        exported: String,
    },
    /// `export * from "source"`
    All { source: String },
}

/// Type-level shape of one module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSummary {
    pub types: FxHashMap<String, TypeDeclaration>,
    /// Local binding name to where it was imported from.
    pub imports: FxHashMap<String, ImportBinding>,
    /// Exported name to local name, for `export { local as exported }`.
    pub exports: FxHashMap<String, String>,
    pub reexports: Vec<ReExport>,
}

impl ModuleSummary {
    /// Record a declaration. Repeated interfaces merge their members.
    pub(crate) fn insert_type(&mut self, declaration: TypeDeclaration) {
        match self.types.get_mut(&declaration.name) {
            Some(TypeDeclaration {
                body:
                    TypeDeclarationBody::Interface {
                        members,
                        extends,
                    },
                ..
            }) => {
                if let TypeDeclarationBody::Interface {
                    members: more_members,
                    extends: more_extends,
                } = declaration.body
                {
                    members.extend(more_members);
                    extends.extend(more_extends);
                }
            }
            _ => {
                self.types.insert(declaration.name.clone(), declaration);
            }
        }
    }
}

/// A parsed member file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: Arc<str>,
    pub summary: ModuleSummary,
    /// Parser diagnostics; a file with diagnostics still contributes what
    /// the recovering parser produced.
    pub diagnostics: Vec<String>,
}

impl SourceFile {
    /// Parse `text` and summarise its declarations.
    pub fn analyze(path: PathBuf, text: impl Into<Arc<str>>) -> Self {
        let path = normalize_path(&path);
        let text: Arc<str> = text.into();
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(&path).unwrap_or_else(|_| SourceType::tsx());
        let parsed = Parser::new(&allocator, &text, source_type).parse();

        let diagnostics = parsed.errors.iter().map(|error| error.to_string()).collect();
        let context = LowerContext::new(&text, parsed.program.comments.iter());
        let summary = context.summarize(&parsed.program.body);

        Self {
            path,
            text,
            summary,
            diagnostics,
        }
    }

    /// Read and analyze a file from disk.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::analyze(path.to_path_buf(), text))
    }
}

/// An immutable program snapshot.
#[derive(Debug, Clone)]
pub struct Program {
    root_dir: PathBuf,
    compiler_options: CompilerOptions,
    files: FxHashMap<PathBuf, Arc<SourceFile>>,
    version: u64,
}

impl Program {
    pub fn new(
        root_dir: PathBuf,
        compiler_options: CompilerOptions,
        files: impl IntoIterator<Item = SourceFile>,
    ) -> Self {
        Self {
            root_dir: normalize_path(&root_dir),
            compiler_options,
            files: files
                .into_iter()
                .map(|file| (file.path.clone(), Arc::new(file)))
                .collect(),
            version: 0,
        }
    }

    /// Build a program from in-memory sources.
    pub fn from_sources<P, S>(
        root_dir: impl Into<PathBuf>,
        compiler_options: CompilerOptions,
        sources: impl IntoIterator<Item = (P, S)>,
    ) -> Self
    where
        P: Into<PathBuf>,
        S: Into<Arc<str>>,
    {
        Self::new(
            root_dir.into(),
            compiler_options,
            sources
                .into_iter()
                .map(|(path, text)| SourceFile::analyze(path.into(), text)),
        )
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Incremented each time a snapshot is derived from this one.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.compiler_options
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn source_file(&self, path: &Path) -> Option<&Arc<SourceFile>> {
        self.files
            .get(path)
            .or_else(|| self.files.get(&normalize_path(path)))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.source_file(path).is_some()
    }

    pub fn source_files(&self) -> impl Iterator<Item = &Arc<SourceFile>> {
        self.files.values()
    }

    /// A new snapshot with `file` added or replaced.
    pub fn with_file(&self, file: SourceFile) -> Program {
        let mut next = self.clone();
        next.files.insert(file.path.clone(), Arc::new(file));
        next.version += 1;
        next
    }

    /// A new snapshot without `path`.
    pub fn without_file(&self, path: &Path) -> Program {
        let mut next = self.clone();
        next.files.remove(&normalize_path(path));
        next.version += 1;
        next
    }

    /// Resolve `specifier` as imported from `from` to a program member.
    ///
    /// Relative specifiers resolve against the importing file, bare ones
    /// against `baseUrl`. Packages outside the program are not resolved.
    pub fn resolve_module(&self, from: &Path, specifier: &str) -> Option<&Arc<SourceFile>> {
        let base = if specifier.starts_with("./") || specifier.starts_with("../") {
            from.parent()?.join(specifier)
        } else if Path::new(specifier).is_absolute() {
            PathBuf::from(specifier)
        } else {
            Path::new(self.compiler_options.base_url.as_deref()?).join(specifier)
        };
        let base = normalize_path(&base);

        if let Some(file) = self.files.get(&base) {
            return Some(file);
        }
        let base_text = base.to_string_lossy();
        // `./types.js` written for ESM output refers to `./types.ts`.
        let stem = ["js", "jsx", "mjs", "cjs"]
            .iter()
            .find_map(|ext| base_text.strip_suffix(&format!(".{ext}")))
            .map(str::to_string);

        let mut candidates = Vec::new();
        for root in std::iter::once(base_text.to_string()).chain(stem) {
            for ext in RESOLVE_EXTENSIONS {
                candidates.push(PathBuf::from(format!("{root}{ext}")));
            }
            for ext in RESOLVE_EXTENSIONS {
                candidates.push(PathBuf::from(format!("{root}/index{ext}")));
            }
        }
        candidates
            .into_iter()
            .find_map(|candidate| self.files.get(&candidate))
    }

    /// Find the declaration `name` visible in `file`, following imports and
    /// re-exports across program members.
    pub fn lookup_type(
        &self,
        file: &Arc<SourceFile>,
        name: &str,
    ) -> Option<(Arc<SourceFile>, TypeDeclaration)> {
        let mut visited = FxHashSet::default();
        self.lookup_local(file, name, &mut visited, 0)
    }

    fn lookup_local(
        &self,
        file: &Arc<SourceFile>,
        name: &str,
        visited: &mut FxHashSet<(PathBuf, String)>,
        hops: usize,
    ) -> Option<(Arc<SourceFile>, TypeDeclaration)> {
        if hops > MAX_EXPORT_HOPS || !visited.insert((file.path.clone(), name.to_string())) {
            return None;
        }
        if let Some(declaration) = file.summary.types.get(name) {
            return Some((file.clone(), declaration.clone()));
        }
        let binding = file.summary.imports.get(name)?;
        let ImportedName::Named(imported) = &binding.imported else {
            return None;
        };
        let target = self.resolve_module(&file.path, &binding.source)?.clone();
        self.lookup_export(&target, imported, visited, hops + 1)
    }

    fn lookup_export(
        &self,
        file: &Arc<SourceFile>,
        exported: &str,
        visited: &mut FxHashSet<(PathBuf, String)>,
        hops: usize,
    ) -> Option<(Arc<SourceFile>, TypeDeclaration)> {
        let local = file
            .summary
            .exports
            .get(exported)
            .map(String::as_str)
            .unwrap_or(exported);
        if let Some(found) = self.lookup_local(file, local, visited, hops) {
            return Some(found);
        }
        for reexport in &file.summary.reexports {
            let (source, imported) = match reexport {
                ReExport::Named {
                    source,
                    imported,
                    exported: name,
                } if name == exported => (source, imported.as_str()),
                ReExport::All { source } => (source, exported),
                _ => continue,
            };
            let Some(target) = self.resolve_module(&file.path, source).cloned() else {
                continue;
            };
            if let Some(found) = self.lookup_export(&target, imported, visited, hops + 1) {
                return Some(found);
            }
        }
        None
    }

    /// `path` relative to the program root, with `/` separators.
    pub fn relative_path(&self, path: &Path) -> String {
        relative_to(&self.root_dir, path)
    }
}

/// `path` relative to `root`, with `/` separators; unrelated paths are kept whole.
pub fn relative_to(root: &Path, path: &Path) -> String {
    let path = normalize_path(path);
    path.strip_prefix(root)
        .unwrap_or(&path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(sources: &[(&str, &str)]) -> Program {
        Program::from_sources(
            "/project",
            CompilerOptions {
                base_url: Some("/project/src".to_string()),
                ..CompilerOptions::defaults()
            },
            sources
                .iter()
                .map(|(path, text)| (PathBuf::from(path), text.to_string())),
        )
    }

    #[test]
    fn summarises_interfaces_with_docs() {
        let file = SourceFile::analyze(
            PathBuf::from("/project/src/Button.tsx"),
            r#"
            export interface ButtonProps {
                /** The label */
                label: string;
                /**
                 * Visual size.
                 * @default "md"
                 */
                size?: "sm" | "md";
                onClick(event: MouseEvent): void;
            }
            "#,
        );
        assert!(file.diagnostics.is_empty());
        let declaration = &file.summary.types["ButtonProps"];
        let TypeDeclarationBody::Interface { members, .. } = &declaration.body else {
            panic!("expected interface");
        };
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].name, "label");
        assert_eq!(members[0].doc.summary.as_deref(), Some("The label"));
        assert!(!members[0].optional);
        assert!(members[1].optional);
        assert_eq!(members[1].doc.default_value(), Some("\"md\""));
        assert!(matches!(
            members[1].type_expr.as_ref().map(|ty| &ty.kind),
            Some(TypeKind::Union(_))
        ));
        assert_eq!(
            members[2].type_expr.as_ref().map(|ty| ty.text.as_str()),
            Some("(event: MouseEvent) => void")
        );
    }

    #[test]
    fn merges_repeated_interfaces() {
        let file = SourceFile::analyze(
            PathBuf::from("/project/src/a.ts"),
            "interface A { x: string } interface A { y: number }",
        );
        let TypeDeclarationBody::Interface { members, .. } = &file.summary.types["A"].body else {
            panic!("expected interface");
        };
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn resolves_relative_and_base_url_specifiers() {
        let program = program(&[
            ("/project/src/Button.tsx", ""),
            ("/project/src/types.ts", ""),
            ("/project/src/shared/index.ts", ""),
        ]);
        let from = Path::new("/project/src/Button.tsx");
        assert!(program.resolve_module(from, "./types").is_some());
        assert!(program.resolve_module(from, "./types.js").is_some());
        assert!(program.resolve_module(from, "./shared").is_some());
        assert!(program.resolve_module(from, "shared").is_some());
        assert!(program.resolve_module(from, "react").is_none());
    }

    #[test]
    fn looks_up_types_through_imports_and_reexports() {
        let program = program(&[
            (
                "/project/src/Button.tsx",
                "import { Props as Base } from './index';",
            ),
            ("/project/src/index.ts", "export * from './types';"),
            (
                "/project/src/types.ts",
                "interface Inner { a: string } export { Inner as Props };",
            ),
        ]);
        let file = program
            .source_file(Path::new("/project/src/Button.tsx"))
            .unwrap()
            .clone();
        let (origin, declaration) = program.lookup_type(&file, "Base").unwrap();
        assert_eq!(declaration.name, "Inner");
        assert_eq!(origin.path, PathBuf::from("/project/src/types.ts"));
    }

    #[test]
    fn snapshots_are_copy_on_write() {
        let first = program(&[("/project/src/a.ts", "type A = string;")]);
        let second = first.with_file(SourceFile::analyze(
            PathBuf::from("/project/src/a.ts"),
            "type B = number;",
        ));
        let path = Path::new("/project/src/a.ts");
        assert!(first.source_file(path).unwrap().summary.types.contains_key("A"));
        assert!(second.source_file(path).unwrap().summary.types.contains_key("B"));
        assert_eq!(second.version(), first.version() + 1);
        assert!(second.without_file(path).is_empty());
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        assert_eq!(
            relative_to(Path::new("/project"), Path::new("/project/src/./Button.tsx")),
            "src/Button.tsx"
        );
        assert_eq!(
            relative_to(Path::new("/project"), Path::new("/other/Button.tsx")),
            "/other/Button.tsx"
        );
    }
}
