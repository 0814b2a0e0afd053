//! Syntactic scan of a module for exported React components.

use std::path::Path;

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, AssignmentTarget, BindingPattern, BindingPatternKind, CallExpression, Class,
    ClassElement, Declaration, ExportDefaultDeclarationKind, Expression, FormalParameters,
    Function, FunctionBody, JSXElement, JSXFragment, ObjectExpression, ObjectPropertyKind,
    Statement, VariableDeclaration,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use rustc_hash::FxHashMap;

use crate::jsdoc::ParsedJsDoc;
use crate::program::{LowerContext, TypeExpr, TypeKind};

const WRAPPERS: &[&str] = &["forwardRef", "memo"];
const CLASS_BASES: &[&str] = &["Component", "PureComponent"];

/// A default value recovered from code.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DefaultExpr {
    String(String),
    Number(String),
    Bool(bool),
    Null,
    Undefined,
    /// Any other expression, as source text.
    Other(String),
}

impl DefaultExpr {
    pub(crate) fn to_value(&self, as_string: bool) -> serde_json::Value {
        use serde_json::Value;
        match self {
            DefaultExpr::String(text) | DefaultExpr::Other(text) => Value::String(text.clone()),
            DefaultExpr::Number(raw) if as_string => Value::String(raw.clone()),
            DefaultExpr::Number(raw) => raw
                .parse::<i64>()
                .ok()
                .map(serde_json::Number::from)
                .or_else(|| raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64))
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.clone())),
            DefaultExpr::Bool(value) if as_string => Value::String(value.to_string()),
            DefaultExpr::Bool(value) => Value::Bool(*value),
            DefaultExpr::Null if as_string => Value::String("null".to_string()),
            DefaultExpr::Null => Value::Null,
            DefaultExpr::Undefined => Value::String("undefined".to_string()),
        }
    }
}

/// A top-level binding that may be a component.
#[derive(Debug, Clone)]
pub(crate) struct ComponentCandidate {
    pub local: String,
    /// Start offset of the declaration.
    pub start: u32,
    pub doc: ParsedJsDoc,
    pub props_type: Option<TypeExpr>,
    pub defaults: IndexMap<String, DefaultExpr>,
    pub is_component: bool,
    /// Inner component for `memo(Inner)` style wrappers.
    pub wraps: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExportEntry {
    pub exported: String,
    pub local: String,
}

#[derive(Debug, Default)]
pub(crate) struct FileScan {
    pub candidates: IndexMap<String, ComponentCandidate>,
    pub exports: Vec<ExportEntry>,
}

/// Parse `source` and collect component candidates and value exports.
///
/// `component_types` names the type annotations that mark a binding as a
/// component (`FC`, `FunctionComponent`, ...). Parser diagnostics are
/// returned as the error.
pub(crate) fn scan(
    path: &Path,
    source: &str,
    component_types: &[String],
) -> Result<FileScan, Vec<String>> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::tsx());
    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        return Err(parsed.errors.iter().map(|error| error.to_string()).collect());
    }

    let mut scanner = Scanner {
        context: LowerContext::new(source, parsed.program.comments.iter()),
        component_types,
        scan: FileScan::default(),
        default_props: FxHashMap::default(),
    };
    for statement in &parsed.program.body {
        scanner.statement(statement);
    }
    Ok(scanner.finish())
}

struct Scanner<'s, 'o> {
    context: LowerContext<'s>,
    component_types: &'o [String],
    scan: FileScan,
    default_props: FxHashMap<String, IndexMap<String, DefaultExpr>>,
}

/// What a function-like initializer contributes.
struct FunctionShape {
    props_type: Option<TypeExpr>,
    defaults: IndexMap<String, DefaultExpr>,
    renders: bool,
}

impl<'s, 'o> Scanner<'s, 'o> {
    fn statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::FunctionDeclaration(function) => {
                self.function_declaration(function, function.span.start);
            }
            Statement::VariableDeclaration(variable) => {
                self.variable_declaration(variable, variable.span.start);
            }
            Statement::ClassDeclaration(class) => {
                self.class_declaration(class, class.span.start);
            }
            Statement::ExportNamedDeclaration(export) => {
                match &export.declaration {
                    Some(Declaration::FunctionDeclaration(function)) => {
                        if let Some(name) = self.function_declaration(function, export.span.start) {
                            self.export(name.clone(), name);
                        }
                    }
                    Some(Declaration::VariableDeclaration(variable)) => {
                        for name in self.variable_declaration(variable, export.span.start) {
                            self.export(name.clone(), name);
                        }
                    }
                    Some(Declaration::ClassDeclaration(class)) => {
                        if let Some(name) = self.class_declaration(class, export.span.start) {
                            self.export(name.clone(), name);
                        }
                    }
                    _ => {}
                }
                if export.source.is_none() {
                    for specifier in &export.specifiers {
                        self.export(
                            specifier.exported.name().to_string(),
                            specifier.local.name().to_string(),
                        );
                    }
                }
            }
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                    if let Some(name) = self.function_declaration(function, export.span.start) {
                        self.export("default".to_string(), name);
                    }
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    if let Some(name) = self.class_declaration(class, export.span.start) {
                        self.export("default".to_string(), name);
                    }
                }
                ExportDefaultDeclarationKind::Identifier(identifier) => {
                    self.export("default".to_string(), identifier.name.to_string());
                }
                _ => {}
            },
            Statement::ExpressionStatement(expression) => {
                self.default_props_assignment(&expression.expression);
            }
            _ => {}
        }
    }

    fn export(&mut self, exported: String, local: String) {
        self.scan.exports.push(ExportEntry { exported, local });
    }

    fn doc_for(&self, statement_start: u32, declaration_start: u32) -> ParsedJsDoc {
        self.context
            .doc_at(statement_start)
            .or_else(|| self.context.doc_at(declaration_start))
            .unwrap_or_default()
    }

    fn function_declaration(&mut self, function: &Function<'_>, statement_start: u32) -> Option<String> {
        let name = function.id.as_ref()?.name.to_string();
        let shape = self.function_shape(&function.params, function.body.as_deref());
        let candidate = ComponentCandidate {
            local: name.clone(),
            start: function.span.start,
            doc: self.doc_for(statement_start, function.span.start),
            props_type: shape.props_type,
            defaults: shape.defaults,
            is_component: shape.renders,
            wraps: None,
        };
        self.scan.candidates.insert(name.clone(), candidate);
        Some(name)
    }

    /// `class X extends React.Component<Props>`, with `static defaultProps`.
    fn class_declaration(&mut self, class: &Class<'_>, statement_start: u32) -> Option<String> {
        let name = class.id.as_ref()?.name.to_string();
        let is_component = class.super_class.as_ref().is_some_and(|base| {
            let base = self.context.text(base.span());
            CLASS_BASES.contains(&base.strip_prefix("React.").unwrap_or(&base))
        });
        let props_type = class
            .super_type_arguments
            .as_ref()
            .and_then(|args| args.params.first())
            .map(|props| self.context.lower_type(props));

        let mut defaults = IndexMap::new();
        for element in &class.body.body {
            let ClassElement::PropertyDefinition(property) = element else {
                continue;
            };
            if !property.r#static || property.key.static_name().as_deref() != Some("defaultProps") {
                continue;
            }
            if let Some(Expression::ObjectExpression(values)) =
                property.value.as_ref().map(Expression::without_parentheses)
            {
                defaults.extend(object_defaults(&self.context, values));
            }
        }

        let candidate = ComponentCandidate {
            local: name.clone(),
            start: class.span.start,
            doc: self.doc_for(statement_start, class.span.start),
            props_type,
            defaults,
            is_component,
            wraps: None,
        };
        self.scan.candidates.insert(name.clone(), candidate);
        Some(name)
    }

    fn variable_declaration(
        &mut self,
        variable: &VariableDeclaration<'_>,
        statement_start: u32,
    ) -> Vec<String> {
        let mut names = Vec::new();
        for declarator in &variable.declarations {
            let BindingPatternKind::BindingIdentifier(identifier) = &declarator.id.kind else {
                continue;
            };
            let name = identifier.name.to_string();
            let annotated_props = declarator
                .id
                .type_annotation
                .as_ref()
                .and_then(|annotation| self.component_annotation(&annotation.type_annotation));

            let mut candidate = ComponentCandidate {
                local: name.clone(),
                start: declarator.span.start,
                doc: self.doc_for(statement_start, declarator.span.start),
                props_type: None,
                defaults: IndexMap::new(),
                is_component: false,
                wraps: None,
            };
            if let Some(init) = &declarator.init {
                self.initializer(init, &mut candidate);
            }
            if let Some(props_type) = annotated_props {
                candidate.is_component = true;
                if props_type.is_some() {
                    candidate.props_type = props_type;
                }
            }
            self.scan.candidates.insert(name.clone(), candidate);
            names.push(name);
        }
        names
    }

    /// `Some(props)` when `ty` is one of the component types; the inner
    /// option holds the props type argument when one was given.
    fn component_annotation(&self, ty: &oxc_ast::ast::TSType<'_>) -> Option<Option<TypeExpr>> {
        let lowered = self.context.lower_type(ty);
        let TypeKind::Reference { name, args } = lowered.kind else {
            return None;
        };
        let short = name.rsplit('.').next().unwrap_or(&name);
        self.component_types
            .iter()
            .any(|component_type| component_type == short)
            .then(|| args.into_iter().next())
    }

    fn initializer(&mut self, init: &Expression<'_>, candidate: &mut ComponentCandidate) {
        match init.without_parentheses() {
            Expression::ArrowFunctionExpression(arrow) => {
                let shape = self.function_shape(&arrow.params, Some(&*arrow.body));
                self.apply_shape(candidate, shape);
            }
            Expression::FunctionExpression(function) => {
                let shape = self.function_shape(&function.params, function.body.as_deref());
                self.apply_shape(candidate, shape);
            }
            Expression::CallExpression(call) => self.wrapper_call(call, candidate),
            _ => {}
        }
    }

    fn apply_shape(&self, candidate: &mut ComponentCandidate, shape: FunctionShape) {
        if candidate.props_type.is_none() {
            candidate.props_type = shape.props_type;
        }
        candidate.defaults.extend(shape.defaults);
        candidate.is_component |= shape.renders;
    }

    /// `forwardRef(...)`, `memo(...)` and their `React.`-qualified forms.
    fn wrapper_call(&mut self, call: &CallExpression<'_>, candidate: &mut ComponentCandidate) {
        let callee = self.context.text(call.callee.span());
        let short = callee.strip_prefix("React.").unwrap_or(&callee);
        if !WRAPPERS.contains(&short) {
            return;
        }
        candidate.is_component = true;

        if let Some(args) = &call.type_arguments {
            let props_index = if short == "forwardRef" { 1 } else { 0 };
            if let Some(props) = args.params.get(props_index) {
                candidate.props_type = Some(self.context.lower_type(props));
            }
        }

        let Some(inner) = call.arguments.first().and_then(Argument::as_expression) else {
            return;
        };
        match inner.without_parentheses() {
            Expression::Identifier(identifier) => {
                candidate.wraps = Some(identifier.name.to_string());
            }
            other => self.initializer(other, candidate),
        }
    }

    fn function_shape(
        &self,
        params: &FormalParameters<'_>,
        body: Option<&FunctionBody<'_>>,
    ) -> FunctionShape {
        let mut shape = FunctionShape {
            props_type: None,
            defaults: IndexMap::new(),
            renders: body.is_some_and(renders_jsx),
        };
        let Some(first) = params.items.first() else {
            return shape;
        };
        let mut pattern = &first.pattern;
        shape.props_type = self.annotation(pattern);
        if let BindingPatternKind::AssignmentPattern(assignment) = &pattern.kind {
            pattern = &assignment.left;
            if shape.props_type.is_none() {
                shape.props_type = self.annotation(pattern);
            }
        }
        if let BindingPatternKind::ObjectPattern(object) = &pattern.kind {
            for property in &object.properties {
                let Some(key) = property.key.static_name() else {
                    continue;
                };
                if let BindingPatternKind::AssignmentPattern(assignment) = &property.value.kind {
                    shape
                        .defaults
                        .insert(key.to_string(), self.default_expr(&assignment.right));
                }
            }
        }
        shape
    }

    fn annotation(&self, pattern: &BindingPattern<'_>) -> Option<TypeExpr> {
        pattern
            .type_annotation
            .as_ref()
            .map(|annotation| self.context.lower_type(&annotation.type_annotation))
    }

    /// `Component.defaultProps = { ... }`
    fn default_props_assignment(&mut self, expression: &Expression<'_>) {
        let Expression::AssignmentExpression(assignment) = expression else {
            return;
        };
        let AssignmentTarget::StaticMemberExpression(member) = &assignment.left else {
            return;
        };
        if member.property.name.as_str() != "defaultProps" {
            return;
        }
        let Expression::Identifier(object) = &member.object else {
            return;
        };
        let Expression::ObjectExpression(values) = assignment.right.without_parentheses() else {
            return;
        };
        let values = object_defaults(&self.context, values);
        self.default_props
            .entry(object.name.to_string())
            .or_default()
            .extend(values);
    }

    fn default_expr(&self, expression: &Expression<'_>) -> DefaultExpr {
        default_expr(&self.context, expression)
    }

    fn finish(mut self) -> FileScan {
        for (name, defaults) in self.default_props.drain() {
            if let Some(candidate) = self.scan.candidates.get_mut(&name) {
                for (key, value) in defaults {
                    // Destructuring defaults take precedence over `defaultProps`.
                    candidate.defaults.entry(key).or_insert(value);
                }
            }
        }
        self.scan
    }
}

fn object_defaults(
    context: &LowerContext<'_>,
    object: &ObjectExpression<'_>,
) -> IndexMap<String, DefaultExpr> {
    let mut defaults = IndexMap::new();
    for property in &object.properties {
        let ObjectPropertyKind::ObjectProperty(property) = property else {
            continue;
        };
        if let Some(key) = property.key.static_name() {
            defaults.insert(key.to_string(), default_expr(context, &property.value));
        }
    }
    defaults
}

fn default_expr(context: &LowerContext<'_>, expression: &Expression<'_>) -> DefaultExpr {
    match expression.without_parentheses() {
        Expression::StringLiteral(literal) => DefaultExpr::String(literal.value.trim().to_string()),
        Expression::NumericLiteral(literal) => {
            DefaultExpr::Number(context.text(literal.span))
        }
        Expression::BooleanLiteral(literal) => DefaultExpr::Bool(literal.value),
        Expression::NullLiteral(_) => DefaultExpr::Null,
        Expression::Identifier(identifier) if identifier.name.as_str() == "undefined" => {
            DefaultExpr::Undefined
        }
        other => DefaultExpr::Other(context.text(other.span())),
    }
}

fn renders_jsx(body: &FunctionBody<'_>) -> bool {
    let mut finder = JsxFinder { found: false };
    finder.visit_function_body(body);
    finder.found
}

struct JsxFinder {
    found: bool,
}

impl<'ast> Visit<'ast> for JsxFinder {
    fn visit_jsx_element(&mut self, _element: &JSXElement<'ast>) {
        self.found = true;
    }

    fn visit_jsx_fragment(&mut self, _fragment: &JSXFragment<'ast>) {
        self.found = true;
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'ast>) {
        if let Expression::StaticMemberExpression(member) = &call.callee {
            if member.property.name.as_str() == "createElement" {
                self.found = true;
                return;
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// Whether `name` looks like a component binding.
pub(crate) fn is_component_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}
