//! Syntax Model Builder
//!
//! Parses Java source text into a structural model of declarations and
//! members. Every element keeps its byte span into the original text, so
//! the rewriter can edit surgically and the emitter can reproduce
//! untouched regions verbatim instead of re-pretty-printing.
//!
//! Members are owned by their declaration and referenced positionally;
//! there are no shared mutable references across the model.

use crate::{RebootError, Result};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Byte range into a source unit's original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn of(node: Node) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Extends the span over trailing whitespace, up to the next
    /// non-whitespace byte.
    pub fn with_trailing_whitespace(self, source: &str) -> Span {
        let bytes = source.as_bytes();
        let mut end = self.end;
        while end < bytes.len() && bytes[end].is_ascii_whitespace() {
            end += 1;
        }
        Span {
            start: self.start,
            end,
        }
    }

    /// Extends the span through the end of its line, including the
    /// line break.
    pub fn with_line_ending(self, source: &str) -> Span {
        let bytes = source.as_bytes();
        let mut end = self.end;
        while end < bytes.len() && bytes[end] != b'\n' {
            end += 1;
        }
        if end < bytes.len() {
            end += 1;
        }
        Span {
            start: self.start,
            end,
        }
    }
}

/// Recognized annotation markers. Anything else on a field or declaration
/// is ignored and survives rewriting untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// `@Autowired` - a container supplies the field reflectively
    FieldInjection,
    /// `@Mock` - bare test double
    TestDouble,
    /// `@Mock(answer = ...)` - recursively stubbed test double
    DeepStubTestDouble,
    /// `@Spy` - partially real test double
    Spy,
    /// `@InjectMocks` - the target-under-test receiving the doubles
    InjectTarget,
    /// Lombok `@RequiredArgsConstructor` / `@AllArgsConstructor` on a
    /// declaration: a constructor already exists, just not in source
    ExplicitConstruction,
    /// `@Test` - the unit is test code
    Test,
    /// `@RequestMapping` on a handler method or its controller
    RequestMapping,
    /// A Spring web binding annotation on a handler parameter
    /// (`@PathVariable`, `@RequestParam`, ...)
    WebBinding,
}

const WEB_BINDING_ANNOTATIONS: [&str; 7] = [
    "PathVariable",
    "RequestParam",
    "RequestHeader",
    "RequestAttribute",
    "CookieValue",
    "ModelAttribute",
    "SessionAttribute",
];

impl MarkerKind {
    /// Markers that wire a value into a field. A field may carry at most
    /// one of these; more is a detected-but-unsupported case.
    pub fn is_injection(self) -> bool {
        matches!(
            self,
            MarkerKind::FieldInjection
                | MarkerKind::TestDouble
                | MarkerKind::DeepStubTestDouble
                | MarkerKind::Spy
                | MarkerKind::InjectTarget
        )
    }

    fn recognize(name: &str, args: &[(String, String)]) -> Option<MarkerKind> {
        match name {
            "Autowired" => Some(MarkerKind::FieldInjection),
            "Mock" if args.iter().any(|(k, _)| k == "answer") => {
                Some(MarkerKind::DeepStubTestDouble)
            }
            "Mock" => Some(MarkerKind::TestDouble),
            "Spy" => Some(MarkerKind::Spy),
            "InjectMocks" => Some(MarkerKind::InjectTarget),
            "RequiredArgsConstructor" | "AllArgsConstructor" => {
                Some(MarkerKind::ExplicitConstruction)
            }
            "Test" => Some(MarkerKind::Test),
            "RequestMapping" => Some(MarkerKind::RequestMapping),
            name if WEB_BINDING_ANNOTATIONS.contains(&name) => Some(MarkerKind::WebBinding),
            _ => None,
        }
    }
}

/// A recognized marker attached to a field, constructor, method,
/// parameter or declaration, with its key/value arguments.
#[derive(Debug, Clone)]
pub struct AnnotationMarker {
    pub kind: MarkerKind,
    /// Simple annotation name as written, without the `@`.
    pub name: String,
    pub span: Span,
    pub args: Vec<(String, String)>,
}

/// A field member.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: String,
    /// Whole `field_declaration`, annotations through `;`.
    pub span: Span,
    pub ty_span: Span,
    pub name_span: Span,
    /// Span of the initializer expression, when present.
    pub initializer: Option<Span>,
    pub markers: Vec<AnnotationMarker>,
    pub is_static: bool,
    pub is_final: bool,
}

impl Field {
    /// Type name with generic arguments erased (`List<User>` -> `List`),
    /// for use in `.class` expressions.
    pub fn raw_type(&self) -> &str {
        match self.ty.find('<') {
            Some(idx) => &self.ty[..idx],
            None => &self.ty,
        }
    }

    pub fn marker(&self, kind: MarkerKind) -> Option<&AnnotationMarker> {
        self.markers.iter().find(|m| m.kind == kind)
    }

    pub fn has_marker(&self, kind: MarkerKind) -> bool {
        self.marker(kind).is_some()
    }

    pub fn injection_markers(&self) -> impl Iterator<Item = &AnnotationMarker> {
        self.markers.iter().filter(|m| m.kind.is_injection())
    }
}

/// A constructor member.
#[derive(Debug, Clone)]
pub struct Constructor {
    pub param_types: Vec<String>,
    pub param_names: Vec<String>,
    pub markers: Vec<AnnotationMarker>,
    pub span: Span,
}

/// A formal parameter of a method or constructor.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: String,
    pub span: Span,
    pub markers: Vec<AnnotationMarker>,
}

/// A method member.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub params: Vec<Parameter>,
    pub markers: Vec<AnnotationMarker>,
    pub span: Span,
}

/// One member of a class-like declaration, in declaration order.
#[derive(Debug, Clone)]
pub enum Member {
    Field(Field),
    Constructor(Constructor),
    Method(Method),
}

/// A class-like construct with its members in source order. Nested
/// classes become their own `Declaration` in the owning unit.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub span: Span,
    pub members: Vec<Member>,
    /// Markers attached to the declaration itself.
    pub markers: Vec<AnnotationMarker>,
    /// Indentation of this declaration's members, detected from source.
    pub member_indent: String,
    /// One further level of indentation, for synthesized bodies.
    pub indent_step: String,
}

impl Declaration {
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn constructors(&self) -> impl Iterator<Item = &Constructor> {
        self.members.iter().filter_map(|m| match m {
            Member::Constructor(c) => Some(c),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(f) => Some(f),
            _ => None,
        })
    }

    pub fn has_marker(&self, kind: MarkerKind) -> bool {
        self.markers.iter().any(|m| m.kind == kind)
    }
}

/// An import statement.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    /// Dotted path as written, e.g. `org.mockito.Mock`. For a wildcard
    /// import this is the package without the `.*`.
    pub path: String,
    pub span: Span,
    pub is_static: bool,
    pub is_wildcard: bool,
}

impl ImportDecl {
    /// Whether this import already makes `path` visible, either exactly
    /// or through an on-demand `.*` import of its package.
    pub fn covers(&self, path: &str) -> bool {
        if self.is_wildcard {
            return !self.is_static
                && path
                    .strip_prefix(self.path.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .is_some_and(|name| !name.contains('.'));
        }
        self.path == path
    }
}

/// One parsed file. Immutable once built; only the rewriter derives new
/// text from it.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    /// Raw text, retained for unmodified-region passthrough.
    pub text: String,
    pub imports: Vec<ImportDecl>,
    pub declarations: Vec<Declaration>,
    pub package_span: Option<Span>,
    /// Whether any `@Test` annotation appears anywhere in the unit.
    pub has_test_annotation: bool,
}

impl SourceUnit {
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

/// Parses file text into a [`SourceUnit`], or fails with
/// [`RebootError::Parse`] carrying the position of the first syntax error.
pub fn parse_source(path: &Path, text: &str) -> Result<SourceUnit> {
    let mut parser = Parser::new();
    parser.set_language(tree_sitter_java::language())?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| RebootError::Language("tree-sitter produced no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let (line, column) = first_error_position(root);
        return Err(RebootError::Parse {
            path: path.to_path_buf(),
            line,
            column,
        });
    }

    let mut unit = SourceUnit {
        path: path.to_path_buf(),
        text: text.to_string(),
        imports: Vec::new(),
        declarations: Vec::new(),
        package_span: None,
        has_test_annotation: contains_test_annotation(root, text),
    };

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_declaration" => unit.package_span = Some(Span::of(child)),
            "import_declaration" => {
                if let Some(import) = build_import(child, text) {
                    unit.imports.push(import);
                }
            }
            "class_declaration" => build_declaration(child, text, &mut unit.declarations),
            _ => {}
        }
    }

    Ok(unit)
}

fn first_error_position(root: Node) -> (usize, usize) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let point = node.start_position();
            return (point.row + 1, point.column + 1);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }
    (1, 1)
}

fn contains_test_annotation(root: Node, text: &str) -> bool {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "marker_annotation" | "annotation") {
            if let Some(name) = node.child_by_field_name("name") {
                if let Ok(name) = name.utf8_text(text.as_bytes()) {
                    if simple_name(name) == "Test" {
                        return true;
                    }
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    false
}

/// Last segment of a possibly-qualified annotation name.
fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn build_import(node: Node, text: &str) -> Option<ImportDecl> {
    let mut cursor = node.walk();
    let path_node = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))?;
    let path = path_node.utf8_text(text.as_bytes()).ok()?.to_string();

    let mut is_static = false;
    let mut is_wildcard = false;
    let mut tokens = node.walk();
    for child in node.children(&mut tokens) {
        match child.kind() {
            "static" => is_static = true,
            "asterisk" => is_wildcard = true,
            _ => {}
        }
    }

    Some(ImportDecl {
        path,
        span: Span::of(node),
        is_static,
        is_wildcard,
    })
}

fn build_declaration(node: Node, text: &str, out: &mut Vec<Declaration>) {
    let name = match node.child_by_field_name("name") {
        Some(name_node) => match name_node.utf8_text(text.as_bytes()) {
            Ok(name) => name.to_string(),
            Err(_) => return,
        },
        None => return,
    };

    let markers = markers_of(node, text);
    let mut members = Vec::new();
    let mut first_member_start = None;

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "field_declaration" => {
                    if let Some(field) = build_field(member, text) {
                        first_member_start.get_or_insert(member.start_byte());
                        members.push(Member::Field(field));
                    }
                }
                "constructor_declaration" => {
                    first_member_start.get_or_insert(member.start_byte());
                    members.push(Member::Constructor(build_constructor(member, text)));
                }
                "method_declaration" => {
                    if let Some(method) = build_method(member, text) {
                        first_member_start.get_or_insert(member.start_byte());
                        members.push(Member::Method(method));
                    }
                }
                // Nested classes are declarations in their own right.
                "class_declaration" => build_declaration(member, text, out),
                _ => {}
            }
        }
    }

    let member_indent = first_member_start
        .and_then(|offset| line_indent(text, offset))
        .unwrap_or("    ")
        .to_string();
    let indent_step = if member_indent.contains('\t') {
        "\t".to_string()
    } else {
        "    ".to_string()
    };

    out.push(Declaration {
        name,
        span: Span::of(node),
        members,
        markers,
        member_indent,
        indent_step,
    });
}

/// Indentation of the line containing `offset`, provided nothing but
/// whitespace precedes it on that line.
fn line_indent(text: &str, offset: usize) -> Option<&str> {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..offset];
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(prefix)
}

/// Recognized markers inside a node's `modifiers` child.
fn markers_of(node: Node, text: &str) -> Vec<AnnotationMarker> {
    let mut markers = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "modifiers" {
            continue;
        }
        let mut inner = child.walk();
        for modifier in child.children(&mut inner) {
            if !matches!(modifier.kind(), "marker_annotation" | "annotation") {
                continue;
            }
            if let Some(marker) = build_marker(modifier, text) {
                markers.push(marker);
            }
        }
    }
    markers
}

fn build_marker(node: Node, text: &str) -> Option<AnnotationMarker> {
    let name_node = node.child_by_field_name("name")?;
    let name = name_node.utf8_text(text.as_bytes()).ok()?;

    let mut args = Vec::new();
    if let Some(arguments) = node.child_by_field_name("arguments") {
        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            if argument.kind() == "element_value_pair" {
                let key = argument
                    .child_by_field_name("key")
                    .and_then(|k| k.utf8_text(text.as_bytes()).ok())?;
                let value = argument
                    .child_by_field_name("value")
                    .and_then(|v| v.utf8_text(text.as_bytes()).ok())
                    .unwrap_or_default();
                args.push((key.to_string(), value.to_string()));
            } else {
                let value = argument.utf8_text(text.as_bytes()).ok()?;
                args.push(("value".to_string(), value.to_string()));
            }
        }
    }

    let simple = simple_name(name);
    let kind = MarkerKind::recognize(simple, &args)?;
    Some(AnnotationMarker {
        kind,
        name: simple.to_string(),
        span: Span::of(node),
        args,
    })
}

fn modifier_flags(node: Node, text: &str) -> (bool, bool) {
    let mut is_static = false;
    let mut is_final = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "modifiers" {
            continue;
        }
        let modifiers = child.utf8_text(text.as_bytes()).unwrap_or_default();
        for word in modifiers.split_whitespace() {
            match word {
                "static" => is_static = true,
                "final" => is_final = true,
                _ => {}
            }
        }
    }
    (is_static, is_final)
}

fn build_field(node: Node, text: &str) -> Option<Field> {
    let ty_node = node.child_by_field_name("type")?;
    let declarator = node.child_by_field_name("declarator")?;
    let name_node = declarator.child_by_field_name("name")?;

    let (is_static, is_final) = modifier_flags(node, text);

    Some(Field {
        name: name_node.utf8_text(text.as_bytes()).ok()?.to_string(),
        ty: ty_node.utf8_text(text.as_bytes()).ok()?.to_string(),
        span: Span::of(node),
        ty_span: Span::of(ty_node),
        name_span: Span::of(name_node),
        initializer: declarator.child_by_field_name("value").map(Span::of),
        markers: markers_of(node, text),
        is_static,
        is_final,
    })
}

fn build_parameters(node: Node, text: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    if let Some(parameters) = node.child_by_field_name("parameters") {
        let mut cursor = parameters.walk();
        for parameter in parameters.named_children(&mut cursor) {
            if parameter.kind() != "formal_parameter" {
                continue;
            }
            let ty = parameter
                .child_by_field_name("type")
                .and_then(|t| t.utf8_text(text.as_bytes()).ok());
            let name = parameter
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(text.as_bytes()).ok());
            if let (Some(ty), Some(name)) = (ty, name) {
                params.push(Parameter {
                    name: name.to_string(),
                    ty: ty.to_string(),
                    span: Span::of(parameter),
                    markers: markers_of(parameter, text),
                });
            }
        }
    }
    params
}

fn build_constructor(node: Node, text: &str) -> Constructor {
    let params = build_parameters(node, text);
    Constructor {
        param_types: params.iter().map(|p| p.ty.clone()).collect(),
        param_names: params.iter().map(|p| p.name.clone()).collect(),
        markers: markers_of(node, text),
        span: Span::of(node),
    }
}

fn build_method(node: Node, text: &str) -> Option<Method> {
    let name_node = node.child_by_field_name("name")?;
    Some(Method {
        name: name_node.utf8_text(text.as_bytes()).ok()?.to_string(),
        params: build_parameters(node, text),
        markers: markers_of(node, text),
        span: Span::of(node),
    })
}
