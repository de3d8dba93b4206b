//! Top-level view of a TypeScript/TSX file: declarations and imports.
//! Uses tree-sitter to parse source; offsets index into the original text.

use serde::Serialize;
use tree_sitter::{Language, Node, Parser, Tree};
use tree_sitter_typescript::language_tsx;
use tree_sitter_typescript::language_typescript;

use crate::error::{MergeError, Result, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AstLanguage {
    #[default]
    TypeScript,
    Tsx,
}

fn ts_language(lang: AstLanguage) -> Language {
    match lang {
        AstLanguage::TypeScript => language_typescript(),
        AstLanguage::Tsx => language_tsx(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopLevelDeclaration {
    pub name: String,
    pub is_exported: bool,
    /// Source text without leading trivia.
    pub text: String,
    /// Start of leading trivia (whitespace and comments since the previous statement).
    pub full_start: usize,
    pub start: usize,
    pub end: usize,
}

impl TopLevelDeclaration {
    pub fn full_text<'a>(&self, code: &'a str) -> &'a str {
        &code[self.full_start..self.end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedBinding {
    /// Name exported by the module.
    pub name: String,
    /// Local alias from `name as alias`.
    pub alias: Option<String>,
    pub is_type_only: bool,
}

impl NamedBinding {
    /// The identifier this binding introduces into the importing file.
    pub fn local(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatement {
    pub module_specifier: String,
    pub quote: char,
    pub has_semicolon: bool,
    pub is_type_only: bool,
    pub default_binding: Option<String>,
    pub namespace_binding: Option<String>,
    pub named_bindings: Vec<NamedBinding>,
    /// `import './x'` with no clause at all.
    pub is_side_effect: bool,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub code: String,
    pub declarations: Vec<TopLevelDeclaration>,
    pub imports: Vec<ImportStatement>,
    /// `(start, end)` of every top-level statement, imports included, comments excluded.
    pub statement_spans: Vec<(usize, usize)>,
}

impl SourceFile {
    /// Offset just after the last import or, without imports, the start of
    /// the first statement (leading header comments stay above it).
    pub fn body_start(&self) -> usize {
        self.imports
            .iter()
            .map(|i| i.end)
            .max()
            .unwrap_or_else(|| self.first_statement_start())
    }

    pub fn first_statement_start(&self) -> usize {
        self.statement_spans.first().map_or(self.code.len(), |s| s.0)
    }

    /// Whether anything other than import statements and whitespace is present.
    pub fn has_body(&self) -> bool {
        let mut cursor = 0;
        for imp in &self.imports {
            if !self.code[cursor..imp.start].trim().is_empty() {
                return true;
            }
            cursor = imp.end;
        }
        !self.code[cursor..].trim().is_empty()
    }

    /// The top-level statement whose span contains `offset`.
    pub fn statement_at(&self, offset: usize) -> Option<(usize, usize)> {
        self.statement_spans
            .iter()
            .copied()
            .find(|&(start, end)| start <= offset && offset < end)
    }

    pub fn declaration(&self, name: &str) -> Option<&TopLevelDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

/// Parse `code`, failing if the parser had to recover from any syntax error.
pub fn parse_source(code: &str, lang: AstLanguage, side: Side) -> Result<SourceFile> {
    let mut parser = Parser::new();
    parser
        .set_language(ts_language(lang))
        .map_err(|_| MergeError::Language)?;

    let tree = parser.parse(code, None).ok_or_else(|| MergeError::Parse {
        side,
        message: "parser returned no tree".into(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(MergeError::Parse {
            side,
            message: describe_first_error(root),
        });
    }

    let (declarations, imports, statement_spans) = collect_top_level(&tree, code);
    Ok(SourceFile {
        code: code.to_string(),
        declarations,
        imports,
        statement_spans,
    })
}

fn describe_first_error(node: Node) -> String {
    let mut cursor = node.walk();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.is_error() || n.is_missing() {
            let pos = n.start_position();
            return format!(
                "syntax error at line {}, column {}",
                pos.row + 1,
                pos.column + 1
            );
        }
        let children: Vec<_> = n.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    "syntax error".into()
}

type TopLevel = (Vec<TopLevelDeclaration>, Vec<ImportStatement>, Vec<(usize, usize)>);

fn collect_top_level(tree: &Tree, code: &str) -> TopLevel {
    let root = tree.root_node();
    let mut decls = Vec::new();
    let mut imports = Vec::new();
    let mut spans = Vec::new();
    let mut prev_end = 0;

    let mut cursor = root.walk();
    for ch in root.named_children(&mut cursor) {
        if ch.kind() == "comment" {
            continue;
        }
        spans.push((ch.start_byte(), ch.end_byte()));
        match ch.kind() {
            "import_statement" => {
                if let Some(imp) = read_import(ch, code) {
                    imports.push(imp);
                }
            }
            "export_statement" => {
                if let Some(name) = ch
                    .child_by_field_name("declaration")
                    .and_then(|d| declaration_name(d, code))
                {
                    decls.push(declaration(ch, name, true, prev_end, code));
                }
            }
            _ => {
                if let Some(name) = declaration_name(ch, code) {
                    decls.push(declaration(ch, name, false, prev_end, code));
                }
            }
        }
        prev_end = ch.end_byte();
    }

    (decls, imports, spans)
}

fn declaration(
    node: Node,
    name: String,
    is_exported: bool,
    full_start: usize,
    code: &str,
) -> TopLevelDeclaration {
    TopLevelDeclaration {
        name,
        is_exported,
        text: text_of(node, code).to_string(),
        full_start,
        start: node.start_byte(),
        end: node.end_byte(),
    }
}

fn declaration_name(node: Node, code: &str) -> Option<String> {
    match node.kind() {
        // const foo = ..., let a = 1, b = 2 (first declarator names it)
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            let declarator = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "variable_declarator")?;
            let name = declarator.child_by_field_name("name")?;
            (name.kind() == "identifier").then(|| text_of(name, code).to_string())
        }
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration"
        | "interface_declaration"
        | "type_alias_declaration"
        | "enum_declaration" => node
            .child_by_field_name("name")
            .map(|n| text_of(n, code).to_string()),
        _ => None,
    }
}

fn read_import(node: Node, code: &str) -> Option<ImportStatement> {
    let source = node.child_by_field_name("source").or_else(|| {
        let mut cursor = node.walk();
        let found = node.named_children(&mut cursor).find(|c| c.kind() == "string");
        found
    })?;
    let raw = text_of(source, code);
    let quote = raw.chars().next().filter(|c| *c == '\'' || *c == '"').unwrap_or('\'');
    let module_specifier = raw.trim_matches(&['"', '\''][..]).to_string();

    let mut imp = ImportStatement {
        module_specifier,
        quote,
        has_semicolon: text_of(node, code).trim_end().ends_with(';'),
        is_type_only: has_token(node, "type"),
        default_binding: None,
        namespace_binding: None,
        named_bindings: Vec::new(),
        is_side_effect: true,
        start: node.start_byte(),
        end: node.end_byte(),
    };

    let mut cursor = node.walk();
    let Some(clause) = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_clause")
    else {
        return Some(imp);
    };
    imp.is_side_effect = false;

    let mut clause_cursor = clause.walk();
    for part in clause.named_children(&mut clause_cursor) {
        match part.kind() {
            "identifier" => imp.default_binding = Some(text_of(part, code).to_string()),
            "namespace_import" => {
                let mut ns_cursor = part.walk();
                imp.namespace_binding = part
                    .named_children(&mut ns_cursor)
                    .find(|c| c.kind() == "identifier")
                    .map(|c| text_of(c, code).to_string());
            }
            "named_imports" => {
                let mut spec_cursor = part.walk();
                for spec in part.named_children(&mut spec_cursor) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    imp.named_bindings.push(NamedBinding {
                        name: text_of(name, code).to_string(),
                        alias: spec
                            .child_by_field_name("alias")
                            .map(|a| text_of(a, code).to_string()),
                        is_type_only: has_token(spec, "type"),
                    });
                }
            }
            _ => {}
        }
    }

    Some(imp)
}

/// Whether `node` has a direct anonymous child token of the given kind.
fn has_token(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == kind);
    found
}

fn text_of<'a>(node: Node, code: &'a str) -> &'a str {
    &code[node.start_byte()..node.end_byte()]
}
