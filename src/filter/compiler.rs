//! Translates filter trees into PostgreSQL predicate text.

use tracing::warn;

use super::functions::FunctionTable;
use super::prepare::prepare_filter;
use super::tree::{FilterTree, NodeId, TokenKind};
use crate::catalog::{Resolution, SchemaCatalog, OBSERVATION_RESULT};
use crate::error::{QueryError, Result};
use crate::model::EntityType;

/// Text extraction form of the observation result.
pub(crate) const OBSERVATION_RESULT_TEXT: &str = "observation.data ->> 'result'";

/// Maps a logical operator token to SQL. Unknown operators map to `""`.
pub fn logical_operator(op: &str) -> &'static str {
    match op.to_ascii_lowercase().as_str() {
        "and" => "AND",
        "or" => "OR",
        "not" => "NOT",
        "has" => "HAS",
        "eq" => "=",
        "ne" => "!=",
        "gt" => ">",
        "ge" => ">=",
        "lt" => "<",
        "le" => "<=",
        _ => "",
    }
}

fn arithmetic_operator(op: &str) -> Option<(&'static str, &'static str)> {
    match op.to_ascii_lowercase().as_str() {
        "add" => Some(("+", "double precision")),
        "sub" => Some(("-", "double precision")),
        "mul" => Some(("*", "double precision")),
        "div" => Some(("/", "double precision")),
        "mod" => Some(("%", "integer")),
        _ => None,
    }
}

/// Switches a JSON extraction to its text form so it can be cast.
pub(crate) fn as_text_extraction(expr: &str) -> String {
    if expr == OBSERVATION_RESULT {
        return OBSERVATION_RESULT_TEXT.to_owned();
    }
    if expr.contains("->>") {
        return expr.to_owned();
    }
    match expr.rfind(" -> ") {
        Some(pos) => format!("{} ->> {}", &expr[..pos], &expr[pos + 4..]),
        None => expr.to_owned(),
    }
}

/// Compiles filter trees against the schema catalog.
///
/// The catalog and function table are built once per engine and borrowed
/// for every request.
pub struct FilterCompiler<'a> {
    catalog: &'a SchemaCatalog,
    functions: &'a FunctionTable,
    strict: bool,
}

/// State threaded through one compilation, handed to function translators.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    compiler: &'a FilterCompiler<'a>,
    entity_type: EntityType,
    tree: &'a FilterTree,
    ignore_aliasing: bool,
}

impl<'a> CompileContext<'a> {
    /// Entity type the filter is evaluated against.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Catalog in use.
    pub fn catalog(&self) -> &SchemaCatalog {
        self.compiler.catalog
    }

    /// The tree being compiled.
    pub fn tree(&self) -> &FilterTree {
        self.tree
    }

    /// Compiles an arbitrary node.
    pub fn compile(&self, node: NodeId) -> Result<String> {
        let token = self.tree.token(node);
        match token.kind {
            TokenKind::Empty => Ok(String::new()),
            TokenKind::Literal => self.literal(&token.value),
            TokenKind::Nav => self.navigation(node),
            TokenKind::Logical => self.logical(node),
            TokenKind::Op => self.arithmetic(node),
            TokenKind::Func => self.function(node),
            TokenKind::Geography => Ok(format!(
                "ST_SetSRID(ST_GeomFromText({}), 4326)",
                token.value
            )),
            kind if kind.is_scalar() => Ok(token.value.clone()),
            _ => Ok(String::new()),
        }
    }

    /// Compiles function argument `index` of `node`. Geometry properties are
    /// referenced by raw column; a missing argument compiles to `""`.
    pub fn arg(&self, node: NodeId, index: usize) -> Result<String> {
        let raw = CompileContext {
            ignore_aliasing: true,
            ..*self
        };
        raw.operand(node, index)
    }

    /// Kind of function argument `index`, if present.
    pub fn arg_kind(&self, node: NodeId, index: usize) -> Option<TokenKind> {
        self.tree.child(node, index).map(|n| self.tree.token(n).kind)
    }

    /// Returns true when argument `index` is a literal naming a geometry
    /// column of the current entity.
    pub fn arg_is_geometry(&self, node: NodeId, index: usize) -> bool {
        self.tree.child(node, index).is_some_and(|n| {
            let token = self.tree.token(n);
            token.kind == TokenKind::Literal
                && self.catalog().is_geometry(self.entity_type, &token.value)
        })
    }

    fn operand(&self, node: NodeId, index: usize) -> Result<String> {
        match self.tree.child(node, index) {
            Some(child) => self.compile(child),
            None => Ok(String::new()),
        }
    }

    /// Number of arguments of `node`.
    pub fn arg_count(&self, node: NodeId) -> usize {
        self.tree.children(node).len()
    }

    fn source(&self, node: Option<NodeId>) -> &str {
        node.map_or("", |n| self.tree.token(n).value.as_str())
    }

    fn literal(&self, name: &str) -> Result<String> {
        if self.ignore_aliasing {
            if let Resolution::Resolved(raw) = self.catalog().raw_column(self.entity_type, name) {
                return Ok(raw);
            }
        }
        match self.catalog().resolve_column(self.entity_type, name) {
            Resolution::Resolved(expr) => Ok(expr),
            Resolution::Unknown if self.compiler.strict => Err(QueryError::UnknownProperty {
                entity: self.entity_type,
                prop: name.to_owned(),
            }),
            Resolution::Unknown => {
                warn!(entity = %self.entity_type, property = name, "unresolved filter literal passed through");
                Ok(name.to_owned())
            }
        }
    }

    fn navigation(&self, node: NodeId) -> Result<String> {
        let segments = self.tree.children(node);
        let Some((&first, rest)) = segments.split_first() else {
            return Ok(String::new());
        };
        let mut out = self.compile(first)?;
        for (i, &segment) in rest.iter().enumerate() {
            let arrow = if i + 1 == rest.len() { "->>" } else { "->" };
            out.push_str(&format!(" {arrow} '{}'", self.tree.token(segment).value));
        }
        Ok(out)
    }

    fn logical(&self, node: NodeId) -> Result<String> {
        let token = self.tree.token(node);
        let op = logical_operator(&token.value);
        if op.is_empty() {
            return self.unsupported(&token.value);
        }
        let left_node = self.tree.child(node, 0);
        let right_node = self.tree.child(node, 1);
        let left = self.operand(node, 0)?;
        if right_node.is_none() {
            return Ok(if left.is_empty() {
                left
            } else {
                format!("{op} ({left})")
            });
        }
        let right = self.operand(node, 1)?;
        if op == "AND" || op == "OR" {
            return Ok(match (left.is_empty(), right.is_empty()) {
                (true, _) => right,
                (_, true) => left,
                _ => format!("({left}) {op} ({right})"),
            });
        }
        if left.is_empty() || right.is_empty() {
            return Ok(String::new());
        }
        let (mut left, mut right) =
            prepare_filter(self.source(left_node), left, self.source(right_node), right);
        if left == OBSERVATION_RESULT {
            left = result_cast(&right);
        } else if right == OBSERVATION_RESULT {
            right = result_cast(&left);
        }
        let right_is_null = right_node.is_some_and(|n| self.tree.token(n).kind == TokenKind::Null);
        Ok(match (op, right_is_null) {
            ("=", true) => format!("{left} IS NULL"),
            ("!=", true) => format!("{left} IS NOT NULL"),
            _ => format!("{left} {op} {right}"),
        })
    }

    fn arithmetic(&self, node: NodeId) -> Result<String> {
        let token = self.tree.token(node);
        let Some((op, cast)) = arithmetic_operator(&token.value) else {
            return self.unsupported(&token.value);
        };
        let left = as_text_extraction(&self.arg(node, 0)?);
        let right = as_text_extraction(&self.arg(node, 1)?);
        Ok(format!("({left})::{cast} {op} ({right})::{cast}"))
    }

    fn function(&self, node: NodeId) -> Result<String> {
        let name = &self.tree.token(node).value;
        match self.compiler.functions.get(name) {
            Some(translate) => translate(self, node),
            None => self.unsupported(name),
        }
    }

    fn unsupported(&self, name: &str) -> Result<String> {
        if self.compiler.strict {
            return Err(QueryError::UnsupportedFunction {
                name: name.to_owned(),
            });
        }
        warn!(name, "unsupported filter token compiled to nothing");
        Ok(String::new())
    }
}

/// Casts the observation result depending on what it is compared with.
fn result_cast(other: &str) -> String {
    if other.starts_with('\'') {
        OBSERVATION_RESULT_TEXT.to_owned()
    } else {
        format!("({OBSERVATION_RESULT_TEXT})::double precision")
    }
}

impl<'a> FilterCompiler<'a> {
    /// Creates a lenient compiler.
    pub fn new(catalog: &'a SchemaCatalog, functions: &'a FunctionTable) -> Self {
        FilterCompiler {
            catalog,
            functions,
            strict: false,
        }
    }

    /// Fails on unknown properties and functions instead of degrading.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Compiles the subtree rooted at `node`.
    ///
    /// With `ignore_aliasing`, geometry properties are referenced by raw
    /// table column instead of their GeoJSON projection.
    pub fn compile(
        &self,
        entity_type: EntityType,
        tree: &FilterTree,
        node: NodeId,
        ignore_aliasing: bool,
    ) -> Result<String> {
        CompileContext {
            compiler: self,
            entity_type,
            tree,
            ignore_aliasing,
        }
        .compile(node)
    }

    /// Compiles a whole tree; `None` means "no filter".
    pub fn compile_tree(
        &self,
        entity_type: EntityType,
        tree: Option<&FilterTree>,
    ) -> Result<Option<String>> {
        let Some(tree) = tree.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let Some(root) = tree.root() else {
            return Ok(None);
        };
        let sql = self.compile(entity_type, tree, root, false)?;
        Ok(Some(sql).filter(|s| !s.is_empty()))
    }
}
