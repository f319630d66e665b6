//! Arena representation of parsed `$filter` expressions.
//!
//! Nodes are addressed by index and carry an explicit parent index so
//! hoisting can walk upwards and rewrite subtrees in place. Detached nodes
//! stay in the arena; only nodes reachable from the root are meaningful.

use std::fmt;

/// Index of a node inside a [`FilterTree`].
pub type NodeId = usize;

/// Kinds of tokens produced by the filter parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `and`, `or`, `not` and the comparisons `eq ne gt ge lt le has`.
    Logical,
    /// Arithmetic: `add sub mul div mod`.
    Op,
    /// Function call; children are the arguments.
    Func,
    /// Slash separated path; children are the segments.
    Nav,
    /// `geography'...'` literal; the value holds the quoted WKT.
    Geography,
    /// Bare identifier, usually a property name.
    Literal,
    /// Quoted string literal, quotes included.
    String,
    /// Integer literal.
    Integer,
    /// Floating point literal.
    Float,
    /// Date literal.
    Date,
    /// Time literal.
    Time,
    /// Date-time literal.
    DateTime,
    /// `true` / `false`.
    Boolean,
    /// `null`.
    Null,
    /// Cleared position; compiles to nothing.
    Empty,
}

impl TokenKind {
    /// Returns true for scalar literal kinds that compile to their own text.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            TokenKind::String
                | TokenKind::Integer
                | TokenKind::Float
                | TokenKind::Date
                | TokenKind::Time
                | TokenKind::DateTime
                | TokenKind::Boolean
                | TokenKind::Null
        )
    }
}

/// A typed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Token text as written (operators and function names lower-cased by
    /// the parser, string literals quoted).
    pub value: String,
}

impl Token {
    /// Builds a token.
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Token {
            kind,
            value: value.into(),
        }
    }

    /// The empty token left behind by hoisting.
    pub fn empty() -> Self {
        Token::new(TokenKind::Empty, "")
    }

    /// Returns true for `and` / `or`.
    pub fn is_coupling(&self) -> bool {
        self.kind == TokenKind::Logical
            && (self.value.eq_ignore_ascii_case("and") || self.value.eq_ignore_ascii_case("or"))
    }
}

/// One node of the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    /// Node token.
    pub token: Token,
    /// Parent index, `None` for the root and detached nodes.
    pub parent: Option<NodeId>,
    /// Ordered child indices.
    pub children: Vec<NodeId>,
}

/// Arena-backed filter expression tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    nodes: Vec<FilterNode>,
    root: Option<NodeId>,
}

impl FilterTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node owning `children` and returns its index.
    pub fn push(&mut self, token: Token, children: Vec<NodeId>) -> NodeId {
        let id = self.nodes.len();
        for &child in &children {
            self.nodes[child].parent = Some(id);
        }
        self.nodes.push(FilterNode {
            token,
            parent: None,
            children,
        });
        id
    }

    /// Marks `id` as the root.
    pub fn set_root(&mut self, id: NodeId) {
        self.nodes[id].parent = None;
        self.root = Some(id);
    }

    /// Root index, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns true when there is nothing meaningful to compile.
    pub fn is_empty(&self) -> bool {
        self.root
            .map_or(true, |root| self.nodes[root].token.kind == TokenKind::Empty)
    }

    /// Node at `id`.
    pub fn node(&self, id: NodeId) -> &FilterNode {
        &self.nodes[id]
    }

    /// Token at `id`.
    pub fn token(&self, id: NodeId) -> &Token {
        &self.nodes[id].token
    }

    /// Children of `id`.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Child `index` of `id`, if present.
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id].children.get(index).copied()
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Nodes reachable from the root, parents before children.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// Replaces the token at `id`, dropping its children.
    pub fn replace(&mut self, id: NodeId, token: Token) {
        for child in std::mem::take(&mut self.nodes[id].children) {
            self.nodes[child].parent = None;
        }
        self.nodes[id].token = token;
    }

    /// Clears `id` to an [`TokenKind::Empty`] token.
    pub fn clear(&mut self, id: NodeId) {
        self.replace(id, Token::empty());
    }

    /// Puts `replacement` in the position of `id` within its parent (or as
    /// root) and detaches `id`.
    pub fn promote(&mut self, id: NodeId, replacement: NodeId) {
        let parent = self.nodes[id].parent;
        if let Some(old_parent) = self.nodes[replacement].parent {
            self.nodes[old_parent].children.retain(|&c| c != replacement);
        }
        self.nodes[replacement].parent = parent;
        match parent {
            Some(p) => {
                for slot in &mut self.nodes[p].children {
                    if *slot == id {
                        *slot = replacement;
                    }
                }
            }
            None => {
                if self.root == Some(id) {
                    self.root = Some(replacement);
                }
            }
        }
        self.nodes[id].parent = None;
    }

    /// Copies the subtree rooted at `id` of `other` into this arena and
    /// returns the index of the copy.
    pub fn graft(&mut self, other: &FilterTree, id: NodeId) -> NodeId {
        let children = other.nodes[id]
            .children
            .iter()
            .map(|&c| self.graft(other, c))
            .collect();
        self.push(other.nodes[id].token.clone(), children)
    }

    /// Extracts the subtree rooted at `id` as a standalone tree.
    pub fn subtree(&self, id: NodeId) -> FilterTree {
        let mut out = FilterTree::new();
        let root = out.graft(self, id);
        out.set_root(root);
        out
    }

    /// Combines two trees under a new `op` coupling. Empty operands are
    /// dropped.
    pub fn combine(left: FilterTree, right: FilterTree, op: &str) -> FilterTree {
        match (left.root.filter(|_| !left.is_empty()), right.root.filter(|_| !right.is_empty())) {
            (None, _) => right,
            (_, None) => left,
            (Some(l), Some(r)) => {
                let mut out = FilterTree::new();
                let l = out.graft(&left, l);
                let r = out.graft(&right, r);
                let root = out.push(Token::new(TokenKind::Logical, op), vec![l, r]);
                out.set_root(root);
                out
            }
        }
    }

    fn fmt_node(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = &self.nodes[id];
        let child = |i: usize| node.children.get(i).copied();
        match node.token.kind {
            TokenKind::Empty => Ok(()),
            TokenKind::Nav => {
                for (i, &c) in node.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    self.fmt_node(c, f)?;
                }
                Ok(())
            }
            TokenKind::Func => {
                write!(f, "{}(", node.token.value)?;
                for (i, &c) in node.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.fmt_node(c, f)?;
                }
                f.write_str(")")
            }
            TokenKind::Logical | TokenKind::Op => match (child(0), child(1)) {
                (Some(l), Some(r)) => {
                    self.fmt_operand(l, f)?;
                    write!(f, " {} ", node.token.value)?;
                    self.fmt_operand(r, f)
                }
                (Some(only), None) => {
                    write!(f, "{} ", node.token.value)?;
                    self.fmt_operand(only, f)
                }
                _ => f.write_str(&node.token.value),
            },
            TokenKind::Geography => write!(f, "geography{}", node.token.value),
            _ => f.write_str(&node.token.value),
        }
    }

    fn fmt_operand(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes[id].token.is_coupling() {
            f.write_str("(")?;
            self.fmt_node(id, f)?;
            f.write_str(")")
        } else {
            self.fmt_node(id, f)
        }
    }
}

/// Renders the tree back to `$filter` syntax.
impl fmt::Display for FilterTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => self.fmt_node(root, f),
            None => Ok(()),
        }
    }
}

/// Owned recursive expression used to build [`FilterTree`]s by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    token: Token,
    children: Vec<FilterExpr>,
}

impl FilterExpr {
    fn node(kind: TokenKind, value: impl Into<String>, children: Vec<FilterExpr>) -> Self {
        FilterExpr {
            token: Token::new(kind, value),
            children,
        }
    }

    /// `left and right`
    pub fn and(left: FilterExpr, right: FilterExpr) -> Self {
        Self::node(TokenKind::Logical, "and", vec![left, right])
    }

    /// `left or right`
    pub fn or(left: FilterExpr, right: FilterExpr) -> Self {
        Self::node(TokenKind::Logical, "or", vec![left, right])
    }

    /// `not operand`
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: FilterExpr) -> Self {
        Self::node(TokenKind::Logical, "not", vec![operand])
    }

    /// Comparison such as `eq` or `ge`.
    pub fn compare(op: &str, left: FilterExpr, right: FilterExpr) -> Self {
        Self::node(TokenKind::Logical, op, vec![left, right])
    }

    /// Arithmetic such as `add` or `mod`.
    pub fn arith(op: &str, left: FilterExpr, right: FilterExpr) -> Self {
        Self::node(TokenKind::Op, op, vec![left, right])
    }

    /// Function call.
    pub fn func(name: &str, args: Vec<FilterExpr>) -> Self {
        Self::node(TokenKind::Func, name, args)
    }

    /// Navigation path, e.g. `["Datastreams", "Observations", "result"]`.
    pub fn nav<S: AsRef<str>>(segments: &[S]) -> Self {
        let children = segments
            .iter()
            .map(|s| Self::literal(s.as_ref()))
            .collect();
        Self::node(TokenKind::Nav, "/", children)
    }

    /// Bare identifier.
    pub fn literal(name: &str) -> Self {
        Self::node(TokenKind::Literal, name, Vec::new())
    }

    /// String literal; quotes are added and embedded quotes doubled.
    pub fn string(text: &str) -> Self {
        Self::node(
            TokenKind::String,
            format!("'{}'", text.replace('\'', "''")),
            Vec::new(),
        )
    }

    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Self::node(TokenKind::Integer, value.to_string(), Vec::new())
    }

    /// Floating point literal.
    pub fn float(value: f64) -> Self {
        Self::node(TokenKind::Float, value.to_string(), Vec::new())
    }

    /// Boolean literal.
    pub fn boolean(value: bool) -> Self {
        Self::node(TokenKind::Boolean, value.to_string(), Vec::new())
    }

    /// `null`.
    pub fn null() -> Self {
        Self::node(TokenKind::Null, "null", Vec::new())
    }

    /// Date-time literal as written, e.g. `2016-01-01T00:00:00Z`.
    pub fn datetime(text: &str) -> Self {
        Self::node(TokenKind::DateTime, text, Vec::new())
    }

    /// Geography literal from WKT text.
    pub fn geography(wkt: &str) -> Self {
        Self::node(TokenKind::Geography, format!("'{wkt}'"), Vec::new())
    }

    /// Any other token kind, e.g. [`TokenKind::Date`].
    pub fn token(kind: TokenKind, value: &str, children: Vec<FilterExpr>) -> Self {
        Self::node(kind, value, children)
    }

    fn lower(self, tree: &mut FilterTree) -> NodeId {
        let children = self.children.into_iter().map(|c| c.lower(tree)).collect();
        tree.push(self.token, children)
    }
}

impl From<FilterExpr> for FilterTree {
    fn from(expr: FilterExpr) -> Self {
        let mut tree = FilterTree::new();
        let root = expr.lower(&mut tree);
        tree.set_root(root);
        tree
    }
}
