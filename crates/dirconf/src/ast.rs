//! The syntax tree
//!
//! Every document is parsed into a tree of [Node]s (see [crate::parser]). The tree is never
//! modified after parsing: processing, unparsing, walking and inspecting all read the tree
//! and produce new values.
//!
//! Nodes are hashable because mapping keys are nodes themselves. A key like
//! `"$var(name)"` is a [Var] node and two structurally equal keys are the same key.
use crate::value::Value;
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Mapping with node keys
    Dict(Dict),
    /// Sequence
    List(Vec<Node>),
    /// Any plain value
    Literal(Literal),
    /// String made of adjacent text and directives, never holds a single element
    StrBundle(Vec<Node>),
    /// `$var(identifier, default=..., env=...)`
    Var(Var),
    /// `$import(path)`
    Import(Import),
    /// `$sweep(case, ...)`
    Sweep(Sweep),
    /// `{"$call": symbol, "$args": {...}}`
    Instance(Call),
    /// `{"$model": symbol, "$args": {...}}`
    Model(Call),
    /// `{"$for(iterable, identifier)": body}`
    For(For),
    /// `$index(identifier)`
    Index(LoopRef),
    /// `$item(identifier.sub.path)`
    Item(LoopRef),
    /// `$uuid`
    Uuid,
    /// `$date(format)`
    Date(Date),
    /// `$cmd(command)`
    Cmd(Cmd),
    /// `$tmp_dir(name)`
    TmpDir(TmpDir),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(pub Value);

/// Ordered mapping from key nodes to value nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict(pub IndexMap<Node, Node>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub identifier: Literal,
    pub default: Option<Box<Node>>,
    pub env: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    pub path: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sweep {
    pub cases: Vec<Node>,
}

/// Shared shape of [Node::Instance] and [Node::Model]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub symbol: Literal,
    pub args: Dict,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct For {
    /// Context path of the collection
    pub iterable: Literal,
    pub body: Box<Node>,
    pub identifier: Option<Literal>,
}

/// Reference to an active loop, see [Node::Index] and [Node::Item]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LoopRef {
    pub identifier: Option<Literal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Date {
    pub format: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cmd {
    pub command: Box<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TmpDir {
    pub name: Option<Box<Node>>,
}

impl Node {
    pub fn literal(value: impl Into<Value>) -> Node {
        Node::Literal(Literal(value.into()))
    }

    /// Bundle string fragments
    ///
    /// A single fragment is returned as is, no fragments make an empty string.
    pub fn str_bundle(mut nodes: Vec<Node>) -> Node {
        match nodes.len() {
            0 => Node::literal(""),
            1 => nodes.remove(0),
            _ => Node::StrBundle(nodes),
        }
    }

    /// Directive name as written in documents, `None` for plain data nodes
    pub fn directive_name(&self) -> Option<&'static str> {
        match self {
            Node::Dict(_) | Node::List(_) | Node::Literal(_) | Node::StrBundle(_) => None,
            Node::Var(_) => Some("var"),
            Node::Import(_) => Some("import"),
            Node::Sweep(_) => Some("sweep"),
            Node::Instance(_) => Some("call"),
            Node::Model(_) => Some("model"),
            Node::For(_) => Some("for"),
            Node::Index(_) => Some("index"),
            Node::Item(_) => Some("item"),
            Node::Uuid => Some("uuid"),
            Node::Date(_) => Some("date"),
            Node::Cmd(_) => Some("cmd"),
            Node::TmpDir(_) => Some("tmp_dir"),
        }
    }

    pub fn is_directive(&self) -> bool {
        self.directive_name().is_some()
    }
}

impl From<Literal> for Node {
    fn from(value: Literal) -> Self {
        Node::Literal(value)
    }
}

impl From<Dict> for Node {
    fn from(value: Dict) -> Self {
        Node::Dict(value)
    }
}

impl Literal {
    pub fn new(value: impl Into<Value>) -> Self {
        Literal(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl Dict {
    pub fn iter(&self) -> indexmap::map::Iter<'_, Node, Node> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// equality ignores entry order, so the hash must too
impl Hash for Dict {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
    }
}

impl FromIterator<(Node, Node)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Node, Node)>>(iter: I) -> Self {
        Dict(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dict {
    type Item = (&'a Node, &'a Node);
    type IntoIter = indexmap::map::Iter<'a, Node, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    fn var(identifier: &str) -> Node {
        Node::Var(Var {
            identifier: Literal::new(identifier),
            default: None,
            env: None,
        })
    }

    #[test]
    fn structurally_equal_keys_are_one_key() {
        let dict: Dict = [
            (var("a.b"), Node::literal(1)),
            (var("a.b"), Node::literal(2)),
            (var("c"), Node::literal(3)),
        ]
        .into_iter()
        .collect();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.0.get(&var("a.b")), Some(&Node::literal(2)));
    }

    #[test]
    fn different_directives_are_different_keys() {
        let sweep = Node::Sweep(Sweep {
            cases: vec![Node::literal("a")],
        });
        let keys: HashSet<Node> = [Node::literal("a"), sweep].into_iter().collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn str_bundle_collapses() {
        assert_eq!(Node::str_bundle(vec![var("x")]), var("x"));
        assert_eq!(Node::str_bundle(vec![]), Node::literal(""));
        assert!(matches!(
            Node::str_bundle(vec![Node::literal("a"), var("x")]),
            Node::StrBundle(nodes) if nodes.len() == 2
        ));
    }
}
