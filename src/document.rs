//! Immutable node arena built from a parsed YAML document.
//!
//! Every node lives at a stable [`NodeId`] inside its [`Document`]. An alias (`*name`) does
//! not copy the anchored node: it refers to the same id, so two places in the document
//! that alias one node share a single identity. The binder relies on this to deduplicate
//! shared values.

use std::fmt;
use std::io::Read;
use std::ptr;

use saphyr_parser::ScalarStyle;

use crate::location::Location;
use crate::tags::{ScalarTag, scalar_is_null};
use crate::{Error, Options, loader};

/// Identity of a node inside its [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl nohash_hasher::IsEnabled for NodeId {}

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Content of a node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Scalar {
        value: String,
        style: ScalarStyle,
        tag: ScalarTag,
    },
    /// Elements in document order.
    Sequence(Vec<NodeId>),
    /// Key/value pairs in document order.
    Mapping(Vec<(NodeId, NodeId)>),
}

#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) location: Location,
}

/// A loaded YAML document.
///
/// ```rust
/// use saphyr_binder::{Document, Options};
///
/// let doc = Document::parse("a: &x [1, 2]\nb: *x\n", &Options::default()).unwrap();
/// let root = doc.root().unwrap();
/// let a = root.get("a").unwrap();
/// let b = root.get("b").unwrap();
/// assert_eq!(a.id(), b.id());
/// assert_eq!(a.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Document {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) root: Option<NodeId>,
}

impl Document {
    /// Parse a single YAML document from text.
    pub fn parse(input: &str, options: &Options) -> Result<Self, Error> {
        loader::load(input, options)
    }

    /// Read and parse a single YAML document from a byte stream.
    ///
    /// UTF-8 and UTF-16 (with BOM) are detected and decoded. At most
    /// [`Options::input_cap`] decoded bytes are accepted.
    pub fn from_reader<R: Read>(reader: R, options: &Options) -> Result<Self, Error> {
        let input = loader::read_to_string(reader, options.input_cap)?;
        loader::load(&input, options)
    }

    /// Top-level node, or `None` for an empty document.
    pub fn root(&self) -> Option<Node<'_>> {
        self.root.map(|id| self.handle(id))
    }

    /// Access a node by id. Returns `None` if `id` is out of range, which can only happen
    /// for an id taken from another, larger document.
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.index() < self.nodes.len()).then(|| self.handle(id))
    }

    /// Handle on an id stored in this arena.
    fn handle(&self, id: NodeId) -> Node<'_> {
        Node { doc: self, id }
    }

    /// Number of distinct nodes (aliases do not add nodes).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish()
    }
}

/// Handle to one node of a [`Document`].
///
/// Two handles are equal when they point at the same node of the same document.
#[derive(Clone, Copy)]
pub struct Node<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl<'d> Node<'d> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'d NodeKind {
        &self.doc.data(self.id).kind
    }

    pub fn location(&self) -> Location {
        self.doc.data(self.id).location
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Scalar text, or `None` for sequences and mappings.
    pub fn as_scalar(&self) -> Option<&'d str> {
        match self.kind() {
            NodeKind::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Tag classification of a scalar node.
    pub fn tag(&self) -> ScalarTag {
        match self.kind() {
            NodeKind::Scalar { tag, .. } => *tag,
            _ => ScalarTag::None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self.kind() {
            NodeKind::Scalar { value, style, tag } => scalar_is_null(value, *style, *tag),
            _ => false,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind(), NodeKind::Scalar { .. })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind(), NodeKind::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind(), NodeKind::Mapping(_))
    }

    /// Number of elements (sequence) or entries (mapping); 0 for scalars.
    pub fn len(&self) -> usize {
        match self.kind() {
            NodeKind::Scalar { .. } => 0,
            NodeKind::Sequence(items) => items.len(),
            NodeKind::Mapping(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of the first mapping entry whose key is the scalar `key`.
    ///
    /// Returns `None` for absent keys and for nodes that are not mappings.
    pub fn get(&self, key: &str) -> Option<Node<'d>> {
        let NodeKind::Mapping(entries) = self.kind() else {
            return None;
        };
        entries
            .iter()
            .find(|(k, _)| self.doc.handle(*k).as_scalar() == Some(key))
            .map(|(_, v)| self.doc.handle(*v))
    }

    /// Sequence element at `index`.
    pub fn index(&self, index: usize) -> Option<Node<'d>> {
        match self.kind() {
            NodeKind::Sequence(items) => items.get(index).map(|id| self.doc.handle(*id)),
            _ => None,
        }
    }

    /// Sequence elements in document order (empty for other kinds).
    pub fn elements(&self) -> impl Iterator<Item = Node<'d>> + use<'d> {
        let doc = self.doc;
        let items: &'d [NodeId] = match self.kind() {
            NodeKind::Sequence(items) => items,
            _ => &[],
        };
        items.iter().map(move |id| doc.handle(*id))
    }

    /// Mapping entries in document order (empty for other kinds).
    pub fn entries(&self) -> impl Iterator<Item = (Node<'d>, Node<'d>)> + use<'d> {
        let doc = self.doc;
        let entries: &'d [(NodeId, NodeId)] = match self.kind() {
            NodeKind::Mapping(entries) => entries,
            _ => &[],
        };
        entries.iter().map(move |(k, v)| (doc.handle(*k), doc.handle(*v)))
    }

    /// Short human name of the node kind, for error messages.
    pub(crate) fn describe(&self) -> &'static str {
        match self.kind() {
            NodeKind::Scalar { .. } if self.is_null() => "null",
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", self.kind())
            .field("location", &self.location())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(y: &str) -> Document {
        Document::parse(y, &Options::default()).expect("valid YAML")
    }

    #[test]
    fn mapping_lookup_and_order() {
        let doc = parse("b: 1\na: 2\n");
        let root = doc.root().unwrap();
        assert_eq!(root.get("a").unwrap().as_scalar(), Some("2"));
        assert!(root.get("c").is_none());
        let keys: Vec<_> = root.entries().map(|(k, _)| k.as_scalar().unwrap()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn aliases_share_identity() {
        let doc = parse("first: &p {x: 1}\nsecond: *p\nthird: {x: 1}\n");
        let root = doc.root().unwrap();
        let first = root.get("first").unwrap();
        assert_eq!(first, root.get("second").unwrap());
        assert_ne!(first, root.get("third").unwrap());
    }

    #[test]
    fn foreign_ids_are_rejected() {
        let big = parse("[a, b, c, d]");
        let small = parse("x");
        let last = big.root().unwrap().index(3).unwrap().id();
        assert_eq!(big.node(last).unwrap().as_scalar(), Some("d"));
        assert!(small.node(last).is_none());
        assert_eq!(small.node(small.root().unwrap().id()), small.root());
    }

    #[test]
    fn sequence_access() {
        let doc = parse("[a, b, c]");
        let root = doc.root().unwrap();
        assert!(root.is_sequence());
        assert_eq!(root.index(1).unwrap().as_scalar(), Some("b"));
        assert!(root.index(3).is_none());
        assert_eq!(root.elements().count(), 3);
    }

    #[test]
    fn null_detection() {
        let doc = parse("a: ~\nb: ''\nc:\nd: !!null x\n");
        let root = doc.root().unwrap();
        assert!(root.get("a").unwrap().is_null());
        assert!(!root.get("b").unwrap().is_null());
        assert!(root.get("c").unwrap().is_null());
        assert!(root.get("d").unwrap().is_null());
    }

    #[test]
    fn empty_document_has_no_root() {
        let doc = parse("");
        assert!(doc.root().is_none());
        assert!(doc.is_empty());
    }
}
