//! The deserializer handle passed to every [`FromNode`] implementation.
//!
//! A [`Deserializer`] is a cursor on one node (or on nothing, when a property is absent)
//! plus the [`Session`] of the running deserialization. Reading a property *forks* a new
//! handle on the child node that shares the same session. Each fork increases the nesting
//! depth, which is checked against [`Options::max_depth`](crate::Options::max_depth), and
//! counts as an entry of the child node against
//! [`Options::alias_limits`](crate::Options::alias_limits).

use std::any::type_name;
use std::fmt;
use std::rc::Rc;

use crate::document::{Document, Node};
use crate::location::Location;
use crate::options::Cfg;
use crate::session::Session;
use crate::shape::{DynamicShape, FromNode, IntegralEnum, KeyedEnum};
use crate::{Error, Options};

/// Cursor on a node of a [`Document`], bound to a deserialization session.
///
/// ```rust
/// use saphyr_binder::{Deserializer, Document, Options};
///
/// let doc = Document::parse("name: probe\nretries: 3\n", &Options::default()).unwrap();
/// let de = Deserializer::new(&doc);
/// assert_eq!(de.get::<String>("name").unwrap(), "probe");
/// assert_eq!(de.get_or("timeout", 30u32).unwrap(), 30);
/// assert!(de.has_property("retries"));
/// ```
#[derive(Clone)]
pub struct Deserializer<'d> {
    doc: &'d Document,
    node: Option<Node<'d>>,
    session: Rc<Session>,
    depth: usize,
    /// Location of the node, or of the closest present ancestor when the node is absent.
    location: Location,
}

impl<'d> Deserializer<'d> {
    /// Start a new session at the document root with default options.
    pub fn new(doc: &'d Document) -> Self {
        Self::with_options(doc, &Options::default())
    }

    /// Start a new session at the document root.
    pub fn with_options(doc: &'d Document, options: &Options) -> Self {
        let node = doc.root();
        Self {
            doc,
            node,
            session: Rc::new(Session::new(options)),
            depth: 0,
            location: node.map(|n| n.location()).unwrap_or(Location::UNKNOWN),
        }
    }

    /// Handle on `node` (or on nothing) one level deeper, sharing this session.
    pub(crate) fn fork(&self, node: Option<Node<'d>>) -> Result<Deserializer<'d>, Error> {
        let depth = self.depth + 1;
        let location = node.map(|n| n.location()).unwrap_or(self.location);
        if depth > self.session.cfg.max_depth {
            return Err(Error::DepthLimitExceeded {
                limit: self.session.cfg.max_depth,
                location,
            });
        }
        if let Some(node) = node {
            self.session
                .visit(node.id())
                .map_err(|e| e.with_location(location))?;
        }
        Ok(Deserializer {
            doc: self.doc,
            node,
            session: Rc::clone(&self.session),
            depth,
            location,
        })
    }

    pub(crate) fn cfg(&self) -> &Cfg {
        &self.session.cfg
    }

    /// The current node, or `None` if it is absent.
    pub fn node(&self) -> Option<Node<'d>> {
        self.node
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Location of the current node, or of its closest present ancestor.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Number of forks between this handle and the document root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True if the current node is absent or a YAML null.
    pub fn is_null(&self) -> bool {
        self.node.is_none_or(|n| n.is_null())
    }

    /// Bind the current node as `T`.
    pub fn resolve<T: FromNode>(&self) -> Result<T, Error> {
        T::from_node(self).map_err(|e| e.or_location(self.location))
    }

    /// Bind the current node, which must be a `{type, value}` envelope, as `T`.
    pub fn resolve_dynamic<T: DynamicShape>(&self) -> Result<T, Error> {
        T::from_envelope(self).map_err(|e| e.or_location(self.location))
    }

    fn property(&self, key: &str) -> Option<Node<'d>> {
        self.node.and_then(|n| n.get(key))
    }

    /// True if the current node is a mapping with an entry named `key`.
    ///
    /// An entry whose value is null still counts as present.
    pub fn has_property(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    /// Bind the property `key` as `T`.
    ///
    /// An absent property fails with [`Error::MissingRequiredProperty`] unless `T` is an
    /// `Option`, which then yields `None`.
    pub fn get<T: FromNode>(&self, key: &str) -> Result<T, Error> {
        match self.property(key) {
            Some(node) => self.fork(Some(node))?.resolve(),
            None if T::OPTIONAL => self.fork(None)?.resolve(),
            None => Err(Error::missing_property(key).with_location(self.location)),
        }
    }

    /// Bind the property `key` as `T`, or return `default` if it is absent.
    ///
    /// A present property that fails to convert is still an error.
    pub fn get_or<T: FromNode>(&self, key: &str, default: T) -> Result<T, Error> {
        match self.property(key) {
            Some(node) => self.fork(Some(node))?.resolve(),
            None => Ok(default),
        }
    }

    /// Bind the property `key` as `T`; absent and null properties yield `None`.
    pub fn get_optional<T: FromNode>(&self, key: &str) -> Result<Option<T>, Error> {
        self.fork(self.property(key))?.resolve()
    }

    /// Dynamically construct the property `key`, which must be a `{type, value}` envelope.
    ///
    /// An absent property fails with [`Error::MissingRequiredProperty`] unless `T` is an
    /// `Option`.
    pub fn get_dynamic<T: DynamicShape>(&self, key: &str) -> Result<T, Error> {
        match self.property(key) {
            Some(node) => self.fork(Some(node))?.resolve_dynamic(),
            None if T::OPTIONAL => self.fork(None)?.resolve_dynamic(),
            None => Err(Error::missing_property(key).with_location(self.location)),
        }
    }

    /// Like [`Deserializer::get_dynamic`], but returns `default` if the property is absent.
    pub fn get_dynamic_or<T: DynamicShape>(&self, key: &str, default: T) -> Result<T, Error> {
        match self.property(key) {
            Some(node) => self.fork(Some(node))?.resolve_dynamic(),
            None => Ok(default),
        }
    }

    /// Fetch the session dependency of type `T` injected earlier.
    pub fn get_essential<T: 'static>(&self) -> Result<Rc<T>, Error> {
        self.session.essential::<T>()
    }

    /// Inject `value` as the session dependency of type `T`, replacing any previous one.
    ///
    /// Every deserializer of this session, including ones forked later, sees it.
    pub fn emplace_essential<T: 'static>(&self, value: T) -> Rc<T> {
        self.session.emplace_essential(value)
    }

    /// Text of the current node, which must be a scalar.
    pub fn scalar(&self) -> Result<&'d str, Error> {
        match self.node {
            Some(node) => node.as_scalar().ok_or_else(|| {
                Error::malformed_scalar(format!("expected a scalar, found a {}", node.describe()))
            }),
            None => Err(Error::malformed_scalar("expected a scalar, found nothing")),
        }
    }

    /// Forked handles on the elements of the current node, which must be a sequence.
    pub fn elements(&self) -> Result<Vec<Deserializer<'d>>, Error> {
        match self.node {
            Some(node) if node.is_sequence() => {
                node.elements().map(|el| self.fork(Some(el))).collect()
            }
            other => Err(Error::custom(format!(
                "expected a sequence, found {}",
                describe(other)
            ))),
        }
    }

    /// Forked `(key, value)` handles on the entries of the current node, which must be a
    /// mapping.
    pub fn entries(&self) -> Result<Vec<(Deserializer<'d>, Deserializer<'d>)>, Error> {
        match self.node {
            Some(node) if node.is_mapping() => node
                .entries()
                .map(|(k, v)| Ok((self.fork(Some(k))?, self.fork(Some(v))?)))
                .collect(),
            other => Err(Error::custom(format!(
                "expected a mapping, found {}",
                describe(other)
            ))),
        }
    }

    /// Match the scalar text against the enumerators of `T`. The match is exact.
    pub fn as_keyed_enum<T: KeyedEnum>(&self) -> Result<T, Error> {
        let name = self.scalar()?;
        T::ENUMERATORS
            .iter()
            .find(|(enumerator, _)| *enumerator == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| Error::UnrecognizedEnumerator {
                name: name.to_owned(),
                location: self.location,
            })
    }

    /// Read the node as the underlying representation of `T` and convert it unchecked.
    pub fn as_integral_enum<T: IntegralEnum>(&self) -> Result<T, Error> {
        self.resolve::<T::Repr>().map(T::from_repr)
    }

    /// Return the value already built for this node in this session, or build it and
    /// remember it. Absent nodes have no identity and are always built afresh.
    pub(crate) fn resolve_shared<P, F>(&self, build: F) -> Result<P, Error>
    where
        P: Clone + 'static,
        F: FnOnce() -> Result<P, Error>,
    {
        let Some(node) = self.node else {
            return build();
        };
        let id = node.id();
        if let Some(hit) = self
            .session
            .cached::<P>(id)
            .map_err(|e| e.with_location(self.location))?
        {
            log::trace!("shared node {} reused as {}", id.index(), type_name::<P>());
            return Ok(hit);
        }
        // the cache is not borrowed while the value is built, so nested shared
        // requests may fill it
        let value = build()?;
        self.session.cache(id, &value);
        Ok(value)
    }

    /// Construct `Box<B>` from the `{type, value}` envelope at the current node.
    pub(crate) fn construct_dynamic<B: ?Sized + 'static>(&self) -> Result<Box<B>, Error> {
        let Some(envelope) = self.node.filter(|n| n.is_mapping()) else {
            return Err(Error::malformed_envelope(
                "expected a mapping with `type` and `value` fields",
            ));
        };
        let name = envelope
            .get("type")
            .filter(|t| !t.is_null())
            .and_then(|t| t.as_scalar())
            .ok_or_else(|| Error::malformed_envelope("`type` must be a non-null scalar"))?;
        let value = envelope
            .get("value")
            .ok_or_else(|| Error::malformed_envelope("`value` field is missing"))?;

        let not_found = || Error::TypeNotFound {
            name: name.to_owned(),
            location: self.location,
        };
        let registry = self.session.registry().ok_or_else(not_found)?;
        let value = self.fork(Some(value))?;
        registry.construct::<B>(name, &value).ok_or_else(not_found)?
    }
}

fn describe(node: Option<Node<'_>>) -> &'static str {
    match node {
        Some(node) => node.describe(),
        None => "nothing",
    }
}

impl fmt::Debug for Deserializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deserializer")
            .field("node", &self.node.map(|n| n.id()))
            .field("depth", &self.depth)
            .field("location", &self.location)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(y: &str) -> Document {
        Document::parse(y, &Options::default()).expect("valid YAML")
    }

    #[test]
    fn absent_property_keeps_parent_location() {
        let d = doc("outer:\n  inner: 1\n");
        let de = Deserializer::new(&d);
        let outer = de.fork(de.property("outer")).unwrap();
        let err = outer.get::<i32>("missing").unwrap_err();
        assert!(matches!(err, Error::MissingRequiredProperty { ref key, .. } if key == "missing"));
        assert_eq!(err.location().unwrap().line(), 2);
    }

    #[test]
    fn explicit_null_counts_as_present() {
        let d = doc("a: ~\n");
        let de = Deserializer::new(&d);
        assert!(de.has_property("a"));
        assert!(!de.has_property("b"));
        assert_eq!(de.get_optional::<i32>("a").unwrap(), None);
        assert_eq!(de.get::<Option<i32>>("b").unwrap(), None);
        // get_or only falls back for absent keys
        assert!(de.get_or("a", 5i32).is_err());
    }

    #[test]
    fn forks_count_depth() {
        let d = doc("a: {b: {c: 1}}\n");
        let options = crate::options! { max_depth: 2 };
        let de = Deserializer::with_options(&d, &options);
        let a = de.fork(de.property("a")).unwrap();
        let b = a.fork(a.property("b")).unwrap();
        assert_eq!(b.depth(), 2);
        let err = b.get::<i32>("c").unwrap_err();
        assert!(matches!(err, Error::DepthLimitExceeded { limit: 2, .. }));
    }

    #[test]
    fn essentials_are_shared_across_forks() {
        let d = doc("a: {b: 1}\n");
        let de = Deserializer::new(&d);
        let stored = de.emplace_essential(String::from("ctx"));
        let child = de.fork(de.property("a")).unwrap();
        assert!(Rc::ptr_eq(&child.get_essential::<String>().unwrap(), &stored));
        assert!(matches!(
            child.get_essential::<u64>(),
            Err(Error::MissingEssential { .. })
        ));
    }

    #[test]
    fn scalar_reports_container_kind() {
        let d = doc("[1, 2]");
        let err = Deserializer::new(&d).scalar().unwrap_err();
        assert!(err.to_string().starts_with("expected a scalar, found a sequence"));
    }
}
