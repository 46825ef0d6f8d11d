//! State shared by every deserializer forked during one top-level deserialization.
//!
//! A [`Session`] holds two maps:
//! - essentials: dependencies injected by the caller, keyed by their Rust type;
//! - the shared cache: values already built for a node, keyed by node identity, so that
//!   every shared request for the same node yields the same `Rc`.
//!
//! It also counts how often each node is entered, enforcing the
//! [`AliasLimits`](crate::options::AliasLimits) of the session.
//!
//! Sessions are reference counted and single-threaded. Independent sessions never see
//! each other's state.

use std::any::{Any, TypeId, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;
use nohash_hasher::BuildNoHashHasher;

use crate::document::NodeId;
use crate::options::Cfg;
use crate::registry::{DynamicRegistry, global_registry};
use crate::{Error, Options};

pub(crate) struct Session {
    essentials: RefCell<AHashMap<TypeId, Rc<dyn Any>>>,
    /// Each value is an `Rc<T>` (possibly `Rc<dyn Trait>`) stored behind `dyn Any`.
    shared: RefCell<HashMap<NodeId, Box<dyn Any>, BuildNoHashHasher<NodeId>>>,
    visits: RefCell<HashMap<NodeId, usize, BuildNoHashHasher<NodeId>>>,
    replayed: Cell<usize>,
    registry: Option<Arc<DynamicRegistry>>,
    pub(crate) cfg: Cfg,
}

impl Session {
    pub(crate) fn new(options: &Options) -> Self {
        Self {
            essentials: RefCell::new(AHashMap::new()),
            shared: RefCell::new(HashMap::with_hasher(BuildNoHashHasher::default())),
            visits: RefCell::new(HashMap::with_hasher(BuildNoHashHasher::default())),
            replayed: Cell::new(0),
            registry: options.registry.clone(),
            cfg: Cfg::from_options(options),
        }
    }

    /// Store `value` as the essential of type `T`, replacing any previous one.
    pub(crate) fn emplace_essential<T: 'static>(&self, value: T) -> Rc<T> {
        let essential = Rc::new(value);
        let erased: Rc<dyn Any> = essential.clone();
        if self
            .essentials
            .borrow_mut()
            .insert(TypeId::of::<T>(), erased)
            .is_some()
        {
            log::debug!("essential {} replaced", type_name::<T>());
        }
        essential
    }

    pub(crate) fn essential<T: 'static>(&self) -> Result<Rc<T>, Error> {
        let found = self.essentials.borrow().get(&TypeId::of::<T>()).cloned();
        found
            .and_then(|erased| erased.downcast::<T>().ok())
            .ok_or(Error::MissingEssential {
                type_name: type_name::<T>(),
            })
    }

    /// Look up the shared value already built for `node`.
    ///
    /// Fails when the node was bound as a different type earlier in this session.
    pub(crate) fn cached<P: Clone + 'static>(&self, node: NodeId) -> Result<Option<P>, Error> {
        let shared = self.shared.borrow();
        match shared.get(&node) {
            None => Ok(None),
            Some(entry) => match entry.downcast_ref::<P>() {
                Some(value) => Ok(Some(value.clone())),
                None => Err(Error::SharedTypeMismatch {
                    expected: type_name::<P>(),
                    location: crate::Location::UNKNOWN,
                }),
            },
        }
    }

    pub(crate) fn cache<P: Clone + 'static>(&self, node: NodeId, value: &P) {
        self.shared.borrow_mut().insert(node, Box::new(value.clone()));
    }

    /// Record that `node` is being entered. Every entry after the first is a replay.
    pub(crate) fn visit(&self, node: NodeId) -> Result<(), Error> {
        let limits = self.cfg.alias_limits;
        let mut visits = self.visits.borrow_mut();
        let count = visits.entry(node).or_insert(0);
        *count += 1;
        if *count > limits.max_visits_per_node {
            return Err(Error::AliasReplayLimitExceeded {
                msg: format!(
                    "node entered {} times, limit is {}",
                    count, limits.max_visits_per_node
                ),
                location: crate::Location::UNKNOWN,
            });
        }
        if *count > 1 {
            let replayed = self.replayed.get() + 1;
            self.replayed.set(replayed);
            if replayed > limits.max_total_replayed_nodes {
                return Err(Error::AliasReplayLimitExceeded {
                    msg: format!(
                        "total_replayed_nodes={replayed} > {}",
                        limits.max_total_replayed_nodes
                    ),
                    location: crate::Location::UNKNOWN,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn replayed(&self) -> usize {
        self.replayed.get()
    }

    pub(crate) fn shared_len(&self) -> usize {
        self.shared.borrow().len()
    }

    /// The session registry, falling back to the process-wide one.
    pub(crate) fn registry(&self) -> Option<&DynamicRegistry> {
        match &self.registry {
            Some(registry) => Some(registry),
            None => global_registry(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("essentials", &self.essentials.borrow().len())
            .field("shared", &self.shared_len())
            .field("replayed", &self.replayed())
            .field("cfg", &self.cfg)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Units(&'static str);

    #[test]
    fn essentials_last_write_wins() {
        let session = Session::new(&Options::default());
        session.emplace_essential(Units("mm"));
        let second = session.emplace_essential(Units("cm"));
        let found = session.essential::<Units>().unwrap();
        assert!(Rc::ptr_eq(&found, &second));
        assert_eq!(*found, Units("cm"));
    }

    #[test]
    fn missing_essential_names_the_type() {
        let session = Session::new(&Options::default());
        let err = session.essential::<Units>().unwrap_err();
        assert!(matches!(
            err,
            Error::MissingEssential { type_name } if type_name.ends_with("Units")
        ));
    }

    #[test]
    fn cache_is_typed() {
        let session = Session::new(&Options::default());
        let value = Rc::new(5u32);
        session.cache(NodeId(3), &value);
        let hit: Rc<u32> = session.cached(NodeId(3)).unwrap().unwrap();
        assert!(Rc::ptr_eq(&hit, &value));
        assert!(session.cached::<Rc<u32>>(NodeId(4)).unwrap().is_none());
        assert!(matches!(
            session.cached::<Rc<String>>(NodeId(3)),
            Err(Error::SharedTypeMismatch { .. })
        ));
    }

    #[test]
    fn revisits_count_as_replays() {
        let options = crate::options! {
            alias_limits: crate::options::AliasLimits {
                max_total_replayed_nodes: 2,
                max_visits_per_node: usize::MAX,
            },
        };
        let session = Session::new(&options);
        session.visit(NodeId(0)).unwrap();
        session.visit(NodeId(1)).unwrap();
        assert_eq!(session.replayed(), 0);
        session.visit(NodeId(0)).unwrap();
        session.visit(NodeId(1)).unwrap();
        assert_eq!(session.replayed(), 2);
        assert!(matches!(
            session.visit(NodeId(0)),
            Err(Error::AliasReplayLimitExceeded { .. })
        ));
    }

    #[test]
    fn per_node_visit_limit() {
        let options = crate::options! {
            alias_limits: crate::options::AliasLimits {
                max_total_replayed_nodes: usize::MAX,
                max_visits_per_node: 2,
            },
        };
        let session = Session::new(&options);
        session.visit(NodeId(7)).unwrap();
        session.visit(NodeId(7)).unwrap();
        let err = session.visit(NodeId(7)).unwrap_err();
        assert!(err.to_string().contains("node entered 3 times, limit is 2"));
    }
}
