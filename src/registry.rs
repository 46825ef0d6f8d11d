//! Name-keyed factories for dynamic (polymorphic) construction.
//!
//! A registry maps a *base* type (usually a trait object such as `dyn Shape`) and a type
//! name to a factory. The factory binds the envelope's `value` node as a concrete type and
//! converts the result into an owning `Box<Base>`. Ownership always travels with the value,
//! so dropping the constructed object runs the concrete type's destructor.
//!
//! Registration happens during an explicit startup phase: build a [`DynamicRegistry`], then
//! either hand it to [`Options::registry`](crate::Options::registry) or install it once,
//! process-wide, with [`install_registry`]. Lookups never mutate the registry.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::OnceLock;

use ahash::AHashMap;

use crate::de::Deserializer;
use crate::shape::FromNode;
use crate::Error;

type Factory = Box<dyn Fn(&Deserializer<'_>) -> Result<ErasedValue, Error> + Send + Sync>;

struct Entry {
    concrete: &'static str,
    factory: Factory,
}

/// A value built by a registry factory, with its static type erased.
///
/// It owns a `Box<Base>`; recover it with [`ErasedValue::downcast`].
pub struct ErasedValue {
    inner: Box<dyn Any>,
    concrete: &'static str,
}

impl ErasedValue {
    fn new<B: ?Sized + 'static>(value: Box<B>, concrete: &'static str) -> Self {
        Self {
            inner: Box::new(value),
            concrete,
        }
    }

    /// Name of the concrete Rust type the factory produced.
    pub fn concrete_type(&self) -> &'static str {
        self.concrete
    }

    /// Take the owned value back as a `Box<B>`. Fails if it was built for another base.
    pub fn downcast<B: ?Sized + 'static>(self) -> Result<Box<B>, Self> {
        let concrete = self.concrete;
        match self.inner.downcast::<Box<B>>() {
            Ok(value) => Ok(*value),
            Err(inner) => Err(Self { inner, concrete }),
        }
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("concrete", &self.concrete)
            .finish_non_exhaustive()
    }
}

/// Factories for dynamic construction, grouped by base type.
///
/// ```rust
/// use std::sync::Arc;
/// use saphyr_binder::{Deserializer, DynamicRegistry, Error, FromNode};
///
/// trait Shape {
///     fn area(&self) -> f64;
/// }
///
/// struct Square {
///     side: f64,
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.side * self.side
///     }
/// }
///
/// impl FromNode for Square {
///     fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
///         Ok(Square { side: de.get("side")? })
///     }
/// }
///
/// let mut registry = DynamicRegistry::new();
/// saphyr_binder::register_dynamic!(registry, dyn Shape { "Square" => Square });
///
/// let options = saphyr_binder::options! { registry: Some(Arc::new(registry)) };
/// let shape: Box<dyn Shape> = saphyr_binder::from_str_dynamic_with_options(
///     "{type: Square, value: {side: 3}}",
///     options,
/// )
/// .unwrap();
/// assert_eq!(shape.area(), 9.0);
/// ```
#[derive(Default)]
pub struct DynamicRegistry {
    bases: AHashMap<TypeId, AHashMap<String, Entry>>,
}

impl DynamicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name` for the base `B`.
    ///
    /// `into_base` converts the bound value into the owning base pointer, for example
    /// `|value: Circle| -> Box<dyn Shape> { Box::new(value) }`. Registering a name twice for
    /// the same base replaces the earlier factory.
    pub fn register<B, T>(
        &mut self,
        name: impl Into<String>,
        into_base: fn(T) -> Box<B>,
    ) -> &mut Self
    where
        B: ?Sized + 'static,
        T: FromNode + 'static,
    {
        let name = name.into();
        let factory: Factory = Box::new(move |de: &Deserializer<'_>| {
            let value = de.resolve::<T>()?;
            Ok(ErasedValue::new::<B>(into_base(value), type_name::<T>()))
        });
        let entry = Entry {
            concrete: type_name::<T>(),
            factory,
        };
        let previous = self
            .bases
            .entry(TypeId::of::<B>())
            .or_default()
            .insert(name.clone(), entry);
        match previous {
            Some(old) => log::warn!(
                "dynamic type `{name}` for {} re-registered: {} replaces {}",
                type_name::<B>(),
                type_name::<T>(),
                old.concrete
            ),
            None => log::debug!(
                "registered dynamic type `{name}` for {} as {}",
                type_name::<B>(),
                type_name::<T>()
            ),
        }
        self
    }

    /// True if `name` is registered for the base `B`.
    pub fn contains<B: ?Sized + 'static>(&self, name: &str) -> bool {
        self.lookup::<B>(name).is_some()
    }

    /// Registered names for the base `B`, in no particular order.
    pub fn names<B: ?Sized + 'static>(&self) -> impl Iterator<Item = &str> + '_ {
        self.bases
            .get(&TypeId::of::<B>())
            .into_iter()
            .flat_map(|entries| entries.keys().map(String::as_str))
    }

    /// Total number of registrations across all bases.
    pub fn len(&self) -> usize {
        self.bases.values().map(|entries| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<B: ?Sized + 'static>(&self, name: &str) -> Option<&Entry> {
        self.bases.get(&TypeId::of::<B>())?.get(name)
    }

    /// Run the factory registered under `name`, binding the node `value` points at.
    ///
    /// Returns `None` when no factory is registered for that name and base.
    pub(crate) fn construct<B: ?Sized + 'static>(
        &self,
        name: &str,
        value: &Deserializer<'_>,
    ) -> Option<Result<Box<B>, Error>> {
        let entry = self.lookup::<B>(name)?;
        log::trace!("constructing `{name}` as {}", entry.concrete);
        let built = (entry.factory)(value).and_then(|erased| {
            erased.downcast::<B>().map_err(|erased| {
                Error::custom(format!(
                    "factory for `{name}` produced {} instead of {}",
                    erased.concrete_type(),
                    type_name::<B>()
                ))
            })
        });
        Some(built)
    }
}

impl fmt::Debug for DynamicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entries in self.bases.values() {
            for (name, entry) in entries {
                map.entry(name, &entry.concrete);
            }
        }
        map.finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<DynamicRegistry> = OnceLock::new();

/// Install the process-wide registry used when [`Options::registry`](crate::Options::registry)
/// is `None`.
///
/// This may succeed only once; later calls return the rejected registry unchanged.
pub fn install_registry(registry: DynamicRegistry) -> Result<(), DynamicRegistry> {
    let count = registry.len();
    GLOBAL_REGISTRY.set(registry)?;
    log::debug!("installed global dynamic registry with {count} entries");
    Ok(())
}

/// The process-wide registry, if one has been installed.
pub fn global_registry() -> Option<&'static DynamicRegistry> {
    GLOBAL_REGISTRY.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Options};

    trait Animal {
        fn noise(&self) -> String;
    }

    struct Dog;

    impl Animal for Dog {
        fn noise(&self) -> String {
            "woof".into()
        }
    }

    impl FromNode for Dog {
        fn from_node(_de: &Deserializer<'_>) -> Result<Self, Error> {
            Ok(Dog)
        }
    }

    struct Cat {
        lives: u8,
    }

    impl Animal for Cat {
        fn noise(&self) -> String {
            format!("meow x{}", self.lives)
        }
    }

    impl FromNode for Cat {
        fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
            Ok(Cat {
                lives: de.resolve()?,
            })
        }
    }

    fn animals() -> DynamicRegistry {
        let mut registry = DynamicRegistry::new();
        registry
            .register::<dyn Animal, Dog>("Dog", |d| -> Box<dyn Animal> { Box::new(d) })
            .register::<dyn Animal, Cat>("Cat", |c| -> Box<dyn Animal> { Box::new(c) });
        registry
    }

    #[test]
    fn names_are_scoped_by_base() {
        let registry = animals();
        assert!(registry.contains::<dyn Animal>("Dog"));
        assert!(!registry.contains::<dyn fmt::Debug>("Dog"));
        assert!(!registry.contains::<dyn Animal>("dog"));
        let mut names: Vec<_> = registry.names::<dyn Animal>().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Cat", "Dog"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reregistration_replaces() {
        let mut registry = animals();
        registry.register::<dyn Animal, Cat>("Dog", |c| -> Box<dyn Animal> { Box::new(c) });
        assert_eq!(registry.len(), 2);

        let doc = Document::parse("9", &Options::default()).unwrap();
        let de = Deserializer::new(&doc);
        let built = registry.construct::<dyn Animal>("Dog", &de).unwrap().unwrap();
        assert_eq!(built.noise(), "meow x9");
    }

    #[test]
    fn pointer_results_are_handed_over() {
        let mut registry = DynamicRegistry::new();
        registry.register::<dyn Animal, Box<Cat>>("Cat", |c| -> Box<dyn Animal> { c });
        let doc = Document::parse("3", &Options::default()).unwrap();
        let de = Deserializer::new(&doc);
        let built = registry.construct::<dyn Animal>("Cat", &de).unwrap().unwrap();
        assert_eq!(built.noise(), "meow x3");
    }

    #[test]
    fn unknown_name_yields_none() {
        let registry = animals();
        let doc = Document::parse("~", &Options::default()).unwrap();
        let de = Deserializer::new(&doc);
        assert!(registry.construct::<dyn Animal>("Cow", &de).is_none());
    }

    #[test]
    fn erased_value_keeps_its_base() {
        let erased = ErasedValue::new::<dyn Animal>(Box::new(Dog), "Dog");
        let erased = erased.downcast::<dyn fmt::Debug>().unwrap_err();
        assert_eq!(erased.concrete_type(), "Dog");
        assert_eq!(erased.downcast::<dyn Animal>().unwrap().noise(), "woof");
    }
}
