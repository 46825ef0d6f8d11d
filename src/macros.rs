//! Public macros for building option structs and implementing the binding traits.
//!
//! The option macros keep call sites stable while the option structs grow new fields.

/// Construct [`crate::Options`] from `Default` and a list of field assignments.
///
/// Example:
///
/// ```rust
/// let options = saphyr_binder::options! {
///     strict_booleans: true,
///     max_depth: 64,
/// };
/// assert_eq!(options.max_depth, 64);
/// ```
#[macro_export]
macro_rules! options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::Options::default();
        $(
            #[allow(deprecated)]
            {
                opt.$field = $value;
            }
        )*
        opt
    }};
}

/// Construct [`crate::Budget`] from `Default` and a list of field assignments.
///
/// ```rust
/// let budget = saphyr_binder::budget! {
///     max_aliases: 0,
///     max_depth: 16,
/// };
/// assert_eq!(budget.max_aliases, 0);
/// ```
#[macro_export]
macro_rules! budget {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut budget = $crate::Budget::default();
        $(
            {
                budget.$field = $value;
            }
        )*
        budget
    }};
}

/// Implement [`FromNode`](crate::FromNode) for an enum.
///
/// Two forms exist. A *keyed* enum lists its enumerators by name; the node text must match
/// one exactly:
///
/// ```rust
/// #[derive(Clone, Debug, PartialEq)]
/// enum Level {
///     Low,
///     High,
/// }
///
/// saphyr_binder::enumeration!(Level {
///     "low" => Level::Low,
///     "high" => Level::High,
/// });
///
/// let level: Level = saphyr_binder::from_str("high").unwrap();
/// assert_eq!(level, Level::High);
/// assert!(saphyr_binder::from_str::<Level>("medium").is_err());
/// ```
///
/// An *integral* enum is read as its representation and converted with `From`, without
/// checking that the number names a variant:
///
/// ```rust
/// #[derive(Debug, PartialEq)]
/// struct Port(u16);
///
/// impl From<u16> for Port {
///     fn from(raw: u16) -> Self {
///         Port(raw)
///     }
/// }
///
/// saphyr_binder::enumeration!(Port as u16);
///
/// assert_eq!(saphyr_binder::from_str::<Port>("8080").unwrap(), Port(8080));
/// ```
#[macro_export]
macro_rules! enumeration {
    ( $ty:ty { $( $name:literal => $value:expr ),+ $(,)? } ) => {
        impl $crate::KeyedEnum for $ty {
            const ENUMERATORS: &'static [(&'static str, Self)] = &[ $( ($name, $value) ),+ ];
        }

        impl $crate::FromNode for $ty {
            fn from_node(
                de: &$crate::Deserializer<'_>,
            ) -> ::std::result::Result<Self, $crate::Error> {
                de.as_keyed_enum()
            }
        }
    };
    ( $ty:ty as $repr:ty ) => {
        impl $crate::IntegralEnum for $ty {
            type Repr = $repr;

            fn from_repr(repr: $repr) -> Self {
                <$ty as ::std::convert::From<$repr>>::from(repr)
            }
        }

        impl $crate::FromNode for $ty {
            fn from_node(
                de: &$crate::Deserializer<'_>,
            ) -> ::std::result::Result<Self, $crate::Error> {
                de.as_integral_enum()
            }
        }
    };
}

/// Register concrete types under names for a base type in a [`crate::DynamicRegistry`].
///
/// Each concrete type must implement [`FromNode`](crate::FromNode) and coerce into the base,
/// typically by implementing the base trait.
///
/// ```rust
/// use saphyr_binder::{Deserializer, DynamicRegistry, Error, FromNode};
///
/// trait Plugin {
///     fn name(&self) -> &str;
/// }
///
/// struct Echo;
///
/// impl Plugin for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
/// }
///
/// impl FromNode for Echo {
///     fn from_node(_: &Deserializer<'_>) -> Result<Self, Error> {
///         Ok(Echo)
///     }
/// }
///
/// let mut registry = DynamicRegistry::new();
/// saphyr_binder::register_dynamic!(registry, dyn Plugin { "Echo" => Echo });
/// assert!(registry.contains::<dyn Plugin>("Echo"));
/// ```
#[macro_export]
macro_rules! register_dynamic {
    ( $registry:expr, $base:ty { $( $name:literal => $concrete:ty ),+ $(,)? } ) => {{
        let registry: &mut $crate::DynamicRegistry = &mut $registry;
        $(
            registry.register::<$base, $concrete>(
                $name,
                |value: $concrete| -> ::std::boxed::Box<$base> { ::std::boxed::Box::new(value) },
            );
        )+
    }};
}
