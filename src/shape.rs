//! Target shapes: how each kind of Rust type is bound from a node.
//!
//! Static dispatch picks the strategy from the requested type:
//! - primitives parse scalar text;
//! - keyed enums match the text against a fixed name table;
//! - integral enums read the underlying integer and convert it unchecked;
//! - `Option<T>` yields `None` for absent or null nodes;
//! - `Vec<T>` binds each element of a sequence;
//! - maps bind each entry of a mapping;
//! - `Box<T>` owns a freshly built value;
//! - `Rc<T>` is shared: every request for the same node in one session yields the same `Rc`;
//! - user types implement [`FromNode`], usually with [`Deserializer::get`] per field.
//!
//! [`DynamicShape`] covers the pointer shapes that construct through the registry.
//!
//! A type with no strategy does not implement the trait, so requesting it is a compile
//! error:
//!
//! ```compile_fail
//! struct Opaque;
//! let _: Opaque = saphyr_binder::from_str("1").unwrap();
//! ```
//!
//! ```compile_fail
//! // dynamic construction needs an owning pointer
//! let _: u32 = saphyr_binder::from_str_dynamic("{type: A, value: 1}").unwrap();
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

use crate::de::Deserializer;
use crate::parse_scalars::{
    parse_char, parse_int_signed, parse_int_unsigned, parse_strict_bool, parse_yaml11_bool,
    parse_yaml12_float,
};
use crate::tags::ScalarTag;
use crate::Error;

/// A type that can be bound from a YAML node.
///
/// ```rust
/// use saphyr_binder::{Deserializer, Error, FromNode};
///
/// #[derive(Debug, PartialEq)]
/// struct Endpoint {
///     host: String,
///     port: u16,
///     tags: Vec<String>,
/// }
///
/// impl FromNode for Endpoint {
///     fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
///         Ok(Endpoint {
///             host: de.get("host")?,
///             port: de.get_or("port", 80)?,
///             tags: de.get_or("tags", Vec::new())?,
///         })
///     }
/// }
///
/// let ep: Endpoint = saphyr_binder::from_str("host: example.org\ntags: [a, b]\n").unwrap();
/// assert_eq!(ep.port, 80);
/// assert_eq!(ep.tags, ["a", "b"]);
/// ```
pub trait FromNode: Sized {
    /// True for shapes that accept an absent property (only `Option`).
    const OPTIONAL: bool = false;

    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error>;
}

/// A value that can be constructed through the [`DynamicRegistry`](crate::DynamicRegistry)
/// from a `{type, value}` envelope.
pub trait DynamicShape: Sized {
    /// True for shapes that accept an absent property (only `Option`).
    const OPTIONAL: bool = false;

    fn from_envelope(de: &Deserializer<'_>) -> Result<Self, Error>;
}

/// An enum bound by exact name match against a fixed table.
///
/// Usually implemented with [`enumeration!`](crate::enumeration).
pub trait KeyedEnum: Sized + Clone + 'static {
    const ENUMERATORS: &'static [(&'static str, Self)];
}

/// An enum bound from its underlying integer without validation.
///
/// Usually implemented with [`enumeration!`](crate::enumeration).
pub trait IntegralEnum: Sized {
    type Repr: FromNode;

    fn from_repr(repr: Self::Repr) -> Self;
}

fn scalar_text<'d>(de: &Deserializer<'d>, ty: &'static str) -> Result<&'d str, Error> {
    if let Some(node) = de.node() {
        if !matches!(
            node.tag(),
            ScalarTag::None | ScalarTag::Int | ScalarTag::Float | ScalarTag::Bool
        ) {
            return Err(Error::malformed_scalar(format!(
                "cannot read a {:?}-tagged scalar as {ty}",
                node.tag()
            )));
        }
    }
    de.scalar()
}

macro_rules! signed_integers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromNode for $ty {
                fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
                    let s = scalar_text(de, stringify!($ty))?;
                    parse_int_signed(s, stringify!($ty), de.cfg().legacy_octal_numbers)
                }
            }
        )*
    };
}

macro_rules! unsigned_integers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromNode for $ty {
                fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
                    let s = scalar_text(de, stringify!($ty))?;
                    parse_int_unsigned(s, stringify!($ty), de.cfg().legacy_octal_numbers)
                }
            }
        )*
    };
}

signed_integers!(i8, i16, i32, i64, i128, isize);
unsigned_integers!(u8, u16, u32, u64, u128, usize);

impl FromNode for f32 {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        parse_yaml12_float(scalar_text(de, "f32")?, "f32")
    }
}

impl FromNode for f64 {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        parse_yaml12_float(scalar_text(de, "f64")?, "f64")
    }
}

impl FromNode for bool {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        let s = scalar_text(de, "bool")?;
        if de.cfg().strict_booleans {
            parse_strict_bool(s)
        } else {
            parse_yaml11_bool(s)
        }
    }
}

impl FromNode for char {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        parse_char(de.scalar()?)
    }
}

impl FromNode for String {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        if let Some(node) = de.node() {
            if !node.tag().can_parse_into_string() {
                return Err(Error::malformed_scalar(format!(
                    "cannot read a {:?}-tagged scalar as a string",
                    node.tag()
                )));
            }
        }
        de.scalar().map(str::to_owned)
    }
}

/// Accepts only absent and null nodes.
impl FromNode for () {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        if de.is_null() {
            Ok(())
        } else {
            Err(Error::malformed_scalar("expected null"))
        }
    }
}

impl<T: FromNode> FromNode for Option<T> {
    const OPTIONAL: bool = true;

    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        if de.is_null() {
            Ok(None)
        } else {
            de.resolve().map(Some)
        }
    }
}

impl<T: FromNode> FromNode for Vec<T> {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.elements()?.iter().map(Deserializer::resolve).collect()
    }
}

impl<K: FromNode + Ord, V: FromNode> FromNode for BTreeMap<K, V> {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.entries()?
            .iter()
            .map(|(k, v)| Ok((k.resolve()?, v.resolve()?)))
            .collect()
    }
}

impl<K, V, S> FromNode for HashMap<K, V, S>
where
    K: FromNode + Eq + Hash,
    V: FromNode,
    S: BuildHasher + Default,
{
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.entries()?
            .iter()
            .map(|(k, v)| Ok((k.resolve()?, v.resolve()?)))
            .collect()
    }
}

/// Exclusively owned value.
impl<T: FromNode> FromNode for Box<T> {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.resolve().map(Box::new)
    }
}

/// Shared value: one instance per node and session.
impl<T: FromNode + 'static> FromNode for Rc<T> {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.resolve_shared(|| de.resolve::<T>().map(Rc::new))
    }
}

impl<B: ?Sized + 'static> DynamicShape for Box<B> {
    fn from_envelope(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.construct_dynamic::<B>()
    }
}

impl<B: ?Sized + 'static> DynamicShape for Rc<B> {
    fn from_envelope(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.resolve_shared(|| de.construct_dynamic::<B>().map(Rc::from))
    }
}

impl<T: DynamicShape> DynamicShape for Option<T> {
    const OPTIONAL: bool = true;

    fn from_envelope(de: &Deserializer<'_>) -> Result<Self, Error> {
        if de.is_null() {
            Ok(None)
        } else {
            de.resolve_dynamic().map(Some)
        }
    }
}

impl<T: DynamicShape> DynamicShape for Vec<T> {
    fn from_envelope(de: &Deserializer<'_>) -> Result<Self, Error> {
        de.elements()?
            .iter()
            .map(Deserializer::resolve_dynamic)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_str, from_str_with_options};

    #[derive(Clone, Debug, PartialEq)]
    enum Mode {
        Fast,
        Safe,
    }

    impl KeyedEnum for Mode {
        const ENUMERATORS: &'static [(&'static str, Self)] =
            &[("fast", Mode::Fast), ("safe", Mode::Safe)];
    }

    impl FromNode for Mode {
        fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
            de.as_keyed_enum()
        }
    }

    #[test]
    fn primitives() {
        assert_eq!(from_str::<i64>("-0x10").unwrap(), -16);
        assert_eq!(from_str::<f32>("1.5").unwrap(), 1.5);
        assert!(from_str::<bool>("on").unwrap());
        assert_eq!(from_str::<char>("x").unwrap(), 'x');
        assert_eq!(from_str::<String>("'007'").unwrap(), "007");
        from_str::<()>("~").unwrap();
    }

    #[test]
    fn str_tag_blocks_numbers() {
        assert!(matches!(
            from_str::<i32>("!!str 12"),
            Err(Error::MalformedScalar { .. })
        ));
        assert_eq!(from_str::<String>("!!str 12").unwrap(), "12");
    }

    #[test]
    fn strict_booleans_option() {
        let options = crate::options! { strict_booleans: true };
        assert!(from_str_with_options::<bool>("yes", options).is_err());
    }

    #[test]
    fn malformed_scalar_has_location() {
        let err = from_str::<Vec<u8>>("[1, 2, 300]").unwrap_err();
        assert!(matches!(err, Error::MalformedScalar { .. }));
        assert_eq!(err.location().unwrap().column(), 8);
    }

    #[test]
    fn keyed_enum_is_exact() {
        assert_eq!(from_str::<Vec<Mode>>("[fast, safe]").unwrap(), [Mode::Fast, Mode::Safe]);
        let err = from_str::<Mode>("Fast").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedEnumerator { ref name, .. } if name == "Fast"));
    }

    #[test]
    fn maps_keep_every_entry() {
        let map: BTreeMap<String, u32> = from_str("{b: 2, a: 1}").unwrap();
        let entries: Vec<(String, u32)> = map.into_iter().collect();
        assert_eq!(entries, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        let map: HashMap<u8, Option<bool>> = from_str("{1: true, 2: ~}").unwrap();
        assert_eq!(map[&2], None);
    }

    #[test]
    fn sequence_rejects_scalars() {
        assert!(from_str::<Vec<i32>>("5").is_err());
        assert_eq!(from_str::<Vec<i32>>("[]").unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn option_of_absent_root() {
        assert_eq!(from_str::<Option<i32>>("").unwrap(), None);
        assert!(from_str::<i32>("").is_err());
    }
}
