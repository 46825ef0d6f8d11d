//! Bridge to `serde`: bind any `DeserializeOwned` type from a node.
//!
//! Wrap the target in [`Serde`] to read it with serde's derive instead of a hand-written
//! [`FromNode`] impl. The bridge walks the already loaded node arena, so aliases, the depth
//! limit and error locations behave as for native bindings.

use std::vec;

use saphyr_parser::ScalarStyle;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer as _, IntoDeserializer, Visitor,
};

use crate::de::Deserializer;
use crate::document::NodeKind;
use crate::parse_scalars::{
    parse_int_signed, parse_int_unsigned, parse_strict_bool, parse_yaml12_float,
};
use crate::shape::FromNode;
use crate::tags::ScalarTag;
use crate::Error;

/// Binds `T` through its `serde::Deserialize` implementation.
///
/// ```rust
/// use saphyr_binder::{Deserializer, Error, FromNode, Serde};
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Debug, PartialEq)]
/// struct Limits {
///     cpu: f32,
///     memory: Option<u64>,
/// }
///
/// struct Job {
///     name: String,
///     limits: Limits,
/// }
///
/// impl FromNode for Job {
///     fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
///         Ok(Job {
///             name: de.get("name")?,
///             limits: de.get::<Serde<Limits>>("limits")?.0,
///         })
///     }
/// }
///
/// let job: Job = saphyr_binder::from_str("name: build\nlimits: {cpu: 1.5}\n").unwrap();
/// assert_eq!(job.limits, Limits { cpu: 1.5, memory: None });
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Serde<T>(pub T);

impl<T> Serde<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> FromNode for Serde<T> {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        T::deserialize(NodeDeserializer { de: de.clone() }).map(Serde)
    }
}

/// `serde::Deserializer` over one node.
struct NodeDeserializer<'d> {
    de: Deserializer<'d>,
}

/// Plain scalars with no tag are typed by their text: null, bool, integer, float or string.
fn visit_plain<'de, V: Visitor<'de>>(
    value: &str,
    legacy_octal: bool,
    visitor: V,
) -> Result<V::Value, Error> {
    if let Ok(b) = parse_strict_bool(value) {
        return visitor.visit_bool(b);
    }
    if let Ok(u) = parse_int_unsigned::<u64>(value, "u64", legacy_octal) {
        return visitor.visit_u64(u);
    }
    if let Ok(i) = parse_int_signed::<i64>(value, "i64", legacy_octal) {
        return visitor.visit_i64(i);
    }
    if looks_like_float(value) {
        if let Ok(f) = parse_yaml12_float::<f64>(value, "f64") {
            return visitor.visit_f64(f);
        }
    }
    visitor.visit_str(value)
}

/// Rust also parses `inf` and `nan`; YAML only knows the dotted spellings.
fn looks_like_float(value: &str) -> bool {
    let body = value.trim_start_matches(['+', '-']);
    (body.starts_with('.') && body.len() > 1) || body.starts_with(|c: char| c.is_ascii_digit())
}

macro_rules! forward_to_from_node {
    ($de:lifetime; $($method:ident => $ty:ty, $visit:ident;)*) => {
        $(
            fn $method<V: Visitor<$de>>(self, visitor: V) -> Result<V::Value, Error> {
                visitor.$visit(self.de.resolve::<$ty>()?)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for NodeDeserializer<'_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let Some(node) = self.de.node() else {
            return visitor.visit_unit();
        };
        match node.kind() {
            NodeKind::Sequence(_) => self.deserialize_seq(visitor),
            NodeKind::Mapping(_) => self.deserialize_map(visitor),
            NodeKind::Scalar { .. } if node.is_null() => visitor.visit_unit(),
            NodeKind::Scalar { value, style, tag } => match tag {
                ScalarTag::Bool => visitor.visit_bool(self.de.resolve()?),
                ScalarTag::Int => visitor.visit_i64(self.de.resolve()?),
                ScalarTag::Float => visitor.visit_f64(self.de.resolve()?),
                ScalarTag::Str | ScalarTag::Null => visitor.visit_str(value),
                ScalarTag::None if !matches!(style, ScalarStyle::Plain) => visitor.visit_str(value),
                ScalarTag::None => {
                    visit_plain(value, self.de.cfg().legacy_octal_numbers, visitor)
                }
            },
        }
    }

    forward_to_from_node! {
        'de;
        deserialize_bool => bool, visit_bool;
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_i128 => i128, visit_i128;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_u128 => u128, visit_u128;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
        deserialize_char => char, visit_char;
        deserialize_string => String, visit_string;
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    /// A scalar is taken as its UTF-8 bytes; a sequence as a list of byte values.
    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.de.node() {
            Some(node) if node.is_sequence() => {
                visitor.visit_byte_buf(self.de.resolve::<Vec<u8>>()?)
            }
            _ => visitor.visit_bytes(self.de.scalar()?.as_bytes()),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if self.de.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.de.resolve::<()>()?;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_seq(NodeSeq {
            items: self.de.elements()?.into_iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_map(NodeMap {
            entries: self.de.entries()?.into_iter(),
            value: None,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_map(visitor)
    }

    /// Externally tagged: `Variant` or `{Variant: value}`.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.de.node() {
            Some(node) if node.is_scalar() && !node.is_null() => visitor.visit_enum(NodeEnum {
                variant: self.de.scalar()?,
                value: None,
            }),
            Some(node) if node.is_mapping() && node.len() == 1 => {
                let Some((key, value)) = self.de.entries()?.pop() else {
                    return Err(Error::custom("expected a single-entry mapping"));
                };
                visitor.visit_enum(NodeEnum {
                    variant: key.scalar()?,
                    value: Some(value),
                })
            }
            _ => Err(Error::custom(
                "externally tagged enum expected a scalar or a single-entry mapping",
            )),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }
}

struct NodeSeq<'d> {
    items: vec::IntoIter<Deserializer<'d>>,
}

impl<'de> de::SeqAccess<'de> for NodeSeq<'_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Error>
    where
        T: DeserializeSeed<'de>,
    {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let location = item.location();
        seed.deserialize(NodeDeserializer { de: item })
            .map(Some)
            .map_err(|e| e.or_location(location))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct NodeMap<'d> {
    entries: vec::IntoIter<(Deserializer<'d>, Deserializer<'d>)>,
    value: Option<Deserializer<'d>>,
}

impl<'de> de::MapAccess<'de> for NodeMap<'_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Error>
    where
        K: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        let location = key.location();
        self.value = Some(value);
        seed.deserialize(NodeDeserializer { de: key })
            .map(Some)
            .map_err(|e| e.or_location(location))
    }

    fn next_value_seed<T>(&mut self, seed: T) -> Result<T::Value, Error>
    where
        T: DeserializeSeed<'de>,
    {
        let value = self
            .value
            .take()
            .ok_or_else(|| Error::custom("map value requested before its key"))?;
        let location = value.location();
        seed.deserialize(NodeDeserializer { de: value })
            .map_err(|e| e.or_location(location))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct NodeEnum<'d> {
    variant: &'d str,
    value: Option<Deserializer<'d>>,
}

impl<'de, 'd> de::EnumAccess<'de> for NodeEnum<'d> {
    type Error = Error;
    type Variant = NodeVariant<'d>;

    fn variant_seed<S>(self, seed: S) -> Result<(S::Value, Self::Variant), Error>
    where
        S: DeserializeSeed<'de>,
    {
        let name: de::value::StrDeserializer<'_, Error> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, NodeVariant { value: self.value }))
    }
}

struct NodeVariant<'d> {
    value: Option<Deserializer<'d>>,
}

impl<'d> NodeVariant<'d> {
    fn payload(self) -> Result<NodeDeserializer<'d>, Error> {
        self.value
            .map(|de| NodeDeserializer { de })
            .ok_or_else(|| Error::custom("enum variant expects a value"))
    }
}

impl<'de> de::VariantAccess<'de> for NodeVariant<'_> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        match self.value {
            Some(value) if !value.is_null() => Err(Error::custom("unit variant takes no value")
                .with_location(value.location())),
            _ => Ok(()),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.payload()?)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.payload()?.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.payload()?.deserialize_map(visitor)
    }
}
