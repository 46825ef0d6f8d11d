//! Fluent helper for filling an existing object property by property.

use crate::de::Deserializer;
use crate::shape::FromNode;
use crate::Error;

/// Start binding properties of the current node into `object`.
///
/// ```rust
/// use saphyr_binder::{bind, Deserializer, Error, FromNode};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Vec3 {
///     x: f64,
///     y: f64,
///     z: f64,
/// }
///
/// impl FromNode for Vec3 {
///     fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
///         Ok(bind(de, Vec3::default())
///             .set("x", |v| &mut v.x)?
///             .set("y", |v| &mut v.y)?
///             .set_if("z", |v| &mut v.z)?
///             .finish())
///     }
/// }
///
/// let v: Vec3 = saphyr_binder::from_str("{x: 1, y: 2}").unwrap();
/// assert_eq!(v, Vec3 { x: 1.0, y: 2.0, z: 0.0 });
/// ```
pub fn bind<'a, 'd, T>(de: &'a Deserializer<'d>, object: T) -> Binder<'a, 'd, T> {
    Binder { de, object }
}

/// Object under construction together with the node it is read from.
#[derive(Debug)]
pub struct Binder<'a, 'd, T> {
    de: &'a Deserializer<'d>,
    object: T,
}

impl<T> Binder<'_, '_, T> {
    /// Assign the required property `key` to the field selected by `field`.
    pub fn set<P: FromNode>(
        mut self,
        key: &str,
        field: impl FnOnce(&mut T) -> &mut P,
    ) -> Result<Self, Error> {
        *field(&mut self.object) = self.de.get(key)?;
        Ok(self)
    }

    /// Assign the property `key` if it is present and not null; keep the field otherwise.
    pub fn set_if<P: FromNode>(
        mut self,
        key: &str,
        field: impl FnOnce(&mut T) -> &mut P,
    ) -> Result<Self, Error> {
        if let Some(value) = self.de.get_optional(key)? {
            *field(&mut self.object) = value;
        }
        Ok(self)
    }

    /// Run `check` against the partially built object.
    pub fn validate(self, check: impl FnOnce(&T) -> Result<(), Error>) -> Result<Self, Error> {
        check(&self.object).map_err(|e| e.or_location(self.de.location()))?;
        Ok(self)
    }

    pub fn object(&self) -> &T {
        &self.object
    }

    pub fn finish(self) -> T {
        self.object
    }
}
