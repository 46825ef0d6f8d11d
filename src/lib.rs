//! Type-driven binding of YAML documents to Rust object graphs.
//!
//! The requested Rust type selects how each node is read:
//! - primitives and keyed or integral enums from scalars;
//! - `Option`, `Vec`, maps, `Box` and `Rc` as generic shapes;
//! - user types through [`FromNode`], reading one property at a time.
//!
//! On top of static binding the crate offers:
//! - dynamic construction from `{type: Name, value: ...}` envelopes through a
//!   [`DynamicRegistry`] filled at startup;
//! - shared nodes: every `Rc<T>` requested for the same node (including through YAML
//!   aliases) within one deserialization is the same allocation;
//! - essentials: dependencies injected into a session and available to every nested
//!   binding;
//! - a [`Serde`] bridge for types that derive `serde::Deserialize`.
//!
//! ```rust
//! use std::rc::Rc;
//! use saphyr_binder::{Deserializer, Error, FromNode};
//!
//! struct Material {
//!     name: String,
//! }
//!
//! impl FromNode for Material {
//!     fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
//!         Ok(Material { name: de.get("name")? })
//!     }
//! }
//!
//! struct Scene {
//!     floor: Rc<Material>,
//!     wall: Rc<Material>,
//! }
//!
//! impl FromNode for Scene {
//!     fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
//!         Ok(Scene {
//!             floor: de.get("floor")?,
//!             wall: de.get("wall")?,
//!         })
//!     }
//! }
//!
//! let yaml = "floor: &oak {name: oak}\nwall: *oak\n";
//! let scene: Scene = saphyr_binder::from_str(yaml).unwrap();
//! assert!(Rc::ptr_eq(&scene.floor, &scene.wall));
//! assert_eq!(scene.wall.name, "oak");
//! ```

use std::io::Read;

pub use crate::binder::{Binder, bind};
pub use crate::budget::{
    AliasRatio, Budget, BudgetBreach, BudgetEnforcer, BudgetReport, check_yaml_budget,
};
pub use crate::de::Deserializer;
pub use crate::document::{Document, Node, NodeId, NodeKind};
pub use crate::error::Error;
pub use crate::location::Location;
pub use crate::options::{AliasLimits, Options};
pub use crate::registry::{DynamicRegistry, ErasedValue, global_registry, install_registry};
pub use crate::serde_bridge::Serde;
pub use crate::shape::{DynamicShape, FromNode, IntegralEnum, KeyedEnum};
pub use crate::tags::ScalarTag;

mod binder;
pub mod budget;
mod de;
mod document;
mod error;
mod loader;
mod location;
mod macros;
pub mod options;
mod parse_scalars;
mod registry;
mod serde_bridge;
mod session;
mod shape;
mod tags;

/// Bind a single YAML document to `T`.
///
/// ```rust
/// let ports: Vec<u16> = saphyr_binder::from_str("[80, 443]").unwrap();
/// assert_eq!(ports, [80, 443]);
/// ```
pub fn from_str<T: FromNode>(input: &str) -> Result<T, Error> {
    from_str_with_options(input, Options::default())
}

/// Bind a single YAML document to `T` with configurable [`Options`].
pub fn from_str_with_options<T: FromNode>(input: &str, options: Options) -> Result<T, Error> {
    let doc = Document::parse(input, &options)?;
    Deserializer::with_options(&doc, &options).resolve()
}

/// Dynamically construct `T` from a document whose root is a `{type, value}` envelope.
///
/// Names are looked up in the process-wide registry (see [`install_registry`]).
pub fn from_str_dynamic<T: DynamicShape>(input: &str) -> Result<T, Error> {
    from_str_dynamic_with_options(input, Options::default())
}

/// Dynamically construct `T` with configurable [`Options`], including a session registry.
pub fn from_str_dynamic_with_options<T: DynamicShape>(
    input: &str,
    options: Options,
) -> Result<T, Error> {
    let doc = Document::parse(input, &options)?;
    Deserializer::with_options(&doc, &options).resolve_dynamic()
}

/// Read a single YAML document from a byte stream and bind it to `T`.
///
/// UTF-8 and BOM-marked UTF-16 input are accepted.
///
/// ```rust
/// let bytes: &[u8] = b"answer: 42\n";
/// let map: std::collections::BTreeMap<String, i32> = saphyr_binder::from_reader(bytes).unwrap();
/// assert_eq!(map["answer"], 42);
/// ```
pub fn from_reader<R: Read, T: FromNode>(reader: R) -> Result<T, Error> {
    from_reader_with_options(reader, Options::default())
}

/// Read a single YAML document from a byte stream with configurable [`Options`].
pub fn from_reader_with_options<R: Read, T: FromNode>(
    reader: R,
    options: Options,
) -> Result<T, Error> {
    let doc = Document::from_reader(reader, &options)?;
    Deserializer::with_options(&doc, &options).resolve()
}
