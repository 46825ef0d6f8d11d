use std::fmt;
use std::sync::Arc;

use crate::budget::Budget;
use crate::registry::DynamicRegistry;

/// Limits on re-entering nodes that are reachable more than once, which guard against
/// alias bombs.
///
/// The arena stores an aliased subtree once, but binding it as an owned value walks it
/// again at every alias. Each node entered for the second time or later counts as one
/// replayed node. `Rc` shapes bound from the same node hit the session cache, so sharing
/// keeps the count low.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AliasLimits {
    /// Maximum number of replayed nodes across the whole deserialization. Default: 1,000,000
    pub max_total_replayed_nodes: usize,
    /// Maximum number of times a single node may be entered.
    /// Use `usize::MAX` for "unlimited" (the default).
    pub max_visits_per_node: usize,
}

impl Default for AliasLimits {
    fn default() -> Self {
        Self {
            max_total_replayed_nodes: 1_000_000,
            max_visits_per_node: usize::MAX,
        }
    }
}

/// Loader and binder configuration.
///
/// ```rust
/// use saphyr_binder::{from_str_with_options, Options};
///
/// let options = saphyr_binder::options! {
///     strict_booleans: true,
///     max_depth: 32,
/// };
///
/// let flags: Vec<bool> = from_str_with_options("[true, false]", options.clone()).unwrap();
/// assert_eq!(flags, vec![true, false]);
/// assert!(from_str_with_options::<Vec<bool>>("[yes, no]", options).is_err());
/// ```
#[derive(Clone)]
pub struct Options {
    /// Optional YAML budget enforced while the document is loaded.
    pub budget: Option<Budget>,
    /// Maximum nesting of forked deserializers (one level per nested value).
    ///
    /// Documents nested deeper fail with [`Error::DepthLimitExceeded`](crate::Error)
    /// instead of exhausting the call stack. Default: 256.
    pub max_depth: usize,
    /// Limits on replaying aliased subtrees while binding.
    pub alias_limits: AliasLimits,
    /// If true, interpret only the exact literals `true` and `false` as booleans.
    /// YAML 1.1 forms like `yes`/`no`/`on`/`off` are rejected. Default: false.
    pub strict_booleans: bool,
    /// Enable legacy octal parsing where values starting with `00` are treated as base-8.
    /// They are deprecated in YAML 1.2. Default: false.
    pub legacy_octal_numbers: bool,
    /// Maximum number of decoded bytes accepted by [`crate::from_reader`]. Default: 256 MiB.
    pub input_cap: Option<usize>,
    /// Registry used for dynamic construction. When `None`, the process-wide registry
    /// installed with [`crate::install_registry`] is used.
    pub registry: Option<Arc<DynamicRegistry>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            budget: Some(Budget::default()),
            max_depth: 256,
            alias_limits: AliasLimits::default(),
            strict_booleans: false,
            legacy_octal_numbers: false,
            input_cap: Some(256 * 1024 * 1024),
            registry: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("budget", &self.budget)
            .field("max_depth", &self.max_depth)
            .field("alias_limits", &self.alias_limits)
            .field("strict_booleans", &self.strict_booleans)
            .field("legacy_octal_numbers", &self.legacy_octal_numbers)
            .field("input_cap", &self.input_cap)
            .field("registry", &if self.registry.is_some() { "set" } else { "global" })
            .finish()
    }
}

/// The part of [`Options`] the binder consults while resolving nodes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cfg {
    pub(crate) max_depth: usize,
    pub(crate) alias_limits: AliasLimits,
    pub(crate) strict_booleans: bool,
    pub(crate) legacy_octal_numbers: bool,
}

impl Cfg {
    pub(crate) fn from_options(options: &Options) -> Self {
        Self {
            max_depth: options.max_depth,
            alias_limits: options.alias_limits,
            strict_booleans: options.strict_booleans,
            legacy_octal_numbers: options.legacy_octal_numbers,
        }
    }
}
