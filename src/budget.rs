//! Resource limits applied while a document is folded into the node arena.
//!
//! The loader feeds every raw parser event to a [`BudgetEnforcer`] before acting on it, so
//! pathological inputs (huge alias fan-out, runaway nesting, giant scalars) are rejected
//! before they are materialized. [`check_yaml_budget`] runs the same checks without
//! building anything.

use std::collections::HashSet;

use nohash_hasher::BuildNoHashHasher;
use saphyr_parser::{Event, Parser, ScanError};

/// Limits for loading one YAML document.
///
/// ```rust
/// let options = saphyr_binder::options! {
///     budget: Some(saphyr_binder::budget! {
///         max_depth: 16,
///     }),
/// };
/// let answer: u32 = saphyr_binder::from_str_with_options("42", options).unwrap();
/// assert_eq!(answer, 42);
/// ```
#[derive(Clone, Debug)]
pub struct Budget {
    /// Raw parser events, stream and document markers included. Default: 1,000,000
    pub max_events: usize,
    /// Arena nodes (scalars, sequences and mappings). Aliases add none. Default: 250,000
    pub max_nodes: usize,
    /// Open sequences and mappings at any point. Default: 2,000
    pub max_depth: usize,
    /// Alias (`*name`) occurrences. Default: 50,000
    pub max_aliases: usize,
    /// Distinct anchors (`&name`). Default: 50,000
    pub max_anchors: usize,
    /// Sum of scalar text lengths in bytes. Default: 64 MiB
    pub max_scalar_bytes: usize,
    /// Rejects documents that alias far more often than they anchor. `None` disables the
    /// check.
    pub alias_ratio: Option<AliasRatio>,
}

/// Alias/anchor ratio heuristic, evaluated once the whole document was seen.
///
/// A breach occurs when there are at least `min_aliases` aliases and more than
/// `multiplier` aliases per anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AliasRatio {
    pub min_aliases: usize,
    pub multiplier: usize,
}

impl Default for AliasRatio {
    fn default() -> Self {
        Self {
            min_aliases: 100,
            multiplier: 10,
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_events: 1_000_000,
            max_nodes: 250_000,
            max_depth: 2_000,
            max_aliases: 50_000,
            max_anchors: 50_000,
            max_scalar_bytes: 64 * 1024 * 1024,
            alias_ratio: Some(AliasRatio::default()),
        }
    }
}

/// The limit that was exceeded, with the count that exceeded it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BudgetBreach {
    Events { events: usize },
    Nodes { nodes: usize },
    Depth { depth: usize },
    Aliases { aliases: usize },
    Anchors { anchors: usize },
    ScalarBytes { bytes: usize },
    AliasRatio { aliases: usize, anchors: usize },
    /// A sequence or mapping end without a matching start.
    Unbalanced,
}

/// Counters gathered while observing a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BudgetReport {
    /// `Some(..)` if a limit was exceeded.
    pub breached: Option<BudgetBreach>,
    pub events: usize,
    pub nodes: usize,
    /// Deepest nesting reached.
    pub depth: usize,
    pub aliases: usize,
    pub anchors: usize,
    pub scalar_bytes: usize,
}

/// Applies a [`Budget`] to a stream of parser events.
#[derive(Debug)]
pub struct BudgetEnforcer {
    budget: Budget,
    report: BudgetReport,
    open: usize,
    anchors: HashSet<usize, BuildNoHashHasher<usize>>,
}

/// Fail with `breach(count)` when `count` exceeds `limit`.
fn within(
    count: usize,
    limit: usize,
    breach: impl FnOnce(usize) -> BudgetBreach,
) -> Result<(), BudgetBreach> {
    if count > limit {
        Err(breach(count))
    } else {
        Ok(())
    }
}

impl BudgetEnforcer {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            report: BudgetReport::default(),
            open: 0,
            anchors: HashSet::with_hasher(BuildNoHashHasher::default()),
        }
    }

    /// Account for one event. Fails as soon as a limit is exceeded.
    pub fn observe(&mut self, event: &Event) -> Result<(), BudgetBreach> {
        let r = &mut self.report;
        r.events += 1;
        within(r.events, self.budget.max_events, |events| {
            BudgetBreach::Events { events }
        })?;

        let anchor = match event {
            Event::Alias(_) => {
                r.aliases += 1;
                return within(r.aliases, self.budget.max_aliases, |aliases| {
                    BudgetBreach::Aliases { aliases }
                });
            }
            Event::SequenceEnd | Event::MappingEnd => {
                self.open = self.open.checked_sub(1).ok_or(BudgetBreach::Unbalanced)?;
                return Ok(());
            }
            Event::Scalar(value, _, anchor, _) => {
                r.scalar_bytes = r.scalar_bytes.saturating_add(value.len());
                within(r.scalar_bytes, self.budget.max_scalar_bytes, |bytes| {
                    BudgetBreach::ScalarBytes { bytes }
                })?;
                *anchor
            }
            Event::SequenceStart(anchor, _) | Event::MappingStart(anchor, _) => {
                self.open += 1;
                r.depth = r.depth.max(self.open);
                within(r.depth, self.budget.max_depth, |depth| BudgetBreach::Depth { depth })?;
                *anchor
            }
            _ => return Ok(()),
        };

        r.nodes += 1;
        within(r.nodes, self.budget.max_nodes, |nodes| BudgetBreach::Nodes { nodes })?;
        if anchor != 0 && self.anchors.insert(anchor) {
            r.anchors = self.anchors.len();
            within(r.anchors, self.budget.max_anchors, |anchors| {
                BudgetBreach::Anchors { anchors }
            })?;
        }
        Ok(())
    }

    /// Counters so far, without the end-of-document checks.
    pub fn into_report(self) -> BudgetReport {
        self.report
    }

    /// Counters after the end-of-document checks (the alias ratio).
    pub fn finalize(mut self) -> BudgetReport {
        let BudgetReport {
            aliases, anchors, ..
        } = self.report;
        if let Some(ratio) = self.budget.alias_ratio {
            if aliases >= ratio.min_aliases
                && (anchors == 0 || aliases > ratio.multiplier.saturating_mul(anchors))
            {
                self.report.breached = Some(BudgetBreach::AliasRatio { aliases, anchors });
            }
        }
        self.report
    }
}

/// Run the budget over `input` without building any nodes.
///
/// `report.breached.is_some()` means the input would be rejected by the loader. Syntax
/// errors are returned as `Err`.
pub fn check_yaml_budget(input: &str, budget: &Budget) -> Result<BudgetReport, ScanError> {
    let mut parser = Parser::new_from_str(input);
    let mut enforcer = BudgetEnforcer::new(budget.clone());

    while let Some(item) = parser.next() {
        let (event, _span) = item?;
        if let Err(breach) = enforcer.observe(&event) {
            let mut report = enforcer.into_report();
            report.breached = Some(breach);
            return Ok(report);
        }
    }

    Ok(enforcer.finalize())
}
