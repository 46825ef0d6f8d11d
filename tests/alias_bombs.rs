use std::collections::BTreeMap;
use std::rc::Rc;

use indoc::indoc;
use saphyr_binder::{AliasLimits, Deserializer, Error, FromNode, from_str, from_str_with_options};

#[derive(Debug)]
enum Laugh {
    Lol(String),
    Many(Vec<Laugh>),
}

impl Laugh {
    fn count(&self) -> usize {
        match self {
            Laugh::Lol(_) => 1,
            Laugh::Many(inner) => inner.iter().map(Laugh::count).sum(),
        }
    }
}

impl FromNode for Laugh {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        if de.node().is_some_and(|n| n.is_sequence()) {
            Ok(Laugh::Many(de.resolve()?))
        } else {
            Ok(Laugh::Lol(de.resolve()?))
        }
    }
}

/// Each level is a sequence of `fan_out` aliases to the level below.
fn laughs(levels: usize, fan_out: usize) -> String {
    let mut yaml = format!("l0: &l0 [{}]\n", vec!["lol"; fan_out].join(", "));
    for level in 1..levels {
        let below = vec![format!("*l{}", level - 1); fan_out].join(", ");
        yaml.push_str(&format!("l{level}: &l{level} [{below}]\n"));
    }
    yaml
}

#[test]
fn small_alias_fan_out_binds() -> anyhow::Result<()> {
    let laughs: BTreeMap<String, Laugh> = from_str(&laughs(3, 3))?;
    assert_eq!(laughs["l0"].count(), 3);
    assert_eq!(laughs["l2"].count(), 27);
    Ok(())
}

#[test]
fn nested_aliases_hit_the_default_replay_limit() {
    // 54 aliases over 7 anchors stays under the alias/anchor ratio heuristic,
    // but expands to 9^7 leaves.
    let yaml = laughs(7, 9);
    assert!(yaml.len() < 512);
    let err = from_str::<BTreeMap<String, Laugh>>(&yaml).unwrap_err();
    assert!(
        matches!(err, Error::AliasReplayLimitExceeded { .. }),
        "unexpected error: {err}"
    );
    assert!(err.location().is_some());
}

#[test]
fn replay_limit_is_configurable() {
    let tight = saphyr_binder::options! {
        alias_limits: AliasLimits {
            max_total_replayed_nodes: 10,
            ..AliasLimits::default()
        },
    };
    let err =
        from_str_with_options::<BTreeMap<String, Laugh>>(&laughs(3, 3), tight).unwrap_err();
    assert!(err.to_string().starts_with("alias replay limit exceeded"));
}

#[derive(Debug)]
struct Refs {
    base: Rc<Vec<String>>,
    refs: Vec<Rc<Vec<String>>>,
}

impl FromNode for Refs {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        Ok(Refs {
            base: de.get("base")?,
            refs: de.get("refs")?,
        })
    }
}

#[test]
fn shared_nodes_are_not_replayed() -> anyhow::Result<()> {
    // Rc hits the session cache instead of walking the aliased subtree again.
    let tight = saphyr_binder::options! {
        alias_limits: AliasLimits {
            max_total_replayed_nodes: 8,
            ..AliasLimits::default()
        },
    };
    let yaml = indoc! {"
        base: &b [lol, lol, lol, lol, lol, lol, lol, lol, lol]
        refs: [*b, *b, *b, *b, *b, *b, *b, *b]
    "};
    let refs: Refs = from_str_with_options(yaml, tight)?;
    assert_eq!(refs.refs.len(), 8);
    assert!(refs.refs.iter().all(|r| Rc::ptr_eq(r, &refs.base)));
    Ok(())
}
