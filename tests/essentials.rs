use std::cell::RefCell;
use std::rc::Rc;

use indoc::indoc;
use saphyr_binder::{Deserializer, Document, Error, FromNode, Options};

/// Collects asset paths seen while loading.
#[derive(Default)]
struct AssetIndex {
    paths: RefCell<Vec<String>>,
}

#[derive(Debug)]
struct Asset {
    path: String,
}

impl FromNode for Asset {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        let path: String = de.get("path")?;
        de.get_essential::<AssetIndex>()?
            .paths
            .borrow_mut()
            .push(path.clone());
        Ok(Asset { path })
    }
}

#[derive(Debug)]
struct Level {
    assets: Vec<Asset>,
}

impl FromNode for Level {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        Ok(Level {
            assets: de.get("assets")?,
        })
    }
}

const LEVEL: &str = indoc! {"
    assets:
      - path: a.png
      - path: b.ogg
"};

#[test]
fn nested_bindings_see_the_injected_dependency() {
    let doc = Document::parse(LEVEL, &Options::default()).unwrap();
    let de = Deserializer::new(&doc);
    let index = de.emplace_essential(AssetIndex::default());

    let level: Level = de.resolve().unwrap();
    assert_eq!(level.assets.len(), 2);
    assert_eq!(level.assets[1].path, "b.ogg");
    assert_eq!(*index.paths.borrow(), ["a.png", "b.ogg"]);
    assert!(Rc::ptr_eq(&index, &de.get_essential::<AssetIndex>().unwrap()));
}

#[test]
fn missing_essential_aborts() {
    let doc = Document::parse(LEVEL, &Options::default()).unwrap();
    let err = Deserializer::new(&doc).resolve::<Level>().unwrap_err();
    match err {
        Error::MissingEssential { type_name } => assert!(type_name.ends_with("AssetIndex")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn essentials_are_typed_by_rust_type() {
    let doc = Document::parse("~", &Options::default()).unwrap();
    let de = Deserializer::new(&doc);
    de.emplace_essential(7u32);
    de.emplace_essential(String::from("seven"));
    de.emplace_essential(8u32);
    assert_eq!(*de.get_essential::<u32>().unwrap(), 8);
    assert_eq!(*de.get_essential::<String>().unwrap(), "seven");
    assert!(de.get_essential::<u64>().is_err());
}
