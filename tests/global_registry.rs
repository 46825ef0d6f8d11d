use std::rc::Rc;

use saphyr_binder::{
    Deserializer, DynamicRegistry, Error, FromNode, from_str_dynamic, global_registry,
    install_registry,
};

trait Codec: std::fmt::Debug {
    fn encode(&self, input: &str) -> String;
}

#[derive(Debug)]
struct Upper;

impl Codec for Upper {
    fn encode(&self, input: &str) -> String {
        input.to_uppercase()
    }
}

impl FromNode for Upper {
    fn from_node(_de: &Deserializer<'_>) -> Result<Self, Error> {
        Ok(Upper)
    }
}

#[derive(Debug)]
struct Repeat {
    times: usize,
}

impl Codec for Repeat {
    fn encode(&self, input: &str) -> String {
        input.repeat(self.times)
    }
}

impl FromNode for Repeat {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        Ok(Repeat {
            times: de.get_or("times", 2)?,
        })
    }
}

// One test only: the process-wide registry can be installed once per test binary.
#[test]
fn install_once_then_construct() {
    let mut registry = DynamicRegistry::new();
    saphyr_binder::register_dynamic!(registry, dyn Codec {
        "Upper" => Upper,
        "Repeat" => Repeat,
    });
    assert!(install_registry(registry).is_ok());
    assert!(global_registry().is_some_and(|r| r.contains::<dyn Codec>("Repeat")));

    let rejected = install_registry(DynamicRegistry::new()).unwrap_err();
    assert!(rejected.is_empty());

    let codec: Box<dyn Codec> = from_str_dynamic("{type: Repeat, value: {times: 3}}").unwrap();
    assert_eq!(codec.encode("ab"), "ababab");

    let codecs: Vec<Rc<dyn Codec>> =
        from_str_dynamic("[{type: Upper, value: ~}, {type: Repeat, value: {}}]").unwrap();
    let outputs: Vec<_> = codecs.iter().map(|c| c.encode("x")).collect();
    assert_eq!(outputs, ["X", "xx"]);

    let err = from_str_dynamic::<Box<dyn Codec>>("{type: Lower, value: ~}").unwrap_err();
    assert!(matches!(err, Error::TypeNotFound { ref name, .. } if name == "Lower"));
}
