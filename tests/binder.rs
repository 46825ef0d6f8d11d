use indoc::indoc;
use saphyr_binder::{Deserializer, Error, FromNode, bind, from_str};

#[derive(Debug, Default, PartialEq)]
struct Vec3 {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug)]
struct ChainedVec3(Vec3);

impl FromNode for ChainedVec3 {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        let chain = bind(de, Vec3::default()).set("x", |v| &mut v.x)?;
        assert_eq!(chain.object().x, 0.1);

        let chain = chain.set("y", |v| &mut v.y)?;
        assert_eq!(chain.object().y, 2.0);

        let chain = chain.set("z", |v| &mut v.z)?;
        assert_eq!(chain.object().z, -0.05);

        Ok(ChainedVec3(chain.finish()))
    }
}

#[test]
fn chain_set() {
    let yaml = indoc! {"
        x: 0.1
        y: 2
        z: -0.05
    "};
    let ChainedVec3(output) = from_str(yaml).unwrap();
    assert_eq!(output, Vec3 { x: 0.1, y: 2.0, z: -0.05 });
}

#[derive(Debug)]
struct Bounded(Vec3);

impl FromNode for Bounded {
    fn from_node(de: &Deserializer<'_>) -> Result<Self, Error> {
        let v = bind(de, Vec3 { x: 1.0, y: 1.0, z: 1.0 })
            .set_if("x", |v| &mut v.x)?
            .set_if("y", |v| &mut v.y)?
            .set_if("z", |v| &mut v.z)?
            .validate(|v| {
                if v.x.abs() > 10.0 {
                    Err(Error::custom("x out of range"))
                } else {
                    Ok(())
                }
            })?
            .finish();
        Ok(Bounded(v))
    }
}

#[test]
fn set_if_keeps_preset_values() {
    let Bounded(v) = from_str("{y: 5, z: ~}").unwrap();
    assert_eq!(v, Vec3 { x: 1.0, y: 5.0, z: 1.0 });
}

#[test]
fn validation_failure_has_location() {
    let err = from_str::<Bounded>("\n{x: 11}").unwrap_err();
    assert_eq!(err.to_string(), "x out of range at line 2, column 1");
}

#[test]
fn set_requires_the_property() {
    let err = from_str::<ChainedVec3>("{x: 0.1, z: 3}").unwrap_err();
    assert!(matches!(err, Error::MissingRequiredProperty { ref key, .. } if key == "y"));
}
