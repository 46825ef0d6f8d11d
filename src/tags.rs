//! Recognition of the YAML core-schema tags that change how a scalar is read.

use saphyr_parser::ScalarStyle;

/// Tag classification attached to every scalar node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScalarTag {
    /// No tag, or a tag this crate does not interpret.
    #[default]
    None,
    /// `!!str`: the scalar is text even if it looks like a number or null.
    Str,
    /// `!!null`
    Null,
    /// `!!bool`
    Bool,
    /// `!!int`
    Int,
    /// `!!float`
    Float,
}

impl ScalarTag {
    /// Classify a tag as rendered by the parser (`!!int`, `tag:yaml.org,2002:int`, ...).
    pub(crate) fn from_tag_text(tag: &str) -> Self {
        let suffix = tag
            .strip_prefix("tag:yaml.org,2002:")
            .or_else(|| tag.strip_prefix("!!"))
            .or_else(|| tag.strip_prefix('!'))
            .unwrap_or(tag);
        match suffix.trim_start_matches('!') {
            "str" => ScalarTag::Str,
            "null" => ScalarTag::Null,
            "bool" => ScalarTag::Bool,
            "int" => ScalarTag::Int,
            "float" => ScalarTag::Float,
            _ => ScalarTag::None,
        }
    }

    /// True if a scalar with this tag may be read as a string.
    pub(crate) fn can_parse_into_string(self) -> bool {
        matches!(self, ScalarTag::None | ScalarTag::Str)
    }
}

/// YAML 1.2 core-schema null: `~`, `null` variants, or an empty plain scalar.
///
/// Quoted scalars are never null unless tagged `!!null`.
pub(crate) fn scalar_is_null(value: &str, style: ScalarStyle, tag: ScalarTag) -> bool {
    match tag {
        ScalarTag::Null => true,
        ScalarTag::Str => false,
        _ => {
            matches!(style, ScalarStyle::Plain)
                && matches!(value, "" | "~" | "null" | "Null" | "NULL")
        }
    }
}
