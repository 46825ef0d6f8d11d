//! Defines the error type and its location handling.
use std::fmt;

use saphyr_parser::ScanError;

use crate::budget::BudgetBreach;
use crate::location::Location;

/// Error raised while loading a document or binding it to Rust values.
///
/// Every error aborts the whole deserialization call it was raised in; nothing is retried
/// and no partially built value is returned.
#[derive(Debug)]
pub enum Error {
    /// A non-optional property is absent from its parent mapping.
    MissingRequiredProperty {
        key: String,
        location: Location,
    },
    /// A leaf node cannot be converted to the requested primitive type.
    MalformedScalar {
        msg: String,
        location: Location,
    },
    /// A keyed enum value does not match any declared enumerator.
    UnrecognizedEnumerator {
        name: String,
        location: Location,
    },
    /// A dynamic construction node lacks a scalar `type` or a `value` field.
    MalformedDynamicEnvelope {
        msg: &'static str,
        location: Location,
    },
    /// A dynamic envelope names a type that is not registered for the requested base.
    TypeNotFound {
        name: String,
        location: Location,
    },
    /// A session dependency was requested but never injected.
    MissingEssential {
        type_name: &'static str,
    },
    /// A node was already bound as a shared value of a different type in this session.
    SharedTypeMismatch {
        expected: &'static str,
        location: Location,
    },
    /// Nesting went deeper than [`crate::Options::max_depth`].
    DepthLimitExceeded {
        limit: usize,
        location: Location,
    },
    /// Binding re-entered aliased nodes more often than [`crate::options::AliasLimits`]
    /// allows.
    AliasReplayLimitExceeded {
        msg: String,
        location: Location,
    },
    /// Free-form error, raised by user deserialization routines and by serde.
    Message {
        msg: String,
        location: Location,
    },
    /// The YAML text could not be parsed.
    Parse {
        msg: String,
        location: Location,
    },
    /// An alias references an anchor that was never defined.
    UnknownAnchor {
        id: usize,
        location: Location,
    },
    /// The input holds more than one YAML document.
    MultipleDocuments {
        location: Location,
    },
    /// A YAML budget limit was exceeded while loading.
    Budget {
        breach: BudgetBreach,
        location: Location,
    },
    /// Unexpected I/O error. This may happen only when loading from a reader.
    IOError {
        cause: std::io::Error,
    },
}

impl Error {
    /// Construct a free-form error, typically from inside a
    /// [`FromNode`](crate::FromNode) implementation.
    pub fn custom<S: fmt::Display>(msg: S) -> Self {
        Error::Message {
            msg: msg.to_string(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn malformed_scalar<S: Into<String>>(msg: S) -> Self {
        Error::MalformedScalar {
            msg: msg.into(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn missing_property(key: &str) -> Self {
        Error::MissingRequiredProperty {
            key: key.to_owned(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn malformed_envelope(msg: &'static str) -> Self {
        Error::MalformedDynamicEnvelope {
            msg,
            location: Location::UNKNOWN,
        }
    }

    /// Attach a location unless the error already carries a known one.
    ///
    /// Errors bubble up through many forked deserializers; the innermost location is the
    /// most precise and must not be overwritten on the way out.
    pub(crate) fn or_location(self, set_location: Location) -> Self {
        match self.location() {
            Some(_) => self,
            None => self.with_location(set_location),
        }
    }

    /// Attach/override a concrete location to this error and return it.
    pub(crate) fn with_location(mut self, set_location: Location) -> Self {
        match &mut self {
            Error::MissingRequiredProperty { location, .. }
            | Error::MalformedScalar { location, .. }
            | Error::UnrecognizedEnumerator { location, .. }
            | Error::MalformedDynamicEnvelope { location, .. }
            | Error::TypeNotFound { location, .. }
            | Error::SharedTypeMismatch { location, .. }
            | Error::DepthLimitExceeded { location, .. }
            | Error::AliasReplayLimitExceeded { location, .. }
            | Error::Message { location, .. }
            | Error::Parse { location, .. }
            | Error::UnknownAnchor { location, .. }
            | Error::MultipleDocuments { location }
            | Error::Budget { location, .. } => {
                *location = set_location;
            }
            // these errors are not tied to a node
            Error::MissingEssential { .. } | Error::IOError { .. } => {}
        }
        self
    }

    /// If the error has a known location, return it.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::MissingRequiredProperty { location, .. }
            | Error::MalformedScalar { location, .. }
            | Error::UnrecognizedEnumerator { location, .. }
            | Error::MalformedDynamicEnvelope { location, .. }
            | Error::TypeNotFound { location, .. }
            | Error::SharedTypeMismatch { location, .. }
            | Error::DepthLimitExceeded { location, .. }
            | Error::AliasReplayLimitExceeded { location, .. }
            | Error::Message { location, .. }
            | Error::Parse { location, .. }
            | Error::UnknownAnchor { location, .. }
            | Error::MultipleDocuments { location }
            | Error::Budget { location, .. } => location.is_known().then_some(*location),
            Error::MissingEssential { .. } | Error::IOError { .. } => None,
        }
    }

    /// Map a `saphyr_parser::ScanError` into our error type with location.
    pub(crate) fn from_scan_error(err: ScanError) -> Self {
        let mark = err.marker();
        Error::Parse {
            msg: err.info().to_owned(),
            location: Location::new(mark.line(), mark.col() + 1),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingRequiredProperty { key, location } => {
                fmt_with_location(f, &format!("required property `{key}` not found"), location)
            }
            Error::MalformedScalar { msg, location } => fmt_with_location(f, msg, location),
            Error::UnrecognizedEnumerator { name, location } => {
                fmt_with_location(f, &format!("unrecognized enumerator `{name}`"), location)
            }
            Error::MalformedDynamicEnvelope { msg, location } => {
                fmt_with_location(f, &format!("malformed dynamic envelope: {msg}"), location)
            }
            Error::TypeNotFound { name, location } => {
                fmt_with_location(f, &format!("dynamic type name `{name}` not found"), location)
            }
            Error::MissingEssential { type_name } => {
                write!(f, "lack of essentials while deserializing: {type_name}")
            }
            Error::SharedTypeMismatch { expected, location } => fmt_with_location(
                f,
                &format!("shared node was already bound to a type other than {expected}"),
                location,
            ),
            Error::DepthLimitExceeded { limit, location } => {
                fmt_with_location(f, &format!("nesting depth limit {limit} exceeded"), location)
            }
            Error::AliasReplayLimitExceeded { msg, location } => {
                fmt_with_location(f, &format!("alias replay limit exceeded: {msg}"), location)
            }
            Error::Message { msg, location } => fmt_with_location(f, msg, location),
            Error::Parse { msg, location } => fmt_with_location(f, msg, location),
            Error::UnknownAnchor { id, location } => {
                fmt_with_location(f, &format!("alias references unknown anchor id {id}"), location)
            }
            Error::MultipleDocuments { location } => fmt_with_location(
                f,
                "multiple YAML documents found where a single one was expected",
                location,
            ),
            Error::Budget { breach, location } => {
                fmt_with_location(f, &format!("YAML budget breached: {breach:?}"), location)
            }
            Error::IOError { cause } => write!(f, "IO error: {cause}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IOError { cause } => Some(cause),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(cause: std::io::Error) -> Self {
        Error::IOError { cause }
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::custom(msg)
    }
}

/// Print a message optionally suffixed with "at line X, column Y".
fn fmt_with_location(f: &mut fmt::Formatter<'_>, msg: &str, location: &Location) -> fmt::Result {
    if location.is_known() {
        write!(f, "{msg} at {location}")
    } else {
        write!(f, "{msg}")
    }
}

/// Convert a budget breach report into a user-facing error.
pub(crate) fn budget_error(breach: BudgetBreach) -> Error {
    Error::Budget {
        breach,
        location: Location::UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_location_wins() {
        let err = Error::missing_property("radius")
            .or_location(Location::new(4, 3))
            .or_location(Location::new(1, 1));
        assert_eq!(err.location(), Some(Location::new(4, 3)));
        assert_eq!(
            err.to_string(),
            "required property `radius` not found at line 4, column 3"
        );
    }

    #[test]
    fn essentials_error_has_no_location() {
        let err =
            Error::MissingEssential { type_name: "Config" }.with_location(Location::new(2, 2));
        assert!(err.location().is_none());
        assert_eq!(err.to_string(), "lack of essentials while deserializing: Config");
    }
}
