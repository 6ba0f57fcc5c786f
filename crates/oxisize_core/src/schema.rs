//! Validation of evaluated fixture metadata.
//!
//! The accepted shape is `{ name: string, threshold: number | null }`: both
//! keys required, no other keys allowed. Every violated constraint is
//! reported, not just the first one. A property whose value is `undefined`
//! counts as missing but is still an additional property.

use log::trace;
use std::fmt;

use crate::{evaluate::StaticValue, types::FixtureMetadata};

const REQUIRED_PROPERTIES: &[&str] = &["name", "threshold"];

/// A single violated schema constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending value, empty for the root object
    pub instance_path: String,
    pub message: String,
}

impl Violation {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { instance_path: instance_path.into(), message: message.into() }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} {}", self.instance_path, self.message)
        }
    }
}

pub fn validate_metadata(value: &StaticValue) -> Result<FixtureMetadata, Vec<Violation>> {
    if !matches!(value, StaticValue::Object(_)) {
        return Err(vec![Violation::new("", "must be object")]);
    }

    let mut violations = Vec::new();

    for key in REQUIRED_PROPERTIES {
        if value.property(key).is_none() {
            violations.push(Violation::new("", format!("must have required property '{}'", key)));
        }
    }

    let name = match value.property("name") {
        Some(StaticValue::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(Violation::new("/name", "must be string"));
            None
        }
        None => None,
    };

    let threshold = match value.property("threshold") {
        Some(StaticValue::Null) => Some(None),
        Some(StaticValue::Number(n)) => Some(Some(*n)),
        Some(_) => {
            violations.push(Violation::new("/threshold", "must be number,null"));
            None
        }
        None => None,
    };

    for key in value.keys() {
        if !REQUIRED_PROPERTIES.contains(&key) {
            violations.push(Violation::new("", format!("must NOT have additional property '{}'", key)));
        }
    }

    match (name, threshold) {
        (Some(name), Some(threshold)) if violations.is_empty() => {
            trace!("Metadata is valid: name={:?}, threshold={:?}", name, threshold);
            Ok(FixtureMetadata { name, threshold })
        }
        _ => Err(violations),
    }
}
