//! Client selector parsing
//!
//! Selectors are comma separated lists of (possibly dotted) field names taken
//! from the query string, e.g. `?fields=id,title,author.name&embedd=author`.

use super::error::SelectionError;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

/// Validates selector strings against a fixed universe of names
#[derive(Debug, Clone, Default)]
pub struct SelectionParser {
    possible: HashSet<String>,
}

impl SelectionParser {
    /// Create a parser accepting exactly the given names
    pub fn new<I, S>(possible: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            possible: possible.into_iter().map(Into::into).collect(),
        }
    }

    /// Names accepted by this parser
    pub fn possible(&self) -> &HashSet<String> {
        &self.possible
    }

    /// Parse a raw selector
    ///
    /// `None` and the empty string both mean "use the defaults" and yield
    /// `Ok(None)`. Otherwise every element must be known; the error lists
    /// all unknown elements, sorted.
    pub fn parse(&self, raw: Option<&str>) -> Result<Option<HashSet<String>>, SelectionError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }

        let elements: HashSet<String> = raw.split(',').map(str::to_string).collect();
        let unknown: BTreeSet<&String> = elements
            .iter()
            .filter(|name| !self.possible.contains(*name))
            .collect();

        if !unknown.is_empty() {
            return Err(SelectionError::UnknownFields {
                parameter: String::new(),
                names: unknown.into_iter().cloned().collect(),
            });
        }

        Ok(Some(elements))
    }

    /// Parse a selector held in a JSON value
    ///
    /// `null` behaves like an absent selector. Any other non-string value is a
    /// caller bug and is reported as [`SelectionError::NotAString`].
    pub fn parse_value(&self, raw: &Value) -> Result<Option<HashSet<String>>, SelectionError> {
        match raw {
            Value::Null => Ok(None),
            Value::String(s) => self.parse(Some(s)),
            other => Err(SelectionError::NotAString {
                found: json_type_name(other).to_string(),
            }),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A parsed pair of selectors for one request
///
/// `None` on either axis means the fieldset defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub fields: Option<HashSet<String>>,
    pub embed: Option<HashSet<String>>,
}

impl Selection {
    /// Selection that falls back to the defaults on both axes
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Build a selection from name lists, mainly for programmatic callers
    pub fn new<F, E, S, T>(fields: F, embed: E) -> Self
    where
        F: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let fields: HashSet<String> = fields.into_iter().map(Into::into).collect();
        let embed: HashSet<String> = embed.into_iter().map(Into::into).collect();
        Self {
            fields: (!fields.is_empty()).then_some(fields),
            embed: (!embed.is_empty()).then_some(embed),
        }
    }
}
