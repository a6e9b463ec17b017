//! Host-framework collaborators
//!
//! The scan driver and the file resolver never talk to a concrete host. They
//! see a [`Context`] for attribute lookup and variable resolution, and a
//! [`DateMath`](crate::datemath::DateMath) evaluator for relative dates.
//! [`EntityContext`] is the in-process host used by the CLI and the tests.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Matches one `${name}` reference. Lazy so `${a}${b}` yields two matches.
pub(crate) static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(.*?)\}").expect("valid token regex"));

/// Attribute names read by the file-list processor.
pub mod attr {
    pub const FILE_NAME: &str = "fileName";
    pub const BASE_DIR: &str = "baseDir";
    pub const EXCLUDES: &str = "excludes";
    pub const NEWER_THAN: &str = "newerThan";
    pub const OLDER_THAN: &str = "olderThan";
    pub const BIGGER_THAN: &str = "biggerThan";
    pub const SMALLER_THAN: &str = "smallerThan";
    pub const RECURSIVE: &str = "recursive";
}

/// A typed value produced by variable resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    Text(String),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::Text(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// What an entity sees of its host.
pub trait Context {
    /// Raw attribute value as configured, before any substitution.
    fn entity_attribute(&self, name: &str) -> Option<String>;

    /// Expand every `${name}` reference embedded in `text`.
    fn replace_tokens(&self, text: &str) -> String;

    /// Resolve a variable reference to its typed value.
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// Named variables shared by every entity of one configuration.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: BTreeMap<String, Value>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl FromIterator<(String, Value)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// In-process host context: one entity's attributes plus the shared scope.
///
/// Unknown `${name}` references expand to the empty string.
#[derive(Debug, Clone, Default)]
pub struct EntityContext {
    attributes: BTreeMap<String, String>,
    variables: Arc<Variables>,
}

impl EntityContext {
    pub fn new(attributes: BTreeMap<String, String>, variables: Arc<Variables>) -> Self {
        Self {
            attributes,
            variables,
        }
    }

    /// Builder-style attribute setter, handy in tests.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }
}

impl Context for EntityContext {
    fn entity_attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn replace_tokens(&self, text: &str) -> String {
        TOKEN_PATTERN
            .replace_all(text, |caps: &Captures<'_>| {
                self.variables
                    .get(caps[1].trim())
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            })
            .into_owned()
    }

    fn resolve(&self, name: &str) -> Option<Value> {
        self.variables.get(name.trim()).cloned()
    }
}
