use indexmap::IndexMap;
use serde::Serialize;

use crate::util::format_number;

// ── Param schema ────────────────────────────────────────────────

/// The kind of value a positional argument is coerced to.
/// Closed set: adding a kind is a compiler error until the checker handles it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Number,
    Enum { options: Vec<String> },
    Boolean,
}

impl ParamKind {
    pub fn label(&self) -> String {
        match self {
            ParamKind::String => "string".to_string(),
            ParamKind::Number => "number".to_string(),
            ParamKind::Enum { options } => format!("one of {}", options.join("/")),
            ParamKind::Boolean => "boolean".to_string(),
        }
    }
}

/// One positional parameter of a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    /// Used verbatim when an optional argument is omitted. Not checked against `kind`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ArgValue>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    pub fn one_of<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ParamKind::Enum {
                options: options.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn with_default(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }
}

// ── Coerced values ──────────────────────────────────────────────

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl ArgValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ArgValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Text(v) => f.write_str(v),
            ArgValue::Number(v) => f.write_str(&format_number(*v)),
            ArgValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Named argument values in parameter order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ArgValues(IndexMap<String, ArgValue>);

impl ArgValues {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::as_number)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_text)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    /// Get a number param with a default fallback.
    pub fn number_or(&self, name: &str, default: f64) -> f64 {
        self.number(name).unwrap_or(default)
    }

    /// Get a bool param with a default fallback.
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.boolean(name).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
