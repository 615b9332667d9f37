//! In-memory representation of decoded Transit values.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A namespaced keyword such as `:workflow/status`.
///
/// Keywords compare by their full name, so two keywords decoded from
/// different places in a payload are interchangeable as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keyword(String);

impl Keyword {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Full name including the namespace, e.g. `workflow/status`.
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once('/').map(|(namespace, _)| namespace)
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// A namespaced symbol such as `run/cancel`. Used to name RPC commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded Transit value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Keyword(Keyword),
    Symbol(Symbol),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// Plain JSON array.
    Array(Vec<Value>),
    /// `~#list` composite.
    List(Vec<Value>),
    /// `~#set` composite. Element order is kept as received.
    Set(Vec<Value>),
    Map(TransitMap),
    /// Scalar with a ground tag this codec does not interpret (`~n`, `~r`, `~b`, ...).
    Extension { tag: char, rep: String },
    /// Composite with an application-defined tag.
    Tagged { tag: String, rep: Box<Value> },
}

impl Value {
    pub fn keyword(name: impl Into<String>) -> Self {
        Self::Keyword(Keyword::new(name))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(Symbol::new(name))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Name carried by keyword and symbol values; `None` for everything else.
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Self::Keyword(keyword) => Some(keyword.name()),
            Self::Symbol(symbol) => Some(symbol.name()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&TransitMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut TransitMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Elements of any sequence-like value (array, list or set).
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) | Self::List(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_seq_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Array(items) | Self::List(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Short description of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Keyword(_) => "keyword",
            Self::Symbol(_) => "symbol",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Extension { .. } => "extension",
            Self::Tagged { .. } => "tagged value",
        }
    }

    /// Whether this value can be written as a string key of a `^ ` map.
    pub(crate) fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::Array(_) | Self::List(_) | Self::Set(_) | Self::Map(_) | Self::Tagged { .. }
        )
    }
}

impl From<TransitMap> for Value {
    fn from(map: TransitMap) -> Self {
        Self::Map(map)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

/// Insertion-ordered map whose keys are themselves Transit values.
///
/// Keys are matched by value equality, which for keywords and symbols means
/// by name. Replacing a value never replaces the stored key, so keys handed
/// out by the server survive edits unchanged.
#[derive(Debug, Clone, Default)]
pub struct TransitMap {
    entries: Vec<(Value, Value)>,
}

impl TransitMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace. When an equal key is already present its value is
    /// swapped in place and the previous value returned.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder-style insert for keyword keys.
    pub fn with(mut self, keyword: &str, value: impl Into<Value>) -> Self {
        self.insert(Value::keyword(keyword), value.into());
        self
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Find a value by the name of its keyword or symbol key.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.tag_name() == Some(name))
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Positional access for maps whose layout is fixed and known up front.
    /// The key is only borrowed; the value can be rewritten.
    pub fn entry_at_mut(&mut self, index: usize) -> Option<(&Value, &mut Value)> {
        self.entries
            .get_mut(index)
            .map(|(key, value)| (&*key, value))
    }
}

impl PartialEq for TransitMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl FromIterator<(Value, Value)> for TransitMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
