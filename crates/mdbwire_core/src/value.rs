use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Query parameter value.
///
/// `List` and `Map` mirror shapes the server can return; they are carried so a
/// parameter set can be built from decoded data, but the request encoder
/// rejects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    String(String),
    Int64(i64),
    Float(f32),
    List(Vec<Value>),
    Map(Parameters),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Int64(_) => "Int64",
            Value::Float(_) => "Float",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int64(value.into())
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Insertion-ordered parameter mapping.
///
/// Keys are converted through `Value` so parameter sets assembled from loosely
/// typed sources can be built without a conversion step. Only string keys are
/// stored; the first non-string key is remembered by type name so the encoder
/// can report it instead of silently stringifying it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    entries: IndexMap<String, Value>,
    #[serde(skip)]
    non_string_key: Option<&'static str>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `key`. A replaced entry keeps its
    /// original position.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        match key.into() {
            Value::String(key) => {
                self.entries.insert(key, value.into());
            }
            other => {
                self.non_string_key.get_or_insert(other.type_name());
            }
        }
    }

    pub fn with(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Type name of the first non-string key passed to `insert`, if any.
    pub fn non_string_key(&self) -> Option<&'static str> {
        self.non_string_key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<IndexMap<String, Value>> for Parameters {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self {
            entries,
            non_string_key: None,
        }
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
