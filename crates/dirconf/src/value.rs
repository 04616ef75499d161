//! value representation
//!
//! The dirconf data model contains the following data types
//! - null
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", keys are values themselves)
//! - opaque (anything a host callable returned, see [HostObject])
//!
//! Object keys are not restricted to strings: a key such as `$index` evaluates to an integer.
//!
//! Values are hashable so they can be used as object keys and inside literal nodes of the AST.
//! Decimals compare and hash by bit pattern, objects compare without regard to key order,
//! opaque values compare by identity.
use indexmap::IndexMap;
use serde::{
    ser::{Error as _, SerializeMap, SerializeSeq},
    Serializer,
};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Order preserving mapping
pub type Map = IndexMap<Value, Value>;

/// All possible value types
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
    Opaque(Arc<dyn HostObject>),
}

/// A value produced by host code that has no direct representation in the data model
pub trait HostObject: fmt::Debug + Send + Sync {
    /// Name used in messages and in the textual form of the value
    fn type_name(&self) -> &str;

    /// Plain data view of this object
    fn decode(&self) -> Decoded;
}

/// Result of [HostObject::decode]
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Array-like or boxed scalar objects
    Plain(Value),
    /// Structured objects that can be rebuilt by calling `symbol` with `args`
    Model { symbol: String, args: Map },
    /// No plain representation
    Opaque,
}

/// One step of a path into a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(Value),
    Index(usize),
}

impl Value {
    pub fn object() -> Self {
        Value::Object(Map::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness as used by flag arguments such as `env=...`
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Opaque(_) => true,
        }
    }

    /// Short name of the value kind, for error messages
    pub fn kind(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Opaque(object) => object.type_name(),
        }
    }

    /// Follow a dotted path (`a.b.0.c`)
    ///
    /// Objects are tried with the segment as string key first, then as integer key.
    /// Arrays take numeric segments. An empty path returns `self`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |current, segment| current.get_segment(segment))
    }

    fn get_segment(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(&Value::from(segment)).or_else(|| {
                segment
                    .parse::<i64>()
                    .ok()
                    .and_then(|int| map.get(&Value::Integer(int)))
            }),
            Value::Array(array) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| array.get(index)),
            _ => None,
        }
    }

    /// Split a dotted path into segments, numeric segments become indices
    pub fn parse_path(path: &str) -> Vec<PathSegment> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(segment.into()),
            })
            .collect()
    }

    /// Get the value at `path`
    ///
    /// [PathSegment::Index] also matches integer object keys.
    pub fn get_segments(&self, path: &[PathSegment]) -> Option<&Value> {
        path.iter().try_fold(self, |current, segment| match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key),
            (Value::Object(map), PathSegment::Index(index)) => map
                .get(&Value::Integer(*index as i64))
                .or_else(|| map.get(&Value::String(index.to_string()))),
            (Value::Array(array), PathSegment::Index(index)) => array.get(*index),
            _ => None,
        })
    }

    /// Set the value at `path`
    ///
    /// With `only_existing` nothing happens unless the full path already exists.
    /// Otherwise missing intermediate containers are created (arrays for index segments,
    /// objects for key segments), scalars in the way are replaced and arrays grow padded
    /// with [Value::Null].
    ///
    /// Returns whether the value was set.
    pub fn set_path(&mut self, path: &[PathSegment], value: Value, only_existing: bool) -> bool {
        if only_existing && self.get_segments(path).is_none() {
            return false;
        }

        let Some((last, parents)) = path.split_last() else {
            *self = value;
            return true;
        };

        let mut current = self;
        for (position, segment) in parents.iter().enumerate() {
            let next = &path[position + 1];
            current = current.child_or_insert(segment, next);
        }

        *current.child_or_insert(last, last) = value;
        true
    }

    /// Child at `segment`, created (shaped for `next`) when missing
    fn child_or_insert(&mut self, segment: &PathSegment, next: &PathSegment) -> &mut Value {
        let empty = || match next {
            PathSegment::Index(_) => Value::Array(vec![]),
            PathSegment::Key(_) => Value::object(),
        };

        match segment {
            PathSegment::Index(index) => {
                if let Value::Object(map) = self {
                    let int_key = Value::Integer(*index as i64);
                    let string_key = Value::String(index.to_string());
                    let key = if !map.contains_key(&int_key) && map.contains_key(&string_key) {
                        string_key
                    } else {
                        int_key
                    };
                    return map.entry(key).or_insert_with(empty);
                }

                if !matches!(self, Value::Array(_)) {
                    *self = Value::Array(vec![]);
                }
                let Value::Array(array) = self else {
                    unreachable!("replaced with an array above")
                };
                while array.len() <= *index {
                    array.push(Value::Null);
                }
                if array[*index].is_null() {
                    array[*index] = empty();
                }
                &mut array[*index]
            }
            PathSegment::Key(key) => {
                if !matches!(self, Value::Object(_)) {
                    *self = Value::object();
                }
                let Value::Object(map) = self else {
                    unreachable!("replaced with an object above")
                };
                map.entry(key.clone()).or_insert_with(empty)
            }
        }
    }

    /// Textual form used inside containers: json strings, non-finite decimals are null
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(&serde_json::to_string(s).map_err(|_| fmt::Error)?),
            Value::Decimal(d) if !d.is_finite() => f.write_str("null"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Decimal(d) => d.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Array(a) => a.hash(state),
            // equality ignores key order
            Value::Object(o) => o.len().hash(state),
            Value::Opaque(object) => (Arc::as_ptr(object) as *const () as usize).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            // `{:?}` keeps the fractional part: 20.0 instead of 20
            Value::Decimal(d) => write!(f, "{d:?}"),
            Value::String(s) => f.write_str(s),
            Value::Opaque(object) => write!(f, "<{}>", object.type_name()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (position, item) in items.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                for (position, (key, value)) in map.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    key.fmt_nested(f)?;
                    f.write_str(": ")?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<Value>, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<serde_yaml::Number> for Value {
    fn from(value: serde_yaml::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        match value.as_f64() {
            Some(float) => Value::Decimal(float),
            // u64 beyond i64::MAX
            None => Value::Decimal(value.as_u64().unwrap_or(u64::MAX) as f64),
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Value {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => b.into(),
            Yaml::Number(n) => n.into(),
            Yaml::String(s) => s.into(),
            Yaml::Sequence(seq) => seq.into(),
            Yaml::Mapping(mapping) => mapping
                .into_iter()
                .map(|(k, v)| (Value::from(k), Value::from(v)))
                .collect(),
            // tags carry no meaning here, keep the tagged value
            Yaml::Tagged(tagged) => tagged.value.into(),
        }
    }
}

impl From<serde_json::Number> for Value {
    fn from(value: serde_json::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        Value::Decimal(
            value
                .as_f64()
                .expect("a json number that is not an i64 is representable as f64"),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => b.into(),
            Json::Number(n) => n.into(),
            Json::String(s) => s.into(),
            Json::Array(a) => a.into(),
            Json::Object(o) => o.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            Value::Opaque(object) => match object.decode() {
                Decoded::Plain(value) => value.serialize(serializer),
                Decoded::Model { symbol, args } => {
                    let mut ser = serializer.serialize_map(Some(2))?;
                    ser.serialize_entry("$model", &symbol)?;
                    ser.serialize_entry("$args", &Value::Object(args))?;
                    ser.end()
                }
                Decoded::Opaque => Err(S::Error::custom(format!(
                    "{} has no serializable representation",
                    object.type_name()
                ))),
            },
        }
    }
}

/// Build a [Value::Object] from `key => value` pairs
///
/// ```
/// # use dirconf::object;
/// let value = object! { "a" => 1, "b" => object! { "c" => "d" } };
/// assert_eq!(value.get_path("b.c"), Some(&"d".into()));
/// ```
#[macro_export]
macro_rules! object {
    { $($key:expr => $value:expr),* $(,)? } => {
        $crate::value::Value::Object($crate::value::Map::from_iter([
            $(($crate::value::Value::from($key), $crate::value::Value::from($value))),*
        ]))
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Value {
        object! {
            "a" => object! { "b" => vec![Value::from(1), object! { "c" => "deep" }] },
            "numbers" => object! { 0 => "zero" },
        }
    }

    #[test]
    fn get_path() {
        let value = sample();
        assert_eq!(value.get_path("a.b.0"), Some(&Value::Integer(1)));
        assert_eq!(value.get_path("a.b.1.c"), Some(&"deep".into()));
        assert_eq!(value.get_path("numbers.0"), Some(&"zero".into()));
        assert_eq!(value.get_path("a.missing"), None);
        assert_eq!(value.get_path(""), Some(&value));
    }

    #[test]
    fn set_path_creates_containers() {
        let mut value = Value::object();
        assert!(value.set_path(&Value::parse_path("x.1.y"), 10.into(), false));
        assert_eq!(
            value,
            object! { "x" => vec![Value::Null, object! { "y" => 10 }] }
        );
    }

    #[test]
    fn set_path_only_existing() {
        let mut value = sample();
        assert!(!value.set_path(&Value::parse_path("a.b.5"), 1.into(), true));
        assert!(value.set_path(&Value::parse_path("a.b.0"), 2.into(), true));
        assert_eq!(value.get_path("a.b.0"), Some(&Value::Integer(2)));
    }

    #[test]
    fn object_equality_ignores_order() {
        let one = object! { "a" => 1, "b" => 2 };
        let two = object! { "b" => 2, "a" => 1 };
        assert_eq!(one, two);

        let mut set = std::collections::HashSet::new();
        set.insert(one);
        assert!(set.contains(&two));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Decimal(20.0).to_string(), "20.0");
        assert_eq!(Value::Integer(20).to_string(), "20");
        assert_eq!(Value::from("raw").to_string(), "raw");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(object! { "a" => "b" }.to_string(), r#"{"a": "b"}"#);
    }

    #[test]
    fn display_nested_as_json() {
        let value = Value::from(vec![
            Value::from("c\u{7}"),
            Value::from("say \"hi\""),
            Value::Decimal(f64::NAN),
            Value::Decimal(1.5),
        ]);
        assert_eq!(value.to_string(), r#"["c\u0007", "say \"hi\"", null, 1.5]"#);
    }

    #[test]
    fn from_yaml() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("a: [1, 2.5, x]\n3: null").unwrap();
        assert_eq!(
            Value::from(yaml),
            object! {
                "a" => vec![Value::Integer(1), Value::Decimal(2.5), "x".into()],
                3 => Value::Null,
            }
        );
    }
}
