//! Runtime values.

use crate::env::Environment;
use indexmap::IndexMap;
use quan_types::ast::FunctionDecl;
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Largest integer an `f64` represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Shared, mutable, insertion-ordered map handle.
///
/// Cloning the handle aliases the same map.
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Shared, mutable array handle. Aliases like [`MapRef`].
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// A QuanLang runtime value.
#[derive(Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Map(MapRef),
    Array(ArrayRef),
    Function(Rc<Closure>),
}

/// A function value: its declaration plus the environment it was created in.
pub struct Closure {
    pub decl: Rc<FunctionDecl>,
    pub env: Environment,
}

impl Value {
    /// Create an empty map value.
    pub fn new_map() -> Self {
        Value::Map(Rc::new(RefCell::new(IndexMap::new())))
    }

    /// Wrap an existing ordered map.
    pub fn from_map(map: IndexMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    /// Wrap a list of elements.
    pub fn from_vec(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Create a function value closing over `env`.
    pub fn function(decl: Rc<FunctionDecl>, env: Environment) -> Self {
        Value::Function(Rc::new(Closure { decl, env }))
    }

    /// The name reported by the `type` builtin.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Map(_) => "object",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Structural equality. Values of different types are never equal.
    /// Maps and arrays are equal when identical or when their entries are
    /// equal in order; functions only by identity.
    pub fn equals(&self, other: &Value) -> bool {
        let mut seen = Vec::new();
        equals_inner(self, other, &mut seen)
    }

    /// Convert to JSON. Functions become `"<fn name>"` strings and a map or
    /// array nested inside itself becomes `"<cycle>"`.
    pub fn to_json(&self) -> JsonValue {
        let mut stack = Vec::new();
        to_json_inner(self, &mut stack)
    }

    /// Convert from JSON. Objects become maps in key order, arrays become
    /// arrays. `None` only for numbers outside the `f64` range.
    pub fn from_json(json: &JsonValue) -> Option<Value> {
        Some(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64()?),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::from_vec(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            JsonValue::Object(fields) => {
                let mut map = IndexMap::with_capacity(fields.len());
                for (key, value) in fields {
                    map.insert(key.clone(), Value::from_json(value)?);
                }
                Value::from_map(map)
            }
        })
    }
}

/// Render a number: integral values without a fraction, everything else in
/// shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

/// Identity of a map or array, for cycle detection.
type Ptr = *const ();

fn to_json_inner(value: &Value, stack: &mut Vec<Ptr>) -> JsonValue {
    match value {
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Null => JsonValue::Null,
        Value::Function(f) => JsonValue::String(format!("<fn {}>", f.decl.display_name())),
        Value::Map(map) => {
            let ptr = Rc::as_ptr(map) as Ptr;
            if stack.contains(&ptr) {
                return JsonValue::String("<cycle>".to_string());
            }
            stack.push(ptr);
            let object = map
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), to_json_inner(v, stack)))
                .collect();
            stack.pop();
            JsonValue::Object(object)
        }
        Value::Array(items) => {
            let ptr = Rc::as_ptr(items) as Ptr;
            if stack.contains(&ptr) {
                return JsonValue::String("<cycle>".to_string());
            }
            stack.push(ptr);
            let array = items
                .borrow()
                .iter()
                .map(|v| to_json_inner(v, stack))
                .collect();
            stack.pop();
            JsonValue::Array(array)
        }
    }
}

fn equals_inner(a: &Value, b: &Value, seen: &mut Vec<(Ptr, Ptr)>) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Null, Value::Null) => true,
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Map(x), Value::Map(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let pair = (Rc::as_ptr(x) as Ptr, Rc::as_ptr(y) as Ptr);
            if seen.contains(&pair) {
                return true;
            }
            seen.push(pair);
            let (x, y) = (x.borrow(), y.borrow());
            let equal = x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && equals_inner(va, vb, seen));
            seen.pop();
            equal
        }
        (Value::Array(x), Value::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let pair = (Rc::as_ptr(x) as Ptr, Rc::as_ptr(y) as Ptr);
            if seen.contains(&pair) {
                return true;
            }
            seen.push(pair);
            let (x, y) = (x.borrow(), y.borrow());
            let equal =
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| equals_inner(a, b, seen));
            seen.pop();
            equal
        }
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

/// The string form used by `print`, `string` and template interpolation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::Function(c) => write!(f, "<fn {}>", c.decl.display_name()),
            Value::Map(_) | Value::Array(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Null => f.write_str("Null"),
            Value::Map(_) => write!(f, "Map({})", self.to_json()),
            Value::Array(_) => write!(f, "Array({})", self.to_json()),
            Value::Function(_) => write!(f, "Function({self})"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(80.0), "80");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_integral_numbers_serialize_as_integers() {
        assert_eq!(Value::Number(80.0).to_json(), json!(80));
        assert_eq!(Value::Number(1.5).to_json(), json!(1.5));
        assert_eq!(Value::Number(f64::NAN).to_json(), JsonValue::Null);
    }

    #[test]
    fn test_map_display_keeps_insertion_order() {
        let v = Value::from_json(&json!({"z": 1, "a": {"k": "v"}, "m": null})).unwrap();
        assert_eq!(v.to_string(), r#"{"z":1,"a":{"k":"v"},"m":null}"#);
    }

    #[test]
    fn test_from_json_arrays() {
        let v = Value::from_json(&json!({"a": {"b": [1, "x", [true]]}})).unwrap();
        assert_eq!(v.to_string(), r#"{"a":{"b":[1,"x",[true]]}}"#);
        let list = Value::from_json(&json!([1, 2])).unwrap();
        assert_eq!(list.type_name(), "array");
        assert!(list.equals(&Value::from_vec(vec![1.0.into(), 2.0.into()])));
        assert!(!list.equals(&Value::from_vec(vec![2.0.into(), 1.0.into()])));
    }

    #[test]
    fn test_array_aliasing_and_cycle() {
        let a = Value::from_vec(vec![Value::Number(1.0)]);
        let b = a.clone();
        if let Value::Array(items) = &a {
            items.borrow_mut().push(b.clone());
        }
        assert_eq!(b.to_string(), r#"[1,"<cycle>"]"#);
        assert!(a.equals(&b));
        if let Value::Array(items) = &a {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_map_aliasing() {
        let a = Value::new_map();
        let b = a.clone();
        if let Value::Map(m) = &a {
            m.borrow_mut().insert("x".into(), Value::Number(1.0));
        }
        assert_eq!(b.to_string(), r#"{"x":1}"#);
        assert!(a.equals(&b));
    }

    #[test]
    fn test_equality_by_type() {
        assert!(Value::Number(1.0).equals(&Value::Number(1.0)));
        assert!(!Value::Number(1.0).equals(&Value::String("1".into())));
        assert!(Value::Null.equals(&Value::Null));
        assert!(!Value::Null.equals(&Value::Bool(false)));
        let a = Value::from_json(&json!({"x": 1, "y": 2})).unwrap();
        let b = Value::from_json(&json!({"x": 1, "y": 2})).unwrap();
        let c = Value::from_json(&json!({"y": 2, "x": 1})).unwrap();
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }

    #[test]
    fn test_self_referencing_map() {
        let a = Value::new_map();
        if let Value::Map(m) = &a {
            m.borrow_mut().insert("me".into(), a.clone());
        }
        assert_eq!(a.to_string(), r#"{"me":"<cycle>"}"#);
        let b = Value::new_map();
        if let Value::Map(m) = &b {
            m.borrow_mut().insert("me".into(), b.clone());
        }
        assert!(a.equals(&b));
        // break the cycles so the test does not leak
        for v in [&a, &b] {
            if let Value::Map(m) = v {
                m.borrow_mut().clear();
            }
        }
    }
}
