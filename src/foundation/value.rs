use std::fmt;
use std::rc::Rc;

use crate::binding::object::Object;
use crate::foundation::error::{SpecbindError, SpecbindResult};

/// Nesting limit shared by scope chains, proxy creation and JSON conversion.
pub const MAX_DEPTH: usize = 100;

/// A dynamically typed value flowing through bindings and expressions.
///
/// Scalars are stored inline. Objects are shared handles: cloning a
/// [`Value::Object`] yields another handle to the same data, which is what makes
/// identity-based binding possible.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Missing or deleted value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Every number is an `f64`.
    Number(f64),
    /// Text.
    Str(String),
    /// Map or list data object.
    Object(Object),
    /// Callable value. Never bindable.
    Function(Function),
}

/// Signature of a callable [`Value`].
pub type NativeFn = dyn Fn(&[Value]) -> anyhow::Result<Value>;

/// A shared callable, compared by identity.
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    /// Wrap a closure.
    pub fn new(f: impl Fn(&[Value]) -> anyhow::Result<Value> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke with `args`.
    pub fn call(&self, args: &[Value]) -> anyhow::Result<Value> {
        (self.0)(args)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The object handle, if this is an object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The number, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Object(o) if o.is_list() => "list",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Truthiness: `null`, `false`, `0`, `NaN` and `""` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// Numeric coercion used by arithmetic operators.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Object(_) | Self::Function(_) => f64::NAN,
        }
    }

    /// Text rendering used by concatenation and templates. `null` renders empty.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Str(s) => s.clone(),
            Self::Object(o) if o.is_list() => o
                .values()
                .iter()
                .map(Self::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => "[object]".to_owned(),
            Self::Function(_) => "[function]".to_owned(),
        }
    }

    /// Equality used by `==` and `!=`.
    ///
    /// Same-typed values compare structurally (objects by identity). Numbers
    /// compare numerically against strings and booleans.
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(_), Self::Str(_) | Self::Bool(_))
            | (Self::Str(_) | Self::Bool(_), Self::Number(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self == other,
        }
    }

    /// Convert a JSON document into a value. Objects and arrays become fresh,
    /// unbound data objects.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Object(Object::from_values(items.iter().map(Self::from_json)))
            }
            serde_json::Value::Object(map) => Self::Object(Object::from_entries(
                map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))),
            )),
        }
    }

    /// Snapshot this value as JSON. Functions and non-finite numbers become `null`.
    pub fn to_json(&self) -> SpecbindResult<serde_json::Value> {
        self.to_json_at(0)
    }

    pub(crate) fn to_json_at(&self, depth: usize) -> SpecbindResult<serde_json::Value> {
        Ok(match self {
            Self::Null | Self::Function(_) => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Object(o) => {
                if depth >= MAX_DEPTH {
                    return Err(SpecbindError::recursion(
                        "data nested deeper than 100 levels (cyclic model?)",
                    ));
                }
                o.to_json_at(depth + 1)?
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

/// Render a number the way templates display it: integral values print
/// without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/value.rs"]
mod tests;
