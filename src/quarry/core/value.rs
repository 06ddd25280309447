//! The dynamically typed value every expression in a build file evaluates to.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::scope::Scope;
use crate::util::errors::{Location, QuarryResult};

/// A tagged value. Cloning a `Value::Scope` deep-clones the scope's own
/// bindings into a fresh `Rc<RefCell<...>>` (re-parented onto the same
/// parent chain via `Scope::clone`) rather than aliasing the original's
/// `RefCell` — the "copying a scope clones its bindings and re-parents"
/// semantics the data model calls for. Code that needs an actual shared
/// alias (e.g. binding `invoker` to a template's caller scope) clones the
/// `Rc` directly instead of going through `Value::clone`.
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Scope(Rc<RefCell<Scope>>),
}

impl Clone for Value {
    fn clone(&self) -> Value {
        match self {
            Value::None => Value::None,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(i) => Value::Int(*i),
            Value::Str(s) => Value::Str(s.clone()),
            Value::List(items) => Value::List(items.clone()),
            Value::Scope(scope) => Value::Scope(Rc::new(RefCell::new(scope.borrow().clone()))),
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Scope(_) => "scope",
        }
    }

    pub fn as_bool(&self, at: Location) -> QuarryResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(type_error(at, "boolean", other)),
        }
    }

    pub fn as_int(&self, at: Location) -> QuarryResult<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(type_error(at, "integer", other)),
        }
    }

    pub fn as_str(&self, at: Location) -> QuarryResult<&str> {
        match self {
            Value::Str(s) => Ok(s.as_str()),
            other => Err(type_error(at, "string", other)),
        }
    }

    pub fn as_list(&self, at: Location) -> QuarryResult<&[Value]> {
        match self {
            Value::List(l) => Ok(l.as_slice()),
            other => Err(type_error(at, "list", other)),
        }
    }

    pub fn as_scope(&self, at: Location) -> QuarryResult<Rc<RefCell<Scope>>> {
        match self {
            Value::Scope(s) => Ok(Rc::clone(s)),
            other => Err(type_error(at, "scope", other)),
        }
    }

    /// Every string list field (`sources`, `deps`, ...) is stored as a plain
    /// `Vec<String>` once validated; this is the common conversion used when
    /// lifting a `Value::List` of `Value::Str` into a target field.
    pub fn into_string_list(self, at: Location) -> QuarryResult<Vec<String>> {
        let items = match self {
            Value::List(items) => items,
            other => return Err(type_error(at, "list", &other)),
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Str(s) => Ok(s),
                other => Err(type_error(at, "string", &other)),
            })
            .collect()
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Bool(false))
    }

    /// Unquoted display, used for string interpolation and `+`-concatenation
    /// of strings with non-string operands.
    pub fn display_unquoted(&self) -> String {
        match self {
            Value::None => "<void>".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(items) => {
                let parts: Vec<_> = items.iter().map(Value::display_quoted).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Scope(_) => "{...}".to_string(),
        }
    }

    pub fn display_quoted(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            other => other.display_unquoted(),
        }
    }
}

fn type_error(at: Location, expected: &str, got: &Value) -> anyhow::Error {
    anyhow::anyhow!(
        "{}: expected a {}, got a {} ({})",
        at,
        expected,
        got.type_name(),
        got.display_unquoted()
    )
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Scope(a), Value::Scope(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_quoted())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Int(i)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_gn_semantics() {
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::None.is_truthy());
    }

    #[test]
    fn list_equality_is_structural() {
        let a = Value::from(vec!["x", "y"]);
        let b = Value::from(vec!["x", "y"]);
        assert_eq!(a, b);
    }
}
