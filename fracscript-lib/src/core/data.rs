//! Deals with run-time data representation
//!
//! Values are owned. Lists use the structurally shared [`im::Vector`], so copying a list onto
//! the stack is cheap, maps keep their insertion order through [`IndexMap`].

use im::Vector;
use indexmap::IndexMap;
use num_rational::BigRational;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::core::Literal;

/// A reference to compiled function code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FnRef {
    /// index of the first instruction of the body
    pub entry: usize,
    pub arity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unit,
    Num(BigRational),
    Bool(bool),
    Str(String),
    List(Vector<Value>),
    Map(IndexMap<Key, Value>),
    Function(FnRef),
}

/// The subset of values that can be used as map keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Num(BigRational),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn int(i: i64) -> Self {
        Value::Num(BigRational::from_integer(i.into()))
    }

    pub fn ratio(numer: i64, denom: i64) -> Self {
        Value::Num(BigRational::new(numer.into(), denom.into()))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(elems: impl IntoIterator<Item = Value>) -> Self {
        Value::List(elems.into_iter().collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Num(_) => "num",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
        }
    }

    /// converts the value into a map key, returns the value back if it's not hashable
    pub fn into_key(self) -> Result<Key, Value> {
        match self {
            Value::Num(n) => Ok(Key::Num(n)),
            Value::Bool(b) => Ok(Key::Bool(b)),
            Value::Str(s) => Ok(Key::Str(s)),
            other => Err(other),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Num(n) => Value::Num(n),
            Literal::Bool(b) => Value::Bool(b),
            Literal::Str(s) => Value::Str(s),
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Num(n) => Value::Num(n),
            Key::Bool(b) => Value::Bool(b),
            Key::Str(s) => Value::Str(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Num(n) => fmt_num(n, f),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    elem.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, val)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    val.fmt_nested(f)?;
                }
                write!(f, "}}")
            }
            Value::Function(FnRef { entry, arity }) => write!(f, "<fn@{}/{}>", entry, arity),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Num(n) => fmt_num(n, f),
            Key::Bool(b) => write!(f, "{}", b),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// integers are written without denominator, everything else as `numer/denom`
fn fmt_num(n: &BigRational, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.denom().is_one() || n.numer().is_zero() {
        write!(f, "{}", n.numer())
    } else {
        write!(f, "{}/{}", n.numer(), n.denom())
    }
}
