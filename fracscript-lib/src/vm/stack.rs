use derive_more::{Deref, DerefMut};
use num_rational::BigRational;

use crate::core::*;
use crate::vm::*;

/// type that is used at runtime to represent the operand stack
#[derive(Debug, Default, Clone, Deref, DerefMut)]
pub struct Stack(pub Vec<Value>);

impl Stack {
    pub fn push_val(&mut self, v: impl Into<Value>) {
        self.0.push(v.into());
    }

    pub fn pop_val(&mut self) -> Result<Value> {
        self.0.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// removes the n topmost values and returns them in the order they were pushed
    pub fn take_top(&mut self, n: usize) -> Result<Vec<Value>> {
        if n > self.0.len() {
            bail!(StackUnderflow);
        }
        Ok(self.0.split_off(self.0.len() - n))
    }

    /// pops n values, the first popped value is the first in the returned vec
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        let mut vals = self.take_top(n)?;
        vals.reverse();
        Ok(vals)
    }

    pub fn pop_num(&mut self, op: &'static str) -> Result<BigRational> {
        match self.pop_val()? {
            Value::Num(n) => Ok(n),
            other => Err(type_mismatch(op, "num", &other)),
        }
    }

    pub fn pop_bool(&mut self, op: &'static str) -> Result<bool> {
        match self.pop_val()? {
            Value::Bool(b) => Ok(b),
            other => Err(type_mismatch(op, "bool", &other)),
        }
    }

    pub fn pop_str(&mut self, op: &'static str) -> Result<String> {
        match self.pop_val()? {
            Value::Str(s) => Ok(s),
            other => Err(type_mismatch(op, "str", &other)),
        }
    }

    /// pops a non negative integer, used for element counts
    pub fn pop_count(&mut self, op: &'static str) -> Result<usize> {
        let n = self.pop_num(op)?;
        to_count(&n).ok_or_else(|| RuntimeError::UnsupportedOperation {
            op,
            detail: format!("{} is not a valid count", Value::Num(n)),
        })
    }

    pub fn peek(&self) -> Result<&Value> {
        self.0.last().ok_or(RuntimeError::StackUnderflow)
    }
}

fn to_count(n: &BigRational) -> Option<usize> {
    use num_traits::ToPrimitive;
    if n.is_integer() {
        n.numer().to_usize()
    } else {
        None
    }
}
