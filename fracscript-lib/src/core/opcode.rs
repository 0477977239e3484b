//! This file defines the opcodes.
//!
//! Opcodes are generic over their jump target. While the code is being built, targets are
//! [`Label`](crate::core::Label)s, the builder converts them into instruction indices when the
//! final [`ByteCode`](crate::core::ByteCode) is created. Pop/push arities are given in the
//! variant docs as `pops -> pushes`, the right operand is always popped first.

use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use std::fmt;

use crate::core::{Literal, SymbolId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OpCode<T> {
    /// 0 -> 1
    Push(Literal),
    /// 0 -> 1
    PushUnit,
    /// 1 -> 0
    Pop,
    /// 1 -> 2
    Dup,

    /// 2 -> 1, also concatenates two strings
    Add,
    Sub,
    Mul,
    Div,
    /// both operands must be integers
    FloorDiv,
    /// both operands must be integers
    Rem,
    /// the exponent must be an integer
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// 1 -> 1
    Neg,
    /// 1 -> 1
    Not,

    Jump(T),
    /// 1 -> 0, the popped value must be a bool
    JumpIfFalse(T),
    /// 1 -> 0, the popped value must be a bool
    JumpIfTrue(T),

    /// 0 -> 1
    Load(SymbolId),
    /// 1 -> 0
    Store(SymbolId),

    /// n -> 1, the first popped string is the leftmost one
    StrCat(usize),
    /// string, start, stop, step -> 1
    StrSlice,
    /// n -> 1, writes the values and pushes the line that was written
    Print(usize),

    /// n elements, count -> 1
    BuildList,
    /// n key value pairs, count -> 1
    BuildMap,
    /// value, count -> 1
    ListFill,

    /// 1 -> 1
    Head,
    /// 1 -> 1
    Tail,
    /// 1 -> 1
    IsEmpty,
    /// list, elem -> 1
    Cons,
    /// list, elem -> 1
    Append,
    /// 1 -> 1
    Keys,
    /// 1 -> 1
    Values,
    /// 1 -> 1
    Items,
    /// collection, key -> 1
    Delete,
    /// 1 -> 1
    Length,
    /// collection, key -> 1
    Find,
    /// collection, key, value -> 1
    Put,

    /// 0 -> 1, pushes a function reference
    MakeFunction { entry: T, arity: usize },
    /// args, callee -> 0, the callee's return value is pushed by [`OpCode::Return`]
    Call(usize),
    /// return value -> return value, pops the current frame
    Return,
    /// 1 -> 0, ends execution
    Halt,
}

impl<T> OpCode<T> {
    pub fn mnemonic(&self) -> &'static str {
        self.into()
    }

    /// converts the jump targets, and only those
    pub fn map_target<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<OpCode<U>, E> {
        use OpCode::*;
        Ok(match self {
            Jump(t) => Jump(f(t)?),
            JumpIfFalse(t) => JumpIfFalse(f(t)?),
            JumpIfTrue(t) => JumpIfTrue(f(t)?),
            MakeFunction { entry, arity } => MakeFunction {
                entry: f(entry)?,
                arity,
            },
            Push(lit) => Push(lit),
            PushUnit => PushUnit,
            Pop => Pop,
            Dup => Dup,
            Add => Add,
            Sub => Sub,
            Mul => Mul,
            Div => Div,
            FloorDiv => FloorDiv,
            Rem => Rem,
            Pow => Pow,
            Eq => Eq,
            Ne => Ne,
            Lt => Lt,
            Gt => Gt,
            Le => Le,
            Ge => Ge,
            Neg => Neg,
            Not => Not,
            Load(id) => Load(id),
            Store(id) => Store(id),
            StrCat(n) => StrCat(n),
            StrSlice => StrSlice,
            Print(n) => Print(n),
            BuildList => BuildList,
            BuildMap => BuildMap,
            ListFill => ListFill,
            Head => Head,
            Tail => Tail,
            IsEmpty => IsEmpty,
            Cons => Cons,
            Append => Append,
            Keys => Keys,
            Values => Values,
            Items => Items,
            Delete => Delete,
            Length => Length,
            Find => Find,
            Put => Put,
            Call(n) => Call(n),
            Return => Return,
            Halt => Halt,
        })
    }
}

impl<T: fmt::Display> fmt::Display for OpCode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use OpCode::*;
        let name = self.mnemonic();
        match self {
            Push(Literal::Str(s)) => write!(f, "{} {:?}", name, s),
            Push(Literal::Num(n)) => write!(f, "{} {}", name, n),
            Push(Literal::Bool(b)) => write!(f, "{} {}", name, b),
            Jump(t) | JumpIfFalse(t) | JumpIfTrue(t) => write!(f, "{} {}", name, t),
            Load(id) | Store(id) => write!(f, "{} {}", name, id),
            StrCat(n) | Print(n) | Call(n) => write!(f, "{} {}", name, n),
            MakeFunction { entry, arity } => write!(f, "{} {} {}", name, entry, arity),
            _ => write!(f, "{}", name),
        }
    }
}
