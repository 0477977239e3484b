//! Contains the AST types.
//!
//! The tree is generic over the binding type `B`. The parser produces a tree whose bindings are
//! plain names ([`SyntaxTree`]), the resolver turns every binding into a [`Symbol`]
//! ([`ResolvedTree`]), and everything after that only ever sees symbols.

use derive_more::Display;
use num_rational::BigRational;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

pub type SyntaxTree = Block<String>;
pub type ResolvedTree = Block<Symbol>;

/// Identifies a declaration. Assigned once by the resolver, never reused.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "#{}", _0)]
pub struct SymbolId(pub usize);

/// A name together with the id of the declaration it refers to
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "{}{}", name, id)]
pub struct Symbol {
    pub name: String,
    pub id: SymbolId,
}

/// represents multiple statements that are executed one after another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block<B>(pub Vec<Expr<B>>);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Num(BigRational),
    Bool(bool),
    Str(String),
}

impl Literal {
    pub fn int(i: i64) -> Self {
        Literal::Num(BigRational::from_integer(i.into()))
    }
}

#[derive(Debug, StrumDisplay, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[strum(to_string = "-")]
    Neg,
    #[strum(to_string = "!")]
    Not,
}

#[derive(Debug, StrumDisplay, IntoStaticStr, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Sub,
    #[strum(to_string = "*")]
    Mul,
    #[strum(to_string = "/")]
    Div,
    #[strum(to_string = "//")]
    FloorDiv,
    #[strum(to_string = "%")]
    Rem,
    #[strum(to_string = "^")]
    Pow,
    #[strum(to_string = "==")]
    Eq,
    #[strum(to_string = "!=")]
    Ne,
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = "<=")]
    Le,
    #[strum(to_string = ">=")]
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Eq | Ne | Lt | Gt | Le | Ge)
    }
}

#[derive(Debug, StrumDisplay, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    #[strum(to_string = "and")]
    And,
    #[strum(to_string = "or")]
    Or,
}

/// Read-only operations on a collection
#[derive(Debug, StrumDisplay, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum QueryOp {
    Head,
    Tail,
    IsEmpty,
    Keys,
    Values,
    Items,
    Length,
}

/// Operations that produce a modified collection. When the target is a variable, the result is
/// stored back into it.
#[derive(Debug, StrumDisplay, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateOp {
    Cons,
    Append,
    Delete,
}

/// represents an expression. Statements are expressions too, every node evaluates to exactly
/// one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr<B> {
    Literal(Literal),
    Var(B),
    /// `var name = value`
    Declare {
        name: B,
        value: Box<Expr<B>>,
    },
    /// `target = value`
    Assign {
        target: B,
        value: Box<Expr<B>>,
    },
    /// `let name = value in body`
    Let {
        name: B,
        value: Box<Expr<B>>,
        body: Box<Expr<B>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr<B>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr<B>>,
        right: Box<Expr<B>>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr<B>>,
        right: Box<Expr<B>>,
    },
    Block(Block<B>),
    If {
        cond: Box<Expr<B>>,
        then: Block<B>,
        otherwise: Option<Block<B>>,
    },
    While {
        cond: Box<Expr<B>>,
        body: Block<B>,
    },
    /// `for (iterator = init; cond; update) body`
    For {
        iterator: B,
        init: Box<Expr<B>>,
        cond: Box<Expr<B>>,
        update: Box<Expr<B>>,
        body: Block<B>,
    },
    Print(Vec<Expr<B>>),
    List(Vec<Expr<B>>),
    /// `[value; count]`
    ListFill {
        value: Box<Expr<B>>,
        count: Box<Expr<B>>,
    },
    Map(Vec<(Expr<B>, Expr<B>)>),
    Query {
        op: QueryOp,
        target: Box<Expr<B>>,
    },
    Update {
        op: UpdateOp,
        target: Box<Expr<B>>,
        arg: Box<Expr<B>>,
    },
    /// `target[key]`
    Index {
        target: Box<Expr<B>>,
        key: Box<Expr<B>>,
    },
    /// `target[key] = value`
    Put {
        target: Box<Expr<B>>,
        key: Box<Expr<B>>,
        value: Box<Expr<B>>,
    },
    /// `a ++ b ++ ...`
    Concat(Vec<Expr<B>>),
    /// `target[start:stop:step]`
    Slice {
        target: Box<Expr<B>>,
        start: Box<Expr<B>>,
        stop: Box<Expr<B>>,
        step: Option<Box<Expr<B>>>,
    },
    Function {
        name: B,
        params: Vec<B>,
        body: Block<B>,
        ret: Box<Expr<B>>,
    },
    Call {
        callee: B,
        args: Vec<Expr<B>>,
    },
}

impl<B> Expr<B> {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// short name of the node kind, used in error messages
    pub fn kind(&self) -> &'static str {
        use Expr::*;
        match self {
            Literal(_) => "literal",
            Var(_) => "variable",
            Declare { .. } => "declaration",
            Assign { .. } => "assignment",
            Let { .. } => "let",
            Unary { .. } => "unary operation",
            Binary { .. } => "binary operation",
            Logical { .. } => "logical operation",
            Block(_) => "block",
            If { .. } => "if",
            While { .. } => "while",
            For { .. } => "for",
            Print(_) => "print",
            List(_) => "list literal",
            ListFill { .. } => "list fill",
            Map(_) => "map literal",
            Query { .. } => "query",
            Update { .. } => "update",
            Index { .. } => "index",
            Put { .. } => "put",
            Concat(_) => "concatenation",
            Slice { .. } => "slice",
            Function { .. } => "function definition",
            Call { .. } => "call",
        }
    }
}

impl<B> Default for Block<B> {
    fn default() -> Self {
        Block(vec![])
    }
}
