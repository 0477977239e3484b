//! Lowers the resolved tree to bytecode.
//!
//! Every expression leaves exactly one value on the stack. Blocks pop the values of all their
//! statements except the last one, loops and ifs without else leave a unit.

use thiserror::Error;
use tracing::debug;

use crate::core::*;

pub trait Compilable {
    /// appends the code for self to the builder
    fn compile(&self, builder: ByteCodeBuilder) -> CompilationResult;
}

pub type CompilationResult = Result<ByteCodeBuilder, CompilationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilationError {
    #[error("Label {label} was never placed")]
    UnresolvedLabel { label: usize },

    #[error("Label {label} points to {target}, but there are only {len} instructions")]
    LabelOutOfRange {
        label: usize,
        target: usize,
        len: usize,
    },

    #[error("Label {label} was placed at {first} and again at {second}")]
    LabelPlacedTwice {
        label: usize,
        first: usize,
        second: usize,
    },

    #[error("Unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String },

    #[error("A compiler bug was detected: {msg}")]
    CompilerBug { msg: String },
}

macro_rules! impl_compilable {
    ($t:ty: $self:ident, $builder:ident => $code:block) => {
        impl Compilable for $t {
            fn compile(&$self, $builder: ByteCodeBuilder) -> CompilationResult {
                $code
            }
        }
    };
}

/// compiles a whole program, the value of the last statement is the result of the program
pub fn compile(tree: &ResolvedTree) -> Result<ByteCode, CompilationError> {
    let bc = tree.compile(ByteCodeBuilder::new())?.build()?;
    debug!(instructions = bc.text.len(), "compiled program");
    Ok(bc)
}

fn compile_all<'a>(
    exprs: impl IntoIterator<Item = &'a Expr<Symbol>>,
    builder: ByteCodeBuilder,
) -> CompilationResult {
    exprs.into_iter().try_fold(builder, |b, e| e.compile(b))
}

fn push_count(builder: ByteCodeBuilder, n: usize) -> ByteCodeBuilder {
    builder.emit(OpCode::Push(Literal::int(n as i64)))
}

fn binary_opcode(op: BinaryOp) -> OpCode<Label> {
    use BinaryOp::*;
    match op {
        Add => OpCode::Add,
        Sub => OpCode::Sub,
        Mul => OpCode::Mul,
        Div => OpCode::Div,
        FloorDiv => OpCode::FloorDiv,
        Rem => OpCode::Rem,
        Pow => OpCode::Pow,
        Eq => OpCode::Eq,
        Ne => OpCode::Ne,
        Lt => OpCode::Lt,
        Gt => OpCode::Gt,
        Le => OpCode::Le,
        Ge => OpCode::Ge,
    }
}

fn query_opcode(op: QueryOp) -> OpCode<Label> {
    use QueryOp::*;
    match op {
        Head => OpCode::Head,
        Tail => OpCode::Tail,
        IsEmpty => OpCode::IsEmpty,
        Keys => OpCode::Keys,
        Values => OpCode::Values,
        Items => OpCode::Items,
        Length => OpCode::Length,
    }
}

fn update_opcode(op: UpdateOp) -> OpCode<Label> {
    match op {
        UpdateOp::Cons => OpCode::Cons,
        UpdateOp::Append => OpCode::Append,
        UpdateOp::Delete => OpCode::Delete,
    }
}

/// stores the collection on the stack top back into target, if target is a variable
fn restore_into(target: &Expr<Symbol>, builder: ByteCodeBuilder) -> ByteCodeBuilder {
    match target {
        Expr::Var(symbol) => builder.emit(OpCode::Dup).store(symbol),
        _ => builder,
    }
}

impl_compilable! { Block<Symbol>: self, builder => {
    let Block(stmts) = self;
    if stmts.is_empty() {
        return Ok(builder.emit(OpCode::PushUnit));
    }
    let mut builder = builder;
    for (i, stmt) in stmts.iter().enumerate() {
        if i > 0 {
            builder = builder.emit(OpCode::Pop);
        }
        builder = stmt.compile(builder)?;
    }
    Ok(builder)
}}

impl_compilable! { Expr<Symbol>: self, builder => {
    use Expr::*;
    Ok(match self {
        Literal(lit) => builder.emit(OpCode::Push(lit.clone())),
        Var(symbol) => builder.load(symbol),
        Declare { name: symbol, value } | Assign { target: symbol, value } => value
            .compile(builder)?
            .emit(OpCode::Dup)
            .store(symbol),
        Let { name, value, body } => {
            let builder = value.compile(builder)?.store(name);
            body.compile(builder)?
        }
        Unary { op, operand } => {
            let code = match op {
                UnaryOp::Neg => OpCode::Neg,
                UnaryOp::Not => OpCode::Not,
            };
            operand.compile(builder)?.emit(code)
        }
        Binary { op, left, right } => {
            let builder = left.compile(builder)?;
            right.compile(builder)?.emit(binary_opcode(*op))
        }
        Logical { op, left, right } => {
            let mut builder = left.compile(builder)?;
            let end = builder.new_label();
            let jump = match op {
                LogicalOp::And => OpCode::JumpIfFalse(end),
                LogicalOp::Or => OpCode::JumpIfTrue(end),
            };
            let builder = builder.emit(OpCode::Dup).emit(jump).emit(OpCode::Pop);
            right.compile(builder)?.place_label(end)?
        }
        Block(block) => block.compile(builder)?,
        If { cond, then, otherwise } => {
            let mut builder = cond.compile(builder)?;
            let else_label = builder.new_label();
            let end = builder.new_label();
            let builder = then
                .compile(builder.emit(OpCode::JumpIfFalse(else_label)))?
                .emit(OpCode::Jump(end))
                .place_label(else_label)?;
            let builder = match otherwise {
                Some(block) => block.compile(builder)?,
                None => builder.emit(OpCode::PushUnit),
            };
            builder.place_label(end)?
        }
        While { cond, body } => compile_loop(builder, cond, body, None)?,
        For { iterator, init, cond, update, body } => {
            let builder = init.compile(builder)?.store(iterator);
            compile_loop(builder, cond, body, Some(update))?
        }
        Print(args) => compile_all(args.iter().rev(), builder)?.emit(OpCode::Print(args.len())),
        List(elems) => {
            let builder = compile_all(elems, builder)?;
            push_count(builder, elems.len()).emit(OpCode::BuildList)
        }
        ListFill { value, count } => {
            let builder = value.compile(builder)?;
            count.compile(builder)?.emit(OpCode::ListFill)
        }
        Map(entries) => {
            let builder = compile_all(entries.iter().flat_map(|(k, v)| [k, v]), builder)?;
            push_count(builder, entries.len()).emit(OpCode::BuildMap)
        }
        Query { op, target } => target.compile(builder)?.emit(query_opcode(*op)),
        Update { op, target, arg } => {
            let builder = target.compile(builder)?;
            let builder = arg.compile(builder)?.emit(update_opcode(*op));
            restore_into(target, builder)
        }
        Index { target, key } => {
            let builder = target.compile(builder)?;
            key.compile(builder)?.emit(OpCode::Find)
        }
        Put { target, key, value } => compile_put(target, key, &|b| value.compile(b), builder)?,
        Concat(parts) => {
            compile_all(parts.iter().rev(), builder)?.emit(OpCode::StrCat(parts.len()))
        }
        Slice { target, start, stop, step } => {
            let builder = compile_all([target.as_ref(), start.as_ref(), stop.as_ref()], builder)?;
            let builder = match step {
                Some(step) => step.compile(builder)?,
                None => push_count(builder, 1),
            };
            builder.emit(OpCode::StrSlice)
        }
        Function { name, params, body, ret } => {
            let mut builder = builder;
            let skip = builder.new_label();
            let entry = builder.new_label();
            let mut builder = builder.emit(OpCode::Jump(skip)).place_label(entry)?;
            // arguments arrive in call order, so the last one is on top
            for param in params.iter().rev() {
                builder = builder.store(param);
            }
            // the callee frame gets its own binding, so nested functions can recurse
            builder = builder
                .emit(OpCode::MakeFunction { entry, arity: params.len() })
                .store(name);
            for stmt in &body.0 {
                builder = stmt.compile(builder)?.emit(OpCode::Pop);
            }
            ret.compile(builder)?
                .emit(OpCode::Return)
                .place_label(skip)?
                .emit(OpCode::MakeFunction { entry, arity: params.len() })
                .emit(OpCode::Dup)
                .store(name)
        }
        Call { callee, args } => compile_all(args, builder)?
            .load(callee)
            .emit(OpCode::Call(args.len())),
    })
}}

/// `target[key] = value`. When target is itself an element, `x[a][b] = v`, the updated
/// element is put back into its parent, all the way up to the variable.
fn compile_put(
    target: &Expr<Symbol>,
    key: &Expr<Symbol>,
    value: &dyn Fn(ByteCodeBuilder) -> CompilationResult,
    builder: ByteCodeBuilder,
) -> CompilationResult {
    match target {
        Expr::Var(_) => {
            let builder = key.compile(target.compile(builder)?)?;
            Ok(restore_into(target, value(builder)?.emit(OpCode::Put)))
        }
        Expr::Index {
            target: parent,
            key: parent_key,
        } => {
            let updated_elem = |b: ByteCodeBuilder| -> CompilationResult {
                let b = key.compile(target.compile(b)?)?;
                Ok(value(b)?.emit(OpCode::Put))
            };
            compile_put(parent, parent_key, &updated_elem, builder)
        }
        other => Err(CompilationError::UnsupportedConstruct {
            construct: format!("assigning to an element of a {}", other.kind()),
        }),
    }
}

/// shared by while and for. The update runs after the body of every iteration
fn compile_loop(
    mut builder: ByteCodeBuilder,
    cond: &Expr<Symbol>,
    body: &Block<Symbol>,
    update: Option<&Expr<Symbol>>,
) -> CompilationResult {
    let begin = builder.new_label();
    let end = builder.new_label();
    let builder = cond.compile(builder.place_label(begin)?)?;
    let mut builder = body
        .compile(builder.emit(OpCode::JumpIfFalse(end)))?
        .emit(OpCode::Pop);
    if let Some(update) = update {
        builder = update.compile(builder)?.emit(OpCode::Pop);
    }
    Ok(builder
        .emit(OpCode::Jump(begin))
        .place_label(end)?
        .emit(OpCode::PushUnit))
}
