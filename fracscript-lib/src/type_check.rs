//! An optional static check that runs on the resolved tree before compilation.
//!
//! Types are tracked per symbol. Whatever can't be known statically, like parameters or list
//! elements, is [`Type::Any`], which is compatible with everything, so the checker only rejects
//! programs that would certainly fail.

use im::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::core::*;

/// The type information for each symbol will be associated via it's id
pub type TypeIndex = HashMap<SymbolId, Type>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("{op} can't be applied to {left} and {right}")]
    Mismatch { op: String, left: Type, right: Type },

    #[error("{op} can't be applied to {found}")]
    Operand { op: String, found: Type },

    #[error("Conditions must be bool, found {found}")]
    Condition { found: Type },

    #[error("The branches of an if have different types: {then} and {otherwise}")]
    Branches { then: Type, otherwise: Type },

    #[error("{name} was declared as {declared}, but is assigned a {assigned}")]
    Reassignment {
        name: String,
        declared: Type,
        assigned: Type,
    },

    #[error("{name} takes {expected} arguments, but {found} were given")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("{name} is a {found}, which can't be called")]
    NotCallable { name: String, found: Type },
}

pub type Result<T> = std::result::Result<T, TypeError>;

pub trait TypeCheckable {
    /// returns the type of the node, and the index extended by the symbols it declares
    fn check_types(&self, type_idx: TypeIndex) -> Result<(TypeIndex, Type)>;
}

pub fn check(tree: &ResolvedTree) -> Result<TypeIndex> {
    let (type_idx, _) = tree.check_types(TypeIndex::default())?;
    debug!(symbols = type_idx.len(), "type check passed");
    Ok(type_idx)
}

impl TypeCheckable for Block<Symbol> {
    fn check_types(&self, mut type_idx: TypeIndex) -> Result<(TypeIndex, Type)> {
        let mut last = Type::Unit;
        for stmt in &self.0 {
            (type_idx, last) = stmt.check_types(type_idx)?;
        }
        Ok((type_idx, last))
    }
}

fn operand(op: impl ToString, found: &Type, accepted: &[Type]) -> Result<()> {
    if accepted.iter().any(|t| t.compatible(found)) {
        Ok(())
    } else {
        Err(TypeError::Operand {
            op: op.to_string(),
            found: found.clone(),
        })
    }
}

fn condition(found: Type) -> Result<()> {
    if found.compatible(&Type::Bool) {
        Ok(())
    } else {
        Err(TypeError::Condition { found })
    }
}

fn binary_type(op: BinaryOp, left: Type, right: Type) -> Result<Type> {
    use BinaryOp::*;
    let mismatch = |left: Type, right: Type| TypeError::Mismatch {
        op: op.to_string(),
        left,
        right,
    };
    match op {
        Eq | Ne => Ok(Type::Bool),
        Lt | Gt | Le | Ge => {
            let ordered = [Type::Num, Type::Str].iter().any(|t| t.compatible(&left));
            if ordered && left.compatible(&right) {
                Ok(Type::Bool)
            } else {
                Err(mismatch(left, right))
            }
        }
        Add => match (&left, &right) {
            (Type::Str, r) | (r, Type::Str) if r.compatible(&Type::Str) => Ok(Type::Str),
            (Type::Any, Type::Any) => Ok(Type::Any),
            (l, r) if l.compatible(&Type::Num) && r.compatible(&Type::Num) => Ok(Type::Num),
            _ => Err(mismatch(left, right)),
        },
        Sub | Mul | Div | FloorDiv | Rem | Pow => {
            if left.compatible(&Type::Num) && right.compatible(&Type::Num) {
                Ok(Type::Num)
            } else {
                Err(mismatch(left, right))
            }
        }
    }
}

fn query_type(op: QueryOp, target: &Type) -> Result<Type> {
    use QueryOp::*;
    let collections = [Type::List, Type::Map, Type::Str];
    match op {
        Head => operand(op, target, &[Type::List]).map(|_| Type::Any),
        Tail => operand(op, target, &[Type::List]).map(|_| Type::List),
        IsEmpty => operand(op, target, &collections).map(|_| Type::Bool),
        Length => operand(op, target, &collections).map(|_| Type::Num),
        Keys | Values | Items => operand(op, target, &[Type::Map]).map(|_| Type::List),
    }
}

impl TypeCheckable for Expr<Symbol> {
    fn check_types(&self, type_idx: TypeIndex) -> Result<(TypeIndex, Type)> {
        use Expr::*;
        match self {
            Literal(lit) => Ok((
                type_idx,
                match lit {
                    ast::Literal::Num(_) => Type::Num,
                    ast::Literal::Bool(_) => Type::Bool,
                    ast::Literal::Str(_) => Type::Str,
                },
            )),
            Var(symbol) => {
                let t = type_idx.get(&symbol.id).cloned().unwrap_or(Type::Any);
                Ok((type_idx, t))
            }
            Declare { name, value } => {
                let (mut type_idx, t) = value.check_types(type_idx)?;
                type_idx.insert(name.id, t.clone());
                Ok((type_idx, t))
            }
            Assign { target, value } => {
                let (mut type_idx, assigned) = value.check_types(type_idx)?;
                let declared = type_idx.get(&target.id).cloned().unwrap_or(Type::Any);
                if !declared.compatible(&assigned) {
                    return Err(TypeError::Reassignment {
                        name: target.name.clone(),
                        declared,
                        assigned,
                    });
                }
                type_idx.insert(target.id, declared.join(assigned.clone()));
                Ok((type_idx, assigned))
            }
            Let { name, value, body } => {
                let (mut type_idx, t) = value.check_types(type_idx)?;
                type_idx.insert(name.id, t);
                body.check_types(type_idx)
            }
            Unary { op, operand: inner } => {
                let (type_idx, t) = inner.check_types(type_idx)?;
                let expected = match op {
                    UnaryOp::Neg => Type::Num,
                    UnaryOp::Not => Type::Bool,
                };
                operand(op, &t, &[expected.clone()])?;
                Ok((type_idx, expected))
            }
            Binary { op, left, right } => {
                let (type_idx, l) = left.check_types(type_idx)?;
                let (type_idx, r) = right.check_types(type_idx)?;
                Ok((type_idx, binary_type(*op, l, r)?))
            }
            Logical { op, left, right } => {
                let (type_idx, l) = left.check_types(type_idx)?;
                operand(op, &l, &[Type::Bool])?;
                let (type_idx, r) = right.check_types(type_idx)?;
                operand(op, &r, &[Type::Bool])?;
                Ok((type_idx, Type::Bool))
            }
            Block(block) => block.check_types(type_idx),
            If {
                cond,
                then,
                otherwise,
            } => {
                let (type_idx, c) = cond.check_types(type_idx)?;
                condition(c)?;
                let (type_idx, then_type) = then.check_types(type_idx)?;
                let Some(otherwise) = otherwise else {
                    return Ok((type_idx, Type::Any));
                };
                let (type_idx, else_type) = otherwise.check_types(type_idx)?;
                if !then_type.compatible(&else_type) {
                    return Err(TypeError::Branches {
                        then: then_type,
                        otherwise: else_type,
                    });
                }
                Ok((type_idx, then_type.join(else_type)))
            }
            While { cond, body } => {
                let (type_idx, c) = cond.check_types(type_idx)?;
                condition(c)?;
                let (type_idx, _) = body.check_types(type_idx)?;
                Ok((type_idx, Type::Unit))
            }
            For {
                iterator,
                init,
                cond,
                update,
                body,
            } => {
                let (mut type_idx, t) = init.check_types(type_idx)?;
                type_idx.insert(iterator.id, t);
                let (type_idx, c) = cond.check_types(type_idx)?;
                condition(c)?;
                let (type_idx, _) = body.check_types(type_idx)?;
                let (type_idx, _) = update.check_types(type_idx)?;
                Ok((type_idx, Type::Unit))
            }
            Print(args) => {
                let type_idx = check_all(args, type_idx)?;
                Ok((type_idx, Type::Str))
            }
            List(elems) => Ok((check_all(elems, type_idx)?, Type::List)),
            ListFill { value, count } => {
                let (type_idx, _) = value.check_types(type_idx)?;
                let (type_idx, n) = count.check_types(type_idx)?;
                operand("list fill", &n, &[Type::Num])?;
                Ok((type_idx, Type::List))
            }
            Map(entries) => {
                let mut type_idx = type_idx;
                for (k, v) in entries {
                    (type_idx, _) = k.check_types(type_idx)?;
                    (type_idx, _) = v.check_types(type_idx)?;
                }
                Ok((type_idx, Type::Map))
            }
            Query { op, target } => {
                let (type_idx, t) = target.check_types(type_idx)?;
                Ok((type_idx, query_type(*op, &t)?))
            }
            Update { op, target, arg } => {
                let (type_idx, t) = target.check_types(type_idx)?;
                let (type_idx, _) = arg.check_types(type_idx)?;
                match op {
                    UpdateOp::Cons | UpdateOp::Append => {
                        operand(op, &t, &[Type::List])?;
                        Ok((type_idx, Type::List))
                    }
                    UpdateOp::Delete => {
                        operand(op, &t, &[Type::List, Type::Map])?;
                        Ok((type_idx, t))
                    }
                }
            }
            Index { target, key } => {
                let (type_idx, t) = target.check_types(type_idx)?;
                let (type_idx, _) = key.check_types(type_idx)?;
                operand("index", &t, &[Type::List, Type::Map, Type::Str])?;
                let res = if t == Type::Str { Type::Str } else { Type::Any };
                Ok((type_idx, res))
            }
            Put { target, key, value } => {
                let (type_idx, t) = target.check_types(type_idx)?;
                let (type_idx, _) = key.check_types(type_idx)?;
                let (type_idx, _) = value.check_types(type_idx)?;
                operand("put", &t, &[Type::List, Type::Map])?;
                Ok((type_idx, t))
            }
            Concat(parts) => {
                let mut type_idx = type_idx;
                for part in parts {
                    let (idx, t) = part.check_types(type_idx)?;
                    type_idx = idx;
                    operand("++", &t, &[Type::Str])?;
                }
                Ok((type_idx, Type::Str))
            }
            Slice {
                target,
                start,
                stop,
                step,
            } => {
                let (mut type_idx, t) = target.check_types(type_idx)?;
                operand("slice", &t, &[Type::Str])?;
                for bound in [Some(start), Some(stop), step.as_ref()].into_iter().flatten() {
                    let (idx, b) = bound.check_types(type_idx)?;
                    type_idx = idx;
                    operand("slice", &b, &[Type::Num])?;
                }
                Ok((type_idx, Type::Str))
            }
            Function {
                name,
                params,
                body,
                ret,
            } => {
                let arity = params.len();
                let mut inner_idx = type_idx.clone();
                // recursive calls see the arity, but not yet the return type
                inner_idx.insert(
                    name.id,
                    Type::Function {
                        arity,
                        ret: Box::new(Type::Any),
                    },
                );
                for p in params {
                    inner_idx.insert(p.id, Type::Any);
                }
                let (inner_idx, _) = body.check_types(inner_idx)?;
                let (_, ret_type) = ret.check_types(inner_idx)?;
                let t = Type::Function {
                    arity,
                    ret: Box::new(ret_type),
                };
                let mut type_idx = type_idx;
                type_idx.insert(name.id, t.clone());
                Ok((type_idx, t))
            }
            Call { callee, args } => {
                let type_idx = check_all(args, type_idx)?;
                match type_idx.get(&callee.id).cloned().unwrap_or(Type::Any) {
                    Type::Function { arity, ret } if arity == args.len() => Ok((type_idx, *ret)),
                    Type::Function { arity, .. } => Err(TypeError::Arity {
                        name: callee.name.clone(),
                        expected: arity,
                        found: args.len(),
                    }),
                    Type::Any => Ok((type_idx, Type::Any)),
                    found => Err(TypeError::NotCallable {
                        name: callee.name.clone(),
                        found,
                    }),
                }
            }
        }
    }
}

fn check_all(exprs: &[Expr<Symbol>], mut type_idx: TypeIndex) -> Result<TypeIndex> {
    for e in exprs {
        (type_idx, _) = e.check_types(type_idx)?;
    }
    Ok(type_idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse, resolver::resolve};

    fn check_src(src: &str) -> Result<TypeIndex> {
        check(&resolve(parse(src).unwrap()).unwrap())
    }

    #[test]
    fn well_typed_programs_pass() {
        let idx = check_src(
            r#"
            var x = 1 / 3
            var s = "a" + "b"
            var l = [1, 2].append(3)
            def f(a, b) { return a * b; }
            var y = f(x, 2)
            if (x < 1) { "small" } else { "large" }
            "#,
        )
        .unwrap();
        assert_eq!(idx.get(&SymbolId(0)), Some(&Type::Num));
        assert_eq!(idx.get(&SymbolId(1)), Some(&Type::Str));
        assert_eq!(idx.get(&SymbolId(2)), Some(&Type::List));
    }

    #[test]
    fn operand_mismatches_are_rejected() {
        assert!(matches!(
            check_src(r#"1 + "a""#),
            Err(TypeError::Mismatch { op, .. }) if op == "+"
        ));
        assert!(matches!(
            check_src("-true"),
            Err(TypeError::Operand { .. })
        ));
        assert!(matches!(
            check_src(r#""a" ++ 1"#),
            Err(TypeError::Operand { op, .. }) if op == "++"
        ));
        assert!(matches!(
            check_src("5.head"),
            Err(TypeError::Operand { op, .. }) if op == "head"
        ));
    }

    #[test]
    fn conditions_must_be_bool() {
        assert_eq!(
            check_src("while (1) { }"),
            Err(TypeError::Condition { found: Type::Num })
        );
    }

    #[test]
    fn branches_must_agree() {
        assert_eq!(
            check_src(r#"if (true) { 1 } else { "one" }"#),
            Err(TypeError::Branches {
                then: Type::Num,
                otherwise: Type::Str
            })
        );
        assert!(check_src(r#"if (true) { 1 }"#).is_ok());
    }

    #[test]
    fn variables_keep_their_type() {
        assert_eq!(
            check_src(r#"var x = 1; x = "s""#),
            Err(TypeError::Reassignment {
                name: "x".into(),
                declared: Type::Num,
                assigned: Type::Str
            })
        );
    }

    #[test]
    fn calls_are_checked() {
        assert_eq!(
            check_src("def f(a) { return a; } f(1, 2)"),
            Err(TypeError::Arity {
                name: "f".into(),
                expected: 1,
                found: 2
            })
        );
        assert_eq!(
            check_src("var x = 1; x()"),
            Err(TypeError::NotCallable {
                name: "x".into(),
                found: Type::Num
            })
        );
        assert!(check_src("def fact(n) { return if (n < 2) { 1 } else { n * fact(n - 1) }; } fact(5)").is_ok());
    }
}
