//! Name resolution.
//!
//! Walks the syntax tree once and replaces every name by a [`Symbol`]. Every declaration gets a
//! fresh [`SymbolId`], references get the id of the innermost declaration with that name.
//! Since the VM stores values by id, shadowed variables automatically get their own storage.
//!
//! Functions can't capture the locals of an enclosing function, the VM has no closures. The
//! only exception is the function's own name. Top level variables are visible everywhere after
//! their declaration.

use thiserror::Error;
use tracing::debug;

use crate::core::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{name} was already declared in this scope")]
    DuplicateDeclaration { name: String },

    #[error("Unbound name: {name}")]
    UnboundName { name: String },

    #[error("Unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String },
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// What a name is bound to
#[derive(Debug, Clone)]
struct Binding {
    symbol: Symbol,
    /// the function whose frame will hold the value, None for top level symbols
    owner: Option<SymbolId>,
}

#[derive(Debug, Default)]
pub struct Resolver {
    scopes: Scopes<String, Binding>,
    next_id: usize,
    /// the functions that are currently being resolved, innermost last
    functions: Vec<Symbol>,
}

/// resolves a whole program
pub fn resolve(tree: SyntaxTree) -> ResolveResult<ResolvedTree> {
    let mut resolver = Resolver::default();
    let res = resolver.resolve_program(tree)?;
    debug!(symbols = resolver.symbol_count(), "resolved program");
    Ok(res)
}

impl Resolver {
    /// number of symbols created so far
    pub fn symbol_count(&self) -> usize {
        self.next_id
    }

    /// resolves the statements of a program in the global scope
    pub fn resolve_program(&mut self, Block(stmts): SyntaxTree) -> ResolveResult<ResolvedTree> {
        self.resolve_statements(stmts).map(Block)
    }

    fn current_owner(&self) -> Option<SymbolId> {
        self.functions.last().map(|f| f.id)
    }

    fn declare(&mut self, name: String) -> ResolveResult<Symbol> {
        if self.scopes.innermost_contains(&name) {
            return Err(ResolveError::DuplicateDeclaration { name });
        }
        let symbol = Symbol {
            name: name.clone(),
            id: SymbolId(self.next_id),
        };
        self.next_id += 1;
        let binding = Binding {
            symbol: symbol.clone(),
            owner: self.current_owner(),
        };
        self.scopes.add_entry(name, binding);
        Ok(symbol)
    }

    fn reference(&self, name: String) -> ResolveResult<Symbol> {
        let binding = match self.scopes.find_entry(&name) {
            Some(b) => b,
            None => return Err(ResolveError::UnboundName { name }),
        };
        match (binding.owner, self.functions.last()) {
            // a function can always refer to itself, the call stores it in the new frame
            (Some(owner), Some(current))
                if owner != current.id && binding.symbol.id != current.id =>
            {
                Err(ResolveError::UnsupportedConstruct {
                    construct: format!(
                        "function {} refers to {}, which is local to another function",
                        current.name, name
                    ),
                })
            }
            _ => Ok(binding.symbol.clone()),
        }
    }

    /// runs f in a freshly opened scope, which is closed again afterwards, even on errors
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> ResolveResult<T>) -> ResolveResult<T> {
        self.scopes.open_new();
        let res = f(self);
        self.scopes.collapse_innermost();
        res
    }

    fn resolve_statements(&mut self, stmts: Vec<Expr<String>>) -> ResolveResult<Vec<Expr<Symbol>>> {
        stmts.into_iter().map(|s| self.resolve_expr(s)).collect()
    }

    fn resolve_block(&mut self, Block(stmts): Block<String>) -> ResolveResult<Block<Symbol>> {
        self.scoped(|r| r.resolve_statements(stmts).map(Block))
    }

    fn resolve_boxed(&mut self, expr: Box<Expr<String>>) -> ResolveResult<Box<Expr<Symbol>>> {
        self.resolve_expr(*expr).map(Box::new)
    }

    pub fn resolve_expr(&mut self, expr: Expr<String>) -> ResolveResult<Expr<Symbol>> {
        use Expr::*;
        Ok(match expr {
            Literal(lit) => Literal(lit),
            Var(name) => Var(self.reference(name)?),
            Declare { name, value } => {
                // the value can't see the name that is being declared
                let value = self.resolve_boxed(value)?;
                Declare {
                    name: self.declare(name)?,
                    value,
                }
            }
            Assign { target, value } => Assign {
                value: self.resolve_boxed(value)?,
                target: self.reference(target)?,
            },
            Let { name, value, body } => {
                let value = self.resolve_boxed(value)?;
                self.scoped(|r| {
                    let name = r.declare(name)?;
                    Ok(Let {
                        name,
                        value,
                        body: r.resolve_boxed(body)?,
                    })
                })?
            }
            Unary { op, operand } => Unary {
                op,
                operand: self.resolve_boxed(operand)?,
            },
            Binary { op, left, right } => Binary {
                op,
                left: self.resolve_boxed(left)?,
                right: self.resolve_boxed(right)?,
            },
            Logical { op, left, right } => Logical {
                op,
                left: self.resolve_boxed(left)?,
                right: self.resolve_boxed(right)?,
            },
            Block(block) => Block(self.resolve_block(block)?),
            If {
                cond,
                then,
                otherwise,
            } => If {
                cond: self.resolve_boxed(cond)?,
                then: self.resolve_block(then)?,
                otherwise: otherwise.map(|b| self.resolve_block(b)).transpose()?,
            },
            While { cond, body } => While {
                cond: self.resolve_boxed(cond)?,
                body: self.resolve_block(body)?,
            },
            For {
                iterator,
                init,
                cond,
                update,
                body,
            } => self.scoped(|r| {
                let init = r.resolve_boxed(init)?;
                let iterator = r.declare(iterator)?;
                Ok(For {
                    iterator,
                    init,
                    cond: r.resolve_boxed(cond)?,
                    update: r.resolve_boxed(update)?,
                    body: r.resolve_block(body)?,
                })
            })?,
            Print(args) => Print(self.resolve_statements(args)?),
            List(elems) => List(self.resolve_statements(elems)?),
            ListFill { value, count } => ListFill {
                value: self.resolve_boxed(value)?,
                count: self.resolve_boxed(count)?,
            },
            Map(entries) => Map(entries
                .into_iter()
                .map(|(k, v)| Ok((self.resolve_expr(k)?, self.resolve_expr(v)?)))
                .collect::<ResolveResult<_>>()?),
            Query { op, target } => Query {
                op,
                target: self.resolve_boxed(target)?,
            },
            Update { op, target, arg } => Update {
                op,
                target: self.resolve_boxed(target)?,
                arg: self.resolve_boxed(arg)?,
            },
            Index { target, key } => Index {
                target: self.resolve_boxed(target)?,
                key: self.resolve_boxed(key)?,
            },
            Put { target, key, value } => Put {
                target: self.resolve_boxed(target)?,
                key: self.resolve_boxed(key)?,
                value: self.resolve_boxed(value)?,
            },
            Concat(parts) => Concat(self.resolve_statements(parts)?),
            Slice {
                target,
                start,
                stop,
                step,
            } => Slice {
                target: self.resolve_boxed(target)?,
                start: self.resolve_boxed(start)?,
                stop: self.resolve_boxed(stop)?,
                step: step.map(|s| self.resolve_boxed(s)).transpose()?,
            },
            Function {
                name,
                params,
                body: ast::Block(stmts),
                ret,
            } => {
                // bound before the body is resolved, so the function can call itself
                let name = self.declare(name)?;
                self.functions.push(name.clone());
                let res = self.scoped(|r| {
                    let params = params
                        .into_iter()
                        .map(|p| r.declare(p))
                        .collect::<ResolveResult<Vec<_>>>()?;
                    let body = r.resolve_statements(stmts)?;
                    let ret = r.resolve_boxed(ret)?;
                    Ok((params, body, ret))
                });
                self.functions.pop();
                let (params, body, ret) = res?;
                Function {
                    name,
                    params,
                    body: ast::Block(body),
                    ret,
                }
            }
            Call { callee, args } => Call {
                callee: self.reference(callee)?,
                args: self.resolve_statements(args)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn resolve_src(src: &str) -> ResolveResult<ResolvedTree> {
        resolve(parse(src).expect("test source must parse"))
    }

    fn declared_ids(block: &ResolvedTree) -> Vec<SymbolId> {
        block
            .0
            .iter()
            .filter_map(|e| match e {
                Expr::Declare { name, .. } => Some(name.id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn declarations_get_distinct_ids() {
        let tree = resolve_src("var x = 1; var y = 2; var z = x + y;").unwrap();
        let ids = declared_ids(&tree);
        assert_eq!(ids, vec![SymbolId(0), SymbolId(1), SymbolId(2)]);
    }

    #[test]
    fn references_get_the_declaration_id() {
        let tree = resolve_src("var x = 1; x = x + 1;").unwrap();
        match &tree.0[1] {
            Expr::Assign { target, value } => {
                assert_eq!(target.id, SymbolId(0));
                assert!(matches!(
                    value.as_ref(),
                    Expr::Binary { left, .. } if **left == Expr::Var(target.clone())
                ));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_in_same_scope_fails() {
        assert_eq!(
            resolve_src("var x = 1; var x = 2;"),
            Err(ResolveError::DuplicateDeclaration { name: "x".into() })
        );
    }

    #[test]
    fn shadowing_gets_a_new_id() {
        let tree = resolve_src("var x = 1; { var x = 2; x }").unwrap();
        let Expr::Block(Block(inner)) = &tree.0[1] else {
            panic!("expected block")
        };
        let Expr::Declare { name, .. } = &inner[0] else {
            panic!("expected declaration")
        };
        assert_eq!(name.id, SymbolId(1));
        assert_eq!(inner[1], Expr::Var(name.clone()));
    }

    #[test]
    fn unbound_names_fail() {
        assert_eq!(
            resolve_src("y + 1"),
            Err(ResolveError::UnboundName { name: "y".into() })
        );
    }

    #[test]
    fn block_scopes_close() {
        assert_eq!(
            resolve_src("{ var inner = 1; } inner"),
            Err(ResolveError::UnboundName {
                name: "inner".into()
            })
        );
    }

    #[test]
    fn for_iterator_does_not_leak() {
        assert!(resolve_src("for (i = 0; i < 3; i = i + 1) { print(i); }").is_ok());
        assert_eq!(
            resolve_src("for (i = 0; i < 3; i = i + 1) { } i"),
            Err(ResolveError::UnboundName { name: "i".into() })
        );
    }

    #[test]
    fn functions_can_recurse_and_shadow_params() {
        assert!(resolve_src("def f(n) { return f(n - 1); } f(1)").is_ok());
        assert!(resolve_src("var a = 1; def f(a) { return a; }").is_ok());
        assert_eq!(
            resolve_src("def f(a, a) { return a; }"),
            Err(ResolveError::DuplicateDeclaration { name: "a".into() })
        );
    }

    #[test]
    fn params_are_not_visible_after_the_function() {
        assert_eq!(
            resolve_src("def f(a) { return a; } a"),
            Err(ResolveError::UnboundName { name: "a".into() })
        );
    }

    #[test]
    fn capturing_locals_of_other_functions_is_rejected() {
        let res = resolve_src("def outer(a) { def inner(b) { return a + b; } return inner(1); }");
        assert!(matches!(
            res,
            Err(ResolveError::UnsupportedConstruct { .. })
        ));
        assert!(resolve_src("var g = 1; def f(b) { return g + b; }").is_ok());
    }

    #[test]
    fn nested_functions_can_recurse() {
        let src = "def outer(n) { def count(k) { return count(k - 1); } return count(n); }";
        assert!(resolve_src(src).is_ok());
        let sibling = "def outer(n) { def a() { return 1; } def b() { return a(); } return b(); }";
        assert!(matches!(
            resolve_src(sibling),
            Err(ResolveError::UnsupportedConstruct { .. })
        ));
    }
}
