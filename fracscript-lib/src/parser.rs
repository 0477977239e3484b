//! Turns source text into a [`SyntaxTree`]. The grammar lives in `grammar.pest`, this module
//! lowers the resulting pairs into the AST.

use num_bigint::BigInt;
use num_rational::BigRational;
use pest::error::{Error, ErrorVariant};
use pest::{Parser, Position, Span};
use pest_derive::Parser;
use tracing::debug;

use crate::core::*;
use crate::utils;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct FracParser;

pub type ParseError = Error<Rule>;
pub type ParseResult<T> = Result<T, ParseError>;

pub type Pair<'a> = pest::iterators::Pair<'a, Rule>;
pub type Pairs<'a> = pest::iterators::Pairs<'a, Rule>;

type SyntaxExpr = Expr<String>;

pub fn parse(src: &str) -> ParseResult<SyntaxTree> {
    let file = get_single_pair(FracParser::parse(Rule::file, src)?, src)?;
    let span = file.as_span();
    let mut children = file.into_inner();
    let res = parse_statements(expect_next(&mut children, span)?)?;
    debug!(statements = res.0.len(), "parsed");
    Ok(res)
}

fn custom_error(span: Span, msg: impl Into<String>) -> ParseError {
    Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.into(),
        },
        span,
    )
}

fn get_single_pair<'a>(mut pairs: Pairs<'a>, src: &'a str) -> ParseResult<Pair<'a>> {
    pairs.next().ok_or_else(|| {
        Error::new_from_pos(
            ErrorVariant::CustomError {
                message: "empty parse".into(),
            },
            Position::from_start(src),
        )
    })
}

fn expect_next<'a>(pairs: &mut Pairs<'a>, parent: Span<'a>) -> ParseResult<Pair<'a>> {
    pairs
        .next()
        .ok_or_else(|| custom_error(parent, "incomplete syntax node"))
}

fn get_single_child(pair: Pair) -> ParseResult<Pair> {
    let span = pair.as_span();
    let mut children = pair.into_inner();
    match (children.next(), children.next()) {
        (Some(child), None) => Ok(child),
        _ => Err(custom_error(span, "expected exactly one child")),
    }
}

fn parse_statements(pair: Pair) -> ParseResult<SyntaxTree> {
    Ok(Block(utils::sequence_result(
        pair.into_inner().map(parse_statement),
    )?))
}

fn parse_block(pair: Pair) -> ParseResult<SyntaxTree> {
    parse_statements(get_single_child(pair)?)
}

fn parse_ident(pair: Pair) -> String {
    pair.as_str().to_string()
}

fn parse_statement(pair: Pair) -> ParseResult<SyntaxExpr> {
    let pair = match pair.as_rule() {
        Rule::statement | Rule::for_update => get_single_child(pair)?,
        _ => pair,
    };
    let span = pair.as_span();
    let rule = pair.as_rule();
    let mut children = pair.clone().into_inner();
    let mut next = || expect_next(&mut children, span);
    Ok(match rule {
        Rule::declaration => Expr::Declare {
            name: parse_ident(next()?),
            value: parse_expression(next()?)?.boxed(),
        },
        Rule::assignment => Expr::Assign {
            target: parse_ident(next()?),
            value: parse_expression(next()?)?.boxed(),
        },
        Rule::put => parse_put(pair)?,
        Rule::block => Expr::Block(parse_block(pair)?),
        Rule::while_loop => Expr::While {
            cond: parse_expression(next()?)?.boxed(),
            body: parse_block(next()?)?,
        },
        Rule::for_loop => Expr::For {
            iterator: parse_ident(next()?),
            init: parse_expression(next()?)?.boxed(),
            cond: parse_expression(next()?)?.boxed(),
            update: parse_statement(next()?)?.boxed(),
            body: parse_block(next()?)?,
        },
        Rule::function_def => parse_function(pair)?,
        _ => parse_expression(pair)?,
    })
}

/// `x[a][b] = v` puts `v` at key `b` of `x[a]`
fn parse_put(pair: Pair) -> ParseResult<SyntaxExpr> {
    let span = pair.as_span();
    let mut children: Vec<Pair> = pair.into_inner().collect();
    let value = children.pop();
    let (name, value) = match (children.first(), value) {
        (Some(name), Some(value)) if children.len() >= 2 => (parse_ident(name.clone()), value),
        _ => return Err(custom_error(span, "incomplete put")),
    };
    let mut keys = utils::sequence_result(
        children[1..]
            .iter()
            .map(|idx| parse_expression(get_single_child(idx.clone())?)),
    )?;
    let key = match keys.pop() {
        Some(key) => key,
        None => return Err(custom_error(span, "put without index")),
    };
    let target = keys
        .into_iter()
        .fold(Expr::Var(name), |target, key| Expr::Index {
            target: target.boxed(),
            key: key.boxed(),
        });
    Ok(Expr::Put {
        target: target.boxed(),
        key: key.boxed(),
        value: parse_expression(value)?.boxed(),
    })
}

fn parse_function(pair: Pair) -> ParseResult<SyntaxExpr> {
    let span = pair.as_span();
    let mut children = pair.into_inner();
    let name = parse_ident(expect_next(&mut children, span)?);
    let params = expect_next(&mut children, span)?
        .into_inner()
        .map(parse_ident)
        .collect();
    let mut body = vec![];
    let mut ret = Expr::Block(Block::default());
    for stmt in expect_next(&mut children, span)?.into_inner() {
        match stmt.as_rule() {
            Rule::return_stmt => ret = parse_expression(get_single_child(stmt)?)?,
            _ => body.push(parse_statement(stmt)?),
        }
    }
    Ok(Expr::Function {
        name,
        params,
        body: Block(body),
        ret: ret.boxed(),
    })
}

/// parses `first (op next)*` and combines it left associatively
fn parse_chain<'a, O>(
    pair: Pair<'a>,
    parse_op: impl Fn(Pair<'a>) -> ParseResult<O>,
    combine: impl FnMut(SyntaxExpr, O, SyntaxExpr) -> SyntaxExpr,
) -> ParseResult<SyntaxExpr> {
    let span = pair.as_span();
    let mut children = pair.into_inner();
    let first = parse_expression(expect_next(&mut children, span)?)?;
    let rest = std::iter::from_fn(|| {
        let op = children.next()?;
        Some(expect_next(&mut children, span).and_then(|rhs| {
            Ok((parse_op(op)?, parse_expression(rhs)?))
        }))
    });
    utils::fold_left(first, rest, combine)
}

fn binary(left: SyntaxExpr, op: BinaryOp, right: SyntaxExpr) -> SyntaxExpr {
    Expr::Binary {
        op,
        left: left.boxed(),
        right: right.boxed(),
    }
}

fn logical(left: SyntaxExpr, op: LogicalOp, right: SyntaxExpr) -> SyntaxExpr {
    Expr::Logical {
        op,
        left: left.boxed(),
        right: right.boxed(),
    }
}

fn parse_binary_op(pair: Pair) -> ParseResult<BinaryOp> {
    use BinaryOp::*;
    Ok(match pair.as_str() {
        "+" => Add,
        "-" => Sub,
        "*" => Mul,
        "/" => Div,
        "//" => FloorDiv,
        "%" => Rem,
        "^" | "**" => Pow,
        "==" => Eq,
        "!=" => Ne,
        "<" => Lt,
        ">" => Gt,
        "<=" => Le,
        ">=" => Ge,
        other => return Err(custom_error(pair.as_span(), format!("unknown operator {}", other))),
    })
}

fn parse_logical_op(pair: Pair) -> ParseResult<LogicalOp> {
    Ok(match pair.as_rule() {
        Rule::and_op => LogicalOp::And,
        _ => LogicalOp::Or,
    })
}

fn parse_args(pair: Pair) -> ParseResult<Vec<SyntaxExpr>> {
    utils::sequence_result(pair.into_inner().map(parse_expression))
}

fn parse_expression(pair: Pair) -> ParseResult<SyntaxExpr> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::expression | Rule::primary => parse_expression(get_single_child(pair)?),
        Rule::or_expr | Rule::and_expr => parse_chain(pair, parse_logical_op, logical),
        Rule::equality | Rule::comparison | Rule::sum | Rule::product => {
            parse_chain(pair, parse_binary_op, binary)
        }
        Rule::concat => {
            let mut parts = utils::sequence_result(pair.into_inner().map(parse_expression))?;
            match parts.len() {
                1 => parts.pop().ok_or_else(|| custom_error(span, "empty concatenation")),
                _ => Ok(Expr::Concat(parts)),
            }
        }
        Rule::unary => parse_unary(pair),
        Rule::power => {
            let mut children = pair.into_inner();
            let base = parse_expression(expect_next(&mut children, span)?)?;
            match children.next() {
                Some(_) => {
                    let exp = parse_expression(expect_next(&mut children, span)?)?;
                    Ok(binary(base, BinaryOp::Pow, exp))
                }
                None => Ok(base),
            }
        }
        Rule::postfix => {
            let mut children = pair.into_inner();
            let primary = parse_expression(expect_next(&mut children, span)?)?;
            children.try_fold(primary, parse_suffix)
        }
        Rule::number => parse_number(pair).map(|n| Expr::Literal(Literal::Num(n))),
        Rule::string => parse_string(get_single_child(pair)?).map(|s| Expr::Literal(Literal::Str(s))),
        Rule::boolean => Ok(Expr::Literal(Literal::Bool(pair.as_str() == "true"))),
        Rule::ident => Ok(Expr::Var(parse_ident(pair))),
        Rule::list => Ok(Expr::List(parse_args(pair)?)),
        Rule::list_fill => {
            let mut children = pair.into_inner();
            Ok(Expr::ListFill {
                value: parse_expression(expect_next(&mut children, span)?)?.boxed(),
                count: parse_expression(expect_next(&mut children, span)?)?.boxed(),
            })
        }
        Rule::map => {
            let entries = pair.into_inner().map(|entry| -> ParseResult<_> {
                let span = entry.as_span();
                let mut kv = entry.into_inner();
                Ok((
                    parse_expression(expect_next(&mut kv, span)?)?,
                    parse_expression(expect_next(&mut kv, span)?)?,
                ))
            });
            Ok(Expr::Map(utils::sequence_result(entries)?))
        }
        Rule::print_call => Ok(Expr::Print(parse_args(get_single_child(pair)?)?)),
        Rule::call => {
            let mut children = pair.into_inner();
            Ok(Expr::Call {
                callee: parse_ident(expect_next(&mut children, span)?),
                args: parse_args(expect_next(&mut children, span)?)?,
            })
        }
        Rule::if_expr => parse_if(pair),
        Rule::let_expr => {
            let mut children = pair.into_inner();
            Ok(Expr::Let {
                name: parse_ident(expect_next(&mut children, span)?),
                value: parse_expression(expect_next(&mut children, span)?)?.boxed(),
                body: parse_expression(expect_next(&mut children, span)?)?.boxed(),
            })
        }
        other => Err(custom_error(span, format!("unexpected {:?}", other))),
    }
}

fn parse_unary(pair: Pair) -> ParseResult<SyntaxExpr> {
    let span = pair.as_span();
    let mut ops = vec![];
    let mut operand = None;
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::unary_op if child.as_str() == "-" => ops.push(UnaryOp::Neg),
            Rule::unary_op => ops.push(UnaryOp::Not),
            _ => operand = Some(parse_expression(child)?),
        }
    }
    let operand = operand.ok_or_else(|| custom_error(span, "missing operand"))?;
    Ok(ops.into_iter().rev().fold(operand, |operand, op| Expr::Unary {
        op,
        operand: operand.boxed(),
    }))
}

fn parse_if(pair: Pair) -> ParseResult<SyntaxExpr> {
    let span = pair.as_span();
    let mut children = pair.into_inner();
    let cond = parse_expression(expect_next(&mut children, span)?)?;
    let then = parse_block(expect_next(&mut children, span)?)?;
    let otherwise = match children.next() {
        Some(p) if p.as_rule() == Rule::if_expr => Some(Block(vec![parse_if(p)?])),
        Some(p) => Some(parse_block(p)?),
        None => None,
    };
    Ok(Expr::If {
        cond: cond.boxed(),
        then,
        otherwise,
    })
}

fn parse_suffix(target: SyntaxExpr, pair: Pair) -> ParseResult<SyntaxExpr> {
    let pair = get_single_child(pair)?;
    let span = pair.as_span();
    let rule = pair.as_rule();
    let mut children = pair.into_inner();
    Ok(match rule {
        Rule::index => Expr::Index {
            target: target.boxed(),
            key: parse_expression(expect_next(&mut children, span)?)?.boxed(),
        },
        Rule::slice => Expr::Slice {
            target: target.boxed(),
            start: parse_expression(expect_next(&mut children, span)?)?.boxed(),
            stop: parse_expression(expect_next(&mut children, span)?)?.boxed(),
            step: children
                .next()
                .map(parse_expression)
                .transpose()?
                .map(Expr::boxed),
        },
        _ => {
            let name = parse_ident(expect_next(&mut children, span)?);
            let args = children.next().map(parse_args).transpose()?;
            parse_method(span, target, &name, args)?
        }
    })
}

fn parse_method(
    span: Span,
    target: SyntaxExpr,
    name: &str,
    args: Option<Vec<SyntaxExpr>>,
) -> ParseResult<SyntaxExpr> {
    let query = match name {
        "head" => Some(QueryOp::Head),
        "tail" => Some(QueryOp::Tail),
        "empty" => Some(QueryOp::IsEmpty),
        "keys" => Some(QueryOp::Keys),
        "values" => Some(QueryOp::Values),
        "items" => Some(QueryOp::Items),
        "length" => Some(QueryOp::Length),
        _ => None,
    };
    if let Some(op) = query {
        if args.map_or(false, |a| !a.is_empty()) {
            return Err(custom_error(span, format!(".{} takes no arguments", name)));
        }
        return Ok(Expr::Query {
            op,
            target: target.boxed(),
        });
    }
    let op = match name {
        "cons" => UpdateOp::Cons,
        "append" => UpdateOp::Append,
        "delete" => UpdateOp::Delete,
        _ => return Err(custom_error(span, format!("unknown method .{}", name))),
    };
    match args {
        Some(mut args) if args.len() == 1 => Ok(Expr::Update {
            op,
            target: target.boxed(),
            arg: args.remove(0).boxed(),
        }),
        _ => Err(custom_error(span, format!(".{} takes exactly one argument", name))),
    }
}

/// numbers are read exactly, `0.1` is one tenth
fn parse_number(pair: Pair) -> ParseResult<BigRational> {
    let text = pair.as_str();
    let (int, frac) = text.split_once('.').unwrap_or((text, ""));
    let digits = format!("{}{}", int, frac);
    let numer: BigInt = digits
        .parse()
        .map_err(|_| custom_error(pair.as_span(), format!("invalid number {}", text)))?;
    let denom = num_traits::pow(BigInt::from(10), frac.len());
    Ok(BigRational::new(numer, denom))
}

fn parse_string(pair: Pair) -> ParseResult<String> {
    let mut res = String::new();
    let mut chars = pair.as_str().chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            res.push(c);
            continue;
        }
        res.push(match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('"') => '"',
            Some('\\') => '\\',
            other => {
                return Err(custom_error(
                    pair.as_span(),
                    format!("unknown escape sequence \\{}", other.unwrap_or(' ')),
                ))
            }
        });
    }
    Ok(res)
}
