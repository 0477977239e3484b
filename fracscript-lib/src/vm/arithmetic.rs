//! Arithmetic and comparison on values. All numbers are exact rationals.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

use std::cmp::Ordering;

use crate::core::*;
use crate::vm::*;

/// applies a binary operator. Left and right are in source order
pub fn apply(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    use BinaryOp::*;
    let name: &'static str = op.into();
    Ok(match op {
        Eq => Value::Bool(left == right),
        Ne => Value::Bool(left != right),
        Lt | Gt | Le | Ge => {
            let ord = compare(name, &left, &right)?;
            Value::Bool(match op {
                Lt => ord == Ordering::Less,
                Gt => ord == Ordering::Greater,
                Le => ord != Ordering::Greater,
                _ => ord != Ordering::Less,
            })
        }
        Add => match (left, right) {
            (Value::Str(l), Value::Str(r)) => Value::Str(l + &r),
            (l, r) => {
                let (l, r) = nums(name, l, r)?;
                Value::Num(l + r)
            }
        },
        Sub => {
            let (l, r) = nums(name, left, right)?;
            Value::Num(l - r)
        }
        Mul => {
            let (l, r) = nums(name, left, right)?;
            Value::Num(l * r)
        }
        Div => {
            let (l, r) = nums(name, left, right)?;
            rt_assert!(!r.is_zero(), DivisionByZero);
            Value::Num(l / r)
        }
        FloorDiv => {
            let (l, r) = integers(name, left, right)?;
            rt_assert!(!r.is_zero(), DivisionByZero);
            Value::Num(BigRational::from_integer(l.div_floor(&r)))
        }
        Rem => {
            let (l, r) = integers(name, left, right)?;
            rt_assert!(!r.is_zero(), DivisionByZero);
            Value::Num(BigRational::from_integer(l.mod_floor(&r)))
        }
        Pow => {
            let (base, exp) = nums(name, left, right)?;
            Value::Num(power(name, base, exp)?)
        }
    })
}

pub fn negate(val: Value) -> Result<Value> {
    match val {
        Value::Num(n) => Ok(Value::Num(-n)),
        other => Err(type_mismatch("NEG", "num", &other)),
    }
}

pub fn not(val: Value) -> Result<Value> {
    match val {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(type_mismatch("NOT", "bool", &other)),
    }
}

/// numbers and strings are ordered, nothing else is
fn compare(op: &'static str, left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Num(l), Value::Num(r)) => Ok(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        (Value::Num(_), other) => Err(type_mismatch(op, "num", other)),
        (Value::Str(_), other) => Err(type_mismatch(op, "str", other)),
        (other, _) => Err(type_mismatch(op, "num or str", other)),
    }
}

fn nums(op: &'static str, left: Value, right: Value) -> Result<(BigRational, BigRational)> {
    match (left, right) {
        (Value::Num(l), Value::Num(r)) => Ok((l, r)),
        (Value::Num(_), other) | (other, _) => Err(type_mismatch(op, "num", &other)),
    }
}

/// `//` and `%` are only defined for integers, fractions are rejected instead of rounded
fn integers(op: &'static str, left: Value, right: Value) -> Result<(BigInt, BigInt)> {
    let (l, r) = nums(op, left, right)?;
    for n in [&l, &r] {
        if !n.is_integer() {
            bail!(UnsupportedOperation {
                op,
                detail: format!("{} is not an integer", Value::Num(n.clone())),
            });
        }
    }
    Ok((l.to_integer(), r.to_integer()))
}

fn power(op: &'static str, base: BigRational, exp: BigRational) -> Result<BigRational> {
    if !exp.is_integer() {
        bail!(UnsupportedOperation {
            op,
            detail: format!("exponent {} is not an integer", Value::Num(exp)),
        });
    }
    let magnitude = match exp.numer().abs().to_usize() {
        Some(m) => m,
        None => bail!(UnsupportedOperation {
            op,
            detail: format!("exponent {} is too large", Value::Num(exp)),
        }),
    };
    let res = num_traits::pow(base, magnitude);
    if exp.is_negative() {
        rt_assert!(!res.is_zero(), DivisionByZero);
        Ok(res.recip())
    } else {
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
        apply(op, l, r)
    }

    #[test]
    fn thirds_add_up_exactly() {
        let third = Value::ratio(1, 3);
        let two_thirds = run(BinaryOp::Add, third.clone(), third.clone()).unwrap();
        assert_eq!(run(BinaryOp::Add, two_thirds, third), Ok(Value::int(1)));
    }

    #[test]
    fn strings_concatenate_with_plus() {
        assert_eq!(
            run(BinaryOp::Add, Value::str("Hello"), Value::str("World")),
            Ok(Value::str("HelloWorld"))
        );
        assert_eq!(
            run(BinaryOp::Add, Value::str("a"), Value::int(1)),
            Err(RuntimeError::TypeMismatch {
                op: "+",
                expected: "num",
                found: "str"
            })
        );
    }

    #[test]
    fn floor_division_and_remainder_follow_the_divisor() {
        assert_eq!(run(BinaryOp::FloorDiv, Value::int(-7), Value::int(2)), Ok(Value::int(-4)));
        assert_eq!(run(BinaryOp::Rem, Value::int(-7), Value::int(2)), Ok(Value::int(1)));
        assert_eq!(run(BinaryOp::Rem, Value::int(7), Value::int(-2)), Ok(Value::int(-1)));
    }

    #[test]
    fn integer_only_operators_reject_fractions() {
        assert!(matches!(
            run(BinaryOp::FloorDiv, Value::ratio(1, 2), Value::int(1)),
            Err(RuntimeError::UnsupportedOperation { op: "//", .. })
        ));
        assert!(matches!(
            run(BinaryOp::Rem, Value::int(3), Value::ratio(3, 2)),
            Err(RuntimeError::UnsupportedOperation { op: "%", .. })
        ));
    }

    #[test]
    fn division_by_zero_fails() {
        for op in [BinaryOp::Div, BinaryOp::FloorDiv, BinaryOp::Rem] {
            assert_eq!(
                run(op, Value::int(1), Value::int(0)),
                Err(RuntimeError::DivisionByZero)
            );
        }
        assert_eq!(
            run(BinaryOp::Pow, Value::int(0), Value::int(-1)),
            Err(RuntimeError::DivisionByZero)
        );
    }

    #[test]
    fn powers() {
        assert_eq!(run(BinaryOp::Pow, Value::int(2), Value::int(10)), Ok(Value::int(1024)));
        assert_eq!(run(BinaryOp::Pow, Value::int(2), Value::int(-2)), Ok(Value::ratio(1, 4)));
        assert_eq!(run(BinaryOp::Pow, Value::ratio(2, 3), Value::int(0)), Ok(Value::int(1)));
        assert!(run(BinaryOp::Pow, Value::int(4), Value::ratio(1, 2)).is_err());
    }

    #[test]
    fn comparisons() {
        assert_eq!(run(BinaryOp::Lt, Value::ratio(1, 3), Value::ratio(1, 2)), Ok(Value::Bool(true)));
        assert_eq!(run(BinaryOp::Ge, Value::str("b"), Value::str("a")), Ok(Value::Bool(true)));
        assert_eq!(run(BinaryOp::Eq, Value::int(1), Value::Bool(true)), Ok(Value::Bool(false)));
        assert!(run(BinaryOp::Lt, Value::Bool(true), Value::Bool(false)).is_err());
    }

    #[test]
    fn unary_operators() {
        assert_eq!(negate(Value::ratio(1, 2)), Ok(Value::ratio(-1, 2)));
        assert_eq!(not(Value::Bool(false)), Ok(Value::Bool(true)));
        assert!(not(Value::int(0)).is_err());
    }
}
