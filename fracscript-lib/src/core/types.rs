//! Static types, as seen by the type checker

use derive_more::Display;

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    #[display(fmt = "num")]
    Num,
    #[display(fmt = "bool")]
    Bool,
    #[display(fmt = "str")]
    Str,
    #[display(fmt = "unit")]
    Unit,
    #[display(fmt = "list")]
    List,
    #[display(fmt = "map")]
    Map,
    #[display(fmt = "fn/{} -> {}", arity, ret)]
    Function { arity: usize, ret: Box<Type> },
    /// unknown at compile time, compatible with everything
    #[display(fmt = "any")]
    Any,
}

impl Type {
    /// Any is compatible with every type, everything else only with itself. Functions are
    /// compatible when their arities match.
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Function { arity: a, .. }, Type::Function { arity: b, .. }) => a == b,
            (a, b) => a == b,
        }
    }

    /// the more specific of two compatible types
    pub fn join(self, other: Type) -> Type {
        if self == Type::Any {
            other
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_display_like_source_names() {
        assert_eq!(Type::Num.to_string(), "num");
        let f = Type::Function {
            arity: 2,
            ret: Box::new(Type::Str),
        };
        assert_eq!(f.to_string(), "fn/2 -> str");
    }

    #[test]
    fn any_is_compatible_and_joins_away() {
        assert!(Type::Any.compatible(&Type::List));
        assert!(!Type::Num.compatible(&Type::Str));
        assert_eq!(Type::Any.join(Type::Map), Type::Map);
    }
}
