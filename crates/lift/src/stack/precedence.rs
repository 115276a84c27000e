use cinder_bytecode::opcode::OpCode;
use cinder_hir::types::LogicalOp;

/// Operator precedence levels (higher = binds tighter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Precedence(pub u8);

impl Precedence {
    pub const OR: Self = Precedence(1);
    pub const AND: Self = Precedence(2);
    pub const COMPARE: Self = Precedence(3);
    pub const CONCAT: Self = Precedence(4);
    pub const ADD: Self = Precedence(5);
    pub const MUL: Self = Precedence(6);
    pub const UNARY: Self = Precedence(7);
    pub const POW: Self = Precedence(8);

    pub const POSTFIX: Self = Precedence(10);
    /// Names, literals, calls: never need parens.
    pub const ATOM: Self = Precedence(20);
}

/// Precedence of a rendered condition, from its outermost combinator.
pub fn logical_precedence(token: Option<LogicalOp>) -> Precedence {
    match token {
        Some(LogicalOp::Or) => Precedence::OR,
        Some(LogicalOp::And) => Precedence::AND,
        None => Precedence::COMPARE,
    }
}

/// Token and precedence of an arithmetic opcode.
pub(super) fn arith_operator(op: OpCode) -> Option<(&'static str, Precedence)> {
    match op {
        OpCode::Add => Some(("+", Precedence::ADD)),
        OpCode::Sub => Some(("-", Precedence::ADD)),
        OpCode::Mul => Some(("*", Precedence::MUL)),
        OpCode::Div => Some(("/", Precedence::MUL)),
        OpCode::Mod => Some(("%", Precedence::MUL)),
        OpCode::Pow => Some(("^", Precedence::POW)),
        _ => None,
    }
}

/// `^` and `..` associate to the right.
pub(super) fn is_right_assoc(prec: Precedence) -> bool {
    prec == Precedence::POW || prec == Precedence::CONCAT
}

/// Parenthesize `text` when it binds looser than `min`.
pub(super) fn wrap(text: &str, prec: Precedence, min: Precedence) -> String {
    if prec < min {
        format!("({})", text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arith_table() {
        assert_eq!(arith_operator(OpCode::Mod), Some(("%", Precedence::MUL)));
        assert_eq!(arith_operator(OpCode::Move), None);
        assert!(is_right_assoc(Precedence::POW));
        assert!(!is_right_assoc(Precedence::ADD));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a + b", Precedence::ADD, Precedence::MUL), "(a + b)");
        assert_eq!(wrap("a * b", Precedence::MUL, Precedence::ADD), "a * b");
        assert_eq!(
            logical_precedence(Some(LogicalOp::And)),
            Precedence::AND
        );
    }
}
