//! Boolean expression trees recovered from comparison chains.
//!
//! Leaves hold already-rendered comparison text (`a == 1`, `f(x)`); internal
//! nodes join two subtrees with `and`/`or`. Every node carries its own
//! `reversed` flag and `reverse` pushes the flag into all children at once,
//! so rendering never has to look at ancestors.

use std::fmt;

use crate::types::{CompareOp, LogicalOp};

/// A relational expression: a comparison leaf or a short-circuit combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationalExpression {
    Leaf {
        text: String,
        reversed: bool,
    },
    Internal {
        left: Box<RelationalExpression>,
        right: Box<RelationalExpression>,
        op: LogicalOp,
        reversed: bool,
    },
}

impl RelationalExpression {
    /// Wrap an already-rendered comparison.
    pub fn leaf(text: impl Into<String>) -> Self {
        RelationalExpression::Leaf {
            text: text.into(),
            reversed: false,
        }
    }

    /// `self op other`. Both subtrees move into the new node.
    pub fn combine(self, other: RelationalExpression, op: LogicalOp) -> Self {
        RelationalExpression::Internal {
            left: Box::new(self),
            right: Box::new(other),
            op,
            reversed: false,
        }
    }

    /// Logically negate the expression in place.
    ///
    /// Toggles this node's flag and recurses into both children of an
    /// internal node, so `reverse` twice restores the original rendering.
    pub fn reverse(&mut self) {
        match self {
            RelationalExpression::Leaf { reversed, .. } => *reversed = !*reversed,
            RelationalExpression::Internal {
                left,
                right,
                reversed,
                ..
            } => {
                *reversed = !*reversed;
                left.reverse();
                right.reverse();
            }
        }
    }

    /// Owned variant of [`reverse`](Self::reverse).
    pub fn reversed(mut self) -> Self {
        self.reverse();
        self
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, RelationalExpression::Leaf { .. })
    }

    pub fn is_reversed(&self) -> bool {
        match self {
            RelationalExpression::Leaf { reversed, .. }
            | RelationalExpression::Internal { reversed, .. } => *reversed,
        }
    }

    /// The combinator this node renders with: `None` for leaves, otherwise
    /// the stored operator, swapped when the node is reversed.
    pub fn effective_token(&self) -> Option<LogicalOp> {
        match self {
            RelationalExpression::Leaf { .. } => None,
            RelationalExpression::Internal { op, reversed, .. } => {
                Some(if *reversed { op.flip() } else { *op })
            }
        }
    }

    /// Render as Lua source.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            RelationalExpression::Leaf { text, reversed } => {
                if *reversed {
                    out.push_str(&negate_text(text));
                } else {
                    out.push_str(text);
                }
            }
            RelationalExpression::Internal { left, right, .. } => {
                let Some(token) = self.effective_token() else {
                    return;
                };
                left.render_child(token, out);
                out.push(' ');
                out.push_str(token.as_str());
                out.push(' ');
                right.render_child(token, out);
            }
        }
    }

    fn render_child(&self, parent: LogicalOp, out: &mut String) {
        let needs_parens = matches!(self.effective_token(), Some(token) if token != parent);
        if needs_parens {
            out.push('(');
            self.render_into(out);
            out.push(')');
        } else {
            self.render_into(out);
        }
    }
}

impl fmt::Display for RelationalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Exchange the operands of a rendered comparison, adjusting the operator
/// so the meaning is preserved (`1 < x` becomes `x > 1`). Text that is not
/// a comparison is returned unchanged.
pub fn swap_operands(text: &str) -> String {
    match split_comparison(text) {
        Some((lhs, op, rhs)) => format!("{} {} {}", rhs, op.swap().as_str(), lhs),
        None => text.to_string(),
    }
}

/// Split `lhs op rhs` at its top-level comparison operator.
///
/// Operators inside brackets or string literals are ignored; the operator
/// must be surrounded by single spaces, as the renderer emits it.
pub fn split_comparison(text: &str) -> Option<(&str, CompareOp, &str)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b' ' if depth == 0 => {
                for op in CompareOp::ALL {
                    let token = op.as_str();
                    let end = i + 1 + token.len();
                    if text[i + 1..].starts_with(token) && bytes.get(end) == Some(&b' ') {
                        return Some((&text[..i], op, &text[end + 1..]));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Negate rendered leaf text: flip the comparison operator when there is
/// one, otherwise toggle a `not(...)` wrapper.
fn negate_text(text: &str) -> String {
    if let Some((lhs, op, rhs)) = split_comparison(text) {
        return format!("{} {} {}", lhs, op.negate().as_str(), rhs);
    }
    if let Some(inner) = text.strip_prefix("not(").and_then(|t| t.strip_suffix(')')) {
        if is_balanced(inner) {
            return inner.to_string();
        }
    }
    format!("not({})", text)
}

fn is_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> RelationalExpression {
        RelationalExpression::leaf(text)
    }

    #[test]
    fn test_leaf_negation_table() {
        assert_eq!(leaf("x == 1").reversed().render(), "x ~= 1");
        assert_eq!(leaf("x ~= 1").reversed().render(), "x == 1");
        assert_eq!(leaf("x < 1").reversed().render(), "x >= 1");
        assert_eq!(leaf("x >= 1").reversed().render(), "x < 1");
        assert_eq!(leaf("x > 1").reversed().render(), "x <= 1");
        assert_eq!(leaf("x <= 1").reversed().render(), "x > 1");
    }

    #[test]
    fn test_not_wrapper_toggles() {
        let mut expr = leaf("f(x)");
        expr.reverse();
        assert_eq!(expr.render(), "not(f(x))");
        expr.reverse();
        assert_eq!(expr.render(), "f(x)");

        // Already-negated text is unwrapped instead of double wrapped.
        assert_eq!(leaf("not(ready)").reversed().render(), "ready");
        // Two separate groups are not one wrapper.
        assert_eq!(
            leaf("not(a)(b)").reversed().render(),
            "not(not(a)(b))"
        );
    }

    #[test]
    fn test_operators_inside_calls_are_not_split() {
        assert_eq!(leaf("f(a == b)").reversed().render(), "not(f(a == b))");
        assert_eq!(leaf("t[a < b] <= 3").reversed().render(), "t[a < b] > 3");
        assert_eq!(
            leaf("name == \"a == b\"").reversed().render(),
            "name ~= \"a == b\""
        );
    }

    #[test]
    fn test_double_reverse_is_identity() {
        let samples = vec![
            leaf("x == 1"),
            leaf("f(x)"),
            leaf("a < b").combine(leaf("c"), LogicalOp::Or),
            leaf("a == 1")
                .combine(leaf("b"), LogicalOp::And)
                .combine(leaf("c >= 2"), LogicalOp::Or),
            leaf("a")
                .combine(leaf("b").combine(leaf("c <= d"), LogicalOp::Or), LogicalOp::And)
                .combine(leaf("not(e)"), LogicalOp::Or),
        ];
        for expr in samples {
            let original = expr.render();
            let twice = expr.clone().reversed().reversed();
            assert_eq!(twice.render(), original);
            assert_eq!(twice, expr);
        }
    }

    #[test]
    fn test_parenthesization() {
        let a_and_b_or_c = leaf("A")
            .combine(leaf("B"), LogicalOp::And)
            .combine(leaf("C"), LogicalOp::Or);
        insta::assert_snapshot!(a_and_b_or_c.render(), @"(A and B) or C");

        let a_and_b_or_c = leaf("A").combine(
            leaf("B").combine(leaf("C"), LogicalOp::Or),
            LogicalOp::And,
        );
        insta::assert_snapshot!(a_and_b_or_c.render(), @"A and (B or C)");

        let chain = leaf("A")
            .combine(leaf("B"), LogicalOp::And)
            .combine(leaf("C"), LogicalOp::And);
        insta::assert_snapshot!(chain.render(), @"A and B and C");
    }

    #[test]
    fn test_reverse_applies_de_morgan() {
        let expr = leaf("a == 1")
            .combine(leaf("b < 2"), LogicalOp::And)
            .reversed();
        assert_eq!(expr.effective_token(), Some(LogicalOp::Or));
        insta::assert_snapshot!(expr.render(), @"a ~= 1 or b >= 2");

        let nested = leaf("a")
            .combine(leaf("b"), LogicalOp::Or)
            .combine(leaf("c == d"), LogicalOp::And)
            .reversed();
        insta::assert_snapshot!(nested.render(), @"(not(a) and not(b)) or c ~= d");
    }

    #[test]
    fn test_effective_token_of_leaf() {
        let mut expr = leaf("x");
        assert_eq!(expr.effective_token(), None);
        expr.reverse();
        assert_eq!(expr.effective_token(), None);
        assert!(expr.is_reversed());
    }

    #[test]
    fn test_swap_operands() {
        assert_eq!(swap_operands("1 < x"), "x > 1");
        assert_eq!(swap_operands("1 <= x"), "x >= 1");
        assert_eq!(swap_operands("\"on\" == mode"), "mode == \"on\"");
        assert_eq!(swap_operands("0 ~= n"), "n ~= 0");
        assert_eq!(swap_operands("3 > y"), "y < 3");
        assert_eq!(swap_operands("flag"), "flag");
    }

    #[test]
    fn test_display_matches_render() {
        let expr = leaf("x == 1").combine(leaf("y"), LogicalOp::Or);
        assert_eq!(expr.to_string(), expr.render());
    }
}
