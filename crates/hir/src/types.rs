/// Relational operators: the six Lua comparison tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Every operator, two-character tokens first.
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Le,
        CompareOp::Ge,
        CompareOp::Lt,
        CompareOp::Gt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "~=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Logical negation: `== ↔ ~=`, `< ↔ >=`, `> ↔ <=`.
    pub fn negate(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Ge => CompareOp::Lt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Le => CompareOp::Gt,
        }
    }

    /// Operator to use after exchanging the operands (`a < b` ⇔ `b > a`).
    pub fn swap(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            CompareOp::Le => CompareOp::Ge,
        }
    }
}

/// Short-circuit combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// De Morgan dual.
    pub fn flip(self) -> Self {
        match self {
            LogicalOp::And => LogicalOp::Or,
            LogicalOp::Or => LogicalOp::And,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

/// Terminal value of a resolved condition leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    BooleanTrue,
    BooleanFalse,
    /// Falls through without producing a value of its own.
    Nil,
    /// Any other rendered value.
    Generic(String),
}

impl ResolvedValue {
    /// Classify rendered value text: the `true`, `false` and `nil` literals
    /// map to their own variants.
    pub fn from_literal(text: &str) -> Self {
        match text {
            "true" => ResolvedValue::BooleanTrue,
            "false" => ResolvedValue::BooleanFalse,
            "nil" => ResolvedValue::Nil,
            _ => ResolvedValue::Generic(text.to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ResolvedValue::BooleanTrue => Some(true),
            ResolvedValue::BooleanFalse => Some(false),
            _ => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        self.as_bool().is_some()
    }
}
