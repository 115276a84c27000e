//! Condition recovery.
//!
//! Lua 5.1 compiles every `if`, `while`, `repeat ... until` test and every
//! short-circuit `and`/`or` into pairs of a conditional (EQ, LT, LE, TEST,
//! TESTSET) and a JMP. Starting at one conditional, the builder collects the
//! whole chain into a graph of decision nodes, resolves every path that
//! leaves the chain to a value, and folds the graph back into one boolean
//! expression.
//!
//! ## Value context
//!
//! `x = a == 1 and b == 2` compiles to:
//! ```text
//! 0  GETGLOBAL 0 "a"
//! 1  EQ        0 0 K(1)     -- equal: fall through
//! 2  JMP       -> 6
//! 3  GETGLOBAL 1 "b"
//! 4  EQ        1 1 K(2)     -- equal: jump
//! 5  JMP       -> 7
//! 6  LOADBOOL  0 0 1        -- false, skip next
//! 7  LOADBOOL  0 1 0        -- true
//! 8  SETGLOBAL 0 "x"
//! ```
//! The LOADBOOL pair marks the end of a value computation; paths that reach
//! it resolve to `false` / `true`.
//!
//! ## Predicate context
//!
//! When some jump leaves the scanned range the chain is a statement
//! condition. Exactly two targets may lie outside the chain: the smaller is
//! the body, the larger is where control goes when the test fails.

mod builder;
mod graph;
mod node;
mod utils;

use cinder_hir::relational::RelationalExpression;

use crate::error::ConditionError;

pub use builder::ConditionGraphBuilder;
pub use graph::ConditionGraph;
pub use node::{ConditionNode, LeafValue, NodeKind};
pub use utils::{closes_loop, is_boolean_pair, is_permitted, paired_jump};

/// Per-call switches for the builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// The chain closes a `repeat ... until` loop, so backward jumps are
    /// part of the condition rather than the end of it.
    pub in_sub_loop: bool,
}

/// A recovered condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// First PC of the chain.
    pub start_pc: usize,
    /// Value context: the instruction consuming the value. Predicate
    /// context: where control goes when the condition is false.
    pub end_pc: usize,
    /// Predicate context only: where control goes when it is true.
    pub body_pc: Option<usize>,
    /// Where linear processing should continue.
    pub resume_pc: usize,
    pub statement: RelationalExpression,
    pub is_value_context: bool,
    /// Destination the value is stored to, when one was seen.
    pub target: Option<String>,
    /// Register holding the value in value context.
    pub result_register: Option<u8>,
}

/// Flat summary of a [`Condition`] for callers that only emit text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutcome {
    /// Whether the instructions from the start PC up to `end_pc` form a
    /// recovered condition. When false they are ordinary instructions.
    pub consumed: bool,
    /// Instructions covered, counted from the start PC.
    pub span: usize,
    pub end_pc: usize,
    pub statement_text: String,
    pub is_value_context: bool,
    pub inferred_target: Option<String>,
}

impl Condition {
    pub fn outcome(&self) -> ConditionOutcome {
        ConditionOutcome {
            consumed: true,
            span: self.resume_pc.saturating_sub(self.start_pc),
            end_pc: self.end_pc,
            statement_text: self.statement.render(),
            is_value_context: self.is_value_context,
            inferred_target: self.target.clone(),
        }
    }
}

impl ConditionOutcome {
    /// Summary of one builder call. Anything but a recovered condition
    /// leaves the instructions at `start_pc` unconsumed.
    pub fn from_result(start_pc: usize, result: &Result<Option<Condition>, ConditionError>) -> Self {
        match result {
            Ok(Some(condition)) => condition.outcome(),
            Ok(None) | Err(_) => ConditionOutcome {
                consumed: false,
                span: 0,
                end_pc: start_pc,
                statement_text: String::new(),
                is_value_context: false,
                inferred_target: None,
            },
        }
    }
}
