use cinder_bytecode::opcode::OpCode;
use thiserror::Error;

/// Failure to execute an instruction symbolically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("{op:?} at pc {pc} cannot be executed symbolically")]
    Unsupported { op: OpCode, pc: usize },
    #[error("constant K{index} referenced at pc {pc} does not exist")]
    ConstantOutOfRange { index: usize, pc: usize },
}

/// Why a candidate condition could not be reduced to a single expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InconclusiveReason {
    #[error("{0} external jump targets, expected 2")]
    TooManyTargets(usize),
    #[error("only {0} external jump target(s), expected 2")]
    TooFewTargets(usize),
    #[error("reduction stalled with {remaining} unresolved nodes")]
    Stalled { remaining: usize },
    #[error(transparent)]
    Execution(#[from] ExecError),
    #[error("conditional at pc {pc} is not followed by a jump")]
    MissingJump { pc: usize },
    #[error("no value could be resolved for the path starting at pc {pc}")]
    UnresolvableLeaf { pc: usize },
    #[error("loop condition jumps back past its own start on both paths")]
    UnverifiedLoopShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("inconclusive condition at pc {start_pc}: {reason}")]
    Inconclusive {
        start_pc: usize,
        reason: InconclusiveReason,
    },
    #[error("condition assigns to both `{first}` and `{second}`")]
    ConflictingAssignmentTarget { first: String, second: String },
}

impl ConditionError {
    pub(crate) fn inconclusive(start_pc: usize, reason: impl Into<InconclusiveReason>) -> Self {
        ConditionError::Inconclusive {
            start_pc,
            reason: reason.into(),
        }
    }

    /// Whether the caller can fall back to emitting the raw jumps.
    ///
    /// Every variant leaves the symbolic stack untouched, so this always
    /// holds; it exists so callers do not have to match on variants.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ConditionError::Inconclusive { .. } => true,
            ConditionError::ConflictingAssignmentTarget { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ConditionError::inconclusive(4, InconclusiveReason::TooManyTargets(3));
        assert_eq!(
            err.to_string(),
            "inconclusive condition at pc 4: 3 external jump targets, expected 2"
        );

        let exec = ExecError::Unsupported {
            op: OpCode::Closure,
            pc: 9,
        };
        let err = ConditionError::inconclusive(7, exec);
        assert_eq!(
            err.to_string(),
            "inconclusive condition at pc 7: Closure at pc 9 cannot be executed symbolically"
        );
        assert!(err.is_recoverable());
    }
}
