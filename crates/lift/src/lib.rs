//! Recovery of structured conditions from Lua 5.1 comparison/jump chains.

pub mod conditions;
pub mod error;
pub mod lifter;
pub mod stack;

pub use conditions::{AnalysisOptions, Condition, ConditionGraphBuilder, ConditionOutcome};
pub use error::{ConditionError, ExecError, InconclusiveReason};
pub use lifter::{recover_conditions, Region};
pub use stack::{RegisterStack, StackScope, SymbolicStack};
