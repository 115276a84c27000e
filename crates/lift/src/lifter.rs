//! Function-level driver: one linear pass recovering every condition.

use std::fmt;

use cinder_bytecode::function::Function;
use cinder_bytecode::opcode::OpCode;

use crate::conditions::{closes_loop, paired_jump, AnalysisOptions, Condition, ConditionGraphBuilder};
use crate::stack::{logical_precedence, RegisterStack, SymbolicStack};

/// One recognised piece of a function's control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    Condition(Condition),
    /// A conditional whose chain could not be reduced; it stays a raw jump.
    Goto {
        pc: usize,
        target: Option<usize>,
        reason: String,
    },
}

impl Region {
    pub fn start_pc(&self) -> usize {
        match self {
            Region::Condition(condition) => condition.start_pc,
            Region::Goto { pc, .. } => *pc,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Condition(c) if c.is_value_context => match &c.target {
                Some(target) => write!(f, "[{}..{}] {} = {}", c.start_pc, c.end_pc, target, c.statement),
                None => write!(f, "[{}..{}] value {}", c.start_pc, c.end_pc, c.statement),
            },
            Region::Condition(c) => {
                write!(f, "[{}..{}] if {}", c.start_pc, c.end_pc, c.statement)?;
                if let Some(body) = c.body_pc {
                    write!(f, " (true -> {}, false -> {})", body, c.end_pc)?;
                }
                Ok(())
            }
            Region::Goto { pc, target, reason } => match target {
                Some(target) => write!(f, "[{}] goto {} ({})", pc, target, reason),
                None => write!(f, "[{}] goto ? ({})", pc, reason),
            },
        }
    }
}

/// Recover every condition in `func`, in PC order.
///
/// Instructions outside conditions are executed on a shared symbolic stack
/// so later comparisons render with the expressions they read.
pub fn recover_conditions(func: &Function) -> Vec<Region> {
    let instructions = &func.instructions;
    let mut stack = RegisterStack::new(func);
    let mut regions = Vec::new();
    let mut pc = 0;

    while let Some(insn) = instructions.get(pc) {
        if insn.is_conditional() {
            let options = AnalysisOptions {
                in_sub_loop: closes_loop(instructions, pc),
            };
            let result = ConditionGraphBuilder::new(instructions, &mut stack, options).build(pc);
            match result {
                Ok(Some(condition)) => {
                    if condition.is_value_context {
                        if let Some(reg) = condition.result_register {
                            let prec = logical_precedence(condition.statement.effective_token());
                            stack.define(reg, condition.statement.render(), prec);
                        }
                    }
                    pc = condition.resume_pc.max(pc + 1);
                    regions.push(Region::Condition(condition));
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    log::debug!("pc {}: {}", pc, err);
                    if err.is_recoverable() {
                        let target = paired_jump(instructions, pc);
                        if insn.op == OpCode::TestSet {
                            stack.forget(insn.a);
                        }
                        regions.push(Region::Goto {
                            pc,
                            target,
                            reason: err.to_string(),
                        });
                        pc += if target.is_some() { 2 } else { 1 };
                        continue;
                    }
                }
            }
        }

        if let Err(err) = stack.execute(pc, insn) {
            log::trace!("{}", err);
            if let Some(reg) = stack.written_register(insn) {
                stack.forget(reg);
            }
        }
        pc += 1;
    }

    regions
}
