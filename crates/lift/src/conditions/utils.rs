//! Instruction-level predicates shared by the scan and the driver.

use cinder_bytecode::instruction::{Instruction, InstructionKind};
use cinder_bytecode::opcode::OpCode;

/// Whether `insn` may appear between the comparisons of one condition.
///
/// Only pure value computation is allowed: anything with a visible side
/// effect (stores, calls without results, closures, loops) ends the chain.
pub fn is_permitted(insn: &Instruction) -> bool {
    match insn.op {
        OpCode::Jmp
        | OpCode::Not
        | OpCode::Add
        | OpCode::Sub
        | OpCode::Mul
        | OpCode::Div
        | OpCode::Mod
        | OpCode::Pow
        | OpCode::Unm
        | OpCode::Len
        | OpCode::Concat
        | OpCode::GetTable
        | OpCode::GetGlobal
        | OpCode::GetUpval
        | OpCode::LoadK
        | OpCode::LoadBool
        | OpCode::LoadNil
        | OpCode::Move
        | OpCode::SelfOp
        | OpCode::NewTable
        | OpCode::VarArg => true,
        // C == 1 discards every result, so the call is only run for effect.
        OpCode::Call => insn.c != 1,
        _ => false,
    }
}

/// Whether `pc` starts a `LOADBOOL, LOADBOOL` pair.
pub fn is_boolean_pair(instructions: &[Instruction], pc: usize) -> bool {
    matches!(
        (instructions.get(pc), instructions.get(pc + 1)),
        (Some(first), Some(second))
            if first.kind() == InstructionKind::BooleanLoad
                && second.kind() == InstructionKind::BooleanLoad
    )
}

/// The jump paired with the conditional at `pc`, with its target.
pub fn paired_jump(instructions: &[Instruction], pc: usize) -> Option<usize> {
    let jump = instructions.get(pc + 1)?;
    if jump.op != OpCode::Jmp {
        return None;
    }
    jump.jump_target(pc + 1)
}

/// Whether the comparison chain starting at `pc` jumps backwards, as the
/// condition of `repeat ... until` does.
pub fn closes_loop(instructions: &[Instruction], start: usize) -> bool {
    let mut pc = start;
    while let Some(insn) = instructions.get(pc) {
        if insn.is_conditional() {
            match paired_jump(instructions, pc) {
                Some(target) if target <= pc + 1 => return true,
                Some(_) => pc += 2,
                None => return false,
            }
        } else if is_permitted(insn) && insn.op != OpCode::Jmp {
            pc += 1;
        } else {
            return false;
        }
    }
    false
}
