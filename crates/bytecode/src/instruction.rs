use crate::opcode::OpCode;

/// Bias applied to the unsigned Bx field to obtain sBx.
pub const MAXARG_SBX: i32 = 131071;

/// Bit marking an RK operand as a constant index.
pub const BITRK: u16 = 1 << 8;

/// Whether an RK operand refers to the constant table.
pub fn is_constant(rk: u16) -> bool {
    rk & BITRK != 0
}

/// Constant table index encoded in an RK operand.
pub fn constant_index(rk: u16) -> usize {
    (rk & !BITRK) as usize
}

/// Relational operator tested by a comparator instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    Eq,
    Lt,
    Le,
}

/// Coarse classification used by condition recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    /// EQ / LT / LE, always followed by a JMP.
    Comparator(CompareKind),
    /// TEST, followed by a JMP.
    Test,
    /// TESTSET, followed by a JMP; assigns when the jump is taken.
    TestSet,
    Jump,
    BooleanLoad,
    TableAssign,
    GlobalAssign,
    Other,
}

/// A decoded Lua 5.1 instruction.
///
/// Instructions come in three formats:
/// - **iABC**: opcode(6) + A(8) + C(9) + B(9)
/// - **iABx**: opcode(6) + A(8) + Bx(18)
/// - **iAsBx**: opcode(6) + A(8) + sBx(18, biased by 131071)
///
/// B, C and Bx are all decoded; which ones are meaningful depends on `op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub a: u8,
    pub b: u16,
    pub c: u16,
    pub bx: u32,
}

impl Instruction {
    /// Decode a single 32-bit instruction word.
    pub fn decode(word: u32) -> Option<Self> {
        let op = OpCode::from_byte((word & 0x3F) as u8)?;
        Some(Self {
            op,
            a: ((word >> 6) & 0xFF) as u8,
            c: ((word >> 14) & 0x1FF) as u16,
            b: ((word >> 23) & 0x1FF) as u16,
            bx: word >> 14,
        })
    }

    /// Decode an instruction stream, failing on the first invalid opcode.
    pub fn decode_all(words: &[u32]) -> Result<Vec<Self>, usize> {
        words
            .iter()
            .enumerate()
            .map(|(pc, &word)| Self::decode(word).ok_or(pc))
            .collect()
    }

    /// Encode back into a 32-bit word.
    pub fn encode(&self) -> u32 {
        let base = self.op as u32 | (self.a as u32) << 6;
        if self.op.is_bx() {
            base | self.bx << 14
        } else {
            base | (self.c as u32 & 0x1FF) << 14 | (self.b as u32 & 0x1FF) << 23
        }
    }

    /// Build an iABC instruction.
    pub fn abc(op: OpCode, a: u8, b: u16, c: u16) -> Self {
        Self {
            op,
            a,
            b,
            c,
            bx: ((b as u32) << 9) | c as u32,
        }
    }

    /// Build an iABx instruction.
    pub fn abx(op: OpCode, a: u8, bx: u32) -> Self {
        Self {
            op,
            a,
            b: ((bx >> 9) & 0x1FF) as u16,
            c: (bx & 0x1FF) as u16,
            bx,
        }
    }

    /// Build an iAsBx instruction.
    pub fn asbx(op: OpCode, a: u8, sbx: i32) -> Self {
        Self::abx(op, a, (sbx + MAXARG_SBX) as u32)
    }

    /// Signed jump offset.
    pub fn sbx(&self) -> i32 {
        self.bx as i32 - MAXARG_SBX
    }

    /// Target PC of a JMP / FORLOOP / FORPREP located at `pc`.
    pub fn jump_target(&self, pc: usize) -> Option<usize> {
        if !self.op.is_sbx() {
            return None;
        }
        let target = (pc + 1) as i64 + self.sbx() as i64;
        usize::try_from(target).ok()
    }

    pub fn kind(&self) -> InstructionKind {
        match self.op {
            OpCode::Eq => InstructionKind::Comparator(CompareKind::Eq),
            OpCode::Lt => InstructionKind::Comparator(CompareKind::Lt),
            OpCode::Le => InstructionKind::Comparator(CompareKind::Le),
            OpCode::Test => InstructionKind::Test,
            OpCode::TestSet => InstructionKind::TestSet,
            OpCode::Jmp => InstructionKind::Jump,
            OpCode::LoadBool => InstructionKind::BooleanLoad,
            OpCode::SetTable => InstructionKind::TableAssign,
            OpCode::SetGlobal => InstructionKind::GlobalAssign,
            _ => InstructionKind::Other,
        }
    }

    /// Whether this is a comparator, TEST or TESTSET.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self.kind(),
            InstructionKind::Comparator(_) | InstructionKind::Test | InstructionKind::TestSet
        )
    }

    /// The polarity bit: set when the following JMP is taken on a true
    /// comparison result (A for comparators, C for TEST/TESTSET).
    pub fn polarity(&self) -> bool {
        match self.kind() {
            InstructionKind::Comparator(_) => self.a != 0,
            InstructionKind::Test | InstructionKind::TestSet => self.c != 0,
            _ => false,
        }
    }

    /// Register written through A, if the instruction writes one.
    ///
    /// TESTSET is included even though the write is conditional.
    pub fn destination(&self) -> Option<u8> {
        match self.op {
            OpCode::Move
            | OpCode::LoadK
            | OpCode::LoadBool
            | OpCode::LoadNil
            | OpCode::GetUpval
            | OpCode::GetGlobal
            | OpCode::GetTable
            | OpCode::NewTable
            | OpCode::SelfOp
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Pow
            | OpCode::Unm
            | OpCode::Not
            | OpCode::Len
            | OpCode::Concat
            | OpCode::TestSet
            | OpCode::Closure
            | OpCode::VarArg => Some(self.a),
            OpCode::Call if self.c != 1 => Some(self.a),
            _ => None,
        }
    }
}
