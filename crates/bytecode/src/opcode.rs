/// Lua 5.1 opcodes.
///
/// Each variant documents the instruction format and operand usage.
/// `RK(x)` is a register when bit 8 of `x` is clear, otherwise the
/// constant `K[x & 0xFF]`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// MOVE: A = B
    Move = 0,
    /// LOADK: A = K[Bx]
    LoadK = 1,
    /// LOADBOOL: A = (bool)B; if C, pc++
    LoadBool = 2,
    /// LOADNIL: A..=B = nil
    LoadNil = 3,
    /// GETUPVAL: A = upvalues[B]
    GetUpval = 4,
    /// GETGLOBAL: A = globals[K[Bx]]
    GetGlobal = 5,
    /// GETTABLE: A = B[RK(C)]
    GetTable = 6,
    /// SETGLOBAL: globals[K[Bx]] = A
    SetGlobal = 7,
    /// SETUPVAL: upvalues[B] = A
    SetUpval = 8,
    /// SETTABLE: A[RK(B)] = RK(C)
    SetTable = 9,
    /// NEWTABLE: A = {} (B = array size, C = hash size)
    NewTable = 10,
    /// SELF: A+1 = B; A = B[RK(C)]
    SelfOp = 11,
    /// ADD: A = RK(B) + RK(C)
    Add = 12,
    /// SUB: A = RK(B) - RK(C)
    Sub = 13,
    /// MUL: A = RK(B) * RK(C)
    Mul = 14,
    /// DIV: A = RK(B) / RK(C)
    Div = 15,
    /// MOD: A = RK(B) % RK(C)
    Mod = 16,
    /// POW: A = RK(B) ^ RK(C)
    Pow = 17,
    /// UNM: A = -B
    Unm = 18,
    /// NOT: A = not B
    Not = 19,
    /// LEN: A = #B
    Len = 20,
    /// CONCAT: A = B .. ... .. C
    Concat = 21,
    /// JMP: pc += sBx
    Jmp = 22,
    /// EQ: if ((RK(B) == RK(C)) ~= A) then pc++
    Eq = 23,
    /// LT: if ((RK(B) < RK(C)) ~= A) then pc++
    Lt = 24,
    /// LE: if ((RK(B) <= RK(C)) ~= A) then pc++
    Le = 25,
    /// TEST: if not (R(A) <=> C) then pc++
    Test = 26,
    /// TESTSET: if (R(B) <=> C) then A = B else pc++
    TestSet = 27,
    /// CALL: A, ..A+C-2 = A(A+1, ..A+B-1)
    Call = 28,
    /// TAILCALL: return A(A+1, ..A+B-1)
    TailCall = 29,
    /// RETURN: return A, ..A+B-2
    Return = 30,
    /// FORLOOP: A += A+2; if A <?= A+1 then { pc += sBx; A+3 = A }
    ForLoop = 31,
    /// FORPREP: A -= A+2; pc += sBx
    ForPrep = 32,
    /// TFORLOOP: A+3, ..A+2+C = A(A+1, A+2); if A+3 ~= nil then A+2 = A+3 else pc++
    TForLoop = 33,
    /// SETLIST: A[(C-1)*FPF+i] = A+i, 1 <= i <= B
    SetList = 34,
    /// CLOSE: close upvalues >= A
    Close = 35,
    /// CLOSURE: A = closure(protos[Bx])
    Closure = 36,
    /// VARARG: A, ..A+B-2 = ...
    VarArg = 37,
}

impl OpCode {
    /// Try to convert a raw 6-bit opcode to an OpCode.
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte <= 37 {
            // SAFETY: all values 0..=37 are valid OpCode discriminants
            Some(unsafe { std::mem::transmute::<u8, OpCode>(byte) })
        } else {
            None
        }
    }

    /// Whether this opcode uses the Bx/sBx operand instead of B and C.
    pub fn is_bx(self) -> bool {
        matches!(
            self,
            OpCode::LoadK
                | OpCode::GetGlobal
                | OpCode::SetGlobal
                | OpCode::Jmp
                | OpCode::ForLoop
                | OpCode::ForPrep
                | OpCode::Closure
        )
    }

    /// Whether Bx is interpreted as a signed offset.
    pub fn is_sbx(self) -> bool {
        matches!(self, OpCode::Jmp | OpCode::ForLoop | OpCode::ForPrep)
    }
}
