use nom::number::complete::{le_u32, le_u8};
use nom::IResult;

use crate::constant::Constant;
use crate::instruction::Instruction;
use crate::scope_tree::{LocalScope, ScopeTree};
use crate::{parse_int, parse_list, parse_string};

/// Debug information for a bytecode function.
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    /// Source line for each instruction (empty when stripped).
    pub line_info: Vec<usize>,
    /// Local variable scopes in declaration order.
    pub scopes: ScopeTree,
    /// Upvalue names, indexed by upvalue slot.
    pub upvalue_names: Vec<String>,
}

/// A parsed bytecode function prototype.
#[derive(Debug, Clone)]
pub struct Function {
    pub source: Option<String>,
    pub line_defined: usize,
    pub last_line_defined: usize,
    pub num_upvalues: u8,
    pub num_params: u8,
    pub is_vararg: bool,
    pub max_stack_size: u8,
    pub instructions: Vec<Instruction>,
    /// Constant pool for this function.
    pub constants: Vec<Constant>,
    /// Nested function prototypes, indexed by CLOSURE's Bx.
    pub protos: Vec<Function>,
    pub debug: DebugInfo,
}

impl Function {
    /// A function with the given code and constants and no debug info.
    pub fn new(instructions: Vec<Instruction>, constants: Vec<Constant>) -> Self {
        Self {
            source: None,
            line_defined: 0,
            last_line_defined: 0,
            num_upvalues: 0,
            num_params: 0,
            is_vararg: true,
            max_stack_size: 2,
            instructions,
            constants,
            protos: Vec::new(),
            debug: DebugInfo::default(),
        }
    }

    pub(crate) fn parse(input: &[u8], size_t: u8) -> IResult<&[u8], Self> {
        let (input, source) = parse_string(input, size_t)?;
        let (input, line_defined) = parse_int(input)?;
        let (input, last_line_defined) = parse_int(input)?;
        let (input, num_upvalues) = le_u8(input)?;
        let (input, num_params) = le_u8(input)?;
        let (input, is_vararg) = le_u8(input)?;
        let (input, max_stack_size) = le_u8(input)?;

        // Code
        let code_start = input;
        let (input, raw_words) = parse_list(input, le_u32)?;
        let instructions = Instruction::decode_all(&raw_words).map_err(|_| {
            nom::Err::Failure(nom::error::Error::new(
                code_start,
                nom::error::ErrorKind::Verify,
            ))
        })?;

        // Constants, then nested prototypes
        let (input, constants) = parse_list(input, |i| Constant::parse(i, size_t))?;
        let (input, protos) = parse_list(input, |i| Function::parse(i, size_t))?;

        // Debug info
        let (input, line_info) = parse_list(input, parse_int)?;
        let (input, scopes) = parse_list(input, |i| {
            let (i, name) = parse_string(i, size_t)?;
            let (i, start) = parse_int(i)?;
            let (i, end) = parse_int(i)?;
            let name = String::from_utf8_lossy(&name.unwrap_or_default()).to_string();
            Ok((
                i,
                LocalScope {
                    name,
                    pc_range: start..end,
                },
            ))
        })?;
        let (input, upvalue_names) = parse_list(input, |i| {
            let (i, name) = parse_string(i, size_t)?;
            Ok((i, String::from_utf8_lossy(&name.unwrap_or_default()).to_string()))
        })?;

        Ok((
            input,
            Function {
                source: source.map(|s| String::from_utf8_lossy(&s).to_string()),
                line_defined,
                last_line_defined,
                num_upvalues,
                num_params,
                is_vararg: is_vararg != 0,
                max_stack_size,
                instructions,
                constants,
                protos,
                debug: DebugInfo {
                    line_info,
                    scopes: ScopeTree::new(scopes),
                    upvalue_names,
                },
            },
        ))
    }

    /// Get the source line number for a given PC, if line info is present.
    pub fn line_for_pc(&self, pc: usize) -> Option<usize> {
        self.debug.line_info.get(pc).copied()
    }

    /// The string constant at `index`, if it is one.
    pub fn string_constant(&self, index: usize) -> Option<String> {
        self.constants.get(index).and_then(Constant::as_str)
    }
}
