use crate::function::Function;
use crate::BytecodeError;

const SIGNATURE: &[u8] = b"\x1bLua";
const VERSION: u8 = 0x51;
const HEADER_SIZE: usize = 12;

/// The fixed 12-byte chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub format: u8,
    pub size_t: u8,
}

/// A parsed Lua 5.1 chunk: the header plus the main function prototype,
/// which owns every nested prototype.
#[derive(Debug)]
pub struct Chunk {
    pub header: Header,
    pub main: Function,
}

impl Chunk {
    pub(crate) fn parse(input: &[u8]) -> Result<Self, BytecodeError> {
        let header = Self::parse_header(input)?;
        let body = &input[HEADER_SIZE..];
        match Function::parse(body, header.size_t) {
            Ok((_, main)) => Ok(Chunk { header, main }),
            Err(err) => Err(BytecodeError::Malformed(err.to_string())),
        }
    }

    fn parse_header(input: &[u8]) -> Result<Header, BytecodeError> {
        if input.len() < HEADER_SIZE || !input.starts_with(SIGNATURE) {
            return Err(BytecodeError::BadSignature);
        }
        let version = input[4];
        if version != VERSION {
            return Err(BytecodeError::UnsupportedVersion(version));
        }
        let format = input[5];
        if format != 0 {
            return Err(BytecodeError::UnsupportedLayout("non-official format"));
        }
        if input[6] != 1 {
            return Err(BytecodeError::UnsupportedLayout("big-endian chunk"));
        }
        if input[7] != 4 || input[9] != 4 {
            return Err(BytecodeError::UnsupportedLayout("int and instruction must be 4 bytes"));
        }
        let size_t = input[8];
        if size_t != 4 && size_t != 8 {
            return Err(BytecodeError::UnsupportedLayout("size_t must be 4 or 8 bytes"));
        }
        if input[10] != 8 || input[11] != 0 {
            return Err(BytecodeError::UnsupportedLayout("lua_Number must be an 8-byte double"));
        }
        Ok(Header {
            version,
            format,
            size_t,
        })
    }

    /// All prototypes in depth-first order, main function first.
    pub fn functions(&self) -> Vec<&Function> {
        let mut out = Vec::new();
        collect_functions(&self.main, &mut out);
        out
    }
}

fn collect_functions<'a>(func: &'a Function, out: &mut Vec<&'a Function>) {
    out.push(func);
    for proto in &func.protos {
        collect_functions(proto, out);
    }
}
