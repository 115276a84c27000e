//! Reader for Lua 5.1 binary chunks (`luac` output).
//!
//! Only the standard little-endian layout with 4-byte ints, 4-byte
//! instructions and 8-byte floating point numbers is accepted; `size_t`
//! may be 4 or 8 bytes.

pub mod chunk;
pub mod constant;
pub mod function;
pub mod instruction;
pub mod opcode;
pub mod scope_tree;

use nom::number::complete::{le_u32, le_u64};
use nom::IResult;
use thiserror::Error;

/// Errors produced while reading a binary chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    #[error("missing Lua signature")]
    BadSignature,
    #[error("unsupported bytecode version: {0:#04x} (cinder targets Lua 5.1 only)")]
    UnsupportedVersion(u8),
    #[error("unsupported chunk layout: {0}")]
    UnsupportedLayout(&'static str),
    #[error("malformed chunk: {0}")]
    Malformed(String),
}

/// Parse a native `int` (4 bytes, little endian).
pub(crate) fn parse_int(input: &[u8]) -> IResult<&[u8], usize> {
    let (rest, value) = le_u32(input)?;
    Ok((rest, value as usize))
}

/// Parse a `size_t` of the width announced in the header.
pub(crate) fn parse_size(input: &[u8], size_t: u8) -> IResult<&[u8], usize> {
    if size_t == 8 {
        let (rest, value) = le_u64(input)?;
        Ok((rest, value as usize))
    } else {
        parse_int(input)
    }
}

/// Parse an int-prefixed list.
pub(crate) fn parse_list<'a, T>(
    input: &'a [u8],
    parser: impl Fn(&'a [u8]) -> IResult<&'a [u8], T>,
) -> IResult<&'a [u8], Vec<T>> {
    let (input, length) = parse_int(input)?;
    let mut items = Vec::with_capacity(length.min(input.len()));
    let mut input = input;
    for _ in 0..length {
        let (rest, item) = parser(input)?;
        items.push(item);
        input = rest;
    }
    Ok((input, items))
}

/// Parse a size-prefixed string. A zero size encodes "no string"; otherwise
/// the stored bytes include a trailing NUL which is dropped.
pub(crate) fn parse_string(input: &[u8], size_t: u8) -> IResult<&[u8], Option<Vec<u8>>> {
    let (input, length) = parse_size(input, size_t)?;
    if length == 0 {
        return Ok((input, None));
    }
    let (rest, bytes) = nom::bytes::complete::take::<_, _, nom::error::Error<&[u8]>>(length)(input)?;
    let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
    Ok((rest, Some(bytes.to_owned())))
}

/// Deserialize a Lua 5.1 binary chunk.
pub fn deserialize(bytecode: &[u8]) -> Result<chunk::Chunk, BytecodeError> {
    chunk::Chunk::parse(bytecode)
}
