use std::fmt::Write;

use nom::number::complete::{le_f64, le_u8};
use nom::IResult;

use crate::parse_string;

/// A constant value in the function's constant table.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Nil,
    Boolean(bool),
    Number(f64),
    String(Vec<u8>),
}

const TAG_NIL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_NUMBER: u8 = 3;
const TAG_STRING: u8 = 4;

impl Constant {
    pub(crate) fn parse(input: &[u8], size_t: u8) -> IResult<&[u8], Self> {
        let (rest, tag) = le_u8(input)?;
        match tag {
            TAG_NIL => Ok((rest, Constant::Nil)),
            TAG_BOOLEAN => {
                let (rest, val) = le_u8(rest)?;
                Ok((rest, Constant::Boolean(val != 0)))
            }
            TAG_NUMBER => {
                let (rest, val) = le_f64(rest)?;
                Ok((rest, Constant::Number(val)))
            }
            TAG_STRING => {
                let (rest, bytes) = parse_string(rest, size_t)?;
                Ok((rest, Constant::String(bytes.unwrap_or_default())))
            }
            _ => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            ))),
        }
    }

    /// The string payload, if this is a string constant.
    pub fn as_str(&self) -> Option<String> {
        match self {
            Constant::String(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
            _ => None,
        }
    }

    /// Whether this constant is a string that can be written as `t.name`.
    pub fn is_identifier(&self) -> bool {
        let Constant::String(bytes) = self else {
            return false;
        };
        let Some((&first, rest)) = bytes.split_first() else {
            return false;
        };
        (first.is_ascii_alphabetic() || first == b'_')
            && rest.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
            && !is_keyword(bytes)
    }

    /// Render as a Lua source literal.
    pub fn to_lua(&self) -> String {
        match self {
            Constant::Nil => "nil".to_string(),
            Constant::Boolean(b) => b.to_string(),
            Constant::Number(n) => format_number(*n),
            Constant::String(bytes) => quote_string(bytes),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "(0/0)".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "math.huge" } else { "-math.huge" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn quote_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{}", b);
            }
        }
    }
    out.push('"');
    out
}

fn is_keyword(bytes: &[u8]) -> bool {
    matches!(
        bytes,
        b"and"
            | b"break"
            | b"do"
            | b"else"
            | b"elseif"
            | b"end"
            | b"false"
            | b"for"
            | b"function"
            | b"if"
            | b"in"
            | b"local"
            | b"nil"
            | b"not"
            | b"or"
            | b"repeat"
            | b"return"
            | b"then"
            | b"true"
            | b"until"
            | b"while"
    )
}
