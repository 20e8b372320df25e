use log::debug;
use nom::bytes::complete::tag;
use nom::number::complete::le_u8;
use nom::number::Endianness;
use nom::IResult;

use crate::error::ReadError;
use crate::prototype::Prototype;
use crate::{parse_string, uleb128, uleb128_usize};

const SIGNATURE: &[u8] = b"\x1bLJ";
const SUPPORTED_VERSION: u8 = 1;

const FLAG_BIG_ENDIAN: u32 = 0x01;
const FLAG_STRIPPED: u32 = 0x02;
const FLAG_FFI: u32 = 0x04;

/// Dump header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub big_endian: bool,
    pub stripped: bool,
    pub uses_ffi: bool,
    /// Source name recorded by the compiler, absent in stripped dumps.
    pub chunk_name: Option<String>,
}

impl Header {
    fn parse(input: &[u8]) -> IResult<&[u8], (Self, Option<u8>)> {
        let (input, signature) = nom::combinator::opt(tag(SIGNATURE))(input)?;
        if signature.is_none() {
            return Ok((input, (Self::empty(), None)));
        }
        let (input, version) = le_u8(input)?;
        let (input, flags) = uleb128(input)?;
        let stripped = flags & FLAG_STRIPPED != 0;
        let (input, chunk_name) = if stripped {
            (input, None)
        } else {
            let (input, name) = parse_string(input)?;
            (input, Some(String::from_utf8_lossy(&name).into_owned()))
        };
        Ok((
            input,
            (
                Header {
                    version,
                    big_endian: flags & FLAG_BIG_ENDIAN != 0,
                    stripped,
                    uses_ffi: flags & FLAG_FFI != 0,
                    chunk_name,
                },
                Some(version),
            ),
        ))
    }

    fn empty() -> Self {
        Header {
            version: 0,
            big_endian: false,
            stripped: true,
            uses_ffi: false,
            chunk_name: None,
        }
    }

    fn endianness(&self) -> Endianness {
        if self.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

/// A parsed LuaJIT bytecode dump.
///
/// Prototypes are stored children first; the last one is the main chunk and
/// owns every other prototype through its complex constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Dump {
    pub header: Header,
    pub main: Prototype,
}

impl Dump {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, ReadError> {
        let (mut input, (header, version)) = Header::parse(bytes)?;
        match version {
            None => return Err(ReadError::BadSignature),
            Some(SUPPORTED_VERSION) => {}
            Some(other) => return Err(ReadError::UnsupportedVersion(other)),
        }

        let endianness = header.endianness();
        let mut pending: Vec<Prototype> = Vec::new();
        loop {
            let (rest, length) = uleb128_usize(input)?;
            if length == 0 {
                break;
            }
            let body = rest.get(..length).ok_or_else(|| {
                ReadError::Malformed(format!("prototype of {} bytes is truncated", length))
            })?;
            let (consumed, prototype) =
                Prototype::parse(body, endianness, header.stripped, &mut pending)?;
            if consumed != length {
                return Err(ReadError::TrailingBytes(length - consumed));
            }
            debug!(
                "read prototype: {} instructions, {} complex and {} numeric constants",
                prototype.instructions.len(),
                prototype.constants.complex.len(),
                prototype.constants.numeric.len()
            );
            pending.push(prototype);
            input = &rest[length..];
        }

        let main = pending.pop().ok_or(ReadError::NoPrototypes)?;
        if !pending.is_empty() {
            return Err(ReadError::DanglingPrototypes(pending.len()));
        }
        Ok(Dump { header, main })
    }
}
