//! LuaJIT 2.0 bytecode: opcodes, typed instructions, constant pools and the
//! dump reader.

pub mod constant;
pub mod debug;
pub mod dump;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod operand;
pub mod prototype;

use nom::error::{Error, ErrorKind};
use nom::number::complete::le_u8;
use nom::IResult;

pub use error::{DecodeError, ReadError};

/// Parse a ULEB128-encoded 32-bit unsigned integer.
pub(crate) fn uleb128(input: &[u8]) -> IResult<&[u8], u32> {
    let mut result: u32 = 0;
    let mut shift = 0;
    let mut i = input;
    loop {
        let (rest, byte) = le_u8(i)?;
        if shift >= 32 {
            return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
        }
        result |= ((byte & 0x7F) as u32) << shift;
        i = rest;
        if byte & 0x80 == 0 {
            return Ok((i, result));
        }
        shift += 7;
    }
}

pub(crate) fn uleb128_usize(input: &[u8]) -> IResult<&[u8], usize> {
    let (input, value) = uleb128(input)?;
    Ok((input, value as usize))
}

/// Parse the 33-bit ULEB128 variant used by numeric constants.
///
/// The lowest bit of the first byte is a flag (set for floats); the remaining
/// bits carry the low 32 bits of the value.
pub(crate) fn uleb128_33(input: &[u8]) -> IResult<&[u8], (bool, u32)> {
    let (mut i, first) = le_u8(input)?;
    let flag = first & 1 != 0;
    let mut result = (first >> 1) as u32;
    if result >= 0x40 {
        result &= 0x3F;
        let mut shift = 6;
        loop {
            let (rest, byte) = le_u8(i)?;
            if shift >= 32 {
                return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
            }
            result |= ((byte & 0x7F) as u32) << shift;
            i = rest;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
    }
    Ok((i, (flag, result)))
}

/// Parse a fixed-length list.
pub(crate) fn parse_list_len<'a, T>(
    input: &'a [u8],
    parser: impl Fn(&'a [u8]) -> IResult<&'a [u8], T>,
    length: usize,
) -> IResult<&'a [u8], Vec<T>> {
    let mut items = Vec::with_capacity(length.min(input.len()));
    let mut input = input;
    for _ in 0..length {
        let (rest, item) = parser(input)?;
        items.push(item);
        input = rest;
    }
    Ok((input, items))
}

/// Take `length` raw bytes.
pub(crate) fn parse_bytes(input: &[u8], length: usize) -> IResult<&[u8], Vec<u8>> {
    let (rest, bytes) = nom::bytes::complete::take(length)(input)?;
    Ok((rest, bytes.to_owned()))
}

/// Parse a ULEB128 length-prefixed string.
pub(crate) fn parse_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, length) = uleb128_usize(input)?;
    parse_bytes(input, length)
}

/// Read a LuaJIT 2.0 bytecode dump (`luajit -b` output).
pub fn read_dump(bytes: &[u8]) -> Result<dump::Dump, ReadError> {
    dump::Dump::parse(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uleb128() {
        assert_eq!(uleb128(&[0x05]).unwrap().1, 5);
        assert_eq!(uleb128(&[0xE5, 0x8E, 0x26]).unwrap().1, 624_485);
        assert!(uleb128(&[0x80, 0x80]).is_err());
        assert!(uleb128(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn test_uleb128_33_flag() {
        assert_eq!(uleb128_33(&[0x03]).unwrap().1, (true, 1));
        assert_eq!(uleb128_33(&[0x80, 0x01]).unwrap().1, (false, 0x40));
    }
}
