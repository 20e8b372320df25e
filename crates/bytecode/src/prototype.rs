use nom::number::complete::{le_u8, u16 as nom_u16, u32 as nom_u32};
use nom::bytes::complete::take;
use nom::number::Endianness;
use nom::IResult;

use crate::constant::{ComplexConstant, Constants, NumericConstant, KGC_CHILD};
use crate::debug::DebugInfo;
use crate::error::ReadError;
use crate::instruction::Instruction;
use crate::{parse_list_len, uleb128, uleb128_usize};

/// Prototype flags from the dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrototypeFlags {
    pub has_child: bool,
    pub is_variadic: bool,
    pub uses_ffi: bool,
    pub no_jit: bool,
    pub has_iloop: bool,
}

impl PrototypeFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            has_child: bits & 0x01 != 0,
            is_variadic: bits & 0x02 != 0,
            uses_ffi: bits & 0x04 != 0,
            no_jit: bits & 0x08 != 0,
            has_iloop: bits & 0x10 != 0,
        }
    }
}

/// How a closure captures one of its upvalues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalueReference {
    /// Slot in the parent frame when `parent_local`, otherwise the parent's
    /// upvalue index.
    pub index: u16,
    pub parent_local: bool,
    pub immutable: bool,
}

impl UpvalueReference {
    pub fn from_raw(raw: u16) -> Self {
        Self {
            index: raw & 0x3FFF,
            parent_local: raw & 0x8000 != 0,
            immutable: raw & 0x4000 != 0,
        }
    }
}

/// A LuaJIT function prototype.
///
/// Instruction addresses start at 0 with the first instruction after the
/// function header, which dumps do not contain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prototype {
    pub flags: PrototypeFlags,
    pub argument_count: u8,
    pub frame_size: u8,
    pub instructions: Vec<Instruction>,
    pub constants: Constants,
    pub upvalues: Vec<UpvalueReference>,
    /// `None` for stripped dumps or prototypes without line info.
    pub debug_info: Option<DebugInfo>,
}

/// A prototype as laid out in the dump, before children are attached.
struct RawPrototype {
    flags: u8,
    argument_count: u8,
    frame_size: u8,
    words: Vec<u32>,
    upvalues: Vec<u16>,
    /// `None` marks a child prototype slot.
    complex: Vec<Option<ComplexConstant>>,
    numeric: Vec<NumericConstant>,
    debug_info: Option<DebugInfo>,
}

fn parse_complex(input: &[u8]) -> IResult<&[u8], Option<ComplexConstant>> {
    let (input, tag) = uleb128_usize(input)?;
    if tag == KGC_CHILD {
        Ok((input, None))
    } else {
        let (input, constant) = ComplexConstant::parse_tagged(input, tag)?;
        Ok((input, Some(constant)))
    }
}

fn parse_raw(input: &[u8], endianness: Endianness, stripped: bool) -> IResult<&[u8], RawPrototype> {
    let (input, flags) = le_u8(input)?;
    let (input, argument_count) = le_u8(input)?;
    let (input, frame_size) = le_u8(input)?;
    let (input, upvalue_count) = le_u8(input)?;
    let (input, complex_count) = uleb128_usize(input)?;
    let (input, numeric_count) = uleb128_usize(input)?;
    let (input, instruction_count) = uleb128_usize(input)?;

    let (input, debug_size, first_line, line_count) = if stripped {
        (input, 0, 0, 0)
    } else {
        let (input, debug_size) = uleb128_usize(input)?;
        if debug_size > 0 {
            let (input, first_line) = uleb128(input)?;
            let (input, line_count) = uleb128(input)?;
            (input, debug_size, first_line, line_count)
        } else {
            (input, 0, 0, 0)
        }
    };

    let (input, words) = parse_list_len(input, nom_u32(endianness), instruction_count)?;
    let (input, upvalues) = parse_list_len(input, nom_u16(endianness), upvalue_count as usize)?;
    let (input, complex) = parse_list_len(input, parse_complex, complex_count)?;
    let (input, numeric) = parse_list_len(input, NumericConstant::parse, numeric_count)?;

    let (input, debug_info) = if debug_size > 0 {
        let (input, block) = take(debug_size)(input)?;
        let (_, info) = DebugInfo::parse(
            block,
            endianness,
            first_line,
            line_count,
            instruction_count,
            upvalue_count as usize,
        )?;
        (input, Some(info))
    } else {
        (input, None)
    };

    Ok((
        input,
        RawPrototype {
            flags,
            argument_count,
            frame_size,
            words,
            upvalues,
            complex,
            numeric,
            debug_info,
        },
    ))
}

impl Prototype {
    /// Parse one prototype body (without its length prefix), returning the
    /// number of bytes consumed.
    ///
    /// Child prototypes referenced by the complex pool are popped from
    /// `children`, which holds every finished prototype not yet claimed by a
    /// parent.
    pub(crate) fn parse(
        input: &[u8],
        endianness: Endianness,
        stripped: bool,
        children: &mut Vec<Prototype>,
    ) -> Result<(usize, Self), ReadError> {
        let (rest, raw) = parse_raw(input, endianness, stripped)?;

        let instructions = Instruction::decode_all(&raw.words)?;
        let upvalues = raw
            .upvalues
            .into_iter()
            .map(UpvalueReference::from_raw)
            .collect();

        let mut complex = Vec::with_capacity(raw.complex.len());
        for constant in raw.complex {
            match constant {
                Some(constant) => complex.push(constant),
                None => {
                    let child = children.pop().ok_or(ReadError::MissingChild)?;
                    complex.push(ComplexConstant::Prototype(Box::new(child)));
                }
            }
        }
        // Operands index the pool from its end.
        complex.reverse();

        Ok((
            input.len() - rest.len(),
            Prototype {
                flags: PrototypeFlags::from_bits(raw.flags),
                argument_count: raw.argument_count,
                frame_size: raw.frame_size,
                instructions,
                constants: Constants {
                    complex,
                    numeric: raw.numeric,
                },
                upvalues,
                debug_info: raw.debug_info,
            },
        ))
    }

    pub fn is_variadic(&self) -> bool {
        self.flags.is_variadic
    }

    /// Nested prototypes in complex pool order.
    pub fn children(&self) -> impl Iterator<Item = &Prototype> {
        self.constants.complex.iter().filter_map(|constant| match constant {
            ComplexConstant::Prototype(child) => Some(child.as_ref()),
            _ => None,
        })
    }
}
