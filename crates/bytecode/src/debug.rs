use nom::number::complete::{le_u8, u16 as nom_u16, u32 as nom_u32};
use nom::number::Endianness;
use nom::IResult;

use crate::uleb128_usize;

/// Compiler-generated locals of `for` loops, named by code rather than string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalVariable {
    ForIndex,
    ForStop,
    ForStep,
    ForGenerator,
    ForState,
    ForControl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableName {
    Named(String),
    Internal(InternalVariable),
}

/// A local variable's name and live range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: VariableName,
    /// First instruction address where the variable is live.
    pub start_address: usize,
    /// Address after the last instruction where the variable is live.
    pub end_address: usize,
}

/// Debug metadata of a prototype (absent in stripped dumps).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo {
    pub first_line: u32,
    pub line_count: u32,
    /// Absolute source line per instruction address.
    pub lines: Vec<u32>,
    pub upvalue_names: Vec<String>,
    pub variables: Vec<VariableInfo>,
}

const VARNAME_END: u8 = 0;
const VARNAME_MAX: u8 = 7;

impl DebugInfo {
    pub fn line_for_address(&self, address: usize) -> Option<u32> {
        self.lines.get(address).copied()
    }

    pub fn upvalue_name(&self, index: usize) -> Option<&str> {
        self.upvalue_names.get(index).map(String::as_str)
    }

    /// Parse the debug block of a prototype.
    ///
    /// Line offsets are stored in the narrowest unsigned type that fits
    /// `line_count`. Variable ranges are delta encoded and count the function
    /// header as address 0, so they are shifted down by one here.
    pub(crate) fn parse(
        input: &[u8],
        endianness: Endianness,
        first_line: u32,
        line_count: u32,
        instruction_count: usize,
        upvalue_count: usize,
    ) -> IResult<&[u8], Self> {
        let mut input = input;

        let mut lines = Vec::with_capacity(instruction_count);
        for _ in 0..instruction_count {
            let (rest, offset) = if line_count < 1 << 8 {
                let (rest, v) = le_u8(input)?;
                (rest, v as u32)
            } else if line_count < 1 << 16 {
                let (rest, v) = nom_u16(endianness)(input)?;
                (rest, v as u32)
            } else {
                nom_u32(endianness)(input)?
            };
            lines.push(first_line.wrapping_add(offset));
            input = rest;
        }

        let mut upvalue_names = Vec::with_capacity(upvalue_count);
        for _ in 0..upvalue_count {
            let (rest, name) = zero_terminated(input)?;
            upvalue_names.push(name);
            input = rest;
        }

        let mut variables = Vec::new();
        let mut last_address = 0usize;
        loop {
            let (rest, code) = le_u8(input)?;
            if code == VARNAME_END {
                input = rest;
                break;
            }
            let (rest, name) = if code < VARNAME_MAX {
                (rest, VariableName::Internal(internal_variable(code)))
            } else {
                let (rest, name) = zero_terminated(input)?;
                (rest, VariableName::Named(name))
            };
            let (rest, start_delta) = uleb128_usize(rest)?;
            let (rest, length) = uleb128_usize(rest)?;
            input = rest;

            let start = last_address + start_delta;
            last_address = start;
            variables.push(VariableInfo {
                name,
                start_address: start.saturating_sub(1),
                end_address: (start + length).saturating_sub(1),
            });
        }

        Ok((
            input,
            DebugInfo {
                first_line,
                line_count,
                lines,
                upvalue_names,
                variables,
            },
        ))
    }
}

fn internal_variable(code: u8) -> InternalVariable {
    match code {
        1 => InternalVariable::ForIndex,
        2 => InternalVariable::ForStop,
        3 => InternalVariable::ForStep,
        4 => InternalVariable::ForGenerator,
        5 => InternalVariable::ForState,
        _ => InternalVariable::ForControl,
    }
}

fn zero_terminated(input: &[u8]) -> IResult<&[u8], String> {
    let (rest, bytes) = nom::bytes::complete::take_till(|b| b == 0)(input)?;
    let (rest, _) = le_u8(rest)?;
    Ok((rest, String::from_utf8_lossy(bytes).into_owned()))
}
