use crate::error::DecodeError;
use crate::opcode::OpCode;
use crate::operand::{Operand, OperandKind, Primitive};

/// Bias applied to jump offsets stored in the D field.
pub const JUMP_BIAS: i32 = 0x8000;

/// A decoded LuaJIT bytecode instruction.
///
/// Instructions come in two formats:
/// - **ABC**: opcode(8) + A(8) + C(8) + B(8)
/// - **AD**: opcode(8) + A(8) + D(16)
///
/// Every field is decoded into a typed [`Operand`] according to the opcode's
/// operand kinds, so later stages never look at raw bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub a: Operand,
    pub b: Operand,
    /// C for ABC instructions, D for AD instructions.
    pub cd: Operand,
}

impl Instruction {
    /// Decode a single 32-bit instruction word.
    pub fn decode(word: u32) -> Result<Self, DecodeError> {
        let byte = (word & 0xFF) as u8;
        let opcode = OpCode::from_byte(byte).ok_or(DecodeError::UnknownOpcode { byte, word })?;

        let a = ((word >> 8) & 0xFF) as u8;
        let (b, cd) = if opcode.is_abc() {
            ((word >> 24) as u8, ((word >> 16) & 0xFF) as u16)
        } else {
            (0, (word >> 16) as u16)
        };

        Self::from_fields(opcode, a, b, cd)
    }

    /// Build an instruction from raw field values.
    pub fn from_fields(opcode: OpCode, a: u8, b: u8, cd: u16) -> Result<Self, DecodeError> {
        let (kind_a, kind_b, kind_cd) = opcode.operand_kinds();
        Ok(Self {
            opcode,
            a: decode_operand(opcode, kind_a, a as u16)?,
            b: decode_operand(opcode, kind_b, b as u16)?,
            cd: decode_operand(opcode, kind_cd, cd)?,
        })
    }

    /// Decode an instruction stream from raw words.
    pub fn decode_all(words: &[u32]) -> Result<Vec<Self>, DecodeError> {
        words.iter().map(|&word| Self::decode(word)).collect()
    }

    /// Absolute destination of the C/D jump, relative to `address`.
    ///
    /// May lie outside the instruction stream; callers validate it.
    pub fn jump_destination(&self, address: usize) -> Option<i64> {
        self.cd
            .jump()
            .map(|offset| address as i64 + 1 + offset as i64)
    }
}

fn decode_operand(opcode: OpCode, kind: OperandKind, raw: u16) -> Result<Operand, DecodeError> {
    let operand = match kind {
        OperandKind::None => Operand::None,
        OperandKind::Var | OperandKind::Dst | OperandKind::Base | OperandKind::RBase => {
            let slot = u8::try_from(raw).map_err(|_| DecodeError::SlotOutOfRange { opcode, raw })?;
            Operand::Slot(slot)
        }
        OperandKind::Upvalue => Operand::Upvalue(raw),
        OperandKind::Literal => Operand::Literal(raw),
        OperandKind::SignedLiteral => Operand::SignedLiteral(raw as i16),
        OperandKind::Primitive => {
            let primitive =
                Primitive::from_raw(raw).ok_or(DecodeError::BadPrimitive { opcode, raw })?;
            Operand::Primitive(primitive)
        }
        OperandKind::Number => Operand::Number(raw),
        OperandKind::String => Operand::String(raw),
        OperandKind::Table => Operand::Table(raw),
        OperandKind::Function => Operand::Function(raw),
        OperandKind::Cdata => Operand::Cdata(raw),
        OperandKind::Jump => Operand::Jump(raw as i32 - JUMP_BIAS),
    };
    Ok(operand)
}
