use ljdec_bytecode::instruction::{Instruction, JUMP_BIAS};
use ljdec_bytecode::opcode::OpCode;
use ljdec_bytecode::prototype::Prototype;

/// Instruction from raw A, B and C/D field values.
pub(crate) fn ins(op: OpCode, a: u8, b: u8, cd: u16) -> Instruction {
    Instruction::from_fields(op, a, b, cd).unwrap()
}

/// Jump-carrying instruction with a relative offset.
pub(crate) fn jump(op: OpCode, a: u8, offset: i32) -> Instruction {
    Instruction::from_fields(op, a, 0, (offset + JUMP_BIAS) as u16).unwrap()
}

pub(crate) fn proto(instructions: Vec<Instruction>) -> Prototype {
    Prototype {
        instructions,
        ..Prototype::default()
    }
}
