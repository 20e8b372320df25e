use ljdec_bytecode::opcode::OpCode;
use ljdec_bytecode::operand::Operand;

/// Reasons a prototype cannot be reconstructed.
///
/// Every variant except `EmptyPrototype` names the offending instruction.
/// A failure aborts the whole prototype; no partial function is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("prototype has no instructions")]
    EmptyPrototype,

    #[error("{address}: {opcode} jumps to {destination}, outside 0..{count}")]
    JumpOutOfRange {
        address: usize,
        opcode: OpCode,
        destination: i64,
        count: usize,
    },

    #[error("{address}: {opcode} targets {target}, which does not start a block")]
    UnalignedTarget {
        address: usize,
        opcode: OpCode,
        target: usize,
    },

    #[error("{address}: {opcode} cannot end a block without its partner instruction")]
    UnmatchedWarp { address: usize, opcode: OpCode },

    #[error("{address}: {opcode} does not form a loop: {reason}")]
    MismatchedLoop {
        address: usize,
        opcode: OpCode,
        reason: &'static str,
    },

    #[error("{address}: {opcode} cannot appear inside a block body")]
    UnexpectedInstruction { address: usize, opcode: OpCode },

    #[error("{address}: {opcode} has unexpected operand {operand:?}")]
    UnexpectedOperand {
        address: usize,
        opcode: OpCode,
        operand: Operand,
    },

    #[error("{address}: {opcode} addresses slot {slot}, past the last register")]
    SlotOverflow {
        address: usize,
        opcode: OpCode,
        slot: usize,
    },

    #[error("{address}: {opcode} references missing constant {operand:?}")]
    MissingConstant {
        address: usize,
        opcode: OpCode,
        operand: Operand,
    },

    #[error("{address}: nested function could not be reconstructed")]
    Nested {
        address: usize,
        #[source]
        source: Box<BuildError>,
    },
}
