use crate::opcode::OpCode;

/// Errors raised while decoding a single instruction word.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode byte {byte:#04x} in instruction {word:#010x}")]
    UnknownOpcode { byte: u8, word: u32 },

    #[error("{opcode:?}: slot operand {raw} does not fit a register")]
    SlotOutOfRange { opcode: OpCode, raw: u16 },

    #[error("{opcode:?}: {raw} is not a primitive value")]
    BadPrimitive { opcode: OpCode, raw: u16 },
}

/// Errors raised while reading a bytecode dump.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("not a LuaJIT bytecode dump (bad signature)")]
    BadSignature,

    #[error("unsupported bytecode version {0} (only version 1 is supported)")]
    UnsupportedVersion(u8),

    #[error("dump contains no prototypes")]
    NoPrototypes,

    #[error("prototype references a child that was never read")]
    MissingChild,

    #[error("{0} prototypes were never attached to a parent")]
    DanglingPrototypes(usize),

    #[error("prototype body has {0} unread bytes")]
    TrailingBytes(usize),

    #[error("malformed dump: {0}")]
    Malformed(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for ReadError {
    fn from(err: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => ReadError::Malformed("truncated input".to_owned()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                ReadError::Malformed(format!("{:?} with {} bytes left", e.code, e.input.len()))
            }
        }
    }
}
