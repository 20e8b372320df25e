/// What an instruction field refers to, following LuaJIT's `BCDEF` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Field is unused.
    None,
    /// Register read.
    Var,
    /// Register written.
    Dst,
    /// First register of a range.
    Base,
    /// First register of a range, read only.
    RBase,
    /// Upvalue index.
    Upvalue,
    /// Unsigned literal.
    Literal,
    /// Signed 16-bit literal.
    SignedLiteral,
    /// Primitive: nil, false or true.
    Primitive,
    /// Index into the numeric constant pool.
    Number,
    /// Index into the complex pool, expected to hold a string.
    String,
    /// Index into the complex pool, expected to hold a table template.
    Table,
    /// Index into the complex pool, expected to hold a child prototype.
    Function,
    /// Index into the complex pool, expected to hold a cdata value.
    Cdata,
    /// Biased jump offset.
    Jump,
}

/// The primitive values addressable by `KPRI`, `ISEQP` and `USETP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Nil,
    False,
    True,
}

impl Primitive {
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Primitive::Nil),
            1 => Some(Primitive::False),
            2 => Some(Primitive::True),
            _ => None,
        }
    }
}

/// A decoded instruction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Slot(u8),
    Upvalue(u16),
    Literal(u16),
    SignedLiteral(i16),
    Primitive(Primitive),
    Number(u16),
    String(u16),
    Table(u16),
    Function(u16),
    Cdata(u16),
    /// Offset relative to the following instruction.
    Jump(i32),
}

impl Operand {
    pub fn slot(self) -> Option<u8> {
        match self {
            Operand::Slot(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn literal(self) -> Option<u16> {
        match self {
            Operand::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn jump(self) -> Option<i32> {
        match self {
            Operand::Jump(offset) => Some(offset),
            _ => None,
        }
    }
}
