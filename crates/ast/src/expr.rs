use crate::arena::ExprId;
use crate::func::FunctionDefinition;
use crate::types::{BinaryOp, Constant, UnaryOp};

/// A named or register-backed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    /// Register slot of the current frame.
    Slot(u8),
    /// Captured variable, named when debug info is present.
    Upvalue { index: u16, name: Option<String> },
    /// Field of the globals table, named by the raw constant bytes.
    Global(Vec<u8>),
}

/// Number of values a call is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnArity {
    Fixed(u8),
    /// All results are kept (`CALL` with B = 0, tail calls).
    Multiple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub function: ExprId,
    pub arguments: Vec<ExprId>,
    pub returns: ReturnArity,
}

/// A table constructor: `{ a, b, [k] = v }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableConstructor {
    /// Array items, starting at index 1.
    pub array: Vec<ExprId>,
    pub records: Vec<(ExprId, ExprId)>,
}

/// An expression node. Children are arena ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    Constant(Constant),
    BinaryOperator {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    UnaryOperator {
        op: UnaryOp,
        operand: ExprId,
    },
    /// `table[key]`
    TableElement {
        table: ExprId,
        key: ExprId,
    },
    TableConstructor(TableConstructor),
    FunctionCall(FunctionCall),
    Closure(Box<FunctionDefinition>),
    /// `...`
    Vararg,
    /// Open-ended value list: the results of the last call or vararg on
    /// the stack.
    MultipleResults,
}

impl Expression {
    pub fn slot(slot: u8) -> Self {
        Expression::Identifier(Identifier::Slot(slot))
    }

    /// Register slot this expression names, if any.
    pub fn as_slot(&self) -> Option<u8> {
        match self {
            Expression::Identifier(Identifier::Slot(slot)) => Some(*slot),
            _ => None,
        }
    }
}
