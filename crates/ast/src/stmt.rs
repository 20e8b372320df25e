use crate::arena::ExprId;

/// `destinations = expressions`
///
/// Destination `i` receives expression `i`; a trailing multi-value
/// expression supplies any remaining destinations.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub destinations: Vec<ExprId>,
    pub expressions: Vec<ExprId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Assignment(Assignment),
    /// Function call evaluated for its effects.
    Call(ExprId),
    Return(Vec<ExprId>),
}

/// A statement reconstructed from one instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub address: usize,
    /// Source line from debug info.
    pub line: Option<u32>,
    pub kind: StatementKind,
}
