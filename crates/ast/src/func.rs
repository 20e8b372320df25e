use ljdec_bytecode::debug::DebugInfo;
use ljdec_bytecode::prototype::UpvalueReference;

use crate::arena::{ExprArena, ExprId};
use crate::block::BlockTable;
use crate::cfg::{self, WarpGraph};
use crate::expr::Expression;

/// A function reconstructed from one prototype.
///
/// Owns its expression arena and block table; nested closures are owned by
/// the `Closure` expressions that create them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionDefinition {
    /// Parameter slots in order, followed by a `Vararg` when variadic.
    pub arguments: Vec<ExprId>,
    pub is_variadic: bool,
    pub upvalues: Vec<UpvalueReference>,
    pub debug_info: Option<DebugInfo>,
    pub instructions_count: usize,
    pub blocks: BlockTable,
    pub exprs: ExprArena,
}

impl FunctionDefinition {
    pub fn expr(&self, id: ExprId) -> &Expression {
        self.exprs.get(id)
    }

    pub fn warp_graph(&self) -> WarpGraph {
        cfg::warp_graph(&self.blocks)
    }

    /// Closures created directly by this function, in block order.
    pub fn closures(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.exprs.iter().filter_map(|(_, expr)| match expr {
            Expression::Closure(function) => Some(function.as_ref()),
            _ => None,
        })
    }
}
