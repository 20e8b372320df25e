use rustc_hash::FxHashMap;

use crate::arena::ExprId;
use crate::cfg::EdgeKind;
use crate::stmt::Statement;

/// How an unconditional warp moves control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// Falls into the next block.
    Flow,
    /// Forward (or non-looping) jump.
    Jump,
    /// Jump to an address at or before the jump itself.
    LoopBack,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnconditionalWarp {
    pub kind: FlowKind,
    pub target: usize,
    /// Set for `UCLO`: upvalues of the leaving scope are closed.
    pub closes_scope: bool,
}

/// Two-way branch. The condition holds on the fallthrough path.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalWarp {
    pub condition: ExprId,
    pub true_target: usize,
    pub false_target: usize,
    /// Slot whose value the test copies or inspects (`ISTC`/`ISFC`
    /// destination, `IST`/`ISF` operand), used to rebuild `and`/`or`.
    pub value_slot: Option<u8>,
}

/// Generic `for ... in` loop entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IteratorWarp {
    /// Generator, state and control values.
    pub controls: [ExprId; 3],
    pub variables: Vec<ExprId>,
    pub body: usize,
    pub way_out: usize,
}

/// Numeric `for` loop entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericLoopWarp {
    /// Start, limit and step.
    pub controls: [ExprId; 3],
    pub index: ExprId,
    pub body: usize,
    pub way_out: usize,
}

/// How control leaves a block. Targets are block start addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Warp {
    Unconditional(UnconditionalWarp),
    Conditional(ConditionalWarp),
    Iterator(IteratorWarp),
    NumericLoop(NumericLoopWarp),
    End,
}

impl Warp {
    /// Successor addresses labeled by the role of each edge.
    pub fn targets(&self) -> Vec<(EdgeKind, usize)> {
        match self {
            Warp::Unconditional(warp) => {
                let kind = match warp.kind {
                    FlowKind::Flow => EdgeKind::Flow,
                    FlowKind::Jump => EdgeKind::Jump,
                    FlowKind::LoopBack => EdgeKind::LoopBack,
                };
                vec![(kind, warp.target)]
            }
            Warp::Conditional(warp) => vec![
                (EdgeKind::True, warp.true_target),
                (EdgeKind::False, warp.false_target),
            ],
            Warp::Iterator(IteratorWarp { body, way_out, .. })
            | Warp::NumericLoop(NumericLoopWarp { body, way_out, .. }) => {
                vec![(EdgeKind::Body, *body), (EdgeKind::WayOut, *way_out)]
            }
            Warp::End => Vec::new(),
        }
    }
}

/// A basic block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub index: usize,
    pub first_address: usize,
    /// Last instruction address, warp instructions included.
    pub last_address: usize,
    pub statements: Vec<Statement>,
    pub warp: Warp,
    /// Number of warps targeting this block; the entry block counts one
    /// extra for the function entry.
    pub warpins_count: usize,
}

/// Blocks in address order with an index by start address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTable {
    blocks: Vec<Block>,
    by_address: FxHashMap<usize, usize>,
}

impl BlockTable {
    pub fn new(blocks: Vec<Block>) -> Self {
        let by_address = blocks
            .iter()
            .map(|block| (block.first_address, block.index))
            .collect();
        Self { blocks, by_address }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Index of the block starting at `address`.
    pub fn index_of(&self, address: usize) -> Option<usize> {
        self.by_address.get(&address).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }
}

impl std::ops::Index<usize> for BlockTable {
    type Output = Block;

    fn index(&self, index: usize) -> &Block {
        &self.blocks[index]
    }
}

impl<'a> IntoIterator for &'a BlockTable {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
