mod expressions;
mod operands;
mod statements;
mod warps;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use ljdec_ast::arena::{ExprArena, ExprId};
use ljdec_ast::block::{Block, BlockTable};
use ljdec_ast::expr::Expression;
use ljdec_ast::func::FunctionDefinition;
use ljdec_bytecode::instruction::Instruction;
use ljdec_bytecode::opcode::OpCode;
use ljdec_bytecode::operand::Operand;
use ljdec_bytecode::prototype::Prototype;

use crate::error::BuildError;
use crate::partition;

/// Reconstruct one prototype into a block/warp function definition.
///
/// Nested prototypes created by `FNEW` are reconstructed recursively. Any
/// error aborts the whole prototype.
pub fn build_function(prototype: &Prototype) -> Result<FunctionDefinition, BuildError> {
    let boundaries = partition::block_boundaries(&prototype.instructions)?;
    let ranges = partition::block_ranges(&boundaries);
    debug!(
        "building function: {} instructions, {} blocks",
        prototype.instructions.len(),
        ranges.len()
    );
    Builder::new(prototype, ranges).build()
}

/// Per-prototype reconstruction state, dropped once the function is built.
pub(crate) struct Builder<'a> {
    pub(crate) prototype: &'a Prototype,
    pub(crate) exprs: ExprArena,
    /// Inclusive address range per block.
    pub(crate) ranges: Vec<(usize, usize)>,
    /// Block start address to block index.
    pub(crate) block_index: FxHashMap<usize, usize>,
    pub(crate) warpins: Vec<usize>,
}

impl<'a> Builder<'a> {
    fn new(prototype: &'a Prototype, ranges: Vec<(usize, usize)>) -> Self {
        let block_index = ranges
            .iter()
            .enumerate()
            .map(|(index, &(first, _))| (first, index))
            .collect();
        let mut warpins = vec![0; ranges.len()];
        // Function entry.
        warpins[0] = 1;

        Self {
            prototype,
            exprs: ExprArena::new(),
            ranges,
            block_index,
            warpins,
        }
    }

    fn build(mut self) -> Result<FunctionDefinition, BuildError> {
        let arguments = self.build_arguments();

        let mut built = Vec::with_capacity(self.ranges.len());
        for index in 0..self.ranges.len() {
            let (first, last) = self.ranges[index];
            let (warp, shift) = self.build_warp(index)?;
            trace!("block {} [{}..={}]: {:?}", index, first, last, warp);
            let statements = self.build_statements(first, last + 1 - shift)?;
            built.push((warp, statements));
        }

        let blocks = built
            .into_iter()
            .enumerate()
            .map(|(index, (warp, statements))| {
                let (first_address, last_address) = self.ranges[index];
                Block {
                    index,
                    first_address,
                    last_address,
                    statements,
                    warp,
                    warpins_count: self.warpins[index],
                }
            })
            .collect();

        Ok(FunctionDefinition {
            arguments,
            is_variadic: self.prototype.is_variadic(),
            upvalues: self.prototype.upvalues.clone(),
            debug_info: self.prototype.debug_info.clone(),
            instructions_count: self.prototype.instructions.len(),
            blocks: BlockTable::new(blocks),
            exprs: self.exprs,
        })
    }

    fn build_arguments(&mut self) -> Vec<ExprId> {
        let mut arguments: Vec<ExprId> = (0..self.prototype.argument_count)
            .map(|slot| self.exprs.alloc(Expression::slot(slot)))
            .collect();
        if self.prototype.is_variadic() {
            arguments.push(self.exprs.alloc(Expression::Vararg));
        }
        arguments
    }

    pub(crate) fn instruction(&self, address: usize) -> Instruction {
        self.prototype.instructions[address]
    }

    pub(crate) fn instruction_count(&self) -> usize {
        self.prototype.instructions.len()
    }

    pub(crate) fn line(&self, address: usize) -> Option<u32> {
        self.prototype
            .debug_info
            .as_ref()
            .and_then(|info| info.line_for_address(address))
    }

    /// Register index carried by a slot operand.
    pub(crate) fn slot_of(
        &self,
        address: usize,
        insn: &Instruction,
        operand: Operand,
    ) -> Result<u8, BuildError> {
        operand.slot().ok_or(BuildError::UnexpectedOperand {
            address,
            opcode: insn.opcode,
            operand,
        })
    }

    /// Value carried by an unsigned literal operand.
    pub(crate) fn literal_of(
        &self,
        address: usize,
        insn: &Instruction,
        operand: Operand,
    ) -> Result<usize, BuildError> {
        operand
            .literal()
            .map(usize::from)
            .ok_or(BuildError::UnexpectedOperand {
                address,
                opcode: insn.opcode,
                operand,
            })
    }

    pub(crate) fn alloc_slot(&mut self, slot: u8) -> ExprId {
        self.exprs.alloc(Expression::slot(slot))
    }

    /// Slot identifiers for `count` consecutive registers from `start`.
    pub(crate) fn slot_range(
        &mut self,
        address: usize,
        opcode: OpCode,
        start: usize,
        count: usize,
    ) -> Result<Vec<ExprId>, BuildError> {
        (start..start + count)
            .map(|slot| {
                let slot = u8::try_from(slot).map_err(|_| BuildError::SlotOverflow {
                    address,
                    opcode,
                    slot,
                })?;
                Ok(self.alloc_slot(slot))
            })
            .collect()
    }

    /// Destination of a jump, validated against the instruction stream.
    pub(crate) fn jump_target(&self, address: usize, insn: &Instruction) -> Result<usize, BuildError> {
        partition::checked_destination(address, insn, self.instruction_count())
    }

    /// Record a warp from `address` into the block starting at `target`.
    pub(crate) fn warp_in(
        &mut self,
        address: usize,
        opcode: OpCode,
        target: usize,
    ) -> Result<usize, BuildError> {
        let index = *self
            .block_index
            .get(&target)
            .ok_or(BuildError::UnalignedTarget {
                address,
                opcode,
                target,
            })?;
        self.warpins[index] += 1;
        Ok(target)
    }
}
