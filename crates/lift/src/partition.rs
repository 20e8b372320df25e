use ljdec_bytecode::instruction::Instruction;
use ljdec_bytecode::opcode::OpCode;
use rustc_hash::FxHashSet;

use crate::error::BuildError;

/// Compute block boundaries from a prototype's instruction stream.
///
/// A new block starts at:
/// - address 0 (function entry)
/// - the destination of any jump (`JMP`, `UCLO`, `ISNEXT`, `FORI`)
/// - the instruction after a jump or a loop latch (`FORL`, `ITERL`)
///
/// A `UCLO` whose destination is the next instruction only closes upvalues
/// and does not split. Conditional tests need no handling of their own since
/// each is followed by the `JMP` that carries the split.
///
/// Returns the sorted boundaries, ending with the instruction count.
pub fn block_boundaries(instructions: &[Instruction]) -> Result<Vec<usize>, BuildError> {
    let count = instructions.len();
    if count == 0 {
        return Err(BuildError::EmptyPrototype);
    }

    let mut starts = FxHashSet::default();
    starts.insert(0);

    for (address, insn) in instructions.iter().enumerate() {
        if insn.opcode.is_jump() {
            let destination = checked_destination(address, insn, count)?;
            if insn.opcode == OpCode::UClo && destination == address + 1 {
                continue;
            }
            starts.insert(destination);
            starts.insert(address + 1);
        } else if insn.opcode.is_loop_latch() {
            checked_destination(address, insn, count)?;
            starts.insert(address + 1);
        }
    }

    let mut boundaries: Vec<usize> = starts.into_iter().filter(|&a| a < count).collect();
    boundaries.sort_unstable();
    boundaries.push(count);
    Ok(boundaries)
}

/// Inclusive `(first, last)` address pairs from consecutive boundaries.
pub fn block_ranges(boundaries: &[usize]) -> Vec<(usize, usize)> {
    boundaries.windows(2).map(|w| (w[0], w[1] - 1)).collect()
}

/// Destination of the jump carried by `insn`, checked against the stream.
pub(crate) fn checked_destination(
    address: usize,
    insn: &Instruction,
    count: usize,
) -> Result<usize, BuildError> {
    let destination = insn
        .jump_destination(address)
        .ok_or(BuildError::UnexpectedOperand {
            address,
            opcode: insn.opcode,
            operand: insn.cd,
        })?;
    if destination < 0 || destination >= count as i64 {
        return Err(BuildError::JumpOutOfRange {
            address,
            opcode: insn.opcode,
            destination,
            count,
        });
    }
    Ok(destination as usize)
}
