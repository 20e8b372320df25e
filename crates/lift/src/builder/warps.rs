use ljdec_ast::arena::ExprId;
use ljdec_ast::block::{
    ConditionalWarp, FlowKind, IteratorWarp, NumericLoopWarp, UnconditionalWarp, Warp,
};
use ljdec_bytecode::instruction::Instruction;
use ljdec_bytecode::opcode::OpCode;

use crate::error::BuildError;

impl<'a> super::Builder<'a> {
    /// Classify how control leaves block `index`.
    ///
    /// Returns the warp and the number of tail instructions it consumed;
    /// those are excluded from the block's statements.
    pub(super) fn build_warp(&mut self, index: usize) -> Result<(Warp, usize), BuildError> {
        if index + 1 == self.ranges.len() {
            return Ok((Warp::End, 0));
        }

        let (first, last) = self.ranges[index];
        let insn = self.instruction(last);
        let previous = (last > first).then(|| self.instruction(last - 1));

        match insn.opcode {
            OpCode::IsNext | OpCode::Jmp => {
                if let Some(warp) = self.build_iterator_warp(last, &insn)? {
                    return Ok((warp, 1));
                }
                if insn.opcode == OpCode::IsNext {
                    return Err(BuildError::MismatchedLoop {
                        address: last,
                        opcode: insn.opcode,
                        reason: "not followed by an iterator call and ITERL",
                    });
                }
                match previous {
                    Some(test) if test.opcode.is_test() => {
                        let warp = self.build_conditional_warp(last - 1, &test, last, &insn)?;
                        Ok((warp, 2))
                    }
                    _ => Ok((self.build_jump_warp(last, &insn, false)?, 1)),
                }
            }

            OpCode::UClo => {
                if self.jump_target(last, &insn)? == last + 1 {
                    let warp = self.build_flow_warp(last, insn.opcode, true)?;
                    Ok((warp, 1))
                } else {
                    Ok((self.build_jump_warp(last, &insn, true)?, 1))
                }
            }

            OpCode::ForI | OpCode::JForI => Ok((self.build_numeric_loop_warp(last, &insn)?, 1)),

            OpCode::ForL | OpCode::IForL | OpCode::JForL => Ok((self.build_latch_warp(last, &insn)?, 1)),

            OpCode::IterL | OpCode::IIterL | OpCode::JIterL => match previous {
                Some(call) if call.opcode.is_iterator_call() => {
                    Ok((self.build_latch_warp(last, &insn)?, 2))
                }
                _ => Err(BuildError::UnmatchedWarp {
                    address: last,
                    opcode: insn.opcode,
                }),
            },

            OpCode::IsLt
            | OpCode::IsGe
            | OpCode::IsLe
            | OpCode::IsGt
            | OpCode::IsEqV
            | OpCode::IsNeV
            | OpCode::IsEqS
            | OpCode::IsNeS
            | OpCode::IsEqN
            | OpCode::IsNeN
            | OpCode::IsEqP
            | OpCode::IsNeP
            | OpCode::IsTC
            | OpCode::IsFC
            | OpCode::IsT
            | OpCode::IsF => Err(BuildError::UnmatchedWarp {
                address: last,
                opcode: insn.opcode,
            }),

            // The next address is a jump target; control just falls through.
            _ => Ok((self.build_flow_warp(last, insn.opcode, false)?, 0)),
        }
    }

    fn build_flow_warp(
        &mut self,
        address: usize,
        opcode: OpCode,
        closes_scope: bool,
    ) -> Result<Warp, BuildError> {
        let target = self.warp_in(address, opcode, address + 1)?;
        Ok(Warp::Unconditional(UnconditionalWarp {
            kind: FlowKind::Flow,
            target,
            closes_scope,
        }))
    }

    fn build_jump_warp(
        &mut self,
        address: usize,
        insn: &Instruction,
        closes_scope: bool,
    ) -> Result<Warp, BuildError> {
        let destination = self.jump_target(address, insn)?;
        let target = self.warp_in(address, insn.opcode, destination)?;
        let kind = if target <= address {
            FlowKind::LoopBack
        } else {
            FlowKind::Jump
        };
        Ok(Warp::Unconditional(UnconditionalWarp {
            kind,
            target,
            closes_scope,
        }))
    }

    fn build_conditional_warp(
        &mut self,
        test_address: usize,
        test: &Instruction,
        jump_address: usize,
        jump: &Instruction,
    ) -> Result<Warp, BuildError> {
        let condition = self.build_test_condition(test_address, test)?;
        let true_target = self.warp_in(jump_address, jump.opcode, jump_address + 1)?;
        let destination = self.jump_target(jump_address, jump)?;
        let false_target = self.warp_in(jump_address, jump.opcode, destination)?;
        let value_slot = match test.opcode {
            OpCode::IsTC | OpCode::IsFC => test.a.slot(),
            OpCode::IsT | OpCode::IsF => test.cd.slot(),
            _ => None,
        };
        Ok(Warp::Conditional(ConditionalWarp {
            condition,
            true_target,
            false_target,
            value_slot,
        }))
    }

    /// Generic `for` entry: a `JMP`/`ISNEXT` into an `ITERC`/`ITERN` followed
    /// by an `ITERL` that jumps back to the instruction after the entry.
    ///
    /// Returns `None` when the jump is not shaped like a loop entry.
    fn build_iterator_warp(
        &mut self,
        address: usize,
        insn: &Instruction,
    ) -> Result<Option<Warp>, BuildError> {
        let call_address = self.jump_target(address, insn)?;
        let latch_address = call_address + 1;
        if latch_address >= self.instruction_count() {
            return Ok(None);
        }
        let call = self.instruction(call_address);
        let latch = self.instruction(latch_address);
        if !call.opcode.is_iterator_call() || !latch.opcode.is_iterator_loop_latch() {
            return Ok(None);
        }
        if latch.jump_destination(latch_address) != Some(address as i64 + 1) {
            return Ok(None);
        }

        let base = self.slot_of(call_address, &call, call.a)?;
        if base < 3 {
            return Err(BuildError::MismatchedLoop {
                address: call_address,
                opcode: call.opcode,
                reason: "iterator call has no room for its control slots",
            });
        }
        let results = self.literal_of(call_address, &call, call.b)?;

        let controls = self.control_slots(base - 3);
        let variables = self.slot_range(
            call_address,
            call.opcode,
            base as usize,
            results.saturating_sub(1),
        )?;
        let body = self.warp_in(latch_address, latch.opcode, address + 1)?;
        let way_out = self.warp_in(latch_address, latch.opcode, latch_address + 1)?;

        Ok(Some(Warp::Iterator(IteratorWarp {
            controls,
            variables,
            body,
            way_out,
        })))
    }

    /// Numeric `for` entry. The `FORI` skips to just past its `FORL`, which
    /// must sit on the same base slot.
    fn build_numeric_loop_warp(
        &mut self,
        address: usize,
        insn: &Instruction,
    ) -> Result<Warp, BuildError> {
        let way_out = self.jump_target(address, insn)?;
        let latch_address = way_out.checked_sub(1).filter(|&latch| latch > address).ok_or(
            BuildError::MismatchedLoop {
                address,
                opcode: insn.opcode,
                reason: "loop exit does not follow the loop",
            },
        )?;
        let latch = self.instruction(latch_address);
        if !latch.opcode.is_numeric_loop_latch() || latch.a != insn.a {
            return Err(BuildError::MismatchedLoop {
                address,
                opcode: insn.opcode,
                reason: "no matching FORL before the loop exit",
            });
        }

        let base = self.slot_of(address, insn, insn.a)?;
        if base > u8::MAX - 3 {
            return Err(BuildError::SlotOverflow {
                address,
                opcode: insn.opcode,
                slot: base as usize + 3,
            });
        }
        let controls = self.control_slots(base);
        let index = self.alloc_slot(base + 3);

        let body_start = self.jump_target(latch_address, &latch)?;
        let body = self.warp_in(latch_address, latch.opcode, body_start)?;
        let way_out = self.warp_in(address, insn.opcode, way_out)?;

        Ok(Warp::NumericLoop(NumericLoopWarp {
            controls,
            index,
            body,
            way_out,
        }))
    }

    /// Bottom of a `for` loop: jumps back to the block holding the loop
    /// entry, which is the block just before the body.
    fn build_latch_warp(&mut self, address: usize, insn: &Instruction) -> Result<Warp, BuildError> {
        let body_start = self.jump_target(address, insn)?;
        let body_block = *self
            .block_index
            .get(&body_start)
            .ok_or(BuildError::UnalignedTarget {
                address,
                opcode: insn.opcode,
                target: body_start,
            })?;
        let entry = body_block.checked_sub(1).ok_or(BuildError::MismatchedLoop {
            address,
            opcode: insn.opcode,
            reason: "loop body starts the function",
        })?;

        let (entry_first, entry_last) = self.ranges[entry];
        let entry_opcode = self.instruction(entry_last).opcode;
        let matches_entry = if insn.opcode.is_numeric_loop_latch() {
            entry_opcode.is_numeric_loop_entry()
        } else {
            matches!(entry_opcode, OpCode::Jmp | OpCode::IsNext)
        };
        if !matches_entry {
            return Err(BuildError::MismatchedLoop {
                address,
                opcode: insn.opcode,
                reason: "block before the loop body is not a loop entry",
            });
        }

        let target = self.warp_in(address, insn.opcode, entry_first)?;
        Ok(Warp::Unconditional(UnconditionalWarp {
            kind: FlowKind::LoopBack,
            target,
            closes_scope: false,
        }))
    }

    /// Identifiers for three consecutive control slots from `base`.
    fn control_slots(&mut self, base: u8) -> [ExprId; 3] {
        [
            self.alloc_slot(base),
            self.alloc_slot(base + 1),
            self.alloc_slot(base + 2),
        ]
    }
}
