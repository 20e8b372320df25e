use ljdec_ast::arena::ExprId;
use ljdec_ast::expr::{Expression, Identifier, ReturnArity, TableConstructor};
use ljdec_ast::stmt::{Assignment, Statement, StatementKind};
use ljdec_ast::types::Constant;
use ljdec_bytecode::instruction::Instruction;
use ljdec_bytecode::opcode::OpCode;
use ljdec_bytecode::operand::Operand;

use crate::error::BuildError;

impl<'a> super::Builder<'a> {
    /// Statements for addresses `first..end`, one instruction at a time.
    pub(super) fn build_statements(
        &mut self,
        first: usize,
        end: usize,
    ) -> Result<Vec<Statement>, BuildError> {
        let mut statements = Vec::with_capacity(end.saturating_sub(first));
        for address in first..end {
            let insn = self.instruction(address);
            if let Some(kind) = self.build_statement(address, &insn)? {
                statements.push(Statement {
                    address,
                    line: self.line(address),
                    kind,
                });
            }
        }
        Ok(statements)
    }

    fn build_statement(
        &mut self,
        address: usize,
        insn: &Instruction,
    ) -> Result<Option<StatementKind>, BuildError> {
        let kind = match insn.opcode {
            OpCode::Mov | OpCode::Not | OpCode::Unm | OpCode::Len => {
                let value = self.build_unary(address, insn)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::AddVN
            | OpCode::SubVN
            | OpCode::MulVN
            | OpCode::DivVN
            | OpCode::ModVN
            | OpCode::AddNV
            | OpCode::SubNV
            | OpCode::MulNV
            | OpCode::DivNV
            | OpCode::ModNV
            | OpCode::AddVV
            | OpCode::SubVV
            | OpCode::MulVV
            | OpCode::DivVV
            | OpCode::ModVV
            | OpCode::Pow => {
                let value = self.build_arithmetic(address, insn)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::Cat => {
                let value = self.build_concat(address, insn)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::KStr | OpCode::KCData | OpCode::KShort | OpCode::KNum | OpCode::KPri => {
                let value = self.resolve(address, insn.opcode, insn.cd)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::KNil => {
                let first = self.slot_of(address, insn, insn.a)?;
                let last = self.slot_of(address, insn, insn.cd)?;
                if last < first {
                    return Err(BuildError::UnexpectedOperand {
                        address,
                        opcode: insn.opcode,
                        operand: insn.cd,
                    });
                }
                let destinations: Vec<ExprId> =
                    (first..=last).map(|slot| self.alloc_slot(slot)).collect();
                let expressions = destinations
                    .iter()
                    .map(|_| self.exprs.alloc(Expression::Constant(Constant::Nil)))
                    .collect();
                assign(destinations, expressions)
            }

            OpCode::UGet => {
                let value = self.resolve(address, insn.opcode, insn.cd)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::USetV | OpCode::USetS | OpCode::USetN | OpCode::USetP => {
                let destination = self.resolve(address, insn.opcode, insn.a)?;
                let value = self.resolve(address, insn.opcode, insn.cd)?;
                assign(vec![destination], vec![value])
            }

            OpCode::FNew => {
                let value = self.build_closure(address, insn)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::TNew => {
                let value = self
                    .exprs
                    .alloc(Expression::TableConstructor(TableConstructor::default()));
                self.assign_slot(address, insn, value)?
            }

            OpCode::TDup => {
                let value = self.build_table_copy(address, insn)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::GGet => {
                let value = self.global(address, insn)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::GSet => {
                let destination = self.global(address, insn)?;
                let value = self.resolve(address, insn.opcode, insn.a)?;
                assign(vec![destination], vec![value])
            }

            OpCode::TGetV | OpCode::TGetS | OpCode::TGetB => {
                let value = self.build_table_element(address, insn)?;
                self.assign_slot(address, insn, value)?
            }

            OpCode::TSetV | OpCode::TSetS | OpCode::TSetB => {
                let destination = self.build_table_element(address, insn)?;
                let value = self.resolve(address, insn.opcode, insn.a)?;
                assign(vec![destination], vec![value])
            }

            OpCode::TSetM => {
                let base = self.slot_of(address, insn, insn.a)?;
                let table_slot = base.checked_sub(1).ok_or(BuildError::UnexpectedOperand {
                    address,
                    opcode: insn.opcode,
                    operand: insn.a,
                })?;
                let index = match insn.cd {
                    Operand::Number(index) => index,
                    operand => {
                        return Err(BuildError::UnexpectedOperand {
                            address,
                            opcode: insn.opcode,
                            operand,
                        })
                    }
                };
                let start = self
                    .numeric_constant(address, insn.opcode, index)?
                    .table_start_index();

                let table = self.alloc_slot(table_slot);
                let key = self.exprs.alloc(Expression::Constant(Constant::Integer(start)));
                let destination = self.exprs.alloc(Expression::TableElement { table, key });
                let value = self.exprs.alloc(Expression::MultipleResults);
                assign(vec![destination], vec![value])
            }

            OpCode::Call | OpCode::CallM => {
                let results = self.literal_of(address, insn, insn.b)?;
                match results {
                    0 => {
                        let call = self.build_call(address, insn, ReturnArity::Multiple)?;
                        let destination = self.exprs.alloc(Expression::MultipleResults);
                        assign(vec![destination], vec![call])
                    }
                    1 => StatementKind::Call(self.build_call(address, insn, ReturnArity::Fixed(0))?),
                    _ => {
                        let returns = u8::try_from(results - 1).map_err(|_| {
                            BuildError::UnexpectedOperand {
                                address,
                                opcode: insn.opcode,
                                operand: insn.b,
                            }
                        })?;
                        let call = self.build_call(address, insn, ReturnArity::Fixed(returns))?;
                        let destinations = self.result_slots(address, insn, results - 1)?;
                        assign(destinations, vec![call])
                    }
                }
            }

            OpCode::CallT | OpCode::CallMT => {
                let call = self.build_call(address, insn, ReturnArity::Multiple)?;
                StatementKind::Return(vec![call])
            }

            OpCode::VArg => {
                let results = self.literal_of(address, insn, insn.b)?;
                let value = self.exprs.alloc(Expression::Vararg);
                let destinations = if results == 0 {
                    vec![self.exprs.alloc(Expression::MultipleResults)]
                } else {
                    self.result_slots(address, insn, results - 1)?
                };
                assign(destinations, vec![value])
            }

            OpCode::Ret0 | OpCode::Ret1 | OpCode::Ret | OpCode::RetM => {
                let base = self.slot_of(address, insn, insn.a)?;
                let field = self.literal_of(address, insn, insn.cd)?;
                let open = insn.opcode == OpCode::RetM;
                let count = if open { field } else { field.saturating_sub(1) };
                let mut values = self.slot_range(address, insn.opcode, base as usize, count)?;
                if open {
                    values.push(self.exprs.alloc(Expression::MultipleResults));
                }
                StatementKind::Return(values)
            }

            OpCode::UClo if insn.jump_destination(address) == Some(address as i64 + 1) => {
                return Ok(None);
            }

            OpCode::Loop
            | OpCode::ILoop
            | OpCode::JLoop
            | OpCode::FuncF
            | OpCode::IFuncF
            | OpCode::JFuncF
            | OpCode::FuncV
            | OpCode::IFuncV
            | OpCode::JFuncV
            | OpCode::FuncC
            | OpCode::FuncCW => return Ok(None),

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
            | OpCode::IsF
            | OpCode::UClo
            | OpCode::IterC
            | OpCode::IterN
            | OpCode::IsNext
            | OpCode::ForI
            | OpCode::JForI
            | OpCode::ForL
            | OpCode::IForL
            | OpCode::JForL
            | OpCode::IterL
            | OpCode::IIterL
            | OpCode::JIterL
            | OpCode::Jmp => return Err(self.unexpected(address, insn)),
        };
        Ok(Some(kind))
    }

    /// `slot A = value`
    fn assign_slot(
        &mut self,
        address: usize,
        insn: &Instruction,
        value: ExprId,
    ) -> Result<StatementKind, BuildError> {
        let slot = self.slot_of(address, insn, insn.a)?;
        let destination = self.alloc_slot(slot);
        Ok(assign(vec![destination], vec![value]))
    }

    /// Slots `A .. A+count-1` receiving the results of a call or vararg.
    fn result_slots(
        &mut self,
        address: usize,
        insn: &Instruction,
        count: usize,
    ) -> Result<Vec<ExprId>, BuildError> {
        let base = self.slot_of(address, insn, insn.a)?;
        self.slot_range(address, insn.opcode, base as usize, count)
    }

    /// Global named by the string operand of `GGET`/`GSET`.
    fn global(&mut self, address: usize, insn: &Instruction) -> Result<ExprId, BuildError> {
        let name = self.string_constant(address, insn.opcode, insn.cd)?.to_vec();
        Ok(self
            .exprs
            .alloc(Expression::Identifier(Identifier::Global(name))))
    }
}

fn assign(destinations: Vec<ExprId>, expressions: Vec<ExprId>) -> StatementKind {
    StatementKind::Assignment(Assignment {
        destinations,
        expressions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_function;
    use crate::test_util::{ins, proto};
    use ljdec_ast::expr::FunctionCall;
    use ljdec_ast::func::FunctionDefinition;
    use ljdec_ast::types::BinaryOp;
    use ljdec_ast::block::Warp;
    use ljdec_bytecode::constant::{ComplexConstant, NumericConstant, TableItem, TableTemplate};
    use ljdec_bytecode::debug::DebugInfo;

    fn statements(func: &FunctionDefinition) -> &[Statement] {
        &func.blocks[0].statements
    }

    fn assignment(statement: &Statement) -> &Assignment {
        match &statement.kind {
            StatementKind::Assignment(assignment) => assignment,
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    fn call(func: &FunctionDefinition, id: ExprId) -> &FunctionCall {
        match func.expr(id) {
            Expression::FunctionCall(call) => call,
            other => panic!("expected call, got {:?}", other),
        }
    }

    fn slot(func: &FunctionDefinition, id: ExprId) -> Option<u8> {
        func.expr(id).as_slot()
    }

    fn integer(func: &FunctionDefinition, id: ExprId) -> Option<i64> {
        match func.expr(id) {
            Expression::Constant(Constant::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    #[test]
    fn test_single_return_function() {
        let func = build_function(&proto(vec![ins(OpCode::Ret0, 0, 0, 1)])).unwrap();
        assert_eq!(func.blocks.len(), 1);
        let block = &func.blocks[0];
        assert_eq!(block.warp, Warp::End);
        assert_eq!(block.warpins_count, 1);
        assert_eq!(block.statements.len(), 1);
        assert_eq!(block.statements[0].kind, StatementKind::Return(vec![]));
        assert!(func.arguments.is_empty());
    }

    #[test]
    fn test_arithmetic_operand_order() {
        let ops = [
            BinaryOp::Add,
            BinaryOp::Subtract,
            BinaryOp::Multiply,
            BinaryOp::Divide,
            BinaryOp::Modulo,
        ];
        for byte in OpCode::AddVN as u8..=OpCode::Pow as u8 {
            let opcode = OpCode::from_byte(byte).unwrap();
            let mut prototype = proto(vec![ins(opcode, 2, 1, 0), ins(OpCode::Ret0, 0, 0, 1)]);
            prototype.constants.numeric = vec![NumericConstant::Integer(7)];
            let func = build_function(&prototype).unwrap();

            let assign = assignment(&statements(&func)[0]);
            assert_eq!(slot(&func, assign.destinations[0]), Some(2));
            let (op, left, right) = match func.expr(assign.expressions[0]) {
                Expression::BinaryOperator { op, left, right } => (*op, *left, *right),
                other => panic!("{}: expected binary operator, got {:?}", opcode, other),
            };

            let offset = (byte - OpCode::AddVN as u8) as usize;
            if opcode == OpCode::Pow {
                assert_eq!(op, BinaryOp::Power);
            } else {
                assert_eq!(op, ops[offset % 5], "{}", opcode);
            }
            match offset / 5 {
                0 => {
                    assert_eq!(slot(&func, left), Some(1), "{}", opcode);
                    assert_eq!(integer(&func, right), Some(7), "{}", opcode);
                }
                1 => {
                    assert_eq!(integer(&func, left), Some(7), "{}", opcode);
                    assert_eq!(slot(&func, right), Some(1), "{}", opcode);
                }
                _ => {
                    assert_eq!(slot(&func, left), Some(1), "{}", opcode);
                    assert_eq!(slot(&func, right), Some(0), "{}", opcode);
                }
            }
        }
    }

    #[test]
    fn test_concat_is_left_nested() {
        let func = build_function(&proto(vec![
            ins(OpCode::Cat, 0, 1, 3),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        let assign = assignment(&statements(&func)[0]);
        let (left, right) = match func.expr(assign.expressions[0]) {
            Expression::BinaryOperator {
                op: BinaryOp::Concat,
                left,
                right,
            } => (*left, *right),
            other => panic!("expected concat, got {:?}", other),
        };
        assert_eq!(slot(&func, right), Some(3));
        match func.expr(left) {
            Expression::BinaryOperator {
                op: BinaryOp::Concat,
                left,
                right,
            } => {
                assert_eq!(slot(&func, *left), Some(1));
                assert_eq!(slot(&func, *right), Some(2));
            }
            other => panic!("expected nested concat, got {:?}", other),
        }
    }

    #[test]
    fn test_call_result_arities() {
        // B = 0: all results, one argument
        let func = build_function(&proto(vec![
            ins(OpCode::Call, 0, 0, 2),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        let assign = assignment(&statements(&func)[0]);
        assert_eq!(func.expr(assign.destinations[0]), &Expression::MultipleResults);
        let c = call(&func, assign.expressions[0]);
        assert_eq!(c.returns, ReturnArity::Multiple);
        assert_eq!(slot(&func, c.function), Some(0));
        assert_eq!(c.arguments.len(), 1);
        assert_eq!(slot(&func, c.arguments[0]), Some(1));

        // B = 1: call statement
        let func = build_function(&proto(vec![
            ins(OpCode::Call, 0, 1, 1),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        let id = match statements(&func)[0].kind {
            StatementKind::Call(id) => id,
            ref other => panic!("expected call statement, got {:?}", other),
        };
        let c = call(&func, id);
        assert_eq!(c.returns, ReturnArity::Fixed(0));
        assert!(c.arguments.is_empty());

        // B = 3: two results into slots 0 and 1
        let func = build_function(&proto(vec![
            ins(OpCode::Call, 0, 3, 1),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        let assign = assignment(&statements(&func)[0]);
        let slots: Vec<_> = assign.destinations.iter().map(|&d| slot(&func, d)).collect();
        assert_eq!(slots, vec![Some(0), Some(1)]);
        assert_eq!(call(&func, assign.expressions[0]).returns, ReturnArity::Fixed(2));
    }

    #[test]
    fn test_open_argument_calls() {
        let func = build_function(&proto(vec![
            ins(OpCode::CallM, 0, 1, 1),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        let id = match statements(&func)[0].kind {
            StatementKind::Call(id) => id,
            ref other => panic!("expected call statement, got {:?}", other),
        };
        let c = call(&func, id);
        assert_eq!(c.arguments.len(), 2);
        assert_eq!(slot(&func, c.arguments[0]), Some(1));
        assert_eq!(func.expr(c.arguments[1]), &Expression::MultipleResults);

        let func = build_function(&proto(vec![ins(OpCode::CallT, 0, 0, 2)])).unwrap();
        match &statements(&func)[0].kind {
            StatementKind::Return(values) => {
                assert_eq!(values.len(), 1);
                let c = call(&func, values[0]);
                assert_eq!(c.returns, ReturnArity::Multiple);
                assert_eq!(c.arguments.len(), 1);
            }
            other => panic!("expected tail call return, got {:?}", other),
        }
    }

    #[test]
    fn test_vararg_results() {
        let mut prototype = proto(vec![
            ins(OpCode::VArg, 0, 0, 0),
            ins(OpCode::VArg, 2, 3, 0),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        prototype.flags.is_variadic = true;
        let func = build_function(&prototype).unwrap();
        assert_eq!(func.expr(*func.arguments.last().unwrap()), &Expression::Vararg);

        let open = assignment(&statements(&func)[0]);
        assert_eq!(func.expr(open.destinations[0]), &Expression::MultipleResults);
        assert_eq!(func.expr(open.expressions[0]), &Expression::Vararg);

        let fixed = assignment(&statements(&func)[1]);
        let slots: Vec<_> = fixed.destinations.iter().map(|&d| slot(&func, d)).collect();
        assert_eq!(slots, vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_return_values() {
        let func = build_function(&proto(vec![ins(OpCode::Ret, 2, 0, 3)])).unwrap();
        match &statements(&func)[0].kind {
            StatementKind::Return(values) => {
                let slots: Vec<_> = values.iter().map(|&v| slot(&func, v)).collect();
                assert_eq!(slots, vec![Some(2), Some(3)]);
            }
            other => panic!("expected return, got {:?}", other),
        }

        let func = build_function(&proto(vec![ins(OpCode::RetM, 1, 0, 1)])).unwrap();
        match &statements(&func)[0].kind {
            StatementKind::Return(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(slot(&func, values[0]), Some(1));
                assert_eq!(func.expr(values[1]), &Expression::MultipleResults);
            }
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_nil_range() {
        let func = build_function(&proto(vec![
            ins(OpCode::KNil, 1, 0, 3),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        let assign = assignment(&statements(&func)[0]);
        let slots: Vec<_> = assign.destinations.iter().map(|&d| slot(&func, d)).collect();
        assert_eq!(slots, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(assign.expressions.len(), 3);
        for &value in &assign.expressions {
            assert_eq!(func.expr(value), &Expression::Constant(Constant::Nil));
        }
    }

    #[test]
    fn test_multiple_table_store() {
        let mut prototype = proto(vec![
            ins(OpCode::TSetM, 3, 0, 0),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        prototype.constants.numeric =
            vec![NumericConstant::Float(f64::from_bits(0x4330_0000_0000_0002))];
        let func = build_function(&prototype).unwrap();
        let assign = assignment(&statements(&func)[0]);
        match func.expr(assign.destinations[0]) {
            Expression::TableElement { table, key } => {
                assert_eq!(slot(&func, *table), Some(2));
                assert_eq!(integer(&func, *key), Some(2));
            }
            other => panic!("expected table element, got {:?}", other),
        }
        assert_eq!(func.expr(assign.expressions[0]), &Expression::MultipleResults);
    }

    #[test]
    fn test_globals_and_upvalues() {
        let mut prototype = proto(vec![
            ins(OpCode::GGet, 0, 0, 0),
            ins(OpCode::GSet, 1, 0, 0),
            ins(OpCode::USetV, 0, 0, 2),
            ins(OpCode::UGet, 3, 0, 1),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        prototype.constants.complex = vec![ComplexConstant::String(b"print".to_vec())];
        prototype.debug_info = Some(DebugInfo {
            lines: vec![1; 5],
            upvalue_names: vec!["count".to_owned()],
            ..DebugInfo::default()
        });
        let func = build_function(&prototype).unwrap();
        let stmts = statements(&func);
        let print = Expression::Identifier(Identifier::Global(b"print".to_vec()));

        let get = assignment(&stmts[0]);
        assert_eq!(func.expr(get.expressions[0]), &print);
        let set = assignment(&stmts[1]);
        assert_eq!(func.expr(set.destinations[0]), &print);
        assert_eq!(slot(&func, set.expressions[0]), Some(1));

        let store = assignment(&stmts[2]);
        assert_eq!(
            func.expr(store.destinations[0]),
            &Expression::Identifier(Identifier::Upvalue {
                index: 0,
                name: Some("count".to_owned()),
            })
        );
        let load = assignment(&stmts[3]);
        assert_eq!(
            func.expr(load.expressions[0]),
            &Expression::Identifier(Identifier::Upvalue { index: 1, name: None })
        );
    }

    #[test]
    fn test_table_template_copy() {
        let mut prototype = proto(vec![
            ins(OpCode::TDup, 0, 0, 0),
            ins(OpCode::TDup, 1, 0, 1),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        prototype.constants.complex = vec![
            ComplexConstant::Table(TableTemplate {
                array: vec![TableItem::Nil, TableItem::Integer(10), TableItem::True],
                hash: vec![(TableItem::String(b"k".to_vec()), TableItem::False)],
            }),
            ComplexConstant::Table(TableTemplate {
                array: vec![TableItem::Integer(5)],
                hash: vec![],
            }),
        ];
        let func = build_function(&prototype).unwrap();
        let stmts = statements(&func);

        match func.expr(assignment(&stmts[0]).expressions[0]) {
            Expression::TableConstructor(table) => {
                assert_eq!(table.array.len(), 2);
                assert_eq!(integer(&func, table.array[0]), Some(10));
                assert_eq!(table.records.len(), 1);
                assert_eq!(
                    func.expr(table.records[0].0),
                    &Expression::Constant(Constant::String(b"k".to_vec()))
                );
            }
            other => panic!("expected table constructor, got {:?}", other),
        }

        match func.expr(assignment(&stmts[1]).expressions[0]) {
            Expression::TableConstructor(table) => {
                assert!(table.array.is_empty());
                assert_eq!(table.records.len(), 1);
                assert_eq!(integer(&func, table.records[0].0), Some(0));
                assert_eq!(integer(&func, table.records[0].1), Some(5));
            }
            other => panic!("expected table constructor, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_closure() {
        let mut child = proto(vec![ins(OpCode::KShort, 0, 0, 1), ins(OpCode::Ret1, 0, 0, 2)]);
        child.argument_count = 2;
        let mut prototype = proto(vec![ins(OpCode::FNew, 0, 0, 0), ins(OpCode::Ret0, 0, 0, 1)]);
        prototype.constants.complex = vec![ComplexConstant::Prototype(Box::new(child))];

        let func = build_function(&prototype).unwrap();
        let closures: Vec<_> = func.closures().collect();
        assert_eq!(closures.len(), 1);
        let inner = closures[0];
        assert_eq!(inner.arguments.len(), 2);
        assert_eq!(inner.blocks.len(), 1);
        assert_eq!(inner.blocks[0].statements.len(), 2);
    }

    #[test]
    fn test_nested_failure_aborts_parent() {
        let child = proto(vec![
            ins(OpCode::Jmp, 0, 0, 0x8000 + 5),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        let mut prototype = proto(vec![
            ins(OpCode::KShort, 1, 0, 1),
            ins(OpCode::FNew, 0, 0, 0),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        prototype.constants.complex = vec![ComplexConstant::Prototype(Box::new(child))];

        match build_function(&prototype) {
            Err(BuildError::Nested { address, source }) => {
                assert_eq!(address, 1);
                assert!(matches!(*source, BuildError::JumpOutOfRange { address: 0, .. }));
            }
            other => panic!("expected nested failure, got {:?}", other),
        }
    }

    #[test]
    fn test_statement_lines() {
        let mut prototype = proto(vec![ins(OpCode::KShort, 0, 0, 1), ins(OpCode::Ret1, 0, 0, 2)]);
        prototype.debug_info = Some(DebugInfo {
            lines: vec![10, 12],
            ..DebugInfo::default()
        });
        let func = build_function(&prototype).unwrap();
        let lines: Vec<_> = statements(&func).iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![Some(10), Some(12)]);
        let addresses: Vec<_> = statements(&func).iter().map(|s| s.address).collect();
        assert_eq!(addresses, vec![0, 1]);
    }

    #[test]
    fn test_loop_hints_produce_no_statement() {
        let func = build_function(&proto(vec![
            ins(OpCode::FuncV, 3, 0, 0),
            ins(OpCode::KPri, 0, 0, 2),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        assert_eq!(statements(&func).len(), 2);
        let assign = assignment(&statements(&func)[0]);
        assert_eq!(func.expr(assign.expressions[0]), &Expression::Constant(Constant::True));
    }

    #[test]
    fn test_control_instruction_in_body_fails() {
        let result = build_function(&proto(vec![
            ins(OpCode::IterC, 3, 2, 3),
            ins(OpCode::Ret0, 0, 0, 1),
        ]));
        assert_eq!(
            result,
            Err(BuildError::UnexpectedInstruction {
                address: 0,
                opcode: OpCode::IterC,
            })
        );
    }

    #[test]
    fn test_missing_constant_fails() {
        let result = build_function(&proto(vec![
            ins(OpCode::KStr, 0, 0, 4),
            ins(OpCode::Ret0, 0, 0, 1),
        ]));
        assert_eq!(
            result,
            Err(BuildError::MissingConstant {
                address: 0,
                opcode: OpCode::KStr,
                operand: Operand::String(4),
            })
        );
    }

    #[test]
    fn test_global_names_keep_raw_bytes() {
        let mut prototype = proto(vec![ins(OpCode::GGet, 0, 0, 0), ins(OpCode::Ret0, 0, 0, 1)]);
        prototype.constants.complex = vec![ComplexConstant::String(b"\xffname".to_vec())];
        let func = build_function(&prototype).unwrap();
        let get = assignment(&statements(&func)[0]);
        assert_eq!(
            func.expr(get.expressions[0]),
            &Expression::Identifier(Identifier::Global(b"\xffname".to_vec()))
        );
    }

    #[test]
    fn test_multiple_store_without_table_slot_fails() {
        let mut prototype = proto(vec![ins(OpCode::TSetM, 0, 0, 0), ins(OpCode::Ret0, 0, 0, 1)]);
        prototype.constants.numeric = vec![NumericConstant::Integer(1)];
        assert_eq!(
            build_function(&prototype),
            Err(BuildError::UnexpectedOperand {
                address: 0,
                opcode: OpCode::TSetM,
                operand: Operand::Slot(0),
            })
        );
    }

    #[test]
    fn test_reversed_nil_range_fails() {
        let result = build_function(&proto(vec![
            ins(OpCode::KNil, 3, 0, 1),
            ins(OpCode::Ret0, 0, 0, 1),
        ]));
        assert_eq!(
            result,
            Err(BuildError::UnexpectedOperand {
                address: 0,
                opcode: OpCode::KNil,
                operand: Operand::Slot(1),
            })
        );
    }

    #[test]
    fn test_operand_of_wrong_kind_fails() {
        let mov = Instruction {
            opcode: OpCode::Mov,
            a: Operand::Slot(0),
            b: Operand::None,
            cd: Operand::Jump(0),
        };
        let result = build_function(&proto(vec![mov, ins(OpCode::Ret0, 0, 0, 1)]));
        assert_eq!(
            result,
            Err(BuildError::UnexpectedOperand {
                address: 0,
                opcode: OpCode::Mov,
                operand: Operand::Jump(0),
            })
        );
    }

    #[test]
    fn test_call_arguments_past_last_register_fail() {
        // Nine arguments from slot 251 run past register 255.
        let result = build_function(&proto(vec![
            ins(OpCode::Call, 250, 1, 10),
            ins(OpCode::Ret0, 0, 0, 1),
        ]));
        assert_eq!(
            result,
            Err(BuildError::SlotOverflow {
                address: 0,
                opcode: OpCode::Call,
                slot: 256,
            })
        );
    }
}
