use ljdec_ast::arena::ExprId;
use ljdec_ast::expr::{Expression, FunctionCall, ReturnArity, TableConstructor};
use ljdec_ast::types::{BinaryOp, Constant, UnaryOp};
use ljdec_bytecode::constant::{ComplexConstant, TableItem};
use ljdec_bytecode::instruction::Instruction;
use ljdec_bytecode::opcode::OpCode;

use crate::error::BuildError;

const ARITHMETIC_OPS: [BinaryOp; 5] = [
    BinaryOp::Add,
    BinaryOp::Subtract,
    BinaryOp::Multiply,
    BinaryOp::Divide,
    BinaryOp::Modulo,
];

impl<'a> super::Builder<'a> {
    /// `MOV`, `NOT`, `UNM` and `LEN` source expression.
    pub(super) fn build_unary(&mut self, address: usize, insn: &Instruction) -> Result<ExprId, BuildError> {
        let operand = self.resolve(address, insn.opcode, insn.cd)?;
        let op = match insn.opcode {
            OpCode::Mov => return Ok(operand),
            OpCode::Not => UnaryOp::Not,
            OpCode::Unm => UnaryOp::Minus,
            OpCode::Len => UnaryOp::Length,
            _ => return Err(self.unexpected(address, insn)),
        };
        Ok(self.exprs.alloc(Expression::UnaryOperator { op, operand }))
    }

    /// Arithmetic from `ADDVN` to `POW`.
    ///
    /// The `NV` group stores the constant in C but evaluates it first.
    pub(super) fn build_arithmetic(
        &mut self,
        address: usize,
        insn: &Instruction,
    ) -> Result<ExprId, BuildError> {
        let (op, swapped) = match insn.opcode {
            OpCode::Pow => (BinaryOp::Power, false),
            opcode if opcode.is_arithmetic() => {
                let offset = (opcode as u8 - OpCode::AddVN as u8) as usize;
                (ARITHMETIC_OPS[offset % 5], offset / 5 == 1)
            }
            _ => return Err(self.unexpected(address, insn)),
        };

        let variable = self.resolve(address, insn.opcode, insn.b)?;
        let other = self.resolve(address, insn.opcode, insn.cd)?;
        let (left, right) = if swapped {
            (other, variable)
        } else {
            (variable, other)
        };
        Ok(self.exprs.alloc(Expression::BinaryOperator { op, left, right }))
    }

    /// `CAT`: left-nested concatenation of slots B..=C.
    pub(super) fn build_concat(&mut self, address: usize, insn: &Instruction) -> Result<ExprId, BuildError> {
        let first = self.slot_of(address, insn, insn.b)?;
        let last = self.slot_of(address, insn, insn.cd)?;
        if last <= first {
            return Err(BuildError::UnexpectedOperand {
                address,
                opcode: insn.opcode,
                operand: insn.cd,
            });
        }

        let mut expr = self.alloc_slot(first);
        for slot in first + 1..=last {
            let right = self.alloc_slot(slot);
            expr = self.exprs.alloc(Expression::BinaryOperator {
                op: BinaryOp::Concat,
                left: expr,
                right,
            });
        }
        Ok(expr)
    }

    /// Condition of a test instruction, stated for the fallthrough path.
    ///
    /// The paired `JMP` is taken when the opcode's own comparison holds, so
    /// the fallthrough sees its negation: `ISLT` yields `>=`, `ISEQ*` yields
    /// `~=`, `IST` yields `not v`, and so on.
    pub(super) fn build_test_condition(
        &mut self,
        address: usize,
        insn: &Instruction,
    ) -> Result<ExprId, BuildError> {
        let op = match insn.opcode {
            OpCode::IsLt => BinaryOp::GreaterOrEqual,
            OpCode::IsGe => BinaryOp::Less,
            OpCode::IsLe => BinaryOp::Greater,
            OpCode::IsGt => BinaryOp::LessOrEqual,
            OpCode::IsEqV | OpCode::IsEqS | OpCode::IsEqN | OpCode::IsEqP => BinaryOp::NotEqual,
            OpCode::IsNeV | OpCode::IsNeS | OpCode::IsNeN | OpCode::IsNeP => BinaryOp::Equal,
            OpCode::IsT | OpCode::IsTC => {
                let operand = self.resolve(address, insn.opcode, insn.cd)?;
                return Ok(self.exprs.alloc(Expression::UnaryOperator {
                    op: UnaryOp::Not,
                    operand,
                }));
            }
            OpCode::IsF | OpCode::IsFC => return self.resolve(address, insn.opcode, insn.cd),
            _ => return Err(self.unexpected(address, insn)),
        };

        let left = self.resolve(address, insn.opcode, insn.a)?;
        let right = self.resolve(address, insn.opcode, insn.cd)?;
        Ok(self.exprs.alloc(Expression::BinaryOperator { op, left, right }))
    }

    /// `B[C]` of the table get/set families.
    pub(super) fn build_table_element(
        &mut self,
        address: usize,
        insn: &Instruction,
    ) -> Result<ExprId, BuildError> {
        let table = self.resolve(address, insn.opcode, insn.b)?;
        let key = self.resolve(address, insn.opcode, insn.cd)?;
        Ok(self.exprs.alloc(Expression::TableElement { table, key }))
    }

    /// `TDUP`: constructor filled from the template in the complex pool.
    ///
    /// Template arrays start at index 0, which Lua constructors cannot
    /// express positionally, so a non-nil item 0 becomes the record `[0]`.
    pub(super) fn build_table_copy(&mut self, address: usize, insn: &Instruction) -> Result<ExprId, BuildError> {
        let template = match self.complex_constant(address, insn.opcode, insn.cd)? {
            ComplexConstant::Table(template) => template,
            _ => {
                return Err(BuildError::MissingConstant {
                    address,
                    opcode: insn.opcode,
                    operand: insn.cd,
                })
            }
        };

        let mut constructor = TableConstructor::default();
        for (index, item) in template.array.iter().enumerate() {
            if index == 0 {
                if *item != TableItem::Nil {
                    let key = self.exprs.alloc(Expression::Constant(Constant::Integer(0)));
                    let value = self.alloc_table_item(item);
                    constructor.records.push((key, value));
                }
                continue;
            }
            let value = self.alloc_table_item(item);
            constructor.array.push(value);
        }
        for (key, value) in &template.hash {
            let key = self.alloc_table_item(key);
            let value = self.alloc_table_item(value);
            constructor.records.push((key, value));
        }
        Ok(self.exprs.alloc(Expression::TableConstructor(constructor)))
    }

    fn alloc_table_item(&mut self, item: &TableItem) -> ExprId {
        let constant = match item {
            TableItem::Nil => Constant::Nil,
            TableItem::False => Constant::False,
            TableItem::True => Constant::True,
            TableItem::Integer(value) => Constant::Integer(*value as i64),
            TableItem::Float(value) => Constant::Float(*value),
            TableItem::String(bytes) => Constant::String(bytes.clone()),
        };
        self.exprs.alloc(Expression::Constant(constant))
    }

    /// `FNEW`: reconstruct the child prototype into a closure.
    pub(super) fn build_closure(&mut self, address: usize, insn: &Instruction) -> Result<ExprId, BuildError> {
        let child = match self.complex_constant(address, insn.opcode, insn.cd)? {
            ComplexConstant::Prototype(child) => child,
            _ => {
                return Err(BuildError::MissingConstant {
                    address,
                    opcode: insn.opcode,
                    operand: insn.cd,
                })
            }
        };
        let function = super::build_function(child).map_err(|source| BuildError::Nested {
            address,
            source: Box::new(source),
        })?;
        Ok(self.exprs.alloc(Expression::Closure(Box::new(function))))
    }

    /// Call expression of the `CALL` family.
    ///
    /// `CALL`/`CALLT` pass C-1 (D-1) fixed arguments; `CALLM`/`CALLMT` pass C
    /// (D) fixed arguments followed by the pending multiple results.
    pub(super) fn build_call(
        &mut self,
        address: usize,
        insn: &Instruction,
        returns: ReturnArity,
    ) -> Result<ExprId, BuildError> {
        let base = self.slot_of(address, insn, insn.a)?;
        let argument_field = self.literal_of(address, insn, insn.cd)?;
        let (count, open) = match insn.opcode {
            OpCode::Call | OpCode::CallT => (argument_field.saturating_sub(1), false),
            OpCode::CallM | OpCode::CallMT => (argument_field, true),
            _ => return Err(self.unexpected(address, insn)),
        };

        let function = self.alloc_slot(base);
        let mut arguments = self.slot_range(address, insn.opcode, base as usize + 1, count)?;
        if open {
            arguments.push(self.exprs.alloc(Expression::MultipleResults));
        }
        Ok(self.exprs.alloc(Expression::FunctionCall(FunctionCall {
            function,
            arguments,
            returns,
        })))
    }

    pub(super) fn unexpected(&self, address: usize, insn: &Instruction) -> BuildError {
        BuildError::UnexpectedInstruction {
            address,
            opcode: insn.opcode,
        }
    }
}
