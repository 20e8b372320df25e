use ljdec_ast::arena::ExprId;
use ljdec_ast::expr::{Expression, Identifier};
use ljdec_ast::types::Constant;
use ljdec_bytecode::constant::{ComplexConstant, NumericConstant};
use ljdec_bytecode::opcode::OpCode;
use ljdec_bytecode::operand::{Operand, Primitive};

use crate::error::BuildError;

impl<'a> super::Builder<'a> {
    /// Turn a decoded operand into an expression node.
    ///
    /// Jumps, table templates and prototypes have dedicated builders and are
    /// rejected here.
    pub(super) fn resolve(
        &mut self,
        address: usize,
        opcode: OpCode,
        operand: Operand,
    ) -> Result<ExprId, BuildError> {
        let expr = match operand {
            Operand::Slot(slot) => Expression::slot(slot),
            Operand::Upvalue(index) => Expression::Identifier(self.upvalue(index)),
            Operand::Literal(value) => Expression::Constant(Constant::Integer(value as i64)),
            Operand::SignedLiteral(value) => Expression::Constant(Constant::Integer(value as i64)),
            Operand::Primitive(primitive) => Expression::Constant(primitive_constant(primitive)),
            Operand::Number(index) => {
                let value = self.numeric_constant(address, opcode, index)?;
                Expression::Constant(numeric_value(value))
            }
            Operand::String(_) => {
                let bytes = self.string_constant(address, opcode, operand)?;
                Expression::Constant(Constant::String(bytes.to_vec()))
            }
            Operand::Cdata(_) => match self.complex_constant(address, opcode, operand)? {
                ComplexConstant::Cdata(value) => Expression::Constant(Constant::Cdata(*value)),
                _ => return Err(missing(address, opcode, operand)),
            },
            Operand::Table(_) | Operand::Function(_) | Operand::Jump(_) | Operand::None => {
                return Err(BuildError::UnexpectedOperand {
                    address,
                    opcode,
                    operand,
                })
            }
        };
        Ok(self.exprs.alloc(expr))
    }

    pub(super) fn upvalue(&self, index: u16) -> Identifier {
        let name = self
            .prototype
            .debug_info
            .as_ref()
            .and_then(|info| info.upvalue_name(index as usize))
            .map(str::to_owned);
        Identifier::Upvalue { index, name }
    }

    pub(super) fn numeric_constant(
        &self,
        address: usize,
        opcode: OpCode,
        index: u16,
    ) -> Result<NumericConstant, BuildError> {
        self.prototype
            .constants
            .numeric
            .get(index as usize)
            .copied()
            .ok_or_else(|| missing(address, opcode, Operand::Number(index)))
    }

    /// Complex pool entry addressed by a string, table, function or cdata
    /// operand.
    pub(super) fn complex_constant(
        &self,
        address: usize,
        opcode: OpCode,
        operand: Operand,
    ) -> Result<&'a ComplexConstant, BuildError> {
        let index = match operand {
            Operand::String(index)
            | Operand::Table(index)
            | Operand::Function(index)
            | Operand::Cdata(index) => index,
            _ => {
                return Err(BuildError::UnexpectedOperand {
                    address,
                    opcode,
                    operand,
                })
            }
        };
        let prototype = self.prototype;
        prototype
            .constants
            .complex
            .get(index as usize)
            .ok_or_else(|| missing(address, opcode, operand))
    }

    pub(super) fn string_constant(
        &self,
        address: usize,
        opcode: OpCode,
        operand: Operand,
    ) -> Result<&'a [u8], BuildError> {
        self.complex_constant(address, opcode, operand)?
            .as_string()
            .ok_or_else(|| missing(address, opcode, operand))
    }
}

fn missing(address: usize, opcode: OpCode, operand: Operand) -> BuildError {
    BuildError::MissingConstant {
        address,
        opcode,
        operand,
    }
}

pub(super) fn primitive_constant(primitive: Primitive) -> Constant {
    match primitive {
        Primitive::Nil => Constant::Nil,
        Primitive::False => Constant::False,
        Primitive::True => Constant::True,
    }
}

pub(super) fn numeric_value(value: NumericConstant) -> Constant {
    match value {
        NumericConstant::Integer(value) => Constant::Integer(value as i64),
        NumericConstant::Float(value) => Constant::Float(value),
    }
}
