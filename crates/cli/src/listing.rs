//! Text listings of prototypes and reconstructed functions.

use std::fmt::Write;

use ljdec::ast::arena::ExprId;
use ljdec::ast::block::{Block, FlowKind, Warp};
use ljdec::ast::cfg::{self, EdgeKind};
use ljdec::ast::expr::{Expression, Identifier};
use ljdec::ast::func::FunctionDefinition;
use ljdec::ast::stmt::StatementKind;
use ljdec::ast::types::Constant;
use ljdec::bytecode::constant::Cdata;
use ljdec::bytecode::operand::{Operand, Primitive};
use ljdec::bytecode::prototype::Prototype;

/// Raw instruction listing of a prototype and its children, depth first.
pub fn dump_prototype(out: &mut String, prototype: &Prototype, path: &str) {
    let _ = writeln!(
        out,
        "; prototype {} ({} args{}, frame {}, {} instructions)",
        path,
        prototype.argument_count,
        if prototype.is_variadic() { ", vararg" } else { "" },
        prototype.frame_size,
        prototype.instructions.len()
    );
    let lines = prototype.debug_info.as_ref();
    for (address, insn) in prototype.instructions.iter().enumerate() {
        let _ = write!(
            out,
            "{:4}  {:<7} {:>6} {:>6} {:>8}",
            address,
            insn.opcode,
            operand(insn.a),
            operand(insn.b),
            operand(insn.cd)
        );
        if let Some(destination) = insn.jump_destination(address) {
            let _ = write!(out, "  => {}", destination);
        }
        if let Some(line) = lines.and_then(|info| info.line_for_address(address)) {
            let _ = write!(out, "  ; line {}", line);
        }
        out.push('\n');
    }
    out.push('\n');
    for (index, child) in prototype.children().enumerate() {
        dump_prototype(out, child, &format!("{}/{}", path, index));
    }
}

fn operand(operand: Operand) -> String {
    match operand {
        Operand::None => String::new(),
        Operand::Slot(slot) => format!("r{}", slot),
        Operand::Upvalue(index) => format!("uv{}", index),
        Operand::Literal(value) => value.to_string(),
        Operand::SignedLiteral(value) => value.to_string(),
        Operand::Primitive(Primitive::Nil) => "nil".to_owned(),
        Operand::Primitive(Primitive::False) => "false".to_owned(),
        Operand::Primitive(Primitive::True) => "true".to_owned(),
        Operand::Number(index) => format!("num{}", index),
        Operand::String(index) => format!("str{}", index),
        Operand::Table(index) => format!("tab{}", index),
        Operand::Function(index) => format!("fn{}", index),
        Operand::Cdata(index) => format!("cdata{}", index),
        Operand::Jump(offset) => format!("{:+}", offset),
    }
}

/// Block and warp listing of a function and its closures, depth first.
///
/// Returns the number of unreachable blocks found across all of them.
pub fn list_function(out: &mut String, func: &FunctionDefinition, path: &str) -> usize {
    let arguments: Vec<String> = func.arguments.iter().map(|&id| expr(func, id)).collect();
    let _ = writeln!(
        out,
        "function {}({}): {} instructions, {} blocks",
        path,
        arguments.join(", "),
        func.instructions_count,
        func.blocks.len()
    );

    let graph = func.warp_graph();
    for block in &func.blocks {
        let mut predecessors = cfg::predecessors(&graph, block.index);
        predecessors.sort_by_key(|&(index, _)| index);
        list_block(out, func, block, &predecessors);
    }

    let unreachable = cfg::unreachable_blocks(&graph);
    if !unreachable.is_empty() {
        let _ = writeln!(out, "  unreachable blocks: {:?}", unreachable);
    }
    out.push('\n');

    let mut total = unreachable.len();
    for (index, closure) in func.closures().enumerate() {
        total += list_function(out, closure, &format!("{}/{}", path, index));
    }
    total
}

fn list_block(
    out: &mut String,
    func: &FunctionDefinition,
    block: &Block,
    predecessors: &[(usize, EdgeKind)],
) {
    let _ = write!(
        out,
        "  block {} [{}..={}] warpins={}",
        block.index, block.first_address, block.last_address, block.warpins_count
    );
    if !predecessors.is_empty() {
        let from: Vec<String> = predecessors
            .iter()
            .map(|(index, kind)| format!("{}:{:?}", index, kind))
            .collect();
        let _ = write!(out, " from {}", from.join(" "));
    }
    out.push('\n');

    for statement in &block.statements {
        let _ = write!(out, "    {:4}  ", statement.address);
        match &statement.kind {
            StatementKind::Assignment(assignment) => {
                let _ = write!(
                    out,
                    "{} = {}",
                    expr_list(func, &assignment.destinations),
                    expr_list(func, &assignment.expressions)
                );
            }
            StatementKind::Call(call) => out.push_str(&expr(func, *call)),
            StatementKind::Return(values) if values.is_empty() => out.push_str("return"),
            StatementKind::Return(values) => {
                let _ = write!(out, "return {}", expr_list(func, values));
            }
        }
        if let Some(line) = statement.line {
            let _ = write!(out, "  -- line {}", line);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "    {}", warp(func, &block.warp));
}

fn warp(func: &FunctionDefinition, warp: &Warp) -> String {
    match warp {
        Warp::Unconditional(warp) => {
            let kind = match warp.kind {
                FlowKind::Flow => "flow",
                FlowKind::Jump => "jump",
                FlowKind::LoopBack => "loop back",
            };
            let close = if warp.closes_scope { " (close upvalues)" } else { "" };
            format!("=> {} to {}{}", kind, warp.target, close)
        }
        Warp::Conditional(warp) => format!(
            "=> if {} then {} else {}",
            expr(func, warp.condition),
            warp.true_target,
            warp.false_target
        ),
        Warp::Iterator(warp) => format!(
            "=> for {} in {} do {} done {}",
            expr_list(func, &warp.variables),
            expr_list(func, &warp.controls),
            warp.body,
            warp.way_out
        ),
        Warp::NumericLoop(warp) => format!(
            "=> for {} = {} do {} done {}",
            expr(func, warp.index),
            expr_list(func, &warp.controls),
            warp.body,
            warp.way_out
        ),
        Warp::End => "=> end".to_owned(),
    }
}

fn expr_list(func: &FunctionDefinition, ids: &[ExprId]) -> String {
    ids.iter()
        .map(|&id| expr(func, id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compact single-line rendering of an expression tree.
pub fn expr(func: &FunctionDefinition, id: ExprId) -> String {
    match func.expr(id) {
        Expression::Identifier(Identifier::Slot(slot)) => format!("slot{}", slot),
        Expression::Identifier(Identifier::Upvalue { name: Some(name), .. }) => name.clone(),
        Expression::Identifier(Identifier::Upvalue { index, name: None }) => {
            format!("uv{}", index)
        }
        Expression::Identifier(Identifier::Global(name)) => {
            String::from_utf8_lossy(name).into_owned()
        }
        Expression::Constant(constant) => self::constant(constant),
        Expression::BinaryOperator { op, left, right } => format!(
            "({} {} {})",
            expr(func, *left),
            op.symbol(),
            expr(func, *right)
        ),
        Expression::UnaryOperator { op, operand } => {
            format!("{}{}", op.symbol(), expr(func, *operand))
        }
        Expression::TableElement { table, key } => {
            format!("{}[{}]", expr(func, *table), expr(func, *key))
        }
        Expression::TableConstructor(table) => {
            let mut items: Vec<String> = table.array.iter().map(|&id| expr(func, id)).collect();
            items.extend(
                table
                    .records
                    .iter()
                    .map(|&(key, value)| format!("[{}] = {}", expr(func, key), expr(func, value))),
            );
            format!("{{{}}}", items.join(", "))
        }
        Expression::FunctionCall(call) => format!(
            "{}({})",
            expr(func, call.function),
            expr_list(func, &call.arguments)
        ),
        Expression::Closure(closure) => {
            format!("function/{} blocks", closure.blocks.len())
        }
        Expression::Vararg => "...".to_owned(),
        Expression::MultipleResults => "MULTRES".to_owned(),
    }
}

fn constant(constant: &Constant) -> String {
    match constant {
        Constant::Nil => "nil".to_owned(),
        Constant::False => "false".to_owned(),
        Constant::True => "true".to_owned(),
        Constant::Integer(value) => value.to_string(),
        Constant::Float(value) => format!("{:?}", value),
        Constant::String(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        Constant::Cdata(Cdata::I64(value)) => format!("{}LL", value),
        Constant::Cdata(Cdata::U64(value)) => format!("{}ULL", value),
        Constant::Cdata(Cdata::Complex(re, im)) => format!("{}+{}i", re, im),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ljdec::bytecode::instruction::Instruction;
    use ljdec::bytecode::opcode::OpCode;

    fn ins(op: OpCode, a: u8, b: u8, cd: u16) -> Instruction {
        Instruction::from_fields(op, a, b, cd).unwrap()
    }

    fn prototype(instructions: Vec<Instruction>) -> Prototype {
        Prototype {
            instructions,
            ..Prototype::default()
        }
    }

    #[test]
    fn test_lists_blocks_and_warps() {
        // ISLT 0 1; JMP -> 3; KSHORT 2 5; RET0
        let mut proto = prototype(vec![
            ins(OpCode::IsLt, 0, 0, 1),
            ins(OpCode::Jmp, 2, 0, 0x8001),
            ins(OpCode::KShort, 2, 0, 5),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        proto.argument_count = 2;
        let func = ljdec::lift::build_function(&proto).unwrap();

        let mut out = String::new();
        let unreachable = list_function(&mut out, &func, "main");
        assert_eq!(unreachable, 0);
        assert!(out.starts_with("function main(slot0, slot1): 4 instructions, 3 blocks"));
        assert!(out.contains("=> if (slot0 >= slot1) then 2 else 3"));
        assert!(out.contains("slot2 = 5"));
        assert!(out.contains("from 0:False 1:Flow"));
        assert!(out.contains("=> end"));
    }

    #[test]
    fn test_reports_unreachable_blocks() {
        // JMP -> 2; KSHORT; RET0
        let func = ljdec::lift::build_function(&prototype(vec![
            ins(OpCode::Jmp, 0, 0, 0x8001),
            ins(OpCode::KShort, 0, 0, 1),
            ins(OpCode::Ret0, 0, 0, 1),
        ]))
        .unwrap();
        let mut out = String::new();
        assert_eq!(list_function(&mut out, &func, "main"), 1);
        assert!(out.contains("unreachable blocks: [1]"));
    }

    #[test]
    fn test_dump_shows_jump_destinations() {
        let proto = prototype(vec![
            ins(OpCode::Jmp, 0, 0, 0x8001),
            ins(OpCode::KShort, 0, 0, 0xFFFF),
            ins(OpCode::Ret0, 0, 0, 1),
        ]);
        let mut out = String::new();
        dump_prototype(&mut out, &proto, "main");
        assert!(out.contains("JMP"));
        assert!(out.contains("=> 2"));
        assert!(out.contains("-1"));
    }
}
