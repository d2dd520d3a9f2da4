//! AST-to-IR lowering with common-subexpression elimination on emit.

use byteorder::ByteOrder;
use num::traits::ToPrimitive;
use util::{fnv1a64, Endian, FnvHashMap, FnvHashSet};

use crate::ast::{
    AssignStmt, BinaryExpr, FuncDecl, Node, NodeKind, RetStmt, UnaryExpr, VarDecl,
};
use crate::ir::{live, BasicBlock, Instruction, Opcode, Operand, Program};
use crate::{Error, Result, Span};

struct Emitter {
    pc: usize,
    ntemps: usize,
    nblocks: usize,
    /// Content hash of an emitted instruction -> its assignee.
    exprs: FnvHashMap<u64, String>,
    /// Names read as operands, for unused-declaration marking.
    used: FnvHashSet<String>,
    blocks: Vec<BasicBlock>,
}

impl Emitter {
    fn new() -> Emitter {
        Emitter {
            pc: 0,
            ntemps: 0,
            nblocks: 0,
            exprs: FnvHashMap::default(),
            used: FnvHashSet::default(),
            blocks: Vec::new(),
        }
    }

    fn make_temporary(&mut self) -> String {
        let temp_id = self.ntemps;
        self.ntemps += 1;
        format!("$t{}", temp_id)
    }

    fn add_block(&mut self, tag: &str) {
        let id = self.nblocks;
        self.nblocks += 1;
        self.blocks.push(BasicBlock::new(id, tag));
    }

    /// The assignee of the most recently emitted instruction.
    fn last_assignee(&self) -> Option<String> {
        self.blocks
            .last()
            .and_then(|block| block.instructions.last())
            .and_then(|inst| inst.assignee.clone())
    }

    /// Appends `inst` to the tail block. Instructions with an assignee are
    /// checked against the expression cache first: a hit rewrites the
    /// instruction into a plain assignment from the earlier assignee.
    fn add_instruction(&mut self, mut inst: Instruction) -> Result<()> {
        if let Some(assignee) = inst.assignee.clone() {
            let encoded = encode_instruction(&inst);
            if let Some(previous) = self.exprs.get(&encoded) {
                log::info!(
                    "eliminating redundant calculation for variable '{}'",
                    assignee
                );
                inst.opcode = Opcode::Assign;
                inst.operands.clear();
                inst.add_operand(Operand::Variable(previous.clone()))?;
            } else {
                self.exprs.insert(encoded, assignee);
            }
        }

        let block = self
            .blocks
            .last_mut()
            .ok_or_else(|| Error::Bug("no block to add instruction to".to_owned()))?;
        block.instructions.push(inst);
        self.pc += 1;
        Ok(())
    }

    /// The expression-operand protocol: literals and references become
    /// operands directly; anything else is lowered first and contributes
    /// the assignee of the last instruction it emitted. Operands must be
    /// appended in source argument order for that lookup to hold.
    fn add_operands_from_node(&mut self, inst: &mut Instruction, node: &mut Node) -> Result<()> {
        match node.kind {
            NodeKind::Value(ref value) => inst.add_operand(Operand::Value(value.clone())),
            NodeKind::Ref(ref name) => {
                self.used.insert(name.clone());
                inst.add_operand(Operand::Variable(name.clone()))
            }
            _ => {
                self.emit(node)?;
                let temp = self.last_assignee().ok_or_else(|| {
                    Error::Bug("lowered operand expression produced no assignee".to_owned())
                })?;
                inst.add_operand(Operand::Variable(temp))
            }
        }
    }

    fn emit_function(&mut self, func: &mut FuncDecl, span: Span) -> Result<()> {
        self.add_block(&func.name);

        let mut inst = Instruction::new(Opcode::Def, span);
        inst.add_operand(Operand::Label(func.name.clone()))?;
        self.add_instruction(inst)?;

        for param in &mut func.params {
            self.emit(param)?;
        }
        for stmt in &mut func.body {
            self.emit(stmt)?;
        }
        Ok(())
    }

    fn emit_variable(&mut self, var: &mut VarDecl, span: Span) -> Result<()> {
        // Declarations without an initializer reserve no instruction.
        let value = match var.value.as_mut() {
            Some(value) => value,
            None => return Ok(()),
        };

        let mut inst = Instruction::new(Opcode::Assign, span);
        inst.assignee = Some(var.name.clone());
        self.add_operands_from_node(&mut inst, value)?;
        self.add_instruction(inst)
    }

    fn emit_assignment(&mut self, assign: &mut AssignStmt, span: Span) -> Result<()> {
        let mut inst = Instruction::new(Opcode::Assign, span);
        inst.assignee = Some(assign.name.clone());
        self.add_operands_from_node(&mut inst, &mut assign.value)?;
        self.add_instruction(inst)
    }

    fn emit_return(&mut self, ret: &mut RetStmt, span: Span) -> Result<()> {
        let mut inst = Instruction::new(Opcode::Ret, span);
        self.add_operands_from_node(&mut inst, &mut ret.value)?;
        self.add_instruction(inst)
    }

    fn emit_unary_op(&mut self, unary: &mut UnaryExpr, span: Span) -> Result<()> {
        let mut inst = Instruction::new(Opcode::from(unary.op), span);
        self.add_operands_from_node(&mut inst, &mut unary.expr)?;

        // The operand lookup above may emit instructions of its own; the
        // temporary must be claimed after it.
        inst.assignee = Some(self.make_temporary());
        self.add_instruction(inst)
    }

    fn emit_binary_op(&mut self, binary: &mut BinaryExpr, span: Span) -> Result<()> {
        let mut inst = Instruction::new(Opcode::from(binary.op), span);
        self.add_operands_from_node(&mut inst, &mut binary.lhs)?;
        self.add_operands_from_node(&mut inst, &mut binary.rhs)?;

        inst.assignee = Some(self.make_temporary());
        self.add_instruction(inst)
    }

    fn emit(&mut self, node: &mut Node) -> Result<()> {
        node.visited = true;
        let span = node.span;

        match &mut node.kind {
            NodeKind::Noop => Ok(()),
            NodeKind::Func(func) => self.emit_function(func, span),
            NodeKind::Var(var) => self.emit_variable(var, span),
            NodeKind::Assign(assign) => self.emit_assignment(assign, span),
            NodeKind::Ret(ret) => self.emit_return(ret, span),
            NodeKind::Unary(unary) => self.emit_unary_op(unary, span),
            NodeKind::Binary(binary) => self.emit_binary_op(binary, span),
            NodeKind::Cond(_) => Err(Error::Lower(
                "conditional translation to IR is not implemented yet".to_owned(),
                span,
            )),
            NodeKind::Call(_) => Err(Error::Lower(
                "call translation to IR is not implemented yet".to_owned(),
                span,
            )),
            NodeKind::Value(_) | NodeKind::Ref(_) => Err(Error::Lower(
                "expression statement emits no IR".to_owned(),
                span,
            )),
        }
    }
}

fn value_tag(value: &crate::ast::Value) -> u8 {
    use crate::ast::Value::*;
    match value {
        Int(_) => 0,
        Uint(_) => 1,
        Float(_) => 2,
        Double(_) => 3,
        Char(_) => 4,
        Bool(_) => 5,
        Str(_) => 6,
    }
}

fn encode_value(value: &crate::ast::Value, buf: &mut Vec<u8>) {
    use crate::ast::Value::*;

    buf.push(value_tag(value));
    let mut word = [0u8; 8];
    match value {
        Int(v) => {
            Endian::write_i32(&mut word[..4], *v);
            buf.extend_from_slice(&word[..4]);
        }
        Uint(v) => {
            Endian::write_u32(&mut word[..4], *v);
            buf.extend_from_slice(&word[..4]);
        }
        Float(v) => {
            Endian::write_u32(&mut word[..4], v.to_bits());
            buf.extend_from_slice(&word[..4]);
        }
        Double(v) => {
            Endian::write_u64(&mut word, v.to_bits());
            buf.extend_from_slice(&word);
        }
        Char(v) => {
            Endian::write_u32(&mut word[..4], *v as u32);
            buf.extend_from_slice(&word[..4]);
        }
        Bool(v) => buf.push(*v as u8),
        Str(v) => {
            Endian::write_u64(&mut word, v.len() as u64);
            buf.extend_from_slice(&word);
            buf.extend_from_slice(v.as_bytes());
        }
    }
}

/// Packs opcode and operands into a byte image and hashes it. Two
/// instructions collide exactly when they agree on opcode, operand kinds,
/// and operand contents. Operand order matters, so commutative pairs do
/// not collide.
fn encode_instruction(inst: &Instruction) -> u64 {
    let mut buf = Vec::with_capacity(1 + 16 * inst.operands.len());
    buf.push(inst.opcode.to_u8().unwrap_or(0));

    for operand in &inst.operands {
        match operand {
            Operand::Value(value) => {
                buf.push(1);
                encode_value(value, &mut buf);
            }
            Operand::Variable(name) => {
                buf.push(2);
                buf.extend_from_slice(name.as_bytes());
            }
            Operand::Label(name) => {
                buf.push(3);
                buf.extend_from_slice(name.as_bytes());
            }
        }
    }

    fnv1a64(&buf)
}

/// Lowers the entry function out of the top-level declarations.
///
/// Adds the `$entry` and `$exit` blocks around the lowered code, runs the
/// backwards liveness pass, and marks declarations reached by lowering (or
/// referenced from lowered code) as visited for the unused-declaration
/// warning that follows.
pub fn lower_to_ir(decls: &mut [Node], entry: &str) -> Result<Program> {
    let mut emitter = Emitter::new();
    emitter.add_block("$entry");

    let node = decls
        .iter_mut()
        .find(|node| node.decl_name() == Some(entry))
        .ok_or_else(|| Error::Resolve(format!("function '{}' is missing!", entry)))?;
    emitter.emit(node)?;

    emitter.add_block("$exit");

    let mut program = Program {
        blocks: emitter.blocks,
    };
    live::calculate_live_intervals(&mut program, emitter.pc);

    for node in decls.iter_mut() {
        if let Some(name) = node.decl_name() {
            if emitter.used.contains(name) {
                node.visited = true;
            }
        }
    }

    Ok(program)
}
