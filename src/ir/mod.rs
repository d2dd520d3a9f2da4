//! Three-address intermediate representation organised in basic blocks.
//!
//! Lowering walks the entry function of the AST and produces one
//! [`Program`](struct.Program.html): a `$entry` block, one block per
//! lowered function tagged with its name, and a `$exit` block. Each block
//! holds straight-line [`Instruction`](struct.Instruction.html)s; the
//! current subset never branches, so `JMP`/`BR` and the block
//! predecessor/successor edges are reserved for the day conditionals
//! lower.

mod emit;
mod live;

use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};

use crate::ast::{Op, Value};
use crate::Span;

pub use emit::lower_to_ir;

/// IR opcodes. The first fourteen mirror the AST operator enum and are
/// produced through the explicit `From<Op>` table below.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    Neg,
    Not,
    Deref,
    Addr,
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
    CmpNot,
    CmpLt,
    CmpGt,
    CmpLtEq,
    CmpGtEq,
    Def,
    Assign,
    Jmp,
    Br,
    Ret,
    /// The assignee of this instruction is never read.
    Dead,
}

impl From<Op> for Opcode {
    fn from(op: Op) -> Opcode {
        match op {
            Op::Neg => Opcode::Neg,
            Op::Not => Opcode::Not,
            Op::Deref => Opcode::Deref,
            Op::Addr => Opcode::Addr,
            Op::Add => Opcode::Add,
            Op::Sub => Opcode::Sub,
            Op::Mul => Opcode::Mul,
            Op::Div => Opcode::Div,
            Op::Cmp => Opcode::Cmp,
            Op::CmpNot => Opcode::CmpNot,
            Op::CmpLt => Opcode::CmpLt,
            Op::CmpGt => Opcode::CmpGt,
            Op::CmpLtEq => Opcode::CmpLtEq,
            Op::CmpGtEq => Opcode::CmpGtEq,
        }
    }
}

impl Opcode {
    fn symbol(self) -> &'static str {
        match self {
            Opcode::Neg => "-",
            Opcode::Not => "!",
            Opcode::Deref => "*",
            Opcode::Addr => "&",
            Opcode::Add => "+",
            Opcode::Sub => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Cmp => "==",
            Opcode::CmpNot => "!=",
            Opcode::CmpLt => "<",
            Opcode::CmpGt => ">",
            Opcode::CmpLtEq => "<=",
            Opcode::CmpGtEq => ">=",
            _ => "?",
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Opcode::Neg | Opcode::Not | Opcode::Deref | Opcode::Addr
        )
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Cmp
                | Opcode::CmpNot
                | Opcode::CmpLt
                | Opcode::CmpGt
                | Opcode::CmpLtEq
                | Opcode::CmpGtEq
        )
    }
}

pub const MAX_OPERANDS: usize = 2;

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Value(Value),
    Variable(String),
    Label(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Value(value) => write!(f, "{}", value),
            Operand::Variable(name) => write!(f, "{}", name),
            Operand::Label(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// Destination variable, if the instruction produces a value.
    pub assignee: Option<String>,
    pub span: Span,
    /// Live interval in program-counter indices, filled in by liveness.
    pub start: usize,
    pub end: usize,
}

impl Instruction {
    pub fn new(opcode: Opcode, span: Span) -> Instruction {
        Instruction {
            opcode,
            operands: Vec::new(),
            assignee: None,
            span,
            start: 0,
            end: 0,
        }
    }

    pub fn add_operand(&mut self, operand: Operand) -> crate::Result<()> {
        if self.operands.len() == MAX_OPERANDS {
            return Err(crate::Error::Bug(format!(
                "too many operands for opcode '{}'",
                self.opcode.symbol()
            )));
        }
        self.operands.push(operand);
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let assignee = self.assignee.as_deref().unwrap_or("?");
        match self.opcode {
            Opcode::Def => write!(f, "def {}", self.operands[0])?,
            Opcode::Assign => write!(f, "  {} := {}", assignee, self.operands[0])?,
            op if op.is_unary() => {
                write!(f, "  {} := {}{}", assignee, op.symbol(), self.operands[0])?
            }
            op if op.is_binary() => write!(
                f,
                "  {} := {}{}{}",
                assignee,
                self.operands[0],
                op.symbol(),
                self.operands[1]
            )?,
            Opcode::Ret => write!(f, "  ret {}", self.operands[0])?,
            Opcode::Dead => {
                return write!(f, "  <dead @ {}:{}>", self.span.line, self.span.col);
            }
            op => write!(f, "  <{:?}>", op)?,
        }
        write!(f, " (start {}, end {})", self.start, self.end)
    }
}

/// A maximal straight-line instruction sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicBlock {
    pub id: usize,
    pub tag: String,
    pub instructions: Vec<Instruction>,
    /// Control-flow edges by block id; unpopulated until branches lower.
    pub pred: Vec<usize>,
    pub succ: Vec<usize>,
}

impl BasicBlock {
    fn new(id: usize, tag: &str) -> BasicBlock {
        BasicBlock {
            id,
            tag: tag.to_owned(),
            instructions: Vec::new(),
            pred: Vec::new(),
            succ: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub blocks: Vec<BasicBlock>,
}

impl Program {
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|block| block.instructions.iter())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut pc = 0;
        for block in &self.blocks {
            writeln!(f, "[BasicBlock {}#{}]", block.tag, block.id)?;
            for inst in &block.instructions {
                writeln!(f, " {} | {}", pc, inst)?;
                pc += 1;
            }
        }
        Ok(())
    }
}
