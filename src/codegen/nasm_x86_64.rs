//! Linear-scan register allocation and NASM x86-64 emission.

use std::fmt;

use num::traits::FromPrimitive;
use num_derive::{FromPrimitive, ToPrimitive};

use crate::ast::Value;
use crate::ir::{Instruction, Opcode, Operand, Program};
use crate::symtab::{Scope, SymbolKind};
use crate::{Error, Result};

/// The sixteen integer registers of the target.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsp,
    Rbp,
    Rsi,
    Rdi,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

pub const NUM_REGISTERS: usize = 16;

impl Reg {
    fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rbx => "rbx",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::Rsp => "rsp",
            Reg::Rbp => "rbp",
            Reg::Rsi => "rsi",
            Reg::Rdi => "rdi",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
            Reg::R10 => "r10",
            Reg::R11 => "r11",
            Reg::R12 => "r12",
            Reg::R13 => "r13",
            Reg::R14 => "r14",
            Reg::R15 => "r15",
        }
    }

    /// Callee-saved under the System V ABI; pushed before first use.
    fn must_preserve(self) -> bool {
        matches!(
            self,
            Reg::Rbx | Reg::Rsp | Reg::Rbp | Reg::R12 | Reg::R13 | Reg::R14 | Reg::R15
        )
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn regname(rid: usize) -> &'static str {
    match Reg::from_usize(rid) {
        Some(reg) => reg.name(),
        None => "???",
    }
}

/// NASM directives reserving uninitialized memory, by unit width.
const RESB: u32 = 1;
const RESD: u32 = 4;
const RESQ: u32 = 8;

fn reserve_directive(width: u32) -> &'static str {
    match width {
        RESQ => "resq",
        RESD => "resd",
        _ => "resb",
    }
}

#[derive(Clone, Debug)]
struct RegisterData {
    start: usize,
    end: usize,
    var: String,
}

#[derive(Clone, Debug, Default)]
struct Register {
    active: bool,
    data: Option<RegisterData>,
}

/// The generated assembly text.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub code: String,
}

struct Generator<'a> {
    globals: &'a Scope,
    registers: Vec<Register>,
    /// Values pushed by callee-saved spills, most recent first.
    stack: Vec<RegisterData>,
    stack_size_bytes: usize,
    code: String,
}

/// Bytes a `push` occupies on the stack.
const PUSH_BYTES: usize = 8;

impl<'a> Generator<'a> {
    fn new(globals: &'a Scope) -> Generator<'a> {
        Generator {
            globals,
            registers: vec![Register::default(); NUM_REGISTERS],
            stack: Vec::new(),
            stack_size_bytes: 0,
            code: String::new(),
        }
    }

    fn writeln(&mut self, line: &str) {
        self.code.push_str(line);
        self.code.push('\n');
    }

    fn interval_end(&self, rid: usize) -> usize {
        self.registers[rid].data.as_ref().map(|d| d.end).unwrap_or(0)
    }

    fn save_register(&mut self, rid: usize) {
        self.writeln(&format!("push {}", regname(rid)));

        if let Some(data) = self.registers[rid].data.clone() {
            self.stack.push(data);
            self.stack_size_bytes += PUSH_BYTES;
            log::debug!(
                "saved register '{}' to stack ({} entries, {} bytes)",
                regname(rid),
                self.stack.len(),
                self.stack_size_bytes
            );
        }
    }

    /// Picks a register for a new value: the lowest-indexed free register,
    /// or failing that the active register whose value dies last. A
    /// callee-saved pick is pushed before use.
    fn find_available_register(&mut self) -> usize {
        let mut chosen = None;
        let mut oldest = 0;
        for rid in 0..NUM_REGISTERS {
            if !self.registers[rid].active {
                chosen = Some(rid);
                break;
            }
            if self.interval_end(rid) > self.interval_end(oldest) {
                oldest = rid;
            }
        }

        let rid = chosen.unwrap_or(oldest);
        if let Some(reg) = Reg::from_usize(rid) {
            if reg.must_preserve() {
                self.save_register(rid);
            }
        }

        self.registers[rid].active = true;
        rid
    }

    fn release_register(&mut self, rid: usize) {
        self.registers[rid].active = false;
        self.registers[rid].data = None;
    }

    /// Frees every register whose live interval ended before `pc`.
    fn expire_old_intervals(&mut self, pc: usize) {
        for rid in 0..NUM_REGISTERS {
            if !self.registers[rid].active {
                continue;
            }
            let expired = match &self.registers[rid].data {
                Some(data) => {
                    if data.end < pc {
                        log::debug!(
                            "releasing register '{}' at pc {} (interval {}..{})",
                            regname(rid),
                            pc,
                            data.start,
                            data.end
                        );
                        true
                    } else {
                        false
                    }
                }
                None => false,
            };
            if expired {
                self.release_register(rid);
            }
        }
    }

    fn find_register_by_variable(&self, var: &str) -> Option<usize> {
        (0..NUM_REGISTERS).find(|&rid| {
            self.registers[rid]
                .data
                .as_ref()
                .map(|data| data.var == var)
                .unwrap_or(false)
        })
    }

    fn put_variable_in_register(&mut self, var: &str, start: usize, end: usize) -> usize {
        let rid = self.find_available_register();
        self.registers[rid].data = Some(RegisterData {
            start,
            end,
            var: var.to_owned(),
        });
        log::debug!("moved variable '{}' to register '{}'", var, regname(rid));
        rid
    }

    fn value_text(value: &Value) -> String {
        match value {
            Value::Int(v) => v.to_string(),
            Value::Uint(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Char(v) => v.to_string(),
            Value::Bool(v) => (*v as i32).to_string(),
            Value::Str(v) => v.clone(),
        }
    }

    /// Renders an operand as an assembly source operand: a literal image
    /// for values, the holding register for variables.
    fn operand_text(&self, operand: &Operand) -> Result<String> {
        match operand {
            Operand::Value(value) => Ok(Generator::value_text(value)),
            Operand::Variable(var) => {
                let rid = self.find_register_by_variable(var).ok_or_else(|| {
                    Error::Codegen(format!("operand '{}' is not in any register", var))
                })?;
                Ok(regname(rid).to_owned())
            }
            Operand::Label(name) => Err(Error::Bug(format!(
                "label operand '{}' in value position",
                name
            ))),
        }
    }

    fn assignee_register(&mut self, inst: &Instruction) -> Result<usize> {
        let assignee = inst
            .assignee
            .as_ref()
            .ok_or_else(|| Error::Bug("instruction without assignee".to_owned()))?;
        Ok(match self.find_register_by_variable(assignee) {
            Some(rid) => rid,
            None => self.put_variable_in_register(assignee, inst.start, inst.end),
        })
    }

    fn compile_assign(&mut self, inst: &Instruction) -> Result<usize> {
        if inst.operands.len() != 1 {
            return Err(Error::Bug(format!(
                "assignment with {} operands",
                inst.operands.len()
            )));
        }

        let dest = self.assignee_register(inst)?;
        let source = self.operand_text(&inst.operands[0])?;
        self.writeln(&format!("mov {}, {}", regname(dest), source));
        Ok(dest)
    }

    fn compile_add(&mut self, inst: &Instruction) -> Result<usize> {
        if inst.operands.len() != 2 {
            return Err(Error::Bug(format!(
                "addition with {} operands",
                inst.operands.len()
            )));
        }

        let mut dest = self.assignee_register(inst)?;
        let dest_var = self.registers[dest]
            .data
            .as_ref()
            .map(|data| data.var.clone())
            .unwrap_or_default();

        let holds = |operand: &Operand| {
            matches!(operand, Operand::Variable(name) if *name == dest_var)
        };

        // Reuse the destination when it already holds one of the operands;
        // otherwise seed it with the left operand first.
        let other = if holds(&inst.operands[0]) {
            1
        } else if holds(&inst.operands[1]) {
            0
        } else {
            let mut seed = inst.clone();
            seed.opcode = Opcode::Assign;
            seed.operands.truncate(1);
            dest = self.compile_assign(&seed)?;
            1
        };

        let source = self.operand_text(&inst.operands[other])?;
        self.writeln(&format!("add {}, {}", regname(dest), source));
        Ok(dest)
    }

    fn compile_instruction(&mut self, inst: &Instruction) -> Result<()> {
        match inst.opcode {
            // Block labels are handled out of band.
            Opcode::Def => Ok(()),
            Opcode::Assign => self.compile_assign(inst).map(|_| ()),
            Opcode::Add => self.compile_add(inst).map(|_| ()),
            Opcode::Ret => {
                log::warn!("return does not emit any code yet");
                Ok(())
            }
            Opcode::Dead => {
                log::warn!(
                    "ignoring dead variable '{}' at line {}, col {}",
                    inst.assignee.as_deref().unwrap_or("?"),
                    inst.span.line,
                    inst.span.col
                );
                Ok(())
            }
            opcode => Err(Error::Codegen(format!(
                "compilation not supported for opcode: {:?}",
                opcode
            ))),
        }
    }

    /// Reserves uninitialized storage for every global variable, using the
    /// widest directive that divides the type size. Iteration order follows
    /// the symbol map and is unspecified.
    fn alloc_global_symbols(&mut self) {
        self.writeln("section .bss");

        let mut lines = Vec::new();
        for symbol in self.globals.symbols() {
            if symbol.kind != SymbolKind::Var {
                continue;
            }
            let ty = match symbol.ty {
                Some(ty) => ty,
                None => continue,
            };

            let width = if ty.size % RESQ == 0 {
                RESQ
            } else if ty.size % RESD == 0 {
                RESD
            } else {
                RESB
            };

            lines.push(format!(
                "{}: {} {}",
                symbol.name,
                reserve_directive(width),
                ty.size / width
            ));
        }
        for line in lines {
            self.writeln(&line);
        }
    }
}

/// Compiles the program into NASM x86-64 text for Linux.
pub fn generate(program: &Program, globals: &Scope) -> Result<Target> {
    let mut gen = Generator::new(globals);

    gen.alloc_global_symbols();

    gen.writeln("section .text");
    gen.writeln("global _start");
    gen.writeln("_start:");

    let mut pc = 0;
    for block in &program.blocks {
        for inst in &block.instructions {
            gen.expire_old_intervals(pc);
            gen.compile_instruction(inst)?;
            pc += 1;
        }
    }

    // Exit syscall.
    gen.writeln("mov rdi, 0");
    gen.writeln("mov rax, 0x3c");
    gen.writeln("syscall");

    Ok(Target { code: gen.code })
}
