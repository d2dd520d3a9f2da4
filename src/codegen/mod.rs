//! Assembly generation back-ends.
//!
//! One target exists today: NASM-flavoured x86-64 assembly for Linux,
//! produced by [`generate`](fn.generate.html). The output text is meant to
//! be fed to `nasm -felf64` and linked with `ld`; it defines `_start` and
//! exits through the `exit(0)` syscall.

mod nasm_x86_64;

pub use nasm_x86_64::{generate, Reg, Target, NUM_REGISTERS};
