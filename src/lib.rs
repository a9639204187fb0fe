//! A stack-based bytecode VM: values, instructions, a label assembler, a
//! call linker, the interpreter and the function registry that ties them
//! together, plus a plain-text listing front-end and diagnostics.

pub mod assembler;
pub mod ast;
pub mod bytecode;
pub mod diagnostic;
pub mod lexer;
pub mod linker;
pub mod logging;
pub mod parser;
pub mod value;
pub mod vm;

pub use bytecode::{Function, Instruction, OpCode};
pub use value::{Object, Tag, Value};
pub use vm::{ExitStatus, Fault, Vm, VmConfig, VmError};
