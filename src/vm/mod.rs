use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::assembler::{self, AssembleError};
use crate::bytecode::{Function, OpCode};
use crate::linker::{self, LinkError};
use crate::value::{Tag, Value};

pub mod frame;
mod machine;

pub use frame::{CallFrame, GLOBAL_SLOTS, LOCAL_SLOTS, Slots};

use machine::{Machine, Trap};

/// Receives one rendered value per `puts`.
pub type OutputFn = Box<dyn FnMut(String)>;

// ── Errors ───────────────────────────────────────────────────────────

/// A contract violation detected while executing an instruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("{op}: operand type mismatch ({left} and {right})")]
    TypeMismatch { op: OpCode, left: Tag, right: Tag },
    #[error("{op} is not defined for {tag} operands")]
    UnsupportedOperand { op: OpCode, tag: Tag },
    #[error("{op} requires an immediate")]
    MissingImmediate { op: OpCode },
    #[error("{op}: expected a whole number within i64 range, got '{found}'")]
    InvalidIndex { op: OpCode, found: String },
    #[error("{op}: slot {index} is out of range (0..{limit})")]
    SlotOutOfRange { op: OpCode, index: i64, limit: usize },
    #[error("{op}: unresolved target '{name}'")]
    UnresolvedImmediate { op: OpCode, name: String },
    #[error("call to function #{index}, but {count} function(s) are registered")]
    InvalidCallTarget { index: i64, count: usize },
    #[error("{op}: operand stack underflow")]
    StackUnderflow { op: OpCode },
    #[error("operand stack overflow (limit {limit})")]
    StackOverflow { limit: usize },
    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded { limit: usize },
    #[error("{op} lands outside the function (instruction {target})")]
    JumpOutOfRange { op: OpCode, target: i64 },
    #[error("ran past the end of the function (instruction {pc})")]
    PcOutOfRange { pc: usize },
}

impl Fault {
    pub fn code(&self) -> &'static str {
        match self {
            Fault::TypeMismatch { .. } => "SSM-E001",
            Fault::UnsupportedOperand { .. } => "SSM-E002",
            Fault::MissingImmediate { .. } => "SSM-E003",
            Fault::InvalidIndex { .. } => "SSM-E004",
            Fault::SlotOutOfRange { .. } => "SSM-E005",
            Fault::UnresolvedImmediate { .. } => "SSM-E006",
            Fault::InvalidCallTarget { .. } => "SSM-E007",
            Fault::StackUnderflow { .. } => "SSM-E008",
            Fault::StackOverflow { .. } => "SSM-E009",
            Fault::CallDepthExceeded { .. } => "SSM-E010",
            Fault::JumpOutOfRange { .. } => "SSM-E011",
            Fault::PcOutOfRange { .. } => "SSM-E012",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("function '{name}' is already registered")]
    DuplicateFunction { name: String },
    #[error("failed to assemble function '{name}': {source}")]
    Assemble { name: String, source: AssembleError },
    #[error("failed to link functions: {0}")]
    Link(#[from] LinkError),
    #[error("undefined function: {name}")]
    UndefinedFunction { name: String },
    #[error("run called with {depth} frame(s) still on the call stack")]
    CallStackNotEmpty { depth: usize },
    #[error("{fault} (in '{function}' at instruction {pc})")]
    Fault {
        function: String,
        pc: usize,
        #[source]
        fault: Fault,
    },
    #[error("internal VM error: {message}")]
    Internal { message: String },
    #[error("VM is unusable after an internal error")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before anything executed.
    Structural,
    /// Execution started and stopped on a fault.
    Runtime,
    /// The VM's own bookkeeping is inconsistent.
    Internal,
}

impl VmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VmError::DuplicateFunction { .. }
            | VmError::Assemble { .. }
            | VmError::Link(_)
            | VmError::UndefinedFunction { .. }
            | VmError::CallStackNotEmpty { .. } => ErrorKind::Structural,
            VmError::Fault { .. } => ErrorKind::Runtime,
            VmError::Internal { .. } | VmError::Poisoned => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            VmError::DuplicateFunction { .. } => "SSM-R001",
            VmError::UndefinedFunction { .. } => "SSM-R002",
            VmError::CallStackNotEmpty { .. } => "SSM-R003",
            VmError::Assemble { source, .. } => source.code(),
            VmError::Link(e) => e.code(),
            VmError::Fault { fault, .. } => fault.code(),
            VmError::Internal { .. } => "SSM-I001",
            VmError::Poisoned => "SSM-I002",
        }
    }
}

impl AssembleError {
    pub fn code(&self) -> &'static str {
        match self {
            AssembleError::DuplicateLabel { .. } => "SSM-A001",
            AssembleError::InvalidLabel { .. } => "SSM-A002",
            AssembleError::MissingJumpTarget { .. } => "SSM-A003",
            AssembleError::InvalidJumpTarget { .. } => "SSM-A004",
        }
    }
}

impl LinkError {
    pub fn code(&self) -> &'static str {
        match self {
            LinkError::UndefinedFunction { .. } => "SSM-K001",
            LinkError::InvalidTarget { .. } => "SSM-K002",
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum number of values on the operand stack.
    pub max_stack: usize,
    /// Maximum number of live call frames.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig { max_stack: 65_536, max_call_depth: 4_096 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// An `exit` instruction halted the machine.
    Exit,
    /// The entry function returned.
    Return,
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exit => write!(f, "exit"),
            ExitStatus::Return => write!(f, "ret"),
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────────

pub struct Vm {
    functions: Vec<Function>,
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    machine: Machine,
    linked: bool,
    poisoned: bool,
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Vm {
    /// A VM whose `puts` writes lines to stdout.
    pub fn new() -> Self {
        Vm::with_output(|line| println!("{line}"))
    }

    pub fn with_output(output: impl FnMut(String) + 'static) -> Self {
        Vm::with_config(VmConfig::default(), output)
    }

    pub fn with_config(config: VmConfig, output: impl FnMut(String) + 'static) -> Self {
        Vm {
            functions: Vec::new(),
            names: Vec::new(),
            lookup: HashMap::new(),
            machine: Machine::new(config, Box::new(output)),
            linked: true,
            poisoned: false,
        }
    }

    /// Assemble `function` and register it under `name`, returning its
    /// index in the function table. Nothing is registered on failure.
    pub fn add_function(&mut self, mut function: Function, name: impl Into<String>) -> Result<usize, VmError> {
        if self.poisoned {
            return Err(VmError::Poisoned);
        }
        let name = name.into();
        if self.lookup.contains_key(&name) {
            error!(name = %name, "duplicate function name");
            return Err(VmError::DuplicateFunction { name });
        }
        if let Err(source) = assembler::assemble(&mut function) {
            error!(name = %name, error = %source, "failed to assemble function");
            return Err(VmError::Assemble { name, source });
        }

        let index = self.functions.len();
        debug!(name = %name, index, instructions = function.len(), "registered function");
        self.functions.push(function);
        self.names.push(name.clone());
        self.lookup.insert(name, index);
        self.linked = false;
        Ok(index)
    }

    /// Resolve symbolic call targets across every registered function.
    /// Only does work if something was registered since the last link.
    pub fn link(&mut self) -> Result<(), VmError> {
        if self.poisoned {
            return Err(VmError::Poisoned);
        }
        if !self.linked {
            linker::link(&mut self.functions, &self.lookup).inspect_err(|e| {
                error!(error = %e, "failed to link functions");
            })?;
            self.linked = true;
        }
        Ok(())
    }

    /// Link, then execute `entry` until it exits, returns, or faults.
    pub fn run(&mut self, entry: &str) -> Result<ExitStatus, VmError> {
        if self.poisoned {
            return Err(VmError::Poisoned);
        }
        let depth = self.machine.frames.len();
        if depth != 0 {
            return Err(VmError::CallStackNotEmpty { depth });
        }
        self.link()?;
        let index = self.function_index(entry).ok_or_else(|| {
            error!(entry, "entry function not found");
            VmError::UndefinedFunction { name: entry.to_string() }
        })?;

        info!(entry, index, "run");
        match self.machine.start(index, &self.functions) {
            Ok(status) => {
                if status == ExitStatus::Exit {
                    self.machine.frames.clear();
                }
                let residual = self.machine.values.len();
                if residual > 0 {
                    warn!(residual, "operand stack not empty at end of execution");
                }
                debug!(%status, "run finished");
                Ok(status)
            }
            Err(Trap::Fault { function, pc, fault }) => {
                let function = self
                    .names
                    .get(function)
                    .cloned()
                    .unwrap_or_else(|| format!("#{function}"));
                error!(function = %function, pc, error = %fault, "runtime fault");
                Err(VmError::Fault { function, pc, fault })
            }
            Err(Trap::Internal(message)) => {
                error!(message = %message, "internal error; VM poisoned");
                self.poisoned = true;
                Err(VmError::Internal { message })
            }
        }
    }

    /// Drop both stacks after a failed run so `run` may be called again.
    pub fn reset(&mut self) {
        self.machine.frames.clear();
        self.machine.values.clear();
    }

    pub fn function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Names in table order.
    pub fn function_names(&self) -> &[String] {
        &self.names
    }

    pub fn global(&self, index: usize) -> Option<&Value> {
        self.machine.globals.get(index)
    }

    /// Values left on the operand stack by the last run.
    pub fn residual_values(&self) -> usize {
        self.machine.values.len()
    }

    pub fn call_depth(&self) -> usize {
        self.machine.frames.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Header plus listing of a registered function.
    pub fn dump(&self, name: &str) -> Option<String> {
        let function = self.function(self.function_index(name)?)?;
        Some(format!("Function: {name}\n{}\n{}", "-".repeat(8), function.listing()))
    }
}
