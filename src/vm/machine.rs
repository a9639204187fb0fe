use tracing::trace;

use crate::bytecode::{Function, Instruction, OpCode};
use crate::value::{Object, Value, ValueError};

use super::frame::{CallFrame, GLOBAL_SLOTS, Slots};
use super::{ExitStatus, Fault, OutputFn, VmConfig};

/// Why the fetch-execute loop stopped without a terminal status.
#[derive(Debug)]
pub(crate) enum Trap {
    Fault { function: usize, pc: usize, fault: Fault },
    Internal(String),
}

enum Flow {
    Continue,
    Halt(ExitStatus),
}

enum StepError {
    Fault(Fault),
    Internal(String),
}

impl From<Fault> for StepError {
    fn from(fault: Fault) -> Self {
        StepError::Fault(fault)
    }
}

type StepResult = Result<Flow, StepError>;

/// Operand stack, call stack and globals. Functions are borrowed per run
/// so the machine never owns code.
pub(crate) struct Machine {
    pub(crate) values: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) globals: Slots,
    output: OutputFn,
    config: VmConfig,
}

impl Machine {
    pub(crate) fn new(config: VmConfig, output: OutputFn) -> Self {
        Machine {
            values: Vec::new(),
            frames: Vec::new(),
            globals: Slots::new(GLOBAL_SLOTS),
            output,
            config,
        }
    }

    /// Push a frame for `entry` on an empty operand stack and run to a
    /// terminal state.
    pub(crate) fn start(&mut self, entry: usize, functions: &[Function]) -> Result<ExitStatus, Trap> {
        self.values.clear();
        self.frames.push(CallFrame::new(entry));
        self.execute(functions)
    }

    fn execute(&mut self, functions: &[Function]) -> Result<ExitStatus, Trap> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Err(Trap::Internal("no active call frame".into()));
            };
            let (function, pc) = (frame.function, frame.pc);
            let Some(code) = functions.get(function) else {
                return Err(Trap::Internal(format!("frame refers to missing function #{function}")));
            };
            let Some(inst) = code.instructions.get(pc) else {
                return Err(Trap::Fault { function, pc, fault: Fault::PcOutOfRange { pc } });
            };
            frame.pc += 1;

            trace!(function, pc, op = %inst.opcode, "dispatch");
            match self.step(inst, functions) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt(status)) => return Ok(status),
                Err(StepError::Fault(fault)) => return Err(Trap::Fault { function, pc, fault }),
                Err(StepError::Internal(message)) => return Err(Trap::Internal(message)),
            }
        }
    }

    fn step(&mut self, inst: &Instruction, functions: &[Function]) -> StepResult {
        let op = inst.opcode;
        match op {
            OpCode::Pi => {
                let value = immediate(inst)?.clone();
                self.push(value)?;
            }
            OpCode::Sl => {
                let slot = whole(op, immediate(inst)?)?;
                let value = self.pop(op)?;
                self.frame()?.locals.store(op, slot, value)?;
            }
            OpCode::Ll => {
                let slot = whole(op, immediate(inst)?)?;
                let value = self.frame()?.locals.load(op, slot)?;
                self.push(value)?;
            }
            OpCode::Sg => {
                let slot = whole(op, immediate(inst)?)?;
                let value = self.pop(op)?;
                self.globals.store(op, slot, value)?;
            }
            OpCode::Lg => {
                let slot = whole(op, immediate(inst)?)?;
                let value = self.globals.load(op, slot)?;
                self.push(value)?;
            }

            OpCode::Puts => {
                let value = self.pop(op)?;
                (self.output)(value.to_string());
            }
            OpCode::Copy => {
                let top = self.values.last().cloned().ok_or(Fault::StackUnderflow { op })?;
                self.push(top)?;
            }

            OpCode::Exit => return Ok(Flow::Halt(ExitStatus::Exit)),
            OpCode::Ret => {
                self.frames.pop();
                if self.frames.is_empty() {
                    return Ok(Flow::Halt(ExitStatus::Return));
                }
            }

            OpCode::Add => {
                let (left, right) = self.pop_pair(op)?;
                self.push(add(left, right)?)?;
            }
            OpCode::Sub => {
                let (left, right) = self.pop_pair(op)?;
                self.push(numeric(op, left, right, |a, b| a - b)?)?;
            }
            OpCode::Mul => {
                let (left, right) = self.pop_pair(op)?;
                self.push(numeric(op, left, right, |a, b| a * b)?)?;
            }
            OpCode::Div => {
                let (left, right) = self.pop_pair(op)?;
                self.push(numeric(op, left, right, |a, b| a / b)?)?;
            }

            OpCode::Jump => {
                let offset = whole(op, immediate(inst)?)?;
                self.jump(op, offset)?;
            }
            OpCode::Jeq | OpCode::Jneq | OpCode::Jlt | OpCode::Jgt => {
                let offset = whole(op, immediate(inst)?)?;
                let (left, right) = self.pop_pair(op)?;
                let taken = match op {
                    OpCode::Jeq => left.equals(&right),
                    OpCode::Jneq => left.equals(&right).map(|eq| !eq),
                    OpCode::Jlt => left.less_than(&right),
                    _ => left.greater_than(&right),
                }
                .map_err(|e| comparison_fault(op, e))?;
                if taken {
                    self.jump(op, offset)?;
                }
            }

            OpCode::Call => {
                let target = whole(op, immediate(inst)?)?;
                let index = usize::try_from(target)
                    .ok()
                    .filter(|&i| i < functions.len())
                    .ok_or(Fault::InvalidCallTarget { index: target, count: functions.len() })?;
                if self.frames.len() >= self.config.max_call_depth {
                    return Err(Fault::CallDepthExceeded { limit: self.config.max_call_depth }.into());
                }
                self.frames.push(CallFrame::new(index));
            }

            OpCode::Label => {
                return Err(StepError::Internal("label instruction reached the interpreter".into()));
            }
        }
        Ok(Flow::Continue)
    }

    fn frame(&mut self) -> Result<&mut CallFrame, StepError> {
        self.frames
            .last_mut()
            .ok_or_else(|| StepError::Internal("no active call frame".into()))
    }

    fn push(&mut self, value: Value) -> Result<(), Fault> {
        if self.values.len() >= self.config.max_stack {
            return Err(Fault::StackOverflow { limit: self.config.max_stack });
        }
        self.values.push(value);
        Ok(())
    }

    fn pop(&mut self, op: OpCode) -> Result<Value, Fault> {
        self.values.pop().ok_or(Fault::StackUnderflow { op })
    }

    /// Pops right, then left.
    fn pop_pair(&mut self, op: OpCode) -> Result<(Value, Value), Fault> {
        let right = self.pop(op)?;
        let left = self.pop(op)?;
        Ok((left, right))
    }

    /// The counter already points past the jump, hence the `- 1`.
    fn jump(&mut self, op: OpCode, offset: i64) -> Result<(), StepError> {
        let frame = self.frame()?;
        let target = i64::try_from(frame.pc)
            .ok()
            .and_then(|pc| pc.checked_add(offset))
            .and_then(|t| t.checked_sub(1))
            .ok_or(Fault::JumpOutOfRange { op, target: offset })?;
        frame.pc = usize::try_from(target).map_err(|_| Fault::JumpOutOfRange { op, target })?;
        Ok(())
    }
}

fn immediate(inst: &Instruction) -> Result<&Value, Fault> {
    inst.immediate
        .as_ref()
        .ok_or(Fault::MissingImmediate { op: inst.opcode })
}

/// 2^63, the first `f32` past `i64::MAX`.
const WHOLE_LIMIT: f32 = 9_223_372_036_854_775_808.0;

/// Slot indices, offsets and call targets: whole numbers that fit an `i64`.
fn whole(op: OpCode, value: &Value) -> Result<i64, Fault> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && (-WHOLE_LIMIT..WHOLE_LIMIT).contains(n) => Ok(*n as i64),
        Value::Object(Object::Str(name)) if op.is_jump() || op == OpCode::Call => {
            Err(Fault::UnresolvedImmediate { op, name: name.clone() })
        }
        other => Err(Fault::InvalidIndex { op, found: other.to_string() }),
    }
}

fn add(left: Value, right: Value) -> Result<Value, Fault> {
    match (left, right) {
        (Value::Object(Object::Str(mut l)), Value::Object(Object::Str(r))) => {
            l.push_str(&r);
            Ok(Value::str(l))
        }
        (left, right) => numeric(OpCode::Add, left, right, |a, b| a + b),
    }
}

fn numeric(op: OpCode, left: Value, right: Value, f: impl Fn(f32, f32) -> f32) -> Result<Value, Fault> {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ if left.tag() == right.tag() => Err(Fault::UnsupportedOperand { op, tag: left.tag() }),
        _ => Err(Fault::TypeMismatch { op, left: left.tag(), right: right.tag() }),
    }
}

fn comparison_fault(op: OpCode, err: ValueError) -> Fault {
    match err {
        ValueError::Mismatch { left, right } => Fault::TypeMismatch { op, left, right },
        ValueError::Incomparable(tag) => Fault::UnsupportedOperand { op, tag },
        ValueError::WrongTag { found, .. } => Fault::UnsupportedOperand { op, tag: found },
    }
}
