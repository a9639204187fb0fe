use std::collections::HashMap;

use tracing::{debug, warn};

use crate::bytecode::{Function, Instruction, OpCode};
use crate::value::{Object, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    #[error("duplicate label '{label}'")]
    DuplicateLabel { label: String },
    #[error("label at instruction {index} has no name")]
    InvalidLabel { index: usize },
    #[error("{op} at instruction {index} has no target")]
    MissingJumpTarget { op: OpCode, index: usize },
    #[error("{op} at instruction {index} targets a function reference")]
    InvalidJumpTarget { op: OpCode, index: usize },
}

/// Strip labels from `function` and rewrite jumps that name a label into
/// offsets relative to the jump itself.
///
/// Already-numeric jump targets are kept as they are, so assembling twice is
/// a no-op. A target naming no label in this function is left symbolic; the
/// interpreter faults if such a jump is ever taken. On error the function is
/// not modified.
pub fn assemble(function: &mut Function) -> Result<(), AssembleError> {
    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut unlabeled: Vec<Instruction> = Vec::with_capacity(function.instructions.len());

    for (index, inst) in function.instructions.iter().enumerate() {
        if inst.opcode != OpCode::Label {
            unlabeled.push(inst.clone());
            continue;
        }
        let name = match &inst.immediate {
            Some(Value::Object(Object::Str(name))) => name,
            _ => return Err(AssembleError::InvalidLabel { index }),
        };
        if labels.insert(name.clone(), unlabeled.len()).is_some() {
            return Err(AssembleError::DuplicateLabel { label: name.clone() });
        }
    }

    for (pos, inst) in unlabeled.iter_mut().enumerate() {
        if !inst.opcode.is_jump() {
            continue;
        }
        let op = inst.opcode;
        let offset = match &inst.immediate {
            None => return Err(AssembleError::MissingJumpTarget { op, index: pos }),
            Some(Value::Number(_)) => None,
            Some(Value::Object(Object::Function(_))) => {
                return Err(AssembleError::InvalidJumpTarget { op, index: pos });
            }
            Some(Value::Object(Object::Str(target))) => match labels.get(target) {
                Some(&at) => Some(at as i64 - pos as i64),
                None => {
                    warn!(%op, target = %target, position = pos, "jump target has no matching label");
                    None
                }
            },
        };
        if let Some(offset) = offset {
            inst.immediate = Some(Value::Number(offset as f32));
        }
    }

    debug!(
        labels = labels.len(),
        before = function.instructions.len(),
        after = unlabeled.len(),
        "assembled function"
    );
    function.instructions = unlabeled;
    Ok(())
}
