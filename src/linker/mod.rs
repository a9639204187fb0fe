use std::collections::HashMap;

use tracing::debug;

use crate::bytecode::{Function, OpCode};
use crate::value::{Object, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("call to undefined function '{name}' (function #{caller}, instruction {index})")]
    UndefinedFunction { name: String, caller: usize, index: usize },
    #[error("call at instruction {index} of function #{caller} has no usable target")]
    InvalidTarget { caller: usize, index: usize },
}

/// Rewrite every `call` naming a function into that function's index in
/// `functions`.
///
/// All targets are resolved before anything is written, so a failed link
/// leaves the table as it was. Numeric targets are kept, which makes linking
/// idempotent.
pub fn link(functions: &mut [Function], table: &HashMap<String, usize>) -> Result<(), LinkError> {
    let mut patches: Vec<(usize, usize, usize)> = Vec::new();

    for (caller, function) in functions.iter().enumerate() {
        for (index, inst) in function.instructions.iter().enumerate() {
            if inst.opcode != OpCode::Call {
                continue;
            }
            match &inst.immediate {
                Some(Value::Number(_)) => {}
                Some(Value::Object(Object::Str(name))) => {
                    let target = table.get(name).copied().ok_or_else(|| LinkError::UndefinedFunction {
                        name: name.clone(),
                        caller,
                        index,
                    })?;
                    patches.push((caller, index, target));
                }
                None | Some(Value::Object(Object::Function(_))) => {
                    return Err(LinkError::InvalidTarget { caller, index });
                }
            }
        }
    }

    debug!(functions = functions.len(), resolved = patches.len(), "linked functions");
    for (caller, index, target) in patches {
        functions[caller].instructions[index].immediate = Some(Value::from(target));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction;

    fn table(names: &[&str]) -> HashMap<String, usize> {
        names.iter().enumerate().map(|(i, n)| (n.to_string(), i)).collect()
    }

    fn program() -> Vec<Function> {
        vec![
            Function::new(vec![
                Instruction::with(OpCode::Pi, 10),
                Instruction::with(OpCode::Call, "end"),
                Instruction::new(OpCode::Ret),
            ]),
            Function::new(vec![
                Instruction::new(OpCode::Puts),
                Instruction::with(OpCode::Call, "main"),
                Instruction::new(OpCode::Exit),
            ]),
        ]
    }

    #[test]
    fn resolves_forward_and_backward_references() {
        let mut fns = program();
        link(&mut fns, &table(&["main", "end"])).unwrap();
        assert_eq!(fns[0].instructions[1], Instruction::with(OpCode::Call, 1));
        assert_eq!(fns[1].instructions[1], Instruction::with(OpCode::Call, 0));
        // non-call immediates are not touched
        assert_eq!(fns[0].instructions[0], Instruction::with(OpCode::Pi, 10));
    }

    #[test]
    fn linking_is_idempotent() {
        let mut fns = program();
        let names = table(&["main", "end"]);
        link(&mut fns, &names).unwrap();
        let once = fns.clone();
        link(&mut fns, &names).unwrap();
        assert_eq!(fns, once);
    }

    #[test]
    fn undefined_target_aborts_without_partial_writes() {
        let mut fns = program();
        let before = fns.clone();
        let err = link(&mut fns, &table(&["main"])).unwrap_err();
        assert_eq!(
            err,
            LinkError::UndefinedFunction { name: "end".into(), caller: 0, index: 1 }
        );
        assert_eq!(fns, before);
    }

    #[test]
    fn call_without_target_is_rejected() {
        let mut fns = vec![Function::new(vec![Instruction::new(OpCode::Call)])];
        assert_eq!(
            link(&mut fns, &HashMap::new()),
            Err(LinkError::InvalidTarget { caller: 0, index: 0 })
        );
    }

    #[test]
    fn jumps_are_not_linked() {
        let mut fns = vec![Function::new(vec![Instruction::with(OpCode::Jump, "main")])];
        link(&mut fns, &table(&["main"])).unwrap();
        assert_eq!(fns[0].instructions[0], Instruction::with(OpCode::Jump, "main"));
    }
}
