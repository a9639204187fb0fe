use std::fmt;

use serde::Serialize;

use crate::value::Value;

// ── Opcodes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpCode {
    // Immediates and slots
    Pi,
    Sl,
    Ll,
    Sg,
    Lg,

    Puts,
    Copy,

    Exit,
    Ret,

    Add,
    Sub,
    Mul,
    Div,

    Jump,
    Call,

    // Conditional jumps; both pop their operands
    Jeq,
    Jneq,
    Jlt,
    Jgt,

    /// Jumpable location. Only meaningful before assembly.
    Label,
}

impl OpCode {
    pub const ALL: [OpCode; 20] = [
        OpCode::Pi,
        OpCode::Sl,
        OpCode::Ll,
        OpCode::Sg,
        OpCode::Lg,
        OpCode::Puts,
        OpCode::Copy,
        OpCode::Exit,
        OpCode::Ret,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Jump,
        OpCode::Call,
        OpCode::Jeq,
        OpCode::Jneq,
        OpCode::Jlt,
        OpCode::Jgt,
        OpCode::Label,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Pi => "pi",
            OpCode::Sl => "sl",
            OpCode::Ll => "ll",
            OpCode::Sg => "sg",
            OpCode::Lg => "lg",
            OpCode::Puts => "puts",
            OpCode::Copy => "copy",
            OpCode::Exit => "exit",
            OpCode::Ret => "ret",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Jump => "jump",
            OpCode::Call => "call",
            OpCode::Jeq => "jeq",
            OpCode::Jneq => "jneq",
            OpCode::Jlt => "jlt",
            OpCode::Jgt => "jgt",
            OpCode::Label => "label",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        OpCode::ALL.into_iter().find(|op| op.mnemonic() == s)
    }

    /// Whether a well-formed instruction with this opcode carries an immediate.
    pub fn requires_immediate(self) -> bool {
        !matches!(
            self,
            OpCode::Puts
                | OpCode::Copy
                | OpCode::Exit
                | OpCode::Ret
                | OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
        )
    }

    /// Jump-class opcodes: their immediate is a label before assembly and a
    /// relative offset after.
    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Jump | OpCode::Jeq | OpCode::Jneq | OpCode::Jlt | OpCode::Jgt)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// ── Instructions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    #[serde(rename = "op")]
    pub opcode: OpCode,
    #[serde(rename = "imm", skip_serializing_if = "Option::is_none")]
    pub immediate: Option<Value>,
}

impl Instruction {
    pub fn new(opcode: OpCode) -> Self {
        Instruction { opcode, immediate: None }
    }

    pub fn with(opcode: OpCode, immediate: impl Into<Value>) -> Self {
        Instruction { opcode, immediate: Some(immediate.into()) }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.immediate {
            Some(imm) => write!(f, "{} {}", self.opcode, imm),
            None => write!(f, "{}", self.opcode),
        }
    }
}

// ── Functions ────────────────────────────────────────────────────────

/// An owned instruction sequence. Raw until registered with a VM, which
/// assembles it in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Function {
    pub instructions: Vec<Instruction>,
}

impl Function {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Function { instructions }
    }

    pub fn push(&mut self, opcode: OpCode) -> &mut Self {
        self.instructions.push(Instruction::new(opcode));
        self
    }

    pub fn push_with(&mut self, opcode: OpCode, immediate: impl Into<Value>) -> &mut Self {
        self.instructions.push(Instruction::with(opcode, immediate));
        self
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// One rendered instruction per line.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for inst in &self.instructions {
            out.push_str(&inst.to_string());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<Instruction> for Function {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Function { instructions: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_parse_back() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(OpCode::from_mnemonic("push"), None);
        assert_eq!(OpCode::from_mnemonic("PI"), None);
    }

    #[test]
    fn immediate_table() {
        let with: Vec<OpCode> = OpCode::ALL.into_iter().filter(|op| op.requires_immediate()).collect();
        assert_eq!(
            with,
            vec![
                OpCode::Pi,
                OpCode::Sl,
                OpCode::Ll,
                OpCode::Sg,
                OpCode::Lg,
                OpCode::Jump,
                OpCode::Call,
                OpCode::Jeq,
                OpCode::Jneq,
                OpCode::Jlt,
                OpCode::Jgt,
                OpCode::Label,
            ]
        );
    }

    #[test]
    fn jump_class() {
        assert!(OpCode::Jump.is_jump());
        assert!(OpCode::Jgt.is_jump());
        assert!(!OpCode::Call.is_jump());
        assert!(!OpCode::Label.is_jump());
    }

    #[test]
    fn instruction_rendering() {
        assert_eq!(Instruction::with(OpCode::Pi, 10).to_string(), "pi 10");
        assert_eq!(Instruction::with(OpCode::Jump, -5).to_string(), "jump -5");
        assert_eq!(Instruction::with(OpCode::Call, "end").to_string(), "call end");
        assert_eq!(Instruction::new(OpCode::Puts).to_string(), "puts");
    }

    #[test]
    fn function_builder_and_listing() {
        let mut f = Function::default();
        f.push_with(OpCode::Pi, 1).push(OpCode::Puts).push(OpCode::Exit);
        assert_eq!(f.len(), 3);
        assert_eq!(f.listing(), "pi 1\nputs\nexit\n");
    }

    #[test]
    fn instruction_json_shape() {
        let json = serde_json::to_string(&Instruction::with(OpCode::Jlt, "loop")).unwrap();
        assert_eq!(json, r#"{"op":"jlt","imm":"loop"}"#);
        let json = serde_json::to_string(&Instruction::new(OpCode::Ret)).unwrap();
        assert_eq!(json, r#"{"op":"ret"}"#);
    }
}
