use serde::{Serialize, Serializer};

use crate::bytecode::{Function, Instruction, OpCode};

pub mod source_map;
pub use source_map::{Snippet, SourceMap};

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Wraps a node with its source span. Serializes as the inner node only.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

// ---- Listing ----

/// `fn name` followed by its raw, unassembled instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(skip)]
    pub span: Span,
    pub instructions: Vec<Spanned<Instruction>>,
}

impl FunctionDef {
    pub fn to_function(&self) -> Function {
        self.instructions.iter().map(|i| i.node.clone()).collect()
    }

    /// Source span of each instruction that survives assembly, indexed by
    /// its position in the assembled function.
    pub fn assembled_spans(&self) -> Vec<Span> {
        self.instructions
            .iter()
            .filter(|i| i.opcode != OpCode::Label)
            .map(|i| i.span)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Listing {
    pub functions: Vec<FunctionDef>,
    #[serde(skip)]
    pub source: Option<String>,
}

impl Listing {
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> FunctionDef {
        FunctionDef {
            name: "main".to_string(),
            span: Span { start: 0, end: 7 },
            instructions: vec![
                Spanned::new(Instruction::with(OpCode::Label, "top"), Span { start: 10, end: 19 }),
                Spanned::new(Instruction::with(OpCode::Pi, 1), Span { start: 22, end: 26 }),
                Spanned::new(Instruction::with(OpCode::Jump, "top"), Span { start: 29, end: 37 }),
            ],
        }
    }

    #[test]
    fn span_merge_takes_extremes() {
        let a = Span { start: 5, end: 10 };
        let b = Span { start: 2, end: 15 };
        assert_eq!(a.merge(b), Span { start: 2, end: 15 });
    }

    #[test]
    fn span_merge_non_overlapping() {
        let a = Span { start: 0, end: 5 };
        let b = Span { start: 10, end: 20 };
        assert_eq!(a.merge(b), Span { start: 0, end: 20 });
    }

    #[test]
    fn spanned_deref() {
        let s = Spanned::new(42, Span { start: 0, end: 2 });
        assert_eq!(*s, 42);
    }

    #[test]
    fn spanned_serialize_transparent() {
        let s = Spanned::new(42i32, Span { start: 5, end: 10 });
        assert_eq!(serde_json::to_string(&s).unwrap(), "42");
    }

    #[test]
    fn to_function_keeps_labels() {
        let f = def().to_function();
        assert_eq!(f.len(), 3);
        assert_eq!(f.instructions[0].opcode, OpCode::Label);
    }

    #[test]
    fn assembled_spans_skip_labels() {
        assert_eq!(
            def().assembled_spans(),
            vec![Span { start: 22, end: 26 }, Span { start: 29, end: 37 }]
        );
    }

    #[test]
    fn listing_json_has_no_spans_or_source() {
        let listing = Listing { functions: vec![def()], source: Some("fn main".into()) };
        let json = serde_json::to_string(&listing).unwrap();
        assert!(!json.contains("span"));
        assert!(!json.contains("source"));
        assert!(json.contains(r#""name":"main""#));
        assert!(json.contains(r#"{"op":"jump","imm":"top"}"#));
    }
}
