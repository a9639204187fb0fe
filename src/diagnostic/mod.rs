pub mod ansi;
pub mod json;
pub mod registry;

use crate::ast::Span;
use crate::vm::VmError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, ..Diagnostic::error(message) }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    pub fn with_secondary_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for existing error types ----

impl From<&crate::lexer::LexError> for Diagnostic {
    fn from(e: &crate::lexer::LexError) -> Self {
        let span = Span {
            start: e.position,
            end: e.position + e.snippet.len().max(1),
        };
        let mut d = Diagnostic::error(format!("unexpected token '{}'", e.snippet))
            .with_code("SSM-L001")
            .with_span(span, "here");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&crate::parser::ParseError> for Diagnostic {
    fn from(e: &crate::parser::ParseError) -> Self {
        let mut d = Diagnostic::error(&e.message)
            .with_code(e.code)
            .with_span(e.span, "here");
        if let Some(hint) = &e.hint {
            d = d.with_suggestion(hint.clone());
        }
        d
    }
}

impl From<&VmError> for Diagnostic {
    fn from(e: &VmError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(e.code());
        match e {
            VmError::Fault { function, pc, fault } => Diagnostic::error(fault.to_string())
                .with_code(e.code())
                .with_note(format!("in function '{function}' at instruction {pc}")),
            VmError::Assemble { name, source } => Diagnostic::error(source.to_string())
                .with_code(e.code())
                .with_note(format!("in function '{name}'")),
            VmError::CallStackNotEmpty { .. } => d.with_suggestion("reset the VM before running it again"),
            VmError::UndefinedFunction { name } => d.with_suggestion(format!("register a function named '{name}'")),
            VmError::Poisoned => d.with_note("an earlier internal error left the VM in an inconsistent state"),
            _ => d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssembleError;
    use crate::bytecode::OpCode;
    use crate::linker::LinkError;
    use crate::value::Tag;
    use crate::vm::Fault;

    #[test]
    fn diagnostic_error_builder() {
        let d = Diagnostic::error("something went wrong");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "something went wrong");
        assert!(d.code.is_none());
        assert!(d.labels.is_empty());
        assert!(d.notes.is_empty());
        assert!(d.suggestion.is_none());
    }

    #[test]
    fn diagnostic_warning_builder() {
        let d = Diagnostic::warning("2 value(s) left on the stack");
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.message, "2 value(s) left on the stack");
    }

    #[test]
    fn diagnostic_with_span() {
        let d = Diagnostic::error("bad token")
            .with_span(Span { start: 5, end: 8 }, "here");
        assert_eq!(d.labels.len(), 1);
        assert_eq!(d.labels[0].span.start, 5);
        assert_eq!(d.labels[0].span.end, 8);
        assert!(d.labels[0].is_primary);
    }

    #[test]
    fn diagnostic_with_note_and_suggestion() {
        let d = Diagnostic::error("type mismatch")
            .with_note("in function 'main'")
            .with_suggestion("push two numbers");
        assert_eq!(d.notes, vec!["in function 'main'"]);
        assert_eq!(d.suggestion.as_deref(), Some("push two numbers"));
    }

    #[test]
    fn from_lex_error() {
        let e = crate::lexer::LexError {
            position: 3,
            snippet: "@@".to_string(),
            suggestion: "Unexpected character(s): '@@'".to_string(),
        };
        let d = Diagnostic::from(&e);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.code, Some("SSM-L001"));
        assert!(d.message.contains("@@"));
        assert_eq!(d.labels[0].span, Span { start: 3, end: 5 });
        assert!(d.suggestion.is_some());
    }

    #[test]
    fn from_parse_error() {
        let e = crate::parser::ParseError {
            code: "SSM-P003",
            position: 2,
            span: Span { start: 10, end: 15 },
            message: "unknown instruction 'pust'".to_string(),
            hint: Some("did you mean 'puts'?".to_string()),
        };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("SSM-P003"));
        assert!(d.message.contains("pust"));
        assert_eq!(d.labels[0].span, Span { start: 10, end: 15 });
        assert_eq!(d.suggestion.as_deref(), Some("did you mean 'puts'?"));
    }

    #[test]
    fn from_fault_has_location_note() {
        let e = VmError::Fault {
            function: "main".to_string(),
            pc: 2,
            fault: Fault::TypeMismatch { op: OpCode::Add, left: Tag::Number, right: Tag::String },
        };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("SSM-E001"));
        assert!(d.message.contains("mismatch"));
        assert!(d.notes.iter().any(|n| n.contains("'main' at instruction 2")));
        assert!(d.labels.is_empty());
    }

    #[test]
    fn from_assemble_error() {
        let e = VmError::Assemble {
            name: "f".to_string(),
            source: AssembleError::DuplicateLabel { label: "top".to_string() },
        };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("SSM-A001"));
        assert!(d.message.contains("top"));
        assert!(d.notes.iter().any(|n| n.contains("'f'")));
    }

    #[test]
    fn from_link_error() {
        let e = VmError::Link(LinkError::UndefinedFunction {
            name: "nope".to_string(),
            caller: 0,
            index: 1,
        });
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("SSM-K001"));
        assert!(d.message.contains("nope"));
    }

    #[test]
    fn from_undefined_entry() {
        let e = VmError::UndefinedFunction { name: "start".to_string() };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("SSM-R002"));
        assert!(d.suggestion.as_deref().is_some_and(|s| s.contains("start")));
    }
}
