use crate::ast::{SourceMap, Snippet};
use super::{Diagnostic, Severity};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[SSM-E001]: message"
        let severity = match d.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let heading = match d.code {
            Some(code) => format!("{severity}[{code}]"),
            None => severity.to_string(),
        };
        let heading = match d.severity {
            Severity::Error => self.bold_red(&heading),
            Severity::Warning => self.bold(&self.cyan(&heading)),
        };
        out.push_str(&format!("{}: {}\n", heading, self.bold(&d.message)));

        // Render primary label with source snippet
        let primary = d.labels.iter().find(|l| l.is_primary);
        if let (Some(label), Some(source)) = (primary, &d.source) {
            let Snippet { line, col, text: line_text } = SourceMap::new(source).snippet(source, label.span.start);

            // "  --> line:col"
            out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), line, col));

            // Gutter width based on line number digits
            let gutter = line.to_string().len();
            let pipe = self.cyan("|");
            let pad = " ".repeat(gutter);

            // Empty gutter line
            out.push_str(&format!("{pad} {pipe}\n"));

            // Source line
            let line_num = self.cyan(&format!("{line:>gutter$}"));
            out.push_str(&format!("{line_num} {pipe} {line_text}\n"));

            // Caret line
            let span_start_in_line = col.saturating_sub(1);
            // Carets stop at the end of the line
            let span_len = label.span.end.saturating_sub(label.span.start)
                .min(line_text.len().saturating_sub(span_start_in_line))
                .max(1);
            let carets = self.bold_red(&"^".repeat(span_len));
            let indent = " ".repeat(span_start_in_line);
            if label.message.is_empty() {
                out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
            } else {
                out.push_str(&format!("{pad} {pipe} {indent}{carets} {}\n",
                    self.bold_red(&label.message)));
            }

            // Empty gutter line after
            out.push_str(&format!("{pad} {pipe}\n"));
        }

        // Secondary labels (no source snippet, just mention span)
        for label in d.labels.iter().filter(|l| !l.is_primary) {
            if !label.message.is_empty() {
                out.push_str(&format!("  {} {}\n", self.dim("="), label.message));
            }
        }

        // Notes
        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }

        // Suggestion
        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    const LISTING: &str = "fn main\n  pi 1\n  pi \"a\"\n  add\n";

    fn make_diag(start: usize, end: usize) -> Diagnostic {
        Diagnostic::error("add: operand type mismatch (number and string)")
            .with_code("SSM-E001")
            .with_span(Span { start, end }, "here")
            .with_source(LISTING.to_string())
            .with_note("in function 'main' at instruction 2")
            .with_suggestion("convert both operands to the same type")
    }

    fn plain() -> AnsiRenderer {
        AnsiRenderer { use_color: false }
    }

    #[test]
    fn render_contains_code_and_message() {
        let out = plain().render(&make_diag(26, 29));
        assert!(out.starts_with("error[SSM-E001]: add: operand type mismatch"), "bad heading in:\n{out}");
    }

    #[test]
    fn render_without_code() {
        let out = plain().render(&Diagnostic::error("something bad"));
        assert!(out.contains("error: something bad"), "{out}");
        assert!(!out.contains("-->"));
    }

    #[test]
    fn render_warning_heading() {
        let out = plain().render(&Diagnostic::warning("1 value(s) left on the operand stack"));
        assert!(out.starts_with("warning: 1 value(s)"), "{out}");
    }

    #[test]
    fn render_points_at_line_and_column() {
        let out = plain().render(&make_diag(26, 29));
        assert!(out.contains("--> 4:3"), "missing location in:\n{out}");
        assert!(out.contains("4 |   add"), "missing source line in:\n{out}");
        assert!(out.contains("|   ^^^ here"), "missing carets in:\n{out}");
    }

    #[test]
    fn render_contains_note_and_suggestion() {
        let out = plain().render(&make_diag(26, 29));
        assert!(out.contains("note: in function 'main' at instruction 2"), "{out}");
        assert!(out.contains("suggestion: convert both operands"), "{out}");
    }

    #[test]
    fn render_secondary_label_message() {
        let d = Diagnostic::error("duplicate function 'f'")
            .with_span(Span { start: 0, end: 4 }, "here")
            .with_secondary_span(Span { start: 10, end: 14 }, "first defined here")
            .with_source("fn f\nexit\nfn f\n".to_string());
        let out = plain().render(&d);
        assert!(out.contains("= first defined here"), "{out}");
    }

    #[test]
    fn render_with_color_contains_ansi_codes() {
        let r = AnsiRenderer { use_color: true };
        let out = r.render(&make_diag(26, 29));
        assert!(out.contains("\x1b["), "expected ANSI codes when use_color=true");
    }

    #[test]
    fn render_without_color_no_ansi_codes() {
        let out = plain().render(&make_diag(26, 29));
        assert!(!out.contains("\x1b["), "unexpected ANSI codes when use_color=false");
    }

    #[test]
    fn carets_clipped_to_line() {
        let d = Diagnostic::error("duplicate function 'f'")
            .with_span(Span { start: 0, end: 40 }, "")
            .with_source("fn f\nexit\n".to_string());
        let out = plain().render(&d);
        assert!(out.contains("| ^^^^\n"), "{out}");
    }

    #[test]
    fn empty_span_gets_one_caret() {
        let d = Diagnostic::error("'sl' needs an operand")
            .with_span(Span { start: 7, end: 7 }, "")
            .with_source("fn main".to_string());
        let out = plain().render(&d);
        assert!(out.contains("^"), "{out}");
        assert!(!out.contains("^^"), "{out}");
    }
}
