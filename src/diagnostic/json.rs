use serde_json::{Value, json};

use crate::ast::SourceMap;
use super::{Diagnostic, Label, Severity, registry};

/// One diagnostic as a single JSON line. Codes carry their registry
/// summary; labels carry line, column and the source line when the
/// listing text is attached.
pub fn render(d: &Diagnostic) -> String {
    let mut obj = json!({
        "severity": match d.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        },
        "message": d.message,
        "labels": labels(d),
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = Value::from(code);
        if let Some(entry) = registry::lookup(code) {
            obj["summary"] = Value::from(entry.short);
        }
    }
    if let Some(s) = &d.suggestion {
        obj["suggestion"] = Value::from(s.as_str());
    }

    serde_json::to_string(&obj)
        .unwrap_or_else(|e| json!({ "severity": "error", "message": format!("cannot encode diagnostic: {e}") }).to_string())
}

fn labels(d: &Diagnostic) -> Vec<Value> {
    let located = d.source.as_deref().map(|source| (source, SourceMap::new(source)));
    d.labels
        .iter()
        .map(|label| {
            let mut obj = label_json(label);
            if let Some((source, map)) = &located {
                let snippet = map.snippet(source, label.span.start);
                obj["line"] = Value::from(snippet.line);
                obj["col"] = Value::from(snippet.col);
                obj["text"] = Value::from(snippet.text);
            }
            obj
        })
        .collect()
}

fn label_json(label: &Label) -> Value {
    json!({
        "start": label.span.start,
        "end": label.span.end,
        "message": label.message,
        "primary": label.is_primary,
    })
}
