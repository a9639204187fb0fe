use crate::ast::*;
use crate::bytecode::{Instruction, OpCode};
use crate::lexer::Token;
use crate::value::Value;

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Parse error at token {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

type Result<T> = std::result::Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Span of the next token; at end of input, an empty span just past
    /// the last token.
    fn peek_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => *span,
            None => self
                .tokens
                .last()
                .map(|(_, s)| Span { start: s.end, end: s.end })
                .unwrap_or(Span::UNKNOWN),
        }
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, code: &'static str, message: String) -> ParseError {
        ParseError {
            code,
            position: self.pos,
            span: self.peek_span(),
            message,
            hint: None,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Newline))
    }

    fn expect_line_end(&mut self) -> Result<()> {
        match self.peek() {
            None | Some(Token::Newline) => Ok(()),
            Some(tok) => Err(self.error("SSM-P006", format!("expected end of line, got {}", describe(tok)))),
        }
    }

    /// Skip the rest of a broken line. The newline itself is left for the
    /// main loop.
    fn sync_to_line_end(&mut self) {
        while !self.at_line_end() {
            self.advance();
        }
    }

    // ---- Top-level parsing ----

    pub fn parse_listing(&mut self) -> (Listing, Vec<ParseError>) {
        let mut functions: Vec<FunctionDef> = Vec::new();
        let mut errors: Vec<ParseError> = Vec::new();
        const MAX_ERRORS: usize = 20;

        while !self.at_end() {
            if errors.len() >= MAX_ERRORS {
                break;
            }
            let result = match self.peek() {
                Some(Token::Newline) => {
                    self.advance();
                    continue;
                }
                Some(Token::Fn) => self.parse_header().map(|def| {
                    if functions.iter().any(|f| f.name == def.name) {
                        errors.push(ParseError {
                            code: "SSM-P008",
                            position: self.pos,
                            span: def.span,
                            message: format!("duplicate function '{}'", def.name),
                            hint: Some("each `fn` name may appear once per listing".into()),
                        });
                    }
                    functions.push(def);
                }),
                _ => {
                    let position = self.pos;
                    self.parse_instruction().and_then(|inst| match functions.last_mut() {
                        Some(def) => {
                            def.instructions.push(inst);
                            Ok(())
                        }
                        None => Err(ParseError {
                            code: "SSM-P007",
                            position,
                            span: inst.span,
                            message: format!("instruction '{}' outside of a function", inst.node),
                            hint: Some("start a function with `fn NAME` first".into()),
                        }),
                    })
                }
            };
            if let Err(e) = result {
                errors.push(e);
                self.sync_to_line_end();
            }
        }

        (Listing { functions, source: None }, errors)
    }

    /// `fn NAME`
    fn parse_header(&mut self) -> Result<FunctionDef> {
        let start = self.peek_span();
        self.advance();
        let name_span = self.peek_span();
        let name = match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.advance();
                name
            }
            Some(tok) => {
                return Err(self.error("SSM-P002", format!("expected function name after 'fn', got {}", describe(&tok))));
            }
            None => return Err(self.error("SSM-P002", "expected function name after 'fn', got end of input".into())),
        };
        self.expect_line_end()?;
        Ok(FunctionDef { name, span: start.merge(name_span), instructions: Vec::new() })
    }

    /// `MNEMONIC [OPERAND]`
    fn parse_instruction(&mut self) -> Result<Spanned<Instruction>> {
        let start = self.peek_span();
        let mnemonic = match self.peek().cloned() {
            Some(Token::Ident(m)) => m,
            Some(tok) => return Err(self.error("SSM-P001", format!("expected an instruction, got {}", describe(&tok)))),
            None => return Err(self.error("SSM-P001", "expected an instruction, got end of input".into())),
        };
        let Some(opcode) = OpCode::from_mnemonic(&mnemonic) else {
            let mut err = self.error("SSM-P003", format!("unknown instruction '{mnemonic}'"));
            err.hint = closest_mnemonic(&mnemonic).map(|m| format!("did you mean '{m}'?"));
            return Err(err);
        };
        self.advance();

        let operand_span = self.peek_span();
        let operand = match self.peek().cloned() {
            Some(Token::Number(n)) => Some(Value::Number(n)),
            Some(Token::Text(s)) | Some(Token::Ident(s)) => Some(Value::str(s)),
            _ => None,
        };

        match (operand, opcode.requires_immediate()) {
            (Some(value), true) => {
                self.advance();
                self.expect_line_end()?;
                Ok(Spanned::new(Instruction::with(opcode, value), start.merge(operand_span)))
            }
            (None, false) => {
                self.expect_line_end()?;
                Ok(Spanned::new(Instruction::new(opcode), start))
            }
            (None, true) => {
                let mut err = self.error("SSM-P004", format!("'{opcode}' needs an operand"));
                err.span = start;
                Err(err)
            }
            (Some(_), false) => {
                let mut err = self.error("SSM-P005", format!("'{opcode}' takes no operand"));
                err.hint = Some(format!("remove the operand after '{opcode}'"));
                Err(err)
            }
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Fn => "'fn'".into(),
        Token::Number(n) => format!("number {n}"),
        Token::Text(s) => format!("string \"{s}\""),
        Token::Ident(s) => format!("'{s}'"),
        Token::Newline => "end of line".into(),
        Token::Comment => "comment".into(),
    }
}

fn closest_mnemonic(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    let mut best: Option<(&'static str, usize)> = None;
    for op in OpCode::ALL {
        let candidate = op.mnemonic();
        let dist = levenshtein(&lower, candidate);
        if dist <= 2 && best.is_none_or(|(_, d)| dist < d) {
            best = Some((candidate, dist));
        }
    }
    best.map(|(s, _)| s)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut row = vec![i; b.len() + 1];
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        prev = row;
    }
    prev[b.len()]
}

/// Parse from token+span pairs.
/// Returns `(listing, errors)`. The listing holds everything that parsed,
/// duplicates included; check `errors.is_empty()` before registering it.
pub fn parse(tokens: Vec<(Token, Span)>) -> (Listing, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    parser.parse_listing()
}

/// Lex and parse in one go. A lex failure is reported as a single parse
/// error at the offending byte.
pub fn parse_source(source: &str) -> std::result::Result<Listing, Vec<ParseError>> {
    let tokens = crate::lexer::lex(source).map_err(|e| {
        vec![ParseError {
            code: "SSM-L001",
            position: 0,
            span: Span { start: e.position, end: e.position + e.snippet.len().max(1) },
            message: format!("unexpected token '{}'", e.snippet),
            hint: Some(e.suggestion),
        }]
    })?;
    let token_spans: Vec<(Token, Span)> = tokens
        .into_iter()
        .map(|(t, r)| (t, Span { start: r.start, end: r.end }))
        .collect();
    let (mut listing, errors) = parse(token_spans);
    if errors.is_empty() {
        listing.source = Some(source.to_string());
        Ok(listing)
    } else {
        Err(errors)
    }
}
