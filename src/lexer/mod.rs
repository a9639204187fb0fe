use logos::Logos;

/// Tokens of the listing format. Mnemonics, label names and function
/// names all lex as identifiers; the parser tells them apart by position.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r]+")]
pub enum Token {
    #[regex(r"--[^\n]*", logos::skip, allow_greedy = true)]
    Comment,

    #[token("fn")]
    Fn,

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f32>().ok())]
    Number(f32),

    #[regex(r#""[^"\n]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    Text(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Newlines terminate instructions
    #[token("\n")]
    Newline,
}

/// Lex a listing into tokens with byte ranges.
pub fn lex(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                let snippet = source[span.clone()].to_string();
                return Err(LexError {
                    position: span.start,
                    suggestion: suggest_fix(&snippet),
                    snippet,
                });
            }
        }
    }

    Ok(tokens)
}

fn suggest_fix(bad_token: &str) -> String {
    if bad_token.starts_with('"') {
        "Close the string on the same line: strings cannot span lines".to_string()
    } else if bad_token.starts_with(';') || bad_token.starts_with('#') {
        "Comments start with '--'".to_string()
    } else {
        format!("Unexpected character(s): '{}'", bad_token)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub snippet: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lex_function_header_and_body() {
        assert_eq!(
            kinds("fn main\n  pi 10\n  call end\n"),
            vec![
                Token::Fn,
                Token::Ident("main".into()),
                Token::Newline,
                Token::Ident("pi".into()),
                Token::Number(10.0),
                Token::Newline,
                Token::Ident("call".into()),
                Token::Ident("end".into()),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn lex_negative_and_fractional_numbers() {
        assert_eq!(kinds("pi -1"), vec![Token::Ident("pi".into()), Token::Number(-1.0)]);
        assert_eq!(kinds("pi 2.5"), vec![Token::Ident("pi".into()), Token::Number(2.5)]);
    }

    #[test]
    fn lex_string_literal() {
        assert_eq!(kinds(r#""hello world""#), vec![Token::Text("hello world".into())]);
    }

    #[test]
    fn lex_comment_ignored() {
        assert_eq!(kinds("-- a comment\nexit -- trailing"), vec![Token::Newline, Token::Ident("exit".into())]);
    }

    #[test]
    fn lex_comment_directly_after_identifier() {
        assert_eq!(kinds("exit--done"), vec![Token::Ident("exit".into())]);
        assert_eq!(
            kinds("jump top--back\n"),
            vec![Token::Ident("jump".into()), Token::Ident("top".into()), Token::Newline]
        );
    }

    #[test]
    fn lex_fn_prefix_is_an_identifier() {
        assert_eq!(kinds("fnord"), vec![Token::Ident("fnord".into())]);
    }

    #[test]
    fn lex_error_has_position() {
        let err = lex("pi 1\npi @").unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.snippet, "@");
    }

    #[test]
    fn lex_unterminated_string() {
        let err = lex("pi \"open\nexit").unwrap_err();
        assert!(err.suggestion.contains("same line"), "{}", err.suggestion);
    }
}
