//! Tokenizer for `go.mod` files
//!
//! The manifest grammar is line oriented: a statement ends at a newline, so
//! newlines are real tokens here instead of being skipped like other whitespace.

use logos::Logos;
use thiserror::Error;

/// The kind of token produced by the lexer
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token("=>")]
    Arrow,

    /// Double-quoted string with backslash escapes
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Quoted,

    /// Back-quoted raw string, confined to one line
    #[regex(r"`[^`\n]*`")]
    Raw,

    /// `// ...` up to the end of the line
    #[regex(r"//[^\n]*")]
    Comment,

    /// Any run of printable, non-space, non-punctuation characters.
    ///
    /// This may swallow a trailing `//` comment; [`Lexer`] splits it off.
    #[regex(r#"[^ \t\r\n()\[\]{},"`]+"#)]
    Ident,

    #[token("\n")]
    Newline,
}

impl TokenKind {
    /// Returns true for tokens that can be used as a directive argument
    #[must_use]
    pub fn is_word(self) -> bool {
        matches!(self, Self::Ident | Self::Quoted | Self::Raw)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            Self::Comma => write!(f, "','"),
            Self::Arrow => write!(f, "'=>'"),
            Self::Quoted => write!(f, "quoted string"),
            Self::Raw => write!(f, "raw string"),
            Self::Comment => write!(f, "comment"),
            Self::Ident => write!(f, "identifier"),
            Self::Newline => write!(f, "newline"),
        }
    }
}

/// A token with its kind, source text and 1-based line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'source> {
    pub kind: TokenKind,
    pub text: &'source str,
    pub line: usize,
}

/// Lexer error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected input character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated quoted string")]
    UnterminatedString,
    #[error("mod files must use // comments, not /* */ comments")]
    BlockComment,
}

/// A lexer error with the line it occurred on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedError {
    pub error: LexError,
    pub line: usize,
}

/// The `go.mod` lexer
///
/// Each call re-enters logos at the current byte offset, which lets an
/// identifier be cut short where a `//` comment begins.
pub struct Lexer<'source> {
    source: &'source str,
    position: usize,
    line: usize,
}

impl<'source> Lexer<'source> {
    #[must_use]
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
        }
    }

    /// Tokenize the entire source, stopping at the first error
    pub fn tokenize(source: &'source str) -> Result<Vec<Token<'source>>, SpannedError> {
        Lexer::new(source).collect()
    }

    fn error(&self, error: LexError) -> SpannedError {
        SpannedError {
            error,
            line: self.line,
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Token<'source>, SpannedError>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = &self.source[self.position..];
        let mut logos_lexer = TokenKind::lexer(remaining);

        match logos_lexer.next()? {
            Ok(kind) => {
                let span = logos_lexer.span();
                let mut text = &remaining[span.clone()];

                if kind == TokenKind::Ident {
                    if let Some(idx) = text.find("//") {
                        text = &text[..idx];
                    }
                    if text.contains("/*") {
                        // Report the error once and stop.
                        self.position = self.source.len();
                        return Some(Err(self.error(LexError::BlockComment)));
                    }
                }

                self.position += span.start + text.len();
                let token = Token {
                    kind,
                    text,
                    line: self.line,
                };
                if kind == TokenKind::Newline {
                    self.line += 1;
                }
                Some(Ok(token))
            }
            Err(()) => {
                let start = logos_lexer.span().start;
                let c = remaining[start..].chars().next()?;
                self.position = self.source.len();
                let error = if c == '"' || c == '`' {
                    LexError::UnterminatedString
                } else {
                    LexError::UnexpectedChar(c)
                };
                Some(Err(self.error(error)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_require_line() {
        let tokens = Lexer::tokenize("require example.com/a v1.0.0 // indirect\n").unwrap();
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(
            texts,
            vec!["require", "example.com/a", "v1.0.0", "// indirect", "\n"]
        );
        assert_eq!(tokens[3].kind, TokenKind::Comment);
    }

    #[test]
    fn test_comment_glued_to_ident() {
        let tokens = Lexer::tokenize("module example.com/m// trailing").unwrap();
        assert_eq!(tokens[1].text, "example.com/m");
        assert_eq!(tokens[2].kind, TokenKind::Comment);
        assert_eq!(tokens[2].text, "// trailing");
    }

    #[test]
    fn test_block_punctuation() {
        assert_eq!(
            kinds("replace (\n a => ../b\n)\n"),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::RParen,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_retract_interval() {
        assert_eq!(
            kinds("retract [v1.0.0, v1.0.5]"),
            vec![
                TokenKind::Ident,
                TokenKind::LBracket,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn test_strings() {
        let tokens = Lexer::tokenize(r#"module "example.com/q" `raw`"#).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Quoted);
        assert_eq!(tokens[2].kind, TokenKind::Raw);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = Lexer::tokenize("module a.com/m\n\ngo 1.21\n").unwrap();
        let go = tokens.iter().find(|t| t.text == "go").unwrap();
        assert_eq!(go.line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::tokenize("module \"example.com/m\n").unwrap_err();
        assert_eq!(err.error, LexError::UnterminatedString);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_raw_string_cannot_span_lines() {
        let err = Lexer::tokenize("go 1.21\nmodule `example.com\n/m`\n").unwrap_err();
        assert_eq!(err.error, LexError::UnterminatedString);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_block_comment_rejected() {
        let err = Lexer::tokenize("go 1.21\nmodule a.com/m /* no */\n").unwrap_err();
        assert_eq!(err.error, LexError::BlockComment);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unexpected_char() {
        let err = Lexer::tokenize("module {").unwrap_err();
        assert_eq!(err.error, LexError::UnexpectedChar('{'));
    }
}
