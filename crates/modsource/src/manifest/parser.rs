//! Parser for `go.mod` files
//!
//! Turns the token stream from [`super::lexer`] into a [`ModFile`]. The file is
//! a sequence of statements, one per line, where a statement is either
//! `verb args...` or a block:
//!
//! ```text
//! require (
//!     example.com/a v1.0.0
//!     example.com/b v1.2.0 // indirect
//! )
//! ```

use super::lexer::{LexError, Lexer, Token, TokenKind};
use super::{Godebug, ModFile, Module, ModuleVersion, Replace, Require, Retract};
use crate::escape::split_path_version;
use crate::version;
use std::collections::HashSet;
use thiserror::Error;

/// A parse error with the file label and line it occurred on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{label}:{line}: {kind}")]
pub struct ParseError {
    /// The label the caller passed to [`parse`], usually the file path
    pub label: String,
    /// 1-based line number
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// The kind of parse error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("invalid UTF-8")]
    InvalidUtf8,

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("unexpected {0}")]
    UnexpectedToken(TokenKind),

    #[error("unknown directive: {0}")]
    UnknownDirective(String),

    #[error("{0} directive cannot be used as a block")]
    NotABlock(String),

    #[error("unterminated {0} block")]
    UnterminatedBlock(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("repeated {0} statement")]
    Repeated(&'static str),

    #[error("invalid quoted string: {0}")]
    InvalidQuoted(String),

    #[error("invalid go version '{0}': must match format 1.23.0")]
    InvalidGoVersion(String),

    #[error("invalid toolchain version '{0}': must match format go1.23.0 or default")]
    InvalidToolchain(String),

    #[error("invalid key=value syntax '{0}'")]
    InvalidGodebug(String),

    #[error("{path}: invalid module path")]
    InvalidModulePath { path: String },

    #[error("{path}@{version}: invalid version: {reason}")]
    InvalidVersion {
        path: String,
        version: String,
        reason: String,
    },

    #[error("{0}: require listed more than once")]
    DuplicateRequire(String),

    #[error("{0}")]
    Replace(String),
}

/// One logical line: its argument tokens plus any attached comments.
#[derive(Debug, Default)]
struct Line<'a> {
    number: usize,
    tokens: Vec<Token<'a>>,
    /// Comment at the end of the line.
    suffix: Option<&'a str>,
    /// Comment lines directly above, without a blank line in between.
    before: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn comments(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.before.iter().copied().chain(self.suffix)
    }
}

/// Split the token stream into physical lines.
fn split_lines<'a>(tokens: Vec<Token<'a>>) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    let mut current = Line {
        number: 1,
        ..Line::default()
    };

    for token in tokens {
        match token.kind {
            TokenKind::Newline => {
                let next = Line {
                    number: token.line + 1,
                    ..Line::default()
                };
                lines.push(std::mem::replace(&mut current, next));
            }
            TokenKind::Comment => current.suffix = Some(token.text),
            _ => current.tokens.push(token),
        }
    }
    lines.push(current);

    // Attach stand-alone comment lines to the statement that follows them.
    let mut merged = Vec::with_capacity(lines.len());
    let mut pending = Vec::new();
    for line in lines {
        if line.tokens.is_empty() {
            match line.suffix {
                Some(comment) => pending.push(comment),
                None => pending.clear(),
            }
            continue;
        }
        merged.push(Line {
            before: std::mem::take(&mut pending),
            ..line
        });
    }
    merged
}

/// Directives that may be written in block form.
const BLOCK_VERBS: &[&str] = &[
    "require", "exclude", "replace", "retract", "godebug", "tool", "ignore",
];

struct Parser<'a> {
    label: &'a str,
    file: ModFile,
    required: HashSet<String>,
}

/// Parse `go.mod` content. `label` is used in error messages only.
///
/// ```
/// let file = modsource::manifest::parse("go.mod", b"module example.com/m\n\nrequire example.com/dep v1.2.0\n").unwrap();
/// assert_eq!(file.module_path(), Some("example.com/m"));
/// assert_eq!(file.require[0].version, "v1.2.0");
/// ```
pub fn parse(label: &str, data: &[u8]) -> Result<ModFile, ParseError> {
    let source = std::str::from_utf8(data).map_err(|_| ParseError {
        label: label.to_string(),
        line: 1,
        kind: ParseErrorKind::InvalidUtf8,
    })?;

    let tokens = Lexer::tokenize(source).map_err(|e| ParseError {
        label: label.to_string(),
        line: e.line,
        kind: e.error.into(),
    })?;

    let mut parser = Parser {
        label,
        file: ModFile::default(),
        required: HashSet::new(),
    };
    parser.parse_lines(split_lines(tokens))?;
    Ok(parser.file)
}

impl<'a> Parser<'a> {
    fn error(&self, line: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            label: self.label.to_string(),
            line,
            kind,
        }
    }

    fn parse_lines(&mut self, lines: Vec<Line<'_>>) -> Result<(), ParseError> {
        let mut lines = lines.into_iter();

        while let Some(line) = lines.next() {
            let verb = match line.tokens[0] {
                Token {
                    kind: TokenKind::Ident,
                    text,
                    ..
                } => text,
                Token { kind, .. } => {
                    return Err(self.error(line.number, ParseErrorKind::UnexpectedToken(kind)))
                }
            };

            let kinds: Vec<TokenKind> = line.tokens.iter().map(|t| t.kind).collect();
            match kinds.as_slice() {
                [TokenKind::Ident, TokenKind::LParen, TokenKind::RParen] => {
                    self.check_block_verb(verb, line.number)?;
                }
                [TokenKind::Ident, TokenKind::LParen] => {
                    self.check_block_verb(verb, line.number)?;
                    let start = line.number;
                    let mut closed = false;
                    for entry in lines.by_ref() {
                        if entry.tokens.len() == 1 && entry.tokens[0].kind == TokenKind::RParen {
                            closed = true;
                            break;
                        }
                        self.directive(verb, &entry.tokens, &entry)?;
                    }
                    if !closed {
                        return Err(
                            self.error(start, ParseErrorKind::UnterminatedBlock(verb.to_string()))
                        );
                    }
                }
                _ => self.directive(verb, &line.tokens[1..], &line)?,
            }
        }
        Ok(())
    }

    fn check_block_verb(&self, verb: &str, line: usize) -> Result<(), ParseError> {
        if BLOCK_VERBS.contains(&verb) {
            Ok(())
        } else if is_known_verb(verb) {
            Err(self.error(line, ParseErrorKind::NotABlock(verb.to_string())))
        } else {
            Err(self.error(line, ParseErrorKind::UnknownDirective(verb.to_string())))
        }
    }

    /// Convert argument tokens into strings, rejecting punctuation.
    fn words(&self, args: &[Token<'_>], line: usize) -> Result<Vec<String>, ParseError> {
        args.iter()
            .map(|t| self.word(t, line))
            .collect::<Result<Vec<_>, _>>()
    }

    fn word(&self, token: &Token<'_>, line: usize) -> Result<String, ParseError> {
        match token.kind {
            TokenKind::Ident => Ok(token.text.to_string()),
            TokenKind::Raw => Ok(token.text[1..token.text.len() - 1].to_string()),
            TokenKind::Quoted => unquote(token.text)
                .ok_or_else(|| self.error(line, ParseErrorKind::InvalidQuoted(token.text.into()))),
            kind => Err(self.error(line, ParseErrorKind::UnexpectedToken(kind))),
        }
    }

    fn directive(&mut self, verb: &str, args: &[Token<'_>], line: &Line<'_>) -> Result<(), ParseError> {
        let n = line.number;
        match verb {
            "module" => {
                let args = self.words(args, n)?;
                if self.file.module.is_some() {
                    return Err(self.error(n, ParseErrorKind::Repeated("module")));
                }
                let [path] = args.as_slice() else {
                    return Err(self.error(n, ParseErrorKind::Usage("module module/path")));
                };
                self.file.module = Some(Module {
                    path: path.clone(),
                    deprecated: deprecation(line.comments()),
                });
            }
            "go" => {
                let args = self.words(args, n)?;
                if self.file.go.is_some() {
                    return Err(self.error(n, ParseErrorKind::Repeated("go")));
                }
                let [v] = args.as_slice() else {
                    return Err(self.error(n, ParseErrorKind::Usage("go 1.23")));
                };
                if !version::is_go_version(v) {
                    return Err(self.error(n, ParseErrorKind::InvalidGoVersion(v.clone())));
                }
                self.file.go = Some(v.clone());
            }
            "toolchain" => {
                let args = self.words(args, n)?;
                if self.file.toolchain.is_some() {
                    return Err(self.error(n, ParseErrorKind::Repeated("toolchain")));
                }
                let [name] = args.as_slice() else {
                    return Err(self.error(n, ParseErrorKind::Usage("toolchain go1.23.0")));
                };
                if !version::is_toolchain(name) {
                    return Err(self.error(n, ParseErrorKind::InvalidToolchain(name.clone())));
                }
                self.file.toolchain = Some(name.clone());
            }
            "require" | "exclude" => {
                let args = self.words(args, n)?;
                let [path, v] = args.as_slice() else {
                    return Err(self.error(n, ParseErrorKind::Usage("require module/path v1.2.3")));
                };
                let v = self.module_version(path, v, n)?;
                if verb == "require" {
                    if !self.required.insert(path.clone()) {
                        return Err(self.error(n, ParseErrorKind::DuplicateRequire(path.clone())));
                    }
                    self.file.require.push(Require {
                        path: path.clone(),
                        version: v,
                        indirect: is_indirect(line.suffix),
                    });
                } else {
                    self.file.exclude.push(ModuleVersion {
                        path: path.clone(),
                        version: Some(v),
                    });
                }
            }
            "replace" => {
                let replace = self.replace(args, n)?;
                self.file.replace.push(replace);
            }
            "retract" => {
                let retract = self.retract(args, line)?;
                self.file.retract.push(retract);
            }
            "godebug" => {
                let args = self.words(args, n)?;
                let [pair] = args.as_slice() else {
                    return Err(self.error(n, ParseErrorKind::Usage("godebug key=value")));
                };
                match pair.split_once('=') {
                    Some((key, value)) if !key.is_empty() && !pair.contains(['"', '`', '\'', ',']) => {
                        self.file.godebug.push(Godebug {
                            key: key.to_string(),
                            value: value.to_string(),
                        });
                    }
                    _ => return Err(self.error(n, ParseErrorKind::InvalidGodebug(pair.clone()))),
                }
            }
            "tool" | "ignore" => {
                let args = self.words(args, n)?;
                let [path] = args.as_slice() else {
                    return Err(self.error(n, ParseErrorKind::Usage("tool|ignore path")));
                };
                if verb == "tool" {
                    self.file.tool.push(path.clone());
                } else {
                    self.file.ignore.push(path.clone());
                }
            }
            _ => return Err(self.error(n, ParseErrorKind::UnknownDirective(verb.to_string()))),
        }
        Ok(())
    }

    /// Canonicalize `v` and check it agrees with the major version in `path`.
    fn module_version(&self, path: &str, v: &str, line: usize) -> Result<String, ParseError> {
        let invalid = |reason: String| {
            self.error(
                line,
                ParseErrorKind::InvalidVersion {
                    path: path.to_string(),
                    version: v.to_string(),
                    reason,
                },
            )
        };

        let Some(canonical) = version::canonical_version(v) else {
            return Err(invalid("must be of the form v1.2.3".to_string()));
        };
        let Some((_, path_major)) = split_path_version(path) else {
            return Err(self.error(
                line,
                ParseErrorKind::InvalidModulePath {
                    path: path.to_string(),
                },
            ));
        };
        check_path_major(&canonical, path_major).map_err(invalid)?;
        Ok(canonical)
    }

    fn replace(&self, args: &[Token<'_>], n: usize) -> Result<Replace, ParseError> {
        const USAGE: &str = "replace module/path [v1.2.3] => other/module v1.4\n\t or replace module/path [v1.2.3] => ../local/directory";

        let arrow = args.iter().position(|t| t.kind == TokenKind::Arrow);
        let (left, right) = match arrow {
            Some(i) if (1..=2).contains(&i) && (1..=2).contains(&(args.len() - i - 1)) => {
                (&args[..i], &args[i + 1..])
            }
            _ => return Err(self.error(n, ParseErrorKind::Usage(USAGE))),
        };
        let left = self.words(left, n)?;
        let right = self.words(right, n)?;

        let old_path = left[0].clone();
        if split_path_version(&old_path).is_none() {
            return Err(self.error(n, ParseErrorKind::InvalidModulePath { path: old_path }));
        }
        let old_version = match left.get(1) {
            Some(v) => Some(self.module_version(&old_path, v, n)?),
            None => None,
        };

        let new_path = right[0].clone();
        let new_version = match right.get(1) {
            None => {
                if !is_directory_path(&new_path) {
                    let message = if new_path.contains('@') {
                        "replacement module must match format 'path version', not 'path@version'"
                    } else {
                        "replacement module without version must be directory path (rooted or starting with . or ..)"
                    };
                    return Err(self.error(n, ParseErrorKind::Replace(message.to_string())));
                }
                None
            }
            Some(v) => {
                if is_directory_path(&new_path) {
                    return Err(self.error(
                        n,
                        ParseErrorKind::Replace(format!(
                            "replacement module directory path {new_path:?} cannot have version"
                        )),
                    ));
                }
                Some(self.module_version(&new_path, v, n)?)
            }
        };

        Ok(Replace {
            old: ModuleVersion {
                path: old_path,
                version: old_version,
            },
            new: ModuleVersion {
                path: new_path,
                version: new_version,
            },
        })
    }

    fn retract(&self, args: &[Token<'_>], line: &Line<'_>) -> Result<Retract, ParseError> {
        const USAGE: &str = "retract v1.0.0 | retract [v1.0.0, v1.9.9]";
        let n = line.number;

        let canonical = |token: &Token<'_>| -> Result<String, ParseError> {
            let v = self.word(token, n)?;
            version::canonical_version(&v).ok_or_else(|| {
                self.error(
                    n,
                    ParseErrorKind::InvalidVersion {
                        path: "retract".to_string(),
                        version: v.clone(),
                        reason: "must be of the form v1.2.3".to_string(),
                    },
                )
            })
        };

        let kinds: Vec<TokenKind> = args.iter().map(|t| t.kind).collect();
        let (low, high) = match kinds.as_slice() {
            [k] if k.is_word() => {
                let v = canonical(&args[0])?;
                (v.clone(), v)
            }
            [TokenKind::LBracket, a, TokenKind::Comma, b, TokenKind::RBracket]
                if a.is_word() && b.is_word() =>
            {
                (canonical(&args[1])?, canonical(&args[3])?)
            }
            _ => return Err(self.error(n, ParseErrorKind::Usage(USAGE))),
        };

        let rationale = line
            .comments()
            .map(strip_comment)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Retract {
            low,
            high,
            rationale,
        })
    }
}

fn is_known_verb(verb: &str) -> bool {
    matches!(verb, "module" | "go" | "toolchain") || BLOCK_VERBS.contains(&verb)
}

/// Enforce that a version's major number matches the path's major suffix.
fn check_path_major(v: &str, path_major: &str) -> Result<(), String> {
    let path_major = if path_major.starts_with(".v") {
        path_major.strip_suffix("-unstable").unwrap_or(path_major)
    } else {
        path_major
    };
    if version::is_zero_pseudo(v) && path_major == ".v1" {
        return Ok(());
    }

    let major = version::major(v).unwrap_or(0);
    if path_major.is_empty() {
        if major <= 1 || version::is_incompatible(v) {
            return Ok(());
        }
        return Err(format!("should be v0 or v1, not v{major}"));
    }

    let expected = &path_major[1..];
    if expected == format!("v{major}") {
        return Ok(());
    }
    Err(format!("should be {expected}, not v{major}"))
}

/// Directory replacement targets, in either Unix or Windows syntax.
pub fn is_directory_path(ns: &str) -> bool {
    let bytes = ns.as_bytes();
    ns == "."
        || ns.starts_with("./")
        || ns.starts_with(".\\")
        || ns == ".."
        || ns.starts_with("../")
        || ns.starts_with("..\\")
        || ns.starts_with('/')
        || ns.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

fn strip_comment(comment: &str) -> &str {
    comment.trim_start_matches("//").trim()
}

fn is_indirect(suffix: Option<&str>) -> bool {
    suffix.is_some_and(|c| {
        let text = strip_comment(c);
        text == "indirect" || text.starts_with("indirect;")
    })
}

/// Extract the message of a `// Deprecated:` comment.
fn deprecation<'a>(comments: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut message = None::<String>;
    for comment in comments {
        let text = strip_comment(comment);
        if let Some(rest) = text.strip_prefix("Deprecated:") {
            message = Some(rest.trim().to_string());
        } else if let Some(m) = message.as_mut() {
            if text.is_empty() {
                break;
            }
            m.push(' ');
            m.push_str(text);
        }
    }
    message
}

/// Decode a double-quoted string literal.
fn unquote(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            _ => return None,
        };
        out.push(escaped);
    }
    Some(out)
}
