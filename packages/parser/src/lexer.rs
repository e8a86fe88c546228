//! Lexer for the script parts of JSX/TSX files using logos
//!
//! Only the script side of a file is tokenized here. Markup text, template
//! literal bodies and regular expression literals depend on context and are
//! scanned by hand in the parser.

use logos::Logos;
use std::ops::Range;

/// Token types for JavaScript/TypeScript source
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum Token<'src> {
    #[regex(r"#?[A-Za-z_$\u{80}-\u{10FFFF}][A-Za-z0-9_$\u{80}-\u{10FFFF}]*", |lex| lex.slice())]
    Ident(&'src str),

    // Quotes are kept so callers can tell literal kinds apart
    #[regex(r#""([^"\\\n]|\\.|\\\n)*""#, |lex| lex.slice())]
    #[regex(r"'([^'\\\n]|\\.|\\\n)*'", |lex| lex.slice())]
    String(&'src str),

    #[regex(r"[0-9][0-9A-Za-z_]*(\.[0-9][0-9A-Za-z_]*)?", |lex| lex.slice())]
    #[regex(r"\.[0-9][0-9A-Za-z_]*", |lex| lex.slice())]
    Number(&'src str),

    #[token("`")]
    Backtick,

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?.")]
    OptionalChain,
    #[token("...")]
    Ellipsis,

    // Operators the parser cares about
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("=>")]
    Arrow,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    Nullish,
    #[token("/")]
    Slash,
    #[token("/=")]
    SlashAssign,
    #[token("++")]
    #[token("--")]
    Update,

    // Everything else that combines operands
    #[regex(r"===|!==|==|!=|<=|>=|<<=|>>>=|>>=|<<|>>>|>>|\*\*=|\*\*|\+=|-=|\*=|%=|&&=|\|\|=|\?\?=|&=|\|=|\^=|[+\-*%!~&|^@]", |lex| lex.slice())]
    Operator(&'src str),
}

impl<'src> Token<'src> {
    /// Whether this token closes a bracket pair
    pub fn is_closer(&self) -> bool {
        matches!(self, Token::RBrace | Token::RParen | Token::RBracket)
    }

    pub fn ident(&self) -> Option<&'src str> {
        match self {
            Token::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// A token with its absolute byte range in the source
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub range: Range<usize>,
}

/// Lex one token starting at `pos`, skipping leading ASCII whitespace and comments.
/// Callers run [`skip_trivia`] first to consume Unicode separators.
///
/// Returns `None` at end of input. An unrecognised character yields `Err`
/// with the range of that single character.
pub fn next_token(source: &str, pos: usize) -> Option<Result<SpannedToken<'_>, Range<usize>>> {
    let rest = source.get(pos..)?;
    let mut lexer = Token::lexer(rest);
    let result = lexer.next()?;
    let span = lexer.span();
    let range = pos + span.start..pos + span.end;

    Some(match result {
        Ok(token) => Ok(SpannedToken { token, range }),
        Err(()) => {
            // Advance over exactly one character
            let width = source[range.start..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
            Err(range.start..range.start + width)
        }
    })
}

/// Lex source code into tokens with absolute spans
pub fn lex(source: &str) -> impl Iterator<Item = Result<SpannedToken<'_>, Range<usize>>> + '_ {
    Token::lexer(source).spanned().map(|(result, span)| match result {
        Ok(token) => Ok(SpannedToken { token, range: span }),
        Err(()) => Err(span),
    })
}

/// Byte offset of the first non-trivia character at or after `pos`.
pub fn skip_trivia(source: &str, mut pos: usize) -> usize {
    let bytes = source.as_bytes();
    loop {
        match source.get(pos..).and_then(|rest| rest.chars().next()) {
            Some(c) if c.is_whitespace() || c == '\u{FEFF}' => pos += c.len_utf8(),
            Some('/') if bytes.get(pos + 1) == Some(&b'/') => {
                pos = source[pos..]
                    .find('\n')
                    .map(|offset| pos + offset)
                    .unwrap_or(source.len());
            }
            Some('/') if bytes.get(pos + 1) == Some(&b'*') => {
                pos = source[pos + 2..]
                    .find("*/")
                    .map(|offset| pos + 2 + offset + 2)
                    .unwrap_or(source.len());
            }
            _ => return pos,
        }
    }
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$' || (!c.is_ascii() && c.is_alphabetic())
}

pub fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || (!c.is_ascii() && c.is_alphanumeric())
}
