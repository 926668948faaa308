//! Regex-based tokenizer.
//!
//! Rules are ordered by precedence. The lexer tries all of them and picks the one producing
//! the longest match; on a tie, the earliest rule wins, so keywords beat identifiers.

use std::fmt::{self, Display, Formatter};

use lazy_static::lazy_static;
use regex::Regex;

use crate::params::parse_int;
use crate::source::InputSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    KwBreak,
    KwConfig,
    KwContinue,
    KwElse,
    KwFn,
    KwFor,
    KwIf,
    KwLet,
    KwOffsetof,
    KwReturn,
    KwSizeof,
    KwUnroll,
    KwWhile,

    Ident(String),
    /// Map name including the `@`. Anonymous maps are just `@`.
    Map(String),
    /// Variable name including the `$`.
    Var(String),
    Param(usize),
    ParamCount,
    Int(i64),
    Str(String),

    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Arrow,
    Question,

    Assign,
    /// Compound assignment such as `+=`, carrying the operator text without `=`.
    CompoundAssign(&'static str),

    EqEq,
    NotEq,
    LessEq,
    GreaterEq,
    ShiftLeft,
    ShiftRight,
    Less,
    Greater,
    AndAnd,
    OrOr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Bang,
    Tilde,
    PlusPlus,
    MinusMinus,

    Error(String),
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{}`", name),
            TokenKind::Map(name) => write!(f, "map `{}`", name),
            TokenKind::Var(name) => write!(f, "variable `{}`", name),
            TokenKind::Param(index) => write!(f, "`${}`", index),
            TokenKind::ParamCount => write!(f, "`$#`"),
            TokenKind::Int(value) => write!(f, "integer `{}`", value),
            TokenKind::Str(_) => write!(f, "string literal"),
            TokenKind::CompoundAssign(op) => write!(f, "`{}=`", op),
            TokenKind::Error(text) => write!(f, "`{}`", text),
            other => write!(f, "`{}`", other.text()),
        }
    }
}

impl TokenKind {
    /// Source text of fixed tokens.
    fn text(&self) -> &'static str {
        match self {
            TokenKind::KwBreak => "break",
            TokenKind::KwConfig => "config",
            TokenKind::KwContinue => "continue",
            TokenKind::KwElse => "else",
            TokenKind::KwFn => "fn",
            TokenKind::KwFor => "for",
            TokenKind::KwIf => "if",
            TokenKind::KwLet => "let",
            TokenKind::KwOffsetof => "offsetof",
            TokenKind::KwReturn => "return",
            TokenKind::KwSizeof => "sizeof",
            TokenKind::KwUnroll => "unroll",
            TokenKind::KwWhile => "while",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::Question => "?",
            TokenKind::Assign => "=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::ShiftLeft => "<<",
            TokenKind::ShiftRight => ">>",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            _ => "",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub span: InputSpan,
    pub kind: TokenKind,
}

type Handler = Box<dyn Sync + Fn(&str) -> TokenKind>;

fn fixed(pattern: &str, kind: TokenKind) -> (Regex, Handler) {
    (
        Regex::new(&format!("^(?:{})", pattern)).unwrap(),
        Box::new(move |_| kind.clone()),
    )
}

fn keyword(word: &str, kind: TokenKind) -> (Regex, Handler) {
    fixed(&format!(r"{}\b", word), kind)
}

fn rule(pattern: &str, handler: impl Sync + Fn(&str) -> TokenKind + 'static) -> (Regex, Handler) {
    (
        Regex::new(&format!("^(?:{})", pattern)).unwrap(),
        Box::new(handler),
    )
}

fn rules() -> Vec<(Regex, Handler)> {
    use TokenKind::*;

    let compound = |op: &'static str| {
        fixed(&format!("{}=", regex::escape(op)), CompoundAssign(op))
    };

    vec![
        keyword("break", KwBreak),
        keyword("config", KwConfig),
        keyword("continue", KwContinue),
        keyword("else", KwElse),
        keyword("fn", KwFn),
        keyword("for", KwFor),
        keyword("if", KwIf),
        keyword("let", KwLet),
        keyword("offsetof", KwOffsetof),
        keyword("return", KwReturn),
        keyword("sizeof", KwSizeof),
        keyword("unroll", KwUnroll),
        keyword("while", KwWhile),
        rule(r"[A-Za-z_][A-Za-z0-9_]*", |text| Ident(text.to_string())),
        rule(r"@[A-Za-z0-9_]*", |text| Map(text.to_string())),
        rule(r"\$[A-Za-z_][A-Za-z0-9_]*", |text| Var(text.to_string())),
        rule(r"\$[0-9]+", |text| match text[1..].parse() {
            Ok(index) => Param(index),
            Err(_) => Error(text.to_string()),
        }),
        fixed(r"\$#", ParamCount),
        rule(r"0[xX][0-9a-fA-F]+|[0-9]+", |text| match parse_int(text) {
            Some(value) => Int(value),
            None => Error(text.to_string()),
        }),
        rule(r#""(?:[^"\\\n]|\\.)*""#, |text| {
            match unescape(&text[1..text.len() - 1]) {
                Some(value) => Str(value),
                None => Error(text.to_string()),
            }
        }),
        fixed(r"\(", LeftParen),
        fixed(r"\)", RightParen),
        fixed(r"\{", LeftBrace),
        fixed(r"\}", RightBrace),
        fixed(r"\[", LeftBracket),
        fixed(r"\]", RightBracket),
        fixed(",", Comma),
        fixed(";", Semicolon),
        fixed(":", Colon),
        fixed(r"\.", Dot),
        fixed("->", Arrow),
        fixed(r"\?", Question),
        fixed("=", Assign),
        compound("<<"),
        compound(">>"),
        compound("+"),
        compound("-"),
        compound("*"),
        compound("/"),
        compound("%"),
        compound("&"),
        compound("|"),
        compound("^"),
        fixed("==", EqEq),
        fixed("!=", NotEq),
        fixed("<=", LessEq),
        fixed(">=", GreaterEq),
        fixed("<<", ShiftLeft),
        fixed(">>", ShiftRight),
        fixed("<", Less),
        fixed(">", Greater),
        fixed("&&", AndAnd),
        fixed(r"\|\|", OrOr),
        fixed(r"\+\+", PlusPlus),
        fixed("--", MinusMinus),
        fixed(r"\+", Plus),
        fixed("-", Minus),
        fixed(r"\*", Star),
        fixed("/", Slash),
        fixed("%", Percent),
        fixed("&", Amp),
        fixed(r"\|", Pipe),
        fixed(r"\^", Caret),
        fixed("!", Bang),
        fixed("~", Tilde),
    ]
}

lazy_static! {
    static ref RULES: Vec<(Regex, Handler)> = {
        // `max_by_key` returns the last of equally long matches. Reversing the rules keeps
        // "first longest match" semantics.
        let mut rules = rules();
        rules.reverse();
        rules
    };

    /// Whitespace, `//` line comments and `/* */` block comments.
    static ref IGNORED_RE: Regex = Regex::new(r"^(?:\s|//[^\n]*|(?s:/\*.*?\*/))*").unwrap();

    // Note that this regex is not bound to start of string.
    static ref FALLBACK_RE: Regex = Regex::new(r"(\w+|\S)").unwrap();

    /// Raw text of an attach point.
    static ref ATTACH_POINT_RE: Regex = Regex::new(r"^[^\s,{]+").unwrap();
}

/// Resolves escape sequences of a string literal. Returns `None` for unknown escapes.
fn unescape(text: &str) -> Option<String> {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            _ => return None,
        };
        result.push(escaped);
    }
    Some(result)
}

/// Position in the source being tokenized. Copies are cheap, which the parser relies on
/// for lookahead.
#[derive(Clone, Copy)]
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer { source, offset: 0 }
    }

    /// Offset of the next character to be read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    fn skip_ignored(&mut self) {
        if let Some(match_) = IGNORED_RE.find(&self.source[self.offset..]) {
            self.offset += match_.end();
        }
    }

    /// Span of the end of input.
    pub fn eof_span(&self) -> InputSpan {
        InputSpan::new(self.source.len(), self.source.len())
    }

    /// Reads the next token, or returns `None` at the end of input.
    pub fn next(&mut self) -> Option<Token> {
        self.skip_ignored();
        let input = &self.source[self.offset..];
        if input.is_empty() {
            return None;
        }

        let start = self.offset;
        let longest = RULES
            .iter()
            .filter_map(|(re, handler)| re.find(input).map(|match_| (match_.end(), handler)))
            .max_by_key(|(length, _)| *length);
        let (length, kind) = match longest {
            Some((length, handler)) if length > 0 => (length, handler(&input[..length])),
            _ => {
                let length = FALLBACK_RE.find(input).map_or(1, |match_| match_.end());
                (length, TokenKind::Error(input[..length].to_string()))
            }
        };
        self.offset += length;
        Some(Token {
            span: InputSpan::new(start, start + length),
            kind,
        })
    }

    /// The next token, without consuming it.
    pub fn peek(&self) -> Option<Token> {
        let mut lexer = *self;
        lexer.next()
    }

    /// Whether only whitespace and comments remain.
    pub fn at_eof(&self) -> bool {
        let mut lexer = *self;
        lexer.skip_ignored();
        lexer.offset == self.source.len()
    }

    /// Reads the raw text of an attach point. Attach points end at whitespace, `,` or `{`.
    pub fn attach_point(&mut self) -> Option<(String, InputSpan)> {
        self.skip_ignored();
        let match_ = ATTACH_POINT_RE.find(&self.source[self.offset..])?;
        let start = self.offset;
        self.offset += match_.end();
        Some((
            match_.as_str().to_string(),
            InputSpan::new(start, self.offset),
        ))
    }

    /// Whether the next non-ignored character is `c`.
    pub fn next_char_is(&self, c: char) -> bool {
        let mut lexer = *self;
        lexer.skip_ignored();
        lexer.source[lexer.offset..].starts_with(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        while let Some(token) = lexer.next() {
            kinds.push(token.kind);
        }
        kinds
    }

    #[test]
    fn prefers_longest_match() {
        assert_eq!(
            kinds("iffy if <<= << <= ++ + -> --"),
            vec![
                Ident("iffy".to_string()),
                KwIf,
                CompoundAssign("<<"),
                ShiftLeft,
                LessEq,
                PlusPlus,
                Plus,
                Arrow,
                MinusMinus,
            ]
        );
    }

    #[test]
    fn reads_sigils() {
        assert_eq!(
            kinds("@ @map $x $12 $#"),
            vec![
                Map("@".to_string()),
                Map("@map".to_string()),
                Var("$x".to_string()),
                Param(12),
                ParamCount,
            ]
        );
    }

    #[test]
    fn reads_literals() {
        assert_eq!(
            kinds(r#"42 0x1f "a\tb\"" 0xffffffffffffffff"#),
            vec![Int(42), Int(31), Str("a\tb\"".to_string()), Int(-1)]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("a // line\n /* block\n comment */ b"),
            vec![Ident("a".to_string()), Ident("b".to_string())]
        );
    }

    #[test]
    fn produces_error_tokens() {
        assert_eq!(
            kinds(r#"a # "\q""#),
            vec![
                Ident("a".to_string()),
                Error("#".to_string()),
                Error(r#""\q""#.to_string()),
            ]
        );
    }

    #[test]
    fn reads_attach_points_raw() {
        let mut lexer = Lexer::new("  uprobe:/bin/sh:main,kprobe:f* /pid/ {");
        assert_eq!(
            lexer.attach_point(),
            Some(("uprobe:/bin/sh:main".to_string(), InputSpan::new(2, 21)))
        );
        assert!(lexer.next_char_is(','));
        assert_eq!(lexer.next().map(|t| t.kind), Some(Comma));
        assert_eq!(lexer.attach_point().map(|(raw, _)| raw), Some("kprobe:f*".to_string()));
        assert_eq!(lexer.next().map(|t| t.kind), Some(Slash));
    }
}
