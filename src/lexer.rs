//! Lexer from regex text to a token stream.

use crate::types::{syntax, Error, GroupName, GroupOrdinal};
use crate::unicode::{self, PropertyClass};
use core::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// A `\p{...}` / `\P{...}` class: sign, resolved class, and the name as
/// written (kept so the token formats back to its source form).
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub negated: bool,
    pub class: PropertyClass,
    pub name: String,
}

impl Property {
    fn new(negated: bool, class: PropertyClass, name: impl Into<String>) -> Property {
        Property {
            negated,
            class,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `.`
    AnyChar,
    /// `?`
    ZeroOne,
    /// `+`
    OneMore,
    /// `*`
    ZeroMore,
    /// Infix `|`; rewritten away by the parser's first pass.
    Alternate,
    /// Postfix n-ary alternation, produced by the parser's first pass.
    Alt(usize),
    /// Sequence brackets, produced by the parser's first pass.
    BeginSeq,
    EndSeq,
    BeginGroup(GroupName),
    EndGroup,
    BeginClass,
    /// Emitted right after `BeginClass` for `[^`.
    NegClass,
    EndClass,
    /// `-`
    RangeTo,
    /// `{n}` with n ≥ 2.
    Repeat(usize),
    Property(Property),
    /// A literal code point.
    Literal(u32),
}

/// State used to lex one pattern.
struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    /// Next numbered-group ordinal, 1-based, assigned on the opening paren.
    next_ordinal: GroupOrdinal,
    /// Open `[` seen without its `]` yet.
    in_class: bool,
    /// Open-paren count, to reject a stray `)`.
    group_depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Consume a character known to be next.
    fn consume(&mut self, c: char) -> char {
        let nc = self.input.next();
        debug_assert!(nc == Some(c), "char was not next");
        c
    }

    /// If the input begins with `c`, consume it and return true.
    fn try_consume(&mut self, c: char) -> bool {
        if self.input.peek() == Some(&c) {
            self.input.next();
            true
        } else {
            false
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn next(&mut self) -> Option<char> {
        self.input.next()
    }

    fn run(mut self) -> Result<Vec<Token>, Error> {
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.consume('.');
                    self.tokens.push(Token::AnyChar);
                }
                '?' => {
                    self.consume('?');
                    self.tokens.push(Token::ZeroOne);
                }
                '+' => {
                    self.consume('+');
                    self.tokens.push(Token::OneMore);
                }
                '*' => {
                    self.consume('*');
                    self.tokens.push(Token::ZeroMore);
                }
                '|' => {
                    self.consume('|');
                    self.tokens.push(Token::Alternate);
                }
                '(' => {
                    self.consume('(');
                    let name = self.lex_group_name()?;
                    self.group_depth += 1;
                    self.tokens.push(Token::BeginGroup(name));
                }
                ')' => {
                    self.consume(')');
                    if self.group_depth == 0 {
                        return syntax("unmatched )");
                    }
                    self.group_depth -= 1;
                    self.tokens.push(Token::EndGroup);
                }
                '[' => {
                    self.consume('[');
                    if self.in_class {
                        return syntax("nested character class");
                    }
                    self.in_class = true;
                    self.tokens.push(Token::BeginClass);
                    if self.try_consume('^') {
                        self.tokens.push(Token::NegClass);
                    }
                }
                ']' => {
                    self.consume(']');
                    if !self.in_class {
                        return syntax("unmatched ]");
                    }
                    self.in_class = false;
                    self.tokens.push(Token::EndClass);
                }
                '-' => {
                    self.consume('-');
                    self.tokens.push(Token::RangeTo);
                }
                '{' => {
                    self.consume('{');
                    let count = self.lex_repeat_count()?;
                    self.tokens.push(Token::Repeat(count));
                }
                '}' => {
                    return syntax("unmatched }");
                }
                '\\' => {
                    self.consume('\\');
                    let token = self.lex_escape()?;
                    self.tokens.push(token);
                }
                c => {
                    self.consume(c);
                    self.tokens.push(Token::Literal(c as u32));
                }
            }
        }
        if self.in_class {
            return syntax("unmatched [");
        }
        Ok(self.tokens)
    }

    /// After an opening paren: `?:` is a nocap group, `?<name>` a
    /// labelled one, anything else a numbered group.
    fn lex_group_name(&mut self) -> Result<GroupName, Error> {
        if !self.try_consume('?') {
            let ordinal = self.next_ordinal;
            self.next_ordinal += 1;
            return Ok(GroupName::Index(ordinal));
        }
        if self.try_consume(':') {
            return Ok(GroupName::NoCapture);
        }
        if !self.try_consume('<') {
            return syntax("expected `:` or `<` after `(?`");
        }
        let mut label = String::new();
        loop {
            match self.next() {
                None => return syntax("unterminated group name"),
                Some('>') => break,
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => label.push(c),
                Some(c) => return syntax(format!("bad character {:?} in group name", c)),
            }
        }
        if label.is_empty() {
            return syntax("unterminated group name");
        }
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        Ok(GroupName::Named(ordinal, label))
    }

    /// `{N}` with N ≥ 2. The opening brace is already consumed.
    fn lex_repeat_count(&mut self) -> Result<usize, Error> {
        let mut digits = 0usize;
        let mut count = 0usize;
        while let Some(c) = self.peek() {
            match c.to_digit(10) {
                Some(d) => {
                    self.consume(c);
                    digits += 1;
                    count = count.saturating_mul(10).saturating_add(d as usize);
                }
                None => break,
            }
        }
        if digits == 0 {
            return syntax("expected repeat count after {");
        }
        if !self.try_consume('}') {
            return syntax("unmatched {");
        }
        if count < 2 {
            return syntax(format!("repeat count {{{}}} must be at least 2", count));
        }
        Ok(count)
    }

    /// The character after a backslash.
    fn lex_escape(&mut self) -> Result<Token, Error> {
        let Some(c) = self.peek() else {
            return syntax("lone \\ at end of pattern");
        };
        if !c.is_alphabetic() {
            // Escapes any meta character, including `\\`.
            self.consume(c);
            return Ok(Token::Literal(c as u32));
        }
        match c {
            'a' => {
                self.consume('a');
                Ok(Token::Literal(0x07))
            }
            'b' => {
                self.consume('b');
                Ok(Token::Literal(0x08))
            }
            'e' => {
                self.consume('e');
                Ok(Token::Literal(0x1B))
            }
            'f' => {
                self.consume('f');
                Ok(Token::Literal(0x0C))
            }
            'n' => {
                self.consume('n');
                Ok(Token::Literal(0x0A))
            }
            'r' => {
                self.consume('r');
                Ok(Token::Literal(0x0D))
            }
            't' => {
                self.consume('t');
                Ok(Token::Literal(0x09))
            }
            'x' => {
                self.consume('x');
                Ok(Token::Literal(self.lex_hex(2)?))
            }
            'u' => {
                self.consume('u');
                Ok(Token::Literal(self.lex_hex(4)?))
            }
            'p' | 'P' => {
                self.consume(c);
                self.lex_property(c == 'P')
            }
            'd' | 'D' => {
                self.consume(c);
                Ok(self.shortcut_property(c == 'D', "Nd"))
            }
            'w' | 'W' => {
                self.consume(c);
                Ok(self.shortcut_property(c == 'W', "Xwd"))
            }
            c => syntax(format!("unknown escape \\{}", c)),
        }
    }

    /// Exactly `digits` hex digits; any other length is an error.
    fn lex_hex(&mut self, digits: u32) -> Result<u32, Error> {
        let mut value = 0u32;
        for _ in 0..digits {
            let digit = self.next().and_then(|c| c.to_digit(16));
            match digit {
                Some(d) => value = value * 16 + d,
                None => return syntax(format!("expected {} hex digits", digits)),
            }
        }
        Ok(value)
    }

    /// `{name}` after `\p` or `\P`.
    fn lex_property(&mut self, negated: bool) -> Result<Token, Error> {
        if !self.try_consume('{') {
            return syntax("expected { after \\p");
        }
        let mut name = String::new();
        loop {
            match self.next() {
                None => return syntax("unterminated property name"),
                Some('}') => break,
                Some(c) => name.push(c),
            }
        }
        if name.is_empty() {
            return syntax("empty property name");
        }
        match unicode::resolve(&name) {
            Some(class) => Ok(Token::Property(Property::new(negated, class, name))),
            None => syntax(format!("unknown property {:?}", name)),
        }
    }

    fn shortcut_property(&mut self, negated: bool, name: &str) -> Token {
        let class = unicode::resolve(name);
        debug_assert!(class.is_some(), "shortcut table entry must resolve");
        match class {
            Some(class) => Token::Property(Property::new(negated, class, name)),
            // Unreachable: shortcut names are in the category/extension tables.
            None => Token::Literal('?' as u32),
        }
    }
}

/// Lex a pattern into tokens.
pub fn lex(pattern: &str) -> Result<Vec<Token>, Error> {
    let lexer = Lexer {
        input: pattern.chars().peekable(),
        next_ordinal: 1,
        in_class: false,
        group_depth: 0,
        tokens: Vec::new(),
    };
    lexer.run()
}

/// Format a literal code point back to pattern text, escaping as needed.
pub(crate) fn format_literal(cp: u32, out: &mut String) {
    match cp {
        0x07 => out.push_str("\\a"),
        0x08 => out.push_str("\\b"),
        0x1B => out.push_str("\\e"),
        0x0C => out.push_str("\\f"),
        0x0A => out.push_str("\\n"),
        0x0D => out.push_str("\\r"),
        0x09 => out.push_str("\\t"),
        cp => match char::from_u32(cp) {
            Some(c) if ".?+*|()[]-{}\\".contains(c) => {
                out.push('\\');
                out.push(c);
            }
            Some(c) if !c.is_control() => out.push(c),
            _ if cp <= 0xFF => {
                out.push_str(&format!("\\x{:02X}", cp));
            }
            _ => {
                out.push_str(&format!("\\u{:04X}", cp));
            }
        },
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut buf = String::new();
        match self {
            Token::AnyChar => buf.push('.'),
            Token::ZeroOne => buf.push('?'),
            Token::OneMore => buf.push('+'),
            Token::ZeroMore => buf.push('*'),
            Token::Alternate => buf.push('|'),
            // Synthetic pass-1 tokens have no surface form.
            Token::Alt(_) | Token::BeginSeq | Token::EndSeq => {}
            Token::BeginGroup(GroupName::Index(_)) | Token::BeginGroup(GroupName::Search) => {
                buf.push('(')
            }
            Token::BeginGroup(GroupName::Named(_, label)) => {
                buf.push_str("(?<");
                buf.push_str(label);
                buf.push('>');
            }
            Token::BeginGroup(GroupName::NoCapture) => buf.push_str("(?:"),
            Token::EndGroup => buf.push(')'),
            Token::BeginClass => buf.push('['),
            Token::NegClass => buf.push('^'),
            Token::EndClass => buf.push(']'),
            Token::RangeTo => buf.push('-'),
            Token::Repeat(n) => buf.push_str(&format!("{{{}}}", n)),
            Token::Property(p) => {
                buf.push('\\');
                buf.push(if p.negated { 'P' } else { 'p' });
                buf.push('{');
                buf.push_str(&p.name);
                buf.push('}');
            }
            Token::Literal(cp) => format_literal(*cp, &mut buf),
        }
        f.write_str(&buf)
    }
}

/// Format a token stream back to pattern text.
pub fn format(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&token.to_string());
    }
    out
}
