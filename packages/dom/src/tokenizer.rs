//! # HTML Tokenizer
//!
//! Splits markup into coarse tokens with logos. Tag bodies are scanned by
//! callbacks so that quoted attribute values may contain `>`.
//!
//! The tokenizer never fails: anything it cannot classify comes back as
//! text and is escaped again when the tree is written out.

use logos::{Lexer, Logos};
use std::fmt;

/// Coarse HTML token
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    #[token("<!--", lex_comment)]
    Comment,

    #[regex(r"<![^-][^>]*>")]
    Declaration,

    #[regex(r"<\?[^>]*>")]
    ProcessingInstruction,

    #[regex(r"</[A-Za-z][A-Za-z0-9:_-]*", lex_tag_body)]
    EndTag,

    #[regex(r"<[A-Za-z][A-Za-z0-9:_-]*", lex_tag_body)]
    StartTag,

    #[regex(r"[^<]+")]
    Text,

    #[token("<")]
    StrayLt,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment => write!(f, "comment"),
            Token::Declaration => write!(f, "declaration"),
            Token::ProcessingInstruction => write!(f, "processing instruction"),
            Token::EndTag => write!(f, "end tag"),
            Token::StartTag => write!(f, "start tag"),
            Token::Text => write!(f, "text"),
            Token::StrayLt => write!(f, "'<'"),
        }
    }
}

fn lex_comment(lex: &mut Lexer<'_, Token>) -> bool {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(end) => lex.bump(end + 3),
        None => lex.bump(rest.len()),
    }
    true
}

/// Consume attributes up to and including the closing `>`.
///
/// Quotes only open after `=`, matching how browsers read attribute values.
fn lex_tag_body(lex: &mut Lexer<'_, Token>) -> bool {
    let rest = lex.remainder().as_bytes();
    let mut i = 0;
    let mut quote: Option<u8> = None;
    let mut after_equals = false;

    while i < rest.len() {
        let b = rest[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'>' => {
                    lex.bump(i + 1);
                    return true;
                }
                b'=' => after_equals = true,
                b'"' | b'\'' if after_equals => {
                    quote = Some(b);
                    after_equals = false;
                }
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' => {}
                _ => after_equals = false,
            },
        }
        i += 1;
    }

    // Unterminated tag: swallow the rest, the tree builder discards it.
    lex.bump(rest.len());
    true
}

/// A parsed start or end tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
    pub terminated: bool,
}

/// Split a raw tag slice (`<name ...>` or `</name ...>`) into its parts.
///
/// Attribute names are lower-cased; values are returned undecoded.
pub fn parse_tag(raw: &str) -> TagToken {
    let terminated = raw.ends_with('>');
    let body = raw.trim_start_matches('<').trim_start_matches('/');
    let body = body.strip_suffix('>').unwrap_or(body);

    let name_end = body
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(body.len());
    let name = body[..name_end].to_ascii_lowercase();
    let rest = &body[name_end..];

    let self_closing = rest.trim_end().ends_with('/');
    let attrs = parse_attributes(rest);

    TagToken {
        name,
        attrs,
        self_closing,
        terminated,
    }
}

fn parse_attributes(input: &str) -> Vec<(String, String)> {
    let chars: Vec<char> = input.chars().collect();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && (chars[i].is_whitespace() || chars[i] == '/') {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let name_start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '=' && chars[i] != '/' {
            i += 1;
        }
        // A lone '=' would otherwise never advance.
        if i == name_start {
            i += 1;
            continue;
        }
        let name: String = chars[name_start..i].iter().collect::<String>().to_ascii_lowercase();

        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < chars.len() && chars[i] == '=' {
            i += 1;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if i < chars.len() && (chars[i] == '"' || chars[i] == '\'') {
                let q = chars[i];
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != q {
                    i += 1;
                }
                value = chars[start..i].iter().collect();
                i += 1;
            } else {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                value = chars[start..i].iter().collect();
            }
        }

        // First occurrence wins, as in browsers.
        if !attrs.iter().any(|(existing, _)| existing == &name) {
            attrs.push((name, value));
        }
    }

    attrs
}

/// Tokenize markup into `(token, slice)` pairs. Lexer errors become text.
pub fn tokenize(source: &str) -> Vec<(Token, &str)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let token = result.unwrap_or(Token::Text);
        tokens.push((token, lexer.slice()));
    }
    tokens
}
