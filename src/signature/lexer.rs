//! Tokenizer for callable declarations.

use crate::core::{AutowireError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Number(String),
    Lifetime(String),
    Punct(char),
    /// `->`
    Arrow,
    /// `=>`
    FatArrow,
}

impl Token {
    pub(crate) fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }

    pub(crate) fn is_ident(&self, word: &str) -> bool {
        matches!(self, Token::Ident(w) if w == word)
    }
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start = i;
            i += 2;
            loop {
                if i + 1 >= chars.len() {
                    return Err(lex_error(start, "unterminated block comment"));
                }
                if chars[i] == '*' && chars[i + 1] == '/' {
                    i += 2;
                    break;
                }
                i += 1;
            }
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                // `1..2` is a range, not a float
                if chars[i] == '.' && chars.get(i + 1) == Some(&'.') {
                    break;
                }
                i += 1;
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
            continue;
        }

        if c == '"' {
            let start = i;
            i += 1;
            let mut text = String::new();
            loop {
                let Some(&next) = chars.get(i) else {
                    return Err(lex_error(start, "unterminated string literal"));
                };
                i += 1;
                match next {
                    '"' => break,
                    '\\' => {
                        let Some(&escaped) = chars.get(i) else {
                            return Err(lex_error(start, "unterminated string literal"));
                        };
                        i += 1;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => other,
                        });
                    }
                    other => text.push(other),
                }
            }
            tokens.push(Token::Str(text));
            continue;
        }

        if c == '\'' {
            // 'x' is a char literal, 'a without a closing quote is a lifetime
            if chars.get(i + 2) == Some(&'\'') {
                tokens.push(Token::Str(chars[i + 1].to_string()));
                i += 3;
                continue;
            }
            let start = i + 1;
            i += 1;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Lifetime(chars[start..i].iter().collect()));
            continue;
        }

        if c == '-' && chars.get(i + 1) == Some(&'>') {
            tokens.push(Token::Arrow);
            i += 2;
            continue;
        }

        if c == '=' && chars.get(i + 1) == Some(&'>') {
            tokens.push(Token::FatArrow);
            i += 2;
            continue;
        }

        tokens.push(Token::Punct(c));
        i += 1;
    }

    Ok(tokens)
}

fn lex_error(offset: usize, reason: &str) -> AutowireError {
    AutowireError::parse(super::ANONYMOUS, format!("{reason} at offset {offset}"))
}
