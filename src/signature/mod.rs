//! Signature extraction for injectable callables.
//!
//! Dependencies are requested by parameter name, so the engine has to know
//! the ordered parameter list of a callable before it can call it. The list is
//! read from the callable's declaration text; the callable itself is never run
//! to find out.
//!
//! # Declaration shapes
//!
//! | Shape | Example | Kind |
//! |---|---|---|
//! | plain function | `fn render(template, context = "{}")` | [`CallableKind::Function`] |
//! | anonymous function | `fn(a, b)` | [`CallableKind::Function`] |
//! | closure | `move \|fs, retries = 3\|` | [`CallableKind::Closure`] |
//! | class | `impl Widget { fn new(fs, uuid) fn render(&self) }` | [`CallableKind::Class`] |
//!
//! Parameters may carry a type (`path: &Path`, skipped) and a literal default
//! (`= "text"`, `= 3`, `= -1.5`, `= true`, `= null`). Receivers (`self`,
//! `&self`, `&mut self`) are not parameters.
//!
//! For a class, the constructor is the method named `new`. A class without one
//! has an empty parameter list (a warning is logged); more than one is an error.
//!
//! # Examples
//!
//! ```rust
//! use autowire::signature::{CallableKind, extract};
//!
//! let signature = extract("impl Widget { fn new(fs, retries = 3) fn render(&self) {} }")?;
//! assert_eq!(signature.name, "Widget");
//! assert_eq!(signature.kind, CallableKind::Class);
//! assert_eq!(signature.parameter_names(), vec!["fs", "retries"]);
//! assert_eq!(signature.parameters[1].default, Some(serde_json::json!(3)));
//! # Ok::<(), autowire::core::AutowireError>(())
//! ```

mod lexer;

use crate::core::{AutowireError, Dependency, Result};
use lexer::{Token, tokenize};
use serde::Serialize;
use tracing::{debug, warn};

/// Name reported for callables that have none.
pub const ANONYMOUS: &str = "<anonymous>";

/// Declaration shape of a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallableKind {
    /// `fn name(..)` or `fn(..)`
    Function,
    /// `|..|` or `move |..|`
    Closure,
    /// `impl Name { fn new(..) }`
    Class,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Parameter name, used as the logical name of the dependency
    pub name: String,
    /// Literal default, if one was declared
    pub default: Option<serde_json::Value>,
}

/// Parameter list and identity of a callable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    /// Declared name or [`ANONYMOUS`]
    pub name: String,
    /// Declaration shape
    pub kind: CallableKind,
    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,
}

impl Signature {
    /// Start an explicitly declared signature.
    pub fn new(name: impl Into<String>, kind: CallableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parameters: Vec::new(),
        }
    }

    /// Append a parameter without default.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Append a parameter with a literal default.
    #[must_use]
    pub fn param_with_default(mut self, name: impl Into<String>, default: serde_json::Value) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            default: Some(default),
        });
        self
    }

    /// Parameter names in order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Whether the callable has no declared name.
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }
}

/// Extract the signature of a function or class dependency.
///
/// Plain values and instances are not callable and yield a parse error.
pub fn of(dependency: &Dependency) -> Result<Signature> {
    match dependency {
        Dependency::Function(function) => extract(function.declaration()),
        Dependency::Class(class) => extract(class.declaration()),
        other => Err(AutowireError::parse(
            ANONYMOUS,
            format!("a {} has no parameter list", other.kind()),
        )),
    }
}

/// Parse a declaration into a [`Signature`].
pub fn extract(declaration: &str) -> Result<Signature> {
    let tokens = tokenize(declaration)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        name: ANONYMOUS.to_string(),
    };
    let signature = parser.declaration()?;
    debug!(
        "Extracted signature {} ({:?}) with parameters {:?}",
        signature.name,
        signature.kind,
        signature.parameter_names()
    );
    Ok(signature)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Name of the callable being parsed, for error messages
    name: String,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, reason: impl Into<String>) -> AutowireError {
        AutowireError::parse(self.name.clone(), reason)
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        match self.next() {
            Some(token) if token.is_punct(c) => Ok(()),
            Some(other) => {
                let found = format!("{other:?}");
                Err(self.error(format!("expected '{c}', found {found}")))
            }
            None => Err(self.error(format!("expected '{c}', found end of declaration"))),
        }
    }

    fn declaration(&mut self) -> Result<Signature> {
        self.skip_qualifiers()?;

        match self.peek() {
            Some(token) if token.is_ident("impl") => {
                self.pos += 1;
                self.class()
            }
            Some(token) if token.is_ident("fn") => {
                self.pos += 1;
                self.function()
            }
            Some(token) if token.is_ident("move") => {
                self.pos += 1;
                self.closure()
            }
            Some(token) if token.is_punct('|') => self.closure(),
            Some(other) => {
                let found = format!("{other:?}");
                Err(self.error(format!("not a function, closure or impl block (starts with {found})")))
            }
            None => Err(self.error("empty declaration")),
        }
    }

    /// `pub`, `pub(crate)`, `async`, `const`, `unsafe`
    fn skip_qualifiers(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(token) if token.is_ident("pub") => {
                    self.pos += 1;
                    if self.peek().is_some_and(|t| t.is_punct('(')) {
                        self.skip_balanced('(', ')')?;
                    }
                }
                Some(token)
                    if token.is_ident("async") || token.is_ident("const") || token.is_ident("unsafe") =>
                {
                    self.pos += 1;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Skip from an opening delimiter to its match, inclusive.
    fn skip_balanced(&mut self, open: char, close: char) -> Result<()> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next() {
                Some(token) if token.is_punct(open) => depth += 1,
                Some(token) if token.is_punct(close) => depth -= 1,
                Some(_) => {}
                None => return Err(self.error(format!("unbalanced '{open}'"))),
            }
        }
        Ok(())
    }

    fn function(&mut self) -> Result<Signature> {
        if let Some(Token::Ident(name)) = self.peek() {
            self.name = name.clone();
            self.pos += 1;
        }
        if self.peek().is_some_and(|t| t.is_punct('<')) {
            self.skip_balanced('<', '>')?;
        }
        self.expect_punct('(')?;
        let parameters = self.parameters(')')?;
        Ok(Signature {
            name: self.name.clone(),
            kind: CallableKind::Function,
            parameters,
        })
    }

    fn closure(&mut self) -> Result<Signature> {
        self.expect_punct('|')?;
        let parameters = self.parameters('|')?;
        Ok(Signature {
            name: self.name.clone(),
            kind: CallableKind::Closure,
            parameters,
        })
    }

    fn class(&mut self) -> Result<Signature> {
        if self.peek().is_some_and(|t| t.is_punct('<')) {
            self.skip_balanced('<', '>')?;
        }

        // last segment of a path such as `crate::widgets::Widget`
        let mut name = None;
        while let Some(token) = self.peek() {
            match token {
                Token::Ident(segment) => {
                    name = Some(segment.clone());
                    self.pos += 1;
                }
                Token::Punct(':') => self.pos += 1,
                _ => break,
            }
        }
        let Some(name) = name else {
            return Err(self.error("impl block without a type name"));
        };
        self.name = name;

        if self.peek().is_some_and(|t| t.is_punct('<')) {
            self.skip_balanced('<', '>')?;
        }
        self.expect_punct('{')?;

        let mut constructors: Vec<Vec<Parameter>> = Vec::new();
        let mut depth = 1usize;
        while depth > 0 {
            let Some(token) = self.next() else {
                return Err(self.error("unterminated impl block"));
            };
            match token {
                Token::Punct('{') => depth += 1,
                Token::Punct('}') => depth -= 1,
                Token::Ident(word) if word == "fn" && depth == 1 => {
                    let is_constructor = self.peek().is_some_and(|t| t.is_ident("new"));
                    if is_constructor {
                        self.pos += 1;
                        if self.peek().is_some_and(|t| t.is_punct('<')) {
                            self.skip_balanced('<', '>')?;
                        }
                        self.expect_punct('(')?;
                        constructors.push(self.parameters(')')?);
                    }
                }
                _ => {}
            }
        }

        let parameters = match constructors.len() {
            0 => {
                warn!("Class '{}' declares no constructor; assuming no parameters", self.name);
                Vec::new()
            }
            1 => constructors.remove(0),
            n => return Err(self.error(format!("{n} constructors declared, expected one"))),
        };

        Ok(Signature {
            name: self.name.clone(),
            kind: CallableKind::Class,
            parameters,
        })
    }

    /// Parse a parameter list after its opening delimiter, consuming `close`.
    fn parameters(&mut self, close: char) -> Result<Vec<Parameter>> {
        let mut parameters: Vec<Parameter> = Vec::new();

        loop {
            match self.peek() {
                Some(token) if token.is_punct(close) => {
                    self.pos += 1;
                    return Ok(parameters);
                }
                None => return Err(self.error(format!("missing '{close}' after parameters"))),
                _ => {}
            }

            if self.peek().is_some_and(|t| t.is_punct('#')) {
                self.pos += 1;
                self.skip_balanced('[', ']')?;
                continue;
            }

            if self.is_receiver() {
                self.skip_until_separator(close);
            } else {
                let parameter = self.parameter(close)?;
                if parameters.iter().any(|p| p.name == parameter.name) {
                    return Err(self.error(format!("duplicate parameter '{}'", parameter.name)));
                }
                parameters.push(parameter);
            }

            match self.peek() {
                Some(token) if token.is_punct(',') => self.pos += 1,
                Some(token) if token.is_punct(close) => {}
                Some(other) => {
                    let found = format!("{other:?}");
                    return Err(self.error(format!("unexpected {found} in parameter list")));
                }
                None => return Err(self.error(format!("missing '{close}' after parameters"))),
            }
        }
    }

    /// `self`, `mut self`, `&self`, `&mut self`, `&'a self`
    fn is_receiver(&self) -> bool {
        let mut i = self.pos;
        while let Some(token) = self.tokens.get(i) {
            match token {
                Token::Punct('&') | Token::Lifetime(_) => i += 1,
                Token::Ident(word) if word == "mut" => i += 1,
                Token::Ident(word) => return word == "self",
                _ => return false,
            }
        }
        false
    }

    fn parameter(&mut self, close: char) -> Result<Parameter> {
        if self.peek().is_some_and(|t| t.is_ident("mut")) {
            self.pos += 1;
        }

        let name = match self.next() {
            Some(Token::Ident(name)) => name.clone(),
            Some(other) => {
                let found = format!("{other:?}");
                return Err(self.error(format!("expected parameter name, found {found}")));
            }
            None => return Err(self.error("expected parameter name")),
        };

        if self.peek().is_some_and(|t| t.is_punct(':')) {
            self.pos += 1;
            self.skip_type(close);
        }

        let mut default = None;
        if self.peek().is_some_and(|t| t.is_punct('=')) {
            self.pos += 1;
            let start = self.pos;
            self.skip_until_separator(close);
            default = literal(&self.tokens[start..self.pos]);
            if default.is_none() {
                debug!("Default of parameter '{}' in '{}' is not a literal; ignoring it", name, self.name);
            }
        }

        Ok(Parameter {
            name,
            default,
        })
    }

    /// Skip a type annotation, stopping before `=`, `,` or `close` at depth 0.
    fn skip_type(&mut self, close: char) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && (token.is_punct(',') || token.is_punct('=') || token.is_punct(close)) {
                return;
            }
            match token {
                Token::Punct('(' | '[' | '{' | '<') => depth += 1,
                Token::Punct(')' | ']' | '}' | '>') => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Skip to the next `,` or `close` at depth 0.
    fn skip_until_separator(&mut self, close: char) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && (token.is_punct(',') || token.is_punct(close)) {
                return;
            }
            match token {
                Token::Punct('(' | '[' | '{') => depth += 1,
                Token::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
        }
    }
}

/// Convert the tokens of a default expression into a literal, if it is one.
fn literal(tokens: &[Token]) -> Option<serde_json::Value> {
    match tokens {
        [Token::Str(text)] => Some(serde_json::Value::String(text.clone())),
        [Token::Number(digits)] => number(digits, false),
        [Token::Punct('-'), Token::Number(digits)] => number(digits, true),
        [Token::Ident(word)] => match word.as_str() {
            "true" => Some(serde_json::Value::Bool(true)),
            "false" => Some(serde_json::Value::Bool(false)),
            "null" | "None" => Some(serde_json::Value::Null),
            _ => None,
        },
        _ => None,
    }
}

fn number(digits: &str, negative: bool) -> Option<serde_json::Value> {
    // drop `_` separators and type suffixes such as `u32` or `f64`
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let end = cleaned
        .char_indices()
        .find(|(_, c)| c.is_alphabetic() && *c != 'e' && *c != 'E')
        .map_or(cleaned.len(), |(i, _)| i);
    let numeric = &cleaned[..end];
    let sign = if negative { "-" } else { "" };

    if let Ok(int) = format!("{sign}{numeric}").parse::<i64>() {
        return Some(serde_json::Value::from(int));
    }
    format!("{sign}{numeric}")
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
}
