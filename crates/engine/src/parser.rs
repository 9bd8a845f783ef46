//! Parser for macro expressions
//!
//! Syntax:
//! ```text
//! expr      := call ('.' call)*
//! call      := NAME '(' args? ')'
//! args      := arg (',' arg)*
//! arg       := expr | literal | '$' NAME | NAME
//! literal   := int | float | quoted-string
//! ```
//!
//! Whitespace is insignificant. A bare `NAME` argument is a symbol (key
//! names, directions), `$NAME` is a variable reference, and an argument
//! that is itself a call chain becomes a child macro. The parser drives
//! the builder methods on [`Macro`], so everything that can be validated
//! without a variable value fails here, before injection ever starts.

use crate::context::Context;
use crate::error::MacroError;
use crate::macros::Macro;
use crate::value::Value;

/// A token with its byte range in the source, for diagnostics and for
/// slicing child-macro source text.
#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Variable(String),
    LParen,
    RParen,
    Comma,
    Dot,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Name(name) => format!("\"{name}\""),
            TokenKind::Int(n) => format!("\"{n}\""),
            TokenKind::Float(x) => format!("\"{x}\""),
            TokenKind::Str(s) => format!("\"{s}\""),
            TokenKind::Variable(name) => format!("\"${name}\""),
            TokenKind::LParen => "\"(\"".to_string(),
            TokenKind::RParen => "\")\"".to_string(),
            TokenKind::Comma => "\",\"".to_string(),
            TokenKind::Dot => "\".\"".to_string(),
        }
    }
}

/// 0-indexed offset → 1-indexed (line, column) for error messages.
fn position(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn syntax_at(source: &str, offset: usize, message: impl AsRef<str>) -> MacroError {
    let (line, column) = position(source, offset);
    MacroError::Syntax(format!(
        "{} at line {line}, column {column}",
        message.as_ref()
    ))
}

fn tokenize(source: &str) -> Result<Vec<Token>, MacroError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '(' | ')' | ',' | '.' => {
                chars.next();
                let kind = match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ',' => TokenKind::Comma,
                    _ => TokenKind::Dot,
                };
                tokens.push(Token {
                    kind,
                    start,
                    end: start + 1,
                });
            }

            '$' => {
                chars.next();
                let (end, name) = read_ident(&mut chars, start + 1);
                if name.is_empty() {
                    return Err(syntax_at(source, start, "expected a name after \"$\""));
                }
                tokens.push(Token {
                    kind: TokenKind::Variable(name),
                    start,
                    end,
                });
            }

            '"' => {
                chars.next();
                let (end, text) = read_string(&mut chars)
                    .ok_or_else(|| syntax_at(source, start, "unclosed string literal"))?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    start,
                    end,
                });
            }

            c if c.is_ascii_digit() || c == '-' => {
                let (end, kind) = read_number(source, &mut chars, start)?;
                tokens.push(Token { kind, start, end });
            }

            c if c.is_ascii_alphabetic() || c == '_' => {
                let (end, name) = read_ident(&mut chars, start);
                tokens.push(Token {
                    kind: TokenKind::Name(name),
                    start,
                    end,
                });
            }

            other => {
                return Err(syntax_at(
                    source,
                    start,
                    format!("unexpected character \"{other}\""),
                ));
            }
        }
    }

    Ok(tokens)
}

fn read_ident(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
) -> (usize, String) {
    let mut name = String::new();
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c);
            end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    (end, name)
}

/// Returns the consumed text on success, `None` on an unterminated literal.
fn read_string(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<(usize, String)> {
    let mut text = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((i + 1, text)),
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    other => text.push(other),
                }
            }
            other => text.push(other),
        }
    }
    None
}

fn read_number(
    source: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
) -> Result<(usize, TokenKind), MacroError> {
    let mut text = String::new();
    let mut end = start;

    if let Some(&(i, '-')) = chars.peek() {
        text.push('-');
        end = i + 1;
        chars.next();
        match chars.peek() {
            Some(&(_, c)) if c.is_ascii_digit() => {}
            _ => return Err(syntax_at(source, start, "expected a digit after \"-\"")),
        }
    }

    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            end = i + 1;
            chars.next();
        } else {
            break;
        }
    }

    // only treat "." as a fraction when a digit follows, so call chains
    // after a numeric argument still tokenize as Dot
    let mut is_float = false;
    if let Some(&(dot_index, '.')) = chars.peek() {
        let mut ahead = chars.clone();
        ahead.next();
        if matches!(ahead.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            end = dot_index + 1;
            chars.next();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
        }
    }

    let kind = if is_float {
        TokenKind::Float(
            text.parse::<f64>()
                .map_err(|_| syntax_at(source, start, format!("invalid number \"{text}\"")))?,
        )
    } else {
        TokenKind::Int(
            text.parse::<i64>()
                .map_err(|_| syntax_at(source, start, format!("invalid number \"{text}\"")))?,
        )
    };
    Ok((end, kind))
}

/// One parsed argument: a plain value or a nested child macro.
enum Arg {
    Value(Value),
    Macro(Macro),
}

impl Arg {
    fn into_value(self, op: &str, position: usize) -> Result<Value, MacroError> {
        match self {
            Arg::Value(value) => Ok(value),
            Arg::Macro(_) => Err(MacroError::type_error(
                op,
                position,
                "expected a value, got a macro",
            )),
        }
    }

    fn into_macro(self, op: &str, position: usize) -> Result<Macro, MacroError> {
        match self {
            Arg::Macro(mac) => Ok(mac),
            Arg::Value(value) => Err(MacroError::type_error(
                op,
                position,
                format!("expected a macro, got \"{value}\""),
            )),
        }
    }
}

/// Parse one macro expression into a ready-to-run [`Macro`].
///
/// Fails deterministically on malformed input; nothing is injected and no
/// handler is involved at parse time.
pub fn parse(source: &str, context: &Context) -> Result<Macro, MacroError> {
    let mut parser = Parser::new(source, context)?;
    let mac = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        let (start, kind) = (token.start, token.kind.clone());
        return Err(syntax_at(
            source,
            start,
            format!("unexpected {} after the expression", kind.describe()),
        ));
    }
    Ok(mac)
}

struct Parser<'a> {
    source: &'a str,
    context: &'a Context,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, context: &'a Context) -> Result<Self, MacroError> {
        Ok(Parser {
            source,
            context,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume(&mut self, expected: &TokenKind) -> Result<(), MacroError> {
        match self.peek() {
            Some(token) if token.kind == *expected => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(syntax_at(
                self.source,
                token.start,
                format!(
                    "expected {}, got {}",
                    expected.describe(),
                    token.kind.describe()
                ),
            )),
            None => Err(syntax_at(
                self.source,
                self.source.len(),
                format!("expected {}", expected.describe()),
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Macro, MacroError> {
        let start = self.peek().map_or(0, |token| token.start);
        let mut mac = Macro::new("", self.context.clone());

        loop {
            self.parse_call(&mut mac)?;
            if self.peek_kind(0) == Some(&TokenKind::Dot) {
                self.pos += 1;
            } else {
                break;
            }
        }

        let end = self.tokens[self.pos - 1].end;
        mac.set_source(&self.source[start..end]);
        Ok(mac)
    }

    fn parse_call(&mut self, mac: &mut Macro) -> Result<(), MacroError> {
        let token = self.advance().ok_or_else(|| {
            syntax_at(self.source, self.source.len(), "expected a function name")
        })?;
        let name = match token.kind {
            TokenKind::Name(name) => name,
            other => {
                return Err(syntax_at(
                    self.source,
                    token.start,
                    format!("expected a function name, got {}", other.describe()),
                ));
            }
        };

        self.consume(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.peek_kind(0) != Some(&TokenKind::RParen) {
            loop {
                args.push(self.parse_arg(&name)?);
                if self.peek_kind(0) == Some(&TokenKind::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen)?;

        self.apply(mac, &name, args, token.start)
    }

    fn parse_arg(&mut self, op: &str) -> Result<Arg, MacroError> {
        let token = self
            .peek()
            .ok_or_else(|| {
                syntax_at(
                    self.source,
                    self.source.len(),
                    format!("expected an argument for {op}()"),
                )
            })?
            .clone();

        match token.kind {
            // NAME followed by "(" opens a nested call chain
            TokenKind::Name(_) if self.peek_kind(1) == Some(&TokenKind::LParen) => {
                Ok(Arg::Macro(self.parse_expr()?))
            }
            TokenKind::Name(name) => {
                self.pos += 1;
                Ok(Arg::Value(Value::Text(name)))
            }
            TokenKind::Int(n) => {
                self.pos += 1;
                Ok(Arg::Value(Value::Int(n)))
            }
            TokenKind::Float(x) => {
                self.pos += 1;
                Ok(Arg::Value(Value::Float(x)))
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                Ok(Arg::Value(Value::Text(s)))
            }
            TokenKind::Variable(name) => {
                self.pos += 1;
                Ok(Arg::Value(Value::Variable(name)))
            }
            other => Err(syntax_at(
                self.source,
                token.start,
                format!("unexpected {} in the arguments of {op}()", other.describe()),
            )),
        }
    }

    fn arity(
        &self,
        op: &str,
        args: &[Arg],
        min: usize,
        max: usize,
        at: usize,
    ) -> Result<(), MacroError> {
        if args.len() >= min && args.len() <= max {
            return Ok(());
        }
        let expected = if min == max {
            format!("exactly {min}")
        } else {
            format!("{min} to {max}")
        };
        Err(syntax_at(
            self.source,
            at,
            format!("{op}() takes {expected} arguments, got {}", args.len()),
        ))
    }

    fn apply(
        &self,
        mac: &mut Macro,
        name: &str,
        args: Vec<Arg>,
        at: usize,
    ) -> Result<(), MacroError> {
        match name {
            "k" => {
                self.arity(name, &args, 1, 1, at)?;
                let mut args = args.into_iter();
                mac.add_key(args.next().expect("arity checked").into_value("k (key)", 1)?)
            }

            "w" | "wait" => {
                self.arity(name, &args, 1, 1, at)?;
                let mut args = args.into_iter();
                mac.add_wait(
                    args.next()
                        .expect("arity checked")
                        .into_value("w (wait)", 1)?,
                )
            }

            "r" | "repeat" => {
                self.arity(name, &args, 2, 2, at)?;
                let mut args = args.into_iter();
                let count = args
                    .next()
                    .expect("arity checked")
                    .into_value("r (repeat)", 1)?;
                let child = args
                    .next()
                    .expect("arity checked")
                    .into_macro("r (repeat)", 2)?;
                mac.add_repeat(count, child)
            }

            "h" | "hold" => {
                self.arity(name, &args, 0, 1, at)?;
                match args.into_iter().next() {
                    None => {
                        mac.add_hold();
                        Ok(())
                    }
                    Some(Arg::Macro(child)) => {
                        mac.add_hold_macro(child);
                        Ok(())
                    }
                    Some(Arg::Value(symbol)) => mac.add_hold_key(symbol),
                }
            }

            "m" | "modify" => {
                self.arity(name, &args, 2, 2, at)?;
                let mut args = args.into_iter();
                let modifier = args
                    .next()
                    .expect("arity checked")
                    .into_value("m (modify)", 1)?;
                let child = args
                    .next()
                    .expect("arity checked")
                    .into_macro("m (modify)", 2)?;
                mac.add_modify(modifier, child)
            }

            "mouse" => {
                self.arity(name, &args, 2, 2, at)?;
                let mut args = args.into_iter();
                let direction = args.next().expect("arity checked").into_value("mouse", 1)?;
                let speed = args.next().expect("arity checked").into_value("mouse", 2)?;
                mac.add_mouse(direction, speed)
            }

            "wheel" => {
                self.arity(name, &args, 2, 2, at)?;
                let mut args = args.into_iter();
                let direction = args.next().expect("arity checked").into_value("wheel", 1)?;
                let speed = args.next().expect("arity checked").into_value("wheel", 2)?;
                mac.add_wheel(direction, speed)
            }

            "e" | "event" => {
                self.arity(name, &args, 3, 3, at)?;
                let mut args = args.into_iter();
                let kind = args
                    .next()
                    .expect("arity checked")
                    .into_value("e (event)", 1)?;
                let code = args
                    .next()
                    .expect("arity checked")
                    .into_value("e (event)", 2)?;
                let value = args
                    .next()
                    .expect("arity checked")
                    .into_value("e (event)", 3)?;
                mac.add_event(kind, code, value)
            }

            "set" => {
                self.arity(name, &args, 2, 2, at)?;
                let mut args = args.into_iter();
                let variable = args.next().expect("arity checked").into_value("set", 1)?;
                let value = args.next().expect("arity checked").into_value("set", 2)?;
                mac.add_set(variable, value)
            }

            "if_eq" => {
                self.arity(name, &args, 2, 4, at)?;
                let mut args = args.into_iter();
                let lhs = args.next().expect("arity checked").into_value("if_eq", 1)?;
                let rhs = args.next().expect("arity checked").into_value("if_eq", 2)?;
                let then = args.next().map(|a| a.into_macro("if_eq", 3)).transpose()?;
                let otherwise = args.next().map(|a| a.into_macro("if_eq", 4)).transpose()?;
                mac.add_if_eq(lhs, rhs, then, otherwise);
                Ok(())
            }

            "ifeq" => {
                self.arity(name, &args, 2, 4, at)?;
                let mut args = args.into_iter();
                let variable = args.next().expect("arity checked").into_value("ifeq", 1)?;
                let value = args.next().expect("arity checked").into_value("ifeq", 2)?;
                let then = args.next().map(|a| a.into_macro("ifeq", 3)).transpose()?;
                let otherwise = args.next().map(|a| a.into_macro("ifeq", 4)).transpose()?;
                mac.add_ifeq(variable, value, then, otherwise)
            }

            "if_tap" => {
                self.arity(name, &args, 0, 3, at)?;
                let mut args = args.into_iter();
                let then = args.next().map(|a| a.into_macro("if_tap", 1)).transpose()?;
                let otherwise = args.next().map(|a| a.into_macro("if_tap", 2)).transpose()?;
                let timeout = args.next().map(|a| a.into_value("if_tap", 3)).transpose()?;
                mac.add_if_tap(then, otherwise, timeout)
            }

            "if_single" => {
                self.arity(name, &args, 2, 3, at)?;
                let mut args = args.into_iter();
                let then = args
                    .next()
                    .expect("arity checked")
                    .into_macro("if_single", 1)?;
                let otherwise = args
                    .next()
                    .expect("arity checked")
                    .into_macro("if_single", 2)?;
                let timeout = args
                    .next()
                    .map(|a| a.into_value("if_single", 3))
                    .transpose()?;
                mac.add_if_single(Some(then), Some(otherwise), timeout)
            }

            unknown => Err(syntax_at(
                self.source,
                at,
                format!("unknown function \"{unknown}\""),
            )),
        }
    }
}
