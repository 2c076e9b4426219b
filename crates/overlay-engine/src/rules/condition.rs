//! Restricted boolean expression language for rule conditions.
//!
//! Grammar (lowest precedence first):
//!
//! ```text
//! or      := and ("||" and)*
//! and     := unary ("&&" unary)*
//! unary   := "!" unary | compare
//! compare := sum (("<" | "<=" | ">" | ">=" | "==" | "===" | "!=" | "!==") sum)?
//! sum     := product (("+" | "-") product)*
//! product := sign (("*" | "/" | "%") sign)*
//! sign    := "-" sign | atom
//! atom    := number | string | "true" | "false" | ident | "hasItem" "(" string ")" | "(" or ")"
//! ```
//!
//! Only `level`, `gameTime`, `mana` and `position` are readable, and
//! `hasItem` is the only callable.

use std::{collections::HashSet, fmt};

const MAX_CONDITION_LEN: usize = 512;
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionError(String);

impl ConditionError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid condition: {}", self.0)
    }
}

impl std::error::Error for ConditionError {}

/// Values visible to a condition.
#[derive(Debug, Clone)]
pub struct ConditionContext {
    pub level: u8,
    pub game_time: u32,
    pub mana: u32,
    pub position: String,
    pub items: HashSet<String>,
}

impl ConditionContext {
    /// Mana and position are not read from the client yet; items are not tracked.
    pub const PLACEHOLDER_MANA: u32 = 100;
    pub const PLACEHOLDER_POSITION: &'static str = "mid";

    pub fn new(level: u8, game_time: u32) -> Self {
        Self {
            level,
            game_time,
            mana: Self::PLACEHOLDER_MANA,
            position: Self::PLACEHOLDER_POSITION.to_string(),
            items: HashSet::new(),
        }
    }

    fn has_item(&self, name: &str) -> bool {
        self.items.contains(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Not,
    And,
    Or,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Cmp(CmpOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    Level,
    GameTime,
    Mana,
    Position,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Var(Var),
    HasItem(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
}

/// A parsed rule condition, reusable across evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    root: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        if source.len() > MAX_CONDITION_LEN {
            return Err(ConditionError::new(format!(
                "longer than {MAX_CONDITION_LEN} bytes"
            )));
        }
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ConditionError::new("empty condition"));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(ConditionError::new(format!("unexpected token {token:?}")));
        }
        Ok(Self { root })
    }

    pub fn evaluate(&self, ctx: &ConditionContext) -> Result<bool, ConditionError> {
        match eval(&self.root, ctx)? {
            Value::Bool(result) => Ok(result),
            other => Err(ConditionError::new(format!(
                "condition produced {other:?} instead of a boolean"
            ))),
        }
    }
}

/// Parses and evaluates in one step.
pub fn evaluate(source: &str, ctx: &ConditionContext) -> Result<bool, ConditionError> {
    Condition::parse(source)?.evaluate(ctx)
}

fn tokenize(source: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '<' | '>' => {
                let inclusive = next == Some('=');
                let op = match (c, inclusive) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    ('>', false) => CmpOp::Gt,
                    _ => CmpOp::Ge,
                };
                tokens.push(Token::Cmp(op));
                i += if inclusive { 2 } else { 1 };
            }
            '=' | '!' => {
                let mut width = 1;
                while width < 3 && chars.get(i + width) == Some(&'=') {
                    width += 1;
                }
                match (c, width) {
                    ('!', 1) => tokens.push(Token::Not),
                    ('!', _) => tokens.push(Token::Cmp(CmpOp::Ne)),
                    ('=', 1) => return Err(ConditionError::new("assignment is not allowed")),
                    _ => tokens.push(Token::Cmp(CmpOp::Eq)),
                }
                i += width;
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ConditionError::new("unterminated string")),
                        Some('\\') => {
                            let escaped = chars
                                .get(i + 1)
                                .ok_or_else(|| ConditionError::new("dangling escape"))?;
                            text.push(*escaped);
                            i += 2;
                        }
                        Some(ch) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ConditionError::new(format!("bad number {literal}")))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(ConditionError::new(format!("unexpected character {other:?}")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ConditionError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            other => Err(ConditionError::new(format!(
                "expected {expected:?}, found {other:?}"
            ))),
        }
    }

    fn descend(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(ConditionError::new("expression nested too deeply"))
        } else {
            Ok(())
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_sum()?;
        if let Some(Token::Cmp(op)) = self.peek().cloned() {
            self.advance();
            let rhs = self.parse_sum()?;
            return Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_sum(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_product()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_product(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_sign()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_sign()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_sign(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            self.descend()?;
            let inner = self.parse_sign()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, ConditionError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Str(text)) => Ok(Expr::Str(text)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "level" => Ok(Expr::Var(Var::Level)),
                "gameTime" => Ok(Expr::Var(Var::GameTime)),
                "mana" => Ok(Expr::Var(Var::Mana)),
                "position" => Ok(Expr::Var(Var::Position)),
                "hasItem" => {
                    self.expect(Token::LParen)?;
                    let item = match self.advance() {
                        Some(Token::Str(item)) => item,
                        other => {
                            return Err(ConditionError::new(format!(
                                "hasItem expects a string, found {other:?}"
                            )));
                        }
                    };
                    self.expect(Token::RParen)?;
                    Ok(Expr::HasItem(item))
                }
                other => Err(ConditionError::new(format!("unknown identifier {other}"))),
            },
            other => Err(ConditionError::new(format!("unexpected {other:?}"))),
        }
    }
}

fn eval(expr: &Expr, ctx: &ConditionContext) -> Result<Value, ConditionError> {
    Ok(match expr {
        Expr::Number(value) => Value::Number(*value),
        Expr::Str(text) => Value::Str(text.clone()),
        Expr::Bool(value) => Value::Bool(*value),
        Expr::Var(var) => match var {
            Var::Level => Value::Number(f64::from(ctx.level)),
            Var::GameTime => Value::Number(f64::from(ctx.game_time)),
            Var::Mana => Value::Number(f64::from(ctx.mana)),
            Var::Position => Value::Str(ctx.position.clone()),
        },
        Expr::HasItem(item) => Value::Bool(ctx.has_item(item)),
        Expr::Not(inner) => Value::Bool(!eval_bool(inner, ctx)?),
        Expr::Neg(inner) => Value::Number(-eval_number(inner, ctx)?),
        Expr::And(lhs, rhs) => Value::Bool(eval_bool(lhs, ctx)? && eval_bool(rhs, ctx)?),
        Expr::Or(lhs, rhs) => Value::Bool(eval_bool(lhs, ctx)? || eval_bool(rhs, ctx)?),
        Expr::Arith(op, lhs, rhs) => {
            let a = eval_number(lhs, ctx)?;
            let b = eval_number(rhs, ctx)?;
            let result = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div | ArithOp::Rem if b == 0.0 => {
                    return Err(ConditionError::new("division by zero"));
                }
                ArithOp::Div => a / b,
                ArithOp::Rem => a % b,
            };
            Value::Number(result)
        }
        Expr::Compare(op, lhs, rhs) => {
            let ordering = match (eval(lhs, ctx)?, eval(rhs, ctx)?) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(&b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(&b)),
                (Value::Bool(a), Value::Bool(b)) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
                    Some(a.cmp(&b))
                }
                (a, b) => {
                    return Err(ConditionError::new(format!(
                        "cannot compare {a:?} with {b:?}"
                    )));
                }
            };
            let ordering = ordering.ok_or_else(|| ConditionError::new("unordered comparison"))?;
            Value::Bool(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq => ordering.is_eq(),
                CmpOp::Ne => ordering.is_ne(),
            })
        }
    })
}

fn eval_bool(expr: &Expr, ctx: &ConditionContext) -> Result<bool, ConditionError> {
    match eval(expr, ctx)? {
        Value::Bool(value) => Ok(value),
        other => Err(ConditionError::new(format!("expected boolean, found {other:?}"))),
    }
}

fn eval_number(expr: &Expr, ctx: &ConditionContext) -> Result<f64, ConditionError> {
    match eval(expr, ctx)? {
        Value::Number(value) => Ok(value),
        other => Err(ConditionError::new(format!("expected number, found {other:?}"))),
    }
}
