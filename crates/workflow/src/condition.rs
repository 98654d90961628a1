// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandboxed condition evaluation
//!
//! A small recursive-descent evaluator over a fixed expression grammar:
//! arithmetic, comparison, boolean logic, membership, attribute and index
//! access, and calls to an explicit function allowlist. There is no
//! general scripting surface. An expression that fails to parse or
//! evaluate is false; the error is logged at debug level.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Evaluation failure. Callers of [`ConditionEvaluator::evaluate`] never
/// see this; it surfaces only through `evaluate_value`.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("parse error at {pos}: {message}")]
    Parse { pos: usize, message: String },
    #[error("unknown name: {0}")]
    UnknownName(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("type error: {0}")]
    Type(String),
}

/// An allowlisted function callable from expressions.
pub type EvalFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// Evaluates condition expressions against a JSON name-resolution context.
#[derive(Clone, Default)]
pub struct ConditionEvaluator {
    functions: HashMap<String, EvalFn>,
}

impl fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConditionEvaluator {
    /// Evaluator with the data-shape allowlist (`len`). Callers with
    /// access to stores register the stateful functions on top —
    /// `task_tree_complete` is added by the engine at construction.
    pub fn new() -> Self {
        let mut evaluator = Self { functions: HashMap::new() };
        evaluator.register("len", |args: &[Value]| {
            let arg = args.first().ok_or_else(|| EvalError::Type("len() needs one argument".to_string()))?;
            let n = match arg {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                other => {
                    return Err(EvalError::Type(format!("len() unsupported for {other}")));
                }
            };
            Ok(Value::from(n as u64))
        });
        evaluator
    }

    /// Add a function to the allowlist.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(f));
    }

    /// Evaluate an expression to a boolean. Empty expressions and any
    /// error evaluate to false.
    pub fn evaluate(&self, expr: &str, context: &HashMap<String, Value>) -> bool {
        if expr.trim().is_empty() {
            return false;
        }
        match self.evaluate_value(expr, context) {
            Ok(value) => truthy(&value),
            Err(e) => {
                tracing::debug!(expr, error = %e, "condition evaluation failed");
                false
            }
        }
    }

    /// Evaluate an expression to its value.
    pub fn evaluate_value(
        &self,
        expr: &str,
        context: &HashMap<String, Value>,
    ) -> Result<Value, EvalError> {
        let tokens = lex(expr)?;
        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let ast = parser.parse_expr()?;
        parser.expect_end()?;
        eval(&ast, context, &self.functions)
    }
}

/// Python-style truthiness over JSON values.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Lexer

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    // Operators and punctuation
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    And,
    Or,
    Not,
    In,
    True,
    False,
    Null,
}

fn lex(input: &str) -> Result<Vec<(usize, Token)>, EvalError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let token = match c {
            '(' => { i += 1; Token::LParen }
            ')' => { i += 1; Token::RParen }
            '[' => { i += 1; Token::LBracket }
            ']' => { i += 1; Token::RBracket }
            '.' => { i += 1; Token::Dot }
            ',' => { i += 1; Token::Comma }
            '+' => { i += 1; Token::Plus }
            '-' => { i += 1; Token::Minus }
            '*' => { i += 1; Token::Star }
            '/' => { i += 1; Token::Slash }
            '%' => { i += 1; Token::Percent }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    i += 2;
                    Token::Eq
                } else {
                    return Err(EvalError::Parse { pos: i, message: "single '=' (use '==')".to_string() });
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    i += 2;
                    Token::Ne
                } else {
                    return Err(EvalError::Parse { pos: i, message: "bare '!'".to_string() });
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') { i += 2; Token::Le } else { i += 1; Token::Lt }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') { i += 2; Token::Ge } else { i += 1; Token::Gt }
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => {
                            return Err(EvalError::Parse {
                                pos: start,
                                message: "unterminated string".to_string(),
                            });
                        }
                    }
                }
                Token::Str(s)
            }
            c if c.is_ascii_digit() => {
                let mut s = String::new();
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_digit() || ch == '.' {
                        s.push(ch);
                        i += 1;
                    } else {
                        break;
                    }
                }
                let n: f64 = s.parse().map_err(|_| EvalError::Parse {
                    pos: start,
                    message: format!("bad number {s:?}"),
                })?;
                Token::Number(n)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        s.push(ch);
                        i += 1;
                    } else {
                        break;
                    }
                }
                match s.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    "null" | "None" => Token::Null,
                    _ => Token::Ident(s),
                }
            }
            other => {
                return Err(EvalError::Parse {
                    pos: i,
                    message: format!("unexpected character {other:?}"),
                });
            }
        };
        tokens.push((start, token));
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

struct Parser<'a> {
    tokens: &'a [(usize, Token)],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn err(&self, message: impl Into<String>) -> EvalError {
        let pos = self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(0);
        EvalError::Parse { pos, message: message.into() }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), EvalError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.err(format!("expected {token:?}")))
        }
    }

    fn expect_end(&self) -> Result<(), EvalError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.err("trailing input"))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Not) {
            let inner = self.parse_not()?;
            Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(BinOp::Eq),
            Some(Token::Ne) => Some(BinOp::Ne),
            Some(Token::Lt) => Some(BinOp::Lt),
            Some(Token::Le) => Some(BinOp::Le),
            Some(Token::Gt) => Some(BinOp::Gt),
            Some(Token::Ge) => Some(BinOp::Ge),
            Some(Token::In) => Some(BinOp::In),
            Some(Token::Not) => {
                // "not in" is the only postfix use of "not"
                if self.tokens.get(self.pos + 1).map(|(_, t)| t) == Some(&Token::In) {
                    self.pos += 1;
                    Some(BinOp::NotIn)
                } else {
                    None
                }
            }
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let right = self.parse_additive()?;
                Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)))
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.advance() {
                    Some(Token::Ident(name)) => name.clone(),
                    _ => return Err(self.err("expected attribute name after '.'")),
                };
                expr = Expr::Attr(Box::new(expr), name);
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek() == Some(&Token::LParen) {
                // Calls only on bare names; anything else is rejected so
                // the expression surface stays a fixed allowlist.
                let name = match &expr {
                    Expr::Name(name) => name.clone(),
                    _ => return Err(self.err("only named functions may be called")),
                };
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen)?;
                expr = Expr::Call(name, args);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Expr::Literal(number_value(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Ident(name)) => Ok(Expr::Name(name)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(Expr::List(items))
            }
            other => Err(self.err(format!("unexpected token {other:?}"))),
        }
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

// ---------------------------------------------------------------------------
// Evaluation

fn eval(
    expr: &Expr,
    context: &HashMap<String, Value>,
    functions: &HashMap<String, EvalFn>,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => context
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownName(name.clone())),
        Expr::Attr(base, attr) => {
            let base = eval(base, context, functions)?;
            base.get(attr)
                .cloned()
                .ok_or_else(|| EvalError::Type(format!("no attribute '{attr}'")))
        }
        Expr::Index(base, index) => {
            let base = eval(base, context, functions)?;
            let index = eval(index, context, functions)?;
            match (&base, &index) {
                (Value::Array(items), Value::Number(n)) => {
                    let idx = n
                        .as_i64()
                        .ok_or_else(|| EvalError::Type("non-integer index".to_string()))?;
                    let idx = if idx < 0 { items.len() as i64 + idx } else { idx };
                    items
                        .get(idx as usize)
                        .cloned()
                        .ok_or_else(|| EvalError::Type(format!("index {idx} out of range")))
                }
                (Value::Object(map), Value::String(key)) => map
                    .get(key)
                    .cloned()
                    .ok_or_else(|| EvalError::Type(format!("no key '{key}'"))),
                _ => Err(EvalError::Type("unsupported index operation".to_string())),
            }
        }
        Expr::Call(name, args) => {
            let f = functions
                .get(name)
                .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
            let args: Vec<Value> = args
                .iter()
                .map(|a| eval(a, context, functions))
                .collect::<Result<_, _>>()?;
            f(&args)
        }
        Expr::List(items) => {
            let values: Vec<Value> = items
                .iter()
                .map(|i| eval(i, context, functions))
                .collect::<Result<_, _>>()?;
            Ok(Value::Array(values))
        }
        Expr::Unary(op, inner) => {
            let value = eval(inner, context, functions)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                UnaryOp::Neg => {
                    let n = value
                        .as_f64()
                        .ok_or_else(|| EvalError::Type("negation of non-number".to_string()))?;
                    Ok(number_value(-n))
                }
            }
        }
        Expr::Binary(op, left, right) => eval_binary(*op, left, right, context, functions),
    }
}

fn eval_binary(
    op: BinOp,
    left: &Expr,
    right: &Expr,
    context: &HashMap<String, Value>,
    functions: &HashMap<String, EvalFn>,
) -> Result<Value, EvalError> {
    // Short-circuit boolean ops so an erroring right side can't matter.
    match op {
        BinOp::And => {
            let l = eval(left, context, functions)?;
            if !truthy(&l) {
                return Ok(l);
            }
            return eval(right, context, functions);
        }
        BinOp::Or => {
            let l = eval(left, context, functions)?;
            if truthy(&l) {
                return Ok(l);
            }
            return eval(right, context, functions);
        }
        _ => {}
    }

    let l = eval(left, context, functions)?;
    let r = eval(right, context, functions)?;
    match op {
        BinOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&l, &r))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = compare(&l, &r)?;
            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                BinOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        BinOp::In => Ok(Value::Bool(contains(&r, &l)?)),
        BinOp::NotIn => Ok(Value::Bool(!contains(&r, &l)?)),
        BinOp::Add => match (&l, &r) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            _ => arith(&l, &r, |a, b| a + b),
        },
        BinOp::Sub => arith(&l, &r, |a, b| a - b),
        BinOp::Mul => arith(&l, &r, |a, b| a * b),
        BinOp::Div => {
            let b = num(&r)?;
            if b == 0.0 {
                return Err(EvalError::Type("division by zero".to_string()));
            }
            arith(&l, &r, |a, b| a / b)
        }
        BinOp::Mod => {
            let b = num(&r)?;
            if b == 0.0 {
                return Err(EvalError::Type("modulo by zero".to_string()));
            }
            arith(&l, &r, |a, b| a % b)
        }
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

fn num(value: &Value) -> Result<f64, EvalError> {
    value
        .as_f64()
        .ok_or_else(|| EvalError::Type(format!("expected number, got {value}")))
}

fn arith(l: &Value, r: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    Ok(number_value(f(num(l)?, num(r)?)))
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => l == r,
    }
}

fn compare(l: &Value, r: &Value) -> Result<std::cmp::Ordering, EvalError> {
    match (l, r) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => {
            let a = num(l)?;
            let b = num(r)?;
            a.partial_cmp(&b)
                .ok_or_else(|| EvalError::Type("incomparable numbers".to_string()))
        }
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match container {
        Value::Array(items) => Ok(items.iter().any(|v| values_equal(v, item))),
        Value::String(s) => match item {
            Value::String(needle) => Ok(s.contains(needle.as_str())),
            _ => Err(EvalError::Type("'in' on string needs string operand".to_string())),
        },
        Value::Object(map) => match item {
            Value::String(key) => Ok(map.contains_key(key)),
            _ => Err(EvalError::Type("'in' on object needs string key".to_string())),
        },
        other => Err(EvalError::Type(format!("'in' unsupported for {other}"))),
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
