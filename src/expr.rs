//! Statement grammar
//!
//! A dedicated small-grammar parser for the statement language. Statements
//! combine call-style logical forms (`Implies(H(s), M(s))`, `ForAll([x],
//! Human(x))`) with infix arithmetic and comparison (`x + y == 10`). The
//! parser operates over raw text only; names are resolved against the
//! symbol table later, during evaluation. There is no dynamic execution
//! path of any kind.

use std::fmt;

use crate::error::{EntailError, EntailResult, ErrorCode};

// ============================================================================
// AST
// ============================================================================

/// Infix binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// True for `==`, `!=`, `<`, `<=`, `>`, `>=`
    pub fn is_comparison(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        };
        write!(f, "{}", s)
    }
}

/// A parsed statement expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// Decimal literal
    Real(f64),
    /// Bare name (individual, nullary relation, or numeric variable)
    Ident(String),
    /// Call form: connective, quantifier, or relation application
    Call(String, Vec<Expr>),
    /// Arithmetic negation
    Neg(Box<Expr>),
    /// Infix binary operation
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Bracketed binding list, only legal as a quantifier's first argument
    Bindings(Vec<String>),
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Real(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Op(BinOp),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Int(n) => write!(f, "{}", n),
            Token::Real(x) => write!(f, "{}", x),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Op(op) => write!(f, "{}", op),
        }
    }
}

fn tokenize(input: &str) -> EntailResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
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
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
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
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(BinOp::Eq));
                    i += 2;
                } else {
                    return Err(EntailError::new(ErrorCode::UnexpectedToken, "single '=' is not an operator")
                        .with_context("position", i.to_string())
                        .with_hint("Use '==' for equality"));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(BinOp::Ne));
                    i += 2;
                } else {
                    return Err(EntailError::new(ErrorCode::UnexpectedToken, "single '!' is not an operator")
                        .with_context("position", i.to_string())
                        .with_hint("Use 'Not(...)' for negation"));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(BinOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Op(BinOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(BinOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(BinOp::Gt));
                    i += 1;
                }
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let mut is_real = false;
                if i < chars.len() && chars[i] == '.' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                    is_real = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                if is_real {
                    let value = text.parse::<f64>().map_err(|_| {
                        EntailError::new(ErrorCode::InvalidNumber, format!("invalid decimal literal '{}'", text))
                    })?;
                    tokens.push(Token::Real(value));
                } else {
                    let value = text.parse::<i64>().map_err(|_| {
                        EntailError::new(ErrorCode::InvalidNumber, format!("integer literal '{}' out of range", text))
                    })?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(EntailError::new(
                    ErrorCode::UnexpectedToken,
                    format!("unexpected character '{}'", other),
                )
                .with_context("position", i.to_string()));
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

/// Recursive-descent parser state
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

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

    fn expect(&mut self, expected: &Token) -> EntailResult<()> {
        match self.advance() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(EntailError::new(
                ErrorCode::UnexpectedToken,
                format!("expected '{}', found '{}'", expected, token),
            )),
            None => Err(EntailError::new(
                ErrorCode::UnexpectedEof,
                format!("expected '{}', found end of input", expected),
            )),
        }
    }

    /// comparison := additive (CMP additive)?
    fn comparison(&mut self) -> EntailResult<Expr> {
        let lhs = self.additive()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.advance();
            let rhs = self.additive()?;
            return Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    /// additive := multiplicative (('+' | '-') multiplicative)*
    fn additive(&mut self) -> EntailResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// multiplicative := unary (('*' | '/') unary)*
    fn multiplicative(&mut self) -> EntailResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// unary := '-' unary | primary
    fn unary(&mut self) -> EntailResult<Expr> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let inner = self.unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    /// primary := NUMBER | IDENT ('(' args ')')? | '(' comparison ')' | '[' idents ']'
    fn primary(&mut self) -> EntailResult<Expr> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Real(x)) => Ok(Expr::Real(x)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let args = self.arguments()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.comparison()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => self.binding_list(),
            Some(token) => Err(EntailError::new(
                ErrorCode::UnexpectedToken,
                format!("unexpected '{}'", token),
            )),
            None => Err(EntailError::new(ErrorCode::UnexpectedEof, "unexpected end of input")),
        }
    }

    /// args := (comparison (',' comparison)*)? ')'
    fn arguments(&mut self) -> EntailResult<Vec<Expr>> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.comparison()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                Some(token) => {
                    return Err(EntailError::new(
                        ErrorCode::UnexpectedToken,
                        format!("expected ',' or ')', found '{}'", token),
                    ));
                }
                None => {
                    return Err(EntailError::new(ErrorCode::UnexpectedEof, "unclosed argument list"));
                }
            }
        }
        Ok(args)
    }

    /// idents := IDENT (',' IDENT)* ']'
    fn binding_list(&mut self) -> EntailResult<Expr> {
        let mut names = Vec::new();
        loop {
            match self.advance() {
                Some(Token::Ident(name)) => names.push(name),
                Some(Token::RBracket) if names.is_empty() => break,
                Some(token) => {
                    return Err(EntailError::new(
                        ErrorCode::InvalidBinding,
                        format!("binding lists may contain only names, found '{}'", token),
                    ));
                }
                None => {
                    return Err(EntailError::new(ErrorCode::UnexpectedEof, "unclosed binding list"));
                }
            }
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => break,
                Some(token) => {
                    return Err(EntailError::new(
                        ErrorCode::InvalidBinding,
                        format!("expected ',' or ']', found '{}'", token),
                    ));
                }
                None => {
                    return Err(EntailError::new(ErrorCode::UnexpectedEof, "unclosed binding list"));
                }
            }
        }
        if names.is_empty() {
            return Err(EntailError::new(ErrorCode::InvalidBinding, "empty binding list"));
        }
        Ok(Expr::Bindings(names))
    }
}

/// Parse a single statement into an expression tree
pub fn parse_statement(input: &str) -> EntailResult<Expr> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EntailError::empty_input("statement"));
    }

    let tokens = tokenize(trimmed)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.comparison()?;

    if let Some(extra) = parser.peek() {
        return Err(EntailError::new(
            ErrorCode::UnexpectedToken,
            format!("trailing input starting at '{}'", extra),
        ));
    }
    Ok(expr)
}
