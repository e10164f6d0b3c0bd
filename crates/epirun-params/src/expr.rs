//! Arithmetic over `@reference` placeholders.
//!
//! The accepted grammar is deliberately small:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | '@' identifier | '(' expr ')'
//! ```

use epirun_core::errors::{ErrorInfo, SweepError};
use logos::Logos;

/// Prefix marking a reference inside an expression string.
pub const MARKER: char = '@';

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r"@[A-Za-z0-9_]+", |lex| lex.slice()[1..].to_string())]
    Reference(String),
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Flattened key path, without the marker.
    Reference(String),
    /// Unary minus.
    Negate(Box<Expr>),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

/// An expression string together with its parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

/// Returns true when some whitespace-separated token of `text` starts with
/// `@identifier`, after any opening parentheses or unary signs. An `@` inside
/// a word, as in `ops@example.org`, does not count.
pub fn is_expression(text: &str) -> bool {
    text.split_whitespace().any(|token| {
        let mut chars = token.trim_start_matches(&['(', '-', '+'][..]).chars();
        chars.next() == Some(MARKER)
            && chars
                .next()
                .is_some_and(|next| next.is_ascii_alphanumeric() || next == '_')
    })
}

fn expression_error(code: &str, source: &str, message: impl Into<String>) -> SweepError {
    SweepError::Configuration(ErrorInfo::new(code, message).with_context("expression", source))
}

impl Expression {
    /// Lexes and parses `source`.
    pub fn parse(source: &str) -> Result<Self, SweepError> {
        let tokens = lex(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source,
        };
        let root = parser.expr()?;
        if let Some(token) = tokens.get(parser.pos) {
            return Err(expression_error(
                "expr-trailing-input",
                source,
                format!("unexpected {token:?} after complete expression"),
            ));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed tree.
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Referenced identifiers in order of first appearance.
    pub fn references(&self) -> Vec<&str> {
        fn collect<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Number(_) => {}
                Expr::Reference(name) => {
                    if !out.contains(&name.as_str()) {
                        out.push(name);
                    }
                }
                Expr::Negate(inner) => collect(inner, out),
                Expr::Binary { lhs, rhs, .. } => {
                    collect(lhs, out);
                    collect(rhs, out);
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.root, &mut out);
        out
    }

    /// Evaluates the expression, looking references up through `lookup`.
    ///
    /// Unknown references surface as [`SweepError::MissingPath`]; division by
    /// zero and any other non-finite result as [`SweepError::Configuration`].
    pub fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<f64, SweepError> {
        let value = self.eval(&self.root, lookup)?;
        if !value.is_finite() {
            return Err(expression_error(
                "expr-non-finite",
                &self.source,
                format!("expression evaluated to {value}"),
            ));
        }
        Ok(value)
    }

    fn eval(&self, expr: &Expr, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<f64, SweepError> {
        match expr {
            Expr::Number(value) => Ok(*value),
            Expr::Reference(name) => lookup(name).ok_or_else(|| {
                SweepError::MissingPath(
                    ErrorInfo::new("expr-unknown-reference", "referenced parameter is not defined")
                        .with_context("reference", name.as_str())
                        .with_context("expression", self.source.as_str()),
                )
            }),
            Expr::Negate(inner) => Ok(-self.eval(inner, lookup)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, lookup)?;
                let rhs = self.eval(rhs, lookup)?;
                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Sub => Ok(lhs - rhs),
                    BinaryOp::Mul => Ok(lhs * rhs),
                    BinaryOp::Div if rhs == 0.0 => Err(expression_error(
                        "expr-division-by-zero",
                        &self.source,
                        "division by zero",
                    )),
                    BinaryOp::Div => Ok(lhs / rhs),
                }
            }
        }
    }
}

fn lex(source: &str) -> Result<Vec<Token>, SweepError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(expression_error(
                    "expr-invalid-token",
                    source,
                    format!(
                        "unexpected input {:?} at offset {}",
                        lexer.slice(),
                        lexer.span().start
                    ),
                ))
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
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

    fn expr(&mut self) -> Result<Expr, SweepError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, SweepError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, SweepError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Negate(Box::new(self.unary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, SweepError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Reference(name)) => Ok(Expr::Reference(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(expression_error(
                        "expr-unbalanced-parenthesis",
                        self.source,
                        "missing closing parenthesis",
                    )),
                }
            }
            Some(token) => Err(expression_error(
                "expr-unexpected-token",
                self.source,
                format!("expected a number, reference or '(' but found {token:?}"),
            )),
            None => Err(expression_error(
                "expr-unexpected-end",
                self.source,
                "expression ends where an operand is expected",
            )),
        }
    }
}
