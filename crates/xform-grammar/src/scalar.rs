//! Scalar grammar: signed numbers or arithmetic expressions
//!
//! A [`Scalar`] is the value type behind nearly every numeric field of a
//! transformation. It is either a plain number or an [`Expression`] over
//! base-image and canvas variables:
//!
//! ```text
//! expression := operand ( "_" operator "_" operand )*
//! operand    := variable | [0-9]+ ( "." [0-9]+ )?
//! operator   := add | sub | mul | div | mod | pow
//! ```
//!
//! Negative numbers never serialize with a leading `-`; the delivery
//! grammar uses an `N` prefix instead (`-20` renders as `N20`).

use crate::error::GrammarError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Prefix marking a negative number in the short-key grammar
pub const NEGATIVE_MARKER: char = 'N';

/// Named dimension variables usable inside expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Input image height
    InputHeight,
    /// Input image width
    InputWidth,
    /// Input image aspect ratio
    InputAspectRatio,
    /// Input video duration
    InputDuration,
    /// Current height
    CurrentHeight,
    /// Current width
    CurrentWidth,
    /// Current aspect ratio
    CurrentAspectRatio,
    /// Base (parent layer) height
    BaseHeight,
    /// Base width
    BaseWidth,
    /// Base aspect ratio
    BaseAspectRatio,
    /// Base duration
    BaseDuration,
}

impl Variable {
    /// All variables, in grammar order
    pub const ALL: [Self; 11] = [
        Self::InputHeight,
        Self::InputWidth,
        Self::InputAspectRatio,
        Self::InputDuration,
        Self::CurrentHeight,
        Self::CurrentWidth,
        Self::CurrentAspectRatio,
        Self::BaseHeight,
        Self::BaseWidth,
        Self::BaseAspectRatio,
        Self::BaseDuration,
    ];

    /// Token used in expressions
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputHeight => "ih",
            Self::InputWidth => "iw",
            Self::InputAspectRatio => "iar",
            Self::InputDuration => "idu",
            Self::CurrentHeight => "ch",
            Self::CurrentWidth => "cw",
            Self::CurrentAspectRatio => "car",
            Self::BaseHeight => "bh",
            Self::BaseWidth => "bw",
            Self::BaseAspectRatio => "bar",
            Self::BaseDuration => "bdu",
        }
    }

    /// Look up a variable by token
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == token)
    }
}

/// Binary operators usable inside expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Modulo
    Mod,
    /// Exponentiation
    Pow,
}

impl Operator {
    /// All operators
    pub const ALL: [Self; 6] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Pow,
    ];

    /// Token used in expressions
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Pow => "pow",
        }
    }

    /// Look up an operator by token
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == token)
    }
}

/// One side of an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Named variable
    Variable(Variable),
    /// Unsigned numeric literal, kept exactly as written
    Number(String),
}

impl Operand {
    fn parse(token: &str) -> Option<Self> {
        if let Some(var) = Variable::from_token(token) {
            return Some(Self::Variable(var));
        }
        is_numeric_literal(token).then(|| Self::Number(token.to_string()))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(var) => f.write_str(var.as_str()),
            Self::Number(literal) => f.write_str(literal),
        }
    }
}

/// Parsed arithmetic expression
///
/// Literals are stored verbatim so that rendering an expression reproduces
/// the input text byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    head: Operand,
    tail: Vec<(Operator, Operand)>,
}

impl Expression {
    /// First operand
    #[inline]
    #[must_use]
    pub fn head(&self) -> &Operand {
        &self.head
    }

    /// Operator/operand pairs following the head
    #[inline]
    #[must_use]
    pub fn tail(&self) -> &[(Operator, Operand)] {
        &self.tail
    }

    /// Whether the expression references no variables and has no operators
    #[inline]
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.tail.is_empty() && matches!(self.head, Operand::Number(_))
    }

    /// Numeric value of a single-literal expression
    #[must_use]
    pub fn literal_value(&self) -> Option<f64> {
        match (&self.head, self.tail.is_empty()) {
            (Operand::Number(literal), true) => literal.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for Expression {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || GrammarError::MalformedExpression(s.to_string());
        let mut tokens = s.split('_');

        let head = tokens.next().and_then(Operand::parse).ok_or_else(malformed)?;
        let mut tail = Vec::new();
        while let Some(op_token) = tokens.next() {
            let op = Operator::from_token(op_token).ok_or_else(malformed)?;
            let operand = tokens.next().and_then(Operand::parse).ok_or_else(malformed)?;
            tail.push((op, operand));
        }

        Ok(Self { head, tail })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (op, operand) in &self.tail {
            write!(f, "_{}_{}", op.as_str(), operand)?;
        }
        Ok(())
    }
}

/// Numeric-or-expression field value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Whole number
    Integer(i64),
    /// Finite fractional number
    Float(f64),
    /// Arithmetic expression
    Expression(Expression),
}

impl Scalar {
    /// Build a float scalar, rejecting NaN and infinities
    ///
    /// Negative zero is stored as zero.
    pub fn float(value: f64) -> Result<Self, GrammarError> {
        if value.is_finite() {
            Ok(Self::Float(if value == 0.0 { 0.0 } else { value }))
        } else {
            Err(GrammarError::NonFinite)
        }
    }

    /// Parse a scalar from its textual form
    ///
    /// Grammar-conforming text stays an expression (so `"0.50"` is kept
    /// verbatim); a leading `-` or `N` marks a negative number.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let trimmed = text.trim();
        if let Some(magnitude) = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix(NEGATIVE_MARKER))
        {
            return parse_negative(magnitude)
                .ok_or_else(|| GrammarError::MalformedExpression(text.to_string()));
        }
        trimmed.parse::<Expression>().map(Self::Expression)
    }

    /// Convert a JSON value into a scalar
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GrammarError> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Integer(i))
                } else {
                    // u64 beyond i64 or a float; both fit the float variant
                    n.as_f64().ok_or(GrammarError::NonFinite).and_then(Self::float)
                }
            }
            serde_json::Value::String(s) => Self::parse(s),
            other => Err(GrammarError::unexpected("number or expression", other)),
        }
    }

    /// Numeric value when the scalar is a number or a single literal
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Expression(expr) => expr.literal_value(),
        }
    }

    /// Whether the scalar is a negative number
    #[inline]
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.numeric_value().is_some_and(|v| v < 0.0)
    }

    /// Whether the scalar is a strictly positive number or an expression
    /// whose value is only known at render time
    #[must_use]
    pub fn is_positive_or_symbolic(&self) -> bool {
        self.numeric_value().map_or(true, |v| v > 0.0)
    }

    /// Whether the scalar is a non-negative number or a symbolic expression
    #[must_use]
    pub fn is_non_negative_or_symbolic(&self) -> bool {
        self.numeric_value().map_or(true, |v| v >= 0.0)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Expression> for Scalar {
    fn from(value: Expression) -> Self {
        Self::Expression(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) if *i < 0 => write!(f, "{NEGATIVE_MARKER}{}", i.unsigned_abs()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) if *v < 0.0 => write!(f, "{NEGATIVE_MARKER}{}", -v),
            // -0.0 still carries its sign bit
            Self::Float(v) if *v == 0.0 => f.write_str("0"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether `token` is an unsigned literal `[0-9]+(\.[0-9]+)?`
#[must_use]
pub fn is_numeric_literal(token: &str) -> bool {
    let (int_part, frac_part) = match token.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (token, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int_part) && frac_part.map_or(true, digits)
}

fn parse_negative(magnitude: &str) -> Option<Scalar> {
    if !is_numeric_literal(magnitude) {
        return None;
    }
    if magnitude.contains('.') {
        let value: f64 = magnitude.parse().ok()?;
        Scalar::float(-value).ok()
    } else {
        let value: i64 = magnitude.parse().ok()?;
        Some(Scalar::Integer(-value))
    }
}
