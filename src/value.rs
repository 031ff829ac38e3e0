use std::{cmp::Ordering, fmt, rc::Rc};

use crate::diagnostics::SemanticError;

/// Runtime type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Integer,
    Float,
    Boolean,
    String,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Integer => "integer",
            Variant::Float => "float",
            Variant::Boolean => "boolean",
            Variant::String => "string",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable scalar produced by literals and operations.
///
/// Every operation builds a fresh value. Binary operators never mix
/// variants: `Integer + Float` is a type error, not a widening.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(Rc<str>),
}

impl Value {
    pub fn string(value: impl Into<Rc<str>>) -> Self {
        Value::String(value.into())
    }

    pub fn variant(&self) -> Variant {
        match self {
            Value::Integer(_) => Variant::Integer,
            Value::Float(_) => Variant::Float,
            Value::Boolean(_) => Variant::Boolean,
            Value::String(_) => Variant::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn add(&self, rhs: &Value) -> Result<Value, SemanticError> {
        match (self, rhs) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_add(*b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            _ => Err(binary_misuse("add", self, rhs)),
        }
    }

    pub fn subtract(&self, rhs: &Value) -> Result<Value, SemanticError> {
        match (self, rhs) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_sub(*b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
            _ => Err(binary_misuse("subtract", self, rhs)),
        }
    }

    pub fn multiply(&self, rhs: &Value) -> Result<Value, SemanticError> {
        match (self, rhs) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_mul(*b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
            _ => Err(binary_misuse("multiply", self, rhs)),
        }
    }

    /// Integer division by zero is an error; float division follows IEEE 754.
    pub fn divide(&self, rhs: &Value) -> Result<Value, SemanticError> {
        match (self, rhs) {
            (Value::Integer(_), Value::Integer(0)) => Err(SemanticError::DivisionByZero),
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_div(*b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
            _ => Err(binary_misuse("divide", self, rhs)),
        }
    }

    pub fn and(&self, rhs: &Value) -> Result<Value, SemanticError> {
        match (self, rhs) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a && *b)),
            _ => Err(binary_misuse("and", self, rhs)),
        }
    }

    pub fn or(&self, rhs: &Value) -> Result<Value, SemanticError> {
        match (self, rhs) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a || *b)),
            _ => Err(binary_misuse("or", self, rhs)),
        }
    }

    pub fn not(&self) -> Result<Value, SemanticError> {
        match self {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            _ => Err(unary_misuse("not", self)),
        }
    }

    pub fn unary_plus(&self) -> Result<Value, SemanticError> {
        match self {
            Value::Integer(_) | Value::Float(_) => Ok(self.clone()),
            _ => Err(unary_misuse("unary plus", self)),
        }
    }

    pub fn unary_minus(&self) -> Result<Value, SemanticError> {
        match self {
            Value::Integer(n) => Ok(Value::Integer(n.wrapping_neg())),
            Value::Float(n) => Ok(Value::Float(-n)),
            _ => Err(unary_misuse("unary minus", self)),
        }
    }

    /// Three-way comparison between two values of the same variant.
    pub fn compare(&self, rhs: &Value) -> Result<Ordering, SemanticError> {
        match (self, rhs) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            // NaN is never equal and never greater.
            (Value::Float(a), Value::Float(b)) => Ok(if a == b {
                Ordering::Equal
            } else if a > b {
                Ordering::Greater
            } else {
                Ordering::Less
            }),
            _ => Err(binary_misuse("compare", self, rhs)),
        }
    }

    pub fn eq(&self, rhs: &Value) -> Result<Value, SemanticError> {
        self.compare(rhs).map(|ord| Value::Boolean(ord == Ordering::Equal))
    }

    pub fn neq(&self, rhs: &Value) -> Result<Value, SemanticError> {
        self.compare(rhs).map(|ord| Value::Boolean(ord != Ordering::Equal))
    }

    pub fn lt(&self, rhs: &Value) -> Result<Value, SemanticError> {
        self.compare(rhs).map(|ord| Value::Boolean(ord == Ordering::Less))
    }

    pub fn lte(&self, rhs: &Value) -> Result<Value, SemanticError> {
        self.compare(rhs).map(|ord| Value::Boolean(ord != Ordering::Greater))
    }

    pub fn gt(&self, rhs: &Value) -> Result<Value, SemanticError> {
        self.compare(rhs).map(|ord| Value::Boolean(ord == Ordering::Greater))
    }

    pub fn gte(&self, rhs: &Value) -> Result<Value, SemanticError> {
        self.compare(rhs).map(|ord| Value::Boolean(ord != Ordering::Less))
    }
}

fn binary_misuse(op: &str, lhs: &Value, rhs: &Value) -> SemanticError {
    SemanticError::type_error(format!(
        "Cannot perform {op} on {} and {}.",
        lhs.variant(),
        rhs.variant()
    ))
}

fn unary_misuse(op: &str, operand: &Value) -> SemanticError {
    SemanticError::type_error(format!("Cannot perform {op} on {}.", operand.variant()))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write_float(f, *n),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        write!(f, "{n:.1}")
    } else {
        write!(f, "{n}")
    }
}
