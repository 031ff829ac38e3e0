use std::fmt;

use thiserror::Error;

use crate::value::Variant;

/// Represents a byte span within a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn to(self, other: SourceSpan) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

/// Classification of a front-end diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
}

/// Rich diagnostic information surfaced for malformed source text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({}..{})", span.start, span.end)?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Broad category of a [`SemanticError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    Redefinition,
    UndefinedName,
    Arity,
    NoReturnValue,
    Type,
    Arithmetic,
    Literal,
    CallDepth,
}

/// Failure raised while evaluating a tree. Every one of these is fatal to
/// the current run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("Function {name} already exists.")]
    Redefinition { name: String },
    #[error("Function {name} is undefined.")]
    UndefinedFunction { name: String },
    #[error("Variable or parameter {name} is undefined.")]
    UndefinedVariable { name: String },
    #[error("Function {name} expects {expected} argument(s) but was given {found}.")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error(
        "Function {name} is being invoked in an expression but does not have a return value."
    )]
    NoReturnValue { name: String },
    #[error("{message}")]
    Type { message: String },
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Invalid {variant} literal `{token}`.")]
    InvalidLiteral { variant: Variant, token: String },
    #[error("Function {name} exceeded the maximum call depth of {limit}.")]
    CallDepthExceeded { name: String, limit: usize },
}

impl SemanticError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> SemanticErrorKind {
        match self {
            Self::Redefinition { .. } => SemanticErrorKind::Redefinition,
            Self::UndefinedFunction { .. } | Self::UndefinedVariable { .. } => {
                SemanticErrorKind::UndefinedName
            }
            Self::Arity { .. } => SemanticErrorKind::Arity,
            Self::NoReturnValue { .. } => SemanticErrorKind::NoReturnValue,
            Self::Type { .. } => SemanticErrorKind::Type,
            Self::DivisionByZero => SemanticErrorKind::Arithmetic,
            Self::InvalidLiteral { .. } => SemanticErrorKind::Literal,
            Self::CallDepthExceeded { .. } => SemanticErrorKind::CallDepth,
        }
    }
}

/// Unified error type for the Jlang toolchain.
#[derive(Debug, Error)]
pub enum JlangError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("{0}")]
    Semantic(#[from] SemanticError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JlangError {
    /// The semantic failure behind this error, if evaluation produced it.
    pub fn as_semantic(&self) -> Option<&SemanticError> {
        match self {
            Self::Semantic(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, JlangError>;
