//! Evaluation errors.
//!
//! Every failure is created once, at the node where it happens, and then
//! travels up through `?` without further reporting. The host entry point
//! turns the surviving error into a single [`Diagnostic`].
//!
//! Factory functions (e.g. `unbound_variable()`) are the public API for
//! creating errors; each one fills in a structured [`EvalErrorKind`].

use calx_diagnostic::{Diagnostic, ErrorCode};
use calx_ir::BinaryOp;

use crate::environment::AssignError;
use crate::value::{KindMismatch, Value, ValueError, ValueKind};

/// Result of evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("unbound variable `{name}`")]
    UnboundVariable { name: String },

    #[error("kind mismatch: expected {expected}, found {got}")]
    KindMismatch { expected: &'static str, got: ValueKind },

    #[error("operator `{}` cannot be applied to {left} and {right}", symbol(.op))]
    InvalidOperands {
        op: BinaryOp,
        left: ValueKind,
        right: ValueKind,
    },

    #[error("expected {expected} {}, found {got}", arguments(.expected))]
    ArityMismatch { expected: usize, got: usize },

    #[error("{kind} value has no derivative")]
    UndefinedDerivative { kind: ValueKind },

    #[error("cannot differentiate {form} expression")]
    NotDifferentiable { form: &'static str },

    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },

    #[error("maximum call depth exceeded (limit: {depth})")]
    RecursionLimit { depth: usize },

    #[error("closure called after its defining scope was released")]
    ReleasedEnvironment,

    #[error("list would contain itself")]
    CyclicList,
}

#[expect(
    clippy::trivially_copy_pass_by_ref,
    reason = "thiserror passes fields by reference"
)]
fn symbol(op: &BinaryOp) -> &'static str {
    op.as_symbol()
}

#[expect(
    clippy::trivially_copy_pass_by_ref,
    reason = "thiserror passes fields by reference"
)]
fn arguments(count: &usize) -> &'static str {
    if *count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

impl EvalErrorKind {
    /// Stable diagnostic code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnboundVariable { .. } => ErrorCode::E6001,
            Self::KindMismatch { .. } => ErrorCode::E6002,
            Self::InvalidOperands { .. } => ErrorCode::E6003,
            Self::ArityMismatch { .. } => ErrorCode::E6004,
            Self::UndefinedDerivative { .. } => ErrorCode::E6005,
            Self::NotDifferentiable { .. } => ErrorCode::E6006,
            Self::IndexOutOfBounds { .. } => ErrorCode::E6007,
            Self::IntegerOverflow { .. } => ErrorCode::E6008,
            Self::RecursionLimit { .. } => ErrorCode::E6009,
            Self::ReleasedEnvironment => ErrorCode::E6010,
            Self::CyclicList => ErrorCode::E6011,
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Rendered expression the error was raised at, if known.
    pub context: Option<String>,
}

impl EvalError {
    #[cold]
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        EvalError {
            kind,
            context: None,
        }
    }

    /// Attach the rendered expression, keeping the innermost one.
    #[must_use]
    pub fn with_context(mut self, context: impl FnOnce() -> String) -> Self {
        if self.context.is_none() {
            self.context = Some(context());
        }
        self
    }

    /// True for failures that only mean "this has no derivative".
    pub fn is_missing_derivative(&self) -> bool {
        matches!(
            self.kind,
            EvalErrorKind::UndefinedDerivative { .. } | EvalErrorKind::NotDifferentiable { .. }
        )
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.kind.code()).with_message(self.kind.to_string());
        match &self.context {
            Some(context) => diag.with_note(format!("in expression `{context}`")),
            None => diag,
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(context) = &self.context {
            write!(f, " (in `{context}`)")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

impl From<KindMismatch> for EvalError {
    fn from(err: KindMismatch) -> Self {
        kind_mismatch(err.expected, err.got)
    }
}

impl From<ValueError> for EvalError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::Kind(mismatch) => mismatch.into(),
            ValueError::OutOfBounds { index, len } => index_out_of_bounds(index, len),
            ValueError::Overflow { operation } => integer_overflow(operation),
            ValueError::Cycle => cyclic_list(),
        }
    }
}

// Variable and binding errors

#[cold]
pub fn unbound_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnboundVariable {
        name: name.to_string(),
    })
}

/// Failed `rebind` of `name`.
#[cold]
pub fn assign_failed(name: &str, err: AssignError) -> EvalError {
    match err {
        AssignError::NotFound => unbound_variable(name),
        AssignError::Rejected(err) => err.into(),
    }
}

// Kind errors

#[cold]
pub fn kind_mismatch(expected: &'static str, got: ValueKind) -> EvalError {
    EvalError::from_kind(EvalErrorKind::KindMismatch { expected, got })
}

#[cold]
pub fn invalid_operands(op: BinaryOp, left: ValueKind, right: ValueKind) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperands { op, left, right })
}

// Call errors

#[cold]
pub fn arity_mismatch(expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch { expected, got })
}

#[cold]
pub fn recursion_limit(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RecursionLimit { depth })
}

#[cold]
pub fn released_environment() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ReleasedEnvironment)
}

// Arithmetic and list errors

#[cold]
pub fn integer_overflow(operation: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow { operation })
}

#[cold]
pub fn cyclic_list() -> EvalError {
    EvalError::from_kind(EvalErrorKind::CyclicList)
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index, len })
}

// Derivative errors

#[cold]
pub fn undefined_derivative(kind: ValueKind) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedDerivative { kind })
}

#[cold]
pub fn not_differentiable(form: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotDifferentiable { form })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages() {
        assert_eq!(
            unbound_variable("y").to_string(),
            "unbound variable `y`"
        );
        assert_eq!(
            arity_mismatch(1, 2).to_string(),
            "expected 1 argument, found 2"
        );
        assert_eq!(
            arity_mismatch(2, 1).to_string(),
            "expected 2 arguments, found 1"
        );
        assert_eq!(
            invalid_operands(BinaryOp::Add, ValueKind::Bool, ValueKind::Int).to_string(),
            "operator `+` cannot be applied to bool and int"
        );
    }

    #[test]
    fn test_context_keeps_innermost() {
        let err = kind_mismatch("list", ValueKind::Int)
            .with_context(|| "xs[0]".to_string())
            .with_context(|| "f(xs[0])".to_string());
        assert_eq!(err.context.as_deref(), Some("xs[0]"));
    }

    #[test]
    fn test_to_diagnostic() {
        let diag = unbound_variable("y")
            .with_context(|| "y + 1".to_string())
            .to_diagnostic();
        assert_eq!(diag.code, ErrorCode::E6001);
        assert_eq!(diag.message, "unbound variable `y`");
        assert_eq!(diag.notes, vec!["in expression `y + 1`".to_string()]);
    }

    #[test]
    fn test_value_error_conversion() {
        let err: EvalError = ValueError::OutOfBounds { index: 4, len: 2 }.into();
        assert_eq!(err.kind, EvalErrorKind::IndexOutOfBounds { index: 4, len: 2 });

        let err = assign_failed("x", AssignError::NotFound);
        assert_eq!(
            err.kind,
            EvalErrorKind::UnboundVariable {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_missing_derivative_classification() {
        assert!(undefined_derivative(ValueKind::Bool).is_missing_derivative());
        assert!(not_differentiable("print").is_missing_derivative());
        assert!(!unbound_variable("x").is_missing_derivative());
    }
}
