//! Diagnostics for the Calx evaluator.
//!
//! Every evaluation failure is reported exactly once, at its origin, as a
//! [`Diagnostic`] carrying a stable [`ErrorCode`]. Reports are collected in a
//! [`DiagnosticQueue`] and rendered by an emitter.
//!
//! # Error Guarantees
//!
//! The `ErrorGuaranteed` type provides type-level proof that at least one
//! error was emitted:
//!
//! ```text
//! let guarantee = queue.emit_error(diagnostic);
//! ```

mod diagnostic;
pub mod emitter;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
