//! Calx Eval - Tree-walking evaluator and differentiation engine for Calx.
//!
//! # Architecture
//!
//! The evaluator uses:
//! - `Value`: shared mutable value identities (`Rc<RefCell<Data>>`)
//! - `Environment`: persistent chain of binding frames
//! - `Interpreter`: big-step evaluation, one case per node kind
//! - `evaluate_binary`: direct enum-based binary operator dispatch
//! - `symbolic_derivative` and `Interpreter::derivative_of`: the symbolic
//!   and forward-mode differentiation strategies
//!
//! Failures are `EvalError`s propagated with `?`. `Interpreter::run` reports
//! the single error of a failed program as a `calx_diagnostic::Diagnostic`.

mod config;
pub mod derivative;
mod environment;
pub mod errors;
pub mod interpreter;
mod operators;
mod print_handler;
mod stack;
mod value;

use std::sync::Once;

pub use config::{EvalConfig, Strictness};
pub use derivative::{
    derive_closure, elementary_derivative, shadow_environment, symbolic_derivative,
};
pub use environment::{AssignError, Environment, Frame, Frames, WeakEnvironment};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use operators::evaluate_binary;
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler,
};
pub use stack::ensure_sufficient_stack;
pub use value::{Captured, Closure, Data, KindMismatch, Value, ValueError, ValueKind};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging evaluation.
///
/// Call this early (e.g. from a host binary or a test) to enable tracing
/// output. Controlled by `RUST_LOG`:
/// - `RUST_LOG=calx_eval=debug` - closure calls and shadow environments
/// - `RUST_LOG=calx_eval=trace` - every evaluated node
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests;
