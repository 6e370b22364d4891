//! Evaluator-level tests.
//!
//! Expression trees are built with the `Expr` constructors and evaluated in
//! the empty environment.

mod closure_tests;
mod derivative_tests;

use calx_ir::{Expr, StringInterner};

use crate::{silent_handler, Environment, EvalResult, Interpreter};

/// Evaluate `expr` in the empty environment, discarding printed output.
pub(crate) fn eval(interner: &StringInterner, expr: &Expr) -> EvalResult {
    Interpreter::builder(interner)
        .print_handler(silent_handler())
        .build()
        .evaluate(expr, &Environment::new())
}
