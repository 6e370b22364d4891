//! Tree-walking interpreter.
//!
//! `eval` is a big-step function with one case per node kind. Failures are
//! `Err(EvalError)` created at the failing node and propagated with `?`;
//! [`Interpreter::run`] is the only place that reports them, and
//! [`Interpreter::report`] hands the collected reports to an emitter.

mod builder;
mod call;
mod control;
mod lists;

use calx_diagnostic::emitter::DiagnosticEmitter;
use calx_diagnostic::{Diagnostic, DiagnosticQueue, ErrorGuaranteed};
use calx_ir::{Expr, StringLookup};

use crate::config::EvalConfig;
use crate::environment::Environment;
use crate::errors::{kind_mismatch, unbound_variable, EvalError, EvalResult};
use crate::operators::evaluate_binary;
use crate::print_handler::SharedPrintHandler;
use crate::stack::ensure_sufficient_stack;
use crate::value::{Closure, Value};

pub use builder::InterpreterBuilder;
pub(crate) use call::{bind_recursive, release_recursive};
pub(crate) use lists::norm;

/// Tree-walking interpreter.
pub struct Interpreter<'a> {
    names: &'a dyn StringLookup,
    config: EvalConfig,
    print_handler: SharedPrintHandler,
    diagnostics: DiagnosticQueue,
    /// Current closure call depth, checked against `config.max_call_depth`.
    call_depth: usize,
}

impl<'a> Interpreter<'a> {
    /// Interpreter with default configuration, printing to stdout.
    pub fn new(names: &'a dyn StringLookup) -> Self {
        InterpreterBuilder::new(names).build()
    }

    pub fn builder(names: &'a dyn StringLookup) -> InterpreterBuilder<'a> {
        InterpreterBuilder::new(names)
    }

    /// Evaluate a whole program in the empty environment.
    ///
    /// On failure the error is reported once, as a diagnostic, and the
    /// proof of that report is returned.
    pub fn run(&mut self, expr: &Expr) -> Result<Value, ErrorGuaranteed> {
        self.evaluate(expr, &Environment::new()).map_err(|err| {
            let diag = err.to_diagnostic();
            tracing::error!(code = %diag.code, "{}", err);
            self.diagnostics.emit_error(diag)
        })
    }

    /// Emit every collected diagnostic through `emitter`, then a summary
    /// line, and reset the queue.
    ///
    /// Returns the error proof when any of the emitted diagnostics is an error.
    pub fn report<E>(&mut self, emitter: &mut E) -> Option<ErrorGuaranteed>
    where
        E: DiagnosticEmitter + ?Sized,
    {
        let guarantee = self.diagnostics.has_errors();
        let errors = self.diagnostics.error_count();
        let warnings = self.diagnostics.warning_count();
        let diagnostics = self.diagnostics.flush();
        emitter.emit_all(&diagnostics);
        emitter.emit_summary(errors, warnings);
        emitter.flush();
        guarantee
    }

    /// Evaluate `expr` in `env` without reporting.
    pub fn evaluate(&mut self, expr: &Expr, env: &Environment) -> EvalResult {
        self.eval(expr, env)
    }

    pub fn names(&self) -> &'a dyn StringLookup {
        self.names
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print_handler
    }

    pub fn diagnostics(&self) -> &DiagnosticQueue {
        &self.diagnostics
    }

    /// Return the collected diagnostics and reset the queue.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.flush()
    }

    /// Record a non-fatal diagnostic (permissive-mode misuse).
    pub(crate) fn warn(&mut self, diag: Diagnostic) {
        tracing::warn!(code = %diag.code, "{}", diag.message);
        self.diagnostics.add(diag);
    }

    pub(crate) fn render(&self, expr: &Expr) -> String {
        expr.display(self.names).to_string()
    }

    pub(crate) fn eval(&mut self, expr: &Expr, env: &Environment) -> EvalResult {
        let names = self.names;
        ensure_sufficient_stack(|| self.eval_inner(expr, env))
            .map_err(|err| err.with_context(|| expr.display(names).to_string()))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(kind = expr.kind_name()))]
    fn eval_inner(&mut self, expr: &Expr, env: &Environment) -> EvalResult {
        match expr {
            // Literals
            Expr::Bool(b) => Ok(Value::bool(*b)),
            Expr::Int(n) => Ok(Value::int(*n)),
            Expr::Real(r) => Ok(Value::real(*r)),
            Expr::Str(s) => Ok(Value::string(s.as_str())),

            Expr::Var(name) => env
                .lookup(*name)
                .ok_or_else(|| unbound_variable(self.names.lookup(*name))),

            // Functions
            Expr::Lambda { params, body } => Ok(Value::closure(Closure::new(
                params.clone(),
                body.clone(),
                env.duplicate(),
            ))),
            Expr::Apply { func, args } => self.eval_apply(func, args, env),
            Expr::Let { bindings, body } => self.eval_let(bindings, body, env),

            // Control flow
            Expr::Seq { first, rest } => self.eval_seq(first, rest.as_deref(), env),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => self.eval_if(cond, then_branch, else_branch, env),
            Expr::While {
                cond,
                body,
                always_enter,
            } => self.eval_while(cond, body, *always_enter, env),
            Expr::For { var, iter, body } => self.eval_for(*var, iter, body, env),
            Expr::Set(assignments) => self.eval_set(assignments, env),

            // Lists
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item, env))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::list),
            Expr::Index { list, index } => self.eval_index(list, index, env),
            Expr::Insert { list, index, value } => self.eval_insert(list, index, value, env),
            Expr::Remove { list, index } => self.eval_remove(list, index, env),
            Expr::Slice { list, from, to } => {
                self.eval_slice(list, from.as_deref(), to.as_deref(), env)
            }
            Expr::Magnitude(inner) => Ok(self.eval(inner, env)?.magnitude()?),
            Expr::Norm(inner) => self.eval_norm(inner, env),
            Expr::Fold { list, func, base } => self.eval_fold(list, func, base, env),
            Expr::Map { func, list } => self.eval_map(func, list, env),

            // Operators
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                evaluate_binary(&left, &right, *op)
            }
            Expr::Not(inner) => Ok(Value::bool(!self.eval_bool(inner, env)?)),
            Expr::Math { func, arg } => {
                let value = self.eval(arg, env)?;
                let x = value
                    .as_number()
                    .ok_or_else(|| kind_mismatch("number", value.kind()))?;
                Ok(Value::real(func.apply(x)))
            }

            Expr::Print(args) => self.eval_print(args, env),
            Expr::Derivative { func, var } => self.eval_derivative(func, *var, env),
        }
    }

    /// Evaluate a guard or `not` operand, which must be a Bool.
    pub(crate) fn eval_bool(&mut self, expr: &Expr, env: &Environment) -> Result<bool, EvalError> {
        let value = self.eval(expr, env)?;
        value
            .as_bool()
            .ok_or_else(|| kind_mismatch("bool", value.kind()))
    }

    /// Evaluate an index or slice bound, which must be an Int.
    pub(crate) fn eval_int(&mut self, expr: &Expr, env: &Environment) -> Result<i64, EvalError> {
        let value = self.eval(expr, env)?;
        value
            .as_int()
            .ok_or_else(|| kind_mismatch("int", value.kind()))
    }

    /// Evaluate an operator position, which must be a Closure.
    pub(crate) fn eval_closure(
        &mut self,
        expr: &Expr,
        env: &Environment,
    ) -> Result<Closure, EvalError> {
        let value = self.eval(expr, env)?;
        value
            .as_closure()
            .ok_or_else(|| kind_mismatch("closure", value.kind()))
    }
}
