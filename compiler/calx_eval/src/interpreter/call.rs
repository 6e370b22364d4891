//! Function application and `let`.

use calx_ir::{Binding, Expr};

use super::Interpreter;
use crate::environment::Environment;
use crate::errors::{arity_mismatch, recursion_limit, released_environment, EvalError, EvalResult};
use crate::value::{Captured, Closure, Value};

impl Interpreter<'_> {
    /// Evaluate the operator, then the arguments left to right, then call.
    pub(super) fn eval_apply(&mut self, func: &Expr, args: &[Expr], env: &Environment) -> EvalResult {
        let closure = self.eval_closure(func, env)?;
        let args = args
            .iter()
            .map(|arg| self.eval(arg, env))
            .collect::<Result<Vec<_>, _>>()?;
        self.call_closure(&closure, args)
    }

    /// Call a closure with already evaluated arguments.
    ///
    /// Arguments are bound by identity: assigning to a parameter inside the
    /// body is visible through the caller's handle.
    pub fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult {
        let captured = self.enter_call(closure, args.len())?;
        let env = closure
            .params
            .iter()
            .zip(args)
            .fold(captured, |env, (&param, arg)| env.extend(param, arg));
        self.in_call(|this| this.eval(&closure.body, &env))
    }

    /// Arity, depth and capture checks shared by every kind of call.
    /// Returns the environment the body runs on top of.
    pub(crate) fn enter_call(&self, closure: &Closure, argc: usize) -> Result<Environment, EvalError> {
        if argc != closure.arity() {
            return Err(arity_mismatch(closure.arity(), argc));
        }
        if let Some(max) = self.config.max_call_depth {
            if self.call_depth >= max {
                return Err(recursion_limit(max));
            }
        }
        tracing::debug!(arity = closure.arity(), depth = self.call_depth, "call");
        closure.environment().ok_or_else(released_environment)
    }

    /// Run `body` one call level deeper.
    pub(crate) fn in_call<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.call_depth += 1;
        let result = body(self);
        self.call_depth -= 1;
        result
    }

    /// Sequential `let`: each binding sees the previous ones, and closures
    /// bound here see the whole group (so they may recurse).
    pub(super) fn eval_let(&mut self, bindings: &[Binding], body: &Expr, env: &Environment) -> EvalResult {
        let mut scope = env.clone();
        let mut closures = Vec::new();
        for binding in bindings {
            let value = self.eval(&binding.value, &scope)?.duplicate();
            if value.is_closure() {
                closures.push(value.clone());
            }
            scope = scope.extend(binding.name, value);
        }
        bind_recursive(&closures, &scope);
        let result = self.eval(body, &scope);
        release_recursive(&closures, &scope);
        result
    }
}

/// Point let-bound closures back at the finished scope.
///
/// The capture is weak: the scope holds the closures, so a strong capture
/// would never be freed.
pub(crate) fn bind_recursive(closures: &[Value], scope: &Environment) {
    for closure in closures {
        closure.set_capture(Captured::Recursive(scope.downgrade()));
    }
}

/// Promote the capture of closures that outlive the `let` body.
///
/// A let-bound closure is held by its frame and by `closures`; any further
/// handle means it escaped (returned, stored in a list, captured by an
/// assignment) and still needs the scope after the `let` returns.
pub(crate) fn release_recursive(closures: &[Value], scope: &Environment) {
    for closure in closures {
        if closure.handle_count() > 2 {
            tracing::trace!("let-bound closure escapes its scope");
            closure.set_capture(Captured::Owned(scope.clone()));
        }
    }
}
