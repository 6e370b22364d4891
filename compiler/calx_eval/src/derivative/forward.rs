//! Forward-mode evaluation of derivative nodes.
//!
//! `derivative_of` mirrors `eval` node by node, threading the primal
//! environment and its shadow side by side. Primal values needed by a rule
//! (the other factor of a product, a guard, an index) are computed with the
//! ordinary evaluator.
//!
//! A statement whose value is discarded (all but the last item of a
//! sequence, a loop body) may have no derivative at all; `print` is the
//! usual example. Such statements still run, exactly once, and contribute
//! no derivative.

use std::rc::Rc;

use calx_ir::{Assignment, BinaryOp, Binding, Expr, MathFn, Name};

use super::shadow::{derivative_closure, derive_closure, elementary_derivative, shadow_environment};
use super::symbolic::{rewrites_structurally, symbolic_derivative};
use crate::environment::Environment;
use crate::errors::{
    kind_mismatch, not_differentiable, released_environment, unbound_variable,
    undefined_derivative, EvalError, EvalResult,
};
use crate::interpreter::{bind_recursive, norm, release_recursive, Interpreter};
use crate::operators::evaluate_binary;
use crate::stack::ensure_sufficient_stack;
use crate::value::{int_to_real, Data, Value, ValueKind};

impl Interpreter<'_> {
    /// Primal evaluation of `d/dvar func`: build the shadow of `env`, then
    /// differentiate.
    pub(crate) fn eval_derivative(&mut self, func: &Expr, var: Name, env: &Environment) -> EvalResult {
        let shadow = shadow_environment(env, var, self.names());
        self.derivative_of(func, var, env, &shadow)
    }

    /// Derivative of `expr` with respect to `var`, where `denv` holds the
    /// derivatives of the bindings in `env`.
    pub fn derivative_of(
        &mut self,
        expr: &Expr,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> EvalResult {
        let names = self.names();
        ensure_sufficient_stack(|| self.derivative_inner(expr, var, env, denv)).map_err(|err| {
            err.with_context(|| format!("d/d{} {}", names.lookup(var), expr.display(names)))
        })
    }

    #[tracing::instrument(level = "trace", skip_all, fields(kind = expr.kind_name()))]
    fn derivative_inner(
        &mut self,
        expr: &Expr,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> EvalResult {
        match expr {
            Expr::Int(_) => Ok(Value::int(0)),
            Expr::Real(_) => Ok(Value::real(0.0)),
            Expr::Bool(_) => Err(undefined_derivative(ValueKind::Bool)),
            Expr::Str(_) => Err(undefined_derivative(ValueKind::Str)),

            Expr::Var(name) => self.variable_derivative(*name, env, denv),

            Expr::Lambda { params, body } => Ok(Value::closure(derivative_closure(
                params,
                body,
                var,
                env.duplicate(),
            ))),
            Expr::Apply { func, args } => self
                .apply_derivative(func, args, Position::Value, var, env, denv)
                .map(or_void),
            Expr::Let { bindings, body } => self
                .let_derivative(bindings, body, Position::Value, var, env, denv)
                .map(or_void),

            Expr::Seq { first, rest } => match rest {
                Some(rest) => {
                    self.statement_derivative(first, var, env, denv)?;
                    self.derivative_of(rest, var, env, denv)
                }
                None => self.derivative_of(first, var, env, denv),
            },
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let branch = if self.eval_bool(cond, env)? {
                    then_branch
                } else {
                    else_branch
                };
                self.derivative_of(branch, var, env, denv)
            }
            Expr::While {
                cond,
                body,
                always_enter,
            } => {
                let mut last = None;
                let mut first = true;
                loop {
                    let guard = self.eval_bool(cond, env)?;
                    if !guard && !(first && *always_enter) {
                        break;
                    }
                    first = false;
                    last = self.statement_derivative(body, var, env, denv)?;
                }
                Ok(last.unwrap_or_else(Value::void))
            }
            Expr::For {
                var: item_var,
                iter,
                body,
            } => self.for_derivative(*item_var, iter, body, var, env, denv),
            Expr::Set(assignments) => self.set_derivative(assignments, var, env, denv),

            Expr::List(items) => items
                .iter()
                .map(|item| self.derivative_of(item, var, env, denv))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::list),
            Expr::Index { list, index } => {
                let dlist = self.list_derivative(list, var, env, denv)?;
                let index = self.eval_int(index, env)?;
                Ok(dlist.get(index)?)
            }
            Expr::Slice { list, from, to } => {
                let dlist = self.list_derivative(list, var, env, denv)?;
                let from = from.as_deref().map(|e| self.eval_int(e, env)).transpose()?;
                let to = to.as_deref().map(|e| self.eval_int(e, env)).transpose()?;
                Ok(dlist.slice(from, to)?)
            }
            Expr::Magnitude(inner) => self.magnitude_derivative(inner, false, var, env, denv),
            Expr::Norm(inner) => self.magnitude_derivative(inner, true, var, env, denv),

            Expr::Binary { op, left, right } => {
                self.binary_derivative(*op, left, right, var, env, denv)
            }
            Expr::Math { func, arg } => {
                let u = self.eval(arg, env)?;
                let u = u
                    .as_number()
                    .ok_or_else(|| kind_mismatch("number", u.kind()))?;
                let du = self.derivative_of(arg, var, env, denv)?;
                let factor = match func {
                    MathFn::Sin => u.cos(),
                    MathFn::Cos => -u.sin(),
                    MathFn::Log => 1.0 / u,
                    MathFn::Sqrt => 1.0 / (2.0 * u.sqrt()),
                };
                evaluate_binary(&Value::real(factor), &du, BinaryOp::Mul)
            }

            Expr::Derivative { func, var: inner } => {
                self.nested_derivative(func, *inner, var, env, denv)
            }

            Expr::Not(_)
            | Expr::Fold { .. }
            | Expr::Map { .. }
            | Expr::Insert { .. }
            | Expr::Remove { .. }
            | Expr::Print(_) => Err(not_differentiable(expr.kind_name())),
        }
    }

    /// Differentiate a statement whose value is discarded.
    ///
    /// Sequences, conditionals, `let` bodies and calls are followed down to
    /// their statements, so a statement with no derivative is met before any
    /// of its siblings have run. It is then evaluated for its effect and
    /// yields `None`. Forms that never have a derivative are evaluated
    /// without trying.
    fn statement_derivative(
        &mut self,
        expr: &Expr,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> Result<Option<Value>, EvalError> {
        let names = self.names();
        ensure_sufficient_stack(|| self.statement_inner(expr, var, env, denv)).map_err(|err| {
            err.with_context(|| format!("d/d{} {}", names.lookup(var), expr.display(names)))
        })
    }

    fn statement_inner(
        &mut self,
        expr: &Expr,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> Result<Option<Value>, EvalError> {
        match expr {
            Expr::Seq { first, rest } => {
                let head = self.statement_derivative(first, var, env, denv)?;
                match rest {
                    Some(rest) => self.statement_derivative(rest, var, env, denv),
                    None => Ok(head),
                }
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let branch = if self.eval_bool(cond, env)? {
                    then_branch
                } else {
                    else_branch
                };
                self.statement_derivative(branch, var, env, denv)
            }
            Expr::Let { bindings, body } => {
                self.let_derivative(bindings, body, Position::Statement, var, env, denv)
            }
            Expr::Apply { func, args } => {
                self.apply_derivative(func, args, Position::Statement, var, env, denv)
            }
            _ if never_differentiable(expr) => {
                tracing::trace!("no derivative, evaluating for effect");
                self.eval(expr, env)?;
                Ok(None)
            }
            _ => match self.derivative_of(expr, var, env, denv) {
                Ok(derivative) => Ok(Some(derivative)),
                Err(err) if err.is_missing_derivative() => {
                    tracing::trace!("no derivative, evaluating for effect");
                    self.eval(expr, env)?;
                    Ok(None)
                }
                Err(err) => Err(err),
            },
        }
    }

    /// Derivative of a `let` or call body in the position its node is in.
    fn body_derivative(
        &mut self,
        body: &Expr,
        position: Position,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> Result<Option<Value>, EvalError> {
        match position {
            Position::Value => self.derivative_of(body, var, env, denv).map(Some),
            Position::Statement => self.statement_derivative(body, var, env, denv),
        }
    }

    /// Derivative of a sub-expression whose derivative is optional (a call
    /// argument, a binding, the right-hand side of an assignment).
    fn optional_derivative(
        &mut self,
        expr: &Expr,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> Result<Option<Value>, EvalError> {
        if never_differentiable(expr) {
            return Ok(None);
        }
        match self.derivative_of(expr, var, env, denv) {
            Ok(derivative) => Ok(Some(derivative)),
            Err(err) if err.is_missing_derivative() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn variable_derivative(&mut self, name: Name, env: &Environment, denv: &Environment) -> EvalResult {
        if let Some(derivative) = denv.lookup(name) {
            return Ok(derivative);
        }
        match env.lookup(name) {
            Some(value) => Err(undefined_derivative(value.kind())),
            None => Err(unbound_variable(self.names().lookup(name))),
        }
    }

    /// Chain rule for `f(a, b)`.
    ///
    /// The callee's body is differentiated on top of its captured
    /// environment, with every parameter bound to its argument's value and,
    /// in the shadow, to the argument's derivative. The shadow of the capture
    /// is `denv` itself when the closure captured the calling scope, and is
    /// rebuilt from the captured bindings otherwise.
    ///
    /// `d/dx f(3)` for a parameter named `x` is the derivative of `f` at 3:
    /// a literal argument bound to a parameter named after the variable
    /// stands for the variable itself.
    fn apply_derivative(
        &mut self,
        func: &Expr,
        args: &[Expr],
        position: Position,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> Result<Option<Value>, EvalError> {
        let closure = self.eval_closure(func, env)?;
        let mut values = Vec::with_capacity(args.len());
        let mut tangents = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, env)?);
            tangents.push(self.optional_derivative(arg, var, env, denv)?);
        }
        let captured = self.enter_call(&closure, values.len())?;
        let shadow = if captured.ptr_eq(env) {
            denv.clone()
        } else {
            shadow_environment(&captured, var, self.names())
        };

        let mut scope = captured;
        let mut dscope = shadow;
        let bound = closure.params.iter().zip(args).zip(values.into_iter().zip(tangents));
        for ((&param, arg), (value, tangent)) in bound {
            let tangent = if param == var && arg.is_literal() {
                elementary_derivative(&value, true)
            } else {
                tangent
            };
            scope = scope.extend(param, value);
            if let Some(tangent) = tangent {
                dscope = dscope.extend(param, tangent);
            }
        }
        self.in_call(|this| this.body_derivative(&closure.body, position, var, &scope, &dscope))
    }

    /// `let` over both environments.
    ///
    /// Derivative closures evaluate their body against the primal
    /// environment, so both the closures and their derivatives are pointed
    /// back at the final primal scope.
    fn let_derivative(
        &mut self,
        bindings: &[Binding],
        body: &Expr,
        position: Position,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> Result<Option<Value>, EvalError> {
        let mut scope = env.clone();
        let mut dscope = denv.clone();
        let mut closures = Vec::new();
        let mut derived = Vec::new();
        for binding in bindings {
            let value = self.eval(&binding.value, &scope)?.duplicate();
            let derivative = match value.as_closure() {
                Some(closure) => {
                    let d = derive_closure(&closure, var).map(Value::closure);
                    closures.push(value.clone());
                    if let Some(d) = &d {
                        derived.push(d.clone());
                    }
                    d
                }
                None => self
                    .optional_derivative(&binding.value, var, &scope, &dscope)?
                    .map(|d| d.duplicate()),
            };
            scope = scope.extend(binding.name, value);
            if let Some(derivative) = derivative {
                dscope = dscope.extend(binding.name, derivative);
            }
        }
        bind_recursive(&closures, &scope);
        bind_recursive(&derived, &scope);
        let result = self.body_derivative(body, position, var, &scope, &dscope);
        release_recursive(&closures, &scope);
        release_recursive(&derived, &scope);
        result
    }

    fn for_derivative(
        &mut self,
        item_var: Name,
        iter: &Expr,
        body: &Expr,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> EvalResult {
        let list = self.eval_list(iter, env)?;
        let items = list.list_items().unwrap_or_default();
        let tangents = self
            .optional_derivative(iter, var, env, denv)?
            .and_then(|d| d.list_items())
            .filter(|t| t.len() == items.len());
        let mut last = None;
        for (i, item) in items.into_iter().enumerate() {
            let tangent = match &tangents {
                Some(tangents) => tangents.get(i).cloned(),
                None => elementary_derivative(&item, item_var == var),
            };
            let scope = env.extend(item_var, item);
            let dscope = match tangent {
                Some(tangent) => denv.extend(item_var, tangent),
                None => denv.clone(),
            };
            last = self.statement_derivative(body, var, &scope, &dscope)?;
        }
        Ok(last.unwrap_or_else(Value::void))
    }

    /// Both derivative and value are computed before either environment is
    /// updated. Targets with no derivative slot only update `env`.
    fn set_derivative(
        &mut self,
        assignments: &[Assignment],
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> EvalResult {
        let mut last = None;
        for Assignment { target, value } in assignments {
            let derivative = self.optional_derivative(value, var, env, denv)?;
            let value = self.eval(value, env)?;
            self.assign_to(target, &value, env)?;
            let Some(derivative) = derivative else {
                last = None;
                continue;
            };
            let slot = match target {
                Expr::Var(name) => denv.lookup(*name),
                _ => self.optional_derivative(target, var, env, denv)?,
            };
            if let Some(slot) = slot {
                slot.assign(&derivative)?;
            }
            last = Some(derivative);
        }
        Ok(last.unwrap_or_else(Value::void))
    }

    fn list_derivative(&mut self, list: &Expr, var: Name, env: &Environment, denv: &Environment) -> EvalResult {
        let derivative = self.derivative_of(list, var, env, denv)?;
        match derivative.kind() {
            ValueKind::List => Ok(derivative),
            got => Err(kind_mismatch("list", got)),
        }
    }

    /// `|u|` and `||u||`.
    ///
    /// For a number both are `sign(u) * du`. The length of a list is
    /// constant; the norm of a list moves with `u . du / ||u||`.
    fn magnitude_derivative(
        &mut self,
        inner: &Expr,
        is_norm: bool,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> EvalResult {
        let u = self.eval(inner, env)?;
        if u.kind() == ValueKind::List && !is_norm {
            return Ok(Value::int(0));
        }
        let du = self.derivative_of(inner, var, env, denv)?;
        if u.kind() != ValueKind::List {
            return evaluate_binary(&sign(&u)?, &du, BinaryOp::Mul);
        }
        let length = norm(&u)?;
        if length == 0.0 {
            return Ok(Value::real(0.0));
        }
        Ok(Value::real(dot(&u, &du)? / length))
    }

    fn binary_derivative(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> EvalResult {
        if op.is_comparison() || op.is_logical() {
            return Err(not_differentiable(op.as_symbol()));
        }
        let dl = self.derivative_of(left, var, env, denv)?;
        let dr = self.derivative_of(right, var, env, denv)?;
        if matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            return evaluate_binary(&dl, &dr, op);
        }

        let l = self.eval(left, env)?;
        let r = self.eval(right, env)?;
        let dl_r = evaluate_binary(&dl, &r, BinaryOp::Mul)?;
        let l_dr = evaluate_binary(&l, &dr, BinaryOp::Mul)?;
        if op == BinaryOp::Mul {
            return evaluate_binary(&dl_r, &l_dr, BinaryOp::Add);
        }
        let numerator = evaluate_binary(&dl_r, &l_dr, BinaryOp::Sub)?;
        let denominator = evaluate_binary(&r, &r, BinaryOp::Mul)?;
        evaluate_binary(&numerator, &denominator, BinaryOp::Div)
    }

    /// `d/dx (d/dy e)`: rewrite `e` with respect to `y`, then differentiate
    /// the rewritten tree in forward mode.
    fn nested_derivative(
        &mut self,
        func: &Rc<Expr>,
        inner: Name,
        var: Name,
        env: &Environment,
        denv: &Environment,
    ) -> EvalResult {
        match &**func {
            Expr::Var(name) if *name != inner => {
                let value = env
                    .lookup(*name)
                    .ok_or_else(|| unbound_variable(self.names().lookup(*name)))?;
                match value.as_closure() {
                    Some(closure) => {
                        let twice = derive_closure(&closure, inner)
                            .and_then(|d| derive_closure(&d, var))
                            .ok_or_else(released_environment)?;
                        Ok(Value::closure(twice))
                    }
                    // d/dy of a constant binding is a constant.
                    None => elementary_derivative(&value, false)
                        .ok_or_else(|| undefined_derivative(value.kind())),
                }
            }
            body if rewrites_structurally(body, inner) => {
                let rewritten = symbolic_derivative(body, inner)
                    .ok_or_else(|| not_differentiable(body.kind_name()))?;
                self.derivative_of(&rewritten, var, env, denv)
            }
            body => Err(not_differentiable(body.kind_name())),
        }
    }
}

/// Whether a derivative node's value is used.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Position {
    Value,
    /// The value is discarded; a missing derivative is not an error.
    Statement,
}

fn or_void(derivative: Option<Value>) -> Value {
    derivative.unwrap_or_else(Value::void)
}

/// Forms whose derivative is undefined in every environment.
fn never_differentiable(expr: &Expr) -> bool {
    match expr {
        Expr::Bool(_)
        | Expr::Str(_)
        | Expr::Not(_)
        | Expr::Fold { .. }
        | Expr::Map { .. }
        | Expr::Insert { .. }
        | Expr::Remove { .. }
        | Expr::Print(_) => true,
        Expr::Binary { op, .. } => op.is_comparison() || op.is_logical(),
        _ => false,
    }
}

/// `-1`, `0` or `1` in the kind of `u`.
fn sign(u: &Value) -> Result<Value, EvalError> {
    match &*u.borrow() {
        Data::Int(n) => Ok(Value::int(n.signum())),
        Data::Real(r) => Ok(Value::real(if *r == 0.0 { 0.0 } else { r.signum() })),
        other => Err(kind_mismatch("number or list", other.kind())),
    }
}

/// Inner product of two equally shaped (nested) lists of numbers.
fn dot(a: &Value, b: &Value) -> Result<f64, EvalError> {
    match (&*a.borrow(), &*b.borrow()) {
        (Data::List(xs), Data::List(ys)) if xs.len() == ys.len() => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| dot(x, y))
            .sum(),
        (Data::Int(x), Data::Int(y)) => Ok(int_to_real(*x) * int_to_real(*y)),
        (Data::Int(x), Data::Real(y)) | (Data::Real(y), Data::Int(x)) => Ok(int_to_real(*x) * y),
        (Data::Real(x), Data::Real(y)) => Ok(x * y),
        (_, other) => Err(kind_mismatch("number or list", other.kind())),
    }
}
