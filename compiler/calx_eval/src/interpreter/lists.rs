//! List access, norms and the higher-order list forms.

use calx_diagnostic::{Diagnostic, ErrorCode};
use calx_ir::Expr;

use super::Interpreter;
use crate::environment::Environment;
use crate::errors::{arity_mismatch, kind_mismatch, EvalError, EvalResult};
use crate::value::{Closure, Data, KindMismatch, Value, ValueKind};

impl Interpreter<'_> {
    /// Evaluate an expression that must produce a List.
    pub(crate) fn eval_list(&mut self, expr: &Expr, env: &Environment) -> EvalResult {
        let value = self.eval(expr, env)?;
        match value.kind() {
            ValueKind::List => Ok(value),
            got => Err(kind_mismatch("list", got)),
        }
    }

    pub(super) fn eval_index(&mut self, list: &Expr, index: &Expr, env: &Environment) -> EvalResult {
        let list = self.eval_list(list, env)?;
        let index = self.eval_int(index, env)?;
        Ok(list.get(index)?)
    }

    /// `insert v into l at i`: evaluates the value, the list, then the index.
    pub(super) fn eval_insert(
        &mut self,
        list: &Expr,
        index: &Expr,
        value: &Expr,
        env: &Environment,
    ) -> EvalResult {
        let value = self.eval(value, env)?;
        let list = self.eval_list(list, env)?;
        let index = self.eval_int(index, env)?;
        list.insert(index, value)?;
        Ok(Value::void())
    }

    /// `remove i from l`: evaluates the index, then the list.
    pub(super) fn eval_remove(&mut self, list: &Expr, index: &Expr, env: &Environment) -> EvalResult {
        let index = self.eval_int(index, env)?;
        let list = self.eval_list(list, env)?;
        Ok(list.remove(index)?)
    }

    pub(super) fn eval_slice(
        &mut self,
        list: &Expr,
        from: Option<&Expr>,
        to: Option<&Expr>,
        env: &Environment,
    ) -> EvalResult {
        let list = self.eval_list(list, env)?;
        let from = from.map(|e| self.eval_int(e, env)).transpose()?;
        let to = to.map(|e| self.eval_int(e, env)).transpose()?;
        Ok(list.slice(from, to)?)
    }

    pub(super) fn eval_norm(&mut self, inner: &Expr, env: &Environment) -> EvalResult {
        let value = self.eval(inner, env)?;
        Ok(Value::real(norm(&value)?))
    }

    pub(super) fn eval_fold(&mut self, list: &Expr, func: &Expr, base: &Expr, env: &Environment) -> EvalResult {
        let list = self.eval_list(list, env)?;
        let func = self.eval_closure(func, env)?;
        expect_arity(&func, 2)?;
        let mut acc = self.eval(base, env)?;
        for item in list.list_items().unwrap_or_default() {
            acc = self.call_closure(&func, vec![acc, item])?;
        }
        Ok(acc)
    }

    /// `map f over l`.
    ///
    /// A non-list operand is a kind error in strict mode. Permissive mode
    /// warns and applies `f` to the operand itself.
    pub(super) fn eval_map(&mut self, func: &Expr, list: &Expr, env: &Environment) -> EvalResult {
        let func = self.eval_closure(func, env)?;
        expect_arity(&func, 1)?;
        let operand = self.eval(list, env)?;
        if let Some(items) = operand.list_items() {
            let mapped = items
                .into_iter()
                .map(|item| self.call_closure(&func, vec![item]))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Value::list(mapped));
        }

        if self.config.strictness.is_strict() {
            return Err(kind_mismatch("list", operand.kind()));
        }
        let message = format!("expression `{}` does not evaluate as list", self.render(list));
        self.warn(
            Diagnostic::warning(ErrorCode::E6101)
                .with_message(message)
                .with_note(format!("applying the function to the {} itself", operand.kind())),
        );
        self.call_closure(&func, vec![operand])
    }
}

fn expect_arity(func: &Closure, expected: usize) -> Result<(), EvalError> {
    if func.arity() == expected {
        Ok(())
    } else {
        Err(arity_mismatch(expected, func.arity()))
    }
}

/// Euclidean norm of a number or a (nested) list of numbers.
pub(crate) fn norm(value: &Value) -> Result<f64, KindMismatch> {
    Ok(sum_of_squares(value)?.sqrt())
}

fn sum_of_squares(value: &Value) -> Result<f64, KindMismatch> {
    match &*value.borrow() {
        Data::List(items) => items.iter().map(sum_of_squares).sum(),
        _ => value
            .as_number()
            .map(|x| x * x)
            .ok_or_else(|| KindMismatch::new("number or list", value.kind())),
    }
}
