//! Sequencing, conditionals, loops, assignment and output.

use calx_ir::{Assignment, Expr, Name};

use super::Interpreter;
use crate::environment::Environment;
use crate::errors::{assign_failed, kind_mismatch, EvalError, EvalResult};
use crate::value::Value;

impl Interpreter<'_> {
    pub(super) fn eval_seq(&mut self, first: &Expr, rest: Option<&Expr>, env: &Environment) -> EvalResult {
        let value = self.eval(first, env)?;
        match rest {
            Some(rest) => self.eval(rest, env),
            None => Ok(value),
        }
    }

    pub(super) fn eval_if(
        &mut self,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
        env: &Environment,
    ) -> EvalResult {
        if self.eval_bool(cond, env)? {
            self.eval(then_branch, env)
        } else {
            self.eval(else_branch, env)
        }
    }

    /// `while` and `do ... while`.
    ///
    /// The guard is evaluated before every iteration, including the first
    /// iteration of a `do` loop, which runs whatever the guard says. Each
    /// iteration's result is released before the next one starts.
    pub(super) fn eval_while(
        &mut self,
        cond: &Expr,
        body: &Expr,
        always_enter: bool,
        env: &Environment,
    ) -> EvalResult {
        let mut last = None;
        let mut first = true;
        loop {
            let guard = self.eval_bool(cond, env)?;
            if !guard && !(first && always_enter) {
                break;
            }
            first = false;
            last = Some(self.eval(body, env)?);
        }
        Ok(last.unwrap_or_else(Value::void))
    }

    /// Iterate over a snapshot of the list, binding each element by identity.
    pub(super) fn eval_for(&mut self, var: Name, iter: &Expr, body: &Expr, env: &Environment) -> EvalResult {
        let list = self.eval(iter, env)?;
        let items = list
            .list_items()
            .ok_or_else(|| kind_mismatch("list", list.kind()))?;
        let mut last = None;
        for item in items {
            let scope = env.extend(var, item);
            last = Some(self.eval(body, &scope)?);
        }
        Ok(last.unwrap_or_else(Value::void))
    }

    /// Assignments run in order; the result is the last assigned value.
    pub(super) fn eval_set(&mut self, assignments: &[Assignment], env: &Environment) -> EvalResult {
        let mut last = None;
        for Assignment { target, value } in assignments {
            let value = self.eval(value, env)?;
            self.assign_to(target, &value, env)?;
            last = Some(value);
        }
        Ok(last.unwrap_or_else(Value::void))
    }

    /// Overwrite the cell `target` denotes with `value`.
    ///
    /// A variable target is resolved through the environment, so the
    /// update is visible to every alias of the cell. Any other target
    /// (`xs[0]`, a call returning a shared handle) is evaluated to its
    /// identity and overwritten in place.
    pub(crate) fn assign_to(&mut self, target: &Expr, value: &Value, env: &Environment) -> Result<(), EvalError> {
        match target {
            Expr::Var(name) => env
                .rebind(*name, value)
                .map_err(|err| assign_failed(self.names.lookup(*name), err)),
            _ => {
                let slot = self.eval(target, env)?;
                slot.assign(value)?;
                Ok(())
            }
        }
    }

    pub(super) fn eval_print(&mut self, args: &[Expr], env: &Environment) -> EvalResult {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval(arg, env)?;
            parts.push(value.render(self.names));
        }
        self.print_handler.println(&parts.join(" "));
        Ok(Value::void())
    }
}
