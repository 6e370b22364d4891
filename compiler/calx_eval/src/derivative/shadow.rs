//! Shadow environments: the derivative of every binding in scope.

use std::rc::Rc;

use calx_ir::{Expr, Name, StringLookup};

use crate::environment::Environment;
use crate::value::{Closure, Data, Value};

/// Derivative of a bound value treated as a constant, or as the variable
/// itself when `is_var` is set.
///
/// Defined for numbers and lists of numbers only.
pub fn elementary_derivative(value: &Value, is_var: bool) -> Option<Value> {
    match &*value.borrow() {
        Data::Int(_) => Some(Value::int(i64::from(is_var))),
        Data::Real(_) => Some(Value::real(if is_var { 1.0 } else { 0.0 })),
        Data::List(items) => items
            .iter()
            .map(|item| elementary_derivative(item, is_var))
            .collect::<Option<Vec<_>>>()
            .map(Value::list),
        _ => None,
    }
}

/// The same function, differentiated: identical parameters, body `d/dx body`.
///
/// Captures the closure's own environment. `None` when that environment has
/// already been released.
pub fn derive_closure(closure: &Closure, var: Name) -> Option<Closure> {
    let env = closure.environment()?;
    Some(derivative_closure(&closure.params, &closure.body, var, env))
}

pub(crate) fn derivative_closure(
    params: &Rc<[Name]>,
    body: &Rc<Expr>,
    var: Name,
    env: Environment,
) -> Closure {
    let body = Expr::Derivative {
        func: Rc::clone(body),
        var,
    };
    Closure::new(Rc::clone(params), Rc::new(body), env)
}

/// Build the derivative environment of `env` with respect to `var`.
///
/// Frames are replayed outermost first, so inner bindings shadow outer ones
/// just as they do in `env`. Bindings with no derivative are left out.
pub fn shadow_environment(env: &Environment, var: Name, names: &dyn StringLookup) -> Environment {
    let mut shadow = Environment::new();
    for (id, value) in env.frames() {
        let derivative = match value.as_closure() {
            Some(closure) => derive_closure(&closure, var).map(Value::closure),
            None => elementary_derivative(&value, id == var),
        };
        if let Some(derivative) = derivative {
            tracing::debug!(
                "d/d{} {} = {}",
                names.lookup(var),
                names.lookup(id),
                derivative.render(names)
            );
            shadow = shadow.extend(id, derivative);
        }
    }
    shadow
}
