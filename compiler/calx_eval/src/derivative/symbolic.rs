//! Structural derivative rewrite.

use calx_ir::{BinaryOp, Expr, MathFn, Name};

use crate::stack::ensure_sufficient_stack;

/// Derivative of `expr` with respect to `var`, as a new tree.
///
/// Returns `None` for forms that have no derivative at all (booleans,
/// strings, comparisons, logic and `print`). Forms without a closed-form
/// rule come back wrapped as `d/dvar expr`, to be finished in forward mode.
pub fn symbolic_derivative(expr: &Expr, var: Name) -> Option<Expr> {
    ensure_sufficient_stack(|| derive(expr, var))
}

fn derive(expr: &Expr, var: Name) -> Option<Expr> {
    match expr {
        Expr::Int(_) => Some(Expr::Int(0)),
        Expr::Real(_) => Some(Expr::Real(0.0)),
        Expr::Bool(_) | Expr::Str(_) | Expr::Not(_) | Expr::Print(_) => None,
        Expr::Var(name) if *name == var => Some(Expr::Int(1)),

        Expr::Binary { op, left, right } => match op {
            BinaryOp::Add | BinaryOp::Sub => Some(Expr::binary(
                *op,
                symbolic_derivative(left, var)?,
                symbolic_derivative(right, var)?,
            )),
            BinaryOp::Mul => {
                let dl = symbolic_derivative(left, var)?;
                let dr = symbolic_derivative(right, var)?;
                Some(Expr::sum(
                    Expr::product((**left).clone(), dr),
                    Expr::product((**right).clone(), dl),
                ))
            }
            BinaryOp::Div => {
                let dl = symbolic_derivative(left, var)?;
                let dr = symbolic_derivative(right, var)?;
                let (left, right) = ((**left).clone(), (**right).clone());
                Some(Expr::quotient(
                    Expr::difference(
                        Expr::product(right.clone(), dl),
                        Expr::product(left, dr),
                    ),
                    Expr::product(right.clone(), right),
                ))
            }
            _ => None,
        },

        Expr::Math { func, arg } => {
            let du = symbolic_derivative(arg, var)?;
            let u = (**arg).clone();
            let outer = match func {
                MathFn::Sin => Expr::math(MathFn::Cos, u),
                MathFn::Cos => Expr::product(Expr::Int(-1), Expr::math(MathFn::Sin, u)),
                MathFn::Log => return Some(Expr::quotient(du, u)),
                MathFn::Sqrt => {
                    return Some(Expr::quotient(
                        du,
                        Expr::product(Expr::Int(2), Expr::math(MathFn::Sqrt, u)),
                    ))
                }
            };
            Some(Expr::product(outer, du))
        }

        Expr::Derivative { func, var: inner } => {
            Some(Expr::derivative(symbolic_derivative(func, *inner)?, var))
        }

        _ => Some(Expr::derivative(expr.clone(), var)),
    }
}

/// True when [`symbolic_derivative`] rewrites `expr` by a closed-form rule
/// instead of deferring it. Forward mode relies on this to avoid handing a
/// deferred node straight back to itself.
pub(crate) fn rewrites_structurally(expr: &Expr, var: Name) -> bool {
    match expr {
        Expr::Var(name) => *name == var,
        Expr::Binary { op, .. } => !op.is_comparison() && !op.is_logical(),
        Expr::Derivative { func, var: inner } => rewrites_structurally(func, *inner),
        Expr::Int(_)
        | Expr::Real(_)
        | Expr::Bool(_)
        | Expr::Str(_)
        | Expr::Not(_)
        | Expr::Print(_)
        | Expr::Math { .. } => true,
        _ => false,
    }
}
