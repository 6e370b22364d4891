//! Tests for derivative evaluation, symbolic and forward mode.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use calx_ir::{BinaryOp, Binding, Expr, MathFn, Name, StringInterner};

use super::eval;
use crate::errors::EvalErrorKind;
use crate::value::{Value, ValueKind};
use crate::{buffer_handler, symbolic_derivative, Environment, Interpreter};

/// `let x = value; d/dx body`
fn at_x(x: Name, value: Expr, body: Expr) -> Expr {
    Expr::let1(x, value, Expr::derivative(body, x))
}

fn square(x: Name) -> Expr {
    Expr::product(Expr::var(x), Expr::var(x))
}

mod symbolic {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rewrite_of_polynomial_evaluates_to_one_plus_two_x() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let poly = Expr::sum(Expr::var(x), square(x));
        let derivative = symbolic_derivative(&poly, x).unwrap();
        for n in [0, 1, 4, -3] {
            let expr = Expr::let1(x, Expr::Int(n), derivative.clone());
            assert_eq!(eval(&interner, &expr).unwrap(), Value::int(1 + 2 * n));
        }
    }

    #[test]
    fn deferred_call_is_finished_in_forward_mode() {
        let interner = StringInterner::new();
        let (x, f) = (interner.intern("x"), interner.intern("f"));
        // f = lambda (x) x * x; symbolic d/dx (f(x) + x) at x = 3
        let poly = Expr::sum(Expr::apply(Expr::var(f), vec![Expr::var(x)]), Expr::var(x));
        let derivative = symbolic_derivative(&poly, x).unwrap();
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(3)),
                Binding::new(f, Expr::lambda(vec![x], square(x))),
            ],
            derivative,
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(7));
    }
}

mod forward {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derivative_of_applied_square() {
        let interner = StringInterner::new();
        let (x, f) = (interner.intern("x"), interner.intern("f"));
        // let x = 3, f = lambda (x) x * x; d/dx f(3)
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(3)),
                Binding::new(f, Expr::lambda(vec![x], square(x))),
            ],
            Expr::derivative(Expr::apply(Expr::var(f), vec![Expr::Int(3)]), x),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(6));
    }

    #[test]
    fn polynomial() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let expr = at_x(x, Expr::Int(4), Expr::sum(Expr::var(x), square(x)));
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(9));
    }

    #[test]
    fn constants_and_other_variables() {
        let interner = StringInterner::new();
        let (x, y) = (interner.intern("x"), interner.intern("y"));
        // let y = 5, x = 2; d/dx (y * x + 7)
        let expr = Expr::let_in(
            vec![Binding::new(y, Expr::Int(5)), Binding::new(x, Expr::Int(2))],
            Expr::derivative(
                Expr::sum(Expr::product(Expr::var(y), Expr::var(x)), Expr::Int(7)),
                x,
            ),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(5));
    }

    #[test]
    fn quotient_rule() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let expr = at_x(x, Expr::Int(2), Expr::quotient(Expr::Int(1), Expr::var(x)));
        assert_eq!(eval(&interner, &expr).unwrap(), Value::real(-0.25));
    }

    #[test]
    fn math_chain_rule() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let cases = [
            (MathFn::Sin, 0.0, 1.0),
            (MathFn::Cos, 0.0, 0.0),
            (MathFn::Log, 2.0, 0.5),
            (MathFn::Sqrt, 4.0, 0.25),
        ];
        for (func, at, expected) in cases {
            let expr = at_x(x, Expr::Real(at), Expr::math(func, Expr::var(x)));
            assert_eq!(
                eval(&interner, &expr).unwrap(),
                Value::real(expected),
                "d/dx {} at {at}",
                func.name()
            );
        }
    }

    #[test]
    fn let_inside_derivative() {
        let interner = StringInterner::new();
        let (x, y) = (interner.intern("x"), interner.intern("y"));
        // let x = 3; d/dx (let y = x * x; y * x)
        let body = Expr::let1(y, square(x), Expr::product(Expr::var(y), Expr::var(x)));
        let expr = at_x(x, Expr::Int(3), body);
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(27));
    }

    #[test]
    fn conditional_uses_primal_guard() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let body = Expr::if_else(
            Expr::binary(BinaryOp::Gt, Expr::var(x), Expr::Int(0)),
            square(x),
            Expr::Int(0),
        );
        assert_eq!(
            eval(&interner, &at_x(x, Expr::Int(3), body.clone())).unwrap(),
            Value::int(6)
        );
        assert_eq!(
            eval(&interner, &at_x(x, Expr::Int(-3), body)).unwrap(),
            Value::int(0)
        );
    }

    #[test]
    fn loop_with_assignment_tracks_tangent() {
        let interner = StringInterner::new();
        let (x, y, i) = (interner.intern("x"), interner.intern("y"), interner.intern("i"));
        // let x = 2; d/dx (let y = 1; for i in [1, 2, 3] y = y * x; y)
        let body = Expr::let1(
            y,
            Expr::Int(1),
            Expr::seq(
                Expr::for_in(
                    i,
                    Expr::list(vec![Expr::Int(1), Expr::Int(2), Expr::Int(3)]),
                    Expr::set(Expr::var(y), Expr::product(Expr::var(y), Expr::var(x))),
                ),
                Expr::var(y),
            ),
        );
        assert_eq!(
            eval(&interner, &at_x(x, Expr::Int(2), body)).unwrap(),
            Value::int(12)
        );
    }

    #[test]
    fn recursive_function() {
        let interner = StringInterner::new();
        let (x, f, n) = (interner.intern("x"), interner.intern("f"), interner.intern("n"));
        // f = lambda (n) if n == 0 then x else x * f(n - 1), so f(2) = x^3
        let f_body = Expr::if_else(
            Expr::binary(BinaryOp::Eq, Expr::var(n), Expr::Int(0)),
            Expr::var(x),
            Expr::product(
                Expr::var(x),
                Expr::apply(
                    Expr::var(f),
                    vec![Expr::difference(Expr::var(n), Expr::Int(1))],
                ),
            ),
        );
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(2)),
                Binding::new(f, Expr::lambda(vec![n], f_body)),
            ],
            Expr::derivative(Expr::apply(Expr::var(f), vec![Expr::Int(2)]), x),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(12));
    }

    #[test]
    fn derivative_of_lambda_is_callable() {
        let interner = StringInterner::new();
        let (x, y) = (interner.intern("x"), interner.intern("y"));
        // let x = 2; (d/dx lambda (y) x * y)(5)
        let lam = Expr::lambda(vec![y], Expr::product(Expr::var(x), Expr::var(y)));
        let expr = Expr::let1(
            x,
            Expr::Int(2),
            Expr::apply(Expr::derivative(lam, x), vec![Expr::Int(5)]),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(5));
    }

    #[test]
    fn lists_index_and_norm() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let pair = Expr::list(vec![Expr::var(x), square(x)]);
        let expr = at_x(x, Expr::Int(3), Expr::index(pair.clone(), Expr::Int(1)));
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(6));

        let expr = at_x(x, Expr::Int(3), pair);
        assert_eq!(
            eval(&interner, &expr).unwrap(),
            Value::list(vec![Value::int(1), Value::int(6)])
        );

        let vector = Expr::list(vec![Expr::var(x), Expr::Int(4)]);
        let expr = at_x(x, Expr::Int(3), Expr::norm(vector));
        assert_eq!(eval(&interner, &expr).unwrap(), Value::real(0.6));
    }

    #[test]
    fn norm_at_origin_is_zero() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let zeros = Expr::list(vec![Expr::Int(0), Expr::Int(0)]);
        let expr = at_x(x, Expr::Int(3), Expr::norm(zeros));
        assert_eq!(eval(&interner, &expr).unwrap(), Value::real(0.0));
    }

    #[test]
    fn magnitude() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let expr = at_x(x, Expr::Int(-3), Expr::magnitude(Expr::var(x)));
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(-1));
        let list = Expr::list(vec![Expr::var(x)]);
        let expr = at_x(x, Expr::Int(-3), Expr::magnitude(list));
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(0));
    }

    #[test]
    fn nested_derivative() {
        let interner = StringInterner::new();
        let (x, y) = (interner.intern("x"), interner.intern("y"));
        // let x = 2, y = 3; d/dx (d/dy x * y)
        let expr = Expr::let_in(
            vec![Binding::new(x, Expr::Int(2)), Binding::new(y, Expr::Int(3))],
            Expr::derivative(
                Expr::derivative(Expr::product(Expr::var(x), Expr::var(y)), y),
                x,
            ),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(1));
    }

    #[test]
    fn statements_without_derivative_still_run() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let output = buffer_handler();
        let mut interp = Interpreter::builder(&interner)
            .print_handler(output.clone())
            .build();
        let body = Expr::seq(Expr::print(vec![Expr::var(x)]), square(x));
        let result = interp
            .evaluate(&at_x(x, Expr::Int(3), body), &Environment::new())
            .unwrap();
        assert_eq!(result, Value::int(6));
        assert_eq!(output.get_output(), "3\n");
    }

    #[test]
    fn loop_body_mixing_mutation_and_print_runs_once_per_iteration() {
        let interner = StringInterner::new();
        let (x, i) = (interner.intern("x"), interner.intern("i"));
        let output = buffer_handler();
        let mut interp = Interpreter::builder(&interner)
            .print_handler(output.clone())
            .build();
        // let x = 1, i = 0; d/dx while (i < 2) { i = i + 1; print i }
        let body = Expr::seq(
            Expr::set(Expr::var(i), Expr::sum(Expr::var(i), Expr::Int(1))),
            Expr::print(vec![Expr::var(i)]),
        );
        let expr = Expr::let_in(
            vec![Binding::new(x, Expr::Int(1)), Binding::new(i, Expr::Int(0))],
            Expr::derivative(
                Expr::while_loop(Expr::binary(BinaryOp::Lt, Expr::var(i), Expr::Int(2)), body),
                x,
            ),
        );
        let result = interp.evaluate(&expr, &Environment::new()).unwrap();
        assert_eq!(result, Value::void());
        assert_eq!(output.get_output(), "1\n2\n");
    }

    #[test]
    fn called_statement_with_print_runs_once() {
        let interner = StringInterner::new();
        let (x, i, v, f) = (
            interner.intern("x"),
            interner.intern("i"),
            interner.intern("v"),
            interner.intern("f"),
        );
        let output = buffer_handler();
        let mut interp = Interpreter::builder(&interner)
            .print_handler(output.clone())
            .build();
        // f = lambda (v) (i = i + v; print i); d/dx (f(1); f(2); x * x)
        let f_body = Expr::seq(
            Expr::set(Expr::var(i), Expr::sum(Expr::var(i), Expr::var(v))),
            Expr::print(vec![Expr::var(i)]),
        );
        let call = |n| Expr::apply(Expr::var(f), vec![Expr::Int(n)]);
        let body = Expr::block(vec![call(1), call(2), square(x)]).unwrap();
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(2)),
                Binding::new(i, Expr::Int(0)),
                Binding::new(f, Expr::lambda(vec![v], f_body)),
            ],
            Expr::derivative(body, x),
        );
        let result = interp.evaluate(&expr, &Environment::new()).unwrap();
        assert_eq!(result, Value::int(4));
        assert_eq!(output.get_output(), "1\n3\n");
    }
}

mod chain_rule {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parameter_named_differently_from_variable() {
        let interner = StringInterner::new();
        let (x, y, f) = (interner.intern("x"), interner.intern("y"), interner.intern("f"));
        // let x = 3, f = lambda (y) y * y; d/dx f(x)
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(3)),
                Binding::new(f, Expr::lambda(vec![y], square(y))),
            ],
            Expr::derivative(Expr::apply(Expr::var(f), vec![Expr::var(x)]), x),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(6));
    }

    #[test]
    fn scaled_argument() {
        let interner = StringInterner::new();
        let (x, f) = (interner.intern("x"), interner.intern("f"));
        // let x = 3, f = lambda (x) x * x; d/dx f(2 * x)
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(3)),
                Binding::new(f, Expr::lambda(vec![x], square(x))),
            ],
            Expr::derivative(
                Expr::apply(
                    Expr::var(f),
                    vec![Expr::product(Expr::Int(2), Expr::var(x))],
                ),
                x,
            ),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(24));
    }

    #[test]
    fn composed_calls() {
        let interner = StringInterner::new();
        let (x, u, v, f, g) = (
            interner.intern("x"),
            interner.intern("u"),
            interner.intern("v"),
            interner.intern("f"),
            interner.intern("g"),
        );
        // g(v) = v * x, f(u) = u * u, so f(g(x)) = x^4; at x = 3 the slope is 108
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(3)),
                Binding::new(g, Expr::lambda(vec![v], Expr::product(Expr::var(v), Expr::var(x)))),
                Binding::new(f, Expr::lambda(vec![u], square(u))),
            ],
            Expr::derivative(
                Expr::apply(
                    Expr::var(f),
                    vec![Expr::apply(Expr::var(g), vec![Expr::var(x)])],
                ),
                x,
            ),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(108));
    }

    #[test]
    fn recursive_closure_with_variable_argument() {
        let interner = StringInterner::new();
        let (x, p, n, b) = (
            interner.intern("x"),
            interner.intern("p"),
            interner.intern("n"),
            interner.intern("b"),
        );
        // p(n, b) = b^n; d/dx p(3, x) at x = 2 is 3 * 2^2
        let p_body = Expr::if_else(
            Expr::binary(BinaryOp::Eq, Expr::var(n), Expr::Int(0)),
            Expr::Int(1),
            Expr::product(
                Expr::var(b),
                Expr::apply(
                    Expr::var(p),
                    vec![Expr::difference(Expr::var(n), Expr::Int(1)), Expr::var(b)],
                ),
            ),
        );
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(2)),
                Binding::new(p, Expr::lambda(vec![n, b], p_body)),
            ],
            Expr::derivative(
                Expr::apply(Expr::var(p), vec![Expr::Int(3), Expr::var(x)]),
                x,
            ),
        );
        assert_eq!(eval(&interner, &expr).unwrap(), Value::int(12));
    }

    #[test]
    fn call_arity_is_checked() {
        let interner = StringInterner::new();
        let (x, y, f) = (interner.intern("x"), interner.intern("y"), interner.intern("f"));
        let expr = Expr::let_in(
            vec![
                Binding::new(x, Expr::Int(3)),
                Binding::new(f, Expr::lambda(vec![y], square(y))),
            ],
            Expr::derivative(
                Expr::apply(Expr::var(f), vec![Expr::var(x), Expr::var(x)]),
                x,
            ),
        );
        let err = eval(&interner, &expr).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArityMismatch { expected: 1, got: 2 });
    }
}

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn string_binding_has_no_derivative() {
        let interner = StringInterner::new();
        let (x, s) = (interner.intern("x"), interner.intern("s"));
        let expr = Expr::let1(s, Expr::string("a"), Expr::derivative(Expr::var(s), x));
        let err = eval(&interner, &expr).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::UndefinedDerivative {
                kind: ValueKind::Str
            }
        );
    }

    #[test]
    fn comparison_is_not_differentiable() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let body = Expr::binary(BinaryOp::Lt, Expr::var(x), Expr::Int(1));
        let err = eval(&interner, &at_x(x, Expr::Int(0), body)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NotDifferentiable { form: "<" });
    }

    #[test]
    fn fold_is_not_differentiable() {
        let interner = StringInterner::new();
        let (x, a, b) = (interner.intern("x"), interner.intern("a"), interner.intern("b"));
        let fold = Expr::fold(
            Expr::list(vec![Expr::var(x)]),
            Expr::lambda(vec![a, b], Expr::sum(Expr::var(a), Expr::var(b))),
            Expr::Int(0),
        );
        let err = eval(&interner, &at_x(x, Expr::Int(1), fold)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NotDifferentiable { form: "fold" });
    }

    #[test]
    fn unbound_variable_in_derivative() {
        let interner = StringInterner::new();
        let (x, z) = (interner.intern("x"), interner.intern("z"));
        let err = eval(&interner, &at_x(x, Expr::Int(1), Expr::var(z))).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::UnboundVariable { .. }));
    }
}
