//! Tests for closures, application and recursive `let`.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use calx_ir::{BinaryOp, Binding, Expr, Name, StringInterner};
use pretty_assertions::assert_eq;

use super::eval;
use crate::errors::EvalErrorKind;
use crate::value::{Value, ValueKind};
use crate::{silent_handler, Environment, Interpreter};

fn is_zero(n: Name) -> Expr {
    Expr::binary(BinaryOp::Eq, Expr::var(n), Expr::Int(0))
}

fn minus_one(n: Name) -> Expr {
    Expr::difference(Expr::var(n), Expr::Int(1))
}

/// `fact = lambda (n) if n == 0 then 1 else n * fact(n - 1)`
fn factorial(interner: &StringInterner) -> (Name, Expr) {
    let (fact, n) = (interner.intern("fact"), interner.intern("n"));
    let body = Expr::if_else(
        is_zero(n),
        Expr::Int(1),
        Expr::product(
            Expr::var(n),
            Expr::apply(Expr::var(fact), vec![minus_one(n)]),
        ),
    );
    (fact, Expr::lambda(vec![n], body))
}

#[test]
fn closure_captures_defining_environment() {
    let interner = StringInterner::new();
    let (y, add, x) = (interner.intern("y"), interner.intern("add"), interner.intern("x"));
    let expr = Expr::let_in(
        vec![
            Binding::new(y, Expr::Int(10)),
            Binding::new(add, Expr::lambda(vec![x], Expr::sum(Expr::var(x), Expr::var(y)))),
        ],
        Expr::apply(Expr::var(add), vec![Expr::Int(5)]),
    );
    assert_eq!(eval(&interner, &expr).unwrap(), Value::int(15));
}

#[test]
fn immediate_lambda_application() {
    let interner = StringInterner::new();
    let (a, b) = (interner.intern("a"), interner.intern("b"));
    let lam = Expr::lambda(vec![a, b], Expr::product(Expr::var(a), Expr::var(b)));
    let expr = Expr::apply(lam, vec![Expr::Int(6), Expr::Int(7)]);
    assert_eq!(eval(&interner, &expr).unwrap(), Value::int(42));
}

#[test]
fn closure_renders_with_capture() {
    let interner = StringInterner::new();
    let (y, x) = (interner.intern("y"), interner.intern("x"));
    let expr = Expr::let1(
        y,
        Expr::Int(3),
        Expr::lambda(vec![x], Expr::sum(Expr::var(x), Expr::var(y))),
    );
    let value = eval(&interner, &expr).unwrap();
    assert_eq!(value.render(&interner), "λx.x + y | {y := 3}");
}

#[test]
fn recursive_let_factorial() {
    let interner = StringInterner::new();
    let (fact, lam) = factorial(&interner);
    let expr = Expr::let1(fact, lam, Expr::apply(Expr::var(fact), vec![Expr::Int(5)]));
    assert_eq!(eval(&interner, &expr).unwrap(), Value::int(120));
}

#[test]
fn mutual_recursion_in_one_let() {
    let interner = StringInterner::new();
    let (even, odd, n) = (interner.intern("even"), interner.intern("odd"), interner.intern("n"));
    let even_body = Expr::if_else(
        is_zero(n),
        Expr::Bool(true),
        Expr::apply(Expr::var(odd), vec![minus_one(n)]),
    );
    let odd_body = Expr::if_else(
        is_zero(n),
        Expr::Bool(false),
        Expr::apply(Expr::var(even), vec![minus_one(n)]),
    );
    let bindings = vec![
        Binding::new(even, Expr::lambda(vec![n], even_body)),
        Binding::new(odd, Expr::lambda(vec![n], odd_body)),
    ];
    let expr = Expr::let_in(
        bindings,
        Expr::list(vec![
            Expr::apply(Expr::var(even), vec![Expr::Int(10)]),
            Expr::apply(Expr::var(odd), vec![Expr::Int(7)]),
            Expr::apply(Expr::var(even), vec![Expr::Int(3)]),
        ]),
    );
    assert_eq!(
        eval(&interner, &expr).unwrap(),
        Value::list(vec![Value::bool(true), Value::bool(true), Value::bool(false)])
    );
}

#[test]
fn recursive_closure_escaping_its_let() {
    let interner = StringInterner::new();
    let (fact, lam) = factorial(&interner);
    // (let fact = ...; fact)(4)
    let escaped = Expr::let1(fact, lam, Expr::var(fact));
    let expr = Expr::apply(escaped, vec![Expr::Int(4)]);
    assert_eq!(eval(&interner, &expr).unwrap(), Value::int(24));
}

#[test]
fn recursive_closure_stored_and_called_later() {
    let interner = StringInterner::new();
    let (fact, lam) = factorial(&interner);
    let g = interner.intern("g");
    // let g = (let fact = ...; fact); g(3)
    let expr = Expr::let1(
        g,
        Expr::let1(fact, lam, Expr::var(fact)),
        Expr::apply(Expr::var(g), vec![Expr::Int(3)]),
    );
    assert_eq!(eval(&interner, &expr).unwrap(), Value::int(6));
}

#[test]
fn apply_non_closure() {
    let interner = StringInterner::new();
    let err = eval(&interner, &Expr::apply(Expr::Int(1), vec![])).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::KindMismatch {
            expected: "closure",
            got: ValueKind::Int
        }
    );
}

#[test]
fn arity_mismatch_leaves_environment_unmodified() {
    let interner = StringInterner::new();
    let (x, f, a) = (interner.intern("x"), interner.intern("f"), interner.intern("a"));
    let env = Environment::new().extend(x, Value::int(1));
    let names_before = env.names();

    let expr = Expr::let1(
        f,
        Expr::lambda(vec![a], Expr::set(Expr::var(x), Expr::Int(99))),
        Expr::apply(Expr::var(f), vec![Expr::Int(1), Expr::Int(2)]),
    );
    let mut interp = Interpreter::builder(&interner)
        .print_handler(silent_handler())
        .build();
    let err = interp.evaluate(&expr, &env).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::ArityMismatch { expected: 1, got: 2 });
    assert_eq!(env.names(), names_before);
    assert_eq!(env.lookup(x), Some(Value::int(1)));
}

#[test]
fn arguments_short_circuit_left_to_right() {
    let interner = StringInterner::new();
    let (x, a, b, missing) = (
        interner.intern("x"),
        interner.intern("a"),
        interner.intern("b"),
        interner.intern("missing"),
    );
    let env = Environment::new().extend(x, Value::int(0));
    let lam = Expr::lambda(vec![a, b], Expr::Int(0));
    let expr = Expr::apply(
        lam,
        vec![Expr::var(missing), Expr::set(Expr::var(x), Expr::Int(5))],
    );
    let mut interp = Interpreter::new(&interner);
    assert!(interp.evaluate(&expr, &env).is_err());
    assert_eq!(env.lookup(x), Some(Value::int(0)));
}

#[test]
fn call_depth_limit() {
    let interner = StringInterner::new();
    let (f, n) = (interner.intern("f"), interner.intern("n"));
    // let f = lambda (n) f(n); f(0)
    let expr = Expr::let1(
        f,
        Expr::lambda(vec![n], Expr::apply(Expr::var(f), vec![Expr::var(n)])),
        Expr::apply(Expr::var(f), vec![Expr::Int(0)]),
    );
    let mut interp = Interpreter::builder(&interner)
        .max_call_depth(50)
        .print_handler(silent_handler())
        .build();
    let err = interp.evaluate(&expr, &Environment::new()).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::RecursionLimit { depth: 50 });
}

#[test]
fn deep_recursion_grows_the_stack() {
    let interner = StringInterner::new();
    let (count, n) = (interner.intern("count"), interner.intern("n"));
    // let count = lambda (n) if n == 0 then 0 else count(n - 1); count(5000)
    let body = Expr::if_else(
        is_zero(n),
        Expr::Int(0),
        Expr::apply(Expr::var(count), vec![minus_one(n)]),
    );
    let expr = Expr::let1(
        count,
        Expr::lambda(vec![n], body),
        Expr::apply(Expr::var(count), vec![Expr::Int(5000)]),
    );
    assert_eq!(eval(&interner, &expr).unwrap(), Value::int(0));
}
