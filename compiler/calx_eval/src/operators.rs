//! Binary operator implementations for the evaluator.
//!
//! Direct enum-based dispatch over the operand kinds. Both operands are
//! already evaluated; `and` / `or` never short-circuit.
//!
//! Numeric promotion: Int op Int stays Int (checked), any Real operand
//! promotes to Real. Division always produces a Real.

use calx_ir::BinaryOp;

use crate::errors::{integer_overflow, invalid_operands, EvalResult};
use crate::value::{int_to_real, Data, Value, ValueKind};

/// Checked arithmetic operation with overflow handling.
#[inline]
fn checked_arith(result: Option<i64>, op_name: &'static str) -> EvalResult {
    result.map(Value::int).ok_or_else(|| integer_overflow(op_name))
}

/// Evaluate a binary operation using direct pattern matching.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    let l = left.borrow();
    let r = right.borrow();
    match (&*l, &*r) {
        (Data::Int(a), Data::Int(b)) => eval_int_binary(*a, *b, op),
        (Data::Real(a), Data::Real(b)) => eval_real_binary(*a, *b, op),
        (Data::Int(a), Data::Real(b)) => eval_real_binary(int_to_real(*a), *b, op),
        (Data::Real(a), Data::Int(b)) => eval_real_binary(*a, int_to_real(*b), op),
        (Data::Bool(a), Data::Bool(b)) => eval_bool_binary(*a, *b, op),
        (Data::Str(a), Data::Str(b)) => eval_string_binary(a, b, op),
        (Data::List(a), Data::List(b)) if op == BinaryOp::Add => {
            // Concatenation shares the element identities of both operands.
            Ok(Value::list(a.iter().chain(b.iter()).cloned().collect()))
        }
        (a, b) => Err(invalid_operands(op, a.kind(), b.kind())),
    }
}

fn eval_int_binary(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => checked_arith(a.checked_add(b), "addition"),
        BinaryOp::Sub => checked_arith(a.checked_sub(b), "subtraction"),
        BinaryOp::Mul => checked_arith(a.checked_mul(b), "multiplication"),
        BinaryOp::Div => Ok(Value::real(int_to_real(a) / int_to_real(b))),
        BinaryOp::Eq => Ok(Value::bool(a == b)),
        BinaryOp::NotEq => Ok(Value::bool(a != b)),
        BinaryOp::Lt => Ok(Value::bool(a < b)),
        BinaryOp::LtEq => Ok(Value::bool(a <= b)),
        BinaryOp::Gt => Ok(Value::bool(a > b)),
        BinaryOp::GtEq => Ok(Value::bool(a >= b)),
        BinaryOp::And | BinaryOp::Or => Err(invalid_operands(
            op,
            ValueKind::Int,
            ValueKind::Int,
        )),
    }
}

#[expect(clippy::float_cmp, reason = "language equality on reals is exact")]
fn eval_real_binary(a: f64, b: f64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::real(a + b)),
        BinaryOp::Sub => Ok(Value::real(a - b)),
        BinaryOp::Mul => Ok(Value::real(a * b)),
        BinaryOp::Div => Ok(Value::real(a / b)),
        BinaryOp::Eq => Ok(Value::bool(a == b)),
        BinaryOp::NotEq => Ok(Value::bool(a != b)),
        BinaryOp::Lt => Ok(Value::bool(a < b)),
        BinaryOp::LtEq => Ok(Value::bool(a <= b)),
        BinaryOp::Gt => Ok(Value::bool(a > b)),
        BinaryOp::GtEq => Ok(Value::bool(a >= b)),
        BinaryOp::And | BinaryOp::Or => Err(invalid_operands(
            op,
            ValueKind::Real,
            ValueKind::Real,
        )),
    }
}

fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::And => Ok(Value::bool(a && b)),
        BinaryOp::Or => Ok(Value::bool(a || b)),
        BinaryOp::Eq => Ok(Value::bool(a == b)),
        BinaryOp::NotEq => Ok(Value::bool(a != b)),
        _ => Err(invalid_operands(
            op,
            ValueKind::Bool,
            ValueKind::Bool,
        )),
    }
}

fn eval_string_binary(a: &str, b: &str, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::string(format!("{a}{b}"))),
        BinaryOp::Eq => Ok(Value::bool(a == b)),
        BinaryOp::NotEq => Ok(Value::bool(a != b)),
        BinaryOp::Lt => Ok(Value::bool(a < b)),
        BinaryOp::LtEq => Ok(Value::bool(a <= b)),
        BinaryOp::Gt => Ok(Value::bool(a > b)),
        BinaryOp::GtEq => Ok(Value::bool(a >= b)),
        _ => Err(invalid_operands(
            op,
            ValueKind::Str,
            ValueKind::Str,
        )),
    }
}
