//! Expression tree.

mod expr;
mod operators;

pub use expr::{Assignment, Binding, Expr};
pub use operators::{BinaryOp, MathFn};
