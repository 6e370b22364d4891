//! Expression tree and interned names for the Calx evaluator.
//!
//! The tree is built once (by a parser or by hand through the `Expr`
//! constructors) and is read-only afterwards. The evaluator and the
//! differentiation engine in `calx_eval` both consume it.

mod ast;
mod display;
mod interner;
mod name;

pub use ast::{Assignment, BinaryOp, Binding, Expr, MathFn};
pub use display::{format_real, ExprDisplay};
pub use interner::{InternError, StringInterner, StringLookup};
pub use name::Name;
