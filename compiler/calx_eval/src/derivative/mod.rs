//! Differentiation.
//!
//! Two strategies share the expression, value and environment types:
//!
//! - [`symbolic_derivative`] rewrites an expression tree into the tree of
//!   its derivative, without looking at any environment. Forms with no
//!   closed-form rule are deferred as `d/dx node`.
//! - Forward mode (`Interpreter::derivative_of`) evaluates a `d/dx e` node
//!   against the live environment, next to a shadow environment holding the
//!   derivative of every binding (see [`shadow_environment`]).

mod forward;
mod shadow;
mod symbolic;

pub use shadow::{derive_closure, elementary_derivative, shadow_environment};
pub use symbolic::symbolic_derivative;
