//! Closure values and their captured environments.

use std::fmt;
use std::rc::Rc;

use calx_ir::{Expr, Name, StringLookup};

use crate::environment::{Environment, WeakEnvironment};

/// How a closure holds on to the environment it was created in.
#[derive(Clone)]
pub enum Captured {
    /// Ordinary capture.
    Owned(Environment),
    /// Back-reference to the environment of the `let` that bound this
    /// closure. The environment contains the closure itself, so a strong
    /// reference here would be a cycle.
    Recursive(WeakEnvironment),
}

/// A function value: parameters, body and captured environment.
#[derive(Clone)]
pub struct Closure {
    pub params: Rc<[Name]>,
    pub body: Rc<Expr>,
    captured: Captured,
}

impl Closure {
    pub fn new(params: Rc<[Name]>, body: Rc<Expr>, env: Environment) -> Self {
        Closure {
            params,
            body,
            captured: Captured::Owned(env),
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The captured environment, or `None` if a recursive capture outlived
    /// its `let`.
    pub fn environment(&self) -> Option<Environment> {
        match &self.captured {
            Captured::Owned(env) => Some(env.clone()),
            Captured::Recursive(weak) => weak.upgrade(),
        }
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self.captured, Captured::Recursive(_))
    }

    /// Copy of this closure whose capture is strong where possible.
    pub fn detached(&self) -> Closure {
        let captured = match &self.captured {
            Captured::Owned(env) => Captured::Owned(env.clone()),
            Captured::Recursive(weak) => weak
                .upgrade()
                .map_or_else(|| Captured::Recursive(weak.clone()), Captured::Owned),
        };
        Closure {
            params: Rc::clone(&self.params),
            body: Rc::clone(&self.body),
            captured,
        }
    }

    pub(crate) fn set_captured(&mut self, captured: Captured) {
        self.captured = captured;
    }

    /// Same parameters and the very same body node.
    pub fn same_function(&self, other: &Closure) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && self.params == other.params
    }

    /// `λx,y.body | {env}`
    pub fn render(&self, names: &dyn StringLookup) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| names.lookup(*p)).collect();
        let env = self
            .environment()
            .map_or_else(|| "{<released>}".to_string(), |env| env.render(names));
        format!(
            "λ{}.{} | {}",
            params.join(","),
            self.body.display(names),
            env
        )
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body.kind_name())
            .field("recursive", &self.is_recursive())
            .finish_non_exhaustive()
    }
}
