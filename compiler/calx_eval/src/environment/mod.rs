//! Persistent environment chains.
//!
//! An environment is either empty or a frame binding one name to one value
//! identity, with a shared parent. Extending never copies the parent, so
//! a closure's capture, its defining scope and a derivative shadow can all
//! share one tail.
//!
//! Lookups walk innermost-first; shadowing is allowed. Rebinding mutates the
//! bound value cell in place and never changes which names are visible.

use std::fmt;
use std::rc::{Rc, Weak};

use calx_ir::{Name, StringLookup};

use crate::value::{Value, ValueError};

/// Error returned by [`Environment::rebind`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    /// Variable not bound in any frame.
    #[error("variable is not bound")]
    NotFound,
    /// The bound value rejected the new value (kind mismatch, or a list
    /// that would contain itself).
    #[error(transparent)]
    Rejected(#[from] ValueError),
}

/// One binding link.
pub struct Frame {
    name: Name,
    value: Value,
    parent: Environment,
}

/// A chain of binding frames.
#[derive(Clone, Default)]
pub enum Environment {
    #[default]
    Empty,
    Extend(Rc<Frame>),
}

/// Non-owning reference to an environment chain.
#[derive(Clone, Default)]
pub enum WeakEnvironment {
    #[default]
    Empty,
    Extend(Weak<Frame>),
}

impl WeakEnvironment {
    /// The environment, if any owner still holds it.
    pub fn upgrade(&self) -> Option<Environment> {
        match self {
            WeakEnvironment::Empty => Some(Environment::Empty),
            WeakEnvironment::Extend(weak) => weak.upgrade().map(Environment::Extend),
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment::Empty
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Environment::Empty)
    }

    /// New frame binding `name` on top of this chain.
    #[must_use]
    pub fn extend(&self, name: Name, value: Value) -> Environment {
        Environment::Extend(Rc::new(Frame {
            name,
            value,
            parent: self.clone(),
        }))
    }

    /// Another reference to the same chain, for independent extension.
    #[must_use]
    pub fn duplicate(&self) -> Environment {
        self.clone()
    }

    pub fn downgrade(&self) -> WeakEnvironment {
        match self {
            Environment::Empty => WeakEnvironment::Empty,
            Environment::Extend(frame) => WeakEnvironment::Extend(Rc::downgrade(frame)),
        }
    }

    /// True when both refer to the same chain.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        match (self, other) {
            (Environment::Empty, Environment::Empty) => true,
            (Environment::Extend(a), Environment::Extend(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Frames innermost-first.
    pub fn iter(&self) -> Frames<'_> {
        Frames { next: self }
    }

    /// Innermost binding of `name`, as the bound value identity.
    pub fn lookup(&self, name: Name) -> Option<Value> {
        self.iter()
            .find(|(bound, _)| *bound == name)
            .map(|(_, value)| value.clone())
    }

    pub fn contains(&self, name: Name) -> bool {
        self.iter().any(|(bound, _)| bound == name)
    }

    /// Assign `value` into the cell currently bound to `name`.
    pub fn rebind(&self, name: Name, value: &Value) -> Result<(), AssignError> {
        let (_, slot) = self
            .iter()
            .find(|(bound, _)| *bound == name)
            .ok_or(AssignError::NotFound)?;
        slot.assign(value)?;
        Ok(())
    }

    /// Visible binding names, innermost-first, shadowed names included.
    pub fn names(&self) -> Vec<Name> {
        self.iter().map(|(name, _)| name).collect()
    }

    /// All bindings ordered outermost-first.
    pub fn frames(&self) -> Vec<(Name, Value)> {
        let mut frames: Vec<(Name, Value)> = self
            .iter()
            .map(|(name, value)| (name, value.clone()))
            .collect();
        frames.reverse();
        frames
    }

    /// `{x := 3, f := λ}`, innermost-first. Closures print as `λ`.
    pub fn render(&self, names: &dyn StringLookup) -> String {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, value)| {
                format!("{} := {}", names.lookup(name), value.render_compact(names))
            })
            .collect();
        format!("{{{}}}", parts.join(", "))
    }
}

/// Iterator over `(name, value)` bindings, innermost-first.
pub struct Frames<'a> {
    next: &'a Environment,
}

impl<'a> Iterator for Frames<'a> {
    type Item = (Name, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        match self.next {
            Environment::Empty => None,
            Environment::Extend(frame) => {
                self.next = &frame.parent;
                Some((frame.name, &frame.value))
            }
        }
    }
}

/// Unlinks uniquely owned parents iteratively so long chains don't overflow
/// the stack on drop.
impl Drop for Frame {
    fn drop(&mut self) {
        let mut next = std::mem::take(&mut self.parent);
        while let Environment::Extend(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(mut frame) => next = std::mem::take(&mut frame.parent),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(name, value)| (name, value.kind())))
            .finish()
    }
}
