//! Runtime values.
//!
//! A [`Value`] is a shared, mutable identity: cloning the handle acquires a
//! new reference to the same cell, and [`Value::assign`] mutates the cell in
//! place so every environment frame and list slot holding that identity
//! observes the change. Structural copies go through [`Value::duplicate`].

mod closure;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use calx_ir::{format_real, StringLookup};

pub use closure::{Captured, Closure};

/// Runtime kind tag of a [`Value`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Real,
    Str,
    Void,
    List,
    Closure,
}

impl ValueKind {
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Real => "real",
            ValueKind::Str => "string",
            ValueKind::Void => "void",
            ValueKind::List => "list",
            ValueKind::Closure => "closure",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value had the wrong kind for the position it was used in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, found {got}")]
pub struct KindMismatch {
    pub expected: &'static str,
    pub got: ValueKind,
}

impl KindMismatch {
    pub fn new(expected: &'static str, got: ValueKind) -> Self {
        KindMismatch { expected, got }
    }
}

/// Failure of a value-level operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error(transparent)]
    Kind(#[from] KindMismatch),
    #[error("index {index} out of bounds for list of length {len}")]
    OutOfBounds { index: i64, len: usize },
    #[error("integer overflow in {operation}")]
    Overflow { operation: &'static str },
    #[error("list would contain itself")]
    Cycle,
}

/// Payload of a value cell.
#[derive(Clone, Debug)]
pub enum Data {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Void,
    List(Vec<Value>),
    Closure(Closure),
}

impl Data {
    pub fn kind(&self) -> ValueKind {
        match self {
            Data::Bool(_) => ValueKind::Bool,
            Data::Int(_) => ValueKind::Int,
            Data::Real(_) => ValueKind::Real,
            Data::Str(_) => ValueKind::Str,
            Data::Void => ValueKind::Void,
            Data::List(_) => ValueKind::List,
            Data::Closure(_) => ValueKind::Closure,
        }
    }
}

/// Handle to a shared, mutable value cell.
#[derive(Clone)]
pub struct Value(Rc<RefCell<Data>>);

impl Value {
    pub fn new(data: Data) -> Self {
        Value(Rc::new(RefCell::new(data)))
    }

    pub fn bool(b: bool) -> Self {
        Value::new(Data::Bool(b))
    }

    pub fn int(n: i64) -> Self {
        Value::new(Data::Int(n))
    }

    pub fn real(r: f64) -> Self {
        Value::new(Data::Real(r))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::new(Data::Str(s.into()))
    }

    pub fn void() -> Self {
        Value::new(Data::Void)
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::new(Data::List(items))
    }

    pub fn closure(closure: Closure) -> Self {
        Value::new(Data::Closure(closure))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, Data> {
        self.0.borrow()
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.0.borrow().kind()
    }

    /// True when both handles refer to the same cell.
    #[inline]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of handles to this cell.
    pub(crate) fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.borrow() {
            Data::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &*self.borrow() {
            Data::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Int or Real, promoted to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match &*self.borrow() {
            Data::Int(n) => Some(int_to_real(*n)),
            Data::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<Closure> {
        match &*self.borrow() {
            Data::Closure(c) => Some(c.clone()),
            _ => None,
        }
    }

    pub fn is_closure(&self) -> bool {
        matches!(&*self.borrow(), Data::Closure(_))
    }

    /// Snapshot of a list's element handles.
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match &*self.borrow() {
            Data::List(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Replace the captured environment of a closure cell. No-op for other kinds.
    pub(crate) fn set_capture(&self, captured: Captured) {
        if let Data::Closure(c) = &mut *self.0.borrow_mut() {
            c.set_captured(captured);
        }
    }

    /// Render for display.
    pub fn render(&self, names: &dyn StringLookup) -> String {
        self.render_with(names, false)
    }

    /// Render with every closure, including list elements, shown as `λ`.
    ///
    /// Environment rendering uses this: a closure's environment may bind a
    /// list holding that very closure.
    pub fn render_compact(&self, names: &dyn StringLookup) -> String {
        self.render_with(names, true)
    }

    fn render_with(&self, names: &dyn StringLookup, compact: bool) -> String {
        match &*self.borrow() {
            Data::Bool(b) => b.to_string(),
            Data::Int(n) => n.to_string(),
            Data::Real(r) => format_real(*r),
            Data::Str(s) => s.clone(),
            Data::Void => "(void-val)".to_string(),
            Data::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| v.render_with(names, compact))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            Data::Closure(_) if compact => "λ".to_string(),
            Data::Closure(c) => c.render(names),
        }
    }

    /// True when `target` is this cell or is nested inside it through lists.
    pub fn reaches(&self, target: &Value) -> bool {
        if self.ptr_eq(target) {
            return true;
        }
        match &*self.borrow() {
            Data::List(items) => items.iter().any(|item| item.reaches(target)),
            _ => false,
        }
    }

    /// Independent copy: deep for lists, shared capture for closures.
    ///
    /// A closure whose capture is a recursive back-reference gets a strong
    /// capture in the copy.
    pub fn duplicate(&self) -> Value {
        let data = match &*self.borrow() {
            Data::List(items) => Data::List(items.iter().map(Value::duplicate).collect()),
            Data::Closure(c) => Data::Closure(c.detached()),
            other => other.clone(),
        };
        Value::new(data)
    }

    /// Overwrite this cell with the contents of `other`, in place.
    ///
    /// Fails without mutating when the kinds differ, or when a list would end
    /// up containing itself. A list takes over `other`'s element handles; a
    /// closure takes over its parameters, body and capture.
    pub fn assign(&self, other: &Value) -> Result<(), ValueError> {
        if self.ptr_eq(other) {
            return Ok(());
        }
        let replacement = match &*other.borrow() {
            Data::Closure(c) => Data::Closure(c.detached()),
            data => data.clone(),
        };
        if let Data::List(items) = &replacement {
            if items.iter().any(|item| item.reaches(self)) {
                return Err(ValueError::Cycle);
            }
        }
        let mut slot = self.0.borrow_mut();
        let expected = slot.kind();
        if expected != replacement.kind() {
            return Err(KindMismatch::new(expected.name(), replacement.kind()).into());
        }
        *slot = replacement;
        Ok(())
    }

    /// Range-checked element read. Returns the element's identity.
    pub fn get(&self, index: i64) -> Result<Value, ValueError> {
        match &*self.borrow() {
            Data::List(items) => list_index(index, items.len())
                .map(|i| items[i].clone())
                .ok_or(ValueError::OutOfBounds {
                    index,
                    len: items.len(),
                }),
            other => Err(KindMismatch::new("list", other.kind()).into()),
        }
    }

    /// Insert before position `index`; `index == len` appends.
    ///
    /// A list cannot be inserted into itself, directly or through nesting.
    pub fn insert(&self, index: i64, value: Value) -> Result<(), ValueError> {
        if value.reaches(self) {
            return Err(ValueError::Cycle);
        }
        match &mut *self.0.borrow_mut() {
            Data::List(items) => {
                let len = items.len();
                match usize::try_from(index) {
                    Ok(i) if i <= len => {
                        items.insert(i, value);
                        Ok(())
                    }
                    _ => Err(ValueError::OutOfBounds { index, len }),
                }
            }
            other => Err(KindMismatch::new("list", other.kind()).into()),
        }
    }

    /// Remove and return the element at `index`.
    pub fn remove(&self, index: i64) -> Result<Value, ValueError> {
        match &mut *self.0.borrow_mut() {
            Data::List(items) => {
                let len = items.len();
                list_index(index, len)
                    .map(|i| items.remove(i))
                    .ok_or(ValueError::OutOfBounds { index, len })
            }
            other => Err(KindMismatch::new("list", other.kind()).into()),
        }
    }

    /// Half-open slice `[from, to)` sharing the selected element handles.
    ///
    /// Missing bounds default to the list ends; out-of-range bounds clip.
    pub fn slice(&self, from: Option<i64>, to: Option<i64>) -> Result<Value, ValueError> {
        match &*self.borrow() {
            Data::List(items) => {
                let len = items.len();
                let clip = |bound: i64| usize::try_from(bound.max(0)).map_or(len, |b| b.min(len));
                let start = from.map_or(0, clip);
                let end = to.map_or(len, clip);
                let selected = if start < end {
                    items[start..end].to_vec()
                } else {
                    Vec::new()
                };
                Ok(Value::list(selected))
            }
            other => Err(KindMismatch::new("list", other.kind()).into()),
        }
    }

    /// `|v|`: absolute value of a number, element count of a list.
    pub fn magnitude(&self) -> Result<Value, ValueError> {
        match &*self.borrow() {
            Data::Int(n) => n
                .checked_abs()
                .map(Value::int)
                .ok_or(ValueError::Overflow {
                    operation: "magnitude",
                }),
            Data::Real(r) => Ok(Value::real(r.abs())),
            Data::List(items) => Ok(Value::int(i64::try_from(items.len()).unwrap_or(i64::MAX))),
            other => Err(KindMismatch::new("number or list", other.kind()).into()),
        }
    }
}

/// Convert a possibly negative index into a position below `len`.
fn list_index(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < len)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "int to real promotion is lossy by definition"
)]
pub(crate) fn int_to_real(n: i64) -> f64 {
    n as f64
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.borrow(), f)
    }
}

/// Structural equality. Closures compare by shared body and parameters.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (&*self.borrow(), &*other.borrow()) {
            (Data::Bool(a), Data::Bool(b)) => a == b,
            (Data::Int(a), Data::Int(b)) => a == b,
            (Data::Real(a), Data::Real(b)) => a == b,
            (Data::Str(a), Data::Str(b)) => a == b,
            (Data::Void, Data::Void) => true,
            (Data::List(a), Data::List(b)) => a == b,
            (Data::Closure(a), Data::Closure(b)) => a.same_function(b),
            _ => false,
        }
    }
}
