//! Expression nodes.
//!
//! The tree is immutable once built. Children are owned exclusively; the only
//! shared subtrees are lambda bodies and derivative targets, which closures
//! and derivative closures hold on to after the enclosing tree is gone.

use std::rc::Rc;

use super::{BinaryOp, MathFn};
use crate::Name;

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    // Literals
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),

    /// Variable reference.
    Var(Name),

    /// `lambda (x, y) body`
    Lambda { params: Rc<[Name]>, body: Rc<Expr> },

    /// `f(a, b)`
    Apply { func: Box<Expr>, args: Vec<Expr> },

    /// `let x = a, y = b; body`
    ///
    /// Closures bound here see every binding of the same `let`.
    Let { bindings: Vec<Binding>, body: Box<Expr> },

    /// `first; rest`, or just `first` when `rest` is absent.
    Seq {
        first: Box<Expr>,
        rest: Option<Box<Expr>>,
    },

    /// `if cond then a else b`
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `while (cond) { body }`, or `do { body } while (cond)` when
    /// `always_enter` is set.
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
        always_enter: bool,
    },

    /// `for var in iter body`
    For {
        var: Name,
        iter: Box<Expr>,
        body: Box<Expr>,
    },

    /// `target = value` assignments, applied in order.
    Set(Vec<Assignment>),

    /// `[a, b, c]`
    List(Vec<Expr>),

    /// `list[index]`
    Index { list: Box<Expr>, index: Box<Expr> },

    /// `insert value into list at index`
    Insert {
        list: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },

    /// `remove index from list`
    Remove { list: Box<Expr>, index: Box<Expr> },

    /// `list[from:to]`, either bound optional.
    Slice {
        list: Box<Expr>,
        from: Option<Box<Expr>>,
        to: Option<Box<Expr>>,
    },

    /// `|e|`
    Magnitude(Box<Expr>),

    /// `||e||`
    Norm(Box<Expr>),

    /// `fold list into func at base`
    Fold {
        list: Box<Expr>,
        func: Box<Expr>,
        base: Box<Expr>,
    },

    /// `map func over list`
    Map { func: Box<Expr>, list: Box<Expr> },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `not e`
    Not(Box<Expr>),

    /// `sin e`, `cos e`, `log e`, `sqrt e`
    Math { func: MathFn, arg: Box<Expr> },

    /// `print a b c`
    Print(Vec<Expr>),

    /// `d/dx func`
    Derivative { func: Rc<Expr>, var: Name },
}

/// One `name = value` binding of a `let`.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub name: Name,
    pub value: Expr,
}

/// One `target = value` assignment of a `Set`.
///
/// The target is usually a variable, but any expression that denotes an
/// existing value (such as `xs[0]`) is accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub target: Expr,
    pub value: Expr,
}

impl Binding {
    pub fn new(name: Name, value: Expr) -> Self {
        Binding { name, value }
    }
}

impl Assignment {
    pub fn new(target: Expr, value: Expr) -> Self {
        Assignment { target, value }
    }
}

impl Expr {
    pub fn var(name: Name) -> Expr {
        Expr::Var(name)
    }

    pub fn string(s: impl Into<String>) -> Expr {
        Expr::Str(s.into())
    }

    pub fn lambda(params: impl Into<Rc<[Name]>>, body: Expr) -> Expr {
        Expr::Lambda {
            params: params.into(),
            body: Rc::new(body),
        }
    }

    pub fn apply(func: Expr, args: Vec<Expr>) -> Expr {
        Expr::Apply {
            func: Box::new(func),
            args,
        }
    }

    pub fn let_in(bindings: Vec<Binding>, body: Expr) -> Expr {
        Expr::Let {
            bindings,
            body: Box::new(body),
        }
    }

    /// Single-binding `let`.
    pub fn let1(name: Name, value: Expr, body: Expr) -> Expr {
        Expr::let_in(vec![Binding::new(name, value)], body)
    }

    pub fn seq(first: Expr, rest: Expr) -> Expr {
        Expr::Seq {
            first: Box::new(first),
            rest: Some(Box::new(rest)),
        }
    }

    /// Right-nested sequence of `exprs`; `None` when empty.
    pub fn block(exprs: Vec<Expr>) -> Option<Expr> {
        exprs.into_iter().rev().fold(None, |rest, first| {
            Some(Expr::Seq {
                first: Box::new(first),
                rest: rest.map(Box::new),
            })
        })
    }

    pub fn if_else(cond: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
        Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn while_loop(cond: Expr, body: Expr) -> Expr {
        Expr::While {
            cond: Box::new(cond),
            body: Box::new(body),
            always_enter: false,
        }
    }

    pub fn do_while(body: Expr, cond: Expr) -> Expr {
        Expr::While {
            cond: Box::new(cond),
            body: Box::new(body),
            always_enter: true,
        }
    }

    pub fn for_in(var: Name, iter: Expr, body: Expr) -> Expr {
        Expr::For {
            var,
            iter: Box::new(iter),
            body: Box::new(body),
        }
    }

    /// Single assignment `target = value`.
    pub fn set(target: Expr, value: Expr) -> Expr {
        Expr::Set(vec![Assignment::new(target, value)])
    }

    pub fn list(items: Vec<Expr>) -> Expr {
        Expr::List(items)
    }

    pub fn index(list: Expr, index: Expr) -> Expr {
        Expr::Index {
            list: Box::new(list),
            index: Box::new(index),
        }
    }

    pub fn insert(value: Expr, list: Expr, index: Expr) -> Expr {
        Expr::Insert {
            list: Box::new(list),
            index: Box::new(index),
            value: Box::new(value),
        }
    }

    pub fn remove(index: Expr, list: Expr) -> Expr {
        Expr::Remove {
            list: Box::new(list),
            index: Box::new(index),
        }
    }

    pub fn slice(list: Expr, from: Option<Expr>, to: Option<Expr>) -> Expr {
        Expr::Slice {
            list: Box::new(list),
            from: from.map(Box::new),
            to: to.map(Box::new),
        }
    }

    pub fn magnitude(e: Expr) -> Expr {
        Expr::Magnitude(Box::new(e))
    }

    pub fn norm(e: Expr) -> Expr {
        Expr::Norm(Box::new(e))
    }

    pub fn fold(list: Expr, func: Expr, base: Expr) -> Expr {
        Expr::Fold {
            list: Box::new(list),
            func: Box::new(func),
            base: Box::new(base),
        }
    }

    pub fn map(func: Expr, list: Expr) -> Expr {
        Expr::Map {
            func: Box::new(func),
            list: Box::new(list),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn sum(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, left, right)
    }

    pub fn difference(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, left, right)
    }

    pub fn product(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, left, right)
    }

    pub fn quotient(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, left, right)
    }

    pub fn logical_not(e: Expr) -> Expr {
        Expr::Not(Box::new(e))
    }

    pub fn math(func: MathFn, arg: Expr) -> Expr {
        Expr::Math {
            func,
            arg: Box::new(arg),
        }
    }

    pub fn print(args: Vec<Expr>) -> Expr {
        Expr::Print(args)
    }

    pub fn derivative(func: Expr, var: Name) -> Expr {
        Expr::Derivative {
            func: Rc::new(func),
            var,
        }
    }

    /// True for literal nodes, whose value never depends on the environment.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Bool(_) | Expr::Int(_) | Expr::Real(_) | Expr::Str(_)
        )
    }

    /// Short name of the node kind, used in trace output and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Bool(_) => "bool",
            Expr::Int(_) => "int",
            Expr::Real(_) => "real",
            Expr::Str(_) => "string",
            Expr::Var(_) => "variable",
            Expr::Lambda { .. } => "lambda",
            Expr::Apply { .. } => "application",
            Expr::Let { .. } => "let",
            Expr::Seq { .. } => "sequence",
            Expr::If { .. } => "if",
            Expr::While { .. } => "while",
            Expr::For { .. } => "for",
            Expr::Set(_) => "set",
            Expr::List(_) => "list",
            Expr::Index { .. } => "list access",
            Expr::Insert { .. } => "insert",
            Expr::Remove { .. } => "remove",
            Expr::Slice { .. } => "slice",
            Expr::Magnitude(_) => "magnitude",
            Expr::Norm(_) => "norm",
            Expr::Fold { .. } => "fold",
            Expr::Map { .. } => "map",
            Expr::Binary { op, .. } => op.as_symbol(),
            Expr::Not(_) => "not",
            Expr::Math { func, .. } => func.name(),
            Expr::Print(_) => "print",
            Expr::Derivative { .. } => "derivative",
        }
    }
}
