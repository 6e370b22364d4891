//! Source-like rendering of expressions.
//!
//! Closures render their body with this, so the output doubles as the
//! textual form users see for function values.

use std::fmt::{self, Write as _};

use crate::ast::Expr;
use crate::StringLookup;

/// Format a real the way values print: six fractional digits.
pub fn format_real(value: f64) -> String {
    format!("{value:.6}")
}

/// `Display` adapter pairing an expression with the interner that owns its names.
pub struct ExprDisplay<'a> {
    expr: &'a Expr,
    names: &'a dyn StringLookup,
}

impl Expr {
    pub fn display<'a>(&'a self, names: &'a dyn StringLookup) -> ExprDisplay<'a> {
        ExprDisplay { expr: self, names }
    }
}

impl ExprDisplay<'_> {
    fn child<'b>(&'b self, expr: &'b Expr) -> ExprDisplay<'b> {
        ExprDisplay {
            expr,
            names: self.names,
        }
    }

    /// Render `expr`, parenthesized unless it is a bare variable.
    fn atom(&self, f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
        if let Expr::Var(_) = expr {
            write!(f, "{}", self.child(expr))
        } else {
            write!(f, "({})", self.child(expr))
        }
    }

    fn comma_separated(&self, f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", self.child(item))?;
        }
        Ok(())
    }
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Real(r) => write!(f, "{}f", format_real(*r)),
            Expr::Str(s) => write!(f, "\"{s}\""),
            Expr::Var(name) => f.write_str(self.names.lookup(*name)),
            Expr::Lambda { params, body } => {
                f.write_str("lambda (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(self.names.lookup(*param))?;
                }
                f.write_str(") ")?;
                if matches!(**body, Expr::Let { .. } | Expr::Seq { .. }) {
                    write!(f, "({})", self.child(body))
                } else {
                    write!(f, "{}", self.child(body))
                }
            }
            Expr::Apply { func, args } => {
                self.atom(f, func)?;
                f.write_char('(')?;
                self.comma_separated(f, args)?;
                f.write_char(')')
            }
            Expr::Let { bindings, body } => {
                f.write_str("let ")?;
                for (i, binding) in bindings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(
                        f,
                        "{} = {}",
                        self.names.lookup(binding.name),
                        self.child(&binding.value)
                    )?;
                }
                write!(f, "; {}", self.child(body))
            }
            Expr::Seq { first, rest } => {
                write!(f, "{}", self.child(first))?;
                if let Some(rest) = rest {
                    write!(f, "; {}", self.child(rest))?;
                }
                Ok(())
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => write!(
                f,
                "if {} then {} else {}",
                self.child(cond),
                self.child(then_branch),
                self.child(else_branch)
            ),
            Expr::While {
                cond,
                body,
                always_enter: true,
            } => write!(
                f,
                "do {{\n{}\n}} while ({})",
                self.child(body),
                self.child(cond)
            ),
            Expr::While { cond, body, .. } => write!(
                f,
                "while ({}) {{\n{}\n}}",
                self.child(cond),
                self.child(body)
            ),
            Expr::For { var, iter, body } => write!(
                f,
                "for {} in {} {}",
                self.names.lookup(*var),
                self.child(iter),
                self.child(body)
            ),
            Expr::Set(assignments) => {
                for (i, assignment) in assignments.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(
                        f,
                        "{} = {}",
                        self.child(&assignment.target),
                        self.child(&assignment.value)
                    )?;
                }
                Ok(())
            }
            Expr::List(items) => {
                f.write_char('[')?;
                self.comma_separated(f, items)?;
                f.write_char(']')
            }
            Expr::Index { list, index } => {
                write!(f, "{}[{}]", self.child(list), self.child(index))
            }
            Expr::Insert { list, index, value } => write!(
                f,
                "insert {} into {} at {}",
                self.child(value),
                self.child(list),
                self.child(index)
            ),
            Expr::Remove { list, index } => {
                write!(f, "remove {} from {}", self.child(index), self.child(list))
            }
            Expr::Slice { list, from, to } => {
                write!(f, "{}[", self.child(list))?;
                if let Some(from) = from {
                    write!(f, "{}", self.child(from))?;
                }
                f.write_char(':')?;
                if let Some(to) = to {
                    write!(f, "{}", self.child(to))?;
                }
                f.write_char(']')
            }
            Expr::Magnitude(e) => write!(f, "|{}|", self.child(e)),
            Expr::Norm(e) => write!(f, "||{}||", self.child(e)),
            Expr::Fold { list, func, base } => write!(
                f,
                "fold {} into {} at {}",
                self.child(list),
                self.child(func),
                self.child(base)
            ),
            Expr::Map { func, list } => {
                write!(f, "map {} over {}", self.child(func), self.child(list))
            }
            Expr::Binary { op, left, right } => write!(
                f,
                "{} {} {}",
                self.child(left),
                op.as_symbol(),
                self.child(right)
            ),
            Expr::Not(e) => write!(f, "not {}", self.child(e)),
            Expr::Math { func, arg } => write!(f, "{} {}", func.name(), self.child(arg)),
            Expr::Print(args) => {
                f.write_str("print")?;
                for arg in args {
                    write!(f, " {}", self.child(arg))?;
                }
                Ok(())
            }
            Expr::Derivative { func, var } => {
                write!(f, "d/d{} ", self.names.lookup(*var))?;
                self.atom(f, func)
            }
        }
    }
}
