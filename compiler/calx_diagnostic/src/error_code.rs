use std::fmt;

/// Error codes for runtime diagnostics.
///
/// Format: E#### where the first digit indicates the class:
/// - E6xxx: Evaluation errors
/// - E61xx: Evaluation warnings
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Evaluation Errors (E6xxx)
    /// Variable not bound in the environment
    E6001,
    /// Operand has the wrong kind for its position
    E6002,
    /// Binary operator not defined for the operand kinds
    E6003,
    /// Closure applied to the wrong number of arguments
    E6004,
    /// Value kind has no elementary derivative
    E6005,
    /// Expression form cannot be differentiated
    E6006,
    /// List index out of range
    E6007,
    /// Integer arithmetic overflow
    E6008,
    /// Call depth limit exceeded
    E6009,
    /// Closure called after its defining scope was released
    E6010,
    /// List operation would make a list contain itself
    E6011,

    // Evaluation Warnings (E61xx)
    /// `map` applied to a value that is not a list
    E6101,
}

impl ErrorCode {
    /// Get the code as a string (e.g., "E6001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E6001 => "E6001",
            ErrorCode::E6002 => "E6002",
            ErrorCode::E6003 => "E6003",
            ErrorCode::E6004 => "E6004",
            ErrorCode::E6005 => "E6005",
            ErrorCode::E6006 => "E6006",
            ErrorCode::E6007 => "E6007",
            ErrorCode::E6008 => "E6008",
            ErrorCode::E6009 => "E6009",
            ErrorCode::E6010 => "E6010",
            ErrorCode::E6011 => "E6011",
            ErrorCode::E6101 => "E6101",
        }
    }

    /// Short description, used as the fallback message.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E6001 => "unbound variable",
            ErrorCode::E6002 => "kind mismatch",
            ErrorCode::E6003 => "invalid operands",
            ErrorCode::E6004 => "arity mismatch",
            ErrorCode::E6005 => "undefined derivative",
            ErrorCode::E6006 => "expression is not differentiable",
            ErrorCode::E6007 => "index out of bounds",
            ErrorCode::E6008 => "integer overflow",
            ErrorCode::E6009 => "recursion limit exceeded",
            ErrorCode::E6010 => "released environment",
            ErrorCode::E6011 => "cyclic list",
            ErrorCode::E6101 => "map over non-list value",
        }
    }

    /// Check if this code is a warning rather than an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, ErrorCode::E6101)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
