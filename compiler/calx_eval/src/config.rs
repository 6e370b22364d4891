//! Evaluation configuration.
//!
//! Passed explicitly to the interpreter; nothing here is process-wide.

/// How the evaluator treats recoverable misuse.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strictness {
    /// Recoverable misuse is reported as a warning and evaluation continues.
    ///
    /// `map f over v` with a non-list `v` applies `f` to `v` directly.
    #[default]
    Permissive,
    /// Recoverable misuse is an error.
    Strict,
}

impl Strictness {
    #[inline]
    pub fn is_strict(self) -> bool {
        matches!(self, Strictness::Strict)
    }
}

/// Interpreter configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EvalConfig {
    pub strictness: Strictness,
    /// Maximum closure call depth. `None` means unlimited; the native stack
    /// grows on demand instead.
    pub max_call_depth: Option<usize>,
}

impl EvalConfig {
    /// Strict configuration: warnings become errors.
    pub fn strict() -> Self {
        EvalConfig {
            strictness: Strictness::Strict,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = Some(depth);
        self
    }
}
