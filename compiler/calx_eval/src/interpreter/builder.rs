//! Builder for [`Interpreter`].

use calx_diagnostic::{DiagnosticConfig, DiagnosticQueue};
use calx_ir::StringLookup;

use super::Interpreter;
use crate::config::{EvalConfig, Strictness};
use crate::print_handler::{stdout_handler, SharedPrintHandler};

/// Builder for creating [`Interpreter`] instances with various configurations.
pub struct InterpreterBuilder<'a> {
    names: &'a dyn StringLookup,
    config: EvalConfig,
    print_handler: Option<SharedPrintHandler>,
    diagnostic_config: DiagnosticConfig,
}

impl<'a> InterpreterBuilder<'a> {
    pub fn new(names: &'a dyn StringLookup) -> Self {
        InterpreterBuilder {
            names,
            config: EvalConfig::default(),
            print_handler: None,
            diagnostic_config: DiagnosticConfig::default(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.config.strictness = strictness;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = Some(depth);
        self
    }

    /// Set the print handler. Defaults to stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn diagnostic_config(mut self, config: DiagnosticConfig) -> Self {
        self.diagnostic_config = config;
        self
    }

    pub fn build(self) -> Interpreter<'a> {
        Interpreter {
            names: self.names,
            config: self.config,
            print_handler: self.print_handler.unwrap_or_else(stdout_handler),
            diagnostics: DiagnosticQueue::with_config(self.diagnostic_config),
            call_depth: 0,
        }
    }
}
