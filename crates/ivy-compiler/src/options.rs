//! Compiler configuration.

/// Options for a single compile.
///
/// ```
/// use ivy_compiler::CompileOptions;
///
/// let options = CompileOptions::new().with_optimize(false);
/// assert!(!options.optimize);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run the peephole optimizer over the emitted tokens.
    pub optimize: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self { optimize: true }
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new()
    }
}
