//! Compilation passes, in pipeline order.
//!
//! 1. [`references`]: resolve identifiers and count uses
//! 2. [`typeck`]: infer and check types
//! 3. [`desugar`]: split composite parameters, match outputs, build dispatch
//! 4. [`intermediate`]: lower to symbolic operations
//! 5. [`stack`]: resolve names to stack positions
//! 6. [`emit`]: map operations to assembler tokens
//! 7. [`optimize`]: peephole rewrites

pub mod desugar;
pub mod emit;
pub mod intermediate;
pub mod optimize;
pub mod references;
pub mod stack;
pub mod typeck;

pub use desugar::desugar;
pub use emit::emit;
pub use intermediate::compile_to_intermediate;
pub use optimize::optimize;
pub use references::check_references;
pub use stack::allocate_stack;
pub use typeck::check_types;
