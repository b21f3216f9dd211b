pub mod behavior_bounds; // Where-clause verification at instantiation time
pub mod builtin_contracts; // Builtin behavior implementations for primitives
pub mod codegen; // Modular LLVM IR emission
pub mod type_registry; // Builtin type name registry for O(1) lookup
pub mod types; // Type interning and utilities

// Re-export diagnostics from tml-diagnostics crate
pub use tml_diagnostics as diagnostics;

pub use behavior_bounds::BehaviorBoundsChecker;
pub use codegen::errors::{CodegenError, CodegenErrorKind};
pub use codegen::{CodegenOptions, LlvmIrGen};
pub use diagnostics::{error_codes, Diagnostic, DiagnosticEngine, ErrorLevel, Span};
pub use types::interner::TypeInterner;
