// Codegen error type
// Errors are collected per emission, not thrown; see program.rs

use thiserror::Error;
use tml_ast::SourceSpan;
use tml_diagnostics::{error_codes, Diagnostic, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodegenErrorKind {
    #[error("unknown symbol")]
    UnknownSymbol,
    #[error("unresolved generic")]
    UnresolvedGeneric,
    #[error("duplicate definition")]
    DuplicateDefinition,
    #[error("layout overflow")]
    LayoutOverflow,
    #[error("malformed mangled name")]
    MalformedMangledName,
    #[error("extern ABI mismatch")]
    ExternAbiMismatch,
    #[error("internal invariant violated")]
    InternalInvariant,
}

impl CodegenErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            CodegenErrorKind::UnknownSymbol => error_codes::UNKNOWN_SYMBOL,
            CodegenErrorKind::UnresolvedGeneric => error_codes::UNRESOLVED_GENERIC,
            CodegenErrorKind::DuplicateDefinition => error_codes::DUPLICATE_DEFINITION,
            CodegenErrorKind::LayoutOverflow => error_codes::LAYOUT_OVERFLOW,
            CodegenErrorKind::MalformedMangledName => error_codes::MALFORMED_MANGLED_NAME,
            CodegenErrorKind::ExternAbiMismatch => error_codes::EXTERN_ABI_MISMATCH,
            CodegenErrorKind::InternalInvariant => error_codes::INTERNAL_INVARIANT,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct CodegenError {
    pub kind: CodegenErrorKind,
    pub message: String,
    pub span: SourceSpan,
}

impl CodegenError {
    pub fn new(kind: CodegenErrorKind, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn unknown_symbol(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(CodegenErrorKind::UnknownSymbol, message, span)
    }

    pub fn unresolved_generic(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(CodegenErrorKind::UnresolvedGeneric, message, span)
    }

    pub fn duplicate_definition(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(CodegenErrorKind::DuplicateDefinition, message, span)
    }

    pub fn layout_overflow(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(CodegenErrorKind::LayoutOverflow, message, span)
    }

    pub fn malformed_mangled_name(message: impl Into<String>) -> Self {
        Self::new(
            CodegenErrorKind::MalformedMangledName,
            message,
            SourceSpan::unknown(),
        )
    }

    pub fn extern_abi_mismatch(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(CodegenErrorKind::ExternAbiMismatch, message, span)
    }

    pub fn internal(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(CodegenErrorKind::InternalInvariant, message, span)
    }

    /// Render as a diagnostic against the module's source file
    pub fn to_diagnostic(&self, file: &str) -> Diagnostic {
        Diagnostic::error(
            self.kind.code(),
            self.message.clone(),
            Span::at(file, self.span.line, self.span.column),
        )
    }
}

// Buffer writes go through std::fmt::Write; a formatting failure is an
// emitter invariant violation, not a user error.
impl From<std::fmt::Error> for CodegenError {
    fn from(e: std::fmt::Error) -> Self {
        CodegenError::internal(format!("IR buffer write failed: {}", e), SourceSpan::unknown())
    }
}

pub type CgResult<T> = Result<T, CodegenError>;
