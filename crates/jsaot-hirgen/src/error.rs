//! Error/diagnostic types, matching the shape of
//! `otter-vm-compiler::error::CompileError`.

use thiserror::Error;

/// A source location, reused across diagnostics the way
/// `otter-vm-compiler::error::SourceLocation` does (if our AST carried spans
/// it would live here; lowering currently stamps `0:0` since spans are an
/// upstream-parser concern, §1 out-of-scope).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Semantic-error diagnostics (§7): recorded and the pass continues,
/// maximizing reported errors per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Fatal lowering errors (§7 "unsupported"/"internal"): returned as `Err`
/// and abort the pass immediately, unlike [`Diagnostic`]s.
#[derive(Debug, Error)]
pub enum LowerError {
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Hir(#[from] jsaot_hir::HirError),
}

impl LowerError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type LowerResult<T> = std::result::Result<T, LowerError>;
