//! Error types for the HIR data model, mirroring the shape of
//! `otter-vm-bytecode::error::BytecodeError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HirError {
    #[error("duplicate struct type: {0}")]
    DuplicateStruct(String),

    #[error("duplicate function: {0}")]
    DuplicateFunction(String),

    #[error("unknown struct type: {0}")]
    UnknownStruct(String),

    #[error("internal HIR builder invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, HirError>;
