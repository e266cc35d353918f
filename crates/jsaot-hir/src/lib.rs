//! `jsaot-hir` — the data model for the HIR tier of the jsaot ahead-of-time
//! compiler pipeline (HIR → MIR → LLVM IR).
//!
//! Design principles, in the order the modules below implement them:
//! - **Typed.** Every value carries a [`types::HirType`]; there is no untyped
//!   escape hatch besides the `any` primitive.
//! - **SSA-friendly.** Instruction results are fresh [`value::ValueId`]s;
//!   nothing is mutated in place except through explicit `store`/`set_*`
//!   opcodes.
//! - **Builder-disciplined.** [`block::IrBuilder`] holds exactly one current
//!   insertion point; every opcode constructor appends to it.
//! - **Serializable.** HIR modules round-trip through `serde` so the
//!   surrounding compiler can persist HIR dumps between pipeline stages.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod block;
pub mod error;
pub mod function;
pub mod instruction;
pub mod module;
pub mod types;
pub mod value;

pub use block::{BasicBlock, BlockId, IrBuilder};
pub use error::{HirError, Result};
pub use function::{Function, FunctionBuilder, Linkage, Parameter};
pub use instruction::{Instruction, Opcode};
pub use module::Module;
pub use types::{HirType, PrimitiveKind, StructField, StructType};
pub use value::{ValueData, ValueId, ValueKind};
