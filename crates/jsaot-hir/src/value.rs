//! C2 — HIR values: constants, function parameters, and instruction results.
//!
//! Values live in a per-function arena (`Function::values`) and are referred
//! to everywhere else by the lightweight [`ValueId`] handle, the same way
//! `otter-vm-bytecode::operand` hands out newtype indices (`Register`,
//! `ConstantIndex`, ...) instead of passing owned data around.

use serde::{Deserialize, Serialize};

use crate::types::HirType;

/// An index into a function's value arena. `#[repr(transparent)]` so it has
/// the same layout as the `u32` it wraps.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(u32);

impl ValueId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for ValueId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// What kind of value a [`ValueId`] refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Integer constant. Also used for the null/undefined sentinel (0) and
    /// for boolean literals (1/0, §4.2).
    ConstantInt(i64),
    /// Float constant (non-integer-valued numeric literals, §4.2).
    ConstantFloat(f64),
    /// Interned string constant.
    ConstantString(String),
    /// A typed null-for-type sentinel distinct from the integer 0 constant —
    /// used where downstream stages need to recover "this is a typed null"
    /// rather than "this is the number zero".
    NullSentinel,
    /// The `index`th parameter of the owning function.
    Param(u32),
    /// The result of an instruction at `(block, instruction index)`.
    InstructionResult { block: u32, instr: u32 },
}

/// A value's data: its kind plus the type it carries everywhere it flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueData {
    pub kind: ValueKind,
    pub ty: HirType,
}

impl ValueData {
    pub fn new(kind: ValueKind, ty: HirType) -> Self {
        Self { kind, ty }
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::ConstantInt(_)
                | ValueKind::ConstantFloat(_)
                | ValueKind::ConstantString(_)
                | ValueKind::NullSentinel
        )
    }

    /// The null sentinel is the integer constant zero (§3.2).
    pub fn is_null_sentinel(&self) -> bool {
        matches!(self.kind, ValueKind::NullSentinel)
            || matches!(self.kind, ValueKind::ConstantInt(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_id_roundtrips_through_u32() {
        let id = ValueId::from(7u32);
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn null_sentinel_is_integer_zero() {
        let v = ValueData::new(ValueKind::ConstantInt(0), HirType::i64());
        assert!(v.is_null_sentinel());
        let v2 = ValueData::new(ValueKind::ConstantInt(1), HirType::i64());
        assert!(!v2.is_null_sentinel());
    }
}
