//! C2 — basic blocks and the IR builder.
//!
//! The builder follows a single-insert-point protocol (§4.1): it holds one
//! current block, every `build_*` call appends to it, and branching
//! instructions finalize the current block without moving the insert point —
//! callers must call [`IrBuilder::set_insert_point`] themselves before
//! emitting into the new block. This mirrors the teacher's `RegisterAllocator`
//! position/restore discipline in spirit, generalized from register slots to
//! block/value bookkeeping.

use serde::{Deserialize, Serialize};

use crate::error::{HirError, Result};
use crate::instruction::{Instruction, InstructionData, Opcode};
use crate::types::HirType;
use crate::value::{ValueData, ValueId, ValueKind};

/// An index into `Function::blocks`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(u32);

impl BlockId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A basic block: a straight-line instruction sequence ending in at most one
/// terminator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn has_terminator(&self) -> bool {
        self.instructions.last().is_some_and(|i| i.is_terminator())
    }
}

/// Owns the in-progress function's blocks and value arena while lowering
/// visits the AST; `Function::finalize` consumes it.
pub struct IrBuilder {
    pub blocks: Vec<BasicBlock>,
    pub values: Vec<ValueData>,
    current: Option<BlockId>,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            values: Vec::new(),
            current: None,
        }
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::default());
        id
    }

    /// Switches the current insertion point. Does not check the previous
    /// block was terminated — some callers (e.g. dead-code paths inside a
    /// generator dispatch) intentionally switch away from an unterminated
    /// block that a later pass will terminate explicitly.
    pub fn set_insert_point(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current
    }

    pub fn block_terminated(&self, block: BlockId) -> bool {
        self.blocks[block.index() as usize].has_terminator()
    }

    fn current_mut(&mut self) -> Result<&mut BasicBlock> {
        let id = self.current.ok_or(HirError::Internal(
            "no current insert point".to_string(),
        ))?;
        Ok(&mut self.blocks[id.index() as usize])
    }

    fn push_value(&mut self, data: ValueData) -> ValueId {
        let id = ValueId::new(self.values.len() as u32);
        self.values.push(data);
        id
    }

    pub fn value_type(&self, id: ValueId) -> &HirType {
        &self.values[id.index() as usize].ty
    }

    /// Recovers a value's name when it is a `ConstantString` — used to
    /// resolve a callee expression (a function/arrow value, §4.6) back to
    /// the function name a static `Call` instruction needs.
    pub fn constant_string_name(&self, id: ValueId) -> Option<&str> {
        match &self.values[id.index() as usize].kind {
            ValueKind::ConstantString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn push_instr(&mut self, instr: Instruction, ty: Option<HirType>) -> Result<Option<ValueId>> {
        let block_idx = self
            .current
            .ok_or(HirError::Internal("no current insert point".to_string()))?
            .index();
        let result = if let Some(ty) = ty {
            let instr_idx = self.blocks[block_idx as usize].instructions.len() as u32;
            let id = self.push_value(ValueData::new(
                ValueKind::InstructionResult {
                    block: block_idx,
                    instr: instr_idx,
                },
                ty,
            ));
            Some(id)
        } else {
            None
        };
        let mut instr = instr;
        instr.result = result;
        self.current_mut()?.instructions.push(instr);
        Ok(result)
    }

    /// Registers a constant value without emitting an instruction — constants
    /// are not block-resident (§3.2).
    pub fn make_constant(&mut self, kind: ValueKind, ty: HirType) -> ValueId {
        self.push_value(ValueData::new(kind, ty))
    }

    pub fn const_i64(&mut self, v: i64) -> ValueId {
        self.make_constant(ValueKind::ConstantInt(v), HirType::i64())
    }

    pub fn const_f64(&mut self, v: f64) -> ValueId {
        self.make_constant(ValueKind::ConstantFloat(v), HirType::f64())
    }

    pub fn const_string(&mut self, s: impl Into<String>) -> ValueId {
        self.make_constant(ValueKind::ConstantString(s.into()), HirType::string())
    }

    /// The null/undefined sentinel: the integer constant zero (§3.2).
    pub fn null_sentinel(&mut self) -> ValueId {
        self.make_constant(ValueKind::NullSentinel, HirType::i64())
    }

    pub fn const_bool(&mut self, v: bool) -> ValueId {
        self.const_i64(if v { 1 } else { 0 })
    }

    // ---- arithmetic / bitwise ----

    /// Computes the result type for a binary op: both i64 → i64; either f64
    /// (and no string) → f64; `+` with a string operand on either side keeps
    /// string type and, uniquely, does not normalize a boolean operand away
    /// (§4.3's string-concatenation exception is applied by the caller, not
    /// here — this only decides numeric-vs-string promotion).
    fn binary_result_type(&self, opcode: Opcode, lhs: ValueId, rhs: ValueId) -> HirType {
        let lt = self.value_type(lhs);
        let rt = self.value_type(rhs);
        if opcode == Opcode::Add && (lt.is_string() || rt.is_string()) {
            return HirType::string();
        }
        if matches!(
            opcode,
            Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge
        ) {
            return HirType::bool();
        }
        if *lt == HirType::f64() || *rt == HirType::f64() {
            HirType::f64()
        } else {
            HirType::i64()
        }
    }

    pub fn build_binary(&mut self, opcode: Opcode, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        let ty = self.binary_result_type(opcode, lhs, rhs);
        let instr = Instruction::new(opcode, vec![lhs, rhs], None);
        self.push_instr(instr, Some(ty))?
            .ok_or_else(|| HirError::Internal("binary op produced no value".into()))
    }

    pub fn build_unary(&mut self, opcode: Opcode, operand: ValueId) -> Result<ValueId> {
        let ty = self.value_type(operand).clone();
        let ty = match opcode {
            Opcode::Not => HirType::bool(),
            _ => ty,
        };
        let instr = Instruction::new(opcode, vec![operand], None);
        self.push_instr(instr, Some(ty))?
            .ok_or_else(|| HirError::Internal("unary op produced no value".into()))
    }

    /// Zero-extends a boolean value to i64 (§4.3's promotion for arithmetic
    /// contexts other than string concatenation).
    pub fn build_bool_zext(&mut self, operand: ValueId) -> Result<ValueId> {
        if *self.value_type(operand) != HirType::bool() {
            return Ok(operand);
        }
        let instr = Instruction::new(Opcode::Cast, vec![operand], None)
            .with_data(InstructionData::Type(HirType::i64()));
        self.push_instr(instr, Some(HirType::i64()))?
            .ok_or_else(|| HirError::Internal("cast produced no value".into()))
    }

    // ---- memory ----

    pub fn build_alloca(&mut self, ty: HirType) -> Result<ValueId> {
        let ptr_ty = HirType::pointer_to(ty.clone(), true);
        let instr = Instruction::new(Opcode::Alloca, vec![], None).with_data(InstructionData::Type(ty));
        self.push_instr(instr, Some(ptr_ty))?
            .ok_or_else(|| HirError::Internal("alloca produced no value".into()))
    }

    pub fn build_load(&mut self, ptr: ValueId) -> Result<ValueId> {
        let pointee = self
            .value_type(ptr)
            .pointee()
            .cloned()
            .ok_or_else(|| HirError::Internal("load of non-pointer value".into()))?;
        let instr = Instruction::new(Opcode::Load, vec![ptr], None);
        self.push_instr(instr, Some(pointee))?
            .ok_or_else(|| HirError::Internal("load produced no value".into()))
    }

    pub fn build_store(&mut self, ptr: ValueId, value: ValueId) -> Result<()> {
        let instr = Instruction::new(Opcode::Store, vec![ptr, value], None);
        self.push_instr(instr, None)?;
        Ok(())
    }

    // ---- aggregate ----

    pub fn build_get_field(
        &mut self,
        base: ValueId,
        index: u32,
        field_ty: HirType,
    ) -> Result<ValueId> {
        let instr = Instruction::new(Opcode::GetField, vec![base], None)
            .with_data(InstructionData::Index(index));
        self.push_instr(instr, Some(field_ty))?
            .ok_or_else(|| HirError::Internal("get_field produced no value".into()))
    }

    pub fn build_set_field(&mut self, base: ValueId, index: u32, value: ValueId) -> Result<()> {
        let instr = Instruction::new(Opcode::SetField, vec![base, value], None)
            .with_data(InstructionData::Index(index));
        self.push_instr(instr, None)?;
        Ok(())
    }

    pub fn build_get_element(
        &mut self,
        base: ValueId,
        index: ValueId,
        elem_ty: HirType,
    ) -> Result<ValueId> {
        let instr = Instruction::new(Opcode::GetElement, vec![base, index], None);
        self.push_instr(instr, Some(elem_ty))?
            .ok_or_else(|| HirError::Internal("get_element produced no value".into()))
    }

    pub fn build_set_element(&mut self, base: ValueId, index: ValueId, value: ValueId) -> Result<()> {
        let instr = Instruction::new(Opcode::SetElement, vec![base, index, value], None);
        self.push_instr(instr, None)?;
        Ok(())
    }

    pub fn build_struct_construct(
        &mut self,
        fields: Vec<ValueId>,
        struct_ty: HirType,
    ) -> Result<ValueId> {
        let instr = Instruction::new(Opcode::StructConstruct, fields, None);
        self.push_instr(instr, Some(struct_ty))?
            .ok_or_else(|| HirError::Internal("struct_construct produced no value".into()))
    }

    pub fn build_array_construct(&mut self, elements: Vec<ValueId>, elem_ty: HirType) -> Result<ValueId> {
        let len = elements.len() as u32;
        let instr = Instruction::new(Opcode::ArrayConstruct, elements, None);
        self.push_instr(instr, Some(HirType::array_of(elem_ty, len)))?
            .ok_or_else(|| HirError::Internal("array_construct produced no value".into()))
    }

    // ---- control flow ----

    /// Finalizes the current block with an unconditional branch. Does not
    /// move the insert point — the caller sets the next block explicitly
    /// (§4.1 insert-point protocol).
    pub fn build_br(&mut self, target: BlockId) -> Result<()> {
        let instr = Instruction::new(Opcode::Br, vec![], None)
            .with_data(InstructionData::Targets(vec![target.index()]));
        self.push_instr(instr, None)?;
        Ok(())
    }

    pub fn build_cond_br(&mut self, cond: ValueId, then_bb: BlockId, else_bb: BlockId) -> Result<()> {
        let instr = Instruction::new(Opcode::CondBr, vec![cond], None).with_data(
            InstructionData::Targets(vec![then_bb.index(), else_bb.index()]),
        );
        self.push_instr(instr, None)?;
        Ok(())
    }

    pub fn build_return(&mut self, value: Option<ValueId>) -> Result<()> {
        let operands = value.into_iter().collect();
        let instr = Instruction::new(Opcode::Return, operands, None);
        self.push_instr(instr, None)?;
        Ok(())
    }

    pub fn build_unreachable(&mut self) -> Result<()> {
        let instr = Instruction::new(Opcode::Unreachable, vec![], None);
        self.push_instr(instr, None)?;
        Ok(())
    }

    // ---- function calls / casts ----

    pub fn build_call(
        &mut self,
        callee: impl Into<String>,
        args: Vec<ValueId>,
        return_type: HirType,
    ) -> Result<Option<ValueId>> {
        let instr = Instruction::new(Opcode::Call, args, None)
            .with_data(InstructionData::Callee(callee.into()));
        if return_type == HirType::void() {
            self.push_instr(instr, None)
        } else {
            self.push_instr(instr, Some(return_type))
        }
    }

    pub fn build_cast(&mut self, value: ValueId, target: HirType) -> Result<ValueId> {
        let instr = Instruction::new(Opcode::Cast, vec![value], None)
            .with_data(InstructionData::Type(target.clone()));
        self.push_instr(instr, Some(target))?
            .ok_or_else(|| HirError::Internal("cast produced no value".into()))
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_terminator_per_block() {
        let mut b = IrBuilder::new();
        let entry = b.create_block();
        b.set_insert_point(entry);
        let c = b.const_i64(1);
        b.build_return(Some(c)).unwrap();
        assert!(b.block_terminated(entry));
        assert_eq!(b.blocks[entry.index() as usize].instructions.len(), 1);
    }

    #[test]
    fn add_of_two_i64_is_i64() {
        let mut b = IrBuilder::new();
        let entry = b.create_block();
        b.set_insert_point(entry);
        let a = b.const_i64(1);
        let c = b.const_i64(2);
        let sum = b.build_binary(Opcode::Add, a, c).unwrap();
        assert_eq!(*b.value_type(sum), HirType::i64());
    }

    #[test]
    fn add_with_string_operand_is_string() {
        let mut b = IrBuilder::new();
        let entry = b.create_block();
        b.set_insert_point(entry);
        let s = b.const_string("x");
        let n = b.const_i64(1);
        let sum = b.build_binary(Opcode::Add, s, n).unwrap();
        assert_eq!(*b.value_type(sum), HirType::string());
    }

    #[test]
    fn comparison_always_yields_bool() {
        let mut b = IrBuilder::new();
        let entry = b.create_block();
        b.set_insert_point(entry);
        let a = b.const_i64(1);
        let c = b.const_i64(2);
        let cmp = b.build_binary(Opcode::Lt, a, c).unwrap();
        assert_eq!(*b.value_type(cmp), HirType::bool());
    }
}
