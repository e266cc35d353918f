//! C3.5 — functions.

use serde::{Deserialize, Serialize};

use crate::block::{BasicBlock, IrBuilder};
use crate::error::{HirError, Result};
use crate::types::HirType;

/// Local or external linkage. External functions declare the runtime ABI
/// (§6) — they carry no basic blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    Local,
    External,
}

/// A function parameter. `name` resolves against the symbol table on
/// function entry (§3.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: HirType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: HirType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function: its signature, its ordered parameter list, and — for local
/// functions — its basic blocks and value arena (§3.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: HirType,
    pub is_async: bool,
    pub is_generator: bool,
    pub linkage: Linkage,
    /// `None` for external declarations (§2a's EXPANDED `Module` note):
    /// having no body is a distinct, explicit state rather than an empty
    /// block list, so the one-terminator-per-block invariant never has to
    /// vacuously hold over an external.
    pub blocks: Option<Vec<BasicBlock>>,
    #[serde(skip)]
    pub(crate) builder: Option<IrBuilder>,
}

impl Function {
    pub fn builder(name: impl Into<String>) -> FunctionBuilder {
        FunctionBuilder::new(name)
    }

    pub fn function_type(&self) -> HirType {
        HirType::function(
            self.params.iter().map(|p| p.ty.clone()).collect(),
            self.return_type.clone(),
        )
    }

    pub fn is_async_generator(&self) -> bool {
        self.is_async && self.is_generator
    }

    pub fn is_external(&self) -> bool {
        self.linkage == Linkage::External
    }

    /// Grants mutable access to the in-progress builder; panics on an
    /// external function or a function already finalized.
    pub fn builder_mut(&mut self) -> &mut IrBuilder {
        self.builder
            .as_mut()
            .expect("function has no in-progress builder (external or already finalized)")
    }

    /// Peeks at a value's type in this function's in-progress arena, without
    /// requiring mutable access — used by the closure-capture protocol to
    /// type an environment field from the snapshotted value in the *parent*
    /// function, which is still mid-generation (§4.6).
    pub fn peek_value_type(&self, id: crate::value::ValueId) -> Option<&HirType> {
        self.builder.as_ref().map(|b| b.value_type(id))
    }

    /// Appends a trailing environment parameter — used by the closure-capture
    /// protocol (§4.6) to install `__env` after body generation, and removed
    /// again if nothing was captured.
    pub fn push_trailing_param(&mut self, param: Parameter) {
        self.params.push(param);
    }

    pub fn pop_trailing_param(&mut self) -> Option<Parameter> {
        self.params.pop()
    }

    /// Moves the builder's blocks onto the function and drops the builder,
    /// leaving `blocks: Some(..)`. Every block must already be terminated —
    /// callers insert the implicit-return pass (§4.6) before calling this.
    pub fn finalize(&mut self) -> Result<()> {
        let builder = self
            .builder
            .take()
            .ok_or_else(|| HirError::Internal("function already finalized".into()))?;
        for (i, block) in builder.blocks.iter().enumerate() {
            if !block.has_terminator() {
                return Err(HirError::Internal(format!(
                    "block {i} in function '{}' has no terminator at finalize time",
                    self.name
                )));
            }
        }
        self.blocks = Some(builder.blocks);
        Ok(())
    }
}

/// Chained-setter construction, mirroring
/// `otter_vm_bytecode::function::FunctionBuilder`.
pub struct FunctionBuilder {
    name: String,
    params: Vec<Parameter>,
    return_type: HirType,
    is_async: bool,
    is_generator: bool,
    linkage: Linkage,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: HirType::void(),
            is_async: false,
            is_generator: false,
            linkage: Linkage::Local,
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: HirType) -> Self {
        self.params.push(Parameter::new(name, ty));
        self
    }

    pub fn params(mut self, params: Vec<Parameter>) -> Self {
        self.params = params;
        self
    }

    pub fn return_type(mut self, ty: HirType) -> Self {
        self.return_type = ty;
        self
    }

    pub fn is_async(mut self, v: bool) -> Self {
        self.is_async = v;
        self
    }

    pub fn is_generator(mut self, v: bool) -> Self {
        self.is_generator = v;
        self
    }

    pub fn linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn build(self) -> Function {
        let has_body = self.linkage == Linkage::Local;
        Function {
            name: self.name,
            params: self.params,
            return_type: self.return_type,
            is_async: self.is_async,
            is_generator: self.is_generator,
            linkage: self.linkage,
            blocks: if has_body { None } else { Some(Vec::new()) },
            builder: if has_body { Some(IrBuilder::new()) } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    #[test]
    fn function_builder_sets_fields() {
        let mut f = Function::builder("add")
            .param("a", HirType::i64())
            .param("b", HirType::i64())
            .return_type(HirType::i64())
            .build();
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.return_type, HirType::i64());
        assert!(!f.is_async);
        assert!(!f.is_generator);

        let entry = f.builder_mut().create_block();
        f.builder_mut().set_insert_point(entry);
        let a = f.builder_mut().const_i64(1);
        let b = f.builder_mut().const_i64(2);
        let sum = f.builder_mut().build_binary(Opcode::Add, a, b).unwrap();
        f.builder_mut().build_return(Some(sum)).unwrap();
        f.finalize().unwrap();

        assert_eq!(f.blocks.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn finalize_rejects_unterminated_block() {
        let mut f = Function::builder("broken").build();
        let entry = f.builder_mut().create_block();
        f.builder_mut().set_insert_point(entry);
        let _ = f.builder_mut().const_i64(1);
        assert!(f.finalize().is_err());
    }

    #[test]
    fn external_function_has_no_builder_and_no_blocks() {
        let f = Function::builder("malloc")
            .param("size", HirType::i64())
            .return_type(HirType::pointer_to(HirType::i8(), true))
            .linkage(Linkage::External)
            .build();
        assert!(f.is_external());
        assert_eq!(f.blocks.as_ref().unwrap().len(), 0);
    }
}
