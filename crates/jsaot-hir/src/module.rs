//! C3 — the module registry.

use std::collections::HashMap;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{HirError, Result};
use crate::function::{Function, FunctionBuilder, Linkage};
use crate::types::{HirType, StructType};

/// A module: the functions, struct type definitions, closure metadata, and
/// external declarations produced by a single compilation unit (§3.4).
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub structs: Vec<Rc<StructType>>,
    /// function_name → the environment struct type its trailing parameter
    /// expects, for every function with at least one capture.
    pub closure_environments: HashMap<String, HirType>,
    /// function_name → ordered list of captured variable names.
    pub closure_captured_vars: HashMap<String, Vec<String>>,

    #[serde(skip)]
    function_index: FxHashMap<String, usize>,
    #[serde(skip)]
    struct_index: FxHashMap<String, usize>,
}

// The name indices are a derived cache, not part of the wire format — a
// hand-written `Deserialize` rebuilds them instead of leaving them empty
// (the derive's `#[serde(skip)]` would otherwise silently break
// `get_function`/`get_struct` lookups after a round trip).
impl<'de> Deserialize<'de> for Module {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ModuleData {
            name: String,
            functions: Vec<Function>,
            structs: Vec<Rc<StructType>>,
            closure_environments: HashMap<String, HirType>,
            closure_captured_vars: HashMap<String, Vec<String>>,
        }

        let data = ModuleData::deserialize(deserializer)?;
        let function_index = data
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        let struct_index = data
            .structs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        Ok(Module {
            name: data.name,
            functions: data.functions,
            structs: data.structs,
            closure_environments: data.closure_environments,
            closure_captured_vars: data.closure_captured_vars,
            function_index,
            struct_index,
        })
    }
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            structs: Vec::new(),
            closure_environments: HashMap::new(),
            closure_captured_vars: HashMap::new(),
            function_index: FxHashMap::default(),
            struct_index: FxHashMap::default(),
        }
    }

    pub fn declare_external(
        &mut self,
        name: impl Into<String>,
        params: Vec<HirType>,
        return_type: HirType,
    ) -> Result<()> {
        let name = name.into();
        if self.function_index.contains_key(&name) {
            // Runtime ABI declarations are created on demand (§6); repeated
            // declarations of the same helper from different call sites are
            // expected and idempotent, not an error.
            return Ok(());
        }
        let mut builder: FunctionBuilder = Function::builder(name.clone())
            .return_type(return_type)
            .linkage(Linkage::External);
        for (i, p) in params.into_iter().enumerate() {
            builder = builder.param(format!("arg{i}"), p);
        }
        self.add_function(builder.build())
    }

    pub fn add_function(&mut self, function: Function) -> Result<()> {
        if self.function_index.contains_key(&function.name) {
            return Err(HirError::DuplicateFunction(function.name));
        }
        self.function_index
            .insert(function.name.clone(), self.functions.len());
        self.functions.push(function);
        Ok(())
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.function_index.get(name).map(|&i| &self.functions[i])
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        if let Some(&i) = self.function_index.get(name) {
            Some(&mut self.functions[i])
        } else {
            None
        }
    }

    pub fn add_struct(&mut self, ty: Rc<StructType>) -> Result<()> {
        if self.struct_index.contains_key(&ty.name) {
            return Err(HirError::DuplicateStruct(ty.name.clone()));
        }
        self.struct_index.insert(ty.name.clone(), self.structs.len());
        self.structs.push(ty);
        Ok(())
    }

    pub fn get_struct(&self, name: &str) -> Option<&Rc<StructType>> {
        self.struct_index.get(name).map(|&i| &self.structs[i])
    }

    pub fn record_closure(
        &mut self,
        function_name: impl Into<String>,
        env_struct: HirType,
        captured_vars: Vec<String>,
    ) {
        let name = function_name.into();
        self.closure_environments.insert(name.clone(), env_struct);
        self.closure_captured_vars.insert(name, captured_vars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructField;

    #[test]
    fn duplicate_function_names_rejected() {
        let mut m = Module::new("test");
        m.add_function(Function::builder("f").build()).unwrap();
        assert!(m.add_function(Function::builder("f").build()).is_err());
    }

    #[test]
    fn struct_lookup_by_name() {
        let mut m = Module::new("test");
        let s = StructType::new("Point", vec![StructField::new("x", HirType::i64(), true)]);
        m.add_struct(s.clone()).unwrap();
        assert!(m.get_struct("Point").is_some());
        assert!(m.get_struct("Other").is_none());
    }

    #[test]
    fn external_declarations_are_idempotent() {
        let mut m = Module::new("test");
        m.declare_external("malloc", vec![HirType::i64()], HirType::pointer_to(HirType::i8(), true))
            .unwrap();
        m.declare_external("malloc", vec![HirType::i64()], HirType::pointer_to(HirType::i8(), true))
            .unwrap();
        assert_eq!(m.functions.len(), 1);
    }

    #[test]
    fn closure_metadata_records_environment_and_captures() {
        let mut m = Module::new("test");
        let env = StructType::new(
            "__closure_env___func_0",
            vec![StructField::new("x", HirType::i64(), true)],
        );
        m.record_closure("__func_0", HirType::struct_ty(env), vec!["x".to_string()]);
        assert_eq!(m.closure_captured_vars["__func_0"], vec!["x".to_string()]);
    }

    #[test]
    fn module_survives_a_json_dump_round_trip() {
        let mut m = Module::new("dump_target");
        m.add_function(Function::builder("f").return_type(HirType::i64()).build())
            .unwrap();
        let s = StructType::new("Point", vec![StructField::new("x", HirType::i64(), true)]);
        m.add_struct(s).unwrap();
        m.record_closure("f", HirType::i64(), vec!["y".to_string()]);

        let dumped = serde_json::to_string(&m).unwrap();
        let restored: Module = serde_json::from_str(&dumped).unwrap();
        assert_eq!(restored.name, "dump_target");
        assert!(restored.get_function("f").is_some());
        assert!(restored.get_struct("Point").is_some());
        assert_eq!(restored.closure_captured_vars["f"], vec!["y".to_string()]);
    }
}
