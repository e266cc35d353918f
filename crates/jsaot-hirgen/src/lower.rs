//! The HIR generator: owns all the context the original `HIRGenerator`
//! class owns (`HIRGen_Internal.h`) — current symbol table / scope stack,
//! `this` / class / catch-block / generator context stacks, per-class and
//! per-closure metadata — and drives the lowering of a [`Program`] into a
//! [`jsaot_hir::Module`].

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use jsaot_hir::{HirType, Module, StructType, ValueId};

use crate::ast::Program;
use crate::error::{Diagnostic, LowerError, LowerResult, SourceLocation};
use crate::scope::ScopeStack;

/// A constructor field initializer's inferred default, replayed by derived
/// constructors (§4.7, and `original_source`'s `FieldInitValue::Kind`).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInitValue {
    String(String),
    Number(f64),
    /// Anything else — identifier, call, member access — gets `any` type and
    /// a zero default (§4.7 step 3's "identifier → any" rule).
    Any,
}

/// Per-class metadata (§3.6).
#[derive(Debug, Clone)]
pub struct ClassMeta {
    pub struct_ty: Rc<StructType>,
    pub parent: Option<String>,
    pub own_methods: HashSet<String>,
    pub own_getters: HashSet<String>,
    pub own_setters: HashSet<String>,
    pub static_values: HashMap<String, crate::ast::Literal>,
    /// Ordered so replay walks newest-to-oldest matching declaration order.
    pub field_init_values: Vec<(String, FieldInitValue)>,
    pub ctor_param_count: usize,
    /// Declared-or-inherited constructor parameter types, used by a
    /// subclass's default (implicit) constructor to pass its own parameter
    /// list straight through when it has none of its own (§4.7).
    pub ctor_params: Vec<HirType>,
}

/// A live generator-lowering context, pushed on entry to a `function*` and
/// popped on exit (§4.8, §3.6 "context stacks with strict save/restore").
pub struct GeneratorContext {
    pub gen_ptr: ValueId,
    pub state_value: ValueId,
    pub yield_count: u32,
    pub local_slots: HashMap<String, u32>,
    pub next_slot: u32,
    pub entry_block: jsaot_hir::BlockId,
    pub body_start_block: jsaot_hir::BlockId,
    /// Resume block for state N lives at index N-1.
    pub resume_blocks: Vec<jsaot_hir::BlockId>,
    /// Async generators reuse this same machinery but emit `async_generator_*`
    /// runtime calls instead (§4.8 last sentence).
    pub is_async: bool,
}

/// One element of a typed array's runtime kind (§4.4, §9's `BuiltinObjectKind`
/// note) — selects which runtime setter a computed-member store dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

/// The runtime-object "kind" a variable is known, at lowering time, to hold
/// (§3.6, §9). The full original tracks several dozen such kinds as distinct
/// `HashSet<String>` side tables; this core implements only the ones that
/// change a lowering *decision* and folds everything else the original
/// tracks into `Other`, so the tracking-table idiom survives without
/// hand-writing forty near-identical sets.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinKind {
    TypedArray(TypedArrayKind),
    Generator { is_async: bool },
    IteratorResult,
    Promise,
    Other(String),
}

/// Per-variable runtime-object-kind side table (§3.6, §9). Populated at
/// variable-declaration sites whose initializer is recognizably a typed-array
/// construction or a generator-function call; consulted by `for-of`
/// detection (§4.5) and typed-array-specific setter selection (§4.4).
#[derive(Debug, Default)]
pub struct GeneratorState {
    kinds: HashMap<String, BuiltinKind>,
}

impl GeneratorState {
    pub fn track(&mut self, name: impl Into<String>, kind: BuiltinKind) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn builtin_kind_of(&self, name: &str) -> Option<&BuiltinKind> {
        self.kinds.get(name)
    }
}

/// Surviving context for a `try` block, consulted by `throw` lowering
/// (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct CatchContext {
    pub catch_block: jsaot_hir::BlockId,
}

/// Loop/switch break-continue targets, pushed before body generation and
/// popped after (§4.5, §8 scenario 6).
#[derive(Debug, Clone)]
pub struct LoopTargets {
    pub label: Option<String>,
    pub break_target: jsaot_hir::BlockId,
    pub continue_target: Option<jsaot_hir::BlockId>,
}

pub struct HirGenerator {
    pub module: Module,
    pub scopes: ScopeStack,

    /// The function currently being generated into — `None` only before the
    /// first function/top-level block is opened.
    pub current_function: Option<String>,
    /// `lastFunctionName_`: kept pointing at the most recently *finished*
    /// function even after that function's own context is popped, so an
    /// enclosing `let f = function(){...}` binding can name it.
    pub last_function_name: Option<String>,

    /// Save/restore stack of enclosing function names, pushed when lowering
    /// descends into a nested function/arrow/method and popped on exit —
    /// mirrors `currentFunction_`'s save-swap-restore discipline in
    /// `HIRGen_Functions.cpp`. `function_stack.last()` is the function that
    /// owns a captured parent-scope value during `emit_capture`.
    pub function_stack: Vec<String>,

    /// Per-function ordered capture bookkeeping (§4.6): function name →
    /// ordered field names and their snapshotted parent-scope values.
    pub environment_field_names: HashMap<String, Vec<String>>,
    pub environment_field_values: HashMap<String, Vec<ValueId>>,

    pub current_this: Vec<ValueId>,
    pub current_class_struct_type: Vec<Rc<StructType>>,
    pub current_catch: Vec<CatchContext>,
    pub current_generator: Vec<GeneratorContext>,
    pub loop_stack: Vec<LoopTargets>,

    pub classes: HashMap<String, ClassMeta>,

    pub builtin_state: GeneratorState,

    anon_func_counter: u32,
    arrow_counter: u32,
    anon_struct_counter: u32,

    pub diagnostics: Vec<Diagnostic>,
}

impl HirGenerator {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: Module::new(module_name),
            scopes: ScopeStack::new(),
            current_function: None,
            last_function_name: None,
            function_stack: Vec::new(),
            environment_field_names: HashMap::new(),
            environment_field_values: HashMap::new(),
            current_this: Vec::new(),
            current_class_struct_type: Vec::new(),
            current_catch: Vec::new(),
            current_generator: Vec::new(),
            loop_stack: Vec::new(),
            classes: HashMap::new(),
            builtin_state: GeneratorState::default(),
            anon_func_counter: 0,
            arrow_counter: 0,
            anon_struct_counter: 0,
            diagnostics: Vec::new(),
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn lower_program(mut self, program: &Program) -> LowerResult<(Module, Vec<Diagnostic>)> {
        tracing::debug!(statements = program.body.len(), "lowering program");
        // A program is lowered the way the original treats the translation
        // unit: an implicit top-level `main` function whose body is the
        // statement list, so every declaration/statement form in §6 has a
        // function context (symbol table, current_this stack base) to run
        // inside.
        let main = jsaot_hir::Function::builder("main").return_type(HirType::i64());
        let main = main.build();
        self.module.add_function(main)?;
        self.current_function = Some("main".to_string());
        let entry = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(entry);

        self.hoist_declarations(&program.body)?;
        for stmt in &program.body {
            // Function declarations were already fully lowered by the hoist
            // pass above; re-lowering here would try to redeclare the same
            // function name in the module.
            if matches!(stmt, crate::ast::Stmt::FunctionDeclaration(_)) {
                continue;
            }
            self.lower_statement(stmt)?;
        }
        self.finish_function_body(HirType::i64())?;

        Ok((self.module, self.diagnostics))
    }

    pub(crate) fn fresh_func_name(&mut self) -> String {
        let n = self.anon_func_counter;
        self.anon_func_counter += 1;
        format!("__func_{n}")
    }

    pub(crate) fn fresh_arrow_name(&mut self) -> String {
        let n = self.arrow_counter;
        self.arrow_counter += 1;
        format!("__arrow_{n}")
    }

    pub(crate) fn next_anon_struct_id(&mut self) -> u32 {
        let n = self.anon_struct_counter;
        self.anon_struct_counter += 1;
        n
    }

    pub(crate) fn current_fn_name(&self) -> String {
        self.current_function
            .clone()
            .expect("no current function context")
    }

    pub(crate) fn builder_mut(&mut self) -> &mut jsaot_hir::IrBuilder {
        let name = self.current_fn_name();
        self.module.get_function_mut(&name).unwrap().builder_mut()
    }

    pub(crate) fn diagnose(&mut self, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(message, SourceLocation::default()));
    }

    /// Terminates any still-open block with an implicit `return` (§3.3,
    /// §4.6) and finalizes the function.
    pub(crate) fn finish_function_body(&mut self, return_ty: HirType) -> LowerResult<()> {
        let name = self.current_fn_name();
        let current_block = self.builder_mut().current_block();
        if let Some(block) = current_block {
            if !self.builder_mut().block_terminated(block) {
                if return_ty == HirType::void() {
                    self.builder_mut().build_return(None)?;
                } else {
                    let zero = self.builder_mut().null_sentinel();
                    self.builder_mut().build_return(Some(zero))?;
                }
            }
        }
        self.module.get_function_mut(&name).unwrap().finalize()?;
        Ok(())
    }

    /// Resolves an identifier against the scope machinery, applying the
    /// closure-capture protocol (§4.6) when the hit lives in a parent scope.
    pub(crate) fn resolve_identifier(&mut self, name: &str) -> LowerResult<ValueId> {
        use crate::scope::Resolution;
        if let Some(slot) = self.generator_slot_of(name) {
            return self.emit_generator_load_local(slot);
        }
        match self.scopes.resolve(name) {
            Some(Resolution::Local(v)) => Ok(v),
            Some(Resolution::Captured(parent_value)) => self.emit_capture(name, parent_value),
            None => {
                self.diagnose(format!("undefined identifier '{name}'"));
                Ok(self.builder_mut().null_sentinel())
            }
        }
    }

    /// Records (if new) the capture of `name` snapshotting `parent_value`,
    /// and emits `get_field(__env, field_index)` against the function's
    /// speculative `__env` parameter (§4.6).
    fn emit_capture(&mut self, name: &str, parent_value: ValueId) -> LowerResult<ValueId> {
        let func = self.current_fn_name();
        let field_names = self.environment_field_names.entry(func.clone()).or_default();
        let index = if let Some(i) = field_names.iter().position(|n| n == name) {
            i
        } else {
            field_names.push(name.to_string());
            let i = field_names.len() - 1;
            self.environment_field_values
                .entry(func.clone())
                .or_default()
                .push(parent_value);
            i
        };

        let env_value = self
            .scopes
            .resolve("__env")
            .map(|r| match r {
                crate::scope::Resolution::Local(v) | crate::scope::Resolution::Captured(v) => v,
            })
            .ok_or_else(|| {
                LowerError::internal("capturing function has no __env parameter bound")
            })?;

        // Field type comes from the snapshot value as it was typed in the
        // *parent* function's arena (defaulting to i64 when unknown, §4.6).
        let field_ty = self
            .function_stack
            .last()
            .and_then(|parent| self.module.get_function(parent))
            .and_then(|f| f.peek_value_type(parent_value))
            .cloned()
            .unwrap_or_else(HirType::i64);

        self.builder_mut()
            .build_get_field(env_value, index as u32, field_ty)
            .map_err(LowerError::from)
    }

    fn hoist_declarations(&mut self, stmts: &[crate::ast::Stmt]) -> LowerResult<()> {
        use crate::ast::Stmt;
        for stmt in stmts {
            if let Stmt::FunctionDeclaration(decl) = stmt {
                self.lower_function_declaration(decl)?;
            }
        }
        Ok(())
    }
}
