//! C6 — statements and control flow (§4.5).
//!
//! Grounded on `original_source/src/hir/HIRGen_Statements.cpp`'s
//! `visit(IfStmt&)`/`visit(ForStmt&)`/etc.: every loop shape lowers to the
//! same create-blocks/branch/set-insert-point sequence the builder already
//! uses for the ternary and short-circuit expressions in `expr.rs`, with
//! `loop_stack` (§3.6) supplying `break`/`continue` targets instead of phi
//! nodes merging a loop-carried value.

use jsaot_hir::{BlockId, HirType, Opcode, ValueId};

use crate::ast::{CatchClause, Decl, ForHead, ForInit, Pattern, Stmt, SwitchCase, VariableDeclarator};
use crate::error::{LowerError, LowerResult};
use crate::lower::{CatchContext, HirGenerator, LoopTargets};
use crate::runtime_abi::{arrays, exceptions, generators as gen_abi, objects};

impl HirGenerator {
    pub fn lower_statement(&mut self, stmt: &Stmt) -> LowerResult<()> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.lower_statement(s)?;
                }
                Ok(())
            }
            Stmt::Expression(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
            Stmt::VariableDeclaration { declarations, .. } => {
                self.lower_variable_declaration(declarations)
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => self.lower_if(test, consequent, alternate.as_deref()),
            Stmt::Switch { discriminant, cases } => self.lower_switch(discriminant, cases),
            Stmt::While { test, body, label } => self.lower_while(test, body, label.clone()),
            Stmt::DoWhile { body, test, label } => self.lower_do_while(body, test, label.clone()),
            Stmt::For {
                init,
                test,
                update,
                body,
                label,
            } => self.lower_for(init.as_deref(), test.as_ref(), update.as_ref(), body, label.clone()),
            Stmt::ForIn { left, right, body, label } => {
                self.lower_for_in(left, right, body, label.clone())
            }
            Stmt::ForOf {
                left,
                right,
                body,
                label,
                is_await,
            } => self.lower_for_of(left, right, body, label.clone(), *is_await),
            Stmt::Break(label) => self.lower_break(label.as_deref()),
            Stmt::Continue(label) => self.lower_continue(label.as_deref()),
            Stmt::Return(expr) => self.lower_return(expr.as_ref()),
            Stmt::Throw(expr) => self.lower_throw(expr),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.lower_try(block, handler.as_ref(), finalizer.as_deref()),
            Stmt::Labeled { label, body } => self.lower_labeled(label, body),
            Stmt::With { object, body } => {
                // No lexical-scope-stack-splicing for `with` (§1 non-goal) —
                // its object expression is evaluated for side effects only.
                self.lower_expr(object)?;
                self.lower_statement(body)
            }
            Stmt::Empty | Stmt::Debugger => Ok(()),
            Stmt::Using { declarations } => self.lower_variable_declaration(declarations),
            Stmt::FunctionDeclaration(decl) => self.lower_function_declaration(decl),
            Stmt::ClassDeclaration(decl) => self.lower_class_declaration(decl),
            Stmt::Declaration(decl) => self.lower_declaration(decl),
        }
    }

    /// Branches the still-open current block to `target`; a no-op if the
    /// current block was already terminated (e.g. by a nested `return` or
    /// `break`) by whatever statement ran just before.
    fn branch_if_open(&mut self, target: BlockId) -> LowerResult<()> {
        if let Some(block) = self.builder_mut().current_block() {
            if !self.builder_mut().block_terminated(block) {
                self.builder_mut().build_br(target)?;
            }
        }
        Ok(())
    }

    // ---- declarations & destructuring (§4.9) ----

    fn lower_variable_declaration(&mut self, declarations: &[VariableDeclarator]) -> LowerResult<()> {
        for decl in declarations {
            let value = match &decl.init {
                Some(e) => self.lower_expr(e)?,
                None => self.builder_mut().null_sentinel(),
            };
            if let (Pattern::Identifier(id), Some(init)) = (&decl.pattern, &decl.init) {
                self.track_builtin_kind_from_init(&id.name, init);
            }
            self.bind_pattern(&decl.pattern, value)?;
        }
        Ok(())
    }

    /// Populates the runtime-object-kind side table (§3.6, §9) for a
    /// `let x = <init>` binding whose initializer is recognizably a
    /// generator-function call or a typed-array construction — the two
    /// kinds that change a later lowering decision (§4.4, §4.5).
    fn track_builtin_kind_from_init(&mut self, name: &str, init: &crate::ast::Expr) {
        use crate::ast::Expr;
        match init {
            Expr::Call { callee, .. } => {
                if let Expr::Identifier(id) = callee.as_ref() {
                    if let Some(is_async) = self
                        .module
                        .get_function(&id.name)
                        .filter(|f| f.is_generator)
                        .map(|f| f.is_async)
                    {
                        self.builtin_state
                            .track(name.to_string(), crate::lower::BuiltinKind::Generator { is_async });
                    }
                }
            }
            Expr::New { callee, .. } => {
                if let Expr::Identifier(id) = callee.as_ref() {
                    if let Some(kind) = typed_array_kind_from_name(&id.name) {
                        self.builtin_state
                            .track(name.to_string(), crate::lower::BuiltinKind::TypedArray(kind));
                    }
                }
            }
            _ => {}
        }
    }

    /// Destructures `value` into `pattern`'s bindings (§4.9): array patterns
    /// index through `value_array_at`, object patterns read struct fields by
    /// name, falling back to a diagnosed zero on a shape mismatch exactly
    /// like ordinary member-access lowering does in `expr.rs`.
    fn bind_pattern(&mut self, pattern: &Pattern, value: ValueId) -> LowerResult<()> {
        match pattern {
            Pattern::Identifier(id) => self.declare_binding(&id.name, value),
            Pattern::Assignment { target, default } => {
                let resolved = self.apply_pattern_default(value, default)?;
                self.bind_pattern(target, resolved)
            }
            Pattern::Rest(inner) => self.bind_pattern(inner, value),
            Pattern::Array(elements) => {
                self.module.declare_external(
                    arrays::AT,
                    vec![HirType::pointer_to(HirType::any(), true), HirType::i64()],
                    HirType::any(),
                )?;
                for (i, element) in elements.iter().enumerate() {
                    let Some(elem_pattern) = element else { continue };
                    if let Pattern::Rest(inner) = elem_pattern {
                        // No array-slicing primitive exists at this tier
                        // (§1); a rest element binds the whole source array,
                        // which is only correct when it is the sole element.
                        self.diagnose("array rest destructuring approximated as the full source array");
                        self.bind_pattern(inner, value)?;
                        continue;
                    }
                    let index = self.builder_mut().const_i64(i as i64);
                    let elem_value = self
                        .builder_mut()
                        .build_call(arrays::AT, vec![value, index], HirType::any())?
                        .ok_or_else(|| LowerError::internal("value_array_at returned void"))?;
                    self.bind_pattern(elem_pattern, elem_value)?;
                }
                Ok(())
            }
            Pattern::Object(entries) => {
                let struct_ty = self.builder_mut().value_type(value).pointee().cloned();
                for (name, sub_pattern) in entries {
                    let field = struct_ty
                        .as_ref()
                        .and_then(|t| t.as_struct())
                        .and_then(|s| s.field_index(name).map(|i| (i, s.fields[i].ty.clone())));
                    let field_value = match field {
                        Some((index, ty)) => self.builder_mut().build_get_field(value, index as u32, ty)?,
                        None => {
                            self.diagnose(format!("destructured property '{name}' missing from source"));
                            self.builder_mut().null_sentinel()
                        }
                    };
                    self.bind_pattern(sub_pattern, field_value)?;
                }
                Ok(())
            }
        }
    }

    /// `value ?? default` inlined for a destructuring default (§4.9): a
    /// runtime branch on whether `value` is the null sentinel, not a static
    /// approximation, since a missing destructured field is a common case.
    fn apply_pattern_default(&mut self, value: ValueId, default: &crate::ast::Expr) -> LowerResult<ValueId> {
        let null = self.builder_mut().null_sentinel();
        let is_missing = self.builder_mut().build_binary(Opcode::Eq, value, null)?;
        let slot = self.builder_mut().build_alloca(HirType::any())?;
        self.builder_mut().build_store(slot, value)?;

        let default_bb = self.builder_mut().create_block();
        let merge_bb = self.builder_mut().create_block();
        self.builder_mut().build_cond_br(is_missing, default_bb, merge_bb)?;

        self.builder_mut().set_insert_point(default_bb);
        let default_value = self.lower_expr(default)?;
        self.builder_mut().build_store(slot, default_value)?;
        self.builder_mut().build_br(merge_bb)?;

        self.builder_mut().set_insert_point(merge_bb);
        self.builder_mut().build_load(slot).map_err(LowerError::from)
    }

    // ---- if / switch (§4.5) ----

    fn lower_if(&mut self, test: &crate::ast::Expr, consequent: &Stmt, alternate: Option<&Stmt>) -> LowerResult<()> {
        let cond = self.lower_expr(test)?;
        let cond = self.builder_mut().build_bool_zext(cond)?;

        let then_bb = self.builder_mut().create_block();
        let else_bb = self.builder_mut().create_block();
        let merge_bb = self.builder_mut().create_block();
        self.builder_mut().build_cond_br(cond, then_bb, else_bb)?;

        self.builder_mut().set_insert_point(then_bb);
        self.lower_statement(consequent)?;
        self.branch_if_open(merge_bb)?;

        self.builder_mut().set_insert_point(else_bb);
        if let Some(alt) = alternate {
            self.lower_statement(alt)?;
        }
        self.branch_if_open(merge_bb)?;

        self.builder_mut().set_insert_point(merge_bb);
        Ok(())
    }

    /// A `switch` lowers to a dispatch chain of strict-equality tests
    /// followed by fallthrough bodies — `break` exits to `end_block`, and a
    /// missing `break` falls into the next case's body exactly like the
    /// source semantics (§4.5).
    fn lower_switch(&mut self, discriminant: &crate::ast::Expr, cases: &[SwitchCase]) -> LowerResult<()> {
        let discriminant_value = self.lower_expr(discriminant)?;

        let case_blocks: Vec<BlockId> = cases.iter().map(|_| self.builder_mut().create_block()).collect();
        let end_block = self.builder_mut().create_block();

        let mut default_index = None;
        for (i, case) in cases.iter().enumerate() {
            match &case.test {
                Some(test) => {
                    let test_value = self.lower_expr(test)?;
                    let matches = self
                        .builder_mut()
                        .build_binary(Opcode::Eq, discriminant_value, test_value)?;
                    let next_check = self.builder_mut().create_block();
                    self.builder_mut().build_cond_br(matches, case_blocks[i], next_check)?;
                    self.builder_mut().set_insert_point(next_check);
                }
                None => default_index = Some(i),
            }
        }
        let fallback = default_index.map(|i| case_blocks[i]).unwrap_or(end_block);
        self.branch_if_open(fallback)?;

        self.loop_stack.push(LoopTargets {
            label: None,
            break_target: end_block,
            continue_target: None,
        });
        for (i, case) in cases.iter().enumerate() {
            self.builder_mut().set_insert_point(case_blocks[i]);
            for stmt in &case.consequent {
                self.lower_statement(stmt)?;
            }
            let next = case_blocks.get(i + 1).copied().unwrap_or(end_block);
            self.branch_if_open(next)?;
        }
        self.loop_stack.pop();

        self.builder_mut().set_insert_point(end_block);
        Ok(())
    }

    // ---- loops (§4.5) ----

    fn lower_while(&mut self, test: &crate::ast::Expr, body: &Stmt, label: Option<String>) -> LowerResult<()> {
        let cond_bb = self.builder_mut().create_block();
        let body_bb = self.builder_mut().create_block();
        let end_bb = self.builder_mut().create_block();
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(cond_bb);
        let cond = self.lower_expr(test)?;
        let cond = self.builder_mut().build_bool_zext(cond)?;
        self.builder_mut().build_cond_br(cond, body_bb, end_bb)?;

        self.builder_mut().set_insert_point(body_bb);
        self.loop_stack.push(LoopTargets {
            label,
            break_target: end_bb,
            continue_target: Some(cond_bb),
        });
        self.lower_statement(body)?;
        self.loop_stack.pop();
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(end_bb);
        Ok(())
    }

    fn lower_do_while(&mut self, body: &Stmt, test: &crate::ast::Expr, label: Option<String>) -> LowerResult<()> {
        let body_bb = self.builder_mut().create_block();
        let cond_bb = self.builder_mut().create_block();
        let end_bb = self.builder_mut().create_block();
        self.branch_if_open(body_bb)?;

        self.builder_mut().set_insert_point(body_bb);
        self.loop_stack.push(LoopTargets {
            label,
            break_target: end_bb,
            continue_target: Some(cond_bb),
        });
        self.lower_statement(body)?;
        self.loop_stack.pop();
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(cond_bb);
        let cond = self.lower_expr(test)?;
        let cond = self.builder_mut().build_bool_zext(cond)?;
        self.builder_mut().build_cond_br(cond, body_bb, end_bb)?;

        self.builder_mut().set_insert_point(end_bb);
        Ok(())
    }

    /// `for`'s body always branches to the update block, never straight back
    /// to the condition — that is the update block's own job once it runs
    /// (§4.5, `original_source`'s `HIRGen_Statements.cpp::visit(ForStmt&)`).
    fn lower_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&crate::ast::Expr>,
        update: Option<&crate::ast::Expr>,
        body: &Stmt,
        label: Option<String>,
    ) -> LowerResult<()> {
        if let Some(init) = init {
            match init {
                ForInit::VariableDeclaration(_, decls) => self.lower_variable_declaration(decls)?,
                ForInit::Expression(e) => {
                    self.lower_expr(e)?;
                }
            }
        }

        let cond_bb = self.builder_mut().create_block();
        let body_bb = self.builder_mut().create_block();
        let update_bb = self.builder_mut().create_block();
        let end_bb = self.builder_mut().create_block();
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(cond_bb);
        match test {
            Some(t) => {
                let cond = self.lower_expr(t)?;
                let cond = self.builder_mut().build_bool_zext(cond)?;
                self.builder_mut().build_cond_br(cond, body_bb, end_bb)?;
            }
            None => {
                self.builder_mut().build_br(body_bb)?;
            }
        }

        self.builder_mut().set_insert_point(body_bb);
        self.loop_stack.push(LoopTargets {
            label,
            break_target: end_bb,
            continue_target: Some(update_bb),
        });
        self.lower_statement(body)?;
        self.loop_stack.pop();
        self.branch_if_open(update_bb)?;

        self.builder_mut().set_insert_point(update_bb);
        if let Some(u) = update {
            self.lower_expr(u)?;
        }
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(end_bb);
        Ok(())
    }

    fn bind_for_head(&mut self, head: &ForHead, value: ValueId) -> LowerResult<()> {
        match head {
            ForHead::VariableDeclaration(_, pattern) | ForHead::Pattern(pattern) => {
                self.bind_pattern(pattern, value)
            }
        }
    }

    /// `for-in` walks `object_keys(right)` by index (§4.5) — enumeration
    /// order beyond insertion order is a runtime concern.
    fn lower_for_in(
        &mut self,
        left: &ForHead,
        right: &crate::ast::Expr,
        body: &Stmt,
        label: Option<String>,
    ) -> LowerResult<()> {
        let obj = self.lower_expr(right)?;
        self.module.declare_external(
            objects::KEYS,
            vec![HirType::pointer_to(HirType::any(), true)],
            HirType::pointer_to(HirType::any(), true),
        )?;
        let keys = self
            .builder_mut()
            .build_call(objects::KEYS, vec![obj], HirType::pointer_to(HirType::any(), true))?
            .ok_or_else(|| LowerError::internal("object_keys returned void"))?;
        self.lower_indexed_loop(keys, left, body, label)
    }

    /// Regular-array `for-of`: index-driven over `value_array_length`/`_at`
    /// (§4.5). Generator-sourced iterables use the iterator protocol instead
    /// — see [`Self::lower_for_of_generator`]. `for await ... of` over
    /// anything but an async generator degrades to the same synchronous
    /// shape, with a warning (§4.5, §9).
    fn lower_for_of(
        &mut self,
        left: &ForHead,
        right: &crate::ast::Expr,
        body: &Stmt,
        label: Option<String>,
        is_await: bool,
    ) -> LowerResult<()> {
        match self.generator_kind_of(right) {
            Some(is_async) => {
                if is_await && !is_async {
                    tracing::warn!(
                        "`for await ... of` over a non-async-generator degrades to synchronous iteration"
                    );
                }
                self.lower_for_of_generator(left, right, body, label, is_async && is_await)
            }
            None => {
                if is_await {
                    tracing::warn!("`for await ... of` over a non-generator value degrades to synchronous iteration");
                }
                let arr = self.lower_expr(right)?;
                self.lower_indexed_loop(arr, left, body, label)
            }
        }
    }

    /// Detects whether `expr` is known to produce a generator — either a
    /// direct call to a declared `function*`, or an identifier previously
    /// tracked in the builtin-kind side table (`let g = makeGen(); for (v of
    /// g) {}`, §4.5/§9). Returns the generator's `is_async` flag on a hit.
    fn generator_kind_of(&self, expr: &crate::ast::Expr) -> Option<bool> {
        use crate::ast::Expr;
        match expr {
            Expr::Call { callee, .. } => match &**callee {
                Expr::Identifier(id) => self
                    .module
                    .get_function(&id.name)
                    .filter(|f| f.is_generator)
                    .map(|f| f.is_async),
                _ => None,
            },
            Expr::Identifier(id) => match self.builtin_state.builtin_kind_of(&id.name) {
                Some(crate::lower::BuiltinKind::Generator { is_async }) => Some(*is_async),
                _ => None,
            },
            _ => None,
        }
    }

    /// Shared index-driven loop shape for `for-in` (over `object_keys`) and
    /// array `for-of` (over the array directly) — both walk `[0, length)`
    /// reading one element per iteration via `value_array_at`.
    fn lower_indexed_loop(
        &mut self,
        collection: ValueId,
        left: &ForHead,
        body: &Stmt,
        label: Option<String>,
    ) -> LowerResult<()> {
        self.module.declare_external(
            arrays::LENGTH,
            vec![HirType::pointer_to(HirType::any(), true)],
            HirType::i64(),
        )?;
        self.module.declare_external(
            arrays::AT,
            vec![HirType::pointer_to(HirType::any(), true), HirType::i64()],
            HirType::any(),
        )?;
        let length = self
            .builder_mut()
            .build_call(arrays::LENGTH, vec![collection], HirType::i64())?
            .ok_or_else(|| LowerError::internal("value_array_length returned void"))?;

        let idx_slot = self.builder_mut().build_alloca(HirType::i64())?;
        let zero = self.builder_mut().const_i64(0);
        self.builder_mut().build_store(idx_slot, zero)?;

        let cond_bb = self.builder_mut().create_block();
        let body_bb = self.builder_mut().create_block();
        let increment_bb = self.builder_mut().create_block();
        let end_bb = self.builder_mut().create_block();
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(cond_bb);
        let idx = self.builder_mut().build_load(idx_slot)?;
        let in_range = self.builder_mut().build_binary(Opcode::Lt, idx, length)?;
        self.builder_mut().build_cond_br(in_range, body_bb, end_bb)?;

        self.builder_mut().set_insert_point(body_bb);
        let idx = self.builder_mut().build_load(idx_slot)?;
        let element = self
            .builder_mut()
            .build_call(arrays::AT, vec![collection, idx], HirType::any())?
            .ok_or_else(|| LowerError::internal("value_array_at returned void"))?;
        self.bind_for_head(left, element)?;

        self.loop_stack.push(LoopTargets {
            label,
            break_target: end_bb,
            continue_target: Some(increment_bb),
        });
        self.lower_statement(body)?;
        self.loop_stack.pop();
        self.branch_if_open(increment_bb)?;

        self.builder_mut().set_insert_point(increment_bb);
        let idx = self.builder_mut().build_load(idx_slot)?;
        let one = self.builder_mut().const_i64(1);
        let next = self.builder_mut().build_binary(Opcode::Add, idx, one)?;
        self.builder_mut().build_store(idx_slot, next)?;
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(end_bb);
        Ok(())
    }

    /// `for (const v of generatorCall())` drives the iterator protocol
    /// directly: `generator_next`/`async_generator_next` each iteration,
    /// `iterator_result_done` as the loop test, `iterator_result_value` as
    /// the bound element (§4.5). `use_async` selects the `async_generator_*`
    /// next call for a genuine `for await ... of` over an async generator
    /// (§4.8 last sentence); any other case — including a degraded
    /// `for await` — uses the synchronous `generator_next`.
    fn lower_for_of_generator(
        &mut self,
        left: &ForHead,
        right: &crate::ast::Expr,
        body: &Stmt,
        label: Option<String>,
        use_async: bool,
    ) -> LowerResult<()> {
        let gen_ptr = self.lower_expr(right)?;
        let ptr_any = HirType::pointer_to(HirType::any(), true);
        let next_fn = if use_async { gen_abi::ASYNC_NEXT } else { gen_abi::NEXT };
        self.module
            .declare_external(next_fn, vec![ptr_any.clone(), HirType::i64()], ptr_any.clone())?;
        self.module
            .declare_external(gen_abi::ITERATOR_RESULT_DONE, vec![ptr_any.clone()], HirType::bool())?;
        self.module
            .declare_external(gen_abi::ITERATOR_RESULT_VALUE, vec![ptr_any.clone()], HirType::any())?;

        let cond_bb = self.builder_mut().create_block();
        let body_bb = self.builder_mut().create_block();
        let end_bb = self.builder_mut().create_block();
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(cond_bb);
        let zero = self.builder_mut().const_i64(0);
        let result = self
            .builder_mut()
            .build_call(next_fn, vec![gen_ptr, zero], ptr_any.clone())?
            .ok_or_else(|| LowerError::internal("generator_next returned void"))?;
        let done = self
            .builder_mut()
            .build_call(gen_abi::ITERATOR_RESULT_DONE, vec![result], HirType::bool())?
            .ok_or_else(|| LowerError::internal("iterator_result_done returned void"))?;
        let not_done = self.builder_mut().build_unary(Opcode::Not, done)?;
        self.builder_mut().build_cond_br(not_done, body_bb, end_bb)?;

        self.builder_mut().set_insert_point(body_bb);
        let value = self
            .builder_mut()
            .build_call(gen_abi::ITERATOR_RESULT_VALUE, vec![result], HirType::any())?
            .ok_or_else(|| LowerError::internal("iterator_result_value returned void"))?;
        self.bind_for_head(left, value)?;

        self.loop_stack.push(LoopTargets {
            label,
            break_target: end_bb,
            continue_target: Some(cond_bb),
        });
        self.lower_statement(body)?;
        self.loop_stack.pop();
        self.branch_if_open(cond_bb)?;

        self.builder_mut().set_insert_point(end_bb);
        Ok(())
    }

    // ---- break / continue / return / throw (§4.5) ----

    /// `break`/`continue` with an empty target stack is a semantic error
    /// (§4.10): diagnosed and left to emit no branch, never `?`-propagated.
    fn find_loop_target(&mut self, label: Option<&str>, want_continue: bool) -> Option<BlockId> {
        let found = match label {
            None => self.loop_stack.last().cloned(),
            Some(l) => self
                .loop_stack
                .iter()
                .rev()
                .find(|t| t.label.as_deref() == Some(l))
                .cloned(),
        };
        let target = match found {
            Some(t) => t,
            None => {
                match label {
                    Some(l) => self.diagnose(format!("undefined label '{l}'")),
                    None => self.diagnose("break/continue used outside a loop or switch"),
                }
                return None;
            }
        };
        if want_continue {
            if target.continue_target.is_none() {
                self.diagnose("continue target not available here (e.g. inside a switch)");
            }
            target.continue_target
        } else {
            Some(target.break_target)
        }
    }

    fn lower_break(&mut self, label: Option<&str>) -> LowerResult<()> {
        if let Some(target) = self.find_loop_target(label, false) {
            self.builder_mut().build_br(target)?;
        }
        Ok(())
    }

    fn lower_continue(&mut self, label: Option<&str>) -> LowerResult<()> {
        if let Some(target) = self.find_loop_target(label, true) {
            self.builder_mut().build_br(target)?;
        }
        Ok(())
    }

    fn lower_return(&mut self, expr: Option<&crate::ast::Expr>) -> LowerResult<()> {
        match expr {
            Some(e) => {
                let v = self.lower_expr(e)?;
                self.builder_mut().build_return(Some(v))?;
            }
            None => {
                self.builder_mut().build_return(None)?;
            }
        }
        Ok(())
    }

    /// `throw` inside a `try` jumps straight to its (innermost) catch block;
    /// outside any `try` it is unreachable past this point (§4.5). A call
    /// that throws internally, without an explicit `throw` statement here,
    /// does not itself unwind at this IR tier — that is left to the runtime
    /// ABI's own stack-based exception bookkeeping (§6).
    fn lower_throw(&mut self, expr: &crate::ast::Expr) -> LowerResult<()> {
        let v = self.lower_expr(expr)?;
        self.module
            .declare_external(exceptions::THROW, vec![HirType::any()], HirType::void())?;
        self.builder_mut().build_call(exceptions::THROW, vec![v], HirType::void())?;
        match self.current_catch.last().copied() {
            Some(ctx) => {
                self.builder_mut().build_br(ctx.catch_block)?;
            }
            None => {
                self.builder_mut().build_unreachable()?;
            }
        }
        Ok(())
    }

    // ---- try / catch / finally (§4.5) ----

    fn lower_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) -> LowerResult<()> {
        self.module.declare_external(exceptions::TRY_BEGIN, vec![], HirType::void())?;
        self.module
            .declare_external(exceptions::GET_EXCEPTION, vec![], HirType::any())?;

        let catch_bb = self.builder_mut().create_block();
        let end_bb = self.builder_mut().create_block();

        self.builder_mut().build_call(exceptions::TRY_BEGIN, vec![], HirType::void())?;
        self.current_catch.push(CatchContext { catch_block: catch_bb });
        for stmt in block {
            self.lower_statement(stmt)?;
        }
        self.current_catch.pop();
        self.branch_if_open(end_bb)?;

        self.builder_mut().set_insert_point(catch_bb);
        if let Some(h) = handler {
            let exc = self
                .builder_mut()
                .build_call(exceptions::GET_EXCEPTION, vec![], HirType::any())?
                .ok_or_else(|| LowerError::internal("nova_get_exception returned void"))?;
            if let Some(param) = &h.param {
                self.bind_pattern(param, exc)?;
            }
            for stmt in &h.body {
                self.lower_statement(stmt)?;
            }
        }
        self.branch_if_open(end_bb)?;

        self.builder_mut().set_insert_point(end_bb);
        if let Some(fin) = finalizer {
            for stmt in fin {
                self.lower_statement(stmt)?;
            }
        }
        Ok(())
    }

    fn lower_labeled(&mut self, label: &str, body: &Stmt) -> LowerResult<()> {
        // Loop/switch statements already carry their own `label` field and
        // install it directly into their own `LoopTargets`; a label on any
        // other statement shape only needs to support `break label;` past
        // it, modeled as a break-only target with no continue.
        match body {
            Stmt::While { .. }
            | Stmt::DoWhile { .. }
            | Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. }
            | Stmt::Switch { .. } => self.lower_statement(body),
            _ => {
                let end_bb = self.builder_mut().create_block();
                self.loop_stack.push(LoopTargets {
                    label: Some(label.to_string()),
                    break_target: end_bb,
                    continue_target: None,
                });
                self.lower_statement(body)?;
                self.loop_stack.pop();
                self.branch_if_open(end_bb)?;
                self.builder_mut().set_insert_point(end_bb);
                Ok(())
            }
        }
    }

    // ---- declarations with no runtime lowering of their own ----

    fn lower_declaration(&mut self, decl: &Decl) -> LowerResult<()> {
        match decl {
            // Type-only forms are erased entirely (§1 non-goal: type
            // checking) — nothing survives into the HIR.
            Decl::Interface { .. } | Decl::TypeAlias { .. } => Ok(()),
            Decl::Enum { name, members } => self.lower_enum(name, members),
            // Module resolution is out of scope (§1) — an import only needs
            // its bindings to exist as *something* resolvable, which a
            // bundler-level pass ahead of this one is assumed to rewrite
            // into ordinary declarations before lowering ever sees them.
            Decl::Import { .. } => Ok(()),
            Decl::ExportNamed { declaration, .. } => {
                if let Some(d) = declaration {
                    self.lower_statement(d)?;
                }
                Ok(())
            }
            Decl::ExportDefault { expr } => {
                self.lower_expr(expr)?;
                Ok(())
            }
            Decl::ExportAll { .. } => Ok(()),
        }
    }

    /// Binds each member as a dotted-name constant (`Color.Red`) directly in
    /// the current scope — the core has no separate module-level constant
    /// registry distinct from ordinary scope bindings (§3.6).
    fn lower_enum(&mut self, name: &str, members: &[(String, Option<crate::ast::Expr>)]) -> LowerResult<()> {
        let mut auto_value = 0i64;
        for (member_name, value) in members {
            let v = match value {
                Some(e) => self.lower_expr(e)?,
                None => self.builder_mut().const_i64(auto_value),
            };
            auto_value += 1;
            self.declare_binding(&format!("{name}.{member_name}"), v)?;
        }
        Ok(())
    }
}

/// Maps a `new`-constructor name to the typed-array kind it produces, for
/// the builtin-kind side table (§4.4, §9). Not a typed array if unrecognized.
fn typed_array_kind_from_name(name: &str) -> Option<crate::lower::TypedArrayKind> {
    use crate::lower::TypedArrayKind;
    Some(match name {
        "Int8Array" => TypedArrayKind::Int8,
        "Uint8Array" => TypedArrayKind::Uint8,
        "Uint8ClampedArray" => TypedArrayKind::Uint8Clamped,
        "Int16Array" => TypedArrayKind::Int16,
        "Uint16Array" => TypedArrayKind::Uint16,
        "Int32Array" => TypedArrayKind::Int32,
        "Uint32Array" => TypedArrayKind::Uint32,
        "Float32Array" => TypedArrayKind::Float32,
        "Float64Array" => TypedArrayKind::Float64,
        "BigInt64Array" => TypedArrayKind::BigInt64,
        "BigUint64Array" => TypedArrayKind::BigUint64,
        _ => return None,
    })
}
