//! C7 — functions and closures.
//!
//! Grounded on `original_source/src/hir/HIRGen_Functions.cpp`'s
//! `visit(FunctionExpr&)`/`visit(ArrowFunctionExpr&)`: save/swap the current
//! function and builder context, push the caller's symbol table, generate
//! the body, then install the closure environment *after* the fact. The
//! speculative-`__env`-parameter protocol itself (append before body
//! generation, install the real type after) is specified explicitly in
//! `spec.md` §4.6 and followed literally here.

use jsaot_hir::{Function, HirType, Parameter, StructField, StructType, ValueId};

use crate::ast::{ArrowBody, ArrowFunctionExpr, FunctionDecl, FunctionExpr, FunctionParam, TypeAnnotation};
use crate::error::{LowerError, LowerResult};
use crate::lower::HirGenerator;

/// Best-effort mapping from a surface type annotation name to a HIR type.
/// Unannotated/unrecognized parameters stay `any` — the core does not run a
/// type checker (§1 non-goal: full semantic fidelity).
pub(crate) fn type_from_annotation(ann: &Option<TypeAnnotation>) -> HirType {
    match ann.as_ref().map(|a| a.name.as_str()) {
        Some("number") => HirType::f64(),
        Some("string") => HirType::string(),
        Some("boolean") => HirType::bool(),
        Some("void") => HirType::void(),
        _ => HirType::any(),
    }
}

/// Placeholder empty-struct-pointer type for the speculative `__env`
/// parameter (§4.6), before the real capture set is known.
fn env_placeholder_type() -> HirType {
    let s = StructType::new("__env_placeholder", vec![]);
    HirType::pointer_to(HirType::struct_ty(s), false)
}

impl HirGenerator {
    pub fn lower_function_declaration(&mut self, decl: &FunctionDecl) -> LowerResult<()> {
        let value = self.lower_function_common(
            decl.name.clone(),
            &decl.function.params,
            &decl.function.body,
            decl.function.is_async,
            decl.function.is_generator,
        )?;
        self.scopes.declare(decl.name.clone(), value);
        Ok(())
    }

    pub fn lower_function_expr(&mut self, expr: &FunctionExpr) -> LowerResult<ValueId> {
        let name = expr.name.clone().unwrap_or_else(|| self.fresh_func_name());
        self.lower_function_common(name, &expr.params, &expr.body, expr.is_async, expr.is_generator)
    }

    /// Shared lowering for function declarations and named/anonymous
    /// function expressions — declarations and expressions share one
    /// lowering path (§4.6).
    fn lower_function_common(
        &mut self,
        name: String,
        params: &[FunctionParam],
        body: &[crate::ast::Stmt],
        is_async: bool,
        is_generator: bool,
    ) -> LowerResult<ValueId> {
        let mut builder = Function::builder(name.clone())
            .is_async(is_async)
            .is_generator(is_generator)
            .return_type(HirType::any());
        // Generators take a leading generator-pointer param and an input
        // integer param ahead of the user parameter list (§4.8).
        if is_generator {
            builder = builder
                .param("__gen", HirType::pointer_to(HirType::any(), true))
                .param("__input", HirType::i64());
        }
        let param_offset = if is_generator { 2u32 } else { 0 };
        for p in params {
            let pname = pattern_name(&p.pattern);
            builder = builder.param(pname, type_from_annotation(&p.type_annotation));
        }
        self.module.add_function(builder.build())?;

        let parent = self.current_function.clone();
        if let Some(parent) = parent {
            self.function_stack.push(parent);
        }
        self.current_function = Some(name.clone());
        self.last_function_name = Some(name.clone());

        let entry = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(entry);
        self.scopes.enter_function();

        // Speculative trailing `__env` parameter (§4.6).
        let env_index = param_offset + params.len() as u32;
        self.module
            .get_function_mut(&name)
            .unwrap()
            .push_trailing_param(Parameter::new("__env", env_placeholder_type()));
        let env_value = self
            .builder_mut()
            .make_constant(jsaot_hir::ValueKind::Param(env_index), env_placeholder_type());
        self.scopes.declare("__env", env_value);

        let gen_value = if is_generator {
            Some(self.builder_mut().make_constant(
                jsaot_hir::ValueKind::Param(0),
                HirType::pointer_to(HirType::any(), true),
            ))
        } else {
            None
        };
        if let Some(gen_value) = gen_value {
            self.enter_generator_context(gen_value, is_async)?;
        }

        for (i, p) in params.iter().enumerate() {
            let pname = pattern_name(&p.pattern);
            let ty = type_from_annotation(&p.type_annotation);
            let pvalue = self
                .builder_mut()
                .make_constant(jsaot_hir::ValueKind::Param(param_offset + i as u32), ty);
            self.scopes.declare(pname, pvalue);
        }

        for stmt in body {
            self.lower_statement(stmt)?;
        }

        if is_generator {
            self.finish_generator_body()?;
        }

        self.finish_function_body(HirType::any())?;
        self.install_closure_environment(&name)?;

        self.scopes.exit_function();
        self.current_function = self.function_stack.pop();

        // lastFunctionName_ is deliberately NOT restored — it keeps pointing
        // at the function that just finished.
        Ok(self.builder_mut().const_string(name))
    }

    pub fn lower_arrow_function(&mut self, arrow: &ArrowFunctionExpr) -> LowerResult<ValueId> {
        let name = self.fresh_arrow_name();
        let mut builder = Function::builder(name.clone())
            .is_async(arrow.is_async)
            .return_type(HirType::any());
        for p in &arrow.params {
            builder = builder.param(pattern_name(&p.pattern), type_from_annotation(&p.type_annotation));
        }
        self.module.add_function(builder.build())?;

        let parent = self.current_function.clone();
        if let Some(parent) = parent {
            self.function_stack.push(parent);
        }
        self.current_function = Some(name.clone());
        self.last_function_name = Some(name.clone());

        let entry = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(entry);
        self.scopes.enter_function();

        let env_index = arrow.params.len() as u32;
        self.module
            .get_function_mut(&name)
            .unwrap()
            .push_trailing_param(Parameter::new("__env", env_placeholder_type()));
        let env_value = self
            .builder_mut()
            .make_constant(jsaot_hir::ValueKind::Param(env_index), env_placeholder_type());
        self.scopes.declare("__env", env_value);

        for (i, p) in arrow.params.iter().enumerate() {
            let ty = type_from_annotation(&p.type_annotation);
            let pvalue = self
                .builder_mut()
                .make_constant(jsaot_hir::ValueKind::Param(i as u32), ty);
            self.scopes.declare(pattern_name(&p.pattern), pvalue);
        }

        let inferred_return = match &arrow.body {
            ArrowBody::Expression(expr) => {
                let value = self.lower_expr(expr)?;
                // §4.6: a `bool` expression-body result widens to i64 so the
                // arrow's ABI matches i64-returning runtime callbacks.
                let ty = self.builder_mut().value_type(value).clone();
                let (value, ty) = if ty.is_bool() {
                    (self.builder_mut().build_bool_zext(value)?, HirType::i64())
                } else {
                    (value, ty)
                };
                self.builder_mut().build_return(Some(value))?;
                ty
            }
            ArrowBody::Block(stmts) => {
                for stmt in stmts {
                    self.lower_statement(stmt)?;
                }
                HirType::any()
            }
        };

        self.finish_function_body(inferred_return.clone())?;
        self.install_closure_environment(&name)?;
        self.module.get_function_mut(&name).unwrap().return_type = inferred_return;

        self.scopes.exit_function();
        self.current_function = self.function_stack.pop();

        Ok(self.builder_mut().const_string(name))
    }

    /// Builds the real environment struct from the capture set recorded
    /// during body generation and installs it as the `__env` parameter's
    /// type, or removes the speculative parameter entirely if nothing was
    /// captured (§4.6).
    fn install_closure_environment(&mut self, func_name: &str) -> LowerResult<()> {
        let field_names = self
            .environment_field_names
            .get(func_name)
            .cloned()
            .unwrap_or_default();
        if field_names.is_empty() {
            self.module
                .get_function_mut(func_name)
                .unwrap()
                .pop_trailing_param();
            return Ok(());
        }

        let parent_name = self.function_stack.last().cloned();
        let field_values = self.environment_field_values.get(func_name).cloned().unwrap_or_default();
        let mut fields = Vec::with_capacity(field_names.len());
        for (name, value) in field_names.iter().zip(field_values.iter()) {
            let ty = parent_name
                .as_ref()
                .and_then(|p| self.module.get_function(p))
                .and_then(|f| f.peek_value_type(*value))
                .cloned()
                .unwrap_or_else(HirType::i64);
            fields.push(StructField::new(name.clone(), ty, false));
        }

        let struct_ty = StructType::new(format!("__closure_env_{func_name}"), fields);
        self.module.add_struct(struct_ty.clone())?;

        let env_ty = HirType::pointer_to(HirType::struct_ty(struct_ty.clone()), false);
        let f = self.module.get_function_mut(func_name).unwrap();
        let last = f
            .pop_trailing_param()
            .ok_or_else(|| LowerError::internal("missing speculative __env parameter"))?;
        f.push_trailing_param(Parameter::new(last.name, env_ty.clone()));

        self.module
            .record_closure(func_name.to_string(), env_ty, field_names);
        Ok(())
    }
}

pub(crate) fn pattern_name(pattern: &crate::ast::Pattern) -> String {
    match pattern {
        crate::ast::Pattern::Identifier(id) => id.name.clone(),
        _ => "__pattern".to_string(),
    }
}
