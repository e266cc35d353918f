//! C8 — classes: struct synthesis, constructors, methods, and virtual
//! method resolution (§4.7). Grounded on `original_source`'s
//! `HIRGen_Classes.cpp` `visit(ClassExpr&)`/`generateConstructor`, adapted to
//! this crate's builder and per-function value arena.

use std::collections::HashSet;
use std::rc::Rc;

use jsaot_hir::{Function, HirType, Opcode, StructField, StructType, ValueId};

use crate::ast::{ClassDecl, ClassExpr, ClassMethod, ClassMethodKind, Expr, Literal, MemberProperty};
use crate::error::{LowerError, LowerResult};
use crate::function::{pattern_name, type_from_annotation};
use crate::lower::{ClassMeta, FieldInitValue, HirGenerator};
use crate::runtime_abi::libc;

/// Every class instance is allocated at this fixed field capacity regardless
/// of its actual declared field count (§4.7), matching
/// `HIRGen_Classes.cpp`'s `MAX_FIELDS = 8` — a derived class's instance
/// pointer can then be reinterpreted as its own struct type without
/// reallocating when it's built from a `super(...)` call's return value.
const MAX_FIELDS: i64 = 8;

/// `24` header bytes (matching `HIRGen_Classes.cpp`'s layout) plus 8 bytes
/// per field slot, fixed at `MAX_FIELDS` regardless of how many fields this
/// particular class declares.
fn instance_size() -> i64 {
    24 + MAX_FIELDS * 8
}

pub(crate) fn constructor_name(class_name: &str) -> String {
    format!("{class_name}_new")
}

fn method_name(class_name: &str, method: &str) -> String {
    format!("{class_name}_{method}")
}

fn getter_name(class_name: &str, field: &str) -> String {
    format!("{class_name}_get_{field}")
}

fn setter_name(class_name: &str, field: &str) -> String {
    format!("{class_name}_set_{field}")
}

fn field_init_from_literal(lit: &Literal) -> FieldInitValue {
    match lit {
        Literal::String(s) => FieldInitValue::String(s.clone()),
        Literal::Number(n) => FieldInitValue::Number(*n),
        _ => FieldInitValue::Any,
    }
}

fn field_init_default_type(v: &FieldInitValue) -> HirType {
    match v {
        FieldInitValue::String(_) => HirType::string(),
        FieldInitValue::Number(_) => HirType::f64(),
        FieldInitValue::Any => HirType::any(),
    }
}

fn field_init_default_value(b: &mut jsaot_hir::IrBuilder, v: &FieldInitValue) -> ValueId {
    match v {
        FieldInitValue::String(s) => b.const_string(s.clone()),
        FieldInitValue::Number(n) => b.const_f64(*n),
        FieldInitValue::Any => b.null_sentinel(),
    }
}

impl HirGenerator {
    pub fn lower_class_declaration(&mut self, decl: &ClassDecl) -> LowerResult<()> {
        let value = self.lower_class_expr_named(decl.name.clone(), &decl.class)?;
        self.scopes.declare(decl.name.clone(), value);
        Ok(())
    }

    pub fn lower_class_expr(&mut self, expr: &ClassExpr) -> LowerResult<ValueId> {
        let name = expr
            .name
            .clone()
            .unwrap_or_else(|| format!("__class_{}", self.next_anon_struct_id()));
        self.lower_class_expr_named(name, expr)
    }

    fn lower_class_expr_named(&mut self, name: String, expr: &ClassExpr) -> LowerResult<ValueId> {
        let parent_name = match &expr.super_class {
            Some(boxed) => match boxed.as_ref() {
                Expr::Identifier(id) => Some(id.name.clone()),
                _ => return Err(LowerError::unsupported("'extends' with a non-identifier expression")),
            },
            None => None,
        };
        let parent_meta = parent_name.as_ref().and_then(|p| self.classes.get(p)).cloned();

        let mut fields: Vec<StructField> = Vec::new();
        if let Some(parent) = &parent_meta {
            fields.extend(parent.struct_ty.fields.iter().cloned());
        }

        let mut own_field_inits: Vec<(String, FieldInitValue)> = Vec::new();
        for prop in &expr.body.properties {
            if prop.is_static {
                continue;
            }
            let init = match &prop.value {
                Some(Expr::Literal(lit)) => field_init_from_literal(lit),
                _ => FieldInitValue::Any,
            };
            own_field_inits.push((prop.name.clone(), init));
        }
        if let Some(ctor) = find_constructor(expr) {
            scan_this_assignments(&ctor.function.body, &mut own_field_inits);
        }
        for (field_name, init) in &own_field_inits {
            if fields.iter().any(|f| f.name == *field_name) {
                continue;
            }
            fields.push(StructField::new(field_name.clone(), field_init_default_type(init), true));
        }

        let struct_ty = StructType::new(name.clone(), fields);
        self.module.add_struct(struct_ty.clone())?;

        let mut own_methods = HashSet::new();
        let mut own_getters = HashSet::new();
        let mut own_setters = HashSet::new();
        for m in &expr.body.methods {
            match m.kind {
                ClassMethodKind::Method => {
                    own_methods.insert(m.name.clone());
                }
                ClassMethodKind::Getter => {
                    own_getters.insert(m.name.clone());
                }
                ClassMethodKind::Setter => {
                    own_setters.insert(m.name.clone());
                }
                ClassMethodKind::Constructor => {}
            }
        }

        let mut static_values = std::collections::HashMap::new();
        for prop in &expr.body.properties {
            if prop.is_static {
                if let Some(Expr::Literal(lit)) = &prop.value {
                    static_values.insert(prop.name.clone(), lit.clone());
                }
            }
        }

        let explicit_ctor = find_constructor(expr);
        let ctor_params: Vec<HirType> = match explicit_ctor {
            Some(c) => c
                .function
                .params
                .iter()
                .map(|p| type_from_annotation(&p.type_annotation))
                .collect(),
            None => parent_meta.as_ref().map(|p| p.ctor_params.clone()).unwrap_or_default(),
        };
        let ctor_param_count = ctor_params.len();

        self.classes.insert(
            name.clone(),
            ClassMeta {
                struct_ty: struct_ty.clone(),
                parent: parent_name.clone(),
                own_methods,
                own_getters,
                own_setters,
                static_values,
                field_init_values: own_field_inits,
                ctor_param_count,
                ctor_params,
            },
        );

        self.lower_constructor(&name, &struct_ty, expr, parent_name.as_deref(), parent_meta.as_ref())?;
        for m in &expr.body.methods {
            match m.kind {
                ClassMethodKind::Method => self.lower_method_fn(&name, &struct_ty, m)?,
                ClassMethodKind::Getter => self.lower_accessor_fn(&name, &struct_ty, m, true)?,
                ClassMethodKind::Setter => self.lower_accessor_fn(&name, &struct_ty, m, false)?,
                ClassMethodKind::Constructor => {}
            }
        }

        Ok(self.builder_mut().const_string(name))
    }

    fn lower_constructor(
        &mut self,
        class_name: &str,
        struct_ty: &Rc<StructType>,
        expr: &ClassExpr,
        parent_name: Option<&str>,
        parent_meta: Option<&ClassMeta>,
    ) -> LowerResult<()> {
        let ctor_fn_name = constructor_name(class_name);
        let explicit = find_constructor(expr);
        let meta = self.classes.get(class_name).cloned().expect("class just registered");

        let params: Vec<(String, HirType)> = match explicit {
            Some(c) => c
                .function
                .params
                .iter()
                .map(|p| (pattern_name(&p.pattern), type_from_annotation(&p.type_annotation)))
                .collect(),
            None => meta
                .ctor_params
                .iter()
                .enumerate()
                .map(|(i, ty)| (format!("__p{i}"), ty.clone()))
                .collect(),
        };

        let instance_ty = HirType::pointer_to(HirType::struct_ty(struct_ty.clone()), true);
        let mut builder = Function::builder(ctor_fn_name.clone()).return_type(instance_ty.clone());
        for (pname, ty) in &params {
            builder = builder.param(pname.clone(), ty.clone());
        }
        self.module.declare_external(
            libc::MALLOC,
            vec![HirType::i64()],
            HirType::pointer_to(HirType::i8(), true),
        )?;
        self.module.add_function(builder.build())?;

        let parent = self.current_function.clone();
        if let Some(parent) = parent {
            self.function_stack.push(parent);
        }
        self.current_function = Some(ctor_fn_name.clone());
        self.last_function_name = Some(ctor_fn_name.clone());

        let entry = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(entry);
        self.scopes.enter_function();

        for (i, (pname, _)) in params.iter().enumerate() {
            let pvalue = self
                .builder_mut()
                .make_constant(jsaot_hir::ValueKind::Param(i as u32), params[i].1.clone());
            self.scopes.declare(pname.clone(), pvalue);
        }

        // §4.7: a constructor whose first statement is `super(...)` does not
        // allocate its own instance — it reuses the pointer the parent
        // constructor returns. Every other constructor allocates up front.
        let leading_super = explicit.and_then(|ctor| {
            let first = ctor.function.body.first()?;
            is_super_call(first).then_some(first)
        });

        let instance = match leading_super {
            Some(super_stmt) => {
                self.lower_super_call_as_this(super_stmt, parent_name, parent_meta, &instance_ty)?
            }
            None => self.alloc_instance(&instance_ty)?,
        };
        self.current_this.push(instance);
        self.current_class_struct_type.push(struct_ty.clone());

        // Default every field to its declared init value first (§4.7 step
        // 3), walking from the furthest ancestor down so a nearer class's
        // default wins, then letting explicit constructor statements
        // override further below. When `this` came from `super(...)`, the
        // parent constructor already ran this replay for every inherited
        // field — only this class's own field inits still apply.
        if leading_super.is_none() {
            let mut chain = Vec::new();
            let mut cursor = parent_meta.cloned();
            while let Some(m) = cursor {
                chain.push(m.clone());
                cursor = m.parent.as_ref().and_then(|p| self.classes.get(p)).cloned();
            }
            for ancestor in chain.iter().rev() {
                self.apply_field_inits(struct_ty, instance, &ancestor.field_init_values)?;
            }
        }
        let field_inits = meta.field_init_values.clone();
        self.apply_field_inits(struct_ty, instance, &field_inits)?;

        if let Some(ctor) = explicit {
            let mut stmts = ctor.function.body.iter();
            if leading_super.is_some() {
                stmts.next();
            }
            for stmt in stmts {
                self.lower_statement(stmt)?;
            }
        }

        self.builder_mut().build_return(Some(instance))?;
        self.current_this.pop();
        self.current_class_struct_type.pop();
        self.module.get_function_mut(&ctor_fn_name).unwrap().finalize()?;

        self.scopes.exit_function();
        self.current_function = self.function_stack.pop();
        Ok(())
    }

    fn apply_field_inits(
        &mut self,
        struct_ty: &Rc<StructType>,
        instance: ValueId,
        inits: &[(String, FieldInitValue)],
    ) -> LowerResult<()> {
        for (field_name, init) in inits {
            let Some(index) = struct_ty.field_index(field_name) else {
                continue;
            };
            let builder = self.builder_mut();
            let value = field_init_default_value(builder, init);
            builder.build_set_field(instance, index as u32, value)?;
        }
        Ok(())
    }

    /// Mallocs a fixed `MAX_FIELDS`-sized instance buffer and casts it to
    /// `instance_ty` (§4.7) — the only allocation path for an instance not
    /// built from a `super(...)` call's return value.
    fn alloc_instance(&mut self, instance_ty: &HirType) -> LowerResult<ValueId> {
        let size = self.builder_mut().const_i64(instance_size());
        let raw = self
            .builder_mut()
            .build_call(libc::MALLOC, vec![size], HirType::pointer_to(HirType::i8(), true))?
            .ok_or_else(|| LowerError::internal("malloc returned void"))?;
        self.builder_mut().build_cast(raw, instance_ty.clone())
    }

    /// Lowers a leading `super(...)` statement and binds `this` directly to
    /// the pointer the parent constructor returns, reinterpreted as this
    /// class's own struct type (§4.7) — no separate allocation, no field
    /// copy, since inherited fields occupy the same prefix of both layouts.
    ///
    /// `super(...)` in a class with no parent is a semantic error (§4.10):
    /// diagnosed and given a freshly allocated instance as its placeholder
    /// `this` so lowering can continue.
    fn lower_super_call_as_this(
        &mut self,
        stmt: &crate::ast::Stmt,
        parent_name: Option<&str>,
        parent_meta: Option<&ClassMeta>,
        instance_ty: &HirType,
    ) -> LowerResult<ValueId> {
        let crate::ast::Stmt::Expression(Expr::Call { args, .. }) = stmt else {
            return Err(LowerError::internal("super-call scan matched a non-call statement"));
        };
        let Some(parent) = parent_meta else {
            self.diagnose("super(...) used in a class with no parent");
            return self.alloc_instance(instance_ty);
        };
        let parent_name = parent_name.ok_or_else(|| LowerError::internal("parent class has no name"))?;
        let lowered_args = {
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                match a {
                    crate::ast::ArrayElement::Item(e) | crate::ast::ArrayElement::Spread(e) => {
                        values.push(self.lower_expr(e)?)
                    }
                    crate::ast::ArrayElement::Hole => values.push(self.builder_mut().null_sentinel()),
                }
            }
            values
        };
        let parent_ctor = constructor_name(parent_name);
        let parent_instance = self
            .builder_mut()
            .build_call(
                parent_ctor,
                lowered_args,
                HirType::pointer_to(HirType::struct_ty(parent.struct_ty.clone()), true),
            )?
            .ok_or_else(|| LowerError::internal("parent constructor returned void"))?;

        self.builder_mut().build_cast(parent_instance, instance_ty.clone())
    }

    fn lower_method_fn(&mut self, class_name: &str, struct_ty: &Rc<StructType>, m: &ClassMethod) -> LowerResult<()> {
        let fn_name = method_name(class_name, &m.name);
        self.lower_method_common(fn_name, struct_ty, m)
    }

    fn lower_accessor_fn(
        &mut self,
        class_name: &str,
        struct_ty: &Rc<StructType>,
        m: &ClassMethod,
        is_getter: bool,
    ) -> LowerResult<()> {
        let fn_name = if is_getter {
            getter_name(class_name, &m.name)
        } else {
            setter_name(class_name, &m.name)
        };
        self.lower_method_common(fn_name, struct_ty, m)
    }

    /// Shared method/getter/setter lowering: a leading `this` parameter
    /// (struct pointer) followed by the method's own declared parameters.
    fn lower_method_common(
        &mut self,
        fn_name: String,
        struct_ty: &Rc<StructType>,
        m: &ClassMethod,
    ) -> LowerResult<()> {
        let this_ty = HirType::pointer_to(HirType::struct_ty(struct_ty.clone()), true);
        let mut builder = Function::builder(fn_name.clone())
            .param("this", this_ty.clone())
            .return_type(HirType::any());
        for p in &m.function.params {
            builder = builder.param(pattern_name(&p.pattern), type_from_annotation(&p.type_annotation));
        }
        self.module.add_function(builder.build())?;

        let parent = self.current_function.clone();
        if let Some(parent) = parent {
            self.function_stack.push(parent);
        }
        self.current_function = Some(fn_name.clone());
        self.last_function_name = Some(fn_name.clone());

        let entry = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(entry);
        self.scopes.enter_function();

        let this_value = self
            .builder_mut()
            .make_constant(jsaot_hir::ValueKind::Param(0), this_ty);
        self.current_this.push(this_value);
        self.current_class_struct_type.push(struct_ty.clone());

        for (i, p) in m.function.params.iter().enumerate() {
            let ty = type_from_annotation(&p.type_annotation);
            let pvalue = self
                .builder_mut()
                .make_constant(jsaot_hir::ValueKind::Param(i as u32 + 1), ty);
            self.scopes.declare(pattern_name(&p.pattern), pvalue);
        }

        for stmt in &m.function.body {
            self.lower_statement(stmt)?;
        }

        // §4.7: when the declared return type is unannotated ("any"), infer
        // from the first `return <expr>` emitted in the body instead of
        // leaving every call site stuck with `any`.
        let inferred = self.infer_first_return_type();
        self.finish_function_body(inferred.clone())?;
        self.module.get_function_mut(&fn_name).unwrap().return_type = inferred;

        self.current_this.pop();
        self.current_class_struct_type.pop();
        self.scopes.exit_function();
        self.current_function = self.function_stack.pop();
        Ok(())
    }

    fn infer_first_return_type(&mut self) -> HirType {
        let name = self.current_fn_name();
        let builder = self.module.get_function_mut(&name).unwrap().builder_mut();
        for block in &builder.blocks {
            for instr in &block.instructions {
                if instr.opcode == Opcode::Return {
                    if let Some(&value) = instr.operands.first() {
                        return builder.value_type(value).clone();
                    }
                    return HirType::void();
                }
            }
        }
        HirType::any()
    }

    /// Walks the ancestor chain starting at `receiver`'s struct type looking
    /// for the nearest class that declares `name` as an own method,
    /// following `ClassMeta::parent` with visited-set cycle detection; a
    /// cycle yields an empty (unresolvable) method name rather than looping
    /// forever (§4.7).
    pub(crate) fn resolve_virtual_method(&mut self, receiver: ValueId, name: &str) -> LowerResult<String> {
        let struct_name = self
            .builder_mut()
            .value_type(receiver)
            .pointee()
            .and_then(|t| t.as_struct())
            .map(|s| s.name.clone());
        let Some(mut current) = struct_name else {
            self.diagnose(format!("method call '{name}' on a non-class value"));
            return Ok(String::new());
        };
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(current.clone()) {
                return Ok(String::new());
            }
            let Some(meta) = self.classes.get(&current) else {
                return Ok(String::new());
            };
            if meta.own_methods.contains(name) {
                return Ok(method_name(&current, name));
            }
            match &meta.parent {
                Some(p) => current = p.clone(),
                None => return Ok(String::new()),
            }
        }
    }

    pub(crate) fn resolve_getter(&mut self, obj: ValueId, name: &str) -> LowerResult<Option<String>> {
        self.resolve_accessor(obj, name, true)
    }

    pub(crate) fn resolve_setter(&mut self, obj: ValueId, name: &str) -> LowerResult<Option<String>> {
        self.resolve_accessor(obj, name, false)
    }

    fn resolve_accessor(&mut self, obj: ValueId, name: &str, is_getter: bool) -> LowerResult<Option<String>> {
        let struct_name = self
            .builder_mut()
            .value_type(obj)
            .pointee()
            .and_then(|t| t.as_struct())
            .map(|s| s.name.clone());
        let Some(mut current) = struct_name else {
            return Ok(None);
        };
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(current.clone()) {
                return Ok(None);
            }
            let Some(meta) = self.classes.get(&current) else {
                return Ok(None);
            };
            let has = if is_getter {
                meta.own_getters.contains(name)
            } else {
                meta.own_setters.contains(name)
            };
            if has {
                return Ok(Some(if is_getter {
                    getter_name(&current, name)
                } else {
                    setter_name(&current, name)
                }));
            }
            match meta.parent.clone() {
                Some(p) => current = p,
                None => return Ok(None),
            }
        }
    }

    /// `new ClassName(args)` (§4.7): calls the synthesized constructor.
    pub(crate) fn construct_instance(&mut self, class_name: &str, args: Vec<ValueId>) -> LowerResult<ValueId> {
        let Some(meta) = self.classes.get(class_name).cloned() else {
            return Err(LowerError::unsupported(format!("unknown class '{class_name}'")));
        };
        let ret_ty = HirType::pointer_to(HirType::struct_ty(meta.struct_ty), true);
        self.builder_mut()
            .build_call(constructor_name(class_name), args, ret_ty)?
            .ok_or_else(|| LowerError::internal("class constructor returned void"))
    }
}

fn find_constructor(expr: &ClassExpr) -> Option<&ClassMethod> {
    expr.body
        .methods
        .iter()
        .find(|m| matches!(m.kind, ClassMethodKind::Constructor))
}

fn is_super_call(stmt: &crate::ast::Stmt) -> bool {
    matches!(
        stmt,
        crate::ast::Stmt::Expression(Expr::Call { callee, .. }) if matches!(callee.as_ref(), Expr::Super)
    )
}

/// Scans a constructor body's top-level statements for `this.x = <expr>`
/// assignments, recording each field's inferred init kind (§4.7 step 3).
fn scan_this_assignments(body: &[crate::ast::Stmt], out: &mut Vec<(String, FieldInitValue)>) {
    use crate::ast::Stmt;
    for stmt in body {
        if let Stmt::Expression(Expr::Assignment {
            op: crate::ast::AssignOp::Assign,
            target,
            value,
        }) = stmt
        {
            if let Expr::Member {
                object,
                property: MemberProperty::Static(field) | MemberProperty::Private(field),
                ..
            } = target.as_ref()
            {
                if matches!(object.as_ref(), Expr::This) {
                    let init = match value.as_ref() {
                        Expr::Literal(lit) => field_init_from_literal(lit),
                        _ => FieldInitValue::Any,
                    };
                    if !out.iter().any(|(n, _)| n == field) {
                        out.push((field.clone(), init));
                    }
                }
            }
        }
    }
}

