//! C5 — expression lowering.

use jsaot_hir::{HirType, Opcode, ValueId};

use crate::ast::{
    ArrayElement, AssignOp, BinaryOp, Expr, Literal, LogicalOp, MemberProperty, ObjectProperty,
    PropertyKey, UnaryOp, UpdateOp,
};
use crate::error::{LowerError, LowerResult};
use crate::lower::HirGenerator;
use crate::runtime_abi::{arrays, bigint, regexp, typed_arrays};

impl HirGenerator {
    pub fn lower_expr(&mut self, expr: &Expr) -> LowerResult<ValueId> {
        match expr {
            Expr::Literal(lit) => self.lower_literal(lit),
            Expr::Identifier(id) => self.resolve_identifier(&id.name),
            Expr::This => self.current_this(),
            Expr::Super => self
                .current_this
                .last()
                .copied()
                .ok_or_else(|| LowerError::unsupported("'super' used with no parent class")),
            Expr::Binary { op, left, right } => self.lower_binary(*op, left, right),
            Expr::Logical { op, left, right } => self.lower_logical(*op, left, right),
            Expr::Unary { op, operand } => self.lower_unary(*op, operand),
            Expr::Update { op, prefix, target } => self.lower_update(*op, *prefix, target),
            Expr::Assignment { op, target, value } => self.lower_assignment(*op, target, value),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => self.lower_conditional(test, consequent, alternate),
            Expr::Call {
                callee,
                args,
                optional,
            } => self.lower_call(callee, args, *optional),
            Expr::New { callee, args } => self.lower_new(callee, args),
            Expr::Member {
                object,
                property,
                optional,
            } => self.lower_member_read(object, property, *optional),
            Expr::Array(elements) => self.lower_array_literal(elements),
            Expr::Object(props) => self.lower_object_literal(props),
            Expr::Spread(inner) => self.lower_expr(inner),
            Expr::Sequence(exprs) => {
                let mut last = self.builder_mut().null_sentinel();
                for e in exprs {
                    last = self.lower_expr(e)?;
                }
                Ok(last)
            }
            Expr::TemplateLiteral { quasis, expressions } => {
                self.lower_template_literal(quasis, expressions)
            }
            Expr::Function(f) => self.lower_function_expr(f),
            Expr::Arrow(a) => self.lower_arrow_function(a),
            Expr::Class(c) => self.lower_class_expr(c),
            Expr::Yield { argument, delegate } => {
                let value = match argument {
                    Some(a) => self.lower_expr(a)?,
                    None => self.builder_mut().null_sentinel(),
                };
                self.lower_yield(value, *delegate)
            }
            Expr::Await(inner) => self.lower_await(inner),
        }
    }

    fn current_this(&self) -> LowerResult<ValueId> {
        self.current_this
            .last()
            .copied()
            .ok_or_else(|| LowerError::unsupported("'this' used outside a method"))
    }

    fn lower_await(&mut self, inner: &Expr) -> LowerResult<ValueId> {
        // The core has no async runtime model (§1 non-goal); `await e`
        // lowers to evaluating `e` — promise resolution is a runtime
        // concern the emitted call site delegates to.
        self.lower_expr(inner)
    }

    fn lower_literal(&mut self, lit: &Literal) -> LowerResult<ValueId> {
        Ok(match lit {
            Literal::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    self.builder_mut().const_i64(*n as i64)
                } else {
                    self.builder_mut().const_f64(*n)
                }
            }
            Literal::String(s) => self.builder_mut().const_string(s.clone()),
            Literal::Boolean(b) => self.builder_mut().const_bool(*b),
            Literal::Null | Literal::Undefined => self.builder_mut().null_sentinel(),
            Literal::BigInt(text) => {
                self.module.declare_external(
                    bigint::CREATE_FROM_STRING,
                    vec![HirType::string()],
                    HirType::pointer_to(HirType::any(), true),
                )?;
                let s = self.builder_mut().const_string(text.clone());
                self.builder_mut()
                    .build_call(
                        bigint::CREATE_FROM_STRING,
                        vec![s],
                        HirType::pointer_to(HirType::any(), true),
                    )?
                    .ok_or_else(|| LowerError::internal("bigint_create_from_string returned void"))?
            }
            Literal::RegExp { pattern, flags } => {
                // Validate the literal's syntax at lowering time rather than
                // deferring a malformed pattern to a runtime panic.
                if let Err(e) = regex::Regex::new(pattern) {
                    self.diagnose(format!("invalid regular expression literal /{pattern}/: {e}"));
                }
                self.module.declare_external(
                    regexp::CREATE,
                    vec![HirType::string(), HirType::string()],
                    HirType::pointer_to(HirType::any(), true),
                )?;
                let p = self.builder_mut().const_string(pattern.clone());
                let f = self.builder_mut().const_string(flags.clone());
                self.builder_mut()
                    .build_call(regexp::CREATE, vec![p, f], HirType::pointer_to(HirType::any(), true))?
                    .ok_or_else(|| LowerError::internal("regex_create returned void"))?
            }
        })
    }

    fn opcode_for_binary(op: BinaryOp) -> Option<Opcode> {
        Some(match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Rem => Opcode::Rem,
            BinaryOp::Pow => Opcode::Pow,
            BinaryOp::BitAnd => Opcode::And,
            BinaryOp::BitOr => Opcode::Or,
            BinaryOp::BitXor => Opcode::Xor,
            BinaryOp::Shl => Opcode::Shl,
            BinaryOp::Shr => Opcode::Shr,
            BinaryOp::UShr => Opcode::UShr,
            BinaryOp::Eq | BinaryOp::StrictEq => Opcode::Eq,
            BinaryOp::Ne | BinaryOp::StrictNe => Opcode::Ne,
            BinaryOp::Lt => Opcode::Lt,
            BinaryOp::Le => Opcode::Le,
            BinaryOp::Gt => Opcode::Gt,
            BinaryOp::Ge => Opcode::Ge,
            BinaryOp::In | BinaryOp::InstanceOf => return None,
        })
    }

    fn lower_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> LowerResult<ValueId> {
        let lhs = self.lower_expr(left)?;
        let rhs = self.lower_expr(right)?;

        if matches!(op, BinaryOp::In | BinaryOp::InstanceOf) {
            return Err(LowerError::unsupported(format!("{op:?} operator")));
        }

        let opcode = Self::opcode_for_binary(op).expect("handled above");
        let lhs_is_string = self.builder_mut().value_type(lhs).is_string();
        let rhs_is_string = self.builder_mut().value_type(rhs).is_string();
        let is_string_concat = opcode == Opcode::Add && (lhs_is_string || rhs_is_string);

        // §4.3: booleans zero-extend to i64 before arithmetic/bitwise ops,
        // *except* string concatenation, which preserves them so the
        // downstream stage can render `"true"`/`"false"`.
        let (lhs, rhs) = if is_string_concat {
            (lhs, rhs)
        } else {
            (
                self.builder_mut().build_bool_zext(lhs)?,
                self.builder_mut().build_bool_zext(rhs)?,
            )
        };

        self.builder_mut()
            .build_binary(opcode, lhs, rhs)
            .map_err(LowerError::from)
    }

    /// Short-circuit `&&`/`||`/`??` using explicit blocks and a stack slot
    /// instead of phi nodes (§4.3).
    fn lower_logical(&mut self, op: LogicalOp, left: &Expr, right: &Expr) -> LowerResult<ValueId> {
        if op == LogicalOp::NullishCoalesce {
            // §9 open question: the type system carries no null/undefined
            // tag, so `??` conservatively always returns the left value.
            // The right operand is never evaluated. This is NOT a bug to be
            // quietly fixed — it is documented, load-bearing behavior.
            return self.lower_expr(left);
        }

        let lhs = self.lower_expr(left)?;
        let lhs_bool = self.builder_mut().build_bool_zext(lhs)?;
        let slot = self.builder_mut().build_alloca(HirType::i64())?;
        self.builder_mut().build_store(slot, lhs_bool)?;

        let eval_right = self.builder_mut().create_block();
        let merge = self.builder_mut().create_block();

        match op {
            LogicalOp::And => {
                self.builder_mut().build_cond_br(lhs_bool, eval_right, merge)?;
            }
            LogicalOp::Or => {
                self.builder_mut().build_cond_br(lhs_bool, merge, eval_right)?;
            }
            LogicalOp::NullishCoalesce => unreachable!("handled above"),
        }

        self.builder_mut().set_insert_point(eval_right);
        let rhs = self.lower_expr(right)?;
        let rhs_bool = self.builder_mut().build_bool_zext(rhs)?;
        let combined = match op {
            // lhs ∧ rhs, computed as lhs * rhs (both already 0/1, §4.3).
            LogicalOp::And => self.builder_mut().build_binary(Opcode::Mul, lhs_bool, rhs_bool)?,
            // lhs ∨ rhs, computed as lhs + rhs − lhs·rhs.
            LogicalOp::Or => {
                let sum = self.builder_mut().build_binary(Opcode::Add, lhs_bool, rhs_bool)?;
                let prod = self.builder_mut().build_binary(Opcode::Mul, lhs_bool, rhs_bool)?;
                self.builder_mut().build_binary(Opcode::Sub, sum, prod)?
            }
            LogicalOp::NullishCoalesce => unreachable!("handled above"),
        };
        self.builder_mut().build_store(slot, combined)?;
        self.builder_mut().build_br(merge)?;

        self.builder_mut().set_insert_point(merge);
        self.builder_mut().build_load(slot).map_err(LowerError::from)
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr) -> LowerResult<ValueId> {
        match op {
            UnaryOp::Minus => {
                let v = self.lower_expr(operand)?;
                self.builder_mut().build_unary(Opcode::Neg, v).map_err(LowerError::from)
            }
            UnaryOp::Plus => self.lower_expr(operand),
            UnaryOp::Not => {
                let v = self.lower_expr(operand)?;
                self.builder_mut().build_unary(Opcode::Not, v).map_err(LowerError::from)
            }
            UnaryOp::BitNot => {
                let v = self.lower_expr(operand)?;
                self.builder_mut().build_unary(Opcode::Not, v).map_err(LowerError::from)
            }
            UnaryOp::TypeOf => {
                let v = self.lower_expr(operand)?;
                let ty = self.builder_mut().value_type(v).clone();
                let s = typeof_string(&ty);
                Ok(self.builder_mut().const_string(s))
            }
            UnaryOp::Void => {
                self.lower_expr(operand)?;
                Ok(self.builder_mut().const_i64(0))
            }
            UnaryOp::Delete => {
                self.lower_expr(operand)?;
                Ok(self.builder_mut().const_bool(true))
            }
        }
    }

    fn lower_update(&mut self, op: UpdateOp, prefix: bool, target: &Expr) -> LowerResult<ValueId> {
        let old = self.lower_expr(target)?;
        let one = self.builder_mut().const_i64(1);
        let new = match op {
            UpdateOp::Increment => self.builder_mut().build_binary(Opcode::Add, old, one)?,
            UpdateOp::Decrement => self.builder_mut().build_binary(Opcode::Sub, old, one)?,
        };
        self.store_to_target(target, new)?;
        Ok(if prefix { new } else { old })
    }

    fn lower_conditional(
        &mut self,
        test: &Expr,
        consequent: &Expr,
        alternate: &Expr,
    ) -> LowerResult<ValueId> {
        let cond = self.lower_expr(test)?;
        let cond = self.builder_mut().build_bool_zext(cond)?;
        let slot = self.builder_mut().build_alloca(HirType::any())?;

        let then_bb = self.builder_mut().create_block();
        let else_bb = self.builder_mut().create_block();
        let merge_bb = self.builder_mut().create_block();
        self.builder_mut().build_cond_br(cond, then_bb, else_bb)?;

        self.builder_mut().set_insert_point(then_bb);
        let then_val = self.lower_expr(consequent)?;
        self.builder_mut().build_store(slot, then_val)?;
        self.builder_mut().build_br(merge_bb)?;

        self.builder_mut().set_insert_point(else_bb);
        let else_val = self.lower_expr(alternate)?;
        self.builder_mut().build_store(slot, else_val)?;
        self.builder_mut().build_br(merge_bb)?;

        self.builder_mut().set_insert_point(merge_bb);
        self.builder_mut().build_load(slot).map_err(LowerError::from)
    }

    // ---- assignment targets (§4.4) ----

    fn lower_assignment(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> LowerResult<ValueId> {
        if matches!(
            op,
            AssignOp::AndAssign | AssignOp::OrAssign | AssignOp::NullishAssign
        ) {
            let logical_op = match op {
                AssignOp::AndAssign => LogicalOp::And,
                AssignOp::OrAssign => LogicalOp::Or,
                AssignOp::NullishAssign => LogicalOp::NullishCoalesce,
                _ => unreachable!(),
            };
            let current = self.lower_expr(target)?;
            let new_value = match logical_op {
                LogicalOp::NullishCoalesce => current,
                _ => {
                    // Logical-assign reuses the short-circuit shape: only
                    // evaluate/store `value` on the taken branch.
                    let current_bool = self.builder_mut().build_bool_zext(current)?;
                    let slot = self.builder_mut().build_alloca(HirType::any())?;
                    self.builder_mut().build_store(slot, current)?;
                    let eval_rhs = self.builder_mut().create_block();
                    let merge = self.builder_mut().create_block();
                    match logical_op {
                        LogicalOp::And => {
                            self.builder_mut().build_cond_br(current_bool, eval_rhs, merge)?
                        }
                        LogicalOp::Or => {
                            self.builder_mut().build_cond_br(current_bool, merge, eval_rhs)?
                        }
                        LogicalOp::NullishCoalesce => unreachable!(),
                    }
                    self.builder_mut().set_insert_point(eval_rhs);
                    let rhs = self.lower_expr(value)?;
                    self.builder_mut().build_store(slot, rhs)?;
                    self.builder_mut().build_br(merge)?;
                    self.builder_mut().set_insert_point(merge);
                    self.builder_mut().build_load(slot)?
                }
            };
            self.store_to_target(target, new_value)?;
            return Ok(new_value);
        }

        if op == AssignOp::Assign {
            let v = self.lower_expr(value)?;
            self.store_to_target(target, v)?;
            return Ok(v);
        }

        // Compound assignment: read-modify-write.
        let current = self.lower_expr(target)?;
        let rhs = self.lower_expr(value)?;
        let opcode = compound_opcode(op);
        let new_value = self.builder_mut().build_binary(opcode, current, rhs)?;
        self.store_to_target(target, new_value)?;
        Ok(new_value)
    }

    /// Stores `value` into `target`, dispatching on the three assignable
    /// target shapes (§4.4): identifier, computed member, static member.
    fn store_to_target(&mut self, target: &Expr, value: ValueId) -> LowerResult<()> {
        match target {
            Expr::Identifier(id) => {
                self.declare_binding(&id.name, value)?;
                Ok(())
            }
            Expr::Member {
                object,
                property: MemberProperty::Computed(index_expr),
                ..
            } => {
                let arr = self.lower_expr(object)?;
                let index = self.lower_expr(index_expr)?;
                let typed_kind = match object.as_ref() {
                    Expr::Identifier(id) => match self.builtin_state.builtin_kind_of(&id.name) {
                        Some(crate::lower::BuiltinKind::TypedArray(kind)) => Some(*kind),
                        _ => None,
                    },
                    _ => None,
                };
                match typed_kind {
                    Some(kind) => {
                        let setter = typed_array_setter(&kind);
                        let elem_ty = typed_array_elem_type(&kind);
                        self.module.declare_external(
                            setter,
                            vec![HirType::pointer_to(HirType::any(), true), HirType::i64(), elem_ty],
                            HirType::void(),
                        )?;
                        self.builder_mut()
                            .build_call(setter, vec![arr, index, value], HirType::void())?;
                    }
                    None => {
                        self.module.declare_external(
                            arrays::SET,
                            vec![HirType::pointer_to(HirType::any(), true), HirType::i64(), HirType::any()],
                            HirType::void(),
                        )?;
                        self.builder_mut()
                            .build_call(arrays::SET, vec![arr, index, value], HirType::void())?;
                    }
                }
                Ok(())
            }
            Expr::Member {
                object,
                property: MemberProperty::Static(name) | MemberProperty::Private(name),
                ..
            } => {
                let obj = self.lower_expr(object)?;
                if let Some(setter) = self.resolve_setter(obj, name)? {
                    self.builder_mut()
                        .build_call(setter, vec![obj, value], HirType::void())?;
                    return Ok(());
                }
                let struct_ty = self.builder_mut().value_type(obj).pointee().cloned();
                let index = struct_ty
                    .as_ref()
                    .and_then(|t| t.as_struct())
                    .and_then(|s| s.field_index(name));
                match index {
                    Some(i) => {
                        self.builder_mut().build_set_field(obj, i as u32, value)?;
                        Ok(())
                    }
                    None => {
                        self.diagnose(format!("assignment to missing field '{name}'"));
                        Ok(())
                    }
                }
            }
            _ => Err(LowerError::unsupported("invalid assignment target")),
        }
    }

    fn lower_member_read(
        &mut self,
        object: &Expr,
        property: &MemberProperty,
        _optional: bool,
    ) -> LowerResult<ValueId> {
        let obj = self.lower_expr(object)?;
        match property {
            MemberProperty::Computed(index_expr) => {
                let index = self.lower_expr(index_expr)?;
                self.module.declare_external(
                    arrays::GET,
                    vec![HirType::pointer_to(HirType::any(), true), HirType::i64()],
                    HirType::any(),
                )?;
                self.builder_mut()
                    .build_call(arrays::GET, vec![obj, index], HirType::any())?
                    .ok_or_else(|| LowerError::internal("value_array_get returned void"))
            }
            MemberProperty::Static(name) | MemberProperty::Private(name) => {
                if let Some(getter) = self.resolve_getter(obj, name)? {
                    return self
                        .builder_mut()
                        .build_call(getter, vec![obj], HirType::any())?
                        .ok_or_else(|| LowerError::internal("getter returned void"));
                }
                let struct_ty = self.builder_mut().value_type(obj).pointee().cloned();
                match struct_ty.as_ref().and_then(|t| t.as_struct()) {
                    Some(s) => match s.field_index(name) {
                        Some(i) => {
                            let field_ty = s.fields[i].ty.clone();
                            self.builder_mut()
                                .build_get_field(obj, i as u32, field_ty)
                                .map_err(LowerError::from)
                        }
                        None => {
                            self.diagnose(format!("missing struct field '{name}'"));
                            Ok(self.builder_mut().null_sentinel())
                        }
                    },
                    None => {
                        self.diagnose(format!("member access on non-struct value for '{name}'"));
                        Ok(self.builder_mut().null_sentinel())
                    }
                }
            }
        }
    }

    fn lower_array_literal(&mut self, elements: &[ArrayElement]) -> LowerResult<ValueId> {
        let mut values = Vec::with_capacity(elements.len());
        for el in elements {
            match el {
                ArrayElement::Item(e) => values.push(self.lower_expr(e)?),
                ArrayElement::Spread(e) => values.push(self.lower_expr(e)?),
                ArrayElement::Hole => values.push(self.builder_mut().null_sentinel()),
            }
        }
        self.builder_mut()
            .build_array_construct(values, HirType::any())
            .map_err(LowerError::from)
    }

    fn lower_object_literal(&mut self, props: &[ObjectProperty]) -> LowerResult<ValueId> {
        let mut fields = Vec::new();
        let mut values = Vec::new();
        for prop in props {
            match prop {
                ObjectProperty::KeyValue { key, value, .. } => {
                    fields.push(jsaot_hir::StructField::new(key_name(key), HirType::any(), true));
                    values.push(self.lower_expr(value)?);
                }
                ObjectProperty::Shorthand(id) => {
                    fields.push(jsaot_hir::StructField::new(id.name.clone(), HirType::any(), true));
                    values.push(self.resolve_identifier(&id.name)?);
                }
                ObjectProperty::Method { key, function }
                | ObjectProperty::Getter { key, function }
                | ObjectProperty::Setter { key, function } => {
                    fields.push(jsaot_hir::StructField::new(key_name(key), HirType::any(), true));
                    values.push(self.lower_function_expr(function)?);
                }
                ObjectProperty::Spread(e) => {
                    // Spreading another object's own properties requires
                    // knowing its struct shape at lowering time; without
                    // that the core cannot synthesize field names. Emitted
                    // as a runtime merge call is a downstream concern (§6).
                    let _ = self.lower_expr(e)?;
                }
            }
        }
        let name = format!("__object_literal_{}", self.next_anon_struct_id());
        let struct_ty = jsaot_hir::StructType::new(name, fields);
        self.module.add_struct(struct_ty.clone())?;
        self.builder_mut()
            .build_struct_construct(values, HirType::struct_ty(struct_ty))
            .map_err(LowerError::from)
    }

    fn lower_args(&mut self, args: &[ArrayElement]) -> LowerResult<Vec<ValueId>> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            match a {
                // Spread-in-call-position needs a variadic runtime calling
                // convention the core doesn't model; each spread element is
                // passed through as a single argument instead (best effort).
                ArrayElement::Item(e) | ArrayElement::Spread(e) => values.push(self.lower_expr(e)?),
                ArrayElement::Hole => values.push(self.builder_mut().null_sentinel()),
            }
        }
        Ok(values)
    }

    fn lower_call(&mut self, callee: &Expr, args: &[ArrayElement], _optional: bool) -> LowerResult<ValueId> {
        if let Expr::Member {
            object,
            property: MemberProperty::Static(name) | MemberProperty::Private(name),
            ..
        } = callee
        {
            let receiver = self.lower_expr(object)?;
            let mut call_args = self.lower_args(args)?;
            call_args.insert(0, receiver);
            let method_name = self.resolve_virtual_method(receiver, name)?;
            return self
                .builder_mut()
                .build_call(method_name, call_args, HirType::any())?
                .ok_or_else(|| LowerError::internal("method call returned void"));
        }

        let callee_value = self.lower_expr(callee)?;
        let call_args = self.lower_args(args)?;
        let name = self
            .builder_mut()
            .constant_string_name(callee_value)
            .map(str::to_string);
        match name {
            Some(name) => self
                .builder_mut()
                .build_call(name, call_args, HirType::any())?
                .ok_or_else(|| LowerError::internal("call returned void")),
            None => {
                self.diagnose("call target is not statically resolvable to a known function");
                Ok(self.builder_mut().null_sentinel())
            }
        }
    }

    fn lower_new(&mut self, callee: &Expr, args: &[ArrayElement]) -> LowerResult<ValueId> {
        let class_name = match callee {
            Expr::Identifier(id) => id.name.clone(),
            _ => return Err(LowerError::unsupported("'new' on a non-identifier callee")),
        };
        let call_args = self.lower_args(args)?;
        self.construct_instance(&class_name, call_args)
    }

    fn lower_template_literal(&mut self, quasis: &[String], expressions: &[Expr]) -> LowerResult<ValueId> {
        let mut result = self.builder_mut().const_string(quasis.first().cloned().unwrap_or_default());
        for (i, expr) in expressions.iter().enumerate() {
            let v = self.lower_expr(expr)?;
            result = self.builder_mut().build_binary(Opcode::Add, result, v)?;
            if let Some(q) = quasis.get(i + 1) {
                let qv = self.builder_mut().const_string(q.clone());
                result = self.builder_mut().build_binary(Opcode::Add, result, qv)?;
            }
        }
        Ok(result)
    }
}

fn compound_opcode(op: AssignOp) -> Opcode {
    match op {
        AssignOp::AddAssign => Opcode::Add,
        AssignOp::SubAssign => Opcode::Sub,
        AssignOp::MulAssign => Opcode::Mul,
        AssignOp::DivAssign => Opcode::Div,
        AssignOp::RemAssign => Opcode::Rem,
        AssignOp::PowAssign => Opcode::Pow,
        AssignOp::BitAndAssign => Opcode::And,
        AssignOp::BitOrAssign => Opcode::Or,
        AssignOp::BitXorAssign => Opcode::Xor,
        AssignOp::ShlAssign => Opcode::Shl,
        AssignOp::ShrAssign => Opcode::Shr,
        AssignOp::UShrAssign => Opcode::UShr,
        _ => unreachable!("logical-assign handled separately"),
    }
}

fn key_name(key: &PropertyKey) -> String {
    match key {
        PropertyKey::Identifier(s) | PropertyKey::String(s) => s.clone(),
        PropertyKey::Number(n) => n.to_string(),
        PropertyKey::Computed(_) => "__computed".to_string(),
    }
}

/// Picks the per-element-kind runtime setter (§4.4) for a tracked typed array.
fn typed_array_setter(kind: &crate::lower::TypedArrayKind) -> &'static str {
    use crate::lower::TypedArrayKind::*;
    match kind {
        Int8 => typed_arrays::INT8_SET,
        Uint8 => typed_arrays::UINT8_SET,
        Uint8Clamped => typed_arrays::UINT8_CLAMPED_SET,
        Int16 => typed_arrays::INT16_SET,
        Uint16 => typed_arrays::UINT16_SET,
        Int32 => typed_arrays::INT32_SET,
        Uint32 => typed_arrays::UINT32_SET,
        Float32 => typed_arrays::FLOAT32_SET,
        Float64 => typed_arrays::FLOAT64_SET,
        BigInt64 => typed_arrays::BIGINT64_SET,
        BigUint64 => typed_arrays::BIGUINT64_SET,
    }
}

/// The stored-element type a typed-array setter's third parameter expects —
/// `i64` for integer/BigInt kinds, `f64` for the float kinds.
fn typed_array_elem_type(kind: &crate::lower::TypedArrayKind) -> HirType {
    use crate::lower::TypedArrayKind::*;
    match kind {
        Float32 | Float64 => HirType::f64(),
        _ => HirType::i64(),
    }
}

/// §4.3's compile-time `typeof` mapping.
fn typeof_string(ty: &HirType) -> &'static str {
    use jsaot_hir::PrimitiveKind::*;
    match ty {
        HirType::Primitive(I8 | I32 | I64 | F64) => "number",
        HirType::Primitive(String) => "string",
        HirType::Primitive(Bool) => "boolean",
        HirType::Primitive(Void) => "undefined",
        HirType::Function { .. } => "function",
        HirType::Primitive(Unknown) => "unknown",
        _ => "object",
    }
}
