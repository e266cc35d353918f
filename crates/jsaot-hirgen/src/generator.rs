//! C9 — generators as state machines (§4.8).

use jsaot_hir::{HirType, ValueId};

use crate::error::{LowerError, LowerResult};
use crate::lower::{GeneratorContext, HirGenerator};
use crate::runtime_abi::generators as abi;

/// The six ABI names a generator context dispatches through, picked once
/// per context depending on whether it is an async generator (§4.8 last
/// sentence) so call-emission sites never branch on `is_async` themselves.
struct GeneratorAbi {
    get_state: &'static str,
    set_state: &'static str,
    store_local: &'static str,
    load_local: &'static str,
    yield_: &'static str,
    complete: &'static str,
}

fn abi_for(is_async: bool) -> GeneratorAbi {
    if is_async {
        GeneratorAbi {
            get_state: abi::ASYNC_GET_STATE,
            set_state: abi::ASYNC_SET_STATE,
            store_local: abi::ASYNC_STORE_LOCAL,
            load_local: abi::ASYNC_LOAD_LOCAL,
            yield_: abi::ASYNC_YIELD,
            complete: abi::ASYNC_COMPLETE,
        }
    } else {
        GeneratorAbi {
            get_state: abi::GET_STATE,
            set_state: abi::SET_STATE,
            store_local: abi::STORE_LOCAL,
            load_local: abi::LOAD_LOCAL,
            yield_: abi::YIELD,
            complete: abi::COMPLETE,
        }
    }
}

impl HirGenerator {
    /// Entry block computes `generator_get_state(gen)`; a fresh `body_start`
    /// block becomes the state-0 resume target and the insertion point body
    /// generation continues into. `is_async` selects the `async_generator_*`
    /// ABI family instead of the synchronous one, reusing the same
    /// dispatch-block machinery (§4.8 last sentence).
    pub(crate) fn enter_generator_context(&mut self, gen_value: ValueId, is_async: bool) -> LowerResult<()> {
        let names = abi_for(is_async);
        self.module.declare_external(
            names.get_state,
            vec![HirType::pointer_to(HirType::any(), true)],
            HirType::i64(),
        )?;
        self.module.declare_external(
            names.set_state,
            vec![HirType::pointer_to(HirType::any(), true), HirType::i64()],
            HirType::void(),
        )?;
        self.module.declare_external(
            names.yield_,
            vec![HirType::pointer_to(HirType::any(), true), HirType::any()],
            HirType::void(),
        )?;
        self.module.declare_external(
            names.complete,
            vec![HirType::pointer_to(HirType::any(), true), HirType::any()],
            HirType::void(),
        )?;
        self.module.declare_external(
            names.store_local,
            vec![
                HirType::pointer_to(HirType::any(), true),
                HirType::i64(),
                HirType::any(),
            ],
            HirType::void(),
        )?;
        self.module.declare_external(
            names.load_local,
            vec![HirType::pointer_to(HirType::any(), true), HirType::i64()],
            HirType::i64(),
        )?;

        let entry_block = self
            .builder_mut()
            .current_block()
            .ok_or_else(|| LowerError::internal("no entry block for generator"))?;
        let state_value = self
            .builder_mut()
            .build_call(names.get_state, vec![gen_value], HirType::i64())?
            .ok_or_else(|| LowerError::internal("generator_get_state produced no value"))?;

        let body_start = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(body_start);

        self.current_generator.push(GeneratorContext {
            gen_ptr: gen_value,
            state_value,
            yield_count: 0,
            local_slots: std::collections::HashMap::new(),
            next_slot: 0,
            entry_block,
            body_start_block: body_start,
            resume_blocks: Vec::new(),
            is_async,
        });
        Ok(())
    }

    /// Lowers a `yield`/`yield*` expression (§4.8 step 3): sets state `n`,
    /// calls `generator_yield`, returns, and opens the nth resume block as
    /// the new insertion point. `yield*` (delegate) is lowered identically
    /// at this tier — delegation to the inner iterable is a downstream
    /// concern once `generator_yield` hands control back to the runtime.
    pub(crate) fn lower_yield(&mut self, value: ValueId, _delegate: bool) -> LowerResult<ValueId> {
        let ctx_index = self.current_generator.len().checked_sub(1).ok_or_else(|| {
            LowerError::unsupported("yield used outside a generator function")
        })?;
        let gen_ptr = self.current_generator[ctx_index].gen_ptr;
        let n = self.current_generator[ctx_index].yield_count + 1;
        let names = abi_for(self.current_generator[ctx_index].is_async);

        let n_const = self.builder_mut().const_i64(n as i64);
        self.builder_mut()
            .build_call(names.set_state, vec![gen_ptr, n_const], HirType::void())?;
        self.builder_mut()
            .build_call(names.yield_, vec![gen_ptr, value], HirType::void())?;
        self.builder_mut().build_return(None)?;

        let resume_block = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(resume_block);

        let ctx = &mut self.current_generator[ctx_index];
        ctx.yield_count = n;
        ctx.resume_blocks.push(resume_block);

        // The input integer parameter is the resume value handed back by the
        // runtime (§4.8's "input integer parameter for future two-way send
        // support"); exposed as the yield expression's own value.
        Ok(self.builder_mut().make_constant(jsaot_hir::ValueKind::Param(1), HirType::i64()))
    }

    /// After body generation: builds the dispatch block, branches the entry
    /// block into it, and pops the generator context.
    pub(crate) fn finish_generator_body(&mut self) -> LowerResult<()> {
        let ctx = self
            .current_generator
            .pop()
            .ok_or_else(|| LowerError::internal("finish_generator_body without a matching enter"))?;

        // Completion on fall-through (§4.8 step 5): whatever block body
        // generation left open (possibly `body_start` itself, possibly the
        // last resume block) completes with value 0 if unterminated.
        let names = abi_for(ctx.is_async);
        if let Some(block) = self.builder_mut().current_block() {
            if !self.builder_mut().block_terminated(block) {
                let zero = self.builder_mut().const_i64(0);
                self.builder_mut()
                    .build_call(names.complete, vec![ctx.gen_ptr, zero], HirType::void())?;
                self.builder_mut().build_return(None)?;
            }
        }

        let dispatch_block = self.builder_mut().create_block();
        self.builder_mut().set_insert_point(ctx.entry_block);
        self.builder_mut().build_br(dispatch_block)?;

        self.builder_mut().set_insert_point(dispatch_block);
        for (i, resume_block) in ctx.resume_blocks.iter().enumerate() {
            let state_n = (i + 1) as i64;
            let n_const = self.builder_mut().const_i64(state_n);
            let is_match = self
                .builder_mut()
                .build_binary(jsaot_hir::Opcode::Eq, ctx.state_value, n_const)?;
            let next_check = self.builder_mut().create_block();
            self.builder_mut()
                .build_cond_br(is_match, *resume_block, next_check)?;
            self.builder_mut().set_insert_point(next_check);
        }
        // No match (including state 0, and the no-yields case) falls through
        // to the initial body.
        self.builder_mut().build_br(ctx.body_start_block)?;
        Ok(())
    }

    pub(crate) fn generator_slot_of(&self, name: &str) -> Option<u32> {
        self.current_generator
            .last()
            .and_then(|ctx| ctx.local_slots.get(name).copied())
    }

    pub(crate) fn emit_generator_load_local(&mut self, slot: u32) -> LowerResult<ValueId> {
        let ctx = self
            .current_generator
            .last()
            .ok_or_else(|| LowerError::internal("no active generator context"))?;
        let gen_ptr = ctx.gen_ptr;
        let names = abi_for(ctx.is_async);
        let slot_const = self.builder_mut().const_i64(slot as i64);
        self.builder_mut()
            .build_call(names.load_local, vec![gen_ptr, slot_const], HirType::i64())?
            .ok_or_else(|| LowerError::internal("generator_load_local produced no value"))
    }

    /// Declares a binding in the current scope, additionally mirroring it
    /// into a runtime slot when inside a generator so the value survives
    /// suspension (§4.8 step 4).
    pub(crate) fn declare_binding(&mut self, name: &str, value: ValueId) -> LowerResult<()> {
        self.scopes.declare(name, value);
        if !self.current_generator.is_empty() {
            let (slot, gen_ptr, is_async) = {
                let ctx = self.current_generator.last_mut().unwrap();
                let slot = *ctx.local_slots.entry(name.to_string()).or_insert_with(|| {
                    let s = ctx.next_slot;
                    ctx.next_slot += 1;
                    s
                });
                (slot, ctx.gen_ptr, ctx.is_async)
            };
            let names = abi_for(is_async);
            let slot_const = self.builder_mut().const_i64(slot as i64);
            self.builder_mut()
                .build_call(names.store_local, vec![gen_ptr, slot_const, value], HirType::void())?;
        }
        Ok(())
    }
}
