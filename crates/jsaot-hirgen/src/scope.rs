//! C4 — symbol & scope machinery.
//!
//! Grounded directly on the original `HIRGenerator`'s `symbolTable_` /
//! `scopeStack_` pair (`HIRGen_Internal.h`, `HIRGen.cpp::lookupVariable`):
//! one *current* symbol table plus a stack of parent symbol tables pushed on
//! function entry and popped on exit. This is deliberately **not** a
//! register/upvalue-indexed scope chain like `otter-vm-compiler::scope::
//! ScopeChain` — that model bakes in a bytecode VM's local-slot allocation,
//! which this typed-SSA core has no use for; the shape kept from the teacher
//! is the enter/exit scope-stack discipline and the struct layout, not the
//! indexing strategy.

use std::collections::HashMap;

use jsaot_hir::ValueId;

/// A single lexical symbol table: name → the value currently bound to it.
pub type SymbolTable = HashMap<String, ValueId>;

/// Result of resolving an identifier against the current scope machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Found in the current (innermost, not-yet-popped) symbol table — an
    /// ordinary local reference.
    Local(ValueId),
    /// Found in an enclosing function's symbol table — a free-variable
    /// reference that the closure-capture algorithm (§4.6) must record.
    Captured(ValueId),
}

/// Owns the current symbol table and the stack of enclosing ones. Used
/// *only* for free-variable resolution (§3.6) — never as a writable outer
/// scope; nested blocks within one function share the same symbol table
/// (JS/TS `let`/`const` block scoping is handled by the caller shadowing
/// names in the same map and restoring them on block exit, mirroring how the
/// original generator has no separate per-block symbol table either).
#[derive(Debug, Default)]
pub struct ScopeStack {
    current: SymbolTable,
    parents: Vec<SymbolTable>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the caller's symbol table onto the parent stack and starts a
    /// fresh current table — called on function entry (§4.6).
    pub fn enter_function(&mut self) {
        let outgoing = std::mem::take(&mut self.current);
        self.parents.push(outgoing);
    }

    /// Restores the previous current table, discarding the one just
    /// finished — called on function exit. Every `enter_function` must be
    /// paired with exactly one `exit_function` (§3.6 lifecycle, §8 invariant
    /// 6: "no HIR function body is generated with a non-empty scope-stack
    /// residue").
    pub fn exit_function(&mut self) {
        self.current = self
            .parents
            .pop()
            .expect("exit_function called without a matching enter_function");
    }

    pub fn declare(&mut self, name: impl Into<String>, value: ValueId) {
        self.current.insert(name.into(), value);
    }

    /// Rebinds a name already declared in the current scope (e.g. a
    /// reassignment updating which `ValueId` backs a mutable binding's
    /// current SSA value).
    pub fn rebind(&mut self, name: &str, value: ValueId) {
        self.current.insert(name.to_string(), value);
    }

    /// `lookupVariable` (§4.6): current table first, then the parent stack
    /// innermost-to-outermost. A hit in the current table is `Local`; a hit
    /// anywhere in `parents` is `Captured`.
    pub fn resolve(&self, name: &str) -> Option<Resolution> {
        if let Some(&v) = self.current.get(name) {
            return Some(Resolution::Local(v));
        }
        for table in self.parents.iter().rev() {
            if let Some(&v) = table.get(name) {
                return Some(Resolution::Captured(v));
            }
        }
        None
    }

    pub fn depth(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_declaration_resolves_local() {
        let mut s = ScopeStack::new();
        s.declare("x", ValueId::new(0));
        assert_eq!(s.resolve("x"), Some(Resolution::Local(ValueId::new(0))));
    }

    #[test]
    fn parent_scope_hit_resolves_as_captured() {
        let mut s = ScopeStack::new();
        s.declare("x", ValueId::new(0));
        s.enter_function();
        assert_eq!(s.resolve("x"), Some(Resolution::Captured(ValueId::new(0))));
    }

    #[test]
    fn enter_exit_pairing_restores_prior_scope() {
        let mut s = ScopeStack::new();
        s.declare("x", ValueId::new(0));
        s.enter_function();
        s.declare("y", ValueId::new(1));
        s.exit_function();
        assert_eq!(s.resolve("x"), Some(Resolution::Local(ValueId::new(0))));
        assert_eq!(s.resolve("y"), None);
        assert!(s.is_empty());
    }

    #[test]
    fn innermost_declaration_shadows_outer_one() {
        let mut s = ScopeStack::new();
        s.declare("x", ValueId::new(0));
        s.enter_function();
        s.declare("x", ValueId::new(5));
        assert_eq!(s.resolve("x"), Some(Resolution::Local(ValueId::new(5))));
    }
}
