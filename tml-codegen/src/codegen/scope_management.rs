// Scope and cleanup management
// Drop scopes are strictly nested; every exit path fires drops in
// reverse declaration order

use tml_ast::Type;

use super::errors::CgResult;
use super::LlvmIrGen;

impl LlvmIrGen {
    /// Push a new scope for tracking locals that implement Drop
    pub(crate) fn push_drop_scope(&mut self) {
        self.scope_stack.push(Vec::new());
        log::trace!("pushed drop scope (depth {})", self.scope_stack.len());
    }

    /// Register a local for automatic drop at scope exit
    pub(crate) fn register_drop_local(&mut self, name: &str, slot: &str, ty: &Type) {
        if !self.type_implements_drop(ty) {
            return;
        }
        if let Some(scope) = self.scope_stack.last_mut() {
            scope.push((name.to_string(), slot.to_string(), ty.clone()));
            log::debug!("registered `{}` for drop at scope exit", name);
        }
    }

    /// Emit drop calls for the innermost scope (LIFO order) without
    /// popping it; used ahead of a terminator that leaves the scope
    pub(crate) fn emit_scope_drops(&mut self) -> CgResult<()> {
        if let Some(scope) = self.scope_stack.last() {
            let entries = scope.clone();
            for (name, slot, ty) in entries.iter().rev() {
                self.emit_drop_call(name, slot, ty)?;
            }
        }
        Ok(())
    }

    /// Emit drops for every scope deeper than `from_depth`, innermost
    /// first. Return paths use 0; break/continue use the loop's depth.
    pub(crate) fn emit_drops_for_scopes(&mut self, from_depth: usize) -> CgResult<()> {
        let scopes: Vec<Vec<(String, String, Type)>> = self
            .scope_stack
            .iter()
            .skip(from_depth)
            .cloned()
            .collect();
        for scope in scopes.iter().rev() {
            for (name, slot, ty) in scope.iter().rev() {
                self.emit_drop_call(name, slot, ty)?;
            }
        }
        Ok(())
    }

    /// Pop a scope, firing its drops
    pub(crate) fn pop_drop_scope(&mut self) -> CgResult<()> {
        self.emit_scope_drops()?;
        self.scope_stack.pop();
        Ok(())
    }

    /// Pop a scope whose drops were already emitted on every live path
    pub(crate) fn pop_drop_scope_silent(&mut self) {
        self.scope_stack.pop();
    }
}
