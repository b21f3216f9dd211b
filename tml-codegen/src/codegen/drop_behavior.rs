// drop_behavior.rs
// Drop behavior support: synthesized cleanup calls at scope exit

use tml_ast::Type;

use super::errors::CgResult;
use super::LlvmIrGen;
use crate::behavior_bounds::impl_key;

impl LlvmIrGen {
    /// Synthesize `call void @tml_<Type>_Drop_drop(ptr slot)` for one
    /// local. The drop method takes `mut this`, so the receiver is always
    /// the local's stack slot.
    pub(crate) fn emit_drop_call(&mut self, name: &str, slot: &str, ty: &Type) -> CgResult<()> {
        let entries = self.impls.get(&impl_key(ty)).cloned().unwrap_or_default();
        let Some(entry) = entries
            .iter()
            .find(|e| e.behavior.as_deref() == Some("Drop"))
        else {
            // Registered through register_impl without a method body;
            // nothing to call
            log::warn!("type `{}` marked Drop but no drop method body is known", ty);
            return Ok(());
        };
        let Some(method) = entry.methods.iter().find(|m| m.name == "drop") else {
            log::warn!("Drop impl for `{}` does not define drop()", ty);
            return Ok(());
        };
        let entry = entry.clone();
        let method = method.clone();
        let resolved = self.require_method_on_entry(&entry, ty, &method, &[], &[])?;
        log::trace!("dropping `{}` via {}", name, resolved.symbol);
        self.emit_line(format!("call void @{}(ptr {})", resolved.symbol, slot));
        Ok(())
    }
}
