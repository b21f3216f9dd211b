// src/codegen/methods.rs
// Impl method emission and method symbol construction

use tml_ast::{ImplBlock, Type};

use super::errors::CgResult;
use super::LlvmIrGen;

impl LlvmIrGen {
    /// Symbol for an impl method: tml_<Receiver>_<method> for inherent
    /// methods, tml_<Receiver>_<Behavior>_<method> for behavior impls so
    /// an override and the super-behavior's method can coexist on one
    /// receiver. Method-level type arguments append with the usual
    /// mangling convention.
    pub(crate) fn method_symbol(
        &self,
        receiver_ty: &Type,
        behavior: Option<&str>,
        method: &str,
        method_type_args: &[Type],
        shared: bool,
    ) -> CgResult<String> {
        let receiver = super::mangle::mangle_type(receiver_ty)?;
        let base = match behavior {
            Some(behavior) => format!("{}_{}_{}", receiver, behavior, method),
            None => format!("{}_{}", receiver, method),
        };
        let mangled = super::mangle::mangle(&base, method_type_args)?;
        Ok(self.apply_suite_prefix(format!("tml_{}", mangled), shared))
    }

    /// Eagerly emit the methods of an impl block on a non-generic target.
    /// Generic targets and generic methods wait for a concrete reference.
    pub(crate) fn emit_impl_block(&mut self, block: &ImplBlock) -> CgResult<()> {
        self.current_span = block.span;
        if !block.type_params.is_empty() || block.target.contains_param() {
            return Ok(());
        }
        let entries = self
            .impls
            .get(&crate::behavior_bounds::impl_key(&block.target))
            .cloned()
            .unwrap_or_default();
        // Re-find the registered entry for this block so shared flags and
        // registration order stay authoritative
        for entry in entries
            .iter()
            .filter(|e| e.behavior == block.behavior && e.target == block.target)
        {
            for method in &entry.methods {
                if method.is_generic() {
                    continue;
                }
                let arg_types: Vec<Type> = method
                    .params
                    .iter()
                    .filter(|p| !p.is_receiver())
                    .map(|p| p.ty.clone())
                    .collect();
                self.require_method_on_entry(entry, &block.target, method, &[], &arg_types)?;
            }
        }
        Ok(())
    }
}
