// generics/methods.rs
// Method resolution and instantiation on generic receivers

use std::collections::HashMap;
use tml_ast::{FuncDecl, Type};

use super::super::errors::{CgResult, CodegenError};
use super::super::{CurrentImpl, ImplEntry, LlvmIrGen};
use super::inference::match_type_param;
use super::substitute_type;
use crate::behavior_bounds::impl_key;

/// A fully resolved method call target
#[derive(Debug, Clone)]
pub(crate) struct ResolvedMethod {
    pub symbol: String,
    /// Non-receiver parameter types after substitution
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub receiver_by_pointer: bool,
}

impl LlvmIrGen {
    /// Resolve `receiver.method(args)` by the receiver's semantic type.
    /// Inherent impls win over behavior impls; the method body is keyed by
    /// (mangled receiver, method, method-type-suffix) and emitted on first
    /// reference.
    pub(crate) fn require_method_instantiation(
        &mut self,
        receiver_ty: &Type,
        method_name: &str,
        explicit_margs: &[Type],
        arg_types: &[Type],
    ) -> CgResult<ResolvedMethod> {
        let base_ty = strip_indirection(receiver_ty);
        let key = impl_key(&base_ty);
        let entries = self.impls.get(&key).cloned().unwrap_or_default();

        // Inherent methods first, then behavior impls in registration order
        for behavior_pass in [false, true] {
            for entry in &entries {
                if entry.behavior.is_some() != behavior_pass {
                    continue;
                }
                if let Some(method) = entry.methods.iter().find(|m| m.name == method_name) {
                    let method = method.clone();
                    let entry = entry.clone();
                    return self.require_method_on_entry(
                        &entry,
                        &base_ty,
                        &method,
                        explicit_margs,
                        arg_types,
                    );
                }
            }
        }

        let mut available: Vec<&str> = Vec::new();
        for entry in &entries {
            for m in &entry.methods {
                available.push(m.name.as_str());
            }
        }
        let mut message = format!("no method `{}` on type `{}`", method_name, base_ty);
        if let Some(best) = tml_diagnostics::suggest_similar(method_name, available).first() {
            message.push_str(&format!("; did you mean `{}`?", best));
        }
        Err(CodegenError::unknown_symbol(message, self.current_span))
    }

    /// Resolve `base.method(args)` inside an overriding method: the call
    /// binds to the super-behavior's implementation on the same receiver
    /// and lowers to a direct call, never through a dispatch table.
    pub(crate) fn resolve_super_method(
        &mut self,
        method_name: &str,
        arg_types: &[Type],
    ) -> CgResult<ResolvedMethod> {
        let current = self.current_impl.clone().ok_or_else(|| {
            CodegenError::internal(
                "base method call outside of an impl method",
                self.current_span,
            )
        })?;
        let behavior = current.behavior.clone().ok_or_else(|| {
            CodegenError::unknown_symbol(
                "base method call requires the enclosing impl to name a behavior",
                self.current_span,
            )
        })?;
        let supers = self
            .behavior_defs
            .get(&behavior)
            .map(|d| d.super_behaviors.clone())
            .unwrap_or_default();

        let base_ty = strip_indirection(&current.receiver);
        let key = impl_key(&base_ty);
        let entries = self.impls.get(&key).cloned().unwrap_or_default();
        for super_name in &supers {
            for entry in &entries {
                if entry.behavior.as_deref() != Some(super_name.as_str()) {
                    continue;
                }
                if let Some(method) = entry.methods.iter().find(|m| m.name == method_name) {
                    let method = method.clone();
                    let entry = entry.clone();
                    return self.require_method_on_entry(&entry, &base_ty, &method, &[], arg_types);
                }
            }
        }
        Err(CodegenError::unknown_symbol(
            format!(
                "no super-behavior of `{}` provides a method `{}` for `{}`",
                behavior, method_name, base_ty
            ),
            self.current_span,
        ))
    }

    pub(crate) fn require_method_on_entry(
        &mut self,
        entry: &ImplEntry,
        base_ty: &Type,
        method: &FuncDecl,
        explicit_margs: &[Type],
        arg_types: &[Type],
    ) -> CgResult<ResolvedMethod> {
        // Impl-level parameters bind by matching the target pattern
        // against the concrete receiver; Self always binds the receiver
        let mut subst: HashMap<String, Type> = HashMap::new();
        match_type_param(&entry.target, base_ty, &mut subst);
        subst.insert("Self".to_string(), base_ty.clone());

        let margs: Vec<Type> = if method.is_generic() {
            if explicit_margs.is_empty() {
                self.infer_type_args_from_call(method, arg_types)?
            } else {
                explicit_margs.to_vec()
            }
        } else {
            Vec::new()
        };
        for (param, arg) in method.type_params.iter().zip(margs.iter()) {
            subst.insert(param.name.clone(), arg.clone());
        }

        for param in &entry.type_params {
            if !subst.contains_key(&param.name) {
                return Err(CodegenError::unresolved_generic(
                    format!(
                        "cannot bind impl parameter `{}` for `{}` from receiver `{}`",
                        param.name, method.name, base_ty
                    ),
                    self.current_span,
                ));
            }
        }
        self.check_instantiation_bounds(&entry.type_params, &[], &subst, &method.name)?;
        self.check_instantiation_bounds(&method.type_params, &method.where_clause, &subst, &method.name)?;

        let symbol = self.method_symbol(base_ty, entry.behavior.as_deref(), &method.name, &margs, entry.shared)?;

        let receiver_param = method.params.iter().find(|p| p.is_receiver());
        let receiver_by_pointer = match receiver_param {
            Some(param) => {
                let resolved = substitute_type(&param.ty, &subst);
                !(resolved.is_primitive() && !param.is_mut)
            }
            None => false,
        };

        let is_instantiation = !entry.type_params.is_empty()
            || method.is_generic()
            || matches!(base_ty, Type::Named { type_args, .. } if !type_args.is_empty());
        let linkage = if self.options.force_internal_linkage && !method.should_panic() {
            "internal ".to_string()
        } else if is_instantiation {
            "linkonce_odr ".to_string()
        } else {
            self.linkage_for(method, false, entry.shared)
        };

        let receiver_ctx = CurrentImpl {
            receiver: base_ty.clone(),
            behavior: entry.behavior.clone(),
        };
        self.emit_function_body(method, &symbol, subst.clone(), &linkage, Some(receiver_ctx))?;

        let param_types: Vec<Type> = method
            .params
            .iter()
            .filter(|p| !p.is_receiver())
            .map(|p| substitute_type(&p.ty, &subst))
            .collect();
        let return_type = substitute_type(
            &method.return_type.clone().unwrap_or(Type::Unit),
            &subst,
        );
        Ok(ResolvedMethod {
            symbol,
            param_types,
            return_type: if method.is_async {
                Type::generic("Poll", vec![return_type])
            } else {
                return_type
            },
            receiver_by_pointer,
        })
    }
}

/// Strip references and pointers to reach the receiver's base type
pub(crate) fn strip_indirection(ty: &Type) -> Type {
    match ty {
        Type::Ref { inner, .. } | Type::Ptr { inner, .. } => strip_indirection(inner),
        other => other.clone(),
    }
}
