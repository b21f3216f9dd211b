// generics/enums.rs
// Generic enum instantiation and tagged-union layout registration

use std::collections::HashMap;
use tml_ast::Type;

use super::super::errors::{CgResult, CodegenError};
use super::super::mangle;
use super::super::{EnumLayout, InstEntry, LlvmIrGen, MAX_GENERIC_DEPTH};
use super::{generic_depth, substitute_type};

impl LlvmIrGen {
    /// Materialize `base[type_args...]` as a tagged union: `{ i32 }` when
    /// no variant carries data, `{ i32, [N x i64] }` otherwise.
    pub(crate) fn require_enum_instantiation(
        &mut self,
        base: &str,
        type_args: &[Type],
    ) -> CgResult<String> {
        for type_arg in type_args {
            let depth = generic_depth(type_arg);
            if depth > MAX_GENERIC_DEPTH {
                return Err(CodegenError::internal(
                    format!(
                        "generic type nesting too deep (depth {}, max {}): {}",
                        depth, MAX_GENERIC_DEPTH, type_arg
                    ),
                    self.current_span,
                ));
            }
        }

        let mangled = mangle::mangle(base, type_args)?;
        if self.generic_instantiations.contains_key(&mangled) {
            return Ok(mangled);
        }

        let def = self.enum_ast_defs.get(base).cloned().ok_or_else(|| {
            CodegenError::unknown_symbol(
                format!("generic enum `{}` not found", base),
                self.current_span,
            )
        })?;

        if def.type_params.len() != type_args.len() {
            return Err(CodegenError::unresolved_generic(
                format!(
                    "enum `{}` expects {} type parameters, got {}",
                    base,
                    def.type_params.len(),
                    type_args.len()
                ),
                self.current_span,
            ));
        }

        let interned_args: Vec<Type> = type_args
            .iter()
            .map(|t| (*self.interner.intern(t.clone())).clone())
            .collect();
        self.generic_instantiations.insert(
            mangled.clone(),
            InstEntry {
                base: base.to_string(),
                type_args: interned_args,
                generated: false,
            },
        );

        let mut type_subst = HashMap::new();
        for (param, arg) in def.type_params.iter().zip(type_args.iter()) {
            type_subst.insert(param.name.clone(), arg.clone());
        }
        self.check_instantiation_bounds(&def.type_params, &[], &type_subst, base)?;

        // Payload sizing recurses through nested instantiations
        let payload_words = self.enum_payload_words(&def, type_args, &mut Vec::new())?;

        let mut variants = Vec::with_capacity(def.variants.len());
        for variant in &def.variants {
            let mut resolved = Vec::new();
            for field_ty in variant.fields.field_types() {
                let concrete = substitute_type(&field_ty, &type_subst);
                if concrete.contains_param() {
                    return Err(self.err_unresolved(&concrete));
                }
                resolved.push(concrete);
            }
            variants.push((variant.name.clone(), resolved));
        }

        // Register layout before emitting the definition: payload field
        // types may themselves need instantiation and can refer back here
        // through pointers
        self.enum_layouts.insert(
            mangled.clone(),
            EnumLayout {
                simple: payload_words == 0,
                payload_words,
                variants: variants.clone(),
            },
        );

        // Payload field types that are themselves aggregates must have
        // their definitions emitted before this one is referenced
        for (_, field_types) in &variants {
            for field_ty in field_types {
                self.llvm_type(field_ty)?;
            }
        }

        let body = if payload_words == 0 {
            "{ i32 }".to_string()
        } else {
            format!("{{ i32, [{} x i64] }}", payload_words)
        };
        self.emit_type_def(&mangled, &body)?;

        if let Some(entry) = self.generic_instantiations.get_mut(&mangled) {
            entry.generated = true;
        }
        log::debug!("instantiated enum {}", mangled);

        Ok(mangled)
    }

    /// Resolved layout for an already-instantiated enum
    pub(crate) fn enum_layout(&self, mangled: &str) -> CgResult<&EnumLayout> {
        self.enum_layouts.get(mangled).ok_or_else(|| {
            CodegenError::internal(
                format!("enum `{}` referenced before instantiation", mangled),
                self.current_span,
            )
        })
    }
}
