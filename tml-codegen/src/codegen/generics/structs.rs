// generics/structs.rs
// Generic struct instantiation

use std::collections::HashMap;
use tml_ast::{Field, Type};

use super::super::errors::{CgResult, CodegenError};
use super::super::mangle;
use super::super::{InstEntry, LlvmIrGen, MAX_GENERIC_DEPTH};
use super::{generic_depth, substitute_type};

impl LlvmIrGen {
    /// Materialize `base[type_args...]`: register field info and emit the
    /// type definition once, returning the mangled name.
    ///
    /// The instantiation entry is pre-inserted before field resolution so
    /// recursive references through pointers terminate.
    pub(crate) fn require_struct_instantiation(
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
            // Either fully generated or in progress further up the stack;
            // the name is usable in both cases
            return Ok(mangled);
        }

        let def = self.struct_ast_defs.get(base).cloned().ok_or_else(|| {
            CodegenError::unknown_symbol(
                format!("generic struct `{}` not found", base),
                self.current_span,
            )
        })?;

        if def.type_params.len() != type_args.len() {
            return Err(CodegenError::unresolved_generic(
                format!(
                    "struct `{}` expects {} type parameters, got {}",
                    base,
                    def.type_params.len(),
                    type_args.len()
                ),
                self.current_span,
            ));
        }

        // Intern the instantiation key types so repeated references share
        // storage, then pre-insert to stop recursive descent
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

        let mut resolved_fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let resolved = substitute_type(&field.ty, &type_subst);
            if resolved.contains_param() {
                return Err(self.err_unresolved(&resolved));
            }
            resolved_fields.push(Field {
                name: field.name.clone(),
                ty: resolved,
            });
        }
        self.struct_field_defs
            .insert(mangled.clone(), resolved_fields.clone());

        // Field types recurse first so dependencies are defined above us
        let mut field_llvm = Vec::with_capacity(resolved_fields.len());
        for field in &resolved_fields {
            field_llvm.push(self.llvm_type(&field.ty)?);
        }
        let body = if field_llvm.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", field_llvm.join(", "))
        };
        self.emit_type_def(&mangled, &body)?;

        if let Some(entry) = self.generic_instantiations.get_mut(&mangled) {
            entry.generated = true;
        }
        log::debug!("instantiated struct {}", mangled);

        Ok(mangled)
    }

    /// Verify behavior bounds for one instantiation, mapping violations to
    /// collected errors with the instantiation site's span
    pub(crate) fn check_instantiation_bounds(
        &self,
        type_params: &[tml_ast::TypeParam],
        where_clause: &[tml_ast::WherePredicate],
        substitution: &HashMap<String, Type>,
        base: &str,
    ) -> CgResult<()> {
        let constraints =
            crate::behavior_bounds::build_where_constraints(type_params, where_clause);
        self.bounds
            .check_constraints(&constraints, substitution)
            .map_err(|(param, concrete, behavior)| {
                CodegenError::unknown_symbol(
                    format!(
                        "type `{}` does not implement behavior `{}` required by bound `{}` on `{}`",
                        concrete, behavior, param, base
                    ),
                    self.current_span,
                )
            })
    }
}
