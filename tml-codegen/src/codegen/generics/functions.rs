// generics/functions.rs
// On-demand monomorphization of generic functions

use std::collections::HashMap;
use tml_ast::Type;

use super::super::errors::{CgResult, CodegenError};
use super::super::{InstEntry, LlvmIrGen, MAX_GENERIC_DEPTH};
use super::{generic_depth, substitute_type};

/// A call target with types resolved for the call site
#[derive(Debug, Clone)]
pub(crate) struct ResolvedFunction {
    pub symbol: String,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub is_async: bool,
}

impl LlvmIrGen {
    /// Resolve a direct call to a user function, monomorphizing generic
    /// callees on first reference. `type_args` may be empty for generic
    /// functions, in which case they are inferred from `arg_types`.
    pub(crate) fn require_function_instantiation(
        &mut self,
        base: &str,
        type_args: &[Type],
        arg_types: &[Type],
    ) -> CgResult<ResolvedFunction> {
        let func = self.function_defs.get(base).cloned().ok_or_else(|| {
            let candidates: Vec<&str> = self.function_defs.keys().map(String::as_str).collect();
            let mut message = format!("unknown function `{}`", base);
            if let Some(best) = tml_diagnostics::suggest_similar(base, candidates).first() {
                message.push_str(&format!("; did you mean `{}`?", best));
            }
            CodegenError::unknown_symbol(message, self.current_span)
        })?;

        let shared = self.shared_defs.contains(base);

        if !func.is_generic() {
            if func.is_extern() {
                let symbol = self.extern_symbols.get(base).cloned().ok_or_else(|| {
                    CodegenError::internal(
                        format!("extern `{}` referenced before declaration", base),
                        self.current_span,
                    )
                })?;
                return Ok(ResolvedFunction {
                    symbol,
                    param_types: func.params.iter().map(|p| p.ty.clone()).collect(),
                    return_type: func.return_type.clone().unwrap_or(Type::Unit),
                    is_async: false,
                });
            }
            let symbol = self.function_symbol(base, &[], shared)?;
            let return_type = func.return_type.clone().unwrap_or(Type::Unit);
            return Ok(ResolvedFunction {
                symbol,
                param_types: func.params.iter().map(|p| p.ty.clone()).collect(),
                return_type: if func.is_async {
                    Type::generic("Poll", vec![return_type])
                } else {
                    return_type
                },
                is_async: func.is_async,
            });
        }

        // Explicit type arguments win; otherwise infer from the call
        let resolved_args: Vec<Type> = if type_args.is_empty() {
            self.infer_type_args_from_call(&func, arg_types)?
        } else {
            type_args.to_vec()
        };

        if resolved_args.len() != func.type_params.len() {
            return Err(CodegenError::unresolved_generic(
                format!(
                    "function `{}` expects {} type arguments, got {}",
                    base,
                    func.type_params.len(),
                    resolved_args.len()
                ),
                self.current_span,
            ));
        }
        for arg in &resolved_args {
            if generic_depth(arg) > MAX_GENERIC_DEPTH {
                return Err(CodegenError::internal(
                    format!(
                        "generic type nesting too deep (max {}): {}",
                        MAX_GENERIC_DEPTH, arg
                    ),
                    self.current_span,
                ));
            }
            if arg.contains_param() {
                return Err(self.err_unresolved(arg));
            }
        }

        let mut subst: HashMap<String, Type> = HashMap::new();
        for (param, arg) in func.type_params.iter().zip(resolved_args.iter()) {
            subst.insert(param.name.clone(), arg.clone());
        }

        let symbol = self.function_symbol(base, &resolved_args, shared)?;
        let param_types: Vec<Type> = func
            .params
            .iter()
            .map(|p| substitute_type(&p.ty, &subst))
            .collect();
        let return_type = substitute_type(
            &func.return_type.clone().unwrap_or(Type::Unit),
            &subst,
        );
        let resolved = ResolvedFunction {
            symbol: symbol.clone(),
            param_types,
            return_type: if func.is_async {
                Type::generic("Poll", vec![return_type])
            } else {
                return_type
            },
            is_async: func.is_async,
        };

        if let Some(entry) = self.generic_instantiations.get(&symbol) {
            if entry.generated {
                return Ok(resolved);
            }
            // Recursive reference to an instantiation already being
            // emitted higher up the stack; the symbol is enough
            return Ok(resolved);
        }

        self.check_instantiation_bounds(&func.type_params, &func.where_clause, &subst, base)?;

        let interned: Vec<Type> = resolved_args
            .iter()
            .map(|t| (*self.interner.intern(t.clone())).clone())
            .collect();
        self.generic_instantiations.insert(
            symbol.clone(),
            InstEntry {
                base: base.to_string(),
                type_args: interned,
                generated: false,
            },
        );

        self.instantiation_depth += 1;
        if self.instantiation_depth > MAX_GENERIC_DEPTH {
            self.instantiation_depth -= 1;
            return Err(CodegenError::internal(
                format!(
                    "generic instantiation depth exceeded {} while expanding `{}`",
                    MAX_GENERIC_DEPTH, symbol
                ),
                self.current_span,
            ));
        }

        let linkage = if self.options.force_internal_linkage && !func.should_panic() {
            "internal ".to_string()
        } else {
            "linkonce_odr ".to_string()
        };
        log::debug!("monomorphizing {} as {}", base, symbol);
        let result = self.emit_function_body(&func, &symbol, subst, &linkage, None);
        self.instantiation_depth -= 1;
        result?;

        if let Some(entry) = self.generic_instantiations.get_mut(&symbol) {
            entry.generated = true;
        }
        Ok(resolved)
    }
}
