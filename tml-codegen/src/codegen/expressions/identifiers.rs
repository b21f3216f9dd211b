// Identifier lowering
// Locals load from their stack slots; bare function names become
// function pointers (how @should_panic tests reach the harness)

use tml_ast::Type;

use super::super::errors::{CgResult, CodegenError};
use super::super::{LlvmIrGen, Value};

impl LlvmIrGen {
    pub(crate) fn lower_ident(&mut self, name: &str) -> CgResult<Value> {
        if let Some(local) = self.lookup_local(name).cloned() {
            return self.load_from(&local.slot, &local.ty);
        }

        // A function referenced by name yields a pointer to it
        if let Some(func) = self.function_defs.get(name).cloned() {
            if func.is_generic() {
                return Err(CodegenError::unresolved_generic(
                    format!(
                        "generic function `{}` cannot be referenced without type arguments",
                        name
                    ),
                    self.current_span,
                ));
            }
            let resolved = self.require_function_instantiation(name, &[], &[])?;
            let fn_ty = Type::Function {
                params: resolved.param_types.clone(),
                return_type: Box::new(resolved.return_type.clone()),
                is_async: resolved.is_async,
            };
            return Ok(Value::new(format!("@{}", resolved.symbol), fn_ty));
        }

        let mut candidates: Vec<&str> = self
            .locals
            .iter()
            .flat_map(|scope| scope.keys().map(String::as_str))
            .collect();
        candidates.extend(self.function_defs.keys().map(String::as_str));
        let mut message = format!("cannot find value `{}` in this scope", name);
        if let Some(best) = tml_diagnostics::suggest_similar(name, candidates).first() {
            message.push_str(&format!("; did you mean `{}`?", best));
        }
        Err(CodegenError::unknown_symbol(message, self.current_span))
    }
}
