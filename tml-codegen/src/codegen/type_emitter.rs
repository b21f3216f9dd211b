// Type definition emission
// Every %struct.X used by a function body is defined in the type_defs
// buffer first; emission is memoized by mangled name

use std::fmt::Write as _;
use tml_ast::Type;

use super::errors::{CgResult, CodegenError};
use super::LlvmIrGen;
use crate::type_registry;

impl LlvmIrGen {
    /// LLVM type string for a value or field position.
    /// Unit lowers to the empty struct; void is illegal inside aggregates.
    pub(crate) fn llvm_type(&mut self, ty: &Type) -> CgResult<String> {
        let ty = self.require_concrete(ty)?;
        match &ty {
            Type::I8 | Type::U8 => Ok("i8".into()),
            Type::I16 | Type::U16 => Ok("i16".into()),
            Type::I32 | Type::U32 | Type::Char => Ok("i32".into()),
            Type::I64 | Type::U64 => Ok("i64".into()),
            Type::I128 | Type::U128 => Ok("i128".into()),
            Type::F32 => Ok("float".into()),
            Type::F64 => Ok("double".into()),
            Type::Bool => Ok("i1".into()),
            Type::Str => Ok("ptr".into()),
            Type::Unit | Type::Never => Ok("{}".into()),
            Type::Ptr { .. } | Type::Ref { .. } | Type::Function { .. } => Ok("ptr".into()),
            Type::Tuple(elems) => {
                let mut parts = Vec::with_capacity(elems.len());
                for elem in elems {
                    parts.push(self.llvm_type(elem)?);
                }
                Ok(format!("{{ {} }}", parts.join(", ")))
            }
            Type::Named {
                name, type_args, ..
            } => self.ensure_named_type(name, type_args),
            Type::Param(_) => Err(self.err_unresolved(&ty)),
        }
    }

    /// LLVM type string for a return position (Unit and Never are void)
    pub(crate) fn llvm_return_type(&mut self, ty: &Type) -> CgResult<String> {
        let ty = self.require_concrete(ty)?;
        match ty {
            Type::Unit | Type::Never => Ok("void".into()),
            other => self.llvm_type(&other),
        }
    }

    /// Materialize a named type and return its LLVM spelling.
    /// Structs and enums trigger on-demand instantiation.
    pub(crate) fn ensure_named_type(&mut self, name: &str, type_args: &[Type]) -> CgResult<String> {
        if type_registry::is_builtin_opaque(name) {
            return Ok("ptr".into());
        }
        if self.struct_ast_defs.contains_key(name) {
            let mangled = self.require_struct_instantiation(name, type_args)?;
            return Ok(format!("%struct.{}", mangled));
        }
        if self.enum_ast_defs.contains_key(name) {
            let mangled = self.require_enum_instantiation(name, type_args)?;
            return Ok(format!("%struct.{}", mangled));
        }
        let candidates: Vec<&str> = self
            .struct_ast_defs
            .keys()
            .chain(self.enum_ast_defs.keys())
            .map(String::as_str)
            .collect();
        let mut message = format!("unknown type `{}`", name);
        if let Some(best) = tml_diagnostics::suggest_similar(name, candidates).first() {
            message.push_str(&format!("; did you mean `{}`?", best));
        }
        Err(CodegenError::unknown_symbol(message, self.current_span))
    }

    /// Append one type definition line. A name that was already emitted is
    /// a no-op so re-exports across modules never duplicate definitions.
    pub(crate) fn emit_type_def(&mut self, mangled: &str, body: &str) -> CgResult<()> {
        if !self.emitted_types.insert(mangled.to_string()) {
            return Ok(());
        }
        writeln!(self.type_defs, "%struct.{} = type {}", mangled, body)?;
        Ok(())
    }
}
