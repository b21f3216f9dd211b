// FFI declaration emission
// One declare per external symbol; re-declarations must agree

use tml_ast::FuncDecl;

use super::errors::{CgResult, CodegenError};
use super::{ExternSig, LlvmIrGen};

/// Map a source ABI string to an LLVM calling convention prefix
fn calling_convention(abi: &str) -> Option<&'static str> {
    match abi {
        "c" | "c++" | "" => Some(""),
        "stdcall" => Some("x86_stdcallcc "),
        "fastcall" => Some("x86_fastcallcc "),
        "thiscall" => Some("x86_thiscallcc "),
        _ => None,
    }
}

impl LlvmIrGen {
    /// Declare a runtime helper or intrinsic exactly once
    pub(crate) fn ensure_runtime_declared(&mut self, symbol: &str, line: &str) -> CgResult<()> {
        if self.declared_intrinsics.insert(symbol.to_string()) {
            self.declares.push_str(line);
            self.declares.push('\n');
        }
        Ok(())
    }

    /// Emit the declare directive for an @extern function. Calls through
    /// the source name target the extern symbol; a second declaration of
    /// the same symbol is silent when the signatures agree and an
    /// ExternalABIMismatch when they conflict.
    pub(crate) fn emit_extern_decl(&mut self, func: &FuncDecl) -> CgResult<()> {
        self.current_span = func.span;
        let (abi, symbol_override) = func.extern_decorator().ok_or_else(|| {
            CodegenError::internal(
                format!("`{}` is not an extern declaration", func.name),
                func.span,
            )
        })?;
        let symbol = symbol_override.unwrap_or(&func.name).to_string();

        let callconv = calling_convention(abi).ok_or_else(|| {
            CodegenError::extern_abi_mismatch(
                format!(
                    "unsupported ABI `{}` on `{}`; expected c, c++, stdcall, fastcall or thiscall",
                    abi, func.name
                ),
                func.span,
            )
        })?;

        let ret = match &func.return_type {
            Some(ty) => self.llvm_return_type(ty)?,
            None => "void".to_string(),
        };
        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            params.push(self.llvm_type(&param.ty)?);
        }
        let sig = ExternSig {
            callconv: callconv.trim_end().to_string(),
            ret: ret.clone(),
            params: params.clone(),
        };

        if let Some(existing) = self.declared_externs.get(&symbol) {
            if *existing != sig {
                return Err(CodegenError::extern_abi_mismatch(
                    format!(
                        "extern `{}` re-declared with a conflicting signature \
                         (was {} {}({}), now {} {}({}))",
                        symbol,
                        existing.callconv,
                        existing.ret,
                        existing.params.join(", "),
                        sig.callconv,
                        sig.ret,
                        sig.params.join(", ")
                    ),
                    func.span,
                ));
            }
            // Same signature: subsequent references are silent
            self.extern_symbols.insert(func.name.clone(), symbol);
            return Ok(());
        }

        self.declares.push_str(&format!(
            "declare {}{} @{}({})\n",
            callconv,
            ret,
            symbol,
            params.join(", ")
        ));
        self.declared_externs.insert(symbol.clone(), sig);
        self.extern_symbols.insert(func.name.clone(), symbol);

        for lib in func.link_libraries() {
            if !self.link_libs.iter().any(|l| l == lib) {
                self.link_libs.push(lib.to_string());
            }
        }
        Ok(())
    }

    /// Link libraries accumulated from @link decorators, in first-seen
    /// order, for the linker phase outside this core
    pub fn link_libraries(&self) -> &[String] {
        &self.link_libs
    }
}
