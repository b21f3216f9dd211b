// Coverage instrumentation
// Two independent hooks at function entry: a runtime callback keyed by
// function name, and llvm.instrprof.increment keyed by an FNV-1a hash

use std::fmt::Write as _;

use super::errors::CgResult;
use super::LlvmIrGen;

/// FNV-1a 64-bit hash of a function name
pub fn fnv1a_hash(name: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl LlvmIrGen {
    /// Emit the configured coverage hooks at a function's entry
    pub(crate) fn emit_coverage_entry(&mut self, symbol: &str) -> CgResult<()> {
        if self.options.coverage_enabled {
            self.ensure_runtime_declared("tml_cover_func", "declare void @tml_cover_func(ptr)")?;
            let name_global = self.string_global(symbol)?;
            self.emit_line(format!("call void @tml_cover_func(ptr {})", name_global));
        }
        if self.options.llvm_source_coverage {
            self.ensure_runtime_declared(
                "llvm.instrprof.increment",
                "declare void @llvm.instrprof.increment(ptr, i64, i32, i32)",
            )?;
            let profile_name = format!("@__profn_{}", symbol);
            writeln!(
                self.coverage_meta,
                "{} = private constant [{} x i8] c\"{}\"",
                profile_name,
                symbol.len(),
                super::expressions::escape_llvm_string(symbol)
            )?;
            let hash = fnv1a_hash(symbol);
            self.emit_line(format!(
                "call void @llvm.instrprof.increment(ptr {}, i64 {}, i32 1, i32 0)",
                profile_name, hash
            ));
        }
        Ok(())
    }
}
