// Builtin function registry
// Deterministic startup registration of every intrinsic the language
// exposes; lowering strategies live in lowering.rs

mod lowering;

use std::collections::HashMap;
use tml_ast::Type;

/// Signature of one builtin overload
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl FuncSig {
    fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }
}

/// Name-keyed overload table for builtin functions
pub struct BuiltinRegistry {
    overloads: HashMap<String, Vec<FuncSig>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            overloads: HashMap::new(),
        };
        registry.register_all();
        registry
    }

    fn register(&mut self, name: &str, params: Vec<Type>, ret: Type) {
        self.overloads
            .entry(name.to_string())
            .or_default()
            .push(FuncSig::new(params, ret));
    }

    fn register_all(&mut self) {
        use Type::*;

        let byte_ptr = Type::ptr(U8);
        let word_ptr = Type::ptr(I64);
        let sb = Type::named("StringBuilder");

        // I/O
        self.register("print", vec![Str], Unit);
        self.register("println", vec![Str], Unit);
        self.register("panic", vec![Str], Never);
        self.register("assert", vec![Bool], Unit);
        for ty in [I32, I64, U32, U64, F64, Bool, Char, Str] {
            self.register("assert_eq", vec![ty.clone(), ty.clone()], Unit);
            self.register("assert_ne", vec![ty.clone(), ty], Unit);
        }

        // Strings
        self.register("str_len", vec![Str], I64);
        self.register("str_eq", vec![Str, Str], Bool);
        self.register("str_hash", vec![Str], I64);
        self.register("str_concat", vec![Str, Str], Str);
        self.register("str_substring", vec![Str, I64, I64], Str);
        self.register("str_contains", vec![Str, Str], Bool);
        self.register("str_starts_with", vec![Str, Str], Bool);
        self.register("str_ends_with", vec![Str, Str], Bool);
        self.register("str_to_upper", vec![Str], Str);
        self.register("str_to_lower", vec![Str], Str);
        self.register("str_trim", vec![Str], Str);
        self.register("str_char_at", vec![Str, I64], Char);

        // Chars
        for name in [
            "char_is_alpha",
            "char_is_digit",
            "char_is_alnum",
            "char_is_whitespace",
            "char_is_upper",
            "char_is_lower",
        ] {
            self.register(name, vec![Char], Bool);
        }
        self.register("char_to_digit", vec![Char], I64);
        self.register("char_from_digit", vec![I64], Char);
        self.register("char_code", vec![Char], I32);
        self.register("char_from_code", vec![I32], Char);

        // StringBuilder
        self.register("sb_new", vec![], sb.clone());
        self.register("sb_append", vec![sb.clone(), Str], Unit);
        self.register("sb_append_char", vec![sb.clone(), Char], Unit);
        self.register("sb_append_int", vec![sb.clone(), I64], Unit);
        self.register("sb_len", vec![sb.clone()], I64);
        self.register("sb_to_str", vec![sb.clone()], Str);
        self.register("sb_clear", vec![sb.clone()], Unit);
        self.register("sb_free", vec![sb], Unit);

        // Math
        self.register("sqrt", vec![F64], F64);
        self.register("pow", vec![F64, F64], F64);
        self.register("abs", vec![I64], I64);
        self.register("abs", vec![F64], F64);
        self.register("floor", vec![F64], F64);
        self.register("ceil", vec![F64], F64);
        self.register("round", vec![F64], F64);
        self.register("int_to_float", vec![I64], F64);
        self.register("float_to_int", vec![F64], I64);
        self.register("black_box", vec![I64], I64);
        self.register("black_box", vec![F64], F64);

        // Memory
        self.register("mem_alloc", vec![U64], byte_ptr.clone());
        self.register("mem_alloc_zeroed", vec![U64], byte_ptr.clone());
        self.register("mem_realloc", vec![byte_ptr.clone(), U64], byte_ptr.clone());
        self.register("mem_free", vec![byte_ptr.clone()], Unit);
        self.register("mem_copy", vec![byte_ptr.clone(), byte_ptr.clone(), U64], Unit);
        self.register("mem_move", vec![byte_ptr.clone(), byte_ptr.clone(), U64], Unit);
        self.register("mem_set", vec![byte_ptr.clone(), U8, U64], Unit);
        self.register("mem_zero", vec![byte_ptr.clone(), U64], Unit);
        self.register("mem_compare", vec![byte_ptr.clone(), byte_ptr.clone(), U64], I32);
        self.register("mem_eq", vec![byte_ptr.clone(), byte_ptr.clone(), U64], Bool);

        // Atomics
        self.register("atomic_load", vec![word_ptr.clone()], I64);
        self.register("atomic_store", vec![word_ptr.clone(), I64], Unit);
        for name in [
            "atomic_add",
            "atomic_sub",
            "atomic_exchange",
            "atomic_and",
            "atomic_or",
            "atomic_xor",
        ] {
            self.register(name, vec![word_ptr.clone(), I64], I64);
        }
        self.register("atomic_cas", vec![word_ptr.clone(), I64, I64], Bool);
        self.register("atomic_cas_val", vec![word_ptr.clone(), I64, I64], I64);
        self.register("fence", vec![], Unit);
        self.register("fence_acquire", vec![], Unit);
        self.register("fence_release", vec![], Unit);

        // Spinlocks; richer sync primitives live in library code over FFI
        self.register("spin_lock", vec![word_ptr.clone()], Unit);
        self.register("spin_unlock", vec![word_ptr.clone()], Unit);
        self.register("spin_trylock", vec![word_ptr], Bool);

        // Async driver boundary: block_on over Poll[T] for common T
        for ty in [I32, I64, F64, Bool, Str, Unit] {
            self.register(
                "block_on",
                vec![Type::generic("Poll", vec![ty.clone()])],
                ty,
            );
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.overloads.contains_key(name)
    }

    pub fn overloads(&self, name: &str) -> Option<&[FuncSig]> {
        self.overloads.get(name).map(Vec::as_slice)
    }

    /// Pick the overload matching the argument types. Exact matches win;
    /// a sole overload is returned regardless so the caller can coerce.
    pub fn resolve(&self, name: &str, arg_types: &[Type]) -> Option<&FuncSig> {
        let sigs = self.overloads.get(name)?;
        if let Some(exact) = sigs
            .iter()
            .find(|sig| sig.params.len() == arg_types.len() && sig.params == arg_types)
        {
            return Some(exact);
        }
        if sigs.len() == 1 {
            return sigs.first();
        }
        // block_on on an arbitrary Poll[T] resolves structurally
        sigs.iter().find(|sig| {
            sig.params.len() == arg_types.len()
                && sig
                    .params
                    .iter()
                    .zip(arg_types.iter())
                    .all(|(p, a)| same_base(p, a))
        })
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn same_base(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Named { name: an, .. }, Type::Named { name: bn, .. }) => an == bn,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_eq_is_overloaded_per_type() {
        let registry = BuiltinRegistry::new();
        let sigs = registry.overloads("assert_eq").unwrap();
        assert!(sigs.len() >= 8);
        let picked = registry.resolve("assert_eq", &[Type::Str, Type::Str]).unwrap();
        assert_eq!(picked.params, vec![Type::Str, Type::Str]);
    }

    #[test]
    fn panic_returns_never() {
        let registry = BuiltinRegistry::new();
        let sig = registry.resolve("panic", &[Type::Str]).unwrap();
        assert_eq!(sig.ret, Type::Never);
    }

    #[test]
    fn unknown_builtin_is_none() {
        let registry = BuiltinRegistry::new();
        assert!(registry.overloads("made_up").is_none());
    }

    #[test]
    fn block_on_matches_any_poll() {
        let registry = BuiltinRegistry::new();
        let poll_i32 = Type::generic("Poll", vec![Type::I32]);
        assert!(registry.resolve("block_on", &[poll_i32]).is_some());
    }
}
