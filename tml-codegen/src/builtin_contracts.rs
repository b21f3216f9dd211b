// Builtin behavior implementations for primitive types
// The compiler provides these without user impl blocks

use tml_ast::Type;

/// Check if a primitive type has a compiler-provided behavior implementation.
///
/// Numeric types carry the full set. Bool and Char drop Numeric; Str
/// additionally has no Default. Unit satisfies only the structural trio.
pub fn has_builtin_contract(ty: &Type, behavior: &str) -> bool {
    if ty.is_numeric() {
        return matches!(
            behavior,
            "Eq" | "Ord" | "Hash" | "Display" | "Debug" | "Default" | "Duplicate" | "Numeric"
        );
    }
    match ty {
        Type::Bool | Type::Char => matches!(
            behavior,
            "Eq" | "Ord" | "Hash" | "Display" | "Debug" | "Default" | "Duplicate"
        ),
        Type::Str => matches!(
            behavior,
            "Eq" | "Ord" | "Hash" | "Display" | "Debug" | "Duplicate"
        ),
        Type::Unit => matches!(behavior, "Eq" | "Default" | "Duplicate"),
        _ => false,
    }
}

/// The method name a builtin behavior contributes, for dispatch messages
pub fn builtin_contract_method(behavior: &str) -> Option<&'static str> {
    match behavior {
        "Display" => Some("to_str"),
        "Debug" => Some("debug_str"),
        "Duplicate" => Some("duplicate"),
        "Eq" => Some("equals"),
        "Ord" => Some("compare"),
        "Hash" => Some("hash"),
        "Default" => Some("default"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_types_have_full_set() {
        for ty in [Type::I8, Type::I64, Type::U128, Type::F64] {
            for behavior in [
                "Eq",
                "Ord",
                "Hash",
                "Display",
                "Debug",
                "Default",
                "Duplicate",
                "Numeric",
            ] {
                assert!(has_builtin_contract(&ty, behavior), "{ty} lacks {behavior}");
            }
        }
    }

    #[test]
    fn str_has_no_default() {
        assert!(has_builtin_contract(&Type::Str, "Eq"));
        assert!(has_builtin_contract(&Type::Str, "Hash"));
        assert!(!has_builtin_contract(&Type::Str, "Default"));
        assert!(!has_builtin_contract(&Type::Str, "Numeric"));
    }

    #[test]
    fn bool_and_char_are_not_numeric() {
        assert!(has_builtin_contract(&Type::Bool, "Ord"));
        assert!(!has_builtin_contract(&Type::Bool, "Numeric"));
        assert!(has_builtin_contract(&Type::Char, "Display"));
        assert!(!has_builtin_contract(&Type::Char, "Numeric"));
    }

    #[test]
    fn structs_are_not_builtins() {
        assert!(!has_builtin_contract(&Type::named("Point"), "Eq"));
    }
}
