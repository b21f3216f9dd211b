// Builtin type name registry
// Replaces repeated string comparisons with O(1) lookups

use std::collections::HashSet;
use std::sync::OnceLock;

/// Builtin enum names registered at startup
static BUILTIN_ENUM_NAMES: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Builtin behavior names registered at startup
static BUILTIN_BEHAVIOR_NAMES: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Builtin opaque types that lower to a runtime pointer
static BUILTIN_OPAQUE_NAMES: OnceLock<HashSet<&'static str>> = OnceLock::new();

fn get_builtin_enums() -> &'static HashSet<&'static str> {
    BUILTIN_ENUM_NAMES.get_or_init(|| {
        let mut names = HashSet::new();
        names.insert("Ordering");
        names.insert("Maybe");
        names.insert("Outcome");
        names.insert("Poll");
        names
    })
}

fn get_builtin_behaviors() -> &'static HashSet<&'static str> {
    BUILTIN_BEHAVIOR_NAMES.get_or_init(|| {
        let mut names = HashSet::new();
        names.insert("Eq");
        names.insert("Ord");
        names.insert("Hash");
        names.insert("Display");
        names.insert("Debug");
        names.insert("Default");
        names.insert("Duplicate");
        names.insert("Numeric");
        names.insert("Future");
        names.insert("Drop");
        names.insert("Iterator");
        names
    })
}

fn get_builtin_opaques() -> &'static HashSet<&'static str> {
    BUILTIN_OPAQUE_NAMES.get_or_init(|| {
        let mut names = HashSet::new();
        names.insert("StringBuilder");
        names.insert("Context");
        names
    })
}

/// Check if a name is one of the builtin enums (Ordering, Maybe, Outcome, Poll)
pub fn is_builtin_enum(name: &str) -> bool {
    get_builtin_enums().contains(name)
}

/// Check if a name is one of the builtin behaviors
pub fn is_builtin_behavior(name: &str) -> bool {
    get_builtin_behaviors().contains(name)
}

/// Check if a name is a builtin opaque runtime type (lowers to `ptr`)
pub fn is_builtin_opaque(name: &str) -> bool {
    get_builtin_opaques().contains(name)
}

/// Resolve a primitive type name. Used by `lookup_type` before consulting
/// user declarations.
pub fn primitive_by_name(name: &str) -> Option<tml_ast::Type> {
    use tml_ast::Type;
    let ty = match name {
        "I8" => Type::I8,
        "I16" => Type::I16,
        "I32" => Type::I32,
        "I64" => Type::I64,
        "I128" => Type::I128,
        "U8" => Type::U8,
        "U16" => Type::U16,
        "U32" => Type::U32,
        "U64" => Type::U64,
        "U128" => Type::U128,
        "F32" => Type::F32,
        "F64" => Type::F64,
        "Bool" => Type::Bool,
        "Char" => Type::Char,
        "Str" => Type::Str,
        "Unit" => Type::Unit,
        "Never" => Type::Never,
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_enums() {
        assert!(is_builtin_enum("Maybe"));
        assert!(is_builtin_enum("Outcome"));
        assert!(is_builtin_enum("Poll"));
        assert!(is_builtin_enum("Ordering"));
        assert!(!is_builtin_enum("MyEnum"));
    }

    #[test]
    fn builtin_behaviors() {
        assert!(is_builtin_behavior("Drop"));
        assert!(is_builtin_behavior("Future"));
        assert!(is_builtin_behavior("Iterator"));
        assert!(!is_builtin_behavior("Railgun"));
    }

    #[test]
    fn primitive_lookup() {
        assert_eq!(primitive_by_name("I64"), Some(tml_ast::Type::I64));
        assert_eq!(primitive_by_name("Str"), Some(tml_ast::Type::Str));
        assert_eq!(primitive_by_name("Foo"), None);
    }
}
