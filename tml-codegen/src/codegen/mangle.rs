// Name mangling
// Pure functions from (base, type-args) to stable symbol fragments

use tml_ast::Type;

use super::errors::{CgResult, CodegenError};

/// Mangle a concrete semantic type into its canonical token.
///
/// `Maybe[Ptr[Node[I32]]]` becomes `Maybe__ptr_Node__I32`. Pointer and
/// reference wrappers use the `ptr_`/`mutptr_`/`ref_`/`mutref_` prefixes.
pub fn mangle_type(ty: &Type) -> CgResult<String> {
    match ty {
        Type::I8 => Ok("I8".into()),
        Type::I16 => Ok("I16".into()),
        Type::I32 => Ok("I32".into()),
        Type::I64 => Ok("I64".into()),
        Type::I128 => Ok("I128".into()),
        Type::U8 => Ok("U8".into()),
        Type::U16 => Ok("U16".into()),
        Type::U32 => Ok("U32".into()),
        Type::U64 => Ok("U64".into()),
        Type::U128 => Ok("U128".into()),
        Type::F32 => Ok("F32".into()),
        Type::F64 => Ok("F64".into()),
        Type::Bool => Ok("Bool".into()),
        Type::Char => Ok("Char".into()),
        Type::Str => Ok("Str".into()),
        Type::Unit => Ok("Unit".into()),
        Type::Never => Ok("Never".into()),
        Type::Named {
            name, type_args, ..
        } => mangle(name, type_args),
        Type::Param(name) => Err(CodegenError::unresolved_generic(
            format!("type parameter `{}` survived substitution during mangling", name),
            tml_ast::SourceSpan::unknown(),
        )),
        Type::Ref { is_mut, inner } => {
            let prefix = if *is_mut { "mutref_" } else { "ref_" };
            Ok(format!("{}{}", prefix, mangle_type(inner)?))
        }
        Type::Ptr { is_mut, inner } => {
            let prefix = if *is_mut { "mutptr_" } else { "ptr_" };
            Ok(format!("{}{}", prefix, mangle_type(inner)?))
        }
        Type::Tuple(elems) => mangle(&format!("Tuple{}", elems.len()), elems),
        Type::Function { params, return_type, .. } => {
            let mut all = params.clone();
            all.push((**return_type).clone());
            mangle(&format!("Fn{}", params.len()), &all)
        }
    }
}

/// Mangle a base name with ordered type arguments: `Base__Arg1__Arg2`
pub fn mangle(base: &str, type_args: &[Type]) -> CgResult<String> {
    if type_args.is_empty() {
        return Ok(base.to_string());
    }
    let mut parts = Vec::with_capacity(type_args.len());
    for arg in type_args {
        parts.push(mangle_type(arg)?);
    }
    Ok(format!("{}__{}", base, parts.join("__")))
}

fn primitive_token(token: &str) -> Option<Type> {
    crate::type_registry::primitive_by_name(token)
}

/// Parse one mangled type token back into a semantic type.
///
/// Primitive tokens are recognized first, then pointer/reference prefixes,
/// then the `Base__Args` form. In this single-type context the remainder
/// after a base is always treated as exactly one argument; callers that
/// know the argument count use `demangle_multi` instead.
pub fn parse_mangled_type(token: &str) -> CgResult<Type> {
    if token.is_empty() {
        return Err(CodegenError::malformed_mangled_name(
            "empty mangled type token",
        ));
    }
    if let Some(prim) = primitive_token(token) {
        return Ok(prim);
    }
    for (prefix, build) in [
        ("mutptr_", true),
        ("ptr_", false),
    ] {
        if let Some(rest) = token.strip_prefix(prefix) {
            return Ok(Type::Ptr {
                is_mut: build,
                inner: Box::new(parse_mangled_type(rest)?),
            });
        }
    }
    for (prefix, build) in [
        ("mutref_", true),
        ("ref_", false),
    ] {
        if let Some(rest) = token.strip_prefix(prefix) {
            return Ok(Type::Ref {
                is_mut: build,
                inner: Box::new(parse_mangled_type(rest)?),
            });
        }
    }
    match token.split_once("__") {
        Some((base, rest)) => {
            if base.is_empty() || rest.is_empty() {
                return Err(CodegenError::malformed_mangled_name(format!(
                    "dangling argument separator in `{}`",
                    token
                )));
            }
            if primitive_token(base).is_some() {
                return Err(CodegenError::malformed_mangled_name(format!(
                    "primitive `{}` cannot take type arguments in `{}`",
                    base, token
                )));
            }
            Ok(Type::Named {
                name: base.to_string(),
                module_path: Vec::new(),
                type_args: vec![parse_mangled_type(rest)?],
            })
        }
        None => Ok(Type::named(token)),
    }
}

/// Demangle in a single-parameter context: everything after the base is
/// one type, never split on `__`.
pub fn demangle_single(mangled: &str) -> CgResult<(String, Vec<Type>)> {
    match mangled.split_once("__") {
        Some((base, rest)) => {
            if base.is_empty() || rest.is_empty() {
                return Err(CodegenError::malformed_mangled_name(format!(
                    "dangling argument separator in `{}`",
                    mangled
                )));
            }
            Ok((base.to_string(), vec![parse_mangled_type(rest)?]))
        }
        None => Ok((mangled.to_string(), Vec::new())),
    }
}

/// Demangle in a multi-parameter context. Splitting the suffix on `__` is
/// only sound when every argument is a bare primitive token, so anything
/// else is rejected instead of guessed at.
pub fn demangle_multi(mangled: &str) -> CgResult<(String, Vec<Type>)> {
    match mangled.split_once("__") {
        Some((base, rest)) => {
            if base.is_empty() || rest.is_empty() {
                return Err(CodegenError::malformed_mangled_name(format!(
                    "dangling argument separator in `{}`",
                    mangled
                )));
            }
            let mut args = Vec::new();
            for token in rest.split("__") {
                match primitive_token(token) {
                    Some(prim) => args.push(prim),
                    None => {
                        return Err(CodegenError::malformed_mangled_name(format!(
                            "`{}` is not a primitive token; multi-parameter \
                             demangling cannot split `{}` unambiguously",
                            token, mangled
                        )))
                    }
                }
            }
            Ok((base.to_string(), args))
        }
        None => Ok((mangled.to_string(), Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangles_nested_pointer_types() {
        let ty = Type::generic("Maybe", vec![Type::ptr(Type::generic("Node", vec![Type::I32]))]);
        assert_eq!(mangle_type(&ty).unwrap(), "Maybe__ptr_Node__I32");
    }

    #[test]
    fn mangles_multi_arg_bases() {
        assert_eq!(
            mangle("Outcome", &[Type::I64, Type::Str]).unwrap(),
            "Outcome__I64__Str"
        );
        assert_eq!(mangle("Point", &[]).unwrap(), "Point");
    }

    #[test]
    fn single_param_round_trip_with_nesting() {
        let (base, args) = demangle_single("Maybe__ptr_Node__I32").unwrap();
        assert_eq!(base, "Maybe");
        assert_eq!(
            args,
            vec![Type::ptr(Type::generic("Node", vec![Type::I32]))]
        );
    }

    #[test]
    fn primitive_round_trip_multi() {
        for (base, args) in [
            ("Outcome", vec![Type::I64, Type::Str]),
            ("Maybe", vec![Type::Bool]),
            ("Triple", vec![Type::U8, Type::F64, Type::Char]),
        ] {
            let mangled = mangle(base, &args).unwrap();
            let (b, a) = demangle_multi(&mangled).unwrap();
            assert_eq!(b, base);
            assert_eq!(a, args);
        }
    }

    #[test]
    fn multi_refuses_nested_args() {
        // Maybe__ptr_Node__I32 has one arg whose mangling contains `__`;
        // splitting it would fabricate two
        assert!(demangle_multi("Maybe__ptr_Node__I32").is_err());
    }

    #[test]
    fn references_use_ref_prefixes() {
        let ty = Type::Ref {
            is_mut: true,
            inner: Box::new(Type::I64),
        };
        assert_eq!(mangle_type(&ty).unwrap(), "mutref_I64");
        assert_eq!(parse_mangled_type("mutref_I64").unwrap(), ty);
    }

    #[test]
    fn unresolved_param_is_an_error() {
        assert!(mangle_type(&Type::Param("T".into())).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(parse_mangled_type("").is_err());
        assert!(parse_mangled_type("I64__Str").is_err());
        assert!(demangle_single("Maybe__").is_err());
    }
}
