// generics/mod.rs
// Generic type substitution and on-demand instantiation

mod enums;
pub(crate) mod functions;
pub(crate) mod inference;
pub(crate) mod methods;
mod structs;

use std::collections::HashMap;
use tml_ast::Type;

/// Replace `Param` placeholders according to a substitution map.
/// Unmapped parameters are left in place; emission paths reject them
/// later as UnresolvedGeneric.
pub fn substitute_type(ty: &Type, subst: &HashMap<String, Type>) -> Type {
    match ty {
        Type::Param(name) => subst.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Named {
            name,
            module_path,
            type_args,
        } => Type::Named {
            name: name.clone(),
            module_path: module_path.clone(),
            type_args: type_args.iter().map(|t| substitute_type(t, subst)).collect(),
        },
        Type::Ref { is_mut, inner } => Type::Ref {
            is_mut: *is_mut,
            inner: Box::new(substitute_type(inner, subst)),
        },
        Type::Ptr { is_mut, inner } => Type::Ptr {
            is_mut: *is_mut,
            inner: Box::new(substitute_type(inner, subst)),
        },
        Type::Tuple(elems) => {
            Type::Tuple(elems.iter().map(|t| substitute_type(t, subst)).collect())
        }
        Type::Function {
            params,
            return_type,
            is_async,
        } => Type::Function {
            params: params.iter().map(|t| substitute_type(t, subst)).collect(),
            return_type: Box::new(substitute_type(return_type, subst)),
            is_async: *is_async,
        },
        other => other.clone(),
    }
}

/// Nesting depth of a type, used to cap runaway generic recursion
pub fn generic_depth(ty: &Type) -> usize {
    match ty {
        Type::Named { type_args, .. } => {
            1 + type_args.iter().map(generic_depth).max().unwrap_or(0)
        }
        Type::Ref { inner, .. } | Type::Ptr { inner, .. } => 1 + generic_depth(inner),
        Type::Tuple(elems) => 1 + elems.iter().map(generic_depth).max().unwrap_or(0),
        Type::Function {
            params,
            return_type,
            ..
        } => {
            1 + params
                .iter()
                .chain(std::iter::once(&**return_type))
                .map(generic_depth)
                .max()
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_reaches_nested_args() {
        let mut subst = HashMap::new();
        subst.insert("T".to_string(), Type::I64);
        let ty = Type::generic("Maybe", vec![Type::ptr(Type::Param("T".into()))]);
        assert_eq!(
            substitute_type(&ty, &subst),
            Type::generic("Maybe", vec![Type::ptr(Type::I64)])
        );
    }

    #[test]
    fn unmapped_params_survive() {
        let subst = HashMap::new();
        let ty = Type::Param("U".into());
        assert_eq!(substitute_type(&ty, &subst), ty);
    }

    #[test]
    fn depth_counts_nesting() {
        assert_eq!(generic_depth(&Type::I32), 0);
        let nested = Type::generic("Maybe", vec![Type::generic("Maybe", vec![Type::I32])]);
        assert_eq!(generic_depth(&nested), 2);
    }
}
