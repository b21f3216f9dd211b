// generics/inference.rs
// Type argument inference from call sites

use std::collections::HashMap;
use tml_ast::{FuncDecl, Type};

use super::super::errors::{CgResult, CodegenError};
use super::super::LlvmIrGen;

impl LlvmIrGen {
    /// Infer type arguments for a generic function from the semantic types
    /// of its call arguments. `func id[T](x: T)` called with an I32 yields
    /// `[I32]`. Explicit type arguments bypass this entirely.
    pub(crate) fn infer_type_args_from_call(
        &self,
        func_def: &FuncDecl,
        arg_types: &[Type],
    ) -> CgResult<Vec<Type>> {
        if func_def.type_params.is_empty() {
            return Ok(Vec::new());
        }

        let mut inferred: HashMap<String, Type> = HashMap::new();
        let params = func_def
            .params
            .iter()
            .filter(|p| !p.is_receiver())
            .collect::<Vec<_>>();

        for (param, arg_ty) in params.iter().zip(arg_types.iter()) {
            match_type_param(&param.ty, arg_ty, &mut inferred);
        }

        let mut type_args = Vec::with_capacity(func_def.type_params.len());
        for type_param in &func_def.type_params {
            match inferred.get(&type_param.name) {
                Some(ty) => type_args.push(ty.clone()),
                None => {
                    return Err(CodegenError::unresolved_generic(
                        format!(
                            "cannot infer type parameter `{}` for `{}`; annotate the call",
                            type_param.name, func_def.name
                        ),
                        self.current_span,
                    ))
                }
            }
        }
        Ok(type_args)
    }
}

/// Match a declared parameter type against an argument type, collecting
/// bindings for every `Param` position: `T` vs `I32` binds T=I32,
/// `Maybe[T]` vs `Maybe[Str]` binds T=Str.
pub(crate) fn match_type_param(
    param_ty: &Type,
    arg_ty: &Type,
    inferred: &mut HashMap<String, Type>,
) {
    match (param_ty, arg_ty) {
        (Type::Param(name), _) => {
            inferred.entry(name.clone()).or_insert_with(|| arg_ty.clone());
        }
        (
            Type::Named {
                name: pn,
                type_args: pargs,
                ..
            },
            Type::Named {
                name: an,
                type_args: aargs,
                ..
            },
        ) if pn == an => {
            for (p, a) in pargs.iter().zip(aargs.iter()) {
                match_type_param(p, a, inferred);
            }
        }
        (Type::Ref { inner: p, .. }, Type::Ref { inner: a, .. })
        | (Type::Ptr { inner: p, .. }, Type::Ptr { inner: a, .. }) => {
            match_type_param(p, a, inferred);
        }
        (Type::Tuple(ps), Type::Tuple(aas)) => {
            for (p, a) in ps.iter().zip(aas.iter()) {
                match_type_param(p, a, inferred);
            }
        }
        (
            Type::Function {
                params: pp,
                return_type: pr,
                ..
            },
            Type::Function {
                params: ap,
                return_type: ar,
                ..
            },
        ) => {
            for (p, a) in pp.iter().zip(ap.iter()) {
                match_type_param(p, a, inferred);
            }
            match_type_param(pr, ar, inferred);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tml_ast::{Block, Param, SourceSpan, TypeParam, Visibility};

    fn generic_id() -> FuncDecl {
        FuncDecl {
            visibility: Visibility::Public,
            name: "id".into(),
            is_async: false,
            type_params: vec![TypeParam::plain("T")],
            where_clause: vec![],
            params: vec![Param::new("x", Type::Param("T".into()))],
            return_type: Some(Type::Param("T".into())),
            body: Some(Block::empty()),
            decorators: vec![],
            span: SourceSpan::unknown(),
        }
    }

    #[test]
    fn infers_from_plain_argument() {
        let gen = LlvmIrGen::new("inference_test");
        let args = gen
            .infer_type_args_from_call(&generic_id(), &[Type::I32])
            .unwrap();
        assert_eq!(args, vec![Type::I32]);
    }

    #[test]
    fn infers_through_generic_wrappers() {
        let gen = LlvmIrGen::new("inference_test");
        let mut func = generic_id();
        func.params = vec![Param::new(
            "x",
            Type::generic("Maybe", vec![Type::Param("T".into())]),
        )];
        let args = gen
            .infer_type_args_from_call(&func, &[Type::generic("Maybe", vec![Type::Str])])
            .unwrap();
        assert_eq!(args, vec![Type::Str]);
    }

    #[test]
    fn missing_binding_is_an_error() {
        let gen = LlvmIrGen::new("inference_test");
        let mut func = generic_id();
        func.params = vec![Param::new("x", Type::I32)];
        assert!(gen.infer_type_args_from_call(&func, &[Type::I32]).is_err());
    }
}
