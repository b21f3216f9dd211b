// Size and alignment of semantic types
// Tagged enum payloads are sized by recursion across instantiations

use std::collections::HashMap;
use tml_ast::{EnumDef, Type};

use super::errors::{CgResult, CodegenError};
use super::generics::substitute_type;
use super::{LlvmIrGen, MAX_ENUM_PAYLOAD};

impl LlvmIrGen {
    /// Size of a concrete semantic type in bytes.
    ///
    /// Structs and tuples are the sum of their field sizes; tight packing
    /// is a non-goal. Enums are tag plus payload words.
    pub fn size_of(&self, ty: &Type) -> CgResult<usize> {
        let mut visiting = Vec::new();
        self.size_of_inner(ty, &mut visiting)
    }

    fn size_of_inner(&self, ty: &Type, visiting: &mut Vec<String>) -> CgResult<usize> {
        match ty {
            Type::Unit | Type::Never => Ok(0),
            Type::I8 | Type::U8 | Type::Bool => Ok(1),
            Type::I16 | Type::U16 => Ok(2),
            Type::I32 | Type::U32 | Type::F32 | Type::Char => Ok(4),
            Type::I64 | Type::U64 | Type::F64 | Type::Str => Ok(8),
            Type::I128 | Type::U128 => Ok(16),
            Type::Ptr { .. } | Type::Ref { .. } | Type::Function { .. } => Ok(8),
            Type::Tuple(elems) => {
                let mut total = 0;
                for elem in elems {
                    total += self.size_of_inner(elem, visiting)?;
                }
                Ok(total)
            }
            Type::Param(name) => Err(CodegenError::unresolved_generic(
                format!("cannot size unresolved type parameter `{}`", name),
                self.current_span,
            )),
            Type::Named {
                name, type_args, ..
            } => self.size_of_named(name, type_args, visiting),
        }
    }

    fn size_of_named(
        &self,
        name: &str,
        type_args: &[Type],
        visiting: &mut Vec<String>,
    ) -> CgResult<usize> {
        if crate::type_registry::is_builtin_opaque(name) {
            return Ok(8);
        }

        let key = mangled_key(name, type_args, self.current_span)?;
        if visiting.iter().any(|k| k == &key) {
            return Err(CodegenError::internal(
                format!(
                    "type `{}` is recursive without indirection; break the cycle with a pointer",
                    key
                ),
                self.current_span,
            ));
        }
        visiting.push(key);

        let result = if let Some(def) = self.struct_ast_defs.get(name) {
            let subst = substitution_for(&def.type_params, type_args, name, self.current_span)?;
            let mut total = 0;
            for field in &def.fields {
                let resolved = substitute_type(&field.ty, &subst);
                total += self.size_of_inner(&resolved, visiting)?;
            }
            Ok(total)
        } else if let Some(def) = self.enum_ast_defs.get(name) {
            let def = def.clone();
            let words = self.enum_payload_words(&def, type_args, visiting)?;
            if words == 0 {
                Ok(4)
            } else {
                // i32 tag padded to the 8-byte payload boundary
                Ok(8 + 8 * words)
            }
        } else {
            Err(CodegenError::unknown_symbol(
                format!("cannot size unknown type `{}`", name),
                self.current_span,
            ))
        };

        visiting.pop();
        result
    }

    /// Payload word count for an enum instantiation: the maximum variant
    /// payload (sum of field sizes) rounded up to a multiple of 8 bytes.
    /// Zero means no variant carries data.
    pub(crate) fn enum_payload_words(
        &self,
        def: &EnumDef,
        type_args: &[Type],
        visiting: &mut Vec<String>,
    ) -> CgResult<usize> {
        let subst = substitution_for(&def.type_params, type_args, &def.name, self.current_span)?;
        let mut max_payload = 0usize;
        for variant in &def.variants {
            let mut payload = 0usize;
            for field_ty in variant.fields.field_types() {
                let resolved = substitute_type(&field_ty, &subst);
                payload += self.size_of_inner(&resolved, visiting)?;
            }
            max_payload = max_payload.max(payload);
        }
        if max_payload > MAX_ENUM_PAYLOAD {
            return Err(CodegenError::layout_overflow(
                format!(
                    "enum `{}` payload of {} bytes exceeds the {} byte cap",
                    def.name, max_payload, MAX_ENUM_PAYLOAD
                ),
                self.current_span,
            ));
        }
        Ok(max_payload.div_ceil(8))
    }

    /// Byte offsets of a variant's payload fields, laid out sequentially
    pub(crate) fn payload_field_offsets(&self, field_types: &[Type]) -> CgResult<Vec<usize>> {
        let mut offsets = Vec::with_capacity(field_types.len());
        let mut offset = 0usize;
        for ty in field_types {
            offsets.push(offset);
            offset += self.size_of(ty)?;
        }
        Ok(offsets)
    }
}

/// Alignment that can be claimed for a payload field at `offset` inside
/// the 8-byte-aligned payload array. Never over-promises.
pub(crate) fn payload_field_align(offset: usize, size: usize) -> usize {
    let natural = size.next_power_of_two().clamp(1, 8);
    let from_offset = if offset == 0 {
        8
    } else {
        1usize << offset.trailing_zeros().min(3)
    };
    natural.min(from_offset)
}

fn mangled_key(name: &str, type_args: &[Type], span: tml_ast::SourceSpan) -> CgResult<String> {
    super::mangle::mangle(name, type_args).map_err(|mut e| {
        e.span = span;
        e
    })
}

fn substitution_for(
    params: &[tml_ast::TypeParam],
    args: &[Type],
    name: &str,
    span: tml_ast::SourceSpan,
) -> CgResult<HashMap<String, Type>> {
    if params.len() != args.len() {
        return Err(CodegenError::unresolved_generic(
            format!(
                "`{}` expects {} type arguments, got {}",
                name,
                params.len(),
                args.len()
            ),
            span,
        ));
    }
    Ok(params
        .iter()
        .zip(args.iter())
        .map(|(p, a)| (p.name.clone(), a.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::LlvmIrGen;
    use super::*;

    #[test]
    fn primitive_sizes_match_the_table() {
        let gen = LlvmIrGen::new("layout_test");
        for (ty, size) in [
            (Type::Unit, 0),
            (Type::I8, 1),
            (Type::Bool, 1),
            (Type::I16, 2),
            (Type::I32, 4),
            (Type::F32, 4),
            (Type::I64, 8),
            (Type::F64, 8),
            (Type::Str, 8),
            (Type::I128, 16),
            (Type::ptr(Type::I8), 8),
        ] {
            assert_eq!(gen.size_of(&ty).unwrap(), size, "{ty}");
        }
    }

    #[test]
    fn tuple_size_is_field_sum() {
        let gen = LlvmIrGen::new("layout_test");
        let ty = Type::Tuple(vec![Type::I32, Type::I64, Type::Bool]);
        assert_eq!(gen.size_of(&ty).unwrap(), 13);
    }

    #[test]
    fn builtin_enum_payloads() {
        let gen = LlvmIrGen::new("layout_test");
        // Maybe[I64]: Just carries 8 bytes -> one payload word
        let maybe = gen.enum_ast_defs.get("Maybe").unwrap().clone();
        assert_eq!(
            gen.enum_payload_words(&maybe, &[Type::I64], &mut Vec::new())
                .unwrap(),
            1
        );
        // Ordering is data-free
        let ordering = gen.enum_ast_defs.get("Ordering").unwrap().clone();
        assert_eq!(
            gen.enum_payload_words(&ordering, &[], &mut Vec::new()).unwrap(),
            0
        );
    }

    #[test]
    fn nested_generic_enum_recurses() {
        let gen = LlvmIrGen::new("layout_test");
        // Maybe[Maybe[I64]] payload is the inner enum: 8 (tag) + 8 = 16 bytes
        let maybe = gen.enum_ast_defs.get("Maybe").unwrap().clone();
        let inner = Type::generic("Maybe", vec![Type::I64]);
        assert_eq!(
            gen.enum_payload_words(&maybe, &[inner], &mut Vec::new())
                .unwrap(),
            2
        );
    }

    #[test]
    fn alignment_never_exceeds_offset_alignment() {
        assert_eq!(payload_field_align(0, 8), 8);
        assert_eq!(payload_field_align(8, 8), 8);
        assert_eq!(payload_field_align(4, 8), 4);
        assert_eq!(payload_field_align(4, 4), 4);
        assert_eq!(payload_field_align(1, 8), 1);
        assert_eq!(payload_field_align(0, 1), 1);
    }
}
