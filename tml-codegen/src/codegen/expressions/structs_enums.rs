// Struct literals, enum construction, and field access
// Enums are tagged unions: tag at field 0, payload bytes at field 1

use std::collections::HashMap;
use tml_ast::{Expr, Type};

use super::super::errors::{CgResult, CodegenError};
use super::super::generics::inference::match_type_param;
use super::super::layout::payload_field_align;
use super::super::{LlvmIrGen, Value};

impl LlvmIrGen {
    pub(crate) fn lower_struct_literal(
        &mut self,
        name: &str,
        type_args: &[Type],
        fields: &[(String, Expr)],
    ) -> CgResult<Value> {
        let resolved_args: Vec<Type> = type_args
            .iter()
            .map(|t| self.require_concrete(t))
            .collect::<CgResult<_>>()?;
        let mangled = self.require_struct_instantiation(name, &resolved_args)?;
        let struct_ty = Type::Named {
            name: name.to_string(),
            module_path: Vec::new(),
            type_args: resolved_args,
        };
        let llvm = format!("%struct.{}", mangled);
        let def_fields = self
            .struct_field_defs
            .get(&mangled)
            .cloned()
            .unwrap_or_default();

        let slot = self.entry_alloca("lit", &llvm);
        for (index, def_field) in def_fields.iter().enumerate() {
            let Some((_, expr)) = fields.iter().find(|(n, _)| n == &def_field.name) else {
                return Err(CodegenError::unknown_symbol(
                    format!("missing field `{}` in `{}` literal", def_field.name, name),
                    self.current_span,
                ));
            };
            let value = self.lower_expr(expr)?;
            let value = self.coerce_value(value, &def_field.ty)?;
            let ptr = self.fresh_tmp();
            self.emit_line(format!(
                "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 {}",
                ptr, llvm, slot, index
            ));
            self.store_to(&ptr, &value)?;
        }
        for (field_name, _) in fields {
            if !def_fields.iter().any(|f| &f.name == field_name) {
                return Err(CodegenError::unknown_symbol(
                    format!("struct `{}` has no field `{}`", name, field_name),
                    self.current_span,
                ));
            }
        }

        let loaded = self.fresh_tmp();
        self.emit_line(format!("{} = load {}, ptr {}", loaded, llvm, slot));
        Ok(Value::new(loaded, struct_ty))
    }

    pub(crate) fn lower_tuple_literal(&mut self, elems: &[Expr]) -> CgResult<Value> {
        let mut values = Vec::with_capacity(elems.len());
        for elem in elems {
            values.push(self.lower_expr(elem)?);
        }
        let ty = Type::Tuple(values.iter().map(|v| v.ty.clone()).collect());
        let llvm = self.llvm_type(&ty)?;
        let mut current = "undef".to_string();
        for (index, value) in values.iter().enumerate() {
            let elem_llvm = self.llvm_type(&value.ty)?;
            let tmp = self.fresh_tmp();
            self.emit_line(format!(
                "{} = insertvalue {} {}, {} {}, {}",
                tmp, llvm, current, elem_llvm, value.repr, index
            ));
            current = tmp;
        }
        Ok(Value::new(current, ty))
    }

    pub(crate) fn lower_enum_literal(
        &mut self,
        enum_name: &str,
        type_args: &[Type],
        variant: &str,
        args: &[Expr],
    ) -> CgResult<Value> {
        let arg_values: Vec<Value> = args
            .iter()
            .map(|a| self.lower_expr(a))
            .collect::<CgResult<_>>()?;

        let def = self.enum_ast_defs.get(enum_name).cloned().ok_or_else(|| {
            CodegenError::unknown_symbol(
                format!("unknown enum `{}`", enum_name),
                self.current_span,
            )
        })?;

        // Missing type arguments on a generic enum are inferred from the
        // constructor's payload
        let resolved_args: Vec<Type> = if def.is_generic() && type_args.is_empty() {
            let variant_def = def
                .variants
                .iter()
                .find(|v| v.name == variant)
                .ok_or_else(|| {
                    CodegenError::unknown_symbol(
                        format!("enum `{}` has no variant `{}`", enum_name, variant),
                        self.current_span,
                    )
                })?;
            let mut inferred: HashMap<String, Type> = HashMap::new();
            for (field_ty, value) in variant_def.fields.field_types().iter().zip(&arg_values) {
                match_type_param(field_ty, &value.ty, &mut inferred);
            }
            def.type_params
                .iter()
                .map(|p| {
                    inferred.get(&p.name).cloned().ok_or_else(|| {
                        CodegenError::unresolved_generic(
                            format!(
                                "cannot infer type parameter `{}` for `{}.{}`; annotate the constructor",
                                p.name, enum_name, variant
                            ),
                            self.current_span,
                        )
                    })
                })
                .collect::<CgResult<_>>()?
        } else {
            type_args
                .iter()
                .map(|t| self.require_concrete(t))
                .collect::<CgResult<_>>()?
        };

        let enum_ty = Type::Named {
            name: enum_name.to_string(),
            module_path: Vec::new(),
            type_args: resolved_args,
        };
        self.construct_enum_value(&enum_ty, variant, &arg_values)
    }

    /// Build an enum value: store the tag, then the payload fields at
    /// their byte offsets, and reload the aggregate
    pub(crate) fn construct_enum_value(
        &mut self,
        enum_ty: &Type,
        variant: &str,
        args: &[Value],
    ) -> CgResult<Value> {
        let (mangled, llvm) = self.enum_parts(enum_ty)?;
        let layout = self.enum_layout(&mangled)?.clone();
        let tag = layout
            .variants
            .iter()
            .position(|(name, _)| name == variant)
            .ok_or_else(|| {
                CodegenError::unknown_symbol(
                    format!("enum `{}` has no variant `{}`", enum_ty, variant),
                    self.current_span,
                )
            })? as u32;
        let field_types = layout
            .variants
            .get(tag as usize)
            .map(|(_, fields)| fields.clone())
            .unwrap_or_default();

        let slot = self.entry_alloca("enum", &llvm);
        let tag_ptr = self.fresh_tmp();
        self.emit_line(format!(
            "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 0",
            tag_ptr, llvm, slot
        ));
        self.emit_line(format!("store i32 {}, ptr {}", tag, tag_ptr));

        // Data-less variants leave the payload uninitialized; simple
        // enums (all payloads zero-sized) have no payload field at all
        if !field_types.is_empty() && !layout.simple {
            let payload_ptr = self.fresh_tmp();
            self.emit_line(format!(
                "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 1",
                payload_ptr, llvm, slot
            ));
            let offsets = self.payload_field_offsets(&field_types)?;
            for ((value, field_ty), offset) in args.iter().zip(&field_types).zip(&offsets) {
                let value = self.coerce_value(value.clone(), field_ty)?;
                if matches!(value.ty, Type::Unit | Type::Never) {
                    continue;
                }
                let field_llvm = self.llvm_type(&value.ty)?;
                let size = self.size_of(&value.ty)?;
                let align = payload_field_align(*offset, size);
                let field_ptr = self.fresh_tmp();
                self.emit_line(format!(
                    "{} = getelementptr inbounds i8, ptr {}, i64 {}",
                    field_ptr, payload_ptr, offset
                ));
                self.emit_line(format!(
                    "store {} {}, ptr {}, align {}",
                    field_llvm, value.repr, field_ptr, align
                ));
            }
        }

        let loaded = self.fresh_tmp();
        self.emit_line(format!("{} = load {}, ptr {}", loaded, llvm, slot));
        Ok(Value::new(loaded, enum_ty.clone()))
    }

    /// Mangled name and LLVM spelling for an enum-typed value
    pub(crate) fn enum_parts(&mut self, ty: &Type) -> CgResult<(String, String)> {
        let ty = self.require_concrete(ty)?;
        match &ty {
            Type::Named {
                name, type_args, ..
            } if self.enum_ast_defs.contains_key(name) => {
                let mangled = self.require_enum_instantiation(name, type_args)?;
                Ok((mangled.clone(), format!("%struct.{}", mangled)))
            }
            other => Err(CodegenError::internal(
                format!("`{}` is not an enum type", other),
                self.current_span,
            )),
        }
    }

    /// Load the discriminant (field 0) of an enum stored at `slot`
    pub(crate) fn load_enum_tag(&mut self, slot: &str, llvm: &str) -> CgResult<String> {
        let tag_ptr = self.fresh_tmp();
        self.emit_line(format!(
            "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 0",
            tag_ptr, llvm, slot
        ));
        let tag = self.fresh_tmp();
        self.emit_line(format!("{} = load i32, ptr {}", tag, tag_ptr));
        Ok(tag)
    }

    /// Read payload field `index` of a variant, reinterpreting the payload
    /// bytes at the field's declared type
    pub(crate) fn read_enum_payload_field(
        &mut self,
        slot: &str,
        llvm: &str,
        field_types: &[Type],
        index: usize,
    ) -> CgResult<Value> {
        let field_ty = field_types.get(index).cloned().ok_or_else(|| {
            CodegenError::internal(
                format!("variant payload has no field {}", index),
                self.current_span,
            )
        })?;
        if matches!(field_ty, Type::Unit | Type::Never) {
            return Ok(Value::unit());
        }
        let payload_ptr = self.fresh_tmp();
        self.emit_line(format!(
            "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 1",
            payload_ptr, llvm, slot
        ));
        let offsets = self.payload_field_offsets(field_types)?;
        let offset = offsets.get(index).copied().unwrap_or(0);
        let size = self.size_of(&field_ty)?;
        let align = payload_field_align(offset, size);
        let field_ptr = self.fresh_tmp();
        self.emit_line(format!(
            "{} = getelementptr inbounds i8, ptr {}, i64 {}",
            field_ptr, payload_ptr, offset
        ));
        let field_llvm = self.llvm_type(&field_ty)?;
        let loaded = self.fresh_tmp();
        self.emit_line(format!(
            "{} = load {}, ptr {}, align {}",
            loaded, field_llvm, field_ptr, align
        ));
        Ok(Value::new(loaded, field_ty))
    }

    /// Pointer to a named struct field through a pointer receiver
    pub(crate) fn field_pointer(
        &mut self,
        ptr: &str,
        ty: &Type,
        field: &str,
    ) -> CgResult<(String, Type)> {
        let ty = self.require_concrete(ty)?;
        let Type::Named {
            name, type_args, ..
        } = &ty
        else {
            return Err(CodegenError::internal(
                format!("cannot access field `{}` on `{}`", field, ty),
                self.current_span,
            ));
        };
        let mangled = self.require_struct_instantiation(name, type_args)?;
        let fields = self
            .struct_field_defs
            .get(&mangled)
            .cloned()
            .unwrap_or_default();
        let Some(index) = fields.iter().position(|f| f.name == field) else {
            let candidates: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            let mut message = format!("struct `{}` has no field `{}`", name, field);
            if let Some(best) = tml_diagnostics::suggest_similar(field, candidates).first() {
                message.push_str(&format!("; did you mean `{}`?", best));
            }
            return Err(CodegenError::unknown_symbol(message, self.current_span));
        };
        let field_ty = fields
            .get(index)
            .map(|f| f.ty.clone())
            .unwrap_or(Type::Unit);
        let out = self.fresh_tmp();
        self.emit_line(format!(
            "{} = getelementptr inbounds %struct.{}, ptr {}, i32 0, i32 {}",
            out, mangled, ptr, index
        ));
        Ok((out, field_ty))
    }

    pub(crate) fn lower_field_access(&mut self, receiver: &Expr, field: &str) -> CgResult<Value> {
        if is_place_expr(receiver) {
            let (ptr, ty) = self.lower_place(receiver)?;
            let (field_ptr, field_ty) = self.field_pointer(&ptr, &ty, field)?;
            return self.load_from(&field_ptr, &field_ty);
        }
        // Rvalue receiver: spill aggregates so field reads stay uniform
        let value = self.lower_expr(receiver)?;
        match value.ty.clone() {
            Type::Ref { inner, .. } | Type::Ptr { inner, .. } => {
                let (field_ptr, field_ty) = self.field_pointer(&value.repr, &inner, field)?;
                self.load_from(&field_ptr, &field_ty)
            }
            _ => {
                let slot = self.spill_to_slot(&value)?;
                let (field_ptr, field_ty) = self.field_pointer(&slot, &value.ty, field)?;
                self.load_from(&field_ptr, &field_ty)
            }
        }
    }
}

/// Expressions that denote storage locations
pub(crate) fn is_place_expr(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(_) | Expr::Field { .. } | Expr::Deref(_))
}
