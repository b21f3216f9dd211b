// `when` expression lowering
// Tagged-union matching: load the discriminant, compare per arm, branch;
// matched arms reinterpret the payload bytes at the declared types

use tml_ast::{Expr, Pattern, Type, WhenArm};

use super::super::errors::{CgResult, CodegenError};
use super::super::{LlvmIrGen, LocalVar, Value};

impl LlvmIrGen {
    pub(crate) fn lower_when(&mut self, scrutinee: &Expr, arms: &[WhenArm]) -> CgResult<Value> {
        if arms.is_empty() {
            return Err(CodegenError::internal(
                "when expression has no arms",
                self.current_span,
            ));
        }

        let value = self.lower_expr(scrutinee)?;
        let slot = self.spill_to_slot(&value)?;

        let enum_info = match &value.ty {
            Type::Named { name, .. } if self.enum_ast_defs.contains_key(name) => {
                let (mangled, llvm) = self.enum_parts(&value.ty)?;
                let tag = self.load_enum_tag(&slot, &llvm)?;
                Some((mangled, llvm, tag))
            }
            _ => None,
        };

        let end_label = self.fresh_label("when.end");
        // Result slot is created at the first arm that yields a value
        let mut result: Option<(String, Type)> = None;
        let mut saw_catch_all = false;

        for arm in arms {
            if saw_catch_all {
                break;
            }
            let arm_label = self.fresh_label("when.arm");
            let next_label = self.fresh_label("when.next");

            match &arm.pattern {
                Pattern::Variant {
                    enum_name,
                    variant,
                    ..
                } => {
                    let Some((mangled, _, tag)) = &enum_info else {
                        return Err(CodegenError::internal(
                            format!("variant pattern on non-enum scrutinee `{}`", value.ty),
                            self.current_span,
                        ));
                    };
                    let layout = self.enum_layout(mangled)?.clone();
                    if let Some(expected_name) = enum_name {
                        let scrutinee_base = match &value.ty {
                            Type::Named { name, .. } => name.as_str(),
                            _ => "",
                        };
                        if expected_name != scrutinee_base {
                            return Err(CodegenError::unknown_symbol(
                                format!(
                                    "pattern names enum `{}` but scrutinee is `{}`",
                                    expected_name, scrutinee_base
                                ),
                                self.current_span,
                            ));
                        }
                    }
                    let expected_tag = layout
                        .variants
                        .iter()
                        .position(|(name, _)| name == variant)
                        .ok_or_else(|| {
                            CodegenError::unknown_symbol(
                                format!("enum `{}` has no variant `{}`", value.ty, variant),
                                self.current_span,
                            )
                        })?;
                    let cmp = self.fresh_tmp();
                    self.emit_line(format!("{} = icmp eq i32 {}, {}", cmp, tag, expected_tag));
                    self.emit_terminator(format!(
                        "br i1 {}, label %{}, label %{}",
                        cmp, arm_label, next_label
                    ));
                }
                Pattern::Binding(_) | Pattern::Wildcard => {
                    saw_catch_all = true;
                    self.emit_terminator(format!("br label %{}", arm_label));
                }
            }

            self.emit_label(&arm_label);
            self.push_locals();
            self.push_drop_scope();

            match &arm.pattern {
                Pattern::Variant {
                    variant, bindings, ..
                } => {
                    if let Some((mangled, llvm, _)) = &enum_info {
                        let layout = self.enum_layout(mangled)?.clone();
                        let field_types = layout
                            .variants
                            .iter()
                            .find(|(name, _)| name == variant)
                            .map(|(_, fields)| fields.clone())
                            .unwrap_or_default();
                        let llvm = llvm.clone();
                        for (index, binding) in bindings.iter().enumerate() {
                            if binding == "_" {
                                continue;
                            }
                            let field =
                                self.read_enum_payload_field(&slot, &llvm, &field_types, index)?;
                            let field_llvm = self.llvm_type(&field.ty)?;
                            let bind_slot = self.entry_alloca(binding, &field_llvm);
                            self.store_to(&bind_slot, &field)?;
                            self.define_local(
                                binding,
                                LocalVar {
                                    slot: bind_slot,
                                    ty: field.ty.clone(),
                                    is_mut: false,
                                },
                            );
                        }
                    }
                }
                Pattern::Binding(name) => {
                    let llvm = self.llvm_type(&value.ty)?;
                    let bind_slot = self.entry_alloca(name, &llvm);
                    self.store_to(&bind_slot, &value)?;
                    self.define_local(
                        name,
                        LocalVar {
                            slot: bind_slot,
                            ty: value.ty.clone(),
                            is_mut: false,
                        },
                    );
                }
                Pattern::Wildcard => {}
            }

            let tail = self.lower_block_contents(&arm.body)?;
            if !self.terminated {
                if let Some(tail) = tail {
                    if !matches!(tail.ty, Type::Unit | Type::Never) {
                        let (result_slot, result_ty) = match &result {
                            Some(pair) => pair.clone(),
                            None => {
                                let llvm = self.llvm_type(&tail.ty)?;
                                let result_slot = self.entry_alloca("when.result", &llvm);
                                result = Some((result_slot.clone(), tail.ty.clone()));
                                (result_slot, tail.ty.clone())
                            }
                        };
                        let coerced = self.coerce_value(tail, &result_ty)?;
                        self.store_to(&result_slot, &coerced)?;
                    }
                }
                self.emit_scope_drops()?;
                self.emit_terminator(format!("br label %{}", end_label));
            }
            self.pop_drop_scope_silent();
            self.pop_locals();

            self.emit_label(&next_label);
            if saw_catch_all {
                // The catch-all consumed the test edge; its next label is
                // dead but keeps the block structure well-formed
                self.emit_terminator("unreachable");
            }
        }

        if !saw_catch_all {
            // Exhaustiveness is checked upstream; a missed tag traps
            self.emit_terminator("unreachable");
        }

        self.emit_label(&end_label);
        match result {
            Some((slot, ty)) => self.load_from(&slot, &ty),
            None => Ok(Value::unit()),
        }
    }
}
