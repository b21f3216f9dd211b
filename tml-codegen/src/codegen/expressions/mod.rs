// Expression lowering
// Every expression produces an SSA value paired with its semantic type

mod binary_ops;
mod calls;
mod control_flow;
mod identifiers;
mod literals;
mod pattern_matching;
mod structs_enums;

pub(crate) use literals::escape_llvm_string;

use tml_ast::{Expr, Type};

use super::errors::{CgResult, CodegenError};
use super::{LlvmIrGen, Value};

impl LlvmIrGen {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> CgResult<Value> {
        match expr {
            Expr::IntLit { value, ty } => self.lower_int_literal(*value, ty.as_ref()),
            Expr::FloatLit { value, ty } => self.lower_float_literal(*value, ty.as_ref()),
            Expr::BoolLit(b) => Ok(Value::new(if *b { "true" } else { "false" }, Type::Bool)),
            Expr::CharLit(c) => Ok(Value::new(format!("{}", *c as u32), Type::Char)),
            Expr::StrLit(s) => self.lower_str_literal(s),
            Expr::UnitLit => Ok(Value::unit()),
            Expr::Ident(name) => self.lower_ident(name),
            Expr::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            Expr::Unary { op, operand } => self.lower_unary(*op, operand),
            Expr::Call {
                callee,
                type_args,
                args,
            } => self.lower_call(callee, type_args, args),
            Expr::MethodCall {
                receiver,
                method,
                type_args,
                args,
            } => self.lower_method_call(receiver, method, type_args, args),
            Expr::BaseCall { method, args } => self.lower_base_call(method, args),
            Expr::Field { receiver, field } => self.lower_field_access(receiver, field),
            Expr::StructLit {
                name,
                type_args,
                fields,
            } => self.lower_struct_literal(name, type_args, fields),
            Expr::EnumLit {
                enum_name,
                type_args,
                variant,
                args,
            } => self.lower_enum_literal(enum_name, type_args, variant, args),
            Expr::Tuple(elems) => self.lower_tuple_literal(elems),
            Expr::If {
                cond,
                then_block,
                else_block,
            } => self
                .lower_if(cond, then_block, else_block.as_ref())
                .map(|v| v.unwrap_or_else(Value::unit)),
            Expr::When { scrutinee, arms } => self.lower_when(scrutinee, arms),
            Expr::BlockExpr(block) => self
                .lower_block_scoped(block)
                .map(|v| v.unwrap_or_else(Value::unit)),
            Expr::Await(inner) => self.lower_await(inner),
            Expr::Try(inner) => self.lower_try(inner),
            Expr::RefOf { is_mut, expr } => self.lower_ref_of(*is_mut, expr),
            Expr::Deref(inner) => self.lower_deref(inner),
        }
    }

    /// Widen or reinterpret a value to match a target type. Integer
    /// widening sign- or zero-extends by the source signedness; a literal
    /// zero destined for a pointer or aggregate becomes null /
    /// zeroinitializer rather than a malformed `0`.
    pub(crate) fn coerce_value(&mut self, value: Value, target: &Type) -> CgResult<Value> {
        let target = self.require_concrete(target)?;
        if value.ty == target {
            return Ok(value);
        }

        if value.repr == "0" {
            match &target {
                Type::Ptr { .. } | Type::Ref { .. } | Type::Str | Type::Function { .. } => {
                    return Ok(Value::new("null", target));
                }
                Type::Named { .. } | Type::Tuple(_) => {
                    return Ok(Value::new("zeroinitializer", target));
                }
                _ => {}
            }
        }

        if value.ty.is_integer() && target.is_integer() {
            let from = value.ty.int_bit_width().unwrap_or(32);
            let to = target.int_bit_width().unwrap_or(32);
            if from == to {
                return Ok(Value::new(value.repr, target));
            }
            let from_llvm = self.llvm_type(&value.ty)?;
            let to_llvm = self.llvm_type(&target)?;
            let tmp = self.fresh_tmp();
            let op = if from < to {
                if value.ty.is_signed_integer() {
                    "sext"
                } else {
                    "zext"
                }
            } else {
                "trunc"
            };
            self.emit_line(format!(
                "{} = {} {} {} to {}",
                tmp, op, from_llvm, value.repr, to_llvm
            ));
            return Ok(Value::new(tmp, target));
        }

        if value.ty == Type::F32 && target == Type::F64 {
            let tmp = self.fresh_tmp();
            self.emit_line(format!("{} = fpext float {} to double", tmp, value.repr));
            return Ok(Value::new(tmp, target));
        }

        // Structurally equal or front-end-checked compatible; keep the
        // representation and adopt the target type
        Ok(Value::new(value.repr, target))
    }

    /// Store a value into a fresh stack slot and return the slot pointer.
    /// Used wherever an addressable copy is needed (enum inspection,
    /// by-pointer receivers).
    pub(crate) fn spill_to_slot(&mut self, value: &Value) -> CgResult<String> {
        let llvm = self.llvm_type(&value.ty)?;
        let slot = self.entry_alloca("spill", &llvm);
        if !matches!(value.ty, Type::Unit | Type::Never) {
            self.emit_line(format!("store {} {}, ptr {}", llvm, value.repr, slot));
        }
        Ok(slot)
    }

    /// Lower an expression to an assignable location: (pointer, type).
    /// Identifiers, field chains, and dereferences qualify.
    pub(crate) fn lower_place(&mut self, expr: &Expr) -> CgResult<(String, Type)> {
        match expr {
            Expr::Ident(name) => {
                let local = self.lookup_local(name).cloned().ok_or_else(|| {
                    CodegenError::unknown_symbol(
                        format!("cannot find value `{}` in this scope", name),
                        self.current_span,
                    )
                })?;
                // A reference local (receiver or ref binding) designates
                // the object it points at
                match &local.ty {
                    Type::Ref { inner, .. } => {
                        let tmp = self.fresh_tmp();
                        self.emit_line(format!("{} = load ptr, ptr {}", tmp, local.slot));
                        Ok((tmp, (**inner).clone()))
                    }
                    _ => Ok((local.slot.clone(), local.ty.clone())),
                }
            }
            Expr::Field { receiver, field } => {
                let (ptr, ty) = self.lower_place(receiver)?;
                self.field_pointer(&ptr, &ty, field)
            }
            Expr::Deref(inner) => {
                let value = self.lower_expr(inner)?;
                match &value.ty {
                    Type::Ref { inner, .. } | Type::Ptr { inner, .. } => {
                        Ok((value.repr, (**inner).clone()))
                    }
                    other => Err(CodegenError::internal(
                        format!("cannot dereference a value of type `{}`", other),
                        self.current_span,
                    )),
                }
            }
            _ => Err(CodegenError::internal(
                "expression is not assignable",
                self.current_span,
            )),
        }
    }

    pub(crate) fn lower_ref_of(&mut self, is_mut: bool, expr: &Expr) -> CgResult<Value> {
        let (ptr, ty) = match self.lower_place(expr) {
            Ok(place) => place,
            Err(_) => {
                // Taking a reference to a temporary spills it
                let value = self.lower_expr(expr)?;
                let slot = self.spill_to_slot(&value)?;
                (slot, value.ty)
            }
        };
        Ok(Value::new(
            ptr,
            Type::Ref {
                is_mut,
                inner: Box::new(ty),
            },
        ))
    }

    pub(crate) fn lower_deref(&mut self, inner: &Expr) -> CgResult<Value> {
        let value = self.lower_expr(inner)?;
        match value.ty.clone() {
            Type::Ref { inner, .. } | Type::Ptr { inner, .. } => {
                self.load_from(&value.repr, &inner)
            }
            other => Err(CodegenError::internal(
                format!("cannot dereference a value of type `{}`", other),
                self.current_span,
            )),
        }
    }

    /// Load a typed value from a pointer; zero-sized types load nothing
    pub(crate) fn load_from(&mut self, ptr: &str, ty: &Type) -> CgResult<Value> {
        let ty = self.require_concrete(ty)?;
        if matches!(ty, Type::Unit | Type::Never) {
            return Ok(Value::unit());
        }
        let llvm = self.llvm_type(&ty)?;
        let tmp = self.fresh_tmp();
        self.emit_line(format!("{} = load {}, ptr {}", tmp, llvm, ptr));
        Ok(Value::new(tmp, ty))
    }

    /// Store a typed value through a pointer; zero-sized stores vanish
    pub(crate) fn store_to(&mut self, ptr: &str, value: &Value) -> CgResult<()> {
        if matches!(value.ty, Type::Unit | Type::Never) {
            return Ok(());
        }
        let llvm = self.llvm_type(&value.ty)?;
        self.emit_line(format!("store {} {}, ptr {}", llvm, value.repr, ptr));
        Ok(())
    }
}
