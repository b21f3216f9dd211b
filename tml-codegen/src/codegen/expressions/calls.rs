// Call lowering: direct calls, method dispatch, super-calls, and
// Outcome error propagation (`expr!`)

use tml_ast::{Expr, Type};

use super::super::errors::{CgResult, CodegenError};
use super::super::{LlvmIrGen, Value};
use super::structs_enums::is_place_expr;

impl LlvmIrGen {
    pub(crate) fn lower_call(
        &mut self,
        callee: &str,
        type_args: &[Type],
        args: &[Expr],
    ) -> CgResult<Value> {
        // Calls through a local holding a function pointer are indirect
        if let Some(local) = self.lookup_local(callee).cloned() {
            if let Type::Function {
                params,
                return_type,
                ..
            } = local.ty.clone()
            {
                let fnptr = self.load_from(&local.slot, &local.ty)?;
                let mut values = Vec::with_capacity(args.len());
                for (arg, param_ty) in args.iter().zip(params.iter()) {
                    let value = self.lower_expr(arg)?;
                    values.push(self.coerce_value(value, param_ty)?);
                }
                return self.emit_call(&fnptr.repr, &values, &return_type);
            }
        }

        if self.builtins.is_builtin(callee) {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.lower_expr(arg)?);
            }
            return self.lower_builtin_call(callee, values);
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.lower_expr(arg)?);
        }
        let arg_types: Vec<Type> = values.iter().map(|v| v.ty.clone()).collect();
        let resolved_type_args: Vec<Type> = type_args
            .iter()
            .map(|t| self.require_concrete(t))
            .collect::<CgResult<_>>()?;
        let resolved =
            self.require_function_instantiation(callee, &resolved_type_args, &arg_types)?;

        let mut coerced = Vec::with_capacity(values.len());
        for (value, param_ty) in values.into_iter().zip(resolved.param_types.iter()) {
            let param_ty = self.require_concrete(param_ty)?;
            coerced.push(self.coerce_value(value, &param_ty)?);
        }
        let target = format!("@{}", resolved.symbol);
        self.emit_call(&target, &coerced, &resolved.return_type)
    }

    pub(crate) fn lower_method_call(
        &mut self,
        receiver: &Expr,
        method: &str,
        type_args: &[Type],
        args: &[Expr],
    ) -> CgResult<Value> {
        // Receiver first: aggregates and mut-primitive receivers need an
        // addressable location, immutable primitives go by value
        enum Receiver {
            Place(String, Type),
            Loaded(Value),
        }
        let lowered = if is_place_expr(receiver) {
            let (ptr, ty) = self.lower_place(receiver)?;
            Receiver::Place(ptr, ty)
        } else {
            Receiver::Loaded(self.lower_expr(receiver)?)
        };
        let recv_ty = match &lowered {
            Receiver::Place(_, ty) => ty.clone(),
            Receiver::Loaded(v) => v.ty.clone(),
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.lower_expr(arg)?);
        }
        let arg_types: Vec<Type> = values.iter().map(|v| v.ty.clone()).collect();
        let resolved_margs: Vec<Type> = type_args
            .iter()
            .map(|t| self.require_concrete(t))
            .collect::<CgResult<_>>()?;

        let target =
            self.require_method_instantiation(&recv_ty, method, &resolved_margs, &arg_types)?;

        let receiver_arg = if target.receiver_by_pointer {
            let ptr = match lowered {
                Receiver::Place(ptr, _) => ptr,
                Receiver::Loaded(value) => {
                    // Method mutations on a temporary die with it
                    match &value.ty {
                        Type::Ref { .. } | Type::Ptr { .. } => value.repr,
                        _ => self.spill_to_slot(&value)?,
                    }
                }
            };
            Value::new(ptr, Type::ptr(Type::Unit))
        } else {
            match lowered {
                Receiver::Place(ptr, ty) => self.load_from(&ptr, &ty)?,
                Receiver::Loaded(value) => match value.ty.clone() {
                    Type::Ref { inner, .. } | Type::Ptr { inner, .. } => {
                        self.load_from(&value.repr, &inner)?
                    }
                    _ => value,
                },
            }
        };

        let mut call_args = Vec::with_capacity(values.len() + 1);
        if target.receiver_by_pointer {
            call_args.push(Value::new(receiver_arg.repr.clone(), Type::ptr(Type::Unit)));
        } else {
            call_args.push(receiver_arg);
        }
        for (value, param_ty) in values.into_iter().zip(target.param_types.iter()) {
            let param_ty = self.require_concrete(param_ty)?;
            call_args.push(self.coerce_value(value, &param_ty)?);
        }
        let symbol = format!("@{}", target.symbol);
        self.emit_call(&symbol, &call_args, &target.return_type)
    }

    /// `base.method(...)`: statically-resolved call into the
    /// super-behavior's implementation on the current receiver
    pub(crate) fn lower_base_call(&mut self, method: &str, args: &[Expr]) -> CgResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.lower_expr(arg)?);
        }
        let arg_types: Vec<Type> = values.iter().map(|v| v.ty.clone()).collect();
        let target = self.resolve_super_method(method, &arg_types)?;

        // The receiver is the enclosing method's own `this`
        let this = self.lookup_local("this").or_else(|| self.lookup_local("self"));
        let this = this.cloned().ok_or_else(|| {
            CodegenError::internal(
                "base method call outside of an instance method",
                self.current_span,
            )
        })?;

        let mut call_args = Vec::with_capacity(values.len() + 1);
        if target.receiver_by_pointer {
            let loaded = self.load_from(&this.slot, &this.ty)?;
            call_args.push(Value::new(loaded.repr, Type::ptr(Type::Unit)));
        } else {
            let loaded = self.load_from(&this.slot, &this.ty)?;
            let loaded = match loaded.ty.clone() {
                Type::Ref { inner, .. } => self.load_from(&loaded.repr, &inner)?,
                _ => loaded,
            };
            call_args.push(loaded);
        }
        for (value, param_ty) in values.into_iter().zip(target.param_types.iter()) {
            let param_ty = self.require_concrete(param_ty)?;
            call_args.push(self.coerce_value(value, &param_ty)?);
        }
        let symbol = format!("@{}", target.symbol);
        self.emit_call(&symbol, &call_args, &target.return_type)
    }

    /// Emit a call to `target` (either `@symbol` or an SSA function
    /// pointer). A Never-returning callee is followed by unreachable.
    pub(crate) fn emit_call(
        &mut self,
        target: &str,
        args: &[Value],
        return_type: &Type,
    ) -> CgResult<Value> {
        let return_type = self.require_concrete(return_type)?;
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            let llvm = if matches!(arg.ty, Type::Ptr { .. } | Type::Ref { .. }) {
                "ptr".to_string()
            } else {
                self.llvm_type(&arg.ty)?
            };
            rendered.push(format!("{} {}", llvm, arg.repr));
        }
        let arg_list = rendered.join(", ");

        match &return_type {
            Type::Unit => {
                self.emit_line(format!("call void {}({})", target, arg_list));
                Ok(Value::unit())
            }
            Type::Never => {
                self.emit_line(format!("call void {}({})", target, arg_list));
                self.emit_terminator("unreachable");
                Ok(Value::new("undef", Type::Never))
            }
            _ => {
                let llvm = self.llvm_type(&return_type)?;
                let tmp = self.fresh_tmp();
                self.emit_line(format!(
                    "{} = call {} {}({})",
                    tmp, llvm, target, arg_list
                ));
                Ok(Value::new(tmp, return_type))
            }
        }
    }

    /// `expr!` error propagation: an Err payload early-returns from the
    /// enclosing function (whose return type must be an Outcome with the
    /// same error type); an Ok payload yields its value.
    pub(crate) fn lower_try(&mut self, inner: &Expr) -> CgResult<Value> {
        let value = self.lower_expr(inner)?;
        let Type::Named {
            name, type_args, ..
        } = value.ty.clone()
        else {
            return Err(CodegenError::internal(
                format!("`!` applied to non-Outcome type `{}`", value.ty),
                self.current_span,
            ));
        };
        if name != "Outcome" || type_args.len() != 2 {
            return Err(CodegenError::internal(
                format!("`!` applied to non-Outcome type `{}`", value.ty),
                self.current_span,
            ));
        }
        let ok_ty = type_args.first().cloned().unwrap_or(Type::Unit);
        let err_ty = type_args.get(1).cloned().unwrap_or(Type::Unit);

        let ret_ty = self.current_return_type.clone();
        let ret_is_outcome = matches!(
            &ret_ty,
            Type::Named { name, type_args, .. } if name == "Outcome" && type_args.len() == 2
        );
        if !ret_is_outcome {
            return Err(CodegenError::internal(
                format!(
                    "`!` requires the enclosing function to return an Outcome, found `{}`",
                    ret_ty
                ),
                self.current_span,
            ));
        }

        let (_, expr_llvm) = self.enum_parts(&value.ty)?;
        let slot = self.spill_to_slot(&value)?;
        let tag = self.load_enum_tag(&slot, &expr_llvm)?;

        let err_label = self.fresh_label("try.err");
        let ok_label = self.fresh_label("try.ok");
        let is_err = self.fresh_tmp();
        self.emit_line(format!("{} = icmp eq i32 {}, 1", is_err, tag));
        self.emit_terminator(format!(
            "br i1 {}, label %{}, label %{}",
            is_err, err_label, ok_label
        ));

        // Err path: rebuild the error in the function's own Outcome
        // instantiation and return it
        self.emit_label(&err_label);
        let err_payload =
            self.read_enum_payload_field(&slot, &expr_llvm, &[err_ty.clone()], 0)?;
        let rebuilt = self.construct_enum_value(&ret_ty, "Err", &[err_payload])?;
        let ret_llvm = self.llvm_type(&ret_ty)?;
        self.emit_drops_for_scopes(0)?;
        self.emit_terminator(format!("ret {} {}", ret_llvm, rebuilt.repr));

        // Ok path: yield the payload
        self.emit_label(&ok_label);
        self.read_enum_payload_field(&slot, &expr_llvm, &[ok_ty], 0)
    }
}
