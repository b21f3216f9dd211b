// Async lowering: Poll[T] wrapping and the synchronous await model
// await unwraps Ready and propagates Pending up the call stack;
// block_on unwraps at the driver boundary and panics on Pending

use tml_ast::Type;

use super::errors::{CgResult, CodegenError};
use super::{LlvmIrGen, Value};

impl LlvmIrGen {
    /// Wrap a naked return value in Poll.Ready (tag 0, payload value)
    pub(crate) fn wrap_poll_ready(&mut self, value: Value) -> CgResult<Value> {
        let poll_ty = self.current_poll_type.clone().ok_or_else(|| {
            CodegenError::internal(
                "Poll wrapping requested outside an async function",
                self.current_span,
            )
        })?;
        if matches!(value.ty, Type::Unit | Type::Never) {
            return self.construct_enum_value(&poll_ty, "Ready", &[]);
        }
        self.construct_enum_value(&poll_ty, "Ready", &[value])
    }

    /// `await expr`: unwrap Ready(T); a Pending future early-returns the
    /// enclosing async function's own Pending
    pub(crate) fn lower_await(&mut self, inner: &tml_ast::Expr) -> CgResult<Value> {
        let value = self.lower_expr(inner)?;
        let Type::Named {
            name, type_args, ..
        } = value.ty.clone()
        else {
            return Err(CodegenError::internal(
                format!("await applied to non-Poll type `{}`", value.ty),
                self.current_span,
            ));
        };
        if name != "Poll" || type_args.len() != 1 {
            return Err(CodegenError::internal(
                format!("await applied to non-Poll type `{}`", value.ty),
                self.current_span,
            ));
        }
        if !self.current_is_async {
            return Err(CodegenError::internal(
                "await outside of an async function; use block_on at the driver",
                self.current_span,
            ));
        }
        let output_ty = type_args.first().cloned().unwrap_or(Type::Unit);

        let (_, poll_llvm) = self.enum_parts(&value.ty)?;
        let slot = self.spill_to_slot(&value)?;
        let tag = self.load_enum_tag(&slot, &poll_llvm)?;

        let ready_label = self.fresh_label("await.ready");
        let pending_label = self.fresh_label("await.pending");
        let is_ready = self.fresh_tmp();
        self.emit_line(format!("{} = icmp eq i32 {}, 0", is_ready, tag));
        self.emit_terminator(format!(
            "br i1 {}, label %{}, label %{}",
            is_ready, ready_label, pending_label
        ));

        self.emit_label(&pending_label);
        let own_poll = self.current_poll_type.clone().ok_or_else(|| {
            CodegenError::internal("async context lost", self.current_span)
        })?;
        let pending = self.construct_enum_value(&own_poll, "Pending", &[])?;
        let own_llvm = self.llvm_type(&own_poll)?;
        self.emit_drops_for_scopes(0)?;
        self.emit_terminator(format!("ret {} {}", own_llvm, pending.repr));

        self.emit_label(&ready_label);
        self.read_enum_payload_field(&slot, &poll_llvm, &[output_ty], 0)
    }

    /// block_on(poll): the driver-side unwrap. Ready yields the payload;
    /// Pending has no caller to propagate to and panics.
    pub(crate) fn lower_block_on(&mut self, value: Value) -> CgResult<Value> {
        let Type::Named {
            name, type_args, ..
        } = value.ty.clone()
        else {
            return Err(CodegenError::internal(
                format!("block_on applied to non-Poll type `{}`", value.ty),
                self.current_span,
            ));
        };
        if name != "Poll" || type_args.len() != 1 {
            return Err(CodegenError::internal(
                format!("block_on applied to non-Poll type `{}`", value.ty),
                self.current_span,
            ));
        }
        let output_ty = type_args.first().cloned().unwrap_or(Type::Unit);

        let (_, poll_llvm) = self.enum_parts(&value.ty)?;
        let slot = self.spill_to_slot(&value)?;
        let tag = self.load_enum_tag(&slot, &poll_llvm)?;

        let ready_label = self.fresh_label("block_on.ready");
        let pending_label = self.fresh_label("block_on.pending");
        let is_ready = self.fresh_tmp();
        self.emit_line(format!("{} = icmp eq i32 {}, 0", is_ready, tag));
        self.emit_terminator(format!(
            "br i1 {}, label %{}, label %{}",
            is_ready, ready_label, pending_label
        ));

        self.emit_label(&pending_label);
        self.ensure_runtime_declared("tml_panic", "declare void @tml_panic(ptr)")?;
        let message = self.string_global("block_on: future is Pending")?;
        self.emit_line(format!("call void @tml_panic(ptr {})", message));
        self.emit_terminator("unreachable");

        self.emit_label(&ready_label);
        self.read_enum_payload_field(&slot, &poll_llvm, &[output_ty], 0)
    }
}
