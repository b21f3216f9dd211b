// Statement lowering
// Statements emit in source order; drops and loop exits happen at
// well-defined points

use tml_ast::{Block, Expr, Stmt, Type};

use super::errors::{CgResult, CodegenError};
use super::{LlvmIrGen, LocalVar, LoopContext, Value};

impl LlvmIrGen {
    /// Lower a block's statements and trailing expression without opening
    /// a new scope (function bodies own their top-level scope)
    pub(crate) fn lower_block_contents(&mut self, block: &Block) -> CgResult<Option<Value>> {
        for stmt in &block.stmts {
            if self.terminated {
                // Unreachable statements after return/break are dropped
                break;
            }
            self.lower_stmt(stmt)?;
        }
        if self.terminated {
            return Ok(None);
        }
        match &block.tail {
            Some(expr) => Ok(Some(self.lower_expr(expr)?)),
            None => Ok(None),
        }
    }

    /// Lower a nested block inside its own drop scope. Drops fire on the
    /// fall-through edge; early exits fired theirs already.
    pub(crate) fn lower_block_scoped(&mut self, block: &Block) -> CgResult<Option<Value>> {
        self.push_locals();
        self.push_drop_scope();
        let result = self.lower_block_contents(block);
        if result.is_ok() && !self.terminated {
            self.pop_drop_scope()?;
        } else {
            self.pop_drop_scope_silent();
        }
        self.pop_locals();
        result
    }

    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) -> CgResult<()> {
        match stmt {
            Stmt::Let {
                name,
                ty,
                is_mut,
                value,
            } => {
                let mut val = self.lower_expr(value)?;
                if let Some(declared) = ty {
                    let declared = self.require_concrete(declared)?;
                    val = self.coerce_value(val, &declared)?;
                }
                let llvm = self.llvm_type(&val.ty)?;
                let slot = self.entry_alloca(name, &llvm);
                self.store_to(&slot, &val)?;
                self.define_local(
                    name,
                    LocalVar {
                        slot: slot.clone(),
                        ty: val.ty.clone(),
                        is_mut: *is_mut,
                    },
                );
                self.register_drop_local(name, &slot, &val.ty);
                Ok(())
            }
            Stmt::Assign { target, value } => {
                let (ptr, ty) = self.lower_place(target)?;
                let val = self.lower_expr(value)?;
                let val = self.coerce_value(val, &ty)?;
                self.store_to(&ptr, &val)
            }
            Stmt::Expr(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
            Stmt::Return(expr) => self.lower_return(expr.as_ref()),
            Stmt::Break => {
                let ctx = self.loop_stack.last().cloned().ok_or_else(|| {
                    CodegenError::internal("break outside of a loop", self.current_span)
                })?;
                self.emit_drops_for_scopes(ctx.scope_depth)?;
                self.emit_terminator(format!("br label %{}", ctx.break_label));
                Ok(())
            }
            Stmt::Continue => {
                let ctx = self.loop_stack.last().cloned().ok_or_else(|| {
                    CodegenError::internal("continue outside of a loop", self.current_span)
                })?;
                self.emit_drops_for_scopes(ctx.scope_depth)?;
                self.emit_terminator(format!("br label %{}", ctx.continue_label));
                Ok(())
            }
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::Loop { body } => self.lower_loop(body),
            Stmt::For { var, iter, body } => self.lower_for(var, iter, body),
        }
    }

    fn lower_return(&mut self, expr: Option<&Expr>) -> CgResult<()> {
        let value = match expr {
            Some(expr) => Some(self.lower_expr(expr)?),
            None => None,
        };

        if self.current_is_async {
            // Async returns wrap in Poll.Ready before leaving the frame
            let inner = value.unwrap_or_else(Value::unit);
            let wrapped = self.wrap_poll_ready(inner)?;
            let poll_ty = self.current_poll_type.clone().ok_or_else(|| {
                CodegenError::internal("async context lost", self.current_span)
            })?;
            let llvm = self.llvm_type(&poll_ty)?;
            self.emit_drops_for_scopes(0)?;
            self.emit_terminator(format!("ret {} {}", llvm, wrapped.repr));
            return Ok(());
        }

        let ret_ty = self.current_return_type.clone();
        self.emit_drops_for_scopes(0)?;
        match (&ret_ty, value) {
            (Type::Unit | Type::Never, _) => self.emit_terminator("ret void"),
            (_, Some(v)) => {
                let v = self.coerce_value(v, &ret_ty)?;
                let llvm = self.llvm_type(&ret_ty)?;
                self.emit_terminator(format!("ret {} {}", llvm, v.repr));
            }
            (_, None) => {
                let llvm = self.llvm_type(&ret_ty)?;
                let zero = super::functions::zero_value(&llvm);
                self.emit_terminator(format!("ret {} {}", llvm, zero));
            }
        }
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &Block) -> CgResult<()> {
        let head = self.fresh_label("while.head");
        let body_label = self.fresh_label("while.body");
        let end = self.fresh_label("while.end");

        self.emit_terminator(format!("br label %{}", head));
        self.emit_label(&head);
        let cond_value = self.lower_expr(cond)?;
        self.emit_terminator(format!(
            "br i1 {}, label %{}, label %{}",
            cond_value.repr, body_label, end
        ));

        self.loop_stack.push(LoopContext {
            continue_label: head.clone(),
            break_label: end.clone(),
            scope_depth: self.scope_stack.len(),
        });
        self.emit_label(&body_label);
        self.lower_block_scoped(body)?;
        self.emit_terminator(format!("br label %{}", head));
        self.loop_stack.pop();

        self.emit_label(&end);
        Ok(())
    }

    fn lower_loop(&mut self, body: &Block) -> CgResult<()> {
        let head = self.fresh_label("loop.head");
        let end = self.fresh_label("loop.end");

        self.emit_terminator(format!("br label %{}", head));
        self.loop_stack.push(LoopContext {
            continue_label: head.clone(),
            break_label: end.clone(),
            scope_depth: self.scope_stack.len(),
        });
        self.emit_label(&head);
        self.lower_block_scoped(body)?;
        self.emit_terminator(format!("br label %{}", head));
        self.loop_stack.pop();

        self.emit_label(&end);
        Ok(())
    }

    /// `for x in iter` desugars through the Iterator behavior:
    /// call next(mut iter) each round and run the body while it yields
    /// Just(item)
    fn lower_for(&mut self, var: &str, iter: &Expr, body: &Block) -> CgResult<()> {
        let iter_value = self.lower_expr(iter)?;
        let iter_slot = self.spill_to_slot(&iter_value)?;

        let next = self.require_method_instantiation(&iter_value.ty, "next", &[], &[])?;
        let maybe_ty = next.return_type.clone();
        let item_ty = match &maybe_ty {
            Type::Named {
                name, type_args, ..
            } if name == "Maybe" && type_args.len() == 1 => type_args
                .first()
                .cloned()
                .unwrap_or(Type::Unit),
            other => {
                return Err(CodegenError::internal(
                    format!(
                        "Iterator next() must return Maybe[Item], found `{}`",
                        other
                    ),
                    self.current_span,
                ))
            }
        };
        let (_, maybe_llvm) = self.enum_parts(&maybe_ty)?;

        let head = self.fresh_label("for.head");
        let body_label = self.fresh_label("for.body");
        let end = self.fresh_label("for.end");

        self.emit_terminator(format!("br label %{}", head));
        self.emit_label(&head);
        let next_value = self.fresh_tmp();
        self.emit_line(format!(
            "{} = call {} @{}(ptr {})",
            next_value, maybe_llvm, next.symbol, iter_slot
        ));
        let maybe_value = Value::new(next_value, maybe_ty.clone());
        let maybe_slot = self.spill_to_slot(&maybe_value)?;
        let tag = self.load_enum_tag(&maybe_slot, &maybe_llvm)?;
        let is_just = self.fresh_tmp();
        self.emit_line(format!("{} = icmp eq i32 {}, 0", is_just, tag));
        self.emit_terminator(format!(
            "br i1 {}, label %{}, label %{}",
            is_just, body_label, end
        ));

        self.loop_stack.push(LoopContext {
            continue_label: head.clone(),
            break_label: end.clone(),
            scope_depth: self.scope_stack.len(),
        });
        self.emit_label(&body_label);
        self.push_locals();
        self.push_drop_scope();

        let maybe_mangled = self.enum_parts(&maybe_ty)?.0;
        let layout = self.enum_layout(&maybe_mangled)?.clone();
        let just_fields = layout
            .variants
            .first()
            .map(|(_, fields)| fields.clone())
            .unwrap_or_default();
        let item = self.read_enum_payload_field(&maybe_slot, &maybe_llvm, &just_fields, 0)?;
        let item_llvm = self.llvm_type(&item_ty)?;
        let item_slot = self.entry_alloca(var, &item_llvm);
        self.store_to(&item_slot, &item)?;
        self.define_local(
            var,
            LocalVar {
                slot: item_slot,
                ty: item_ty,
                is_mut: false,
            },
        );

        self.lower_block_contents(body)?;
        if !self.terminated {
            self.emit_scope_drops()?;
            self.emit_terminator(format!("br label %{}", head));
        }
        self.pop_drop_scope_silent();
        self.pop_locals();
        self.loop_stack.pop();

        self.emit_label(&end);
        Ok(())
    }
}
