// Conditional lowering
// `if` is an expression; both arms merge through a result slot

use tml_ast::{Block, Expr, Type};

use super::super::errors::CgResult;
use super::super::{LlvmIrGen, Value};

impl LlvmIrGen {
    pub(crate) fn lower_if(
        &mut self,
        cond: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> CgResult<Option<Value>> {
        let cond_value = self.lower_expr(cond)?;
        let then_label = self.fresh_label("if.then");
        let end_label = self.fresh_label("if.end");
        let else_label = if else_block.is_some() {
            self.fresh_label("if.else")
        } else {
            end_label.clone()
        };

        self.emit_terminator(format!(
            "br i1 {}, label %{}, label %{}",
            cond_value.repr, then_label, else_label
        ));

        let mut result: Option<(String, Type)> = None;

        self.emit_label(&then_label);
        let then_tail = self.lower_block_scoped(then_block)?;
        if !self.terminated {
            if let Some(tail) = then_tail {
                if !matches!(tail.ty, Type::Unit | Type::Never) {
                    let llvm = self.llvm_type(&tail.ty)?;
                    let slot = self.entry_alloca("if.result", &llvm);
                    result = Some((slot.clone(), tail.ty.clone()));
                    self.store_to(&slot, &tail)?;
                }
            }
            self.emit_terminator(format!("br label %{}", end_label));
        }

        if let Some(else_block) = else_block {
            self.emit_label(&else_label);
            let else_tail = self.lower_block_scoped(else_block)?;
            if !self.terminated {
                if let Some(tail) = else_tail {
                    if !matches!(tail.ty, Type::Unit | Type::Never) {
                        let (slot, ty) = match &result {
                            Some(pair) => pair.clone(),
                            None => {
                                let llvm = self.llvm_type(&tail.ty)?;
                                let slot = self.entry_alloca("if.result", &llvm);
                                result = Some((slot.clone(), tail.ty.clone()));
                                (slot, tail.ty.clone())
                            }
                        };
                        let coerced = self.coerce_value(tail, &ty)?;
                        self.store_to(&slot, &coerced)?;
                    }
                }
                self.emit_terminator(format!("br label %{}", end_label));
            }
        }

        self.emit_label(&end_label);
        match result {
            Some((slot, ty)) => Ok(Some(self.load_from(&slot, &ty)?)),
            None => Ok(None),
        }
    }
}
