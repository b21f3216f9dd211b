// Binary and unary operator lowering
// Dispatch on the primitive kind: signed vs unsigned integer, float

use tml_ast::{BinaryOp, Expr, Type, UnaryOp};

use super::super::errors::{CgResult, CodegenError};
use super::super::{LlvmIrGen, Value};

impl LlvmIrGen {
    pub(crate) fn lower_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CgResult<Value> {
        // Boolean connectives short-circuit through blocks
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            return self.lower_short_circuit(op, lhs, rhs);
        }

        let lhs = self.lower_expr(lhs)?;
        let rhs = self.lower_expr(rhs)?;
        let rhs = self.coerce_value(rhs, &lhs.ty)?;
        let ty = lhs.ty.clone();

        // String equality routes through the runtime
        if ty == Type::Str && matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            self.ensure_runtime_declared("tml_str_eq", "declare i1 @tml_str_eq(ptr, ptr)")?;
            let eq = self.fresh_tmp();
            self.emit_line(format!(
                "{} = call i1 @tml_str_eq(ptr {}, ptr {})",
                eq, lhs.repr, rhs.repr
            ));
            if matches!(op, BinaryOp::Eq) {
                return Ok(Value::new(eq, Type::Bool));
            }
            let inverted = self.fresh_tmp();
            self.emit_line(format!("{} = xor i1 {}, true", inverted, eq));
            return Ok(Value::new(inverted, Type::Bool));
        }

        let llvm = self.llvm_type(&ty)?;
        let signed = ty.is_signed_integer();
        let float = ty.is_float();

        let (instr, result_ty) = match op {
            BinaryOp::Add => (if float { "fadd" } else { "add" }.to_string(), ty.clone()),
            BinaryOp::Sub => (if float { "fsub" } else { "sub" }.to_string(), ty.clone()),
            BinaryOp::Mul => (if float { "fmul" } else { "mul" }.to_string(), ty.clone()),
            BinaryOp::Div => (
                if float {
                    "fdiv"
                } else if signed {
                    "sdiv"
                } else {
                    "udiv"
                }
                .to_string(),
                ty.clone(),
            ),
            BinaryOp::Rem => (
                if float {
                    "frem"
                } else if signed {
                    "srem"
                } else {
                    "urem"
                }
                .to_string(),
                ty.clone(),
            ),
            BinaryOp::BitAnd => ("and".to_string(), ty.clone()),
            BinaryOp::BitOr => ("or".to_string(), ty.clone()),
            BinaryOp::BitXor => ("xor".to_string(), ty.clone()),
            BinaryOp::Shl => ("shl".to_string(), ty.clone()),
            BinaryOp::Shr => (
                if signed { "ashr" } else { "lshr" }.to_string(),
                ty.clone(),
            ),
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt
            | BinaryOp::Ge => {
                let pred = comparison_predicate(op, signed, float, &ty)?;
                let instr = if float { "fcmp" } else { "icmp" };
                let tmp = self.fresh_tmp();
                self.emit_line(format!(
                    "{} = {} {} {} {}, {}",
                    tmp, instr, pred, llvm, lhs.repr, rhs.repr
                ));
                return Ok(Value::new(tmp, Type::Bool));
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        };

        let tmp = self.fresh_tmp();
        self.emit_line(format!(
            "{} = {} {} {}, {}",
            tmp, instr, llvm, lhs.repr, rhs.repr
        ));
        Ok(Value::new(tmp, result_ty))
    }

    fn lower_short_circuit(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> CgResult<Value> {
        let slot = self.entry_alloca("sc", "i1");
        let lhs = self.lower_expr(lhs)?;
        self.emit_line(format!("store i1 {}, ptr {}", lhs.repr, slot));

        let rhs_label = self.fresh_label("sc.rhs");
        let end_label = self.fresh_label("sc.end");
        match op {
            BinaryOp::And => self.emit_terminator(format!(
                "br i1 {}, label %{}, label %{}",
                lhs.repr, rhs_label, end_label
            )),
            _ => self.emit_terminator(format!(
                "br i1 {}, label %{}, label %{}",
                lhs.repr, end_label, rhs_label
            )),
        }

        self.emit_label(&rhs_label);
        let rhs = self.lower_expr(rhs)?;
        self.emit_line(format!("store i1 {}, ptr {}", rhs.repr, slot));
        self.emit_terminator(format!("br label %{}", end_label));

        self.emit_label(&end_label);
        let result = self.fresh_tmp();
        self.emit_line(format!("{} = load i1, ptr {}", result, slot));
        Ok(Value::new(result, Type::Bool))
    }

    pub(crate) fn lower_unary(&mut self, op: UnaryOp, operand: &Expr) -> CgResult<Value> {
        let value = self.lower_expr(operand)?;
        let llvm = self.llvm_type(&value.ty)?;
        let tmp = self.fresh_tmp();
        match op {
            UnaryOp::Neg if value.ty.is_float() => {
                self.emit_line(format!("{} = fneg {} {}", tmp, llvm, value.repr));
            }
            UnaryOp::Neg => {
                self.emit_line(format!("{} = sub {} 0, {}", tmp, llvm, value.repr));
            }
            UnaryOp::Not if value.ty == Type::Bool => {
                self.emit_line(format!("{} = xor i1 {}, true", tmp, value.repr));
            }
            UnaryOp::Not => {
                // Bitwise complement on integers
                self.emit_line(format!("{} = xor {} {}, -1", tmp, llvm, value.repr));
            }
        }
        Ok(Value::new(tmp, value.ty))
    }
}

fn comparison_predicate(
    op: BinaryOp,
    signed: bool,
    float: bool,
    ty: &Type,
) -> Result<&'static str, CodegenError> {
    if float {
        return Ok(match op {
            BinaryOp::Eq => "oeq",
            BinaryOp::Ne => "one",
            BinaryOp::Lt => "olt",
            BinaryOp::Le => "ole",
            BinaryOp::Gt => "ogt",
            BinaryOp::Ge => "oge",
            _ => unreachable!(),
        });
    }
    // Bool, Char, pointers and unsigned integers compare unsigned
    let unsigned_cmp = !signed || matches!(ty, Type::Bool | Type::Char);
    Ok(match op {
        BinaryOp::Eq => "eq",
        BinaryOp::Ne => "ne",
        BinaryOp::Lt if unsigned_cmp => "ult",
        BinaryOp::Lt => "slt",
        BinaryOp::Le if unsigned_cmp => "ule",
        BinaryOp::Le => "sle",
        BinaryOp::Gt if unsigned_cmp => "ugt",
        BinaryOp::Gt => "sgt",
        BinaryOp::Ge if unsigned_cmp => "uge",
        BinaryOp::Ge => "sge",
        _ => unreachable!(),
    })
}
