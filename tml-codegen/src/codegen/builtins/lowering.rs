// Builtin call lowering
// Three strategies: tml_* runtime externs (I/O, strings, spinlocks),
// LLVM intrinsics (math, memcpy family), and real instructions
// (atomics, fences, conversions)

use tml_ast::Type;

use super::super::errors::{CgResult, CodegenError};
use super::super::{LlvmIrGen, Value};

impl LlvmIrGen {
    pub(crate) fn lower_builtin_call(
        &mut self,
        name: &str,
        args: Vec<Value>,
    ) -> CgResult<Value> {
        let arg_types: Vec<Type> = args.iter().map(|v| v.ty.clone()).collect();
        let sig = self
            .builtins
            .resolve(name, &arg_types)
            .cloned()
            .ok_or_else(|| {
                CodegenError::unknown_symbol(
                    format!(
                        "no overload of builtin `{}` accepts ({})",
                        name,
                        arg_types
                            .iter()
                            .map(Type::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    self.current_span,
                )
            })?;

        // block_on keeps its structural Poll type; everything else
        // coerces to the picked overload
        let args: Vec<Value> = if name == "block_on" {
            args
        } else {
            args.into_iter()
                .zip(sig.params.iter())
                .map(|(v, p)| self.coerce_value(v, p))
                .collect::<CgResult<_>>()?
        };

        match name {
            "block_on" => {
                let value = args.into_iter().next().ok_or_else(|| {
                    CodegenError::internal("block_on takes one argument", self.current_span)
                })?;
                self.lower_block_on(value)
            }

            "print" | "println" | "panic" | "assert" => {
                let symbol = format!("tml_{}", name);
                let (ret, decl_ret) = if name == "panic" {
                    (Type::Never, "void")
                } else {
                    (Type::Unit, "void")
                };
                let param = if name == "assert" { "i1" } else { "ptr" };
                self.ensure_runtime_declared(
                    &symbol,
                    &format!("declare {} @{}({})", decl_ret, symbol, param),
                )?;
                self.emit_call(&format!("@{}", symbol), &args, &ret)
            }

            "assert_eq" | "assert_ne" => {
                let suffix = runtime_type_suffix(&sig.params[0]);
                let symbol = format!("tml_{}_{}", name, suffix);
                let llvm = self.llvm_type(&sig.params[0])?;
                self.ensure_runtime_declared(
                    &symbol,
                    &format!("declare void @{}({}, {})", symbol, llvm, llvm),
                )?;
                self.emit_call(&format!("@{}", symbol), &args, &Type::Unit)
            }

            // Char conversions are bit-identical; only the type changes
            "char_code" => one_arg(args, |v| Value::new(v.repr, Type::I32), self.current_span),
            "char_from_code" => {
                one_arg(args, |v| Value::new(v.repr, Type::Char), self.current_span)
            }

            "int_to_float" => {
                let v = args.into_iter().next().ok_or_else(|| {
                    CodegenError::internal("int_to_float takes one argument", self.current_span)
                })?;
                let tmp = self.fresh_tmp();
                self.emit_line(format!("{} = sitofp i64 {} to double", tmp, v.repr));
                Ok(Value::new(tmp, Type::F64))
            }
            "float_to_int" => {
                let v = args.into_iter().next().ok_or_else(|| {
                    CodegenError::internal("float_to_int takes one argument", self.current_span)
                })?;
                let tmp = self.fresh_tmp();
                self.emit_line(format!("{} = fptosi double {} to i64", tmp, v.repr));
                Ok(Value::new(tmp, Type::I64))
            }

            "sqrt" | "pow" | "floor" | "ceil" | "round" => {
                let intrinsic = format!("llvm.{}.f64", name);
                let params = if name == "pow" {
                    "double, double"
                } else {
                    "double"
                };
                self.ensure_runtime_declared(
                    &intrinsic,
                    &format!("declare double @{}({})", intrinsic, params),
                )?;
                self.emit_call(&format!("@{}", intrinsic), &args, &Type::F64)
            }
            "abs" => {
                if sig.params[0].is_float() {
                    self.ensure_runtime_declared(
                        "llvm.fabs.f64",
                        "declare double @llvm.fabs.f64(double)",
                    )?;
                    self.emit_call("@llvm.fabs.f64", &args, &Type::F64)
                } else {
                    self.ensure_runtime_declared(
                        "llvm.abs.i64",
                        "declare i64 @llvm.abs.i64(i64, i1)",
                    )?;
                    let v = args.into_iter().next().ok_or_else(|| {
                        CodegenError::internal("abs takes one argument", self.current_span)
                    })?;
                    let tmp = self.fresh_tmp();
                    self.emit_line(format!(
                        "{} = call i64 @llvm.abs.i64(i64 {}, i1 false)",
                        tmp, v.repr
                    ));
                    Ok(Value::new(tmp, Type::I64))
                }
            }
            "black_box" => {
                let suffix = runtime_type_suffix(&sig.params[0]);
                let symbol = format!("tml_black_box_{}", suffix);
                let llvm = self.llvm_type(&sig.params[0])?;
                self.ensure_runtime_declared(
                    &symbol,
                    &format!("declare {} @{}({})", llvm, symbol, llvm),
                )?;
                self.emit_call(&format!("@{}", symbol), &args, &sig.ret)
            }

            "mem_alloc" => {
                self.ensure_runtime_declared("malloc", "declare ptr @malloc(i64)")?;
                self.emit_call("@malloc", &args, &sig.ret)
            }
            "mem_alloc_zeroed" => {
                self.ensure_runtime_declared("calloc", "declare ptr @calloc(i64, i64)")?;
                let n = args.into_iter().next().ok_or_else(|| {
                    CodegenError::internal("mem_alloc_zeroed takes one argument", self.current_span)
                })?;
                let tmp = self.fresh_tmp();
                self.emit_line(format!(
                    "{} = call ptr @calloc(i64 {}, i64 1)",
                    tmp, n.repr
                ));
                Ok(Value::new(tmp, sig.ret.clone()))
            }
            "mem_realloc" => {
                self.ensure_runtime_declared("realloc", "declare ptr @realloc(ptr, i64)")?;
                self.emit_call("@realloc", &args, &sig.ret)
            }
            "mem_free" => {
                self.ensure_runtime_declared("free", "declare void @free(ptr)")?;
                self.emit_call("@free", &args, &Type::Unit)
            }
            "mem_copy" | "mem_move" => {
                let intrinsic = if name == "mem_copy" {
                    "llvm.memcpy.p0.p0.i64"
                } else {
                    "llvm.memmove.p0.p0.i64"
                };
                self.ensure_runtime_declared(
                    intrinsic,
                    &format!("declare void @{}(ptr, ptr, i64, i1)", intrinsic),
                )?;
                let [dst, src, len] = three_args(args, self.current_span)?;
                self.emit_line(format!(
                    "call void @{}(ptr {}, ptr {}, i64 {}, i1 false)",
                    intrinsic, dst.repr, src.repr, len.repr
                ));
                Ok(Value::unit())
            }
            "mem_set" => {
                self.ensure_runtime_declared(
                    "llvm.memset.p0.i64",
                    "declare void @llvm.memset.p0.i64(ptr, i8, i64, i1)",
                )?;
                let [dst, byte, len] = three_args(args, self.current_span)?;
                self.emit_line(format!(
                    "call void @llvm.memset.p0.i64(ptr {}, i8 {}, i64 {}, i1 false)",
                    dst.repr, byte.repr, len.repr
                ));
                Ok(Value::unit())
            }
            "mem_zero" => {
                self.ensure_runtime_declared(
                    "llvm.memset.p0.i64",
                    "declare void @llvm.memset.p0.i64(ptr, i8, i64, i1)",
                )?;
                let mut it = args.into_iter();
                let (dst, len) = match (it.next(), it.next()) {
                    (Some(d), Some(l)) => (d, l),
                    _ => {
                        return Err(CodegenError::internal(
                            "mem_zero takes two arguments",
                            self.current_span,
                        ))
                    }
                };
                self.emit_line(format!(
                    "call void @llvm.memset.p0.i64(ptr {}, i8 0, i64 {}, i1 false)",
                    dst.repr, len.repr
                ));
                Ok(Value::unit())
            }
            "mem_compare" => {
                self.ensure_runtime_declared("memcmp", "declare i32 @memcmp(ptr, ptr, i64)")?;
                self.emit_call("@memcmp", &args, &Type::I32)
            }
            "mem_eq" => {
                self.ensure_runtime_declared("memcmp", "declare i32 @memcmp(ptr, ptr, i64)")?;
                let cmp = self.emit_call("@memcmp", &args, &Type::I32)?;
                let tmp = self.fresh_tmp();
                self.emit_line(format!("{} = icmp eq i32 {}, 0", tmp, cmp.repr));
                Ok(Value::new(tmp, Type::Bool))
            }

            "atomic_load" => {
                let ptr = args.into_iter().next().ok_or_else(|| {
                    CodegenError::internal("atomic_load takes one argument", self.current_span)
                })?;
                let tmp = self.fresh_tmp();
                self.emit_line(format!(
                    "{} = load atomic i64, ptr {} seq_cst, align 8",
                    tmp, ptr.repr
                ));
                Ok(Value::new(tmp, Type::I64))
            }
            "atomic_store" => {
                let mut it = args.into_iter();
                let (ptr, value) = match (it.next(), it.next()) {
                    (Some(p), Some(v)) => (p, v),
                    _ => {
                        return Err(CodegenError::internal(
                            "atomic_store takes two arguments",
                            self.current_span,
                        ))
                    }
                };
                self.emit_line(format!(
                    "store atomic i64 {}, ptr {} seq_cst, align 8",
                    value.repr, ptr.repr
                ));
                Ok(Value::unit())
            }
            "atomic_add" | "atomic_sub" | "atomic_exchange" | "atomic_and" | "atomic_or"
            | "atomic_xor" => {
                let op = match name {
                    "atomic_add" => "add",
                    "atomic_sub" => "sub",
                    "atomic_exchange" => "xchg",
                    "atomic_and" => "and",
                    "atomic_or" => "or",
                    _ => "xor",
                };
                let mut it = args.into_iter();
                let (ptr, value) = match (it.next(), it.next()) {
                    (Some(p), Some(v)) => (p, v),
                    _ => {
                        return Err(CodegenError::internal(
                            format!("{} takes two arguments", name),
                            self.current_span,
                        ))
                    }
                };
                let tmp = self.fresh_tmp();
                self.emit_line(format!(
                    "{} = atomicrmw {} ptr {}, i64 {} seq_cst",
                    tmp, op, ptr.repr, value.repr
                ));
                Ok(Value::new(tmp, Type::I64))
            }
            "atomic_cas" | "atomic_cas_val" => {
                let [ptr, expected, new] = three_args(args, self.current_span)?;
                let pair = self.fresh_tmp();
                self.emit_line(format!(
                    "{} = cmpxchg ptr {}, i64 {}, i64 {} seq_cst seq_cst",
                    pair, ptr.repr, expected.repr, new.repr
                ));
                let tmp = self.fresh_tmp();
                if name == "atomic_cas" {
                    self.emit_line(format!(
                        "{} = extractvalue {{ i64, i1 }} {}, 1",
                        tmp, pair
                    ));
                    Ok(Value::new(tmp, Type::Bool))
                } else {
                    self.emit_line(format!(
                        "{} = extractvalue {{ i64, i1 }} {}, 0",
                        tmp, pair
                    ));
                    Ok(Value::new(tmp, Type::I64))
                }
            }
            "fence" => {
                self.emit_line("fence seq_cst");
                Ok(Value::unit())
            }
            "fence_acquire" => {
                self.emit_line("fence acquire");
                Ok(Value::unit())
            }
            "fence_release" => {
                self.emit_line("fence release");
                Ok(Value::unit())
            }

            // Everything else is a straight runtime extern call with the
            // tml_ prefix: strings, chars, StringBuilder, spinlocks
            _ => {
                let symbol = format!("tml_{}", name);
                let mut params = Vec::with_capacity(sig.params.len());
                for p in &sig.params {
                    params.push(self.llvm_type(p)?);
                }
                let ret = self.llvm_return_type(&sig.ret)?;
                self.ensure_runtime_declared(
                    &symbol,
                    &format!("declare {} @{}({})", ret, symbol, params.join(", ")),
                )?;
                self.emit_call(&format!("@{}", symbol), &args, &sig.ret)
            }
        }
    }
}

fn runtime_type_suffix(ty: &Type) -> &'static str {
    match ty {
        Type::Str => "str",
        Type::Bool => "i1",
        Type::Char => "char",
        Type::F64 => "f64",
        Type::F32 => "f32",
        Type::I8 | Type::U8 => "i8",
        Type::I16 | Type::U16 => "i16",
        Type::I32 | Type::U32 => "i32",
        Type::I128 | Type::U128 => "i128",
        _ => "i64",
    }
}

fn one_arg(
    args: Vec<Value>,
    f: impl FnOnce(Value) -> Value,
    span: tml_ast::SourceSpan,
) -> CgResult<Value> {
    args.into_iter()
        .next()
        .map(f)
        .ok_or_else(|| CodegenError::internal("builtin takes one argument", span))
}

fn three_args(args: Vec<Value>, span: tml_ast::SourceSpan) -> CgResult<[Value; 3]> {
    let mut it = args.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(a), Some(b), Some(c)) => Ok([a, b, c]),
        _ => Err(CodegenError::internal("builtin takes three arguments", span)),
    }
}
