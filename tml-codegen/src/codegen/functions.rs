// Function definition emission
// Linkage, parameter marshalling, coverage hooks, terminator synthesis

use std::collections::HashMap;
use tml_ast::{FuncDecl, Type, Visibility};

use super::errors::{CgResult, CodegenError};
use super::{CurrentImpl, LlvmIrGen, LocalVar, Value};
use crate::behavior_bounds::build_where_constraints;

impl LlvmIrGen {
    /// Symbol for a user function. The C entry point keeps its name; every
    /// other function carries the tml_ prefix plus its mangled type args.
    /// Suite mode prepends s<index>_ to test-local symbols.
    pub(crate) fn function_symbol(
        &self,
        base: &str,
        type_args: &[Type],
        shared: bool,
    ) -> CgResult<String> {
        if base == "main" && type_args.is_empty() {
            return Ok("main".to_string());
        }
        let mangled = super::mangle::mangle(base, type_args)?;
        let symbol = format!("tml_{}", mangled);
        Ok(self.apply_suite_prefix(symbol, shared))
    }

    pub(crate) fn apply_suite_prefix(&self, symbol: String, shared: bool) -> String {
        match self.options.suite_test_index {
            Some(index) if !shared => format!("s{}_{}", index, symbol),
            _ => symbol,
        }
    }

    /// Linkage keywords for a definition, trailing space included.
    /// Suite mode forces internal except for @should_panic functions,
    /// which are reached through function pointers from the harness.
    pub(crate) fn linkage_for(&self, func: &FuncDecl, is_instantiation: bool, shared: bool) -> String {
        if self.options.force_internal_linkage && !func.should_panic() {
            return "internal ".to_string();
        }
        if is_instantiation {
            // Shared instantiations may be emitted by several objects;
            // linkonce_odr lets the linker merge them
            return "linkonce_odr ".to_string();
        }
        match func.visibility {
            Visibility::Public if self.options.dll_export => "dllexport ".to_string(),
            Visibility::Public => String::new(),
            Visibility::Private => "internal ".to_string(),
        }
    }

    /// Emit a non-generic, non-extern function declaration
    pub(crate) fn emit_function_decl(&mut self, func: &FuncDecl) -> CgResult<()> {
        if func.is_generic() {
            // Monomorphized on demand at first call
            return Ok(());
        }
        if func.is_extern() {
            return self.emit_extern_decl(func);
        }
        self.current_span = func.span;
        let shared = self.shared_defs.contains(&func.name);
        let symbol = self.function_symbol(&func.name, &[], shared)?;
        let linkage = self.linkage_for(func, false, shared);
        self.emit_function_body(func, &symbol, HashMap::new(), &linkage, None)
    }

    /// Emit one function body under a substitution map. Idempotent by
    /// symbol; nested instantiations triggered during lowering stack their
    /// own buffers and state.
    pub(crate) fn emit_function_body(
        &mut self,
        func: &FuncDecl,
        symbol: &str,
        subst: HashMap<String, Type>,
        linkage: &str,
        receiver: Option<CurrentImpl>,
    ) -> CgResult<()> {
        if !self.emitted_functions.insert(symbol.to_string()) {
            return Ok(());
        }
        let state = self.save_function_state();
        self.fn_stack.push(String::new());

        let result = self.emit_function_body_inner(func, symbol, subst, linkage, receiver);

        let mut buffer = self.fn_stack.pop().unwrap_or_default();
        // Splice the hoisted allocas into the entry block
        if !self.entry_allocas.is_empty() {
            let allocas: String = self.entry_allocas.concat();
            buffer = buffer.replacen("entry:\n", &format!("entry:\n{}", allocas), 1);
        }
        self.restore_function_state(state);
        match result {
            Ok(()) => {
                self.body.push_str(&buffer);
                self.body.push('\n');
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn emit_function_body_inner(
        &mut self,
        func: &FuncDecl,
        symbol: &str,
        subst: HashMap<String, Type>,
        linkage: &str,
        receiver: Option<CurrentImpl>,
    ) -> CgResult<()> {
        let body = func.body.as_ref().ok_or_else(|| {
            CodegenError::internal(
                format!("function `{}` has no body to emit", func.name),
                func.span,
            )
        })?;

        self.active_type_substitutions = subst;
        self.current_constraints =
            build_where_constraints(&func.type_params, &func.where_clause);
        self.current_impl = receiver;
        self.current_is_async = func.is_async;

        let declared_ret = func.return_type.clone().unwrap_or(Type::Unit);
        let src_ret = self.require_concrete(&declared_ret)?;
        self.current_return_type = src_ret.clone();

        let is_main = symbol == "main";
        let llvm_ret = if func.is_async {
            // The declared T becomes Poll[T] in the emitted signature
            let poll_ty = Type::generic("Poll", vec![src_ret.clone()]);
            let name = self.llvm_type(&poll_ty)?;
            self.current_poll_type = Some(poll_ty);
            name
        } else if is_main {
            "i32".to_string()
        } else {
            self.llvm_return_type(&src_ret)?
        };

        // Resolve parameter passing before writing the define line
        struct ParamSlot {
            name: String,
            llvm: String,
            ty: Type,
            by_pointer: bool,
            is_mut: bool,
        }
        let mut param_slots = Vec::with_capacity(func.params.len());
        for param in &func.params {
            let resolved = self.require_concrete(&param.ty)?;
            let by_pointer = if param.is_receiver() {
                // Primitive receivers: mut by pointer so mutation
                // propagates, immutable by value. Aggregates always by
                // pointer.
                !(resolved.is_primitive() && !param.is_mut)
            } else {
                false
            };
            let llvm = if by_pointer {
                "ptr".to_string()
            } else {
                self.llvm_type(&resolved)?
            };
            param_slots.push(ParamSlot {
                name: param.name.clone(),
                llvm,
                ty: resolved,
                by_pointer,
                is_mut: param.is_mut,
            });
        }

        let param_list = param_slots
            .iter()
            .map(|p| format!("{} %{}", p.llvm, p.name))
            .collect::<Vec<_>>()
            .join(", ");

        let dbg_attachment = self.debug_subprogram(symbol)?;
        {
            let line = format!(
                "define {}{} @{}({}){} {{",
                linkage, llvm_ret, symbol, param_list, dbg_attachment
            );
            let out = self.out();
            out.push_str(&line);
            out.push('\n');
        }
        self.emit_label("entry");

        self.emit_coverage_entry(symbol)?;

        // Parameter marshalling: one stack slot per parameter
        self.push_locals();
        self.push_drop_scope();
        for slot in &param_slots {
            let addr = self.entry_alloca(&slot.name, &slot.llvm.clone());
            self.emit_line(format!("store {} %{}, ptr {}", slot.llvm, slot.name, addr));
            let local_ty = if slot.by_pointer {
                Type::Ref {
                    is_mut: slot.is_mut,
                    inner: Box::new(slot.ty.clone()),
                }
            } else {
                slot.ty.clone()
            };
            self.emit_param_debug(&slot.name, &addr)?;
            self.define_local(
                &slot.name,
                LocalVar {
                    slot: addr,
                    ty: local_ty,
                    is_mut: slot.is_mut,
                },
            );
        }

        let tail = self.lower_block_contents(body)?;

        if !self.terminated {
            self.emit_drops_for_scopes(0)?;
            if func.is_async {
                let value = tail.unwrap_or_else(Value::unit);
                let wrapped = self.wrap_poll_ready(value)?;
                let ret_llvm = {
                    let poll_ty = self
                        .current_poll_type
                        .clone()
                        .ok_or_else(|| {
                            CodegenError::internal("async context lost", func.span)
                        })?;
                    self.llvm_type(&poll_ty)?
                };
                self.emit_terminator(format!("ret {} {}", ret_llvm, wrapped.repr));
            } else if is_main {
                match tail {
                    Some(v) if v.ty.is_integer() => {
                        let v = self.coerce_value(v, &Type::I32)?;
                        self.emit_terminator(format!("ret i32 {}", v.repr));
                    }
                    _ => self.emit_terminator("ret i32 0"),
                }
            } else if matches!(src_ret, Type::Unit | Type::Never) {
                self.emit_terminator("ret void");
            } else {
                match tail {
                    Some(v) => {
                        let v = self.coerce_value(v, &src_ret)?;
                        self.emit_terminator(format!("ret {} {}", llvm_ret, v.repr));
                    }
                    None => {
                        // Fell through without a value: synthesize the
                        // neutral terminator for the return type
                        let zero = zero_value(&llvm_ret);
                        self.emit_terminator(format!("ret {} {}", llvm_ret, zero));
                    }
                }
            }
        }

        self.pop_drop_scope_silent();
        self.pop_locals();
        let out = self.out();
        out.push_str("}\n");
        Ok(())
    }
}

/// Neutral constant for a ret of the given LLVM type
pub(crate) fn zero_value(llvm_ty: &str) -> &'static str {
    if llvm_ty == "ptr" {
        "null"
    } else if llvm_ty.starts_with('%') || llvm_ty.starts_with('{') || llvm_ty.starts_with('[') {
        "zeroinitializer"
    } else if llvm_ty == "float" || llvm_ty == "double" {
        "0.0"
    } else {
        "0"
    }
}
