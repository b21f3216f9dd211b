// Modular LLVM IR generator for TML
// One state struct; per-concern impl blocks live in the submodules

// Compiler limits
pub(crate) const MAX_GENERIC_DEPTH: usize = 64; // Maximum nesting depth for generic types
pub(crate) const MAX_ENUM_PAYLOAD: usize = 64 * 1024; // Enum payload cap in bytes

use std::collections::{HashMap, HashSet};
use tml_ast::*;

use crate::behavior_bounds::{BehaviorBoundsChecker, WhereConstraint};
use crate::types::interner::TypeInterner;

mod asynchronous; // Poll wrapping, await, block_on
pub mod builtins; // Builtin function registry and lowering
pub mod coverage; // Coverage instrumentation and FNV hashing
mod drop_behavior; // Drop behavior automatic cleanup (RAII)
mod enums; // Enum declaration lowering
pub mod errors;
mod expressions;
mod ffi; // Extern declarations and calling conventions
mod functions;
pub mod generics;
pub mod layout; // Size and alignment of semantic types
pub mod mangle; // Mangled names
mod metadata; // Debug info metadata
mod methods;
pub mod program; // Per-module driver and buffer assembly
pub mod registry; // Declaration intake
mod scope_management; // Drop scope stack
mod statements;
mod structs; // Struct declaration lowering
mod type_emitter; // Type definition buffer

pub use builtins::BuiltinRegistry;
use errors::{CgResult, CodegenError};

/// Option flags recognized by the emitter
#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Emit calls to tml_cover_func(name) at function entry
    pub coverage_enabled: bool,
    /// Emit llvm.instrprof.increment with a per-function FNV-1a hash
    pub llvm_source_coverage: bool,
    /// Suite mode: all user functions become internal
    pub force_internal_linkage: bool,
    /// Test-local functions get the prefix s<index>_
    pub suite_test_index: Option<u32>,
    /// Public functions additionally marked as exported symbols
    pub dll_export: bool,
    /// 0 = none, 1 = function scopes, 2 = also parameter debug info
    pub emit_debug_info: u8,
}

/// An SSA value paired with its semantic type
#[derive(Debug, Clone)]
pub(crate) struct Value {
    pub repr: String,
    pub ty: Type,
}

impl Value {
    pub fn new(repr: impl Into<String>, ty: Type) -> Self {
        Self {
            repr: repr.into(),
            ty,
        }
    }

    pub fn unit() -> Self {
        Self {
            repr: "zeroinitializer".to_string(),
            ty: Type::Unit,
        }
    }
}

/// A named local: stack slot plus semantic type
#[derive(Debug, Clone)]
pub(crate) struct LocalVar {
    pub slot: String,
    pub ty: Type,
    pub is_mut: bool,
}

/// Entry in the generic instantiation table. Pre-inserted with
/// `generated = false` so recursive references terminate.
#[derive(Debug, Clone)]
pub(crate) struct InstEntry {
    pub base: String,
    pub type_args: Vec<Type>,
    pub generated: bool,
}

/// Signature of an emitted extern declaration, kept for conflict checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExternSig {
    pub callconv: String,
    pub ret: String,
    pub params: Vec<String>,
}

/// One impl block registered against a target type
#[derive(Debug, Clone)]
pub(crate) struct ImplEntry {
    pub behavior: Option<String>,
    pub type_params: Vec<TypeParam>,
    pub target: Type,
    pub methods: Vec<FuncDecl>,
    /// Registered from a library module; instantiations are shared
    pub shared: bool,
}

/// Resolved layout of one enum instantiation
#[derive(Debug, Clone)]
pub(crate) struct EnumLayout {
    pub simple: bool,
    pub payload_words: usize,
    /// (variant name, resolved payload field types) in tag order
    pub variants: Vec<(String, Vec<Type>)>,
}

/// Method emission context: receiver type and the behavior being implemented
#[derive(Debug, Clone)]
pub(crate) struct CurrentImpl {
    pub receiver: Type,
    pub behavior: Option<String>,
}

/// Break/continue targets plus the drop-scope depth at loop entry
#[derive(Debug, Clone)]
pub(crate) struct LoopContext {
    pub continue_label: String,
    pub break_label: String,
    pub scope_depth: usize,
}

/// Saved per-function state, restored after nested instantiation
pub(crate) struct FunctionState {
    locals: Vec<HashMap<String, LocalVar>>,
    entry_allocas: Vec<String>,
    scope_stack: Vec<Vec<(String, String, Type)>>,
    tmp_counter: usize,
    label_counter: usize,
    slot_counter: usize,
    active_type_substitutions: HashMap<String, Type>,
    current_constraints: Vec<WhereConstraint>,
    current_return_type: Type,
    current_is_async: bool,
    current_poll_type: Option<Type>,
    current_impl: Option<CurrentImpl>,
    loop_stack: Vec<LoopContext>,
    terminated: bool,
    current_subprogram: Option<usize>,
}

pub struct LlvmIrGen {
    pub(crate) options: CodegenOptions,
    pub(crate) module_name: String,
    pub(crate) source_file: String,

    // Output buffers; final order is header, type_defs, globals,
    // coverage metadata, body, declares, debug metadata
    pub(crate) type_defs: String,
    pub(crate) globals: String,
    pub(crate) coverage_meta: String,
    pub(crate) body: String,
    pub(crate) declares: String,
    pub(crate) fn_stack: Vec<String>,

    // Declaration registries (AST templates, generic or not)
    pub(crate) struct_ast_defs: HashMap<String, StructDef>,
    pub(crate) enum_ast_defs: HashMap<String, EnumDef>,
    pub(crate) behavior_defs: HashMap<String, BehaviorDef>,
    pub(crate) function_defs: HashMap<String, FuncDecl>,
    pub(crate) impls: HashMap<String, Vec<ImplEntry>>,
    pub(crate) bounds: BehaviorBoundsChecker,
    /// Declarations registered from library modules: their instantiations
    /// are shared across suites (linkonce_odr, no suite prefix)
    pub(crate) shared_defs: HashSet<String>,

    // Instantiation and emission state
    pub(crate) generic_instantiations: HashMap<String, InstEntry>,
    pub(crate) emitted_types: HashSet<String>,
    pub(crate) struct_field_defs: HashMap<String, Vec<Field>>,
    pub(crate) enum_layouts: HashMap<String, EnumLayout>,
    pub(crate) emitted_functions: HashSet<String>,
    pub(crate) declared_externs: HashMap<String, ExternSig>,
    pub(crate) extern_symbols: HashMap<String, String>,
    pub(crate) declared_intrinsics: HashSet<String>,
    pub(crate) link_libs: Vec<String>,

    // Interned string literals
    pub(crate) string_constants: HashMap<String, String>,
    pub(crate) string_counter: usize,

    // Function-local emission state
    pub(crate) locals: Vec<HashMap<String, LocalVar>>,
    pub(crate) entry_allocas: Vec<String>,
    pub(crate) scope_stack: Vec<Vec<(String, String, Type)>>,
    pub(crate) tmp_counter: usize,
    pub(crate) label_counter: usize,
    pub(crate) slot_counter: usize,
    pub(crate) active_type_substitutions: HashMap<String, Type>,
    pub(crate) current_constraints: Vec<WhereConstraint>,
    pub(crate) current_return_type: Type,
    pub(crate) current_is_async: bool,
    pub(crate) current_poll_type: Option<Type>,
    pub(crate) current_impl: Option<CurrentImpl>,
    pub(crate) loop_stack: Vec<LoopContext>,
    pub(crate) terminated: bool,
    pub(crate) current_subprogram: Option<usize>,
    pub(crate) instantiation_depth: usize,

    // Error collection; emission continues after a declaration fails
    pub(crate) errors: Vec<CodegenError>,
    pub(crate) current_span: SourceSpan,

    pub(crate) interner: TypeInterner,
    pub(crate) builtins: BuiltinRegistry,

    // Debug info metadata
    pub(crate) dbg_counter: usize,
    pub(crate) dbg_nodes: Vec<String>,
}

impl LlvmIrGen {
    pub fn new(module_name: &str) -> Self {
        Self::with_options(module_name, CodegenOptions::default())
    }

    pub fn with_options(module_name: &str, options: CodegenOptions) -> Self {
        let mut gen = Self {
            options,
            module_name: module_name.to_string(),
            source_file: format!("{}.tml", module_name),
            type_defs: String::new(),
            globals: String::new(),
            coverage_meta: String::new(),
            body: String::new(),
            declares: String::new(),
            fn_stack: Vec::new(),
            struct_ast_defs: HashMap::new(),
            enum_ast_defs: HashMap::new(),
            behavior_defs: HashMap::new(),
            function_defs: HashMap::new(),
            impls: HashMap::new(),
            bounds: BehaviorBoundsChecker::new(),
            shared_defs: HashSet::new(),
            generic_instantiations: HashMap::new(),
            emitted_types: HashSet::new(),
            struct_field_defs: HashMap::new(),
            enum_layouts: HashMap::new(),
            emitted_functions: HashSet::new(),
            declared_externs: HashMap::new(),
            extern_symbols: HashMap::new(),
            declared_intrinsics: HashSet::new(),
            link_libs: Vec::new(),
            string_constants: HashMap::new(),
            string_counter: 0,
            locals: Vec::new(),
            entry_allocas: Vec::new(),
            scope_stack: Vec::new(),
            tmp_counter: 0,
            label_counter: 0,
            slot_counter: 0,
            active_type_substitutions: HashMap::new(),
            current_constraints: Vec::new(),
            current_return_type: Type::Unit,
            current_is_async: false,
            current_poll_type: None,
            current_impl: None,
            loop_stack: Vec::new(),
            terminated: false,
            current_subprogram: None,
            instantiation_depth: 0,
            errors: Vec::new(),
            current_span: SourceSpan::unknown(),
            interner: TypeInterner::new(),
            builtins: BuiltinRegistry::new(),
            dbg_counter: 0,
            dbg_nodes: Vec::new(),
        };
        gen.register_builtin_declarations();
        gen
    }

    /// Collected errors for the current emission
    pub fn errors(&self) -> &[CodegenError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<CodegenError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn record_error(&mut self, error: CodegenError) {
        self.errors.push(error);
    }

    /// Active output buffer: the function under emission, else the body
    pub(crate) fn out(&mut self) -> &mut String {
        self.fn_stack.last_mut().unwrap_or(&mut self.body)
    }

    pub(crate) fn fresh_tmp(&mut self) -> String {
        let n = self.tmp_counter;
        self.tmp_counter += 1;
        format!("%t{}", n)
    }

    pub(crate) fn fresh_label(&mut self, base: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("{}{}", base, n)
    }

    pub(crate) fn fresh_slot(&mut self, name: &str) -> String {
        let n = self.slot_counter;
        self.slot_counter += 1;
        format!("%{}.addr{}", name, n)
    }

    /// Reserve a stack slot in the function's entry block. All allocas are
    /// hoisted there so they dominate every use and never pile up inside
    /// loops; the lines are spliced in when the function buffer closes.
    pub(crate) fn entry_alloca(&mut self, name: &str, llvm_ty: &str) -> String {
        let slot = self.fresh_slot(name);
        self.entry_allocas
            .push(format!("  {} = alloca {}\n", slot, llvm_ty));
        slot
    }

    pub(crate) fn push_locals(&mut self) {
        self.locals.push(HashMap::new());
    }

    pub(crate) fn pop_locals(&mut self) {
        self.locals.pop();
    }

    pub(crate) fn define_local(&mut self, name: &str, var: LocalVar) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string(), var);
        }
    }

    pub(crate) fn lookup_local(&self, name: &str) -> Option<&LocalVar> {
        self.locals.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Snapshot the per-function state before emitting a nested body
    pub(crate) fn save_function_state(&mut self) -> FunctionState {
        FunctionState {
            locals: std::mem::take(&mut self.locals),
            entry_allocas: std::mem::take(&mut self.entry_allocas),
            scope_stack: std::mem::take(&mut self.scope_stack),
            tmp_counter: std::mem::replace(&mut self.tmp_counter, 0),
            label_counter: std::mem::replace(&mut self.label_counter, 0),
            slot_counter: std::mem::replace(&mut self.slot_counter, 0),
            active_type_substitutions: std::mem::take(&mut self.active_type_substitutions),
            current_constraints: std::mem::take(&mut self.current_constraints),
            current_return_type: std::mem::replace(&mut self.current_return_type, Type::Unit),
            current_is_async: std::mem::replace(&mut self.current_is_async, false),
            current_poll_type: self.current_poll_type.take(),
            current_impl: self.current_impl.take(),
            loop_stack: std::mem::take(&mut self.loop_stack),
            terminated: std::mem::replace(&mut self.terminated, false),
            current_subprogram: self.current_subprogram.take(),
        }
    }

    pub(crate) fn restore_function_state(&mut self, state: FunctionState) {
        self.locals = state.locals;
        self.entry_allocas = state.entry_allocas;
        self.scope_stack = state.scope_stack;
        self.tmp_counter = state.tmp_counter;
        self.label_counter = state.label_counter;
        self.slot_counter = state.slot_counter;
        self.active_type_substitutions = state.active_type_substitutions;
        self.current_constraints = state.current_constraints;
        self.current_return_type = state.current_return_type;
        self.current_is_async = state.current_is_async;
        self.current_poll_type = state.current_poll_type;
        self.current_impl = state.current_impl;
        self.loop_stack = state.loop_stack;
        self.terminated = state.terminated;
        self.current_subprogram = state.current_subprogram;
    }

    /// Apply the active substitution map to a type
    pub(crate) fn resolve_type(&self, ty: &Type) -> Type {
        generics::substitute_type(ty, &self.active_type_substitutions)
    }

    pub(crate) fn err_unresolved(&self, ty: &Type) -> CodegenError {
        CodegenError::unresolved_generic(
            format!("type `{}` still contains generic parameters after substitution", ty),
            self.current_span,
        )
    }

    /// Verify a type is fully concrete; used before emission of any body code
    pub(crate) fn require_concrete(&self, ty: &Type) -> CgResult<Type> {
        let resolved = self.resolve_type(ty);
        if resolved.contains_param() {
            return Err(self.err_unresolved(&resolved));
        }
        Ok(resolved)
    }

    /// Append one instruction line to the active buffer. Dead code after a
    /// terminator is dropped rather than emitted.
    pub(crate) fn emit_line(&mut self, line: impl AsRef<str>) {
        if self.terminated {
            return;
        }
        let out = self.out();
        out.push_str("  ");
        out.push_str(line.as_ref());
        out.push('\n');
    }

    /// Start a new basic block
    pub(crate) fn emit_label(&mut self, label: &str) {
        let out = self.out();
        out.push_str(label);
        out.push_str(":\n");
        self.terminated = false;
    }

    /// Append a terminator (br/ret/unreachable) and close the block
    pub(crate) fn emit_terminator(&mut self, line: impl AsRef<str>) {
        if self.terminated {
            return;
        }
        self.emit_line(line);
        self.terminated = true;
    }
}
