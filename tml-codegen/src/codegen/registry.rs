// src/codegen/registry.rs
// Declaration intake and the type/behavior/builtin lookup surface

use std::collections::BTreeSet;
use tml_ast::*;

use super::errors::{CgResult, CodegenError};
use super::{ImplEntry, LlvmIrGen};
use crate::behavior_bounds::impl_key;
use crate::type_registry;

impl LlvmIrGen {
    /// Deterministic startup registration of builtin enums and behaviors.
    /// Performed once from the constructor.
    pub(crate) fn register_builtin_declarations(&mut self) {
        let builtin_enums = [
            EnumDef {
                visibility: Visibility::Public,
                name: "Ordering".into(),
                type_params: vec![],
                variants: vec![
                    EnumVariant::unit("Less"),
                    EnumVariant::unit("Equal"),
                    EnumVariant::unit("Greater"),
                ],
                span: SourceSpan::unknown(),
            },
            EnumDef {
                visibility: Visibility::Public,
                name: "Maybe".into(),
                type_params: vec![TypeParam::plain("T")],
                variants: vec![
                    EnumVariant::tuple("Just", vec![Type::Param("T".into())]),
                    EnumVariant::unit("Nothing"),
                ],
                span: SourceSpan::unknown(),
            },
            EnumDef {
                visibility: Visibility::Public,
                name: "Outcome".into(),
                type_params: vec![TypeParam::plain("T"), TypeParam::plain("E")],
                variants: vec![
                    EnumVariant::tuple("Ok", vec![Type::Param("T".into())]),
                    EnumVariant::tuple("Err", vec![Type::Param("E".into())]),
                ],
                span: SourceSpan::unknown(),
            },
            EnumDef {
                visibility: Visibility::Public,
                name: "Poll".into(),
                type_params: vec![TypeParam::plain("T")],
                variants: vec![
                    EnumVariant::tuple("Ready", vec![Type::Param("T".into())]),
                    EnumVariant::unit("Pending"),
                ],
                span: SourceSpan::unknown(),
            },
        ];
        for def in builtin_enums {
            self.shared_defs.insert(def.name.clone());
            self.enum_ast_defs.insert(def.name.clone(), def);
        }

        let builtin_behaviors = [
            BehaviorDef {
                visibility: Visibility::Public,
                name: "Future".into(),
                type_params: vec![],
                associated_types: vec!["Output".into()],
                methods: vec![BehaviorMethod {
                    name: "poll".into(),
                    params: vec![
                        Param::new("this", Type::Param("Self".into())),
                        Param::new("ctx", Type::named("Context")),
                    ],
                    return_type: Some(Type::generic("Poll", vec![Type::Param("Output".into())])),
                }],
                super_behaviors: vec![],
                span: SourceSpan::unknown(),
            },
            BehaviorDef {
                visibility: Visibility::Public,
                name: "Drop".into(),
                type_params: vec![],
                associated_types: vec![],
                methods: vec![BehaviorMethod {
                    name: "drop".into(),
                    params: vec![Param {
                        name: "this".into(),
                        ty: Type::Param("Self".into()),
                        is_mut: true,
                    }],
                    return_type: Some(Type::Unit),
                }],
                super_behaviors: vec![],
                span: SourceSpan::unknown(),
            },
            BehaviorDef {
                visibility: Visibility::Public,
                name: "Iterator".into(),
                type_params: vec![],
                associated_types: vec!["Item".into()],
                methods: vec![BehaviorMethod {
                    name: "next".into(),
                    params: vec![Param {
                        name: "this".into(),
                        ty: Type::Param("Self".into()),
                        is_mut: true,
                    }],
                    return_type: Some(Type::generic("Maybe", vec![Type::Param("Item".into())])),
                }],
                super_behaviors: vec![],
                span: SourceSpan::unknown(),
            },
        ];
        for def in builtin_behaviors {
            self.shared_defs.insert(def.name.clone());
            self.behavior_defs.insert(def.name.clone(), def);
        }
    }

    /// Register every declaration of a module without emitting anything.
    /// Used for library modules whose generic instantiations are shared
    /// between suites.
    pub fn register_library_module(&mut self, module: &Module) {
        for decl in &module.decls {
            let name = decl_name(decl);
            if let Err(e) = self.register_decl(decl, true) {
                self.record_error(e);
            } else if let Some(name) = name {
                self.shared_defs.insert(name);
            }
        }
    }

    pub(crate) fn register_decl(&mut self, decl: &Decl, shared: bool) -> CgResult<()> {
        match decl {
            Decl::Struct(def) => self.register_struct(def),
            Decl::Enum(def) => self.register_enum(def),
            Decl::Behavior(def) => self.register_behavior(def),
            Decl::Impl(block) => self.register_impl_block(block, shared),
            Decl::Function(func) => self.register_function(func),
        }
    }

    pub(crate) fn register_struct(&mut self, def: &StructDef) -> CgResult<()> {
        if self.struct_ast_defs.contains_key(&def.name) || self.enum_ast_defs.contains_key(&def.name)
        {
            return Err(CodegenError::duplicate_definition(
                format!("type `{}` is defined more than once", def.name),
                def.span,
            ));
        }
        self.struct_ast_defs.insert(def.name.clone(), def.clone());
        Ok(())
    }

    pub(crate) fn register_enum(&mut self, def: &EnumDef) -> CgResult<()> {
        if self.enum_ast_defs.contains_key(&def.name) || self.struct_ast_defs.contains_key(&def.name)
        {
            return Err(CodegenError::duplicate_definition(
                format!("type `{}` is defined more than once", def.name),
                def.span,
            ));
        }
        self.enum_ast_defs.insert(def.name.clone(), def.clone());
        Ok(())
    }

    pub(crate) fn register_behavior(&mut self, def: &BehaviorDef) -> CgResult<()> {
        // Builtin behaviors may be re-exported by library preludes
        if self.behavior_defs.contains_key(&def.name) {
            if type_registry::is_builtin_behavior(&def.name) {
                return Ok(());
            }
            return Err(CodegenError::duplicate_definition(
                format!("behavior `{}` is defined more than once", def.name),
                def.span,
            ));
        }
        self.behavior_defs.insert(def.name.clone(), def.clone());
        Ok(())
    }

    pub(crate) fn register_function(&mut self, func: &FuncDecl) -> CgResult<()> {
        if self.function_defs.contains_key(&func.name) {
            return Err(CodegenError::duplicate_definition(
                format!("function `{}` is defined more than once", func.name),
                func.span,
            ));
        }
        self.function_defs.insert(func.name.clone(), func.clone());
        Ok(())
    }

    pub(crate) fn register_impl_block(&mut self, block: &ImplBlock, shared: bool) -> CgResult<()> {
        if let Some(behavior) = &block.behavior {
            if !self.behavior_defs.contains_key(behavior) {
                let candidates: Vec<&str> =
                    self.behavior_defs.keys().map(String::as_str).collect();
                let mut message = format!("unknown behavior `{}`", behavior);
                let suggestions = tml_diagnostics::suggest_similar(behavior, candidates);
                if let Some(best) = suggestions.first() {
                    message.push_str(&format!("; did you mean `{}`?", best));
                }
                return Err(CodegenError::unknown_symbol(message, block.span));
            }
            // Idempotent: re-registering the same (type, behavior) is a no-op
            self.bounds.register_impl(&block.target, behavior);
        }
        self.impls
            .entry(impl_key(&block.target))
            .or_default()
            .push(ImplEntry {
                behavior: block.behavior.clone(),
                type_params: block.type_params.clone(),
                target: block.target.clone(),
                methods: block.methods.clone(),
                shared,
            });
        Ok(())
    }

    /// Record `impl <behavior> for <type>` directly. Idempotent.
    pub fn register_impl(&mut self, ty: &Type, behavior: &str) {
        self.bounds.register_impl(ty, behavior);
    }

    /// Resolve a type name: builtins first, then user declarations
    pub fn lookup_type(&self, name: &str) -> CgResult<Type> {
        if let Some(prim) = type_registry::primitive_by_name(name) {
            return Ok(prim);
        }
        if type_registry::is_builtin_opaque(name)
            || self.struct_ast_defs.contains_key(name)
            || self.enum_ast_defs.contains_key(name)
        {
            return Ok(Type::named(name));
        }
        let candidates: Vec<&str> = self
            .struct_ast_defs
            .keys()
            .chain(self.enum_ast_defs.keys())
            .map(String::as_str)
            .collect();
        let mut message = format!("unknown type `{}`", name);
        if let Some(best) = tml_diagnostics::suggest_similar(name, candidates).first() {
            message.push_str(&format!("; did you mean `{}`?", best));
        }
        Err(CodegenError::unknown_symbol(message, self.current_span))
    }

    /// Ordered (field-name, index, llvm-type) triples of an instantiated
    /// struct, keyed by mangled name
    pub fn struct_fields(&mut self, mangled: &str) -> CgResult<Vec<(String, usize, String)>> {
        let fields = self.struct_field_defs.get(mangled).cloned().ok_or_else(|| {
            CodegenError::unknown_symbol(
                format!("struct `{}` has not been instantiated", mangled),
                self.current_span,
            )
        })?;
        let mut out = Vec::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            let llvm = self.llvm_type(&field.ty)?;
            out.push((field.name.clone(), index, llvm));
        }
        Ok(out)
    }

    /// Variant tag: zero-based source declaration order, stable across
    /// re-exports and reference order
    pub fn enum_tag(&self, enum_name: &str, variant: &str) -> CgResult<u32> {
        let def = self.enum_ast_defs.get(enum_name).ok_or_else(|| {
            CodegenError::unknown_symbol(
                format!("unknown enum `{}`", enum_name),
                self.current_span,
            )
        })?;
        def.variants
            .iter()
            .position(|v| v.name == variant)
            .map(|i| i as u32)
            .ok_or_else(|| {
                let candidates: Vec<&str> =
                    def.variants.iter().map(|v| v.name.as_str()).collect();
                let mut message =
                    format!("enum `{}` has no variant `{}`", enum_name, variant);
                if let Some(best) = tml_diagnostics::suggest_similar(variant, candidates).first() {
                    message.push_str(&format!("; did you mean `{}`?", best));
                }
                CodegenError::unknown_symbol(message, self.current_span)
            })
    }

    /// Behaviors a type satisfies: builtin contracts plus registered impls
    pub fn behaviors_implemented_by(&self, ty: &Type) -> BTreeSet<String> {
        let mut set = self.bounds.registered_behaviors(ty);
        for behavior in [
            "Eq",
            "Ord",
            "Hash",
            "Display",
            "Debug",
            "Default",
            "Duplicate",
            "Numeric",
        ] {
            if crate::builtin_contracts::has_builtin_contract(ty, behavior) {
                set.insert(behavior.to_string());
            }
        }
        set
    }

    /// Builtin function overloads by name; None if `name` is not a builtin
    pub fn builtin_function_overloads(&self, name: &str) -> Option<&[super::builtins::FuncSig]> {
        self.builtins.overloads(name)
    }

    /// True if the type has a registered Drop behavior implementation
    pub(crate) fn type_implements_drop(&self, ty: &Type) -> bool {
        self.bounds.implements(ty, "Drop")
    }
}

fn decl_name(decl: &Decl) -> Option<String> {
    match decl {
        Decl::Struct(d) => Some(d.name.clone()),
        Decl::Enum(d) => Some(d.name.clone()),
        Decl::Behavior(d) => Some(d.name.clone()),
        Decl::Function(d) => Some(d.name.clone()),
        Decl::Impl(_) => None,
    }
}
