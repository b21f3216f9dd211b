// Per-module emission driver
// Pass 1 registers declarations; pass 2 emits in source order. Errors
// are collected so one invocation surfaces as many failures as possible.

use tml_ast::{Decl, Module};

use super::LlvmIrGen;

impl LlvmIrGen {
    /// Lower a typed module to textual IR. Diagnostics accumulate in
    /// `errors()`; emission is successful only when that list is empty.
    pub fn emit_module(&mut self, module: &Module) -> String {
        self.module_name = module.name.clone();
        self.source_file = format!("{}.tml", module.name);
        log::debug!("emitting module {}", module.name);

        // Pass 1: register every declaration; nothing is emitted yet so
        // forward references resolve regardless of source order
        for decl in &module.decls {
            if let Err(e) = self.register_decl(decl, false) {
                self.record_error(e);
            }
        }

        // Pass 2a: non-generic type definitions, in source order
        for decl in &module.decls {
            let result = match decl {
                Decl::Struct(def) => self.emit_struct_decl(def),
                Decl::Enum(def) => self.emit_enum_decl(def),
                _ => Ok(()),
            };
            if let Err(e) = result {
                self.record_error(e);
            }
        }

        // Pass 2b: extern declarations, so calls through source names
        // resolve to their symbols
        for decl in &module.decls {
            if let Decl::Function(func) = decl {
                if func.is_extern() {
                    if let Err(e) = self.emit_extern_decl(func) {
                        self.record_error(e);
                    }
                }
            }
        }

        // Pass 2c: impl methods, then free functions. Generic
        // declarations wait for a concrete reference.
        for decl in &module.decls {
            if let Decl::Impl(block) = decl {
                if let Err(e) = self.emit_impl_block(block) {
                    self.record_error(e);
                }
            }
        }
        for decl in &module.decls {
            if let Decl::Function(func) = decl {
                if !func.is_extern() {
                    if let Err(e) = self.emit_function_decl(func) {
                        self.record_error(e);
                    }
                }
            }
        }

        self.assemble_output()
    }

    /// Concatenate the buffers: header, type definitions, globals,
    /// coverage metadata, function bodies, declares, debug metadata.
    /// Types always precede every function that uses them.
    pub fn assemble_output(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("; ModuleID = '{}'\n", self.module_name));
        out.push_str(&format!("source_filename = \"{}\"\n", self.source_file));

        for section in [
            &self.type_defs,
            &self.globals,
            &self.coverage_meta,
            &self.body,
            &self.declares,
        ] {
            if !section.is_empty() {
                out.push('\n');
                out.push_str(section);
            }
        }

        let debug = self.debug_metadata_section();
        if !debug.is_empty() {
            out.push('\n');
            out.push_str(&debug);
        }
        out
    }

    /// The pre-function type definition section
    pub fn type_defs_section(&self) -> &str {
        &self.type_defs
    }

    /// The function body section
    pub fn body_section(&self) -> &str {
        &self.body
    }
}
