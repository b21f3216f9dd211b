// Debug info metadata
// Level 1 attaches a DISubprogram scope to each define; level 2 adds
// parameter declarations through llvm.dbg.declare

use super::errors::CgResult;
use super::LlvmIrGen;

impl LlvmIrGen {
    fn next_dbg_node(&mut self) -> usize {
        let id = self.dbg_counter;
        self.dbg_counter += 1;
        id
    }

    /// Lazily create the shared DIFile / DICompileUnit / subroutine-type
    /// nodes; returns (file, compile unit, subroutine type) ids
    fn ensure_debug_preamble(&mut self) -> (usize, usize, usize) {
        if self.dbg_nodes.is_empty() {
            let file = self.next_dbg_node();
            self.dbg_nodes.push(format!(
                "!{} = !DIFile(filename: \"{}\", directory: \"\")",
                file, self.source_file
            ));
            let cu = self.next_dbg_node();
            self.dbg_nodes.push(format!(
                "!{} = distinct !DICompileUnit(language: DW_LANG_C, file: !{}, \
                 producer: \"tml\", isOptimized: false, runtimeVersion: 0, \
                 emissionKind: FullDebug)",
                cu, file
            ));
            let types = self.next_dbg_node();
            self.dbg_nodes.push(format!("!{} = !{{null}}", types));
            let subroutine = self.next_dbg_node();
            self.dbg_nodes.push(format!(
                "!{} = !DISubroutineType(types: !{})",
                subroutine, types
            ));
        }
        (0, 1, 3)
    }

    /// Scope attachment for a define line; empty when debug info is off
    pub(crate) fn debug_subprogram(&mut self, symbol: &str) -> CgResult<String> {
        if self.options.emit_debug_info == 0 {
            self.current_subprogram = None;
            return Ok(String::new());
        }
        let (file, cu, subroutine) = self.ensure_debug_preamble();
        let line = self.current_span.line.max(1);
        let id = self.next_dbg_node();
        self.dbg_nodes.push(format!(
            "!{} = distinct !DISubprogram(name: \"{}\", scope: !{}, file: !{}, \
             line: {}, type: !{}, spFlags: DISPFlagDefinition, unit: !{})",
            id, symbol, file, file, line, subroutine, cu
        ));
        self.current_subprogram = Some(id);
        Ok(format!(" !dbg !{}", id))
    }

    /// Parameter debug info at level 2: a DILocalVariable plus a
    /// dbg.declare against the parameter's stack slot
    pub(crate) fn emit_param_debug(&mut self, name: &str, slot: &str) -> CgResult<()> {
        if self.options.emit_debug_info < 2 {
            return Ok(());
        }
        let Some(scope) = self.current_subprogram else {
            return Ok(());
        };
        self.ensure_runtime_declared(
            "llvm.dbg.declare",
            "declare void @llvm.dbg.declare(metadata, metadata, metadata)",
        )?;
        let line = self.current_span.line.max(1);
        let var = self.next_dbg_node();
        self.dbg_nodes.push(format!(
            "!{} = !DILocalVariable(name: \"{}\", scope: !{}, file: !0, line: {})",
            var, name, scope, line
        ));
        let loc = self.next_dbg_node();
        self.dbg_nodes.push(format!(
            "!{} = !DILocation(line: {}, column: 1, scope: !{})",
            loc, line, scope
        ));
        self.emit_line(format!(
            "call void @llvm.dbg.declare(metadata ptr {}, metadata !{}, metadata !DIExpression()), !dbg !{}",
            slot, var, loc
        ));
        Ok(())
    }

    /// Trailing metadata section of the module, when debug info is on
    pub(crate) fn debug_metadata_section(&self) -> String {
        if self.options.emit_debug_info == 0 || self.dbg_nodes.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        out.push_str("!llvm.dbg.cu = !{!1}\n");
        let flags = self.dbg_counter;
        out.push_str(&format!("!llvm.module.flags = !{{!{}}}\n", flags));
        out.push_str(&format!(
            "!{} = !{{i32 2, !\"Debug Info Version\", i32 3}}\n",
            flags
        ));
        for node in &self.dbg_nodes {
            out.push_str(node);
            out.push('\n');
        }
        out
    }
}
