// Non-generic struct declaration lowering
// Generic templates stay registered until a reference instantiates them

use tml_ast::StructDef;

use super::errors::CgResult;
use super::LlvmIrGen;

impl LlvmIrGen {
    pub(crate) fn emit_struct_decl(&mut self, def: &StructDef) -> CgResult<()> {
        if def.is_generic() {
            // Instantiated on demand at first concrete reference
            return Ok(());
        }
        self.current_span = def.span;
        self.require_struct_instantiation(&def.name, &[])?;
        Ok(())
    }
}
