// Non-generic enum declaration lowering
// Variant tags are registered in declaration order; the shape is the
// tagged union described by the layout engine

use tml_ast::EnumDef;

use super::errors::CgResult;
use super::LlvmIrGen;

impl LlvmIrGen {
    pub(crate) fn emit_enum_decl(&mut self, def: &EnumDef) -> CgResult<()> {
        if def.is_generic() {
            // Instantiated on demand at first concrete reference
            return Ok(());
        }
        self.current_span = def.span;
        self.require_enum_instantiation(&def.name, &[])?;
        Ok(())
    }
}
