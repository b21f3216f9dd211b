use dashmap::DashMap;
use std::sync::Arc;
use tml_ast::Type;

/// Structural interner for semantic types.
///
/// Generic instantiation re-derives the same concrete types over and over
/// (every reference to `Maybe[I64]` rebuilds the same tree); interning keys
/// them once so instantiation-table entries share one allocation.
pub struct TypeInterner {
    cache: DashMap<Type, Arc<Type>>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    pub fn intern(&self, ty: Type) -> Arc<Type> {
        self.cache
            .entry(ty.clone())
            .or_insert_with(|| Arc::new(ty))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}
