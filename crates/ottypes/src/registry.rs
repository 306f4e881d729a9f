//! Name → type implementation lookup for nested subtype dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DeltaError, Result};
use crate::ot_type::OtType;
use crate::types;

/// Lookup from a type identifier to a registered implementation.
///
/// Built once at process startup and threaded through apply/compose/
/// transform as a read-only capability. Registration is idempotent: the
/// last write for a key wins. Callers must finish registering before
/// concurrent workloads reference a subtype by name.
#[derive(Default, Clone)]
pub struct Registry {
    types: HashMap<String, Arc<dyn OtType>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in type registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.set(Arc::new(types::ot_register::RegisterType));
        registry.set(Arc::new(types::ot_set::SetType));
        registry.set(Arc::new(types::ot_map::MapType));
        registry.set(Arc::new(types::ot_string::StringType));
        registry.set(Arc::new(types::ot_list::ListType));
        registry
    }

    /// Register `ty` under its name and, when present, its URI.
    pub fn set(&mut self, ty: Arc<dyn OtType>) {
        if let Some(uri) = ty.uri() {
            self.types.insert(uri.to_owned(), Arc::clone(&ty));
        }
        self.types.insert(ty.name().to_owned(), ty);
    }

    /// Look up a registered type by name or URI.
    pub fn get(&self, key: &str) -> Result<&dyn OtType> {
        match self.types.get(key) {
            Some(ty) => Ok(ty.as_ref()),
            None => Err(DeltaError::UnknownSubtype(key.to_owned())),
        }
    }
}
