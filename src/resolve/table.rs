use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::resolve::{LoadError, ModuleHandle, ModuleResolver};

/// Fixed name table, for embedding the engine and for tests.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: BTreeMap<String, Result<ModuleHandle, LoadError>>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, handle: ModuleHandle) -> Self {
        self.entries.insert(handle.name().to_string(), Ok(handle));
        self
    }

    pub fn with_error(mut self, name: impl Into<String>, err: LoadError) -> Self {
        self.entries.insert(name.into(), Err(err));
        self
    }

    /// Number of `resolve` calls served so far.
    pub fn resolve_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ModuleResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Result<ModuleHandle, LoadError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.entries.get(name) {
            Some(entry) => entry.clone(),
            None => Err(LoadError::NotFound {
                name: name.to_string(),
                detail: "not registered".to_string(),
            }),
        }
    }
}
