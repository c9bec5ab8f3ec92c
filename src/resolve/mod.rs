//! Module resolution capability.
//!
//! The engine never loads code itself; it asks a [`ModuleResolver`] whether a
//! name can be loaded and receives a [`ModuleHandle`] describing what was
//! found. Handles expose typed accessors with defined defaults instead of
//! probing arbitrary attributes.

mod command;
mod fs;
mod table;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub use command::CommandResolver;
pub use fs::FsResolver;
pub use table::StaticResolver;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("not found: {name} ({detail})")]
    NotFound { name: String, detail: String },
    #[error("incompatible: {name}: {reason}")]
    Incompatible { name: String, reason: String },
    #[error("{symbol} is not exported by {module}")]
    MissingSymbol { module: String, symbol: String },
    #[error("failed to load {name}: {message}")]
    Failed { name: String, message: String },
}

impl LoadError {
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::Failed {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleHandle {
    name: String,
    location: Option<PathBuf>,
    exports: Option<BTreeSet<String>>,
    metadata: BTreeMap<String, String>,
}

impl ModuleHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports
            .get_or_insert_with(BTreeSet::new)
            .extend(exports.into_iter().map(Into::into));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// False when the mechanism that loaded the module cannot enumerate its
    /// symbols.
    pub fn exports_known(&self) -> bool {
        self.exports.is_some()
    }

    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().flatten().map(String::as_str)
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.exports
            .as_ref()
            .is_some_and(|exports| exports.contains(symbol))
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.metadata("version")
    }
}

pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<ModuleHandle, LoadError>;

    fn resolve_in(&self, package: &str, module: &str) -> Result<ModuleHandle, LoadError> {
        self.resolve(&qualify(package, module))
    }

    /// Modules whose exports are unknown accept any symbol.
    fn resolve_symbol(&self, module: &ModuleHandle, symbol: &str) -> Result<(), LoadError> {
        if !module.exports_known() || module.has_symbol(symbol) {
            return Ok(());
        }
        Err(LoadError::MissingSymbol {
            module: module.name().to_string(),
            symbol: symbol.to_string(),
        })
    }
}

pub fn qualify(package: &str, module: &str) -> String {
    let package = package.trim().trim_end_matches('.');
    if package.is_empty() {
        module.to_string()
    } else {
        format!("{package}.{module}")
    }
}

/// Modules loaded during one run, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, ModuleHandle>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qualified: impl Into<String>, handle: ModuleHandle) {
        self.modules.insert(qualified.into(), handle);
    }

    pub fn get(&self, qualified: &str) -> Option<&ModuleHandle> {
        self.modules.get(qualified)
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.modules.contains_key(qualified)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
