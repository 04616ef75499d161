//! Collaborators supplied by the host application
//!
//! The processor never reads the process environment or resolves code on its own. Both are
//! injected through [crate::processor::ProcessOptions] so evaluation can be tested with fakes.
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of environment variables for `$var(..., env=true)`
pub trait Environment: Send + Sync {
    fn get_env(&self, name: &str) -> Option<String>;
}

/// Reads the environment of the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get_env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<F> Environment for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get_env(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Host code invoked by `$call` and `$model` with the evaluated arguments
pub type Callable = Arc<dyn Fn(Map) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SymbolError {
    #[error("symbol `{symbol}` not found (resolved from {})", cwd.display())]
    NotFound { symbol: String, cwd: PathBuf },
}

/// Turns the symbol of a call into something that can be invoked
///
/// Symbols are either dotted names (`package.module.Class`) or file qualified names
/// (`path/to/file.py:Class`). A relative file path is relative to `cwd`, the directory of the
/// document that contains the call.
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, symbol: &str, cwd: &Path) -> Result<Callable, SymbolError>;
}

/// Resolves nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn resolve(&self, symbol: &str, cwd: &Path) -> Result<Callable, SymbolError> {
        Err(SymbolError::NotFound {
            symbol: symbol.to_string(),
            cwd: cwd.to_path_buf(),
        })
    }
}

/// Callables registered by name
///
/// File qualified symbols are first looked up as written, then with the file part resolved
/// against `cwd`, so `scripts/f.py:build` used from `/work/config.yml` also finds a callable
/// registered as `/work/scripts/f.py:build`.
#[derive(Default, Clone)]
pub struct SymbolTable {
    symbols: IndexMap<String, Callable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, symbol: impl Into<String>, callable: F)
    where
        F: Fn(Map) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.symbols.insert(symbol.into(), Arc::new(callable));
    }

    /// Builder style [SymbolTable::register]
    pub fn with<F>(mut self, symbol: impl Into<String>, callable: F) -> Self
    where
        F: Fn(Map) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(symbol, callable);
        self
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.symbols.keys()).finish()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, symbol: &str, cwd: &Path) -> Result<Callable, SymbolError> {
        if let Some(callable) = self.symbols.get(symbol) {
            return Ok(callable.clone());
        }

        if let Some((file, name)) = symbol.rsplit_once(':') {
            let qualified = format!("{}:{name}", cwd.join(file).display());
            tracing::trace!(symbol, %qualified, "resolving file symbol");
            if let Some(callable) = self.symbols.get(&qualified) {
                return Ok(callable.clone());
            }
        }

        Err(SymbolError::NotFound {
            symbol: symbol.to_string(),
            cwd: cwd.to_path_buf(),
        })
    }
}
