// Hook registry and filesystem phase discovery
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::core::Phase;
use crate::error::{DiscoveryError, Result};
use crate::hooks::{Hook, HookFactory};

/// Startup-time registry mapping module ids to hook factories.
///
/// Populated once by static registration; discovery resolves the module ids it
/// finds on disk against this map instead of loading code from paths.
#[derive(Default)]
pub struct HookRegistry {
    factories: HashMap<String, HookFactory>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in hooks
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::hooks::builtin::register_builtin_hooks(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, module_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Hook> + Send + Sync + 'static,
    {
        self.factories.insert(module_id.into(), Arc::new(factory));
    }

    pub fn get(&self, module_id: &str) -> Option<HookFactory> {
        self.factories.get(module_id).cloned()
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.factories.contains_key(module_id)
    }

    /// Registered module ids, sorted
    pub fn module_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// A hook module file selected by discovery, before registry resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredHook {
    /// Name of the subdirectory the module lives in; resolved against the registry
    pub module_id: String,
    /// Full path of the selected file
    pub path: PathBuf,
}

/// Walk the hook tree rooted at `root` and select the modules applicable to
/// `phase`.
///
/// Selection policy:
/// - Only files inside a subdirectory of `root` are eligible. Files directly at
///   the root are shared helpers, never hooks.
/// - A file is selected when its filename starts with `<phase>.`, with the
///   phase already case-folded to lowercase by [`Phase`].
/// - Results are sorted lexicographically by path, so the order feeding the
///   aggregation merge is deterministic across filesystem backends.
///
/// A missing or unreadable root is an error, never a silent empty set.
pub fn discover(root: &Path, phase: &Phase) -> Result<Vec<DiscoveredHook>> {
    if !root.exists() {
        return Err(DiscoveryError::RootNotFound {
            path: root.to_path_buf(),
            suggestion: Some("set hooks.root to the directory containing hook modules".to_string()),
        }
        .into());
    }
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotADirectory {
            path: root.to_path_buf(),
        }
        .into());
    }

    let prefix = format!("{}.", phase.as_str());
    let mut selected = Vec::new();

    for entry in WalkDir::new(root).min_depth(2) {
        let entry = entry.map_err(|e| DiscoveryError::WalkFailed {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if !file_name.starts_with(&prefix) {
            continue;
        }
        let module_id = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        selected.push(DiscoveredHook {
            module_id,
            path: entry.path().to_path_buf(),
        });
    }

    selected.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(selected)
}

/// Resolve discovered modules to hook instances via the registry.
///
/// Unknown module ids are skipped with a warning; the run proceeds with the
/// hooks that resolve.
pub fn resolve(registry: &HookRegistry, discovered: &[DiscoveredHook]) -> Vec<Arc<dyn Hook>> {
    let mut hooks = Vec::with_capacity(discovered.len());
    for module in discovered {
        match registry.get(&module.module_id) {
            Some(factory) => hooks.push(factory()),
            None => {
                tracing::warn!(
                    module_id = %module.module_id,
                    path = %module.path.display(),
                    "discovered hook module has no registered implementation, skipping"
                );
            }
        }
    }
    hooks
}
