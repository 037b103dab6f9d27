//! Compiled descriptor cache keyed by file path. Insert-only; entries live as long as the process.

use crate::command::{compile, CommandDescriptor};
use crate::error::AppError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug)]
pub struct DescriptorCache {
    enabled: bool,
    entries: RwLock<HashMap<PathBuf, Arc<CommandDescriptor>>>,
}

impl Default for DescriptorCache {
    fn default() -> Self {
        DescriptorCache::new(true)
    }
}

impl DescriptorCache {
    /// A disabled cache recompiles on every load, so edited files take effect immediately.
    pub fn new(enabled: bool) -> Self {
        DescriptorCache {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compiled descriptor for `path`, reading and compiling the file on a miss.
    pub async fn load(&self, path: &Path) -> Result<Arc<CommandDescriptor>, AppError> {
        if self.enabled {
            if let Some(hit) = self.entries.read().ok().and_then(|m| m.get(path).cloned()) {
                return Ok(hit);
            }
        }
        let source = tokio::fs::read_to_string(path).await?;
        let descriptor = Arc::new(compile(&source)?);
        tracing::debug!(path = %path.display(), parameters = descriptor.parameters.len(), "compiled descriptor");
        if self.enabled {
            if let Ok(mut m) = self.entries.write() {
                return Ok(m.entry(path.to_path_buf()).or_insert(descriptor).clone());
            }
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DescriptorError;

    const V1: &str = "<Command><CommandText>SELECT 1</CommandText></Command>";
    const V2: &str = "<Command><CommandText>SELECT 2</CommandText></Command>";

    #[tokio::test]
    async fn caches_compiled_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonds");
        std::fs::write(&path, V1).unwrap();
        let cache = DescriptorCache::new(true);
        let first = cache.load(&path).await.unwrap();
        std::fs::write(&path, V2).unwrap();
        let second = cache.load(&path).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.text, "SELECT 1");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn disabled_cache_rereads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonds");
        std::fs::write(&path, V1).unwrap();
        let cache = DescriptorCache::new(false);
        cache.load(&path).await.unwrap();
        std::fs::write(&path, V2).unwrap();
        assert_eq!(cache.load(&path).await.unwrap().text, "SELECT 2");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn compile_errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonds");
        std::fs::write(&path, "<Query/>").unwrap();
        let cache = DescriptorCache::default();
        let err = cache.load(&path).await.unwrap_err();
        assert!(matches!(err, AppError::Descriptor(DescriptorError::Malformed(_))));
        assert!(cache.is_empty());
    }
}
