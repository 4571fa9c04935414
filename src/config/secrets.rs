// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Secret backends consulted by `{{ secret "PATH" }}` at load time.

use anyhow::{anyhow, bail, Context as _};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Source of plaintext secrets.
///
/// The loader bounds each call with its own timeout and never retries, so
/// implementations should fail fast rather than retry internally.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, path: &str) -> anyhow::Result<String>;
}

/// Store used when no backend is configured. Every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSecretStore;

#[async_trait]
impl SecretStore for NoSecretStore {
    async fn get(&self, path: &str) -> anyhow::Result<String> {
        Err(anyhow!("no secret store configured for '{}'", path))
    }
}

/// Map-backed store, handy for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(path.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, path: &str) -> anyhow::Result<String> {
        self.secrets
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("secret '{}' not found", path))
    }
}

/// Reads each secret from a file below `root`; `PATH` is relative to it.
///
/// One trailing line ending is stripped from the file contents.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, path: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("secret path '{}' must be relative and must not leave the store", path);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, path: &str) -> anyhow::Result<String> {
        let file = self.locate(path)?;
        let mut value = tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        if value.ends_with('\n') {
            value.pop();
            if value.ends_with('\r') {
                value.pop();
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySecretStore::new().with_secret("api/key", "abc");
        assert_eq!(store.get("api/key").await.unwrap(), "abc");
        assert!(store.get("api/other").await.is_err());
    }

    #[tokio::test]
    async fn test_no_store_always_fails() {
        let err = NoSecretStore.get("x").await.unwrap_err();
        assert!(err.to_string().contains("no secret store configured"));
    }

    #[tokio::test]
    async fn test_file_store_reads_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("db")).unwrap();
        std::fs::write(dir.path().join("db/password"), "s3cret\n").unwrap();

        let store = FileSecretStore::new(dir.path());
        assert_eq!(store.get("db/password").await.unwrap(), "s3cret");
    }

    #[tokio::test]
    async fn test_file_store_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());

        for path in ["../etc/passwd", "/etc/passwd", "a/../../b", ""] {
            assert!(store.get(path).await.is_err(), "path: {}", path);
        }
    }
}
