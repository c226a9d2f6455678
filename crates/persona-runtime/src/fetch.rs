//! Asset fetching

use std::future::Future;
use std::path::PathBuf;

use bytes::Bytes;
use persona_core::{PersonaError, PersonaResult};
use tracing::debug;

/// Source of asset bytes.
///
/// `probe` is the cheap existence check done before committing to a full
/// `fetch`.
pub trait AssetFetcher {
    fn probe(&self, path: &str) -> impl Future<Output = PersonaResult<()>> + Send;

    fn fetch(&self, path: &str) -> impl Future<Output = PersonaResult<Bytes>> + Send;
}

/// Fetches assets from the local filesystem, relative to a base directory
#[derive(Debug, Clone, Default)]
pub struct FsFetcher {
    base: PathBuf,
}

impl FsFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &PathBuf {
        &self.base
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base.join(path)
    }
}

impl AssetFetcher for FsFetcher {
    async fn probe(&self, path: &str) -> PersonaResult<()> {
        let full = self.resolve(path);
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| PersonaError::ProbeFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        if !meta.is_file() || meta.len() == 0 {
            return Err(PersonaError::ProbeFailed {
                path: path.to_string(),
                reason: "not a non-empty file".to_string(),
            });
        }
        debug!(path = %full.display(), bytes = meta.len(), "asset probed");
        Ok(())
    }

    async fn fetch(&self, path: &str) -> PersonaResult<Bytes> {
        let data = tokio::fs::read(self.resolve(path))
            .await
            .map_err(|e| PersonaError::FetchFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("persona-fetch-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_probe_and_fetch() {
        let dir = scratch("ok");
        std::fs::write(dir.join("model.glb"), b"glTF").unwrap();
        let fetcher = FsFetcher::new(&dir);

        fetcher.probe("model.glb").await.unwrap();
        let bytes = fetcher.fetch("model.glb").await.unwrap();
        assert_eq!(&bytes[..], b"glTF");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_probe_missing_and_empty() {
        let dir = scratch("missing");
        std::fs::write(dir.join("empty.glb"), b"").unwrap();
        let fetcher = FsFetcher::new(&dir);

        let err = fetcher.probe("nope.glb").await.unwrap_err();
        assert!(matches!(err, PersonaError::ProbeFailed { .. }));
        let err = fetcher.probe("empty.glb").await.unwrap_err();
        assert!(matches!(err, PersonaError::ProbeFailed { .. }));
        let err = fetcher.fetch("nope.glb").await.unwrap_err();
        assert!(matches!(err, PersonaError::FetchFailed { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }
}
