//! Model loader resolution
//!
//! A loader source turns a configured location into a decoder. Locations
//! are tried in order; the first one that resolves decodes every candidate
//! asset.

use std::future::Future;
use std::sync::Arc;

use persona_core::{PersonaError, PersonaResult};

use crate::{GltfDecoder, ModelAsset, BUILTIN_GLB_LOADER, BUILTIN_GLTF_LOADER};

/// Decodes raw asset bytes into a detached model
pub trait ModelDecoder: Send + Sync {
    fn name(&self) -> &str;

    fn decode(&self, path: &str, bytes: &[u8]) -> PersonaResult<ModelAsset>;
}

/// Resolves loader locations to decoders
pub trait LoaderSource {
    fn resolve(
        &self,
        location: &str,
    ) -> impl Future<Output = PersonaResult<Arc<dyn ModelDecoder>>> + Send;
}

/// Loader source backed by the decoders compiled into this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoaderSource;

impl LoaderSource for BuiltinLoaderSource {
    async fn resolve(&self, location: &str) -> PersonaResult<Arc<dyn ModelDecoder>> {
        match location {
            BUILTIN_GLTF_LOADER | BUILTIN_GLB_LOADER => Ok(Arc::new(GltfDecoder::new())),
            other => Err(PersonaError::LoaderUnavailable {
                location: other.to_string(),
                reason: "no built-in decoder at this location".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builtin_locations() {
        let source = BuiltinLoaderSource;
        let decoder = source.resolve(BUILTIN_GLTF_LOADER).await.unwrap();
        assert_eq!(decoder.name(), "gltf");
        assert!(source.resolve(BUILTIN_GLB_LOADER).await.is_ok());

        let err = source.resolve("https://cdn.example/loader.js").await.err().unwrap();
        assert!(matches!(err, PersonaError::LoaderUnavailable { .. }));
    }
}
