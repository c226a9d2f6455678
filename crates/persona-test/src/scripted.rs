//! Scripted collaborators for the acquisition pipeline
//!
//! Every fetcher and loader source here records what it was asked for, so
//! tests can assert on the order and number of attempts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use persona_core::{PersonaError, PersonaResult};
use persona_runtime::{AssetFetcher, GltfDecoder, LoaderSource, ModelDecoder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::FixtureDecoder;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// FETCHERS
// ============================================================================

/// How a scripted path behaves
#[derive(Debug, Clone)]
pub enum AssetScript {
    /// Probe fails
    Missing,
    /// Probe succeeds, fetch fails
    Unreachable,
    /// Probe and fetch succeed
    Bytes(Bytes),
}

/// Fetcher answering from a fixed script. Unlisted paths are missing.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    assets: HashMap<String, AssetScript>,
    latency: Duration,
    probes: AtomicUsize,
    fetches: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, path: &str, script: AssetScript) -> Self {
        self.assets.insert(path.to_string(), script);
        self
    }

    pub fn with_bytes(self, path: &str, bytes: impl Into<Bytes>) -> Self {
        self.with_asset(path, AssetScript::Bytes(bytes.into()))
    }

    /// Delay applied to every probe and fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Paths in the order they were probed
    pub fn probed_paths(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl AssetFetcher for ScriptedFetcher {
    async fn probe(&self, path: &str) -> PersonaResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(path.to_string());
        self.wait().await;
        match self.assets.get(path) {
            Some(AssetScript::Unreachable) | Some(AssetScript::Bytes(_)) => Ok(()),
            Some(AssetScript::Missing) | None => Err(PersonaError::ProbeFailed {
                path: path.to_string(),
                reason: "404 Not Found".to_string(),
            }),
        }
    }

    async fn fetch(&self, path: &str) -> PersonaResult<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        match self.assets.get(path) {
            Some(AssetScript::Bytes(bytes)) => Ok(bytes.clone()),
            _ => Err(PersonaError::FetchFailed {
                path: path.to_string(),
                reason: "connection reset".to_string(),
            }),
        }
    }
}

/// Wraps a fetcher and fails a seeded fraction of probes and fetches
#[derive(Debug)]
pub struct FlakyFetcher<F> {
    inner: F,
    failure_rate: f64,
    rng: Mutex<StdRng>,
    injected: AtomicUsize,
}

impl<F: AssetFetcher + Sync> FlakyFetcher<F> {
    pub fn new(inner: F, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            injected: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Failures injected so far
    pub fn injected(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        let fail = lock(&self.rng).gen_bool(self.failure_rate);
        if fail {
            self.injected.fetch_add(1, Ordering::SeqCst);
        }
        fail
    }
}

impl<F: AssetFetcher + Sync> AssetFetcher for FlakyFetcher<F> {
    async fn probe(&self, path: &str) -> PersonaResult<()> {
        if self.should_fail() {
            return Err(PersonaError::ProbeFailed {
                path: path.to_string(),
                reason: "injected timeout".to_string(),
            });
        }
        self.inner.probe(path).await
    }

    async fn fetch(&self, path: &str) -> PersonaResult<Bytes> {
        if self.should_fail() {
            return Err(PersonaError::FetchFailed {
                path: path.to_string(),
                reason: "injected disconnect".to_string(),
            });
        }
        self.inner.fetch(path).await
    }
}

// ============================================================================
// LOADER SOURCES
// ============================================================================

/// Loader source where only some locations resolve
#[derive(Default)]
pub struct ScriptedLoaderSource {
    decoders: HashMap<String, Arc<dyn ModelDecoder>>,
    attempts: Mutex<Vec<String>>,
}

impl std::fmt::Debug for ScriptedLoaderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut available: Vec<&String> = self.decoders.keys().collect();
        available.sort();
        f.debug_struct("ScriptedLoaderSource")
            .field("available", &available)
            .field("attempts", &lock(&self.attempts).len())
            .finish()
    }
}

impl ScriptedLoaderSource {
    /// Nothing resolves
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_decoder(mut self, location: &str, decoder: Arc<dyn ModelDecoder>) -> Self {
        self.decoders.insert(location.to_string(), decoder);
        self
    }

    /// `location` resolves to the glTF decoder
    pub fn with_gltf(self, location: &str) -> Self {
        self.with_decoder(location, Arc::new(GltfDecoder::new()))
    }

    /// `location` resolves to the fixture decoder
    pub fn with_fixtures(self, location: &str) -> Self {
        self.with_decoder(location, Arc::new(FixtureDecoder))
    }

    /// Locations in the order they were tried
    pub fn attempts(&self) -> Vec<String> {
        lock(&self.attempts).clone()
    }
}

impl LoaderSource for ScriptedLoaderSource {
    async fn resolve(&self, location: &str) -> PersonaResult<Arc<dyn ModelDecoder>> {
        lock(&self.attempts).push(location.to_string());
        self.decoders
            .get(location)
            .cloned()
            .ok_or_else(|| PersonaError::LoaderUnavailable {
                location: location.to_string(),
                reason: "script injection failed".to_string(),
            })
    }
}
