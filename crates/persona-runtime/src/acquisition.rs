//! Asset acquisition pipeline
//!
//! ```text
//! loader sources ──first that resolves──▶ decoder
//! asset candidates ─▶ probe ─▶ fetch ─▶ decode ─▶ Loaded
//!        │ failure at any step: next candidate
//!        ▼ all failed (or no decoder at all)
//!     Fallback
//! ```
//!
//! Failures never propagate. They are logged, collected into the report and
//! turned into a fallback outcome. The pipeline produces a detached asset
//! and does not touch the scene; attaching is the avatar's job.

use persona_core::PersonaError;
use tracing::{debug, info, warn};

use crate::{AssetFetcher, LoaderSource, ModelAsset, PersonaConfig};

/// What acquisition produced
#[derive(Debug)]
pub enum AssetOutcome {
    Loaded { path: String, asset: ModelAsset },
    /// Nothing could be loaded; `cause` is the last stage that gave up
    Fallback { cause: PersonaError },
}

impl AssetOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, AssetOutcome::Fallback { .. })
    }
}

/// Outcome plus every failure met on the way
#[derive(Debug)]
pub struct AcquisitionReport {
    pub outcome: AssetOutcome,
    pub failures: Vec<PersonaError>,
}

impl AcquisitionReport {
    /// Report for an acquisition that never ran
    pub fn fallback(cause: PersonaError) -> Self {
        Self {
            outcome: AssetOutcome::Fallback { cause },
            failures: Vec::new(),
        }
    }
}

/// Ordered loader locations and asset paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionPlan {
    pub loader_sources: Vec<String>,
    pub asset_candidates: Vec<String>,
}

impl AcquisitionPlan {
    pub fn from_config(config: &PersonaConfig) -> Self {
        Self {
            loader_sources: config.loader_sources.clone(),
            asset_candidates: config.asset_candidates.clone(),
        }
    }
}

/// Loader resolution and candidate loading, with graceful degradation
#[derive(Debug, Clone)]
pub struct AcquisitionPipeline<L, F> {
    plan: AcquisitionPlan,
    loader: L,
    fetcher: F,
}

impl<L: LoaderSource, F: AssetFetcher> AcquisitionPipeline<L, F> {
    pub fn new(plan: AcquisitionPlan, loader: L, fetcher: F) -> Self {
        Self {
            plan,
            loader,
            fetcher,
        }
    }

    pub fn plan(&self) -> &AcquisitionPlan {
        &self.plan
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Run the pipeline to completion. Never fails; see [`AssetOutcome`].
    pub async fn run(&self) -> AcquisitionReport {
        let mut failures = Vec::new();

        let mut decoder = None;
        for location in &self.plan.loader_sources {
            match self.loader.resolve(location).await {
                Ok(d) => {
                    debug!(location = %location, decoder = d.name(), "loader resolved");
                    decoder = Some(d);
                    break;
                }
                Err(e) => {
                    warn!(location = %location, error = %e, "loader source failed");
                    failures.push(e);
                }
            }
        }
        let Some(decoder) = decoder else {
            warn!(attempted = self.plan.loader_sources.len(), "no loader resolved, falling back");
            return AcquisitionReport {
                outcome: AssetOutcome::Fallback {
                    cause: PersonaError::NoLoaderResolved,
                },
                failures,
            };
        };

        for path in &self.plan.asset_candidates {
            if let Err(e) = self.fetcher.probe(path).await {
                debug!(path = %path, error = %e, "asset probe failed");
                failures.push(e);
                continue;
            }

            let bytes = match self.fetcher.fetch(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path, error = %e, "asset fetch failed");
                    failures.push(e);
                    continue;
                }
            };

            match decoder.decode(path, &bytes) {
                Ok(asset) => {
                    info!(path = %path, nodes = asset.node_count(), clips = asset.clips.len(), "asset loaded");
                    return AcquisitionReport {
                        outcome: AssetOutcome::Loaded {
                            path: path.clone(),
                            asset,
                        },
                        failures,
                    };
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "asset decode failed");
                    failures.push(e);
                }
            }
        }

        warn!(
            candidates = self.plan.asset_candidates.len(),
            "every asset candidate failed, falling back"
        );
        AcquisitionReport {
            outcome: AssetOutcome::Fallback {
                cause: PersonaError::CandidatesExhausted(self.plan.asset_candidates.len()),
            },
            failures,
        }
    }
}
