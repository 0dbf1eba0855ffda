//! Graph mapping against the cache: hash, look up, fetch, mutate

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::try_join_all;

use tuist_graph::{GraphTarget, ValueGraph};
use tuist_hasher::{CacheOutputType, CacheProfile, GraphContentHasher};

use crate::error::CacheError;
use crate::mutator::CacheGraphMutator;
use crate::storage::CacheStoring;

/// Produces the bundle for a target so it can be stored in the cache.
#[async_trait::async_trait]
pub trait ArtifactBuilding: Send + Sync {
    /// Builds `target` into `output_dir` and returns the bundle's path.
    async fn build(
        &self,
        target: &GraphTarget,
        output_type: CacheOutputType,
        output_dir: &Path,
    ) -> Result<PathBuf, CacheError>;
}

#[derive(Clone)]
pub struct CacheMapper {
    hasher: GraphContentHasher,
    storage: Arc<dyn CacheStoring>,
    mutator: CacheGraphMutator,
    profile: CacheProfile,
    output_type: CacheOutputType,
    sources: BTreeSet<String>,
}

impl CacheMapper {
    pub fn new(
        hasher: GraphContentHasher,
        storage: Arc<dyn CacheStoring>,
        mutator: CacheGraphMutator,
        profile: CacheProfile,
        output_type: CacheOutputType,
    ) -> Self {
        CacheMapper {
            hasher,
            storage,
            mutator,
            profile,
            output_type,
            sources: BTreeSet::new(),
        }
    }

    /// Targets to keep as source even when the cache has them.
    pub fn with_sources(mut self, sources: BTreeSet<String>) -> Self {
        self.sources = sources;
        self
    }

    fn hashes(&self, graph: &ValueGraph) -> Result<BTreeMap<GraphTarget, String>, CacheError> {
        Ok(self.hasher.content_hashes(
            graph,
            GraphContentHasher::cacheable,
            &self.profile,
            self.output_type,
        )?)
    }

    /// Replaces every cacheable target the cache has with its binary.
    ///
    /// Lookups and fetches run concurrently. The first fetch that fails
    /// aborts the mapping.
    pub async fn map(&self, graph: &ValueGraph) -> Result<ValueGraph, CacheError> {
        let candidates: Vec<(GraphTarget, String)> = self
            .hashes(graph)?
            .into_iter()
            .filter(|(target, _)| !self.sources.contains(target.name()))
            .collect();

        let found = try_join_all(
            candidates
                .iter()
                .map(|(_, hash)| self.storage.exists(hash)),
        )
        .await?;
        let hits: Vec<&(GraphTarget, String)> = candidates
            .iter()
            .zip(found)
            .filter_map(|(candidate, exists)| exists.then_some(candidate))
            .collect();
        tracing::info!(
            "{} of {} cacheable targets found in the cache",
            hits.len(),
            candidates.len()
        );

        let precompiled: BTreeMap<GraphTarget, PathBuf> =
            try_join_all(hits.into_iter().map(|(target, hash)| async move {
                let path = self.storage.fetch(hash).await.map_err(|source| {
                    CacheError::FetchFailed {
                        hash: hash.clone(),
                        source: Box::new(source),
                    }
                })?;
                Ok::<_, CacheError>((target.clone(), path))
            }))
            .await?
            .into_iter()
            .collect();

        self.mutator.map(graph, &precompiled, &self.sources)
    }

    /// Builds and stores every cacheable target the cache doesn't have yet.
    ///
    /// Targets are built one at a time in dependency order. Returns the
    /// hashes that were stored.
    pub async fn warm(
        &self,
        graph: &ValueGraph,
        builder: &dyn ArtifactBuilding,
        output_dir: &Path,
    ) -> Result<Vec<String>, CacheError> {
        let hashes = self.hashes(graph)?;
        let mut stored = Vec::new();
        for target in graph.topological_targets()? {
            let Some(hash) = hashes.get(&target) else {
                continue;
            };
            if self.storage.exists(hash).await? {
                tracing::debug!("{} is already cached as {}", target.name(), hash);
                continue;
            }
            tracing::info!("Building {} for the cache", target.name());
            let bundle = builder
                .build(&target, self.output_type, &output_dir.join(hash))
                .await?;
            self.storage.store(hash, &bundle).await?;
            stored.push(hash.clone());
        }
        Ok(stored)
    }
}
