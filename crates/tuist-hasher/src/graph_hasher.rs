//! Content hashes for every target of a graph

use std::collections::BTreeMap;

use tuist_graph::{GraphTarget, ValueGraph};

use crate::content_hasher::ContentHasher;
use crate::error::HasherError;
use crate::profile::{CacheOutputType, CacheProfile};
use crate::target_hasher::{HashedTargets, TargetContentHasher};

#[derive(Clone)]
pub struct GraphContentHasher {
    target_hasher: TargetContentHasher,
}

impl GraphContentHasher {
    pub fn new(hasher: ContentHasher) -> Self {
        GraphContentHasher {
            target_hasher: TargetContentHasher::new(hasher),
        }
    }

    /// The default filter: targets whose product can come from the cache.
    pub fn cacheable(target: &GraphTarget) -> bool {
        target.target.product.is_cacheable()
    }

    /// Hashes every target in dependency order and returns the hashes of the
    /// targets accepted by `filter`.
    pub fn content_hashes(
        &self,
        graph: &ValueGraph,
        filter: impl Fn(&GraphTarget) -> bool,
        profile: &CacheProfile,
        output_type: CacheOutputType,
    ) -> Result<BTreeMap<GraphTarget, String>, HasherError> {
        let additional = [
            profile.name.clone(),
            profile.configuration.clone(),
            output_type.to_string(),
        ];
        let mut hashed = HashedTargets::new();
        let mut result = BTreeMap::new();
        for target in graph.topological_targets()? {
            let hash = self
                .target_hasher
                .content_hash(&target, &hashed, &additional)?;
            tracing::debug!("{} -> {}", target.name(), hash);
            hashed.insert((target.path.clone(), target.target.name.clone()), hash.clone());
            if filter(&target) {
                result.insert(target, hash);
            }
        }
        Ok(result)
    }
}
