/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Block-to-live (BTL) purge policy.
//!
//! Private data of a collection with a BTL of `n > 0` that is committed in block `b` stays
//! queryable while blocks `b + 1` through `b + n` are committed, and expires when block
//! `b + n + 1` (its "expiring block") is committed. A BTL of 0 means the data never expires.
//!
//! Both tiers of a [`TieredStore`](crate::pvtdata_store::tiered::TieredStore) are initialized with
//! the same policy, so that they agree on what is purged.

use std::collections::HashMap;

use super::{collection::CollectionConfig, data_types::BlockNum};

pub trait BTLPolicy: Send + Sync {
    /// Get the block-to-live of `collection` in `namespace`.
    fn btl(&self, namespace: &str, collection: &str) -> u64;

    /// Get the number of the block whose commit expires data of `collection` in `namespace` that was
    /// committed in `committing_block`. `None` if the data never expires.
    fn expiring_block(
        &self,
        namespace: &str,
        collection: &str,
        committing_block: BlockNum,
    ) -> Option<BlockNum> {
        match self.btl(namespace, collection) {
            0 => None,
            btl => Some(committing_block.saturating_add(btl).saturating_add(1)),
        }
    }
}

/// A [`BTLPolicy`] that reads block-to-live values from a map. Collections that are not in the map
/// never expire.
#[derive(Clone, Debug, Default)]
pub struct MapBTLPolicy(HashMap<(String, String), u64>);

impl MapBTLPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block-to-live of `collection` in `namespace` to `btl`.
    pub fn set(&mut self, namespace: &str, collection: &str, btl: u64) {
        self.0
            .insert((namespace.to_string(), collection.to_string()), btl);
    }

    /// Create a policy with the block-to-live declared by each of `namespace`'s collection
    /// configurations. Configurations without a static payload are skipped.
    pub fn from_collection_configs(namespace: &str, configs: &[CollectionConfig]) -> Self {
        let mut policy = Self::new();
        for config in configs.iter().filter_map(|config| config.static_collection_config.as_ref()) {
            policy.set(namespace, &config.name, config.block_to_live);
        }
        policy
    }
}

impl BTLPolicy for MapBTLPolicy {
    fn btl(&self, namespace: &str, collection: &str) -> u64 {
        self.0
            .get(&(namespace.to_string(), collection.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// Whether data of `collection` in `namespace` committed in `block_num` has expired once
/// `last_committed_block` is committed. With no policy, nothing expires.
pub(crate) fn is_expired(
    policy: Option<&dyn BTLPolicy>,
    namespace: &str,
    collection: &str,
    block_num: BlockNum,
    last_committed_block: BlockNum,
) -> bool {
    policy
        .and_then(|policy| policy.expiring_block(namespace, collection, block_num))
        .map_or(false, |expiring_block| expiring_block <= last_committed_block)
}
