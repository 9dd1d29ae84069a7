/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Static configuration of private data collections.
//!
//! A collection is a named partition of private state inside a namespace (chaincode). Its
//! configuration is read from the namespace's definition and, for the purposes of this crate, is
//! immutable for the duration of a [dissemination](crate::dissemination) call.

use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};

use crate::dissemination::gossip::CollectionAccessPolicy;

/// The declared type of a collection.
///
/// `Unknown` is the value of a configuration that never set a type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectionType {
    #[default]
    Unknown,
    Private,
    Transient,
    OffLedger,
    Dcas,
}

impl CollectionType {
    /// The name of the collection type as it appears in collection definitions.
    pub const fn name(&self) -> &'static str {
        match self {
            CollectionType::Unknown => "COL_UNKNOWN",
            CollectionType::Private => "COL_PRIVATE",
            CollectionType::Transient => "COL_TRANSIENT",
            CollectionType::OffLedger => "COL_OFFLEDGER",
            CollectionType::Dcas => "COL_DCAS",
        }
    }
}

impl Display for CollectionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The statically declared part of a collection's configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticCollectionConfig {
    /// Name of the collection, unique within its namespace.
    pub name: String,
    pub collection_type: CollectionType,
    /// MSP IDs of the organizations whose peers may hold the collection's data.
    pub member_orgs: Vec<String>,
    /// Minimum number of peers that must acknowledge the data before an endorsement succeeds.
    pub required_peer_count: usize,
    /// Maximum number of peers the data is pushed to.
    pub maximum_peer_count: usize,
    /// Number of blocks the data lives for after the block that committed it. 0 means forever.
    pub block_to_live: u64,
}

/// The access policy a collection declares statically: its member organizations and peer counts,
/// with no further evaluation.
impl CollectionAccessPolicy for StaticCollectionConfig {
    fn member_orgs(&self) -> BTreeSet<String> {
        self.member_orgs.iter().cloned().collect()
    }

    fn required_peer_count(&self) -> usize {
        self.required_peer_count
    }

    fn maximum_peer_count(&self) -> usize {
        self.maximum_peer_count
    }
}

/// A collection's configuration as found in a namespace definition.
///
/// The payload is optional because definitions that predate a collection type may carry an empty
/// configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionConfig {
    pub static_collection_config: Option<StaticCollectionConfig>,
}

impl CollectionConfig {
    /// Create a `CollectionConfig` with `config` as its static payload.
    pub fn new(config: StaticCollectionConfig) -> Self {
        Self {
            static_collection_config: Some(config),
        }
    }

    /// Create a `CollectionConfig` with a static payload that only declares `collection_type`.
    pub fn of_type(collection_type: CollectionType) -> Self {
        Self::new(StaticCollectionConfig {
            collection_type,
            ..Default::default()
        })
    }
}
