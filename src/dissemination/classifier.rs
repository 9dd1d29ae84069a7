/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Classification of collection configurations into the kinds of collections this crate can plan
//! the dissemination of.

use std::fmt::{self, Display, Formatter};

use crate::types::collection::{CollectionConfig, CollectionType, StaticCollectionConfig};

/// The kinds of collections that have a dissemination strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    Transient,
    OffLedger,
    /// Off-ledger collections whose keys are derived from their values' content.
    Dcas,
}

impl Display for CollectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Transient => write!(f, "Transient"),
            CollectionKind::OffLedger => write!(f, "OffLedger"),
            CollectionKind::Dcas => write!(f, "DCAS"),
        }
    }
}

/// A collection configuration that cannot be disseminated. Retrying with the same configuration
/// always fails the same way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The configuration carries no static payload.
    StaticConfigNotDefined,
    /// The configuration declares a type that has no dissemination strategy.
    UnsupportedCollectionType(CollectionType),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::StaticConfigNotDefined => {
                write!(f, "static collection config not defined")
            }
            ConfigurationError::UnsupportedCollectionType(collection_type) => {
                write!(f, "unsupported collection type: [{}]", collection_type)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Get the static payload of `config`.
pub fn static_config(config: &CollectionConfig) -> Result<&StaticCollectionConfig, ConfigurationError> {
    config
        .static_collection_config
        .as_ref()
        .ok_or(ConfigurationError::StaticConfigNotDefined)
}

/// Get the kind of the collection configured by `config`.
pub fn collection_kind(config: &CollectionConfig) -> Result<CollectionKind, ConfigurationError> {
    match static_config(config)?.collection_type {
        CollectionType::Transient => Ok(CollectionKind::Transient),
        CollectionType::OffLedger => Ok(CollectionKind::OffLedger),
        CollectionType::Dcas => Ok(CollectionKind::Dcas),
        unsupported => Err(ConfigurationError::UnsupportedCollectionType(unsupported)),
    }
}
