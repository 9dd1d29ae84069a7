/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable persistence of the durable tier.

use std::collections::BTreeSet;
use std::fmt::Display;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    data_types::BlockNum,
    pvt_data::{TxMissingPvtDataMap, TxPvtData},
};

use super::variables::{self, block_key, single_key};

pub trait KVStore: KVGet + Clone + Send + Sync + 'static {
    type WriteBatch: WriteBatch;

    /// Atomically apply every insertion and deletion in `wb`.
    fn write(&mut self, wb: Self::WriteBatch);
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ Last Committed Block ↓↓↓ */

    fn last_committed_block(&self, ledger: &[u8]) -> Result<Option<BlockNum>, KVGetError> {
        deserialize_value(
            self.get(&single_key(ledger, &variables::LAST_COMMITTED_BLOCK)),
            || Key::LastCommittedBlock,
        )
    }

    /* ↓↓↓ Block Private Data ↓↓↓ */

    fn block_pvt_data(
        &self,
        ledger: &[u8],
        block_num: BlockNum,
    ) -> Result<Option<Vec<TxPvtData>>, KVGetError> {
        deserialize_value(
            self.get(&block_key(ledger, &variables::BLOCK_PVT_DATA, block_num)),
            || Key::BlockPvtData { block_num },
        )
    }

    /* ↓↓↓ Block Missing Private Data ↓↓↓ */

    fn block_missing_pvt_data(
        &self,
        ledger: &[u8],
        block_num: BlockNum,
    ) -> Result<Option<TxMissingPvtDataMap>, KVGetError> {
        deserialize_value(
            self.get(&block_key(ledger, &variables::BLOCK_MISSING_PVT_DATA, block_num)),
            || Key::BlockMissingPvtData { block_num },
        )
    }

    /* ↓↓↓ Missing Private Data Blocks ↓↓↓ */

    fn missing_pvt_data_blocks(&self, ledger: &[u8]) -> Result<BTreeSet<BlockNum>, KVGetError> {
        Ok(deserialize_value(
            self.get(&single_key(ledger, &variables::MISSING_PVT_DATA_BLOCKS)),
            || Key::MissingPvtDataBlocks,
        )?
        .unwrap_or_default())
    }

    /* ↓↓↓ Expiry Entries ↓↓↓ */

    fn expiry_entries(
        &self,
        ledger: &[u8],
        expiring_block: BlockNum,
    ) -> Result<Vec<ExpiryEntry>, KVGetError> {
        Ok(deserialize_value(
            self.get(&block_key(ledger, &variables::EXPIRY_ENTRIES, expiring_block)),
            || Key::ExpiryEntries { expiring_block },
        )?
        .unwrap_or_default())
    }

    /* ↓↓↓ Last Updated Old Blocks ↓↓↓ */

    fn last_updated_old_blocks(&self, ledger: &[u8]) -> Result<BTreeSet<BlockNum>, KVGetError> {
        Ok(deserialize_value(
            self.get(&single_key(ledger, &variables::LAST_UPDATED_OLD_BLOCKS)),
            || Key::LastUpdatedOldBlocks,
        )?
        .unwrap_or_default())
    }
}

fn deserialize_value<T: BorshDeserialize>(
    bytes: Option<Vec<u8>>,
    key: impl FnOnce() -> Key,
) -> Result<Option<T>, KVGetError> {
    match bytes {
        Some(bytes) => Ok(Some(T::deserialize(&mut &*bytes).map_err(|err| {
            KVGetError::DeserializeValueError {
                key: key(),
                source: err,
            }
        })?)),
        None => Ok(None),
    }
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}

/// A collection whose data in `block_num` expires when the block that keys this entry in the
/// ["Expiry Entries"](super::variables) variable is committed.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExpiryEntry {
    pub block_num: BlockNum,
    pub namespace: String,
    pub collection: String,
}

/// Error when trying to read a value corresponding to a given key from the [key value store][KVStore].
/// The error arises when the value corresponding to a given key cannot be deserialized into its
/// expected type.
#[derive(Debug)]
pub enum KVGetError {
    DeserializeValueError { key: Key, source: std::io::Error },
}

impl Display for KVGetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KVGetError::DeserializeValueError { key, source } => {
                write!(f, "failed to deserialize {}: {}", key, source)
            }
        }
    }
}

/// Error when trying to write a value into a write batch. The error arises when the value cannot be
/// serialized.
#[derive(Debug)]
pub enum KVSetError {
    SerializeValueError { key: Key, source: std::io::Error },
}

impl Display for KVSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KVSetError::SerializeValueError { key, source } => {
                write!(f, "failed to serialize {}: {}", key, source)
            }
        }
    }
}

#[derive(Debug)]
pub enum Key {
    LastCommittedBlock,
    BlockPvtData { block_num: BlockNum },
    BlockMissingPvtData { block_num: BlockNum },
    MissingPvtDataBlocks,
    ExpiryEntries { expiring_block: BlockNum },
    LastUpdatedOldBlocks,
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            &Key::LastCommittedBlock => write!(f, "Last Committed Block"),
            &Key::BlockPvtData { block_num } => {
                write!(f, "Block Private Data for block {}", block_num)
            }
            &Key::BlockMissingPvtData { block_num } => {
                write!(f, "Block Missing Private Data for block {}", block_num)
            }
            &Key::MissingPvtDataBlocks => write!(f, "Missing Private Data Blocks"),
            &Key::ExpiryEntries { expiring_block } => {
                write!(f, "Expiry Entries for block {}", expiring_block)
            }
            &Key::LastUpdatedOldBlocks => write!(f, "Last Updated Old Blocks"),
        }
    }
}
