/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The capability contract shared by every private data store: the cache tier, the durable tier,
//! and the [`TieredStore`](super::tiered::TieredStore) that composes them.

use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use crate::types::{
    btl_policy::BTLPolicy,
    data_types::BlockNum,
    pvt_data::{MissingPvtDataInfo, PvtNsCollFilter, TxMissingPvtDataMap, TxPvtData},
};

use super::kv_backed::pluggables::{KVGetError, KVSetError};

/// Stores the private data of the blocks of one ledger.
///
/// The "height" of a store is the number of the last block committed into it. Every method may block
/// on I/O. Implementations synchronize internally, so a store can be shared between threads, but
/// callers must not have more than one `commit` in flight on the same store.
pub trait Store: Send + Sync {
    /// Set the block-to-live policy used to expire committed data.
    fn init(&self, btl_policy: Arc<dyn BTLPolicy>);

    /// Commit the private data of block `block_num`, together with the private data the block
    /// should have carried but didn't.
    fn commit(
        &self,
        block_num: BlockNum,
        pvt_data: &[TxPvtData],
        missing_pvt_data: &TxMissingPvtDataMap,
    ) -> Result<(), StoreError>;

    /// Set the height of the store to `block_num` without committing any data.
    fn init_last_committed_block(&self, block_num: BlockNum) -> Result<(), StoreError>;

    /// Get the unexpired private data of block `block_num`, restricted to `filter` if given.
    fn get_pvt_data_by_block_num(
        &self,
        block_num: BlockNum,
        filter: Option<&PvtNsCollFilter>,
    ) -> Result<Vec<TxPvtData>, StoreError>;

    /// Get the number of the last committed block, or 0 if the store is empty.
    fn last_committed_block_height(&self) -> Result<BlockNum, StoreError>;

    /// Whether no block has ever been committed into the store.
    fn is_empty(&self) -> Result<bool, StoreError>;

    fn shutdown(&self);

    /// Get the eligible missing private data of the `max_block` most recent blocks that have any.
    fn get_missing_pvt_data_info_for_most_recent_blocks(
        &self,
        max_block: usize,
    ) -> Result<MissingPvtDataInfo, StoreError>;

    /// Mark the missing private data of the collections in `ns_coll_map` (namespace to collection
    /// names) as eligible, for blocks up to `committing_block`. Called when the local peer becomes a
    /// member of those collections.
    fn process_colls_eligibility_enabled(
        &self,
        committing_block: BlockNum,
        ns_coll_map: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), StoreError>;

    /// Commit private data that was missing from already committed blocks.
    fn commit_pvt_data_of_old_blocks(
        &self,
        blocks_pvt_data: BTreeMap<BlockNum, Vec<TxPvtData>>,
    ) -> Result<(), StoreError>;

    /// Get the private data of the old blocks updated by the last
    /// [`commit_pvt_data_of_old_blocks`](Self::commit_pvt_data_of_old_blocks) calls.
    fn get_last_updated_old_blocks_pvt_data(
        &self,
    ) -> Result<BTreeMap<BlockNum, Vec<TxPvtData>>, StoreError>;

    /// Forget the list of old blocks updated by the last
    /// [`commit_pvt_data_of_old_blocks`](Self::commit_pvt_data_of_old_blocks) calls.
    fn reset_last_updated_old_blocks_list(&self) -> Result<(), StoreError>;
}

/// Opens the [`Store`]s of individual ledgers.
pub trait StoreProvider: Send + Sync {
    type Store: Store;

    /// Open the store of `ledger_id`, creating it if it does not exist.
    fn open_store(&self, ledger_id: &str) -> Result<Self::Store, StoreError>;

    /// Release the resources held by this provider. Stores cannot be opened afterwards, and the
    /// stores it opened fail with [`StoreError::StoreClosed`].
    fn close(&self);
}

/// Error returned by a [`Store`] or a [`StoreProvider`].
#[derive(Debug)]
pub enum StoreError {
    /// A block was committed out of order.
    UnexpectedBlockNumber {
        expected: BlockNum,
        received: BlockNum,
    },

    /// A block beyond the last committed block was requested.
    OutOfRange {
        requested: BlockNum,
        last_committed: BlockNum,
    },

    /// The height of a store that already has committed blocks cannot be initialized.
    NotEmpty { last_committed: BlockNum },

    /// Error when reading a value from the key-value store under the durable tier.
    KVGetError(KVGetError),

    /// Error when writing a value into the key-value store under the durable tier.
    KVSetError(KVSetError),

    /// A thread panicked while holding a lock of the store.
    LockPoisoned,

    /// The store was used after it was shut down.
    StoreClosed,

    /// A store was opened after its provider was closed.
    ProviderClosed,

    /// Error reported by a storage engine outside of this crate.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnexpectedBlockNumber { expected, received } => write!(
                f,
                "expected block number={}, received block number={}",
                expected, received
            ),
            StoreError::OutOfRange {
                requested,
                last_committed,
            } => write!(
                f,
                "last committed block number [{}] is lower than the requested block number [{}]",
                last_committed, requested
            ),
            StoreError::NotEmpty { last_committed } => write!(
                f,
                "the private data store is not empty, last committed block number [{}]",
                last_committed
            ),
            StoreError::KVGetError(err) => write!(f, "{}", err),
            StoreError::KVSetError(err) => write!(f, "{}", err),
            StoreError::LockPoisoned => write!(f, "private data store lock poisoned"),
            StoreError::StoreClosed => write!(f, "private data store is shut down"),
            StoreError::ProviderClosed => write!(f, "private data store provider is closed"),
            StoreError::Backend(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<KVGetError> for StoreError {
    fn from(value: KVGetError) -> Self {
        StoreError::KVGetError(value)
    }
}

impl From<KVSetError> for StoreError {
    fn from(value: KVSetError) -> Self {
        StoreError::KVSetError(value)
    }
}
