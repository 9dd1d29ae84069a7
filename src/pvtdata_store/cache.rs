/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The volatile cache tier.
//!
//! A [`CachedStore`] keeps the private data of the `cache_size` most recently committed blocks of a
//! ledger in memory. It has no memory across restarts: every [`CachedStoreProvider::open_store`]
//! returns an empty cache, which the [`TieredStoreProvider`](super::provider::TieredStoreProvider)
//! then bootstraps from the durable tier's height.
//!
//! ## Commit order
//!
//! An empty cache accepts any block. Afterwards it accepts the block following its height, or the
//! block at its height again (a re-delivery, which replaces the cached data of that block).
//!
//! ## Missing data
//!
//! The cache does not track missing private data, nor the list of updated old blocks. The
//! corresponding methods return empty results; the tiered store never routes them here.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use crate::types::{
    btl_policy::{is_expired, BTLPolicy},
    data_types::BlockNum,
    pvt_data::{
        filter_admits, merge_block_pvt_data, retain_block_pvt_data, MissingPvtDataInfo,
        PvtNsCollFilter, TxMissingPvtDataMap, TxPvtData,
    },
};

use super::store::{Store, StoreError, StoreProvider};

pub struct CachedStore {
    ledger_id: String,
    cache_size: usize,
    state: RwLock<CacheState>,
    btl_policy: RwLock<Option<Arc<dyn BTLPolicy>>>,
    provider_closed: Arc<AtomicBool>,
}

#[derive(Default)]
struct CacheState {
    last_committed_block: Option<BlockNum>,
    blocks: BTreeMap<BlockNum, Vec<TxPvtData>>,
}

impl CachedStore {
    /// Create an empty cache for `ledger_id` that keeps up to `cache_size` blocks.
    pub fn new(ledger_id: &str, cache_size: usize) -> Self {
        Self::with_provider_closed(ledger_id, cache_size, Arc::new(AtomicBool::new(false)))
    }

    fn with_provider_closed(
        ledger_id: &str,
        cache_size: usize,
        provider_closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            ledger_id: ledger_id.to_string(),
            cache_size,
            state: RwLock::new(CacheState::default()),
            btl_policy: RwLock::new(None),
            provider_closed,
        }
    }

    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }

    /// Number of blocks whose private data is currently cached.
    pub fn cached_blocks(&self) -> Result<usize, StoreError> {
        Ok(self.read_state()?.blocks.len())
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, CacheState>, StoreError> {
        self.check_open()?;
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, CacheState>, StoreError> {
        self.check_open()?;
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.provider_closed.load(Ordering::Acquire) {
            Err(StoreError::StoreClosed)
        } else {
            Ok(())
        }
    }

    fn btl_policy(&self) -> Result<Option<Arc<dyn BTLPolicy>>, StoreError> {
        Ok(self
            .btl_policy
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }
}

impl Store for CachedStore {
    fn init(&self, btl_policy: Arc<dyn BTLPolicy>) {
        match self.btl_policy.write() {
            Ok(mut policy) => *policy = Some(btl_policy),
            Err(poisoned) => *poisoned.into_inner() = Some(btl_policy),
        }
    }

    fn commit(
        &self,
        block_num: BlockNum,
        pvt_data: &[TxPvtData],
        _missing_pvt_data: &TxMissingPvtDataMap,
    ) -> Result<(), StoreError> {
        let mut state = self.write_state()?;
        if let Some(last_committed_block) = state.last_committed_block {
            if block_num != last_committed_block && block_num != last_committed_block + 1 {
                return Err(StoreError::UnexpectedBlockNumber {
                    expected: last_committed_block + 1,
                    received: block_num,
                });
            }
        }

        if pvt_data.is_empty() {
            state.blocks.remove(&block_num);
        } else {
            state.blocks.insert(block_num, pvt_data.to_vec());
        }
        while state.blocks.len() > self.cache_size {
            let oldest = match state.blocks.keys().next() {
                Some(oldest) => *oldest,
                None => break,
            };
            state.blocks.remove(&oldest);
        }
        state.last_committed_block = Some(block_num);

        Ok(())
    }

    fn init_last_committed_block(&self, block_num: BlockNum) -> Result<(), StoreError> {
        let mut state = self.write_state()?;
        state.blocks.retain(|cached_block, _| *cached_block <= block_num);
        state.last_committed_block = Some(block_num);
        Ok(())
    }

    fn get_pvt_data_by_block_num(
        &self,
        block_num: BlockNum,
        filter: Option<&PvtNsCollFilter>,
    ) -> Result<Vec<TxPvtData>, StoreError> {
        let policy = self.btl_policy()?;
        let state = self.read_state()?;
        let (last_committed_block, block_pvt_data) =
            match (state.last_committed_block, state.blocks.get(&block_num)) {
                (Some(last_committed_block), Some(block_pvt_data)) => {
                    (last_committed_block, block_pvt_data.clone())
                }
                _ => return Ok(Vec::new()),
            };
        drop(state);

        Ok(retain_block_pvt_data(block_pvt_data, |ns, coll| {
            filter_admits(filter, ns, coll)
                && !is_expired(policy.as_deref(), ns, coll, block_num, last_committed_block)
        }))
    }

    fn last_committed_block_height(&self) -> Result<BlockNum, StoreError> {
        Ok(self.read_state()?.last_committed_block.unwrap_or(0))
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read_state()?.last_committed_block.is_none())
    }

    fn shutdown(&self) {
        match self.state.write() {
            Ok(mut state) => *state = CacheState::default(),
            Err(poisoned) => *poisoned.into_inner() = CacheState::default(),
        }
    }

    fn get_missing_pvt_data_info_for_most_recent_blocks(
        &self,
        _max_block: usize,
    ) -> Result<MissingPvtDataInfo, StoreError> {
        Ok(MissingPvtDataInfo::new())
    }

    fn process_colls_eligibility_enabled(
        &self,
        _committing_block: BlockNum,
        _ns_coll_map: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn commit_pvt_data_of_old_blocks(
        &self,
        blocks_pvt_data: BTreeMap<BlockNum, Vec<TxPvtData>>,
    ) -> Result<(), StoreError> {
        // Only blocks that are still cached are updated.
        let mut state = self.write_state()?;
        for (block_num, pvt_data) in blocks_pvt_data {
            if let Some(block_pvt_data) = state.blocks.get_mut(&block_num) {
                merge_block_pvt_data(block_pvt_data, pvt_data);
            }
        }
        Ok(())
    }

    fn get_last_updated_old_blocks_pvt_data(
        &self,
    ) -> Result<BTreeMap<BlockNum, Vec<TxPvtData>>, StoreError> {
        Ok(BTreeMap::new())
    }

    fn reset_last_updated_old_blocks_list(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Opens a fresh [`CachedStore`] for every ledger. Closing the provider closes every store it
/// opened.
pub struct CachedStoreProvider {
    cache_size: usize,
    closed: Arc<AtomicBool>,
}

impl CachedStoreProvider {
    pub fn new(cache_size: usize) -> Self {
        Self {
            cache_size,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl StoreProvider for CachedStoreProvider {
    type Store = CachedStore;

    fn open_store(&self, ledger_id: &str) -> Result<CachedStore, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::ProviderClosed);
        }
        Ok(CachedStore::with_provider_closed(
            ledger_id,
            self.cache_size,
            self.closed.clone(),
        ))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release)
    }
}
