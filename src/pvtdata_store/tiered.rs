/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A [`Store`] composed of a cache tier and a backing tier.
//!
//! ## Lifecycle
//!
//! A tiered store starts out uninitialized, becomes initialized when [`Store::init`] sets its
//! block-to-live policy, and ends when [`Store::shutdown`] is called. Calls made before `init` are
//! served, but neither tier expires data until a policy is set. Any call made after `shutdown`
//! panics: a shut down store has released its tiers, so such a call can only be a bug in the caller.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::SystemTime,
};

use crate::{
    events::{emit, CacheMissEvent, CommitPvtDataEvent, ShutdownStoreEvent},
    types::{
        btl_policy::BTLPolicy,
        data_types::BlockNum,
        pvt_data::{MissingPvtDataInfo, PvtNsCollFilter, TxMissingPvtDataMap, TxPvtData},
    },
};

use super::store::{Store, StoreError};

const UNINITIALIZED: u8 = 0;
const INITIALIZED: u8 = 1;
const SHUT_DOWN: u8 = 2;

/// Exclusively owns the cache tier `C` and the backing tier `B` of one ledger.
///
/// Commits write through the cache tier into the backing tier. Reads are served by the cache tier
/// and fall back to the backing tier when the cache tier has nothing for the requested block.
/// Everything else is the backing tier's business.
pub struct TieredStore<C: Store, B: Store> {
    ledger_id: String,
    cache: C,
    backing: B,
    log_events: bool,
    state: AtomicU8,
}

impl<C: Store, B: Store> TieredStore<C, B> {
    pub fn new(ledger_id: &str, cache: C, backing: B, log_events: bool) -> Self {
        Self {
            ledger_id: ledger_id.to_string(),
            cache,
            backing,
            log_events,
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    /// Whether [`Store::init`] has set a block-to-live policy on both tiers.
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == INITIALIZED
    }

    fn assert_not_shut_down(&self, operation: &str) {
        if self.state.load(Ordering::Acquire) == SHUT_DOWN {
            panic!(
                "Programming error: {} called on the private data store of ledger {} after shutdown",
                operation, self.ledger_id
            )
        }
    }
}

impl<C: Store, B: Store> Store for TieredStore<C, B> {
    fn init(&self, btl_policy: Arc<dyn BTLPolicy>) {
        self.assert_not_shut_down("init");
        self.cache.init(btl_policy.clone());
        self.backing.init(btl_policy);
        if self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state != SHUT_DOWN).then_some(INITIALIZED)
            })
            .is_err()
        {
            panic!(
                "Programming error: the private data store of ledger {} was shut down during init",
                self.ledger_id
            )
        }
    }

    fn commit(
        &self,
        block_num: BlockNum,
        pvt_data: &[TxPvtData],
        missing_pvt_data: &TxMissingPvtDataMap,
    ) -> Result<(), StoreError> {
        self.assert_not_shut_down("commit");
        self.cache.commit(block_num, pvt_data, missing_pvt_data)?;
        // A failure here leaves the cache tier one block ahead of the backing tier.
        self.backing.commit(block_num, pvt_data, missing_pvt_data)?;

        emit(
            self.log_events,
            CommitPvtDataEvent {
                timestamp: SystemTime::now(),
                ledger_id: self.ledger_id.clone(),
                block_num,
                tx_count: pvt_data.len(),
            },
        );
        Ok(())
    }

    fn init_last_committed_block(&self, block_num: BlockNum) -> Result<(), StoreError> {
        self.assert_not_shut_down("init_last_committed_block");
        self.cache.init_last_committed_block(block_num)?;
        self.backing.init_last_committed_block(block_num)
    }

    fn get_pvt_data_by_block_num(
        &self,
        block_num: BlockNum,
        filter: Option<&PvtNsCollFilter>,
    ) -> Result<Vec<TxPvtData>, StoreError> {
        self.assert_not_shut_down("get_pvt_data_by_block_num");
        let cached = self.cache.get_pvt_data_by_block_num(block_num, filter)?;
        if !cached.is_empty() {
            return Ok(cached);
        }

        emit(
            self.log_events,
            CacheMissEvent {
                timestamp: SystemTime::now(),
                ledger_id: self.ledger_id.clone(),
                block_num,
            },
        );
        self.backing.get_pvt_data_by_block_num(block_num, filter)
    }

    fn last_committed_block_height(&self) -> Result<BlockNum, StoreError> {
        self.assert_not_shut_down("last_committed_block_height");
        self.backing.last_committed_block_height()
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        self.assert_not_shut_down("is_empty");
        self.backing.is_empty()
    }

    fn shutdown(&self) {
        if self.state.swap(SHUT_DOWN, Ordering::AcqRel) == SHUT_DOWN {
            panic!(
                "Programming error: the private data store of ledger {} was shut down twice",
                self.ledger_id
            )
        }
        self.cache.shutdown();
        self.backing.shutdown();

        emit(
            self.log_events,
            ShutdownStoreEvent {
                timestamp: SystemTime::now(),
                ledger_id: self.ledger_id.clone(),
            },
        );
    }

    fn get_missing_pvt_data_info_for_most_recent_blocks(
        &self,
        max_block: usize,
    ) -> Result<MissingPvtDataInfo, StoreError> {
        self.assert_not_shut_down("get_missing_pvt_data_info_for_most_recent_blocks");
        self.backing
            .get_missing_pvt_data_info_for_most_recent_blocks(max_block)
    }

    fn process_colls_eligibility_enabled(
        &self,
        committing_block: BlockNum,
        ns_coll_map: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), StoreError> {
        self.assert_not_shut_down("process_colls_eligibility_enabled");
        self.backing
            .process_colls_eligibility_enabled(committing_block, ns_coll_map)
    }

    fn commit_pvt_data_of_old_blocks(
        &self,
        blocks_pvt_data: BTreeMap<BlockNum, Vec<TxPvtData>>,
    ) -> Result<(), StoreError> {
        self.assert_not_shut_down("commit_pvt_data_of_old_blocks");
        self.backing.commit_pvt_data_of_old_blocks(blocks_pvt_data)
    }

    fn get_last_updated_old_blocks_pvt_data(
        &self,
    ) -> Result<BTreeMap<BlockNum, Vec<TxPvtData>>, StoreError> {
        self.assert_not_shut_down("get_last_updated_old_blocks_pvt_data");
        self.backing.get_last_updated_old_blocks_pvt_data()
    }

    fn reset_last_updated_old_blocks_list(&self) -> Result<(), StoreError> {
        self.assert_not_shut_down("reset_last_updated_old_blocks_list");
        self.backing.reset_last_updated_old_blocks_list()
    }
}
