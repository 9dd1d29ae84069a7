/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The durable tier: a [`Store`] kept in a user-provided [`KVStore`].

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, RwLock,
    },
    time::SystemTime,
};

use crate::{
    config::Configuration,
    events::{emit, PurgeExpiredEvent},
    types::{
        btl_policy::{is_expired, BTLPolicy},
        data_types::BlockNum,
        pvt_data::{
            filter_admits, merge_block_pvt_data, retain_block_pvt_data, MissingPvtDataInfo,
            PvtNsCollFilter, TxMissingPvtDataMap, TxPvtData,
        },
    },
};

use super::{
    pluggables::{ExpiryEntry, KVGet, KVStore},
    variables::ledger_prefix,
    write_batch::PvtDataWriteBatch,
};
use crate::pvtdata_store::store::{Store, StoreError, StoreProvider};

/// The private data store of one ledger, persisted into a key-value store that may be shared with
/// the stores of other ledgers.
///
/// Every commit is applied as a single atomic write batch: the block's private data, its missing
/// private data, the expiry index entries of its collections, the collections purged by the commit,
/// and the new last committed block all become visible together.
///
/// Every method that writes holds the ledger's write lock from its first read to its write, so
/// block commits, old block commits and eligibility updates never overwrite each other's
/// bookkeeping. Stores of the same ledger opened by one [`KVPvtDataStoreProvider`] share that lock.
pub struct KVPvtDataStore<K: KVStore> {
    ledger_id: String,
    ledger: Vec<u8>,
    kv_store: K,
    purge_interval: u64,
    log_events: bool,
    btl_policy: RwLock<Option<Arc<dyn BTLPolicy>>>,
    write_lock: Arc<Mutex<()>>,
    closed: AtomicBool,
    provider_closed: Arc<AtomicBool>,
}

impl<K: KVStore> KVPvtDataStore<K> {
    pub fn new(ledger_id: &str, kv_store: K, purge_interval: u64, log_events: bool) -> Self {
        Self::with_shared_state(
            ledger_id,
            kv_store,
            purge_interval,
            log_events,
            Arc::new(Mutex::new(())),
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn with_shared_state(
        ledger_id: &str,
        kv_store: K,
        purge_interval: u64,
        log_events: bool,
        write_lock: Arc<Mutex<()>>,
        provider_closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            ledger_id: ledger_id.to_string(),
            ledger: ledger_prefix(ledger_id),
            kv_store,
            purge_interval: purge_interval.max(1),
            log_events,
            btl_policy: RwLock::new(None),
            write_lock,
            closed: AtomicBool::new(false),
            provider_closed,
        }
    }

    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) || self.provider_closed.load(Ordering::Acquire) {
            Err(StoreError::StoreClosed)
        } else {
            Ok(())
        }
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn btl_policy(&self) -> Result<Option<Arc<dyn BTLPolicy>>, StoreError> {
        Ok(self
            .btl_policy
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }

    fn last_committed_block(&self) -> Result<Option<BlockNum>, StoreError> {
        Ok(self.kv_store.last_committed_block(&self.ledger)?)
    }

    fn write(&self, wb: PvtDataWriteBatch<K::WriteBatch>) {
        let mut kv_store = self.kv_store.clone();
        kv_store.write(wb.into_inner())
    }

    /// Index each `(block_num, namespace, collection)` under the block whose commit expires the
    /// collection's data in `block_num`.
    fn index_expiring_collections<'a>(
        &self,
        wb: &mut PvtDataWriteBatch<K::WriteBatch>,
        policy: &dyn BTLPolicy,
        collections: impl Iterator<Item = (BlockNum, &'a str, &'a str)>,
    ) -> Result<(), StoreError> {
        let collections: BTreeSet<(BlockNum, &str, &str)> = collections.collect();
        let mut new_entries: BTreeMap<BlockNum, Vec<ExpiryEntry>> = BTreeMap::new();
        for (block_num, namespace, collection) in collections {
            if let Some(expiring_block) = policy.expiring_block(namespace, collection, block_num) {
                new_entries.entry(expiring_block).or_default().push(ExpiryEntry {
                    block_num,
                    namespace: namespace.to_string(),
                    collection: collection.to_string(),
                });
            }
        }

        for (expiring_block, entries) in new_entries {
            let mut expiry_entries = self.kv_store.expiry_entries(&self.ledger, expiring_block)?;
            for entry in entries {
                if !expiry_entries.contains(&entry) {
                    expiry_entries.push(entry);
                }
            }
            wb.set_expiry_entries(expiring_block, &expiry_entries)?;
        }

        Ok(())
    }

    /// Remove the collections that expire with the blocks in `(committing_block - purge_interval,
    /// committing_block]` from the block private data and missing private data they were indexed
    /// under. Returns the number of purged collections.
    fn purge_expired(
        &self,
        wb: &mut PvtDataWriteBatch<K::WriteBatch>,
        committing_block: BlockNum,
        missing_pvt_data_blocks: &mut BTreeSet<BlockNum>,
    ) -> Result<usize, StoreError> {
        let first_expiring_block = committing_block.saturating_sub(self.purge_interval) + 1;
        let mut purged_blocks: BTreeMap<BlockNum, Vec<TxPvtData>> = BTreeMap::new();
        let mut purged_missing: BTreeMap<BlockNum, TxMissingPvtDataMap> = BTreeMap::new();
        let mut purged_collections = 0;

        for expiring_block in first_expiring_block..=committing_block {
            let expiry_entries = self.kv_store.expiry_entries(&self.ledger, expiring_block)?;
            if expiry_entries.is_empty() {
                continue;
            }

            for entry in expiry_entries {
                let is_expiring =
                    |ns: &str, coll: &str| ns == entry.namespace && coll == entry.collection;

                let block_pvt_data = match purged_blocks.remove(&entry.block_num) {
                    Some(block_pvt_data) => block_pvt_data,
                    None => self
                        .kv_store
                        .block_pvt_data(&self.ledger, entry.block_num)?
                        .unwrap_or_default(),
                };
                purged_blocks.insert(
                    entry.block_num,
                    retain_block_pvt_data(block_pvt_data, |ns, coll| !is_expiring(ns, coll)),
                );

                if missing_pvt_data_blocks.contains(&entry.block_num) {
                    if !purged_missing.contains_key(&entry.block_num) {
                        let missing = self
                            .kv_store
                            .block_missing_pvt_data(&self.ledger, entry.block_num)?
                            .unwrap_or_default();
                        purged_missing.insert(entry.block_num, missing);
                    }
                    if let Some(missing) = purged_missing.get_mut(&entry.block_num) {
                        missing.retain(|_, missing| {
                            !is_expiring(&missing.namespace, &missing.collection)
                        });
                    }
                }

                purged_collections += 1;
            }
            wb.delete_expiry_entries(expiring_block);
        }

        for (block_num, block_pvt_data) in purged_blocks {
            if block_pvt_data.is_empty() {
                wb.delete_block_pvt_data(block_num);
            } else {
                wb.set_block_pvt_data(block_num, &block_pvt_data)?;
            }
        }
        for (block_num, missing) in purged_missing {
            if missing.is_empty() {
                wb.delete_block_missing_pvt_data(block_num);
                missing_pvt_data_blocks.remove(&block_num);
            } else {
                wb.set_block_missing_pvt_data(block_num, &missing)?;
            }
        }

        Ok(purged_collections)
    }
}

impl<K: KVStore> Store for KVPvtDataStore<K> {
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
        missing_pvt_data: &TxMissingPvtDataMap,
    ) -> Result<(), StoreError> {
        self.check_open()?;
        let _writing = self.lock_writes()?;
        let expected = match self.last_committed_block()? {
            None => 0,
            // Re-delivery of the last committed block replaces its data.
            Some(last_committed_block) if block_num == last_committed_block => block_num,
            Some(last_committed_block) => last_committed_block + 1,
        };
        if block_num != expected {
            return Err(StoreError::UnexpectedBlockNumber {
                expected,
                received: block_num,
            });
        }

        let mut wb = PvtDataWriteBatch::new(&self.ledger);

        if pvt_data.is_empty() {
            wb.delete_block_pvt_data(block_num);
        } else {
            wb.set_block_pvt_data(block_num, pvt_data)?;
        }

        let mut missing_pvt_data_blocks = self.kv_store.missing_pvt_data_blocks(&self.ledger)?;
        if missing_pvt_data.is_empty() {
            wb.delete_block_missing_pvt_data(block_num);
            missing_pvt_data_blocks.remove(&block_num);
        } else {
            wb.set_block_missing_pvt_data(block_num, missing_pvt_data)?;
            missing_pvt_data_blocks.insert(block_num);
        }

        if let Some(policy) = self.btl_policy()? {
            let written = pvt_data
                .iter()
                .flat_map(|tx_pvt_data| tx_pvt_data.write_set.collections());
            let missed = missing_pvt_data.iter().flat_map(|(_, tx_missing)| {
                tx_missing
                    .iter()
                    .map(|missing| (missing.namespace.as_str(), missing.collection.as_str()))
            });
            let collections = written.chain(missed).map(|(ns, coll)| (block_num, ns, coll));
            self.index_expiring_collections(&mut wb, policy.as_ref(), collections)?;
        }

        let mut purged_collections = 0;
        if block_num % self.purge_interval == 0 {
            purged_collections =
                self.purge_expired(&mut wb, block_num, &mut missing_pvt_data_blocks)?;
        }

        wb.set_missing_pvt_data_blocks(&missing_pvt_data_blocks)?;
        wb.set_last_committed_block(block_num)?;
        self.write(wb);

        if purged_collections > 0 {
            emit(
                self.log_events,
                PurgeExpiredEvent {
                    timestamp: SystemTime::now(),
                    ledger_id: self.ledger_id.clone(),
                    block_num,
                    purged_collections,
                },
            );
        }

        Ok(())
    }

    fn init_last_committed_block(&self, block_num: BlockNum) -> Result<(), StoreError> {
        self.check_open()?;
        let _writing = self.lock_writes()?;
        if let Some(last_committed) = self.last_committed_block()? {
            return Err(StoreError::NotEmpty { last_committed });
        }

        let mut wb = PvtDataWriteBatch::new(&self.ledger);
        wb.set_last_committed_block(block_num)?;
        self.write(wb);
        Ok(())
    }

    fn get_pvt_data_by_block_num(
        &self,
        block_num: BlockNum,
        filter: Option<&PvtNsCollFilter>,
    ) -> Result<Vec<TxPvtData>, StoreError> {
        self.check_open()?;
        let last_committed = match self.last_committed_block()? {
            None => return Ok(Vec::new()),
            Some(last_committed) => last_committed,
        };
        if block_num > last_committed {
            return Err(StoreError::OutOfRange {
                requested: block_num,
                last_committed,
            });
        }

        let policy = self.btl_policy()?;
        let block_pvt_data = self
            .kv_store
            .block_pvt_data(&self.ledger, block_num)?
            .unwrap_or_default();
        Ok(retain_block_pvt_data(block_pvt_data, |ns, coll| {
            filter_admits(filter, ns, coll)
                && !is_expired(policy.as_deref(), ns, coll, block_num, last_committed)
        }))
    }

    fn last_committed_block_height(&self) -> Result<BlockNum, StoreError> {
        self.check_open()?;
        Ok(self.last_committed_block()?.unwrap_or(0))
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        self.check_open()?;
        Ok(self.last_committed_block()?.is_none())
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release)
    }

    fn get_missing_pvt_data_info_for_most_recent_blocks(
        &self,
        max_block: usize,
    ) -> Result<MissingPvtDataInfo, StoreError> {
        self.check_open()?;
        let mut missing_pvt_data_info = MissingPvtDataInfo::new();
        let last_committed = match self.last_committed_block()? {
            None => return Ok(missing_pvt_data_info),
            Some(last_committed) => last_committed,
        };
        let policy = self.btl_policy()?;

        for block_num in self
            .kv_store
            .missing_pvt_data_blocks(&self.ledger)?
            .into_iter()
            .rev()
        {
            if missing_pvt_data_info.len() >= max_block {
                break;
            }
            let block_missing = match self.kv_store.block_missing_pvt_data(&self.ledger, block_num)? {
                Some(block_missing) => block_missing,
                None => continue,
            };
            for (tx_num, tx_missing) in block_missing.iter() {
                for missing in tx_missing.iter().filter(|missing| {
                    missing.is_eligible
                        && !is_expired(
                            policy.as_deref(),
                            &missing.namespace,
                            &missing.collection,
                            block_num,
                            last_committed,
                        )
                }) {
                    missing_pvt_data_info.add(
                        block_num,
                        *tx_num,
                        &missing.namespace,
                        &missing.collection,
                    );
                }
            }
        }

        Ok(missing_pvt_data_info)
    }

    fn process_colls_eligibility_enabled(
        &self,
        committing_block: BlockNum,
        ns_coll_map: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), StoreError> {
        self.check_open()?;
        let enabled = |namespace: &str, collection: &str| {
            ns_coll_map
                .get(namespace)
                .map_or(false, |collections| collections.iter().any(|coll| coll == collection))
        };

        let _writing = self.lock_writes()?;
        let mut wb = PvtDataWriteBatch::new(&self.ledger);
        let missing_pvt_data_blocks = self.kv_store.missing_pvt_data_blocks(&self.ledger)?;
        for block_num in missing_pvt_data_blocks.range(..=committing_block) {
            let mut block_missing =
                match self.kv_store.block_missing_pvt_data(&self.ledger, *block_num)? {
                    Some(block_missing) => block_missing,
                    None => continue,
                };

            let mut changed = false;
            for (_, tx_missing) in block_missing.iter_mut() {
                for missing in tx_missing
                    .iter_mut()
                    .filter(|missing| !missing.is_eligible && enabled(&missing.namespace, &missing.collection))
                {
                    missing.is_eligible = true;
                    changed = true;
                }
            }
            if changed {
                wb.set_block_missing_pvt_data(*block_num, &block_missing)?;
            }
        }

        self.write(wb);
        Ok(())
    }

    fn commit_pvt_data_of_old_blocks(
        &self,
        blocks_pvt_data: BTreeMap<BlockNum, Vec<TxPvtData>>,
    ) -> Result<(), StoreError> {
        self.check_open()?;
        let _writing = self.lock_writes()?;
        let last_committed = self.last_committed_block()?;
        for block_num in blocks_pvt_data.keys() {
            match last_committed {
                Some(last_committed) if *block_num <= last_committed => (),
                _ => {
                    return Err(StoreError::OutOfRange {
                        requested: *block_num,
                        last_committed: last_committed.unwrap_or(0),
                    })
                }
            }
        }
        let last_committed = match last_committed {
            Some(last_committed) => last_committed,
            None => return Ok(()),
        };

        let policy = self.btl_policy()?;
        let mut wb = PvtDataWriteBatch::new(&self.ledger);
        let mut missing_pvt_data_blocks = self.kv_store.missing_pvt_data_blocks(&self.ledger)?;
        let mut last_updated_old_blocks = self.kv_store.last_updated_old_blocks(&self.ledger)?;

        // Data that has already expired is dropped instead of being stored.
        let blocks_pvt_data: BTreeMap<BlockNum, Vec<TxPvtData>> = blocks_pvt_data
            .into_iter()
            .map(|(block_num, pvt_data)| {
                let pvt_data = retain_block_pvt_data(pvt_data, |ns, coll| {
                    !is_expired(policy.as_deref(), ns, coll, block_num, last_committed)
                });
                (block_num, pvt_data)
            })
            .filter(|(_, pvt_data)| !pvt_data.is_empty())
            .collect();

        if let Some(policy) = &policy {
            let collections = blocks_pvt_data.iter().flat_map(|(block_num, pvt_data)| {
                pvt_data.iter().flat_map(move |tx_pvt_data| {
                    tx_pvt_data
                        .write_set
                        .collections()
                        .map(move |(ns, coll)| (*block_num, ns, coll))
                })
            });
            self.index_expiring_collections(&mut wb, policy.as_ref(), collections)?;
        }

        for (block_num, pvt_data) in blocks_pvt_data {
            if missing_pvt_data_blocks.contains(&block_num) {
                let mut missing = self
                    .kv_store
                    .block_missing_pvt_data(&self.ledger, block_num)?
                    .unwrap_or_default();
                missing.retain(|tx_num, missing| {
                    !pvt_data.iter().any(|tx_pvt_data| {
                        tx_pvt_data.seq_in_block == tx_num
                            && tx_pvt_data.has(&missing.namespace, &missing.collection)
                    })
                });
                if missing.is_empty() {
                    wb.delete_block_missing_pvt_data(block_num);
                    missing_pvt_data_blocks.remove(&block_num);
                } else {
                    wb.set_block_missing_pvt_data(block_num, &missing)?;
                }
            }

            let mut block_pvt_data = self
                .kv_store
                .block_pvt_data(&self.ledger, block_num)?
                .unwrap_or_default();
            merge_block_pvt_data(&mut block_pvt_data, pvt_data);
            wb.set_block_pvt_data(block_num, &block_pvt_data)?;
            last_updated_old_blocks.insert(block_num);
        }

        wb.set_missing_pvt_data_blocks(&missing_pvt_data_blocks)?;
        wb.set_last_updated_old_blocks(&last_updated_old_blocks)?;
        self.write(wb);
        Ok(())
    }

    fn get_last_updated_old_blocks_pvt_data(
        &self,
    ) -> Result<BTreeMap<BlockNum, Vec<TxPvtData>>, StoreError> {
        self.check_open()?;
        let mut blocks_pvt_data = BTreeMap::new();
        for block_num in self.kv_store.last_updated_old_blocks(&self.ledger)? {
            blocks_pvt_data.insert(block_num, self.get_pvt_data_by_block_num(block_num, None)?);
        }
        Ok(blocks_pvt_data)
    }

    fn reset_last_updated_old_blocks_list(&self) -> Result<(), StoreError> {
        self.check_open()?;
        let _writing = self.lock_writes()?;
        let mut wb = PvtDataWriteBatch::new(&self.ledger);
        wb.delete_last_updated_old_blocks();
        self.write(wb);
        Ok(())
    }
}

/// Opens [`KVPvtDataStore`]s that share one key-value store, each in the key space of its ledger.
///
/// Closing the provider closes every store it opened.
pub struct KVPvtDataStoreProvider<K: KVStore> {
    kv_store: K,
    purge_interval: u64,
    log_events: bool,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    closed: Arc<AtomicBool>,
}

impl<K: KVStore> KVPvtDataStoreProvider<K> {
    pub fn new(kv_store: K, configuration: &Configuration) -> Self {
        Self {
            kv_store,
            purge_interval: configuration.purge_interval,
            log_events: configuration.log_events,
            write_locks: Mutex::new(HashMap::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<K: KVStore> StoreProvider for KVPvtDataStoreProvider<K> {
    type Store = KVPvtDataStore<K>;

    fn open_store(&self, ledger_id: &str) -> Result<KVPvtDataStore<K>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::ProviderClosed);
        }
        let write_lock = self
            .write_locks
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .entry(ledger_id.to_string())
            .or_default()
            .clone();
        Ok(KVPvtDataStore::with_shared_state(
            ledger_id,
            self.kv_store.clone(),
            self.purge_interval,
            self.log_events,
            write_lock,
            self.closed.clone(),
        ))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release)
    }
}
