//! Recording test doubles of [`Store`] and [`StoreProvider`].
//!
//! Every call is appended to a [`Journal`] shared by all doubles of a test, as `"<name>.<method>"`
//! or `"<name>.<method>(<block>)"`, so that tests can assert on both call counts and the order of
//! calls across tiers.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use pvtdata_rs::{
    pvtdata_store::{Store, StoreError, StoreProvider},
    types::{
        btl_policy::BTLPolicy,
        data_types::BlockNum,
        pvt_data::{MissingPvtDataInfo, PvtNsCollFilter, TxMissingPvtDataMap, TxPvtData},
    },
};

#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn new() -> Journal {
        Journal::default()
    }

    pub(crate) fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry)
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Number of recorded calls that start with `prefix`.
    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear()
    }
}

/// A store that keeps blocks in memory, records every call, and fails on demand.
pub(crate) struct MockStore {
    name: String,
    journal: Journal,
    height: Mutex<Option<BlockNum>>,
    blocks: Mutex<BTreeMap<BlockNum, Vec<TxPvtData>>>,
    fail_commit: AtomicBool,
    fail_init_last_committed_block: AtomicBool,
    fail_reads: AtomicBool,
    on_init: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl MockStore {
    pub(crate) fn new(name: &str, journal: Journal) -> MockStore {
        MockStore {
            name: name.to_string(),
            journal,
            height: Mutex::new(None),
            blocks: Mutex::new(BTreeMap::new()),
            fail_commit: AtomicBool::new(false),
            fail_init_last_committed_block: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            on_init: Mutex::new(None),
        }
    }

    pub(crate) fn with_height(self, height: BlockNum) -> MockStore {
        *self.height.lock().unwrap() = Some(height);
        self
    }

    pub(crate) fn with_block(self, block_num: BlockNum, pvt_data: Vec<TxPvtData>) -> MockStore {
        self.blocks.lock().unwrap().insert(block_num, pvt_data);
        self
    }

    pub(crate) fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst)
    }

    pub(crate) fn fail_init_last_committed_block(&self, fail: bool) {
        self.fail_init_last_committed_block.store(fail, Ordering::SeqCst)
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst)
    }

    /// Run `hook` once, the next time `init` is called.
    pub(crate) fn on_init(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_init.lock().unwrap() = Some(Box::new(hook));
    }

    /// The height of this store without going through [`Store`], so that nothing is recorded.
    pub(crate) fn height(&self) -> Option<BlockNum> {
        *self.height.lock().unwrap()
    }

    fn record(&self, method: &str) {
        self.journal.record(format!("{}.{}", self.name, method))
    }

    fn record_block(&self, method: &str, block_num: BlockNum) {
        self.journal
            .record(format!("{}.{}({})", self.name, method, block_num))
    }

    fn failure(&self, method: &str) -> StoreError {
        StoreError::Backend(format!("{} failed to {}", self.name, method))
    }
}

impl Store for MockStore {
    fn init(&self, _btl_policy: Arc<dyn BTLPolicy>) {
        self.record("init");
        let hook = self.on_init.lock().unwrap().take();
        if let Some(hook) = hook {
            hook()
        }
    }

    fn commit(
        &self,
        block_num: BlockNum,
        pvt_data: &[TxPvtData],
        _missing_pvt_data: &TxMissingPvtDataMap,
    ) -> Result<(), StoreError> {
        self.record_block("commit", block_num);
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(self.failure("commit"));
        }
        if !pvt_data.is_empty() {
            self.blocks
                .lock()
                .unwrap()
                .insert(block_num, pvt_data.to_vec());
        }
        *self.height.lock().unwrap() = Some(block_num);
        Ok(())
    }

    fn init_last_committed_block(&self, block_num: BlockNum) -> Result<(), StoreError> {
        self.record_block("init_last_committed_block", block_num);
        if self.fail_init_last_committed_block.load(Ordering::SeqCst) {
            return Err(self.failure("init_last_committed_block"));
        }
        *self.height.lock().unwrap() = Some(block_num);
        Ok(())
    }

    fn get_pvt_data_by_block_num(
        &self,
        block_num: BlockNum,
        _filter: Option<&PvtNsCollFilter>,
    ) -> Result<Vec<TxPvtData>, StoreError> {
        self.record_block("get_pvt_data_by_block_num", block_num);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(self.failure("get_pvt_data_by_block_num"));
        }
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&block_num)
            .cloned()
            .unwrap_or_default())
    }

    fn last_committed_block_height(&self) -> Result<BlockNum, StoreError> {
        self.record("last_committed_block_height");
        Ok(self.height().unwrap_or(0))
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        self.record("is_empty");
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(self.failure("is_empty"));
        }
        Ok(self.height().is_none())
    }

    fn shutdown(&self) {
        self.record("shutdown")
    }

    fn get_missing_pvt_data_info_for_most_recent_blocks(
        &self,
        _max_block: usize,
    ) -> Result<MissingPvtDataInfo, StoreError> {
        self.record("get_missing_pvt_data_info_for_most_recent_blocks");
        Ok(MissingPvtDataInfo::new())
    }

    fn process_colls_eligibility_enabled(
        &self,
        committing_block: BlockNum,
        _ns_coll_map: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), StoreError> {
        self.record_block("process_colls_eligibility_enabled", committing_block);
        Ok(())
    }

    fn commit_pvt_data_of_old_blocks(
        &self,
        _blocks_pvt_data: BTreeMap<BlockNum, Vec<TxPvtData>>,
    ) -> Result<(), StoreError> {
        self.record("commit_pvt_data_of_old_blocks");
        Ok(())
    }

    fn get_last_updated_old_blocks_pvt_data(
        &self,
    ) -> Result<BTreeMap<BlockNum, Vec<TxPvtData>>, StoreError> {
        self.record("get_last_updated_old_blocks_pvt_data");
        Ok(BTreeMap::new())
    }

    fn reset_last_updated_old_blocks_list(&self) -> Result<(), StoreError> {
        self.record("reset_last_updated_old_blocks_list");
        Ok(())
    }
}

/// Opens [`MockStore`]s that all start at the same height, recording calls into one journal.
pub(crate) struct MockStoreProvider {
    name: String,
    journal: Journal,
    height: Option<BlockNum>,
    pub(crate) fail_open: AtomicBool,
    pub(crate) fail_reads: AtomicBool,
    pub(crate) fail_init_last_committed_block: AtomicBool,
}

impl MockStoreProvider {
    /// A provider of empty stores.
    pub(crate) fn new(name: &str, journal: Journal) -> MockStoreProvider {
        MockStoreProvider {
            name: name.to_string(),
            journal,
            height: None,
            fail_open: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_init_last_committed_block: AtomicBool::new(false),
        }
    }

    /// A provider of stores whose last committed block is `height`.
    pub(crate) fn with_height(name: &str, journal: Journal, height: BlockNum) -> MockStoreProvider {
        MockStoreProvider {
            height: Some(height),
            ..MockStoreProvider::new(name, journal)
        }
    }
}

impl StoreProvider for MockStoreProvider {
    type Store = MockStore;

    fn open_store(&self, ledger_id: &str) -> Result<MockStore, StoreError> {
        self.journal
            .record(format!("{}.open_store({})", self.name, ledger_id));
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!(
                "{} failed to open {}",
                self.name, ledger_id
            )));
        }

        let store = MockStore::new(&self.name, self.journal.clone());
        let store = match self.height {
            Some(height) => store.with_height(height),
            None => store,
        };
        store.fail_reads(self.fail_reads.load(Ordering::SeqCst));
        store.fail_init_last_committed_block(
            self.fail_init_last_committed_block.load(Ordering::SeqCst),
        );
        Ok(store)
    }

    fn close(&self) {
        self.journal.record(format!("{}.close", self.name))
    }
}
