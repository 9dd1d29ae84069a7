/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Private write-sets, the per-block private data entries that are committed into a
//! [`Store`](crate::pvtdata_store::Store), and the bookkeeping of private data that a block should
//! have carried but didn't.
//!
//! All of the types that the durable tier persists are Borsh-serializable.

use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};

use super::data_types::{BlockNum, TxNum};

/// A single key-value write produced by simulating a transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct KVWrite {
    pub key: String,
    pub is_delete: bool,
    pub value: Vec<u8>,
}

impl KVWrite {
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            is_delete: false,
            value,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_delete: true,
            value: Vec::new(),
        }
    }
}

/// The private writes of one transaction into one collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CollectionPvtReadWriteSet {
    pub collection_name: String,
    pub writes: Vec<KVWrite>,
}

impl CollectionPvtReadWriteSet {
    pub fn new(collection_name: impl Into<String>, writes: Vec<KVWrite>) -> Self {
        Self {
            collection_name: collection_name.into(),
            writes,
        }
    }
}

/// The private writes of one transaction into the collections of one namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NsPvtReadWriteSet {
    pub namespace: String,
    pub collection_pvt_rwset: Vec<CollectionPvtReadWriteSet>,
}

/// All the private writes of one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxPvtReadWriteSet {
    pub ns_pvt_rwset: Vec<NsPvtReadWriteSet>,
}

impl TxPvtReadWriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coll_rwset` under `namespace`, replacing an existing set for the same collection.
    pub fn insert(&mut self, namespace: &str, coll_rwset: CollectionPvtReadWriteSet) {
        let pos = match self
            .ns_pvt_rwset
            .iter()
            .position(|ns_rwset| ns_rwset.namespace == namespace)
        {
            Some(pos) => pos,
            None => {
                self.ns_pvt_rwset.push(NsPvtReadWriteSet {
                    namespace: namespace.to_string(),
                    collection_pvt_rwset: Vec::new(),
                });
                self.ns_pvt_rwset.len() - 1
            }
        };
        let ns_rwset = &mut self.ns_pvt_rwset[pos];

        match ns_rwset
            .collection_pvt_rwset
            .iter_mut()
            .find(|existing| existing.collection_name == coll_rwset.collection_name)
        {
            Some(existing) => *existing = coll_rwset,
            None => ns_rwset.collection_pvt_rwset.push(coll_rwset),
        }
    }

    /// Fold every collection of `other` into this set. Collections present in both are replaced by
    /// `other`'s version.
    pub fn merge(&mut self, other: TxPvtReadWriteSet) {
        for ns_rwset in other.ns_pvt_rwset {
            for coll_rwset in ns_rwset.collection_pvt_rwset {
                self.insert(&ns_rwset.namespace, coll_rwset);
            }
        }
    }

    /// Keep only the collections for which `keep(namespace, collection)` is true. Namespaces left
    /// without collections are dropped.
    pub fn retain_collections(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        for ns_rwset in self.ns_pvt_rwset.iter_mut() {
            let namespace = ns_rwset.namespace.as_str();
            ns_rwset
                .collection_pvt_rwset
                .retain(|coll_rwset| keep(namespace, &coll_rwset.collection_name));
        }
        self.ns_pvt_rwset
            .retain(|ns_rwset| !ns_rwset.collection_pvt_rwset.is_empty());
    }

    /// Iterate through the `(namespace, collection)` pairs written by this set.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ns_pvt_rwset.iter().flat_map(|ns_rwset| {
            ns_rwset
                .collection_pvt_rwset
                .iter()
                .map(move |coll_rwset| (ns_rwset.namespace.as_str(), coll_rwset.collection_name.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ns_pvt_rwset.is_empty()
    }
}

/// The private data of one transaction in a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxPvtData {
    pub seq_in_block: TxNum,
    pub write_set: TxPvtReadWriteSet,
}

impl TxPvtData {
    pub fn new(seq_in_block: TxNum, write_set: TxPvtReadWriteSet) -> Self {
        Self {
            seq_in_block,
            write_set,
        }
    }

    /// Whether this transaction carries private data for `collection` in `namespace`.
    pub fn has(&self, namespace: &str, collection: &str) -> bool {
        self.write_set
            .collections()
            .any(|(ns, coll)| ns == namespace && coll == collection)
    }
}

/// Keep only the collections of `block_pvt_data` for which `keep(namespace, collection)` is true,
/// dropping transactions left without any private data.
pub(crate) fn retain_block_pvt_data(
    block_pvt_data: Vec<TxPvtData>,
    mut keep: impl FnMut(&str, &str) -> bool,
) -> Vec<TxPvtData> {
    block_pvt_data
        .into_iter()
        .filter_map(|mut tx_pvt_data| {
            tx_pvt_data.write_set.retain_collections(&mut keep);
            (!tx_pvt_data.write_set.is_empty()).then_some(tx_pvt_data)
        })
        .collect()
}

/// Merge `incoming` into `block_pvt_data`, transaction by transaction, keeping the result sorted by
/// sequence number.
pub(crate) fn merge_block_pvt_data(block_pvt_data: &mut Vec<TxPvtData>, incoming: Vec<TxPvtData>) {
    for tx_pvt_data in incoming {
        match block_pvt_data
            .iter_mut()
            .find(|existing| existing.seq_in_block == tx_pvt_data.seq_in_block)
        {
            Some(existing) => existing.write_set.merge(tx_pvt_data.write_set),
            None => block_pvt_data.push(tx_pvt_data),
        }
    }
    block_pvt_data.sort_by_key(|tx_pvt_data| tx_pvt_data.seq_in_block);
}

/// A collection whose private data a transaction should have carried but did not.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MissingPvtData {
    pub namespace: String,
    pub collection: String,
    /// Whether this peer is a member of the collection, and therefore should try to fetch the
    /// missing data from other peers.
    pub is_eligible: bool,
}

/// Missing private data of a block being committed, keyed by transaction sequence number.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxMissingPvtDataMap(BTreeMap<TxNum, Vec<MissingPvtData>>);

impl TxMissingPvtDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tx_num: TxNum, namespace: &str, collection: &str, is_eligible: bool) {
        self.0.entry(tx_num).or_default().push(MissingPvtData {
            namespace: namespace.to_string(),
            collection: collection.to_string(),
            is_eligible,
        })
    }

    pub fn get(&self, tx_num: TxNum) -> Option<&Vec<MissingPvtData>> {
        self.0.get(&tx_num)
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, TxNum, Vec<MissingPvtData>> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(
        &mut self,
    ) -> std::collections::btree_map::IterMut<'_, TxNum, Vec<MissingPvtData>> {
        self.0.iter_mut()
    }

    /// Drop entries for which `keep(tx_num, missing)` is false, and transactions left empty.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(TxNum, &MissingPvtData) -> bool) {
        for (tx_num, missing) in self.0.iter_mut() {
            missing.retain(|entry| keep(*tx_num, entry));
        }
        self.0.retain(|_, missing| !missing.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Identifies a collection in a namespace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollectionPvtDataInfo {
    pub namespace: String,
    pub collection: String,
}

/// Eligible missing private data of recent blocks, keyed by block number then transaction number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MissingPvtDataInfo(BTreeMap<BlockNum, BTreeMap<TxNum, Vec<CollectionPvtDataInfo>>>);

impl MissingPvtDataInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, block_num: BlockNum, tx_num: TxNum, namespace: &str, collection: &str) {
        self.0
            .entry(block_num)
            .or_default()
            .entry(tx_num)
            .or_default()
            .push(CollectionPvtDataInfo {
                namespace: namespace.to_string(),
                collection: collection.to_string(),
            })
    }

    pub fn get(&self, block_num: BlockNum) -> Option<&BTreeMap<TxNum, Vec<CollectionPvtDataInfo>>> {
        self.0.get(&block_num)
    }

    /// Numbers of the blocks that have missing private data, in ascending order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockNum> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A set of `(namespace, collection)` pairs that a private data query is restricted to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PvtNsCollFilter(BTreeMap<String, BTreeSet<String>>);

impl PvtNsCollFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, namespace: &str, collection: &str) {
        self.0
            .entry(namespace.to_string())
            .or_default()
            .insert(collection.to_string());
    }

    pub fn has(&self, namespace: &str, collection: &str) -> bool {
        self.0
            .get(namespace)
            .map_or(false, |collections| collections.contains(collection))
    }
}

/// Whether a query restricted by `filter` admits `collection` in `namespace`. `None` admits all.
pub(crate) fn filter_admits(
    filter: Option<&PvtNsCollFilter>,
    namespace: &str,
    collection: &str,
) -> bool {
    filter.map_or(true, |filter| filter.has(namespace, collection))
}
