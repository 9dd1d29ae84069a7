//! Builders for the private data used across tests.

use pvtdata_rs::types::{
    data_types::TxNum,
    pvt_data::{CollectionPvtReadWriteSet, KVWrite, TxPvtData, TxPvtReadWriteSet},
};

/// Private data of transaction `seq_in_block` that writes `key` = `value` into each
/// `(namespace, collection)` in `collections`.
pub(crate) fn tx_pvt_data(
    seq_in_block: TxNum,
    collections: &[(&str, &str)],
    key: &str,
    value: &[u8],
) -> TxPvtData {
    let mut write_set = TxPvtReadWriteSet::new();
    for (namespace, collection) in collections {
        write_set.insert(
            namespace,
            CollectionPvtReadWriteSet::new(*collection, vec![KVWrite::new(key, value.to_vec())]),
        );
    }
    TxPvtData::new(seq_in_block, write_set)
}

/// Private data of a block with a single transaction (number 0) writing `key` = `value` into
/// `collection` of `namespace`.
pub(crate) fn single_tx_block(namespace: &str, collection: &str, key: &str, value: &[u8]) -> Vec<TxPvtData> {
    vec![tx_pvt_data(0, &[(namespace, collection)], key, value)]
}

/// The `(namespace, collection)` pairs of `block_pvt_data`, in order.
pub(crate) fn collections_of(block_pvt_data: &[TxPvtData]) -> Vec<(u64, String, String)> {
    block_pvt_data
        .iter()
        .flat_map(|tx_pvt_data| {
            tx_pvt_data
                .write_set
                .collections()
                .map(move |(ns, coll)| (tx_pvt_data.seq_in_block, ns.to_string(), coll.to_string()))
        })
        .collect()
}
