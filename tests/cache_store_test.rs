use std::{collections::BTreeMap, sync::Arc};

use pvtdata_rs::{
    pvtdata_store::{
        cache::{CachedStore, CachedStoreProvider},
        Store, StoreError, StoreProvider,
    },
    types::{
        btl_policy::{BTLPolicy, MapBTLPolicy},
        collection::{CollectionConfig, CollectionType, StaticCollectionConfig},
        pvt_data::{PvtNsCollFilter, TxMissingPvtDataMap},
    },
};

mod common;

use common::fixtures::{collections_of, single_tx_block, tx_pvt_data};

fn commit_value(store: &CachedStore, block_num: u64, value: &[u8]) -> Result<(), StoreError> {
    store.commit(
        block_num,
        &single_tx_block("ns1", "coll1", "key1", value),
        &TxMissingPvtDataMap::new(),
    )
}

/// An empty cache accepts any block. Afterwards it accepts the next block, or the last one again.
#[test]
fn commit_order_test() {
    let store = CachedStore::new("ledger1", 10);
    assert!(store.is_empty().unwrap());

    commit_value(&store, 5, b"a").unwrap();
    commit_value(&store, 6, b"b").unwrap();
    commit_value(&store, 6, b"c").unwrap();
    assert_eq!(
        store.get_pvt_data_by_block_num(6, None).unwrap(),
        single_tx_block("ns1", "coll1", "key1", b"c")
    );

    match commit_value(&store, 8, b"d") {
        Err(StoreError::UnexpectedBlockNumber { expected, received }) => {
            assert_eq!(expected, 7);
            assert_eq!(received, 8);
        }
        _ => panic!("expected an unexpected block number error"),
    }
    assert_eq!(store.last_committed_block_height().unwrap(), 6);
}

/// Only the most recent `cache_size` blocks are kept.
#[test]
fn eviction_test() {
    let store = CachedStore::new("ledger1", 2);

    for block_num in 0..5 {
        commit_value(&store, block_num, b"value").unwrap();
    }

    assert_eq!(store.cached_blocks().unwrap(), 2);
    assert!(store.get_pvt_data_by_block_num(2, None).unwrap().is_empty());
    assert!(!store.get_pvt_data_by_block_num(3, None).unwrap().is_empty());
    assert!(!store.get_pvt_data_by_block_num(4, None).unwrap().is_empty());
}

/// Setting the height is always accepted, and drops cached blocks above the new height.
#[test]
fn init_last_committed_block_test() {
    let store = CachedStore::new("ledger1", 10);
    commit_value(&store, 0, b"a").unwrap();
    commit_value(&store, 1, b"b").unwrap();

    store.init_last_committed_block(0).unwrap();

    assert_eq!(store.last_committed_block_height().unwrap(), 0);
    assert!(store.get_pvt_data_by_block_num(1, None).unwrap().is_empty());
    commit_value(&store, 1, b"c").unwrap();
    assert_eq!(store.last_committed_block_height().unwrap(), 1);
}

/// Data stops being returned once its expiring block is committed. Collections without a
/// block-to-live live forever.
#[test]
fn expiry_test() {
    let store = CachedStore::new("ledger1", 10);
    let mut policy = MapBTLPolicy::new();
    policy.set("ns1", "coll1", 1);
    store.init(Arc::new(policy));

    store
        .commit(
            0,
            &[tx_pvt_data(0, &[("ns1", "coll1"), ("ns1", "coll2")], "key1", b"value")],
            &TxMissingPvtDataMap::new(),
        )
        .unwrap();
    commit_value(&store, 1, b"value").unwrap();
    assert_eq!(
        collections_of(&store.get_pvt_data_by_block_num(0, None).unwrap()).len(),
        2
    );

    commit_value(&store, 2, b"value").unwrap();
    assert_eq!(
        collections_of(&store.get_pvt_data_by_block_num(0, None).unwrap()),
        vec![(0, "ns1".to_string(), "coll2".to_string())]
    );
}

/// The block-to-live of each collection can be taken from the namespace's collection
/// configurations.
#[test]
fn expiry_from_collection_configs_test() {
    let configs = [
        CollectionConfig::new(StaticCollectionConfig {
            name: "coll1".to_string(),
            collection_type: CollectionType::Private,
            block_to_live: 1,
            ..Default::default()
        }),
        CollectionConfig::new(StaticCollectionConfig {
            name: "coll2".to_string(),
            collection_type: CollectionType::Private,
            ..Default::default()
        }),
        CollectionConfig::default(),
    ];
    let policy = MapBTLPolicy::from_collection_configs("ns1", &configs);
    assert_eq!(policy.btl("ns1", "coll1"), 1);
    assert_eq!(policy.btl("ns1", "coll2"), 0);
    assert_eq!(policy.btl("ns2", "coll1"), 0);

    let store = CachedStore::new("ledger1", 10);
    store.init(Arc::new(policy));
    store
        .commit(
            0,
            &[tx_pvt_data(0, &[("ns1", "coll1"), ("ns1", "coll2")], "key1", b"value")],
            &TxMissingPvtDataMap::new(),
        )
        .unwrap();
    commit_value(&store, 1, b"value").unwrap();
    commit_value(&store, 2, b"value").unwrap();

    assert_eq!(
        collections_of(&store.get_pvt_data_by_block_num(0, None).unwrap()),
        vec![(0, "ns1".to_string(), "coll2".to_string())]
    );
}

#[test]
fn filter_test() {
    let store = CachedStore::new("ledger1", 10);
    store
        .commit(
            0,
            &[
                tx_pvt_data(0, &[("ns1", "coll1")], "key1", b"value"),
                tx_pvt_data(1, &[("ns2", "coll1")], "key1", b"value"),
            ],
            &TxMissingPvtDataMap::new(),
        )
        .unwrap();

    let mut filter = PvtNsCollFilter::new();
    filter.add("ns2", "coll1");

    assert_eq!(
        collections_of(&store.get_pvt_data_by_block_num(0, Some(&filter)).unwrap()),
        vec![(1, "ns2".to_string(), "coll1".to_string())]
    );
}

/// Old block data is merged into blocks that are still cached, and ignored otherwise.
#[test]
fn commit_pvt_data_of_old_blocks_test() {
    let store = CachedStore::new("ledger1", 1);
    commit_value(&store, 0, b"value").unwrap();
    commit_value(&store, 1, b"value").unwrap();

    store
        .commit_pvt_data_of_old_blocks(BTreeMap::from([
            (0, vec![tx_pvt_data(1, &[("ns1", "coll2")], "key2", b"late")]),
            (1, vec![tx_pvt_data(1, &[("ns1", "coll2")], "key2", b"late")]),
        ]))
        .unwrap();

    assert!(store.get_pvt_data_by_block_num(0, None).unwrap().is_empty());
    assert_eq!(
        collections_of(&store.get_pvt_data_by_block_num(1, None).unwrap()),
        vec![
            (0, "ns1".to_string(), "coll1".to_string()),
            (1, "ns1".to_string(), "coll2".to_string()),
        ]
    );
}

#[test]
fn shutdown_test() {
    let store = CachedStore::new("ledger1", 10);
    commit_value(&store, 0, b"value").unwrap();

    store.shutdown();

    assert!(store.is_empty().unwrap());
    assert_eq!(store.cached_blocks().unwrap(), 0);
}

#[test]
fn provider_test() {
    let provider = CachedStoreProvider::new(4);

    let store = provider.open_store("ledger1").unwrap();
    assert_eq!(store.ledger_id(), "ledger1");
    assert!(store.is_empty().unwrap());

    commit_value(&store, 0, b"value").unwrap();

    provider.close();
    assert!(matches!(
        provider.open_store("ledger2"),
        Err(StoreError::ProviderClosed)
    ));
    // Stores opened before the provider was closed are closed with it.
    assert!(matches!(commit_value(&store, 1, b"value"), Err(StoreError::StoreClosed)));
    assert!(matches!(
        store.get_pvt_data_by_block_num(0, None),
        Err(StoreError::StoreClosed)
    ));
}
