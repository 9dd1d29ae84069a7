/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each variable of the durable tier is stored in the
//! user-provided key-value store.
//!
//! # List of variables
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Last Committed Block|[`BlockNum`](crate::types::data_types::BlockNum)|The number of the last committed block. Not set while the store is empty.|
//! |Block Private Data|`BlockNum` -> `Vec<TxPvtData>`|The private data of every block that carried any, minus the collections that were purged.|
//! |Block Missing Private Data|`BlockNum` -> [`TxMissingPvtDataMap`](crate::types::pvt_data::TxMissingPvtDataMap)|The private data each block should have carried but didn't, until it is committed as old block data or purged.|
//! |Missing Private Data Blocks|`BTreeSet<BlockNum>`|The blocks that have an entry in Block Missing Private Data.|
//! |Expiry Entries|`BlockNum` -> `Vec<`[`ExpiryEntry`](super::pluggables::ExpiryEntry)`>`|The collections whose data expires when the keyed block is committed.|
//! |Last Updated Old Blocks|`BTreeSet<BlockNum>`|The blocks updated by old block commits since the list was last reset.|
//!
//! # Persistence of variables
//!
//! Each variable is stored as a **Borsh-serialized value**. Keys are formed by concatenating:
//! 1. The [ledger prefix](ledger_prefix) of the store's ledger, so that the stores of many ledgers
//!    can share one key-value store.
//! 2. The one-byte constant sharing the variable's name.
//! 3. For mappings, the big-endian bytes of the block number, so that keys of one mapping sort in
//!    block order.

use crate::types::data_types::BlockNum;

// Variables
pub const LAST_COMMITTED_BLOCK: [u8; 1] = [0];
pub const BLOCK_PVT_DATA: [u8; 1] = [1];
pub const BLOCK_MISSING_PVT_DATA: [u8; 1] = [2];
pub const MISSING_PVT_DATA_BLOCKS: [u8; 1] = [3];
pub const EXPIRY_ENTRIES: [u8; 1] = [4];
pub const LAST_UPDATED_OLD_BLOCKS: [u8; 1] = [5];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}

/// The prefix of every key of `ledger_id`'s store: the length of the ledger ID as a big-endian `u32`
/// followed by its bytes. Length-prefixing keeps the key spaces of, e.g., `ch` and `ch1` disjoint.
pub fn ledger_prefix(ledger_id: &str) -> Vec<u8> {
    concat(&(ledger_id.len() as u32).to_be_bytes(), ledger_id.as_bytes())
}

/// The key of the single value `variable` of the ledger with prefix `ledger`.
pub(crate) fn single_key(ledger: &[u8], variable: &[u8]) -> Vec<u8> {
    concat(ledger, variable)
}

/// The key of the entry of mapping `variable` for `block_num`, in the ledger with prefix `ledger`.
pub(crate) fn block_key(ledger: &[u8], variable: &[u8], block_num: BlockNum) -> Vec<u8> {
    concat(&concat(ledger, variable), &block_num.to_be_bytes())
}
