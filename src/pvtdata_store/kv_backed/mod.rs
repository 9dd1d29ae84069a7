/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The durable tier of the private data store.
//!
//! The durable tier persists private data into a key-value store provided by the user. The user
//! plugs in their storage engine of choice by implementing the [`KVStore`], [`KVGet`], and
//! [`WriteBatch`] traits. Since every key is prefixed with the [ledger prefix](variables::ledger_prefix),
//! the stores of many ledgers can share a single key-value store.
//!
//! The layout of the persisted variables is documented in [`variables`].
//!
//! ## Expiry
//!
//! Whenever a block is committed, every collection it writes (or misses) with a non-zero
//! block-to-live is indexed under the block whose commit expires it. Commits of blocks whose number
//! is a multiple of the configured purge interval sweep the index and physically delete the expired
//! collections. Reads never return expired data, whether or not it has been purged yet.

pub mod pluggables;

pub mod store;

pub mod variables;

pub mod write_batch;

pub use pluggables::{KVGet, KVStore, WriteBatch};
pub use store::{KVPvtDataStore, KVPvtDataStoreProvider};
