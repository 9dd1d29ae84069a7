/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Private data handling for the peers of a permissioned ledger.
//!
//! This crate provides two services:
//! 1. [Dissemination](dissemination): choosing which peers receive the private write-set of a
//!    collection, according to the collection's type.
//! 2. [Storage](pvtdata_store): a private data store made of a volatile cache tier over a durable
//!    tier persisted in a user-provided key-value store.
//!
//! ## Opening a store
//!
//! ```ignore
//! let provider = pvtdata_rs::pvtdata_store::new_provider(&Configuration::default(), kv_store);
//! let store = provider.open_store("mychannel")?;
//! store.init(Arc::new(btl_policy));
//! store.commit(0, &pvt_data, &TxMissingPvtDataMap::new())?;
//! ```

pub mod config;

pub mod dissemination;

pub mod events;

pub mod logging;

pub mod pvtdata_store;

pub mod types;
