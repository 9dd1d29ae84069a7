/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by the private data store.
//!
//! Note: an event for a given action indicates that the action has been completed. Events are only
//! logged if [`Configuration::log_events`](crate::config::Configuration::log_events) is set.

use std::time::SystemTime;

use crate::logging::Logger;
use crate::types::data_types::BlockNum;

pub struct OpenStoreEvent {
    pub timestamp: SystemTime,
    pub ledger_id: String,
}

/// The cache tier of a freshly opened store was set one block behind the durable tier.
pub struct BootstrapCacheEvent {
    pub timestamp: SystemTime,
    pub ledger_id: String,
    pub backing_height: BlockNum,
    pub cache_height: BlockNum,
}

pub struct CommitPvtDataEvent {
    pub timestamp: SystemTime,
    pub ledger_id: String,
    pub block_num: BlockNum,
    pub tx_count: usize,
}

/// A read found nothing in the cache tier and fell back to the durable tier.
pub struct CacheMissEvent {
    pub timestamp: SystemTime,
    pub ledger_id: String,
    pub block_num: BlockNum,
}

pub struct PurgeExpiredEvent {
    pub timestamp: SystemTime,
    pub ledger_id: String,
    pub block_num: BlockNum,
    pub purged_collections: usize,
}

pub struct ShutdownStoreEvent {
    pub timestamp: SystemTime,
    pub ledger_id: String,
}

/// Log `event` with its default logger if `log_events` is set.
pub(crate) fn emit<E: Logger>(log_events: bool, event: E) {
    if log_events {
        E::get_logger()(&event)
    }
}
