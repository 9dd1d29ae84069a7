/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the store provider's
//! [configuration](crate::config::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least three values. The first three values
//! are always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//! 3. The ID of the ledger whose store emitted the event.
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [BootstrapCache](crate::events::BootstrapCacheEvent) is printed:
//!
//! ```text
//! BootstrapCache, 1701329264, mychannel, 10, 9
//! ```
//!
//! In the snippet, the fourth value is the height of the durable tier and the fifth value is the
//! height the cache tier was initialized to.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const OPEN_STORE: &str = "OpenStore";
pub const BOOTSTRAP_CACHE: &str = "BootstrapCache";
pub const COMMIT_PVT_DATA: &str = "CommitPvtData";
pub const CACHE_MISS: &str = "CacheMiss";
pub const PURGE_EXPIRED: &str = "PurgeExpired";
pub const SHUTDOWN_STORE: &str = "ShutdownStore";

// Debug-level messages that are not tied to a store:
pub const COMPUTE_DISSEMINATION_PLAN: &str = "ComputeDisseminationPlan";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for OpenStoreEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |open_store_event: &OpenStoreEvent| {
            log::info!(
                "{}, {}, {}",
                OPEN_STORE,
                secs_since_unix_epoch(open_store_event.timestamp),
                open_store_event.ledger_id
            )
        };
        Box::new(logger)
    }
}

impl Logger for BootstrapCacheEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |bootstrap_cache_event: &BootstrapCacheEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                BOOTSTRAP_CACHE,
                secs_since_unix_epoch(bootstrap_cache_event.timestamp),
                bootstrap_cache_event.ledger_id,
                bootstrap_cache_event.backing_height,
                bootstrap_cache_event.cache_height
            )
        };
        Box::new(logger)
    }
}

impl Logger for CommitPvtDataEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |commit_pvt_data_event: &CommitPvtDataEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                COMMIT_PVT_DATA,
                secs_since_unix_epoch(commit_pvt_data_event.timestamp),
                commit_pvt_data_event.ledger_id,
                commit_pvt_data_event.block_num,
                commit_pvt_data_event.tx_count
            )
        };
        Box::new(logger)
    }
}

impl Logger for CacheMissEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |cache_miss_event: &CacheMissEvent| {
            log::info!(
                "{}, {}, {}, {}",
                CACHE_MISS,
                secs_since_unix_epoch(cache_miss_event.timestamp),
                cache_miss_event.ledger_id,
                cache_miss_event.block_num
            )
        };
        Box::new(logger)
    }
}

impl Logger for PurgeExpiredEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |purge_expired_event: &PurgeExpiredEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                PURGE_EXPIRED,
                secs_since_unix_epoch(purge_expired_event.timestamp),
                purge_expired_event.ledger_id,
                purge_expired_event.block_num,
                purge_expired_event.purged_collections
            )
        };
        Box::new(logger)
    }
}

impl Logger for ShutdownStoreEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |shutdown_store_event: &ShutdownStoreEvent| {
            log::info!(
                "{}, {}, {}",
                SHUTDOWN_STORE,
                secs_since_unix_epoch(shutdown_store_event.timestamp),
                shutdown_store_event.ledger_id
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Clocks set before the Unix Epoch are logged as 0.
fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
