/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! User-defined parameters of the private data store provider.
//!
//! The configuration is defined using the builder pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .cache_size(128)
//!     .purge_interval(100)
//!     .log_events(true)
//!     .build()
//! ```

use typed_builder::TypedBuilder;

/// Stores the user-defined parameters of a [`TieredStoreProvider`](crate::pvtdata_store::provider::TieredStoreProvider),
/// that is:
/// 1. The cache size, which is the number of most recent blocks whose private data the cache tier
///    keeps in memory. Reads of older blocks fall back to the durable tier.
/// 2. The purge interval, which is the number of blocks between two sweeps of the durable tier for
///    data that expired according to the block-to-live policy. Expired data is never returned by
///    reads, whether or not it has been purged yet.
/// 3. The "Log Events" flag, if set to "true" then store events are logged.
///
/// ## Log Events
///
/// This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Optional:
    - `.cache_size(...)`
    - `.purge_interval(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(
        default = 128,
        setter(doc = "Set the number of recent blocks kept by the cache tier. Defaults to 128.")
    )]
    pub cache_size: usize,
    #[builder(
        default = 100,
        setter(doc = "Set the number of blocks between two purges of expired data. 0 is treated as 1. Defaults to 100.")
    )]
    pub purge_interval: u64,
    #[builder(default = false, setter(doc = "Enable logging? Defaults to false."))]
    pub log_events: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}
