/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Opens [`TieredStore`]s and bootstraps their cache tier.

use std::time::SystemTime;

use crate::{
    config::Configuration,
    events::{emit, BootstrapCacheEvent, OpenStoreEvent},
};

use super::{
    cache::CachedStoreProvider,
    kv_backed::{pluggables::KVStore, store::KVPvtDataStoreProvider},
    store::{Store, StoreError, StoreProvider},
    tiered::TieredStore,
};

/// Opens the tiered stores of many ledgers from a provider of backing tiers `B` and a provider of
/// cache tiers `C`.
pub struct TieredStoreProvider<B: StoreProvider, C: StoreProvider> {
    backing_provider: B,
    cache_provider: C,
    log_events: bool,
}

impl<B: StoreProvider, C: StoreProvider> TieredStoreProvider<B, C> {
    pub fn new(backing_provider: B, cache_provider: C, log_events: bool) -> Self {
        Self {
            backing_provider,
            cache_provider,
            log_events,
        }
    }

    /// Set the cache tier's height one block behind the height `H` of a non-empty backing tier, so
    /// that the next commit feeds block `H` into the cache tier again.
    fn bootstrap_cache(
        &self,
        ledger_id: &str,
        cache: &C::Store,
        backing: &B::Store,
    ) -> Result<(), StoreError> {
        if backing.is_empty()? {
            return Ok(());
        }

        let backing_height = backing.last_committed_block_height()?;
        // A backing tier holding only block 0 has nothing to feed back.
        if let Some(cache_height) = backing_height.checked_sub(1) {
            cache.init_last_committed_block(cache_height)?;
            emit(
                self.log_events,
                BootstrapCacheEvent {
                    timestamp: SystemTime::now(),
                    ledger_id: ledger_id.to_string(),
                    backing_height,
                    cache_height,
                },
            );
        }
        Ok(())
    }
}

impl<B: StoreProvider, C: StoreProvider> StoreProvider for TieredStoreProvider<B, C> {
    type Store = TieredStore<C::Store, B::Store>;

    fn open_store(&self, ledger_id: &str) -> Result<Self::Store, StoreError> {
        let backing = self.backing_provider.open_store(ledger_id)?;
        let cache = match self.cache_provider.open_store(ledger_id) {
            Ok(cache) => cache,
            Err(err) => {
                backing.shutdown();
                return Err(err);
            }
        };

        if let Err(err) = self.bootstrap_cache(ledger_id, &cache, &backing) {
            cache.shutdown();
            backing.shutdown();
            return Err(err);
        }

        emit(
            self.log_events,
            OpenStoreEvent {
                timestamp: SystemTime::now(),
                ledger_id: ledger_id.to_string(),
            },
        );
        Ok(TieredStore::new(ledger_id, cache, backing, self.log_events))
    }

    fn close(&self) {
        self.backing_provider.close();
        self.cache_provider.close();
    }
}

/// Create a [`TieredStoreProvider`] whose stores keep the most recent blocks in memory and persist
/// every block into `kv_store`.
pub fn new_provider<K: KVStore>(
    configuration: &Configuration,
    kv_store: K,
) -> TieredStoreProvider<KVPvtDataStoreProvider<K>, CachedStoreProvider> {
    TieredStoreProvider::new(
        KVPvtDataStoreProvider::new(kv_store, configuration),
        CachedStoreProvider::new(configuration.cache_size),
        configuration.log_events,
    )
}
