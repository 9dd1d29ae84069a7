/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Tiered private data storage.
//!
//! A [`TieredStore`] composes a volatile cache tier and a durable backing tier behind the [`Store`]
//! contract:
//! - Commits go to the cache tier first, then to the backing tier. If the cache tier fails, the
//!   backing tier is not written. If the backing tier fails, the cache tier is left one block ahead
//!   and the error is returned to the caller.
//! - Block reads are served by the cache tier, falling back to the backing tier when the cache has
//!   nothing for the block.
//! - Heights, emptiness, and everything about missing and old-block private data are answered by
//!   the backing tier alone.
//!
//! A [`TieredStoreProvider`] opens the two tiers of a ledger together. Since the cache tier is
//! always empty when opened, the provider sets its height one block behind the backing tier's, so
//! that the next commit re-delivers the backing tier's last block into the cache.

pub mod cache;

pub mod kv_backed;

pub mod provider;

pub mod store;

pub mod tiered;

pub use provider::{new_provider, TieredStoreProvider};
pub use store::{Store, StoreError, StoreProvider};
pub use tiered::TieredStore;
