/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Selection of the strategy used to disseminate a collection's private write-set to other peers.
//!
//! When a transaction writes into a private data collection, the endorsing peer has to push the
//! write-set to other authorized peers over gossip. How the target peers are chosen depends on the
//! type of the collection. The [`DisseminationPlanner`]:
//! 1. [Classifies](classifier::collection_kind) the collection's configuration into a
//!    [`CollectionKind`], failing on configurations that are missing or declare an unsupported type.
//! 2. Dispatches to exactly one [strategy](strategies):
//!    - Transient collections → the [`TransientDataStrategy`].
//!    - Off-ledger collections → the [`OffLedgerStrategy`], which is also passed the static collection
//!      configuration, since off-ledger targeting depends on its peer counts.
//!    - DCAS collections → the same [`OffLedgerStrategy`].
//! 3. Returns the strategy's result verbatim.
//!
//! The planner itself does no I/O and keeps no state between calls. The strategies are supplied at
//! construction, which is also how tests exercise the dispatch logic without a gossip network.
//!
//! ## Example
//!
//! ```ignore
//! let planner = DisseminationPlanner::new(DefaultTransientDataStrategy, DefaultOffLedgerStrategy);
//! let DisseminationPlans { plans, should_filter } = planner.compute_dissemination_plan(
//!     "mychannel",
//!     "mycc",
//!     &rw_set,
//!     &col_config,
//!     &access_policy,
//!     &signed_msg,
//!     &gossip,
//! )?;
//! ```

pub mod classifier;

pub mod gossip;

pub mod plan;

pub mod strategies;

use std::fmt::{self, Display, Formatter};

use crate::logging::{first_seven_base64_chars, COMPUTE_DISSEMINATION_PLAN};
use crate::types::{collection::CollectionConfig, pvt_data::CollectionPvtReadWriteSet};

pub use classifier::{collection_kind, CollectionKind, ConfigurationError};
use gossip::{CollectionAccessPolicy, GossipAdapter, SignedGossipMessage};
pub use plan::{DisseminationPlan, DisseminationPlans, SendCriteria};
pub use strategies::{
    DefaultOffLedgerStrategy, DefaultTransientDataStrategy, OffLedgerStrategy,
    TransientDataStrategy,
};

/// Computes dissemination plans by dispatching to the strategy that matches a collection's kind.
pub struct DisseminationPlanner<T: TransientDataStrategy, O: OffLedgerStrategy> {
    transient_data_strategy: T,
    off_ledger_strategy: O,
}

impl<T: TransientDataStrategy, O: OffLedgerStrategy> DisseminationPlanner<T, O> {
    /// Create a planner that uses `transient_data_strategy` for transient collections and
    /// `off_ledger_strategy` for off-ledger and DCAS collections.
    pub fn new(transient_data_strategy: T, off_ledger_strategy: O) -> Self {
        Self {
            transient_data_strategy,
            off_ledger_strategy,
        }
    }

    /// Compute the dissemination plans for `rw_set`, written into the collection configured by
    /// `col_config` in `namespace` of `channel_id`.
    ///
    /// # Errors
    ///
    /// - [`DisseminationError::Configuration`] if `col_config` has no static payload or declares an
    ///   unsupported collection type. No strategy is invoked in this case.
    /// - Whatever error the selected strategy returns, unchanged.
    pub fn compute_dissemination_plan(
        &self,
        channel_id: &str,
        namespace: &str,
        rw_set: &CollectionPvtReadWriteSet,
        col_config: &CollectionConfig,
        col_ap: &dyn CollectionAccessPolicy,
        pvt_data_msg: &SignedGossipMessage,
        gossip: &dyn GossipAdapter,
    ) -> Result<DisseminationPlans, DisseminationError> {
        let kind = collection_kind(col_config)?;
        log::debug!(
            "{}, {}, {}, {}, {}, {}",
            COMPUTE_DISSEMINATION_PLAN,
            channel_id,
            namespace,
            rw_set.collection_name,
            kind,
            first_seven_base64_chars(&pvt_data_msg.signature)
        );

        match kind {
            CollectionKind::Transient => self.transient_data_strategy.compute_plan(
                channel_id,
                namespace,
                rw_set,
                col_ap,
                pvt_data_msg,
                gossip,
            ),
            CollectionKind::OffLedger | CollectionKind::Dcas => {
                let static_config = classifier::static_config(col_config)?;
                self.off_ledger_strategy.compute_plan(
                    channel_id,
                    namespace,
                    rw_set,
                    static_config,
                    col_ap,
                    pvt_data_msg,
                    gossip,
                )
            }
        }
    }
}

/// Error when computing a dissemination plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisseminationError {
    /// The collection's configuration cannot be disseminated.
    Configuration(ConfigurationError),

    /// Fewer peers are eligible to receive the collection's data than the collection requires.
    InsufficientPeers {
        collection: String,
        required: usize,
        available: usize,
    },
}

impl Display for DisseminationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DisseminationError::Configuration(err) => Display::fmt(err, f),
            DisseminationError::InsufficientPeers {
                collection,
                required,
                available,
            } => write!(
                f,
                "required {} peers for collection [{}] but only {} are eligible",
                required, collection, available
            ),
        }
    }
}

impl std::error::Error for DisseminationError {}

impl From<ConfigurationError> for DisseminationError {
    fn from(value: ConfigurationError) -> Self {
        DisseminationError::Configuration(value)
    }
}
