/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Dissemination plans: who should receive which private payload.

use super::gossip::{NetworkMember, SignedGossipMessage};

/// The peers that a message should be pushed to, and how many of them have to acknowledge it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendCriteria {
    /// Target peers in order of preference.
    pub targets: Vec<NetworkMember>,
    /// Number of acknowledgements required for the push to be considered successful.
    pub min_ack: usize,
    /// Maximum number of peers the message is pushed to.
    pub max_peers: usize,
}

/// A message paired with the criteria for sending it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisseminationPlan {
    pub criteria: SendCriteria,
    pub message: SignedGossipMessage,
}

/// The result of computing the dissemination of a collection's private write-set.
///
/// A new value is computed on every call. It is never cached or mutated after it is returned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisseminationPlans {
    pub plans: Vec<DisseminationPlan>,
    /// Whether the write-set must be filtered out of what the local peer stores, because the local
    /// peer is not authorized to retain a full copy of it.
    pub should_filter: bool,
}

impl DisseminationPlans {
    pub fn new(plans: Vec<DisseminationPlan>, should_filter: bool) -> Self {
        Self {
            plans,
            should_filter,
        }
    }
}
