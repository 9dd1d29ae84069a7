/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable strategies for computing the dissemination plan of each kind of collection, and the
//! default implementations of those strategies.
//!
//! A [`DisseminationPlanner`](super::DisseminationPlanner) is constructed with one
//! [`TransientDataStrategy`] and one [`OffLedgerStrategy`]. Off-ledger strategies are also used for
//! DCAS collections.
//!
//! ## Default strategies
//!
//! Both default strategies target the alive peers of the channel that belong to one of the
//! collection's member organizations, excluding the local peer. They differ in how the targets are
//! ordered and where the peer counts come from:
//! - [`DefaultTransientDataStrategy`] ranks peers by a SHA256 hash of the written keys and the
//!   peer's PKI ID, so that data written under the same keys is always pushed to the same peers. Peer
//!   counts come from the access policy.
//! - [`DefaultOffLedgerStrategy`] orders peers randomly. Peer counts come from the static collection
//!   configuration.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

use crate::types::{collection::StaticCollectionConfig, pvt_data::CollectionPvtReadWriteSet};

use super::{
    gossip::{CollectionAccessPolicy, GossipAdapter, NetworkMember, SignedGossipMessage},
    plan::{DisseminationPlan, DisseminationPlans, SendCriteria},
    DisseminationError,
};

pub trait TransientDataStrategy: Send + Sync {
    /// Compute the dissemination plan of `rw_set`, written into a transient data collection of
    /// `namespace` in `channel_id`.
    fn compute_plan(
        &self,
        channel_id: &str,
        namespace: &str,
        rw_set: &CollectionPvtReadWriteSet,
        col_ap: &dyn CollectionAccessPolicy,
        pvt_data_msg: &SignedGossipMessage,
        gossip: &dyn GossipAdapter,
    ) -> Result<DisseminationPlans, DisseminationError>;
}

pub trait OffLedgerStrategy: Send + Sync {
    /// Compute the dissemination plan of `rw_set`, written into an off-ledger (or DCAS) collection of
    /// `namespace` in `channel_id` that is configured by `col_config`.
    fn compute_plan(
        &self,
        channel_id: &str,
        namespace: &str,
        rw_set: &CollectionPvtReadWriteSet,
        col_config: &StaticCollectionConfig,
        col_ap: &dyn CollectionAccessPolicy,
        pvt_data_msg: &SignedGossipMessage,
        gossip: &dyn GossipAdapter,
    ) -> Result<DisseminationPlans, DisseminationError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTransientDataStrategy;

impl TransientDataStrategy for DefaultTransientDataStrategy {
    fn compute_plan(
        &self,
        channel_id: &str,
        namespace: &str,
        rw_set: &CollectionPvtReadWriteSet,
        col_ap: &dyn CollectionAccessPolicy,
        pvt_data_msg: &SignedGossipMessage,
        gossip: &dyn GossipAdapter,
    ) -> Result<DisseminationPlans, DisseminationError> {
        let member_orgs = col_ap.member_orgs();
        let local_peer = gossip.self_membership_info();
        let mut targets = eligible_peers(channel_id, &member_orgs, &local_peer, gossip);

        let key_material = key_material(channel_id, namespace, rw_set);
        targets.sort_by_cached_key(|peer| {
            let mut hasher = Sha256::new();
            hasher.update(&key_material);
            hasher.update(peer.pki_id.bytes());
            hasher.finalize().to_vec()
        });

        plan(
            &rw_set.collection_name,
            targets,
            col_ap.required_peer_count(),
            col_ap.maximum_peer_count(),
            pvt_data_msg,
            !member_orgs.contains(&local_peer.msp_id),
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultOffLedgerStrategy;

impl OffLedgerStrategy for DefaultOffLedgerStrategy {
    fn compute_plan(
        &self,
        channel_id: &str,
        _namespace: &str,
        rw_set: &CollectionPvtReadWriteSet,
        col_config: &StaticCollectionConfig,
        col_ap: &dyn CollectionAccessPolicy,
        pvt_data_msg: &SignedGossipMessage,
        gossip: &dyn GossipAdapter,
    ) -> Result<DisseminationPlans, DisseminationError> {
        let member_orgs = col_ap.member_orgs();
        let local_peer = gossip.self_membership_info();
        let mut targets = eligible_peers(channel_id, &member_orgs, &local_peer, gossip);
        targets.shuffle(&mut rand::thread_rng());

        plan(
            &rw_set.collection_name,
            targets,
            col_config.required_peer_count,
            col_config.maximum_peer_count,
            pvt_data_msg,
            !member_orgs.contains(&local_peer.msp_id),
        )
    }
}

/// Alive peers of `channel_id` that belong to one of `member_orgs`, other than `local_peer`.
fn eligible_peers(
    channel_id: &str,
    member_orgs: &BTreeSet<String>,
    local_peer: &NetworkMember,
    gossip: &dyn GossipAdapter,
) -> Vec<NetworkMember> {
    gossip
        .peers_of_channel(channel_id)
        .into_iter()
        .filter(|peer| peer.pki_id != local_peer.pki_id && member_orgs.contains(&peer.msp_id))
        .collect()
}

/// Bytes that identify what `rw_set` writes to: the channel, namespace, collection, and the sorted
/// set of written keys.
fn key_material(channel_id: &str, namespace: &str, rw_set: &CollectionPvtReadWriteSet) -> Vec<u8> {
    let keys: BTreeSet<&str> = rw_set.writes.iter().map(|write| write.key.as_str()).collect();
    let mut material = Vec::new();
    for part in [channel_id, namespace, rw_set.collection_name.as_str()]
        .into_iter()
        .chain(keys)
    {
        material.extend_from_slice(part.as_bytes());
        material.push(0);
    }
    material
}

/// Build the plans for pushing `pvt_data_msg` to `targets`, which are already in order of
/// preference.
fn plan(
    collection: &str,
    mut targets: Vec<NetworkMember>,
    required_peer_count: usize,
    maximum_peer_count: usize,
    pvt_data_msg: &SignedGossipMessage,
    should_filter: bool,
) -> Result<DisseminationPlans, DisseminationError> {
    if targets.len() < required_peer_count {
        return Err(DisseminationError::InsufficientPeers {
            collection: collection.to_string(),
            required: required_peer_count,
            available: targets.len(),
        });
    }

    let max_peers = maximum_peer_count.max(required_peer_count);
    targets.truncate(max_peers);
    if targets.is_empty() {
        return Ok(DisseminationPlans::new(Vec::new(), should_filter));
    }

    let plan = DisseminationPlan {
        criteria: SendCriteria {
            targets,
            min_ack: required_peer_count,
            max_peers,
        },
        message: pvt_data_msg.clone(),
    };
    Ok(DisseminationPlans::new(vec![plan], should_filter))
}
