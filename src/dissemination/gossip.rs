/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Capabilities that the dissemination strategies consume from the gossip layer and from the
//! collection access policy evaluator.
//!
//! Peer discovery, message signing, and membership evaluation all live outside of this crate. Library
//! users plug them in by implementing [`GossipAdapter`] and [`CollectionAccessPolicy`].

use std::collections::BTreeSet;

use crate::types::data_types::PkiID;

/// A peer as known to the gossip layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkMember {
    pub endpoint: String,
    pub pki_id: PkiID,
    /// MSP ID of the organization that the peer belongs to.
    pub msp_id: String,
}

impl NetworkMember {
    pub fn new(endpoint: impl Into<String>, pki_id: PkiID, msp_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            pki_id,
            msp_id: msp_id.into(),
        }
    }
}

/// A gossip message carrying private data, already signed by the local peer. Dissemination plans
/// pair this message with the peers it should reach; its contents are never inspected here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignedGossipMessage {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedGossipMessage {
    pub fn new(payload: Vec<u8>, signature: Vec<u8>) -> Self {
        Self { payload, signature }
    }
}

pub trait GossipAdapter {
    /// Get the peers that are currently alive in `channel_id`, not including the local peer.
    fn peers_of_channel(&self, channel_id: &str) -> Vec<NetworkMember>;

    /// Get the local peer's own membership information.
    fn self_membership_info(&self) -> NetworkMember;
}

/// The access policy of a collection, as evaluated by the peer's policy engine.
pub trait CollectionAccessPolicy {
    /// MSP IDs of the organizations whose peers are members of the collection.
    fn member_orgs(&self) -> BTreeSet<String>;

    /// Minimum number of peers that have to acknowledge receipt of the collection's data.
    fn required_peer_count(&self) -> usize;

    /// Maximum number of peers the collection's data is pushed to.
    fn maximum_peer_count(&self) -> usize;
}
