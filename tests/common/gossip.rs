//! Stand-ins for the gossip layer, the access policy evaluator, and the dissemination strategies.

use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use pvtdata_rs::{
    dissemination::{
        gossip::{CollectionAccessPolicy, GossipAdapter, NetworkMember, SignedGossipMessage},
        DisseminationError, DisseminationPlans, OffLedgerStrategy, TransientDataStrategy,
    },
    types::{
        collection::StaticCollectionConfig, data_types::PkiID,
        pvt_data::CollectionPvtReadWriteSet,
    },
};

/// A gossip layer with a fixed set of channel peers.
pub(crate) struct StubGossip {
    pub(crate) local_peer: NetworkMember,
    pub(crate) peers: Vec<NetworkMember>,
}

impl StubGossip {
    /// A gossip layer whose local peer is `local_peer` of `local_org`, and whose channel has the peers
    /// named in `peers` as `(name, org)` pairs.
    pub(crate) fn new(local_peer: (&str, &str), peers: &[(&str, &str)]) -> StubGossip {
        StubGossip {
            local_peer: peer(local_peer.0, local_peer.1),
            peers: peers.iter().map(|(name, org)| peer(name, org)).collect(),
        }
    }

    /// A gossip layer with no peers other than the local one.
    pub(crate) fn empty() -> StubGossip {
        StubGossip::new(("peer0.org1", "Org1MSP"), &[])
    }
}

impl GossipAdapter for StubGossip {
    fn peers_of_channel(&self, _channel_id: &str) -> Vec<NetworkMember> {
        self.peers.clone()
    }

    fn self_membership_info(&self) -> NetworkMember {
        self.local_peer.clone()
    }
}

pub(crate) fn peer(name: &str, org: &str) -> NetworkMember {
    NetworkMember::new(format!("{}:7051", name), PkiID::from(name), org)
}

/// An access policy with fixed answers.
pub(crate) struct StubAccessPolicy {
    pub(crate) member_orgs: BTreeSet<String>,
    pub(crate) required_peer_count: usize,
    pub(crate) maximum_peer_count: usize,
}

impl StubAccessPolicy {
    pub(crate) fn new(
        member_orgs: &[&str],
        required_peer_count: usize,
        maximum_peer_count: usize,
    ) -> StubAccessPolicy {
        StubAccessPolicy {
            member_orgs: member_orgs.iter().map(|org| org.to_string()).collect(),
            required_peer_count,
            maximum_peer_count,
        }
    }
}

impl CollectionAccessPolicy for StubAccessPolicy {
    fn member_orgs(&self) -> BTreeSet<String> {
        self.member_orgs.clone()
    }

    fn required_peer_count(&self) -> usize {
        self.required_peer_count
    }

    fn maximum_peer_count(&self) -> usize {
        self.maximum_peer_count
    }
}

/// A transient data strategy that counts its invocations and returns a fixed result.
pub(crate) struct RecordingTransientStrategy {
    pub(crate) calls: AtomicUsize,
    pub(crate) should_filter: bool,
}

impl RecordingTransientStrategy {
    pub(crate) fn new(should_filter: bool) -> RecordingTransientStrategy {
        RecordingTransientStrategy {
            calls: AtomicUsize::new(0),
            should_filter,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransientDataStrategy for &RecordingTransientStrategy {
    fn compute_plan(
        &self,
        _channel_id: &str,
        _namespace: &str,
        _rw_set: &CollectionPvtReadWriteSet,
        _col_ap: &dyn CollectionAccessPolicy,
        _pvt_data_msg: &SignedGossipMessage,
        _gossip: &dyn GossipAdapter,
    ) -> Result<DisseminationPlans, DisseminationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DisseminationPlans::new(Vec::new(), self.should_filter))
    }
}

/// An off-ledger strategy that counts its invocations, records the static configurations it was
/// passed, and returns a fixed result.
pub(crate) struct RecordingOffLedgerStrategy {
    pub(crate) calls: AtomicUsize,
    pub(crate) configs: Mutex<Vec<StaticCollectionConfig>>,
    pub(crate) should_filter: bool,
}

impl RecordingOffLedgerStrategy {
    pub(crate) fn new(should_filter: bool) -> RecordingOffLedgerStrategy {
        RecordingOffLedgerStrategy {
            calls: AtomicUsize::new(0),
            configs: Mutex::new(Vec::new()),
            should_filter,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OffLedgerStrategy for &RecordingOffLedgerStrategy {
    fn compute_plan(
        &self,
        _channel_id: &str,
        _namespace: &str,
        _rw_set: &CollectionPvtReadWriteSet,
        col_config: &StaticCollectionConfig,
        _col_ap: &dyn CollectionAccessPolicy,
        _pvt_data_msg: &SignedGossipMessage,
        _gossip: &dyn GossipAdapter,
    ) -> Result<DisseminationPlans, DisseminationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(col_config.clone());
        Ok(DisseminationPlans::new(Vec::new(), self.should_filter))
    }
}
