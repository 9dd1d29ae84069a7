/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::fmt::{self, Debug, Display, Formatter};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};

/// Number of a block in the ledger. The genesis block is block 0.
pub type BlockNum = u64;

/// Position of a transaction inside its block.
pub type TxNum = u64;

/// Opaque identifier that the gossip layer assigns to a peer.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct PkiID(Vec<u8>);

impl PkiID {
    /// Create a new `PkiID` wrapping `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get a reference to the bytes of this `PkiID`.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for PkiID {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl Display for PkiID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", STANDARD_NO_PAD.encode(&self.0))
    }
}

impl Debug for PkiID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PkiID").field(&self.to_string()).finish()
    }
}
