/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A write batch that puts the durable tier's variables in the right places in the key-value store.

use std::collections::BTreeSet;

use borsh::BorshSerialize;

use crate::types::{
    data_types::BlockNum,
    pvt_data::{TxMissingPvtDataMap, TxPvtData},
};

use super::{
    pluggables::{ExpiryEntry, KVSetError, Key, WriteBatch},
    variables::{self, block_key, single_key},
};

pub struct PvtDataWriteBatch<W: WriteBatch> {
    ledger: Vec<u8>,
    wb: W,
}

impl<W: WriteBatch> PvtDataWriteBatch<W> {
    /// Create an empty write batch for the ledger whose keys start with `ledger`.
    pub(crate) fn new(ledger: &[u8]) -> PvtDataWriteBatch<W> {
        PvtDataWriteBatch {
            ledger: ledger.to_vec(),
            wb: W::new(),
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.wb
    }

    /* ↓↓↓ Last Committed Block ↓↓↓ */

    pub fn set_last_committed_block(&mut self, block_num: BlockNum) -> Result<(), KVSetError> {
        let value = serialize_value(&block_num, || Key::LastCommittedBlock)?;
        self.wb.set(
            &single_key(&self.ledger, &variables::LAST_COMMITTED_BLOCK),
            &value,
        );
        Ok(())
    }

    /* ↓↓↓ Block Private Data ↓↓↓ */

    pub fn set_block_pvt_data(
        &mut self,
        block_num: BlockNum,
        pvt_data: &[TxPvtData],
    ) -> Result<(), KVSetError> {
        let value = serialize_value(pvt_data, || Key::BlockPvtData { block_num })?;
        self.wb.set(
            &block_key(&self.ledger, &variables::BLOCK_PVT_DATA, block_num),
            &value,
        );
        Ok(())
    }

    pub fn delete_block_pvt_data(&mut self, block_num: BlockNum) {
        self.wb
            .delete(&block_key(&self.ledger, &variables::BLOCK_PVT_DATA, block_num))
    }

    /* ↓↓↓ Block Missing Private Data ↓↓↓ */

    pub fn set_block_missing_pvt_data(
        &mut self,
        block_num: BlockNum,
        missing_pvt_data: &TxMissingPvtDataMap,
    ) -> Result<(), KVSetError> {
        let value = serialize_value(missing_pvt_data, || Key::BlockMissingPvtData { block_num })?;
        self.wb.set(
            &block_key(&self.ledger, &variables::BLOCK_MISSING_PVT_DATA, block_num),
            &value,
        );
        Ok(())
    }

    pub fn delete_block_missing_pvt_data(&mut self, block_num: BlockNum) {
        self.wb.delete(&block_key(
            &self.ledger,
            &variables::BLOCK_MISSING_PVT_DATA,
            block_num,
        ))
    }

    /* ↓↓↓ Missing Private Data Blocks ↓↓↓ */

    pub fn set_missing_pvt_data_blocks(
        &mut self,
        blocks: &BTreeSet<BlockNum>,
    ) -> Result<(), KVSetError> {
        let value = serialize_value(blocks, || Key::MissingPvtDataBlocks)?;
        self.wb.set(
            &single_key(&self.ledger, &variables::MISSING_PVT_DATA_BLOCKS),
            &value,
        );
        Ok(())
    }

    /* ↓↓↓ Expiry Entries ↓↓↓ */

    pub fn set_expiry_entries(
        &mut self,
        expiring_block: BlockNum,
        entries: &[ExpiryEntry],
    ) -> Result<(), KVSetError> {
        let value = serialize_value(entries, || Key::ExpiryEntries { expiring_block })?;
        self.wb.set(
            &block_key(&self.ledger, &variables::EXPIRY_ENTRIES, expiring_block),
            &value,
        );
        Ok(())
    }

    pub fn delete_expiry_entries(&mut self, expiring_block: BlockNum) {
        self.wb.delete(&block_key(
            &self.ledger,
            &variables::EXPIRY_ENTRIES,
            expiring_block,
        ))
    }

    /* ↓↓↓ Last Updated Old Blocks ↓↓↓ */

    pub fn set_last_updated_old_blocks(
        &mut self,
        blocks: &BTreeSet<BlockNum>,
    ) -> Result<(), KVSetError> {
        let value = serialize_value(blocks, || Key::LastUpdatedOldBlocks)?;
        self.wb.set(
            &single_key(&self.ledger, &variables::LAST_UPDATED_OLD_BLOCKS),
            &value,
        );
        Ok(())
    }

    pub fn delete_last_updated_old_blocks(&mut self) {
        self.wb
            .delete(&single_key(&self.ledger, &variables::LAST_UPDATED_OLD_BLOCKS))
    }
}

fn serialize_value<T: BorshSerialize + ?Sized>(
    value: &T,
    key: impl FnOnce() -> Key,
) -> Result<Vec<u8>, KVSetError> {
    value
        .try_to_vec()
        .map_err(|err| KVSetError::SerializeValueError {
            key: key(),
            source: err,
        })
}
