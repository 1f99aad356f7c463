//! Checksummed block access on top of raw [`Storage`].
//!
//! The store holds one block in memory at a time. Callers bind a block id,
//! fill or consume the payload, and commit with [`ConfigStore::write_block`],
//! which is the only place the checksum is computed.

use byte_struct::ByteStruct;
use tracing::warn;

use txctl_shared::block::{
    BLOCK_ID_INVALID, CONFIG_BLOCK_SIZE, CONFIG_BLOCKS, StoredBlock,
};

use crate::hal::Storage;

/// Outcome of a block operation. Failures are states to react to, not
/// errors to propagate; an invalid block is expected on first boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    Ok,
    /// The requested id is outside the valid block range.
    InvalidId,
    /// The block was read but its stored checksum does not match its
    /// payload.
    ChecksumMismatch,
}

pub struct ConfigStore {
    storage: Box<dyn Storage>,
    block: StoredBlock,
    block_id: u8,
}

impl ConfigStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            block: StoredBlock::default(),
            block_id: BLOCK_ID_INVALID,
        }
    }

    /// Number of ids usable for model configuration blocks.
    pub fn blocks(&self) -> u8 {
        CONFIG_BLOCKS
    }

    fn offset(id: u8) -> usize {
        id as usize * CONFIG_BLOCK_SIZE
    }

    /// Bind the in-memory block to an id without touching storage. Returns
    /// false and unbinds on an invalid id.
    pub fn bind(&mut self, id: u8) -> bool {
        if id == BLOCK_ID_INVALID || id >= CONFIG_BLOCKS {
            warn!("config block id {id} out of range");
            self.block_id = BLOCK_ID_INVALID;
            return false;
        }
        self.block_id = id;
        true
    }

    /// Load a block from storage and verify its checksum. The payload is
    /// available through [`payload`](Self::payload) regardless of the
    /// verification result.
    pub fn read_block(&mut self, id: u8) -> BlockStatus {
        if !self.bind(id) {
            return BlockStatus::InvalidId;
        }

        let mut bytes = [0_u8; CONFIG_BLOCK_SIZE];
        self.storage.read(Self::offset(id), &mut bytes);
        self.block = StoredBlock::read_bytes(&bytes);

        if self.block.is_valid() {
            BlockStatus::Ok
        } else {
            BlockStatus::ChecksumMismatch
        }
    }

    /// Reset a block to the erased pattern. Only the payload region is
    /// written; the stored checksum is left stale, so the block reads back
    /// as invalid until it is written with real content.
    pub fn format_block(&mut self, id: u8) -> BlockStatus {
        if !self.bind(id) {
            return BlockStatus::InvalidId;
        }
        self.block.format();
        self.storage.write(Self::offset(id), &self.block.payload);
        BlockStatus::Ok
    }

    /// Checksum the in-memory payload and commit the block to storage at
    /// the bound id.
    pub fn write_block(&mut self) -> BlockStatus {
        if self.block_id == BLOCK_ID_INVALID || self.block_id >= CONFIG_BLOCKS {
            warn!("write without a bound config block");
            return BlockStatus::InvalidId;
        }

        self.block.checksum = self.block.compute_checksum();
        let mut bytes = [0_u8; CONFIG_BLOCK_SIZE];
        self.block.write_bytes(&mut bytes);
        self.storage.write(Self::offset(self.block_id), &bytes);
        BlockStatus::Ok
    }

    pub fn payload(&self) -> &[u8] {
        &self.block.payload
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.block.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MemoryStorage;
    use txctl_shared::block::CONFIG_PAYLOAD_SIZE;

    fn store() -> (ConfigStore, MemoryStorage) {
        let backing = MemoryStorage::new(CONFIG_BLOCKS as usize * CONFIG_BLOCK_SIZE);
        (ConfigStore::new(Box::new(backing.clone())), backing)
    }

    #[test]
    fn write_then_read_verifies() {
        let (mut store, _backing) = store();
        assert!(store.bind(3));
        store.payload_mut()[0] = 0xA5;
        store.payload_mut()[CONFIG_PAYLOAD_SIZE - 1] = 0x5A;
        assert_eq!(store.write_block(), BlockStatus::Ok);

        assert_eq!(store.read_block(3), BlockStatus::Ok);
        assert_eq!(store.payload()[0], 0xA5);
        assert_eq!(store.payload()[CONFIG_PAYLOAD_SIZE - 1], 0x5A);
    }

    #[test]
    fn erased_storage_reads_as_checksum_mismatch() {
        let (mut store, _backing) = store();
        assert_eq!(store.read_block(2), BlockStatus::ChecksumMismatch);
    }

    #[test]
    fn corruption_is_detected() {
        let (mut store, backing) = store();
        store.bind(4);
        store.payload_mut()[10] = 0x77;
        store.write_block();
        assert_eq!(store.read_block(4), BlockStatus::Ok);

        backing.corrupt(4 * CONFIG_BLOCK_SIZE + 10, 0x01);
        assert_eq!(store.read_block(4), BlockStatus::ChecksumMismatch);
    }

    #[test]
    fn invalid_ids_are_rejected() {
        let (mut store, _backing) = store();
        assert_eq!(store.read_block(0), BlockStatus::InvalidId);
        assert_eq!(store.read_block(CONFIG_BLOCKS), BlockStatus::InvalidId);
        assert_eq!(store.format_block(0), BlockStatus::InvalidId);
        // No bound id after the failures above
        assert_eq!(store.write_block(), BlockStatus::InvalidId);
    }

    #[test]
    fn blocks_do_not_overlap() {
        let (mut store, _backing) = store();
        for id in 1..CONFIG_BLOCKS {
            store.bind(id);
            store.payload_mut().fill(id);
            store.write_block();
        }
        for id in 1..CONFIG_BLOCKS {
            assert_eq!(store.read_block(id), BlockStatus::Ok);
            assert!(store.payload().iter().all(|b| *b == id));
        }
    }

    #[test]
    fn format_invalidates_until_rewritten() {
        let (mut store, _backing) = store();
        store.bind(5);
        store.payload_mut()[0] = 1;
        store.write_block();
        assert_eq!(store.read_block(5), BlockStatus::Ok);

        store.format_block(5);
        assert_eq!(store.read_block(5), BlockStatus::ChecksumMismatch);

        store.payload_mut()[0] = 2;
        assert_eq!(store.write_block(), BlockStatus::Ok);
        assert_eq!(store.read_block(5), BlockStatus::Ok);
        assert_eq!(store.payload()[0], 2);
    }
}
