//! On-storage layout of one configuration block and its checksum.
//!
//! A block is a fixed payload region plus a 16-bit check value, located in
//! non-volatile storage at `id * CONFIG_BLOCK_SIZE`. The layout and the
//! checksum must stay bit-exact across versions so saved models remain
//! loadable.

use byte_struct::*;

/// Number of addressable block slots. Valid ids are `1..CONFIG_BLOCKS`;
/// id 0 is the invalid/unbound sentinel and its slot is never written.
pub const CONFIG_BLOCKS: u8 = 12;

/// Sentinel id for "no block bound".
pub const BLOCK_ID_INVALID: u8 = 0;

/// Block holding the system-scoped module configuration.
pub const SYSTEM_BLOCK_ID: u8 = 1;

/// First block available for per-model configuration.
pub const FIRST_MODEL_BLOCK_ID: u8 = 2;

/// Bytes of module configuration one block can hold.
pub const CONFIG_PAYLOAD_SIZE: usize = 240;

/// Stored size of one block: payload plus trailing checksum.
pub const CONFIG_BLOCK_SIZE: usize = CONFIG_PAYLOAD_SIZE + 2;

/// Erased-state value of the storage medium.
pub const STORAGE_ERASED: u8 = 0xFF;

/// One configuration block as it exists in storage.
#[derive(ByteStruct, Clone, Copy)]
#[byte_struct_le]
pub struct StoredBlock {
    pub payload: [u8; CONFIG_PAYLOAD_SIZE],
    pub checksum: u16,
}

impl Default for StoredBlock {
    fn default() -> Self {
        Self {
            payload: [STORAGE_ERASED; CONFIG_PAYLOAD_SIZE],
            checksum: 0,
        }
    }
}

impl StoredBlock {
    /// Recompute the payload checksum. The stored checksum field is not
    /// part of the sum and is not updated here.
    pub fn compute_checksum(&self) -> u16 {
        block_checksum(&self.payload)
    }

    /// Compare the stored checksum against a fresh computation.
    pub fn is_valid(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    /// Fill the payload with the erased-state pattern. The checksum field
    /// is left untouched, so a formatted block reads back as invalid.
    pub fn format(&mut self) {
        self.payload = [STORAGE_ERASED; CONFIG_PAYLOAD_SIZE];
    }
}

/// Position-mixing checksum over a byte sequence.
///
/// The accumulator is left-rotated by one bit before each byte, then XORed
/// with `index ^ byte`. Rotating mixes position into the check value so a
/// pure byte transposition is detected.
pub fn block_checksum(payload: &[u8]) -> u16 {
    let mut checksum: u16 = 0;

    for (i, b) in payload.iter().enumerate() {
        checksum = checksum.rotate_left(1);
        checksum ^= (i as u16) ^ (*b as u16);
    }

    checksum
}
