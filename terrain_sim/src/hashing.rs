use std::hash::Hasher;

use crate::grid::FieldGrid;

/// FNV-1a 64-bit state behind [`field_checksum`]. Reloaded modules compare
/// checksums computed by their predecessor, so the output must not depend on
/// per-process seeding the way `DefaultHasher` does.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumHasher(u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl Default for ChecksumHasher {
    fn default() -> Self {
        Self(FNV_OFFSET)
    }
}

impl ChecksumHasher {
    /// Fold a field's shape and values, in row-major order.
    pub fn write_field(&mut self, grid: &FieldGrid) {
        self.write_u32(grid.width);
        self.write_u32(grid.height);
        for cell in grid.cells() {
            self.write(&cell.value.to_le_bytes());
        }
    }
}

impl Hasher for ChecksumHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME));
    }
}

/// Checksum over the grid dimensions and every cell value.
pub fn field_checksum(grid: &FieldGrid) -> u64 {
    let mut hasher = ChecksumHasher::default();
    hasher.write_field(grid);
    hasher.finish()
}
