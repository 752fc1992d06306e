use crate::bitmap::Bitmap;
use crate::error::{FsError, FsResult};
use crate::{BlockDevice, BLOCK_SIZE};
use std::sync::Arc;

/// Raw block storage plus its used/free accounting.
///
/// Freeing is caller-driven: a block is "used" exactly when its bitmap flag
/// is set, whether or not any descriptor still references it.
pub struct BlockStore {
    device: Arc<dyn BlockDevice>,
    bitmap: Bitmap,
}

impl BlockStore {
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        let total = device.total_blocks();
        Self {
            device,
            bitmap: Bitmap::new(total),
        }
    }

    /// Lowest free block, marked used.
    pub fn allocate(&mut self) -> FsResult<usize> {
        self.bitmap.alloc().ok_or(FsError::OutOfSpace)
    }

    /// Release a block and zero its contents, so a later holder of the same
    /// index never sees stale data.
    pub fn free(&mut self, block_id: usize) {
        self.bitmap.dealloc(block_id);
        self.device.write_block(block_id, &[0u8; BLOCK_SIZE]);
    }

    pub fn read(&self, block_id: usize) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        self.device.read_block(block_id, &mut buf);
        buf
    }

    /// Overwrite the leading `data.len()` bytes of a block. Callers doing a
    /// partial update must read-modify-write the full block themselves.
    pub fn write(&mut self, block_id: usize, data: &[u8]) -> FsResult<()> {
        if data.len() > BLOCK_SIZE {
            return Err(FsError::InvalidArgument);
        }
        let mut buf = self.read(block_id);
        buf[..data.len()].copy_from_slice(data);
        self.device.write_block(block_id, &buf);
        Ok(())
    }

    pub fn total_blocks(&self) -> usize {
        self.bitmap.len()
    }

    pub fn is_allocated(&self, block_id: usize) -> bool {
        self.bitmap.is_set(block_id)
    }

    /// Forget all allocations and zero the device (mkfs path).
    pub fn reset(&mut self) {
        for block_id in 0..self.bitmap.len() {
            if self.bitmap.is_set(block_id) {
                self.device.write_block(block_id, &[0u8; BLOCK_SIZE]);
            }
        }
        self.bitmap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemBlockDevice;

    fn store_with_blocks(n: usize) -> BlockStore {
        BlockStore::new(Arc::new(MemBlockDevice::new(n * BLOCK_SIZE).unwrap()))
    }

    #[test]
    fn roundtrip_and_zero_on_free() {
        let mut store = store_with_blocks(4);
        let block = store.allocate().unwrap();
        store.write(block, b"stale secret").unwrap();
        assert_eq!(&store.read(block)[..12], b"stale secret");
        store.free(block);
        assert!(store.read(block).iter().all(|&b| b == 0));
    }

    #[test]
    fn exhaustion_and_no_duplicates() {
        let mut store = store_with_blocks(8);
        let mut seen = Vec::new();
        for _ in 0..8 {
            let block = store.allocate().unwrap();
            assert!(!seen.contains(&block));
            seen.push(block);
        }
        assert_eq!(store.allocate(), Err(FsError::OutOfSpace));
    }

    #[test]
    fn oversized_write_rejected() {
        let mut store = store_with_blocks(2);
        let block = store.allocate().unwrap();
        let data = vec![0xABu8; BLOCK_SIZE + 1];
        assert_eq!(store.write(block, &data), Err(FsError::InvalidArgument));
    }

    #[test]
    fn partial_write_leaves_rest_of_block() {
        let mut store = store_with_blocks(2);
        let block = store.allocate().unwrap();
        store.write(block, &[0xFFu8; BLOCK_SIZE]).unwrap();
        store.write(block, b"ab").unwrap();
        let buf = store.read(block);
        assert_eq!(&buf[..2], b"ab");
        assert!(buf[2..].iter().all(|&b| b == 0xFF));
    }
}
