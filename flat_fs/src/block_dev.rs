use crate::error::{FsError, FsResult};
use crate::BLOCK_SIZE;
use spin::Mutex;

/// API provided for the filesystem layers above
pub trait BlockDevice: Send + Sync {
    /// read one block into `buf`
    fn read_block(&self, block_id: usize, buf: &mut [u8]);

    /// write `buf` over one block
    fn write_block(&self, block_id: usize, buf: &[u8]);

    /// number of blocks on the device
    fn total_blocks(&self) -> usize;
}

/// RAM-backed block device. The whole "disk" is a vector of 512-byte
/// buffers behind a mutex, so the device is Send + Sync like any real one.
pub struct MemBlockDevice {
    blocks: Mutex<Vec<[u8; BLOCK_SIZE]>>,
}

impl MemBlockDevice {
    /// `size_bytes` must be a whole number of blocks.
    pub fn new(size_bytes: usize) -> FsResult<Self> {
        if size_bytes % BLOCK_SIZE != 0 {
            return Err(FsError::InvalidArgument);
        }
        Ok(Self {
            blocks: Mutex::new(vec![[0u8; BLOCK_SIZE]; size_bytes / BLOCK_SIZE]),
        })
    }
}

impl BlockDevice for MemBlockDevice {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let blocks = self.blocks.lock();
        assert!(block_id < blocks.len(), "block id out of range: {}", block_id);
        assert_eq!(buf.len(), BLOCK_SIZE, "not a complete block!");
        buf.copy_from_slice(&blocks[block_id]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut blocks = self.blocks.lock();
        assert!(block_id < blocks.len(), "block id out of range: {}", block_id);
        assert_eq!(buf.len(), BLOCK_SIZE, "not a complete block!");
        blocks[block_id].copy_from_slice(buf);
    }

    fn total_blocks(&self) -> usize {
        self.blocks.lock().len()
    }
}
