use crate::error::{FsError, FsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
}

/// One file-control record: a regular file, directory or symlink.
///
/// `block_map` grows by appending and shrinks by popping from the end, so
/// logical block i of the file always lives at `block_map[i]`.
pub struct FileDescriptor {
    pub file_type: FileType,
    pub size: usize,
    pub block_map: Vec<usize>,
    pub hard_links: usize,
}

impl FileDescriptor {
    pub fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            size: 0,
            block_map: Vec::new(),
            hard_links: 1,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }
}

/// Fixed-capacity slot arena of descriptors. Capacity is set by `mkfs` and
/// never changes afterwards; slots are handed out first-free.
pub struct DescriptorTable {
    slots: Vec<Option<FileDescriptor>>,
}

impl DescriptorTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn allocate(&mut self, file_type: FileType) -> FsResult<usize> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(FileDescriptor::new(file_type));
                return Ok(index);
            }
        }
        Err(FsError::NoFreeDescriptors)
    }

    /// Clear a slot. The caller must have freed the descriptor's blocks.
    pub fn free(&mut self, index: usize) {
        assert!(self.slots[index].is_some());
        self.slots[index] = None;
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.slots[index].is_some()
    }

    pub fn get(&self, index: usize) -> &FileDescriptor {
        self.slots[index].as_ref().unwrap()
    }

    pub fn get_mut(&mut self, index: usize) -> &mut FileDescriptor {
        self.slots[index].as_mut().unwrap()
    }
}
