use crate::block_store::BlockStore;
use crate::descriptor::{DescriptorTable, FileType};
use crate::error::{FsError, FsResult};
use crate::namespace::Namespace;
use crate::{BlockDevice, BLOCK_SIZE, MAX_NAME_LENGTH, MAX_OPEN_FILES, MAX_SYMLINK_DEPTH};
use log::debug;
use std::sync::Arc;

/// Cursor state for one open handle.
struct OpenFile {
    descriptor: usize,
    position: usize,
}

/// Read-only view of a descriptor, as returned by [`FileSystem::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub file_type: FileType,
    pub size: usize,
    pub hard_links: usize,
    pub blocks: usize,
}

/// The filesystem service: block store, descriptor table, flat namespace
/// and open-file table, with every operation of the storage layer.
///
/// Single actor by construction; all operations run to completion before
/// the next one is accepted.
pub struct FileSystem {
    blocks: BlockStore,
    descriptors: DescriptorTable,
    namespace: Namespace,
    open_files: Vec<Option<OpenFile>>,
    current_dir: String,
}

impl FileSystem {
    /// Build a filesystem over `device` and format it with
    /// `num_descriptors` descriptor slots.
    pub fn new(device: Arc<dyn BlockDevice>, num_descriptors: usize) -> FsResult<Self> {
        let mut fs = Self {
            blocks: BlockStore::new(device),
            descriptors: DescriptorTable::new(0),
            namespace: Namespace::new(),
            open_files: Vec::new(),
            current_dir: String::from("/"),
        };
        fs.mkfs(num_descriptors)?;
        Ok(fs)
    }

    /// Reformat: every table is reset, all blocks are freed and zeroed, and
    /// a fresh root directory descriptor is registered at `/`.
    pub fn mkfs(&mut self, num_descriptors: usize) -> FsResult<()> {
        self.blocks.reset();
        self.descriptors = DescriptorTable::new(num_descriptors);
        self.namespace.clear();
        self.open_files.clear();
        self.open_files.resize_with(MAX_OPEN_FILES, || None);
        self.current_dir = String::from("/");

        let root = self.descriptors.allocate(FileType::Directory)?;
        let block = self.blocks.allocate()?;
        self.descriptors.get_mut(root).block_map.push(block);
        self.namespace.insert(String::from("/"), root);
        debug!(
            "mkfs: {} descriptor slots over {} blocks",
            num_descriptors,
            self.blocks.total_blocks()
        );
        Ok(())
    }

    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    fn resolve(&self, path: &str) -> String {
        Namespace::resolve(&self.current_dir, path)
    }

    /// Register an empty regular file at `path`.
    pub fn create(&mut self, path: &str) -> FsResult<()> {
        let path = self.resolve(path);
        if path.len() > MAX_NAME_LENGTH {
            return Err(FsError::NameTooLong);
        }
        if self.namespace.contains(&path) {
            return Err(FsError::AlreadyExists);
        }
        let slot = self.descriptors.allocate(FileType::Regular)?;
        self.namespace.insert(path, slot);
        Ok(())
    }

    /// Directories get one placeholder block on creation and keep it until
    /// they are removed.
    pub fn mkdir(&mut self, path: &str) -> FsResult<()> {
        let path = self.resolve(path);
        if self.namespace.contains(&path) {
            return Err(FsError::AlreadyExists);
        }
        let slot = self.descriptors.allocate(FileType::Directory)?;
        let block = match self.blocks.allocate() {
            Ok(block) => block,
            Err(e) => {
                self.descriptors.free(slot);
                return Err(e);
            }
        };
        self.descriptors.get_mut(slot).block_map.push(block);
        self.namespace.insert(path, slot);
        Ok(())
    }

    /// Remove a directory. A non-empty directory (any entry under
    /// `path + "/"`) is handed to [`FileSystem::rm_rf`] instead.
    pub fn rmdir(&mut self, path: &str) -> FsResult<()> {
        let path = self.resolve(path);
        let slot = self.namespace.get(&path).ok_or(FsError::NotFound)?;
        if !self.descriptors.get(slot).is_dir() {
            return Err(FsError::NotADirectory);
        }
        if self.namespace.has_children(&path) {
            return self.rm_rf(&path);
        }
        if let Some(block) = self.descriptors.get_mut(slot).block_map.pop() {
            self.blocks.free(block);
        }
        self.descriptors.free(slot);
        self.namespace.remove(&path);
        Ok(())
    }

    /// Recursive delete. Directories take every prefix-matched descendant
    /// down with them; anything else is unlinked.
    pub fn rm_rf(&mut self, path: &str) -> FsResult<()> {
        let path = self.resolve(path);
        let slot = self.namespace.get(&path).ok_or(FsError::NotFound)?;
        if self.descriptors.get(slot).is_dir() {
            let children = self.namespace.paths_with_prefix(&format!("{}/", path));
            for child in children {
                // a deeper recursion step may already have removed this one
                if self.namespace.contains(&child) {
                    self.rm_rf(&child)?;
                }
            }
            self.rmdir(&path)
        } else {
            self.unlink(&path)
        }
    }

    pub fn cd(&mut self, path: &str) -> FsResult<()> {
        let path = self.resolve(path);
        let slot = self.namespace.get(&path).ok_or(FsError::NotFound)?;
        if !self.descriptors.get(slot).is_dir() {
            return Err(FsError::NotADirectory);
        }
        self.current_dir = path;
        Ok(())
    }

    /// The target string is stored verbatim in the symlink's single block,
    /// NUL-padded, and re-resolved on every `open` that goes through it.
    pub fn symlink(&mut self, target: &str, path: &str) -> FsResult<()> {
        let path = self.resolve(path);
        if self.namespace.contains(&path) {
            return Err(FsError::AlreadyExists);
        }
        if target.len() > BLOCK_SIZE {
            return Err(FsError::TargetTooLong);
        }
        let slot = self.descriptors.allocate(FileType::Symlink)?;
        let block = match self.blocks.allocate() {
            Ok(block) => block,
            Err(e) => {
                self.descriptors.free(slot);
                return Err(e);
            }
        };
        self.blocks.write(block, target.as_bytes())?;
        let descriptor = self.descriptors.get_mut(slot);
        descriptor.block_map.push(block);
        descriptor.size = target.len();
        self.namespace.insert(path, slot);
        Ok(())
    }

    /// Register a second name for `src`'s descriptor. Directories cannot be
    /// hard-linked.
    pub fn link(&mut self, src: &str, dst: &str) -> FsResult<()> {
        let src = self.resolve(src);
        let dst = self.resolve(dst);
        let slot = self.namespace.get(&src).ok_or(FsError::NotFound)?;
        if self.namespace.contains(&dst) {
            return Err(FsError::AlreadyExists);
        }
        if self.descriptors.get(slot).is_dir() {
            return Err(FsError::IsADirectory);
        }
        self.namespace.insert(dst, slot);
        self.descriptors.get_mut(slot).hard_links += 1;
        Ok(())
    }

    /// Drop one namespace entry. The descriptor itself survives as long as
    /// other hard links or open handles still reference it.
    pub fn unlink(&mut self, path: &str) -> FsResult<()> {
        let path = self.resolve(path);
        let slot = self.namespace.get(&path).ok_or(FsError::NotFound)?;
        if self.descriptors.get(slot).is_dir() {
            return Err(FsError::IsADirectory);
        }
        self.namespace.remove(&path);
        self.descriptors.get_mut(slot).hard_links -= 1;
        if self.descriptors.get(slot).hard_links == 0 && !self.handle_refers(slot) {
            self.reclaim(slot);
        }
        Ok(())
    }

    /// Open a path, following symlinks up to [`MAX_SYMLINK_DEPTH`] hops.
    /// Returns a handle with its cursor at 0.
    pub fn open(&mut self, path: &str) -> FsResult<usize> {
        let mut path = self.resolve(path);
        let mut hops = 0;
        let slot = loop {
            let slot = self.namespace.get(&path).ok_or(FsError::NotFound)?;
            if self.descriptors.get(slot).file_type != FileType::Symlink {
                break slot;
            }
            hops += 1;
            if hops > MAX_SYMLINK_DEPTH {
                return Err(FsError::TooManySymlinks);
            }
            let target = self.read_symlink_target(slot)?;
            path = self.resolve(&target);
        };
        for (handle, entry) in self.open_files.iter_mut().enumerate() {
            if entry.is_none() {
                *entry = Some(OpenFile {
                    descriptor: slot,
                    position: 0,
                });
                return Ok(handle);
            }
        }
        Err(FsError::NoFreeDescriptors)
    }

    /// Free the handle slot. If this was the last reference to a descriptor
    /// with no remaining hard links, the descriptor and its blocks go too.
    pub fn close(&mut self, handle: usize) -> FsResult<()> {
        let open = self
            .open_files
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or(FsError::NotOpen)?;
        let slot = open.descriptor;
        if self.descriptors.get(slot).hard_links == 0 && !self.handle_refers(slot) {
            self.reclaim(slot);
        }
        Ok(())
    }

    /// Move the cursor. No bound check against the file size; a later write
    /// extends the file from wherever the cursor sits.
    pub fn seek(&mut self, handle: usize, offset: usize) -> FsResult<()> {
        let open = self
            .open_files
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or(FsError::NotOpen)?;
        open.position = offset;
        Ok(())
    }

    /// Copy up to `len` bytes from the cursor, stopping at the logical file
    /// size. A short (or empty) result is not an error.
    pub fn read(&mut self, handle: usize, len: usize) -> FsResult<Vec<u8>> {
        let (slot, mut position) = self.open_state(handle)?;
        let mut data = Vec::new();
        let mut remaining = len;
        loop {
            let size = self.descriptors.get(slot).size;
            if remaining == 0 || position >= size {
                break;
            }
            let block_index = position / BLOCK_SIZE;
            let block_offset = position % BLOCK_SIZE;
            let chunk = (BLOCK_SIZE - block_offset)
                .min(remaining)
                .min(size - position);
            let block = self.descriptors.get(slot).block_map[block_index];
            let buf = self.blocks.read(block);
            data.extend_from_slice(&buf[block_offset..block_offset + chunk]);
            position += chunk;
            remaining -= chunk;
        }
        self.set_position(handle, position);
        Ok(data)
    }

    /// Write `data` at the cursor, read-modify-writing each touched block
    /// and appending fresh blocks to the map as the file grows. On
    /// `OutOfSpace` the cursor and size are left as they were.
    pub fn write(&mut self, handle: usize, data: &[u8]) -> FsResult<()> {
        let (slot, start) = self.open_state(handle)?;
        if data.is_empty() {
            return Ok(());
        }
        let mut position = start;
        let mut written = 0;
        while written < data.len() {
            let block_index = position / BLOCK_SIZE;
            let block_offset = position % BLOCK_SIZE;
            // a sparse cursor may need intermediate blocks as well
            while block_index >= self.descriptors.get(slot).block_map.len() {
                let block = self.blocks.allocate()?;
                self.descriptors.get_mut(slot).block_map.push(block);
            }
            let block = self.descriptors.get(slot).block_map[block_index];
            let chunk = (BLOCK_SIZE - block_offset).min(data.len() - written);
            let mut buf = self.blocks.read(block);
            buf[block_offset..block_offset + chunk]
                .copy_from_slice(&data[written..written + chunk]);
            self.blocks.write(block, &buf)?;
            position += chunk;
            written += chunk;
        }
        let descriptor = self.descriptors.get_mut(slot);
        descriptor.size = descriptor.size.max(position);
        self.set_position(handle, position);
        Ok(())
    }

    /// Grow or shrink to `size`, allocating or freeing exactly the
    /// ceil-division block delta. Freed blocks are zeroed by the store, so a
    /// later regrow over the same range reads back as zeros.
    pub fn truncate(&mut self, path: &str, size: usize) -> FsResult<()> {
        let path = self.resolve(path);
        let slot = self.namespace.get(&path).ok_or(FsError::NotFound)?;
        let old_size = self.descriptors.get(slot).size;
        let old_blocks = (old_size + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let new_blocks = (size + BLOCK_SIZE - 1) / BLOCK_SIZE;
        if size < old_size {
            for _ in new_blocks..old_blocks {
                if let Some(block) = self.descriptors.get_mut(slot).block_map.pop() {
                    self.blocks.free(block);
                }
            }
        } else if size > old_size {
            for _ in old_blocks..new_blocks {
                let block = self.blocks.allocate()?;
                self.descriptors.get_mut(slot).block_map.push(block);
            }
        }
        self.descriptors.get_mut(slot).size = size;
        Ok(())
    }

    pub fn stat(&self, path: &str) -> FsResult<FileStat> {
        let path = self.resolve(path);
        let slot = self.namespace.get(&path).ok_or(FsError::NotFound)?;
        let descriptor = self.descriptors.get(slot);
        Ok(FileStat {
            file_type: descriptor.file_type,
            size: descriptor.size,
            hard_links: descriptor.hard_links,
            blocks: descriptor.block_map.len(),
        })
    }

    /// Every namespace path starting with `prefix` (the current directory
    /// when `None`), in sorted order. A raw string-prefix match, see
    /// [`Namespace`].
    pub fn ls(&self, prefix: Option<&str>) -> Vec<String> {
        let prefix = match prefix {
            Some(p) => self.resolve(p),
            None => self.current_dir.clone(),
        };
        self.namespace.paths_with_prefix(&prefix)
    }

    fn open_state(&self, handle: usize) -> FsResult<(usize, usize)> {
        self.open_files
            .get(handle)
            .and_then(Option::as_ref)
            .map(|open| (open.descriptor, open.position))
            .ok_or(FsError::NotOpen)
    }

    fn set_position(&mut self, handle: usize, position: usize) {
        if let Some(open) = self.open_files.get_mut(handle).and_then(Option::as_mut) {
            open.position = position;
        }
    }

    fn handle_refers(&self, slot: usize) -> bool {
        self.open_files
            .iter()
            .flatten()
            .any(|open| open.descriptor == slot)
    }

    fn reclaim(&mut self, slot: usize) {
        let block_map = std::mem::take(&mut self.descriptors.get_mut(slot).block_map);
        for block in block_map {
            self.blocks.free(block);
        }
        self.descriptors.free(slot);
        debug!("reclaimed descriptor slot {}", slot);
    }

    fn read_symlink_target(&self, slot: usize) -> FsResult<String> {
        let descriptor = self.descriptors.get(slot);
        // symlinks always carry exactly one payload block
        let block = descriptor.block_map[0];
        let buf = self.blocks.read(block);
        let end = buf.iter().position(|&b| b == 0).unwrap_or(BLOCK_SIZE);
        let target =
            std::str::from_utf8(&buf[..end]).map_err(|_| FsError::InvalidArgument)?;
        Ok(target.to_string())
    }
}
