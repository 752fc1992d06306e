//! flat_fs
//!
//! An in-memory emulation of a simple filesystem's storage layer: a
//! fixed-size block device, a descriptor (inode) table, and a flat
//! path-keyed namespace supporting regular files, directories, symbolic
//! links and hard links. State lives only for the process lifetime.

pub use crate::block_dev::{BlockDevice, MemBlockDevice};

mod bitmap;
mod block_dev;
mod block_store;
mod descriptor;
mod error;
mod namespace;
mod vfs;

pub const BLOCK_SIZE: usize = 512;
pub const MAX_OPEN_FILES: usize = 100;
pub const MAX_NAME_LENGTH: usize = 255;
/// Bound on symlink hops during `open`; a cycle fails with
/// [`FsError::TooManySymlinks`] instead of recursing forever.
pub const MAX_SYMLINK_DEPTH: usize = 8;

pub use block_store::BlockStore;
pub use descriptor::FileType;
pub use error::{FsError, FsResult};
pub use vfs::{FileStat, FileSystem};
