use core::fmt;

/// Error type for filesystem operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// path has no namespace entry
    NotFound,

    /// path is already registered in the namespace
    AlreadyExists,

    /// a directory was required but the descriptor is not one
    NotADirectory,

    /// the operation does not apply to directories
    IsADirectory,

    /// resolved path exceeds the maximum filename length
    NameTooLong,

    /// symlink target does not fit in a single block
    TargetTooLong,

    /// no free blocks left on the device
    OutOfSpace,

    /// descriptor table or open-file table is full
    NoFreeDescriptors,

    /// operation on a handle that is not open
    NotOpen,

    /// malformed argument, e.g. a block write larger than the block size
    InvalidArgument,

    /// symlink resolution exceeded the depth limit (likely a cycle)
    TooManySymlinks,
}

/// Result type for filesystem operations
pub type FsResult<T> = Result<T, FsError>;

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::NotFound => "no such file or directory",
            FsError::AlreadyExists => "file already exists",
            FsError::NotADirectory => "not a directory",
            FsError::IsADirectory => "is a directory",
            FsError::NameTooLong => "filename too long",
            FsError::TargetTooLong => "symlink target too long",
            FsError::OutOfSpace => "no free blocks available",
            FsError::NoFreeDescriptors => "no free descriptors available",
            FsError::NotOpen => "file descriptor not open",
            FsError::InvalidArgument => "invalid argument",
            FsError::TooManySymlinks => "too many levels of symbolic links",
        };
        write!(f, "{}", msg)
    }
}
