//! File-layer abstraction consumed by the WAV parser and the jukebox loop.
//!
//! The FAT layer itself is external; anything that can read sequential bytes
//! and skip forward can feed the player.

use heapless::String;

/// Longest 8.3 name including the dot.
pub const SHORT_NAME_LEN: usize = 12;

/// Sequential read access to an open file.
pub trait File {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes from the current position.
    ///
    /// Returns the number of bytes read; `0` means end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Move the position forward by `bytes` without returning data.
    fn skip(&mut self, bytes: u32) -> Result<(), Self::Error>;
}

/// One root-directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// 8.3 file name.
    pub name: String<SHORT_NAME_LEN>,
    /// Whether the entry is a sub-directory.
    pub is_dir: bool,
    /// File size in bytes.
    pub size: u32,
}

/// Root-directory file access.
pub trait Storage {
    /// Error type
    type Error: core::fmt::Debug;
    /// Open file type
    type File<'a>: File<Error = Self::Error>
    where
        Self: 'a;

    /// Open `name` in the root directory for reading.
    fn open_file(&mut self, name: &str) -> Result<Self::File<'_>, Self::Error>;

    /// Call `visit` once per root-directory entry, in directory order.
    fn for_each_entry<F>(&mut self, visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&DirEntry);
}
