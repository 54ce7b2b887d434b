//! Root-directory file access on the card's first FAT volume.
//!
//! Wraps `embedded-sdmmc`'s raw-handle API so the jukebox and the player
//! only see [`platform::storage`] traits.

use core::fmt::Write as _;

use embedded_sdmmc::{
    BlockDevice, Error, Mode, RawDirectory, RawFile, RawVolume, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};
use platform::storage::{DirEntry, File, Storage};

/// Timestamp source for a player that never writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedTime;

impl TimeSource for FixedTime {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 0,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// Mount failure; hands the block device back for re-initialisation.
pub struct MountError<D: BlockDevice> {
    /// The device that failed to mount.
    pub device: D,
    /// What went wrong.
    pub error: Error<D::Error>,
}

/// First FAT volume of a block device with its root directory open.
pub struct FatStorage<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volumes: VolumeManager<D, T>,
    volume: RawVolume,
    root: RawDirectory,
}

impl<D, T> FatStorage<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    /// Open volume 0 and its root directory.
    pub fn mount(device: D, time: T) -> Result<Self, MountError<D>> {
        let mut volumes = VolumeManager::new(device, time);
        let opened = volumes
            .open_raw_volume(VolumeIdx(0))
            .and_then(|volume| Ok((volume, volumes.open_root_dir(volume)?)));
        match opened {
            Ok((volume, root)) => Ok(Self {
                volumes,
                volume,
                root,
            }),
            Err(error) => {
                let (device, _) = volumes.free();
                Err(MountError { device, error })
            }
        }
    }

    /// Close every handle and give back the block device.
    ///
    /// A handle that fails to close is logged; the device comes back either
    /// way.
    pub fn unmount(mut self) -> D {
        if self.volumes.close_dir(self.root).is_err() {
            warn!("root directory did not close cleanly");
        }
        if self.volumes.close_volume(self.volume).is_err() {
            warn!("volume did not close cleanly");
        }
        self.volumes.free().0
    }
}

impl<D, T> Storage for FatStorage<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    type Error = Error<D::Error>;
    type File<'a>
        = FatFile<'a, D, T>
    where
        Self: 'a;

    fn open_file(&mut self, name: &str) -> Result<Self::File<'_>, Self::Error> {
        let raw = self
            .volumes
            .open_file_in_dir(self.root, name, Mode::ReadOnly)?;
        Ok(FatFile {
            volumes: &mut self.volumes,
            raw,
        })
    }

    fn for_each_entry<F>(&mut self, mut visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&DirEntry),
    {
        self.volumes.iterate_dir(self.root, |entry| {
            if entry.attributes.is_volume() {
                return;
            }
            let mut name = heapless::String::new();
            if write!(name, "{}", entry.name).is_err() {
                return;
            }
            visit(&DirEntry {
                name,
                is_dir: entry.attributes.is_directory(),
                size: entry.size,
            });
        })
    }
}

/// Read-only file on a [`FatStorage`]; closed on drop.
pub struct FatFile<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volumes: &'a mut VolumeManager<D, T>,
    raw: RawFile,
}

impl<D, T> File for FatFile<'_, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    type Error = Error<D::Error>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.volumes.file_eof(self.raw)? {
            return Ok(0);
        }
        self.volumes.read(self.raw, buf)
    }

    fn skip(&mut self, bytes: u32) -> Result<(), Self::Error> {
        let length = self.volumes.file_length(self.raw)?;
        let offset = self.volumes.file_offset(self.raw)?;
        let target = offset.saturating_add(bytes).min(length);
        self.volumes.file_seek_from_start(self.raw, target)
    }
}

impl<D, T> Drop for FatFile<'_, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    fn drop(&mut self) {
        let _ = self.volumes.close_file(self.raw);
    }
}
