//! Play every WAV file in the root directory, in directory order.

use platform::storage::{DirEntry, Storage, SHORT_NAME_LEN};
use platform::timer::SampleTimer;
use playback::{PlaybackError, Player};

/// Root entries considered per pass; the rest wait for the next pass.
pub const MAX_ROOT_ENTRIES: usize = 32;

/// Tally of one pass over the root directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JukeboxReport {
    /// Files streamed to the DAC.
    pub played: u32,
    /// Files that are not playable WAVs.
    pub rejected: u32,
    /// Sub-directories passed over.
    pub directories: u32,
    /// Entries beyond [`MAX_ROOT_ENTRIES`].
    pub overflow: u32,
}

/// One pass over the root directory: skip sub-directories, validate every
/// file with `open_wav`, play the ones that pass and log why the others
/// did not.
///
/// Storage failures (listing, opening or reading) end the pass; the caller
/// decides whether to re-initialise the card.
pub fn play_root<S, T>(storage: &mut S, player: &mut Player<'_>, timer: &mut T) -> Result<JukeboxReport, S::Error>
where
    S: Storage,
    T: SampleTimer,
{
    let mut report = JukeboxReport::default();
    let mut files: heapless::Vec<heapless::String<SHORT_NAME_LEN>, MAX_ROOT_ENTRIES> = heapless::Vec::new();

    storage.for_each_entry(|entry: &DirEntry| {
        if entry.is_dir {
            report.directories = report.directories.saturating_add(1);
        } else if files.push(entry.name.clone()).is_err() {
            report.overflow = report.overflow.saturating_add(1);
        }
    })?;
    if report.overflow > 0 {
        warn!("{} root entries not considered this pass", report.overflow);
    }

    for name in &files {
        let mut file = storage.open_file(name)?;
        let format = match player.open_wav(&mut file) {
            Ok(format) => format,
            Err(PlaybackError::Format(reason)) => {
                info!("{}: {}", name.as_str(), reason);
                report.rejected = report.rejected.saturating_add(1);
                continue;
            }
            Err(PlaybackError::Io(e)) => return Err(e),
            Err(PlaybackError::NotOpened) => continue,
        };

        info!(
            "playing {} ({} Hz, {} bit)",
            name.as_str(),
            format.sample_rate,
            format.bits_per_sample
        );
        match player.play_wav(&mut file, timer) {
            Ok(end) => {
                report.played = report.played.saturating_add(1);
                if end.underruns > 0 {
                    warn!("{}: {} underruns", name.as_str(), end.underruns);
                }
            }
            Err(PlaybackError::Io(e)) => return Err(e),
            Err(PlaybackError::Format(reason)) => {
                info!("{}: {}", name.as_str(), reason);
                report.rejected = report.rejected.saturating_add(1);
            }
            Err(PlaybackError::NotOpened) => {}
        }
    }

    info!(
        "pass done: {} played, {} rejected, {} directories",
        report.played, report.rejected, report.directories
    );
    Ok(report)
}
