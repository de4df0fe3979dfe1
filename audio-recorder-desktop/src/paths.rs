//! Default recording locations on desktop hosts.

use std::path::PathBuf;

use audio_recorder_core::traits::path_resolver::DirectoryPathResolver;

const APP_DIR: &str = "audio-recorder";

/// Directory finished recordings are moved into.
///
/// The user's audio directory when the platform has one, else the data directory.
pub fn recordings_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Directory recordings are written to while in progress.
pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(APP_DIR)
}

pub fn default_path_resolver() -> DirectoryPathResolver {
    DirectoryPathResolver::new(scratch_dir(), recordings_dir())
}
