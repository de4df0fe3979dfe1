//! Microphone permission check for desktop hosts.
//!
//! Desktop hosts grant access per device rather than per app, and there is
//! no consent dialog to show. Access counts as granted when the default
//! input device can report a capture configuration; a privacy toggle or a
//! device held exclusively by another app makes that query fail.

use cpal::traits::{DeviceTrait, HostTrait};

use audio_recorder_core::traits::permission::PermissionGate;

/// Check if microphone access is available.
pub fn check_microphone_permission() -> bool {
    let Some(device) = cpal::default_host().default_input_device() else {
        log::debug!("No capture device");
        return false;
    };

    match device.default_input_config() {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Microphone not accessible: {}", e);
            false
        }
    }
}

/// [`PermissionGate`] backed by [`check_microphone_permission`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MicrophonePermission;

impl PermissionGate for MicrophonePermission {
    fn is_granted(&self) -> bool {
        check_microphone_permission()
    }

    fn request(&self) -> bool {
        let granted = check_microphone_permission();
        if !granted {
            log::warn!("Microphone access denied; enable it in the system privacy settings");
        }
        granted
    }
}
