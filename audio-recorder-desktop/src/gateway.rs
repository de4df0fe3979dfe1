//! Desktop audio session gateway.
//!
//! Desktop hosts have no shared audio session to negotiate, so activation
//! only verifies that the requested category can be served by the current
//! devices. Input selection always resolves to the default input device; the
//! orientation only decides which data source is reported.

use cpal::traits::{DeviceTrait, HostTrait};

use audio_recorder_core::models::audio_models::{
    DeviceDescriptor, Orientation, SessionCategory, SessionMode, SessionOptions,
};
use audio_recorder_core::models::error::SessionError;
use audio_recorder_core::traits::session_gateway::SessionGateway;

#[derive(Debug, Default)]
pub struct CpalSessionGateway {
    active: Option<SessionCategory>,
}

impl CpalSessionGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Category of the last successful activation.
    pub fn active_category(&self) -> Option<SessionCategory> {
        self.active
    }
}

impl SessionGateway for CpalSessionGateway {
    fn activate(
        &mut self,
        category: SessionCategory,
        mode: SessionMode,
        options: SessionOptions,
    ) -> Result<(), SessionError> {
        let host = cpal::default_host();
        let needs_input = matches!(category, SessionCategory::PlayAndRecord | SessionCategory::Record);
        let needs_output = matches!(category, SessionCategory::PlayAndRecord | SessionCategory::Playback);

        if needs_input && host.default_input_device().is_none() {
            return Err(SessionError::ActivationFailed("no input device for recording".into()));
        }
        if needs_output && host.default_output_device().is_none() {
            return Err(SessionError::ActivationFailed("no output device for playback".into()));
        }

        log::debug!(
            "Session active on {:?}: {:?}/{:?}, options {:?}",
            host.id(),
            category,
            mode,
            options
        );
        self.active = Some(category);
        Ok(())
    }

    fn select_input(&mut self, orientation: Orientation) -> Result<DeviceDescriptor, SessionError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(SessionError::NoInputDevice)?;
        let name = device.name().unwrap_or_else(|_| "Default Microphone".into());

        let supports_stereo = device
            .supported_input_configs()
            .map(|mut configs| configs.any(|c| c.channels() >= 2))
            .map_err(|e| SessionError::InputSelectionFailed {
                device: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(DeviceDescriptor {
            id: name.clone(),
            name,
            data_source: orientation.preferred_data_source(),
            supports_stereo,
        })
    }
}
